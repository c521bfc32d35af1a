mod summary;

pub(crate) use self::summary::SummaryRow;
