use crate::Summary;
use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use serde_json::{Map, Value};
use time::UtcDateTime;

#[derive(sqlx::FromRow)]
pub(crate) struct SummaryRow {
    pub(crate) url: String,
    pub(crate) data: String,
    pub(crate) metadata: String,
    pub(crate) written_at: i64,
}
impl TryFrom<&Summary> for SummaryRow {
    type Error = Error;
    fn try_from(summary: &Summary) -> Result<Self, Self::Error> {
        Ok(Self {
            url: summary.url.clone(),
            data: serde_json::to_string(&summary.data).or_raise(|| ErrorKind::InvalidData("data"))?,
            metadata: serde_json::to_string(&summary.metadata).or_raise(|| ErrorKind::InvalidData("metadata"))?,
            written_at: summary.timestamp.unix_timestamp(),
        })
    }
}
impl TryFrom<SummaryRow> for Summary {
    type Error = Error;
    fn try_from(row: SummaryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            url: row.url,
            data: serde_json::from_str::<Map<String, Value>>(&row.data).or_raise(|| ErrorKind::InvalidData("data"))?,
            metadata: serde_json::from_str::<Map<String, Value>>(&row.metadata)
                .or_raise(|| ErrorKind::InvalidData("metadata"))?,
            timestamp: UtcDateTime::from_unix_timestamp(row.written_at)
                .or_raise(|| ErrorKind::InvalidData("written at"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_to_model() {
        let written = UtcDateTime::now();
        let row = SummaryRow {
            url: "https://api.myanimelist.net/v2/anime/1?nsfw=true&fields=id,title".to_string(),
            data: "{}".to_string(),
            metadata: r#"{"id":1,"title":"Cowboy Bebop"}"#.to_string(),
            written_at: written.unix_timestamp(),
        };
        let model = Summary::try_from(row).unwrap();
        assert!(model.has_data());
        assert_eq!(model.metadata.get("title"), Some(&json!("Cowboy Bebop")));
        // Converting to a Unix timestamp (measured in seconds) inherently strips the nanoseconds component.
        assert_eq!(model.timestamp, written.replace_nanosecond(0).unwrap());
    }

    #[test]
    fn test_model_to_row() {
        let model = Summary::from_status("https://api.myanimelist.net/v2/manga/2", 404);
        let row = SummaryRow::try_from(&model).unwrap();
        assert_eq!(row.metadata, r#"{"error":404}"#);
        assert_eq!(row.data, "{}");
    }

    #[test]
    fn test_row_with_corrupt_metadata() {
        let row = SummaryRow {
            url: "https://api.myanimelist.net/v2/anime/1".to_string(),
            data: "{}".to_string(),
            metadata: "[1, 2, 3]".to_string(),
            written_at: 0,
        };
        let err = Summary::try_from(row).unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidData("metadata")));
    }
}
