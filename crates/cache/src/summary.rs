use serde_json::{Map, Value};
use time::UtcDateTime;

/// Key of the error marker stored in [`Summary::metadata`] for failed requests.
const ERROR_KEY: &str = "error";
/// Fields that must be present for a summary to count as real data.
const REQUIRED_FIELDS: [&str; 2] = ["id", "title"];
const NOT_FOUND: u16 = 404;

/// The cached outcome of a single API request.
///
/// Either holds the full decoded response body in [`metadata`](Self::metadata),
/// or a single-key error marker `{"error": <status code>}` if the API answered
/// with an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Canonical request URL; the cache key.
    pub url: String,
    /// Reserved secondary payload. Always empty for API summaries, but kept so
    /// the stored format stays compatible with other summary producers.
    pub data: Map<String, Value>,
    pub metadata: Map<String, Value>,
    /// When the summary was written (not when it was last read).
    pub timestamp: UtcDateTime,
}

/// How a [`Summary`] should be treated by anything deciding whether to ask
/// the API again.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SummaryState {
    /// The response body contains both an `id` and a `title`.
    Successful,
    /// The API said the entry does not exist (HTTP 404). This is a settled
    /// outcome, not a failure of the fetch machinery.
    NotFound,
    /// Anything else: an error marker with a status other than 404, or a body
    /// that is missing the required fields.
    Failed,
}

impl Summary {
    /// Summary for a successful response, stamped with the current time.
    pub fn from_response(url: impl Into<String>, metadata: Map<String, Value>) -> Self {
        Self {
            url: url.into(),
            data: Map::new(),
            metadata,
            timestamp: UtcDateTime::now(),
        }
    }

    /// Summary recording that the API answered with an error status.
    pub fn from_status(url: impl Into<String>, status: u16) -> Self {
        let mut metadata = Map::new();
        metadata.insert(ERROR_KEY.to_string(), Value::from(status));
        Self::from_response(url, metadata)
    }

    /// `true` if the metadata holds both an `id` and a `title`.
    pub fn has_data(&self) -> bool {
        REQUIRED_FIELDS.iter().all(|key| self.metadata.contains_key(*key))
    }

    /// The HTTP status code of the error marker, if this summary records a
    /// failed request.
    pub fn error_status(&self) -> Option<u16> {
        self.metadata.get(ERROR_KEY)?.as_u64().and_then(|s| u16::try_from(s).ok())
    }

    /// `true` if the metadata is exactly `{"error": 404}`.
    pub fn is_not_found(&self) -> bool {
        self.metadata.len() == 1 && self.error_status() == Some(NOT_FOUND)
    }

    pub fn state(&self) -> SummaryState {
        if self.has_data() {
            SummaryState::Successful
        } else if self.is_not_found() {
            SummaryState::NotFound
        } else {
            SummaryState::Failed
        }
    }

    /// Settled summaries (successful or not found) are never worth requesting
    /// again unless explicitly forced.
    pub fn is_settled(&self) -> bool {
        self.state() != SummaryState::Failed
    }
}
