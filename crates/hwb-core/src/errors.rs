/// Core error type for the homework bot.
///
/// Adapter crates map their transport errors into this type so the poll loop
/// can render every failure the same way (one notification string per cycle).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("missing required environment variable {name}")]
    CredentialMissing { name: &'static str },

    #[error("config error: {0}")]
    Config(String),

    #[error("request to {endpoint} (from_date={from_date}) failed: {reason}")]
    Transport {
        endpoint: String,
        from_date: i64,
        reason: String,
    },

    #[error("API responded with status {status}, expected 200 (endpoint {endpoint}, from_date={from_date})")]
    UnexpectedStatus {
        status: u16,
        endpoint: String,
        from_date: i64,
    },

    #[error("API reported an error: {0}")]
    UpstreamApi(String),

    #[error("API response body is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("API response has unexpected shape: expected {expected}, got {actual}")]
    Shape {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("API response is missing the '{0}' field")]
    MissingField(&'static str),

    #[error("field '{field}' has type {actual}, expected {expected}")]
    FieldType {
        field: &'static str,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("homework record has no name")]
    MissingName,

    #[error("unexpected homework status: {0}")]
    UnknownVerdict(String),

    #[error("message delivery failed: {0}")]
    Delivery(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Human-readable JSON type name, used in shape/type errors.
pub fn json_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
