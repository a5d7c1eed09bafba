//! Error types for report decoding

use thiserror::Error;

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Decoding and loading errors.
///
/// All of these are fatal for the payload they occur in: the decoder never
/// attempts partial-tree recovery.
#[derive(Error, Debug)]
pub enum Error {
    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Compressed string table entry is not valid base64
    #[error("Invalid base64 in string table entry {id}: {source}")]
    Base64 {
        id: usize,
        #[source]
        source: base64::DecodeError,
    },

    /// Compressed string table entry failed to inflate
    #[error("Failed to inflate string table entry {id}: {source}")]
    Inflate {
        id: usize,
        #[source]
        source: std::io::Error,
    },

    /// Inflated bytes are not UTF-8
    #[error("String table entry {id} is not UTF-8: {source}")]
    Utf8 {
        id: usize,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// A compact array does not have the expected shape
    #[error("Malformed {context}: {detail}")]
    Shape { context: &'static str, detail: String },

    /// A coded value has no entry in the version's code table
    #[error("Unknown {what} code: {code}")]
    UnknownCode { what: &'static str, code: String },

    /// A children slot carries a split-file index in a format without split files
    #[error("Format version {version} does not support split files (index {index})")]
    DeferredUnsupported { version: u32, index: i64 },

    /// Unsupported payload version
    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u32),

    /// A node outlived the report it was decoded from
    #[error("Report session is closed")]
    SessionClosed,

    /// The loader was dropped before a requested split file arrived
    #[error("Load of {0} was abandoned before the file arrived")]
    LoadAbandoned(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a shape error
    pub fn shape(context: &'static str, detail: impl Into<String>) -> Self {
        Error::Shape {
            context,
            detail: detail.into(),
        }
    }

    /// Create an unknown-code error
    pub fn unknown_code(what: &'static str, code: impl ToString) -> Self {
        Error::UnknownCode {
            what,
            code: code.to_string(),
        }
    }
}
