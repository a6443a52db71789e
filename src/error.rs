//! # Error Types
//!
//! Custom error types for the SITL bridge using `thiserror`.

use thiserror::Error;

/// Main error type for the SITL bridge
#[derive(Debug, Error)]
pub enum SitlError {
    /// Trailing magic did not match the expected packet type
    #[error("bad packet magic: expected 0x{expected:08x}, found 0x{found:08x}")]
    BadMagic { expected: u32, found: u32 },

    /// Fewer bytes than the fixed packet size were supplied
    #[error("short buffer: need {expected} bytes, got {actual}")]
    ShortBuffer { expected: usize, actual: usize },

    /// Parameter name is not part of the schema
    #[error("unknown parameter: {0}")]
    UnknownParameter(String),

    /// Value variant does not match the parameter's declared type
    #[error("type mismatch for {name}: expected {expected}, found {found}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Integer value does not fit the parameter's declared width
    #[error("value {value} out of range for {name}")]
    ValueOutOfRange { name: String, value: i64 },

    /// Stored gps_type does not name a known GPS driver
    #[error("invalid GPS type: {0}")]
    InvalidGpsType(i8),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Parameter table could not be rendered as TOML
    #[error("Serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Snapshot could not be rendered as JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SitlError {
    /// Whether the packet channel is still usable after this error
    ///
    /// Decode failures only cost the offending packet; the caller should keep
    /// reading.
    pub fn is_recoverable_decode(&self) -> bool {
        matches!(self, SitlError::BadMagic { .. } | SitlError::ShortBuffer { .. })
    }
}

/// Result type alias for the SITL bridge
pub type Result<T> = std::result::Result<T, SitlError>;
