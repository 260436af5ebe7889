//! Error types for NakshaMap

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Frame decoding failures.
///
/// All variants are recoverable: the frame is treated as absent and polling
/// continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Input could not be turned into a well-formed frame
    #[error("Malformed frame: {0}")]
    Malformed(String),

    /// AES decryption failed (usually a missing or wrong vendor key)
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Frame decoded but its shape is not one this crate understands
    #[error("Unsupported frame shape: {0}")]
    UnsupportedFrameShape(String),
}

/// NakshaMap error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Frame could not be decoded
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// A partial frame arrived without a base map to patch
    #[error("No base map for partial frame {map_id}/{frame_id}")]
    MissingBaseMap {
        /// Map id of the orphaned frame
        map_id: u32,
        /// Frame id of the orphaned frame
        frame_id: u32,
    },

    /// Action is not allowed in the current state
    #[error("Invalid action: {0}")]
    InvalidAction(String),

    /// Argument out of range or referencing something that does not exist
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Map updates kept failing past the retry budget
    #[error("Device update failed: {0}")]
    DeviceUpdateFailed(String),

    /// Device RPC or cloud storage call failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration problem
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Transport(format!("JSON error: {}", e))
    }
}
