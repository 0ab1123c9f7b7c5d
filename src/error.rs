use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Failed to decode {template} payload: {source}")]
    DecodeError {
        template: String,
        source: serde_json::Error,
    },
    #[error("Ledger connection error: {0}")]
    ConnectionError(String),
    #[error("Ledger stream error: {0}")]
    StreamError(String),
    #[error("Ledger frame error: {0}")]
    FrameError(#[from] tokio_util::codec::LinesCodecError),
    #[error("Ledger rejected command {command_id}: {reason}")]
    CommandRejected { command_id: String, reason: String },
    #[error("Invalid UETR {0:?}: expected a hyphenated UUID")]
    InvalidUetr(String),
    #[error("Notification error: {0}")]
    NotificationError(#[from] reqwest::Error),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Shutdown requested")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, BridgeError>;
