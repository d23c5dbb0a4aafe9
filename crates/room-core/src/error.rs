//! Error taxonomy.
//!
//! Only document-level corruption surfaces as an error. Recoverable
//! conditions (dangling arrow endpoints, self-loops, unknown tag colors)
//! are absorbed by the graph model and logged.

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("graph document is not valid JSON: {0}")]
    CorruptDocument(#[from] serde_json::Error),
    #[error("history snapshot failed to decode: {0}")]
    CorruptSnapshot(#[from] rmp_serde::decode::Error),
    #[error("history snapshot failed to encode: {0}")]
    SnapshotEncode(#[from] rmp_serde::encode::Error),
}

pub type Result<T> = std::result::Result<T, RoomError>;
