use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state backend I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}
