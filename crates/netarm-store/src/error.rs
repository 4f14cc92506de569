use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid resource address {0:?}")]
    InvalidAddress(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal store error: {0}")]
    Internal(String),
}
