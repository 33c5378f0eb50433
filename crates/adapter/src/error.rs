use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("Adapter is not initialized: {0}")]
    Configuration(String),

    #[error("Failed to connect to the storage engine: {0}")]
    Connection(String),

    #[error("The requested entity was not found.")]
    NotFound,

    #[error("Storage engine error: {0}")]
    Engine(#[from] sqlx::Error),

    #[error("Cannot bind a value of this shape: {0}")]
    UnsupportedValue(String),
}
