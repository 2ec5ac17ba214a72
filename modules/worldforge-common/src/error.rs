use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorldForgeError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("World not found: {0}")]
    NotFound(String),

    #[error("Document is {size} bytes, over the {limit} byte ceiling")]
    Oversize { size: usize, limit: usize },

    #[error("Remote storage error: {0}")]
    Remote(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
