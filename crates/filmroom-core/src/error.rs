use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid time format: {0:?}")]
    InvalidTime(String),

    #[error("invalid data: {0}")]
    Validation(String),
}

impl Error {
    /// Returns `true` for bad user input rather than a storage failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidTime(_) | Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
