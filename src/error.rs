use crate::insights::generator::GeneratorError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Entry not found: {id}")]
    NotFound { id: String },

    #[error("Access denied: entry {id} belongs to another user")]
    AccessDenied { id: String },

    #[error("Entry {id} needs a text note or voice recording for insight generation")]
    NoContent { id: String },

    #[error("{0}")]
    Generator(#[from] GeneratorError),

    #[error("AI service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Invalid data: {message}")]
    InvalidData { message: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl InsightError {
    /// Status code an HTTP collaborator should answer with for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            InsightError::NotFound { .. } => 404,
            InsightError::AccessDenied { .. } => 403,
            InsightError::NoContent { .. } | InsightError::InvalidRequest { .. } => 400,
            InsightError::ServiceUnavailable(_) => 503,
            InsightError::Generator(GeneratorError::NotConfigured(_)) => 503,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, InsightError>;
