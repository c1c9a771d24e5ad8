use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Entity not found: {entity_type} with id {id}")]
    NotFound { entity_type: String, id: String },

    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: String, message: String },

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl LibraryError {
    /// Short description suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            LibraryError::Database(_) | LibraryError::Migration(_) => {
                "Library storage is unavailable".to_string()
            }
            LibraryError::Bridge(e) => e.to_string(),
            LibraryError::NotFound { entity_type, .. } => format!("{} not found", entity_type),
            LibraryError::InvalidInput { message, .. } => message.clone(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LibraryError>;
