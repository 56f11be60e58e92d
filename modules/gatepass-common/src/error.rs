use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatePassError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication required")]
    Authentication,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T, E = GatePassError> = std::result::Result<T, E>;
