use meditrust_core::DomainError;
use thiserror::Error;

pub type InfraResult<T> = Result<T, InfraError>;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("database error in {operation}: {message}")]
    Database {
        operation: &'static str,
        message: String,
    },

    /// Unique, foreign-key or check constraint rejected the write.
    #[error("constraint violation in {operation}: {message}")]
    Constraint {
        operation: &'static str,
        message: String,
    },

    #[error("failed to decode row: {0}")]
    Decode(String),

    #[error("import failed: {0}")]
    Import(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl InfraError {
    pub fn import(msg: impl Into<String>) -> Self {
        Self::Import(msg.into())
    }
}

pub(crate) fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> InfraError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();
            if db_err.is_unique_violation()
                || db_err.is_foreign_key_violation()
                || db_err.is_check_violation()
            {
                InfraError::Constraint { operation, message }
            } else {
                InfraError::Database { operation, message }
            }
        }
        sqlx::Error::ColumnDecode { index, source } => {
            InfraError::Decode(format!("{operation}: column {index}: {source}"))
        }
        other => InfraError::Database {
            operation,
            message: other.to_string(),
        },
    }
}
