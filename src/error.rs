use thiserror::Error;

/// Main error type for the ledger
#[derive(Error, Debug)]
pub enum LedgerError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Request errors
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    // State machine errors
    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Map a UNIQUE/FOREIGN KEY violation into a conflict, leaving other
    /// database errors untouched.
    pub fn from_constraint(err: sqlx::Error, msg: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db)
                if db.is_unique_violation() || db.is_foreign_key_violation() =>
            {
                Self::Conflict(msg.into())
            }
            _ => Self::Database(err),
        }
    }

    /// True for errors caused by the caller rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::NotFound(_)
                | Self::Conflict(_)
                | Self::InvalidStateTransition { .. }
        )
    }
}

/// Result type alias for LedgerError
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::InvalidStateTransition {
            from: "won".to_string(),
            to: "lost".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid state transition: from won to lost");

        let err = LedgerError::validation("profit is required");
        assert_eq!(err.to_string(), "profit is required");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(LedgerError::validation("bad").is_client_error());
        assert!(LedgerError::not_found("missing").is_client_error());
        assert!(LedgerError::Conflict("dup".into()).is_client_error());
        assert!(!LedgerError::Internal("boom".into()).is_client_error());
    }
}
