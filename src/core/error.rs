use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Type mismatch: field '{field}' expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Transaction aborted{}: {source}", at_record(.identity))]
    TransactionAborted {
        identity: Option<i64>,
        #[source]
        source: Box<RegistryError>,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Credential error: {0}")]
    Credential(#[from] bcrypt::BcryptError),
}

pub type Result<T> = std::result::Result<T, RegistryError>;

fn at_record(identity: &Option<i64>) -> String {
    identity
        .map(|id| format!(" at record {id}"))
        .unwrap_or_default()
}

impl RegistryError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Wraps a failure that happened while a bulk transaction was open.
    ///
    /// Nested aborts are not re-wrapped so the innermost identity is kept.
    pub fn aborted(identity: Option<i64>, source: RegistryError) -> Self {
        match source {
            already @ Self::TransactionAborted { .. } => already,
            other => Self::TransactionAborted {
                identity,
                source: Box::new(other),
            },
        }
    }

    /// Stable machine-readable code for the error category.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidInput(_) => "invalid_input",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::Unauthorized(_) => "unauthorized",
            Self::TransactionAborted { .. } => "transaction_aborted",
            Self::Storage(_) => "storage_error",
            Self::Credential(_) => "credential_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborted_keeps_innermost_identity() {
        let inner = RegistryError::aborted(Some(4), RegistryError::not_found("student 4"));
        let outer = RegistryError::aborted(Some(9), inner);

        match outer {
            RegistryError::TransactionAborted { identity, source } => {
                assert_eq!(identity, Some(4));
                assert_eq!(source.kind(), "not_found");
            }
            other => panic!("expected aborted transaction, got {other:?}"),
        }
    }

    #[test]
    fn aborted_message_names_the_record() {
        let err = RegistryError::aborted(Some(12), RegistryError::invalid_input("bad id"));
        assert_eq!(
            err.to_string(),
            "Transaction aborted at record 12: Invalid input: bad id"
        );

        let err = RegistryError::aborted(None, RegistryError::invalid_input("bad id"));
        assert_eq!(err.to_string(), "Transaction aborted: Invalid input: bad id");
    }
}
