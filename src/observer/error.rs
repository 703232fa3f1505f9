use thiserror::Error;

use crate::database::DatabaseError;

/// Observer system errors
#[derive(Debug, Error)]
pub enum ObserverError {
    #[error("Validation error: {}", .0.join(". "))]
    ValidationError(Vec<String>),

    #[error("System error: {0}")]
    SystemError(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error(transparent)]
    DatabaseError(#[from] DatabaseError),
}

impl ObserverError {
    pub fn validation(message: impl Into<String>) -> Self {
        ObserverError::ValidationError(vec![message.into()])
    }

    /// Fold the errors of one ring into one. Validation messages are
    /// concatenated; any other kind wins outright.
    pub fn merge(errors: Vec<ObserverError>) -> Option<ObserverError> {
        let mut messages = Vec::new();
        for error in errors {
            match error {
                ObserverError::ValidationError(mut m) => messages.append(&mut m),
                other => return Some(other),
            }
        }
        if messages.is_empty() {
            None
        } else {
            Some(ObserverError::ValidationError(messages))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_concatenates_validation_messages() {
        let merged = ObserverError::merge(vec![
            ObserverError::validation("Name is a required field!"),
            ObserverError::ValidationError(vec!["a".into(), "b".into()]),
        ]);
        match merged {
            Some(ObserverError::ValidationError(m)) => assert_eq!(m, vec!["Name is a required field!", "a", "b"]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn merge_prefers_system_errors() {
        let merged = ObserverError::merge(vec![
            ObserverError::validation("x"),
            ObserverError::SystemError("hash failed".into()),
        ]);
        assert!(matches!(merged, Some(ObserverError::SystemError(_))));
        assert!(ObserverError::merge(vec![]).is_none());
    }
}
