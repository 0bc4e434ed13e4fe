//! src/error.rs
//! ============================================================================
//! # `PillError`: Unified Error Type for Term Wrapper Resolution
//!
//! Every fallible operation in this crate returns `PillResult<T>`. Variants
//! separate caller mistakes (structural, type mismatch), deployment problems
//! (handler load) and collaborator failures (remote validation, vocab).

use compact_str::{CompactString, ToCompactString};
use thiserror::Error;

/// Convenient alias carrying our unified error type
pub type PillResult<T> = Result<T, PillError>;

#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PillError {
    /// Wrapper is missing required fields (term.type, term.id, term.name).
    #[error("Invalid term wrapper: {field} - {message}")]
    Structural {
        field: CompactString,
        message: CompactString,
    },

    /// q is incompatible with the term type or mode.
    #[error("Invalid q for {term_type} term: {message}")]
    TypeMismatch {
        term_type: CompactString,
        message: CompactString,
    },

    /// No handler could be constructed for a term type.
    #[error("Cannot load handler for term type '{term_type}': {reason}")]
    HandlerLoad {
        term_type: CompactString,
        reason: CompactString,
    },

    /// Backing store rejected every entry of the content.
    #[error("Remote validation rejected all entries: {}", .rejected.join(", "))]
    RemoteValidation { rejected: Vec<String> },

    /// Vocabulary collaborator call failed.
    #[error("Vocab call '{operation}' failed: {reason}")]
    Vocab {
        operation: CompactString,
        reason: CompactString,
    },

    /// Serialization or deserialization error (e.g., JSON).
    #[error("Serialization error: {0}")]
    Serde(CompactString),

    /// Configuration load/parse error.
    #[error("Config error: {0}")]
    Config(CompactString),
}

impl PillError {
    /// Create a structural error
    pub fn structural<S1, S2>(field: S1, message: S2) -> Self
    where
        S1: Into<CompactString>,
        S2: Into<CompactString>,
    {
        Self::Structural {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch<S1, S2>(term_type: S1, message: S2) -> Self
    where
        S1: Into<CompactString>,
        S2: Into<CompactString>,
    {
        Self::TypeMismatch {
            term_type: term_type.into(),
            message: message.into(),
        }
    }

    /// Create a handler load error
    pub fn handler_load<S1, S2>(term_type: S1, reason: S2) -> Self
    where
        S1: Into<CompactString>,
        S2: Into<CompactString>,
    {
        Self::HandlerLoad {
            term_type: term_type.into(),
            reason: reason.into(),
        }
    }

    /// Create a vocab failure error
    pub fn vocab<S1, S2>(operation: S1, reason: S2) -> Self
    where
        S1: Into<CompactString>,
        S2: Into<CompactString>,
    {
        Self::Vocab {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Problem with the user's input rather than the deployment.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Structural { .. } | Self::TypeMismatch { .. } | Self::RemoteValidation { .. }
        )
    }
}

impl From<serde_json::Error> for PillError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_compact_string())
    }
}

impl From<toml::de::Error> for PillError {
    fn from(e: toml::de::Error) -> Self {
        Self::Config(e.to_compact_string())
    }
}

impl From<twid::TwidError> for PillError {
    fn from(e: twid::TwidError) -> Self {
        Self::Config(e.to_compact_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_problem() {
        let e = PillError::handler_load("survival", "no handler registered");
        assert_eq!(
            e.to_string(),
            "Cannot load handler for term type 'survival': no handler registered"
        );

        let e = PillError::RemoteValidation {
            rejected: vec!["rs1".into(), "rs2".into()],
        };
        assert_eq!(
            e.to_string(),
            "Remote validation rejected all entries: rs1, rs2"
        );
    }

    #[test]
    fn test_user_vs_deployment_errors() {
        assert!(PillError::structural("term.type", "missing").is_user_error());
        assert!(PillError::type_mismatch("categorical", "bad mode").is_user_error());
        assert!(!PillError::handler_load("x", "y").is_user_error());
        assert!(!PillError::vocab("getTerms", "timeout").is_user_error());
    }
}
