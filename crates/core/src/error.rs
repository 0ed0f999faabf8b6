//! Error types for scene class and scene object operations

use rdl2_engine::DsoError;

use crate::config::ConfigError;

/// Error type for the scene object framework
///
/// The variants follow the failure taxonomy callers branch on: type
/// mismatches, unknown names, bad values, out of range indices, and
/// operations attempted in the wrong state. Protocol misuse (nested
/// transactions, scheduling conflicts) is not represented here; it panics.
#[derive(Debug, thiserror::Error)]
pub enum RdlError {
    /// Value or key type does not match the declared attribute type
    #[error("{0}")]
    Type(String),

    /// Unknown or duplicate name
    #[error("{0}")]
    Key(String),

    /// Invalid value for an otherwise valid name
    #[error("{0}")]
    Value(String),

    /// Index out of range in a lookup API
    #[error("{0}")]
    Index(String),

    /// Operation not allowed in the object's or class's current state
    #[error("{0}")]
    Runtime(String),

    #[error(transparent)]
    Dso(#[from] DsoError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for scene object framework operations
pub type RdlResult<T> = Result<T, RdlError>;

impl RdlError {
    pub(crate) fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }

    pub(crate) fn key_error(msg: impl Into<String>) -> Self {
        Self::Key(msg.into())
    }

    pub(crate) fn value_error(msg: impl Into<String>) -> Self {
        Self::Value(msg.into())
    }

    pub(crate) fn index_error(msg: impl Into<String>) -> Self {
        Self::Index(msg.into())
    }

    pub(crate) fn runtime_error(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_passthrough() {
        let err = RdlError::key_error("No SceneClass named 'Foo' in the SceneContext.");
        assert_eq!(err.to_string(), "No SceneClass named 'Foo' in the SceneContext.");
        assert!(matches!(err, RdlError::Key(_)));
    }

    #[test]
    fn test_dso_error_conversion() {
        let err: RdlError = DsoError::NotFound {
            class_name: "Foo".into(),
            search_path: ".".into(),
        }
        .into();
        assert!(matches!(err, RdlError::Dso(_)));
        assert!(err.to_string().contains("'Foo'"));
    }
}
