//! Error types shared by every snapmover component
//!
//! Errors carry enough structure to decide whether a failed cluster call is
//! worth repeating. The poller relies on [`Error::is_retryable`] to tell a
//! slow control plane apart from a request that can never succeed.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for cluster-facing operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// A resource or input is malformed
    #[error("validation error: {message}")]
    Validation {
        /// Description of what's invalid
        message: String,
        /// The invalid field path (e.g., "spec.volumeSnapshotRef.namespace")
        field: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The resource kind being serialized (if known)
        kind: Option<String>,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "create_client", "list")
        context: String,
    },
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a validation error pointing at a specific field
    pub fn validation_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error for a resource kind
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Convert a kube error raised while handling a resource of `kind`
    ///
    /// A response the client could not decode becomes [`Error::Serialization`]
    /// tagged with the kind, since our typed view of that CRD no longer
    /// matches what the cluster serves. Everything else stays a kube error.
    pub fn from_kube(kind: &str, source: kube::Error) -> Self {
        match source {
            kube::Error::SerdeError(e) => {
                Self::serialization_for_kind(kind, format!("failed to decode {}: {}", kind, e))
            }
            source => Self::Kube { source },
        }
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Malformed requests and permission failures (most 4xx responses) will
    /// not improve by asking again. Conflicts, request timeouts and throttling
    /// are the 4xx exceptions. Transport failures are always retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => match source {
                kube::Error::Api(ae) => {
                    !(400..500).contains(&ae.code) || matches!(ae.code, 408 | 409 | 429)
                }
                kube::Error::SerdeError(_) => false,
                _ => true,
            },
            Error::Validation { .. } => false,
            Error::Serialization { .. } => false,
            Error::Internal { .. } => true,
        }
    }

    /// Get the field path if this is a validation error
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::Validation { field, .. } => field.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn api_error(code: u16) -> Error {
        Error::from(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: format!("status {}", code),
            reason: "Test".to_string(),
            code,
        }))
    }

    #[rstest]
    #[case::bad_request(400, false)]
    #[case::unauthorized(401, false)]
    #[case::forbidden(403, false)]
    #[case::not_found(404, false)]
    #[case::unprocessable(422, false)]
    #[case::conflict(409, true)]
    #[case::throttled(429, true)]
    #[case::server_error(500, true)]
    #[case::unavailable(503, true)]
    fn api_error_retryability_follows_status_code(#[case] code: u16, #[case] retryable: bool) {
        assert_eq!(api_error(code).is_retryable(), retryable);
    }

    #[test]
    fn validation_and_serialization_are_terminal() {
        assert!(!Error::validation("bad selector").is_retryable());
        assert!(!Error::serialization_for_kind("Backup", "bad json").is_retryable());
    }

    #[test]
    fn internal_errors_retry_and_keep_context() {
        let err = Error::internal_with_context("list", "connection reset");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("[list]"));
        assert!(Error::internal("boom")
            .to_string()
            .contains(&format!("[{}]", UNKNOWN_CONTEXT)));
    }

    #[test]
    fn undecodable_response_is_tagged_with_kind() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from_kube("VolumeSnapshotBackup", kube::Error::SerdeError(serde_err));
        assert!(
            matches!(err, Error::Serialization { ref kind, .. } if kind.as_deref() == Some("VolumeSnapshotBackup"))
        );
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("VolumeSnapshotBackup"));
    }

    #[test]
    fn other_kube_errors_pass_through() {
        let api = kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "conflict".to_string(),
            reason: "Conflict".to_string(),
            code: 409,
        });
        let err = Error::from_kube("Backup", api);
        assert!(matches!(err, Error::Kube { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn validation_field_is_exposed() {
        let err = Error::validation_for_field("spec.volumeSnapshotRef.namespace", "missing");
        assert_eq!(err.field(), Some("spec.volumeSnapshotRef.namespace"));
        assert_eq!(Error::validation("x").field(), None);
    }
}
