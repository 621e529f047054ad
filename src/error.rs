// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusterSecretError {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Invalid namespace selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    #[error("Source secret not found: {0}")]
    SourceSecretNotFound(String),

    #[error("Namespace {0} no longer exists")]
    NamespaceGone(String),

    #[error("Failed to converge {failed} of {attempted} mirrors: {details}")]
    ConvergenceError {
        failed: usize,
        attempted: usize,
        details: String,
    },

    #[error("Finalizer error: {0}")]
    FinalizerError(#[source] Box<kube::runtime::finalizer::Error<ClusterSecretError>>),
}

impl ClusterSecretError {
    /// Errors caused by the user's resource rather than the cluster; retrying won't fix them.
    pub fn is_config_error(&self) -> bool {
        match self {
            ClusterSecretError::InvalidSelector(_) | ClusterSecretError::InvalidResource(_) => true,
            ClusterSecretError::FinalizerError(e) => matches!(
                e.as_ref(),
                kube::runtime::finalizer::Error::ApplyFailed(inner)
                    | kube::runtime::finalizer::Error::CleanupFailed(inner)
                    if inner.is_config_error()
            ),
            _ => false,
        }
    }
}

/// True when the API server answered 404.
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == http::StatusCode::NOT_FOUND.as_u16())
}

pub type Result<T> = std::result::Result<T, ClusterSecretError>;

#[cfg(test)]
mod tests {
    use super::*;
    use kube::runtime::finalizer;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(kube::error::ErrorResponse {
            status: "Failure".to_string(),
            message: "test".to_string(),
            reason: "Test".to_string(),
            code,
        })
    }

    fn wrapped(err: finalizer::Error<ClusterSecretError>) -> ClusterSecretError {
        ClusterSecretError::FinalizerError(Box::new(err))
    }

    #[test]
    fn test_resource_errors_are_config_errors() {
        assert!(ClusterSecretError::InvalidSelector("Bad_Name".to_string()).is_config_error());
        assert!(ClusterSecretError::InvalidResource("no uid".to_string()).is_config_error());
    }

    #[test]
    fn test_transient_errors_are_not_config_errors() {
        assert!(!ClusterSecretError::KubeError(api_error(503)).is_config_error());
        assert!(!ClusterSecretError::SourceSecretNotFound("vault/upstream".to_string()).is_config_error());
        assert!(!ClusterSecretError::NamespaceGone("team-a".to_string()).is_config_error());
        assert!(!ClusterSecretError::ConvergenceError {
            failed: 1,
            attempted: 2,
            details: "team-a: unavailable".to_string(),
        }
        .is_config_error());
    }

    #[test]
    fn test_finalizer_wrapped_errors_follow_inner_error() {
        let invalid = || ClusterSecretError::InvalidSelector("Bad_Name".to_string());
        assert!(wrapped(finalizer::Error::ApplyFailed(invalid())).is_config_error());
        assert!(wrapped(finalizer::Error::CleanupFailed(invalid())).is_config_error());

        let missing = ClusterSecretError::SourceSecretNotFound("vault/upstream".to_string());
        assert!(!wrapped(finalizer::Error::ApplyFailed(missing)).is_config_error());
        let transient = ClusterSecretError::KubeError(api_error(500));
        assert!(!wrapped(finalizer::Error::CleanupFailed(transient)).is_config_error());
        assert!(!wrapped(finalizer::Error::AddFinalizer(api_error(409))).is_config_error());
        assert!(!wrapped(finalizer::Error::UnnamedObject).is_config_error());
    }

    #[test]
    fn test_is_not_found() {
        assert!(is_not_found(&api_error(404)));
        assert!(!is_not_found(&api_error(403)));
    }
}
