//! Error types for the provider.

use thiserror::Error;

use crate::client::TerraregError;

/// Errors surfaced by provider operations.
///
/// Client-level failures are folded in via [`From<TerraregError>`]: not-found
/// conditions keep their identity (Read handles them by dropping the entity
/// from state), authentication and authorization failures become
/// permission-denied, registry-side failures become unavailable and the rest
/// stay wrapped as registry errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested entity was not found in the registry.
    #[error("not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("validation error: {0}")]
    Validation(String),

    /// The provider configuration is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("unknown resource type: {0}")]
    UnknownResource(String),

    /// The registry rejected the configured credentials.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The registry is unavailable or failing internally.
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    /// Any other Terrareg client error.
    #[error("Terrareg client error: {0}")]
    Registry(TerraregError),

    /// A state or configuration document could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

impl From<TerraregError> for ProviderError {
    fn from(err: TerraregError) -> Self {
        match err {
            TerraregError::NotFound => Self::NotFound(err.to_string()),
            TerraregError::InvalidAuth | TerraregError::Unauthorized => {
                Self::PermissionDenied(err.to_string())
            }
            TerraregError::Server { .. } => Self::Unavailable(err.to_string()),
            TerraregError::Validation(message) => Self::Validation(message),
            other => Self::Registry(other),
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::Validation(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::PermissionDenied(msg) => tonic::Status::permission_denied(msg),
            ProviderError::Unavailable(msg) => tonic::Status::unavailable(msg),
            ProviderError::Registry(err) => tonic::Status::internal(err.to_string()),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("serialization error: {}", err))
            }
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("transport error: {}", err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("namespace \"missing\"".to_string());
        assert_eq!(format!("{}", err), "not found: namespace \"missing\"");

        let err = ProviderError::UnknownResource("terrareg_widget".to_string());
        assert_eq!(format!("{}", err), "unknown resource type: terrareg_widget");
    }

    #[test]
    fn test_client_error_conversion() {
        assert!(matches!(
            ProviderError::from(TerraregError::NotFound),
            ProviderError::NotFound(_)
        ));
        assert!(matches!(
            ProviderError::from(TerraregError::InvalidAuth),
            ProviderError::PermissionDenied(_)
        ));
        assert!(matches!(
            ProviderError::from(TerraregError::Unauthorized),
            ProviderError::PermissionDenied(_)
        ));
        assert!(matches!(
            ProviderError::from(TerraregError::Server { status: 502 }),
            ProviderError::Unavailable(_)
        ));
        assert!(matches!(
            ProviderError::from(TerraregError::UnknownResponse { status: 418 }),
            ProviderError::Registry(_)
        ));
        assert!(matches!(
            ProviderError::from(TerraregError::Validation("bad".to_string())),
            ProviderError::Validation(_)
        ));
    }

    #[test]
    fn test_error_to_status() {
        let status: tonic::Status = ProviderError::NotFound("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::NotFound);

        let status: tonic::Status = ProviderError::Validation("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);

        let status: tonic::Status = ProviderError::Configuration("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::FailedPrecondition);

        let status: tonic::Status = ProviderError::PermissionDenied("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::PermissionDenied);

        let status: tonic::Status = ProviderError::Unavailable("test".to_string()).into();
        assert_eq!(status.code(), tonic::Code::Unavailable);

        let status: tonic::Status =
            ProviderError::Registry(TerraregError::UnknownResponse { status: 418 }).into();
        assert_eq!(status.code(), tonic::Code::Internal);
    }
}
