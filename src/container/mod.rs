//! Container daemon access.
//!
//! Wraps the bollard Docker API: connecting to a configured endpoint,
//! listing and inspecting containers, and running a command inside one with
//! its attached output collected.
//!
//! - [`client`]: daemon connection and read-only queries
//! - [`exec`]: exec creation, stream collection and exit-code lookup

mod client;
mod exec;

pub use client::ContainerClient;
pub use exec::{ExecConfig, ExecConfigBuilder, ExecOutput};

use crate::error::ActionError;

/// Container runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Docker/Podman API error
    #[error("Container API error: {0}")]
    ApiError(#[from] bollard::errors::Error),

    /// Container not found
    #[error("Container not found: {0}")]
    NotFound(String),

    /// Could not reach the daemon
    #[error("Failed to connect to container runtime at {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    /// Container execution error
    #[error("Execution error: {0}")]
    ExecutionError(String),
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;

impl From<ContainerError> for ActionError {
    fn from(err: ContainerError) -> Self {
        use bollard::errors::Error as Bollard;

        match err {
            ContainerError::NotFound(id) => ActionError::not_found(format!("Container {id}")),
            ContainerError::Unreachable { endpoint, reason } => ActionError::connection(
                format!("Container runtime unreachable at {endpoint}"),
                Some(reason),
            ),
            ContainerError::ApiError(Bollard::DockerResponseServerError {
                status_code: 404,
                message,
            }) => ActionError::not_found(message),
            ContainerError::ApiError(
                e @ (Bollard::SocketNotFoundError(_)
                | Bollard::IOError { .. }
                | Bollard::RequestTimeoutError),
            ) => ActionError::connection("Container runtime unreachable", Some(format!("{e:?}"))),
            ContainerError::ApiError(e) => {
                ActionError::backend(format!("Container API error: {e}"), Some(format!("{e:?}")))
            }
            ContainerError::ExecutionError(message) => ActionError::backend(message, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err: ActionError = ContainerError::NotFound("abc".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err: ActionError = ContainerError::ApiError(
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message: "No such container: abc".to_string(),
            },
        )
        .into();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_server_error_maps_to_io() {
        let err: ActionError = ContainerError::ApiError(
            bollard::errors::Error::DockerResponseServerError {
                status_code: 409,
                message: "container is not running".to_string(),
            },
        )
        .into();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("not running"));
    }

    #[test]
    fn test_unreachable_maps_to_connection() {
        let err: ActionError = ContainerError::Unreachable {
            endpoint: "unix:///nope.sock".to_string(),
            reason: "no such file".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Connection);

        let err: ActionError =
            ContainerError::ApiError(bollard::errors::Error::SocketNotFoundError(
                "/nope.sock".to_string(),
            ))
            .into();
        assert_eq!(err.kind(), ErrorKind::Connection);
    }
}
