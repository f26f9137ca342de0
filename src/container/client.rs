//! Docker/Podman client wrapper.
//!
//! Connects to the endpoint named in [`ContainerSettings`] rather than
//! probing the environment, and exposes the read-only queries the container
//! backend needs.

use crate::action::ContainerSummary;
use crate::container::{ContainerError, ExecConfig, ExecOutput, Result, exec};
use crate::executor::{ContainerSettings, ExecStreamMode};
use bollard::Docker;
use tracing::debug;

/// Docker/Podman API client wrapper.
#[derive(Clone)]
pub struct ContainerClient {
    docker: Docker,
    endpoint: String,
}

impl ContainerClient {
    /// Create a client for the configured endpoint.
    ///
    /// No request is made here; an unreachable daemon surfaces on the first
    /// call. Without a configured endpoint, `DOCKER_HOST` is consulted before
    /// the platform socket.
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is malformed or uses an unsupported
    /// scheme.
    pub fn connect(settings: &ContainerSettings) -> Result<Self> {
        let timeout = settings.timeout_secs;

        let (docker, endpoint) = match settings.endpoint.as_deref() {
            None => (
                Docker::connect_with_local_defaults(),
                "local default".to_string(),
            ),
            Some(endpoint) if endpoint.starts_with("unix://") => (
                Docker::connect_with_socket(endpoint, timeout, bollard::API_DEFAULT_VERSION),
                endpoint.to_string(),
            ),
            Some(endpoint) if endpoint.starts_with("tcp://") || endpoint.starts_with("http://") => (
                Docker::connect_with_http(endpoint, timeout, bollard::API_DEFAULT_VERSION),
                endpoint.to_string(),
            ),
            Some(endpoint) => {
                return Err(ContainerError::Unreachable {
                    endpoint: endpoint.to_string(),
                    reason: "unsupported endpoint scheme (expected unix://, tcp:// or http://)"
                        .to_string(),
                });
            }
        };

        let docker = docker.map_err(|e| ContainerError::Unreachable {
            endpoint: endpoint.clone(),
            reason: e.to_string(),
        })?;

        debug!("Container client configured for {}", endpoint);
        Ok(Self { docker, endpoint })
    }

    /// Endpoint this client talks to, for logging.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ping the container runtime to verify connectivity.
    ///
    /// # Errors
    ///
    /// Returns error if ping fails.
    pub async fn ping(&self) -> Result<()> {
        self.docker
            .ping()
            .await
            .map_err(|e| ContainerError::Unreachable {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;
        debug!("Container runtime ping successful");
        Ok(())
    }

    /// List containers; stopped ones only when `include_stopped`.
    ///
    /// # Errors
    ///
    /// Returns error if listing fails.
    pub async fn list_containers(&self, include_stopped: bool) -> Result<Vec<ContainerSummary>> {
        let containers = self
            .docker
            .list_containers(Some(
                bollard::query_parameters::ListContainersOptionsBuilder::default()
                    .all(include_stopped)
                    .build(),
            ))
            .await?;

        Ok(containers
            .into_iter()
            .map(|c| ContainerSummary {
                id: c.id.unwrap_or_default(),
                names: c.names.unwrap_or_default(),
                image: c.image.unwrap_or_default(),
                state: c.state.map(|s| s.to_string()).unwrap_or_default(),
                status: c.status.unwrap_or_default(),
                created: c.created,
            })
            .collect())
    }

    /// Full descriptor of one container, as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::NotFound`] if `id` does not resolve.
    pub async fn inspect_container(&self, id: &str) -> Result<serde_json::Value> {
        let inspect = self
            .docker
            .inspect_container(
                id,
                None::<bollard::query_parameters::InspectContainerOptions>,
            )
            .await
            .map_err(|e| match e {
                bollard::errors::Error::DockerResponseServerError {
                    status_code: 404, ..
                } => ContainerError::NotFound(id.to_string()),
                e => ContainerError::ApiError(e),
            })?;

        serde_json::to_value(inspect).map_err(|e| {
            ContainerError::ExecutionError(format!("Failed to encode container descriptor: {e}"))
        })
    }

    /// Run a command inside a running container.
    ///
    /// # Errors
    ///
    /// Returns error if the exec cannot be created or its stream fails.
    pub async fn exec(
        &self,
        id: &str,
        config: &ExecConfig,
        mode: ExecStreamMode,
    ) -> Result<ExecOutput> {
        exec::execute(&self.docker, id, config, mode).await
    }
}
