//! Container actions.
//!
//! Each call opens its own client against the configured daemon endpoint.
//! There is no timeout beyond the client's own, and a started exec runs to
//! completion.

use crate::action::{ActionPayload, ContainerAction, ContainerExecOptions, ContainerSummary, ProcessOutcome};
use crate::container::{ContainerClient, ExecConfig};
use crate::error::Result;
use crate::executor::ContainerSettings;
use std::time::Instant;
use tracing::{debug, info};

/// Executes container actions against a daemon
#[derive(Debug, Clone, Default)]
pub struct ContainerHandler {
    settings: ContainerSettings,
}

impl ContainerHandler {
    pub fn new(settings: ContainerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ContainerSettings {
        &self.settings
    }

    pub async fn execute(&self, action: &ContainerAction) -> Result<ActionPayload> {
        match action {
            ContainerAction::List { include_stopped } => {
                let containers = self.list_containers(*include_stopped).await?;
                Ok(ActionPayload::Containers {
                    success: true,
                    containers,
                })
            }
            ContainerAction::Inspect { container_id } => {
                let container = self.inspect_container(container_id).await?;
                Ok(ActionPayload::Container {
                    success: true,
                    container,
                })
            }
            ContainerAction::Exec {
                container_id,
                cmd,
                options,
            } => self
                .exec_in_container(container_id, cmd, options)
                .await
                .map(ActionPayload::Process),
        }
    }

    /// Verify the daemon answers.
    pub async fn ping(&self) -> Result<()> {
        let client = self.client()?;
        client.ping().await?;
        Ok(())
    }

    pub async fn list_containers(&self, include_stopped: bool) -> Result<Vec<ContainerSummary>> {
        let client = self.client()?;
        let containers = client.list_containers(include_stopped).await?;
        debug!("Listed {} containers", containers.len());
        Ok(containers)
    }

    pub async fn inspect_container(&self, container_id: &str) -> Result<serde_json::Value> {
        let client = self.client()?;
        Ok(client.inspect_container(container_id).await?)
    }

    /// Run `cmd` in a container and report it as a process outcome.
    ///
    /// `timedOut` and `canceled` are always false: the daemon call has no
    /// timeout of its own here and cannot be interrupted once started.
    pub async fn exec_in_container(
        &self,
        container_id: &str,
        cmd: &[String],
        options: &ContainerExecOptions,
    ) -> Result<ProcessOutcome> {
        let client = self.client()?;

        let mut builder = ExecConfig::builder().cmd(cmd.iter().cloned());
        if let Some(ref dir) = options.cwd {
            builder = builder.working_dir(dir.clone());
        }
        if let Some(ref user) = options.user {
            builder = builder.user(user.clone());
        }
        for (key, value) in &options.env {
            builder = builder.env(key, value);
        }
        let config = builder.build();

        info!(
            "Executing in container {}: {}",
            container_id.get(..12).unwrap_or(container_id),
            cmd.join(" ")
        );

        let start = Instant::now();
        let output = client
            .exec(container_id, &config, self.settings.stream_mode)
            .await?;

        Ok(ProcessOutcome {
            command: cmd.join(" "),
            failed: !output.success(),
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
            timed_out: false,
            canceled: false,
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        })
    }

    fn client(&self) -> Result<ContainerClient> {
        Ok(ContainerClient::connect(&self.settings)?)
    }
}
