//! Remote shell actions over SSH.
//!
//! Every call opens a fresh session, authenticates, runs exactly one command
//! on a session channel and disconnects. Host keys are accepted without
//! verification; the fingerprint is logged at debug level.

use crate::action::{RemoteCredentials, RemoteOutcome, RemoteShellAction};
use crate::error::{ActionError, Result};
use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::{ChannelMsg, Disconnect, Sig};
use russh_keys::key;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct ClientHandler {
    host: String,
}

#[async_trait]
impl client::Handler for ClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        debug!(
            "Accepting host key for {}: {}",
            self.host,
            server_public_key.fingerprint()
        );
        Ok(true)
    }
}

/// Runs single commands on remote hosts
#[derive(Debug, Clone, Default)]
pub struct RemoteShellHandler;

impl RemoteShellHandler {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(&self, action: &RemoteShellAction) -> Result<RemoteOutcome> {
        // Decode before dialing so a bad key never costs a connection
        let key_pair = decode_key(&action.credentials)?;

        let mut session = self.connect(action).await?;
        let outcome = match authenticate(&mut session, action, key_pair).await {
            Ok(()) => run_command(&session, &action.command).await,
            Err(e) => Err(e),
        };

        if let Err(e) = session
            .disconnect(Disconnect::ByApplication, "", "English")
            .await
        {
            debug!("Disconnect from {} failed: {}", action.host, e);
        }

        outcome
    }

    async fn connect(&self, action: &RemoteShellAction) -> Result<Handle<ClientHandler>> {
        let config = Arc::new(client::Config::default());
        let handler = ClientHandler {
            host: action.host.clone(),
        };

        info!(
            "Connecting to {}@{}:{}",
            action.username, action.host, action.port
        );

        client::connect(config, (action.host.as_str(), action.port), handler)
            .await
            .map_err(|e| {
                ActionError::connection(
                    format!("Failed to connect to {}:{}", action.host, action.port),
                    Some(e.to_string()),
                )
            })
    }
}

fn decode_key(credentials: &RemoteCredentials) -> Result<Option<key::KeyPair>> {
    let Some(ref private_key) = credentials.private_key else {
        return Ok(None);
    };

    russh_keys::decode_secret_key(private_key, credentials.passphrase.as_deref())
        .map(Some)
        .map_err(|e| ActionError::validation(format!("Invalid private key: {e}")))
}

async fn authenticate(
    session: &mut Handle<ClientHandler>,
    action: &RemoteShellAction,
    key_pair: Option<key::KeyPair>,
) -> Result<()> {
    let username = action.username.as_str();
    let auth_error =
        |e: russh::Error| ActionError::connection("Authentication failed", Some(e.to_string()));

    if let Some(key_pair) = key_pair {
        if session
            .authenticate_publickey(username, Arc::new(key_pair))
            .await
            .map_err(auth_error)?
        {
            debug!("Authenticated {} with public key", username);
            return Ok(());
        }
        warn!("Public key rejected for {}@{}", username, action.host);
    }

    if let Some(ref password) = action.credentials.password {
        if session
            .authenticate_password(username, password)
            .await
            .map_err(auth_error)?
        {
            debug!("Authenticated {} with password", username);
            return Ok(());
        }
    }

    Err(ActionError::connection(
        "Authentication failed",
        Some(format!("{}@{} rejected all credentials", username, action.host)),
    ))
}

async fn run_command(session: &Handle<ClientHandler>, command: &str) -> Result<RemoteOutcome> {
    let mut channel = session
        .channel_open_session()
        .await
        .map_err(|e| ActionError::connection("Failed to open session channel", Some(e.to_string())))?;

    channel
        .exec(true, command)
        .await
        .map_err(|e| ActionError::backend("Failed to start remote command", Some(e.to_string())))?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_code = None;
    let mut signal = None;

    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { ref data } => stdout.extend_from_slice(data),
            ChannelMsg::ExtendedData { ref data, .. } => stderr.extend_from_slice(data),
            ChannelMsg::ExitStatus { exit_status } => exit_code = Some(i64::from(exit_status)),
            ChannelMsg::ExitSignal { signal_name, .. } => signal = Some(signal_label(&signal_name)),
            _ => {}
        }
    }

    debug!(
        "Remote command finished: exit={:?} signal={:?}",
        exit_code, signal
    );

    Ok(RemoteOutcome {
        output: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_code,
        signal,
    })
}

/// Bare signal name, e.g. `TERM`.
fn signal_label(sig: &Sig) -> String {
    match sig {
        Sig::Custom(name) => name.clone(),
        other => format!("{other:?}"),
    }
}
