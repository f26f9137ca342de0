//! # Action Executor
//!
//! Executes heterogeneous operational actions (filesystem, local command,
//! container, remote shell, script) behind one entry point, and reports
//! every outcome in a single normalized result envelope.
//!
//! ## Architecture Overview
//!
//! - **[`action`]**: request wire types, validation into typed requests, and
//!   the result envelope
//! - **[`executor`]**: the dispatcher and one handler per backend
//! - **`container`**: container daemon client (`containers` feature)
//! - **[`error`]**: the error taxonomy shared by every backend
//! - **[`cli`]**: argument parsing and configuration discovery for `actx`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use action_executor::{ActionExecutor, ExecutorConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let executor = ActionExecutor::new(ExecutorConfig::default());
//!
//!     let result = executor
//!         .execute_value(json!({
//!             "kind": "filesystem",
//!             "parameters": { "operation": "pathExists", "path": "/tmp" }
//!         }))
//!         .await;
//!
//!     println!("{}", result);
//! }
//! ```

/// Request and result types.
///
/// Raw requests, their validation into typed requests, and the result
/// envelope every invocation returns.
pub mod action;

/// Action dispatch and backend handlers.
pub mod executor;

/// Container daemon access (requires `containers` feature).
#[cfg(feature = "containers")]
pub mod container;

/// Error taxonomy.
pub mod error;

/// Environment constants and path utilities.
///
/// Centralizes the file names, directory names and defaults used by
/// configuration discovery and the handlers.
pub mod env;

// CLI module for command-line interface
pub mod cli;

pub use action::{
    ActionFailure, ActionKind, ActionOutcome, ActionPayload, ActionRequest, ActionResult,
    RawActionRequest, RequestValidator,
};
pub use error::{ActionError, ErrorKind};
pub use executor::{ActionExecutor, ExecStreamMode, ExecutionCommand, ExecutorConfig, Timeout};
