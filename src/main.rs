use action_executor::cli::{Args, ConfigDiscovery, ExecutionMode, RequestInput, RunConfig};
use action_executor::{ActionExecutor, ExecutorConfig, env};
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mode = match args.mode() {
        Ok(mode) => mode,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let verbose = matches!(mode, ExecutionMode::Run(RunConfig { verbose: true, .. }));
    init_logging(verbose);

    match mode {
        ExecutionMode::Run(config) => {
            let success = run(config).await?;
            if !success {
                std::process::exit(1);
            }
            Ok(())
        }
        ExecutionMode::ShowConfig { config_override } => show_config(config_override.as_deref()),
        ExecutionMode::Check { config_override } => check(config_override.as_deref()).await,
    }
}

// Logs go to stderr; stdout only carries the result
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("action_executor=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env::DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(config_override: Option<&Path>) -> Result<ExecutorConfig> {
    ConfigDiscovery::load(config_override).map_err(|e| anyhow::anyhow!("Failed to load configuration: {e}"))
}

async fn run(config: RunConfig) -> Result<bool> {
    let executor_config = load_config(config.config_override.as_deref())?;
    let executor = ActionExecutor::new(executor_config);

    let input = match config.input {
        RequestInput::Stdin => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read request from stdin")?;
            buf
        }
        RequestInput::File(ref path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read request file {:?}", path))?,
    };

    let result = executor.execute_json(&input).await;
    println!("{}", result.to_pretty_string());

    if result.is_success() {
        info!("Action '{}' completed", result.kind);
    } else {
        error!("Action '{}' returned an error payload", result.kind);
    }
    Ok(result.is_success())
}

fn show_config(config_override: Option<&Path>) -> Result<()> {
    ConfigDiscovery::show_discovery_info(config_override);

    let config = load_config(config_override)?;
    println!();
    println!("Resolved configuration:");
    println!();
    print!(
        "{}",
        config
            .to_toml_string()
            .context("Failed to render configuration")?
    );
    Ok(())
}

async fn check(config_override: Option<&Path>) -> Result<()> {
    let config = load_config(config_override)?;
    let mut healthy = true;

    match which::which(&config.script.interpreter) {
        Ok(path) => println!("interpreter: {} ({:?})", config.script.interpreter, path),
        Err(e) => {
            healthy = false;
            println!("interpreter: {} NOT FOUND ({})", config.script.interpreter, e);
        }
    }

    healthy &= check_container_daemon(&config).await;

    if !healthy {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(feature = "containers")]
async fn check_container_daemon(config: &ExecutorConfig) -> bool {
    let handler = action_executor::executor::ContainerHandler::new(config.container.clone());
    let endpoint = config
        .container
        .endpoint
        .as_deref()
        .unwrap_or("local default");

    match handler.ping().await {
        Ok(()) => {
            println!("container daemon: {} reachable", endpoint);
            true
        }
        Err(e) => {
            println!("container daemon: {} UNREACHABLE ({})", endpoint, e);
            false
        }
    }
}

#[cfg(not(feature = "containers"))]
async fn check_container_daemon(_config: &ExecutorConfig) -> bool {
    println!("container daemon: support not compiled in");
    true
}
