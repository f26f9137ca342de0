use action_executor::cli::ConfigDiscovery;
use action_executor::{ActionExecutor, ExecStreamMode, ExecutorConfig, RawActionRequest};
use serde_json::json;
use tempfile::{NamedTempFile, TempDir};

#[test]
fn test_config_serialization_roundtrip() {
    let mut original_config = ExecutorConfig::default();
    original_config.command.default_timeout_ms = Some(5_000);
    original_config.script.interpreter = "bash".to_string();
    original_config.script.interpreter_args = vec!["-e".to_string()];
    original_config.container.endpoint = Some("tcp://127.0.0.1:2375".to_string());
    original_config.container.stream_mode = ExecStreamMode::Combined;
    original_config.remote_shell.default_port = 2222;

    let toml_str = original_config
        .to_toml_string()
        .expect("Should be able to serialize config to TOML");
    assert!(toml_str.contains("[script]"), "Should contain script section");
    assert!(toml_str.contains("stream_mode = \"combined\""));

    let deserialized_config = ExecutorConfig::from_toml_str(&toml_str)
        .expect("Should be able to deserialize TOML string");
    assert_eq!(original_config, deserialized_config);
}

#[test]
fn test_config_file_operations() {
    let original_config = ExecutorConfig::default();

    let temp_file = NamedTempFile::new().expect("Should be able to create temporary file");
    let temp_path = temp_file.path();

    original_config
        .to_toml_file(temp_path)
        .expect("Should be able to save config to file");

    let loaded_config =
        ExecutorConfig::from_toml_file(temp_path).expect("Should be able to load config from file");
    assert_eq!(original_config, loaded_config);
}

#[test]
fn test_partial_config_uses_defaults() {
    let config = ExecutorConfig::from_toml_str(
        r#"
[container]
endpoint = "unix:///run/podman/podman.sock"
"#,
    )
    .expect("Partial config should parse");

    assert_eq!(
        config.container.endpoint.as_deref(),
        Some("unix:///run/podman/podman.sock")
    );
    assert_eq!(config.container.timeout_secs, 120);
    assert_eq!(config.container.stream_mode, ExecStreamMode::Demultiplexed);
    assert_eq!(config.script.interpreter, "sh");
    assert_eq!(config.remote_shell.default_port, 22);
    assert_eq!(config.command.default_timeout_ms, None);
}

#[test]
fn test_invalid_toml_rejected() {
    assert!(ExecutorConfig::from_toml_str("[container\nendpoint = 1").is_err());
    assert!(ExecutorConfig::from_toml_str("[container]\nstream_mode = \"sideways\"").is_err());
}

#[test]
fn test_discovery_override() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("override.toml");
    std::fs::write(&path, "[remote_shell]\ndefault_port = 2200\n").unwrap();

    let config = ConfigDiscovery::load(Some(&path)).expect("Override should load");
    assert_eq!(config.remote_shell.default_port, 2200);
}

#[tokio::test]
async fn test_default_timeout_from_config_applies() {
    let config = ExecutorConfig::from_toml_str("[command]\ndefault_timeout_ms = 100\n").unwrap();
    let executor = ActionExecutor::new(config);

    let result = executor
        .execute(RawActionRequest::new(
            "command",
            json!({"command": "sleep", "args": ["5"]}),
        ))
        .await;
    assert!(result.process().unwrap().timed_out);
}

#[tokio::test]
async fn test_zero_timeout_in_request_beats_configured_default() {
    let config = ExecutorConfig::from_toml_str("[command]\ndefault_timeout_ms = 100\n").unwrap();
    let executor = ActionExecutor::new(config);

    let result = executor
        .execute(RawActionRequest::new(
            "command",
            json!({"command": "sleep", "args": ["0.5"], "options": {"timeout": 0}}),
        ))
        .await;

    let outcome = result.process().unwrap();
    assert!(!outcome.timed_out);
    assert_eq!(outcome.exit_code, Some(0));
}

#[tokio::test]
async fn test_configured_interpreter_used_for_scripts() {
    let temp_dir = TempDir::new().unwrap();
    let config = ExecutorConfig::from_toml_str(&format!(
        "[script]\ninterpreter = \"sh\"\ninterpreter_args = [\"-e\"]\ntemp_dir = {:?}\n",
        temp_dir.path().display().to_string()
    ))
    .unwrap();
    let executor = ActionExecutor::new(config);

    let result = executor
        .execute(RawActionRequest::new(
            "script",
            json!({"scriptContent": "false\necho unreachable"}),
        ))
        .await;

    let outcome = result.process().unwrap();
    assert_eq!(outcome.exit_code, Some(1));
    assert!(!outcome.stdout.contains("unreachable"));
}
