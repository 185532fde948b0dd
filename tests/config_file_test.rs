// Integration test for configuration file support

use babysit::cli::Cli;
use babysit::config::SupervisorConfig;
use babysit::error::BabysitError;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_load_toml_config() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("babysit.toml");

    let toml_content = r##"
        command = ["/usr/bin/server", "--port", "8080"]
        dir = "/tmp"
        stdout = "/var/log/server.out"
        stderr = "stdout"
        restart_delay_ms = 250
        grace_period_ms = 1500
        status_serv = ":7000"
        service_name = "API server"
        status_color = "#336699"
        show_full_data = true
        webhook_script = "/opt/deploy.sh"
        webhook_token = "abc123"
        clock_ticks_per_sec = 250
    "##;

    fs::write(&config_path, toml_content).unwrap();

    let config = SupervisorConfig::from_file(&config_path).unwrap();
    assert_eq!(config.command, vec!["/usr/bin/server", "--port", "8080"]);
    assert_eq!(config.dir, Some(PathBuf::from("/tmp")));
    assert_eq!(config.stdout, "/var/log/server.out");
    assert_eq!(config.stderr, "stdout");
    assert_eq!(config.restart_delay_ms, 250);
    assert_eq!(config.grace_period_ms, 1500);
    assert_eq!(config.status_serv.as_deref(), Some(":7000"));
    assert_eq!(config.service_name, "API server");
    assert_eq!(config.status_color, "#336699");
    assert!(config.show_full_data);
    assert_eq!(config.webhook_script, Some(PathBuf::from("/opt/deploy.sh")));
    assert_eq!(config.webhook_token.as_deref(), Some("abc123"));
    assert_eq!(config.clock_ticks_per_sec, 250);
    assert!(config.webhook_installed());
}

#[test]
fn test_load_json_config_with_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("babysit.json");

    let json_content = r#"
    {
        "command": ["/bin/sleep", "100"]
    }
    "#;

    fs::write(&config_path, json_content).unwrap();

    let config = SupervisorConfig::from_file(&config_path).unwrap();
    assert_eq!(config.command, vec!["/bin/sleep", "100"]);
    assert_eq!(config.restart_delay_ms, 2000);
    assert_eq!(config.grace_period_ms, 500);
    assert_eq!(config.stdout, "-");
    assert!(config.status_serv.is_none());
    assert!(!config.webhook_installed());
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_toml_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("broken.toml");

    fs::write(&config_path, "command = [\"unterminated\"\n").unwrap();

    assert!(matches!(
        SupervisorConfig::from_file(&config_path),
        Err(BabysitError::InvalidConfig(_))
    ));
}

#[test]
fn test_wrong_field_type_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("babysit.json");

    fs::write(&config_path, r#"{"command": ["app"], "restart_delay_ms": "soon"}"#).unwrap();

    assert!(SupervisorConfig::from_file(&config_path).is_err());
}

#[test]
fn test_file_with_invalid_token_fails_validation() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("babysit.toml");

    fs::write(
        &config_path,
        "command = [\"app\"]\nwebhook_token = \"not/allowed\"\n",
    )
    .unwrap();

    let config = SupervisorConfig::from_file(&config_path).unwrap();
    assert!(config.validate().is_err());
}

#[test]
fn test_cli_flags_override_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("babysit.toml");

    fs::write(
        &config_path,
        "command = [\"/bin/from-file\"]\nservice_name = \"From file\"\nrestart_delay_ms = 9000\n",
    )
    .unwrap();

    let cli = Cli::try_parse_from([
        "babysit",
        "--config",
        config_path.to_str().unwrap(),
        "--service-name",
        "From flags",
        "/bin/from-cli",
        "arg",
    ])
    .unwrap();

    let config = cli.into_config().unwrap();
    assert_eq!(config.command, vec!["/bin/from-cli", "arg"]);
    assert_eq!(config.service_name, "From flags");
    assert_eq!(config.restart_delay_ms, 9000);
}
