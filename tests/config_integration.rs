use labctl::config::{
    DEFAULT_HOST, ENV_CONFIG, ENV_HOST, ENV_TOKEN, ENV_TOKEN_FALLBACK, Environment, FileConfig,
    Overrides, Settings,
};
use labctl::error::LabError;
use serial_test::serial;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn setup_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_dir = temp_dir.path().join(".labctl");
    fs::create_dir_all(&config_dir).unwrap();

    let config_path = config_dir.join("config.toml");
    fs::write(&config_path, content).unwrap();

    (temp_dir, config_path)
}

fn env_with_file(path: PathBuf) -> Environment {
    Environment {
        config_path: Some(path),
        ..Environment::default()
    }
}

#[test]
fn test_fixture_valid_config() {
    let config = FileConfig::load_from("tests/fixtures/valid_config.toml".as_ref()).unwrap();

    assert_eq!(config.token.as_deref(), Some("glpat-from-fixture"));
    assert_eq!(config.host.as_deref(), Some("https://gitlab.example.com"));
}

#[test]
fn test_fixture_token_only_uses_default_host() {
    let env = env_with_file(PathBuf::from("tests/fixtures/token_only_config.toml"));
    let settings = Settings::load(&Overrides::default(), &env).unwrap();

    assert_eq!(settings.host.as_str(), format!("{DEFAULT_HOST}/"));
    assert_eq!(settings.require_token().unwrap().as_str(), "glpat-token-only");
}

#[test]
fn test_fixture_invalid_host_is_rejected() {
    let env = env_with_file(PathBuf::from("tests/fixtures/invalid_host_config.toml"));
    let result = Settings::load(&Overrides::default(), &env);

    match result {
        Err(LabError::Configuration(msg)) => assert!(msg.contains("ftp")),
        other => panic!("Expected Configuration error, got {other:?}"),
    }
}

#[test]
fn test_load_settings_from_temp_file() {
    let (_temp_dir, path) = setup_test_config(
        r#"
token = "glpat-file"
host = "https://git.internal.test"
"#,
    );

    let settings = Settings::load(&Overrides::default(), &env_with_file(path)).unwrap();
    assert_eq!(settings.host.as_str(), "https://git.internal.test/");
    assert_eq!(settings.token.unwrap().as_str(), "glpat-file");
}

#[test]
fn test_flags_and_env_beat_file() {
    let (_temp_dir, path) = setup_test_config(
        r#"
token = "glpat-file"
host = "https://file.test"
"#,
    );
    let env = Environment {
        token: Some("glpat-env".to_string()),
        host: Some("https://env.test".to_string()),
        config_path: Some(path),
    };
    let flags = Overrides {
        token: Some("glpat-flag".to_string()),
        host: None,
    };

    let settings = Settings::load(&flags, &env).unwrap();
    assert_eq!(settings.token.unwrap().as_str(), "glpat-flag");
    assert_eq!(settings.host.as_str(), "https://env.test/");
}

#[test]
fn test_missing_file_is_not_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let env = env_with_file(temp_dir.path().join("absent.toml"));

    let settings = Settings::load(&Overrides::default(), &env).unwrap();
    assert!(settings.token.is_none());
    assert!(settings.require_token().is_err());
}

#[test]
fn test_malformed_toml() {
    let (_temp_dir, path) = setup_test_config("token = [unclosed");

    let result = Settings::load(&Overrides::default(), &env_with_file(path));
    match result {
        Err(LabError::Configuration(msg)) => {
            assert!(msg.contains("Failed to parse configuration file"))
        }
        other => panic!("Expected Configuration error, got {other:?}"),
    }
}

#[test]
fn test_unknown_keys_are_ignored() {
    let (_temp_dir, path) = setup_test_config(
        r#"
token = "glpat-file"
editor = "vim"
"#,
    );

    let settings = Settings::load(&Overrides::default(), &env_with_file(path)).unwrap();
    assert_eq!(settings.token.unwrap().as_str(), "glpat-file");
}

#[test]
fn test_file_config_serialization_roundtrip() {
    let original = FileConfig {
        token: Some("glpat-round".to_string()),
        host: Some("https://gitlab.example.com".to_string()),
    };

    let serialized = toml::to_string(&original).unwrap();
    let deserialized: FileConfig = toml::from_str(&serialized).unwrap();

    assert_eq!(original, deserialized);
}

fn clear_env() {
    // SAFETY: every test touching the process environment is #[serial]
    unsafe {
        for name in [ENV_TOKEN, ENV_TOKEN_FALLBACK, ENV_HOST, ENV_CONFIG] {
            std::env::remove_var(name);
        }
    }
}

#[test]
#[serial]
fn test_environment_from_process() {
    clear_env();
    unsafe {
        std::env::set_var(ENV_TOKEN, "glpat-primary");
        std::env::set_var(ENV_TOKEN_FALLBACK, "glpat-fallback");
        std::env::set_var(ENV_HOST, "https://env.example.com");
        std::env::set_var(ENV_CONFIG, "/tmp/labctl-test.toml");
    }

    let env = Environment::from_process();
    clear_env();

    assert_eq!(env.token.as_deref(), Some("glpat-primary"));
    assert_eq!(env.host.as_deref(), Some("https://env.example.com"));
    assert_eq!(env.config_file().unwrap(), PathBuf::from("/tmp/labctl-test.toml"));
}

#[test]
#[serial]
fn test_environment_falls_back_to_gitlab_token() {
    clear_env();
    unsafe {
        std::env::set_var(ENV_TOKEN, "   ");
        std::env::set_var(ENV_TOKEN_FALLBACK, "glpat-fallback");
    }

    let env = Environment::from_process();
    clear_env();

    assert_eq!(env.token.as_deref(), Some("glpat-fallback"));
    assert!(env.host.is_none());
    assert!(env.config_path.is_none());
}
