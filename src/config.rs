use crate::error::{ErrorContext, LabError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

pub const DEFAULT_HOST: &str = "https://gitlab.com";

pub const ENV_TOKEN: &str = "LABCTL_TOKEN";
pub const ENV_TOKEN_FALLBACK: &str = "GITLAB_TOKEN";
pub const ENV_HOST: &str = "LABCTL_HOST";
pub const ENV_CONFIG: &str = "LABCTL_CONFIG";

/// Bearer credential for the hosting service.
///
/// Cloning shares the underlying string, so every request of one invocation
/// points at the same token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token(Arc<str>);

impl Token {
    /// Wrap a raw credential, rejecting blank values
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(Arc::from(trimmed)))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

/// Contents of `~/.labctl/config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
}

impl FileConfig {
    /// Load the config file, treating a missing file as empty
    pub fn load_from(path: &Path) -> Result<Self, LabError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).lab_config_err(format!(
            "Failed to read configuration file at {}",
            path.display()
        ))?;

        let config: Self =
            toml::from_str(&contents).lab_config_err("Failed to parse configuration file")?;

        Ok(config)
    }

    pub fn default_path() -> Result<PathBuf, LabError> {
        let home_dir = dirs::home_dir().ok_or_else(|| {
            LabError::Configuration("Could not determine home directory".to_string())
        })?;
        Ok(home_dir.join(".labctl").join("config.toml"))
    }
}

/// Values taken from command-line flags
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub token: Option<String>,
    pub host: Option<String>,
}

/// Snapshot of the environment variables the resolver looks at.
///
/// Read once at startup so the resolver itself stays a pure function.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub token: Option<String>,
    pub host: Option<String>,
    pub config_path: Option<PathBuf>,
}

impl Environment {
    pub fn from_process() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        Self {
            token: var(ENV_TOKEN).or_else(|| var(ENV_TOKEN_FALLBACK)),
            host: var(ENV_HOST),
            config_path: var(ENV_CONFIG).map(PathBuf::from),
        }
    }

    /// Config file location: `$LABCTL_CONFIG` or `~/.labctl/config.toml`
    pub fn config_file(&self) -> Result<PathBuf, LabError> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => FileConfig::default_path(),
        }
    }
}

/// Resolved settings for one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: Url,
    pub token: Option<Token>,
}

impl Settings {
    /// Merge flag, environment and file layers, in that order of precedence
    pub fn resolve(
        flags: &Overrides,
        env: &Environment,
        file: &FileConfig,
    ) -> Result<Self, LabError> {
        let layers = [
            ("--token", &flags.token),
            (ENV_TOKEN, &env.token),
            ("config file", &file.token),
        ];
        let token = layers.into_iter().find_map(|(layer, raw)| {
            let raw = raw.as_deref()?;
            let token = Token::new(raw);
            if token.is_none() {
                tracing::warn!(layer, "ignoring blank token");
            }
            token
        });

        let host = [&flags.host, &env.host, &file.host]
            .into_iter()
            .flatten()
            .map(|h| h.trim())
            .find(|h| !h.is_empty())
            .unwrap_or(DEFAULT_HOST);

        Ok(Self {
            host: Self::validate_url(host)?,
            token,
        })
    }

    /// Read the config file named by `env` and resolve against it
    pub fn load(flags: &Overrides, env: &Environment) -> Result<Self, LabError> {
        let path = env.config_file()?;
        let file = FileConfig::load_from(&path)?;
        Self::resolve(flags, env, &file)
    }

    pub fn require_token(&self) -> Result<&Token, LabError> {
        self.token.as_ref().ok_or_else(|| {
            LabError::Configuration(format!(
                "No access token found; pass --token, set {ENV_TOKEN}, \
                 or add `token` to the config file"
            ))
        })
    }

    fn validate_url(url_str: &str) -> Result<Url, LabError> {
        let url = Url::parse(url_str)
            .map_err(|e| LabError::Configuration(format!("Invalid URL '{url_str}': {e}")))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(LabError::Configuration(format!(
                "Invalid URL scheme '{scheme}': only HTTP and HTTPS are supported"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(token: Option<&str>, host: Option<&str>) -> Overrides {
        Overrides {
            token: token.map(str::to_string),
            host: host.map(str::to_string),
        }
    }

    fn env(token: Option<&str>, host: Option<&str>) -> Environment {
        Environment {
            token: token.map(str::to_string),
            host: host.map(str::to_string),
            config_path: None,
        }
    }

    fn file(token: Option<&str>, host: Option<&str>) -> FileConfig {
        FileConfig {
            token: token.map(str::to_string),
            host: host.map(str::to_string),
        }
    }

    #[test]
    fn test_flag_token_wins() {
        let settings = Settings::resolve(
            &flags(Some("flag"), None),
            &env(Some("env"), None),
            &file(Some("file"), None),
        )
        .unwrap();
        assert_eq!(settings.token.unwrap().as_str(), "flag");
    }

    #[test]
    fn test_env_token_beats_file() {
        let settings = Settings::resolve(
            &flags(None, None),
            &env(Some("env"), None),
            &file(Some("file"), None),
        )
        .unwrap();
        assert_eq!(settings.token.unwrap().as_str(), "env");
    }

    #[test]
    fn test_file_token_used_last() {
        let settings =
            Settings::resolve(&flags(None, None), &env(None, None), &file(Some("file"), None))
                .unwrap();
        assert_eq!(settings.token.unwrap().as_str(), "file");
    }

    #[test]
    fn test_blank_token_falls_through() {
        let settings = Settings::resolve(
            &flags(Some("   "), None),
            &env(None, None),
            &file(Some("file"), None),
        )
        .unwrap();
        assert_eq!(settings.token.unwrap().as_str(), "file");
    }

    #[test]
    fn test_missing_token_is_configuration_error() {
        let settings =
            Settings::resolve(&flags(None, None), &env(None, None), &file(None, None)).unwrap();
        assert!(settings.token.is_none());
        assert!(matches!(
            settings.require_token(),
            Err(LabError::Configuration(_))
        ));
    }

    #[test]
    fn test_default_host() {
        let settings =
            Settings::resolve(&flags(None, None), &env(None, None), &file(None, None)).unwrap();
        assert_eq!(settings.host.as_str(), "https://gitlab.com/");
    }

    #[test]
    fn test_host_precedence() {
        let settings = Settings::resolve(
            &flags(None, None),
            &env(None, Some("https://env.example.com")),
            &file(None, Some("https://file.example.com")),
        )
        .unwrap();
        assert_eq!(settings.host.host_str(), Some("env.example.com"));
    }

    #[test]
    fn test_token_debug_is_redacted() {
        let token = Token::new("glpat-secret").unwrap();
        assert!(!format!("{token:?}").contains("secret"));
    }

    #[test]
    fn test_url_validation() {
        assert!(Settings::validate_url("https://gitlab.example.com").is_ok());
        assert!(Settings::validate_url("http://localhost:8080").is_ok());

        assert!(Settings::validate_url("ftp://example.com").is_err());
        assert!(Settings::validate_url("file:///etc/passwd").is_err());
        assert!(Settings::validate_url("not-a-url").is_err());
        assert!(Settings::validate_url("").is_err());
    }

    #[test]
    fn test_parse_valid_toml() {
        let toml_content = r#"
token = "glpat-abc"
host = "https://gitlab.example.com"
"#;

        let config: FileConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.token.as_deref(), Some("glpat-abc"));
        assert_eq!(config.host.as_deref(), Some("https://gitlab.example.com"));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn test_parse_malformed_toml() {
        let result: Result<FileConfig, _> = toml::from_str("token = \"unterminated");
        assert!(result.is_err());
    }
}
