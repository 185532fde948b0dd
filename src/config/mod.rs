use crate::error::{BabysitError, Result};
use serde::{Deserialize, Serialize};
use std::net::ToSocketAddrs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Supervisor configuration with every setting captured at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Command and arguments of the supervised child
    #[serde(default)]
    pub command: Vec<String>,

    /// Working directory for the child (defaults to the current directory)
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Stdout target: `-`/`stdout`, `stderr`, or a file path
    #[serde(default = "default_output")]
    pub stdout: String,

    /// Stderr target: `-`/`stderr`, `stdout`, or a file path
    #[serde(default = "default_output")]
    pub stderr: String,

    /// Delay between two supervision cycles (in milliseconds)
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,

    /// Time between SIGINT and SIGKILL when stopping the child (in milliseconds)
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Bind address of the status page; disabled when unset
    #[serde(default)]
    pub status_serv: Option<String>,

    /// Title of the status page
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Header background of the status page
    #[serde(default = "default_status_color")]
    pub status_color: String,

    /// Show webhook credentials and the full command line on the status page
    #[serde(default)]
    pub show_full_data: bool,

    /// Script run by the redeploy webhook
    #[serde(default)]
    pub webhook_script: Option<PathBuf>,

    /// Shared secret embedded in the webhook path
    #[serde(default)]
    pub webhook_token: Option<String>,

    /// Kernel clock tick rate used to convert CPU ticks to time
    #[serde(default = "default_clock_ticks")]
    pub clock_ticks_per_sec: u64,
}

// Default value functions for serde
fn default_output() -> String {
    "-".to_string()
}

fn default_restart_delay_ms() -> u64 {
    2000
}

fn default_grace_period_ms() -> u64 {
    500
}

fn default_service_name() -> String {
    "Babysitter".to_string()
}

fn default_status_color() -> String {
    "#F0F0F0".to_string()
}

fn default_clock_ticks() -> u64 {
    100
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            dir: None,
            stdout: default_output(),
            stderr: default_output(),
            restart_delay_ms: default_restart_delay_ms(),
            grace_period_ms: default_grace_period_ms(),
            status_serv: None,
            service_name: default_service_name(),
            status_color: default_status_color(),
            show_full_data: false,
            webhook_script: None,
            webhook_token: None,
            clock_ticks_per_sec: default_clock_ticks(),
        }
    }
}

impl SupervisorConfig {
    /// Create a configuration for the given command with all defaults
    pub fn for_command<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Load a configuration from a file (supports TOML and JSON)
    ///
    /// The result is not validated: CLI flags are usually merged on top
    /// before `validate` is called.
    pub fn from_file(path: &Path) -> Result<SupervisorConfig> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            BabysitError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("");

        let mut config = match extension {
            "toml" => Self::parse_toml(&contents)?,
            "json" => Self::parse_json(&contents)?,
            _ => {
                return Err(BabysitError::InvalidConfig(format!(
                    "Unsupported file format: {}. Use .toml or .json",
                    extension
                )))
            }
        };

        config.expand_env_vars();

        Ok(config)
    }

    fn parse_toml(contents: &str) -> Result<SupervisorConfig> {
        toml::from_str(contents)
            .map_err(|e| BabysitError::InvalidConfig(format!("Failed to parse TOML: {}", e)))
    }

    fn parse_json(contents: &str) -> Result<SupervisorConfig> {
        serde_json::from_str(contents)
            .map_err(|e| BabysitError::InvalidConfig(format!("Failed to parse JSON: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.command.is_empty() || self.command[0].is_empty() {
            return Err(BabysitError::MissingConfigField(
                "command (no command specified)".to_string(),
            ));
        }

        if let Some(ref dir) = self.dir {
            if !dir.exists() {
                return Err(BabysitError::ConfigError(format!(
                    "Working directory does not exist: {}",
                    dir.display()
                )));
            }
            if !dir.is_dir() {
                return Err(BabysitError::ConfigError(format!(
                    "Working directory is not a directory: {}",
                    dir.display()
                )));
            }
        }

        if self.grace_period_ms == 0 {
            return Err(BabysitError::ConfigError(
                "grace_period_ms must be at least 1".to_string(),
            ));
        }

        if self.clock_ticks_per_sec == 0 {
            return Err(BabysitError::ConfigError(
                "clock_ticks_per_sec must be at least 1".to_string(),
            ));
        }

        if self.status_serv.is_some() {
            self.status_bind_addr()?;
        }

        if let Some(ref token) = self.webhook_token {
            if token.is_empty() || !token.chars().all(is_url_safe) {
                return Err(BabysitError::ConfigError(
                    "webhook_token must be non-empty and only contain [A-Za-z0-9._~-]"
                        .to_string(),
                ));
            }
        }

        if let Some(ref script) = self.webhook_script {
            if !script.is_file() {
                return Err(BabysitError::ConfigError(format!(
                    "Webhook script does not exist: {}",
                    script.display()
                )));
            }
        }

        Ok(())
    }

    /// Expand environment variables in path-like fields
    fn expand_env_vars(&mut self) {
        if let Some(ref dir) = self.dir {
            self.dir = Some(Self::expand_env_in_path(dir));
        }

        if let Some(ref script) = self.webhook_script {
            self.webhook_script = Some(Self::expand_env_in_path(script));
        }

        self.stdout = Self::expand_env_in_string(&self.stdout);
        self.stderr = Self::expand_env_in_string(&self.stderr);
    }

    /// Expand `$VAR` and `${VAR}` references in a string
    ///
    /// A name runs to the longest `[A-Za-z0-9_]` sequence. References to
    /// unset variables are left as written.
    fn expand_env_in_string(s: &str) -> String {
        let mut result = String::with_capacity(s.len());
        let mut rest = s;

        while let Some(pos) = rest.find('$') {
            result.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            let (name, token_len) = match after.strip_prefix('{') {
                Some(braced) => match braced.find('}') {
                    Some(end) if is_env_name(&braced[..end]) => (&braced[..end], end + 2),
                    _ => ("", 0),
                },
                None => {
                    let end = after
                        .find(|c: char| !is_env_name_char(c))
                        .unwrap_or(after.len());
                    (&after[..end], end)
                }
            };

            match std::env::var(name) {
                Ok(value) if !name.is_empty() => result.push_str(&value),
                _ => result.push_str(&rest[pos..pos + 1 + token_len]),
            }
            rest = &after[token_len..];
        }

        result.push_str(rest);
        result
    }

    fn expand_env_in_path(path: &Path) -> PathBuf {
        let path_str = path.to_string_lossy();
        PathBuf::from(Self::expand_env_in_string(&path_str))
    }

    /// Working directory of the child, falling back to the current directory
    pub fn working_dir(&self) -> Result<PathBuf> {
        match self.dir {
            Some(ref dir) => Ok(dir.clone()),
            None => Ok(std::env::current_dir()?),
        }
    }

    /// Whether the redeploy webhook should be mounted
    pub fn webhook_installed(&self) -> bool {
        self.webhook_script.is_some() && self.webhook_token.is_some()
    }

    /// Status listen address, expanding the `:port` shorthand to all interfaces
    ///
    /// Host names are allowed. The address must resolve, but binding happens
    /// later in the status server.
    pub fn status_bind_addr(&self) -> Result<Option<String>> {
        let Some(ref raw) = self.status_serv else {
            return Ok(None);
        };

        let normalized = if raw.starts_with(':') {
            format!("0.0.0.0{}", raw)
        } else {
            raw.clone()
        };

        let mut resolved = normalized.to_socket_addrs().map_err(|e| {
            BabysitError::ConfigError(format!("Invalid status address '{}': {}", raw, e))
        })?;
        if resolved.next().is_none() {
            return Err(BabysitError::ConfigError(format!(
                "Status address '{}' did not resolve",
                raw
            )));
        }

        Ok(Some(normalized))
    }

    /// Get restart delay as Duration
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    /// Get the SIGINT to SIGKILL escalation window as Duration
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }
}

fn is_env_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_env_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(is_env_name_char)
}

fn is_url_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '~' | '-')
}
