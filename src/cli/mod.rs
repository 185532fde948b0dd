// CLI module - flag parsing and the program entry point

use crate::config::SupervisorConfig;
use crate::daemon::Daemon;
use crate::error::Result;
use clap::Parser;
use std::path::PathBuf;

/// babysit - keep one command running, restart it when it exits
#[derive(Parser, Debug)]
#[command(name = "babysit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// TOML or JSON file with the same keys as the flags (flags win)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Working directory of the child (defaults to the current directory)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Where the child's stdout goes: `-`, `stdout`, `stderr`, or a file
    #[arg(long)]
    pub stdout: Option<String>,

    /// Where the child's stderr goes: `-`, `stderr`, `stdout`, or a file
    #[arg(long)]
    pub stderr: Option<String>,

    /// Delay between restarts in milliseconds [default: 2000]
    #[arg(long)]
    pub restart_delay_ms: Option<u64>,

    /// Time between SIGINT and SIGKILL in milliseconds [default: 500]
    #[arg(long)]
    pub grace_period_ms: Option<u64>,

    /// Serve the status page on this address, e.g. `:7000`
    #[arg(long)]
    pub status_serv: Option<String>,

    /// Title of the status page [default: Babysitter]
    #[arg(long)]
    pub service_name: Option<String>,

    /// Header color of the status page [default: #F0F0F0]
    #[arg(long)]
    pub status_color: Option<String>,

    /// Show the full command line and webhook settings on the status page
    ///
    /// A value must be attached with `=`, e.g. `--show-full-data=false`.
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub show_full_data: Option<bool>,

    /// Script run by the redeploy webhook
    #[arg(long)]
    pub webhook_script: Option<PathBuf>,

    /// Token in the webhook path (`/webhook/<token>`)
    #[arg(long)]
    pub webhook_token: Option<String>,

    /// Kernel clock ticks per second [default: 100]
    #[arg(long = "clock-ticks")]
    pub clock_ticks_per_sec: Option<u64>,

    /// Command to supervise, with its arguments
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Cli {
    /// Build the configuration and supervise until shutdown
    pub async fn run(self) -> Result<()> {
        let config = self.into_config()?;
        Daemon::new(config)?.start().await
    }

    /// Merge the flags over the config file (or the defaults)
    ///
    /// The result is not validated yet.
    pub fn into_config(self) -> Result<SupervisorConfig> {
        let mut config = match self.config {
            Some(ref path) => SupervisorConfig::from_file(path)?,
            None => SupervisorConfig::default(),
        };

        if !self.command.is_empty() {
            config.command = self.command;
        }
        if let Some(dir) = self.dir {
            config.dir = Some(dir);
        }
        if let Some(stdout) = self.stdout {
            config.stdout = stdout;
        }
        if let Some(stderr) = self.stderr {
            config.stderr = stderr;
        }
        if let Some(delay) = self.restart_delay_ms {
            config.restart_delay_ms = delay;
        }
        if let Some(grace) = self.grace_period_ms {
            config.grace_period_ms = grace;
        }
        if let Some(addr) = self.status_serv {
            config.status_serv = Some(addr);
        }
        if let Some(name) = self.service_name {
            config.service_name = name;
        }
        if let Some(color) = self.status_color {
            config.status_color = color;
        }
        if let Some(show) = self.show_full_data {
            config.show_full_data = show;
        }
        if let Some(script) = self.webhook_script {
            config.webhook_script = Some(script);
        }
        if let Some(token) = self.webhook_token {
            config.webhook_token = Some(token);
        }
        if let Some(ticks) = self.clock_ticks_per_sec {
            config.clock_ticks_per_sec = ticks;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("babysit").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = parse(&["/bin/sleep", "10"]).into_config().unwrap();

        assert_eq!(config.command, vec!["/bin/sleep", "10"]);
        assert_eq!(config.restart_delay_ms, 2000);
        assert_eq!(config.grace_period_ms, 500);
        assert_eq!(config.stdout, "-");
        assert_eq!(config.stderr, "-");
        assert_eq!(config.service_name, "Babysitter");
        assert!(!config.show_full_data);
        assert!(config.status_serv.is_none());
    }

    #[test]
    fn test_flags_before_command() {
        let config = parse(&[
            "--restart-delay-ms",
            "100",
            "--status-serv",
            ":7000",
            "--stdout",
            "/tmp/out.log",
            "--clock-ticks",
            "250",
            "server",
            "--port",
            "8080",
        ])
        .into_config()
        .unwrap();

        assert_eq!(config.restart_delay_ms, 100);
        assert_eq!(config.status_serv.as_deref(), Some(":7000"));
        assert_eq!(config.stdout, "/tmp/out.log");
        assert_eq!(config.clock_ticks_per_sec, 250);
        // Flags after the program belong to the child
        assert_eq!(config.command, vec!["server", "--port", "8080"]);
    }

    #[test]
    fn test_double_dash_separator() {
        let config = parse(&["--", "-weird-name", "arg"]).into_config().unwrap();
        assert_eq!(config.command, vec!["-weird-name", "arg"]);
    }

    #[test]
    fn test_show_full_data_forms() {
        let bare = parse(&["--show-full-data", "--", "app"]).into_config().unwrap();
        assert!(bare.show_full_data);

        let explicit = parse(&["--show-full-data=false", "app"]).into_config().unwrap();
        assert!(!explicit.show_full_data);

        let equals = parse(&["--show-full-data=true", "app"]).into_config().unwrap();
        assert!(equals.show_full_data);
    }

    #[test]
    fn test_bare_show_full_data_keeps_command() {
        let config = parse(&["--show-full-data", "/bin/true", "--verbose"])
            .into_config()
            .unwrap();

        assert!(config.show_full_data);
        assert_eq!(config.command, vec!["/bin/true", "--verbose"]);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
command = ["/usr/bin/from-file"]
restart_delay_ms = 5000
service_name = "From file"
"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = parse(&["--config", &path, "--restart-delay-ms", "10"])
            .into_config()
            .unwrap();

        assert_eq!(config.command, vec!["/usr/bin/from-file"]);
        assert_eq!(config.restart_delay_ms, 10);
        assert_eq!(config.service_name, "From file");
    }

    #[test]
    fn test_missing_config_file() {
        let file = NamedTempFile::new().unwrap();
        let path = file.path().with_extension("toml");

        let cli = parse(&["--config", path.to_str().unwrap(), "app"]);
        assert!(cli.into_config().is_err());
    }
}
