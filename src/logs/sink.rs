use crate::config::SupervisorConfig;
use crate::error::{BabysitError, Result};
use std::fs::{File, OpenOptions};
use std::os::fd::AsFd;
use std::path::{Path, PathBuf};
use std::process::Stdio;

/// One of the two standard streams of the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StdStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StdStream::Stdout => write!(f, "stdout"),
            StdStream::Stderr => write!(f, "stderr"),
        }
    }
}

/// Where one child output stream ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Inherit the supervisor's stdout
    Stdout,
    /// Inherit the supervisor's stderr
    Stderr,
    /// Append to a file, created if missing
    File(PathBuf),
}

impl OutputTarget {
    /// Resolve a raw target for the given stream
    ///
    /// `-` means "the same stream as the supervisor", the names `stdout` and
    /// `stderr` pick a standard stream explicitly, anything else is a path.
    pub fn parse(raw: &str, stream: StdStream) -> Self {
        match (raw, stream) {
            ("-", StdStream::Stdout) | ("stdout", _) => OutputTarget::Stdout,
            ("-", StdStream::Stderr) | ("stderr", _) => OutputTarget::Stderr,
            (path, _) => OutputTarget::File(PathBuf::from(path)),
        }
    }

    /// Human readable location, as shown on the status page
    pub fn label(&self) -> String {
        match self {
            OutputTarget::Stdout => "/dev/stdout".to_string(),
            OutputTarget::Stderr => "/dev/stderr".to_string(),
            OutputTarget::File(path) => path.display().to_string(),
        }
    }
}

/// An opened output target that can hand out stdio handles to each child
#[derive(Debug)]
pub struct OutputSink {
    stream: StdStream,
    target: OutputTarget,
    file: Option<File>,
}

impl OutputSink {
    /// Open the target; files are opened once with append/create semantics
    pub fn open(target: OutputTarget, stream: StdStream) -> Result<Self> {
        let file = match target {
            OutputTarget::File(ref path) => Some(open_append(path).map_err(|e| {
                BabysitError::ConfigError(format!("Could not init {}: {}", stream, e))
            })?),
            _ => None,
        };

        Ok(Self {
            stream,
            target,
            file,
        })
    }

    pub fn target(&self) -> &OutputTarget {
        &self.target
    }

    pub fn stream(&self) -> StdStream {
        self.stream
    }

    /// Build a fresh `Stdio` for one child process
    pub fn stdio(&self) -> Result<Stdio> {
        if let Some(ref file) = self.file {
            return Ok(Stdio::from(file.try_clone()?));
        }

        let stdio = match (&self.target, self.stream) {
            (OutputTarget::Stdout, StdStream::Stdout) | (OutputTarget::Stderr, StdStream::Stderr) => {
                Stdio::inherit()
            }
            (OutputTarget::Stdout, _) => {
                Stdio::from(std::io::stdout().as_fd().try_clone_to_owned()?)
            }
            _ => Stdio::from(std::io::stderr().as_fd().try_clone_to_owned()?),
        };

        Ok(stdio)
    }

    /// Sync file-backed targets to disk; standard streams are left alone
    pub fn flush(&self) -> Result<()> {
        if let Some(ref file) = self.file {
            file.sync_all()?;
        }
        Ok(())
    }
}

fn open_append(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// The pair of sinks attached to every child
#[derive(Debug)]
pub struct OutputSinks {
    pub stdout: OutputSink,
    pub stderr: OutputSink,
}

impl OutputSinks {
    /// Open both sinks described by the configuration
    pub fn open(config: &SupervisorConfig) -> Result<Self> {
        Ok(Self {
            stdout: OutputSink::open(
                OutputTarget::parse(&config.stdout, StdStream::Stdout),
                StdStream::Stdout,
            )?,
            stderr: OutputSink::open(
                OutputTarget::parse(&config.stderr, StdStream::Stderr),
                StdStream::Stderr,
            )?,
        })
    }

    /// Sinks that simply inherit the supervisor's own streams
    pub fn inherit() -> Self {
        Self {
            stdout: OutputSink {
                stream: StdStream::Stdout,
                target: OutputTarget::Stdout,
                file: None,
            },
            stderr: OutputSink {
                stream: StdStream::Stderr,
                target: OutputTarget::Stderr,
                file: None,
            },
        }
    }

    /// Flush both sinks, logging failures instead of propagating them
    pub fn flush(&self) {
        for sink in [&self.stdout, &self.stderr] {
            if let Err(e) = sink.flush() {
                tracing::warn!(
                    stream = %sink.stream(),
                    target = %sink.target().label(),
                    "Sync failed: {}",
                    e
                );
            }
        }
    }
}
