//! Building and running one CA client invocation.

use enroller_core::{EnrollError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Environment variable scoping the CA client's local state
pub const CLIENT_HOME_ENV: &str = "FABRIC_CA_CLIENT_HOME";

/// Shown in place of secrets in logs and errors
const REDACTED: &str = "****";

/// Argument vector with a redacted twin for display.
#[derive(Clone)]
pub(crate) struct CommandLine {
    program: PathBuf,
    args: Vec<String>,
    shown: Vec<String>,
}

/// What a finished invocation produced
#[derive(Debug)]
pub(crate) struct Invocation {
    pub status: ExitStatus,
    /// stdout followed by stderr
    pub output: String,
}

impl CommandLine {
    pub fn new(program: &Path) -> Self {
        Self {
            program: program.to_path_buf(),
            args: Vec::new(),
            shown: Vec::new(),
        }
    }

    /// Append a plain argument
    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        let arg = arg.into();
        self.shown.push(arg.clone());
        self.args.push(arg);
        self
    }

    /// Append a flag followed by its value
    pub fn flag(&mut self, flag: &str, value: impl Into<String>) -> &mut Self {
        self.arg(flag).arg(value)
    }

    /// Append a flag whose value must not be logged
    pub fn secret_flag(&mut self, flag: &str, value: impl Into<String>) -> &mut Self {
        self.arg(flag);
        self.args.push(value.into());
        self.shown.push(REDACTED.to_string());
        self
    }

    /// Append a flag with a value shown as `display`
    pub fn flag_shown_as(&mut self, flag: &str, value: impl Into<String>, display: impl Into<String>) -> &mut Self {
        self.arg(flag);
        self.args.push(value.into());
        self.shown.push(display.into());
        self
    }

    #[cfg(test)]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Run under `client_home`, killing the process after `timeout`.
    pub async fn run(&self, client_home: &Path, timeout: Duration) -> Result<Invocation> {
        debug!(command = %self, home = %client_home.display(), "running CA client");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env(CLIENT_HOME_ENV, client_home)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| EnrollError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(out)) => {
                let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
                output.push_str(&String::from_utf8_lossy(&out.stderr));
                Ok(Invocation {
                    status: out.status,
                    output,
                })
            }
            Ok(Err(source)) => Err(EnrollError::Spawn {
                program: self.program.display().to_string(),
                source,
            }),
            Err(_) => {
                warn!(command = %self, timeout_secs = timeout.as_secs(), "CA client timed out");
                Err(EnrollError::Timeout {
                    command: self.to_string(),
                    after: timeout,
                })
            }
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.shown {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandLine({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_redacts_secrets() {
        let mut cmd = CommandLine::new(Path::new("fabric-ca-client"));
        cmd.arg("register")
            .flag("--id.name", "peer0")
            .secret_flag("--id.secret", "peer0pw");

        assert_eq!(
            cmd.to_string(),
            "fabric-ca-client register --id.name peer0 --id.secret ****"
        );
        assert_eq!(cmd.args().last().map(String::as_str), Some("peer0pw"));
        assert!(!format!("{cmd:?}").contains("peer0pw"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_sets_client_home_and_captures_output() {
        let home = tempfile::TempDir::new().unwrap();
        let mut cmd = CommandLine::new(Path::new("/bin/sh"));
        cmd.arg("-c")
            .arg(format!("echo \"home=${CLIENT_HOME_ENV}\"; echo oops >&2; exit 3"));

        let inv = cmd.run(home.path(), Duration::from_secs(10)).await.unwrap();
        assert_eq!(inv.status.code(), Some(3));
        assert!(inv.output.contains(&format!("home={}", home.path().display())));
        assert!(inv.output.contains("oops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_times_out() {
        let home = tempfile::TempDir::new().unwrap();
        let mut cmd = CommandLine::new(Path::new("/bin/sh"));
        cmd.arg("-c").arg("exec sleep 5");

        let err = cmd
            .run(home.path(), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_missing_program() {
        let home = tempfile::TempDir::new().unwrap();
        let cmd = CommandLine::new(Path::new("/nonexistent/fabric-ca-client"));
        let err = cmd.run(home.path(), Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, EnrollError::Spawn { .. }));
    }
}
