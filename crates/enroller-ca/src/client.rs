//! `fabric-ca-client` subprocess implementation of [`CaClient`].

use async_trait::async_trait;
use enroller_core::{EnrollError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::adapter::{CaClient, EnrollRequest, RegisterOutcome, RegisterRequest};
use crate::command::{CommandLine, Invocation};
use crate::config::ClientConfig;
use crate::ledger::RegistrationLedger;

/// Marker the CA prints when an identity exists (matched case-insensitively)
const ALREADY_REGISTERED: &str = "already registered";

/// Drives `fabric-ca-client` as a subprocess.
#[derive(Debug, Clone)]
pub struct FabricCaClient {
    inner: Arc<ClientConfig>,
}

impl Default for FabricCaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FabricCaClient {
    /// Client running `fabric-ca-client` from `PATH` with default settings
    #[must_use]
    pub fn new() -> Self {
        FabricCaClientBuilder::new().build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder() -> FabricCaClientBuilder {
        FabricCaClientBuilder::new()
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner
    }

    fn register_command(&self, req: &RegisterRequest) -> CommandLine {
        let mut cmd = CommandLine::new(&self.inner.program);
        cmd.arg("register")
            .flag("--caname", req.endpoint.name.clone())
            .flag("--id.name", req.identity.name.clone())
            .secret_flag("--id.secret", req.identity.secret.clone())
            .flag("--id.type", req.identity.kind.as_str())
            .flag("--tls.certfiles", path_arg(&req.endpoint.tls_cert));
        cmd
    }

    fn enroll_command(&self, req: &EnrollRequest, out_dir: &Path) -> CommandLine {
        let mut cmd = CommandLine::new(&self.inner.program);
        cmd.arg("enroll")
            .flag_shown_as(
                "-u",
                req.endpoint.enrollment_url(&req.user, &req.secret),
                req.endpoint.redacted_url(&req.user),
            )
            .flag("--caname", req.endpoint.name.clone())
            .flag("-M", path_arg(out_dir))
            .flag("--tls.certfiles", path_arg(&req.endpoint.tls_cert));
        if let Some(profile) = &req.profile {
            cmd.flag("--enrollment.profile", profile.clone());
        }
        for host in &req.csr_hosts {
            cmd.flag("--csr.hosts", host.clone());
        }
        cmd
    }

    async fn run(&self, cmd: &CommandLine, client_home: &Path) -> Result<Invocation> {
        cmd.run(client_home, self.inner.timeout).await
    }
}

#[async_trait]
impl CaClient for FabricCaClient {
    async fn register(&self, req: &RegisterRequest) -> Result<RegisterOutcome> {
        let ca = req.endpoint.name.as_str();
        let mut ledger = if self.inner.track_registrations {
            let dir = req.ledger_dir.as_deref().unwrap_or(&req.client_home);
            let ledger = RegistrationLedger::load(dir).await?;
            ledger.check(ca, &req.identity)?;
            Some(ledger)
        } else {
            None
        };

        let cmd = self.register_command(req);
        let inv = self.run(&cmd, &req.client_home).await?;

        let outcome = if inv.status.success() {
            RegisterOutcome::Registered
        } else if req.idempotent && is_already_registered(&inv.output) {
            RegisterOutcome::AlreadyRegistered
        } else {
            return Err(command_failed(&cmd, &inv));
        };

        if let Some(ledger) = ledger.as_mut() {
            ledger.record(ca, &req.identity);
            ledger.save().await?;
        }

        info!(ca, identity = %req.identity, ?outcome, "registered identity");
        Ok(outcome)
    }

    async fn enroll(&self, req: &EnrollRequest) -> Result<()> {
        // The CA client records `-M` in the client home's config on first
        // use, so it must name the real directory.
        let target = absolute(&req.msp_dir)?;
        let previous = set_aside(&target).await?;

        let cmd = self.enroll_command(req, &target);
        let result = match self.run(&cmd, &req.client_home).await {
            Ok(inv) if inv.status.success() => Ok(()),
            Ok(inv) => Err(command_failed(&cmd, &inv)),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            restore(&target, previous.as_deref()).await;
            return Err(e);
        }

        if let Some(previous) = &previous {
            discard(previous).await;
        }
        info!(
            ca = %req.endpoint.name,
            user = %req.user,
            dir = %target.display(),
            profile = req.profile.as_deref().unwrap_or("default"),
            "enrolled identity"
        );
        Ok(())
    }
}

/// Builder for configuring a [`FabricCaClient`]
#[derive(Debug, Clone, Default)]
pub struct FabricCaClientBuilder {
    config: ClientConfig,
}

impl FabricCaClientBuilder {
    /// Create a new builder with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    #[must_use]
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the program to run
    #[must_use]
    pub fn program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config = self.config.program(program);
        self
    }

    /// Set the per-invocation timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.timeout(timeout);
        self
    }

    /// Enable or disable the registration ledger
    #[must_use]
    pub fn track_registrations(mut self, enabled: bool) -> Self {
        self.config = self.config.track_registrations(enabled);
        self
    }

    /// Build the client
    #[must_use]
    pub fn build(self) -> FabricCaClient {
        FabricCaClient {
            inner: Arc::new(self.config),
        }
    }
}

fn is_already_registered(output: &str) -> bool {
    output.to_lowercase().contains(ALREADY_REGISTERED)
}

fn command_failed(cmd: &CommandLine, inv: &Invocation) -> EnrollError {
    EnrollError::CommandFailed {
        command: cmd.to_string(),
        status: inv.status.to_string(),
        output: inv.output.trim().to_string(),
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| EnrollError::io(".", e))?;
    Ok(cwd.join(path))
}

/// `<parent>/.<name>.<suffix>` next to `target`
fn sibling(target: &Path, suffix: &str) -> Result<PathBuf> {
    let name = target.file_name().ok_or_else(|| {
        EnrollError::Config(format!("invalid output directory {}", target.display()))
    })?;
    let parent = target.parent().unwrap_or_else(|| Path::new("/"));
    Ok(parent.join(format!(".{}.{suffix}", name.to_string_lossy())))
}

async fn remove_dir_if_exists(dir: &Path) -> Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EnrollError::io(dir, e)),
    }
}

async fn discard(dir: &Path) {
    if let Err(e) = remove_dir_if_exists(dir).await {
        debug!(dir = %dir.display(), error = %e, "failed to remove previous output");
    }
}

/// Move existing output of `target` to `.<name>.previous`.
///
/// Returns the directory holding the material to restore on failure. A
/// `.previous` left by an interrupted run is kept when `target` is gone.
async fn set_aside(target: &Path) -> Result<Option<PathBuf>> {
    let previous = sibling(target, "previous")?;
    if tokio::fs::metadata(target).await.is_ok() {
        remove_dir_if_exists(&previous).await?;
        tokio::fs::rename(target, &previous)
            .await
            .map_err(|e| EnrollError::io(target, e))?;
    }
    Ok(tokio::fs::metadata(&previous).await.is_ok().then_some(previous))
}

/// Drop partial output of a failed enroll and put the previous output back.
async fn restore(target: &Path, previous: Option<&Path>) {
    if let Err(e) = remove_dir_if_exists(target).await {
        warn!(dir = %target.display(), error = %e, "failed to remove partial enrollment output");
    }
    let Some(previous) = previous else {
        return;
    };
    if let Err(e) = tokio::fs::rename(previous, target).await {
        warn!(
            previous = %previous.display(),
            target = %target.display(),
            error = %e,
            "failed to restore previous enrollment output; it remains in the previous directory"
        );
    }
}
