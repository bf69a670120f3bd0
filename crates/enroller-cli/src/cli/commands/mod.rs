//! Command implementations.

pub mod ca;
pub mod config;
pub mod orderer;
pub mod org;
pub mod user;

use anyhow::Result;
use fabric_enroller::{CaEndpoint, FabricCaClient, MaterialSelection};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::args::{CaPairArgs, RunArgs};
use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output format
    pub output_format: OutputFormat,

    /// fabric-ca-client override
    pub program: Option<PathBuf>,

    /// Per-call timeout override
    pub timeout: Option<Duration>,

    /// Material selection from the config file
    pub material_selection: MaterialSelection,
}

impl Context {
    /// Create a CA client with the configured program and timeout.
    pub fn client(&self) -> FabricCaClient {
        let mut builder = FabricCaClient::builder();
        if let Some(program) = &self.program {
            builder = builder.program(program);
        }
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }

    /// Run options from the command line, falling back to the config file.
    pub fn options(&self, run: &RunArgs) -> fabric_enroller::ProvisionOptions {
        fabric_enroller::ProvisionOptions {
            clean: run.clean,
            fix_ownership: run.fix_perms,
            material_selection: run.material_selection.unwrap_or(self.material_selection),
        }
    }
}

/// Absolute project root, defaulting to the current directory.
pub fn project_root(root_dir: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    Ok(match root_dir {
        Some(dir) if dir.is_absolute() => dir.to_path_buf(),
        Some(dir) => cwd.join(dir),
        None => cwd,
    })
}

/// Resolve a possibly relative path against the project root.
fn under_root(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

/// Enrollment CA and TLS CA endpoints; `owner` picks the default cert location.
pub fn endpoints(root: &Path, owner: &str, cas: &CaPairArgs) -> (CaEndpoint, CaEndpoint) {
    let ca_cert = cas.ca_tls_cert.as_deref().map_or_else(
        || fabric_enroller::default_ca_tls_cert(root, owner, false),
        |p| under_root(root, p),
    );
    let tlsca_cert = cas.tlsca_tls_cert.as_deref().map_or_else(
        || fabric_enroller::default_ca_tls_cert(root, owner, true),
        |p| under_root(root, p),
    );

    let ca = CaEndpoint::new(&cas.ca_name, cas.ca_port, ca_cert)
        .admin(&cas.ca_admin_user, &cas.ca_admin_pass);
    let tlsca = CaEndpoint::new(&cas.tlsca_name, cas.tlsca_port, tlsca_cert)
        .admin(&cas.tlsca_admin_user, &cas.tlsca_admin_pass);
    (ca, tlsca)
}
