//! Steps shared by the org, orderer and user pipelines.

use crate::fs::{self, FileEntry};
use crate::pipeline::Pipeline;
use crate::tls::{canonicalize, CanonicalBundle};
use enroller_ca::{CaClient, EnrollRequest, RegisterRequest};
use enroller_core::{
    organizations_dir, CaEndpoint, CredentialRoot, EnrollError, IdentitySpec, MaterialSelection,
    Result, Step, TlsRole, CONFIG_YAML,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Enrollment profile for TLS certificates
pub const TLS_PROFILE: &str = "tls";

/// Run options common to every provisioning pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionOptions {
    /// Delete the credential root before provisioning
    pub clean: bool,
    /// Chown `organizations/` to the current user first (advisory)
    pub fix_ownership: bool,
    /// How to pick among several CA output files
    pub material_selection: MaterialSelection,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            clean: true,
            fix_ownership: false,
            material_selection: MaterialSelection::default(),
        }
    }
}

/// Reject names that are empty or would escape their directory.
pub(crate) fn check_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EnrollError::Config(format!("{field} is required")));
    }
    if value.contains(['/', '\\']) || value.chars().any(char::is_whitespace) || value.starts_with('.') {
        return Err(EnrollError::Config(format!(
            "{field} {value:?} must not contain path separators or whitespace, or start with a dot"
        )));
    }
    Ok(())
}

/// Check that an endpoint is usable before any subprocess runs.
pub(crate) fn check_endpoint(role: &str, endpoint: &CaEndpoint) -> Result<()> {
    if endpoint.name.trim().is_empty() {
        return Err(EnrollError::Config(format!("{role} name is required")));
    }
    if endpoint.port == 0 {
        return Err(EnrollError::Config(format!("{role} port is required")));
    }
    if !endpoint.tls_cert.is_file() {
        return Err(EnrollError::Config(format!(
            "{role} TLS certificate {} does not exist",
            endpoint.tls_cert.display()
        )));
    }
    Ok(())
}

/// Ownership fix, clean, and creation of the root and its TLS CA client home.
pub(crate) async fn prepare_root(
    pipeline: &mut Pipeline,
    project_root: &Path,
    root: &CredentialRoot,
    options: &ProvisionOptions,
) -> Result<()> {
    if options.fix_ownership {
        let organizations = organizations_dir(project_root);
        pipeline
            .advisory(Step::FixOwnership, fs::fix_ownership(&organizations))
            .await;
    } else {
        pipeline.skip(Step::FixOwnership);
    }

    if options.clean {
        pipeline
            .run(Step::CleanRoot, fs::remove_tree(root.home()))
            .await?;
    } else {
        pipeline.skip(Step::CleanRoot);
    }

    pipeline
        .run(Step::PrepareRoot, async {
            fs::create_dir(root.home()).await?;
            fs::create_dir(&root.tlsca_client_home()).await
        })
        .await
}

/// Register each identity, one step per identity.
pub(crate) async fn register_all<'a, C, I, F>(
    pipeline: &mut Pipeline,
    client: &C,
    endpoint: &CaEndpoint,
    client_home: &Path,
    ledger_dir: &Path,
    identities: I,
    step: F,
) -> Result<()>
where
    C: CaClient + ?Sized,
    I: IntoIterator<Item = &'a IdentitySpec>,
    F: Fn(String) -> Step,
{
    for identity in identities {
        let request =
            RegisterRequest::new(endpoint, client_home, identity.clone()).ledger_dir(ledger_dir);
        pipeline
            .run(step(identity.name.clone()), client.register(&request))
            .await?;
    }
    Ok(())
}

/// Enroll into an MSP directory and copy the root's NodeOUs config into it.
pub(crate) async fn enroll_msp<C>(
    pipeline: &mut Pipeline,
    step: Step,
    client: &C,
    request: &EnrollRequest,
    root: &CredentialRoot,
) -> Result<()>
where
    C: CaClient + ?Sized,
{
    pipeline
        .run(step, async {
            client.enroll(request).await?;
            fs::copy_file(&root.config_yaml(), &request.msp_dir.join(CONFIG_YAML)).await
        })
        .await
}

/// Enroll with the TLS profile and canonicalize the result for `role`.
pub(crate) async fn enroll_tls<C>(
    pipeline: &mut Pipeline,
    step: Step,
    client: &C,
    request: &EnrollRequest,
    role: TlsRole,
    selection: MaterialSelection,
) -> Result<CanonicalBundle>
where
    C: CaClient + ?Sized,
{
    pipeline
        .run(step, async {
            client.enroll(request).await?;
            canonicalize(&request.msp_dir, role, selection).await
        })
        .await
}

/// Copy a node's `ca.crt` into the root MSP `tlscacerts/`.
pub(crate) async fn publish_tlsca_cert(
    pipeline: &mut Pipeline,
    bundle: &CanonicalBundle,
    root: &CredentialRoot,
) -> Result<()> {
    pipeline
        .run(
            Step::PublishTlsCaCert,
            fs::copy_file(&bundle.ca_cert, &root.tlsca_cert()),
        )
        .await
}

/// List the TLS directory and close the run.
pub(crate) async fn finish_with_tls(
    mut pipeline: Pipeline,
    tls_dir: PathBuf,
) -> Result<crate::ProvisionReport> {
    let files: Vec<FileEntry> = pipeline.run(Step::ReportTls, fs::list_dir(&tls_dir)).await?;
    Ok(pipeline.finish(Some(tls_dir), files))
}
