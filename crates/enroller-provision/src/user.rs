//! Additional users for an already provisioned peer organization.

use crate::fs;
use crate::pipeline::{Pipeline, ProvisionKind, ProvisionReport};
use crate::stages;
use enroller_ca::{CaClient, EnrollRequest, RegisterRequest};
use enroller_core::{
    ledger_dir, CaEndpoint, CredentialRoot, EnrollError, IdentitySpec, IdentityType, Result, Step,
    CONFIG_YAML,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// A client or admin user to register and enroll into an existing org.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// Project directory containing `organizations/`
    pub project_root: PathBuf,
    /// Organization name
    pub org: String,
    /// Domain
    pub domain: String,
    /// Enrollment CA of the organization
    pub ca: CaEndpoint,
    /// The user
    pub user: IdentitySpec,
}

impl UserConfig {
    /// Enroll `user` into `<org>.<domain>`
    pub fn new(
        project_root: impl Into<PathBuf>,
        org: impl Into<String>,
        domain: impl Into<String>,
        ca: CaEndpoint,
        user: IdentitySpec,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            org: org.into(),
            domain: domain.into(),
            ca,
            user,
        }
    }

    /// Credential root of the organization
    #[must_use]
    pub fn root(&self) -> CredentialRoot {
        CredentialRoot::peer_org(&self.project_root, &self.org, &self.domain)
    }

    /// Check names, endpoint, user type and that the org root exists.
    pub fn validate(&self) -> Result<()> {
        stages::check_name("org", &self.org)?;
        stages::check_name("domain", &self.domain)?;
        stages::check_name("user", &self.user.name)?;
        if self.user.secret.is_empty() {
            return Err(EnrollError::Config("user secret is required".into()));
        }
        if !matches!(self.user.kind, IdentityType::Client | IdentityType::Admin) {
            return Err(EnrollError::Config(format!(
                "user type must be client or admin, got {}",
                self.user.kind
            )));
        }
        stages::check_endpoint("CA", &self.ca)?;

        let root = self.root();
        if !root.home().is_dir() {
            return Err(EnrollError::Config(format!(
                "organization root {} does not exist; provision the organization first",
                root.home().display()
            )));
        }
        Ok(())
    }
}

/// Register (idempotently) and enroll a user of an existing organization.
///
/// The org root is the client home, so the CA admin enrollment made when the
/// organization was provisioned acts as registrar.
pub async fn provision_user<C>(config: &UserConfig, client: &C) -> Result<ProvisionReport>
where
    C: CaClient + ?Sized,
{
    let root = config.root();
    let mut pipeline = Pipeline::new(ProvisionKind::User, root.home());
    pipeline
        .run(Step::ValidateConfig, async { config.validate() })
        .await?;

    let register = RegisterRequest::new(&config.ca, root.home(), config.user.clone())
        .ledger_dir(ledger_dir(&config.project_root));
    pipeline
        .run(
            Step::RegisterOnCa {
                identity: config.user.name.clone(),
            },
            client.register(&register),
        )
        .await?;

    let dirs = root.user(&config.user.name);
    let enroll = EnrollRequest::new(
        &config.ca,
        root.home(),
        &config.user.name,
        &config.user.secret,
        dirs.msp(),
    );
    let org_config = root.config_yaml();
    pipeline
        .run(
            Step::EnrollUserMsp {
                user: config.user.name.clone(),
            },
            async {
                client.enroll(&enroll).await?;
                if fs::exists(&org_config).await {
                    fs::copy_file(&org_config, &dirs.msp().join(CONFIG_YAML)).await?;
                }
                Ok(())
            },
        )
        .await?;

    info!(user = %config.user.name, msp = %dirs.msp().display(), "user enrolled");
    Ok(pipeline.finish(None, Vec::new()))
}
