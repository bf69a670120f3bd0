//! Orderer organization provisioning.

use crate::nodeous;
use crate::pipeline::{Pipeline, ProvisionKind, ProvisionReport};
use crate::stages::{self, ProvisionOptions, TLS_PROFILE};
use enroller_ca::{CaClient, EnrollRequest};
use enroller_core::{
    ledger_dir, CaEndpoint, CredentialRoot, IdentitySet, IdentitySpec, IdentityType, Result, Step,
    TlsRole, DEFAULT_CA_HOST,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Orderer name used when none is given
pub const DEFAULT_ORDERER: &str = "orderer";

/// Enrollment ID of the orderer administrator
pub const ORDERER_ADMIN: &str = "ordereradmin";

/// Everything needed to provision one ordering node and its administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrdererConfig {
    /// Project directory containing `organizations/`
    pub project_root: PathBuf,
    /// Domain, e.g. `example.com`
    pub domain: String,
    /// Orderer name, e.g. `orderer`
    #[serde(default = "default_orderer")]
    pub orderer: String,
    /// Enrollment CA
    pub ca: CaEndpoint,
    /// TLS CA
    pub tlsca: CaEndpoint,
    /// Identities registered on both CAs; empty means the defaults
    #[serde(default)]
    pub identities: IdentitySet,
    /// Also enroll a TLS client identity for the administrator
    #[serde(default = "default_true")]
    pub enroll_admin_tls: bool,
    /// Run options
    #[serde(default)]
    pub options: ProvisionOptions,
}

fn default_orderer() -> String {
    DEFAULT_ORDERER.to_string()
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Clone)]
pub(crate) struct OrdererPlan {
    identities: IdentitySet,
    orderer: IdentitySpec,
    admin: IdentitySpec,
}

impl OrdererConfig {
    /// Configuration with the default orderer name, identities and options
    pub fn new(
        project_root: impl Into<PathBuf>,
        domain: impl Into<String>,
        ca: CaEndpoint,
        tlsca: CaEndpoint,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            domain: domain.into(),
            orderer: default_orderer(),
            ca,
            tlsca,
            identities: IdentitySet::default(),
            enroll_admin_tls: true,
            options: ProvisionOptions::default(),
        }
    }

    /// Set the orderer name
    #[must_use]
    pub fn orderer(mut self, orderer: impl Into<String>) -> Self {
        self.orderer = orderer.into();
        self
    }

    /// Set the identities registered on both CAs
    #[must_use]
    pub fn identities(mut self, identities: IdentitySet) -> Self {
        self.identities = identities;
        self
    }

    /// Enable or disable the administrator's TLS client enrollment
    #[must_use]
    pub const fn enroll_admin_tls(mut self, enabled: bool) -> Self {
        self.enroll_admin_tls = enabled;
        self
    }

    /// Set the run options
    #[must_use]
    pub const fn options(mut self, options: ProvisionOptions) -> Self {
        self.options = options;
        self
    }

    /// Credential root of the orderer organization
    #[must_use]
    pub fn root(&self) -> CredentialRoot {
        CredentialRoot::orderer_org(&self.project_root, &self.domain)
    }

    /// Declared identities, or the orderer and `ordereradmin` when none are declared
    pub fn effective_identities(&self) -> Result<IdentitySet> {
        if !self.identities.is_empty() {
            return Ok(self.identities.clone());
        }
        IdentitySet::new([
            IdentitySpec::conventional(&self.orderer, IdentityType::Orderer),
            IdentitySpec::conventional(ORDERER_ADMIN, IdentityType::Admin),
        ])
    }

    /// Check names, endpoints and required identities.
    pub fn validate(&self) -> Result<()> {
        self.plan().map(|_| ())
    }

    pub(crate) fn plan(&self) -> Result<OrdererPlan> {
        stages::check_name("domain", &self.domain)?;
        stages::check_name("orderer", &self.orderer)?;
        stages::check_endpoint("CA", &self.ca)?;
        stages::check_endpoint("TLS CA", &self.tlsca)?;

        let identities = self.effective_identities()?;
        let orderer = identities
            .require(&self.orderer, &format!("{0}:<secret>:orderer", self.orderer))?
            .clone();
        let admin = identities
            .require(ORDERER_ADMIN, &format!("{ORDERER_ADMIN}:<secret>:admin"))?
            .clone();
        Ok(OrdererPlan {
            identities,
            orderer,
            admin,
        })
    }
}

/// Provision an orderer organization.
///
/// Every declared identity is registered on both CAs. With `enroll_admin_tls`
/// the administrator also gets a client TLS bundle under `users/Admin@<domain>/tls`.
pub async fn provision_orderer<C>(config: &OrdererConfig, client: &C) -> Result<ProvisionReport>
where
    C: CaClient + ?Sized,
{
    let root = config.root();
    let mut pipeline = Pipeline::new(ProvisionKind::Orderer, root.home());
    let plan = pipeline
        .run(Step::ValidateConfig, async { config.plan() })
        .await?;
    let selection = config.options.material_selection;

    stages::prepare_root(&mut pipeline, &config.project_root, &root, &config.options).await?;

    let admin_enroll = EnrollRequest::bootstrap_admin(&config.ca, root.home(), root.msp());
    pipeline
        .run(Step::EnrollCaAdmin, client.enroll(&admin_enroll))
        .await?;
    pipeline
        .run(Step::WriteNodeOus, nodeous::write_config(&root))
        .await?;

    let ledger = ledger_dir(&config.project_root);
    stages::register_all(
        &mut pipeline,
        client,
        &config.ca,
        root.home(),
        &ledger,
        &plan.identities,
        |identity| Step::RegisterOnCa { identity },
    )
    .await?;

    let orderer_fqdn = root.fqdn(&config.orderer);
    let orderer_dirs = root.orderer(&config.orderer);
    let orderer_msp = EnrollRequest::new(
        &config.ca,
        root.home(),
        &plan.orderer.name,
        &plan.orderer.secret,
        orderer_dirs.msp(),
    )
    .csr_hosts([orderer_fqdn.as_str()]);
    stages::enroll_msp(
        &mut pipeline,
        Step::EnrollNodeMsp {
            node: orderer_fqdn.clone(),
        },
        client,
        &orderer_msp,
        &root,
    )
    .await?;

    let tlsca_home = root.tlsca_client_home();
    let tlsca_admin = EnrollRequest::bootstrap_admin(&config.tlsca, &tlsca_home, tlsca_home.join("msp"));
    pipeline
        .run(Step::EnrollTlsCaAdmin, client.enroll(&tlsca_admin))
        .await?;

    stages::register_all(
        &mut pipeline,
        client,
        &config.tlsca,
        &tlsca_home,
        &ledger,
        &plan.identities,
        |identity| Step::RegisterOnTlsCa { identity },
    )
    .await?;

    let orderer_tls = EnrollRequest::new(
        &config.tlsca,
        root.home(),
        &plan.orderer.name,
        &plan.orderer.secret,
        orderer_dirs.tls(),
    )
    .profile(TLS_PROFILE)
    .csr_hosts([orderer_fqdn.as_str(), DEFAULT_CA_HOST]);
    let bundle = stages::enroll_tls(
        &mut pipeline,
        Step::EnrollNodeTls {
            node: orderer_fqdn.clone(),
        },
        client,
        &orderer_tls,
        TlsRole::Server,
        selection,
    )
    .await?;
    stages::publish_tlsca_cert(&mut pipeline, &bundle, &root).await?;

    let admin_name = root.admin_name();
    let admin_dirs = root.admin();
    let admin_msp = EnrollRequest::new(
        &config.ca,
        root.home(),
        &plan.admin.name,
        &plan.admin.secret,
        admin_dirs.msp(),
    );
    stages::enroll_msp(
        &mut pipeline,
        Step::EnrollAdminMsp {
            admin: admin_name.clone(),
        },
        client,
        &admin_msp,
        &root,
    )
    .await?;

    let admin_tls_step = Step::EnrollAdminTls {
        admin: admin_name.clone(),
    };
    if config.enroll_admin_tls {
        let admin_tls = EnrollRequest::new(
            &config.tlsca,
            root.home(),
            &plan.admin.name,
            &plan.admin.secret,
            admin_dirs.tls(),
        )
        .profile(TLS_PROFILE)
        .csr_hosts([admin_name.as_str(), DEFAULT_CA_HOST]);
        stages::enroll_tls(
            &mut pipeline,
            admin_tls_step,
            client,
            &admin_tls,
            TlsRole::Client,
            selection,
        )
        .await?;
    } else {
        pipeline.skip(admin_tls_step);
    }

    let report = stages::finish_with_tls(pipeline, orderer_dirs.tls()).await?;
    info!(
        domain = %root.domain(),
        tls_dir = %orderer_dirs.tls().display(),
        admin_tls = config.enroll_admin_tls,
        "orderer organization provisioned"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ca_cert, Call, FakeCa};
    use crate::StepOutcome;
    use enroller_core::EnrollError;
    use std::path::Path;
    use tempfile::TempDir;

    fn orderer_org(project: &Path) -> OrdererConfig {
        let ca = CaEndpoint::new("ca-orderer", 9054, ca_cert(project, "orderer", false));
        let tlsca = CaEndpoint::new("tlsca-orderer", 9055, ca_cert(project, "orderer", true));
        OrdererConfig::new(project, "example.com", ca, tlsca)
    }

    #[tokio::test]
    async fn test_orderer_layout_with_admin_tls() {
        let project = TempDir::new().unwrap();
        let config = orderer_org(project.path());

        let report = provision_orderer(&config, &FakeCa::new()).await.unwrap();

        let home = project
            .path()
            .join("organizations/ordererOrganizations/example.com");
        for path in [
            "msp/config.yaml",
            "msp/tlscacerts/ca.crt",
            "orderers/orderer.example.com/msp/config.yaml",
            "orderers/orderer.example.com/tls/server.crt",
            "orderers/orderer.example.com/tls/server.key",
            "users/Admin@example.com/msp/config.yaml",
            "users/Admin@example.com/tls/ca.crt",
            "users/Admin@example.com/tls/client.crt",
            "users/Admin@example.com/tls/client.key",
        ] {
            assert!(home.join(path).is_file(), "missing {path}");
        }
        assert!(!home.join("users/Admin@example.com/tls/server.crt").exists());
        assert_eq!(report.tls_dir.as_deref(), Some(home.join("orderers/orderer.example.com/tls").as_path()));
    }

    #[tokio::test]
    async fn test_admin_tls_disabled() {
        let project = TempDir::new().unwrap();
        let config = orderer_org(project.path()).enroll_admin_tls(false);
        let ca = FakeCa::new();

        let report = provision_orderer(&config, &ca).await.unwrap();

        assert!(!config.root().admin().tls().exists());
        let skipped = report
            .steps
            .iter()
            .find(|r| matches!(r.step, Step::EnrollAdminTls { .. }))
            .unwrap();
        assert_eq!(skipped.outcome, StepOutcome::Skipped);
        assert!(!ca
            .calls()
            .iter()
            .any(|c| c.summary() == "enroll tlsca-orderer ordereradmin tls"));
    }

    #[tokio::test]
    async fn test_identities_registered_on_both_cas() {
        let project = TempDir::new().unwrap();
        let config = orderer_org(project.path());
        let ca = FakeCa::new();

        provision_orderer(&config, &ca).await.unwrap();

        let registrations: Vec<String> = ca
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Register(_)))
            .map(Call::summary)
            .collect();
        assert_eq!(
            registrations,
            [
                "register ca-orderer orderer orderer",
                "register ca-orderer ordereradmin admin",
                "register tlsca-orderer orderer orderer",
                "register tlsca-orderer ordereradmin admin",
            ]
        );
    }

    #[tokio::test]
    async fn test_admin_tls_hosts() {
        let project = TempDir::new().unwrap();
        let config = orderer_org(project.path());
        let ca = FakeCa::new();

        provision_orderer(&config, &ca).await.unwrap();

        let calls = ca.calls();
        let admin_tls = calls
            .iter()
            .find_map(|c| match c {
                Call::Enroll(e) if e.user == "ordereradmin" && e.profile.as_deref() == Some("tls") => Some(e),
                _ => None,
            })
            .unwrap();
        assert_eq!(admin_tls.csr_hosts, ["Admin@example.com", "localhost"]);
        assert_eq!(admin_tls.ca, "tlsca-orderer");
    }

    #[tokio::test]
    async fn test_missing_admin_identity() {
        let project = TempDir::new().unwrap();
        let config = orderer_org(project.path()).identities(
            IdentitySet::new([IdentitySpec::conventional("orderer", IdentityType::Orderer)]).unwrap(),
        );
        let ca = FakeCa::new();

        let err = provision_orderer(&config, &ca).await.unwrap_err();
        assert!(
            matches!(err.root(), EnrollError::MissingIdentity { name, .. } if name == "ordereradmin")
        );
        assert!(err.to_string().contains("ordereradmin:<secret>:admin"));
        assert!(ca.calls().is_empty());
    }

    #[tokio::test]
    async fn test_admin_tls_failure_is_fatal() {
        let project = TempDir::new().unwrap();
        let config = orderer_org(project.path());
        let ca = FakeCa::new().without_keystore("ordereradmin");

        let err = provision_orderer(&config, &ca).await.unwrap_err();
        assert_eq!(
            err.step(),
            Some(&Step::EnrollAdminTls {
                admin: "Admin@example.com".into()
            })
        );
        assert!(!config.root().admin().tls().join("client.crt").exists());
    }
}
