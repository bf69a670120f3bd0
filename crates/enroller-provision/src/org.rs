//! Peer organization provisioning.
//!
//! Runs against two CAs. The enrollment CA issues the org, peer and admin
//! MSPs; the TLS CA issues the peer's TLS bundle. The org root doubles as the
//! enrollment CA client home, and `.tlsca-client` holds the TLS CA session.

use crate::nodeous;
use crate::pipeline::{Pipeline, ProvisionKind, ProvisionReport};
use crate::stages::{self, ProvisionOptions, TLS_PROFILE};
use enroller_ca::{CaClient, EnrollRequest, RegisterRequest};
use enroller_core::{
    ledger_dir, CaEndpoint, CredentialRoot, IdentitySet, IdentitySpec, IdentityType, Result, Step,
    TlsRole, DEFAULT_CA_HOST,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Peer name used when none is given
pub const DEFAULT_PEER: &str = "peer0";

/// Everything needed to provision one peer organization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgConfig {
    /// Project directory containing `organizations/`
    pub project_root: PathBuf,
    /// Organization name, e.g. `org1`
    pub org: String,
    /// Domain, e.g. `example.com`
    pub domain: String,
    /// Peer name, e.g. `peer0`
    #[serde(default = "default_peer")]
    pub peer: String,
    /// Enrollment CA
    pub ca: CaEndpoint,
    /// TLS CA
    pub tlsca: CaEndpoint,
    /// Identities to register on the enrollment CA; empty means the defaults
    #[serde(default)]
    pub identities: IdentitySet,
    /// Run options
    #[serde(default)]
    pub options: ProvisionOptions,
}

fn default_peer() -> String {
    DEFAULT_PEER.to_string()
}

/// Resolved identities for a run
#[derive(Debug, Clone)]
pub(crate) struct OrgPlan {
    identities: IdentitySet,
    peer: IdentitySpec,
    admin: IdentitySpec,
}

impl OrgConfig {
    /// Configuration with the default peer, identities and options
    pub fn new(
        project_root: impl Into<PathBuf>,
        org: impl Into<String>,
        domain: impl Into<String>,
        ca: CaEndpoint,
        tlsca: CaEndpoint,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            org: org.into(),
            domain: domain.into(),
            peer: default_peer(),
            ca,
            tlsca,
            identities: IdentitySet::default(),
            options: ProvisionOptions::default(),
        }
    }

    /// Set the peer name
    #[must_use]
    pub fn peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = peer.into();
        self
    }

    /// Set the identities registered on the enrollment CA
    #[must_use]
    pub fn identities(mut self, identities: IdentitySet) -> Self {
        self.identities = identities;
        self
    }

    /// Set the run options
    #[must_use]
    pub const fn options(mut self, options: ProvisionOptions) -> Self {
        self.options = options;
        self
    }

    /// `<org>admin`, the organization administrator's enrollment ID
    #[must_use]
    pub fn admin_name(&self) -> String {
        format!("{}admin", self.org)
    }

    /// Credential root of this organization
    #[must_use]
    pub fn root(&self) -> CredentialRoot {
        CredentialRoot::peer_org(&self.project_root, &self.org, &self.domain)
    }

    /// Declared identities, or peer, org admin and `user1` when none are declared.
    pub fn effective_identities(&self) -> Result<IdentitySet> {
        if !self.identities.is_empty() {
            return Ok(self.identities.clone());
        }
        IdentitySet::new([
            IdentitySpec::conventional(&self.peer, IdentityType::Peer),
            IdentitySpec::conventional(self.admin_name(), IdentityType::Admin),
            IdentitySpec::conventional("user1", IdentityType::Client),
        ])
    }

    /// Check names, endpoints and required identities.
    pub fn validate(&self) -> Result<()> {
        self.plan().map(|_| ())
    }

    pub(crate) fn plan(&self) -> Result<OrgPlan> {
        stages::check_name("org", &self.org)?;
        stages::check_name("domain", &self.domain)?;
        stages::check_name("peer", &self.peer)?;
        stages::check_endpoint("CA", &self.ca)?;
        stages::check_endpoint("TLS CA", &self.tlsca)?;

        let identities = self.effective_identities()?;
        let peer = identities
            .require(&self.peer, &format!("{0}:<secret>:peer", self.peer))?
            .clone();
        let admin_name = self.admin_name();
        let admin = identities
            .require(&admin_name, &format!("{admin_name}:<secret>:admin"))?
            .clone();
        Ok(OrgPlan {
            identities,
            peer,
            admin,
        })
    }
}

/// Provision a peer organization.
///
/// Stops at the first failing step; the error names the step. Re-running with
/// `clean` rebuilds the root from scratch.
pub async fn provision_org<C>(config: &OrgConfig, client: &C) -> Result<ProvisionReport>
where
    C: CaClient + ?Sized,
{
    let root = config.root();
    let mut pipeline = Pipeline::new(ProvisionKind::Org, root.home());
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

    let peer_fqdn = root.fqdn(&config.peer);
    let peer_dirs = root.peer(&config.peer);
    let peer_msp = EnrollRequest::new(
        &config.ca,
        root.home(),
        &plan.peer.name,
        &plan.peer.secret,
        peer_dirs.msp(),
    )
    .csr_hosts([peer_fqdn.as_str()]);
    stages::enroll_msp(
        &mut pipeline,
        Step::EnrollNodeMsp {
            node: peer_fqdn.clone(),
        },
        client,
        &peer_msp,
        &root,
    )
    .await?;

    let tlsca_home = root.tlsca_client_home();
    let tlsca_admin = EnrollRequest::bootstrap_admin(&config.tlsca, &tlsca_home, tlsca_home.join("msp"));
    pipeline
        .run(Step::EnrollTlsCaAdmin, client.enroll(&tlsca_admin))
        .await?;

    let peer_on_tlsca = RegisterRequest::new(
        &config.tlsca,
        &tlsca_home,
        IdentitySpec::new(&plan.peer.name, &plan.peer.secret, IdentityType::Peer),
    )
    .ledger_dir(&ledger);
    pipeline
        .run(
            Step::RegisterOnTlsCa {
                identity: plan.peer.name.clone(),
            },
            client.register(&peer_on_tlsca),
        )
        .await?;

    let peer_tls = EnrollRequest::new(
        &config.tlsca,
        root.home(),
        &plan.peer.name,
        &plan.peer.secret,
        peer_dirs.tls(),
    )
    .profile(TLS_PROFILE)
    .csr_hosts([peer_fqdn.as_str(), DEFAULT_CA_HOST]);
    let bundle = stages::enroll_tls(
        &mut pipeline,
        Step::EnrollNodeTls {
            node: peer_fqdn.clone(),
        },
        client,
        &peer_tls,
        TlsRole::Server,
        selection,
    )
    .await?;
    stages::publish_tlsca_cert(&mut pipeline, &bundle, &root).await?;

    let admin_msp = EnrollRequest::new(
        &config.ca,
        root.home(),
        &plan.admin.name,
        &plan.admin.secret,
        root.admin().msp(),
    );
    stages::enroll_msp(
        &mut pipeline,
        Step::EnrollAdminMsp {
            admin: root.admin_name(),
        },
        client,
        &admin_msp,
        &root,
    )
    .await?;

    let report = stages::finish_with_tls(pipeline, peer_dirs.tls()).await?;
    info!(
        org = %root.domain(),
        tls_dir = %peer_dirs.tls().display(),
        files = report.tls_files.len(),
        "organization provisioned"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeCa};
    use enroller_core::{EnrollError, ErrorKind, MaterialSelection};
    use std::path::Path;
    use tempfile::TempDir;

    fn org1(project: &Path) -> OrgConfig {
        let ca = CaEndpoint::new("ca-org1", 7054, crate::testing::ca_cert(project, "org1", false));
        let tlsca = CaEndpoint::new("tlsca-org1", 7055, crate::testing::ca_cert(project, "org1", true));
        OrgConfig::new(project, "org1", "example.com", ca, tlsca)
    }

    fn relative_files(root: &Path) -> Vec<String> {
        let mut files: Vec<String> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                e.path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        files.sort();
        files
    }

    #[tokio::test]
    async fn test_org1_layout() {
        let project = TempDir::new().unwrap();
        let config = org1(project.path());
        let ca = FakeCa::new();

        let report = provision_org(&config, &ca).await.unwrap();

        let home = project
            .path()
            .join("organizations/peerOrganizations/org1.example.com");
        assert_eq!(report.root, home);
        for path in [
            "msp/config.yaml",
            "msp/tlscacerts/ca.crt",
            "peers/peer0.org1.example.com/msp/config.yaml",
            "peers/peer0.org1.example.com/tls/ca.crt",
            "peers/peer0.org1.example.com/tls/server.crt",
            "peers/peer0.org1.example.com/tls/server.key",
            "users/Admin@org1.example.com/msp/config.yaml",
        ] {
            assert!(home.join(path).is_file(), "missing {path}");
        }

        let org_config = std::fs::read(home.join("msp/config.yaml")).unwrap();
        for copy in [
            "peers/peer0.org1.example.com/msp/config.yaml",
            "users/Admin@org1.example.com/msp/config.yaml",
        ] {
            assert_eq!(std::fs::read(home.join(copy)).unwrap(), org_config);
        }

        let names: Vec<_> = report.tls_files.iter().map(|f| f.name.as_str()).collect();
        assert!(names.contains(&"server.key"));
        assert!(report.advisories.is_empty());
    }

    #[tokio::test]
    async fn test_call_sequence() {
        let project = TempDir::new().unwrap();
        let config = org1(project.path());
        let ca = FakeCa::new();

        provision_org(&config, &ca).await.unwrap();

        let summary: Vec<String> = ca.calls().iter().map(Call::summary).collect();
        assert_eq!(
            summary,
            [
                "enroll ca-org1 admin",
                "register ca-org1 peer0 peer",
                "register ca-org1 org1admin admin",
                "register ca-org1 user1 client",
                "enroll ca-org1 peer0",
                "enroll tlsca-org1 admin",
                "register tlsca-org1 peer0 peer",
                "enroll tlsca-org1 peer0 tls",
                "enroll ca-org1 org1admin",
            ]
        );

        let calls = ca.calls();
        let Call::Enroll(peer_tls) = &calls[7] else {
            panic!("expected an enroll call");
        };
        assert_eq!(peer_tls.csr_hosts, ["peer0.org1.example.com", "localhost"]);
        assert_eq!(peer_tls.client_home, config.root().home());

        let Call::Enroll(tlsca_admin) = &calls[5] else {
            panic!("expected an enroll call");
        };
        assert_eq!(tlsca_admin.client_home, config.root().tlsca_client_home());
    }

    #[tokio::test]
    async fn test_clean_runs_are_reproducible() {
        let project = TempDir::new().unwrap();
        let config = org1(project.path());
        let home = config.root().home().to_path_buf();

        provision_org(&config, &FakeCa::new()).await.unwrap();
        let first_config = std::fs::read(home.join("msp/config.yaml")).unwrap();
        let first_files = relative_files(&home);

        provision_org(&config, &FakeCa::new()).await.unwrap();
        assert_eq!(std::fs::read(home.join("msp/config.yaml")).unwrap(), first_config);
        assert_eq!(relative_files(&home), first_files);
    }

    #[tokio::test]
    async fn test_rerun_without_clean_against_same_ca() {
        let project = TempDir::new().unwrap();
        let mut config = org1(project.path());
        config.options.clean = false;
        let ca = FakeCa::new();

        provision_org(&config, &ca).await.unwrap();
        let report = provision_org(&config, &ca).await.unwrap();

        let clean = report
            .steps
            .iter()
            .find(|r| r.step == Step::CleanRoot)
            .unwrap();
        assert_eq!(clean.outcome, crate::StepOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_registrations_tracked_outside_the_root() {
        let project = TempDir::new().unwrap();
        let config = org1(project.path());
        let ca = FakeCa::new();

        provision_org(&config, &ca).await.unwrap();

        let ledger = project.path().join("organizations/.fabric-enroller");
        let registrations: Vec<_> = ca
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Register(r) => Some(r),
                Call::Enroll(_) => None,
            })
            .collect();
        assert_eq!(registrations.len(), 4);
        for r in &registrations {
            assert_eq!(r.ledger_dir.as_deref(), Some(ledger.as_path()));
            assert!(!ledger.starts_with(&r.client_home));
        }
    }

    #[tokio::test]
    async fn test_missing_peer_identity_fails_before_enrolling() {
        let project = TempDir::new().unwrap();
        let config = org1(project.path()).identities(
            IdentitySet::new([IdentitySpec::new("org1admin", "pw", IdentityType::Admin)]).unwrap(),
        );
        let ca = FakeCa::new();

        let err = provision_org(&config, &ca).await.unwrap_err();

        assert_eq!(err.step(), Some(&Step::ValidateConfig));
        assert!(matches!(err.root(), EnrollError::MissingIdentity { name, .. } if name == "peer0"));
        assert!(ca.calls().is_empty());
        assert!(!config.root().home().exists());
    }

    #[tokio::test]
    async fn test_missing_ca_cert_fails_before_clean() {
        let project = TempDir::new().unwrap();
        let mut config = org1(project.path());
        config.tlsca.tls_cert = project.path().join("nowhere.pem");
        std::fs::create_dir_all(config.root().msp()).unwrap();
        std::fs::write(config.root().msp().join("keep"), "x").unwrap();

        let err = provision_org(&config, &FakeCa::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(config.root().msp().join("keep").exists());
    }

    #[tokio::test]
    async fn test_failure_names_the_step() {
        let project = TempDir::new().unwrap();
        let config = org1(project.path());
        let ca = FakeCa::new().fail_enroll("org1admin");

        let err = provision_org(&config, &ca).await.unwrap_err();

        assert_eq!(
            err.step(),
            Some(&Step::EnrollAdminMsp {
                admin: "Admin@org1.example.com".into()
            })
        );
        assert!(err.to_string().starts_with("enroll Admin@org1.example.com MSP: "));
        assert_eq!(err.kind(), ErrorKind::Subprocess);
    }

    #[tokio::test]
    async fn test_timeout_is_distinct() {
        let project = TempDir::new().unwrap();
        let config = org1(project.path());
        let ca = FakeCa::new().time_out_enroll("peer0");

        let err = provision_org(&config, &ca).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(
            err.step(),
            Some(&Step::EnrollNodeMsp {
                node: "peer0.org1.example.com".into()
            })
        );
    }

    #[tokio::test]
    async fn test_missing_tls_key_stops_before_publish() {
        let project = TempDir::new().unwrap();
        let config = org1(project.path());
        let ca = FakeCa::new().without_keystore("peer0");

        let err = provision_org(&config, &ca).await.unwrap_err();

        assert!(matches!(err.root(), EnrollError::MissingMaterial { .. }));
        let tls = config.root().peer("peer0").tls();
        assert!(!tls.join("ca.crt").exists());
        assert!(!tls.join("server.crt").exists());
        assert!(!config.root().tlsca_cert().exists());
    }

    #[tokio::test]
    async fn test_conflicting_secret_on_existing_ca() {
        let project = TempDir::new().unwrap();
        let config = org1(project.path());
        let ca = FakeCa::new();
        provision_org(&config, &ca).await.unwrap();

        let changed = config.clone().identities(
            IdentitySet::new([
                IdentitySpec::new("peer0", "rotated", IdentityType::Peer),
                IdentitySpec::conventional("org1admin", IdentityType::Admin),
            ])
            .unwrap(),
        );
        let err = provision_org(&changed, &ca).await.unwrap_err();
        assert!(matches!(err.root(), EnrollError::ConflictingRegistration { .. }));
        assert_eq!(
            err.step(),
            Some(&Step::RegisterOnCa {
                identity: "peer0".into()
            })
        );
    }

    #[tokio::test]
    async fn test_require_unique_accepts_single_outputs() {
        let project = TempDir::new().unwrap();
        let mut config = org1(project.path());
        config.options.material_selection = MaterialSelection::RequireUnique;

        provision_org(&config, &FakeCa::new()).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fix_ownership_is_recorded() {
        let project = TempDir::new().unwrap();
        let mut config = org1(project.path());
        config.options.fix_ownership = true;

        let report = provision_org(&config, &FakeCa::new()).await.unwrap();
        let fix = &report.steps[1];
        assert_eq!(fix.step, Step::FixOwnership);
        assert_ne!(fix.outcome, crate::StepOutcome::Skipped);
    }

    #[test]
    fn test_default_identities() {
        let config = org1(Path::new("/net")).peer("peer1");
        let ids = config.effective_identities().unwrap();
        let names: Vec<_> = ids.iter().map(|s| s.to_string()).collect();
        assert_eq!(
            names,
            ["peer1:****:peer", "org1admin:****:admin", "user1:****:client"]
        );
        assert_eq!(ids.secret("org1admin"), Some("org1adminpw"));
    }
}
