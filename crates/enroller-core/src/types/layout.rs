//! On-disk credential layout under `organizations/`.
//!
//! ```text
//! organizations/
//!   peerOrganizations/<org>.<domain>/
//!     msp/                               org MSP + NodeOUs config.yaml
//!     peers/<peer>.<org>.<domain>/{msp,tls}
//!     users/Admin@<org>.<domain>/msp
//!     .tlsca-client/                     TLS CA client home
//!   ordererOrganizations/<domain>/
//!     msp/
//!     orderers/<orderer>.<domain>/{msp,tls}
//!     users/Admin@<domain>/{msp,tls}
//!     .tlsca-client/
//!   fabric-ca/<org|orderer>/{ca,tlsca}/tls-cert.pem
//!   .fabric-enroller/                    registration ledger, survives clean
//! ```

use std::path::{Path, PathBuf};

/// Top-level directory holding every credential root
pub const ORGANIZATIONS_DIR: &str = "organizations";

/// Name of the NodeOUs document in every MSP
pub const CONFIG_YAML: &str = "config.yaml";

/// Client home directory name for the TLS CA, inside a credential root
pub const TLSCA_CLIENT_HOME: &str = ".tlsca-client";

/// Directory under `organizations/` holding state that outlives credential roots
pub const STATE_DIR: &str = ".fabric-enroller";

/// Upper-cases the first character, as Fabric user directories do.
fn title_case(name: &str) -> String {
    let mut chars = name.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// `organizations/` under the project root
#[must_use]
pub fn organizations_dir(project_root: &Path) -> PathBuf {
    project_root.join(ORGANIZATIONS_DIR)
}

/// Registration ledger directory, outside every credential root
#[must_use]
pub fn ledger_dir(project_root: &Path) -> PathBuf {
    organizations_dir(project_root).join(STATE_DIR)
}

/// Default location of a CA's TLS server certificate.
///
/// `owner` is the org name (e.g. `org1`) or `orderer`; `tlsca` selects the TLS CA.
#[must_use]
pub fn default_ca_tls_cert(project_root: &Path, owner: &str, tlsca: bool) -> PathBuf {
    organizations_dir(project_root)
        .join("fabric-ca")
        .join(owner)
        .join(if tlsca { "tlsca" } else { "ca" })
        .join("tls-cert.pem")
}

/// Paths of one credential root (peer organization or orderer organization).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialRoot {
    home: PathBuf,
    domain_suffix: String,
}

impl CredentialRoot {
    /// Credential root of peer organization `<org>.<domain>`
    #[must_use]
    pub fn peer_org(project_root: &Path, org: &str, domain: &str) -> Self {
        let fqdn = format!("{org}.{domain}");
        Self {
            home: organizations_dir(project_root)
                .join("peerOrganizations")
                .join(&fqdn),
            domain_suffix: fqdn,
        }
    }

    /// Credential root of the orderer organization for `<domain>`
    #[must_use]
    pub fn orderer_org(project_root: &Path, domain: &str) -> Self {
        Self {
            home: organizations_dir(project_root)
                .join("ordererOrganizations")
                .join(domain),
            domain_suffix: domain.to_string(),
        }
    }

    /// Root directory; also the enrollment CA client home
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Domain that node and user names are qualified with
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain_suffix
    }

    /// Client home for the TLS CA
    #[must_use]
    pub fn tlsca_client_home(&self) -> PathBuf {
        self.home.join(TLSCA_CLIENT_HOME)
    }

    /// Organization MSP directory
    #[must_use]
    pub fn msp(&self) -> PathBuf {
        self.home.join("msp")
    }

    /// Organization NodeOUs document
    #[must_use]
    pub fn config_yaml(&self) -> PathBuf {
        self.msp().join(CONFIG_YAML)
    }

    /// Organization MSP `cacerts/`
    #[must_use]
    pub fn cacerts(&self) -> PathBuf {
        self.msp().join("cacerts")
    }

    /// Organization MSP `tlscacerts/ca.crt`
    #[must_use]
    pub fn tlsca_cert(&self) -> PathBuf {
        self.msp().join("tlscacerts").join(super::CA_CERT_FILE)
    }

    /// Fully qualified name of a node in this root
    #[must_use]
    pub fn fqdn(&self, node: &str) -> String {
        format!("{node}.{}", self.domain_suffix)
    }

    /// `peers/<fqdn>/`
    #[must_use]
    pub fn peer(&self, peer: &str) -> NodeDirs {
        NodeDirs::new(self.home.join("peers").join(self.fqdn(peer)))
    }

    /// `orderers/<fqdn>/`
    #[must_use]
    pub fn orderer(&self, orderer: &str) -> NodeDirs {
        NodeDirs::new(self.home.join("orderers").join(self.fqdn(orderer)))
    }

    /// `Admin@<domain>`, the administrator's directory name
    #[must_use]
    pub fn admin_name(&self) -> String {
        format!("Admin@{}", self.domain_suffix)
    }

    /// `users/Admin@<domain>/`
    #[must_use]
    pub fn admin(&self) -> NodeDirs {
        NodeDirs::new(self.home.join("users").join(self.admin_name()))
    }

    /// `users/<User>@<domain>/` for an enrolled user such as `user2`
    #[must_use]
    pub fn user(&self, user: &str) -> NodeDirs {
        let dir = format!("{}@{}", title_case(user), self.domain_suffix);
        NodeDirs::new(self.home.join("users").join(dir))
    }
}

/// `msp/` and `tls/` of one node or user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDirs {
    base: PathBuf,
}

impl NodeDirs {
    fn new(base: PathBuf) -> Self {
        Self { base }
    }

    /// Base directory
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Signing MSP
    #[must_use]
    pub fn msp(&self) -> PathBuf {
        self.base.join("msp")
    }

    /// `msp/config.yaml`
    #[must_use]
    pub fn config_yaml(&self) -> PathBuf {
        self.msp().join(CONFIG_YAML)
    }

    /// TLS bundle
    #[must_use]
    pub fn tls(&self) -> PathBuf {
        self.base.join("tls")
    }
}
