//! The narrow interface orchestrators use to talk to a CA.

use async_trait::async_trait;
use enroller_core::{CaEndpoint, IdentitySpec, Result};
use std::fmt;
use std::path::PathBuf;

/// Outcome of a successful registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// The CA created the identity
    Registered,
    /// The CA already knew the identity and the request was idempotent
    AlreadyRegistered,
}

/// Declare an identity on a CA.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    /// CA to register on
    pub endpoint: CaEndpoint,
    /// Client home holding the registrar's enrollment
    pub client_home: PathBuf,
    /// Identity to declare
    pub identity: IdentitySpec,
    /// Treat "already registered" as success
    pub idempotent: bool,
    /// Where the registration ledger is kept; the client home when unset
    pub ledger_dir: Option<PathBuf>,
}

impl RegisterRequest {
    /// Idempotent registration of `identity`
    pub fn new(endpoint: &CaEndpoint, client_home: impl Into<PathBuf>, identity: IdentitySpec) -> Self {
        Self {
            endpoint: endpoint.clone(),
            client_home: client_home.into(),
            identity,
            idempotent: true,
            ledger_dir: None,
        }
    }

    /// Set whether "already registered" counts as success
    #[must_use]
    pub const fn idempotent(mut self, idempotent: bool) -> Self {
        self.idempotent = idempotent;
        self
    }

    /// Keep the registration ledger in `dir` so it outlives the client home
    #[must_use]
    pub fn ledger_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ledger_dir = Some(dir.into());
        self
    }
}

/// Request a certificate for a registered identity.
#[derive(Clone)]
pub struct EnrollRequest {
    /// CA to enroll with
    pub endpoint: CaEndpoint,
    /// Client home for this session
    pub client_home: PathBuf,
    /// Enrollment ID
    pub user: String,
    /// Enrollment secret
    pub secret: String,
    /// Output directory (`-M`), always replaced
    pub msp_dir: PathBuf,
    /// Signing profile, e.g. `tls`
    pub profile: Option<String>,
    /// Subject alternative names (`--csr.hosts`)
    pub csr_hosts: Vec<String>,
}

impl EnrollRequest {
    /// Enroll `user` with `secret` into `msp_dir`
    pub fn new(
        endpoint: &CaEndpoint,
        client_home: impl Into<PathBuf>,
        user: impl Into<String>,
        secret: impl Into<String>,
        msp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            endpoint: endpoint.clone(),
            client_home: client_home.into(),
            user: user.into(),
            secret: secret.into(),
            msp_dir: msp_dir.into(),
            profile: None,
            csr_hosts: Vec::new(),
        }
    }

    /// Enroll the endpoint's bootstrap admin into `msp_dir`
    pub fn bootstrap_admin(
        endpoint: &CaEndpoint,
        client_home: impl Into<PathBuf>,
        msp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::new(
            endpoint,
            client_home,
            endpoint.admin_user.clone(),
            endpoint.admin_secret.clone(),
            msp_dir,
        )
    }

    /// Request a signing profile
    #[must_use]
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        let profile = profile.into();
        self.profile = (!profile.trim().is_empty()).then_some(profile);
        self
    }

    /// Add subject alternative names
    #[must_use]
    pub fn csr_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.csr_hosts.extend(hosts.into_iter().map(Into::into));
        self
    }
}

impl fmt::Debug for EnrollRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrollRequest")
            .field("ca", &self.endpoint.name)
            .field("client_home", &self.client_home)
            .field("user", &self.user)
            .field("secret", &"****")
            .field("msp_dir", &self.msp_dir)
            .field("profile", &self.profile)
            .field("csr_hosts", &self.csr_hosts)
            .finish()
    }
}

/// Register and enroll against a certificate authority.
///
/// Implementations keep CA session state inside the request's client home.
#[async_trait]
pub trait CaClient: Send + Sync {
    /// Declare an identity on the CA
    async fn register(&self, req: &RegisterRequest) -> Result<RegisterOutcome>;

    /// Enroll an identity, replacing `req.msp_dir`
    async fn enroll(&self, req: &EnrollRequest) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enroll_request_builder() {
        let ca = CaEndpoint::new("tlsca-org1", 7055, "/tmp/tls-cert.pem");
        let req = EnrollRequest::new(&ca, "/tmp/home", "peer0", "peer0pw", "/tmp/tls")
            .profile("tls")
            .csr_hosts(["peer0.org1.example.com", "localhost"]);
        assert_eq!(req.profile.as_deref(), Some("tls"));
        assert_eq!(req.csr_hosts.len(), 2);

        let debug = format!("{req:?}");
        assert!(!debug.contains("peer0pw"));
    }

    #[test]
    fn test_blank_profile_is_none() {
        let ca = CaEndpoint::new("ca-org1", 7054, "/tmp/tls-cert.pem");
        let req = EnrollRequest::bootstrap_admin(&ca, "/tmp/home", "/tmp/home/msp").profile("  ");
        assert_eq!(req.profile, None);
        assert_eq!(req.user, "admin");
        assert_eq!(req.secret, "adminpw");
    }
}
