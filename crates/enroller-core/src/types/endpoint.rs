//! Certificate authority endpoints.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Host every CA is reached on unless configured otherwise
pub const DEFAULT_CA_HOST: &str = "localhost";

/// Default bootstrap admin of a freshly started CA
pub const DEFAULT_ADMIN_USER: &str = "admin";

/// Default bootstrap admin secret of a freshly started CA
pub const DEFAULT_ADMIN_SECRET: &str = "adminpw";

/// One logical CA instance (enrollment CA or TLS CA).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaEndpoint {
    /// CA name passed as `--caname`
    pub name: String,

    /// Host the CA listens on
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the CA listens on
    pub port: u16,

    /// PEM file used to verify the CA's TLS server certificate
    pub tls_cert: PathBuf,

    /// Bootstrap admin user
    #[serde(default = "default_admin_user")]
    pub admin_user: String,

    /// Bootstrap admin secret
    #[serde(default = "default_admin_secret")]
    pub admin_secret: String,
}

impl CaEndpoint {
    /// Create an endpoint on the default host with the default bootstrap admin
    pub fn new(name: impl Into<String>, port: u16, tls_cert: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            host: default_host(),
            port,
            tls_cert: tls_cert.into(),
            admin_user: default_admin_user(),
            admin_secret: default_admin_secret(),
        }
    }

    /// Override the bootstrap admin credentials
    #[must_use]
    pub fn admin(mut self, user: impl Into<String>, secret: impl Into<String>) -> Self {
        self.admin_user = user.into();
        self.admin_secret = secret.into();
        self
    }

    /// Override the host
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Enrollment URL embedding `user:secret`
    #[must_use]
    pub fn enrollment_url(&self, user: &str, secret: &str) -> String {
        format!("https://{user}:{secret}@{}:{}", self.host, self.port)
    }

    /// Enrollment URL with the secret masked, safe to log
    #[must_use]
    pub fn redacted_url(&self, user: &str) -> String {
        format!("https://{user}:****@{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    String::from(DEFAULT_CA_HOST)
}

fn default_admin_user() -> String {
    String::from(DEFAULT_ADMIN_USER)
}

fn default_admin_secret() -> String {
    String::from(DEFAULT_ADMIN_SECRET)
}
