//! TLS bundle naming.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EnrollError, Result};

/// Canonical name of the TLS root certificate
pub const CA_CERT_FILE: &str = "ca.crt";

/// Subdirectories the CA tool writes a TLS enrollment into
pub const TLSCACERTS_DIR: &str = "tlscacerts";
/// Leaf certificate directory
pub const SIGNCERTS_DIR: &str = "signcerts";
/// Private key directory
pub const KEYSTORE_DIR: &str = "keystore";

/// Which side of a TLS connection a bundle is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsRole {
    /// Serving node (peer, orderer)
    Server,
    /// Administrative client (mutual TLS)
    Client,
}

impl TlsRole {
    /// Canonical leaf certificate file name
    #[must_use]
    pub const fn cert_file(&self) -> &'static str {
        match self {
            Self::Server => "server.crt",
            Self::Client => "client.crt",
        }
    }

    /// Canonical private key file name
    #[must_use]
    pub const fn key_file(&self) -> &'static str {
        match self {
            Self::Server => "server.key",
            Self::Client => "client.key",
        }
    }
}

/// How to choose when a CA output directory holds more than one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaterialSelection {
    /// Take the first file in lexical order and log a warning
    #[default]
    FirstLexical,
    /// Fail with an ambiguity error
    RequireUnique,
}

impl FromStr for MaterialSelection {
    type Err = EnrollError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "first-lexical" | "first" => Ok(Self::FirstLexical),
            "require-unique" | "unique" => Ok(Self::RequireUnique),
            _ => Err(EnrollError::Config(format!(
                "unknown material selection {s:?}; expected first-lexical or require-unique"
            ))),
        }
    }
}

impl fmt::Display for MaterialSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstLexical => write!(f, "first-lexical"),
            Self::RequireUnique => write!(f, "require-unique"),
        }
    }
}
