//! NodeOUs `config.yaml` for an organization MSP.

use crate::fs::{list_files, write_file};
use enroller_core::{CredentialRoot, EnrollError, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Serialize)]
struct Document {
    #[serde(rename = "NodeOUs")]
    node_ous: NodeOus,
}

#[derive(Debug, Serialize)]
struct NodeOus {
    #[serde(rename = "Enable")]
    enable: bool,
    #[serde(rename = "ClientOUIdentifier")]
    client: OuIdentifier,
    #[serde(rename = "PeerOUIdentifier")]
    peer: OuIdentifier,
    #[serde(rename = "AdminOUIdentifier")]
    admin: OuIdentifier,
    #[serde(rename = "OrdererOUIdentifier")]
    orderer: OuIdentifier,
}

#[derive(Debug, Serialize)]
struct OuIdentifier {
    #[serde(rename = "Certificate")]
    certificate: String,
    #[serde(rename = "OrganizationalUnitIdentifier")]
    organizational_unit: &'static str,
}

impl OuIdentifier {
    fn new(certificate: &str, organizational_unit: &'static str) -> Self {
        Self {
            certificate: certificate.to_string(),
            organizational_unit,
        }
    }
}

/// Render the four-OU document bound to `cacerts/<cert_file>`.
pub fn render(cert_file: &str) -> Result<String> {
    let certificate = format!("cacerts/{cert_file}");
    let doc = Document {
        node_ous: NodeOus {
            enable: true,
            client: OuIdentifier::new(&certificate, "client"),
            peer: OuIdentifier::new(&certificate, "peer"),
            admin: OuIdentifier::new(&certificate, "admin"),
            orderer: OuIdentifier::new(&certificate, "orderer"),
        },
    };
    Ok(serde_yaml::to_string(&doc)?)
}

/// Write `msp/config.yaml` for `root`, bound to its single CA root certificate.
///
/// Exactly one `msp/cacerts/*.pem` must exist.
pub async fn write_config(root: &CredentialRoot) -> Result<PathBuf> {
    let cacerts = root.cacerts();
    let mut certs = list_files(&cacerts, ".pem").await?;
    let cert = match certs.len() {
        0 => {
            return Err(EnrollError::MissingMaterial {
                dir: cacerts,
                pattern: "*.pem".into(),
            })
        }
        1 => certs.remove(0),
        count => {
            return Err(EnrollError::AmbiguousMaterial {
                dir: cacerts,
                pattern: "*.pem".into(),
                count,
            })
        }
    };

    let cert_file = cert
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let path = root.config_yaml();
    write_file(&path, render(&cert_file)?.as_bytes()).await?;

    debug!(path = %path.display(), cert = %cert_file, "wrote NodeOUs config");
    Ok(path)
}
