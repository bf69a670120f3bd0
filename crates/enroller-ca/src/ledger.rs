//! Record of which secrets were registered.
//!
//! The CA answers "already registered" regardless of the secret in the
//! request. The ledger remembers a digest of the secret each identity was
//! registered or reconciled with, so a later request with a different secret
//! is rejected instead of silently accepted.
//!
//! The pipelines keep it under `organizations/.fabric-enroller`, which a clean
//! run does not remove; standalone requests fall back to the client home.

use enroller_core::{EnrollError, IdentitySpec, IdentityType, Result};
use ring::digest::{digest, SHA256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Ledger file name inside the ledger directory
pub const LEDGER_FILE: &str = "fabric-enroller-registrations.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LedgerEntry {
    secret_sha256: String,
    #[serde(rename = "type")]
    kind: IdentityType,
}

/// Registrations recorded in one ledger directory.
#[derive(Debug, Clone)]
pub struct RegistrationLedger {
    path: PathBuf,
    entries: BTreeMap<String, LedgerEntry>,
}

impl RegistrationLedger {
    /// Load the ledger kept in `dir`; a missing file is an empty ledger.
    pub async fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(LEDGER_FILE);
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(EnrollError::io(&path, e)),
        };
        Ok(Self { path, entries })
    }

    /// Fails if `identity` was recorded on `ca` with a different secret.
    pub fn check(&self, ca: &str, identity: &IdentitySpec) -> Result<()> {
        match self.entries.get(&key(ca, &identity.name)) {
            Some(entry) if entry.secret_sha256 != secret_digest(ca, identity) => {
                Err(EnrollError::ConflictingRegistration {
                    name: identity.name.clone(),
                    ca: ca.to_string(),
                })
            }
            _ => Ok(()),
        }
    }

    /// True if `name` has been recorded on `ca`
    #[must_use]
    pub fn contains(&self, ca: &str, name: &str) -> bool {
        self.entries.contains_key(&key(ca, name))
    }

    /// Remember `identity` as registered on `ca`
    pub fn record(&mut self, ca: &str, identity: &IdentitySpec) {
        self.entries.insert(
            key(ca, &identity.name),
            LedgerEntry {
                secret_sha256: secret_digest(ca, identity),
                kind: identity.kind,
            },
        );
    }

    /// Persist the ledger, replacing the file atomically
    pub async fn save(&self) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| EnrollError::io(dir, e))?;

        let tmp = self.path.with_extension("json.partial");
        let content = serde_json::to_vec_pretty(&self.entries)?;
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| EnrollError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| EnrollError::io(&self.path, e))?;

        debug!(path = %self.path.display(), entries = self.entries.len(), "saved registration ledger");
        Ok(())
    }
}

fn key(ca: &str, name: &str) -> String {
    format!("{ca}/{name}")
}

/// SHA-256 over CA, name and secret, lowercase hex
fn secret_digest(ca: &str, identity: &IdentitySpec) -> String {
    let material = format!("{ca}\n{}\n{}", identity.name, identity.secret);
    hex::encode(digest(&SHA256, material.as_bytes()).as_ref())
}
