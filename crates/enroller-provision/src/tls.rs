//! Rename CA-issued TLS output to the fixed names nodes are configured with.

use crate::fs::{select_one, stage_copy, StagedFile};
use enroller_core::{
    MaterialSelection, Result, TlsRole, CA_CERT_FILE, KEYSTORE_DIR, SIGNCERTS_DIR,
    TLSCACERTS_DIR,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Canonical files of one TLS directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanonicalBundle {
    /// `ca.crt`
    pub ca_cert: PathBuf,
    /// `server.crt` or `client.crt`
    pub cert: PathBuf,
    /// `server.key` or `client.key`
    pub key: PathBuf,
}

/// Copy `tlscacerts/*`, `signcerts/*` and `keystore/*` of `tls_dir` to the
/// canonical names for `role`.
///
/// All three sources are resolved before anything is written, and the copies
/// are staged before any is renamed into place. A missing source leaves the
/// directory untouched.
///
/// If a rename fails, the files committed before it keep their new content
/// and the remaining staged copies are removed. Running again after fixing
/// the cause completes the bundle.
pub async fn canonicalize(
    tls_dir: &Path,
    role: TlsRole,
    selection: MaterialSelection,
) -> Result<CanonicalBundle> {
    let ca_src = select_one(&tls_dir.join(TLSCACERTS_DIR), "", selection).await?;
    let cert_src = select_one(&tls_dir.join(SIGNCERTS_DIR), "", selection).await?;
    let key_src = select_one(&tls_dir.join(KEYSTORE_DIR), "", selection).await?;

    let bundle = CanonicalBundle {
        ca_cert: tls_dir.join(CA_CERT_FILE),
        cert: tls_dir.join(role.cert_file()),
        key: tls_dir.join(role.key_file()),
    };

    let plan = [
        (&ca_src, &bundle.ca_cert),
        (&cert_src, &bundle.cert),
        (&key_src, &bundle.key),
    ];
    let mut staged: Vec<StagedFile> = Vec::with_capacity(plan.len());
    for (src, dst) in plan {
        match stage_copy(src, dst).await {
            Ok(file) => staged.push(file),
            Err(e) => {
                for file in staged {
                    file.discard().await;
                }
                return Err(e);
            }
        }
    }
    let mut pending = staged.into_iter();
    while let Some(file) = pending.next() {
        if let Err(e) = file.commit().await {
            for rest in pending {
                rest.discard().await;
            }
            return Err(e);
        }
    }

    debug!(dir = %tls_dir.display(), role = ?role, "canonicalized TLS bundle");
    Ok(bundle)
}
