//! Filesystem helpers for credential directories.
//!
//! Every write goes to a hidden `.partial` sibling first and is renamed into
//! place after `fsync`, so an interrupted run never leaves a truncated file
//! under a canonical name.

use enroller_core::{EnrollError, MaterialSelection, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// A file copied to a temporary sibling, not yet visible under its final name.
#[derive(Debug)]
pub struct StagedFile {
    tmp: PathBuf,
    dst: PathBuf,
}

impl StagedFile {
    /// Rename into place. The temporary file is removed if the rename fails.
    pub async fn commit(self) -> Result<PathBuf> {
        if let Err(e) = tokio::fs::rename(&self.tmp, &self.dst).await {
            let err = EnrollError::io(&self.dst, e);
            self.discard().await;
            return Err(err);
        }
        Ok(self.dst)
    }

    /// Drop the temporary file
    pub async fn discard(self) {
        if let Err(e) = tokio::fs::remove_file(&self.tmp).await {
            debug!(path = %self.tmp.display(), error = %e, "failed to remove staged file");
        }
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    /// File name
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Whether the entry is a directory
    pub is_dir: bool,
}

fn partial_path(dst: &Path) -> Result<PathBuf> {
    let name = dst
        .file_name()
        .ok_or_else(|| EnrollError::Config(format!("invalid destination {}", dst.display())))?;
    Ok(dst.with_file_name(format!(".{}.partial", name.to_string_lossy())))
}

async fn ensure_parent(dst: &Path) -> Result<()> {
    if let Some(parent) = dst.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| EnrollError::io(parent, e))?;
    }
    Ok(())
}

/// Copy `src` next to `dst` and flush it, without replacing `dst` yet.
pub async fn stage_copy(src: &Path, dst: &Path) -> Result<StagedFile> {
    let mut input = tokio::fs::File::open(src)
        .await
        .map_err(|e| EnrollError::io(src, e))?;
    ensure_parent(dst).await?;

    let tmp = partial_path(dst)?;
    let mut out = tokio::fs::File::create(&tmp)
        .await
        .map_err(|e| EnrollError::io(&tmp, e))?;
    tokio::io::copy(&mut input, &mut out)
        .await
        .map_err(|e| EnrollError::io(&tmp, e))?;
    out.sync_all().await.map_err(|e| EnrollError::io(&tmp, e))?;

    Ok(StagedFile {
        tmp,
        dst: dst.to_path_buf(),
    })
}

/// Copy one file, creating missing parent directories of `dst`.
pub async fn copy_file(src: &Path, dst: &Path) -> Result<()> {
    stage_copy(src, dst).await?.commit().await?;
    debug!(src = %src.display(), dst = %dst.display(), "copied file");
    Ok(())
}

/// Write `content` to `path` via a flushed temporary file.
pub async fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    ensure_parent(path).await?;
    let tmp = partial_path(path)?;
    let mut out = tokio::fs::File::create(&tmp)
        .await
        .map_err(|e| EnrollError::io(&tmp, e))?;
    out.write_all(content)
        .await
        .map_err(|e| EnrollError::io(&tmp, e))?;
    out.sync_all().await.map_err(|e| EnrollError::io(&tmp, e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| EnrollError::io(path, e))
}

/// Create `dir` and its parents.
pub async fn create_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| EnrollError::io(dir, e))
}

/// Remove `dir` recursively. Returns false if it did not exist.
pub async fn remove_tree(dir: &Path) -> Result<bool> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(EnrollError::io(dir, e)),
    }
}

/// True if `path` exists
pub async fn exists(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
}

/// Regular, non-hidden files directly in `dir` whose names end in `suffix`,
/// sorted by name. A missing directory has no files.
pub async fn list_files(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(EnrollError::io(dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| EnrollError::io(dir, e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || !name.ends_with(suffix) {
            continue;
        }
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| EnrollError::io(entry.path(), e))?;
        if file_type.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Resolve the single file in `dir` matching `*<suffix>`.
///
/// Zero matches is a missing-material error. Several matches are resolved by
/// `selection`.
pub async fn select_one(dir: &Path, suffix: &str, selection: MaterialSelection) -> Result<PathBuf> {
    let pattern = format!("*{suffix}");
    let mut files = list_files(dir, suffix).await?;
    match (files.len(), selection) {
        (0, _) => Err(EnrollError::MissingMaterial {
            dir: dir.to_path_buf(),
            pattern,
        }),
        (1, _) => Ok(files.remove(0)),
        (count, MaterialSelection::RequireUnique) => Err(EnrollError::AmbiguousMaterial {
            dir: dir.to_path_buf(),
            pattern,
            count,
        }),
        (count, MaterialSelection::FirstLexical) => {
            let chosen = files.remove(0);
            warn!(
                dir = %dir.display(),
                count,
                chosen = %chosen.display(),
                "several candidate files, using the first in lexical order"
            );
            Ok(chosen)
        }
    }
}

/// Entries directly in `dir`, sorted by name
pub async fn list_dir(dir: &Path) -> Result<Vec<FileEntry>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| EnrollError::io(dir, e))?;
    let mut listing = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| EnrollError::io(dir, e))?
    {
        let meta = entry
            .metadata()
            .await
            .map_err(|e| EnrollError::io(entry.path(), e))?;
        listing.push(FileEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            size: meta.len(),
            is_dir: meta.is_dir(),
        });
    }
    listing.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(listing)
}

/// Chown everything under `root` to the current user.
///
/// Usually needs privileges; callers treat failure as advisory.
/// Returns the number of paths changed.
pub async fn fix_ownership(root: &Path) -> Result<usize> {
    let root = root.to_path_buf();
    let joined = tokio::task::spawn_blocking({
        let root = root.clone();
        move || chown_tree(&root)
    })
    .await;
    joined.map_err(|e| EnrollError::io(&root, std::io::Error::other(e)))?
}

#[cfg(unix)]
fn chown_tree(root: &Path) -> Result<usize> {
    use nix::unistd::{getgid, getuid};

    let uid = getuid().as_raw();
    let gid = getgid().as_raw();
    let mut changed = 0;
    for entry in walkdir::WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            EnrollError::io(path, e.into())
        })?;
        std::os::unix::fs::lchown(entry.path(), Some(uid), Some(gid))
            .map_err(|e| EnrollError::io(entry.path(), e))?;
        changed += 1;
    }
    Ok(changed)
}

#[cfg(not(unix))]
fn chown_tree(root: &Path) -> Result<usize> {
    Err(EnrollError::Config(format!(
        "ownership fix of {} is only supported on unix",
        root.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_copy_creates_parents() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("config.yaml");
        std::fs::write(&src, "NodeOUs: {}\n").unwrap();

        let dst = dir.path().join("peers/peer0/msp/config.yaml");
        copy_file(&src, &dst).await.unwrap();

        assert_eq!(std::fs::read(&dst).unwrap(), std::fs::read(&src).unwrap());
        assert!(!dir.path().join("peers/peer0/msp/.config.yaml.partial").exists());
    }

    #[tokio::test]
    async fn test_copy_missing_source_fails_without_output() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("out/ca.crt");
        let err = copy_file(&dir.path().join("nope"), &dst).await.unwrap_err();

        assert!(matches!(err, EnrollError::Io { .. }));
        assert!(!dst.exists());
    }

    #[tokio::test]
    async fn test_copy_overwrites() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a");
        let dst = dir.path().join("b");
        std::fs::write(&src, "new").unwrap();
        std::fs::write(&dst, "old content that is longer").unwrap();

        copy_file(&src, &dst).await.unwrap();
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "new");
    }

    #[tokio::test]
    async fn test_select_one() {
        let dir = TempDir::new().unwrap();
        let certs = dir.path().join("cacerts");
        std::fs::create_dir_all(&certs).unwrap();

        let err = select_one(&certs, ".pem", MaterialSelection::FirstLexical)
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollError::MissingMaterial { .. }));

        std::fs::write(certs.join("b.pem"), "b").unwrap();
        std::fs::write(certs.join("notes.txt"), "x").unwrap();
        std::fs::write(certs.join(".hidden.pem"), "x").unwrap();
        let one = select_one(&certs, ".pem", MaterialSelection::RequireUnique)
            .await
            .unwrap();
        assert!(one.ends_with("b.pem"));

        std::fs::write(certs.join("a.pem"), "a").unwrap();
        let first = select_one(&certs, ".pem", MaterialSelection::FirstLexical)
            .await
            .unwrap();
        assert!(first.ends_with("a.pem"));

        let err = select_one(&certs, ".pem", MaterialSelection::RequireUnique)
            .await
            .unwrap_err();
        assert!(matches!(err, EnrollError::AmbiguousMaterial { count: 2, .. }));
    }

    #[tokio::test]
    async fn test_list_dir_sorted() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("server.key"), "kk").unwrap();
        std::fs::write(dir.path().join("ca.crt"), "c").unwrap();
        std::fs::create_dir(dir.path().join("keystore")).unwrap();

        let names: Vec<_> = list_dir(dir.path())
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["ca.crt", "keystore", "server.key"]);
    }

    #[tokio::test]
    async fn test_remove_tree_missing_is_ok() {
        let dir = TempDir::new().unwrap();
        assert!(!remove_tree(&dir.path().join("absent")).await.unwrap());
        std::fs::create_dir_all(dir.path().join("org/msp")).unwrap();
        assert!(remove_tree(&dir.path().join("org")).await.unwrap());
        assert!(!dir.path().join("org").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fix_ownership_on_own_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("a/b")).unwrap();
        std::fs::write(dir.path().join("a/b/c"), "x").unwrap();

        let changed = fix_ownership(dir.path()).await.unwrap();
        assert_eq!(changed, 4);
    }
}
