//! Local filesystem helpers for the stub tree
//!
//! ## Features
//!
//! - **Path mapping**: remote path under a source root to a `.strm` path under a target root
//! - **Atomic writes**: write-to-temp + rename so readers never see a partial stub
//! - **Target cleaning**: removes everything beneath the target root, counting files

use std::io;
use std::path::{Path, PathBuf};

use strmsync_core::domain::STUB_EXTENSION;
use tracing::{debug, instrument};

/// Maps a remote item path onto its stub path beneath `target_root`
///
/// `remote_path` must equal or sit beneath `source_root` at a `/` boundary
/// and must leave a non-empty relative remainder with no `.`, `..` or empty
/// segments. The final segment's extension is replaced with `.strm`.
///
/// ```
/// use std::path::Path;
/// use strmsync_engine::filesystem::stub_path;
///
/// let stub = stub_path("/movies", Path::new("/strm"), "/movies/action/x.mp4").unwrap();
/// assert_eq!(stub, Path::new("/strm/action/x.strm"));
/// ```
pub fn stub_path(source_root: &str, target_root: &Path, remote_path: &str) -> Result<PathBuf, String> {
    let root = source_root.trim_end_matches('/');
    let rest = remote_path
        .strip_prefix(root)
        .ok_or_else(|| format!("not under source root {source_root}"))?;
    if !rest.starts_with('/') {
        return Err(format!("not under source root {source_root}"));
    }

    let relative = &rest[1..];
    if relative.is_empty() {
        return Err("names the source root itself".to_string());
    }

    let segments: Vec<&str> = relative.split('/').collect();
    if segments
        .iter()
        .any(|s| s.is_empty() || *s == "." || *s == "..")
    {
        return Err(format!("unsafe relative path {relative}"));
    }

    let (file_name, dirs) = match segments.split_last() {
        Some(split) => split,
        None => return Err("names the source root itself".to_string()),
    };
    let stem = match file_name.rfind('.') {
        Some(idx) => &file_name[..idx],
        None => file_name,
    };

    let mut stub = target_root.to_path_buf();
    for dir in dirs {
        stub.push(dir);
    }
    stub.push(format!("{stem}.{STUB_EXTENSION}"));
    Ok(stub)
}

/// Writes `data` to `path` atomically
///
/// The bytes go to `<path>.tmp` in the same directory, which is then renamed
/// over `path`. The parent directory must exist.
#[instrument(skip(data), fields(path = %path.display(), bytes = data.len()))]
pub async fn write_atomic(path: &Path, data: &[u8]) -> io::Result<()> {
    let tmp_path = {
        let mut p = path.as_os_str().to_owned();
        p.push(".tmp");
        PathBuf::from(p)
    };

    tokio::fs::write(&tmp_path, data).await?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    Ok(())
}

/// Removes every entry directly under `root`, leaving `root` itself
///
/// Runs on the blocking pool. Returns the number of non-directory entries
/// removed.
pub async fn clear_directory(root: &Path) -> io::Result<u32> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || clear_directory_blocking(&root))
        .await
        .map_err(io::Error::other)?
}

fn clear_directory_blocking(root: &Path) -> io::Result<u32> {
    let mut removed = 0;
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        removed += remove_entry(&entry.path(), &entry.file_type()?)?;
    }
    debug!(root = %root.display(), removed, "Cleared target directory");
    Ok(removed)
}

fn remove_entry(path: &Path, file_type: &std::fs::FileType) -> io::Result<u32> {
    if !file_type.is_dir() {
        std::fs::remove_file(path)?;
        return Ok(1);
    }

    let mut removed = 0;
    for entry in std::fs::read_dir(path)? {
        let entry = entry?;
        removed += remove_entry(&entry.path(), &entry.file_type()?)?;
    }
    std::fs::remove_dir(path)?;
    Ok(removed)
}
