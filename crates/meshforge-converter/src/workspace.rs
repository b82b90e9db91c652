//! Per-conversion scratch directories under the temp root.
//!
//! Every kernel invocation gets its own `job-*` directory which is removed
//! when the guard drops, including when the owning task is aborted. Crashed
//! processes can still leave directories behind; [`sweep_stale`] removes
//! those once they exceed the configured TTL.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;
use tracing::{debug, warn};

const SCRATCH_PREFIX: &str = "job-";

/// Scratch directory removed on drop.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create a fresh scratch directory under `temp_root`.
    pub fn create(temp_root: &Path) -> std::io::Result<Self> {
        std::fs::create_dir_all(temp_root)?;
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(temp_root)?;
        Ok(Self { dir })
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write the payload as `<stem>.<extension>` and return its path.
    pub async fn write_input(
        &self,
        source_name: Option<&str>,
        extension: &str,
        data: &[u8],
    ) -> std::io::Result<PathBuf> {
        let stem = sanitize_stem(source_name.unwrap_or("input"));
        let path = self
            .dir
            .path()
            .join(format!("{stem}.{}", extension.trim_start_matches('.')));
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }
}

/// Reduce a client-supplied file name to a safe stem.
pub fn sanitize_stem(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename);

    let sanitized: String = stem
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_') {
                Some(c)
            } else if c.is_whitespace() {
                Some('_')
            } else {
                None
            }
        })
        .take(200)
        .collect();

    if sanitized.is_empty() {
        "input".to_string()
    } else {
        sanitized
    }
}

/// Remove scratch directories older than `ttl`. Returns how many were removed.
///
/// Entries that do not carry the scratch prefix are left alone.
pub async fn sweep_stale(temp_root: &Path, ttl: Duration) -> std::io::Result<usize> {
    let mut entries = match tokio::fs::read_dir(temp_root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let now = SystemTime::now();
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with(SCRATCH_PREFIX) {
            continue;
        }
        let metadata = match entry.metadata().await {
            Ok(m) if m.is_dir() => m,
            _ => continue,
        };
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < ttl {
            continue;
        }

        match tokio::fs::remove_dir_all(entry.path()).await {
            Ok(()) => {
                debug!(dir = %entry.path().display(), age_s = age.as_secs(), "Removed stale scratch directory");
                removed += 1;
            }
            Err(e) => {
                warn!(dir = %entry.path().display(), error = %e, "Failed to remove stale scratch directory");
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_stem() {
        assert_eq!(sanitize_stem("My Part (rev 2).step"), "My_Part_rev_2");
        assert_eq!(sanitize_stem("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_stem("???.stl"), "input");
    }

    #[tokio::test]
    async fn test_scratch_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(root.path()).unwrap();
        let path = scratch.path().to_path_buf();
        let input = scratch
            .write_input(Some("bracket.stp"), ".step", b"ISO-10303-21;")
            .await
            .unwrap();
        assert_eq!(input.file_name().unwrap(), "bracket.step");
        assert!(path.starts_with(root.path()));

        drop(scratch);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_sweep_stale_only_touches_scratch_dirs() {
        let root = tempfile::tempdir().unwrap();
        let stale = root.path().join("job-leftover");
        let unrelated = root.path().join("keep-me");
        std::fs::create_dir_all(&stale).unwrap();
        std::fs::create_dir_all(&unrelated).unwrap();

        let removed = sweep_stale(root.path(), Duration::ZERO).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!stale.exists());
        assert!(unrelated.exists());

        let fresh = root.path().join("job-fresh");
        std::fs::create_dir_all(&fresh).unwrap();
        let removed = sweep_stale(root.path(), Duration::from_secs(3600)).await.unwrap();
        assert_eq!(removed, 0);
        assert!(fresh.exists());
    }

    #[tokio::test]
    async fn test_sweep_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("nope");
        assert_eq!(sweep_stale(&missing, Duration::ZERO).await.unwrap(), 0);
    }
}
