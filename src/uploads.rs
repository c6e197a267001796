//! Payload storage for uploaded files.
//!
//! Files are written under the configured directory as
//! `<unix-millis><original name>`; the returned content reference is that
//! path. Names are reduced to their last path component and to a safe
//! character set before use.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use docport_core::error::{DocError, DocResult};

const FALLBACK_NAME: &str = "upload.bin";

#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Writes a payload and returns its content reference.
    pub async fn save(&self, original_name: &str, bytes: &[u8]) -> DocResult<String> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let name = sanitize_file_name(original_name);
        let stamp = chrono::Utc::now().timestamp_millis();

        for attempt in 0..100u32 {
            let file_name = if attempt == 0 {
                format!("{}{}", stamp, name)
            } else {
                format!("{}-{}{}", stamp, attempt, name)
            };
            let path = self.dir.join(&file_name);
            let opened = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await;
            let mut file = match opened {
                Ok(f) => f,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(DocError::Store(
                        anyhow::Error::new(e).context(format!("Failed to create {}", path.display())),
                    ))
                }
            };
            file.write_all(bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            file.flush()
                .await
                .with_context(|| format!("Failed to flush {}", path.display()))?;
            return Ok(path.display().to_string());
        }

        Err(DocError::Store(anyhow::anyhow!(
            "could not allocate a unique file name for {}",
            name
        )))
    }

    /// Best-effort removal of a payload written by [`save`](Self::save).
    ///
    /// References outside the storage directory are left alone.
    pub async fn discard(&self, content_ref: &str) {
        let path = Path::new(content_ref);
        if !path.starts_with(&self.dir) {
            warn!(content_ref, "refusing to remove payload outside storage dir");
            return;
        }
        if let Err(e) = tokio::fs::remove_file(path).await {
            warn!(content_ref, error = %e, "failed to remove orphaned payload");
        }
    }
}

/// Last path component, restricted to `[A-Za-z0-9._-]`.
pub fn sanitize_file_name(raw: &str) -> String {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\report.pdf"), "report.pdf");
        assert_eq!(sanitize_file_name("my report (v2).pdf"), "my_report__v2_.pdf");
    }

    #[test]
    fn test_sanitize_falls_back_on_empty() {
        assert_eq!(sanitize_file_name(""), "upload.bin");
        assert_eq!(sanitize_file_name("dir/"), "upload.bin");
        assert_eq!(sanitize_file_name("..."), "upload.bin");
    }

    #[tokio::test]
    async fn test_save_writes_unique_files() {
        let tmp = TempDir::new().unwrap();
        let storage = FileStorage::new(tmp.path().join("files"));

        let a = storage.save("plan.pdf", b"one").await.unwrap();
        let b = storage.save("plan.pdf", b"two").await.unwrap();
        assert_ne!(a, b);
        assert!(a.ends_with("plan.pdf"));
        assert_eq!(std::fs::read(&a).unwrap(), b"one");
        assert_eq!(std::fs::read(&b).unwrap(), b"two");

        storage.discard(&a).await;
        assert!(!Path::new(&a).exists());
    }

    #[tokio::test]
    async fn test_discard_ignores_foreign_paths() {
        let tmp = TempDir::new().unwrap();
        let outside = tmp.path().join("keep.txt");
        std::fs::write(&outside, b"x").unwrap();

        let storage = FileStorage::new(tmp.path().join("files"));
        storage.discard(&outside.display().to_string()).await;
        assert!(outside.exists());
    }
}
