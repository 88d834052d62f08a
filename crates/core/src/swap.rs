//! Rename-out / transform / replace around a destructive file rewrite.
//!
//! The target is moved to a sibling `~<name>` file, the transformation reads
//! from that temp path and writes a fresh file at the original location, and
//! the temp copy is removed afterwards. Until the transformation starts, any
//! failure leaves the original in place. Once it has started and failed, both
//! the temp copy and any partial output are removed.
//!
//! Same-directory rename is assumed to be atomic. Filesystems where it is not
//! are unsupported.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::error::PostProcessError;

/// Sibling temp path used while `target` is being rewritten.
pub fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!("~{}", name))
}

/// Moves `target` aside and lets `transform` rebuild it.
///
/// `transform` receives the temp path to read from and must write its result
/// to `target`.
pub async fn swap<F, Fut>(target: &Path, transform: F) -> Result<(), PostProcessError>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<(), PostProcessError>>,
{
    let temp = temp_path_for(target);
    remove_stale(&temp).await?;

    let meta = match fs::metadata(target).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(PostProcessError::MissingInput {
                path: target.to_path_buf(),
            })
        }
        Err(e) => return Err(e.into()),
    };
    if meta.len() == 0 {
        return Err(PostProcessError::corrupt_input(target, "file is empty"));
    }

    fs::rename(target, &temp).await?;

    if let Err(e) = check_readable(&temp).await {
        if let Err(restore_err) = fs::rename(&temp, target).await {
            tracing::error!(
                "Failed to restore {} from {}: {}",
                target.display(),
                temp.display(),
                restore_err
            );
        }
        return Err(PostProcessError::corrupt_input(
            target,
            format!("not readable: {}", e),
        ));
    }

    match transform(temp.clone()).await {
        Ok(()) => {
            if let Err(e) = remove_if_exists(&temp).await {
                tracing::warn!("Failed to remove temp file {}: {}", temp.display(), e);
            }
            Ok(())
        }
        Err(cause) => {
            for path in [temp.as_path(), target] {
                if let Err(e) = remove_if_exists(path).await {
                    tracing::warn!("Failed to clean up {}: {}", path.display(), e);
                }
            }
            Err(PostProcessError::transform_failed(target, cause))
        }
    }
}

/// Deletes a leftover temp file, forcing it writable once if needed.
async fn remove_stale(temp: &Path) -> Result<(), PostProcessError> {
    match fs::remove_file(temp).await {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            tracing::warn!(
                "Could not remove stale temp file {}: {}; retrying as writable",
                temp.display(),
                e
            );
        }
    }

    if let Ok(meta) = fs::metadata(temp).await {
        let mut perms = meta.permissions();
        make_writable(&mut perms);
        let _ = fs::set_permissions(temp, perms).await;
    }

    fs::remove_file(temp)
        .await
        .map_err(|source| PostProcessError::ResourceLocked {
            path: temp.to_path_buf(),
            source,
        })
}

#[cfg(unix)]
fn make_writable(perms: &mut std::fs::Permissions) {
    use std::os::unix::fs::PermissionsExt;
    perms.set_mode(0o666);
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(perms: &mut std::fs::Permissions) {
    perms.set_readonly(false);
}

async fn check_readable(path: &Path) -> std::io::Result<()> {
    let mut file = fs::File::open(path).await?;
    let mut buf = [0u8; 1];
    file.read(&mut buf).await?;
    Ok(())
}

pub(crate) async fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    #[test]
    fn test_temp_path_for() {
        assert_eq!(
            temp_path_for(Path::new("/music/a/song.mp3")),
            PathBuf::from("/music/a/~song.mp3")
        );
    }

    #[tokio::test]
    async fn test_swap_success_replaces_file() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("song.ogg");
        fs::write(&target, b"original").await.unwrap();

        let out = target.clone();
        swap(&target, |temp| async move {
            let data = fs::read(&temp).await?;
            assert_eq!(data, b"original");
            fs::write(&out, b"rewritten").await?;
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(fs::read(&target).await.unwrap(), b"rewritten");
        assert!(!temp_path_for(&target).exists());
    }

    #[tokio::test]
    async fn test_swap_failure_leaves_nothing_behind() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("song.mp3");
        fs::write(&target, b"original").await.unwrap();

        let out = target.clone();
        let result = swap(&target, |_temp| async move {
            fs::write(&out, b"partial").await?;
            Err(PostProcessError::corrupt_input(&out, "tool died"))
        })
        .await;

        assert!(matches!(
            result,
            Err(PostProcessError::TransformFailed { .. })
        ));
        assert!(!target.exists());
        assert!(!temp_path_for(&target).exists());
    }

    #[tokio::test]
    async fn test_swap_rejects_empty_file_without_renaming() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("empty.mp3");
        fs::write(&target, b"").await.unwrap();

        let called = AtomicBool::new(false);
        let result = swap(&target, |_temp| async {
            called.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(PostProcessError::CorruptInput { .. })));
        assert!(!called.load(Ordering::SeqCst));
        assert!(target.exists());
    }

    #[tokio::test]
    async fn test_swap_missing_input() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("gone.mp3");
        let result = swap(&target, |_temp| async { Ok(()) }).await;
        assert!(matches!(result, Err(PostProcessError::MissingInput { .. })));
    }

    #[tokio::test]
    async fn test_swap_removes_stale_temp() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("song.flac");
        fs::write(&target, b"fresh").await.unwrap();
        fs::write(temp_path_for(&target), b"stale").await.unwrap();

        let out = target.clone();
        swap(&target, |temp| async move {
            let data = fs::read(&temp).await?;
            fs::write(&out, data).await?;
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(fs::read(&target).await.unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn test_swap_locked_temp() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("song.mp3");
        fs::write(&target, b"data").await.unwrap();

        // A non-empty directory in the temp slot cannot be unlinked.
        let temp = temp_path_for(&target);
        fs::create_dir(&temp).await.unwrap();
        fs::write(temp.join("inner"), b"x").await.unwrap();

        let result = swap(&target, |_temp| async { Ok(()) }).await;
        assert!(matches!(
            result,
            Err(PostProcessError::ResourceLocked { .. })
        ));
        assert_eq!(fs::read(&target).await.unwrap(), b"data");
    }

    #[tokio::test]
    async fn test_swap_unreadable_input_is_restored() {
        let dir = TempDir::new().unwrap();
        // Renames fine but cannot be read as a file.
        let target = dir.path().join("album.mp3");
        fs::create_dir(&target).await.unwrap();
        fs::write(target.join("track"), b"x").await.unwrap();

        let called = AtomicBool::new(false);
        let result = swap(&target, |_temp| async {
            called.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(PostProcessError::CorruptInput { .. })));
        assert!(!called.load(Ordering::SeqCst));
        assert!(target.join("track").exists());
        assert!(!temp_path_for(&target).exists());
    }
}
