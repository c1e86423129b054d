use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically replace `path` with `content`
///
/// The bytes go to a sibling `.tmp` file which is synced and then renamed over
/// the target, so `status` never reads a half-written state file.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    write_then_rename(path, content, None)
}

/// Like [`atomic_write`], but the file is created owner-only (0600 on Unix)
///
/// The mode is applied to the temporary file, before any secret is written.
pub fn atomic_write_private(path: &Path, content: &[u8]) -> Result<()> {
    write_then_rename(path, content, Some(0o600))
}

fn write_then_rename(path: &Path, content: &[u8], mode: Option<u32>) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory_exists(parent)?;
    }

    let temp_path = temp_path_for(path);

    {
        let mut file = create_file(&temp_path, mode)
            .with_context(|| format!("Failed to create {}", temp_path.display()))?;
        file.write_all(content)
            .with_context(|| format!("Failed to write {}", temp_path.display()))?;
        file.sync_all()
            .with_context(|| format!("Failed to sync {}", temp_path.display()))?;
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
    }

    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn create_file(path: &Path, mode: Option<u32>) -> std::io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

        if let Some(mode) = mode {
            options.mode(mode);
            // An existing temp file keeps its old mode
            let file = options.open(path)?;
            file.set_permissions(std::fs::Permissions::from_mode(mode))?;
            return Ok(file);
        }
    }

    #[cfg(not(unix))]
    let _ = mode;

    options.open(path)
}

/// Create `path` and its parents if missing
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() || path.is_dir() {
        return Ok(());
    }

    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))
}
