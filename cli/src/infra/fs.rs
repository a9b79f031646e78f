//! Filesystem infrastructure: implements the `LocalFs` port and the copy
//! helpers the adapters use to stage templates into working directories.

use std::path::Path;

use anyhow::{Context, Result};

/// Production filesystem implementation of `LocalFs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl crate::application::ports::LocalFs for LocalFs {
    fn write(&self, path: &Path, content: &str) -> Result<()> {
        std::fs::write(path, content).with_context(|| format!("writing file {}", path.display()))
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("reading file {}", path.display()))
    }
}

/// Copy every regular file in `src` whose name ends in `suffix` into `dst`.
///
/// Returns the number of files copied.
///
/// # Errors
///
/// Returns an error if either directory cannot be read or a copy fails.
pub fn copy_matching(src: &Path, dst: &Path, suffix: &str) -> Result<usize> {
    std::fs::create_dir_all(dst).with_context(|| format!("creating directory {}", dst.display()))?;
    let entries =
        std::fs::read_dir(src).with_context(|| format!("reading directory {}", src.display()))?;
    let mut copied = 0;
    for entry in entries {
        let entry = entry.with_context(|| format!("reading directory {}", src.display()))?;
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(suffix));
        if path.is_file() && matches {
            std::fs::copy(&path, dst.join(entry.file_name()))
                .with_context(|| format!("copying {}", path.display()))?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Write `content` to `path`, creating parents, with owner-only permissions.
///
/// # Errors
///
/// Returns an error if the file or its parent cannot be written.
pub fn write_private(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("writing file {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("setting permissions on {}", path.display()))?;
    }
    Ok(())
}

/// Contents of `path`, or an empty string when it does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn read_optional(path: &Path) -> Result<String> {
    if !path.exists() {
        return Ok(String::new());
    }
    std::fs::read_to_string(path).with_context(|| format!("reading file {}", path.display()))
}
