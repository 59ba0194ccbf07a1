//! Local filesystem backend.
//!
//! Every path handed to [`LocalFs`] is absolute on the target host and is
//! resolved under a root directory, so a run can be pointed at a staging
//! tree instead of `/`. Symlink targets are stored as given; they are
//! host paths, not staging paths.

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Filesystem rooted at a directory (`/` for the live host).
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl Default for LocalFs {
    fn default() -> Self {
        Self::new("/")
    }
}

impl LocalFs {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Whether this filesystem is a staging tree rather than the live `/`
    pub fn is_staged(&self) -> bool {
        self.root != Path::new("/")
    }

    /// Map a host path to its location under the root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        let relative: PathBuf = path
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect();
        self.root.join(relative)
    }

    /// Resolve a symlink target stored as a host path.
    fn resolve_target(&self, link: &Path, target: &Path) -> PathBuf {
        if target.is_absolute() {
            self.resolve(target)
        } else {
            self.resolve(link)
                .parent()
                .map(|p| p.join(target))
                .unwrap_or_else(|| target.to_path_buf())
        }
    }
}

impl declarative::FileSystem for LocalFs {
    fn read(&self, path: &Path) -> Result<Option<String>> {
        let mut real = self.resolve(path);
        if let Ok(target) = fs::read_link(&real) {
            real = self.resolve_target(path, &target);
        }
        match fs::read_to_string(&real) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", real.display())),
        }
    }

    fn write(&self, path: &Path, content: &str, mode: Option<u32>) -> Result<()> {
        let real = self.resolve(path);
        if let Some(parent) = real.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        fs::write(&real, content).with_context(|| format!("Failed to write {}", real.display()))?;

        #[cfg(unix)]
        if let Some(mode) = mode {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&real, fs::Permissions::from_mode(mode))
                .with_context(|| format!("Failed to set mode {mode:o} on {}", real.display()))?;
        }
        #[cfg(not(unix))]
        let _ = mode;

        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let real = self.resolve(path);
        fs::remove_file(&real).with_context(|| format!("Failed to remove {}", real.display()))
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(self.resolve(path)).is_ok()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        self.resolve(path).is_symlink()
    }

    fn read_link(&self, path: &Path) -> Result<Option<PathBuf>> {
        let real = self.resolve(path);
        if !real.is_symlink() {
            return Ok(None);
        }
        fs::read_link(&real)
            .map(Some)
            .with_context(|| format!("Failed to read symlink {}", real.display()))
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        let real = self.resolve(link);
        if let Some(parent) = real.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        #[cfg(unix)]
        std::os::unix::fs::symlink(target, &real).with_context(|| {
            format!(
                "Failed to create symlink: {} -> {}",
                real.display(),
                target.display()
            )
        })?;

        #[cfg(not(unix))]
        anyhow::bail!("Symlinks not supported on this platform");

        Ok(())
    }
}
