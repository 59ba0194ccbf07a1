//! Backend traits and apply context
//!
//! These traits let the step engine run against any host: the real system
//! (see the `hostkit` crate), a staging tree, or the in-memory host used in
//! tests.

use crate::types::{ApplyResult, ServiceState, Timing, Variables};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Package installation backend
pub trait PackageManager {
    /// Check whether a package is installed
    fn is_installed(&self, name: &str) -> Result<bool>;

    /// Install the given packages in one transaction
    fn install(&self, names: &[String]) -> Result<()>;

    /// Packages from `names` that are not installed yet, in input order
    fn missing(&self, names: &[String]) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for name in names {
            if !self.is_installed(name)? {
                missing.push(name.clone());
            }
        }
        Ok(missing)
    }
}

/// Service supervision backend
pub trait ServiceManager {
    /// Whether the service starts at boot
    fn is_enabled(&self, name: &str) -> Result<bool>;

    /// Whether the service is running
    fn is_running(&self, name: &str) -> Result<bool>;

    fn enable(&self, name: &str) -> Result<()>;
    fn start(&self, name: &str) -> Result<()>;
    fn stop(&self, name: &str) -> Result<()>;

    /// Ask the service to re-read its configuration
    fn reload(&self, name: &str) -> Result<()>;

    /// Whether the service differs from `state`
    fn needs_change(&self, name: &str, state: ServiceState) -> Result<bool> {
        Ok(match state {
            ServiceState::Enabled => !self.is_enabled(name)?,
            ServiceState::Started => !self.is_running(name)?,
            ServiceState::Stopped => self.is_running(name)?,
        })
    }

    /// Move the service to `state`, returning whether anything changed
    fn set_state(&self, name: &str, state: ServiceState) -> Result<bool> {
        if !self.needs_change(name, state)? {
            return Ok(false);
        }
        match state {
            ServiceState::Enabled => self.enable(name)?,
            ServiceState::Started => self.start(name)?,
            ServiceState::Stopped => self.stop(name)?,
        }
        Ok(true)
    }
}

/// Filesystem backend
pub trait FileSystem {
    /// Read a file, `None` if it does not exist
    fn read(&self, path: &Path) -> Result<Option<String>>;

    /// Write a file, creating parent directories, applying `mode` if given
    fn write(&self, path: &Path, content: &str, mode: Option<u32>) -> Result<()>;

    /// Remove a file or symlink
    fn remove(&self, path: &Path) -> Result<()>;

    /// Whether anything exists at `path`, dangling symlinks included
    fn exists(&self, path: &Path) -> bool;

    fn is_symlink(&self, path: &Path) -> bool;

    /// Target of the symlink at `path`, `None` if it is not a symlink
    fn read_link(&self, path: &Path) -> Result<Option<PathBuf>>;

    /// Create a symlink at `link` pointing to `target`
    fn symlink(&self, target: &Path, link: &Path) -> Result<()>;

    /// Remove `path` if present, returning whether anything changed
    fn delete(&self, path: &Path) -> Result<bool> {
        if !self.exists(path) {
            return Ok(false);
        }
        self.remove(path)?;
        Ok(true)
    }

    /// Write `content` unless the file already holds it, returning whether anything changed
    fn write_if_different(&self, path: &Path, content: &str, mode: Option<u32>) -> Result<bool> {
        if self.read(path)?.as_deref() == Some(content) {
            return Ok(false);
        }
        self.write(path, content, mode)?;
        Ok(true)
    }
}

/// Template rendering backend
pub trait TemplateRenderer {
    /// Render the template registered as `template_id`
    fn render(&self, template_id: &str, variables: &Variables) -> Result<String>;
}

/// Short content digest shown in diffs and logs
pub fn digest(content: &str) -> String {
    let hash = blake3::hash(content.as_bytes()).to_hex();
    hash.as_str()[..16].to_string()
}

/// The set of backends a run is applied against
#[derive(Clone, Copy)]
pub struct Host<'a> {
    pub packages: &'a dyn PackageManager,
    pub services: &'a dyn ServiceManager,
    pub files: &'a dyn FileSystem,
    pub templates: &'a dyn TemplateRenderer,
}

impl<'a> Host<'a> {
    pub fn new(
        packages: &'a dyn PackageManager,
        services: &'a dyn ServiceManager,
        files: &'a dyn FileSystem,
        templates: &'a dyn TemplateRenderer,
    ) -> Self {
        Self {
            packages,
            services,
            files,
            templates,
        }
    }
}

/// Context passed to action apply operations
pub struct ApplyContext<'a> {
    /// Whether this is a dry run (no actual changes)
    pub dry_run: bool,
    /// Backends to apply against
    pub host: Host<'a>,
}

impl<'a> ApplyContext<'a> {
    pub fn new(host: Host<'a>, dry_run: bool) -> Self {
        Self { dry_run, host }
    }
}

/// Progress callback for execution
///
/// Implement this trait to receive progress updates during a run.
pub trait ProgressCallback {
    /// Called before a step or handler is applied
    fn on_step_start(&mut self, id: &str, description: &str);

    /// Called when a step or handler completes
    fn on_step_complete(&mut self, id: &str, result: &ApplyResult);

    /// Called when a changed step notifies a handler
    fn on_notify(&mut self, step: &str, handler: &str, timing: Timing);

    /// Called once the plan has been fully processed
    fn on_run_complete(&mut self);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_step_start(&mut self, _id: &str, _description: &str) {}
    fn on_step_complete(&mut self, _id: &str, _result: &ApplyResult) {}
    fn on_notify(&mut self, _step: &str, _handler: &str, _timing: Timing) {}
    fn on_run_complete(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;

    #[test]
    fn test_digest_is_stable_and_short() {
        assert_eq!(digest("server {}"), digest("server {}"));
        assert_ne!(digest("server {}"), digest("server { }"));
        assert_eq!(digest("").len(), 16);
    }

    #[test]
    fn test_write_if_different_compares_full_content() {
        let path = Path::new("/etc/nginx/sites-available/nagios3.conf");
        let mem = MemoryHost::new()
            .with_file("/etc/nginx/sites-available/nagios3.conf", "listen 80;\n");

        assert!(!mem.write_if_different(path, "listen 80;\n", None).unwrap());
        assert!(mem.operations().is_empty());

        assert!(mem.write_if_different(path, "listen 80; \n", None).unwrap());
        assert_eq!(mem.read(path).unwrap().as_deref(), Some("listen 80; \n"));
    }
}
