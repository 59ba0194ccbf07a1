//! In-memory host backends
//!
//! A complete host (packages, services, files) kept in memory, recording
//! every mutating operation in order. Used to exercise plans without
//! touching the machine.

use crate::context::{FileSystem, Host, PackageManager, ServiceManager, TemplateRenderer};
use crate::types::Variables;
use anyhow::{Result, anyhow, bail};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A filesystem entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    File { content: String, mode: Option<u32> },
    Symlink(PathBuf),
}

/// Service bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceRecord {
    pub enabled: bool,
    pub running: bool,
    pub reloads: usize,
}

/// Full state of a [`MemoryHost`], comparable across runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostSnapshot {
    pub packages: BTreeSet<String>,
    pub services: BTreeMap<String, ServiceRecord>,
    pub files: BTreeMap<PathBuf, Entry>,
}

/// Host whose state lives in memory
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: RefCell<HostSnapshot>,
    operations: RefCell<Vec<String>>,
    fail_on: Option<String>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark packages as already installed
    pub fn with_packages(self, names: &[&str]) -> Self {
        self.state
            .borrow_mut()
            .packages
            .extend(names.iter().map(|n| (*n).to_string()));
        self
    }

    /// Register a service in the given state
    pub fn with_service(self, name: &str, enabled: bool, running: bool) -> Self {
        self.state.borrow_mut().services.insert(
            name.to_string(),
            ServiceRecord {
                enabled,
                running,
                reloads: 0,
            },
        );
        self
    }

    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.state.borrow_mut().files.insert(
            PathBuf::from(path),
            Entry::File {
                content: content.to_string(),
                mode: None,
            },
        );
        self
    }

    pub fn with_symlink(self, link: &str, target: &str) -> Self {
        self.state
            .borrow_mut()
            .files
            .insert(PathBuf::from(link), Entry::Symlink(PathBuf::from(target)));
        self
    }

    /// Make the operation with this exact label fail (e.g. `"start nginx"`)
    pub fn failing_on(mut self, operation: &str) -> Self {
        self.fail_on = Some(operation.to_string());
        self
    }

    /// Borrow all four backends as a [`Host`]
    pub fn host<'a>(&'a self, templates: &'a dyn TemplateRenderer) -> Host<'a> {
        Host::new(self, self, self, templates)
    }

    /// Mutating operations performed so far, in order
    pub fn operations(&self) -> Vec<String> {
        self.operations.borrow().clone()
    }

    pub fn clear_operations(&self) {
        self.operations.borrow_mut().clear();
    }

    pub fn snapshot(&self) -> HostSnapshot {
        self.state.borrow().clone()
    }

    pub fn service(&self, name: &str) -> ServiceRecord {
        self.state
            .borrow()
            .services
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, operation: String) -> Result<()> {
        if self.fail_on.as_deref() == Some(operation.as_str()) {
            bail!("{operation}: simulated failure");
        }
        self.operations.borrow_mut().push(operation);
        Ok(())
    }

    fn with_service_mut(&self, name: &str, f: impl FnOnce(&mut ServiceRecord)) {
        let mut state = self.state.borrow_mut();
        f(state.services.entry(name.to_string()).or_default());
    }
}

impl PackageManager for MemoryHost {
    fn is_installed(&self, name: &str) -> Result<bool> {
        Ok(self.state.borrow().packages.contains(name))
    }

    fn install(&self, names: &[String]) -> Result<()> {
        self.record(format!("install {}", names.join(" ")))?;
        self.state
            .borrow_mut()
            .packages
            .extend(names.iter().cloned());
        Ok(())
    }
}

impl ServiceManager for MemoryHost {
    fn is_enabled(&self, name: &str) -> Result<bool> {
        Ok(self.service(name).enabled)
    }

    fn is_running(&self, name: &str) -> Result<bool> {
        Ok(self.service(name).running)
    }

    fn enable(&self, name: &str) -> Result<()> {
        self.record(format!("enable {name}"))?;
        self.with_service_mut(name, |s| s.enabled = true);
        Ok(())
    }

    fn start(&self, name: &str) -> Result<()> {
        self.record(format!("start {name}"))?;
        self.with_service_mut(name, |s| s.running = true);
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<()> {
        self.record(format!("stop {name}"))?;
        self.with_service_mut(name, |s| s.running = false);
        Ok(())
    }

    fn reload(&self, name: &str) -> Result<()> {
        self.record(format!("reload {name}"))?;
        self.with_service_mut(name, |s| s.reloads += 1);
        Ok(())
    }
}

impl FileSystem for MemoryHost {
    fn read(&self, path: &Path) -> Result<Option<String>> {
        let state = self.state.borrow();
        let entry = match state.files.get(path) {
            Some(Entry::Symlink(target)) => state.files.get(target),
            other => other,
        };
        Ok(match entry {
            Some(Entry::File { content, .. }) => Some(content.clone()),
            _ => None,
        })
    }

    fn write(&self, path: &Path, content: &str, mode: Option<u32>) -> Result<()> {
        self.record(format!("write {}", path.display()))?;
        self.state.borrow_mut().files.insert(
            path.to_path_buf(),
            Entry::File {
                content: content.to_string(),
                mode,
            },
        );
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        self.record(format!("remove {}", path.display()))?;
        self.state
            .borrow_mut()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| anyhow!("{} does not exist", path.display()))
    }

    fn exists(&self, path: &Path) -> bool {
        self.state.borrow().files.contains_key(path)
    }

    fn is_symlink(&self, path: &Path) -> bool {
        matches!(self.state.borrow().files.get(path), Some(Entry::Symlink(_)))
    }

    fn read_link(&self, path: &Path) -> Result<Option<PathBuf>> {
        Ok(match self.state.borrow().files.get(path) {
            Some(Entry::Symlink(target)) => Some(target.clone()),
            _ => None,
        })
    }

    fn symlink(&self, target: &Path, link: &Path) -> Result<()> {
        if self.exists(link) {
            bail!("{} already exists", link.display());
        }
        self.record(format!("symlink {} -> {}", link.display(), target.display()))?;
        self.state
            .borrow_mut()
            .files
            .insert(link.to_path_buf(), Entry::Symlink(target.to_path_buf()));
        Ok(())
    }
}

/// Renderer that prints the template id and its variables, one per line
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryTemplates;

impl TemplateRenderer for MemoryTemplates {
    fn render(&self, template_id: &str, variables: &Variables) -> Result<String> {
        let mut out = format!("# {template_id}\n");
        for (key, value) in variables {
            out.push_str(&format!("{key} = {value}\n"));
        }
        Ok(out)
    }
}
