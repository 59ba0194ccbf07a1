//! Package and service backend for runs against a staging root.
//!
//! Queries still go to the wrapped backends. Installs and service
//! transitions are logged and recorded instead, so a staged apply only ever
//! writes under its root.

use anyhow::Result;
use declarative::{PackageManager, ServiceManager};
use std::cell::RefCell;

/// Read-through, write-nothing wrapper over a package and a service backend.
pub struct Staged<P, S> {
    packages: P,
    services: S,
    skipped: RefCell<Vec<String>>,
}

impl<P, S> Staged<P, S> {
    pub fn new(packages: P, services: S) -> Self {
        Self {
            packages,
            services,
            skipped: RefCell::new(Vec::new()),
        }
    }

    /// Operations that were recorded instead of run, in order
    pub fn skipped(&self) -> Vec<String> {
        self.skipped.borrow().clone()
    }

    fn record(&self, operation: String) {
        log::info!("Staged root, not running: {operation}");
        self.skipped.borrow_mut().push(operation);
    }
}

impl<P: PackageManager, S> PackageManager for Staged<P, S> {
    fn is_installed(&self, name: &str) -> Result<bool> {
        self.packages.is_installed(name)
    }

    fn install(&self, names: &[String]) -> Result<()> {
        self.record(format!("install {}", names.join(" ")));
        Ok(())
    }
}

impl<P, S: ServiceManager> ServiceManager for Staged<P, S> {
    fn is_enabled(&self, name: &str) -> Result<bool> {
        self.services.is_enabled(name)
    }

    fn is_running(&self, name: &str) -> Result<bool> {
        self.services.is_running(name)
    }

    fn enable(&self, name: &str) -> Result<()> {
        self.record(format!("enable {name}"));
        Ok(())
    }

    fn start(&self, name: &str) -> Result<()> {
        self.record(format!("start {name}"));
        Ok(())
    }

    fn stop(&self, name: &str) -> Result<()> {
        self.record(format!("stop {name}"));
        Ok(())
    }

    fn reload(&self, name: &str) -> Result<()> {
        self.record(format!("reload {name}"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::ServiceState;
    use declarative::memory::MemoryHost;

    #[test]
    fn test_mutations_are_recorded_not_run() {
        let packages = MemoryHost::new().with_packages(&["fcgiwrap"]);
        let services = MemoryHost::new().with_service("apache2", true, true);
        let staged = Staged::new(packages, services);

        let missing = staged
            .missing(&["fcgiwrap".to_string(), "nginx".to_string()])
            .unwrap();
        assert_eq!(missing, vec!["nginx"]);
        staged.install(&missing).unwrap();
        assert!(staged.set_state("apache2", ServiceState::Stopped).unwrap());
        assert!(!staged.set_state("apache2", ServiceState::Enabled).unwrap());
        staged.reload("nginx").unwrap();

        assert_eq!(
            staged.skipped(),
            vec!["install nginx", "stop apache2", "reload nginx"]
        );
        assert!(staged.packages.operations().is_empty());
        assert!(staged.services.operations().is_empty());
        assert!(staged.services.is_running("apache2").unwrap());
    }
}
