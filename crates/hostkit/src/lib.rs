//! # hostkit
//!
//! Linux host backends for the `declarative` step runner.
//!
//! This crate provides:
//! - Platform family detection from os-release
//! - Package installation through apt-get, dnf, yum, zypper, or pacman
//! - Service control through systemctl
//! - A filesystem rooted at a configurable directory, so runs can target a
//!   staging tree
//!
//! ## Example
//!
//! ```no_run
//! use hostkit::{LocalFs, PlatformFamily, SystemHost};
//! use declarative::memory::MemoryTemplates;
//!
//! let family = PlatformFamily::detect().expect("unsupported host");
//! let system = SystemHost::new(family, LocalFs::default());
//! let host = system.host(&MemoryTemplates);
//! ```
//!
//! Failures from the package tools are categorized (see [`ErrorCategory`])
//! so the operator gets actionable advice instead of raw stderr.

#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod fs;
pub mod platform;

pub use backend::packages::{PackageTool, SystemPackages};
pub use backend::staged::Staged;
pub use backend::systemd::Systemd;
pub use error::{Error, ErrorCategory, Result};
pub use fs::LocalFs;
pub use platform::PlatformFamily;

use declarative::{Host, TemplateRenderer};

enum Backends {
    Live {
        packages: SystemPackages,
        services: Systemd,
    },
    Staged(Staged<SystemPackages, Systemd>),
}

/// The live host: distribution packages, systemd, and a local filesystem.
///
/// When the filesystem is rooted anywhere but `/`, package and service
/// changes are recorded instead of run (see [`Staged`]).
pub struct SystemHost {
    backends: Backends,
    /// Filesystem backend
    pub files: LocalFs,
}

impl SystemHost {
    /// Create backends for a platform family over the given filesystem.
    pub fn new(family: PlatformFamily, files: LocalFs) -> Self {
        let packages = SystemPackages::for_platform(family);
        let services = Systemd::new();
        let backends = if files.is_staged() {
            Backends::Staged(Staged::new(packages, services))
        } else {
            Backends::Live { packages, services }
        };
        Self { backends, files }
    }

    pub fn is_staged(&self) -> bool {
        matches!(self.backends, Backends::Staged(_))
    }

    /// Package and service operations skipped because the run is staged
    pub fn skipped(&self) -> Vec<String> {
        match &self.backends {
            Backends::Live { .. } => Vec::new(),
            Backends::Staged(staged) => staged.skipped(),
        }
    }

    /// Borrow the backends as a [`Host`], rendering with `templates`.
    pub fn host<'a>(&'a self, templates: &'a dyn TemplateRenderer) -> Host<'a> {
        match &self.backends {
            Backends::Live { packages, services } => {
                Host::new(packages, services, &self.files, templates)
            }
            Backends::Staged(staged) => Host::new(staged, staged, &self.files, templates),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::memory::MemoryTemplates;
    use declarative::{Action, ExecuteOptions, ExecutionPlan, FileSystem, execute_simple};
    use std::path::Path;

    #[test]
    fn test_root_filesystem_uses_live_backends() {
        let system = SystemHost::new(PlatformFamily::Debian, LocalFs::default());
        assert!(!system.is_staged());
        assert!(system.skipped().is_empty());
    }

    #[test]
    fn test_staging_root_never_runs_package_or_service_commands() {
        let temp = tempfile::tempdir().unwrap();
        let system = SystemHost::new(PlatformFamily::Debian, LocalFs::new(temp.path()));
        assert!(system.is_staged());

        let mut plan = ExecutionPlan::new();
        plan.push_action(Action::ReloadService {
            name: "nagios-nginx-staging-test".into(),
        });
        plan.push_action(Action::DeleteFile {
            path: "/etc/nginx/conf.d/default.conf".into(),
        });
        let summary = execute_simple(
            &plan,
            system.host(&MemoryTemplates),
            &ExecuteOptions::default(),
        )
        .unwrap();

        assert_eq!(summary.modified, 1);
        assert_eq!(system.skipped(), vec!["reload nagios-nginx-staging-test"]);
        assert!(!system.files.exists(Path::new("/etc/nginx/conf.d/default.conf")));
    }
}
