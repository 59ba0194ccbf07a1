//! Distribution package manager backend.

use super::{command_exists, run, run_checked, validate_name};
use crate::error::Result;
use crate::platform::PlatformFamily;
use std::fmt;

/// The package tool used on a platform family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageTool {
    Apt,
    Dnf,
    Yum,
    Zypper,
    Pacman,
}

impl PackageTool {
    /// Pick the tool for a family, preferring dnf over yum where both may exist.
    pub fn for_platform(family: PlatformFamily) -> Self {
        Self::select(family, command_exists("dnf"))
    }

    fn select(family: PlatformFamily, has_dnf: bool) -> Self {
        match family {
            PlatformFamily::Debian => PackageTool::Apt,
            PlatformFamily::Fedora => PackageTool::Dnf,
            PlatformFamily::Rhel | PlatformFamily::Amazon => {
                if has_dnf {
                    PackageTool::Dnf
                } else {
                    PackageTool::Yum
                }
            }
            PlatformFamily::Suse => PackageTool::Zypper,
            PlatformFamily::Arch => PackageTool::Pacman,
        }
    }

    fn executable(&self) -> &'static str {
        match self {
            PackageTool::Apt => "apt-get",
            PackageTool::Dnf => "dnf",
            PackageTool::Yum => "yum",
            PackageTool::Zypper => "zypper",
            PackageTool::Pacman => "pacman",
        }
    }

    /// Arguments that install packages without prompting.
    fn install_args(&self) -> &'static [&'static str] {
        match self {
            PackageTool::Apt => &["install", "-y", "-q"],
            PackageTool::Dnf | PackageTool::Yum => &["install", "-y"],
            PackageTool::Zypper => &["--non-interactive", "install"],
            PackageTool::Pacman => &["-S", "--noconfirm", "--needed"],
        }
    }
}

impl fmt::Display for PackageTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.executable())
    }
}

/// Packages managed by the host's distribution tool.
pub struct SystemPackages {
    tool: PackageTool,
}

impl SystemPackages {
    pub fn new(tool: PackageTool) -> Self {
        Self { tool }
    }

    pub fn for_platform(family: PlatformFamily) -> Self {
        Self::new(PackageTool::for_platform(family))
    }

    fn query(&self, name: &str) -> Result<bool> {
        validate_name("package", name)?;
        let installed = match self.tool {
            PackageTool::Apt => {
                let output = run("dpkg-query", &["-W", "-f=${Status}", name], &[])?;
                output.status.success()
                    && String::from_utf8_lossy(&output.stdout).contains("install ok installed")
            }
            PackageTool::Dnf | PackageTool::Yum | PackageTool::Zypper => {
                run("rpm", &["-q", "--quiet", name], &[])?.status.success()
            }
            PackageTool::Pacman => run("pacman", &["-Q", name], &[])?.status.success(),
        };
        Ok(installed)
    }

    fn install_all(&self, names: &[String]) -> Result<()> {
        for name in names {
            validate_name("package", name)?;
        }
        let mut args: Vec<&str> = self.tool.install_args().to_vec();
        args.extend(names.iter().map(String::as_str));

        let envs: &[(&str, &str)] = match self.tool {
            PackageTool::Apt => &[("DEBIAN_FRONTEND", "noninteractive")],
            _ => &[],
        };
        let subject = names.join(" ");
        run_checked(self.tool.executable(), &args, envs, Some(&subject))?;
        Ok(())
    }
}

impl declarative::PackageManager for SystemPackages {
    fn is_installed(&self, name: &str) -> anyhow::Result<bool> {
        Ok(self.query(name)?)
    }

    fn install(&self, names: &[String]) -> anyhow::Result<()> {
        Ok(self.install_all(names)?)
    }
}
