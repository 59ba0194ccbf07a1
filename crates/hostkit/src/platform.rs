//! Platform family detection.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Locations of the os-release file, in lookup order.
const OS_RELEASE_PATHS: &[&str] = &["/etc/os-release", "/usr/lib/os-release"];

/// Linux distribution family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformFamily {
    /// Debian, Ubuntu and derivatives
    Debian,
    /// RHEL, CentOS, Rocky, Alma, Oracle Linux
    Rhel,
    /// Fedora
    Fedora,
    /// Amazon Linux
    Amazon,
    /// openSUSE and SLES
    Suse,
    /// Arch Linux and derivatives
    Arch,
}

impl PlatformFamily {
    /// All known families, in display order.
    pub const ALL: [PlatformFamily; 6] = [
        PlatformFamily::Debian,
        PlatformFamily::Rhel,
        PlatformFamily::Fedora,
        PlatformFamily::Amazon,
        PlatformFamily::Suse,
        PlatformFamily::Arch,
    ];

    /// Lowercase name as used in attribute files.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformFamily::Debian => "debian",
            PlatformFamily::Rhel => "rhel",
            PlatformFamily::Fedora => "fedora",
            PlatformFamily::Amazon => "amazon",
            PlatformFamily::Suse => "suse",
            PlatformFamily::Arch => "arch",
        }
    }

    /// Whether this family ships nginx packages that need both CGI and PHP dispatch.
    pub fn forces_dual_dispatch(&self) -> bool {
        matches!(
            self,
            PlatformFamily::Rhel | PlatformFamily::Fedora | PlatformFamily::Amazon
        )
    }

    /// Detect the family of the running host from os-release.
    pub fn detect() -> Result<Self> {
        for path in OS_RELEASE_PATHS {
            let path = Path::new(path);
            if !path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(path)?;
            return Self::from_os_release(&content).ok_or_else(|| {
                Error::UnsupportedPlatform(os_release_field(&content, "ID").unwrap_or_default())
            });
        }
        Err(Error::UnsupportedPlatform("unknown".to_string()))
    }

    /// Determine the family from os-release content.
    ///
    /// `ID` is checked first, then each entry of `ID_LIKE`.
    pub fn from_os_release(content: &str) -> Option<Self> {
        let id = os_release_field(content, "ID");
        let like = os_release_field(content, "ID_LIKE").unwrap_or_default();

        id.iter()
            .map(String::as_str)
            .chain(like.split_whitespace())
            .find_map(Self::from_distro_id)
    }

    fn from_distro_id(id: &str) -> Option<Self> {
        match id {
            "debian" | "ubuntu" | "raspbian" | "linuxmint" | "pop" => Some(PlatformFamily::Debian),
            "rhel" | "centos" | "rocky" | "almalinux" | "ol" | "scientific" => {
                Some(PlatformFamily::Rhel)
            }
            "fedora" => Some(PlatformFamily::Fedora),
            "amzn" | "amazon" => Some(PlatformFamily::Amazon),
            "sles" | "suse" | "opensuse" => Some(PlatformFamily::Suse),
            id if id.starts_with("opensuse") => Some(PlatformFamily::Suse),
            "arch" | "manjaro" | "endeavouros" => Some(PlatformFamily::Arch),
            _ => None,
        }
    }
}

impl fmt::Display for PlatformFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == lower)
            .or_else(|| Self::from_distro_id(&lower))
            .ok_or(Error::UnsupportedPlatform(lower))
    }
}

/// Read a `KEY=value` field from os-release content, unquoting the value.
fn os_release_field(content: &str, key: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let (k, v) = line.trim().split_once('=')?;
        (k == key).then(|| v.trim().trim_matches(['"', '\'']).to_lowercase())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_os_release_ubuntu() {
        let content = r#"NAME="Ubuntu"
VERSION_ID="22.04"
ID=ubuntu
ID_LIKE=debian
"#;
        assert_eq!(
            PlatformFamily::from_os_release(content),
            Some(PlatformFamily::Debian)
        );
    }

    #[test]
    fn test_from_os_release_rocky_prefers_id() {
        let content = r#"NAME="Rocky Linux"
ID="rocky"
ID_LIKE="rhel centos fedora"
"#;
        assert_eq!(
            PlatformFamily::from_os_release(content),
            Some(PlatformFamily::Rhel)
        );
    }

    #[test]
    fn test_from_os_release_falls_back_to_id_like() {
        let content = "ID=someos\nID_LIKE=\"fedora\"\n";
        assert_eq!(
            PlatformFamily::from_os_release(content),
            Some(PlatformFamily::Fedora)
        );
        assert_eq!(PlatformFamily::from_os_release("ID=haiku\n"), None);
    }

    #[test]
    fn test_amazon_linux() {
        let content = "NAME=\"Amazon Linux\"\nID=\"amzn\"\nID_LIKE=\"centos rhel fedora\"\n";
        assert_eq!(
            PlatformFamily::from_os_release(content),
            Some(PlatformFamily::Amazon)
        );
    }

    #[test]
    fn test_forces_dual_dispatch() {
        assert!(PlatformFamily::Rhel.forces_dual_dispatch());
        assert!(PlatformFamily::Fedora.forces_dual_dispatch());
        assert!(PlatformFamily::Amazon.forces_dual_dispatch());
        assert!(!PlatformFamily::Debian.forces_dual_dispatch());
        assert!(!PlatformFamily::Suse.forces_dual_dispatch());
        assert!(!PlatformFamily::Arch.forces_dual_dispatch());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("RHEL".parse::<PlatformFamily>().unwrap(), PlatformFamily::Rhel);
        assert_eq!("ubuntu".parse::<PlatformFamily>().unwrap(), PlatformFamily::Debian);
        assert!("windows".parse::<PlatformFamily>().is_err());
    }
}
