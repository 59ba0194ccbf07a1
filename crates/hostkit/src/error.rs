//! Error types for host operations.
//!
//! Package manager failures are categorized from their stderr so callers can
//! tell a missing package from a held lock or a dead mirror, and tell the
//! operator what to do about it.

use thiserror::Error;

/// Categories of host errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Network-related errors (mirror unreachable, DNS, TLS)
    Network,
    /// Another process holds the package database lock
    Locked,
    /// Package or unit not found
    NotFound,
    /// Permission denied (usually not running as root)
    Permission,
    /// Required tool (apt-get, dnf, systemctl, ...) not found
    ToolNotFound,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is typically transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Network | Self::Locked)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "Network connectivity issue",
            Self::Locked => "Package database locked",
            Self::NotFound => "Not found",
            Self::Permission => "Permission denied",
            Self::ToolNotFound => "Required tool not installed",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Network => "Check the configured package mirrors and try again",
            Self::Locked => "Wait for the other package manager run to finish and try again",
            Self::NotFound => "Check the package or service name in the host attributes",
            Self::Permission => "Run apply as root; package and service steps need it",
            Self::ToolNotFound => "Set platform_family to match the host distribution",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while operating on the host.
#[derive(Debug, Error)]
pub enum Error {
    /// Network-related error while fetching packages
    #[error("network error: {message}")]
    Network {
        /// Detailed error message from the package manager
        message: String,
    },

    /// Package database is locked by another process
    #[error("package database locked: {message}")]
    Locked {
        /// Lock holder details reported by the package manager
        message: String,
    },

    /// Package or service unit not found
    #[error("not found: {name}")]
    NotFound {
        /// Name of the package or unit
        name: String,
    },

    /// Permission denied
    #[error("permission denied: {message}")]
    Permission {
        /// Details about what permission was denied
        message: String,
    },

    /// Required executable not found in PATH
    #[error("{tool} not found in PATH")]
    ToolNotFound {
        /// Name of the missing executable
        tool: String,
    },

    /// Name rejected before it reached a command line
    #[error("invalid {kind} name: '{name}'")]
    InvalidName {
        /// What the name was for ("package", "service")
        kind: &'static str,
        /// The rejected name
        name: String,
    },

    /// Platform family without a known package manager
    #[error("no package manager known for platform family '{0}'")]
    UnsupportedPlatform(String),

    /// Command execution failed
    #[error("command failed: {message}")]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Network { .. } => ErrorCategory::Network,
            Error::Locked { .. } => ErrorCategory::Locked,
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Permission { .. } => ErrorCategory::Permission,
            Error::ToolNotFound { .. } => ErrorCategory::ToolNotFound,
            Error::Io(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                ErrorCategory::Permission
            }
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error is typically transient.
    pub fn is_transient(&self) -> bool {
        self.category().is_transient()
    }

    /// Create an error from a failed command's stderr.
    ///
    /// Analyzes stderr of apt-get, dnf, yum, zypper, pacman, or systemctl to
    /// categorize the error appropriately.
    pub fn from_output(tool: &str, stderr: &str, subject: Option<&str>) -> Self {
        let stderr_lower = stderr.to_lowercase();

        // Lock contention
        if stderr_lower.contains("could not get lock")
            || stderr_lower.contains("unable to acquire the dpkg frontend lock")
            || stderr_lower.contains("waiting for process with pid")
            || stderr_lower.contains("system management is locked")
            || stderr_lower.contains("unable to lock database")
        {
            return Error::Locked {
                message: stderr.trim().to_string(),
            };
        }

        // Network errors
        if stderr_lower.contains("temporary failure resolving")
            || stderr_lower.contains("could not resolve")
            || stderr_lower.contains("failed to fetch")
            || stderr_lower.contains("failed to download")
            || stderr_lower.contains("connection refused")
            || stderr_lower.contains("timed out")
            || stderr_lower.contains("cannot download")
        {
            return Error::Network {
                message: stderr.trim().to_string(),
            };
        }

        // Not found errors
        if stderr_lower.contains("unable to locate package")
            || stderr_lower.contains("has no installation candidate")
            || stderr_lower.contains("no match for argument")
            || stderr_lower.contains("no package")
            || stderr_lower.contains("not found in package names")
            || stderr_lower.contains("target not found")
            || (stderr_lower.contains("unit") && stderr_lower.contains("not found"))
            || stderr_lower.contains("does not exist")
        {
            return Error::NotFound {
                name: subject.unwrap_or("unknown").to_string(),
            };
        }

        // Permission errors
        if stderr_lower.contains("permission denied")
            || stderr_lower.contains("are you root")
            || stderr_lower.contains("must be run as root")
            || stderr_lower.contains("access denied")
            || stderr_lower.contains("interactive authentication required")
        {
            return Error::Permission {
                message: stderr.trim().to_string(),
            };
        }

        // Default to command failed
        Error::CommandFailed {
            message: format!(
                "{tool} failed{}",
                subject.map(|n| format!(" for {n}")).unwrap_or_default()
            ),
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Result type for host operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_transient() {
        assert!(ErrorCategory::Network.is_transient());
        assert!(ErrorCategory::Locked.is_transient());
        assert!(!ErrorCategory::NotFound.is_transient());
        assert!(!ErrorCategory::Permission.is_transient());
    }

    #[test]
    fn test_from_output_apt_lock() {
        let err = Error::from_output(
            "apt-get",
            "E: Could not get lock /var/lib/dpkg/lock-frontend. It is held by process 1234 (apt)",
            Some("fcgiwrap"),
        );
        assert_eq!(err.category(), ErrorCategory::Locked);
        assert!(err.is_transient());
    }

    #[test]
    fn test_from_output_apt_not_found() {
        let err = Error::from_output(
            "apt-get",
            "E: Unable to locate package php5-fpm",
            Some("php5-fpm"),
        );
        assert_eq!(err.category(), ErrorCategory::NotFound);
        assert_eq!(err.to_string(), "not found: php5-fpm");
    }

    #[test]
    fn test_from_output_dnf_not_found() {
        let err = Error::from_output(
            "dnf",
            "Error: Unable to find a match: no match for argument: fcgiwrap",
            Some("fcgiwrap"),
        );
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_from_output_network() {
        let err = Error::from_output(
            "apt-get",
            "W: Failed to fetch http://deb.debian.org/debian/dists/bookworm/InRelease  Temporary failure resolving 'deb.debian.org'",
            None,
        );
        assert_eq!(err.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_from_output_systemctl_unit_missing() {
        let err = Error::from_output(
            "systemctl",
            "Failed to start php-fpm.service: Unit php-fpm.service not found.",
            Some("php-fpm"),
        );
        assert_eq!(err.category(), ErrorCategory::NotFound);
    }

    #[test]
    fn test_from_output_permission() {
        let err = Error::from_output(
            "apt-get",
            "E: Could not open lock file /var/lib/dpkg/lock-frontend - open (13: Permission denied)\nE: are you root?",
            None,
        );
        assert_eq!(err.category(), ErrorCategory::Permission);
    }

    #[test]
    fn test_from_output_fallback() {
        let err = Error::from_output("dnf", "something odd", Some("nginx"));
        assert_eq!(err.category(), ErrorCategory::Other);
        assert_eq!(err.to_string(), "command failed: dnf failed for nginx");
    }
}
