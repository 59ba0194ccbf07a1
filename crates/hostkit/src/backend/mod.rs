//! Command-line backends for the running host.
//!
//! [`packages::SystemPackages`] and [`systemd::Systemd`] implement the
//! `declarative` backend traits by shelling out to the distribution tools.
//! [`staged::Staged`] wraps them for runs against a staging root.

pub mod packages;
pub mod staged;
pub mod systemd;

use crate::error::{Error, Result};
use regex::Regex;
use std::process::{Command, Output};
use std::sync::LazyLock;

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._+@:-]*$").expect("name pattern is valid")
});

/// Reject names that could be mistaken for options or carry shell syntax.
pub fn validate_name(kind: &'static str, name: &str) -> Result<()> {
    if NAME_RE.is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidName {
            kind,
            name: name.to_string(),
        })
    }
}

/// Check if a command exists in PATH.
pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run a command and return its raw output.
pub(crate) fn run(cmd: &str, args: &[&str], envs: &[(&str, &str)]) -> Result<Output> {
    log::debug!("Running: {} {}", cmd, args.join(" "));
    Command::new(cmd)
        .args(args)
        .envs(envs.iter().copied())
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ToolNotFound {
                    tool: cmd.to_string(),
                }
            } else {
                Error::Io(e)
            }
        })
}

/// Run a command and categorize its stderr on failure.
pub(crate) fn run_checked(
    cmd: &str,
    args: &[&str],
    envs: &[(&str, &str)],
    subject: Option<&str>,
) -> Result<String> {
    let output = run(cmd, args, envs)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::from_output(cmd, &stderr, subject));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("package", "php8.2-fpm").is_ok());
        assert!(validate_name("package", "libstdc++6").is_ok());
        assert!(validate_name("service", "getty@tty1").is_ok());
        assert!(validate_name("package", "-y").is_err());
        assert!(validate_name("package", "nginx; rm -rf /").is_err());
        assert!(validate_name("service", "").is_err());
    }

    #[test]
    fn test_missing_tool_is_categorized() {
        let err = run("definitely-not-a-real-tool-xyz", &[], &[]).unwrap_err();
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }
}
