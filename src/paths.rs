//! Path resolution for nagios-nginx
//!
//! # Environment Variables
//!
//! - `NAGIOS_NGINX_CONFIG_DIR` - Override config directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `NAGIOS_NGINX_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/nagios-nginx` (if set)
//! 3. Platform default (`~/.config/nagios-nginx`)

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "NAGIOS_NGINX_CONFIG_DIR";

const APP_DIR: &str = "nagios-nginx";

/// File names probed in the config directory, in order.
const ATTRIBUTE_FILES: &[&str] = &["attributes.toml", "attributes.json"];

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    let base = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .context("Could not determine config directory")?;
    let path = base.join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// The attributes file in the config directory, if one exists.
pub fn default_attributes_file() -> Result<Option<PathBuf>> {
    let dir = config_dir()?;
    Ok(ATTRIBUTE_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file()))
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand("~/attrs.toml"), home.join("attrs.toml"));
    }

    #[test]
    fn test_expand_leaves_plain_paths() {
        assert_eq!(
            expand("/etc/nagios-nginx/attributes.json"),
            PathBuf::from("/etc/nagios-nginx/attributes.json")
        );
    }

    #[test]
    fn test_expand_unknown_variable_is_kept() {
        assert_eq!(
            expand("$NAGIOS_NGINX_SURELY_UNSET_VAR/x"),
            PathBuf::from("$NAGIOS_NGINX_SURELY_UNSET_VAR/x")
        );
    }
}
