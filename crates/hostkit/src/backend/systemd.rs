//! systemd service backend.

use super::{run, run_checked, validate_name};
use crate::error::Result;

/// Services supervised by systemd, driven through `systemctl`.
#[derive(Debug, Default)]
pub struct Systemd;

impl Systemd {
    pub fn new() -> Self {
        Self
    }

    /// `systemctl <query> <unit>` exit status, for is-enabled/is-active.
    fn query(&self, query: &str, name: &str) -> Result<bool> {
        validate_name("service", name)?;
        Ok(run("systemctl", &["--quiet", query, name], &[])?
            .status
            .success())
    }

    /// `systemctl` verb for a reload notification: a stopped unit is started
    /// so it comes up with the new configuration.
    fn reload_verb(running: bool) -> &'static str {
        if running { "reload" } else { "start" }
    }

    fn control(&self, verb: &str, name: &str) -> Result<()> {
        validate_name("service", name)?;
        run_checked("systemctl", &[verb, name], &[], Some(name))?;
        Ok(())
    }
}

impl declarative::ServiceManager for Systemd {
    fn is_enabled(&self, name: &str) -> anyhow::Result<bool> {
        Ok(self.query("is-enabled", name)?)
    }

    fn is_running(&self, name: &str) -> anyhow::Result<bool> {
        Ok(self.query("is-active", name)?)
    }

    fn enable(&self, name: &str) -> anyhow::Result<()> {
        Ok(self.control("enable", name)?)
    }

    fn start(&self, name: &str) -> anyhow::Result<()> {
        Ok(self.control("start", name)?)
    }

    fn stop(&self, name: &str) -> anyhow::Result<()> {
        Ok(self.control("stop", name)?)
    }

    fn reload(&self, name: &str) -> anyhow::Result<()> {
        let running = self.query("is-active", name)?;
        if !running {
            log::debug!("{name} is not running, starting instead of reloading");
        }
        Ok(self.control(Self::reload_verb(running), name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::ServiceManager;

    #[test]
    fn test_rejects_option_like_unit_names() {
        let systemd = Systemd::new();
        assert!(systemd.is_enabled("--all").is_err());
        assert!(systemd.start("nginx && reboot").is_err());
    }

    #[test]
    fn test_reload_starts_a_stopped_unit() {
        assert_eq!(Systemd::reload_verb(true), "reload");
        assert_eq!(Systemd::reload_verb(false), "start");
    }
}
