//! The nginx virtual host for Nagios, rendered with minijinja.

use anyhow::{Context, Result};
use declarative::{TemplateRenderer, Variables};
use minijinja::{Environment, UndefinedBehavior};

/// Template id of the Nagios virtual host.
pub const TEMPLATE_ID: &str = "nagios3.conf";

const TEMPLATE_SOURCE: &str = include_str!("../templates/nagios3.conf.j2");

/// Renderer holding the built-in templates.
pub struct VhostTemplates {
    env: Environment<'static>,
}

impl VhostTemplates {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_template(TEMPLATE_ID, TEMPLATE_SOURCE)
            .context("Built-in vhost template is invalid")?;
        Ok(Self { env })
    }
}

impl TemplateRenderer for VhostTemplates {
    fn render(&self, template_id: &str, variables: &Variables) -> Result<String> {
        let template = self
            .env
            .get_template(template_id)
            .with_context(|| format!("Unknown template: {template_id}"))?;
        template
            .render(variables)
            .with_context(|| format!("Failed to render {template_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::HostAttributes;
    use crate::recipe::template_variables;
    use hostkit::PlatformFamily;
    use serde_json::json;

    fn render(overlay: serde_json::Value, family: PlatformFamily) -> String {
        let attrs =
            HostAttributes::resolve(overlay, Some(family), "monitor.example.com").unwrap();
        VhostTemplates::new()
            .unwrap()
            .render(TEMPLATE_ID, &template_variables(&attrs))
            .unwrap()
    }

    #[test]
    fn test_cgi_only_on_debian() {
        let conf = render(json!({}), PlatformFamily::Debian);
        assert!(conf.contains("listen 80;"));
        assert!(conf.contains("fastcgi_pass unix:/var/run/fcgiwrap.socket;"));
        assert!(conf.contains("fastcgi_param SCRIPT_FILENAME /usr/lib/cgi-bin/nagios3/$1;"));
        assert!(!conf.contains("location ~ \\.php$"));
        assert!(conf.contains("auth_basic_user_file /etc/nagios3/htpasswd.users;"));
        assert!(conf.contains("server_name nagios nagios.example.com"));
        assert!(!conf.contains("deny all;"));
        assert!(!conf.contains("ssl_certificate"));
    }

    #[test]
    fn test_rhel_serves_cgi_and_php() {
        let conf = render(json!({}), PlatformFamily::Rhel);
        assert!(conf.contains("fastcgi_pass unix:/var/run/fcgiwrap.socket;"));
        assert!(conf.contains("fastcgi_pass unix:/var/run/php-fpm/www.sock;"));
        assert!(conf.contains("root /usr/share/nagios/html;"));
        assert!(conf.contains("fastcgi_param SCRIPT_FILENAME /usr/lib64/nagios/cgi-bin/$1;"));
        assert!(!conf.contains("/usr/lib/cgi-bin/nagios3"));
    }

    #[test]
    fn test_ssl_and_allowed_ips() {
        let conf = render(
            json!({"nagios": {"enable_ssl": true, "allowed_ips": ["10.0.0.0/8", "192.168.1.5"]}}),
            PlatformFamily::Debian,
        );
        assert!(conf.contains("listen 443 ssl;"));
        assert!(conf.contains("ssl_certificate /etc/nagios3/certificates/nagios-server.pem;"));
        assert!(conf.contains("  allow 10.0.0.0/8;\n  allow 192.168.1.5;\n  deny all;"));
    }

    #[test]
    fn test_missing_variable_is_an_error() {
        let templates = VhostTemplates::new().unwrap();
        let mut variables = Variables::new();
        variables.insert("fqdn".into(), json!("monitor"));
        assert!(templates.render(TEMPLATE_ID, &variables).is_err());
    }

    #[test]
    fn test_unknown_template() {
        let templates = VhostTemplates::new().unwrap();
        assert!(templates.render("apache.conf", &Variables::new()).is_err());
    }
}
