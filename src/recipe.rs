//! Builds the step list that puts nginx in front of Nagios.
//!
//! The builder is pure: everything it needs from the host is probed up
//! front into [`HostFacts`], so the same attributes and facts always yield
//! the same plan.

use crate::attributes::HostAttributes;
use crate::auth;
use crate::vhost::TEMPLATE_ID;
use declarative::{
    Action, ExecutionPlan, FileSystem, ServiceState, Step, Timing, Variables,
};
use serde_json::json;
use std::path::PathBuf;

/// Handler that reloads nginx.
pub const RELOAD_NGINX: &str = "reload-nginx";

/// Site file name of the Nagios virtual host.
pub const VHOST_SITE: &str = "nagios3.conf";

/// Sites shipped by distribution packages that would shadow the Nagios vhost.
const DEFAULT_SITES: &[&str] = &["default", "000-default"];

const VHOST_MODE: u32 = 0o644;

/// Facts read from the host before building.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostFacts {
    /// The vhost is already linked into sites-enabled
    pub vhost_enabled: bool,
}

impl HostFacts {
    pub fn probe(files: &dyn FileSystem, attrs: &HostAttributes) -> Self {
        let facts = Self {
            vhost_enabled: files.is_symlink(&enabled_site(attrs, VHOST_SITE)),
        };
        log::debug!("Probed host facts: {facts:?}");
        facts
    }
}

pub fn available_site(attrs: &HostAttributes, name: &str) -> PathBuf {
    attrs.nginx.dir.join("sites-available").join(name)
}

pub fn enabled_site(attrs: &HostAttributes, name: &str) -> PathBuf {
    attrs.nginx.dir.join("sites-enabled").join(name)
}

/// Build the ordered plan for this host.
pub fn build(attrs: &HostAttributes, facts: HostFacts) -> ExecutionPlan {
    let mut plan = ExecutionPlan::new();
    plan.add_handler(
        RELOAD_NGINX,
        Action::ReloadService {
            name: "nginx".to_string(),
        },
    );

    let server = &attrs.nagios.server;
    if server.stop_apache {
        plan.push_action(Action::SetServiceState {
            name: "apache2".to_string(),
            state: ServiceState::Stopped,
        });
    }

    let dispatch = &server.nginx_dispatch;
    if !dispatch.packages.is_empty() {
        plan.push_action(Action::InstallPackages {
            names: dispatch.packages.clone(),
        });
    }
    for service in &dispatch.services {
        enable_and_start(&mut plan, service);
    }

    if attrs.nginx.install {
        plan.push_action(Action::InstallPackages {
            names: vec![attrs.nginx.package.clone()],
        });
        enable_and_start(&mut plan, "nginx");
    }

    for site in DEFAULT_SITES {
        plan.push(
            Step::new(Action::DeleteFile {
                path: enabled_site(attrs, site),
            })
            .notifies(RELOAD_NGINX, Timing::Deferred),
        );
    }

    plan.push(
        Step::new(Action::DeleteFile {
            path: attrs.nginx.dir.join("conf.d").join("default.conf"),
        })
        .notifies(RELOAD_NGINX, Timing::Immediate),
    );

    let vhost_timing = if facts.vhost_enabled {
        Timing::Immediate
    } else {
        Timing::Deferred
    };
    plan.push(
        Step::new(Action::RenderTemplate {
            path: available_site(attrs, VHOST_SITE),
            template: TEMPLATE_ID.to_string(),
            variables: template_variables(attrs),
            mode: Some(VHOST_MODE),
        })
        .notifies(RELOAD_NGINX, vhost_timing),
    );

    plan.push(
        Step::new(Action::LinkFile {
            link: enabled_site(attrs, VHOST_SITE),
            target: available_site(attrs, VHOST_SITE),
        })
        .notifies(RELOAD_NGINX, Timing::Deferred),
    );

    plan.export("nagios.web_server", "nginx");
    plan.export("nagios.web_user", attrs.nginx.user.as_str());
    plan.export("nagios.web_group", attrs.nginx.group.as_str());

    if let Some(fatal) = auth::validate(&attrs.nagios.server_auth_method) {
        plan.push_action(fatal);
    }

    log::debug!(
        "Built {} steps for {} ({})",
        plan.len(),
        attrs.fqdn,
        attrs.platform_family
    );
    plan
}

fn enable_and_start(plan: &mut ExecutionPlan, service: &str) {
    for state in [ServiceState::Enabled, ServiceState::Started] {
        plan.push_action(Action::SetServiceState {
            name: service.to_string(),
            state,
        });
    }
}

/// Variables handed to the vhost template.
pub fn template_variables(attrs: &HostAttributes) -> Variables {
    let nagios = &attrs.nagios;
    let dispatch = attrs.dispatch_type();

    let mut vars = Variables::new();
    vars.insert("allowed_ips".into(), json!(nagios.allowed_ips));
    vars.insert("cgi".into(), json!(dispatch.cgi()));
    vars.insert("cgi_bin".into(), json!(nagios.cgi_bin));
    vars.insert("chef_env".into(), json!(attrs.environment_label()));
    vars.insert("docroot".into(), json!(nagios.docroot));
    vars.insert("fqdn".into(), json!(attrs.fqdn));
    vars.insert("htpasswd_file".into(), json!(nagios.htpasswd_file()));
    vars.insert("https".into(), json!(nagios.enable_ssl));
    vars.insert("listen_port".into(), json!(nagios.listen_port()));
    vars.insert("log_dir".into(), json!(nagios.log_dir));
    vars.insert("nagios_url".into(), json!(nagios.url));
    vars.insert(
        "nginx_dispatch_cgi_url".into(),
        json!(nagios.server.nginx_dispatch.cgi_url),
    );
    vars.insert(
        "nginx_dispatch_php_url".into(),
        json!(nagios.server.nginx_dispatch.php_url),
    );
    vars.insert("php".into(), json!(dispatch.php()));
    vars.insert("public_domain".into(), json!(attrs.public_domain()));
    vars.insert("server_name".into(), json!(nagios.server.name));
    vars.insert("server_vname".into(), json!(nagios.server.vname));
    vars.insert("ssl_cert_file".into(), json!(nagios.ssl_cert_file()));
    vars.insert("ssl_cert_key".into(), json!(nagios.ssl_cert_key()));
    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vhost::VhostTemplates;
    use declarative::memory::MemoryHost;
    use declarative::{ExecuteOptions, RunError, execute_simple};
    use hostkit::PlatformFamily;
    use serde_json::Value;
    use std::path::Path;

    fn attrs(overlay: Value, family: PlatformFamily) -> HostAttributes {
        HostAttributes::resolve(overlay, Some(family), "monitor.example.com").unwrap()
    }

    fn ids(plan: &ExecutionPlan) -> Vec<String> {
        plan.steps.iter().map(|s| s.action.description()).collect()
    }

    fn position(plan: &ExecutionPlan, description: &str) -> usize {
        ids(plan)
            .iter()
            .position(|d| d == description)
            .unwrap_or_else(|| panic!("no step {description:?} in {:#?}", ids(plan)))
    }

    fn vhost_step(plan: &ExecutionPlan) -> &Step {
        plan.steps
            .iter()
            .find(|s| matches!(s.action, Action::RenderTemplate { .. }))
            .unwrap()
    }

    fn vhost_vars(plan: &ExecutionPlan) -> &Variables {
        match &vhost_step(plan).action {
            Action::RenderTemplate { variables, .. } => variables,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_rhel_cgi_renders_cgi_and_php() {
        let a = attrs(
            json!({"nagios": {"server": {"nginx_dispatch": {"type": "cgi"}}}}),
            PlatformFamily::Rhel,
        );
        let plan = build(&a, HostFacts::default());
        assert_eq!(vhost_vars(&plan)["cgi"], json!(true));
        assert_eq!(vhost_vars(&plan)["php"], json!(true));
    }

    #[test]
    fn test_dispatch_flags_follow_type() {
        for (kind, cgi, php) in [("cgi", true, false), ("php", false, true), ("both", true, true)] {
            let a = attrs(
                json!({"nagios": {"server": {"nginx_dispatch": {"type": kind}}}}),
                PlatformFamily::Debian,
            );
            let plan = build(&a, HostFacts::default());
            assert_eq!(vhost_vars(&plan)["cgi"], json!(cgi), "{kind}");
            assert_eq!(vhost_vars(&plan)["php"], json!(php), "{kind}");
        }
    }

    #[test]
    fn test_fedora_and_amazon_force_both() {
        for family in [PlatformFamily::Fedora, PlatformFamily::Amazon] {
            let a = attrs(
                json!({"nagios": {"server": {"nginx_dispatch": {"type": "php"}}}}),
                family,
            );
            let plan = build(&a, HostFacts::default());
            assert_eq!(vhost_vars(&plan)["cgi"], json!(true));
            assert_eq!(vhost_vars(&plan)["php"], json!(true));
        }
    }

    #[test]
    fn test_template_variables() {
        let a = attrs(
            json!({"environment": "_default", "public_domain": "nagios.example.net"}),
            PlatformFamily::Debian,
        );
        let vars = template_variables(&a);
        assert_eq!(vars["chef_env"], json!("default"));
        assert_eq!(vars["public_domain"], json!("nagios.example.net"));
        assert_eq!(vars["htpasswd_file"], json!("/etc/nagios3/htpasswd.users"));
        assert_eq!(vars["listen_port"], json!(80));
        assert_eq!(vars["nagios_url"], Value::Null);
        assert_eq!(vars.len(), 19);
    }

    #[test]
    fn test_ldap_ends_in_fatal_error() {
        let a = attrs(
            json!({"nagios": {"server_auth_method": "ldap"}}),
            PlatformFamily::Debian,
        );
        let plan = build(&a, HostFacts::default());

        let last = &plan.steps.last().unwrap().action;
        assert_eq!(
            last,
            &Action::FatalError {
                message: "LDAP authentication not supported on NGINX".to_string(),
                details: vec![
                    "LDAP authentication for Nagios is not supported on NGINX".to_string(),
                    "Set nagios.server_auth_method in your host attributes".to_string(),
                ],
            }
        );
        assert_eq!(plan.steps.iter().filter(|s| s.action.is_fatal()).count(), 1);
        assert!(plan.fatal_error().is_some());
    }

    #[test]
    fn test_openid_and_cas_end_in_fatal_error() {
        for method in ["openid", "cas"] {
            let a = attrs(
                json!({"nagios": {"server_auth_method": method}}),
                PlatformFamily::Rhel,
            );
            let plan = build(&a, HostFacts::default());
            assert!(plan.steps.last().unwrap().action.is_fatal(), "{method}");
        }
    }

    #[test]
    fn test_supported_auth_has_no_fatal_step() {
        for method in ["htauth", "htpasswd", "LDAP", "Cas", " openid "] {
            let a = attrs(
                json!({"nagios": {"server_auth_method": method}}),
                PlatformFamily::Debian,
            );
            assert!(build(&a, HostFacts::default()).fatal_error().is_none(), "{method}");
        }
    }

    #[test]
    fn test_vhost_notification_timing_follows_symlink() {
        let a = attrs(json!({}), PlatformFamily::Debian);

        let plan = build(&a, HostFacts { vhost_enabled: true });
        assert_eq!(vhost_step(&plan).notifies[0].timing, Timing::Immediate);

        let plan = build(&a, HostFacts { vhost_enabled: false });
        assert_eq!(vhost_step(&plan).notifies[0].timing, Timing::Deferred);
    }

    #[test]
    fn test_probe_reads_sites_enabled() {
        let a = attrs(json!({}), PlatformFamily::Debian);
        let mem = MemoryHost::new().with_symlink(
            "/etc/nginx/sites-enabled/nagios3.conf",
            "/etc/nginx/sites-available/nagios3.conf",
        );
        assert!(HostFacts::probe(&mem, &a).vhost_enabled);
        assert!(!HostFacts::probe(&MemoryHost::new(), &a).vhost_enabled);

        let regular = MemoryHost::new().with_file("/etc/nginx/sites-enabled/nagios3.conf", "x");
        assert!(!HostFacts::probe(&regular, &a).vhost_enabled);
    }

    #[test]
    fn test_step_order() {
        let a = attrs(json!({"nagios": {"server": {"stop_apache": true}}}), PlatformFamily::Debian);
        let plan = build(&a, HostFacts::default());

        assert_eq!(ids(&plan)[0], "Stop apache2");
        assert!(position(&plan, "Install fcgiwrap, php-fpm") < position(&plan, "Enable fcgiwrap"));
        assert!(position(&plan, "Enable fcgiwrap") < position(&plan, "Start fcgiwrap"));
        assert!(position(&plan, "Start fcgiwrap") < position(&plan, "Enable php-fpm"));
        assert!(position(&plan, "Install nginx") < position(&plan, "Start nginx"));

        let render = position(
            &plan,
            "Render nagios3.conf to /etc/nginx/sites-available/nagios3.conf",
        );
        assert!(position(&plan, "Delete /etc/nginx/sites-enabled/default") < render);
        assert!(position(&plan, "Delete /etc/nginx/sites-enabled/000-default") < render);
        assert!(position(&plan, "Delete /etc/nginx/conf.d/default.conf") < render);
        assert!(
            render
                < position(
                    &plan,
                    "Link /etc/nginx/sites-enabled/nagios3.conf -> /etc/nginx/sites-available/nagios3.conf"
                )
        );
    }

    #[test]
    fn test_apache_and_nginx_install_are_optional() {
        let a = attrs(json!({"nginx": {"install": false}}), PlatformFamily::Debian);
        let plan = build(&a, HostFacts::default());
        assert_eq!(ids(&plan)[0], "Install fcgiwrap, php-fpm");
        assert!(!ids(&plan).iter().any(|d| d == "Install nginx"));
    }

    #[test]
    fn test_notifications_and_exports() {
        let a = attrs(json!({}), PlatformFamily::Rhel);
        let plan = build(&a, HostFacts::default());
        plan.validate().unwrap();

        let conf_d = plan
            .steps
            .iter()
            .find(|s| s.id() == "file[/etc/nginx/conf.d/default.conf]")
            .unwrap();
        assert_eq!(conf_d.notifies[0].handler, RELOAD_NGINX);
        assert_eq!(conf_d.notifies[0].timing, Timing::Immediate);

        assert_eq!(plan.exports["nagios.web_server"], "nginx");
        assert_eq!(plan.exports["nagios.web_user"], "nginx");
        assert_eq!(plan.exports["nagios.web_group"], "nginx");
    }

    #[test]
    fn test_converges_and_second_run_is_quiet() {
        let a = attrs(json!({}), PlatformFamily::Debian);
        let mem = MemoryHost::new()
            .with_file("/etc/nginx/sites-enabled/default", "server {}")
            .with_file("/etc/nginx/conf.d/default.conf", "server {}");
        let templates = VhostTemplates::new().unwrap();

        let plan = build(&a, HostFacts::probe(&mem, &a));
        let first =
            execute_simple(&plan, mem.host(&templates), &ExecuteOptions::default()).unwrap();
        assert!(first.total_changes() > 0);
        assert_eq!(first.notified, vec![RELOAD_NGINX, RELOAD_NGINX]);

        let ops = mem.operations();
        let removed = ops
            .iter()
            .position(|op| op == "remove /etc/nginx/conf.d/default.conf")
            .unwrap();
        assert_eq!(ops[removed + 1], "reload nginx");
        assert_eq!(ops.last().unwrap(), "reload nginx");
        assert!(mem.service("fcgiwrap").running);
        assert!(mem.service("nginx").enabled);

        let state = mem.snapshot();
        mem.clear_operations();

        let plan = build(&a, HostFacts::probe(&mem, &a));
        assert_eq!(vhost_step(&plan).notifies[0].timing, Timing::Immediate);
        let second =
            execute_simple(&plan, mem.host(&templates), &ExecuteOptions::default()).unwrap();
        assert_eq!(second.total_changes(), 0);
        assert!(second.notified.is_empty());
        assert!(mem.operations().is_empty());
        assert_eq!(mem.snapshot(), state);
    }

    #[test]
    fn test_rejected_auth_stops_before_anything_after_it() {
        let a = attrs(json!({"nagios": {"server_auth_method": "openid"}}), PlatformFamily::Debian);
        let mem = MemoryHost::new().with_file("/etc/nginx/conf.d/default.conf", "server {}");
        let templates = VhostTemplates::new().unwrap();
        let plan = build(&a, HostFacts::default());

        let err = execute_simple(&plan, mem.host(&templates), &ExecuteOptions::default())
            .unwrap_err();
        assert!(matches!(err, RunError::ConfigurationRejected { .. }));
        assert_eq!(err.to_string(), "OpenID authentication not supported on NGINX");
        // deferred reloads queued by the site steps are dropped
        assert_eq!(mem.service("nginx").reloads, 1);
        assert!(!mem.snapshot().files.contains_key(Path::new("/etc/nginx/conf.d/default.conf")));
    }
}
