//! Actions - the closed set of things a step can do to a host
//!
//! Each action knows how to detect the current state of what it manages,
//! what the desired state is, and how to converge one to the other without
//! touching anything that already matches.

use crate::context::{ApplyContext, Host, digest};
use crate::types::{ApplyResult, ResourceState, ServiceState, Variables};
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A single idempotent operation against a host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Ensure packages are installed
    InstallPackages { names: Vec<String> },
    /// Ensure a service is enabled, started, or stopped
    SetServiceState { name: String, state: ServiceState },
    /// Ensure nothing exists at a path
    DeleteFile { path: PathBuf },
    /// Ensure `link` is a symlink to `target`
    LinkFile { link: PathBuf, target: PathBuf },
    /// Ensure a file holds the rendering of a template
    RenderTemplate {
        path: PathBuf,
        template: String,
        variables: Variables,
        mode: Option<u32>,
    },
    /// Ask a service to re-read its configuration
    ReloadService { name: String },
    /// Stop the run with a message
    FatalError {
        message: String,
        /// Lines logged at error level before the run stops
        details: Vec<String>,
    },
}

impl Action {
    /// Identifier of the action, stable across runs (e.g. `service[nginx]`)
    pub fn id(&self) -> String {
        match self {
            Action::InstallPackages { names } => format!("package[{}]", names.join(", ")),
            Action::SetServiceState { name, .. } | Action::ReloadService { name } => {
                format!("service[{name}]")
            }
            Action::DeleteFile { path } => format!("file[{}]", path.display()),
            Action::LinkFile { link, .. } => format!("link[{}]", link.display()),
            Action::RenderTemplate { path, .. } => format!("template[{}]", path.display()),
            Action::FatalError { .. } => "fatal".to_string(),
        }
    }

    /// Action type category, used for grouping and filtering
    pub fn kind(&self) -> &'static str {
        match self {
            Action::InstallPackages { .. } => "package",
            Action::SetServiceState { .. } | Action::ReloadService { .. } => "service",
            Action::DeleteFile { .. } => "file",
            Action::LinkFile { .. } => "link",
            Action::RenderTemplate { .. } => "template",
            Action::FatalError { .. } => "fatal",
        }
    }

    /// Human-readable description
    pub fn description(&self) -> String {
        match self {
            Action::InstallPackages { names } => format!("Install {}", names.join(", ")),
            Action::SetServiceState { name, state } => match state {
                ServiceState::Enabled => format!("Enable {name}"),
                ServiceState::Started => format!("Start {name}"),
                ServiceState::Stopped => format!("Stop {name}"),
            },
            Action::DeleteFile { path } => format!("Delete {}", path.display()),
            Action::LinkFile { link, target } => {
                format!("Link {} -> {}", link.display(), target.display())
            }
            Action::RenderTemplate { path, template, .. } => {
                format!("Render {template} to {}", path.display())
            }
            Action::ReloadService { name } => format!("Reload {name}"),
            Action::FatalError { message, .. } => format!("Fail: {message}"),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Action::FatalError { .. })
    }

    /// Detect the current state of what this action manages
    pub fn current_state(&self, host: &Host) -> Result<ResourceState> {
        match self {
            Action::InstallPackages { names } => {
                let missing = host.packages.missing(names)?;
                if missing.is_empty() {
                    Ok(ResourceState::Present {
                        details: Some(names.join(", ")),
                    })
                } else if missing.len() == names.len() {
                    Ok(ResourceState::Absent)
                } else {
                    Ok(ResourceState::Modified {
                        from: format!("missing {}", missing.join(", ")),
                        to: names.join(", "),
                    })
                }
            }
            Action::SetServiceState { name, state } => {
                let label = match state {
                    ServiceState::Enabled => {
                        if host.services.is_enabled(name)? {
                            "enabled"
                        } else {
                            "disabled"
                        }
                    }
                    ServiceState::Started | ServiceState::Stopped => {
                        if host.services.is_running(name)? {
                            "running"
                        } else {
                            "stopped"
                        }
                    }
                };
                Ok(ResourceState::Present {
                    details: Some(label.to_string()),
                })
            }
            Action::DeleteFile { path } => Ok(if host.files.exists(path) {
                ResourceState::Present { details: None }
            } else {
                ResourceState::Absent
            }),
            Action::LinkFile { link, target } => match host.files.read_link(link)? {
                Some(actual) if &actual == target => Ok(ResourceState::Present {
                    details: Some(format!("-> {}", target.display())),
                }),
                Some(actual) => Ok(ResourceState::Modified {
                    from: format!("-> {}", actual.display()),
                    to: format!("-> {}", target.display()),
                }),
                None if host.files.exists(link) => Ok(ResourceState::Modified {
                    from: "regular file".to_string(),
                    to: format!("-> {}", target.display()),
                }),
                None => Ok(ResourceState::Absent),
            },
            Action::RenderTemplate { path, .. } => Ok(match host.files.read(path)? {
                Some(existing) => ResourceState::Present {
                    details: Some(digest(&existing)),
                },
                None => ResourceState::Absent,
            }),
            Action::ReloadService { .. } => Ok(ResourceState::Present { details: None }),
            Action::FatalError { .. } => Ok(ResourceState::Unknown),
        }
    }

    /// The state this action converges to
    pub fn desired_state(&self, host: &Host) -> Result<ResourceState> {
        match self {
            Action::InstallPackages { names } => Ok(ResourceState::Present {
                details: Some(names.join(", ")),
            }),
            Action::SetServiceState { state, .. } => {
                let label = match state {
                    ServiceState::Enabled => "enabled",
                    ServiceState::Started => "running",
                    ServiceState::Stopped => "stopped",
                };
                Ok(ResourceState::Present {
                    details: Some(label.to_string()),
                })
            }
            Action::DeleteFile { .. } => Ok(ResourceState::Absent),
            Action::LinkFile { target, .. } => Ok(ResourceState::Present {
                details: Some(format!("-> {}", target.display())),
            }),
            Action::RenderTemplate {
                template,
                variables,
                ..
            } => {
                let content = host.templates.render(template, variables)?;
                Ok(ResourceState::Present {
                    details: Some(digest(&content)),
                })
            }
            Action::ReloadService { .. } => Ok(ResourceState::Present {
                details: Some("reloaded".to_string()),
            }),
            Action::FatalError { .. } => Ok(ResourceState::Unknown),
        }
    }

    /// Whether applying this action would change the host
    pub fn needs_apply(&self, host: &Host) -> Result<bool> {
        match self {
            Action::InstallPackages { names } => Ok(!host.packages.missing(names)?.is_empty()),
            Action::SetServiceState { name, state } => host.services.needs_change(name, *state),
            Action::DeleteFile { path } => Ok(host.files.exists(path)),
            Action::LinkFile { link, target } => {
                Ok(host.files.read_link(link)?.as_deref() != Some(target.as_path()))
            }
            Action::RenderTemplate {
                path,
                template,
                variables,
                ..
            } => {
                let content = host.templates.render(template, variables)?;
                Ok(host.files.read(path)?.as_deref() != Some(content.as_str()))
            }
            Action::ReloadService { .. } | Action::FatalError { .. } => Ok(true),
        }
    }

    /// Apply changes to reach the desired state
    pub fn apply(&self, ctx: &mut ApplyContext) -> Result<ApplyResult> {
        if ctx.dry_run {
            return Ok(if self.needs_apply(&ctx.host)? {
                ApplyResult::Skipped {
                    reason: "Dry run".to_string(),
                }
            } else {
                ApplyResult::NoChange
            });
        }

        let host = ctx.host;
        match self {
            Action::InstallPackages { names } => {
                let missing = host.packages.missing(names)?;
                if missing.is_empty() {
                    return Ok(ApplyResult::NoChange);
                }
                log::info!("Installing {}", missing.join(", "));
                host.packages.install(&missing)?;
                Ok(ApplyResult::Created)
            }
            Action::SetServiceState { name, state } => {
                if host.services.set_state(name, *state)? {
                    log::info!("Service {name} is now {state}");
                    Ok(ApplyResult::Modified)
                } else {
                    Ok(ApplyResult::NoChange)
                }
            }
            Action::DeleteFile { path } => {
                if host.files.delete(path)? {
                    log::info!("Deleted {}", path.display());
                    Ok(ApplyResult::Removed)
                } else {
                    Ok(ApplyResult::NoChange)
                }
            }
            Action::LinkFile { link, target } => apply_link(&host, link, target),
            Action::RenderTemplate {
                path,
                template,
                variables,
                mode,
            } => {
                let content = host.templates.render(template, variables)?;
                let existed = host.files.exists(path);
                if !host.files.write_if_different(path, &content, *mode)? {
                    return Ok(ApplyResult::NoChange);
                }
                log::info!(
                    "Rendered {} to {} ({})",
                    template,
                    path.display(),
                    digest(&content)
                );
                Ok(if existed {
                    ApplyResult::Modified
                } else {
                    ApplyResult::Created
                })
            }
            Action::ReloadService { name } => {
                host.services.reload(name)?;
                log::info!("Reloaded {name}");
                Ok(ApplyResult::Modified)
            }
            Action::FatalError { message, .. } => bail!("{message}"),
        }
    }
}

fn apply_link(host: &Host, link: &Path, target: &Path) -> Result<ApplyResult> {
    let replaced = match host.files.read_link(link)? {
        Some(actual) if actual == target => return Ok(ApplyResult::NoChange),
        Some(_) => true,
        None => host.files.exists(link),
    };
    if replaced {
        host.files.remove(link)?;
    }
    host.files.symlink(target, link)?;
    log::info!("Linked {} -> {}", link.display(), target.display());
    Ok(if replaced {
        ApplyResult::Modified
    } else {
        ApplyResult::Created
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryHost, MemoryTemplates};

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_ids_follow_resource_notation() {
        assert_eq!(
            Action::InstallPackages {
                names: names(&["fcgiwrap", "php-fpm"])
            }
            .id(),
            "package[fcgiwrap, php-fpm]"
        );
        assert_eq!(
            Action::ReloadService {
                name: "nginx".into()
            }
            .id(),
            "service[nginx]"
        );
        assert_eq!(
            Action::DeleteFile {
                path: "/etc/nginx/conf.d/default.conf".into()
            }
            .id(),
            "file[/etc/nginx/conf.d/default.conf]"
        );
    }

    #[test]
    fn test_install_only_missing_packages() {
        let mem = MemoryHost::new().with_packages(&["fcgiwrap"]);
        let templates = MemoryTemplates;
        let host = mem.host(&templates);
        let action = Action::InstallPackages {
            names: names(&["fcgiwrap", "php-fpm"]),
        };

        assert!(matches!(
            action.current_state(&host).unwrap(),
            ResourceState::Modified { .. }
        ));

        let mut ctx = ApplyContext::new(host, false);
        assert_eq!(action.apply(&mut ctx).unwrap(), ApplyResult::Created);
        assert_eq!(mem.operations(), vec!["install php-fpm".to_string()]);
        assert_eq!(action.apply(&mut ctx).unwrap(), ApplyResult::NoChange);
    }

    #[test]
    fn test_link_replaces_wrong_target() {
        let mem = MemoryHost::new()
            .with_symlink("/etc/nginx/sites-enabled/nagios3.conf", "/tmp/old.conf");
        let templates = MemoryTemplates;
        let host = mem.host(&templates);
        let action = Action::LinkFile {
            link: "/etc/nginx/sites-enabled/nagios3.conf".into(),
            target: "/etc/nginx/sites-available/nagios3.conf".into(),
        };

        let mut ctx = ApplyContext::new(host, false);
        assert_eq!(action.apply(&mut ctx).unwrap(), ApplyResult::Modified);
        assert_eq!(action.apply(&mut ctx).unwrap(), ApplyResult::NoChange);
        assert_eq!(
            action.current_state(&host).unwrap(),
            action.desired_state(&host).unwrap()
        );
    }

    #[test]
    fn test_render_template_reports_created_then_modified() {
        let mem = MemoryHost::new();
        let templates = MemoryTemplates;
        let host = mem.host(&templates);
        let mut variables = Variables::new();
        variables.insert("listen_port".into(), serde_json::json!(80));
        let mut action = Action::RenderTemplate {
            path: "/etc/nginx/sites-available/nagios3.conf".into(),
            template: "nagios3.conf".into(),
            variables: variables.clone(),
            mode: Some(0o644),
        };

        let mut ctx = ApplyContext::new(host, false);
        assert_eq!(action.apply(&mut ctx).unwrap(), ApplyResult::Created);
        assert_eq!(action.apply(&mut ctx).unwrap(), ApplyResult::NoChange);

        variables.insert("listen_port".into(), serde_json::json!(443));
        if let Action::RenderTemplate { variables: v, .. } = &mut action {
            *v = variables;
        }
        assert!(action.needs_apply(&host).unwrap());
        assert_eq!(action.apply(&mut ctx).unwrap(), ApplyResult::Modified);
    }

    #[test]
    fn test_dry_run_does_not_touch_host() {
        let mem = MemoryHost::new().with_file("/etc/nginx/conf.d/default.conf", "server {}");
        let templates = MemoryTemplates;
        let host = mem.host(&templates);
        let action = Action::DeleteFile {
            path: "/etc/nginx/conf.d/default.conf".into(),
        };

        let mut ctx = ApplyContext::new(host, true);
        assert!(matches!(
            action.apply(&mut ctx).unwrap(),
            ApplyResult::Skipped { .. }
        ));
        assert!(mem.operations().is_empty());
        assert!(host.files.exists(Path::new("/etc/nginx/conf.d/default.conf")));
    }
}
