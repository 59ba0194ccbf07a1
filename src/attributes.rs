//! Host attributes
//!
//! Attributes are built in three layers: defaults for the platform family,
//! an optional attributes file (JSON or TOML) deep-merged on top, and the
//! platform family itself, which comes from the command line, then the file,
//! then `/etc/os-release`.

use crate::auth::AuthMethod;
use hostkit::PlatformFamily;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttributeError {
    #[error("Failed to read attributes from {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported attributes file {} (expected .json or .toml)", .path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid TOML in {}: {source}", .path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Attributes must be a table at the top level")]
    NotATable,

    #[error(transparent)]
    Platform(#[from] hostkit::Error),

    #[error("Invalid attributes: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// How nginx hands requests to Nagios: CGI scripts, PHP pages, or both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchType {
    #[default]
    Cgi,
    Php,
    Both,
}

impl DispatchType {
    pub fn cgi(self) -> bool {
        matches!(self, DispatchType::Cgi | DispatchType::Both)
    }

    pub fn php(self) -> bool {
        matches!(self, DispatchType::Php | DispatchType::Both)
    }
}

impl fmt::Display for DispatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DispatchType::Cgi => "cgi",
            DispatchType::Php => "php",
            DispatchType::Both => "both",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostAttributes {
    pub platform_family: PlatformFamily,
    pub fqdn: String,
    pub domain: String,
    #[serde(default)]
    pub public_domain: Option<String>,
    /// Environment name; `_default` is shown as `default`
    pub environment: String,
    pub nagios: NagiosAttributes,
    pub nginx: NginxAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NagiosAttributes {
    pub allowed_ips: Vec<String>,
    pub conf_dir: PathBuf,
    pub docroot: PathBuf,
    /// Directory holding the Nagios CGI executables
    pub cgi_bin: PathBuf,
    pub log_dir: PathBuf,
    pub enable_ssl: bool,
    /// Defaults to 443 with SSL, 80 without
    #[serde(default)]
    pub http_port: Option<u16>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub ssl_cert_file: Option<PathBuf>,
    #[serde(default)]
    pub ssl_cert_key: Option<PathBuf>,
    pub server_auth_method: AuthMethod,
    pub server: ServerAttributes,
}

impl NagiosAttributes {
    pub fn listen_port(&self) -> u16 {
        self.http_port
            .unwrap_or(if self.enable_ssl { 443 } else { 80 })
    }

    pub fn htpasswd_file(&self) -> PathBuf {
        self.conf_dir.join("htpasswd.users")
    }

    pub fn ssl_cert_file(&self) -> PathBuf {
        self.ssl_cert_file
            .clone()
            .unwrap_or_else(|| self.default_certificate())
    }

    pub fn ssl_cert_key(&self) -> PathBuf {
        self.ssl_cert_key
            .clone()
            .unwrap_or_else(|| self.default_certificate())
    }

    fn default_certificate(&self) -> PathBuf {
        self.conf_dir.join("certificates").join("nagios-server.pem")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerAttributes {
    pub name: String,
    pub vname: String,
    /// Stop apache2 first so it releases the HTTP port
    pub stop_apache: bool,
    pub nginx_dispatch: DispatchAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchAttributes {
    #[serde(rename = "type")]
    pub kind: DispatchType,
    pub packages: Vec<String>,
    pub services: Vec<String>,
    pub cgi_url: String,
    pub php_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NginxAttributes {
    /// Install and start nginx itself before configuring the site
    pub install: bool,
    pub package: String,
    pub dir: PathBuf,
    pub user: String,
    pub group: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl HostAttributes {
    /// Attribute defaults for a platform family and host name.
    pub fn defaults(family: PlatformFamily, fqdn: &str) -> Self {
        let domain = fqdn.split_once('.').map(|(_, d)| d).unwrap_or_default();

        let (packages, services, php_url) = match family {
            PlatformFamily::Debian => (
                strings(&["fcgiwrap", "php-fpm"]),
                strings(&["fcgiwrap", "php-fpm"]),
                "unix:/var/run/php/php-fpm.sock",
            ),
            PlatformFamily::Rhel | PlatformFamily::Fedora | PlatformFamily::Amazon => (
                strings(&["spawn-fcgi", "fcgiwrap", "php-fpm"]),
                strings(&["spawn-fcgi", "php-fpm"]),
                "unix:/var/run/php-fpm/www.sock",
            ),
            PlatformFamily::Suse | PlatformFamily::Arch => (
                strings(&["fcgiwrap", "php-fpm"]),
                strings(&["fcgiwrap", "php-fpm"]),
                "unix:/run/php-fpm/php-fpm.sock",
            ),
        };

        let (user, docroot, cgi_bin, conf_dir, log_dir) = match family {
            PlatformFamily::Debian => (
                "www-data",
                "/usr/share/nagios3/htdocs",
                "/usr/lib/cgi-bin/nagios3",
                "/etc/nagios3",
                "/var/log/nagios3",
            ),
            PlatformFamily::Arch => (
                "http",
                "/usr/share/nagios/share",
                "/usr/share/nagios/sbin",
                "/etc/nagios",
                "/var/log/nagios",
            ),
            PlatformFamily::Suse => (
                "nginx",
                "/usr/share/nagios",
                "/usr/lib/nagios/cgi",
                "/etc/nagios",
                "/var/log/nagios",
            ),
            PlatformFamily::Rhel | PlatformFamily::Fedora | PlatformFamily::Amazon => (
                "nginx",
                "/usr/share/nagios/html",
                "/usr/lib64/nagios/cgi-bin",
                "/etc/nagios",
                "/var/log/nagios",
            ),
        };

        Self {
            platform_family: family,
            fqdn: fqdn.to_string(),
            domain: domain.to_string(),
            public_domain: None,
            environment: "_default".to_string(),
            nagios: NagiosAttributes {
                allowed_ips: Vec::new(),
                conf_dir: conf_dir.into(),
                docroot: docroot.into(),
                cgi_bin: cgi_bin.into(),
                log_dir: log_dir.into(),
                enable_ssl: false,
                http_port: None,
                url: None,
                ssl_cert_file: None,
                ssl_cert_key: None,
                server_auth_method: AuthMethod::Htauth,
                server: ServerAttributes {
                    name: "nagios".to_string(),
                    vname: "nagios".to_string(),
                    stop_apache: false,
                    nginx_dispatch: DispatchAttributes {
                        kind: DispatchType::Cgi,
                        packages,
                        services,
                        cgi_url: "unix:/var/run/fcgiwrap.socket".to_string(),
                        php_url: php_url.to_string(),
                    },
                },
            },
            nginx: NginxAttributes {
                install: true,
                package: "nginx".to_string(),
                dir: "/etc/nginx".into(),
                user: user.to_string(),
                group: user.to_string(),
            },
        }
    }

    /// Load attributes for this host, overlaying `file` when given.
    pub fn load(file: Option<&Path>, platform: Option<PlatformFamily>) -> Result<Self, AttributeError> {
        let overlay = match file {
            Some(path) => read_file(path)?,
            None => Value::Object(Map::new()),
        };
        Self::resolve(overlay, platform, &hostname())
    }

    /// Merge an attribute overlay onto the platform defaults.
    pub fn resolve(
        overlay: Value,
        platform: Option<PlatformFamily>,
        fqdn: &str,
    ) -> Result<Self, AttributeError> {
        if !overlay.is_object() {
            return Err(AttributeError::NotATable);
        }

        let family = match platform {
            Some(family) => family,
            None => match overlay.get("platform_family").and_then(Value::as_str) {
                Some(name) => name.parse()?,
                None => PlatformFamily::detect()?,
            },
        };
        let fqdn = overlay.get("fqdn").and_then(Value::as_str).unwrap_or(fqdn);
        log::debug!("Resolving attributes for {fqdn} ({family})");

        let mut merged = serde_json::to_value(Self::defaults(family, fqdn))?;
        merge(&mut merged, overlay);
        if let Some(map) = merged.as_object_mut() {
            map.insert(
                "platform_family".to_string(),
                Value::String(family.as_str().to_string()),
            );
        }

        Ok(serde_json::from_value(merged)?)
    }

    /// Dispatch type after platform rules: RHEL-like families always serve both.
    pub fn dispatch_type(&self) -> DispatchType {
        if self.platform_family.forces_dual_dispatch() {
            DispatchType::Both
        } else {
            self.nagios.server.nginx_dispatch.kind
        }
    }

    pub fn public_domain(&self) -> &str {
        self.public_domain.as_deref().unwrap_or(&self.domain)
    }

    /// Environment name as shown in the vhost.
    pub fn environment_label(&self) -> &str {
        if self.environment == "_default" {
            "default"
        } else {
            &self.environment
        }
    }
}

/// Parse an attributes file by extension.
pub fn read_file(path: &Path) -> Result<Value, AttributeError> {
    let content = fs::read_to_string(path).map_err(|source| AttributeError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let value: Value = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&content).map_err(|source| AttributeError::Json {
            path: path.to_path_buf(),
            source,
        })?,
        Some("toml") => toml::from_str(&content).map_err(|source| AttributeError::Toml {
            path: path.to_path_buf(),
            source,
        })?,
        _ => {
            return Err(AttributeError::UnsupportedFormat {
                path: path.to_path_buf(),
            });
        }
    };

    if value.is_object() {
        Ok(value)
    } else {
        Err(AttributeError::NotATable)
    }
}

/// Deep-merge `overlay` into `base`; tables merge key by key, anything else replaces.
fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Host name of the running machine.
fn hostname() -> String {
    ["/proc/sys/kernel/hostname", "/etc/hostname"]
        .iter()
        .find_map(|path| fs::read_to_string(path).ok())
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
