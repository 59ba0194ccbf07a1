//! Web authentication methods and the nginx support check.

use declarative::Action;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication method configured for the Nagios web UI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuthMethod {
    /// htpasswd basic auth, the only method nginx supports here
    #[default]
    Htauth,
    Openid,
    Cas,
    Ldap,
    /// Anything else, matched exactly, so `LDAP` lands here; it is treated
    /// like the default and left to the server setup
    Other(String),
}

impl AuthMethod {
    pub fn as_str(&self) -> &str {
        match self {
            AuthMethod::Htauth => "htauth",
            AuthMethod::Openid => "openid",
            AuthMethod::Cas => "cas",
            AuthMethod::Ldap => "ldap",
            AuthMethod::Other(name) => name,
        }
    }

    /// Short label used in operator messages
    fn label(&self) -> &str {
        match self {
            AuthMethod::Openid => "OpenID",
            AuthMethod::Cas => "CAS",
            AuthMethod::Ldap => "LDAP",
            other => other.as_str(),
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, AuthMethod::Openid | AuthMethod::Cas | AuthMethod::Ldap)
    }
}

impl From<String> for AuthMethod {
    fn from(value: String) -> Self {
        match value.as_str() {
            "htauth" => AuthMethod::Htauth,
            "openid" => AuthMethod::Openid,
            "cas" => AuthMethod::Cas,
            "ldap" => AuthMethod::Ldap,
            _ => AuthMethod::Other(value),
        }
    }
}

impl From<AuthMethod> for String {
    fn from(value: AuthMethod) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The step that rejects an auth method nginx cannot serve.
///
/// Returns `None` for supported methods after logging that htpasswd auth is
/// left to the server setup.
pub fn validate(method: &AuthMethod) -> Option<Action> {
    if method.is_supported() {
        log::info!("Default method htauth configured in server setup");
        return None;
    }

    let label = method.label();
    Some(Action::FatalError {
        message: format!("{label} authentication not supported on NGINX"),
        details: vec![
            format!("{label} authentication for Nagios is not supported on NGINX"),
            "Set nagios.server_auth_method in your host attributes".to_string(),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(action: Option<Action>) -> String {
        match action {
            Some(Action::FatalError { message, .. }) => message,
            other => panic!("expected a fatal step, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_methods_are_rejected() {
        assert_eq!(
            message(validate(&AuthMethod::Ldap)),
            "LDAP authentication not supported on NGINX"
        );
        assert_eq!(
            message(validate(&AuthMethod::Openid)),
            "OpenID authentication not supported on NGINX"
        );
        assert_eq!(
            message(validate(&AuthMethod::Cas)),
            "CAS authentication not supported on NGINX"
        );
    }

    #[test]
    fn test_fatal_step_carries_operator_details() {
        let Some(Action::FatalError { details, .. }) = validate(&AuthMethod::Cas) else {
            panic!("cas must be rejected");
        };
        assert_eq!(details.len(), 2);
        assert!(details[0].starts_with("CAS authentication for Nagios"));
    }

    #[test]
    fn test_supported_methods_pass() {
        assert!(validate(&AuthMethod::Htauth).is_none());
        assert!(validate(&AuthMethod::from("htpasswd".to_string())).is_none());
    }

    #[test]
    fn test_parse_is_exact() {
        assert_eq!(AuthMethod::from("ldap".to_string()), AuthMethod::Ldap);
        for raw in ["LDAP", "Cas", " openid "] {
            let method = AuthMethod::from(raw.to_string());
            assert_eq!(method, AuthMethod::Other(raw.to_string()));
            assert!(validate(&method).is_none(), "{raw}");
        }
        assert_eq!(
            AuthMethod::from("kerberos".to_string()),
            AuthMethod::Other("kerberos".to_string())
        );
    }

    #[test]
    fn test_serde_as_plain_string() {
        let method: AuthMethod = serde_json::from_str("\"cas\"").unwrap();
        assert_eq!(method, AuthMethod::Cas);
        assert_eq!(serde_json::to_string(&AuthMethod::Htauth).unwrap(), "\"htauth\"");
    }
}
