use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use log::debug;
#[cfg(test)]
use mockall::automock;

use crate::error::CredentialError;

// -----------------------------------------------------------------------------
// CredentialResolver trait

/// Maps a repository URL to the credential for its host.
#[cfg_attr(test, automock)]
pub trait CredentialResolver {
    fn resolve(&self, url: &str) -> Result<Credential, CredentialError>;
}

/// Username/secret pair presented to a git host over HTTP basic auth.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    secret: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Value for an `Authorization` HTTP header.
    pub fn basic_auth_header(&self) -> String {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.secret));
        format!("Authorization: Basic {}", encoded)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"***")
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Host families

/// A credential-resolution category keyed by substrings of the repository URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostFamily {
    AzureDevOps,
    GitHub,
}

impl HostFamily {
    pub const ALL: [HostFamily; 2] = [HostFamily::AzureDevOps, HostFamily::GitHub];

    pub fn markers(self) -> &'static [&'static str] {
        match self {
            HostFamily::AzureDevOps => &["dev.azure.com", "visualstudio.com"],
            HostFamily::GitHub => &["github.com"],
        }
    }

    /// Environment variable holding this family's token.
    pub fn secret_variable(self) -> &'static str {
        match self {
            HostFamily::AzureDevOps => "ADO_TOKEN",
            HostFamily::GitHub => "GITHUB_TOKEN",
        }
    }

    pub fn username(self) -> &'static str {
        match self {
            HostFamily::AzureDevOps => "PAT",
            HostFamily::GitHub => "token",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            HostFamily::AzureDevOps => "Azure DevOps",
            HostFamily::GitHub => "GitHub",
        }
    }

    /// The first family with a marker contained in `url`.
    pub fn detect(url: &str) -> Option<Self> {
        let url = url.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|family| family.markers().iter().any(|m| url.contains(m)))
    }
}

// -----------------------------------------------------------------------------
// EnvCredentials

/// Resolves credentials from process environment variables.
pub struct EnvCredentials;

impl CredentialResolver for EnvCredentials {
    fn resolve(&self, url: &str) -> Result<Credential, CredentialError> {
        let family = HostFamily::detect(url).ok_or_else(|| {
            CredentialError::UnsupportedHost(crate::redact::redact_credentials(url))
        })?;

        let variable = family.secret_variable();
        let secret = std::env::var(variable)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .ok_or(CredentialError::MissingCredential {
                family: family.display_name(),
                variable,
            })?;

        debug!("Resolved {} credential from {}", family.display_name(), variable);
        Ok(Credential::new(family.username(), secret.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_host_family() {
        assert_eq!(
            HostFamily::detect("https://dev.azure.com/org/project/_git/repo"),
            Some(HostFamily::AzureDevOps)
        );
        assert_eq!(
            HostFamily::detect("https://org.visualstudio.com/project/_git/repo"),
            Some(HostFamily::AzureDevOps)
        );
        assert_eq!(
            HostFamily::detect("https://GitHub.com/org/repo.git"),
            Some(HostFamily::GitHub)
        );
        assert_eq!(HostFamily::detect("https://gitlab.com/org/repo.git"), None);
    }

    #[test]
    fn test_resolve_ado_url_uses_ado_token() {
        temp_env::with_vars(
            [("ADO_TOKEN", Some("ado-secret")), ("GITHUB_TOKEN", Some("gh-secret"))],
            || {
                let credential = EnvCredentials
                    .resolve("https://dev.azure.com/org/project/_git/repo")
                    .unwrap();
                assert_eq!(credential.username, "PAT");
                assert_eq!(credential.secret(), "ado-secret");
            },
        );
    }

    #[test]
    fn test_resolve_github_url_uses_github_token() {
        temp_env::with_vars(
            [("ADO_TOKEN", Some("ado-secret")), ("GITHUB_TOKEN", Some("gh-secret"))],
            || {
                let credential = EnvCredentials
                    .resolve("https://github.com/org/repo.git")
                    .unwrap();
                assert_eq!(credential.username, "token");
                assert_eq!(credential.secret(), "gh-secret");
            },
        );
    }

    #[test]
    fn test_resolve_unknown_host_is_unsupported() {
        temp_env::with_vars([("GITHUB_TOKEN", Some("gh-secret"))], || {
            let err = EnvCredentials
                .resolve("https://gitlab.com/org/repo.git")
                .unwrap_err();
            assert_eq!(
                err,
                CredentialError::UnsupportedHost("https://gitlab.com/org/repo.git".to_string())
            );
        });
    }

    #[test]
    fn test_resolve_missing_or_blank_variable() {
        temp_env::with_vars([("GITHUB_TOKEN", None::<&str>)], || {
            let err = EnvCredentials
                .resolve("https://github.com/org/repo.git")
                .unwrap_err();
            assert_eq!(
                err,
                CredentialError::MissingCredential {
                    family: "GitHub",
                    variable: "GITHUB_TOKEN",
                }
            );
        });
        temp_env::with_vars([("ADO_TOKEN", Some("   "))], || {
            let err = EnvCredentials
                .resolve("https://dev.azure.com/org/_git/repo")
                .unwrap_err();
            assert!(err.to_string().contains("ADO_TOKEN"));
        });
    }

    #[test]
    fn test_debug_hides_secret() {
        let credential = Credential::new("token", "super-secret");
        let debug = format!("{:?}", credential);
        assert!(debug.contains("token"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_basic_auth_header() {
        let credential = Credential::new("user", "pass");
        assert_eq!(credential.basic_auth_header(), "Authorization: Basic dXNlcjpwYXNz");
    }
}
