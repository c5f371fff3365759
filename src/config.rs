//! Application configuration loaded from environment variables.
//!
//! Everything is resolved once at startup into a [`Config`] that is passed by
//! reference to the services; nothing looks up the environment afterwards.

use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const DEFAULT_API_BASE: &str = "/api";
const DEFAULT_APP_ORIGIN: &str = "http://localhost:4200";
const DEFAULT_CALLBACK_PATH: &str = "/steam-callback";
const DEFAULT_PROFILE_PATH: &str = "/profile";
const DEFAULT_SESSION_FILE: &str = ".steam-link-session.json";
const DEFAULT_REDIRECT_DELAY_SECS: u64 = 5;

/// Where the link backend lives.
///
/// Deployments either talk to a backend on its own host or go through a
/// path on the application origin; neither is assumed, it is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiBase {
    /// Backend origin, e.g. `http://localhost:5000`; the API is under `/api`.
    Absolute(Url),
    /// Path on the application origin that is the API root, e.g. `/api`.
    Relative(String),
}

impl ApiBase {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
                var: "STEAM_LINK_API_BASE",
                reason: e.to_string(),
            })?;
            Ok(ApiBase::Absolute(url))
        } else if raw.starts_with('/') {
            Ok(ApiBase::Relative(raw.to_string()))
        } else {
            Err(ConfigError::Invalid {
                var: "STEAM_LINK_API_BASE",
                reason: format!("expected an http(s) URL or an absolute path, got {raw:?}"),
            })
        }
    }

    /// Resolve to the API root URL (always ending in `/`).
    pub fn resolve(&self, app_origin: &Url) -> Result<Url, ConfigError> {
        let root = match self {
            ApiBase::Absolute(origin) => {
                let path = origin.path().trim_end_matches('/');
                format!("{}{}/api/", origin_of(origin), path)
            }
            ApiBase::Relative(path) => {
                format!("{}{}/", origin_of(app_origin), path.trim_end_matches('/'))
            }
        };

        Url::parse(&root).map_err(|e| ConfigError::Invalid {
            var: "STEAM_LINK_API_BASE",
            reason: e.to_string(),
        })
    }
}

fn origin_of(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Tenant branding, derived from the application host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Brand {
    pub tenant: String,
    pub title: &'static str,
    pub short_name: &'static str,
    pub email_domain: &'static str,
}

impl Brand {
    /// Resolve the brand for a host name.
    ///
    /// The tenant is the first DNS label; tunnel hosts (`ngrok`) are served as
    /// the `nextlevel` tenant.
    pub fn resolve(host: &str) -> Self {
        let tenant = if host.contains("ngrok") {
            "nextlevel".to_string()
        } else {
            host.split('.').next().unwrap_or_default().to_string()
        };

        match tenant.as_str() {
            "legacy" | "nextlevel" => Self {
                tenant,
                title: "NEXTLEVEL BRASIL",
                short_name: "NTL",
                email_domain: "@nextlevel.net.br",
            },
            _ => Self {
                tenant,
                title: "OWL STORE LTDA",
                short_name: "OWL",
                email_domain: "@owlstore.net.br",
            },
        }
    }
}

/// Identity provider (Keycloak) settings.
#[derive(Debug, Clone)]
pub struct KeycloakConfig {
    /// Base URL of the Keycloak server
    pub url: Url,
    pub realm: String,
    pub client_id: String,
}

impl KeycloakConfig {
    fn endpoint(&self, leaf: &str) -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/{}",
            self.url.as_str().trim_end_matches('/'),
            urlencoding::encode(&self.realm),
            leaf
        )
    }

    /// OIDC token endpoint of the realm.
    pub fn token_endpoint(&self) -> String {
        self.endpoint("token")
    }

    /// OIDC authorization endpoint of the realm.
    pub fn auth_endpoint(&self) -> String {
        self.endpoint("auth")
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend location as configured
    pub api_base: ApiBase,
    /// Resolved API root (`.../api/`)
    pub api_root: Url,
    /// Origin the application is served from
    pub app_origin: Url,
    /// Path of the Steam callback view
    pub callback_path: String,
    /// Path of the profile view
    pub profile_path: String,
    pub keycloak: KeycloakConfig,
    /// File holding the session tokens between invocations
    pub session_file: PathBuf,
    /// Delay before leaving the callback view after a successful link
    pub redirect_delay: Duration,
    pub brand: Brand,
}

impl Config {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let app_origin = parse_url(
            "STEAM_LINK_APP_ORIGIN",
            &var("STEAM_LINK_APP_ORIGIN").unwrap_or_else(|| DEFAULT_APP_ORIGIN.to_string()),
        )?;
        let api_base = ApiBase::parse(
            &var("STEAM_LINK_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        )?;
        let api_root = api_base.resolve(&app_origin)?;

        let keycloak = KeycloakConfig {
            url: parse_url(
                "KEYCLOAK_URL",
                &var("KEYCLOAK_URL").ok_or(ConfigError::Missing("KEYCLOAK_URL"))?,
            )?,
            realm: var("KEYCLOAK_REALM").ok_or(ConfigError::Missing("KEYCLOAK_REALM"))?,
            client_id: var("KEYCLOAK_CLIENT_ID")
                .ok_or(ConfigError::Missing("KEYCLOAK_CLIENT_ID"))?,
        };

        let redirect_delay_secs = match var("STEAM_LINK_REDIRECT_DELAY_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                var: "STEAM_LINK_REDIRECT_DELAY_SECS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_REDIRECT_DELAY_SECS,
        };

        let brand = Brand::resolve(app_origin.host_str().unwrap_or_default());

        Ok(Self {
            api_base,
            api_root,
            callback_path: normalize_path(
                var("STEAM_LINK_CALLBACK_PATH").unwrap_or_else(|| DEFAULT_CALLBACK_PATH.to_string()),
            ),
            profile_path: normalize_path(
                var("STEAM_LINK_PROFILE_PATH").unwrap_or_else(|| DEFAULT_PROFILE_PATH.to_string()),
            ),
            app_origin,
            keycloak,
            session_file: PathBuf::from(
                var("STEAM_LINK_SESSION_FILE").unwrap_or_else(|| DEFAULT_SESSION_FILE.to_string()),
            ),
            redirect_delay: Duration::from_secs(redirect_delay_secs),
            brand,
        })
    }

    /// Config with fixed values for tests, talking to a backend at `api_origin`.
    pub fn test_default(api_origin: &Url) -> Self {
        let app_origin = Url::parse(DEFAULT_APP_ORIGIN).expect("default origin is a valid URL");
        let api_base = ApiBase::Absolute(api_origin.clone());
        let api_root = api_base
            .resolve(&app_origin)
            .expect("test backend origin resolves");

        Self {
            api_base,
            api_root,
            callback_path: DEFAULT_CALLBACK_PATH.to_string(),
            profile_path: DEFAULT_PROFILE_PATH.to_string(),
            keycloak: KeycloakConfig {
                url: api_origin.clone(),
                realm: "test-realm".to_string(),
                client_id: "test-client".to_string(),
            },
            brand: Brand::resolve("localhost"),
            app_origin,
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            redirect_delay: Duration::from_secs(DEFAULT_REDIRECT_DELAY_SECS),
        }
    }

    /// Address Steam should send the browser back to.
    pub fn callback_redirect_uri(&self) -> String {
        format!("{}{}", origin_of(&self.app_origin), self.callback_path)
    }

    /// Absolute URL of the profile view.
    pub fn profile_url(&self) -> String {
        format!("{}{}", origin_of(&self.app_origin), self.profile_path)
    }
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

fn normalize_path(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{path}")
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}
