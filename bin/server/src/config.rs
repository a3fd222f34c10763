//! Centralized server configuration.
//!
//! Configuration is loaded once at startup via the `config` crate from an
//! optional `redirector.toml` file (path overridable with
//! `REDIRECTOR_CONFIG`), layered under `REDIRECTOR_*` environment
//! variables. Nested keys use `__`, e.g. `REDIRECTOR_OAUTH__CLIENT_ID`.

use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "REDIRECTOR_CONFIG";

/// Configuration file used when `REDIRECTOR_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "redirector";

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address to listen on. The reverse proxy is expected to be local.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Public base URL of the application; the default post-login destination.
    pub connect_url: String,

    /// Public base URL of static assets.
    pub static_url: String,

    /// OAuth client configuration.
    pub oauth: OAuthConfig,

    /// Domain attribute for the session cookie. Host-only when unset.
    #[serde(default)]
    pub cookie_domain: Option<String>,

    /// Regular expression the whole email address must match.
    #[serde(default = "default_email_pattern")]
    pub email_pattern: String,

    /// Backend identity service. The derived id becomes the cookie when unset.
    #[serde(default)]
    pub backend: Option<BackendConfig>,

    /// Salt for the derived id.
    ///
    /// Unset forwards the provider subject id unchanged; an empty string
    /// hashes it without a salt.
    #[serde(default)]
    pub salt: Option<String>,

    /// Peers allowed to call the server.
    #[serde(default = "default_trusted_peers")]
    pub trusted_peers: Vec<IpAddr>,

    /// Login page template replacing the built-in page.
    #[serde(default)]
    pub login_template: Option<PathBuf>,
}

/// OAuth client and provider endpoints.
#[derive(Clone, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default = "default_userinfo_url")]
    pub userinfo_url: String,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .finish()
    }
}

/// Backend identity service.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub host: String,
    pub port: u16,
    /// Profile fields to forward.
    #[serde(default = "default_backend_fields")]
    pub fields: Vec<String>,
}

fn default_port() -> u16 {
    8080
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_email_pattern() -> String {
    ".*".to_string()
}

fn default_trusted_peers() -> Vec<IpAddr> {
    vec![
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(Ipv6Addr::LOCALHOST),
    ]
}

fn default_auth_url() -> String {
    GOOGLE_AUTH_URL.to_string()
}

fn default_token_url() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

fn default_userinfo_url() -> String {
    GOOGLE_USERINFO_URL.to_string()
}

fn default_backend_fields() -> Vec<String> {
    vec!["id".to_string()]
}

impl ServerConfig {
    /// Loads configuration from the config file and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn load() -> Result<Self, config::ConfigError> {
        let path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        Self::load_from(&path, environment())
    }

    fn load_from(
        path: &str,
        environment: config::Environment,
    ) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(environment)
            .build()?
            .try_deserialize()
    }
}

/// `REDIRECTOR_*` variables, nested keys joined with `__`.
///
/// Values stay strings until a field asks for another type, so salts and
/// secrets that look like numbers are passed through unchanged.
fn environment() -> config::Environment {
    config::Environment::with_prefix("REDIRECTOR")
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("trusted_peers")
        .with_list_parse_key("backend.fields")
}

/// Errors found while turning configuration into application state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    /// The email pattern does not compile.
    InvalidEmailPattern { details: String },
    /// A backend field does not name a profile field.
    InvalidBackendField { details: String },
    /// A configured URL does not parse.
    InvalidUrl { key: &'static str, details: String },
    /// The login template could not be read.
    LoginTemplate { path: PathBuf, details: String },
    /// The OAuth client could not be created.
    Provider { details: String },
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEmailPattern { details } => write!(f, "email_pattern: {details}"),
            Self::InvalidBackendField { details } => write!(f, "backend.fields: {details}"),
            Self::InvalidUrl { key, details } => write!(f, "{key}: invalid URL: {details}"),
            Self::LoginTemplate { path, details } => {
                write!(
                    f,
                    "failed to read login template {}: {details}",
                    path.display()
                )
            }
            Self::Provider { details } => write!(f, "OAuth client setup failed: {details}"),
        }
    }
}

impl std::error::Error for SetupError {}
