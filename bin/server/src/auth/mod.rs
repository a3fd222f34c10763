//! Authentication module for the id-redirector server.
//!
//! This module provides:
//! - OAuth2 login against an external identity provider
//! - The login pipeline that turns a provider callback into a session cookie
//! - The trusted-peer extractor guarding every route
//!
//! # Flow
//!
//! A request without a `code` gets the login page, whose button points at
//! the provider's consent screen. The provider sends the browser back to
//! the same URL with a `code` and the original destination in `state`. The
//! code is exchanged for a profile, the email is checked against the allow
//! pattern, the pseudonymous id is handed to the backend, and the browser
//! is redirected to the destination with the session cookie set.

pub mod middleware;
pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod routes;

use id_redirector_handoff::BackendHandoff;
use id_redirector_identity::{EmailPolicy, IdentityPolicy, ProfileField, SaltConfig};
use rootcause::Report;
use std::sync::Arc;

use crate::config::{ServerConfig, SetupError};
use crate::pages::LoginPage;

pub use middleware::{TrustedPeer, TrustedPeers};
pub use provider::{IdentityProvider, OAuthIdentityClient, ProviderError};
pub use routes::{authenticate, health};

/// Static page the browser lands on when it asked to close after login.
const CLOSE_PAGE: &str = "close.html";

/// Backend identity service and the profile fields it receives.
#[derive(Debug, Clone)]
pub struct BackendTarget {
    pub handoff: BackendHandoff,
    pub fields: Vec<ProfileField>,
}

/// Shared application state.
///
/// Built once at startup and never mutated afterwards; the only interior
/// mutability is the provider's client registry.
pub struct AppState {
    /// Identity provider client.
    pub provider: Arc<dyn IdentityProvider>,
    /// Email allow-pattern and id derivation.
    pub policy: IdentityPolicy,
    /// Backend identity service, if one is configured.
    pub backend: Option<BackendTarget>,
    /// Domain attribute for the session cookie.
    pub cookie_domain: Option<String>,
    /// Where to send the browser when no destination was requested.
    pub default_destination: String,
    /// Public base URL of static assets, without a trailing slash.
    pub static_url: String,
    /// Login page template.
    pub login_page: LoginPage,
    /// Peers allowed to call the server.
    pub trusted_peers: TrustedPeers,
}

impl AppState {
    /// Creates a state with the given provider and policy and no backend.
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        policy: IdentityPolicy,
        default_destination: impl Into<String>,
        static_url: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            policy,
            backend: None,
            cookie_domain: None,
            default_destination: default_destination.into(),
            static_url: static_url.into().trim_end_matches('/').to_string(),
            login_page: LoginPage::builtin(),
            trusted_peers: TrustedPeers::default(),
        }
    }

    /// Builds the application state from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the email pattern, a backend field, a URL or the
    /// login template is invalid.
    pub fn from_config(config: &ServerConfig) -> Result<Self, Report<SetupError>> {
        for (key, value) in [
            ("connect_url", &config.connect_url),
            ("static_url", &config.static_url),
        ] {
            url::Url::parse(value).map_err(|e| SetupError::InvalidUrl {
                key,
                details: e.to_string(),
            })?;
        }

        let email = EmailPolicy::new(&config.email_pattern).map_err(|e| {
            SetupError::InvalidEmailPattern {
                details: e.to_string(),
            }
        })?;
        let policy = IdentityPolicy::new(email, SaltConfig::from_setting(config.salt.as_deref()));

        let backend = match &config.backend {
            Some(backend) => {
                let fields = backend
                    .fields
                    .iter()
                    .map(|name| name.parse::<ProfileField>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| SetupError::InvalidBackendField {
                        details: e.to_string(),
                    })?;
                Some(BackendTarget {
                    handoff: BackendHandoff::new(backend.host.clone(), backend.port),
                    fields,
                })
            }
            None => None,
        };

        let login_page = match &config.login_template {
            Some(path) => LoginPage::from_file(path).map_err(|e| SetupError::LoginTemplate {
                path: path.clone(),
                details: e.to_string(),
            })?,
            None => LoginPage::builtin(),
        };

        let provider = OAuthIdentityClient::new(&config.oauth).map_err(|e| SetupError::Provider {
            details: e.to_string(),
        })?;

        let mut state = Self::new(
            Arc::new(provider),
            policy,
            config.connect_url.clone(),
            config.static_url.clone(),
        );
        state.backend = backend;
        state.cookie_domain = config.cookie_domain.clone();
        state.login_page = login_page;
        state.trusted_peers = TrustedPeers::new(config.trusted_peers.clone());
        Ok(state)
    }

    /// Returns the static page for `loginThenClose` requests.
    #[must_use]
    pub fn close_page(&self) -> String {
        format!("{}/{}", self.static_url, CLOSE_PAGE)
    }
}
