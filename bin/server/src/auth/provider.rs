//! OAuth2 identity provider client.
//!
//! Two operations are needed from the provider: an authorization URL that
//! sends the browser to the consent screen, and the exchange of the
//! returned code for the user's profile. The destination the browser
//! should land on after login travels through the provider as the OAuth
//! `state` parameter.

use async_trait::async_trait;
use id_redirector_identity::IdentityProfile;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, TokenResponse, TokenUrl, basic::BasicClient,
};
use rootcause::Report;
use std::fmt;
use tracing::{debug, instrument};

use super::registry::ClientRegistry;
use crate::config::OAuthConfig;

/// Only the email address is needed.
const EMAIL_SCOPE: &str = "email";

/// OAuth client with authorization and token endpoints set.
type ConfiguredClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// The provider operations the login pipeline depends on.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Builds the URL that starts a login.
    ///
    /// `callback_url` is where the provider sends the browser back to and
    /// `destination` is returned unchanged as the `state` parameter.
    async fn authorize_url(
        &self,
        callback_url: &str,
        destination: &str,
    ) -> Result<String, Report<ProviderError>>;

    /// Exchanges an authorization code for the user's profile.
    async fn exchange(
        &self,
        callback_url: &str,
        code: &str,
    ) -> Result<IdentityProfile, Report<ProviderError>>;
}

/// Authorization-code grant against a configured provider.
pub struct OAuthIdentityClient {
    client_id: ClientId,
    client_secret: ClientSecret,
    auth_url: AuthUrl,
    token_url: TokenUrl,
    userinfo_url: String,
    http_client: reqwest::Client,
    registry: ClientRegistry<ConfiguredClient>,
}

impl OAuthIdentityClient {
    /// Creates a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &OAuthConfig) -> Result<Self, Report<ProviderError>> {
        let auth_url = AuthUrl::new(config.auth_url.clone())
            .map_err(|e| ProviderError::Configuration(format!("invalid auth URL: {}", e)))?;
        let token_url = TokenUrl::new(config.token_url.clone())
            .map_err(|e| ProviderError::Configuration(format!("invalid token URL: {}", e)))?;
        reqwest::Url::parse(&config.userinfo_url)
            .map_err(|e| ProviderError::Configuration(format!("invalid userinfo URL: {}", e)))?;

        let http_client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client_id: ClientId::new(config.client_id.clone()),
            client_secret: ClientSecret::new(config.client_secret.clone()),
            auth_url,
            token_url,
            userinfo_url: config.userinfo_url.clone(),
            http_client,
            registry: ClientRegistry::new(),
        })
    }

    /// Returns the handle bound to `callback_url`, creating it on first use.
    async fn client_for(
        &self,
        callback_url: &str,
    ) -> Result<std::sync::Arc<ConfiguredClient>, Report<ProviderError>> {
        let client = self
            .registry
            .get_or_try_insert_with(callback_url, || {
                let redirect_url = RedirectUrl::new(callback_url.to_string()).map_err(|e| {
                    ProviderError::Configuration(format!("invalid redirect URL: {}", e))
                })?;

                debug!(callback_url, "creating OAuth client");

                Ok::<_, ProviderError>(
                    BasicClient::new(self.client_id.clone())
                        .set_client_secret(self.client_secret.clone())
                        .set_auth_uri(self.auth_url.clone())
                        .set_token_uri(self.token_url.clone())
                        .set_redirect_uri(redirect_url),
                )
            })
            .await?;
        Ok(client)
    }

    /// Returns the number of callback URLs seen so far.
    pub async fn cached_clients(&self) -> usize {
        self.registry.len().await
    }
}

#[async_trait]
impl IdentityProvider for OAuthIdentityClient {
    async fn authorize_url(
        &self,
        callback_url: &str,
        destination: &str,
    ) -> Result<String, Report<ProviderError>> {
        let client = self.client_for(callback_url).await?;

        let (auth_url, _state) = client
            .authorize_url(|| CsrfToken::new(destination.to_string()))
            .add_scope(Scope::new(EMAIL_SCOPE.to_string()))
            .url();

        Ok(auth_url.to_string())
    }

    #[instrument(skip(self, code))]
    async fn exchange(
        &self,
        callback_url: &str,
        code: &str,
    ) -> Result<IdentityProfile, Report<ProviderError>> {
        let client = self.client_for(callback_url).await?;

        let token_response = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| ProviderError::TokenExchange(format!("token exchange failed: {}", e)))?;

        let profile = self
            .http_client
            .get(&self.userinfo_url)
            .bearer_auth(token_response.access_token().secret())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ProviderError::Profile(format!("profile request failed: {}", e)))?
            .json::<IdentityProfile>()
            .await
            .map_err(|e| ProviderError::Profile(format!("invalid profile response: {}", e)))?;

        debug!(email = %profile.email, "fetched identity profile");
        Ok(profile)
    }
}

/// Identity provider errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Configuration error (invalid URLs, etc.)
    Configuration(String),
    /// The code could not be exchanged for tokens.
    TokenExchange(String),
    /// The profile could not be fetched or parsed.
    Profile(String),
    /// The provider redirected back with an error instead of a code.
    Denied(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(msg) => write!(f, "OAuth configuration error: {}", msg),
            Self::TokenExchange(msg) => write!(f, "OAuth token exchange error: {}", msg),
            Self::Profile(msg) => write!(f, "OAuth profile error: {}", msg),
            Self::Denied(msg) => write!(f, "OAuth provider returned error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}
