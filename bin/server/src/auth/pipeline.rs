//! The login pipeline.
//!
//! One run per request. The request URL is reconstructed as the browser
//! sees it, then either the login page is served (no `code` yet) or the
//! provider callback is completed: code exchange, email policy, backend
//! hand-off and finally the session cookie with a redirect to the
//! destination carried in `state`.

use axum::{
    http::{HeaderValue, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::Cookie;
use id_redirector_handoff::BackendRecord;
use id_redirector_identity::{IdentityProfile, PolicyDecision};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use super::AppState;
use super::provider::ProviderError;
use crate::canonical::{CanonicalRequest, Scheme};
use crate::error::AuthError;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "ID";

/// Query parameters understood by the pipeline.
///
/// Empty values are treated as absent.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LoginParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub after: Option<String>,
    #[serde(rename = "loginThenClose")]
    pub login_then_close: Option<String>,
    pub error: Option<String>,
}

/// The parts of an inbound request the pipeline looks at.
#[derive(Debug)]
pub struct InboundRequest<'a> {
    /// `Host` header.
    pub host: Option<&'a str>,
    /// All `Forwarded` header lines joined with `,`.
    pub forwarded: Option<&'a str>,
    pub uri: &'a Uri,
    pub params: LoginParams,
}

/// Runs the pipeline for one request.
///
/// # Errors
///
/// Returns the first failure; the caller turns it into the response.
#[instrument(skip_all, fields(path = %request.uri.path()))]
pub async fn run(state: &AppState, request: InboundRequest<'_>) -> Result<Response, AuthError> {
    let canonical = CanonicalRequest::from_parts(
        Scheme::Http,
        request.host,
        request.forwarded,
        request.uri,
    )?;
    let callback_url = canonical.callback_url();
    debug!(callback_url = %callback_url, "canonicalized request");

    let params = request.params;
    match non_empty(params.code.as_deref()) {
        None => login_page(state, &callback_url, &params).await,
        Some(code) => complete_login(state, &callback_url, code, &params).await,
    }
}

/// Serves the login page for a request that has not been to the provider yet.
async fn login_page(
    state: &AppState,
    callback_url: &str,
    params: &LoginParams,
) -> Result<Response, AuthError> {
    if let Some(error) = non_empty(params.error.as_deref()) {
        return Err(AuthError::Provider(
            ProviderError::Denied(error.to_string()).to_string(),
        ));
    }

    let destination = login_destination(state, params);
    let authorize_url = state
        .provider
        .authorize_url(callback_url, &destination)
        .await
        .map_err(|e| AuthError::Provider(e.to_string()))?;

    let page = state.login_page.render(&authorize_url, &state.static_url);
    Ok(Html(page).into_response())
}

/// Picks where the browser goes after a successful login.
fn login_destination(state: &AppState, params: &LoginParams) -> String {
    if let Some(after) = non_empty(params.after.as_deref()) {
        return after.to_string();
    }
    if wants_close(params.login_then_close.as_deref()) {
        return state.close_page();
    }
    state.default_destination.clone()
}

fn wants_close(flag: Option<&str>) -> bool {
    flag.is_some_and(|v| !matches!(v, "" | "0" | "false"))
}

async fn complete_login(
    state: &AppState,
    callback_url: &str,
    code: &str,
    params: &LoginParams,
) -> Result<Response, AuthError> {
    let profile = state
        .provider
        .exchange(callback_url, code)
        .await
        .map_err(|e| AuthError::Provider(e.to_string()))?;

    let decision = state.policy.decide(&profile);
    if !decision.allowed() {
        return Err(AuthError::AccessDenied {
            email: profile.email,
        });
    }

    let token = session_token(state, &profile, decision).await?;

    let destination = non_empty(params.state.as_deref()).ok_or(AuthError::MissingState)?;
    let response = issue(state, &token, destination)?;

    info!(
        email = %profile.email,
        destination = %destination,
        backend = state.backend.is_some(),
        "issued session cookie"
    );
    Ok(response)
}

/// Returns the cookie value: the backend's token, or the derived id when
/// no backend is configured.
async fn session_token(
    state: &AppState,
    profile: &IdentityProfile,
    decision: PolicyDecision,
) -> Result<String, AuthError> {
    let Some(backend) = &state.backend else {
        return Ok(decision.into_derived_id().into_inner());
    };

    let record = BackendRecord::from_profile(profile, decision.derived_id(), &backend.fields);
    backend
        .handoff
        .send(&record)
        .await
        .map_err(|e| AuthError::BackendUnavailable(e.to_string()))
}

/// Builds the `302 Found` response carrying the session cookie.
fn issue(state: &AppState, token: &str, destination: &str) -> Result<Response, AuthError> {
    let location = validate_destination(destination)?;

    if !is_cookie_value(token) {
        return Err(AuthError::InvalidToken);
    }
    let mut cookie = Cookie::build((SESSION_COOKIE, token.to_string()))
        .http_only(true)
        .path("/");
    if let Some(domain) = &state.cookie_domain {
        cookie = cookie.domain(domain.clone());
    }
    let set_cookie = HeaderValue::from_str(&cookie.build().to_string())
        .map_err(|_| AuthError::InvalidToken)?;

    Ok((
        StatusCode::FOUND,
        [(header::SET_COOKIE, set_cookie), (header::LOCATION, location)],
    )
        .into_response())
}

/// Accepts absolute http(s) URLs and absolute paths.
fn validate_destination(destination: &str) -> Result<HeaderValue, AuthError> {
    let invalid = || AuthError::InvalidDestination {
        destination: destination.to_string(),
    };

    let acceptable = if destination.starts_with('/') {
        !destination.starts_with("//") && !destination.starts_with("/\\")
    } else {
        url::Url::parse(destination)
            .is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
    };
    if !acceptable {
        return Err(invalid());
    }

    HeaderValue::from_str(destination).map_err(|_| invalid())
}

/// RFC 6265 `cookie-octet`s only.
fn is_cookie_value(value: &str) -> bool {
    !value.is_empty()
        && value.bytes().all(|b| {
            matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
        })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
