//! Authorization redirect construction.

use log::*;
use url::Url;

use super::state::AuthorizationState;
use crate::error::{configuration_error, Error};
use crate::settings::ProviderSettings;

/// Authorization request with URL and state management data.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// Authorization URL to redirect the user to.
    pub url: Url,
    /// State the caller must persist until the callback arrives.
    pub state: AuthorizationState,
}

/// Build the provider redirect URL together with a fresh authorization state.
///
/// The hosted-domain hint (`hd`) is only added when `domain_hint` is set; which
/// providers send it is the provider variant's decision.
pub fn build_redirect(
    settings: &ProviderSettings,
    callback_uri: &str,
    domain_hint: Option<&str>,
) -> Result<AuthorizationRequest, Error> {
    if callback_uri.trim().is_empty() {
        return Err(configuration_error("callback URI must be set"));
    }
    let callback_uri = Url::parse(callback_uri)?;

    let state = AuthorizationState::issue(callback_uri);
    let url = authorize_url(settings, &state.callback_uri, Some(&state.nonce), domain_hint)?;

    debug!("Built authorization redirect to {}", settings.authorize_endpoint());
    Ok(AuthorizationRequest { url, state })
}

/// Compose the authorize URL.
///
/// `client_id`, the URL-encoded `redirect_uri` and `response_type=code` are always
/// present; `scope` (space-joined), `state` and `hd` only when non-empty.
pub fn authorize_url(
    settings: &ProviderSettings,
    callback_uri: &Url,
    state: Option<&str>,
    domain_hint: Option<&str>,
) -> Result<Url, Error> {
    if settings.client_id().trim().is_empty() {
        return Err(configuration_error("client_id must be set"));
    }

    let endpoint = settings.authorize_endpoint().as_str();
    let separator = if settings.authorize_endpoint().query().is_some() {
        '&'
    } else {
        '?'
    };

    let mut url = format!(
        "{}{}client_id={}&redirect_uri={}&response_type=code",
        endpoint,
        separator,
        urlencoding::encode(settings.client_id()),
        urlencoding::encode(callback_uri.as_str()),
    );

    if !settings.scopes().is_empty() {
        let scopes = settings
            .scopes()
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        url.push_str(&format!("&scope={}", urlencoding::encode(&scopes)));
    }

    if let Some(state) = state.filter(|s| !s.is_empty()) {
        url.push_str(&format!("&state={}", urlencoding::encode(state)));
    }

    if let Some(domain) = domain_hint.filter(|d| !d.trim().is_empty()) {
        url.push_str(&format!("&hd={}", urlencoding::encode(domain)));
    }

    Ok(Url::parse(&url)?)
}
