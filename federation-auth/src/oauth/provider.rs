//! OAuth provider trait and types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::request::AuthorizationRequest;
use super::token::AccessToken;
use super::user_info::UserInformation;
use crate::error::Error;
use crate::settings::ProviderSettings;

/// Known identity provider variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Google,
    Generic,
}

impl ProviderKind {
    /// Get the provider identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::Generic => "generic",
        }
    }
}

/// Capabilities every identity provider variant offers to the callback processor.
///
/// Implementations handle provider-specific details such as:
/// - Which extra hints go on the authorize URL
/// - How the access token is presented to the profile API
/// - How profile fields are named
#[async_trait]
pub trait Provider: Send + Sync {
    /// Get the provider kind.
    fn kind(&self) -> ProviderKind;

    /// Name emitted as the authentication method claim.
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// The immutable settings this provider was built with.
    fn settings(&self) -> &ProviderSettings;

    /// Build the redirect URL and a fresh authorization state.
    ///
    /// # Arguments
    ///
    /// * `callback_uri` - Absolute URI the provider redirects back to
    fn build_authorize_url(&self, callback_uri: &str) -> Result<AuthorizationRequest, Error>;

    /// Exchange an authorization code for an access token.
    ///
    /// # Arguments
    ///
    /// * `code` - Authorization code from the callback
    /// * `redirect_uri` - Callback URI used for the authorize request
    async fn exchange_token(&self, code: &str, redirect_uri: &str) -> Result<AccessToken, Error>;

    /// Get user information using an access token.
    async fn fetch_user_info(&self, token: &AccessToken) -> Result<UserInformation, Error>;
}

/// A provider together with the token and profile of one completed exchange.
///
/// Exists only while a single callback is being processed.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    pub provider_name: String,
    pub access_token: AccessToken,
    pub user_information: UserInformation,
}
