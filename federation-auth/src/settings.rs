//! Immutable configuration for one identity provider.

use std::collections::BTreeSet;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use url::Url;

use crate::error::{configuration_error, Error};

pub const GOOGLE_AUTHORIZE_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/auth";
pub const GOOGLE_TOKEN_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/token";
pub const GOOGLE_USER_INFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Scopes needed to read the Google profile and email.
pub const GOOGLE_DEFAULT_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Provider settings created once at startup and shared read-only by every flow.
#[derive(Clone)]
pub struct ProviderSettings {
    client_id: String,
    client_secret: SecretString,
    scopes: BTreeSet<String>,
    authorize_endpoint: Url,
    token_endpoint: Url,
    user_info_endpoint: Url,
    domain_restriction: Option<String>,
}

impl ProviderSettings {
    /// Create settings for an arbitrary provider.
    ///
    /// # Arguments
    ///
    /// * `client_id` - OAuth client ID issued by the provider
    /// * `client_secret` - OAuth client secret issued by the provider
    /// * `authorize_endpoint` - URL the browser is redirected to
    /// * `token_endpoint` - URL for the server-to-server code exchange
    /// * `user_info_endpoint` - URL returning the authenticated user's profile
    pub fn new(
        client_id: impl Into<String>,
        client_secret: SecretString,
        authorize_endpoint: Url,
        token_endpoint: Url,
        user_info_endpoint: Url,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            scopes: BTreeSet::new(),
            authorize_endpoint,
            token_endpoint,
            user_info_endpoint,
            domain_restriction: None,
        }
    }

    /// Google endpoints with the profile and email scopes preset.
    pub fn google(client_id: impl Into<String>, client_secret: SecretString) -> Result<Self, Error> {
        Ok(Self::new(
            client_id,
            client_secret,
            Url::parse(GOOGLE_AUTHORIZE_ENDPOINT)?,
            Url::parse(GOOGLE_TOKEN_ENDPOINT)?,
            Url::parse(GOOGLE_USER_INFO_ENDPOINT)?,
        )
        .with_scopes(GOOGLE_DEFAULT_SCOPES))
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes
            .into_iter()
            .map(Into::into)
            .filter(|scope: &String| !scope.trim().is_empty())
            .collect();
        self
    }

    /// Restrict sign-in to a hosted domain (sent to the provider as a hint).
    pub fn with_domain_restriction(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        self.domain_restriction = if domain.trim().is_empty() {
            None
        } else {
            Some(domain)
        };
        self
    }

    pub fn with_endpoints(
        mut self,
        authorize_endpoint: Url,
        token_endpoint: Url,
        user_info_endpoint: Url,
    ) -> Self {
        self.authorize_endpoint = authorize_endpoint;
        self.token_endpoint = token_endpoint;
        self.user_info_endpoint = user_info_endpoint;
        self
    }

    /// Check that the settings can drive a flow at all.
    pub fn validate(&self) -> Result<(), Error> {
        if self.client_id.trim().is_empty() {
            return Err(configuration_error("client_id must be set"));
        }
        if self.client_secret.expose_secret().trim().is_empty() {
            return Err(configuration_error("client_secret must be set"));
        }
        Ok(())
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &SecretString {
        &self.client_secret
    }

    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    pub fn authorize_endpoint(&self) -> &Url {
        &self.authorize_endpoint
    }

    pub fn token_endpoint(&self) -> &Url {
        &self.token_endpoint
    }

    pub fn user_info_endpoint(&self) -> &Url {
        &self.user_info_endpoint
    }

    pub fn domain_restriction(&self) -> Option<&str> {
        self.domain_restriction.as_deref()
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("scopes", &self.scopes)
            .field("authorize_endpoint", &self.authorize_endpoint.as_str())
            .field("token_endpoint", &self.token_endpoint.as_str())
            .field("user_info_endpoint", &self.user_info_endpoint.as_str())
            .field("domain_restriction", &self.domain_restriction)
            .finish()
    }
}
