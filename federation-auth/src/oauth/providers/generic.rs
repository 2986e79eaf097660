//! Standard OAuth 2.0 provider without vendor extensions.

use async_trait::async_trait;

use crate::error::Error;
use crate::http::{HttpClientBuilder, HttpClientConfig};
use crate::oauth::user_info::{ProfileFields, TokenPlacement, UserInfoFetcher};
use crate::oauth::{
    request, AccessToken, AccessTokenExchanger, AuthorizationRequest, ProviderKind,
    UserInformation,
};
use crate::settings::ProviderSettings;

// Covers OIDC userinfo claims as well as the common GitHub/GitLab style keys.
const PROFILE_FIELDS: ProfileFields = ProfileFields {
    id: &["sub", "id"],
    email: &["email"],
    user_name: &["preferred_username", "login", "username", "given_name"],
    display_name: &["name"],
    locale: &["locale"],
    picture: &["picture", "avatar_url"],
    gender: &["gender"],
};

/// Generic OAuth 2.0 provider.
///
/// Never sends a hosted-domain hint and presents the access token as a bearer
/// `Authorization` header.
pub struct Provider {
    name: String,
    settings: ProviderSettings,
    exchanger: AccessTokenExchanger,
    fetcher: UserInfoFetcher,
}

impl Provider {
    /// Create a new generic provider.
    ///
    /// # Arguments
    ///
    /// * `name` - Name used for the authentication method claim
    /// * `settings` - Provider endpoints and credentials
    /// * `http` - HTTP client configuration
    pub fn new(
        name: impl Into<String>,
        settings: ProviderSettings,
        http: HttpClientConfig,
    ) -> Result<Self, Error> {
        settings.validate()?;
        let client = HttpClientBuilder::from_config(http).build()?;

        let name = name.into();
        let name = if name.trim().is_empty() {
            ProviderKind::Generic.as_str().to_string()
        } else {
            name.to_lowercase()
        };

        Ok(Self {
            name,
            settings,
            exchanger: AccessTokenExchanger::new(client.clone()),
            fetcher: UserInfoFetcher::new(client, TokenPlacement::BearerHeader, PROFILE_FIELDS),
        })
    }
}

#[async_trait]
impl crate::oauth::Provider for Provider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Generic
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    fn build_authorize_url(&self, callback_uri: &str) -> Result<AuthorizationRequest, Error> {
        request::build_redirect(&self.settings, callback_uri, None)
    }

    async fn exchange_token(&self, code: &str, redirect_uri: &str) -> Result<AccessToken, Error> {
        self.exchanger
            .exchange(&self.settings, code, redirect_uri)
            .await
    }

    async fn fetch_user_info(&self, token: &AccessToken) -> Result<UserInformation, Error> {
        self.fetcher.fetch(&self.settings, token).await
    }
}
