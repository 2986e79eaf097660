//! Google OAuth provider implementation.

use async_trait::async_trait;

use crate::error::Error;
use crate::http::{HttpClientBuilder, HttpClientConfig};
use crate::oauth::user_info::{ProfileFields, TokenPlacement, UserInfoFetcher};
use crate::oauth::{
    request, AccessToken, AccessTokenExchanger, AuthorizationRequest, ProviderKind,
    UserInformation,
};
use crate::settings::ProviderSettings;

const PROFILE_FIELDS: ProfileFields = ProfileFields {
    id: &["id"],
    email: &["email"],
    user_name: &["given_name"],
    display_name: &["name"],
    locale: &["locale"],
    picture: &["picture"],
    gender: &["gender"],
};

/// Google OAuth provider.
///
/// Sends the configured domain restriction as the `hd` hosted-domain hint and
/// passes the access token to the user-info API as a query parameter.
pub struct Provider {
    settings: ProviderSettings,
    exchanger: AccessTokenExchanger,
    fetcher: UserInfoFetcher,
}

impl Provider {
    /// Create a new Google OAuth provider.
    ///
    /// Fails with a configuration error when the settings are incomplete, so no
    /// flow can ever start with a half-configured provider.
    pub fn new(settings: ProviderSettings, http: HttpClientConfig) -> Result<Self, Error> {
        settings.validate()?;
        let client = HttpClientBuilder::from_config(http).build()?;

        Ok(Self {
            settings,
            exchanger: AccessTokenExchanger::new(client.clone()),
            fetcher: UserInfoFetcher::new(client, TokenPlacement::QueryParameter, PROFILE_FIELDS),
        })
    }
}

#[async_trait]
impl crate::oauth::Provider for Provider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Google
    }

    fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    fn build_authorize_url(&self, callback_uri: &str) -> Result<AuthorizationRequest, Error> {
        request::build_redirect(
            &self.settings,
            callback_uri,
            self.settings.domain_restriction(),
        )
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
