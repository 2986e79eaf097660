//! Turns the process configuration into a ready-to-use provider and callback processor.

use std::sync::Arc;
use std::time::Duration;

use federation_auth::callback::{CallbackProcessor, RedirectTargets};
use federation_auth::error::configuration_error;
use federation_auth::http::HttpClientConfig;
use federation_auth::oauth::providers::{generic, google};
use federation_auth::oauth::Provider;
use federation_auth::policy::EmailDomainValidator;
use federation_auth::{Error, ProviderSettings};
use log::*;
use secrecy::SecretString;
use service::config::{Config, ProviderChoice};
use url::Url;

/// Build immutable provider settings from the configuration.
///
/// An empty scope list keeps the provider's default scopes.
pub fn provider_settings(config: &Config) -> Result<ProviderSettings, Error> {
    let client_id = config
        .client_id()
        .ok_or_else(|| configuration_error("CLIENT_ID is not set"))?;
    let client_secret = config
        .client_secret()
        .ok_or_else(|| configuration_error("CLIENT_SECRET is not set"))?;

    let authorize_endpoint = Url::parse(&config.authorize_endpoint)?;
    let token_endpoint = Url::parse(&config.token_endpoint)?;
    let user_info_endpoint = Url::parse(&config.user_info_endpoint)?;

    let mut settings = match config.provider {
        ProviderChoice::Google => {
            ProviderSettings::google(client_id, SecretString::new(client_secret))?
                .with_endpoints(authorize_endpoint, token_endpoint, user_info_endpoint)
        }
        ProviderChoice::Generic => ProviderSettings::new(
            client_id,
            SecretString::new(client_secret),
            authorize_endpoint,
            token_endpoint,
            user_info_endpoint,
        ),
    };

    if !config.scopes.is_empty() {
        settings = settings.with_scopes(config.scopes.iter().cloned());
    }
    if let Some(domain) = &config.domain_restriction {
        settings = settings.with_domain_restriction(domain.as_str());
    }

    settings.validate()?;
    Ok(settings)
}

pub fn build_provider(config: &Config) -> Result<Arc<dyn Provider>, Error> {
    let settings = provider_settings(config)?;
    let http = HttpClientConfig {
        timeout: Duration::from_secs(config.http_timeout_secs),
        ..HttpClientConfig::default()
    };

    let provider: Arc<dyn Provider> = match config.provider {
        ProviderChoice::Google => Arc::new(google::Provider::new(settings, http)?),
        ProviderChoice::Generic => Arc::new(generic::Provider::new(
            config.provider_name.clone().unwrap_or_default(),
            settings,
            http,
        )?),
    };

    info!(
        "Configured {} identity provider (client id {})",
        provider.name(),
        provider.settings().client_id()
    );
    Ok(provider)
}

/// Build the callback processor; a non-positive or out-of-range state TTL is a
/// configuration error.
pub fn build_processor(
    config: &Config,
    provider: Arc<dyn Provider>,
) -> Result<CallbackProcessor, Error> {
    let state_ttl = Some(config.state_ttl_secs)
        .filter(|secs| *secs > 0)
        .and_then(chrono::Duration::try_seconds)
        .ok_or_else(|| configuration_error("STATE_TTL_SECS must be a positive number of seconds"))?;

    let validator = EmailDomainValidator::new(config.allowed_email_suffixes.iter().cloned());
    let targets = RedirectTargets {
        default_target: config.default_redirect.clone(),
        identity_providers: config.identity_providers_redirect.clone(),
    };

    Ok(CallbackProcessor::new(provider, Arc::new(validator), targets).with_state_ttl(state_ttl))
}
