//! Authorization code exchange.

use chrono::{DateTime, Duration, Utc};
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{
    input_error, provider_response_error, Error, ErrorKind, ProviderResponseErrorKind,
};
use crate::settings::ProviderSettings;

const ACCESS_TOKEN_KEY: &str = "access_token";
const EXPIRES_IN_KEY: &str = "expires_in";
const TOKEN_TYPE_KEY: &str = "token_type";

/// Access token usable for calling the provider's profile API.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// The token itself.
    pub token: SecretString,
    /// When the token expires.
    pub expires_at: DateTime<Utc>,
    /// Token type (usually "Bearer").
    pub token_type: String,
}

impl AccessToken {
    /// Check if the access token is already past its expiry.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// Token endpoint response as sent over the wire. Every field is optional so
/// that a 200 response with missing fields is reported as such.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default, deserialize_with = "lenient_seconds")]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Accepts `expires_in` as a JSON number or a numeric string. Anything else is
/// treated as absent.
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Form body for the code exchange.
#[derive(Serialize)]
struct TokenExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    code: &'a str,
    grant_type: &'static str,
}

/// Exchanges an authorization code for an access token.
#[derive(Debug, Clone)]
pub struct AccessTokenExchanger {
    client: reqwest::Client,
}

impl AccessTokenExchanger {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Perform one POST to the token endpoint. Never retried.
    ///
    /// # Arguments
    ///
    /// * `settings` - Provider settings holding the client credentials
    /// * `code` - Authorization code from the callback
    /// * `redirect_uri` - The callback URI used when the code was requested
    pub async fn exchange(
        &self,
        settings: &ProviderSettings,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AccessToken, Error> {
        if code.is_empty() {
            return Err(input_error("authorization code is empty"));
        }
        if redirect_uri.is_empty() {
            return Err(input_error("redirect URI is empty"));
        }

        let request = TokenExchangeRequest {
            client_id: settings.client_id(),
            client_secret: settings.client_secret().expose_secret(),
            redirect_uri,
            code,
            grant_type: "authorization_code",
        };

        debug!("Exchanging authorization code at {}", settings.token_endpoint());

        let response = self
            .client
            .post(settings.token_endpoint().clone())
            .form(&request)
            .send()
            .await
            .inspect_err(|e| warn!("Failed to reach token endpoint: {:?}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .inspect_err(|e| warn!("Failed to read token response: {:?}", e))?;

        if status != reqwest::StatusCode::OK {
            warn!("Token endpoint answered with status {}", status);
            return Err(provider_response_error(
                ProviderResponseErrorKind::UnexpectedStatus(status.as_u16()),
                &format!("failed to obtain an access token, status {}", status),
            ));
        }

        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse token response: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::ProviderResponse(ProviderResponseErrorKind::MalformedBody),
            }
        })?;

        let token = into_access_token(parsed, Utc::now())?;
        debug!("Obtained {} access token", token.token_type);
        Ok(token)
    }
}

/// A 200 status does not guarantee a usable token; every field is checked.
fn into_access_token(response: TokenResponse, now: DateTime<Utc>) -> Result<AccessToken, Error> {
    let token = response
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| missing_field(ACCESS_TOKEN_KEY))?;
    // Out-of-range lifetimes are reported like missing ones.
    let expires_at = response
        .expires_in
        .filter(|e| *e > 0)
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| missing_field(EXPIRES_IN_KEY))?;
    let token_type = response
        .token_type
        .filter(|t| !t.is_empty())
        .ok_or_else(|| missing_field(TOKEN_TYPE_KEY))?;

    Ok(AccessToken {
        token: SecretString::from(token),
        expires_at,
        token_type,
    })
}

fn missing_field(field: &'static str) -> Error {
    warn!("Token response is missing or has an invalid {}", field);
    provider_response_error(
        ProviderResponseErrorKind::MissingField(field),
        &format!(
            "retrieved an access token response without a valid {}",
            field
        ),
    )
}
