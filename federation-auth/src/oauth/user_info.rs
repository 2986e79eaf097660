//! User profile retrieval.

use log::*;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::token::AccessToken;
use crate::error::{
    input_error, provider_response_error, Error, ErrorKind, ProviderResponseErrorKind,
};
use crate::settings::ProviderSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    /// Map a provider gender string; anything unrecognised is `Unknown`.
    pub fn from_provider(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Gender::Male,
            "female" | "f" => Gender::Female,
            _ => Gender::Unknown,
        }
    }
}

/// User information retrieved from the identity provider.
///
/// Only `external_id` is guaranteed; the provider may withhold the rest when the
/// user declined optional consent scopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInformation {
    /// Provider's unique user identifier.
    pub external_id: String,
    pub email: Option<String>,
    pub user_name: Option<String>,
    pub display_name: Option<String>,
    pub locale: Option<String>,
    pub picture_url: Option<String>,
    pub gender: Gender,
}

impl UserInformation {
    pub fn new(external_id: impl Into<String>) -> Self {
        Self {
            external_id: external_id.into(),
            email: None,
            user_name: None,
            display_name: None,
            locale: None,
            picture_url: None,
            gender: Gender::Unknown,
        }
    }
}

/// How the access token is presented to the user-info endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPlacement {
    /// `?access_token=<token>`
    QueryParameter,
    /// `Authorization: Bearer <token>`
    BearerHeader,
}

/// Names of the profile fields in a provider's user-info response.
///
/// Each entry lists candidate keys in order of preference.
#[derive(Debug, Clone, Copy)]
pub struct ProfileFields {
    pub id: &'static [&'static str],
    pub email: &'static [&'static str],
    pub user_name: &'static [&'static str],
    pub display_name: &'static [&'static str],
    pub locale: &'static [&'static str],
    pub picture: &'static [&'static str],
    pub gender: &'static [&'static str],
}

impl ProfileFields {
    fn map(&self, profile: &Map<String, Value>) -> Result<UserInformation, Error> {
        let external_id = first_string(profile, self.id).ok_or_else(|| {
            warn!("User info response has no user id");
            provider_response_error(
                ProviderResponseErrorKind::MissingField("id"),
                "unable to retrieve the user id, the user may have denied the authorization",
            )
        })?;

        Ok(UserInformation {
            external_id,
            email: first_string(profile, self.email),
            user_name: first_string(profile, self.user_name),
            display_name: first_string(profile, self.display_name),
            locale: first_string(profile, self.locale),
            picture_url: first_string(profile, self.picture),
            gender: first_string(profile, self.gender)
                .map(|g| Gender::from_provider(&g))
                .unwrap_or(Gender::Unknown),
        })
    }
}

/// Returns the first non-empty value among `keys`. Numeric ids are accepted.
fn first_string(profile: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| match profile.get(*key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .next()
}

/// Retrieves the authenticated user's profile.
#[derive(Debug, Clone)]
pub struct UserInfoFetcher {
    client: reqwest::Client,
    placement: TokenPlacement,
    fields: ProfileFields,
}

impl UserInfoFetcher {
    pub fn new(client: reqwest::Client, placement: TokenPlacement, fields: ProfileFields) -> Self {
        Self {
            client,
            placement,
            fields,
        }
    }

    /// Perform one GET to the user-info endpoint. Never retried.
    pub async fn fetch(
        &self,
        settings: &ProviderSettings,
        token: &AccessToken,
    ) -> Result<UserInformation, Error> {
        let access_token = token.token.expose_secret();
        if access_token.is_empty() {
            return Err(input_error("access token is empty"));
        }

        debug!("Retrieving user information from {}", settings.user_info_endpoint());

        let request = self.client.get(settings.user_info_endpoint().clone());
        let request = match self.placement {
            TokenPlacement::QueryParameter => request.query(&[("access_token", access_token)]),
            TokenPlacement::BearerHeader => request.bearer_auth(access_token),
        };

        let response = request
            .send()
            .await
            .inspect_err(|e| warn!("Failed to reach user info endpoint: {:?}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .inspect_err(|e| warn!("Failed to read user info response: {:?}", e))?;

        if status != reqwest::StatusCode::OK {
            warn!("User info endpoint answered with status {}", status);
            return Err(provider_response_error(
                ProviderResponseErrorKind::UnexpectedStatus(status.as_u16()),
                &format!("failed to obtain user info, status {}", status),
            ));
        }

        let profile: Map<String, Value> = serde_json::from_str(&body).map_err(|e| {
            warn!("Failed to parse user info response: {:?}", e);
            Error {
                source: Some(Box::new(e)),
                error_kind: ErrorKind::ProviderResponse(ProviderResponseErrorKind::MalformedBody),
            }
        })?;

        self.fields.map(&profile)
    }
}
