//! Handling of the provider's redirect callback.
//!
//! The processor drives one login attempt through
//! `AwaitingCallback -> CodeReceived -> TokenExchanged -> ProfileFetched` and
//! ends in `Authenticated`, `Rejected` or `Failed`. Every per-request error is
//! converted into an [`Outcome`] here; nothing propagates to the host as a fault.

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use log::*;
use url::Url;

use crate::claims::{self, ClaimSet};
use crate::error::{policy_error, protocol_error, security_error, Error, ErrorKind};
use crate::oauth::{AuthenticatedClient, AuthorizationState, Provider, DEFAULT_STATE_TTL_SECONDS};
use crate::policy::UserInformationValidator;

const MAX_PROVIDER_MESSAGE_CHARS: usize = 200;

pub const DEFAULT_REDIRECT_TARGET: &str = "/";
pub const DEFAULT_IDENTITY_PROVIDERS_TARGET: &str = "/account/#identityProviders";

/// Query parameters of the provider's callback request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Parse a raw query string (without the leading `?`).
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "code" => params.code = value,
                "state" => params.state = value,
                "error" => params.error = value,
                "error_description" => params.error_description = value,
                _ => {}
            }
        }
        params
    }

    pub fn from_url(url: &Url) -> Self {
        Self::from_query(url.query().unwrap_or_default())
    }
}

/// What the host knows about the browser session the callback arrived on.
#[derive(Debug, Clone, Default)]
pub struct CallbackContext {
    /// The user is already signed in locally (linking another provider).
    pub already_authenticated: bool,
    /// Application-relative URL to return to after a successful sign-in.
    pub return_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Initiated,
    AwaitingCallback,
    CodeReceived,
    TokenExchanged,
    ProfileFetched,
    Authenticated,
    Rejected,
    Failed,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Authenticated,
    Rejected,
    Failed,
}

/// What the host must do with the local session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionDirective {
    SignIn(ClaimSet),
    /// Clear any existing session so no half-authenticated state lingers.
    SignOut,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

/// Host session sink.
pub trait IdentitySink {
    fn sign_in(&mut self, claims: ClaimSet);
    fn sign_out(&mut self);
}

/// Host sink for user-visible messages.
pub trait AlertSink {
    fn add_alert(&mut self, level: AlertLevel, message: &str);
}

/// Result of processing one callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub status: OutcomeStatus,
    pub redirect_target: String,
    pub session: SessionDirective,
    pub alert: Option<Alert>,
    /// Kind of the error that ended the flow, if it did not succeed.
    pub error_kind: Option<ErrorKind>,
}

impl Outcome {
    /// Claims to sign in with; `None` unless authenticated.
    pub fn claims(&self) -> Option<&ClaimSet> {
        match &self.session {
            SessionDirective::SignIn(claims) => Some(claims),
            _ => None,
        }
    }

    /// Hand the outcome to the host collaborators and return the redirect target.
    pub fn apply(self, identity: &mut dyn IdentitySink, alerts: &mut dyn AlertSink) -> String {
        if let Some(alert) = &self.alert {
            alerts.add_alert(alert.level, &alert.message);
        }
        match self.session {
            SessionDirective::SignIn(claims) => identity.sign_in(claims),
            SessionDirective::SignOut => identity.sign_out(),
            SessionDirective::Unchanged => {}
        }
        self.redirect_target
    }
}

/// Where to send the browser once the callback is handled.
#[derive(Debug, Clone)]
pub struct RedirectTargets {
    /// Application root; used for first-time sign-in and for every failure.
    pub default_target: String,
    /// Account page listing linked identity providers.
    pub identity_providers: String,
}

impl Default for RedirectTargets {
    fn default() -> Self {
        Self {
            default_target: DEFAULT_REDIRECT_TARGET.to_string(),
            identity_providers: DEFAULT_IDENTITY_PROVIDERS_TARGET.to_string(),
        }
    }
}

/// Tracks the current step of one login attempt.
struct Flow {
    state: FlowState,
}

impl Flow {
    fn new() -> Self {
        Self {
            state: FlowState::Initiated,
        }
    }

    fn advance(&mut self, next: FlowState) {
        debug!("Login flow {} -> {}", self.state, next);
        self.state = next;
    }
}

/// Orchestrates token exchange, profile retrieval, policy and claims for a callback.
///
/// Holds only read-only collaborators, so one processor can serve any number of
/// concurrent login attempts.
#[derive(Clone)]
pub struct CallbackProcessor {
    provider: Arc<dyn Provider>,
    validator: Arc<dyn UserInformationValidator>,
    targets: RedirectTargets,
    state_ttl: Duration,
}

impl CallbackProcessor {
    pub fn new(
        provider: Arc<dyn Provider>,
        validator: Arc<dyn UserInformationValidator>,
        targets: RedirectTargets,
    ) -> Self {
        Self {
            provider,
            validator,
            targets,
            state_ttl: Duration::seconds(DEFAULT_STATE_TTL_SECONDS),
        }
    }

    /// Set how long an issued authorization state stays valid.
    pub fn with_state_ttl(mut self, ttl: Duration) -> Self {
        self.state_ttl = ttl;
        self
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Process one callback.
    ///
    /// # Arguments
    ///
    /// * `params` - Query parameters the provider redirected with
    /// * `stored_state` - State persisted when the redirect was built; consumed here
    /// * `context` - Host session facts used to pick the redirect target
    pub async fn process(
        &self,
        params: &CallbackParams,
        stored_state: Option<AuthorizationState>,
        context: &CallbackContext,
    ) -> Outcome {
        let mut flow = Flow::new();
        flow.advance(FlowState::AwaitingCallback);

        if let Some(error) = params.error.as_deref().filter(|e| !e.trim().is_empty()) {
            let raw = params
                .error_description
                .as_deref()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or(error);
            warn!(
                "{} callback carried an error: {}",
                self.provider.name(),
                sanitize(raw)
            );
            flow.advance(FlowState::Failed);
            return Outcome {
                status: OutcomeStatus::Failed,
                redirect_target: self.targets.default_target.clone(),
                session: SessionDirective::Unchanged,
                alert: Some(Alert {
                    level: AlertLevel::Error,
                    message: provider_alert(raw),
                }),
                error_kind: Some(ErrorKind::ProviderDenied),
            };
        }

        match self.authenticate(&mut flow, params, stored_state).await {
            Ok(client) => {
                flow.advance(FlowState::Authenticated);
                let claims = claims::issue(&client.provider_name, &client.user_information);
                info!(
                    "User {} signed in via {}",
                    client.user_information.external_id, client.provider_name
                );
                Outcome {
                    status: OutcomeStatus::Authenticated,
                    redirect_target: self.success_target(context),
                    session: SessionDirective::SignIn(claims),
                    alert: None,
                    error_kind: None,
                }
            }
            Err(err) => self.failure(&mut flow, err),
        }
    }

    async fn authenticate(
        &self,
        flow: &mut Flow,
        params: &CallbackParams,
        stored_state: Option<AuthorizationState>,
    ) -> Result<AuthenticatedClient, Error> {
        // The callback must be bound to our request before anything in it is trusted.
        let stored_state =
            stored_state.ok_or_else(|| security_error("no authorization state stored"))?;
        let returned = params.state.as_deref().unwrap_or_default();
        if !stored_state.matches(returned) {
            return Err(security_error("state parameter does not match"));
        }
        if stored_state.is_expired(self.state_ttl) {
            return Err(security_error("authorization state expired"));
        }

        let code = params
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| protocol_error("no code parameter provided in the callback"))?;
        flow.advance(FlowState::CodeReceived);

        let access_token = self
            .provider
            .exchange_token(code, stored_state.callback_uri.as_str())
            .await?;
        flow.advance(FlowState::TokenExchanged);

        let user_information = self.provider.fetch_user_info(&access_token).await?;
        flow.advance(FlowState::ProfileFetched);

        if !self.validator.validate(&user_information) {
            return Err(policy_error("email is not in an allowed domain"));
        }

        Ok(AuthenticatedClient {
            provider_name: self.provider.name().to_lowercase(),
            access_token,
            user_information,
        })
    }

    fn failure(&self, flow: &mut Flow, err: Error) -> Outcome {
        let (status, session) = match err.error_kind {
            ErrorKind::Security | ErrorKind::PolicyRejected => {
                (OutcomeStatus::Rejected, SessionDirective::SignOut)
            }
            _ => (OutcomeStatus::Failed, SessionDirective::Unchanged),
        };
        flow.advance(match status {
            OutcomeStatus::Rejected => FlowState::Rejected,
            _ => FlowState::Failed,
        });
        warn!("{} sign-in did not complete: {}", self.provider.name(), err);

        Outcome {
            status,
            redirect_target: self.targets.default_target.clone(),
            session,
            alert: Some(Alert {
                level: match err.error_kind {
                    ErrorKind::PolicyRejected => AlertLevel::Warning,
                    _ => AlertLevel::Error,
                },
                message: err.user_message().to_string(),
            }),
            error_kind: Some(err.error_kind),
        }
    }

    fn success_target(&self, context: &CallbackContext) -> String {
        if let Some(return_url) = context.return_url.as_deref().filter(|u| is_local_path(u)) {
            return return_url.to_string();
        }
        if context.already_authenticated {
            self.targets.identity_providers.clone()
        } else {
            self.targets.default_target.clone()
        }
    }
}

/// Only application-relative paths are followed; anything else could redirect
/// off-site.
fn is_local_path(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.contains('\\')
}

/// Strip control characters and cap the length of provider-supplied text.
fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_control())
        .take(MAX_PROVIDER_MESSAGE_CHARS)
        .collect::<String>()
        .trim()
        .to_string()
}

fn provider_alert(raw: &str) -> String {
    format!(
        "Sign-in was not completed by the identity provider: {}",
        sanitize(raw)
    )
}
