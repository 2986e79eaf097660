//! Per-attempt anti-forgery state for OAuth flows.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use url::Url;

/// Default lifetime of an authorization state before the callback must arrive.
pub const DEFAULT_STATE_TTL_SECONDS: i64 = 600;

/// State created for one redirect attempt.
///
/// The caller persists it (keyed by session or request) until the provider's
/// callback arrives, then hands it back to the callback processor exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationState {
    /// Random nonce round-tripped through the provider as `state`.
    pub nonce: String,
    /// Callback URI the provider was told to redirect to.
    pub callback_uri: Url,
    /// When this state was issued.
    pub created_at: DateTime<Utc>,
}

impl AuthorizationState {
    /// Issue a fresh state with a cryptographically random nonce.
    pub fn issue(callback_uri: Url) -> Self {
        Self {
            nonce: generate_nonce(),
            callback_uri,
            created_at: Utc::now(),
        }
    }

    /// Whether the nonce returned by the provider is the one we issued.
    pub fn matches(&self, returned_nonce: &str) -> bool {
        !self.nonce.is_empty() && self.nonce == returned_nonce
    }

    /// Whether this state is older than `ttl`.
    ///
    /// A deadline beyond the representable range never expires; one before it
    /// always has.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        match self.created_at.checked_add_signed(ttl) {
            Some(deadline) => Utc::now() > deadline,
            None => ttl < Duration::zero(),
        }
    }
}

/// Generate a cryptographically random state token.
fn generate_nonce() -> String {
    let random_bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(random_bytes)
}
