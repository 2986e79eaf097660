//! OAuth 2.0 authorization-code flow.
//!
//! Builds the provider redirect, exchanges the returned code for an access token
//! and retrieves the user's profile.

mod provider;
mod state;
mod token;

pub mod providers;
pub mod request;
pub mod user_info;

pub use provider::{AuthenticatedClient, Provider, ProviderKind};
pub use request::AuthorizationRequest;
pub use state::{AuthorizationState, DEFAULT_STATE_TTL_SECONDS};
pub use token::{AccessToken, AccessTokenExchanger};
pub use user_info::{Gender, UserInfoFetcher, UserInformation};
