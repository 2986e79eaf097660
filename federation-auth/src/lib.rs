//! # federation-auth
//!
//! OAuth 2.0 authorization-code federation client:
//! - Provider settings and the authorize redirect with an anti-forgery state
//! - Server-to-server code exchange and user profile retrieval
//! - Email-domain sign-in policy
//! - Callback processing that turns a provider redirect into a sign-in,
//!   sign-out or alert for the host application
//! - Claims issued for the host's identity layer
//!
//! ## Usage
//!
//! ```rust,ignore
//! use federation_auth::{
//!     callback::{CallbackContext, CallbackParams, CallbackProcessor, RedirectTargets},
//!     oauth::providers::google,
//!     policy::EmailDomainValidator,
//! };
//!
//! let provider = Arc::new(google::Provider::new(settings, HttpClientConfig::default())?);
//! let request = provider.build_authorize_url("https://chat.example.com/callback")?;
//! // persist request.state, redirect the browser to request.url ...
//! let processor = CallbackProcessor::new(provider, Arc::new(validator), RedirectTargets::default());
//! let outcome = processor.process(&params, Some(stored_state), &context).await;
//! ```

pub mod callback;
pub mod claims;
pub mod error;
pub mod http;
pub mod oauth;
pub mod policy;
pub mod settings;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
pub use settings::ProviderSettings;
