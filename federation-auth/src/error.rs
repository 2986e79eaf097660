//! Error types for the `federation-auth` crate.
//!
//! Follows the same pattern as the other workspace crates: a root `Error` struct
//! holding an error kind and an optional source for error chaining.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for federation-auth crate.
/// Holds error kind and optional source for error chaining.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Major categories of errors that can occur during a federated sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required provider settings are missing or invalid. Fatal at startup.
    Configuration,
    /// Malformed caller input. Fails the current call only.
    Input,
    /// The provider violated the expected callback contract.
    Protocol,
    /// Transport-level failure reaching the provider.
    Network,
    /// The provider was reachable but answered with something unusable.
    ProviderResponse(ProviderResponseErrorKind),
    /// The callback carried an explicit `error` parameter (consent denied or
    /// provider-side failure).
    ProviderDenied,
    /// The returned state nonce did not match the stored one.
    Security,
    /// The profile was fetched but failed the email-domain policy.
    PolicyRejected,
}

/// Ways in which a provider response can be unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderResponseErrorKind {
    UnexpectedStatus(u16),
    MalformedBody,
    MissingField(&'static str),
}

impl Error {
    /// Text that is safe to show to an end user in an alert.
    pub fn user_message(&self) -> &'static str {
        match self.error_kind {
            ErrorKind::Configuration => "Sign-in is not configured correctly.",
            ErrorKind::Input | ErrorKind::Protocol => {
                "The identity provider returned an unexpected response."
            }
            ErrorKind::Network => "The identity provider could not be reached. Please try again.",
            ErrorKind::ProviderResponse(_) => {
                "The identity provider returned an invalid response. Please try again."
            }
            ErrorKind::ProviderDenied => "The identity provider did not complete the sign-in.",
            ErrorKind::Security => "The sign-in request could not be verified. Please try again.",
            ErrorKind::PolicyRejected => "This account is not allowed to sign in.",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Configuration => write!(f, "Configuration error")?,
            ErrorKind::Input => write!(f, "Input error")?,
            ErrorKind::Protocol => write!(f, "Protocol error")?,
            ErrorKind::Network => write!(f, "Network error")?,
            ErrorKind::ProviderResponse(kind) => write!(f, "Provider response error: {:?}", kind)?,
            ErrorKind::ProviderDenied => write!(f, "Provider denied")?,
            ErrorKind::Security => write!(f, "Security error")?,
            ErrorKind::PolicyRejected => write!(f, "Policy rejected")?,
        }
        match &self.source {
            Some(source) => write!(f, ": {}", source),
            None => Ok(()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // Builder failures happen before any request is sent, so they point at
        // bad settings rather than at the network.
        let error_kind = if err.is_builder() {
            ErrorKind::Configuration
        } else {
            ErrorKind::Network
        };

        Error {
            source: Some(Box::new(err)),
            error_kind,
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error {
            source: Some(Box::new(err)),
            error_kind: ErrorKind::Configuration,
        }
    }
}

fn error(error_kind: ErrorKind, message: &str) -> Error {
    Error {
        source: Some(message.to_string().into()),
        error_kind,
    }
}

/// Helper function to create configuration errors.
pub fn configuration_error(message: &str) -> Error {
    error(ErrorKind::Configuration, message)
}

/// Helper function to create input errors.
pub fn input_error(message: &str) -> Error {
    error(ErrorKind::Input, message)
}

/// Helper function to create protocol errors.
pub fn protocol_error(message: &str) -> Error {
    error(ErrorKind::Protocol, message)
}

/// Helper function to create provider response errors.
pub fn provider_response_error(kind: ProviderResponseErrorKind, message: &str) -> Error {
    error(ErrorKind::ProviderResponse(kind), message)
}

/// Helper function to create security errors.
pub fn security_error(message: &str) -> Error {
    error(ErrorKind::Security, message)
}

/// Helper function to create policy errors.
pub fn policy_error(message: &str) -> Error {
    error(ErrorKind::PolicyRejected, message)
}
