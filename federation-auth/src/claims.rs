//! Mapping from a validated profile to local identity claims.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::oauth::UserInformation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Identifier,
    Name,
    Email,
    AuthMethod,
}

/// A typed fact about the authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Claim {
    pub claim_type: ClaimType,
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: ClaimType, value: impl Into<String>) -> Self {
        Self {
            claim_type,
            value: value.into(),
        }
    }
}

/// Ordered so that two issues of the same profile compare equal.
pub type ClaimSet = BTreeSet<Claim>;

/// Issue claims for a profile that already passed validation.
///
/// `Identifier` and `AuthMethod` are always present; `Name` and `Email` only
/// when the provider supplied a non-empty value.
pub fn issue(provider_name: &str, user_information: &UserInformation) -> ClaimSet {
    let mut claims = ClaimSet::new();
    claims.insert(Claim::new(
        ClaimType::Identifier,
        user_information.external_id.as_str(),
    ));
    claims.insert(Claim::new(ClaimType::AuthMethod, provider_name));

    if let Some(name) = user_information.user_name.as_deref().filter(|n| !n.is_empty()) {
        claims.insert(Claim::new(ClaimType::Name, name));
    }
    if let Some(email) = user_information.email.as_deref().filter(|e| !e.is_empty()) {
        claims.insert(Claim::new(ClaimType::Email, email));
    }

    claims
}

/// Value of the first claim of `claim_type`, if any.
pub fn find(claims: &ClaimSet, claim_type: ClaimType) -> Option<&str> {
    claims
        .iter()
        .find(|claim| claim.claim_type == claim_type)
        .map(|claim| claim.value.as_str())
}
