//! Local sign-in policy applied to fetched profiles.

use crate::oauth::UserInformation;

/// Accepts or rejects a fetched profile before any claims are issued.
pub trait UserInformationValidator: Send + Sync {
    fn validate(&self, user_information: &UserInformation) -> bool;
}

/// Restricts sign-in to configured email suffixes.
#[derive(Debug, Clone, Default)]
pub struct EmailDomainValidator {
    allowed_suffixes: Vec<String>,
}

impl EmailDomainValidator {
    /// Blank suffixes are ignored; no suffixes at all means no restriction.
    pub fn new<I, S>(allowed_suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allowed_suffixes: allowed_suffixes
                .into_iter()
                .map(Into::into)
                .map(|suffix: String| suffix.trim().to_string())
                .filter(|suffix| !suffix.is_empty())
                .collect(),
        }
    }

    pub fn allowed_suffixes(&self) -> &[String] {
        &self.allowed_suffixes
    }
}

impl UserInformationValidator for EmailDomainValidator {
    fn validate(&self, user_information: &UserInformation) -> bool {
        validate(user_information, &self.allowed_suffixes)
    }
}

/// True iff `allowed_suffixes` is empty or the email ends with one of them.
///
/// A suffix with a leading dot (`.ok.com`) also matches the bare domain
/// (`a@ok.com`). Comparison is case-insensitive using Unicode default case
/// folding, which does not depend on the process locale. A missing email never
/// matches a configured restriction.
pub fn validate(user_information: &UserInformation, allowed_suffixes: &[String]) -> bool {
    if allowed_suffixes.is_empty() {
        return true;
    }

    let Some(email) = user_information.email.as_deref() else {
        return false;
    };
    let email = email.to_lowercase();

    allowed_suffixes.iter().any(|suffix| {
        let suffix = suffix.to_lowercase();
        email.ends_with(&suffix)
            || suffix
                .strip_prefix('.')
                .is_some_and(|domain| email.ends_with(&format!("@{}", domain)))
    })
}
