use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("Not a usable email address: {0:?}")]
    Invalid(String),
}

/// A validated subscriber email. Every identity-scoped request carries one,
/// so construction is the single place format checks happen.
///
/// Validation is deliberately shallow: an `@` with a non-empty local part
/// and domain. The backend is the authority on whether the address exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        let trimmed = raw.trim();
        match trimmed.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
                Ok(Identity(trimmed.to_string()))
            }
            _ => Err(IdentityError::Invalid(raw.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        let id = Identity::parse("reader@example.com").unwrap();
        assert_eq!(id.as_str(), "reader@example.com");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let id = Identity::parse("  reader@example.com \n").unwrap();
        assert_eq!(id.as_str(), "reader@example.com");
    }

    #[test]
    fn rejects_missing_at_sign() {
        assert!(Identity::parse("reader.example.com").is_err());
    }

    #[test]
    fn rejects_empty_local_or_domain() {
        assert!(Identity::parse("@example.com").is_err());
        assert!(Identity::parse("reader@").is_err());
        assert!(Identity::parse("@").is_err());
        assert!(Identity::parse("").is_err());
    }
}
