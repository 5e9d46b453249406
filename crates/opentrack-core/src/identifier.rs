//! Email identifiers and the policy deciding which ones get recorded.
//!
//! Identifiers are opaque join keys. By default any string is accepted and
//! tracked as-is; the strict policy limits recording to the `et_` + 17 hex
//! digit format issued by the mail sender.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Pattern accepted by [`IdentifierPolicy::Strict`].
static STRICT_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^et_[a-f0-9]{17}$").expect("strict identifier pattern is valid")
});

/// Opaque token identifying one tracked email.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmailId(String);

impl EmailId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for EmailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for EmailId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for EmailId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Which identifiers produce recorded open events.
///
/// The pixel itself is served for every identifier regardless of policy;
/// the policy only decides whether an event is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IdentifierPolicy {
    /// Record every identifier, including empty or malformed ones.
    #[default]
    AcceptAll,
    /// Record only `et_` followed by 17 hex digits (case-insensitive).
    Strict,
}

impl IdentifierPolicy {
    /// Check an identifier against this policy.
    pub fn check(&self, id: &EmailId) -> Result<()> {
        match self {
            Self::AcceptAll => Ok(()),
            Self::Strict if STRICT_ID_PATTERN.is_match(id.as_str()) => Ok(()),
            Self::Strict => Err(Error::InvalidIdentifier {
                id: id.to_string(),
                reason: "expected 'et_' followed by 17 hex digits",
            }),
        }
    }

    pub fn accepts(&self, id: &EmailId) -> bool {
        self.check(id).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_all_takes_anything() {
        let policy = IdentifierPolicy::AcceptAll;
        for id in ["", "abc", "../../etc/passwd", "et_0123456789abcdef0", "x y z"] {
            assert!(policy.accepts(&EmailId::from(id)), "rejected {id:?}");
        }
    }

    #[test]
    fn strict_accepts_issued_format() {
        let policy = IdentifierPolicy::Strict;
        assert!(policy.accepts(&EmailId::from("et_0123456789abcdef0")));
        assert!(policy.accepts(&EmailId::from("ET_0123456789ABCDEF0")));
    }

    #[test]
    fn strict_rejects_malformed() {
        let policy = IdentifierPolicy::Strict;
        for id in [
            "",
            "et_0123456789abcdef",   // 16 digits
            "et_0123456789abcdef01", // 18 digits
            "et_0123456789abcdefg",  // non-hex
            "xx_0123456789abcdef0",
        ] {
            let err = policy.check(&EmailId::from(id)).unwrap_err();
            assert!(matches!(err, Error::InvalidIdentifier { .. }), "{id:?}");
        }
    }

    #[test]
    fn email_id_serializes_as_plain_string() {
        let id = EmailId::from("et_1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"et_1\"");
        let back: EmailId = serde_json::from_str("\"et_1\"").unwrap();
        assert_eq!(back, id);
    }
}
