//! Package identity - the content-addressed key of a buildable variant.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of an identity in hex characters (SHA-256).
pub const IDENTITY_LEN: usize = 64;

/// Resolved identities of a recipe's dependencies, keyed by package name.
pub type DependencyIdentities = BTreeMap<String, Identity>;

/// Error parsing an identity string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid package identity `{0}`: expected {IDENTITY_LEN} lowercase hex characters")]
pub struct InvalidIdentity(pub String);

/// A deterministic digest identifying one package variant.
///
/// Identities are never generated randomly or incrementally; they are
/// derived from the identity inputs by `builder::fingerprint`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    /// Parse and validate an identity string.
    pub fn parse(s: &str) -> Result<Self, InvalidIdentity> {
        let valid = s.len() == IDENTITY_LEN
            && s
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !valid {
            return Err(InvalidIdentity(s.to_string()));
        }
        Ok(Identity(s.to_string()))
    }

    /// Wrap a freshly computed digest.
    pub(crate) fn from_digest(digest: String) -> Self {
        debug_assert!(Identity::parse(&digest).is_ok());
        Identity(digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl FromStr for Identity {
    type Err = InvalidIdentity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Identity::parse(s)
    }
}

impl TryFrom<String> for Identity {
    type Error = InvalidIdentity;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Identity::parse(&value)
    }
}

impl From<Identity> for String {
    fn from(identity: Identity) -> Self {
        identity.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a `name=identity` assignment as given on the command line.
pub fn parse_dependency_identity(s: &str) -> Result<(String, Identity), String> {
    let (name, id) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid dependency identity `{}`; expected `name=identity`", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid dependency identity `{}`; name is empty", s));
    }
    let id = Identity::parse(id.trim()).map_err(|e| e.to_string())?;
    Ok((name.to_string(), id))
}
