//! Package references - `name/version[@user/channel]`.
//!
//! This is the textual form recipes use to name the packages they require,
//! e.g. `range-v3/0.10.0@ericniebler/stable`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error parsing a package reference.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("invalid package reference `{0}`: expected `name/version[@user/channel]`")]
    Malformed(String),

    #[error("invalid package reference `{reference}`: {field} is empty")]
    EmptyField {
        reference: String,
        field: &'static str,
    },
}

/// A parsed package reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackageReference {
    name: String,
    version: String,
    user: Option<String>,
    channel: Option<String>,
}

impl PackageReference {
    /// Create a reference without user/channel.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        PackageReference {
            name: name.into(),
            version: version.into(),
            user: None,
            channel: None,
        }
    }

    /// Attach a `user/channel` namespace.
    pub fn with_channel(mut self, user: impl Into<String>, channel: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.channel = Some(channel.into());
        self
    }

    /// Parse `name/version[@user/channel]`.
    pub fn parse(s: &str) -> Result<Self, ReferenceError> {
        let s = s.trim();
        let (pkg, namespace) = match s.split_once('@') {
            Some((pkg, ns)) => (pkg, Some(ns)),
            None => (s, None),
        };

        let (name, version) = pkg
            .split_once('/')
            .ok_or_else(|| ReferenceError::Malformed(s.to_string()))?;
        if version.contains('/') {
            return Err(ReferenceError::Malformed(s.to_string()));
        }

        let mut reference = PackageReference::new(
            non_empty(s, "name", name)?,
            non_empty(s, "version", version)?,
        );

        if let Some(ns) = namespace {
            let (user, channel) = ns
                .split_once('/')
                .ok_or_else(|| ReferenceError::Malformed(s.to_string()))?;
            reference = reference.with_channel(
                non_empty(s, "user", user)?,
                non_empty(s, "channel", channel)?,
            );
        }

        Ok(reference)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn channel(&self) -> Option<&str> {
        self.channel.as_deref()
    }
}

fn non_empty<'a>(
    reference: &str,
    field: &'static str,
    value: &'a str,
) -> Result<&'a str, ReferenceError> {
    if value.trim().is_empty() {
        return Err(ReferenceError::EmptyField {
            reference: reference.to_string(),
            field,
        });
    }
    Ok(value)
}

impl FromStr for PackageReference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PackageReference::parse(s)
    }
}

impl TryFrom<String> for PackageReference {
    type Error = ReferenceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PackageReference::parse(&value)
    }
}

impl From<PackageReference> for String {
    fn from(reference: PackageReference) -> Self {
        reference.to_string()
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)?;
        if let (Some(user), Some(channel)) = (&self.user, &self.channel) {
            write!(f, "@{}/{}", user, channel)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_reference() {
        let r = PackageReference::parse("range-v3/0.10.0@ericniebler/stable").unwrap();
        assert_eq!(r.name(), "range-v3");
        assert_eq!(r.version(), "0.10.0");
        assert_eq!(r.user(), Some("ericniebler"));
        assert_eq!(r.channel(), Some("stable"));
        assert_eq!(r.to_string(), "range-v3/0.10.0@ericniebler/stable");
    }

    #[test]
    fn test_parse_without_namespace() {
        let r: PackageReference = "functionalplus/v0.2.6-p0".parse().unwrap();
        assert_eq!(r.name(), "functionalplus");
        assert_eq!(r.version(), "v0.2.6-p0");
        assert_eq!(r.user(), None);
        assert_eq!(r.to_string(), "functionalplus/v0.2.6-p0");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            PackageReference::parse("justaname"),
            Err(ReferenceError::Malformed(_))
        ));
        assert!(matches!(
            PackageReference::parse("a/b/c"),
            Err(ReferenceError::Malformed(_))
        ));
        assert!(matches!(
            PackageReference::parse("a/1.0@user"),
            Err(ReferenceError::Malformed(_))
        ));
        assert!(matches!(
            PackageReference::parse("/1.0"),
            Err(ReferenceError::EmptyField { field: "name", .. })
        ));
        assert!(matches!(
            PackageReference::parse("a/1.0@/stable"),
            Err(ReferenceError::EmptyField { field: "user", .. })
        ));
    }

    #[test]
    fn test_serde_as_string() {
        let r = PackageReference::new("taygete", "0.1").with_channel("pleiades", "testing");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#""taygete/0.1@pleiades/testing""#);

        let back: PackageReference = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
