//! Identity declarations and the name-to-secret mapping built from them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EnrollError, Result};

/// Identity type understood by the CA (`--id.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityType {
    /// Application client
    Client,
    /// Endorsing peer
    Peer,
    /// Organization administrator
    Admin,
    /// Ordering node
    Orderer,
}

impl IdentityType {
    /// Value passed on the command line
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Peer => "peer",
            Self::Admin => "admin",
            Self::Orderer => "orderer",
        }
    }
}

impl fmt::Display for IdentityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentityType {
    type Err = EnrollError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "peer" => Ok(Self::Peer),
            "admin" => Ok(Self::Admin),
            "orderer" => Ok(Self::Orderer),
            other => Err(EnrollError::Config(format!(
                "unknown identity type {other:?}; expected client, peer, admin or orderer"
            ))),
        }
    }
}

/// An identity to register on a CA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentitySpec {
    /// Enrollment ID
    pub name: String,
    /// Enrollment secret
    pub secret: String,
    /// Identity type
    #[serde(rename = "type")]
    pub kind: IdentityType,
}

impl IdentitySpec {
    /// Create a new identity declaration
    pub fn new(name: impl Into<String>, secret: impl Into<String>, kind: IdentityType) -> Self {
        Self {
            name: name.into(),
            secret: secret.into(),
            kind,
        }
    }

    /// Conventional declaration `<name>:<name>pw:<type>`
    pub fn conventional(name: impl Into<String>, kind: IdentityType) -> Self {
        let name = name.into();
        let secret = format!("{name}pw");
        Self::new(name, secret, kind)
    }
}

/// Parses `name:secret:type`, e.g. `peer0:peer0pw:peer`.
impl FromStr for IdentitySpec {
    type Err = EnrollError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let [name, secret, kind] = parts.as_slice() else {
            return Err(EnrollError::Config(format!(
                "invalid identity {s:?}; expected name:secret:type"
            )));
        };
        if name.is_empty() || secret.is_empty() {
            return Err(EnrollError::Config(format!(
                "invalid identity {s:?}; name and secret must not be empty"
            )));
        }
        Ok(Self::new(*name, *secret, kind.parse()?))
    }
}

/// Identities are displayed without their secret.
impl fmt::Display for IdentitySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:****:{}", self.name, self.kind)
    }
}

/// Declared identities, in declaration order, addressable by name.
///
/// Declaring a name twice is accepted only when both declarations agree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IdentitySet {
    specs: Vec<IdentitySpec>,
}

impl IdentitySet {
    /// Build a set, rejecting conflicting duplicate declarations
    pub fn new(specs: impl IntoIterator<Item = IdentitySpec>) -> Result<Self> {
        let mut set = Self::default();
        for spec in specs {
            set.insert(spec)?;
        }
        Ok(set)
    }

    /// Add one declaration
    pub fn insert(&mut self, spec: IdentitySpec) -> Result<()> {
        match self.get(&spec.name) {
            Some(existing) if *existing == spec => Ok(()),
            Some(_) => Err(EnrollError::ConflictingIdentity { name: spec.name }),
            None => {
                self.specs.push(spec);
                Ok(())
            }
        }
    }

    /// Look up a declaration by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&IdentitySpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Look up a declaration that the pipeline cannot proceed without
    pub fn require(&self, name: &str, hint: &str) -> Result<&IdentitySpec> {
        self.get(name).ok_or_else(|| EnrollError::MissingIdentity {
            name: name.to_string(),
            hint: hint.to_string(),
        })
    }

    /// Secret declared for `name`
    #[must_use]
    pub fn secret(&self, name: &str) -> Option<&str> {
        self.get(name).map(|s| s.secret.as_str())
    }

    /// Iterate in declaration order
    pub fn iter(&self) -> std::slice::Iter<'_, IdentitySpec> {
        self.specs.iter()
    }

    /// Number of declared identities
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// True when nothing is declared
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

impl<'a> IntoIterator for &'a IdentitySet {
    type Item = &'a IdentitySpec;
    type IntoIter = std::slice::Iter<'a, IdentitySpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'de> Deserialize<'de> for IdentitySet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let specs = Vec::<IdentitySpec>::deserialize(deserializer)?;
        Self::new(specs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spec() {
        let spec: IdentitySpec = "peer0:peer0pw:peer".parse().unwrap();
        assert_eq!(spec.name, "peer0");
        assert_eq!(spec.secret, "peer0pw");
        assert_eq!(spec.kind, IdentityType::Peer);
        assert_eq!(spec.to_string(), "peer0:****:peer");
    }

    #[test]
    fn test_parse_spec_rejects_bad_input() {
        assert!("peer0:peer0pw".parse::<IdentitySpec>().is_err());
        assert!("peer0:a:b:peer".parse::<IdentitySpec>().is_err());
        assert!(":pw:client".parse::<IdentitySpec>().is_err());
        assert!("user1:user1pw:operator".parse::<IdentitySpec>().is_err());
    }

    #[test]
    fn test_conventional_secret() {
        let spec = IdentitySpec::conventional("org1admin", IdentityType::Admin);
        assert_eq!(spec.secret, "org1adminpw");
    }

    #[test]
    fn test_set_accepts_identical_duplicates() {
        let set = IdentitySet::new([
            IdentitySpec::conventional("peer0", IdentityType::Peer),
            IdentitySpec::conventional("peer0", IdentityType::Peer),
        ])
        .unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.secret("peer0"), Some("peer0pw"));
    }

    #[test]
    fn test_set_rejects_conflicting_secrets() {
        let err = IdentitySet::new([
            IdentitySpec::new("peer0", "one", IdentityType::Peer),
            IdentitySpec::new("peer0", "two", IdentityType::Peer),
        ])
        .unwrap_err();
        assert!(matches!(err, EnrollError::ConflictingIdentity { name } if name == "peer0"));
    }

    #[test]
    fn test_require_names_missing_identity() {
        let set = IdentitySet::new([IdentitySpec::conventional("user1", IdentityType::Client)]).unwrap();
        let err = set.require("peer0", "peer0:<secret>:peer").unwrap_err();
        assert!(err.to_string().contains("peer0"));
    }

    #[test]
    fn test_set_deserialize_validates() {
        let json = r#"[
            {"name":"peer0","secret":"a","type":"peer"},
            {"name":"peer0","secret":"b","type":"peer"}
        ]"#;
        assert!(serde_json::from_str::<IdentitySet>(json).is_err());
    }
}
