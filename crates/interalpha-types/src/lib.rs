//! # interalpha-types: Core types for InterAlpha authorization
//!
//! Shared identifiers used across the authorization crates:
//! - Client identity ([`ClientId`])
//! - Access-key record identity ([`KeyId`])
//! - Audit actors ([`ActorId`], [`ActorType`])

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Entity IDs
// ============================================================================

/// Identifier of a client (customer) of the repair shop.
///
/// Client ids are owned by the client directory; this crate treats them as
/// opaque strings and never parses them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClientId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ClientId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Identifier of a stored access-key record.
///
/// This is the only key-related identifier that may appear in logs and
/// audit events. It carries no information about the token itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyId(Uuid);

impl KeyId {
    /// Generates a fresh random record id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for KeyId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ============================================================================
// Audit actors
// ============================================================================

/// Who performed an action: an employee id, a client id, or `"system"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    /// Actor used for automated work (cleanup sweeps, lazy expiry).
    pub const SYSTEM: &'static str = "system";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn system() -> Self {
        Self(Self::SYSTEM.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<&ClientId> for ActorId {
    fn from(value: &ClientId) -> Self {
        Self::new(value.as_str())
    }
}

/// Category of an audit actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    /// An authenticated employee acting through the back office.
    Employee,
    /// A client acting through the portal with an access key.
    Client,
    /// Background work with no human behind it.
    System,
}

impl ActorType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Client => "client",
            Self::System => "system",
        }
    }
}

impl Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn client_id_round_trips_through_serde_as_plain_string() {
        let id = ClientId::new("cli-42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"cli-42\"");

        let back: ClientId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test_case("" => true; "empty")]
    #[test_case("   " => true; "whitespace")]
    #[test_case("cli-1" => false; "regular id")]
    fn client_id_blank_detection(raw: &str) -> bool {
        ClientId::new(raw).is_blank()
    }

    #[test]
    fn key_ids_are_unique_and_parse_back() {
        let a = KeyId::generate();
        let b = KeyId::generate();
        assert_ne!(a, b);

        let parsed: KeyId = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
    }

    #[test]
    fn key_id_rejects_garbage() {
        assert!("not-a-uuid".parse::<KeyId>().is_err());
    }

    #[test]
    fn system_actor() {
        assert_eq!(ActorId::system().as_str(), "system");
        assert_eq!(ActorType::System.to_string(), "system");
        assert_eq!(
            serde_json::to_string(&ActorType::Employee).unwrap(),
            "\"employee\""
        );
    }
}
