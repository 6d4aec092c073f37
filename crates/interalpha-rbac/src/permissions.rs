//! Permission patterns and matching.
//!
//! A permission is a dot-segmented string such as `ordens_servico.read` or
//! `admin.users.create`. A granted pattern may end in a literal `*` segment
//! (`pagamentos.*`), and the single pattern `*` grants everything.
//!
//! Wildcards match on segment boundaries only: `ordens_servico.*` matches
//! `ordens_servico.read` but not `ordens_servicoX.read`. Matching is
//! case-sensitive and performs no normalization.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Resource names used by the back office.
pub struct Resource;

impl Resource {
    pub const CLIENTES: &'static str = "clientes";
    pub const ORDENS_SERVICO: &'static str = "ordens_servico";
    pub const PAGAMENTOS: &'static str = "pagamentos";
    pub const RELATORIOS: &'static str = "relatorios";
    pub const ADMIN: &'static str = "admin";
    pub const PECAS: &'static str = "pecas";
}

/// Action names used by the back office.
pub struct Action;

impl Action {
    pub const CREATE: &'static str = "create";
    pub const READ: &'static str = "read";
    pub const UPDATE: &'static str = "update";
    pub const DELETE: &'static str = "delete";
    pub const MANAGE: &'static str = "manage";
    pub const APPROVE: &'static str = "approve";
    pub const ASSIGN_TECHNICIAN: &'static str = "assign_technician";
    pub const CHANGE_STATUS: &'static str = "change_status";
    pub const VIEW_BASIC: &'static str = "view_basic";
    pub const VIEW_FINANCIAL: &'static str = "view_financial";
    pub const VIEW_TECHNICAL: &'static str = "view_technical";
    pub const VIEW_ALL: &'static str = "view_all";
    pub const EXPORT: &'static str = "export";
}

/// Builds `resource.action`.
pub fn build_permission(resource: &str, action: &str) -> String {
    format!("{resource}.{action}")
}

/// Builds `resource.*`.
pub fn build_resource_wildcard(resource: &str) -> String {
    format!("{resource}.*")
}

/// A granted permission pattern, validated at registry load time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PermissionPattern {
    /// `*`: matches every non-blank permission.
    Any,
    /// `a.b.*`: matches any permission strictly below the `a.b` prefix.
    Prefix(String),
    /// `a.b`: matches only itself.
    Exact(String),
}

impl PermissionPattern {
    /// Parses and validates a pattern string.
    ///
    /// Rejects blank patterns, empty segments, and `*` anywhere other than a
    /// whole final segment.
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidPattern {
            pattern: raw.to_string(),
            reason: reason.to_string(),
        };

        if raw.trim().is_empty() {
            return Err(invalid("pattern is blank"));
        }
        if raw == "*" {
            return Ok(Self::Any);
        }

        let (body, wildcard) = match raw.strip_suffix(".*") {
            Some(prefix) => (prefix, true),
            None => (raw, false),
        };

        for segment in body.split('.') {
            if segment.is_empty() {
                return Err(invalid("empty segment"));
            }
            if segment.contains('*') {
                return Err(invalid("wildcard must be the whole final segment"));
            }
            if segment.chars().any(char::is_whitespace) {
                return Err(invalid("segments cannot contain whitespace"));
            }
        }

        if wildcard {
            Ok(Self::Prefix(body.to_string()))
        } else {
            Ok(Self::Exact(body.to_string()))
        }
    }

    /// Returns whether this pattern grants `required`.
    ///
    /// Callers are expected to have rejected blank permissions already;
    /// see [`is_blank_permission`].
    pub fn matches(&self, required: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(exact) => exact == required,
            Self::Prefix(prefix) => required
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('.'))
                .is_some_and(|rest| !rest.is_empty()),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        !matches!(self, Self::Exact(_))
    }
}

impl Display for PermissionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::Prefix(prefix) => write!(f, "{prefix}.*"),
            Self::Exact(exact) => f.write_str(exact),
        }
    }
}

impl TryFrom<String> for PermissionPattern {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PermissionPattern> for String {
    fn from(pattern: PermissionPattern) -> Self {
        pattern.to_string()
    }
}

/// A required permission that can never be granted: empty or whitespace.
pub fn is_blank_permission(required: &str) -> bool {
    required.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn pattern(raw: &str) -> PermissionPattern {
        PermissionPattern::parse(raw).unwrap()
    }

    #[test]
    fn test_parse_kinds() {
        assert_eq!(pattern("*"), PermissionPattern::Any);
        assert_eq!(
            pattern("pagamentos.*"),
            PermissionPattern::Prefix("pagamentos".to_string())
        );
        assert_eq!(
            pattern("admin.users.create"),
            PermissionPattern::Exact("admin.users.create".to_string())
        );
    }

    #[test_case(""; "empty")]
    #[test_case("  "; "blank")]
    #[test_case("a..b"; "empty middle segment")]
    #[test_case(".a"; "leading dot")]
    #[test_case("a."; "trailing dot")]
    #[test_case("a*"; "glued wildcard")]
    #[test_case("*.read"; "leading wildcard")]
    #[test_case("a.*.b"; "inner wildcard")]
    #[test_case("a b.read"; "whitespace")]
    fn test_parse_rejects(raw: &str) {
        assert!(matches!(
            PermissionPattern::parse(raw),
            Err(RegistryError::InvalidPattern { .. })
        ));
    }

    #[test_case("ordens_servico.*", "ordens_servico.read" => true; "direct child")]
    #[test_case("ordens_servico.*", "ordens_servico.a.b" => true; "deep child")]
    #[test_case("ordens_servico.*", "ordens_servicoX.read" => false; "segment boundary")]
    #[test_case("ordens_servico.*", "ordens_servico" => false; "bare resource")]
    #[test_case("ordens_servico.*", "ordens_servico." => false; "empty child")]
    #[test_case("ordens_servico.*", "ordens_servico.*" => true; "wildcard request")]
    #[test_case("ordens_servico.*", "ORDENS_SERVICO.READ" => false; "case sensitive")]
    #[test_case("admin.users.*", "admin.roles.manage" => false; "sibling")]
    #[test_case("clientes.read", "clientes.read" => true; "exact")]
    #[test_case("clientes.read", "clientes.reader" => false; "exact is not prefix")]
    #[test_case("*", "anything.at.all" => true; "any")]
    fn test_matches(granted: &str, required: &str) -> bool {
        pattern(granted).matches(required)
    }

    #[test]
    fn test_builders() {
        assert_eq!(
            build_permission(Resource::ORDENS_SERVICO, Action::ASSIGN_TECHNICIAN),
            "ordens_servico.assign_technician"
        );
        assert_eq!(build_resource_wildcard(Resource::PECAS), "pecas.*");
    }

    #[test]
    fn test_display_round_trips() {
        for raw in ["*", "pecas.*", "admin.users.read"] {
            assert_eq!(pattern(raw).to_string(), raw);
        }
    }

    #[test]
    fn test_serde_validates() {
        let ok: PermissionPattern = serde_json::from_str("\"pecas.*\"").unwrap();
        assert!(ok.is_wildcard());
        assert!(serde_json::from_str::<PermissionPattern>("\"pecas*\"").is_err());
    }

    proptest! {
        /// A resource wildcard never leaks into a resource that merely shares
        /// its name as a string prefix.
        #[test]
        fn prop_wildcard_respects_segment_boundary(
            resource in "[a-z_]{1,12}",
            suffix in "[a-zA-Z0-9_]{1,6}",
            action in "[a-z_]{1,10}",
        ) {
            let granted = pattern(&build_resource_wildcard(&resource));
            let inside = build_permission(&resource, &action);
            let outside = build_permission(&format!("{resource}{suffix}"), &action);

            prop_assert!(granted.matches(&inside));
            prop_assert!(!granted.matches(&outside));
        }
    }
}
