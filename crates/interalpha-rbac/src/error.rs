//! Error types for RBAC.
//!
//! Loading a role table can fail ([`RegistryError`]); evaluating permissions
//! never does. [`AuthorizationError`] is only produced by the
//! [`RouteGuard`](crate::routes::RouteGuard), which turns evaluator booleans
//! into decisions an HTTP layer can act on.

use thiserror::Error;

use crate::roles::Role;

/// Fatal configuration error raised while building a [`RoleRegistry`](crate::RoleRegistry).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The inheritance graph contains a cycle.
    #[error("role inheritance cycle: {}", format_cycle(.0))]
    InheritanceCycle(Vec<Role>),

    /// A role has no definition in the table.
    #[error("role '{0}' has no definition")]
    MissingDefinition(Role),

    /// A role is defined more than once.
    #[error("role '{0}' is defined more than once")]
    DuplicateDefinition(Role),

    /// Two roles share a level, breaking the strict level order.
    #[error("roles '{first}' and '{second}' share level {level}")]
    DuplicateLevel { level: u8, first: Role, second: Role },

    /// A level outside the allowed range.
    #[error("role '{role}' has level {level}, expected {min}..={max}")]
    LevelOutOfRange { role: Role, level: u8, min: u8, max: u8 },

    /// A granted pattern is malformed.
    #[error("invalid permission pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

fn format_cycle(path: &[Role]) -> String {
    path.iter()
        .map(|role| role.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Request-time authorization failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// The role string is not one of the known roles.
    #[error("invalid role: {0:?}")]
    InvalidRole(String),

    /// The role lacks a permission the route requires.
    #[error("missing permission: {permission}")]
    Forbidden { role: Role, permission: String },

    /// The role is not in the route's allow-list.
    #[error("role '{role}' is not allowed here")]
    RoleNotAllowed { role: Role },
}

impl AuthorizationError {
    /// HTTP status an API layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRole(_) => 401,
            Self::Forbidden { .. } | Self::RoleNotAllowed { .. } => 403,
        }
    }
}

/// Result type for registry construction.
pub type Result<T> = std::result::Result<T, RegistryError>;
