//! # interalpha-rbac: Role-Based Access Control
//!
//! Authorization decisions for InterAlpha employees:
//! - **Role hierarchy** (8 roles, levels 1 to 10, strict total order)
//! - **Permission patterns** with segment-boundary wildcards
//! - **Load-time inheritance flattening** with cycle detection
//! - **Route authorization** for the employee API
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  RoleDefinition table (static, versioned)    │
//! └─────────────────┬───────────────────────────┘
//!                   │ RoleRegistry::load
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  RoleRegistry (immutable, Arc-shared)        │
//! │  └─ flattened pattern set per role           │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  PermissionEvaluator (pure, total)           │
//! │  └─ RouteGuard (401 / 403 decisions)         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Fail closed
//!
//! The evaluator never returns errors. An unknown role has level `0`, no
//! permissions and manages nothing; a blank permission is never granted.
//!
//! ## Example
//!
//! ```
//! use interalpha_rbac::PermissionEvaluator;
//!
//! let evaluator = PermissionEvaluator::standard().unwrap();
//!
//! assert_eq!(evaluator.role_level("supervisor_tecnico"), 5);
//! assert!(evaluator.has_permission("supervisor_tecnico", "ordens_servico.assign_technician"));
//! assert!(evaluator.can_manage_role("supervisor_tecnico", "atendente"));
//! assert!(!evaluator.can_manage_role("supervisor_tecnico", "gerente_adm"));
//! assert!(!evaluator.has_permission("admin", ""));
//! ```

pub mod error;
pub mod evaluator;
pub mod permissions;
pub mod registry;
pub mod roles;
pub mod routes;

pub use error::{AuthorizationError, RegistryError};
pub use evaluator::PermissionEvaluator;
pub use permissions::{
    Action, PermissionPattern, Resource, build_permission, build_resource_wildcard,
};
pub use registry::{ResolvedRole, RoleRegistry};
pub use roles::{Role, RoleDefinition};
pub use routes::{RoleRequirement, RouteDecision, RouteGuard};
