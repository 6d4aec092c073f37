//! Route-level authorization for the employee API.
//!
//! Maps API route templates and HTTP methods to the permissions they
//! require, and turns evaluator booleans into [`AuthorizationError`]s that
//! an HTTP layer answers with 401 or 403.

use tracing::{info, warn};

use crate::error::AuthorizationError;
use crate::evaluator::PermissionEvaluator;
use crate::roles::Role;

/// A permission required by a route template for a set of methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteRule {
    pub template: &'static str,
    pub permission: &'static str,
    pub methods: &'static [&'static str],
}

const fn rule(
    template: &'static str,
    permission: &'static str,
    methods: &'static [&'static str],
) -> RouteRule {
    RouteRule {
        template,
        permission,
        methods,
    }
}

const GET: &[&str] = &["GET"];
const POST: &[&str] = &["POST"];
const WRITE: &[&str] = &["PUT", "PATCH"];
const DELETE: &[&str] = &["DELETE"];
const POST_PUT: &[&str] = &["POST", "PUT"];

/// Permission table for the employee API.
pub const ROUTE_TABLE: &[RouteRule] = &[
    rule("/api/clientes", "clientes.read", GET),
    rule("/api/clientes", "clientes.create", POST),
    rule("/api/clientes/[id]", "clientes.read", GET),
    rule("/api/clientes/[id]", "clientes.update", WRITE),
    rule("/api/clientes/[id]", "clientes.delete", DELETE),
    rule("/api/ordens-servico", "ordens_servico.read", GET),
    rule("/api/ordens-servico", "ordens_servico.create", POST),
    rule("/api/ordens-servico/[id]", "ordens_servico.read", GET),
    rule("/api/ordens-servico/[id]", "ordens_servico.update", WRITE),
    rule("/api/ordens-servico/[id]", "ordens_servico.delete", DELETE),
    rule(
        "/api/ordens-servico/[id]/assign-technician",
        "ordens_servico.assign_technician",
        POST_PUT,
    ),
    rule(
        "/api/ordens-servico/[id]/status",
        "ordens_servico.change_status",
        WRITE,
    ),
    rule("/api/pagamentos", "pagamentos.read", GET),
    rule("/api/pagamentos", "pagamentos.create", POST),
    rule("/api/pagamentos/[id]", "pagamentos.read", GET),
    rule("/api/pagamentos/[id]", "pagamentos.update", WRITE),
    rule("/api/pagamentos/[id]", "pagamentos.delete", DELETE),
    rule("/api/pagamentos/[id]/approve", "pagamentos.approve", POST_PUT),
    rule("/api/pecas", "pecas.read", GET),
    rule("/api/pecas", "pecas.create", POST),
    rule("/api/pecas/[id]", "pecas.read", GET),
    rule("/api/pecas/[id]", "pecas.update", WRITE),
    rule("/api/pecas/[id]", "pecas.delete", DELETE),
    rule("/api/relatorios/basic", "relatorios.view_basic", GET),
    rule("/api/relatorios/financial", "relatorios.view_financial", GET),
    rule("/api/relatorios/technical", "relatorios.view_technical", GET),
    rule("/api/relatorios/export", "relatorios.export", &["GET", "POST"]),
    rule("/api/admin/users", "admin.users.read", GET),
    rule("/api/admin/users", "admin.users.create", POST),
    rule("/api/admin/users/[id]", "admin.users.read", GET),
    rule("/api/admin/users/[id]", "admin.users.update", WRITE),
    rule("/api/admin/users/[id]", "admin.users.delete", DELETE),
    rule(
        "/api/admin/roles",
        "admin.roles.manage",
        &["GET", "POST", "PUT", "DELETE"],
    ),
];

/// Strips the query string and replaces purely numeric segments by `[id]`.
pub fn normalize_path(path: &str) -> String {
    let path = path.split_once('?').map_or(path, |(p, _)| p);
    path.split('/')
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "[id]"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// A fixed set of roles allowed to reach a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRequirement {
    /// Only the listed roles.
    AnyOf(Vec<Role>),
    /// Any role whose level is at least this role's level.
    Minimum(Role),
}

impl RoleRequirement {
    pub fn any_of(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::AnyOf(roles.into_iter().collect())
    }

    pub fn admin() -> Self {
        Self::any_of([Role::Admin])
    }

    pub fn diretor() -> Self {
        Self::any_of([Role::Admin, Role::Diretor])
    }

    pub fn gerente_adm() -> Self {
        Self::any_of([Role::Admin, Role::Diretor, Role::GerenteAdm])
    }

    pub fn gerente_financeiro() -> Self {
        Self::any_of([Role::Admin, Role::Diretor, Role::GerenteFinanceiro])
    }

    pub fn supervisor_tecnico() -> Self {
        Self::any_of([
            Role::Admin,
            Role::Diretor,
            Role::GerenteAdm,
            Role::SupervisorTecnico,
        ])
    }

    pub fn technician() -> Self {
        Self::any_of([
            Role::Admin,
            Role::Diretor,
            Role::GerenteAdm,
            Role::SupervisorTecnico,
            Role::Technician,
        ])
    }

    /// Every employee role except the basic `user`.
    pub fn atendente() -> Self {
        Self::any_of([
            Role::Admin,
            Role::Diretor,
            Role::GerenteAdm,
            Role::GerenteFinanceiro,
            Role::SupervisorTecnico,
            Role::Technician,
            Role::Atendente,
        ])
    }
}

/// Why a route decision came out the way it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub normalized_path: String,
    pub method: String,
    pub required: Vec<&'static str>,
    /// Required permissions the role lacks.
    pub missing: Vec<&'static str>,
    pub role_level: u8,
}

impl RouteDecision {
    pub fn allowed(&self) -> bool {
        self.role_level > 0 && self.missing.is_empty()
    }
}

/// Route authorization engine.
///
/// Stateless apart from the shared evaluator; cheap to clone.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    evaluator: PermissionEvaluator,

    /// Whether to log decisions.
    audit_enabled: bool,
}

impl RouteGuard {
    pub fn new(evaluator: PermissionEvaluator) -> Self {
        Self {
            evaluator,
            audit_enabled: true,
        }
    }

    /// Disables decision logging (for testing).
    pub fn without_audit(mut self) -> Self {
        self.audit_enabled = false;
        self
    }

    pub fn evaluator(&self) -> &PermissionEvaluator {
        &self.evaluator
    }

    /// Permissions a request must hold. Empty for unlisted routes.
    #[allow(clippy::unused_self)]
    pub fn required_permissions(&self, path: &str, method: &str) -> Vec<&'static str> {
        let normalized = normalize_path(path);
        ROUTE_TABLE
            .iter()
            .filter(|r| r.template == normalized && r.methods.contains(&method))
            .map(|r| r.permission)
            .collect()
    }

    /// Authorizes a request by role string, path and method.
    ///
    /// Unlisted routes only require a valid role.
    pub fn authorize(
        &self,
        role: &str,
        path: &str,
        method: &str,
    ) -> Result<Role, AuthorizationError> {
        let parsed = self.parse_role(role)?;

        for permission in self.required_permissions(path, method) {
            if !self.evaluator.has_permission(role, permission) {
                if self.audit_enabled {
                    warn!(
                        role = %parsed,
                        path = %path,
                        method = %method,
                        permission = %permission,
                        "Route access denied"
                    );
                }
                return Err(AuthorizationError::Forbidden {
                    role: parsed,
                    permission: permission.to_string(),
                });
            }
        }

        if self.audit_enabled {
            info!(role = %parsed, path = %path, method = %method, "Route access granted");
        }
        Ok(parsed)
    }

    /// Authorizes a role string against a fixed requirement.
    pub fn authorize_roles(
        &self,
        role: &str,
        requirement: &RoleRequirement,
    ) -> Result<Role, AuthorizationError> {
        let parsed = self.parse_role(role)?;

        let allowed = match requirement {
            RoleRequirement::AnyOf(roles) => roles.contains(&parsed),
            RoleRequirement::Minimum(minimum) => {
                let registry = self.evaluator.registry();
                registry.level(parsed) >= registry.level(*minimum)
            }
        };

        if !allowed {
            if self.audit_enabled {
                warn!(role = %parsed, requirement = ?requirement, "Role not allowed");
            }
            return Err(AuthorizationError::RoleNotAllowed { role: parsed });
        }
        Ok(parsed)
    }

    /// Requires access to `resource` (its wildcard or its `read` action).
    pub fn authorize_resource(
        &self,
        role: &str,
        resource: &str,
    ) -> Result<Role, AuthorizationError> {
        let parsed = self.parse_role(role)?;
        if self.evaluator.can_access_resource(role, resource) {
            return Ok(parsed);
        }
        if self.audit_enabled {
            warn!(role = %parsed, resource = %resource, "Resource access denied");
        }
        Err(AuthorizationError::Forbidden {
            role: parsed,
            permission: format!("{resource}.read"),
        })
    }

    /// Computes the decision for a request without logging it.
    pub fn explain(&self, role: &str, path: &str, method: &str) -> RouteDecision {
        let required = self.required_permissions(path, method);
        let missing = required
            .iter()
            .copied()
            .filter(|p| !self.evaluator.has_permission(role, p))
            .collect();
        RouteDecision {
            normalized_path: normalize_path(path),
            method: method.to_string(),
            required,
            missing,
            role_level: self.evaluator.role_level(role),
        }
    }

    fn parse_role(&self, role: &str) -> Result<Role, AuthorizationError> {
        Role::parse(role).ok_or_else(|| {
            if self.audit_enabled {
                warn!(role = %role, "Invalid role presented");
            }
            AuthorizationError::InvalidRole(role.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn guard() -> RouteGuard {
        RouteGuard::new(PermissionEvaluator::standard().unwrap()).without_audit()
    }

    #[test_case("/api/clientes/42" => "/api/clientes/[id]"; "numeric id")]
    #[test_case("/api/clientes/42?x=1" => "/api/clientes/[id]"; "query stripped")]
    #[test_case("/api/ordens-servico/7/status" => "/api/ordens-servico/[id]/status"; "nested")]
    #[test_case("/api/clientes/abc" => "/api/clientes/abc"; "non numeric kept")]
    #[test_case("/api/clientes/12ab" => "/api/clientes/12ab"; "mixed segment kept")]
    #[test_case("/api/clientes" => "/api/clientes"; "no id")]
    fn test_normalize(path: &str) -> String {
        normalize_path(path)
    }

    #[test]
    fn test_required_permissions_by_method() {
        let g = guard();
        assert_eq!(g.required_permissions("/api/clientes/9", "GET"), ["clientes.read"]);
        assert_eq!(g.required_permissions("/api/clientes/9", "PATCH"), ["clientes.update"]);
        assert_eq!(g.required_permissions("/api/clientes", "POST"), ["clientes.create"]);
        assert!(g.required_permissions("/api/clientes", "DELETE").is_empty());
        assert!(g.required_permissions("/api/unknown", "GET").is_empty());
    }

    #[test]
    fn test_every_rule_names_a_grantable_permission() {
        let ev = PermissionEvaluator::standard().unwrap();
        for rule in ROUTE_TABLE {
            assert!(
                ev.has_permission("admin", rule.permission),
                "{} is not grantable",
                rule.permission
            );
        }
    }

    #[test]
    fn test_authorize_grants_and_denies() {
        let g = guard();
        assert_eq!(
            g.authorize("supervisor_tecnico", "/api/ordens-servico/3/assign-technician", "POST"),
            Ok(Role::SupervisorTecnico)
        );
        assert_eq!(
            g.authorize("technician", "/api/pagamentos", "GET"),
            Err(AuthorizationError::Forbidden {
                role: Role::Technician,
                permission: "pagamentos.read".to_string(),
            })
        );
    }

    #[test]
    fn test_unlisted_route_needs_only_a_valid_role() {
        let g = guard();
        assert_eq!(g.authorize("user", "/api/health", "GET"), Ok(Role::User));

        let err = g.authorize("ghost", "/api/health", "GET").unwrap_err();
        assert_eq!(err, AuthorizationError::InvalidRole("ghost".to_string()));
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_forbidden_is_403() {
        let err = guard()
            .authorize("atendente", "/api/admin/roles", "GET")
            .unwrap_err();
        assert_eq!(err.status_code(), 403);
    }

    #[test_case("admin", RoleRequirement::admin() => true; "admin only")]
    #[test_case("diretor", RoleRequirement::admin() => false; "diretor is not admin")]
    #[test_case("gerente_adm", RoleRequirement::gerente_financeiro() => false; "lists are explicit")]
    #[test_case("atendente", RoleRequirement::atendente() => true; "front desk")]
    #[test_case("user", RoleRequirement::atendente() => false; "basic user excluded")]
    #[test_case("gerente_financeiro", RoleRequirement::Minimum(Role::SupervisorTecnico) => true; "minimum by level")]
    #[test_case("atendente", RoleRequirement::Minimum(Role::SupervisorTecnico) => false; "below minimum")]
    #[test_case("supervisor_tecnico", RoleRequirement::Minimum(Role::SupervisorTecnico) => true; "minimum is inclusive")]
    fn test_authorize_roles(role: &str, requirement: RoleRequirement) -> bool {
        guard().authorize_roles(role, &requirement).is_ok()
    }

    #[test]
    fn test_authorize_resource() {
        let g = guard();
        assert!(g.authorize_resource("technician", "pecas").is_ok());
        assert!(matches!(
            g.authorize_resource("technician", "pagamentos"),
            Err(AuthorizationError::Forbidden { .. })
        ));
    }

    #[test]
    fn test_explain() {
        let decision = guard().explain("atendente", "/api/pagamentos/5?page=2", "GET");
        assert_eq!(decision.normalized_path, "/api/pagamentos/[id]");
        assert_eq!(decision.required, ["pagamentos.read"]);
        assert_eq!(decision.missing, ["pagamentos.read"]);
        assert!(!decision.allowed());

        let decision = guard().explain("nobody", "/api/health", "GET");
        assert!(!decision.allowed());
    }
}
