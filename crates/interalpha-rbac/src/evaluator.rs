//! Permission evaluation over a loaded [`RoleRegistry`].
//!
//! Every method takes the role as an untrusted string and is total: an
//! unknown role, an empty string or a blank permission degrade to `0`,
//! `false` or an empty collection. Callers must treat those as deny.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::permissions::{Action, build_permission, build_resource_wildcard, is_blank_permission};
use crate::registry::RoleRegistry;
use crate::roles::Role;

/// Stateless evaluator. Cloning shares the registry.
#[derive(Debug, Clone)]
pub struct PermissionEvaluator {
    registry: Arc<RoleRegistry>,
}

impl PermissionEvaluator {
    pub fn new(registry: Arc<RoleRegistry>) -> Self {
        Self { registry }
    }

    /// Builds an evaluator over the built-in role table.
    pub fn standard() -> Result<Self, RegistryError> {
        Ok(Self::new(Arc::new(RoleRegistry::standard()?)))
    }

    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// Level of `role`, or `0` when it is not a known role.
    pub fn role_level(&self, role: &str) -> u8 {
        Role::parse(role).map_or(0, |r| self.registry.level(r))
    }

    pub fn is_valid_role(&self, role: &str) -> bool {
        Role::parse(role).is_some()
    }

    /// Human label of `role`, or `""` when it is not a known role.
    pub fn role_description(&self, role: &str) -> &str {
        Role::parse(role).map_or("", |r| self.registry.description(r))
    }

    /// Returns whether `role` is granted `permission`.
    ///
    /// A blank permission is never granted, not even to a `*` role.
    pub fn has_permission(&self, role: &str, permission: &str) -> bool {
        if is_blank_permission(permission) {
            return false;
        }
        Role::parse(role).is_some_and(|r| self.registry.get(r).grants(permission))
    }

    /// The flattened pattern set of `role`, rendered as strings.
    pub fn all_permissions(&self, role: &str) -> BTreeSet<String> {
        Role::parse(role)
            .map(|r| {
                self.registry
                    .patterns(r)
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Access to a resource means either its wildcard or its `read` action.
    pub fn can_access_resource(&self, role: &str, resource: &str) -> bool {
        self.has_permission(role, &build_resource_wildcard(resource))
            || self.has_permission(role, &build_permission(resource, Action::READ))
    }

    /// Strictly higher level wins. Unknown roles have level `0`, so an
    /// unknown actor manages nothing.
    pub fn can_manage_role(&self, actor: &str, target: &str) -> bool {
        self.role_level(actor) > self.role_level(target)
    }

    /// Known roles with a strictly lower level than `role`, ascending.
    pub fn manageable_roles(&self, role: &str) -> Vec<Role> {
        let Some(actor) = Role::parse(role) else {
            return Vec::new();
        };
        let level = self.registry.level(actor);
        self.registry
            .by_level()
            .into_iter()
            .filter(|r| r.level < level)
            .map(|r| r.role)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn evaluator() -> PermissionEvaluator {
        PermissionEvaluator::standard().unwrap()
    }

    fn any_role() -> impl Strategy<Value = Role> {
        proptest::sample::select(Role::ALL.to_vec())
    }

    #[test_case("user" => 1)]
    #[test_case("supervisor_tecnico" => 5)]
    #[test_case("diretor" => 9)]
    #[test_case("admin" => 10)]
    #[test_case("" => 0; "empty")]
    #[test_case("Admin" => 0; "wrong case")]
    #[test_case("root" => 0; "unknown")]
    fn test_role_level(role: &str) -> u8 {
        evaluator().role_level(role)
    }

    #[test]
    fn test_description() {
        let ev = evaluator();
        assert_eq!(
            ev.role_description("diretor"),
            "Diretor com acesso total ao sistema"
        );
        assert_eq!(ev.role_description("nobody"), "");
        assert!(ev.is_valid_role("gerente_financeiro"));
        assert!(!ev.is_valid_role("gerente"));
    }

    #[test_case("supervisor_tecnico", "ordens_servico.assign_technician" => true; "supervisor assigns")]
    #[test_case("technician", "ordens_servico.read" => true; "technician reads orders")]
    #[test_case("technician", "ORDENS_SERVICO.READ" => false; "case sensitive")]
    #[test_case("technician", "pagamentos.read" => false; "technician no payments")]
    #[test_case("gerente_financeiro", "pagamentos.refund" => true; "finance wildcard")]
    #[test_case("gerente_financeiro", "pagamentosX.read" => false; "segment boundary")]
    #[test_case("atendente", "clientes.create" => true; "front desk creates clients")]
    #[test_case("atendente", "admin.users.create" => false; "front desk no admin")]
    #[test_case("gerente_adm", "pecas.create" => true; "inherited parts wildcard")]
    #[test_case("diretor", "anything.at.all" => true; "director star")]
    #[test_case("admin", "" => false; "empty permission")]
    #[test_case("admin", "   " => false; "blank permission")]
    #[test_case("", "clientes.read" => false; "empty role")]
    #[test_case("superuser", "clientes.read" => false; "unknown role")]
    fn test_has_permission(role: &str, permission: &str) -> bool {
        evaluator().has_permission(role, permission)
    }

    #[test]
    fn test_all_permissions_is_flattened() {
        let ev = evaluator();
        let perms = ev.all_permissions("supervisor_tecnico");
        assert!(perms.contains("ordens_servico.*"));
        // inherited from technician <- user
        assert!(perms.contains("relatorios.view_basic"));
        assert!(ev.all_permissions("nobody").is_empty());
        assert_eq!(ev.all_permissions("admin").into_iter().collect::<Vec<_>>(), ["*"]);
    }

    #[test_case("technician", "ordens_servico" => true; "read grant")]
    #[test_case("supervisor_tecnico", "pecas" => true; "wildcard grant")]
    #[test_case("technician", "pagamentos" => false; "no grant")]
    #[test_case("user", "clientes" => true; "basic read")]
    #[test_case("nobody", "clientes" => false; "unknown role")]
    fn test_can_access_resource(role: &str, resource: &str) -> bool {
        evaluator().can_access_resource(role, resource)
    }

    #[test]
    fn test_manage_concrete() {
        let ev = evaluator();
        assert!(ev.can_manage_role("supervisor_tecnico", "atendente"));
        assert!(!ev.can_manage_role("supervisor_tecnico", "gerente_adm"));
        assert!(!ev.can_manage_role("nobody", "also_nobody"));
        assert!(ev.can_manage_role("user", "nobody"));
    }

    #[test]
    fn test_manageable_roles_concrete() {
        let ev = evaluator();
        assert!(ev.manageable_roles("user").is_empty());
        assert!(ev.manageable_roles("").is_empty());
        assert_eq!(
            ev.manageable_roles("supervisor_tecnico"),
            vec![Role::User, Role::Technician, Role::Atendente]
        );
        assert_eq!(ev.manageable_roles("admin").len(), Role::ALL.len() - 1);
    }

    proptest! {
        #[test]
        fn prop_blank_permission_is_denied(role in any_role(), blank in "[ \t\n]{0,4}") {
            prop_assert!(!evaluator().has_permission(role.as_str(), &blank));
        }

        #[test]
        fn prop_manage_follows_strict_level_order(a in any_role(), b in any_role()) {
            let ev = evaluator();
            prop_assert_eq!(
                ev.can_manage_role(a.as_str(), b.as_str()),
                ev.role_level(a.as_str()) > ev.role_level(b.as_str())
            );
            prop_assert!(!ev.can_manage_role(a.as_str(), a.as_str()));
        }

        #[test]
        fn prop_manageable_roles_are_exactly_the_lower_levels(role in any_role()) {
            let ev = evaluator();
            let level = ev.role_level(role.as_str());
            let expected: BTreeSet<Role> = Role::ALL
                .into_iter()
                .filter(|r| ev.role_level(r.as_str()) < level)
                .collect();
            let actual: BTreeSet<Role> = ev.manageable_roles(role.as_str()).into_iter().collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn prop_unknown_roles_get_nothing(raw in "[a-zA-Z_]{0,20}", permission in "[a-z_.]{1,20}") {
            prop_assume!(Role::parse(&raw).is_none());
            let ev = evaluator();
            prop_assert_eq!(ev.role_level(&raw), 0);
            prop_assert!(!ev.has_permission(&raw, &permission));
            prop_assert!(ev.all_permissions(&raw).is_empty());
            prop_assert!(ev.manageable_roles(&raw).is_empty());
        }
    }
}
