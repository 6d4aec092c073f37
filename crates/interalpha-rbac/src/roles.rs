#![allow(clippy::match_same_arms)]
//! Role definitions for RBAC.
//!
//! Defines 8 employee roles. Levels run from 1 (least privileged) to 10:
//!
//! | Role                 | Level | Inherits                              |
//! |----------------------|-------|---------------------------------------|
//! | `user`               | 1     |                                       |
//! | `technician`         | 2     | user                                  |
//! | `atendente`          | 3     | user                                  |
//! | `supervisor_tecnico` | 5     | technician                            |
//! | `gerente_financeiro` | 6     | atendente                             |
//! | `gerente_adm`        | 7     | atendente, supervisor_tecnico         |
//! | `diretor`            | 9     | gerente_adm, gerente_financeiro       |
//! | `admin`              | 10    |                                       |

use std::fmt::{self, Display};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuthorizationError;

/// Version of the built-in role table. Bump when levels or grants change.
pub const ROLE_TABLE_VERSION: u32 = 3;

/// Lowest and highest levels a role may hold.
pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 10;

/// Employee role.
///
/// The closed set of roles known to the system. Strings arriving from
/// persistence or HTTP bodies are converted with [`Role::from_str`], which
/// is exact and case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Basic system user.
    User,

    /// Technician executing service orders.
    Technician,

    /// Front desk, owns the client relationship and opens service orders.
    Atendente,

    /// Technical supervisor managing the technician team.
    SupervisorTecnico,

    /// Finance manager: payments and financial reports.
    GerenteFinanceiro,

    /// Administrative manager: operations and user administration.
    GerenteAdm,

    /// Director with access to everything.
    Diretor,

    /// System administrator, kept for compatibility with older accounts.
    Admin,
}

impl Role {
    /// Every role, in ascending level order of the built-in table.
    pub const ALL: [Role; 8] = [
        Role::User,
        Role::Technician,
        Role::Atendente,
        Role::SupervisorTecnico,
        Role::GerenteFinanceiro,
        Role::GerenteAdm,
        Role::Diretor,
        Role::Admin,
    ];

    /// The wire name of this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Technician => "technician",
            Role::Atendente => "atendente",
            Role::SupervisorTecnico => "supervisor_tecnico",
            Role::GerenteFinanceiro => "gerente_financeiro",
            Role::GerenteAdm => "gerente_adm",
            Role::Diretor => "diretor",
            Role::Admin => "admin",
        }
    }

    /// Positional index into per-role tables.
    pub(crate) fn index(self) -> usize {
        match self {
            Role::User => 0,
            Role::Technician => 1,
            Role::Atendente => 2,
            Role::SupervisorTecnico => 3,
            Role::GerenteFinanceiro => 4,
            Role::GerenteAdm => 5,
            Role::Diretor => 6,
            Role::Admin => 7,
        }
    }

    /// Parses an untrusted role string, returning `None` for anything that
    /// is not exactly one of the known names.
    pub fn parse(raw: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.as_str() == raw)
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthorizationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::parse(s).ok_or_else(|| AuthorizationError::InvalidRole(s.to_string()))
    }
}

/// Static definition of a role, before inheritance is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub role: Role,
    pub level: u8,
    pub description: String,
    /// Patterns granted directly to this role.
    pub permissions: Vec<String>,
    /// Roles whose (resolved) patterns this role also receives.
    #[serde(default)]
    pub inherits: Vec<Role>,
}

impl RoleDefinition {
    pub fn new(role: Role, level: u8, description: impl Into<String>) -> Self {
        Self {
            role,
            level,
            description: description.into(),
            permissions: Vec::new(),
            inherits: Vec::new(),
        }
    }

    pub fn grant(mut self, pattern: impl Into<String>) -> Self {
        self.permissions.push(pattern.into());
        self
    }

    pub fn grants<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn inherit(mut self, parent: Role) -> Self {
        self.inherits.push(parent);
        self
    }
}

/// The built-in role table.
pub fn standard_definitions() -> Vec<RoleDefinition> {
    vec![
        RoleDefinition::new(Role::User, 1, "Usuário básico do sistema")
            .grants(["clientes.read", "relatorios.view_basic"]),
        RoleDefinition::new(
            Role::Technician,
            2,
            "Técnico responsável pela execução de serviços",
        )
        .inherit(Role::User)
        .grants([
            "clientes.read",
            "ordens_servico.read",
            "ordens_servico.update",
            "ordens_servico.change_status",
            "pecas.read",
            "pecas.update",
            "relatorios.view_basic",
        ]),
        RoleDefinition::new(
            Role::Atendente,
            3,
            "Atendente responsável pelo relacionamento com clientes",
        )
        .inherit(Role::User)
        .grants([
            "clientes.create",
            "clientes.read",
            "clientes.update",
            "ordens_servico.create",
            "ordens_servico.read",
            "ordens_servico.update",
            "relatorios.view_basic",
        ]),
        RoleDefinition::new(
            Role::SupervisorTecnico,
            5,
            "Supervisor técnico com gestão de equipe técnica",
        )
        .inherit(Role::Technician)
        .grants([
            "clientes.read",
            "ordens_servico.*",
            "ordens_servico.assign_technician",
            "ordens_servico.change_status",
            "pecas.*",
            "relatorios.view_technical",
            "relatorios.view_basic",
        ]),
        RoleDefinition::new(
            Role::GerenteFinanceiro,
            6,
            "Gerente financeiro com controle sobre pagamentos e relatórios financeiros",
        )
        .inherit(Role::Atendente)
        .grants([
            "clientes.read",
            "ordens_servico.read",
            "ordens_servico.update",
            "pagamentos.*",
            "relatorios.view_financial",
            "relatorios.view_basic",
            "relatorios.export",
        ]),
        RoleDefinition::new(
            Role::GerenteAdm,
            7,
            "Gerente administrativo com controle sobre operações e usuários",
        )
        .inherit(Role::Atendente)
        .inherit(Role::SupervisorTecnico)
        .grants([
            "clientes.*",
            "ordens_servico.*",
            "admin.users.create",
            "admin.users.read",
            "admin.users.update",
            "admin.roles.manage",
            "relatorios.*",
            "pecas.read",
            "pecas.update",
        ]),
        RoleDefinition::new(Role::Diretor, 9, "Diretor com acesso total ao sistema")
            .inherit(Role::GerenteAdm)
            .inherit(Role::GerenteFinanceiro)
            .grant("*"),
        RoleDefinition::new(Role::Admin, 10, "Administrador do sistema com acesso total")
            .grant("*"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_role_names_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
    }

    #[test_case(""; "empty")]
    #[test_case("ADMIN"; "wrong case")]
    #[test_case(" admin"; "leading space")]
    #[test_case("superuser"; "unknown")]
    fn test_role_parse_rejects(raw: &str) {
        assert_eq!(Role::parse(raw), None);
        assert!(matches!(
            raw.parse::<Role>(),
            Err(AuthorizationError::InvalidRole(_))
        ));
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&Role::SupervisorTecnico).unwrap();
        assert_eq!(json, "\"supervisor_tecnico\"");
        let back: Role = serde_json::from_str("\"gerente_adm\"").unwrap();
        assert_eq!(back, Role::GerenteAdm);
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, role) in Role::ALL.into_iter().enumerate() {
            assert_eq!(role.index(), i);
        }
    }

    #[test]
    fn test_standard_table_covers_every_role_once() {
        let defs = standard_definitions();
        assert_eq!(defs.len(), Role::ALL.len());
        for role in Role::ALL {
            assert_eq!(defs.iter().filter(|d| d.role == role).count(), 1);
        }
    }

    #[test]
    fn test_standard_table_levels() {
        let level = |role| {
            standard_definitions()
                .into_iter()
                .find(|d| d.role == role)
                .map(|d| d.level)
        };
        assert_eq!(level(Role::User), Some(1));
        assert_eq!(level(Role::SupervisorTecnico), Some(5));
        assert_eq!(level(Role::GerenteAdm), Some(7));
        assert_eq!(level(Role::Admin), Some(10));
    }
}
