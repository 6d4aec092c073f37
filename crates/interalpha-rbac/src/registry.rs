//! Role registry.
//!
//! Built once at startup from a table of [`RoleDefinition`]s and immutable
//! afterwards. Inheritance is flattened here, so every role carries its
//! complete pattern set and permission checks never recurse.
//!
//! Loading validates that:
//! - every [`Role`] is defined exactly once
//! - levels lie in `MIN_LEVEL..=MAX_LEVEL` and are pairwise distinct
//! - every pattern parses
//! - the inheritance graph is acyclic

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{RegistryError, Result};
use crate::permissions::PermissionPattern;
use crate::roles::{
    MAX_LEVEL, MIN_LEVEL, ROLE_TABLE_VERSION, Role, RoleDefinition, standard_definitions,
};

const ROLE_COUNT: usize = Role::ALL.len();

/// A role with its inheritance resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRole {
    pub role: Role,
    pub level: u8,
    pub description: String,
    /// Own and inherited patterns, sorted and deduplicated.
    pub patterns: Vec<PermissionPattern>,
}

impl ResolvedRole {
    /// Returns whether any resolved pattern grants `required`.
    pub fn grants(&self, required: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(required))
    }
}

/// Immutable table of resolved roles.
///
/// # Thread Safety
///
/// The registry has no interior mutability. Share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRegistry {
    version: u32,
    /// Indexed by `Role::index()`.
    roles: Vec<ResolvedRole>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

impl RoleRegistry {
    /// Loads the built-in role table.
    pub fn standard() -> Result<Self> {
        Self::load(ROLE_TABLE_VERSION, standard_definitions())
    }

    /// Validates `definitions` and flattens inheritance.
    pub fn load(version: u32, definitions: Vec<RoleDefinition>) -> Result<Self> {
        let mut slots: [Option<RoleDefinition>; ROLE_COUNT] = std::array::from_fn(|_| None);

        for def in definitions {
            if !(MIN_LEVEL..=MAX_LEVEL).contains(&def.level) {
                return Err(RegistryError::LevelOutOfRange {
                    role: def.role,
                    level: def.level,
                    min: MIN_LEVEL,
                    max: MAX_LEVEL,
                });
            }
            let slot = &mut slots[def.role.index()];
            if slot.is_some() {
                return Err(RegistryError::DuplicateDefinition(def.role));
            }
            *slot = Some(def);
        }

        let mut defs = Vec::with_capacity(ROLE_COUNT);
        for (role, slot) in Role::ALL.into_iter().zip(slots) {
            defs.push(slot.ok_or(RegistryError::MissingDefinition(role))?);
        }

        check_distinct_levels(&defs)?;

        let direct = defs
            .iter()
            .map(|def| {
                def.permissions
                    .iter()
                    .map(|raw| PermissionPattern::parse(raw))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        let mut marks = [Mark::Unvisited; ROLE_COUNT];
        let mut resolved: Vec<Option<BTreeSet<PermissionPattern>>> = vec![None; ROLE_COUNT];
        let mut path = Vec::with_capacity(ROLE_COUNT);
        for role in Role::ALL {
            flatten(role, &defs, &direct, &mut marks, &mut resolved, &mut path)?;
        }

        let roles = defs
            .into_iter()
            .zip(resolved)
            .map(|(def, patterns)| ResolvedRole {
                role: def.role,
                level: def.level,
                description: def.description,
                patterns: patterns.unwrap_or_default().into_iter().collect(),
            })
            .collect::<Vec<_>>();

        debug!(version, roles = roles.len(), "role registry loaded");

        Ok(Self { version, roles })
    }

    /// Version of the table this registry was built from.
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn get(&self, role: Role) -> &ResolvedRole {
        &self.roles[role.index()]
    }

    pub fn level(&self, role: Role) -> u8 {
        self.get(role).level
    }

    pub fn description(&self, role: Role) -> &str {
        &self.get(role).description
    }

    pub fn patterns(&self, role: Role) -> &[PermissionPattern] {
        &self.get(role).patterns
    }

    /// All resolved roles in ascending level order.
    pub fn by_level(&self) -> Vec<&ResolvedRole> {
        let mut roles: Vec<&ResolvedRole> = self.roles.iter().collect();
        roles.sort_by_key(|r| r.level);
        roles
    }
}

fn check_distinct_levels(defs: &[RoleDefinition]) -> Result<()> {
    let mut by_level: Vec<(u8, Role)> = defs.iter().map(|d| (d.level, d.role)).collect();
    by_level.sort_unstable();
    for pair in by_level.windows(2) {
        if let [(level, first), (next_level, second)] = pair {
            if level == next_level {
                return Err(RegistryError::DuplicateLevel {
                    level: *level,
                    first: *first,
                    second: *second,
                });
            }
        }
    }
    Ok(())
}

/// Depth-first topological merge. `path` holds the roles currently being
/// visited so a back edge can be reported as the full cycle.
fn flatten(
    role: Role,
    defs: &[RoleDefinition],
    direct: &[Vec<PermissionPattern>],
    marks: &mut [Mark; ROLE_COUNT],
    resolved: &mut [Option<BTreeSet<PermissionPattern>>],
    path: &mut Vec<Role>,
) -> Result<()> {
    let i = role.index();
    match marks[i] {
        Mark::Done => return Ok(()),
        Mark::Visiting => {
            let start = path.iter().position(|r| *r == role).unwrap_or(0);
            let mut cycle = path[start..].to_vec();
            cycle.push(role);
            return Err(RegistryError::InheritanceCycle(cycle));
        }
        Mark::Unvisited => {}
    }

    marks[i] = Mark::Visiting;
    path.push(role);

    let mut set: BTreeSet<PermissionPattern> = direct[i].iter().cloned().collect();
    for parent in &defs[i].inherits {
        flatten(*parent, defs, direct, marks, resolved, path)?;
        if let Some(inherited) = &resolved[parent.index()] {
            set.extend(inherited.iter().cloned());
        }
    }

    path.pop();
    marks[i] = Mark::Done;
    resolved[i] = Some(set);
    Ok(())
}
