//! Role table inspection.

use anyhow::{Result, bail};
use interalpha_rbac::Role;

use super::{evaluator, table};

/// Prints every role, highest level first.
pub fn list() -> Result<()> {
    let evaluator = evaluator()?;
    let registry = evaluator.registry();

    let mut table = table(&["Role", "Level", "Description", "Patterns"]);
    for resolved in registry.by_level().into_iter().rev() {
        table.add_row(vec![
            resolved.role.as_str().to_string(),
            resolved.level.to_string(),
            resolved.description.clone(),
            resolved.patterns.len().to_string(),
        ]);
    }
    println!("{table}");
    println!("Role table version {}", registry.version());
    Ok(())
}

fn known(role: &str) -> Result<Role> {
    match Role::parse(role) {
        Some(role) => Ok(role),
        None => bail!("Unknown role '{role}'. Run 'interalpha-auth roles' for the list."),
    }
}

pub fn permissions(role: &str, json: bool) -> Result<()> {
    known(role)?;
    let permissions = evaluator()?.all_permissions(role);

    if json {
        println!("{}", serde_json::to_string_pretty(&permissions)?);
    } else {
        for permission in &permissions {
            println!("{permission}");
        }
    }
    Ok(())
}

/// Returns whether the permission is granted.
pub fn check(role: &str, permission: &str) -> Result<bool> {
    known(role)?;
    let granted = evaluator()?.has_permission(role, permission);
    println!(
        "{role} {} {permission:?}",
        if granted { "has" } else { "lacks" }
    );
    Ok(granted)
}

pub fn manageable(role: &str) -> Result<()> {
    known(role)?;
    let evaluator = evaluator()?;
    let roles = evaluator.manageable_roles(role);
    if roles.is_empty() {
        println!("{role} manages no roles");
        return Ok(());
    }

    let mut table = table(&["Role", "Level"]);
    for target in roles {
        table.add_row(vec![
            target.as_str().to_string(),
            evaluator.role_level(target.as_str()).to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
