//! Route authorization dry run.

use anyhow::Result;
use interalpha_rbac::RouteGuard;

use super::{evaluator, table};

/// Explains the decision for `role` on `method path`. Returns whether it
/// would be allowed.
pub fn run(role: &str, method: &str, path: &str) -> Result<bool> {
    let guard = RouteGuard::new(evaluator()?);
    let decision = guard.explain(role, path, method);

    println!("{} {}", decision.method, decision.normalized_path);
    if decision.required.is_empty() {
        println!("No permission listed; any valid role may call it.");
    } else {
        let mut table = table(&["Permission", "Held"]);
        for permission in &decision.required {
            let held = !decision.missing.contains(permission);
            table.add_row(vec![
                (*permission).to_string(),
                if held { "yes" } else { "no" }.to_string(),
            ]);
        }
        println!("{table}");
    }

    match guard.authorize(role, path, method) {
        Ok(role) => {
            println!("ALLOWED for {role}");
            Ok(true)
        }
        Err(e) => {
            println!("DENIED ({}): {e}", e.status_code());
            Ok(false)
        }
    }
}
