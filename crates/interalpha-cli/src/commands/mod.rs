//! CLI command implementations.

pub mod config;
pub mod demo;
pub mod roles;
pub mod route;

use anyhow::{Context, Result};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use interalpha_rbac::PermissionEvaluator;

/// Evaluator over the built-in role table.
pub(crate) fn evaluator() -> Result<PermissionEvaluator> {
    PermissionEvaluator::standard().context("Built-in role table failed to load")
}

/// Rounded table with a bold header row.
pub(crate) fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .iter()
                .map(|h| Cell::new(h).add_attribute(Attribute::Bold)),
        );
    table
}
