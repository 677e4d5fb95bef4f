//! Writes classifier output back to transactions.
//!
//! Category names are resolved (and created when missing) first; each
//! assignment then becomes a guarded update that only lands while the
//! transaction is still uncategorized.

mod runs;

pub(crate) use runs::{apply_ai, apply_rules, preview_ai, preview_rules};

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;

use crate::classify::Assignment;
use crate::db::{CategoryGuard, Database};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApplyOutcome {
    /// Transactions actually modified.
    pub(crate) applied: usize,
    pub(crate) categories_created: usize,
    /// Assignments that changed nothing: blank category name, unknown or
    /// already categorized transaction, or a repeat within the batch.
    pub(crate) skipped: usize,
}

pub(crate) fn apply_assignments(
    db: &mut Database,
    assignments: &[Assignment],
) -> Result<ApplyOutcome> {
    if assignments.is_empty() {
        return Ok(ApplyOutcome::default());
    }

    let mut outcome = ApplyOutcome::default();
    let mut name_to_id: HashMap<&str, i64> = HashMap::new();
    for a in assignments {
        let name = a.category.trim();
        if name.is_empty() || name_to_id.contains_key(name) {
            continue;
        }
        let (id, created) = db
            .find_or_create_category(name)
            .with_context(|| format!("Failed to resolve category '{name}'"))?;
        if created {
            tracing::info!(category = name, "created category");
            outcome.categories_created += 1;
        }
        name_to_id.insert(name, id);
    }

    let updates: Vec<(i64, i64)> = assignments
        .iter()
        .filter_map(|a| {
            name_to_id
                .get(a.category.trim())
                .map(|&category_id| (a.transaction_id, category_id))
        })
        .collect();

    outcome.applied = db
        .update_transaction_categories(&updates, CategoryGuard::OnlyIfUncategorized)
        .context("Failed to write category assignments")?;
    outcome.skipped = assignments.len() - outcome.applied;

    tracing::info!(
        assignments = assignments.len(),
        applied = outcome.applied,
        categories_created = outcome.categories_created,
        "applied assignments"
    );
    Ok(outcome)
}
