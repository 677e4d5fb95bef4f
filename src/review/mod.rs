//! The suggestion lifecycle. `populate` proposes a category for every
//! uncategorized transaction that has no pending suggestion; `resolve` moves
//! pending suggestions to accepted (writing the category through) or
//! rejected.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::categorize::HeuristicScorer;
use crate::db::{CategoryGuard, Database, UpsertOutcome};
use crate::models::{PendingSuggestion, Suggestion, SuggestionStatus};

/// Uncategorized transactions examined per populate call.
pub(crate) const POPULATE_LIMIT: u32 = 1000;
/// Rows returned by the review queue.
pub(crate) const PENDING_LIMIT: u32 = 500;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PopulateOutcome {
    pub(crate) scanned: usize,
    pub(crate) created: usize,
}

/// Which pending suggestions a resolve call targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Selection {
    All,
    /// By transaction id. An empty list matches nothing.
    Transactions(Vec<i64>),
}

impl Selection {
    fn transaction_ids(&self) -> Option<&[i64]> {
        match self {
            Self::All => None,
            Self::Transactions(ids) => Some(ids),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Resolution {
    Accepted,
    Rejected,
}

impl Resolution {
    fn status(self) -> SuggestionStatus {
        match self {
            Self::Accepted => SuggestionStatus::Accepted,
            Self::Rejected => SuggestionStatus::Rejected,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResolveOutcome {
    /// Suggestions that left the pending state in this call. Suggestions of
    /// deleted transactions are neither listed nor counted.
    pub(crate) count: usize,
    /// Transactions whose category was written. Always 0 for rejections.
    pub(crate) transactions_updated: usize,
}

/// Score the most recent uncategorized transactions and record a pending
/// suggestion for each one not already covered.
///
/// Re-running with no intervening changes creates nothing. A suggestion
/// created concurrently by another writer is refreshed, not duplicated, and
/// is not counted in `created`.
pub(crate) fn populate(
    db: &mut Database,
    scorer: &HeuristicScorer,
    limit: u32,
) -> Result<PopulateOutcome> {
    let txns = db
        .find_uncategorized(limit)
        .context("Failed to load uncategorized transactions")?;
    let covered = db.pending_transaction_ids()?;

    let mut outcome = PopulateOutcome::default();
    for txn in &txns {
        let Some(transaction_id) = txn.id else {
            continue;
        };
        outcome.scanned += 1;
        if covered.contains(&transaction_id) {
            continue;
        }

        let scored = scorer.score_transaction(txn);
        let (category_id, _) = db
            .find_or_create_category(scored.category)
            .with_context(|| format!("Failed to resolve category '{}'", scored.category))?;
        let suggestion =
            Suggestion::pending(transaction_id, category_id, scored.score, scored.source);

        if db.upsert_pending_suggestion(&suggestion)? == UpsertOutcome::Created {
            outcome.created += 1;
        }
    }

    tracing::info!(
        scanned = outcome.scanned,
        created = outcome.created,
        "populated suggestions"
    );
    Ok(outcome)
}

pub(crate) fn list_pending(db: &Database) -> Result<Vec<PendingSuggestion>> {
    db.list_pending_suggestions(PENDING_LIMIT)
}

/// Accept or reject the selected pending suggestions.
///
/// Accepting issues two writes: the transactions take the suggested
/// categories (last write wins), then the same suggestions flip to
/// accepted. They are not one database transaction; a failure between
/// them is repaired by calling `resolve` again, which re-applies the
/// categories and flips whatever is still pending.
pub(crate) fn resolve(
    db: &mut Database,
    selection: &Selection,
    resolution: Resolution,
) -> Result<ResolveOutcome> {
    let ids = selection.transaction_ids();

    let outcome = match resolution {
        Resolution::Rejected => ResolveOutcome {
            count: db.update_suggestion_status(ids, resolution.status())?,
            transactions_updated: 0,
        },
        Resolution::Accepted => {
            let pending = db.get_pending_suggestions(ids)?;
            let updates: Vec<(i64, i64)> = pending
                .iter()
                .map(|s| (s.transaction_id, s.suggested_category_id))
                .collect();
            let transactions_updated = db
                .update_transaction_categories(&updates, CategoryGuard::Overwrite)
                .context("Failed to apply accepted suggestions")?;

            let suggestion_ids: Vec<i64> = pending.iter().filter_map(|s| s.id).collect();
            let count = db
                .update_suggestion_status_by_ids(&suggestion_ids, resolution.status())
                .context("Failed to mark suggestions accepted")?;

            ResolveOutcome {
                count,
                transactions_updated,
            }
        }
    };

    tracing::info!(
        resolution = ?resolution,
        count = outcome.count,
        transactions_updated = outcome.transactions_updated,
        "resolved suggestions"
    );
    Ok(outcome)
}
