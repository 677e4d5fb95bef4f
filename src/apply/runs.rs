use anyhow::Result;
use serde::Serialize;

use super::{apply_assignments, ApplyOutcome};
use crate::categorize::RuleMatcher;
use crate::classify::{Assignment, Classification, Classifier, ClassifyMode, Transport};
use crate::db::Database;

/// Most recent transactions scanned by the rules preview.
pub(crate) const RULES_PREVIEW_SCAN: u32 = 200;
/// Rows the rules preview returns at most.
pub(crate) const RULES_PREVIEW_ROWS: usize = 50;
/// Uncategorized transactions a rules apply considers.
pub(crate) const RULES_APPLY_LIMIT: u32 = 1000;
pub(crate) const AI_PREVIEW_BATCH: u32 = 20;
pub(crate) const AI_APPLY_BATCH: u32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RulePreviewRow {
    pub(crate) transaction_id: i64,
    pub(crate) merchant: Option<String>,
    pub(crate) raw_desc: Option<String>,
    pub(crate) amount_cents: i64,
    pub(crate) suggested_category: &'static str,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RulesApplyOutcome {
    pub(crate) considered: usize,
    pub(crate) suggested: usize,
    pub(crate) applied: usize,
    pub(crate) categories_created: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AiPreview {
    pub(crate) mode: ClassifyMode,
    pub(crate) considered: usize,
    pub(crate) suggested: usize,
    pub(crate) assignments: Vec<Assignment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AiApplyOutcome {
    pub(crate) mode: ClassifyMode,
    pub(crate) considered: usize,
    pub(crate) suggested: usize,
    pub(crate) applied: usize,
    pub(crate) categories_created: usize,
}

/// Dry run of the rule matcher over recent uncategorized transactions.
pub(crate) fn preview_rules(db: &Database, matcher: &RuleMatcher) -> Result<Vec<RulePreviewRow>> {
    let recent = db.get_transactions(Some(RULES_PREVIEW_SCAN), false)?;
    Ok(recent
        .into_iter()
        .filter(|t| !t.is_categorized())
        .filter_map(|t| {
            let suggested_category = matcher.classify_transaction(&t)?;
            Some(RulePreviewRow {
                transaction_id: t.id?,
                merchant: t.merchant,
                raw_desc: t.raw_desc,
                amount_cents: t.amount_cents,
                suggested_category,
            })
        })
        .take(RULES_PREVIEW_ROWS)
        .collect())
}

pub(crate) fn apply_rules(db: &mut Database, matcher: &RuleMatcher) -> Result<RulesApplyOutcome> {
    let txns = db.find_uncategorized(RULES_APPLY_LIMIT)?;
    let assignments: Vec<Assignment> = txns
        .iter()
        .filter_map(|t| {
            Some(Assignment {
                transaction_id: t.id?,
                category: matcher.classify_transaction(t)?.to_string(),
            })
        })
        .collect();

    let ApplyOutcome {
        applied,
        categories_created,
        ..
    } = apply_assignments(db, &assignments)?;

    Ok(RulesApplyOutcome {
        considered: txns.len(),
        suggested: assignments.len(),
        applied,
        categories_created,
    })
}

fn classify_recent<T: Transport>(
    db: &Database,
    classifier: &Classifier<T>,
    batch: u32,
) -> Result<Classification> {
    let txns = db.find_uncategorized(batch)?;
    let allowed: Vec<String> = db.get_categories()?.into_iter().map(|c| c.name).collect();
    classifier.classify_batch(&txns, &allowed)
}

/// Classify a small batch without writing anything.
pub(crate) fn preview_ai<T: Transport>(
    db: &Database,
    classifier: &Classifier<T>,
) -> Result<AiPreview> {
    let c = classify_recent(db, classifier, AI_PREVIEW_BATCH)?;
    Ok(AiPreview {
        mode: c.mode,
        considered: c.considered,
        suggested: c.assignments.len(),
        assignments: c.assignments,
    })
}

pub(crate) fn apply_ai<T: Transport>(
    db: &mut Database,
    classifier: &Classifier<T>,
) -> Result<AiApplyOutcome> {
    let c = classify_recent(db, classifier, AI_APPLY_BATCH)?;
    let outcome = apply_assignments(db, &c.assignments)?;
    Ok(AiApplyOutcome {
        mode: c.mode,
        considered: c.considered,
        suggested: c.assignments.len(),
        applied: outcome.applied,
        categories_created: outcome.categories_created,
    })
}
