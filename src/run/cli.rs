use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use std::path::Path;

use crate::apply;
use crate::categorize::{HeuristicScorer, RuleMatcher};
use crate::classify::{configured_mode, Classifier};
use crate::config::Config;
use crate::db::Database;
use crate::import::CsvImporter;
use crate::ledger::{self, NewTransaction};
use crate::models::Category;
use crate::review::{self, Resolution, Selection};

pub(crate) struct Output {
    pub(crate) json: bool,
}

impl Output {
    /// JSON to stdout in `--json` mode, otherwise the human summary.
    fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T)) -> Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionRow {
    id: i64,
    posted_at: String,
    amount_cents: i64,
    merchant: Option<String>,
    raw_desc: Option<String>,
    category_id: Option<i64>,
    category: Option<String>,
}

pub(crate) fn setup(out: &Output, db: &mut Database) -> Result<()> {
    let created = ledger::setup_categories(db)?;
    out.emit(&json!({ "created": created }), |_| {
        println!("Created {created} default categories");
    })
}

pub(crate) fn seed(out: &Output, db: &mut Database) -> Result<()> {
    let inserted = ledger::seed_demo(db, ledger::today())?;
    out.emit(&json!({ "inserted": inserted }), |_| {
        println!("Replaced all transactions with {inserted} demo rows");
    })
}

pub(crate) fn add(out: &Output, db: &Database, input: &NewTransaction) -> Result<()> {
    let id = ledger::add_transaction(db, input, ledger::today())?;
    out.emit(&json!({ "ok": true, "id": id }), |_| {
        println!("Added transaction {id}");
    })
}

pub(crate) fn import(out: &Output, db: &mut Database, file: &Path) -> Result<()> {
    let path = shellexpand(&file.to_string_lossy());
    let path = Path::new(&path);
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }
    let inserted = CsvImporter::import(db, path)?;
    out.emit(&json!({ "inserted": inserted }), |_| {
        println!("Imported {inserted} transactions");
    })
}

pub(crate) fn list_transactions(
    out: &Output,
    db: &Database,
    limit: u32,
    uncategorized_only: bool,
) -> Result<()> {
    let cats = db.get_categories()?;
    let rows: Vec<TransactionRow> = db
        .get_transactions(Some(limit), uncategorized_only)?
        .into_iter()
        .filter_map(|t| {
            Some(TransactionRow {
                id: t.id?,
                category: t
                    .category_id
                    .and_then(|c| Category::find_by_id(&cats, c))
                    .map(|c| c.name.clone()),
                posted_at: t.posted_at,
                amount_cents: t.amount_cents,
                merchant: t.merchant,
                raw_desc: t.raw_desc,
                category_id: t.category_id,
            })
        })
        .collect();

    out.emit(&rows, |rows| {
        if rows.is_empty() {
            println!("No transactions");
            return;
        }
        println!(
            "{:<6} {:<10} {:>12}  {:<24} Category",
            "ID", "Date", "Amount", "Merchant"
        );
        println!("{}", "─".repeat(68));
        for r in rows {
            println!(
                "{:<6} {:<10} {:>12}  {:<24} {}",
                r.id,
                r.posted_at,
                format_cents(r.amount_cents),
                truncate(r.merchant.as_deref().or(r.raw_desc.as_deref()).unwrap_or("-"), 24),
                r.category.as_deref().unwrap_or("-"),
            );
        }
    })
}

pub(crate) fn set_category(
    out: &Output,
    db: &Database,
    transaction_id: i64,
    category_id: Option<i64>,
) -> Result<()> {
    ledger::set_category(db, transaction_id, category_id)?;
    let cleared = category_id.is_none();
    out.emit(&json!({ "ok": true, "cleared": cleared }), |_| match category_id {
        Some(c) => println!("Transaction {transaction_id} -> category {c}"),
        None => println!("Cleared category of transaction {transaction_id}"),
    })
}

pub(crate) fn delete(out: &Output, db: &Database, transaction_id: i64) -> Result<()> {
    ledger::delete_transaction(db, transaction_id)?;
    out.emit(&json!({ "ok": true, "deleted": transaction_id }), |_| {
        println!("Deleted transaction {transaction_id}");
    })
}

pub(crate) fn uncategorized_count(out: &Output, db: &Database) -> Result<()> {
    let count = db.count_uncategorized()?;
    out.emit(&json!({ "count": count }), |_| {
        println!("{count} uncategorized");
    })
}

pub(crate) fn categories(out: &Output, db: &Database) -> Result<()> {
    let cats = db.get_categories()?;
    let rows: Vec<_> = cats
        .iter()
        .map(|c| json!({ "id": c.id, "name": c.name }))
        .collect();
    out.emit(&rows, |_| {
        println!("{:<4} Name", "ID");
        println!("{}", "─".repeat(30));
        for c in &cats {
            println!("{:<4} {c}", c.id.unwrap_or(0));
        }
    })
}

pub(crate) fn rules_preview(out: &Output, db: &Database) -> Result<()> {
    let rows = apply::preview_rules(db, &RuleMatcher::new())?;
    let value = json!({ "count": rows.len(), "suggestions": rows });
    out.emit(&value, |_| {
        if rows.is_empty() {
            println!("No rule matches among recent uncategorized transactions");
            return;
        }
        for r in &rows {
            println!(
                "{:<6} {:>12}  {:<24} -> {}",
                r.transaction_id,
                format_cents(r.amount_cents),
                truncate(r.merchant.as_deref().or(r.raw_desc.as_deref()).unwrap_or("-"), 24),
                r.suggested_category,
            );
        }
        println!("{} suggestions", rows.len());
    })
}

pub(crate) fn rules_apply(out: &Output, db: &mut Database) -> Result<()> {
    let outcome = apply::apply_rules(db, &RuleMatcher::new())?;
    out.emit(&outcome, |o| {
        println!(
            "Considered {}, suggested {}, applied {} ({} categories created)",
            o.considered, o.suggested, o.applied, o.categories_created
        );
    })
}

pub(crate) fn ai_mode(out: &Output, config: &Config) -> Result<()> {
    let mode = configured_mode(&config.ai);
    out.emit(&json!({ "mode": mode }), |_| {
        println!("{mode}");
    })
}

pub(crate) fn ai_preview(out: &Output, db: &Database, config: &Config) -> Result<()> {
    let classifier = Classifier::from_config(config.ai.clone());
    let preview = apply::preview_ai(db, &classifier)?;
    out.emit(&preview, |p| {
        println!("Mode: {}", p.mode);
        for a in &p.assignments {
            println!("  {:<6} -> {}", a.transaction_id, a.category);
        }
        println!("{} of {} transactions classified", p.suggested, p.considered);
    })
}

pub(crate) fn ai_apply(out: &Output, db: &mut Database, config: &Config) -> Result<()> {
    let classifier = Classifier::from_config(config.ai.clone());
    let outcome = apply::apply_ai(db, &classifier)?;
    out.emit(&outcome, |o| {
        println!(
            "Mode: {}. Considered {}, suggested {}, applied {} ({} categories created)",
            o.mode, o.considered, o.suggested, o.applied, o.categories_created
        );
    })
}

pub(crate) fn review_populate(out: &Output, db: &mut Database) -> Result<()> {
    let outcome = review::populate(db, &HeuristicScorer::new(), review::POPULATE_LIMIT)?;
    out.emit(&outcome, |o| {
        println!("Scanned {}, created {} suggestions", o.scanned, o.created);
    })
}

pub(crate) fn review_pending(out: &Output, db: &Database) -> Result<()> {
    let items = review::list_pending(db)?;
    let value = json!({ "count": items.len(), "items": items });
    out.emit(&value, |_| {
        if items.is_empty() {
            println!("No pending suggestions");
            return;
        }
        println!(
            "{:<6} {:<10} {:>12}  {:<24} {:<14} Score",
            "Txn", "Date", "Amount", "Merchant", "Suggested"
        );
        println!("{}", "─".repeat(78));
        for s in &items {
            println!(
                "{:<6} {:<10} {:>12}  {:<24} {:<14} {:.2} ({})",
                s.transaction_id,
                s.posted_at,
                format_cents(s.amount_cents),
                truncate(s.merchant.as_deref().or(s.raw_desc.as_deref()).unwrap_or("-"), 24),
                s.suggested_category,
                s.score,
                s.source,
            );
        }
    })
}

pub(crate) fn review_resolve(
    out: &Output,
    db: &mut Database,
    selection: Selection,
    resolution: Resolution,
) -> Result<()> {
    let outcome = review::resolve(db, &selection, resolution)?;
    out.emit(&outcome, |o| match resolution {
        Resolution::Accepted => println!(
            "Accepted {} suggestions ({} transactions updated)",
            o.count, o.transactions_updated
        ),
        Resolution::Rejected => println!("Rejected {} suggestions", o.count),
    })
}

/// `-1899` -> `-18.99`
pub(crate) fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

pub(crate) fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/{rest}")
    } else {
        path.to_string()
    }
}
