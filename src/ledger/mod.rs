//! Plain transaction and category bookkeeping around the pipeline: manual
//! entry, manual categorization, deletion and the demo dataset.

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::db::Database;
use crate::error::FinsortError;
use crate::models::Transaction;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// User input for a manually entered transaction, still unvalidated.
#[derive(Debug, Clone, Default)]
pub(crate) struct NewTransaction {
    /// `YYYY-MM-DD`; today when absent.
    pub(crate) date: Option<String>,
    /// Decimal major units, e.g. `-12.34`, `$-12.34`, `1,200.00`.
    pub(crate) amount: String,
    pub(crate) merchant: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) category_id: Option<i64>,
}

pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate, FinsortError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|_| FinsortError::validation(format!("Invalid date '{s}' (use YYYY-MM-DD)")))
}

/// Parse a decimal amount into signed cents, rounding half away from zero.
/// Anything that rounds to less than one cent is rejected.
pub(crate) fn parse_amount_cents(s: &str) -> Result<i64, FinsortError> {
    let invalid = || {
        FinsortError::validation(format!(
            "Invalid amount '{s}'. Use negative for expense, positive for income."
        ))
    };

    let cleaned = s
        .replace(['$', ','], "")
        .replace('(', "-")
        .replace(')', "")
        .trim()
        .to_string();
    if cleaned.is_empty() {
        return Err(invalid());
    }

    let cents = Decimal::from_str(&cleaned)
        .ok()
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.checked_mul(Decimal::ONE_HUNDRED))
        .and_then(|d| d.to_i64())
        .ok_or_else(invalid)?;

    if cents == 0 {
        return Err(invalid());
    }
    Ok(cents)
}

/// Validate and store one transaction. Returns the new id.
pub(crate) fn add_transaction(
    db: &Database,
    input: &NewTransaction,
    today: NaiveDate,
) -> Result<i64> {
    let posted_at = match input.date.as_deref().map(str::trim) {
        Some(d) if !d.is_empty() => parse_date(d)?,
        _ => today,
    };
    let amount_cents = parse_amount_cents(&input.amount)?;

    if let Some(category_id) = input.category_id {
        if db.get_category_by_id(category_id)?.is_none() {
            return Err(FinsortError::not_found(format!("category {category_id}")).into());
        }
    }

    let mut txn = Transaction::new(
        posted_at.format(DATE_FORMAT).to_string(),
        amount_cents,
        input.merchant.clone(),
        input.description.clone(),
    );
    txn.category_id = input.category_id;

    let id = db
        .insert_transaction(&txn)
        .context("Failed to insert transaction")?;
    tracing::debug!(id, amount_cents, "added transaction");
    Ok(id)
}

/// Set a transaction's category, or clear it with `None`.
pub(crate) fn set_category(
    db: &Database,
    transaction_id: i64,
    category_id: Option<i64>,
) -> Result<()> {
    if let Some(category_id) = category_id {
        if db.get_category_by_id(category_id)?.is_none() {
            return Err(FinsortError::not_found(format!("category {category_id}")).into());
        }
    }
    if db.set_transaction_category(transaction_id, category_id)? == 0 {
        return Err(FinsortError::not_found(format!("transaction {transaction_id}")).into());
    }
    Ok(())
}

pub(crate) fn delete_transaction(db: &Database, transaction_id: i64) -> Result<()> {
    if db.delete_transaction(transaction_id)? == 0 {
        return Err(FinsortError::not_found(format!("transaction {transaction_id}")).into());
    }
    Ok(())
}

/// Create any missing default categories. Returns how many were created.
pub(crate) fn setup_categories(db: &mut Database) -> Result<usize> {
    let created = db.ensure_default_categories()?;
    tracing::info!(created, "default categories ensured");
    Ok(created)
}

/// Replace every transaction with a small sample set dated relative to
/// `today`.
pub(crate) fn seed_demo(db: &mut Database, today: NaiveDate) -> Result<usize> {
    let sample: [(u64, i64, &str, &str); 5] = [
        (2, -1899, "UBER *TRIP", "UBER HELP"),
        (3, -1299, "Chipotle", "CHIPOTLE TORONTO"),
        (5, -7999, "Rogers", "ROGERS COMM"),
        (7, 250_000, "PAYROLL", "ACME PAYROLL"),
        (8, -4599, "Walmart", "WALMART TORONTO"),
    ];

    let txns = sample
        .iter()
        .map(|&(days_ago, amount_cents, merchant, desc)| {
            let date = today
                .checked_sub_days(Days::new(days_ago))
                .with_context(|| format!("{today} minus {days_ago} days is out of range"))?;
            Ok(Transaction::new(
                date.format(DATE_FORMAT).to_string(),
                amount_cents,
                Some(merchant.into()),
                Some(desc.into()),
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let inserted = db.replace_transactions(&txns)?;
    tracing::info!(inserted, "seeded demo transactions");
    Ok(inserted)
}

#[cfg(test)]
mod tests;
