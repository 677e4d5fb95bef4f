use anyhow::{Context, Result};
use std::path::Path;

use crate::db::Database;
use crate::error::FinsortError;
use crate::ledger::{parse_amount_cents, parse_date, DATE_FORMAT};
use crate::models::Transaction;

/// Where the amount comes from: a decimal in major units, or integer cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AmountColumn {
    Decimal(usize),
    Cents(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ColumnMap {
    pub(crate) date: usize,
    pub(crate) amount: AmountColumn,
    pub(crate) merchant: Option<usize>,
    pub(crate) description: Option<usize>,
}

impl Default for ColumnMap {
    /// Headerless files are read as `date,amount,merchant,description`.
    fn default() -> Self {
        Self {
            date: 0,
            amount: AmountColumn::Decimal(1),
            merchant: Some(2),
            description: Some(3),
        }
    }
}

impl ColumnMap {
    pub(crate) fn from_header(header: &[String]) -> Result<Self, FinsortError> {
        let mut date = None;
        let mut amount = None;
        let mut merchant = None;
        let mut description = None;

        for (i, name) in header.iter().enumerate() {
            let key: String = name
                .trim()
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
                .to_lowercase();
            match key.as_str() {
                "date" | "postedat" => date = date.or(Some(i)),
                "amount" => amount = amount.or(Some(AmountColumn::Decimal(i))),
                "amountcents" => amount = amount.or(Some(AmountColumn::Cents(i))),
                "merchant" => merchant = merchant.or(Some(i)),
                "description" | "rawdesc" => description = description.or(Some(i)),
                _ => {}
            }
        }

        match (date, amount) {
            (Some(date), Some(amount)) => Ok(Self {
                date,
                amount,
                merchant,
                description,
            }),
            _ => Err(FinsortError::validation(
                "CSV header needs a date (or postedAt) and an amount (or amountCents) column",
            )),
        }
    }
}

pub(crate) struct CsvImporter;

impl CsvImporter {
    /// Read every record of the file as strings.
    pub(crate) fn read_rows(path: &Path) -> Result<Vec<Vec<String>>> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_path(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.context("Failed to read CSV record")?;
            rows.push(record.iter().map(|s| s.to_string()).collect());
        }
        Ok(rows)
    }

    /// Split off a header row if the first row looks like one.
    pub(crate) fn columns(rows: &[Vec<String>]) -> Result<(ColumnMap, usize), FinsortError> {
        let Some(first) = rows.first() else {
            return Err(FinsortError::validation("CSV file is empty"));
        };

        // Headers don't parse as dates or numbers
        let looks_like_header = first.iter().all(|field| {
            let trimmed = field.trim();
            parse_date(trimmed).is_err() && parse_amount_cents(trimmed).is_err()
        });

        if looks_like_header {
            Ok((ColumnMap::from_header(first)?, 1))
        } else {
            Ok((ColumnMap::default(), 0))
        }
    }

    /// Convert data rows into transactions. The first bad row fails the
    /// whole batch; blank rows are ignored.
    pub(crate) fn parse(
        rows: &[Vec<String>],
        columns: &ColumnMap,
        first_line: usize,
    ) -> Result<Vec<Transaction>, FinsortError> {
        let mut transactions = Vec::new();

        for (i, row) in rows.iter().enumerate() {
            if row.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            let line = first_line + i;
            let field = |col: Option<usize>| {
                col.and_then(|c| row.get(c))
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
            };

            let date_str = field(Some(columns.date)).unwrap_or_default();
            let date = parse_date(&date_str)
                .map_err(|e| FinsortError::validation(format!("Line {line}: {e}")))?;

            let amount_cents = match columns.amount {
                AmountColumn::Decimal(c) => parse_amount_cents(&field(Some(c)).unwrap_or_default())
                    .map_err(|e| FinsortError::validation(format!("Line {line}: {e}")))?,
                AmountColumn::Cents(c) => {
                    let raw = field(Some(c)).unwrap_or_default();
                    match raw.parse::<i64>() {
                        Ok(cents) if cents != 0 => cents,
                        _ => {
                            return Err(FinsortError::validation(format!(
                                "Line {line}: invalid amountCents '{raw}' (non-zero integer expected)"
                            )))
                        }
                    }
                }
            };

            transactions.push(Transaction::new(
                date.format(DATE_FORMAT).to_string(),
                amount_cents,
                field(columns.merchant),
                field(columns.description),
            ));
        }

        Ok(transactions)
    }

    /// Parse the whole file, then insert it in one database transaction.
    /// Nothing is written if any row is invalid.
    pub(crate) fn import(db: &mut Database, path: &Path) -> Result<usize> {
        let rows = Self::read_rows(path)?;
        let (columns, skip) = Self::columns(&rows)?;
        let txns = Self::parse(&rows[skip..], &columns, skip + 1)?;
        let inserted = db
            .insert_transactions_batch(&txns)
            .context("Failed to store imported transactions")?;
        tracing::info!(inserted, path = %path.display(), "imported transactions");
        Ok(inserted)
    }
}

#[cfg(test)]
#[path = "csv_import_tests.rs"]
mod tests;
