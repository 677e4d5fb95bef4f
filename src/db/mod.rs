mod schema;

use anyhow::{Context, Result};
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, TransactionBehavior,
};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::models::*;

pub(crate) struct Database {
    conn: Connection,
}

/// Write precondition for category assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CategoryGuard {
    /// Only write when the transaction has no category yet.
    OnlyIfUncategorized,
    /// Last write wins.
    Overwrite,
}

/// What an upsert against the pending-suggestion key did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpsertOutcome {
    Created,
    Refreshed,
}

const TRANSACTION_COLUMNS: &str =
    "t.id, t.posted_at, t.amount_cents, t.merchant, t.raw_desc, t.category_id, t.created_at";

const SUGGESTION_COLUMNS: &str =
    "id, transaction_id, suggested_category_id, score, source, status, created_at";

/// Suggestions keep weak references; this filters out the orphans.
const LIVE_TRANSACTION: &str = "transaction_id IN (SELECT id FROM transactions)";

impl Database {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .context("Failed to set busy timeout")?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .context("Failed to set database pragmas")?;
        let mut db = Self { conn };
        db.migrate().context("Database migration failed")?;
        db.seed_default_categories()?;
        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut db = Self { conn };
        db.migrate()?;
        db.seed_default_categories()?;
        Ok(db)
    }

    fn migrate(&mut self) -> Result<()> {
        let has_version_table: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            [],
            |row| row.get(0),
        )?;

        if !has_version_table {
            // Fresh database - apply full schema
            self.conn.execute_batch(schema::SCHEMA_V1)?;
            self.conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                params![schema::CURRENT_VERSION],
            )?;
            return Ok(());
        }

        let current: i32 = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?
            .unwrap_or(0);

        for &(from_version, sql) in schema::MIGRATIONS {
            if current <= from_version {
                self.conn.execute_batch(sql)?;
            }
        }

        if current < schema::CURRENT_VERSION {
            self.conn.execute(
                "UPDATE schema_version SET version = ?1",
                params![schema::CURRENT_VERSION],
            )?;
        }

        Ok(())
    }

    fn seed_default_categories(&mut self) -> Result<()> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(());
        }
        self.ensure_default_categories()?;
        Ok(())
    }

    /// Insert whichever default categories are missing. Returns how many
    /// were created.
    pub(crate) fn ensure_default_categories(&mut self) -> Result<usize> {
        let now = now_timestamp();
        let tx = self.conn.transaction()?;
        let mut created = 0;
        for name in Category::defaults() {
            created += tx.execute(
                "INSERT OR IGNORE INTO categories (name, created_at) VALUES (?1, ?2)",
                params![name, now],
            )?;
        }
        tx.commit()?;
        Ok(created)
    }

    // ── Transactions ──────────────────────────────────────────

    pub(crate) fn insert_transaction(&self, txn: &Transaction) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO transactions (posted_at, amount_cents, merchant, raw_desc, category_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                txn.posted_at,
                txn.amount_cents,
                txn.merchant,
                txn.raw_desc,
                txn.category_id,
                txn.created_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub(crate) fn insert_transactions_batch(&mut self, txns: &[Transaction]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let count = insert_all(&tx, txns)?;
        tx.commit()?;
        Ok(count)
    }

    /// Delete every transaction and insert `txns` in their place.
    pub(crate) fn replace_transactions(&mut self, txns: &[Transaction]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM transactions", [])?;
        let count = insert_all(&tx, txns)?;
        tx.commit()?;
        Ok(count)
    }

    pub(crate) fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions t WHERE t.id = ?1");
        Ok(self
            .conn
            .query_row(&sql, params![id], transaction_from_row)
            .optional()?)
    }

    /// Most recent first. `uncategorized_only` keeps rows without a category.
    pub(crate) fn get_transactions(
        &self,
        limit: Option<u32>,
        uncategorized_only: bool,
    ) -> Result<Vec<Transaction>> {
        let mut sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions t WHERE 1=1");
        if uncategorized_only {
            sql.push_str(" AND t.category_id IS NULL");
        }
        sql.push_str(" ORDER BY t.posted_at DESC, t.id DESC");
        if let Some(l) = limit {
            sql.push_str(&format!(" LIMIT {l}"));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], transaction_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn find_uncategorized(&self, limit: u32) -> Result<Vec<Transaction>> {
        self.get_transactions(Some(limit), true)
    }

    pub(crate) fn count_uncategorized(&self) -> Result<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM transactions WHERE category_id IS NULL",
            [],
            |row| row.get(0),
        )?)
    }

    /// Set (or clear, with `None`) one transaction's category. Returns the
    /// number of rows touched, 0 when the transaction does not exist.
    pub(crate) fn set_transaction_category(
        &self,
        transaction_id: i64,
        category_id: Option<i64>,
    ) -> Result<usize> {
        Ok(self.conn.execute(
            "UPDATE transactions SET category_id = ?1 WHERE id = ?2",
            params![category_id, transaction_id],
        )?)
    }

    /// Apply `(transaction_id, category_id)` pairs. Each guard is evaluated
    /// by SQLite at write time; the return value counts rows actually
    /// modified.
    pub(crate) fn update_transaction_categories(
        &mut self,
        updates: &[(i64, i64)],
        guard: CategoryGuard,
    ) -> Result<usize> {
        if updates.is_empty() {
            return Ok(0);
        }
        let sql = match guard {
            CategoryGuard::OnlyIfUncategorized => {
                "UPDATE transactions SET category_id = ?1 WHERE id = ?2 AND category_id IS NULL"
            }
            CategoryGuard::Overwrite => "UPDATE transactions SET category_id = ?1 WHERE id = ?2",
        };

        let tx = self.conn.transaction()?;
        let mut modified = 0;
        {
            let mut stmt = tx.prepare(sql)?;
            for (transaction_id, category_id) in updates {
                modified += stmt.execute(params![category_id, transaction_id])?;
            }
        }
        tx.commit()?;
        Ok(modified)
    }

    pub(crate) fn delete_transaction(&self, id: i64) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM transactions WHERE id = ?1", params![id])?)
    }

    // ── Categories ────────────────────────────────────────────

    pub(crate) fn get_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM categories ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: Some(row.get(0)?),
                name: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn get_category_by_id(&self, id: i64) -> Result<Option<Category>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name FROM categories WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Category {
                        id: Some(row.get(0)?),
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    /// Case-insensitive lookup that prefers an exact-case match.
    pub(crate) fn find_category_id(&self, name: &str) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id FROM categories WHERE name = ?1 COLLATE NOCASE
                 ORDER BY (name = ?1) DESC, id LIMIT 1",
                params![name],
                |row| row.get(0),
            )
            .optional()?)
    }

    #[cfg(test)]
    pub(crate) fn insert_category(&self, cat: &Category) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO categories (name, created_at) VALUES (?1, ?2)",
            params![cat.name, now_timestamp()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Resolve a category by name, creating it when nothing matches.
    /// Returns the id and whether this call created the row.
    pub(crate) fn find_or_create_category(&self, name: &str) -> Result<(i64, bool)> {
        if let Some(id) = self.find_category_id(name)? {
            return Ok((id, false));
        }
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO categories (name, created_at) VALUES (?1, ?2)",
            params![name, now_timestamp()],
        )?;
        let id = self
            .find_category_id(name)?
            .with_context(|| format!("Category '{name}' missing after insert"))?;
        Ok((id, inserted > 0))
    }

    // ── Suggestions ───────────────────────────────────────────

    #[cfg(test)]
    pub(crate) fn find_pending_suggestion(&self, transaction_id: i64) -> Result<Option<Suggestion>> {
        let sql = format!(
            "SELECT {SUGGESTION_COLUMNS} FROM suggestions
             WHERE transaction_id = ?1 AND status = 'pending'"
        );
        Ok(self
            .conn
            .query_row(&sql, params![transaction_id], suggestion_from_row)
            .optional()?)
    }

    /// Transactions that currently have a pending suggestion. Batched form
    /// of [`Self::find_pending_suggestion`], used by populate to skip covered
    /// transactions in one query.
    pub(crate) fn pending_transaction_ids(&self) -> Result<HashSet<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT transaction_id FROM suggestions WHERE status = 'pending'")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        Ok(rows.collect::<std::result::Result<HashSet<_>, _>>()?)
    }

    /// Insert a pending suggestion, or refresh the one already pending for
    /// the same transaction. The partial unique index on
    /// `(transaction_id) WHERE status = 'pending'` is the conflict target, so
    /// a concurrent writer can never produce a second pending row.
    pub(crate) fn upsert_pending_suggestion(&mut self, s: &Suggestion) -> Result<UpsertOutcome> {
        // Take the write lock before the existence check; a deferred
        // transaction cannot upgrade once another connection has committed.
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM suggestions WHERE transaction_id = ?1 AND status = 'pending')",
            params![s.transaction_id],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO suggestions
                 (transaction_id, suggested_category_id, score, source, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?5)
             ON CONFLICT(transaction_id) WHERE status = 'pending' DO UPDATE SET
                 suggested_category_id = excluded.suggested_category_id,
                 score = excluded.score,
                 source = excluded.source,
                 updated_at = excluded.updated_at",
            params![
                s.transaction_id,
                s.suggested_category_id,
                s.score,
                s.source.as_str(),
                s.created_at,
            ],
        )?;
        tx.commit()?;
        Ok(if exists {
            UpsertOutcome::Refreshed
        } else {
            UpsertOutcome::Created
        })
    }

    /// Pending suggestions of live transactions, optionally restricted to
    /// some of them. Suggestions left behind by a deleted transaction are
    /// never returned.
    pub(crate) fn get_pending_suggestions(
        &self,
        transaction_ids: Option<&[i64]>,
    ) -> Result<Vec<Suggestion>> {
        let mut sql = format!(
            "SELECT {SUGGESTION_COLUMNS} FROM suggestions
             WHERE status = 'pending' AND {LIVE_TRANSACTION}"
        );
        let ids = transaction_ids.unwrap_or_default();
        if transaction_ids.is_some() {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            sql.push_str(&format!(" AND transaction_id IN ({})", placeholders(ids.len())));
        }
        sql.push_str(" ORDER BY id");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(ids.iter()), suggestion_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Move pending suggestions of live transactions to `status`. Only rows
    /// still pending are touched, so repeating the call is a no-op.
    pub(crate) fn update_suggestion_status(
        &self,
        transaction_ids: Option<&[i64]>,
        status: SuggestionStatus,
    ) -> Result<usize> {
        let mut sql = format!(
            "UPDATE suggestions SET status = ?1, updated_at = ?2
             WHERE status = 'pending' AND {LIVE_TRANSACTION}"
        );
        let ids = transaction_ids.unwrap_or_default();
        if transaction_ids.is_some() {
            if ids.is_empty() {
                return Ok(0);
            }
            sql.push_str(&format!(
                " AND transaction_id IN ({})",
                placeholders_from(3, ids.len())
            ));
        }

        let mut values: Vec<rusqlite::types::Value> = vec![
            status.as_str().to_string().into(),
            now_timestamp().into(),
        ];
        values.extend(ids.iter().map(|id| rusqlite::types::Value::from(*id)));
        Ok(self.conn.execute(&sql, params_from_iter(values))?)
    }

    /// Same as [`Self::update_suggestion_status`] but keyed by suggestion id.
    pub(crate) fn update_suggestion_status_by_ids(
        &mut self,
        suggestion_ids: &[i64],
        status: SuggestionStatus,
    ) -> Result<usize> {
        if suggestion_ids.is_empty() {
            return Ok(0);
        }
        let now = now_timestamp();
        let tx = self.conn.transaction()?;
        let mut modified = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE suggestions SET status = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = 'pending'",
            )?;
            for id in suggestion_ids {
                modified += stmt.execute(params![status.as_str(), now, id])?;
            }
        }
        tx.commit()?;
        Ok(modified)
    }

    /// The review queue: pending suggestions joined with their transaction and
    /// category, best score first, then newest.
    pub(crate) fn list_pending_suggestions(&self, limit: u32) -> Result<Vec<PendingSuggestion>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.transaction_id, s.suggested_category_id, c.name, s.score, s.source,
                    t.merchant, t.raw_desc, t.amount_cents, t.posted_at, s.created_at
             FROM suggestions s
             JOIN transactions t ON t.id = s.transaction_id
             JOIN categories c ON c.id = s.suggested_category_id
             WHERE s.status = 'pending'
             ORDER BY s.score DESC, s.created_at DESC, s.id DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            let source: String = row.get(4)?;
            Ok(PendingSuggestion {
                transaction_id: row.get(0)?,
                suggested_category_id: row.get(1)?,
                suggested_category: row.get(2)?,
                score: row.get(3)?,
                source: parse_column(4, &source, SuggestionSource::parse)?,
                merchant: row.get(5)?,
                raw_desc: row.get(6)?,
                amount_cents: row.get(7)?,
                posted_at: row.get(8)?,
                created_at: row.get(9)?,
            })
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    #[cfg(test)]
    pub(crate) fn get_suggestions_for_transaction(
        &self,
        transaction_id: i64,
    ) -> Result<Vec<Suggestion>> {
        let sql = format!(
            "SELECT {SUGGESTION_COLUMNS} FROM suggestions WHERE transaction_id = ?1 ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![transaction_id], suggestion_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

fn insert_all(tx: &rusqlite::Transaction<'_>, txns: &[Transaction]) -> Result<usize> {
    let mut stmt = tx.prepare(
        "INSERT INTO transactions (posted_at, amount_cents, merchant, raw_desc, category_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    let mut count = 0;
    for txn in txns {
        count += stmt.execute(params![
            txn.posted_at,
            txn.amount_cents,
            txn.merchant,
            txn.raw_desc,
            txn.category_id,
            txn.created_at,
        ])?;
    }
    Ok(count)
}

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: Some(row.get(0)?),
        posted_at: row.get(1)?,
        amount_cents: row.get(2)?,
        merchant: row.get(3)?,
        raw_desc: row.get(4)?,
        category_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn suggestion_from_row(row: &Row<'_>) -> rusqlite::Result<Suggestion> {
    let source: String = row.get(4)?;
    let status: String = row.get(5)?;
    Ok(Suggestion {
        id: Some(row.get(0)?),
        transaction_id: row.get(1)?,
        suggested_category_id: row.get(2)?,
        score: row.get(3)?,
        source: parse_column(4, &source, SuggestionSource::parse)?,
        status: parse_column(5, &status, SuggestionStatus::parse)?,
        created_at: row.get(6)?,
    })
}

fn parse_column<T>(idx: usize, raw: &str, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    parse(raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unexpected value '{raw}'").into(),
        )
    })
}

fn placeholders(count: usize) -> String {
    placeholders_from(1, count)
}

fn placeholders_from(first: usize, count: usize) -> String {
    (first..first + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests;
