pub(crate) const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id         INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS transactions (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    posted_at    TEXT NOT NULL,
    amount_cents INTEGER NOT NULL CHECK (amount_cents != 0),
    merchant     TEXT,
    raw_desc     TEXT,
    category_id  INTEGER REFERENCES categories(id),
    created_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_transactions_posted ON transactions(posted_at);
CREATE INDEX IF NOT EXISTS idx_transactions_category ON transactions(category_id);

-- transaction_id and suggested_category_id are weak references: no foreign
-- keys, nothing cascades.
CREATE TABLE IF NOT EXISTS suggestions (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    transaction_id        INTEGER NOT NULL,
    suggested_category_id INTEGER NOT NULL,
    score                 REAL NOT NULL CHECK (score >= 0 AND score <= 1),
    source                TEXT NOT NULL CHECK (source IN ('heuristic', 'openai')),
    status                TEXT NOT NULL DEFAULT 'pending'
                          CHECK (status IN ('pending', 'accepted', 'rejected')),
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_suggestions_transaction ON suggestions(transaction_id);
CREATE INDEX IF NOT EXISTS idx_suggestions_status ON suggestions(status);
CREATE UNIQUE INDEX IF NOT EXISTS idx_suggestions_one_pending
    ON suggestions(transaction_id) WHERE status = 'pending';

"#;

pub(crate) const CURRENT_VERSION: i32 = 1;

/// Migrations from version N to N+1.
/// Each entry is (from_version, sql).
pub(crate) const MIGRATIONS: &[(i32, &str)] = &[];
