#![allow(clippy::unwrap_used)]

use super::*;

fn txn(date: &str, amount_cents: i64, merchant: &str) -> Transaction {
    Transaction::new(date.into(), amount_cents, Some(merchant.into()), None)
}

fn setup_test_data(db: &mut Database) -> Vec<i64> {
    let txns = vec![
        txn("2024-01-10", -525, "STARBUCKS #123"),
        txn("2024-01-15", -4299, "AMZN MKTP US"),
        txn("2024-01-20", 300_000, "ACME CORP PAYROLL"),
        txn("2024-02-05", -8730, "WHOLE FOODS #456"),
    ];
    txns.iter()
        .map(|t| db.insert_transaction(t).unwrap())
        .collect()
}

fn category_id(db: &Database, name: &str) -> i64 {
    db.find_category_id(name).unwrap().unwrap()
}

// ── Default data ──────────────────────────────────────────────

#[test]
fn test_default_categories_seeded() {
    let db = Database::open_in_memory().unwrap();
    let cats = db.get_categories().unwrap();
    assert_eq!(cats.len(), Category::defaults().len());
    assert!(cats.iter().any(|c| c.name == "Income"));
    assert!(cats.iter().any(|c| c.name == "Other"));
}

#[test]
fn test_ensure_default_categories_idempotent() {
    let mut db = Database::open_in_memory().unwrap();
    assert_eq!(db.ensure_default_categories().unwrap(), 0);

    db.insert_category(&Category::new("Pets".into())).unwrap();
    assert_eq!(db.ensure_default_categories().unwrap(), 0);
    assert_eq!(
        db.get_categories().unwrap().len(),
        Category::defaults().len() + 1
    );
}

#[test]
fn test_file_database_reopens_without_reseeding() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("finsort.db");
    {
        let db = Database::open(&path).unwrap();
        db.insert_transaction(&txn("2024-03-01", -100, "Shop")).unwrap();
    }
    let db = Database::open(&path).unwrap();
    assert_eq!(db.get_categories().unwrap().len(), Category::defaults().len());
    assert_eq!(db.get_transactions(None, false).unwrap().len(), 1);
}

// ── Transactions ──────────────────────────────────────────────

#[test]
fn test_transaction_insert_and_get() {
    let db = Database::open_in_memory().unwrap();
    let t = Transaction::new(
        "2024-01-15".into(),
        -1899,
        Some("UBER *TRIP".into()),
        Some("UBER HELP".into()),
    );
    let id = db.insert_transaction(&t).unwrap();
    assert!(id > 0);

    let fetched = db.get_transaction(id).unwrap().unwrap();
    assert_eq!(fetched.id, Some(id));
    assert_eq!(fetched.amount_cents, -1899);
    assert_eq!(fetched.merchant.as_deref(), Some("UBER *TRIP"));
    assert_eq!(fetched.raw_desc.as_deref(), Some("UBER HELP"));
    assert!(fetched.category_id.is_none());
}

#[test]
fn test_transaction_not_found() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.get_transaction(99999).unwrap().is_none());
}

#[test]
fn test_zero_amount_rejected_by_schema() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.insert_transaction(&txn("2024-01-01", 0, "Nothing")).is_err());
}

#[test]
fn test_transactions_most_recent_first() {
    let mut db = Database::open_in_memory().unwrap();
    setup_test_data(&mut db);

    let all = db.get_transactions(None, false).unwrap();
    let dates: Vec<&str> = all.iter().map(|t| t.posted_at.as_str()).collect();
    assert_eq!(dates, ["2024-02-05", "2024-01-20", "2024-01-15", "2024-01-10"]);
}

#[test]
fn test_same_day_ties_broken_by_newest_id() {
    let db = Database::open_in_memory().unwrap();
    let first = db.insert_transaction(&txn("2024-01-01", -100, "A")).unwrap();
    let second = db.insert_transaction(&txn("2024-01-01", -200, "B")).unwrap();

    let all = db.get_transactions(None, false).unwrap();
    assert_eq!(all[0].id, Some(second));
    assert_eq!(all[1].id, Some(first));
}

#[test]
fn test_find_uncategorized_respects_limit_and_filter() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    let food = category_id(&db, "Food");
    db.set_transaction_category(ids[3], Some(food)).unwrap();

    let uncat = db.find_uncategorized(10).unwrap();
    assert_eq!(uncat.len(), 3);
    assert!(uncat.iter().all(|t| t.category_id.is_none()));
    assert_eq!(uncat[0].posted_at, "2024-01-20");

    assert_eq!(db.find_uncategorized(2).unwrap().len(), 2);
    assert_eq!(db.count_uncategorized().unwrap(), 3);
}

#[test]
fn test_batch_insert_and_replace() {
    let mut db = Database::open_in_memory().unwrap();
    setup_test_data(&mut db);

    let batch = vec![txn("2024-05-01", -100, "A"), txn("2024-05-02", 200, "B")];
    assert_eq!(db.insert_transactions_batch(&batch).unwrap(), 2);
    assert_eq!(db.get_transactions(None, false).unwrap().len(), 6);

    assert_eq!(db.replace_transactions(&batch).unwrap(), 2);
    assert_eq!(db.get_transactions(None, false).unwrap().len(), 2);
}

#[test]
fn test_set_and_clear_category() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    let food = category_id(&db, "Food");

    assert_eq!(db.set_transaction_category(ids[0], Some(food)).unwrap(), 1);
    assert_eq!(db.get_transaction(ids[0]).unwrap().unwrap().category_id, Some(food));

    assert_eq!(db.set_transaction_category(ids[0], None).unwrap(), 1);
    assert!(db.get_transaction(ids[0]).unwrap().unwrap().category_id.is_none());

    assert_eq!(db.set_transaction_category(99999, Some(food)).unwrap(), 0);
}

#[test]
fn test_set_category_rejects_unknown_category() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    assert!(db.set_transaction_category(ids[0], Some(99999)).is_err());
}

#[test]
fn test_guarded_update_skips_categorized() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    let food = category_id(&db, "Food");
    let fees = category_id(&db, "Fees");
    db.set_transaction_category(ids[0], Some(fees)).unwrap();

    let modified = db
        .update_transaction_categories(
            &[(ids[0], food), (ids[1], food)],
            CategoryGuard::OnlyIfUncategorized,
        )
        .unwrap();
    assert_eq!(modified, 1);
    assert_eq!(db.get_transaction(ids[0]).unwrap().unwrap().category_id, Some(fees));
    assert_eq!(db.get_transaction(ids[1]).unwrap().unwrap().category_id, Some(food));
}

#[test]
fn test_overwrite_update_replaces_category() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    let food = category_id(&db, "Food");
    let fees = category_id(&db, "Fees");
    db.set_transaction_category(ids[0], Some(fees)).unwrap();

    let modified = db
        .update_transaction_categories(&[(ids[0], food), (99999, food)], CategoryGuard::Overwrite)
        .unwrap();
    assert_eq!(modified, 1);
    assert_eq!(db.get_transaction(ids[0]).unwrap().unwrap().category_id, Some(food));
}

#[test]
fn test_update_empty_batch() {
    let mut db = Database::open_in_memory().unwrap();
    assert_eq!(
        db.update_transaction_categories(&[], CategoryGuard::Overwrite)
            .unwrap(),
        0
    );
}

#[test]
fn test_delete_transaction() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    assert_eq!(db.delete_transaction(ids[0]).unwrap(), 1);
    assert_eq!(db.delete_transaction(ids[0]).unwrap(), 0);
    assert_eq!(db.get_transactions(None, false).unwrap().len(), 3);
}

// ── Categories ────────────────────────────────────────────────

#[test]
fn test_find_category_case_insensitive() {
    let db = Database::open_in_memory().unwrap();
    let food = category_id(&db, "Food");
    assert_eq!(db.find_category_id("food").unwrap(), Some(food));
    assert_eq!(db.find_category_id("FOOD").unwrap(), Some(food));
    assert_eq!(db.find_category_id("Pets").unwrap(), None);
}

#[test]
fn test_find_category_prefers_exact_case() {
    let db = Database::open_in_memory().unwrap();
    let lower = db.insert_category(&Category::new("pets".into())).unwrap();
    let upper = db.insert_category(&Category::new("Pets".into())).unwrap();
    assert_eq!(db.find_category_id("Pets").unwrap(), Some(upper));
    assert_eq!(db.find_category_id("pets").unwrap(), Some(lower));
}

#[test]
fn test_find_or_create_category() {
    let db = Database::open_in_memory().unwrap();

    let (id, created) = db.find_or_create_category("Pets").unwrap();
    assert!(created);
    let (again, created) = db.find_or_create_category("pets").unwrap();
    assert!(!created);
    assert_eq!(id, again);

    let (income, created) = db.find_or_create_category("income").unwrap();
    assert!(!created);
    assert_eq!(db.get_category_by_id(income).unwrap().unwrap().name, "Income");
}

#[test]
fn test_category_by_id_not_found() {
    let db = Database::open_in_memory().unwrap();
    assert!(db.get_category_by_id(99999).unwrap().is_none());
}

// ── Suggestions ───────────────────────────────────────────────

#[test]
fn test_upsert_creates_then_refreshes() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    let food = category_id(&db, "Food");
    let other = category_id(&db, "Other");

    let first = Suggestion::pending(ids[0], food, 0.85, SuggestionSource::Heuristic);
    assert_eq!(db.upsert_pending_suggestion(&first).unwrap(), UpsertOutcome::Created);

    let second = Suggestion::pending(ids[0], other, 0.55, SuggestionSource::OpenAi);
    assert_eq!(db.upsert_pending_suggestion(&second).unwrap(), UpsertOutcome::Refreshed);

    let all = db.get_suggestions_for_transaction(ids[0]).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].suggested_category_id, other);
    assert_eq!(all[0].source, SuggestionSource::OpenAi);
    assert_eq!(all[0].status, SuggestionStatus::Pending);
}

#[test]
fn test_unique_index_rejects_second_pending_row() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    let food = category_id(&db, "Food");
    let s = Suggestion::pending(ids[0], food, 0.9, SuggestionSource::Heuristic);
    db.upsert_pending_suggestion(&s).unwrap();

    let raw = db.conn.execute(
        "INSERT INTO suggestions (transaction_id, suggested_category_id, score, source, status, created_at, updated_at)
         VALUES (?1, ?2, 0.5, 'heuristic', 'pending', '', '')",
        params![ids[0], food],
    );
    assert!(raw.is_err());
}

#[test]
fn test_new_pending_allowed_after_resolution() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    let food = category_id(&db, "Food");
    let s = Suggestion::pending(ids[0], food, 0.9, SuggestionSource::Heuristic);
    db.upsert_pending_suggestion(&s).unwrap();
    db.update_suggestion_status(Some(&[ids[0]]), SuggestionStatus::Rejected)
        .unwrap();

    assert_eq!(db.upsert_pending_suggestion(&s).unwrap(), UpsertOutcome::Created);
    let all = db.get_suggestions_for_transaction(ids[0]).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(
        all.iter()
            .filter(|s| s.status == SuggestionStatus::Pending)
            .count(),
        1
    );
}

#[test]
fn test_find_pending_suggestion() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    let food = category_id(&db, "Food");
    assert!(db.find_pending_suggestion(ids[0]).unwrap().is_none());

    let s = Suggestion::pending(ids[0], food, 0.85, SuggestionSource::Heuristic);
    db.upsert_pending_suggestion(&s).unwrap();
    let found = db.find_pending_suggestion(ids[0]).unwrap().unwrap();
    assert_eq!(found.suggested_category_id, food);
    assert!((found.score - 0.85).abs() < f64::EPSILON);

    assert_eq!(db.pending_transaction_ids().unwrap().len(), 1);
    assert!(db.pending_transaction_ids().unwrap().contains(&ids[0]));
}

#[test]
fn test_status_update_only_touches_pending() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    let food = category_id(&db, "Food");
    for id in &ids[..3] {
        let s = Suggestion::pending(*id, food, 0.8, SuggestionSource::Heuristic);
        db.upsert_pending_suggestion(&s).unwrap();
    }

    let n = db
        .update_suggestion_status(Some(&[ids[0], 99999]), SuggestionStatus::Rejected)
        .unwrap();
    assert_eq!(n, 1);

    assert_eq!(
        db.update_suggestion_status(None, SuggestionStatus::Accepted)
            .unwrap(),
        2
    );
    assert_eq!(
        db.update_suggestion_status(None, SuggestionStatus::Accepted)
            .unwrap(),
        0
    );
    assert_eq!(
        db.update_suggestion_status(Some(&[]), SuggestionStatus::Rejected)
            .unwrap(),
        0
    );
    assert_eq!(
        db.get_suggestions_for_transaction(ids[0]).unwrap()[0].status,
        SuggestionStatus::Rejected
    );
}

#[test]
fn test_status_update_by_suggestion_ids() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    let food = category_id(&db, "Food");
    let s = Suggestion::pending(ids[0], food, 0.8, SuggestionSource::Heuristic);
    db.upsert_pending_suggestion(&s).unwrap();

    let pending = db.get_pending_suggestions(None).unwrap();
    let sids: Vec<i64> = pending.iter().filter_map(|s| s.id).collect();
    assert_eq!(
        db.update_suggestion_status_by_ids(&sids, SuggestionStatus::Accepted)
            .unwrap(),
        1
    );
    assert_eq!(
        db.update_suggestion_status_by_ids(&sids, SuggestionStatus::Rejected)
            .unwrap(),
        0
    );
    assert!(db.get_pending_suggestions(None).unwrap().is_empty());
}

#[test]
fn test_get_pending_suggestions_filtered() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    let food = category_id(&db, "Food");
    for id in &ids {
        let s = Suggestion::pending(*id, food, 0.8, SuggestionSource::Heuristic);
        db.upsert_pending_suggestion(&s).unwrap();
    }

    assert_eq!(db.get_pending_suggestions(None).unwrap().len(), 4);
    let some = db.get_pending_suggestions(Some(&[ids[1], ids[2]])).unwrap();
    assert_eq!(some.len(), 2);
    assert!(db.get_pending_suggestions(Some(&[])).unwrap().is_empty());
}

#[test]
fn test_list_pending_ordering_and_join() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    let food = category_id(&db, "Food");
    let income = category_id(&db, "Income");

    db.upsert_pending_suggestion(&Suggestion::pending(ids[0], food, 0.6, SuggestionSource::Heuristic))
        .unwrap();
    db.upsert_pending_suggestion(&Suggestion::pending(ids[2], income, 0.95, SuggestionSource::Heuristic))
        .unwrap();
    db.upsert_pending_suggestion(&Suggestion::pending(ids[1], food, 0.6, SuggestionSource::OpenAi))
        .unwrap();

    let rows = db.list_pending_suggestions(500).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].transaction_id, ids[2]);
    assert_eq!(rows[0].suggested_category, "Income");
    assert_eq!(rows[0].amount_cents, 300_000);
    // Equal scores: newest suggestion first
    assert_eq!(rows[1].transaction_id, ids[1]);
    assert_eq!(rows[1].source, SuggestionSource::OpenAi);
    assert_eq!(rows[2].transaction_id, ids[0]);

    assert_eq!(db.list_pending_suggestions(1).unwrap().len(), 1);
}

#[test]
fn test_list_pending_hides_deleted_transactions() {
    let mut db = Database::open_in_memory().unwrap();
    let ids = setup_test_data(&mut db);
    let food = category_id(&db, "Food");
    db.upsert_pending_suggestion(&Suggestion::pending(ids[0], food, 0.8, SuggestionSource::Heuristic))
        .unwrap();

    db.delete_transaction(ids[0]).unwrap();
    assert!(db.list_pending_suggestions(500).unwrap().is_empty());
    // The suggestion row itself is a weak reference and survives
    assert_eq!(db.get_suggestions_for_transaction(ids[0]).unwrap().len(), 1);
}

#[test]
fn test_placeholders() {
    assert_eq!(placeholders(3), "?1,?2,?3");
    assert_eq!(placeholders_from(3, 2), "?3,?4");
}
