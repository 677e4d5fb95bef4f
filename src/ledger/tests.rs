#![allow(clippy::unwrap_used)]

use super::*;
use rust_decimal_macros::dec;

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
}

fn entry(date: Option<&str>, amount: &str) -> NewTransaction {
    NewTransaction {
        date: date.map(String::from),
        amount: amount.into(),
        merchant: Some("Corner Store".into()),
        ..NewTransaction::default()
    }
}

fn is_validation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<FinsortError>(),
        Some(FinsortError::Validation(_))
    )
}

fn is_not_found(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<FinsortError>(),
        Some(FinsortError::NotFound(_))
    )
}

// ── Parsing ───────────────────────────────────────────────────

#[test]
fn test_parse_amount_cents() {
    assert_eq!(parse_amount_cents("-12.34").unwrap(), -1234);
    assert_eq!(parse_amount_cents("$-12.34").unwrap(), -1234);
    assert_eq!(parse_amount_cents("1,200.00").unwrap(), 120_000);
    assert_eq!(parse_amount_cents(" 7 ").unwrap(), 700);
    assert_eq!(parse_amount_cents("(45.10)").unwrap(), -4510);
}

#[test]
fn test_parse_amount_rounds_to_cents() {
    let cases = [
        ("12.345", dec!(12.35)),
        ("-12.345", dec!(-12.35)),
        ("0.005", dec!(0.01)),
        ("99.994", dec!(99.99)),
    ];
    for (input, expected) in cases {
        let cents = parse_amount_cents(input).unwrap();
        assert_eq!(Decimal::from(cents) / dec!(100), expected, "{input}");
    }
}

#[test]
fn test_parse_amount_rejects() {
    for input in ["", "   ", "abc", "0", "0.00", "-0.004", "12.3.4", "$"] {
        let err = parse_amount_cents(input).unwrap_err();
        assert!(matches!(err, FinsortError::Validation(_)), "{input}");
    }
}

#[test]
fn test_parse_date() {
    assert_eq!(parse_date("2024-02-29").unwrap(), day("2024-02-29"));
    assert_eq!(parse_date(" 2024-01-05 ").unwrap(), day("2024-01-05"));
    assert!(parse_date("2023-02-29").is_err());
    assert!(parse_date("01/05/2024").is_err());
    assert!(parse_date("yesterday").is_err());
}

// ── Manual entry ──────────────────────────────────────────────

#[test]
fn test_add_transaction() {
    let db = Database::open_in_memory().unwrap();
    let id = add_transaction(&db, &entry(Some("2024-03-01"), "-12.34"), day("2024-03-10")).unwrap();

    let t = db.get_transaction(id).unwrap().unwrap();
    assert_eq!(t.posted_at, "2024-03-01");
    assert_eq!(t.amount_cents, -1234);
    assert_eq!(t.merchant.as_deref(), Some("Corner Store"));
    assert_eq!(t.category_id, None);
}

#[test]
fn test_add_transaction_defaults_to_today() {
    let db = Database::open_in_memory().unwrap();
    let id = add_transaction(&db, &entry(None, "50"), day("2024-03-10")).unwrap();
    assert_eq!(db.get_transaction(id).unwrap().unwrap().posted_at, "2024-03-10");

    let id = add_transaction(&db, &entry(Some("  "), "50"), day("2024-03-11")).unwrap();
    assert_eq!(db.get_transaction(id).unwrap().unwrap().posted_at, "2024-03-11");
}

#[test]
fn test_add_transaction_validation_writes_nothing() {
    let db = Database::open_in_memory().unwrap();
    let err = add_transaction(&db, &entry(Some("2024-13-01"), "-1"), day("2024-03-10")).unwrap_err();
    assert!(is_validation(&err));

    let err = add_transaction(&db, &entry(None, "0.001"), day("2024-03-10")).unwrap_err();
    assert!(is_validation(&err));

    assert!(db.get_transactions(None, false).unwrap().is_empty());
}

#[test]
fn test_add_transaction_with_category() {
    let db = Database::open_in_memory().unwrap();
    let food = db.find_category_id("Food").unwrap().unwrap();

    let mut input = entry(None, "-9.99");
    input.category_id = Some(food);
    let id = add_transaction(&db, &input, day("2024-03-10")).unwrap();
    assert_eq!(db.get_transaction(id).unwrap().unwrap().category_id, Some(food));

    input.category_id = Some(9_999);
    let err = add_transaction(&db, &input, day("2024-03-10")).unwrap_err();
    assert!(is_not_found(&err));
}

// ── Manual categorization ─────────────────────────────────────

#[test]
fn test_set_and_clear_category() {
    let db = Database::open_in_memory().unwrap();
    let id = add_transaction(&db, &entry(None, "-5"), day("2024-03-10")).unwrap();
    let rent = db.find_category_id("Rent").unwrap().unwrap();

    set_category(&db, id, Some(rent)).unwrap();
    assert_eq!(db.get_transaction(id).unwrap().unwrap().category_id, Some(rent));

    set_category(&db, id, None).unwrap();
    assert_eq!(db.get_transaction(id).unwrap().unwrap().category_id, None);
}

#[test]
fn test_set_category_not_found() {
    let db = Database::open_in_memory().unwrap();
    let id = add_transaction(&db, &entry(None, "-5"), day("2024-03-10")).unwrap();
    let rent = db.find_category_id("Rent").unwrap().unwrap();

    assert!(is_not_found(&set_category(&db, 9_999, Some(rent)).unwrap_err()));
    assert!(is_not_found(&set_category(&db, 9_999, None).unwrap_err()));
    assert!(is_not_found(&set_category(&db, id, Some(9_999)).unwrap_err()));
}

#[test]
fn test_delete_transaction() {
    let db = Database::open_in_memory().unwrap();
    let id = add_transaction(&db, &entry(None, "-5"), day("2024-03-10")).unwrap();

    delete_transaction(&db, id).unwrap();
    assert!(db.get_transaction(id).unwrap().is_none());
    assert!(is_not_found(&delete_transaction(&db, id).unwrap_err()));
}

// ── Setup and seed ────────────────────────────────────────────

#[test]
fn test_setup_categories_idempotent() {
    let mut db = Database::open_in_memory().unwrap();
    assert_eq!(setup_categories(&mut db).unwrap(), 0);
    assert_eq!(
        db.get_categories().unwrap().len(),
        crate::models::Category::defaults().len()
    );
}

#[test]
fn test_seed_demo_replaces_transactions() {
    let mut db = Database::open_in_memory().unwrap();
    add_transaction(&db, &entry(None, "-5"), day("2024-03-10")).unwrap();

    assert_eq!(seed_demo(&mut db, day("2024-03-10")).unwrap(), 5);
    let txns = db.get_transactions(None, false).unwrap();
    assert_eq!(txns.len(), 5);

    // Most recent first: 2 days ago down to 8 days ago
    assert_eq!(txns[0].posted_at, "2024-03-08");
    assert_eq!(txns[0].merchant.as_deref(), Some("UBER *TRIP"));
    assert_eq!(txns[4].posted_at, "2024-03-02");
    assert_eq!(txns[4].amount_cents, -4599);
    assert!(txns.iter().all(|t| t.category_id.is_none()));
    assert_eq!(txns.iter().filter(|t| t.is_income()).count(), 1);
}
