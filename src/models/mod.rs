mod category;
mod suggestion;
mod transaction;

pub use category::Category;
pub use suggestion::{PendingSuggestion, Suggestion, SuggestionSource, SuggestionStatus};
pub use transaction::{match_text, Transaction};

/// RFC 3339 timestamp with fixed microsecond precision, so stored values
/// order correctly as plain text.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}
