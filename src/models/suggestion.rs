use serde::Serialize;

/// Which classifier produced a suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    Heuristic,
    #[serde(rename = "openai")]
    OpenAi,
}

impl SuggestionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Heuristic => "heuristic",
            Self::OpenAi => "openai",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "heuristic" => Some(Self::Heuristic),
            "openai" => Some(Self::OpenAi),
            _ => None,
        }
    }
}

impl std::fmt::Display for SuggestionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle: `Pending` moves to `Accepted` or `Rejected`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Accepted,
    Rejected,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl std::fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Suggestion {
    pub id: Option<i64>,
    pub transaction_id: i64,
    pub suggested_category_id: i64,
    /// Confidence in [0, 1].
    pub score: f64,
    pub source: SuggestionSource,
    pub status: SuggestionStatus,
    pub created_at: String,
}

impl Suggestion {
    pub fn pending(
        transaction_id: i64,
        suggested_category_id: i64,
        score: f64,
        source: SuggestionSource,
    ) -> Self {
        Self {
            id: None,
            transaction_id,
            suggested_category_id,
            score: score.clamp(0.0, 1.0),
            source,
            status: SuggestionStatus::Pending,
            created_at: super::now_timestamp(),
        }
    }
}

/// A pending suggestion joined with its transaction and category, as shown
/// in the review queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSuggestion {
    pub transaction_id: i64,
    pub suggested_category_id: i64,
    pub suggested_category: String,
    pub score: f64,
    pub source: SuggestionSource,
    pub merchant: Option<String>,
    pub raw_desc: Option<String>,
    pub amount_cents: i64,
    pub posted_at: String,
    pub created_at: String,
}
