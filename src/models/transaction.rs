#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: Option<i64>,
    /// Format: "YYYY-MM-DD"
    pub posted_at: String,
    /// Signed minor units: positive = inflow, negative = outflow. Never zero.
    pub amount_cents: i64,
    pub merchant: Option<String>,
    pub raw_desc: Option<String>,
    pub category_id: Option<i64>,
    pub created_at: String,
}

impl Transaction {
    pub fn new(
        posted_at: String,
        amount_cents: i64,
        merchant: Option<String>,
        raw_desc: Option<String>,
    ) -> Self {
        Self {
            id: None,
            posted_at,
            amount_cents,
            merchant: merchant.filter(|m| !m.trim().is_empty()),
            raw_desc: raw_desc.filter(|d| !d.trim().is_empty()),
            category_id: None,
            created_at: super::now_timestamp(),
        }
    }

    pub fn is_income(&self) -> bool {
        self.amount_cents > 0
    }

    pub fn is_categorized(&self) -> bool {
        self.category_id.is_some()
    }

    /// Merchant and description joined and lowercased, the text every
    /// classifier matches against.
    pub fn match_text(&self) -> String {
        match_text(self.merchant.as_deref(), self.raw_desc.as_deref())
    }
}

pub fn match_text(merchant: Option<&str>, raw_desc: Option<&str>) -> String {
    format!("{} {}", merchant.unwrap_or(""), raw_desc.unwrap_or("")).to_lowercase()
}
