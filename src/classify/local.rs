use regex::Regex;

use super::Assignment;
use crate::models::Transaction;

/// Keyword rules for the offline stand-in. A rule only fires when its
/// category is in the allowed set.
const LOCAL_RULES: &[(&str, &str)] = &[
    (r"uber|lyft|presto|ttc|go transit", "Transport"),
    (
        r"walmart|costco|loblaws|no frills|aldi|kroger|sobeys",
        "Groceries",
    ),
    (
        r"rogers|bell|telus|internet|wifi|hydro|electric|water",
        "Utilities",
    ),
    (r"chipotle|mcd|kfc|pizza|subway|starbucks|coffee", "Food"),
];

/// Deterministic replacement for the external classifier, used in mock,
/// no-key and quota-fallback modes.
pub(super) struct LocalClassifier {
    rules: Vec<(Regex, &'static str)>,
}

impl LocalClassifier {
    pub(super) fn new() -> Self {
        let rules = LOCAL_RULES
            .iter()
            .filter_map(|&(pattern, category)| Regex::new(pattern).ok().map(|re| (re, category)))
            .collect();
        Self { rules }
    }

    /// One assignment per transaction, unless `allowed` is empty and there
    /// is nothing to pick from.
    pub(super) fn classify(&self, batch: &[&Transaction], allowed: &[String]) -> Vec<Assignment> {
        batch
            .iter()
            .filter_map(|txn| {
                let transaction_id = txn.id?;
                let category = self.pick(txn, allowed)?;
                Some(Assignment {
                    transaction_id,
                    category,
                })
            })
            .collect()
    }

    fn pick(&self, txn: &Transaction, allowed: &[String]) -> Option<String> {
        let has = |name: &str| allowed.iter().any(|a| a == name);

        if txn.is_income() && has("Income") {
            return Some("Income".to_string());
        }

        let text = txn.match_text();
        for (regex, category) in &self.rules {
            if regex.is_match(&text) && has(category) {
                return Some(category.to_string());
            }
        }

        if has("Other") {
            return Some("Other".to_string());
        }
        allowed.first().cloned()
    }

    #[cfg(test)]
    pub(super) fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
pub(super) const LOCAL_RULE_COUNT: usize = LOCAL_RULES.len();
