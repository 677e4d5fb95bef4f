use regex::Regex;
use serde::Serialize;

use crate::models::{match_text, SuggestionSource, Transaction};

/// Payroll-like wording on an inflow.
const STRONG_INCOME: &str =
    r"\b(payroll|salary|deposit|direct\s*deposit|adp|paychex|paycheque|paycheck)\b";
const STRONG_INCOME_SCORE: f64 = 0.95;

/// Keyword buckets, evaluated in order: (pattern, category, score).
const BUCKETS: &[(&str, &str, f64)] = &[
    (
        r"\b(walmart|costco|no ?frills|loblaw|superstore|metro|sobeys|freshco)\b",
        "Groceries",
        0.9,
    ),
    (
        r"\b(uber|lyft|presto|ttc|go transit|shell|petro canada|esso|bp|circle k)\b",
        "Transport",
        0.85,
    ),
    (
        r"\b(rogers|bell|telus|shaw|fido|koodo|hydro|enbridge|internet|water|electric|gas)\b",
        "Utilities",
        0.9,
    ),
    (
        r"\b(rent|landlord|property management|apt|apartment)\b",
        "Rent",
        0.9,
    ),
    (
        r"\b(starbucks|tim hortons|mcdonald|burger king|kfc|wendy|chipotle|subway|pizza|cafe|coffee)\b",
        "Food",
        0.85,
    ),
    (
        r"\b(amazon|best buy|ikea|indigo|canadian tire)\b",
        "Shopping",
        0.85,
    ),
    (
        r"\b(pharma|pharmacy|shoppers drug mart|dentist|clinic|optical|vision)\b",
        "Health",
        0.85,
    ),
    (
        r"\b(air canada|westjet|expedia|hotel|booking\.com|airbnb)\b",
        "Travel",
        0.85,
    ),
    (
        r"\b(fee|service charge|overdraft|nsf|interest)\b",
        "Fees",
        0.8,
    ),
    (
        r"\b(udemy|coursera|edx|university|college|tuition|textbook)\b",
        "Education",
        0.8,
    ),
    (
        r"\b(netflix|spotify|disney|prime video|youtube premium|hulu|crave)\b",
        "Entertainment",
        0.8,
    ),
];

const WEAK_INCOME: (&str, f64) = ("Income", 0.6);
const CATCH_ALL: (&str, f64) = ("Other", 0.55);

/// A definite category with a confidence score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct Scored {
    pub(crate) category: &'static str,
    pub(crate) score: f64,
    pub(crate) source: SuggestionSource,
}

impl Scored {
    fn heuristic(category: &'static str, score: f64) -> Self {
        Self {
            category,
            score,
            source: SuggestionSource::Heuristic,
        }
    }
}

/// Confidence-weighted keyword classifier. Unlike [`super::RuleMatcher`] it
/// always produces an answer.
pub(crate) struct HeuristicScorer {
    strong_income: Option<Regex>,
    buckets: Vec<Bucket>,
}

struct Bucket {
    regex: Regex,
    category: &'static str,
    score: f64,
}

impl HeuristicScorer {
    pub(crate) fn new() -> Self {
        let buckets = BUCKETS
            .iter()
            .filter_map(|&(pattern, category, score)| {
                super::compile(pattern).map(|regex| Bucket {
                    regex,
                    category,
                    score,
                })
            })
            .collect();
        Self {
            strong_income: super::compile(STRONG_INCOME),
            buckets,
        }
    }

    pub(crate) fn score(
        &self,
        merchant: Option<&str>,
        raw_desc: Option<&str>,
        amount_cents: i64,
    ) -> Scored {
        let text = match_text(merchant, raw_desc);

        if amount_cents > 0
            && self
                .strong_income
                .as_ref()
                .is_some_and(|re| re.is_match(&text))
        {
            return Scored::heuristic("Income", STRONG_INCOME_SCORE);
        }

        for bucket in &self.buckets {
            if bucket.regex.is_match(&text) {
                return Scored::heuristic(bucket.category, bucket.score);
            }
        }

        let (category, score) = if amount_cents > 0 {
            WEAK_INCOME
        } else {
            CATCH_ALL
        };
        Scored::heuristic(category, score)
    }

    pub(crate) fn score_transaction(&self, txn: &Transaction) -> Scored {
        self.score(
            txn.merchant.as_deref(),
            txn.raw_desc.as_deref(),
            txn.amount_cents,
        )
    }

    #[cfg(test)]
    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    #[cfg(test)]
    pub(crate) fn has_income_pattern(&self) -> bool {
        self.strong_income.is_some()
    }
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(super) const BUCKET_COUNT: usize = BUCKETS.len();
