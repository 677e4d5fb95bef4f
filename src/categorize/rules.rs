use regex::Regex;

use crate::models::{match_text, Transaction};

/// Declaration order is evaluation order. "uber|lyft" deliberately sits
/// ahead of "uber eats", so Uber Eats files under Transport.
const RULES: &[(&str, &str)] = &[
    (r"uber|lyft", "Transport"),
    (
        r"chipotle|mcd|kfc|tim\s*h?ortons|burger|pizza|subway|starbucks|coffee",
        "Food",
    ),
    (r"walmart|costco|no\s*frills|loblaws|sobeys|aldi|kroger", "Groceries"),
    (
        r"rogers|bell|telus|verizon|comcast|internet|wifi|vodafone|at&t|hydro|electric|water",
        "Utilities",
    ),
    (
        r"payroll|salary|payche?ck|direct\s*deposit|stripe\s*payout",
        "Income",
    ),
    (
        r"netflix|spotify|disney|prime\s*video|youtube\s*premium|hulu",
        "Entertainment",
    ),
    (r"apple|best\s*buy|amazon", "Shopping"),
    (r"uber\s*eats|doordash|skip\s*the\s*dishes", "Food"),
    (
        r"tuition|udemy|coursera|udacity|school|university",
        "Education",
    ),
    (
        r"pharmacy|drug|shoppers|walgreens|rite\s*aid|health|dent(ist|al)",
        "Health",
    ),
    (
        r"air\s*canada|delta|airlines|hotel|airbnb|booking\.com|expedia",
        "Travel",
    ),
    (r"rent|landlord|property\s*management", "Rent"),
    (r"fee|fees|service\s*charge|overdraft|nsf", "Fees"),
];

/// Category used when nothing matches but money came in.
const INCOME_FALLBACK: &str = "Income";

/// Plain first-match-wins regex classifier. May decline to answer.
pub(crate) struct RuleMatcher {
    rules: Vec<CompiledRule>,
}

struct CompiledRule {
    regex: Regex,
    category: &'static str,
}

impl RuleMatcher {
    pub(crate) fn new() -> Self {
        let rules = RULES
            .iter()
            .filter_map(|&(pattern, category)| {
                super::compile(pattern).map(|regex| CompiledRule { regex, category })
            })
            .collect();
        Self { rules }
    }

    pub(crate) fn classify(
        &self,
        merchant: Option<&str>,
        raw_desc: Option<&str>,
        amount_cents: i64,
    ) -> Option<&'static str> {
        let text = match_text(merchant, raw_desc);

        for rule in &self.rules {
            if rule.regex.is_match(&text) {
                return Some(rule.category);
            }
        }

        if amount_cents > 0 {
            return Some(INCOME_FALLBACK);
        }
        None
    }

    pub(crate) fn classify_transaction(&self, txn: &Transaction) -> Option<&'static str> {
        self.classify(
            txn.merchant.as_deref(),
            txn.raw_desc.as_deref(),
            txn.amount_cents,
        )
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.rules.len()
    }
}

impl Default for RuleMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(super) const RULE_COUNT: usize = RULES.len();
