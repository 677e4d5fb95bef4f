//! Local classifiers. Both evaluate an ordered rule list against the
//! lowercased `merchant + " " + description` text and stop at the first
//! match; the order of the lists is the tie-break policy.

mod heuristic;
mod rules;

pub(crate) use heuristic::HeuristicScorer;
#[cfg(test)]
pub(crate) use heuristic::Scored;
pub(crate) use rules::RuleMatcher;

use regex::{Regex, RegexBuilder};

fn compile(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .ok()
}
