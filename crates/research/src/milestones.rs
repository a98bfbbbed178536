//! Milestone Detection
//!
//! A coarse, keyword-driven companion signal to the taxonomy-based progress
//! model. Six one-way flags per (user, subject), flipped by fixed phrase
//! patterns evaluated against the user's utterance alone, with no backend
//! round-trip. Deliberately heuristic: it may under- and over-trigger, and
//! it is never reconciled with the generative classifier.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The six one-way research milestones.
///
/// Every flag transitions false -> true at most once; nothing resets them
/// within the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneSet {
    #[serde(default)]
    pub explored_business: bool,
    #[serde(default)]
    pub explored_risks: bool,
    #[serde(default)]
    pub explored_valuation: bool,
    #[serde(default)]
    pub checked_news: bool,
    #[serde(default)]
    pub compared_peers: bool,
    #[serde(default)]
    pub weighed_decision: bool,
}

impl MilestoneSet {
    /// Number of flags currently set
    pub fn count(&self) -> usize {
        [
            self.explored_business,
            self.explored_risks,
            self.explored_valuation,
            self.checked_news,
            self.compared_peers,
            self.weighed_decision,
        ]
        .iter()
        .filter(|&&flag| flag)
        .count()
    }
}

/// Keyword matcher over user utterances, one pattern per flag.
///
/// Patterns are compiled once at construction and reused for every
/// utterance.
pub struct MilestoneDetector {
    business: Regex,
    risks: Regex,
    valuation: Regex,
    news: Regex,
    peers: Regex,
    decision: Regex,
}

impl MilestoneDetector {
    pub fn new() -> Self {
        Self {
            business: pattern(r"business model|make[s]? money|what (do|does) .* (do|sell)|revenue|products?|customers"),
            risks: pattern(r"\brisks?\b|downside|go wrong|bear case|threats?|worst case"),
            valuation: pattern(r"valuation|\bp/?e\b|price.to.(earnings|book|sales)|overvalued|undervalued|fair value|multiple[s]?|\bworth\b"),
            news: pattern(r"\bnews\b|headline|recent(ly)?|latest|announce(d|ment)|this (week|month|quarter)"),
            peers: pattern(r"competitor|peers?\b|compar(e|ed|ison)|\bversus\b|\bvs\.?\b|rival|industry leaders?"),
            decision: pattern(r"should i (buy|sell|invest)|decision|decide[d]?|conviction|my thesis|ready to (buy|invest|commit)"),
        }
    }

    /// Evaluate one utterance against all flags still unset.
    ///
    /// Returns the updated set only when at least one flag changed, so
    /// callers can skip the persistence write when nothing did. Set flags
    /// are never re-evaluated and never cleared.
    pub fn detect(&self, current: &MilestoneSet, utterance: &str) -> Option<MilestoneSet> {
        let mut next = *current;

        if !next.explored_business && self.business.is_match(utterance) {
            next.explored_business = true;
        }
        if !next.explored_risks && self.risks.is_match(utterance) {
            next.explored_risks = true;
        }
        if !next.explored_valuation && self.valuation.is_match(utterance) {
            next.explored_valuation = true;
        }
        if !next.checked_news && self.news.is_match(utterance) {
            next.checked_news = true;
        }
        if !next.compared_peers && self.peers.is_match(utterance) {
            next.compared_peers = true;
        }
        if !next.weighed_decision && self.decision.is_match(utterance) {
            next.weighed_decision = true;
        }

        if next == *current {
            None
        } else {
            Some(next)
        }
    }
}

impl Default for MilestoneDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn pattern(source: &str) -> Regex {
    Regex::new(&format!("(?i){}", source)).expect("valid milestone pattern")
}
