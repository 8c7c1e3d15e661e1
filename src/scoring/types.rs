use std::collections::BTreeMap;
use std::fmt;

use crate::pricing::odds::format_american;
use crate::pricing::types::BetKey;

/// Where a bet's closing price came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClosingSource {
    /// No-vig consensus across the allowed books.
    Consensus,
    /// Raw quote from the book the bet was placed at.
    ExactBook(String),
    /// Raw quote from another book offering the same market and label.
    OtherBook(String),
}

impl fmt::Display for ClosingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClosingSource::Consensus => write!(f, "consensus"),
            ClosingSource::ExactBook(book) => write!(f, "book:{}", book),
            ClosingSource::OtherBook(book) => write!(f, "fallback:{}", book),
        }
    }
}

/// A scored bet, ready to write back.
#[derive(Debug, Clone, PartialEq)]
pub struct ClvScore {
    pub bet_id: String,
    pub event_id: String,
    pub key: BetKey,
    pub entry_probability: f64,
    pub closing_probability: f64,
    pub closing_odds: i32,
    pub clv_pct: f64,
    pub source: ClosingSource,
    pub books: Vec<String>,
}

impl ClvScore {
    /// "Closing Line" cell text.
    pub fn closing_line(&self) -> String {
        format_american(self.closing_odds)
    }

    /// "CLV%" cell text.
    pub fn clv_text(&self) -> String {
        format_clv(self.clv_pct)
    }
}

/// Signed, two decimals: "+2.31", "-0.48".
pub fn format_clv(clv_pct: f64) -> String {
    format!("{:+.2}", clv_pct)
}

/// Why a bet was left unscored. None of these stop the batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkipReason {
    #[error("Missing event, market, bet or odds")]
    MissingFields,

    #[error("No consensus available for {event_id} {key}")]
    NoConsensus { event_id: String, key: BetKey },

    #[error("No quote matches {event_id} {key}")]
    UnmatchedBet { event_id: String, key: BetKey },

    #[error("Invalid entry odds {0:?}")]
    InvalidEntryOdds(String),
}

impl SkipReason {
    pub fn kind(&self) -> &'static str {
        match self {
            SkipReason::MissingFields => "missing_fields",
            SkipReason::NoConsensus { .. } => "no_consensus",
            SkipReason::UnmatchedBet { .. } => "unmatched_bet",
            SkipReason::InvalidEntryOdds(_) => "invalid_entry_odds",
        }
    }
}

/// Rows updated / skipped for one pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncSummary {
    pub scored: usize,
    pub from_fallback: usize,
    pub skipped: usize,
    pub skipped_by_reason: BTreeMap<&'static str, usize>,
}

impl SyncSummary {
    pub fn record_score(&mut self, score: &ClvScore) {
        self.scored += 1;
        if score.source != ClosingSource::Consensus {
            self.from_fallback += 1;
        }
    }

    pub fn record_skip(&mut self, reason: &SkipReason) {
        self.skipped += 1;
        *self.skipped_by_reason.entry(reason.kind()).or_default() += 1;
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} scored ({} from book fallback), {} skipped",
            self.scored, self.from_fallback, self.skipped
        )?;
        for (kind, count) in &self.skipped_by_reason {
            write!(f, ", {}={}", kind, count)?;
        }
        Ok(())
    }
}
