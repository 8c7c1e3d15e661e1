use anyhow::{Context, Result};
use tracing::debug;

use crate::config::ScoringConfig;
use crate::data::board::ConsensusBoard;
use crate::data::types::{BetRecord, DetailedOddsRow};
use crate::pricing::odds::american_to_probability;
use crate::pricing::types::BetKey;
use crate::scoring::matcher::{pick_closing_line, BetParser};
use crate::scoring::types::{ClosingSource, ClvScore, SkipReason};

/// Scores bets against the consensus board.
pub struct ClvScorer {
    parser: BetParser,
    book_fallback: bool,
}

impl ClvScorer {
    pub fn new(config: &ScoringConfig) -> Result<Self> {
        let parser = BetParser::new().context("Failed to compile bet patterns")?;
        Ok(Self {
            parser,
            book_fallback: config.book_fallback,
        })
    }

    pub fn parse_bet(&self, bet: &BetRecord) -> BetKey {
        self.parser.parse(&bet.market, &bet.bet)
    }

    /// Score one bet. `event_rows` are the Detailed Odds rows for the bet's
    /// event and only feed the direct-quote fallback.
    pub fn score_bet(
        &self,
        bet: &BetRecord,
        board: &ConsensusBoard,
        event_rows: &[DetailedOddsRow],
    ) -> Result<ClvScore, SkipReason> {
        if bet.event_id.trim().is_empty()
            || bet.market.trim().is_empty()
            || bet.bet.trim().is_empty()
            || bet.odds.trim().is_empty()
        {
            return Err(SkipReason::MissingFields);
        }

        let event_id = bet.event_id.trim().to_string();
        let key = self.parse_bet(bet);

        let (closing_probability, closing_odds, source, books) =
            match board.lookup(&event_id, &key) {
                Some(result) => match (result.consensus_probability, result.consensus_odds) {
                    (Some(probability), Some(odds)) => {
                        (probability, odds, ClosingSource::Consensus, result.books)
                    }
                    _ => self.closing_from_books(bet, &event_id, &key, event_rows)?,
                },
                None => self.closing_from_books(bet, &event_id, &key, event_rows)?,
            };

        let entry_probability = bet
            .entry_odds()
            .and_then(|odds| american_to_probability(odds).ok())
            .filter(|p| *p > 0.0)
            .ok_or_else(|| SkipReason::InvalidEntryOdds(bet.odds.clone()))?;

        let clv_pct = clv_percent(closing_probability, entry_probability);
        debug!(
            "{} {} entry={:.4} closing={:.4} clv={:+.2}% via {}",
            bet.bet_id, key, entry_probability, closing_probability, clv_pct, source
        );

        Ok(ClvScore {
            bet_id: bet.bet_id.clone(),
            event_id,
            key,
            entry_probability,
            closing_probability,
            closing_odds,
            clv_pct,
            source,
            books,
        })
    }

    fn closing_from_books(
        &self,
        bet: &BetRecord,
        event_id: &str,
        key: &BetKey,
        event_rows: &[DetailedOddsRow],
    ) -> Result<(f64, i32, ClosingSource, Vec<String>), SkipReason> {
        if !self.book_fallback {
            return Err(SkipReason::NoConsensus {
                event_id: event_id.to_string(),
                key: key.clone(),
            });
        }

        let unmatched = || SkipReason::UnmatchedBet {
            event_id: event_id.to_string(),
            key: key.clone(),
        };

        let quote = pick_closing_line(event_rows, key, &bet.bookmaker).ok_or_else(unmatched)?;
        let probability = american_to_probability(quote.price).map_err(|_| unmatched())?;
        let source = if quote.exact_book {
            ClosingSource::ExactBook(quote.bookmaker.clone())
        } else {
            ClosingSource::OtherBook(quote.bookmaker.clone())
        };

        Ok((probability, quote.price, source, vec![quote.bookmaker]))
    }
}

/// Percent by which the closing probability beats the entry probability.
pub fn clv_percent(closing_probability: f64, entry_probability: f64) -> f64 {
    (closing_probability / entry_probability - 1.0) * 100.0
}
