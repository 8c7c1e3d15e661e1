//! Closing-line value tracking for logged sports bets.
//!
//! Odds quotes from several books are devigged per book and averaged into a
//! consensus no-vig price per market and selection. Each logged bet is matched
//! to that consensus (or, failing that, a direct book quote) and scored as the
//! percentage by which the closing probability beats the entry probability.

pub mod config;
pub mod data;
pub mod monitoring;
pub mod pricing;
pub mod scoring;
