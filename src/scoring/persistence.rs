use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};

use crate::data::types::BetRecord;
use crate::scoring::types::ClvScore;

/// SQLite ledger of logged bets and their CLV write-backs.
pub struct BetLedger {
    conn: Connection,
}

impl BetLedger {
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open bet ledger: {}", db_path))?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS bets (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                bet_id TEXT NOT NULL UNIQUE,
                event_id TEXT NOT NULL,
                market TEXT NOT NULL,
                bet TEXT NOT NULL,
                bookmaker TEXT NOT NULL DEFAULT '',
                odds TEXT NOT NULL,
                stake REAL,
                result TEXT,
                closing_line TEXT,
                clv_pct TEXT,
                clv_source TEXT,
                updated_at TIMESTAMP,
                imported_at TIMESTAMP NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_bets_event_id ON bets(event_id);
            "#,
        )?;

        Ok(Self { conn })
    }

    /// Insert bets not already in the ledger. A bet id seen before keeps its
    /// first row. Returns how many rows were new.
    pub fn import_bets(&self, bets: &[BetRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();
        let mut inserted = 0;

        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO bets (bet_id, event_id, market, bet, bookmaker, odds, stake, result, closing_line, clv_pct, imported_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for bet in bets {
                inserted += stmt.execute(params![
                    bet.bet_id,
                    bet.event_id,
                    bet.market,
                    bet.bet,
                    bet.bookmaker,
                    bet.odds,
                    bet.stake,
                    bet.result,
                    bet.closing_line,
                    bet.clv_pct,
                    now,
                ])?;
            }
        }

        tx.commit().context("Failed to commit bet import")?;
        Ok(inserted)
    }

    /// All bets in the order they were first imported.
    pub fn load_bets(&self) -> Result<Vec<BetRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT bet_id, event_id, market, bet, bookmaker, odds, stake, result, closing_line, clv_pct
             FROM bets
             ORDER BY id",
        )?;

        let bets = stmt.query_map([], |row| {
            Ok(BetRecord {
                bet_id: row.get(0)?,
                event_id: row.get(1)?,
                market: row.get(2)?,
                bet: row.get(3)?,
                bookmaker: row.get(4)?,
                odds: row.get(5)?,
                stake: row.get(6)?,
                result: row.get(7)?,
                closing_line: row.get(8)?,
                clv_pct: row.get(9)?,
            })
        })?;

        bets.collect::<Result<Vec<_>, _>>().map_err(|e| e.into())
    }

    /// Write a bet's closing line and CLV%. False when the bet id is unknown.
    pub fn record_clv(&self, score: &ClvScore) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE bets
             SET closing_line = ?1, clv_pct = ?2, clv_source = ?3, updated_at = ?4
             WHERE bet_id = ?5",
            params![
                score.closing_line(),
                score.clv_text(),
                score.source.to_string(),
                Utc::now().to_rfc3339(),
                score.bet_id,
            ],
        )?;
        Ok(updated > 0)
    }

    pub fn count_bets(&self) -> Result<usize> {
        let count: usize = self
            .conn
            .query_row("SELECT COUNT(*) FROM bets", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Bets that carry a CLV%.
    pub fn count_scored(&self) -> Result<usize> {
        let count: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM bets WHERE clv_pct IS NOT NULL AND clv_pct != ''",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn clv_source(&self, bet_id: &str) -> Result<Option<String>> {
        let source: Option<String> = self.conn.query_row(
            "SELECT clv_source FROM bets WHERE bet_id = ?1",
            params![bet_id],
            |row| row.get(0),
        )?;
        Ok(source)
    }
}
