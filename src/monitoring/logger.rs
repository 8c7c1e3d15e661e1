use anyhow::{Context, Result};
use chrono::Utc;
use std::fs::OpenOptions;
use std::path::Path;

use crate::scoring::types::ClvScore;

const HEADER: [&str; 10] = [
    "timestamp",
    "bet_id",
    "event_id",
    "market",
    "label",
    "entry_odds",
    "closing_line",
    "clv_pct",
    "source",
    "books",
];

/// Append-only CSV audit trail of CLV write-backs.
pub struct CsvLogger {
    log_path: String,
}

impl CsvLogger {
    pub fn new(log_path: String) -> Result<Self> {
        if !Path::new(&log_path).exists() {
            let mut writer = csv::Writer::from_path(&log_path)
                .with_context(|| format!("Failed to create CLV log: {}", log_path))?;
            writer.write_record(HEADER)?;
            writer.flush()?;
        }

        Ok(Self { log_path })
    }

    fn append<I, T>(&self, record: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.log_path)
            .with_context(|| format!("Failed to open CLV log: {}", self.log_path))?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(record)?;
        writer.flush()?;
        Ok(())
    }

    /// Log one scored bet.
    pub fn log_clv(&self, score: &ClvScore, entry_odds: &str) -> Result<()> {
        let market = score.key.market.to_string();
        self.append([
            Utc::now().to_rfc3339(),
            score.bet_id.clone(),
            score.event_id.clone(),
            market,
            score.key.label.clone(),
            entry_odds.to_string(),
            score.closing_line(),
            score.clv_text(),
            score.source.to_string(),
            score.books.join("|"),
        ])
    }

    pub fn log_event(&self, event: &str) -> Result<()> {
        let mut record = vec![Utc::now().to_rfc3339(), "EVENT".to_string(), event.to_string()];
        record.resize(HEADER.len(), String::new());
        self.append(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::labels::Market;
    use crate::pricing::types::BetKey;
    use crate::scoring::types::ClosingSource;

    fn read_rows(path: &Path) -> Vec<csv::StringRecord> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap()
            .records()
            .map(|r| r.unwrap())
            .collect()
    }

    #[test]
    fn test_header_written_once_and_rows_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clv_log.csv");
        let path_str = path.to_str().unwrap().to_string();

        let logger = CsvLogger::new(path_str.clone()).unwrap();
        logger
            .log_clv(
                &ClvScore {
                    bet_id: "b1".to_string(),
                    event_id: "evt1".to_string(),
                    key: BetKey::new(Market::Spreads, "Yankees, NY +1.5"),
                    entry_probability: 0.5,
                    closing_probability: 0.52,
                    closing_odds: -108,
                    clv_pct: 4.0,
                    source: ClosingSource::Consensus,
                    books: vec!["fanduel".to_string(), "pinnacle".to_string()],
                },
                "+100",
            )
            .unwrap();

        // reopening must not rewrite the header
        let logger = CsvLogger::new(path_str).unwrap();
        logger.log_event("sync complete").unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[0][1], "bet_id");
        assert_eq!(&rows[1][3], "spreads");
        assert_eq!(&rows[1][4], "Yankees, NY +1.5");
        assert_eq!(&rows[1][6], "-108");
        assert_eq!(&rows[1][7], "+4.00");
        assert_eq!(&rows[1][9], "fanduel|pinnacle");
        assert_eq!(&rows[2][1], "EVENT");
        assert_eq!(rows[2].len(), HEADER.len());
    }
}
