use anyhow::{Context, Result};
use std::collections::BTreeMap;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clv_tracker::config::{Config, EnvConfig};
use clv_tracker::data::board::ConsensusBoard;
use clv_tracker::data::odds_api::OddsApiClient;
use clv_tracker::data::sheets::{build_events, export_bets, load_bets, load_detailed_odds};
use clv_tracker::data::types::{BetRecord, DetailedOddsRow, EventOdds};
use clv_tracker::monitoring::logger::CsvLogger;
use clv_tracker::scoring::persistence::BetLedger;
use clv_tracker::scoring::scorer::ClvScorer;
use clv_tracker::scoring::sync::{
    bets_for_pass, odds_requests, pending_bets, rows_by_event, score_bets, write_back,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let mut config = Config::load(&config_path)?;
    let env_config = EnvConfig::load()?;
    config.apply_env(&env_config);

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.monitoring.log_level))
        .context("Failed to build log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("CLV tracker starting (config: {})", config_path);
    info!("Dry run mode: {}", config.system.dry_run);
    info!("Allowed books: {:?}", config.consensus.allowed_books);

    info!("Opening ledger: {}", config.system.database_path);
    let ledger = BetLedger::new(&config.system.database_path)?;

    let sheet_bets = match &config.sheets.bets_csv_path {
        Some(path) => load_bets(path, config.sheets.bet_header_row)?,
        None => Vec::new(),
    };

    let bets = pending_bets(bets_for_pass(&ledger, &sheet_bets, config.system.dry_run)?);
    info!("{} bets waiting on a closing line", bets.len());
    if bets.is_empty() {
        return Ok(());
    }

    let mut rows: Vec<DetailedOddsRow> = match &config.sheets.detailed_odds_csv_path {
        Some(path) => load_detailed_odds(path)?,
        None => Vec::new(),
    };
    let mut events = build_events(&rows);

    if config.odds_api.enabled {
        match &env_config.odds_api_key {
            Some(api_key) => {
                let fetched = fetch_closing_odds(&config, api_key, &bets).await?;
                for (event_id, event) in fetched {
                    rows.extend(event.to_detailed_rows(&event_id));
                    events.insert(event_id, event);
                }
            }
            None => warn!("Odds API enabled but ODDS_API_KEY is not set; using sheets only"),
        }
    }

    let board = ConsensusBoard::build(
        &events,
        &config.consensus.allowed_books,
        config.consensus.parallel_events,
    );

    let scorer = ClvScorer::new(&config.scoring)?;
    let (scores, summary) = score_bets(&scorer, &bets, &board, &rows_by_event(&rows));

    if config.system.dry_run {
        for score in &scores {
            info!(
                "[dry run] {} {} closing {} CLV {}% ({})",
                score.bet_id,
                score.key,
                score.closing_line(),
                score.clv_text(),
                score.source
            );
        }
    } else {
        let logger = if config.monitoring.csv_logging {
            Some(CsvLogger::new(config.monitoring.csv_log_path.clone())?)
        } else {
            None
        };
        write_back(&ledger, logger.as_ref(), &bets, &scores)?;
        if let Some(logger) = &logger {
            logger.log_event(&format!("sync: {}", summary))?;
        }
        info!("Ledger now has {} scored bets", ledger.count_scored()?);
        if let Some(path) = &config.sheets.export_csv_path {
            export_bets(path, &ledger.load_bets()?)?;
        }
    }

    info!("Sync complete: {}", summary);
    Ok(())
}

async fn fetch_closing_odds(
    config: &Config,
    api_key: &str,
    bets: &[BetRecord],
) -> Result<BTreeMap<String, EventOdds>> {
    let client = OddsApiClient::new(&config.odds_api, api_key.to_string())?;

    let requests = odds_requests(bets);
    info!("Fetching odds for {} events", requests.len());
    Ok(client
        .fetch_events(&requests, &config.consensus.allowed_books)
        .await)
}
