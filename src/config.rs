use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub system: SystemConfig,
    #[serde(default)]
    pub consensus: ConsensusConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub odds_api: OddsApiConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SystemConfig {
    pub dry_run: bool,
    pub database_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConsensusConfig {
    /// Books whose quotes feed the consensus. Any other book is ignored.
    #[serde(default = "default_allowed_books")]
    pub allowed_books: Vec<String>,
    #[serde(default = "default_true")]
    pub parallel_events: bool,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            allowed_books: default_allowed_books(),
            parallel_events: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    /// Fall back to a direct book quote when no consensus exists for a bet.
    #[serde(default = "default_true")]
    pub book_fallback: bool,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            book_fallback: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    #[serde(default)]
    pub bets_csv_path: Option<String>,
    #[serde(default)]
    pub detailed_odds_csv_path: Option<String>,
    /// Where to write the ledger, closing lines included, after a pass.
    #[serde(default)]
    pub export_csv_path: Option<String>,
    /// 1-based row holding the bet sheet's header.
    #[serde(default = "default_header_row")]
    pub bet_header_row: usize,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            bets_csv_path: None,
            detailed_odds_csv_path: None,
            export_csv_path: None,
            bet_header_row: default_header_row(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OddsApiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_odds_api_url")]
    pub base_url: String,
    #[serde(default = "default_regions")]
    pub regions: String,
    #[serde(default = "default_leagues")]
    pub leagues: Vec<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for OddsApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_odds_api_url(),
            regions: default_regions(),
            leagues: default_leagues(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    pub csv_logging: bool,
    pub csv_log_path: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_true() -> bool { true }
fn default_header_row() -> usize { 1 }
fn default_timeout() -> u64 { 25 }
fn default_regions() -> String { "us".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_odds_api_url() -> String { "https://api.the-odds-api.com/v4".to_string() }

fn default_allowed_books() -> Vec<String> {
    ["pinnacle", "fanduel", "betonlineag", "draftkings"]
        .iter()
        .map(|b| b.to_string())
        .collect()
}

fn default_leagues() -> Vec<String> {
    ["baseball_mlb", "americanfootball_nfl", "americanfootball_ncaaf"]
        .iter()
        .map(|l| l.to_string())
        .collect()
}

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub odds_api_key: Option<String>,
    pub odds_api_url: Option<String>,
    pub dry_run: Option<bool>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }

    /// Environment overrides win over the file.
    pub fn apply_env(&mut self, env: &EnvConfig) {
        if let Some(dry_run) = env.dry_run {
            self.system.dry_run = dry_run;
        }
        if let Some(url) = &env.odds_api_url {
            self.odds_api.base_url = url.clone();
        }
    }
}

impl EnvConfig {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            odds_api_key: std::env::var("ODDS_API_KEY")
                .ok()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty()),
            odds_api_url: std::env::var("ODDS_API_URL").ok(),
            dry_run: std::env::var("DRY_RUN").ok().and_then(|v| v.parse().ok()),
        })
    }
}
