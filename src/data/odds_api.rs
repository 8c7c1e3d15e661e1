use anyhow::{Context, Result};
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::OddsApiConfig;
use crate::data::types::EventOdds;
use crate::pricing::labels::{base_market, Market};

pub struct OddsApiClient {
    client: Client,
    base_url: String,
    api_key: String,
    regions: String,
    leagues: Vec<String>,
}

impl OddsApiClient {
    pub fn new(config: &OddsApiConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            regions: config.regions.clone(),
            leagues: config.leagues.clone(),
        })
    }

    /// Fetch one event's odds for one league. `Ok(None)` when the feed doesn't
    /// know the event under that league.
    pub async fn fetch_event_odds(
        &self,
        league: &str,
        event_id: &str,
        markets: &[&str],
    ) -> Result<Option<EventOdds>> {
        let url = format!(
            "{}/sports/{}/events/{}/odds",
            self.base_url, league, event_id
        );
        let markets = markets.join(",");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("apiKey", self.api_key.as_str()),
                ("regions", self.regions.as_str()),
                ("oddsFormat", "american"),
                ("markets", markets.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("Failed to fetch odds for event {}", event_id))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "Event {} {} HTTP {}: {}",
                event_id,
                league,
                status,
                body.chars().take(200).collect::<String>()
            );
            return Ok(None);
        }

        let event: EventOdds = response
            .json()
            .await
            .with_context(|| format!("Failed to parse odds for event {}", event_id))?;
        Ok(Some(event))
    }

    /// Try each configured league in order until one returns the event.
    pub async fn find_event_odds(&self, event_id: &str, markets: &[&str]) -> Result<Option<EventOdds>> {
        for league in &self.leagues {
            match self.fetch_event_odds(league, event_id, markets).await {
                Ok(Some(event)) => return Ok(Some(event)),
                Ok(None) => continue,
                Err(e) => warn!("{} lookup failed for {}: {:#}", league, event_id, e),
            }
        }
        Ok(None)
    }

    /// Fetch every requested event concurrently, keeping only allowed books.
    /// Events the feed doesn't return are left out.
    pub async fn fetch_events(
        &self,
        requests: &BTreeMap<String, BTreeSet<&'static str>>,
        allowed_books: &[String],
    ) -> BTreeMap<String, EventOdds> {
        let lookups = requests.iter().map(|(event_id, markets)| async move {
            let markets: Vec<&str> = markets.iter().copied().collect();
            let result = self.find_event_odds(event_id, &markets).await;
            (event_id.clone(), result)
        });

        let mut events = BTreeMap::new();
        for (event_id, result) in join_all(lookups).await {
            match result {
                Ok(Some(mut event)) => {
                    retain_allowed_books(&mut event, allowed_books);
                    events.insert(event_id, event);
                }
                Ok(None) => warn!("Odds feed has no event {} in any configured league", event_id),
                Err(e) => warn!("Failed to fetch event {}: {:#}", event_id, e),
            }
        }

        info!("Fetched odds for {}/{} events", events.len(), requests.len());
        events
    }
}

/// API market keys to request for a bet's market. Empty for markets we don't price.
pub fn markets_for_bet(bet_market: &str) -> &'static [&'static str] {
    let lower = bet_market.trim().to_lowercase();
    if lower.starts_with("player_") {
        return &[];
    }
    if lower.starts_with("spread") {
        return &["spreads", "alternate_spreads"];
    }
    if lower.starts_with("team_total") {
        return &["team_totals"];
    }
    if lower.starts_with("total") {
        return &["totals", "alternate_totals"];
    }
    match base_market(&lower) {
        Market::H2h => &["h2h"],
        Market::Spreads => &["spreads", "alternate_spreads"],
        Market::Totals => &["totals", "alternate_totals"],
        Market::TeamTotals => &["team_totals"],
        Market::Other(_) => &[],
    }
}

pub fn retain_allowed_books(event: &mut EventOdds, allowed_books: &[String]) {
    if allowed_books.is_empty() {
        return;
    }
    event
        .bookmakers
        .retain(|book| allowed_books.iter().any(|allowed| *allowed == book.key));
}
