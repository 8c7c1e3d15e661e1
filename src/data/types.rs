use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};

use crate::pricing::labels::{format_point, normalize_text};
use crate::pricing::odds::{format_american, parse_american};

/// One event's odds as delivered by the odds feed.
/// `bookmakers` is required: a payload without it is structurally invalid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventOdds {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sport_key: Option<String>,
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
    pub bookmakers: Vec<BookmakerOdds>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmakerOdds {
    pub key: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub markets: Vec<MarketOdds>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketOdds {
    pub key: String,
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(default)]
    pub name: String,
    /// American odds. `None` when the feed sent something unparseable.
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: Option<i32>,
    #[serde(default, deserialize_with = "lenient_point")]
    pub point: Option<String>,
    /// Team name on team-total outcomes.
    #[serde(default)]
    pub description: Option<String>,
}

impl Outcome {
    pub fn new(name: &str, price: i32, point: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            price: Some(price),
            point: point.map(str::to_string),
            description: None,
        }
    }

    /// Point as label text, half-point glyphs already rewritten ("9½" -> "9.5").
    pub fn point_text(&self) -> String {
        self.point.as_deref().map(normalize_text).unwrap_or_default()
    }

    pub fn point_value(&self) -> Option<f64> {
        let text = self.point_text();
        if text.is_empty() {
            return None;
        }
        text.parse::<f64>().ok()
    }
}

impl EventOdds {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse event odds payload")
    }

    /// Flatten into Detailed Odds rows, one per outcome.
    pub fn to_detailed_rows(&self, event_id: &str) -> Vec<DetailedOddsRow> {
        let mut rows = Vec::new();
        for book in &self.bookmakers {
            for market in &book.markets {
                for outcome in &market.outcomes {
                    let Some(price) = outcome.price else { continue };
                    rows.push(DetailedOddsRow {
                        event_id: event_id.to_string(),
                        bookmaker: book.key.clone(),
                        api_market: market.key.clone(),
                        outcome_name: normalize_text(&outcome.name),
                        description: outcome
                            .description
                            .as_deref()
                            .map(normalize_text)
                            .unwrap_or_default(),
                        outcome_point: outcome.point_text(),
                        odds: format_american(price),
                    });
                }
            }
        }
        rows
    }
}

/// One row of the "Detailed Odds" sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailedOddsRow {
    pub event_id: String,
    pub bookmaker: String,
    pub api_market: String,
    pub outcome_name: String,
    /// Team on team-total rows, empty elsewhere.
    #[serde(default)]
    pub description: String,
    pub outcome_point: String,
    pub odds: String,
}

/// One logged wager. The pricing core only ever reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    pub bet_id: String,
    pub event_id: String,
    pub market: String,
    pub bet: String,
    pub bookmaker: String,
    /// Entry odds as entered ("+150", "-110").
    pub odds: String,
    pub stake: Option<f64>,
    pub result: Option<String>,
    pub closing_line: Option<String>,
    pub clv_pct: Option<String>,
}

impl BetRecord {
    pub fn entry_odds(&self) -> Option<i32> {
        parse_american(&self.odds).ok()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Int(i64),
    Float(f64),
    Text(String),
}

fn lenient_price<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<NumberOrText> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrText::Int(n)) => i32::try_from(n).ok().filter(|n| *n != 0),
        Some(NumberOrText::Float(f)) => parse_american(&f.to_string()).ok(),
        Some(NumberOrText::Text(s)) => parse_american(&s).ok(),
        None => None,
    })
}

fn lenient_point<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<NumberOrText> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(NumberOrText::Int(n)) => Some(n.to_string()),
        Some(NumberOrText::Float(f)) => Some(format_point(f)),
        Some(NumberOrText::Text(s)) if !s.trim().is_empty() => Some(s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_event_payload() {
        let event = EventOdds::from_json(
            r#"{
                "id": "evt1",
                "bookmakers": [{
                    "key": "pinnacle",
                    "title": "Pinnacle",
                    "markets": [{
                        "key": "totals",
                        "outcomes": [
                            {"name": "Over", "price": -110, "point": 7.5},
                            {"name": "Under", "price": "-110", "point": "7½"}
                        ]
                    }]
                }]
            }"#,
        )
        .unwrap();

        let outcomes = &event.bookmakers[0].markets[0].outcomes;
        assert_eq!(outcomes[0].price, Some(-110));
        assert_eq!(outcomes[0].point_text(), "7.5");
        assert_eq!(outcomes[1].price, Some(-110));
        assert_eq!(outcomes[1].point_text(), "7.5");
        assert_eq!(outcomes[1].point_value(), Some(7.5));
    }

    #[test]
    fn test_payload_without_bookmakers_is_rejected() {
        assert!(EventOdds::from_json(r#"{"id": "evt1"}"#).is_err());
    }

    #[test]
    fn test_unparseable_price_is_none() {
        let outcome: Outcome =
            serde_json::from_str(r#"{"name": "A", "price": "EVEN"}"#).unwrap();
        assert_eq!(outcome.price, None);
        assert_eq!(outcome.point, None);
    }

    #[test]
    fn test_to_detailed_rows() {
        let event = EventOdds {
            id: None,
            sport_key: None,
            home_team: None,
            away_team: None,
            bookmakers: vec![BookmakerOdds {
                key: "fanduel".to_string(),
                title: None,
                markets: vec![MarketOdds {
                    key: "spreads".to_string(),
                    outcomes: vec![
                        Outcome::new("A", -110, Some("-3.5")),
                        Outcome::new("B", 105, Some("3.5")),
                    ],
                }],
            }],
        };

        let rows = event.to_detailed_rows("evt9");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].odds, "+105");
        assert_eq!(rows[1].outcome_point, "3.5");
        assert_eq!(rows[0].event_id, "evt9");
    }
}
