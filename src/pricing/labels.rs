use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical market family. Alternate lines fold into their base market.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Market {
    H2h,
    Spreads,
    Totals,
    TeamTotals,
    /// Any market key we do not price; kept verbatim (lowercased).
    Other(String),
}

impl Market {
    pub fn as_str(&self) -> &str {
        match self {
            Market::H2h => "h2h",
            Market::Spreads => "spreads",
            Market::Totals => "totals",
            Market::TeamTotals => "team_totals",
            Market::Other(key) => key,
        }
    }

    /// Markets the quote extractor pairs and devigs.
    pub fn is_supported(&self) -> bool {
        !matches!(self, Market::Other(_))
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Market {
    fn from(key: String) -> Self {
        base_market(&key)
    }
}

impl From<Market> for String {
    fn from(market: Market) -> Self {
        market.as_str().to_string()
    }
}

/// Map a bookmaker/API market key onto its canonical market.
pub fn base_market(raw_market: &str) -> Market {
    let key = raw_market.trim().to_lowercase();
    let key = key.strip_prefix("alternate_").unwrap_or(&key);

    match key {
        "h2h" | "ml" | "moneyline" => Market::H2h,
        "spreads" => Market::Spreads,
        "totals" => Market::Totals,
        "team_totals" => Market::TeamTotals,
        other => Market::Other(other.to_string()),
    }
}

/// Build the canonical label for one outcome.
///
/// - totals:  "Over 9.5" / "Under 9.5"
/// - spreads: "Yankees +1.5" (unsigned points gain a "+")
/// - h2h and anything unrecognized: the outcome name
pub fn build_label(raw_market: &str, outcome_name: &str, point: &str) -> String {
    let name = normalize_text(outcome_name);
    let point = normalize_text(point);

    match base_market(raw_market) {
        Market::Totals => {
            let side = name.split(' ').next().map(title_case).unwrap_or_default();
            format!("{} {}", side, point).trim().to_string()
        }
        Market::Spreads => format!("{} {}", normalize_team(&name), sign_point(&point))
            .trim()
            .to_string(),
        Market::H2h => normalize_team(&name),
        _ => name,
    }
}

/// Label for a team total: "Yankees Over 4.5".
pub fn team_total_label(team: &str, side: &str, point: &str) -> String {
    let team = normalize_team(team);
    let side = normalize_text(side);
    let side = side.split(' ').next().map(title_case).unwrap_or_default();
    let point = normalize_text(point);

    [team.as_str(), side.as_str(), point.as_str()]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Team names as sheets and the odds feed both spell them: a bare "St"
/// becomes "State" ("Ohio St" -> "Ohio State"). "St." is left alone.
pub fn normalize_team(name: &str) -> String {
    normalize_text(name)
        .split(' ')
        .map(|word| if word.eq_ignore_ascii_case("st") { "State" } else { word })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapse whitespace and rewrite half-point glyphs ("9½", mis-encoded "9Â½") as ".5".
pub fn normalize_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    normalize_half(&collapsed)
}

fn normalize_half(text: &str) -> String {
    let text = text.replace("Â½", "½");
    let mut out = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        if c == '½' {
            if out.chars().last().map_or(false, |prev| prev.is_ascii_digit()) {
                out.push_str(".5");
            } else {
                out.push_str("0.5");
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn sign_point(point: &str) -> String {
    if point.is_empty() || point.starts_with('+') || point.starts_with('-') {
        point.to_string()
    } else {
        format!("+{}", point)
    }
}

/// Shortest decimal text for a line: 7.5 -> "7.5", -3.5 -> "-3.5", 7.0 -> "7".
pub fn format_point(point: f64) -> String {
    if point == 0.0 {
        // avoid "-0"
        return "0".to_string();
    }
    format!("{}", point)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(|c| c.to_lowercase())).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_market() {
        assert_eq!(base_market("alternate_spreads"), Market::Spreads);
        assert_eq!(base_market("moneyline"), Market::H2h);
        assert_eq!(base_market("alternate_ml"), Market::H2h);
        assert_eq!(base_market(" Totals "), Market::Totals);
        assert_eq!(base_market("team_totals"), Market::TeamTotals);
        assert_eq!(
            base_market("player_points"),
            Market::Other("player_points".to_string())
        );
    }

    #[test]
    fn test_totals_label() {
        assert_eq!(build_label("totals", "under", "9.5"), "Under 9.5");
        assert_eq!(build_label("alternate_totals", "OVER", "9Â½"), "Over 9.5");
        assert_eq!(build_label("totals", "Over", "10½"), "Over 10.5");
    }

    #[test]
    fn test_spreads_label() {
        assert_eq!(build_label("spreads", "Yankees", "1.5"), "Yankees +1.5");
        assert_eq!(build_label("spreads", "Blue  Jays", "-1.5"), "Blue Jays -1.5");
        assert_eq!(build_label("spreads", "Blue Jays", "½"), "Blue Jays +0.5");
    }

    #[test]
    fn test_h2h_and_unknown_labels() {
        assert_eq!(build_label("h2h", " Lakers ", ""), "Lakers");
        assert_eq!(build_label("player_points", "LeBron James", "25.5"), "LeBron James");
    }

    #[test]
    fn test_team_names_expand_st() {
        assert_eq!(normalize_team("Ohio  St"), "Ohio State");
        assert_eq!(normalize_team("St. John's"), "St. John's");
        assert_eq!(normalize_team("Stanford"), "Stanford");
        assert_eq!(build_label("h2h", "Michigan St", ""), "Michigan State");
        assert_eq!(build_label("spreads", "Boise st", "3.5"), "Boise State +3.5");
        assert_eq!(team_total_label("Iowa St", "over", "24.5"), "Iowa State Over 24.5");
        // totals sides are not team names
        assert_eq!(build_label("totals", "Over", "7.5"), "Over 7.5");
    }

    #[test]
    fn test_label_is_total_over_odd_shapes() {
        assert_eq!(build_label("totals", "", ""), "");
        assert_eq!(build_label("spreads", "", ""), "");
        assert_eq!(build_label("", "", ""), "");
    }

    #[test]
    fn test_team_total_label() {
        assert_eq!(team_total_label("Yankees", "over", "4.5"), "Yankees Over 4.5");
        assert_eq!(team_total_label("Yankees", "Under", ""), "Yankees Under");
    }

    #[test]
    fn test_format_point() {
        assert_eq!(format_point(7.5), "7.5");
        assert_eq!(format_point(-3.5), "-3.5");
        assert_eq!(format_point(7.0), "7");
        assert_eq!(format_point(-0.0), "0");
    }

    #[test]
    fn test_market_serde_round_trips_through_key() {
        let market: Market = serde_json::from_str("\"alternate_totals\"").unwrap();
        assert_eq!(market, Market::Totals);
        assert_eq!(serde_json::to_string(&Market::TeamTotals).unwrap(), "\"team_totals\"");
    }
}
