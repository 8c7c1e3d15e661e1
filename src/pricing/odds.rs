/// Price returned for a probability of 1.0 or more (an unbeatable favorite).
pub const UNBOUNDED_FAVORITE: i32 = -1_000_000_000;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OddsError {
    #[error("Invalid American odds: {0:?}")]
    InvalidOdds(String),

    #[error("Invalid probability: {0}")]
    InvalidProbability(f64),
}

/// Convert American odds to the raw (vig-included) implied probability.
/// Positive odds (+150): 100 / (odds + 100)
/// Negative odds (-150): |odds| / (|odds| + 100)
pub fn american_to_probability(odds: i32) -> Result<f64, OddsError> {
    if odds == 0 {
        return Err(OddsError::InvalidOdds(odds.to_string()));
    }

    let odds = odds as f64;
    if odds > 0.0 {
        Ok(100.0 / (odds + 100.0))
    } else {
        Ok(odds.abs() / (odds.abs() + 100.0))
    }
}

/// Convert a probability back to American odds, rounded to the nearest integer.
pub fn probability_to_american(probability: f64) -> Result<i32, OddsError> {
    if probability.is_nan() || probability <= 0.0 {
        return Err(OddsError::InvalidProbability(probability));
    }
    if probability >= 1.0 {
        return Ok(UNBOUNDED_FAVORITE);
    }

    let odds = if probability > 0.5 {
        -probability * 100.0 / (1.0 - probability)
    } else {
        (1.0 - probability) * 100.0 / probability
    };

    Ok(odds.round() as i32)
}

/// Parse American odds as they appear in sheets and scraped bet slips:
/// "+150", "-110", " - 110 ", "-110.0".
pub fn parse_american(text: &str) -> Result<i32, OddsError> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
    if digits.len() != cleaned.len() && digits.starts_with(['+', '-']) {
        return Err(OddsError::InvalidOdds(text.to_string()));
    }

    let odds = match digits.parse::<i32>() {
        Ok(odds) => odds,
        Err(_) => {
            let value = digits
                .parse::<f64>()
                .map_err(|_| OddsError::InvalidOdds(text.to_string()))?;
            if !value.is_finite() || value.fract() != 0.0 || value.abs() > i32::MAX as f64 {
                return Err(OddsError::InvalidOdds(text.to_string()));
            }
            value as i32
        }
    };

    if odds == 0 {
        return Err(OddsError::InvalidOdds(text.to_string()));
    }
    Ok(odds)
}

pub fn american_str_to_probability(text: &str) -> Result<f64, OddsError> {
    american_to_probability(parse_american(text)?)
}

/// Render odds the way bettors write them ("+150", "-110").
pub fn format_american(odds: i32) -> String {
    if odds > 0 {
        format!("+{}", odds)
    } else {
        odds.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_american_to_probability() {
        assert!((american_to_probability(150).unwrap() - 0.4).abs() < 1e-12);
        assert!((american_to_probability(-150).unwrap() - 0.6).abs() < 1e-12);
        assert!((american_to_probability(100).unwrap() - 0.5).abs() < 1e-12);
        assert!((american_to_probability(-110).unwrap() - 110.0 / 210.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_odds_is_invalid() {
        assert_eq!(
            american_to_probability(0),
            Err(OddsError::InvalidOdds("0".to_string()))
        );
    }

    #[test]
    fn test_probability_to_american() {
        assert_eq!(probability_to_american(0.5).unwrap(), 100);
        assert_eq!(probability_to_american(0.6).unwrap(), -150);
        assert_eq!(probability_to_american(0.4).unwrap(), 150);
        assert_eq!(probability_to_american(1.0).unwrap(), UNBOUNDED_FAVORITE);
        assert!(probability_to_american(0.0).is_err());
        assert!(probability_to_american(-0.2).is_err());
        assert!(probability_to_american(f64::NAN).is_err());
    }

    #[test]
    fn test_round_trip_within_one() {
        // -100 and +100 are the same price, so the negative side starts at -101
        for odds in (-2000..=-101).chain(100..=2000) {
            let prob = american_to_probability(odds).unwrap();
            let back = probability_to_american(prob).unwrap();
            assert!(
                (back - odds).abs() <= 1,
                "odds {} came back as {}",
                odds,
                back
            );
        }
    }

    #[test]
    fn test_parse_american() {
        assert_eq!(parse_american("+150").unwrap(), 150);
        assert_eq!(parse_american("-110").unwrap(), -110);
        assert_eq!(parse_american(" - 110 ").unwrap(), -110);
        assert_eq!(parse_american("-110.0").unwrap(), -110);
        assert_eq!(parse_american("200").unwrap(), 200);
        assert!(parse_american("").is_err());
        assert!(parse_american("EVEN").is_err());
        assert!(parse_american("+0").is_err());
        assert!(parse_american("-110.5").is_err());
        assert!(parse_american("+-110").is_err());
        assert!(parse_american("+ -110").is_err());
        assert!(parse_american("++110").is_err());
    }

    #[test]
    fn test_format_american() {
        assert_eq!(format_american(150), "+150");
        assert_eq!(format_american(-110), "-110");
    }
}
