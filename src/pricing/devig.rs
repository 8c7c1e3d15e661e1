use crate::pricing::odds::american_to_probability;

/// Remove the vig from a two-way market by normalizing both implied
/// probabilities so they sum to 1.0.
///
/// Returns `(0.0, 0.0)` when the pair can't be trusted (a side with invalid
/// odds, or a zero sum). Callers treat that as missing data.
pub fn devig_two_way(price1: i32, price2: i32) -> (f64, f64) {
    let (p1, p2) = match (american_to_probability(price1), american_to_probability(price2)) {
        (Ok(p1), Ok(p2)) => (p1, p2),
        _ => return (0.0, 0.0),
    };

    let total = p1 + p2;
    if total == 0.0 {
        return (0.0, 0.0);
    }

    (p1 / total, p2 / total)
}

pub fn is_untrusted(pair: (f64, f64)) -> bool {
    pair.0 == 0.0 && pair.1 == 0.0
}

/// Bookmaker margin on a two-way market: how far the raw implied
/// probabilities overshoot 1.0.
pub fn overround(price1: i32, price2: i32) -> Option<f64> {
    let p1 = american_to_probability(price1).ok()?;
    let p2 = american_to_probability(price2).ok()?;
    Some(p1 + p2 - 1.0)
}
