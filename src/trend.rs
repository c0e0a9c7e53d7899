use crate::models::Trend;

pub const TREND_UP_RATIO: f64 = 1.1;
pub const TREND_DOWN_RATIO: f64 = 0.9;

/// Compares a period's value against the one before it. Moves of 10% or
/// more either way count; anything smaller is flat.
pub fn classify_trend(current: f64, previous: f64) -> Trend {
    if previous <= 0.0 {
        return if current > 0.0 { Trend::Up } else { Trend::Flat };
    }

    let ratio = current / previous;
    if ratio >= TREND_UP_RATIO {
        Trend::Up
    } else if ratio <= TREND_DOWN_RATIO {
        Trend::Down
    } else {
        Trend::Flat
    }
}
