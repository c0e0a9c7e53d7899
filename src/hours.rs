use crate::models::Session;
use crate::sessions::SessionRules;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoursSummary {
    pub paid_hours: f64,
    pub active_hours: f64,
    pub efficiency: f64,
}

pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

pub fn efficiency(active_hours: f64, paid_hours: f64) -> f64 {
    if paid_hours <= 0.0 {
        0.0
    } else {
        active_hours / paid_hours * 100.0
    }
}

/// Paid time is every session's span plus the buffer on both ends; active
/// time is the work accumulated inside the sessions.
pub fn calculate_hours(sessions: &[Session], rules: &SessionRules) -> HoursSummary {
    let paid_seconds: i64 = sessions
        .iter()
        .map(|session| session.span_seconds() + 2 * rules.buffer_seconds)
        .sum();
    let active_seconds: i64 = sessions.iter().map(|session| session.active_seconds).sum();

    let paid_hours = paid_seconds as f64 / 3600.0;
    let active_hours = active_seconds as f64 / 3600.0;

    HoursSummary {
        paid_hours,
        active_hours,
        efficiency: efficiency(active_hours, paid_hours),
    }
}
