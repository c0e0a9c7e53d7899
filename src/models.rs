use std::fmt;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Sdr,
    Activator,
}

impl Role {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sdr" => Some(Role::Sdr),
            "activator" => Some(Role::Activator),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Sdr => "sdr",
            Role::Activator => "activator",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TeamMember {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStatus {
    Completed,
    NoAnswer,
    Busy,
    Failed,
    Canceled,
    InProgress,
    Other(String),
}

impl From<&str> for CallStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "completed" => CallStatus::Completed,
            "no_answer" => CallStatus::NoAnswer,
            "busy" => CallStatus::Busy,
            "failed" => CallStatus::Failed,
            "canceled" | "cancelled" => CallStatus::Canceled,
            "in_progress" => CallStatus::InProgress,
            _ => CallStatus::Other(value.to_string()),
        }
    }
}

impl CallStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CallStatus::Completed => "completed",
            CallStatus::NoAnswer => "no_answer",
            CallStatus::Busy => "busy",
            CallStatus::Failed => "failed",
            CallStatus::Canceled => "canceled",
            CallStatus::InProgress => "in_progress",
            CallStatus::Other(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CtaResult {
    Accepted,
    Declined,
    FollowUp,
    Other(String),
}

impl From<&str> for CtaResult {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "accepted" | "yes" => CtaResult::Accepted,
            "declined" | "no" => CtaResult::Declined,
            "follow_up" | "maybe" => CtaResult::FollowUp,
            _ => CtaResult::Other(value.to_string()),
        }
    }
}

impl CtaResult {
    pub fn as_str(&self) -> &str {
        match self {
            CtaResult::Accepted => "accepted",
            CtaResult::Declined => "declined",
            CtaResult::FollowUp => "follow_up",
            CtaResult::Other(value) => value,
        }
    }
}

/// A call as logged by the telephony provider. Never mutated after logging.
#[derive(Debug, Clone)]
pub struct CallRecord {
    pub id: Uuid,
    pub initiated_at: DateTime<Utc>,
    /// Seconds of talk time; `None` when the provider never reported one.
    pub duration: Option<i32>,
    pub status: CallStatus,
    pub outcome_code: Option<String>,
    pub cta_attempted: bool,
    pub cta_result: Option<CtaResult>,
}

impl CallRecord {
    pub fn duration_seconds(&self) -> i64 {
        self.duration.map(i64::from).unwrap_or(0).max(0)
    }
}

/// An outbound email or SMS. Only the send time matters to the metrics.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: Uuid,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingStatus {
    Scheduled,
    Completed,
    NoShow,
    Cancelled,
    Rescheduled,
    Other(String),
}

impl From<&str> for MeetingStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "scheduled" => MeetingStatus::Scheduled,
            "completed" | "attended" => MeetingStatus::Completed,
            "no_show" => MeetingStatus::NoShow,
            "cancelled" | "canceled" => MeetingStatus::Cancelled,
            "rescheduled" => MeetingStatus::Rescheduled,
            _ => MeetingStatus::Other(value.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeetingOutcome {
    Activated,
    Killed,
    FollowUp,
    Other(String),
}

impl From<&str> for MeetingOutcome {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "activated" => MeetingOutcome::Activated,
            "killed" => MeetingOutcome::Killed,
            "follow_up" => MeetingOutcome::FollowUp,
            _ => MeetingOutcome::Other(value.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ActivationMeeting {
    pub id: Uuid,
    pub booked_by: Option<Uuid>,
    pub activator_id: Option<Uuid>,
    pub status: MeetingStatus,
    pub scheduled_start_at: DateTime<Utc>,
    pub scheduled_end_at: DateTime<Utc>,
    pub outcome: Option<MeetingOutcome>,
}

/// Everything one member did inside a fetch window.
#[derive(Debug, Clone, Default)]
pub struct MemberEvents {
    pub calls: Vec<CallRecord>,
    pub emails: Vec<MessageRecord>,
    pub sms: Vec<MessageRecord>,
    pub meetings: Vec<ActivationMeeting>,
}

/// Per-campaign targets. Rates are percentages, weekly goals are per 7 days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignGoals {
    pub target_dials_per_hour: f64,
    pub target_conversations_per_hour: f64,
    pub target_cta_attempt_rate: f64,
    pub target_cta_acceptance_rate: f64,
    pub weekly_hours_goal: f64,
    pub weekly_appointments_goal: f64,
    pub weekly_activations_goal: f64,
    pub min_show_rate: f64,
    pub min_efficiency: f64,
}

impl Default for CampaignGoals {
    fn default() -> Self {
        CampaignGoals {
            target_dials_per_hour: 20.0,
            target_conversations_per_hour: 3.0,
            target_cta_attempt_rate: 40.0,
            target_cta_acceptance_rate: 25.0,
            weekly_hours_goal: 40.0,
            weekly_appointments_goal: 15.0,
            weekly_activations_goal: 10.0,
            min_show_rate: 70.0,
            min_efficiency: 30.0,
        }
    }
}

/// One entry on a member's work timeline, calls and synthesized message activity alike.
/// Every entry extends the timeline; only `call_seconds` counts as active time.
#[derive(Debug, Clone)]
pub struct Activity {
    /// Id of the call, message or meeting row this entry came from.
    pub source_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: i64,
    pub call_seconds: i64,
}

impl Activity {
    pub fn ended_at(&self) -> DateTime<Utc> {
        self.started_at + Duration::seconds(self.duration_seconds.max(0))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub active_seconds: i64,
    pub event_count: usize,
}

impl Session {
    pub fn span_seconds(&self) -> i64 {
        (self.ended_at - self.started_at).num_seconds().max(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivityTotals {
    pub session_count: usize,
    pub paid_hours: f64,
    pub active_hours: f64,
    pub efficiency: f64,
    pub total_dials: usize,
    pub connected_calls: usize,
    pub conversations: usize,
    pub cta_attempts: usize,
    pub cta_acceptances: usize,
    pub emails_sent: usize,
    pub sms_sent: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: ActivityTotals,
}

#[derive(Debug, Clone, Serialize)]
pub struct SdrPerformanceMetrics {
    pub totals: ActivityTotals,
    pub install_appointments_booked: usize,
    pub install_appointments_attended: usize,
    pub no_shows: usize,
    pub show_rate: f64,
    pub daily: Vec<DailyMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivatorPerformanceMetrics {
    pub totals: ActivityTotals,
    pub meetings_held: usize,
    pub no_shows: usize,
    pub activations: usize,
    pub kills: usize,
    pub activation_rate: f64,
    pub show_rate: f64,
    pub daily: Vec<DailyMetrics>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    Green,
    Yellow,
    Orange,
    Red,
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScoreBand::Green => "green",
            ScoreBand::Yellow => "yellow",
            ScoreBand::Orange => "orange",
            ScoreBand::Red => "red",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Up => "up",
            Trend::Down => "down",
            Trend::Flat => "flat",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalComparison {
    pub metric: &'static str,
    pub actual: f64,
    pub target: f64,
    pub ratio: f64,
    pub band: ScoreBand,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalScorecard {
    pub comparisons: Vec<GoalComparison>,
    /// Average of the per-metric ratios, each capped at 100%.
    pub overall_score: f64,
    pub overall_band: ScoreBand,
    pub shortfalls: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberScore {
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub totals: ActivityTotals,
    pub scorecard: GoalScorecard,
    pub hours_band: ScoreBand,
    pub primary_metric: &'static str,
    pub primary_value: f64,
    pub previous_value: f64,
    pub trend: Trend,
}

#[derive(Debug, Clone)]
pub struct OutcomeSummary {
    pub outcome_code: String,
    pub count: usize,
    pub avg_duration: f64,
}

/// Half-open `[since, until)` time range that metrics are computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

/// Longest window the CLI accepts, about ten years.
pub const MAX_WINDOW_DAYS: i64 = 3660;

impl ReportWindow {
    /// `days` is clamped to `1..=MAX_WINDOW_DAYS`.
    pub fn trailing_days(days: i64, now: DateTime<Utc>) -> Self {
        ReportWindow {
            since: now - Duration::days(days.clamp(1, MAX_WINDOW_DAYS)),
            until: now,
        }
    }

    /// The window of equal length that ends where this one starts.
    pub fn previous(&self) -> Self {
        ReportWindow {
            since: self.since - (self.until - self.since),
            until: self.since,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.since && at < self.until
    }

    pub fn days(&self) -> f64 {
        (self.until - self.since).num_seconds() as f64 / 86_400.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn statuses_parse_loosely_and_keep_unknowns() {
        assert_eq!(CallStatus::from("no-answer"), CallStatus::NoAnswer);
        assert_eq!(CallStatus::from("Completed"), CallStatus::Completed);
        assert_eq!(
            CallStatus::from("voicemail"),
            CallStatus::Other("voicemail".to_string())
        );
        assert_eq!(CtaResult::from("accepted"), CtaResult::Accepted);
        assert_eq!(MeetingStatus::from("no_show"), MeetingStatus::NoShow);
        assert_eq!(MeetingOutcome::from("killed"), MeetingOutcome::Killed);
        assert_eq!(Role::parse("Activator"), Some(Role::Activator));
        assert_eq!(Role::parse("manager"), None);
    }

    #[test]
    fn null_or_negative_duration_counts_as_zero() {
        let mut call = CallRecord {
            id: Uuid::new_v4(),
            initiated_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
            duration: None,
            status: CallStatus::NoAnswer,
            outcome_code: None,
            cta_attempted: false,
            cta_result: None,
        };
        assert_eq!(call.duration_seconds(), 0);
        call.duration = Some(-5);
        assert_eq!(call.duration_seconds(), 0);
    }

    #[test]
    fn previous_window_abuts_current() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap();
        let window = ReportWindow::trailing_days(7, now);
        let previous = window.previous();
        assert_eq!(previous.until, window.since);
        assert_eq!(previous.since, now - Duration::days(14));
        assert!((window.days() - 7.0).abs() < 1e-9);
        assert!(window.contains(window.since));
        assert!(!window.contains(window.until));
    }

    #[test]
    fn trailing_window_is_at_least_one_day() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap();
        let window = ReportWindow::trailing_days(0, now);
        assert_eq!(window.since, now - Duration::days(1));
    }

    #[test]
    fn oversized_window_is_clamped_instead_of_overflowing() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap();
        let window = ReportWindow::trailing_days(10_000_000_000_000, now);
        assert_eq!(window.since, now - Duration::days(MAX_WINDOW_DAYS));
        assert_eq!(window.previous().until, window.since);
    }
}
