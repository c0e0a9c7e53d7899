use std::collections::BTreeMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::hours::{calculate_hours, efficiency, safe_divide};
use crate::models::{
    ActivationMeeting, ActivatorPerformanceMetrics, ActivityTotals, CallRecord, CallStatus,
    CtaResult, DailyMetrics, MeetingOutcome, MeetingStatus, MemberEvents, MessageRecord,
    ReportWindow, SdrPerformanceMetrics,
};
use crate::sessions::{build_activities, group_sessions, SessionRules};

/// Calls at least this long count as a conversation.
pub const CONVERSATION_MIN_SECONDS: i64 = 30;

pub fn is_conversation(call: &CallRecord) -> bool {
    call.duration_seconds() >= CONVERSATION_MIN_SECONDS
}

pub fn is_cta_acceptance(call: &CallRecord) -> bool {
    call.cta_attempted && call.cta_result == Some(CtaResult::Accepted)
}

impl ActivityTotals {
    pub fn dials_per_hour(&self) -> f64 {
        safe_divide(self.total_dials as f64, self.paid_hours)
    }

    pub fn conversations_per_hour(&self) -> f64 {
        safe_divide(self.conversations as f64, self.paid_hours)
    }

    /// Share of conversations in which a CTA was pitched, in percent.
    pub fn cta_attempt_rate(&self) -> f64 {
        safe_divide(self.cta_attempts as f64, self.conversations as f64) * 100.0
    }

    /// Share of CTA pitches that were accepted, in percent.
    pub fn cta_acceptance_rate(&self) -> f64 {
        safe_divide(self.cta_acceptances as f64, self.cta_attempts as f64) * 100.0
    }

    pub fn absorb(&mut self, other: &ActivityTotals) {
        self.session_count += other.session_count;
        self.paid_hours += other.paid_hours;
        self.active_hours += other.active_hours;
        self.total_dials += other.total_dials;
        self.connected_calls += other.connected_calls;
        self.conversations += other.conversations;
        self.cta_attempts += other.cta_attempts;
        self.cta_acceptances += other.cta_acceptances;
        self.emails_sent += other.emails_sent;
        self.sms_sent += other.sms_sent;
        self.efficiency = efficiency(self.active_hours, self.paid_hours);
    }
}

/// Per-day view of a window. Sessions are grouped across the whole window and
/// credited to the date they start on, so a session running past midnight is
/// counted once. Calls and messages are counted on their own dates.
pub fn daily_breakdown(
    calls: &[CallRecord],
    emails: &[MessageRecord],
    sms: &[MessageRecord],
    meetings_held: &[ActivationMeeting],
    window: &ReportWindow,
    rules: &SessionRules,
) -> Vec<DailyMetrics> {
    let calls: Vec<CallRecord> = calls
        .iter()
        .filter(|call| window.contains(call.initiated_at))
        .cloned()
        .collect();
    let emails: Vec<MessageRecord> = emails
        .iter()
        .filter(|email| window.contains(email.sent_at))
        .cloned()
        .collect();
    let sms: Vec<MessageRecord> = sms
        .iter()
        .filter(|message| window.contains(message.sent_at))
        .cloned()
        .collect();
    let meetings_held: Vec<ActivationMeeting> = meetings_held
        .iter()
        .filter(|meeting| window.contains(meeting.scheduled_start_at))
        .cloned()
        .collect();

    let activities = build_activities(&calls, &emails, &sms, &meetings_held);
    let sessions = group_sessions(&activities, rules);

    let mut days: BTreeMap<NaiveDate, ActivityTotals> = BTreeMap::new();
    for session in &sessions {
        let hours = calculate_hours(std::slice::from_ref(session), rules);
        let day = days.entry(session.started_at.date_naive()).or_default();
        day.session_count += 1;
        day.paid_hours += hours.paid_hours;
        day.active_hours += hours.active_hours;
    }

    for call in &calls {
        let day = days.entry(call.initiated_at.date_naive()).or_default();
        day.total_dials += 1;
        if call.status == CallStatus::Completed {
            day.connected_calls += 1;
        }
        if is_conversation(call) {
            day.conversations += 1;
        }
        if call.cta_attempted {
            day.cta_attempts += 1;
        }
        if is_cta_acceptance(call) {
            day.cta_acceptances += 1;
        }
    }
    for email in &emails {
        days.entry(email.sent_at.date_naive()).or_default().emails_sent += 1;
    }
    for message in &sms {
        days.entry(message.sent_at.date_naive()).or_default().sms_sent += 1;
    }

    days.into_iter()
        .map(|(date, mut totals)| {
            totals.efficiency = efficiency(totals.active_hours, totals.paid_hours);
            DailyMetrics { date, totals }
        })
        .collect()
}

/// Period totals. Each session lives in exactly one day, so summing days
/// gives the same hours as grouping the whole window at once.
pub fn sum_totals(daily: &[DailyMetrics]) -> ActivityTotals {
    let mut totals = ActivityTotals::default();
    for day in daily {
        totals.absorb(&day.totals);
    }
    totals
}

pub fn sdr_performance(
    member_id: Uuid,
    events: &MemberEvents,
    window: &ReportWindow,
    rules: &SessionRules,
) -> SdrPerformanceMetrics {
    let daily = daily_breakdown(&events.calls, &events.emails, &events.sms, &[], window, rules);
    let totals = sum_totals(&daily);

    let booked: Vec<&ActivationMeeting> = events
        .meetings
        .iter()
        .filter(|meeting| meeting.booked_by == Some(member_id))
        .filter(|meeting| window.contains(meeting.scheduled_start_at))
        .filter(|meeting| meeting.status != MeetingStatus::Cancelled)
        .collect();
    let attended = booked
        .iter()
        .filter(|meeting| meeting.status == MeetingStatus::Completed)
        .count();
    let no_shows = booked
        .iter()
        .filter(|meeting| meeting.status == MeetingStatus::NoShow)
        .count();

    SdrPerformanceMetrics {
        totals,
        install_appointments_booked: booked.len(),
        install_appointments_attended: attended,
        no_shows,
        show_rate: show_rate(attended, no_shows),
        daily,
    }
}

pub fn activator_performance(
    member_id: Uuid,
    events: &MemberEvents,
    window: &ReportWindow,
    rules: &SessionRules,
) -> ActivatorPerformanceMetrics {
    let assigned: Vec<ActivationMeeting> = events
        .meetings
        .iter()
        .filter(|meeting| meeting.activator_id == Some(member_id))
        .filter(|meeting| window.contains(meeting.scheduled_start_at))
        .cloned()
        .collect();
    let held: Vec<ActivationMeeting> = assigned
        .iter()
        .filter(|meeting| meeting.status == MeetingStatus::Completed)
        .cloned()
        .collect();

    let daily = daily_breakdown(&events.calls, &events.emails, &events.sms, &held, window, rules);
    let totals = sum_totals(&daily);

    let no_shows = assigned
        .iter()
        .filter(|meeting| meeting.status == MeetingStatus::NoShow)
        .count();
    let activations = assigned
        .iter()
        .filter(|meeting| meeting.outcome == Some(MeetingOutcome::Activated))
        .count();
    let kills = assigned
        .iter()
        .filter(|meeting| meeting.outcome == Some(MeetingOutcome::Killed))
        .count();

    ActivatorPerformanceMetrics {
        totals,
        meetings_held: held.len(),
        no_shows,
        activations,
        kills,
        activation_rate: safe_divide(activations as f64, (activations + kills) as f64) * 100.0,
        show_rate: show_rate(held.len(), no_shows),
        daily,
    }
}

pub fn show_rate(attended: usize, no_shows: usize) -> f64 {
    safe_divide(attended as f64, (attended + no_shows) as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn window() -> ReportWindow {
        ReportWindow {
            since: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
            until: Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap(),
        }
    }

    fn call(offset_seconds: i64, duration: i32, cta: Option<&str>) -> CallRecord {
        CallRecord {
            id: Uuid::new_v4(),
            initiated_at: base() + Duration::seconds(offset_seconds),
            duration: Some(duration),
            status: if duration > 0 {
                CallStatus::Completed
            } else {
                CallStatus::NoAnswer
            },
            outcome_code: None,
            cta_attempted: cta.is_some(),
            cta_result: cta.map(CtaResult::from),
        }
    }

    fn meeting(
        booked_by: Uuid,
        activator_id: Uuid,
        offset_hours: i64,
        status: &str,
        outcome: Option<&str>,
    ) -> ActivationMeeting {
        let start = base() + Duration::hours(offset_hours);
        ActivationMeeting {
            id: Uuid::new_v4(),
            booked_by: Some(booked_by),
            activator_id: Some(activator_id),
            status: MeetingStatus::from(status),
            scheduled_start_at: start,
            scheduled_end_at: start + Duration::minutes(30),
            outcome: outcome.map(MeetingOutcome::from),
        }
    }

    fn breakdown(calls: &[CallRecord]) -> Vec<DailyMetrics> {
        daily_breakdown(calls, &[], &[], &[], &window(), &SessionRules::default())
    }

    #[test]
    fn conversations_require_thirty_seconds() {
        assert!(!is_conversation(&call(0, 29, None)));
        assert!(is_conversation(&call(0, 30, None)));
        let mut unreported = call(0, 0, None);
        unreported.duration = None;
        assert!(!is_conversation(&unreported));
    }

    #[test]
    fn conversation_count_never_drops_as_calls_are_added() {
        let durations = [45, 5, 30, 0, 120, 29, 31];
        let mut calls = Vec::new();
        let mut previous = 0;
        for (index, duration) in durations.iter().enumerate() {
            calls.push(call(index as i64 * 300, *duration, None));
            let conversations = sum_totals(&breakdown(&calls)).conversations;
            assert!(conversations >= previous);
            previous = conversations;
        }
        assert_eq!(previous, 4);
    }

    #[test]
    fn counts_dials_connects_and_cta_rates() {
        let calls = vec![
            call(0, 40, Some("accepted")),
            call(1000, 20, None),
            call(5000, 0, None),
            call(5200, 90, Some("declined")),
            call(5400, 60, None),
        ];
        let totals = sum_totals(&breakdown(&calls));

        assert_eq!(totals.total_dials, 5);
        assert_eq!(totals.connected_calls, 4);
        assert_eq!(totals.conversations, 3);
        assert_eq!(totals.cta_attempts, 2);
        assert_eq!(totals.cta_acceptances, 1);
        assert!((totals.cta_attempt_rate() - 200.0 / 3.0).abs() < 1e-9);
        assert!((totals.cta_acceptance_rate() - 50.0).abs() < 1e-9);
        assert_eq!(totals.session_count, 2);
    }

    #[test]
    fn rates_are_zero_without_denominators() {
        let totals = ActivityTotals::default();
        assert_eq!(totals.dials_per_hour(), 0.0);
        assert_eq!(totals.conversations_per_hour(), 0.0);
        assert_eq!(totals.cta_attempt_rate(), 0.0);
        assert_eq!(totals.cta_acceptance_rate(), 0.0);
    }

    #[test]
    fn calls_across_midnight_share_one_session() {
        // Two calls 20 minutes apart on either side of midnight.
        let late = Utc.with_ymd_and_hms(2026, 3, 2, 23, 50, 0).unwrap() - base();
        let early = Utc.with_ymd_and_hms(2026, 3, 3, 0, 10, 0).unwrap() - base();
        let calls = vec![
            call(late.num_seconds(), 60, None),
            call(early.num_seconds(), 60, None),
        ];
        let daily = breakdown(&calls);

        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(daily[0].totals.session_count, 1);
        assert_eq!(daily[0].totals.total_dials, 1);
        assert_eq!(daily[1].date, NaiveDate::from_ymd_opt(2026, 3, 3).unwrap());
        assert_eq!(daily[1].totals.session_count, 0);
        assert_eq!(daily[1].totals.paid_hours, 0.0);
        assert_eq!(daily[1].totals.total_dials, 1);

        let totals = sum_totals(&daily);
        assert_eq!(totals.session_count, 1);
        // 23:50 to 00:11 plus a five minute buffer on each end.
        assert!((totals.paid_hours - (1260.0 + 600.0) / 3600.0).abs() < 1e-9);
        assert!((totals.efficiency - 120.0 / 1860.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn messages_without_call_time_leave_efficiency_at_zero() {
        let emails = vec![MessageRecord {
            id: Uuid::new_v4(),
            sent_at: base() + Duration::seconds(60),
        }];
        let sms = vec![MessageRecord {
            id: Uuid::new_v4(),
            sent_at: base() + Duration::seconds(120),
        }];
        let daily = daily_breakdown(
            &[call(0, 0, None)],
            &emails,
            &sms,
            &[],
            &window(),
            &SessionRules::default(),
        );
        let totals = sum_totals(&daily);

        assert_eq!(totals.session_count, 1);
        assert_eq!(totals.emails_sent, 1);
        assert_eq!(totals.sms_sent, 1);
        assert!(totals.paid_hours > 0.0);
        assert_eq!(totals.active_hours, 0.0);
        assert_eq!(totals.efficiency, 0.0);
    }

    #[test]
    fn events_outside_window_are_ignored() {
        let calls = vec![call(0, 60, None), call(-3 * 86_400, 60, None)];
        let totals = sum_totals(&breakdown(&calls));
        assert_eq!(totals.total_dials, 1);
    }

    #[test]
    fn sdr_counts_booked_attended_and_show_rate() {
        let sdr = Uuid::new_v4();
        let activator = Uuid::new_v4();
        let other_sdr = Uuid::new_v4();
        let events = MemberEvents {
            calls: vec![call(0, 120, Some("accepted"))],
            emails: vec![MessageRecord {
                id: Uuid::new_v4(),
                sent_at: base() + Duration::seconds(600),
            }],
            sms: Vec::new(),
            meetings: vec![
                meeting(sdr, activator, 24, "completed", Some("activated")),
                meeting(sdr, activator, 26, "completed", None),
                meeting(sdr, activator, 28, "no_show", None),
                meeting(sdr, activator, 30, "cancelled", None),
                meeting(sdr, activator, 32, "scheduled", None),
                meeting(other_sdr, activator, 34, "completed", None),
            ],
        };

        let metrics = sdr_performance(sdr, &events, &window(), &SessionRules::default());
        assert_eq!(metrics.install_appointments_booked, 4);
        assert_eq!(metrics.install_appointments_attended, 2);
        assert_eq!(metrics.no_shows, 1);
        assert!((metrics.show_rate - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(metrics.totals.emails_sent, 1);
        assert_eq!(metrics.totals.session_count, 1);
        assert_eq!(metrics.daily.len(), 1);
    }

    #[test]
    fn activator_counts_outcomes_and_meeting_time() {
        let sdr = Uuid::new_v4();
        let activator = Uuid::new_v4();
        let events = MemberEvents {
            calls: Vec::new(),
            emails: Vec::new(),
            sms: Vec::new(),
            meetings: vec![
                meeting(sdr, activator, 0, "completed", Some("activated")),
                meeting(sdr, activator, 2, "completed", Some("killed")),
                meeting(sdr, activator, 4, "completed", Some("activated")),
                meeting(sdr, activator, 6, "no_show", None),
                meeting(sdr, Uuid::new_v4(), 8, "completed", Some("activated")),
            ],
        };

        let metrics = activator_performance(activator, &events, &window(), &SessionRules::default());
        assert_eq!(metrics.meetings_held, 3);
        assert_eq!(metrics.no_shows, 1);
        assert_eq!(metrics.activations, 2);
        assert_eq!(metrics.kills, 1);
        assert!((metrics.activation_rate - 200.0 / 3.0).abs() < 1e-9);
        assert!((metrics.show_rate - 75.0).abs() < 1e-9);
        // Three half-hour meetings two hours apart: three separate sessions
        // that are paid but carry no call time.
        assert_eq!(metrics.totals.session_count, 3);
        assert_eq!(metrics.totals.active_hours, 0.0);
        assert!((metrics.totals.paid_hours - 3.0 * 40.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn show_rate_is_zero_without_meetings() {
        assert_eq!(show_rate(0, 0), 0.0);
        assert!((show_rate(3, 1) - 75.0).abs() < 1e-9);
    }
}
