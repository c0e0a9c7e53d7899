use tracing::debug;

use crate::models::{Activity, ActivationMeeting, CallRecord, MessageRecord, Session};

/// A gap this long or longer between activities ends a work session.
pub const SESSION_GAP_SECONDS: i64 = 30 * 60;
/// Paid time padded onto each end of a session.
pub const SESSION_BUFFER_SECONDS: i64 = 5 * 60;
pub const EMAIL_ACTIVITY_SECONDS: i64 = 60;
pub const SMS_ACTIVITY_SECONDS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRules {
    pub gap_seconds: i64,
    pub buffer_seconds: i64,
}

impl Default for SessionRules {
    fn default() -> Self {
        SessionRules {
            gap_seconds: SESSION_GAP_SECONDS,
            buffer_seconds: SESSION_BUFFER_SECONDS,
        }
    }
}

pub fn build_activities(
    calls: &[CallRecord],
    emails: &[MessageRecord],
    sms: &[MessageRecord],
    meetings_held: &[ActivationMeeting],
) -> Vec<Activity> {
    let mut activities: Vec<Activity> = calls
        .iter()
        .map(|call| Activity {
            source_id: call.id,
            started_at: call.initiated_at,
            duration_seconds: call.duration_seconds(),
            call_seconds: call.duration_seconds(),
        })
        .collect();

    activities.extend(emails.iter().map(|email| Activity {
        source_id: email.id,
        started_at: email.sent_at,
        duration_seconds: EMAIL_ACTIVITY_SECONDS,
        call_seconds: 0,
    }));
    activities.extend(sms.iter().map(|sms| Activity {
        source_id: sms.id,
        started_at: sms.sent_at,
        duration_seconds: SMS_ACTIVITY_SECONDS,
        call_seconds: 0,
    }));
    activities.extend(meetings_held.iter().map(|meeting| Activity {
        source_id: meeting.id,
        started_at: meeting.scheduled_start_at,
        duration_seconds: (meeting.scheduled_end_at - meeting.scheduled_start_at)
            .num_seconds()
            .max(0),
        call_seconds: 0,
    }));

    activities
}

/// Groups activities into sessions, in start order. Input order does not matter.
/// Sessions accumulate call time only; messages and meetings just keep them open.
pub fn group_sessions(activities: &[Activity], rules: &SessionRules) -> Vec<Session> {
    let mut sorted: Vec<&Activity> = activities.iter().collect();
    sorted.sort_by_key(|activity| (activity.started_at, activity.source_id));

    let mut sessions: Vec<Session> = Vec::new();
    for activity in sorted {
        let ended_at = activity.ended_at();
        let call_seconds = activity.call_seconds.max(0);

        match sessions.last_mut() {
            Some(current)
                if (activity.started_at - current.ended_at).num_seconds() < rules.gap_seconds =>
            {
                current.ended_at = current.ended_at.max(ended_at);
                current.active_seconds += call_seconds;
                current.event_count += 1;
            }
            _ => sessions.push(Session {
                started_at: activity.started_at,
                ended_at,
                active_seconds: call_seconds,
                event_count: 1,
            }),
        }
    }

    debug!(
        activities = activities.len(),
        sessions = sessions.len(),
        "grouped activity into sessions"
    );
    sessions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CallStatus;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn call_at(offset_seconds: i64, duration: i32) -> CallRecord {
        CallRecord {
            id: Uuid::new_v4(),
            initiated_at: base() + Duration::seconds(offset_seconds),
            duration: Some(duration),
            status: CallStatus::Completed,
            outcome_code: None,
            cta_attempted: false,
            cta_result: None,
        }
    }

    fn message_at(offset_seconds: i64) -> MessageRecord {
        MessageRecord {
            id: Uuid::new_v4(),
            sent_at: base() + Duration::seconds(offset_seconds),
        }
    }

    fn sessions_for(calls: &[CallRecord]) -> Vec<Session> {
        let activities = build_activities(calls, &[], &[], &[]);
        group_sessions(&activities, &SessionRules::default())
    }

    #[test]
    fn reference_scenario_splits_into_two_sessions() {
        let calls = vec![call_at(5000, 0), call_at(0, 40), call_at(1000, 20)];
        let sessions = sessions_for(&calls);

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].started_at, base());
        assert_eq!(sessions[0].span_seconds(), 1020);
        assert_eq!(sessions[0].active_seconds, 60);
        assert_eq!(sessions[0].event_count, 2);
        assert_eq!(sessions[1].span_seconds(), 0);
        assert_eq!(sessions[1].event_count, 1);
    }

    #[test]
    fn gap_of_exactly_thirty_minutes_starts_new_session() {
        let calls = vec![call_at(0, 0), call_at(SESSION_GAP_SECONDS, 0)];
        assert_eq!(sessions_for(&calls).len(), 2);
    }

    #[test]
    fn gap_just_under_thirty_minutes_stays_in_session() {
        let calls = vec![call_at(0, 0), call_at(SESSION_GAP_SECONDS - 1, 0)];
        assert_eq!(sessions_for(&calls).len(), 1);
    }

    #[test]
    fn gap_is_measured_from_end_of_previous_call() {
        // A 20 minute call followed by one starting 45 minutes after it began.
        let calls = vec![call_at(0, 1200), call_at(2700, 10)];
        assert_eq!(sessions_for(&calls).len(), 1);
    }

    #[test]
    fn long_call_keeps_session_end_when_short_call_overlaps() {
        let calls = vec![call_at(0, 3600), call_at(60, 30)];
        let sessions = sessions_for(&calls);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].span_seconds(), 3600);
        assert_eq!(sessions[0].active_seconds, 3630);
    }

    #[test]
    fn messages_bridge_gaps_between_calls() {
        let calls = vec![call_at(0, 0), call_at(3000, 0)];
        let emails = vec![message_at(1500)];
        let sms = vec![message_at(2200)];
        let activities = build_activities(&calls, &emails, &sms, &[]);
        let sessions = group_sessions(&activities, &SessionRules::default());

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].active_seconds, 0);
        assert_eq!(sessions[0].span_seconds(), 3000);
        assert_eq!(sessions[0].event_count, 4);
    }

    #[test]
    fn messages_extend_session_without_adding_active_time() {
        let calls = vec![call_at(0, 0)];
        let emails = vec![message_at(60)];
        let sms = vec![message_at(120)];
        let activities = build_activities(&calls, &emails, &sms, &[]);
        let sessions = group_sessions(&activities, &SessionRules::default());

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].active_seconds, 0);
        assert_eq!(sessions[0].span_seconds(), 120 + SMS_ACTIVITY_SECONDS);
    }

    #[test]
    fn activities_starting_together_sort_by_source_id() {
        let mut first = call_at(0, 10);
        let mut second = call_at(0, 20);
        first.id = Uuid::from_u128(1);
        second.id = Uuid::from_u128(2);
        let forward = build_activities(&[first.clone(), second.clone()], &[], &[], &[]);
        let reversed = build_activities(&[second, first], &[], &[], &[]);

        let rules = SessionRules::default();
        assert_eq!(
            group_sessions(&forward, &rules),
            group_sessions(&reversed, &rules)
        );
    }

    #[test]
    fn held_meetings_extend_session_but_not_active_time() {
        let meeting = ActivationMeeting {
            id: Uuid::new_v4(),
            booked_by: None,
            activator_id: None,
            status: crate::models::MeetingStatus::Completed,
            scheduled_start_at: base() + Duration::seconds(600),
            scheduled_end_at: base() + Duration::seconds(600 + 2700),
            outcome: None,
        };
        let calls = vec![call_at(0, 120)];
        let activities = build_activities(&calls, &[], &[], &[meeting]);
        let sessions = group_sessions(&activities, &SessionRules::default());

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].active_seconds, 120);
        assert_eq!(sessions[0].span_seconds(), 3300);
    }

    #[test]
    fn empty_input_has_no_sessions() {
        assert!(group_sessions(&[], &SessionRules::default()).is_empty());
    }
}
