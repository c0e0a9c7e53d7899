use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    ActivationMeeting, CallRecord, CallStatus, CampaignGoals, CtaResult, MeetingOutcome,
    MeetingStatus, MemberEvents, MessageRecord, Role, TeamMember,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

struct NewCall {
    member_id: Uuid,
    campaign_id: Option<Uuid>,
    initiated_at: DateTime<Utc>,
    duration: Option<i32>,
    status: CallStatus,
    outcome_code: Option<String>,
    cta_attempted: bool,
    cta_result: Option<CtaResult>,
    source_key: String,
}

struct NewMeeting {
    booked_by: Uuid,
    activator_id: Uuid,
    campaign_id: Uuid,
    status: &'static str,
    scheduled_start_at: DateTime<Utc>,
    duration_minutes: i64,
    outcome: Option<&'static str>,
    source_key: String,
}

#[derive(Clone, Copy)]
enum MessageTable {
    Email,
    Sms,
}

impl MessageTable {
    fn name(self) -> &'static str {
        match self {
            MessageTable::Email => "sdr_metrics.email_messages",
            MessageTable::Sms => "sdr_metrics.sms_messages",
        }
    }
}

/// Returns whether a row was written; duplicate source keys are skipped.
async fn insert_call(pool: &PgPool, call: &NewCall) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO sdr_metrics.calls
        (id, member_id, campaign_id, initiated_at, duration, status, outcome_code,
         cta_attempted, cta_result, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(call.member_id)
    .bind(call.campaign_id)
    .bind(call.initiated_at)
    .bind(call.duration)
    .bind(call.status.as_str())
    .bind(call.outcome_code.as_deref())
    .bind(call.cta_attempted)
    .bind(call.cta_result.as_ref().map(|result| result.as_str()))
    .bind(&call.source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

async fn insert_message(
    pool: &PgPool,
    table: MessageTable,
    member_id: Uuid,
    campaign_id: Uuid,
    sent_at: DateTime<Utc>,
    source_key: &str,
) -> anyhow::Result<()> {
    let query = format!(
        "INSERT INTO {} (id, member_id, campaign_id, sent_at, source_key) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (source_key) DO NOTHING",
        table.name()
    );

    sqlx::query(&query)
        .bind(Uuid::new_v4())
        .bind(member_id)
        .bind(campaign_id)
        .bind(sent_at)
        .bind(source_key)
        .execute(pool)
        .await?;

    Ok(())
}

async fn insert_meeting(pool: &PgPool, meeting: &NewMeeting) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sdr_metrics.activation_meetings
        (id, booked_by, activator_id, campaign_id, status, scheduled_start_at,
         scheduled_end_at, outcome, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(meeting.booked_by)
    .bind(meeting.activator_id)
    .bind(meeting.campaign_id)
    .bind(meeting.status)
    .bind(meeting.scheduled_start_at)
    .bind(meeting.scheduled_start_at + Duration::minutes(meeting.duration_minutes))
    .bind(meeting.outcome)
    .bind(&meeting.source_key)
    .execute(pool)
    .await?;

    Ok(())
}

async fn upsert_member(
    pool: &PgPool,
    full_name: &str,
    email: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO sdr_metrics.team_members (id, full_name, email, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name, role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(full_name)
    .bind(email)
    .bind(role.as_str())
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

async fn upsert_campaign(pool: &PgPool, name: &str) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO sdr_metrics.campaigns (id, name)
        VALUES ($1, $2)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_one(pool)
    .await?
    .get("id");

    Ok(id)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let sdrs = [
        (
            upsert_member(pool, "Dana Whitfield", "dana.whitfield@example.com", Role::Sdr).await?,
            0i64,
        ),
        (
            upsert_member(pool, "Marcus Ortega", "marcus.ortega@example.com", Role::Sdr).await?,
            1i64,
        ),
    ];
    let activator_id =
        upsert_member(pool, "Priya Nair", "priya.nair@example.com", Role::Activator).await?;
    let campaign_id = upsert_campaign(pool, "Spring Trial Push").await?;

    sqlx::query(
        r#"
        INSERT INTO sdr_metrics.campaign_goals
        (campaign_id, target_dials_per_hour, target_conversations_per_hour,
         weekly_appointments_goal)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (campaign_id) DO UPDATE
        SET target_dials_per_hour = EXCLUDED.target_dials_per_hour,
            target_conversations_per_hour = EXCLUDED.target_conversations_per_hour,
            weekly_appointments_goal = EXCLUDED.weekly_appointments_goal,
            updated_at = now()
        "#,
    )
    .bind(campaign_id)
    .bind(25.0_f64)
    .bind(4.0_f64)
    .bind(12.0_f64)
    .execute(pool)
    .await?;

    const DURATIONS: [i32; 7] = [0, 45, 12, 95, 0, 31, 180];
    let today = Utc::now().date_naive();

    for day_offset in 1..=14i64 {
        let day_start = (today - Duration::days(day_offset))
            .and_hms_opt(14, 0, 0)
            .context("invalid seed time")?
            .and_utc();

        for (sdr_id, sdr_index) in sdrs {
            let call_count = 12 + (day_offset + sdr_index * 3) % 7;
            for index in 0..call_count {
                let pattern = ((index + day_offset) % 7) as usize;
                let duration = DURATIONS[pattern];
                let outcome_code = match duration {
                    0 => "no_answer",
                    1..=29 => "gatekeeper",
                    _ if (index + sdr_index) % 2 == 0 => "interested",
                    _ => "not_interested",
                };
                let cta_attempted = duration >= 60;
                let cta_result = cta_attempted.then(|| {
                    if (index + day_offset + sdr_index) % 3 == 0 {
                        CtaResult::Accepted
                    } else {
                        CtaResult::Declined
                    }
                });

                insert_call(
                    pool,
                    &NewCall {
                        member_id: sdr_id,
                        campaign_id: Some(campaign_id),
                        initiated_at: day_start + Duration::minutes(index * 4),
                        duration: Some(duration),
                        status: if duration > 0 {
                            CallStatus::Completed
                        } else {
                            CallStatus::NoAnswer
                        },
                        outcome_code: Some(outcome_code.to_string()),
                        cta_attempted,
                        cta_result,
                        source_key: format!("seed-call-{sdr_index}-{day_offset}-{index}"),
                    },
                )
                .await?;
            }

            let follow_up_start = day_start + Duration::minutes(call_count * 4);
            for index in 0..3i64 {
                insert_message(
                    pool,
                    MessageTable::Email,
                    sdr_id,
                    campaign_id,
                    follow_up_start + Duration::minutes(index * 2),
                    &format!("seed-email-{sdr_index}-{day_offset}-{index}"),
                )
                .await?;
            }
            for index in 0..2i64 {
                insert_message(
                    pool,
                    MessageTable::Sms,
                    sdr_id,
                    campaign_id,
                    follow_up_start + Duration::minutes(6 + index * 3),
                    &format!("seed-sms-{sdr_index}-{day_offset}-{index}"),
                )
                .await?;
            }

            if (day_offset + sdr_index) % 2 == 0 {
                let no_show = day_offset % 4 == 0;
                insert_meeting(
                    pool,
                    &NewMeeting {
                        booked_by: sdr_id,
                        activator_id,
                        campaign_id,
                        status: if no_show { "no_show" } else { "completed" },
                        scheduled_start_at: day_start + Duration::hours(3 + sdr_index),
                        duration_minutes: 45,
                        outcome: match (no_show, day_offset % 3 == 0) {
                            (true, _) => None,
                            (false, true) => Some("killed"),
                            (false, false) => Some("activated"),
                        },
                        source_key: format!("seed-meeting-{sdr_index}-{day_offset}"),
                    },
                )
                .await?;
            }
        }
    }

    info!(campaign = %campaign_id, "seeded demo team");
    Ok(())
}

pub async fn fetch_members(
    pool: &PgPool,
    email: Option<&str>,
    role: Option<Role>,
) -> anyhow::Result<Vec<TeamMember>> {
    let mut query = String::from(
        "SELECT id, full_name, email, role FROM sdr_metrics.team_members WHERE true",
    );

    if email.is_some() {
        query.push_str(" AND email = $1");
    } else if role.is_some() {
        query.push_str(" AND role = $1");
    }
    query.push_str(" ORDER BY full_name");

    let mut rows = sqlx::query(&query);
    if let Some(value) = email {
        rows = rows.bind(value);
    } else if let Some(value) = role {
        rows = rows.bind(value.as_str());
    }

    let mut members = Vec::new();
    for row in rows.fetch_all(pool).await? {
        let role_label: String = row.get("role");
        let email: String = row.get("email");
        let role = Role::parse(&role_label)
            .with_context(|| format!("team member {email} has unknown role '{role_label}'"))?;

        members.push(TeamMember {
            id: row.get("id"),
            full_name: row.get("full_name"),
            email,
            role,
        });
    }

    Ok(members)
}

pub async fn find_campaign_id(pool: &PgPool, name: &str) -> anyhow::Result<Uuid> {
    let row = sqlx::query("SELECT id FROM sdr_metrics.campaigns WHERE name = $1")
        .bind(name)
        .fetch_optional(pool)
        .await?
        .with_context(|| format!("campaign '{name}' not found"))?;

    Ok(row.get("id"))
}

/// Goals for a campaign, with built-in defaults for anything unset. Without a
/// campaign the defaults apply as-is.
pub async fn fetch_campaign_goals(
    pool: &PgPool,
    campaign_id: Option<Uuid>,
) -> anyhow::Result<CampaignGoals> {
    let defaults = CampaignGoals::default();
    let Some(campaign_id) = campaign_id else {
        return Ok(defaults);
    };

    let row = sqlx::query(
        r#"
        SELECT target_dials_per_hour, target_conversations_per_hour,
               target_cta_attempt_rate, target_cta_acceptance_rate,
               weekly_hours_goal, weekly_appointments_goal, weekly_activations_goal,
               min_show_rate, min_efficiency
        FROM sdr_metrics.campaign_goals
        WHERE campaign_id = $1
        "#,
    )
    .bind(campaign_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        debug!(campaign = %campaign_id, "no goals configured, using defaults");
        return Ok(defaults);
    };

    let value = |column: &str, fallback: f64| -> f64 {
        row.get::<Option<f64>, _>(column).unwrap_or(fallback)
    };

    Ok(CampaignGoals {
        target_dials_per_hour: value("target_dials_per_hour", defaults.target_dials_per_hour),
        target_conversations_per_hour: value(
            "target_conversations_per_hour",
            defaults.target_conversations_per_hour,
        ),
        target_cta_attempt_rate: value(
            "target_cta_attempt_rate",
            defaults.target_cta_attempt_rate,
        ),
        target_cta_acceptance_rate: value(
            "target_cta_acceptance_rate",
            defaults.target_cta_acceptance_rate,
        ),
        weekly_hours_goal: value("weekly_hours_goal", defaults.weekly_hours_goal),
        weekly_appointments_goal: value(
            "weekly_appointments_goal",
            defaults.weekly_appointments_goal,
        ),
        weekly_activations_goal: value(
            "weekly_activations_goal",
            defaults.weekly_activations_goal,
        ),
        min_show_rate: value("min_show_rate", defaults.min_show_rate),
        min_efficiency: value("min_efficiency", defaults.min_efficiency),
    })
}

async fn fetch_messages(
    pool: &PgPool,
    table: MessageTable,
    member_id: Uuid,
    campaign_id: Option<Uuid>,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> anyhow::Result<Vec<MessageRecord>> {
    let mut query = format!(
        "SELECT id, sent_at FROM {} \
         WHERE member_id = $1 AND sent_at >= $2 AND sent_at < $3",
        table.name()
    );
    if campaign_id.is_some() {
        query.push_str(" AND campaign_id = $4");
    }

    let mut rows = sqlx::query(&query).bind(member_id).bind(since).bind(until);
    if let Some(value) = campaign_id {
        rows = rows.bind(value);
    }

    let messages = rows
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| MessageRecord {
            id: row.get("id"),
            sent_at: row.get("sent_at"),
        })
        .collect();

    Ok(messages)
}

/// Loads every event a member touched in `[since, until)`: their own calls
/// and messages, plus meetings they booked or were assigned to run.
pub async fn fetch_member_events(
    pool: &PgPool,
    member_id: Uuid,
    campaign_id: Option<Uuid>,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> anyhow::Result<MemberEvents> {
    let mut query = String::from(
        "SELECT id, initiated_at, duration, status, outcome_code, cta_attempted, cta_result \
         FROM sdr_metrics.calls \
         WHERE member_id = $1 AND initiated_at >= $2 AND initiated_at < $3",
    );
    if campaign_id.is_some() {
        query.push_str(" AND campaign_id = $4");
    }

    let mut rows = sqlx::query(&query).bind(member_id).bind(since).bind(until);
    if let Some(value) = campaign_id {
        rows = rows.bind(value);
    }

    let mut calls = Vec::new();
    for row in rows.fetch_all(pool).await? {
        let status: String = row.get("status");
        let cta_result: Option<String> = row.get("cta_result");
        calls.push(CallRecord {
            id: row.get("id"),
            initiated_at: row.get("initiated_at"),
            duration: row.get("duration"),
            status: CallStatus::from(status.as_str()),
            outcome_code: row.get("outcome_code"),
            cta_attempted: row.get("cta_attempted"),
            cta_result: cta_result.as_deref().map(CtaResult::from),
        });
    }

    let mut query = String::from(
        "SELECT id, booked_by, activator_id, status, scheduled_start_at, scheduled_end_at, outcome \
         FROM sdr_metrics.activation_meetings \
         WHERE (booked_by = $1 OR activator_id = $1) \
         AND scheduled_start_at >= $2 AND scheduled_start_at < $3",
    );
    if campaign_id.is_some() {
        query.push_str(" AND campaign_id = $4");
    }

    let mut rows = sqlx::query(&query).bind(member_id).bind(since).bind(until);
    if let Some(value) = campaign_id {
        rows = rows.bind(value);
    }

    let mut meetings = Vec::new();
    for row in rows.fetch_all(pool).await? {
        let status: String = row.get("status");
        let outcome: Option<String> = row.get("outcome");
        meetings.push(ActivationMeeting {
            id: row.get("id"),
            booked_by: row.get("booked_by"),
            activator_id: row.get("activator_id"),
            status: MeetingStatus::from(status.as_str()),
            scheduled_start_at: row.get("scheduled_start_at"),
            scheduled_end_at: row.get("scheduled_end_at"),
            outcome: outcome.as_deref().map(MeetingOutcome::from),
        });
    }

    let events = MemberEvents {
        calls,
        emails: fetch_messages(pool, MessageTable::Email, member_id, campaign_id, since, until)
            .await?,
        sms: fetch_messages(pool, MessageTable::Sms, member_id, campaign_id, since, until)
            .await?,
        meetings,
    };

    debug!(
        member = %member_id,
        calls = events.calls.len(),
        emails = events.emails.len(),
        sms = events.sms.len(),
        meetings = events.meetings.len(),
        "fetched member events"
    );
    Ok(events)
}

pub async fn import_calls_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        member_email: String,
        campaign: Option<String>,
        initiated_at: DateTime<Utc>,
        duration: Option<i32>,
        status: String,
        outcome_code: Option<String>,
        cta_attempted: bool,
        cta_result: Option<String>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut members: HashMap<String, Uuid> = HashMap::new();
    let mut campaigns: HashMap<String, Uuid> = HashMap::new();
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid call row {}", line + 1))?;

        let member_id = match members.get(&row.member_email) {
            Some(id) => *id,
            None => {
                let id: Uuid = sqlx::query(
                    "SELECT id FROM sdr_metrics.team_members WHERE email = $1",
                )
                .bind(&row.member_email)
                .fetch_optional(pool)
                .await?
                .with_context(|| format!("unknown team member {}", row.member_email))?
                .get("id");
                members.insert(row.member_email.clone(), id);
                id
            }
        };

        let campaign_id = match row.campaign.as_deref() {
            None => None,
            Some(name) => match campaigns.get(name) {
                Some(id) => Some(*id),
                None => {
                    let id = upsert_campaign(pool, name).await?;
                    campaigns.insert(name.to_string(), id);
                    Some(id)
                }
            },
        };

        let call = NewCall {
            member_id,
            campaign_id,
            initiated_at: row.initiated_at,
            duration: row.duration,
            status: CallStatus::from(row.status.as_str()),
            outcome_code: row.outcome_code,
            cta_attempted: row.cta_attempted,
            cta_result: row.cta_result.as_deref().map(CtaResult::from),
            source_key: row
                .source_key
                .unwrap_or_else(|| format!("import-{}", Uuid::new_v4())),
        };

        if insert_call(pool, &call).await? {
            inserted += 1;
        }
    }

    info!(inserted, path = %csv_path.display(), "imported call log");
    Ok(inserted)
}
