use crate::metrics::{activator_performance, sdr_performance};
use crate::models::{
    ActivatorPerformanceMetrics, ActivityTotals, CampaignGoals, GoalComparison, GoalScorecard,
    MemberEvents, MemberScore, ReportWindow, Role, ScoreBand, SdrPerformanceMetrics, TeamMember,
};
use crate::sessions::SessionRules;
use crate::trend::classify_trend;

pub const GREEN_RATIO: f64 = 1.0;
pub const YELLOW_RATIO: f64 = 0.75;

/// Hours in the full-time week the hours factor is measured against.
pub const FULL_TIME_HOURS: f64 = 40.0;
/// Green, yellow and orange thresholds as multiples of the hours factor.
pub const SDR_ATTENDED_MULTIPLES: [f64; 3] = [12.0, 9.0, 6.0];
pub const ACTIVATOR_ACTIVATION_MULTIPLES: [f64; 3] = [10.0, 7.0, 4.0];

pub fn get_goal_status(actual: f64, target: f64) -> ScoreBand {
    if target <= 0.0 {
        return ScoreBand::Green;
    }

    let ratio = actual / target;
    if ratio >= GREEN_RATIO {
        ScoreBand::Green
    } else if ratio >= YELLOW_RATIO {
        ScoreBand::Yellow
    } else {
        ScoreBand::Red
    }
}

pub fn compare_to_goal(metric: &'static str, actual: f64, target: f64) -> GoalComparison {
    GoalComparison {
        metric,
        actual,
        target,
        ratio: if target <= 0.0 { 1.0 } else { actual / target },
        band: get_goal_status(actual, target),
    }
}

/// Averages the comparisons' ratios, each capped at 1.0, and bands the result.
/// The score comes back as a percentage.
pub fn overall_score(comparisons: &[GoalComparison]) -> (f64, ScoreBand) {
    if comparisons.is_empty() {
        return (0.0, get_goal_status(0.0, 1.0));
    }

    let capped: f64 = comparisons
        .iter()
        .map(|comparison| comparison.ratio.clamp(0.0, 1.0))
        .sum();
    let average = capped / comparisons.len() as f64;
    (average * 100.0, get_goal_status(average, 1.0))
}

fn rate_comparisons(totals: &ActivityTotals, goals: &CampaignGoals) -> Vec<GoalComparison> {
    vec![
        compare_to_goal(
            "dials_per_hour",
            totals.dials_per_hour(),
            goals.target_dials_per_hour,
        ),
        compare_to_goal(
            "conversations_per_hour",
            totals.conversations_per_hour(),
            goals.target_conversations_per_hour,
        ),
        compare_to_goal(
            "cta_attempt_rate",
            totals.cta_attempt_rate(),
            goals.target_cta_attempt_rate,
        ),
        compare_to_goal(
            "cta_acceptance_rate",
            totals.cta_acceptance_rate(),
            goals.target_cta_acceptance_rate,
        ),
    ]
}

fn minimum_shortfalls(
    totals: &ActivityTotals,
    show_rate: f64,
    resolved_meetings: usize,
    goals: &CampaignGoals,
) -> Vec<String> {
    let mut shortfalls = Vec::new();

    if totals.paid_hours > 0.0 && totals.efficiency < goals.min_efficiency {
        shortfalls.push(format!(
            "efficiency {:.1}% is below the {:.1}% minimum",
            totals.efficiency, goals.min_efficiency
        ));
    }
    if resolved_meetings > 0 && show_rate < goals.min_show_rate {
        shortfalls.push(format!(
            "show rate {:.1}% is below the {:.1}% minimum",
            show_rate, goals.min_show_rate
        ));
    }

    shortfalls
}

/// Weekly goals are prorated to the window length.
fn weekly_scale(window_days: f64) -> f64 {
    window_days.max(0.0) / 7.0
}

pub fn sdr_scorecard(
    metrics: &SdrPerformanceMetrics,
    goals: &CampaignGoals,
    window_days: f64,
) -> GoalScorecard {
    let scale = weekly_scale(window_days);
    let mut comparisons = rate_comparisons(&metrics.totals, goals);
    comparisons.push(compare_to_goal(
        "paid_hours",
        metrics.totals.paid_hours,
        goals.weekly_hours_goal * scale,
    ));
    comparisons.push(compare_to_goal(
        "appointments_booked",
        metrics.install_appointments_booked as f64,
        goals.weekly_appointments_goal * scale,
    ));

    let (overall_score, overall_band) = overall_score(&comparisons);
    GoalScorecard {
        comparisons,
        overall_score,
        overall_band,
        shortfalls: minimum_shortfalls(
            &metrics.totals,
            metrics.show_rate,
            metrics.install_appointments_attended + metrics.no_shows,
            goals,
        ),
    }
}

pub fn activator_scorecard(
    metrics: &ActivatorPerformanceMetrics,
    goals: &CampaignGoals,
    window_days: f64,
) -> GoalScorecard {
    let scale = weekly_scale(window_days);
    let comparisons = vec![
        compare_to_goal(
            "paid_hours",
            metrics.totals.paid_hours,
            goals.weekly_hours_goal * scale,
        ),
        compare_to_goal(
            "activations",
            metrics.activations as f64,
            goals.weekly_activations_goal * scale,
        ),
    ];

    let (overall_score, overall_band) = overall_score(&comparisons);
    GoalScorecard {
        comparisons,
        overall_score,
        overall_band,
        shortfalls: minimum_shortfalls(
            &metrics.totals,
            metrics.show_rate,
            metrics.meetings_held + metrics.no_shows,
            goals,
        ),
    }
}

pub fn hours_factor(paid_hours: f64) -> f64 {
    paid_hours.max(0.0) / FULL_TIME_HOURS
}

fn band_by_multiples(count: usize, factor: f64, multiples: [f64; 3]) -> ScoreBand {
    let count = count as f64;
    if count >= multiples[0] * factor {
        ScoreBand::Green
    } else if count >= multiples[1] * factor {
        ScoreBand::Yellow
    } else if count >= multiples[2] * factor {
        ScoreBand::Orange
    } else {
        ScoreBand::Red
    }
}

pub fn calculate_sdr_scoring(appointments_attended: usize, paid_hours: f64) -> ScoreBand {
    band_by_multiples(
        appointments_attended,
        hours_factor(paid_hours),
        SDR_ATTENDED_MULTIPLES,
    )
}

pub fn calculate_activator_scoring(activations: usize, paid_hours: f64) -> ScoreBand {
    band_by_multiples(
        activations,
        hours_factor(paid_hours),
        ACTIVATOR_ACTIVATION_MULTIPLES,
    )
}

/// Scores one member over `window`. `events` must also cover the preceding
/// window of the same length so the trend has something to compare against.
pub fn score_member(
    member: &TeamMember,
    events: &MemberEvents,
    goals: &CampaignGoals,
    window: &ReportWindow,
    rules: &SessionRules,
) -> MemberScore {
    let previous_window = window.previous();

    let (totals, scorecard, hours_band, primary_metric, primary_value, previous_value) =
        match member.role {
            Role::Sdr => {
                let current = sdr_performance(member.id, events, window, rules);
                let previous = sdr_performance(member.id, events, &previous_window, rules);
                (
                    current.totals.clone(),
                    sdr_scorecard(&current, goals, window.days()),
                    calculate_sdr_scoring(
                        current.install_appointments_attended,
                        current.totals.paid_hours,
                    ),
                    "conversations",
                    current.totals.conversations as f64,
                    previous.totals.conversations as f64,
                )
            }
            Role::Activator => {
                let current = activator_performance(member.id, events, window, rules);
                let previous = activator_performance(member.id, events, &previous_window, rules);
                (
                    current.totals.clone(),
                    activator_scorecard(&current, goals, window.days()),
                    calculate_activator_scoring(current.activations, current.totals.paid_hours),
                    "activations",
                    current.activations as f64,
                    previous.activations as f64,
                )
            }
        };

    MemberScore {
        full_name: member.full_name.clone(),
        email: member.email.clone(),
        role: member.role,
        totals,
        scorecard,
        hours_band,
        primary_metric,
        primary_value,
        previous_value,
        trend: classify_trend(primary_value, previous_value),
    }
}

pub fn rank_scores(scores: &mut [MemberScore]) {
    scores.sort_by(|a, b| {
        b.scorecard
            .overall_score
            .partial_cmp(&a.scorecard.overall_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
