use std::collections::HashMap;
use std::fmt::Write;

use crate::models::{CallRecord, DailyMetrics, MemberScore, OutcomeSummary, ReportWindow, Role};

pub fn summarize_outcomes(calls: &[CallRecord]) -> Vec<OutcomeSummary> {
    let mut map: HashMap<String, (usize, i64)> = HashMap::new();

    for call in calls {
        let key = call
            .outcome_code
            .clone()
            .unwrap_or_else(|| "unrecorded".to_string());
        let entry = map.entry(key).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += call.duration_seconds();
    }

    let mut summaries: Vec<OutcomeSummary> = map
        .into_iter()
        .map(|(outcome_code, (count, total_duration))| OutcomeSummary {
            outcome_code,
            count,
            avg_duration: if count == 0 {
                0.0
            } else {
                total_duration as f64 / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.outcome_code.cmp(&b.outcome_code))
    });
    summaries
}

pub fn format_score_line(score: &MemberScore) -> String {
    format!(
        "{} ({}) goals {} {:.0}% | hours {} | paid {:.2}h active {:.2}h efficiency {:.1}% | \
         dials {} conversations {} | {} {} vs {} ({})",
        score.full_name,
        score.email,
        score.scorecard.overall_band,
        score.scorecard.overall_score,
        score.hours_band,
        score.totals.paid_hours,
        score.totals.active_hours,
        score.totals.efficiency,
        score.totals.total_dials,
        score.totals.conversations,
        score.primary_metric,
        score.primary_value,
        score.previous_value,
        score.trend
    )
}

pub fn format_daily_line(day: &DailyMetrics) -> String {
    let totals = &day.totals;
    format!(
        "{}: {} sessions, paid {:.2}h active {:.2}h ({:.1}%), {} dials ({:.1}/h), \
         {} conversations ({:.1}/h), CTA {}/{}, {} emails, {} sms",
        day.date,
        totals.session_count,
        totals.paid_hours,
        totals.active_hours,
        totals.efficiency,
        totals.total_dials,
        totals.dials_per_hour(),
        totals.conversations,
        totals.conversations_per_hour(),
        totals.cta_acceptances,
        totals.cta_attempts,
        totals.emails_sent,
        totals.sms_sent
    )
}

fn write_scoreboard(output: &mut String, title: &str, scores: &[&MemberScore]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## {title}");

    if scores.is_empty() {
        let _ = writeln!(output, "No activity recorded for this window.");
        return;
    }

    for score in scores {
        let _ = writeln!(output, "- {}", format_score_line(score));
    }
}

pub fn build_report(
    campaign: Option<&str>,
    window: &ReportWindow,
    scores: &[MemberScore],
    outcomes: &[OutcomeSummary],
) -> String {
    let mut output = String::new();
    let campaign_label = campaign.unwrap_or("all campaigns");

    let _ = writeln!(output, "# Outreach Performance Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} to {})",
        campaign_label,
        window.since.format("%Y-%m-%d %H:%M"),
        window.until.format("%Y-%m-%d %H:%M")
    );

    let sdrs: Vec<&MemberScore> = scores.iter().filter(|s| s.role == Role::Sdr).collect();
    let activators: Vec<&MemberScore> = scores
        .iter()
        .filter(|s| s.role == Role::Activator)
        .collect();
    write_scoreboard(&mut output, "SDR Scoreboard", &sdrs);
    write_scoreboard(&mut output, "Activator Scoreboard", &activators);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Goal Detail");
    if scores.is_empty() {
        let _ = writeln!(output, "No team members in scope.");
    }
    for score in scores {
        let _ = writeln!(output);
        let _ = writeln!(output, "### {}", score.full_name);
        for comparison in &score.scorecard.comparisons {
            let _ = writeln!(
                output,
                "- {}: {:.2} of {:.2} ({:.0}%, {})",
                comparison.metric,
                comparison.actual,
                comparison.target,
                comparison.ratio * 100.0,
                comparison.band
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Minimum Rate Shortfalls");
    let mut any_shortfall = false;
    for score in scores {
        for shortfall in &score.scorecard.shortfalls {
            any_shortfall = true;
            let _ = writeln!(output, "- {}: {}", score.full_name, shortfall);
        }
    }
    if !any_shortfall {
        let _ = writeln!(output, "Everyone is above the campaign minimums.");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Call Outcome Mix");
    if outcomes.is_empty() {
        let _ = writeln!(output, "No calls recorded for this window.");
    } else {
        for outcome in outcomes.iter().take(10) {
            let _ = writeln!(
                output,
                "- {}: {} calls (avg {:.0}s)",
                outcome.outcome_code, outcome.count, outcome.avg_duration
            );
        }
    }

    output
}
