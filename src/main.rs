use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

mod config;
mod db;
mod hours;
mod metrics;
mod models;
mod report;
mod scoring;
mod sessions;
mod trend;

use crate::models::{CallRecord, MemberScore, ReportWindow, Role, MAX_WINDOW_DAYS};
use crate::sessions::SessionRules;

#[derive(Parser)]
#[command(name = "sdr-metrics")]
#[command(about = "Session-normalized performance scoring for SDRs and activators", long_about = None)]
struct Cli {
    /// Log debug detail to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo team with two weeks of activity
    Seed,
    /// Import call logs from a CSV file
    ImportCalls {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Score team members against campaign goals
    #[command(group(
        ArgGroup::new("scope")
            .args(["email", "role"])
            .multiple(false)
    ))]
    Score {
        #[arg(long)]
        email: Option<String>,
        #[arg(long, value_parser = parse_role)]
        role: Option<Role>,
        #[arg(long)]
        campaign: Option<String>,
        #[arg(long, default_value_t = 7, value_parser = days_in_range)]
        days: i64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Print the full scores as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one member's day-by-day breakdown
    Daily {
        #[arg(long)]
        email: String,
        #[arg(long)]
        campaign: Option<String>,
        #[arg(long, default_value_t = 7, value_parser = days_in_range)]
        days: i64,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        campaign: Option<String>,
        #[arg(long, default_value_t = 7, value_parser = days_in_range)]
        days: i64,
        #[arg(long, default_value = "performance-report.md")]
        out: PathBuf,
    },
}

fn parse_role(value: &str) -> Result<Role, String> {
    Role::parse(value).ok_or_else(|| format!("unknown role '{value}', expected sdr or activator"))
}

fn days_in_range(value: &str) -> Result<i64, String> {
    match value.parse::<i64>() {
        Ok(days) if (1..=MAX_WINDOW_DAYS).contains(&days) => Ok(days),
        _ => Err(format!("expected a whole number of days from 1 to {MAX_WINDOW_DAYS}")),
    }
}

/// Scores every member in scope and returns them ranked, along with the
/// calls inside the window for the outcome summary.
async fn score_team(
    pool: &PgPool,
    email: Option<&str>,
    role: Option<Role>,
    campaign: Option<&str>,
    window: &ReportWindow,
) -> anyhow::Result<(Vec<MemberScore>, Vec<CallRecord>)> {
    let members = db::fetch_members(pool, email, role).await?;
    if let Some(email) = email {
        if members.is_empty() {
            anyhow::bail!("no team member with email {email}");
        }
    }

    let campaign_id = match campaign {
        Some(name) => Some(db::find_campaign_id(pool, name).await?),
        None => None,
    };
    let goals = db::fetch_campaign_goals(pool, campaign_id).await?;
    let rules = SessionRules::default();
    let fetch_since = window.previous().since;

    let mut scores = Vec::new();
    let mut calls = Vec::new();
    for member in &members {
        let events =
            db::fetch_member_events(pool, member.id, campaign_id, fetch_since, window.until)
                .await?;
        scores.push(scoring::score_member(member, &events, &goals, window, &rules));
        calls.extend(
            events
                .calls
                .into_iter()
                .filter(|call| window.contains(call.initiated_at)),
        );
    }

    scoring::rank_scores(&mut scores);
    info!(members = scores.len(), calls = calls.len(), "scored team");
    Ok((scores, calls))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    config::init_logging(cli.verbose);
    let settings = config::Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportCalls { csv } => {
            let inserted = db::import_calls_csv(&pool, &csv).await?;
            println!("Inserted {inserted} calls from {}.", csv.display());
        }
        Commands::Score {
            email,
            role,
            campaign,
            days,
            limit,
            json,
        } => {
            let window = ReportWindow::trailing_days(days, Utc::now());
            let (scores, _) = score_team(
                &pool,
                email.as_deref(),
                role,
                campaign.as_deref(),
                &window,
            )
            .await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&scores)?);
                return Ok(());
            }

            if scores.is_empty() {
                println!("No team members found for this scope.");
                return Ok(());
            }

            println!("Team scoreboard for the last {days} days:");
            for score in scores.iter().take(limit) {
                println!("- {}", report::format_score_line(score));
                for shortfall in &score.scorecard.shortfalls {
                    println!("    ! {shortfall}");
                }
            }
        }
        Commands::Daily {
            email,
            campaign,
            days,
        } => {
            let member = db::fetch_members(&pool, Some(email.as_str()), None)
                .await?
                .into_iter()
                .next()
                .with_context(|| format!("no team member with email {email}"))?;
            let campaign_id = match campaign.as_deref() {
                Some(name) => Some(db::find_campaign_id(&pool, name).await?),
                None => None,
            };

            let window = ReportWindow::trailing_days(days, Utc::now());
            let events = db::fetch_member_events(
                &pool,
                member.id,
                campaign_id,
                window.since,
                window.until,
            )
            .await?;
            let rules = SessionRules::default();
            let daily = match member.role {
                Role::Sdr => metrics::sdr_performance(member.id, &events, &window, &rules).daily,
                Role::Activator => {
                    metrics::activator_performance(member.id, &events, &window, &rules).daily
                }
            };

            if daily.is_empty() {
                println!("No activity for {} in this window.", member.full_name);
                return Ok(());
            }

            println!("Daily breakdown for {} ({}):", member.full_name, member.role.as_str());
            for day in &daily {
                println!("- {}", report::format_daily_line(day));
            }
            let totals = metrics::sum_totals(&daily);
            println!(
                "Total: paid {:.2}h, active {:.2}h, efficiency {:.1}%",
                totals.paid_hours, totals.active_hours, totals.efficiency
            );
        }
        Commands::Report {
            campaign,
            days,
            out,
        } => {
            let window = ReportWindow::trailing_days(days, Utc::now());
            let (scores, calls) =
                score_team(&pool, None, None, campaign.as_deref(), &window).await?;
            let outcomes = report::summarize_outcomes(&calls);
            let markdown =
                report::build_report(campaign.as_deref(), &window, &scores, &outcomes);
            std::fs::write(&out, markdown)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
