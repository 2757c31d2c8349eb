use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, FixedOffset, Local};
use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::{debug, info};

use coachrs::achievements::AchievementBadge;
use coachrs::challenges::Challenge;
use coachrs::config::{AppConfig, OutputFormat};
use coachrs::insights::{MorningBriefing, WeeklyInsights};
use coachrs::logging::{init_logging, LogLevel};
use coachrs::motivation::ProgressCelebration;
use coachrs::notifications::{suppress_seen, Notification};
use coachrs::snapshot::{load_ledger, save_ledger, CoachingSnapshot};
use coachrs::streaks::StreakRecord;
use coachrs::{CoachError, HistoricalLedger};

/// coachrs - Coaching Insight & Motivation CLI
///
/// Turns a week of wellness data into a morning briefing, weekly insights,
/// smart notifications and motivational artifacts.
#[derive(Parser)]
#[command(name = "coachrs")]
#[command(author = "coachrs Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Coaching Insight & Motivation CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Snapshot JSON file with metrics, patterns and ledger
    #[arg(short, long, value_name = "FILE", global = true)]
    input: Option<PathBuf>,

    /// Ledger JSON file; overrides the ledger inside the snapshot
    #[arg(short, long, value_name = "FILE", global = true)]
    ledger: Option<PathBuf>,

    /// Evaluation time as RFC 3339 (defaults to local now)
    #[arg(long, value_name = "RFC3339", global = true)]
    now: Option<String>,

    /// Output format (json, table)
    #[arg(short = 'f', long, global = true)]
    format: Option<OutputFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Morning briefing: focus, insight, recommendation, motivation
    Briefing,

    /// Weekly insights: top performer, improvement, recommendation
    Weekly,

    /// Smart notifications not already delivered today
    Notify {
        /// Include notifications already recorded as seen
        #[arg(short, long)]
        all: bool,
    },

    /// Progress celebrations, personal bests included
    Celebrate,

    /// Current streaks with stored bests
    Streaks,

    /// Newly unlocked achievements
    Achievements {
        /// Write awards and new best streaks back to the ledger file
        #[arg(short, long)]
        persist: bool,
    },

    /// Active challenges and progress
    Challenges,

    /// Every artifact in one report
    Report,
}

#[derive(Serialize)]
struct Report {
    briefing: MorningBriefing,
    weekly: WeeklyInsights,
    notifications: Vec<Notification>,
    celebrations: Vec<ProgressCelebration>,
    personal_bests: Vec<ProgressCelebration>,
    streaks: Vec<StreakRecord>,
    achievements: Vec<AchievementBadge>,
    challenges: Vec<Challenge>,
}

#[derive(Tabled)]
struct NotificationRow {
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Action")]
    action: String,
}

#[derive(Tabled)]
struct CelebrationRow {
    #[tabled(rename = "")]
    icon: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Description")]
    description: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct StreakRow {
    #[tabled(rename = "Streak")]
    streak_type: String,
    #[tabled(rename = "Current")]
    current: u32,
    #[tabled(rename = "Best")]
    best: u32,
}

#[derive(Tabled)]
struct AchievementRow {
    #[tabled(rename = "")]
    icon: String,
    #[tabled(rename = "Badge")]
    name: String,
    #[tabled(rename = "Description")]
    description: String,
}

#[derive(Tabled)]
struct ChallengeRow {
    #[tabled(rename = "Challenge")]
    title: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Ends")]
    end_date: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Done")]
    completed: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };

    let mut log_config = config.logging.clone();
    log_config.level = LogLevel::from_verbosity(log_config.level, cli.verbose);
    init_logging(&log_config)?;

    if !config.output.color {
        colored::control::set_override(false);
    }

    let format = cli.format.unwrap_or(config.output.format);
    let now = parse_now(cli.now.as_deref())?;

    let input = cli
        .input
        .as_deref()
        .context("No snapshot given; pass --input FILE")?;
    let mut snapshot = CoachingSnapshot::load_from_file(input).map_err(report)?;

    let ledger_path = cli.ledger.clone().or_else(|| config.ledger_path.clone());
    if let Some(path) = &ledger_path {
        if path.exists() {
            snapshot.ledger = load_ledger(path).map_err(report)?;
            debug!(path = %path.display(), "ledger loaded");
        }
    }

    info!(command = command_name(&cli.command), %now, "running");

    match cli.command {
        Commands::Briefing => {
            let briefing = snapshot.insight_generator().generate_morning_briefing(now);
            emit(format, &briefing, print_briefing)?;
        }

        Commands::Weekly => {
            let weekly = snapshot.insight_generator().generate_weekly_insights(now);
            emit(format, &weekly, print_weekly)?;
        }

        Commands::Notify { all } => {
            let notifications = snapshot.insight_generator().generate_smart_notifications(now);
            let notifications = if all {
                notifications
            } else {
                suppress_seen(notifications, &snapshot.seen_notifications)
            };
            emit(format, &notifications, |n| print_notifications(n))?;
        }

        Commands::Celebrate => {
            let celebrations = snapshot.motivation_engine().generate_progress_celebrations();
            emit(format, &celebrations, |c| print_celebrations(c))?;
        }

        Commands::Streaks => {
            let streaks = snapshot.motivation_engine().generate_streaks(now);
            emit(format, &streaks, |s| print_streaks(s))?;
        }

        Commands::Achievements { persist } => {
            let engine = snapshot.motivation_engine();
            let unlocks = engine.achievement_unlocks(now);

            if persist {
                let path = ledger_path.as_deref().ok_or_else(|| {
                    report(CoachError::Configuration(
                        "--persist needs a ledger file; pass --ledger FILE or set ledger_path"
                            .to_string(),
                    ))
                })?;
                let mut ledger = engine.ledger().clone();
                for unlock in &unlocks {
                    ledger.apply(&unlock.update);
                }
                for update in engine.streak_updates(now) {
                    ledger.apply(&update);
                }
                persist_ledger(path, &ledger)?;
            }

            let badges: Vec<AchievementBadge> = unlocks.into_iter().map(|u| u.badge).collect();
            emit(format, &badges, |b| print_achievements(b))?;
        }

        Commands::Challenges => {
            let engine = snapshot.motivation_engine();
            let challenges = if snapshot.enrollments.is_empty() {
                engine.generate_challenges(now)
            } else {
                engine.evaluate_enrollments(&snapshot.enrollments)
            };
            emit(format, &challenges, |c| print_challenges(c, now))?;
        }

        Commands::Report => {
            let generator = snapshot.insight_generator();
            let engine = snapshot.motivation_engine();

            let achievements = engine.generate_achievements(now);
            let mut celebrations = engine.generate_progress_celebrations();
            celebrations.extend(achievements.iter().map(ProgressCelebration::from_badge));

            let report = Report {
                briefing: generator.generate_morning_briefing(now),
                weekly: generator.generate_weekly_insights(now),
                notifications: suppress_seen(
                    generator.generate_smart_notifications(now),
                    &snapshot.seen_notifications,
                ),
                celebrations,
                personal_bests: engine.identify_personal_bests(),
                streaks: engine.generate_streaks(now),
                achievements,
                challenges: if snapshot.enrollments.is_empty() {
                    engine.generate_challenges(now)
                } else {
                    engine.evaluate_enrollments(&snapshot.enrollments)
                },
            };

            emit(format, &report, |r| print_report(r, now))?;
        }
    }

    Ok(())
}

fn parse_now(now: Option<&str>) -> Result<DateTime<FixedOffset>> {
    match now {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("Invalid --now timestamp (expected RFC 3339): {}", raw)),
        None => Ok(Local::now().fixed_offset()),
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Briefing => "briefing",
        Commands::Weekly => "weekly",
        Commands::Notify { .. } => "notify",
        Commands::Celebrate => "celebrate",
        Commands::Streaks => "streaks",
        Commands::Achievements { .. } => "achievements",
        Commands::Challenges => "challenges",
        Commands::Report => "report",
    }
}

/// Log a library error at its severity and surface its user-facing message
fn report(err: CoachError) -> anyhow::Error {
    anyhow!(err.report())
}

fn persist_ledger(path: &Path, ledger: &HistoricalLedger) -> Result<()> {
    if path.is_dir() {
        bail!("Ledger path is a directory: {}", path.display());
    }
    save_ledger(path, ledger).map_err(report)?;
    eprintln!("{}", format!("✓ Ledger updated: {}", path.display()).green());
    Ok(())
}

fn emit<T: Serialize + ?Sized>(format: OutputFormat, value: &T, table: impl Fn(&T)) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)
                .context("Failed to serialize output to JSON")?;
            println!("{}", json);
        }
        OutputFormat::Table => table(value),
    }
    Ok(())
}

fn print_briefing(briefing: &MorningBriefing) {
    println!("{}", "Morning Briefing".blue().bold());
    println!("  {} {}", "Focus:".bold(), briefing.focus.to_string().cyan());
    println!("  {} {}", "Insight:".bold(), briefing.insight);
    println!("  {} {}", "Recommendation:".bold(), briefing.recommendation);
    println!("  {} {}", "Motivation:".bold(), briefing.motivation.green());
}

fn print_weekly(weekly: &WeeklyInsights) {
    println!(
        "{} {} - {}",
        "Weekly Insights".blue().bold(),
        weekly.week_start.format("%Y-%m-%d"),
        weekly.week_end.format("%Y-%m-%d")
    );
    println!(
        "  {} {} ({:+.1}%)",
        "Top performer:".bold(),
        weekly.top_performer.label.cyan(),
        weekly.top_performer.change
    );
    println!("  {} {}", "Improvement:".bold(), weekly.improvement);
    println!("  {} {}", "Recommendation:".bold(), weekly.recommendation);
    println!("  {} {}", "Celebration:".bold(), weekly.celebration.green());
}

fn print_notifications(notifications: &[Notification]) {
    if notifications.is_empty() {
        println!("{}", "No new notifications".dimmed());
        return;
    }
    let rows: Vec<NotificationRow> = notifications
        .iter()
        .map(|n| NotificationRow {
            priority: n.priority.to_string(),
            title: n.title.clone(),
            message: n.message.clone(),
            action: n.action.clone().unwrap_or_default(),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_celebrations(celebrations: &[ProgressCelebration]) {
    if celebrations.is_empty() {
        println!("{}", "Nothing to celebrate yet. Keep going!".dimmed());
        return;
    }
    let rows: Vec<CelebrationRow> = celebrations
        .iter()
        .map(|c| CelebrationRow {
            icon: c.icon.clone(),
            title: c.title.clone(),
            description: c.description.clone(),
            value: format!("{:.1}", c.value),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_streaks(streaks: &[StreakRecord]) {
    let rows: Vec<StreakRow> = streaks
        .iter()
        .map(|s| StreakRow {
            streak_type: s.streak_type.to_string(),
            current: s.current,
            best: s.best,
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_achievements(badges: &[AchievementBadge]) {
    if badges.is_empty() {
        println!("{}", "No new achievements".dimmed());
        return;
    }
    let rows: Vec<AchievementRow> = badges
        .iter()
        .map(|b| AchievementRow {
            icon: b.icon.clone(),
            name: b.name.clone(),
            description: b.description.clone(),
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_challenges(challenges: &[Challenge], now: DateTime<FixedOffset>) {
    let rows: Vec<ChallengeRow> = challenges
        .iter()
        .map(|c| ChallengeRow {
            title: c.title.clone(),
            progress: format!("{:.1}/{:.0} ({:.0}%)", c.current, c.target, c.percent_complete()),
            end_date: c.end_date.format("%Y-%m-%d").to_string(),
            status: if c.is_active(now) {
                "active".cyan().to_string()
            } else {
                "inactive".dimmed().to_string()
            },
            completed: if c.completed { "✓".green().to_string() } else { String::new() },
        })
        .collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_report(report: &Report, now: DateTime<FixedOffset>) {
    print_briefing(&report.briefing);
    println!();
    print_weekly(&report.weekly);
    println!();
    println!("{}", "Notifications".yellow().bold());
    print_notifications(&report.notifications);
    println!("{}", "Celebrations".magenta().bold());
    print_celebrations(&report.celebrations);
    println!("{}", "Streaks".cyan().bold());
    print_streaks(&report.streaks);
    println!("{}", "Achievements".green().bold());
    print_achievements(&report.achievements);
    println!("{}", "Challenges".blue().bold());
    print_challenges(&report.challenges, now);
}
