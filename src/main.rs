use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use court_coach::agents::backend::{create_backend, AiBackend};
use court_coach::agents::workout_generator::{WorkoutGeneratorAgent, WorkoutGeneratorInput};
use court_coach::agents::Agent;
use court_coach::cache::InMemoryCache;
use court_coach::calculate::Pagination;
use court_coach::clock::{Clock, SystemClock};
use court_coach::config::AppConfig;
use court_coach::leaderboard::{LeaderboardService, ServiceSettings};
use court_coach::models::{PlayerId, SessionRecord, SkillLevel};
use court_coach::normalize::PlanContext;
use court_coach::storage::{EntityType, JsonlAggregateStore, JsonlWriter, StorageConfig};

#[derive(Parser)]
#[command(name = "court-coach")]
#[command(about = "Basketball training leaderboard with AI-generated workout plans")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Leaderboard(LeaderboardCommand),

    /// Generate a workout plan
    GenerateWorkout {
        /// beginner, intermediate or advanced
        #[arg(long, default_value = "intermediate")]
        level: String,

        /// Plan length in days
        #[arg(long)]
        days: Option<u32>,

        /// Skill to focus on
        #[arg(long)]
        focus: Option<String>,

        /// Notes about the player for the coach model
        #[arg(long)]
        notes: Option<String>,

        /// Append the plan to the workout plan log
        #[arg(long)]
        save: bool,
    },
}

/// Commands that read or write player aggregates.
#[derive(Subcommand)]
enum LeaderboardCommand {
    /// Register a new player
    Register {
        /// Display name
        #[arg(long)]
        name: String,

        /// Player id (random if omitted)
        #[arg(long)]
        id: Option<String>,

        /// Season label
        #[arg(long)]
        season: Option<String>,
    },

    /// Remove a player from the leaderboard
    Deactivate { player: String },

    /// Count assigned workouts toward a player's completion rate
    Assign {
        player: String,

        #[arg(long, default_value = "1")]
        count: u32,
    },

    /// Record a completed workout session
    LogSession {
        player: String,

        /// Session date (YYYY-MM-DD), today if omitted
        #[arg(long)]
        date: Option<String>,

        #[arg(long, default_value = "0")]
        made: u32,

        #[arg(long, default_value = "0")]
        attempted: u32,

        /// Session accuracy in percent; made/attempted if omitted
        #[arg(long)]
        accuracy: Option<f64>,

        #[arg(long, default_value = "0")]
        calories: u32,

        /// Minutes trained
        #[arg(long, default_value = "0")]
        minutes: u32,
    },

    /// Show a leaderboard page
    Leaderboard {
        #[arg(long, default_value = "1")]
        page: u32,

        #[arg(long)]
        page_size: Option<u32>,
    },

    /// Show players ranked around a player
    Nearby {
        player: String,

        /// Players shown either side
        #[arg(long)]
        window: Option<usize>,
    },

    /// Show a player's stats
    Stats { player: String },

    /// Recompute and store ranks for all active players
    RecomputeRanks,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        AppConfig::from_file(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))?
    } else {
        AppConfig::default()
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    let log_level = cli.log_level.unwrap_or_else(|| config.log_level.clone());

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::info!("Starting court-coach v{}", env!("CARGO_PKG_VERSION"));

    let storage = StorageConfig::new(config.data_dir.clone());

    match cli.command {
        Commands::GenerateWorkout {
            level,
            days,
            focus,
            notes,
            save,
        } => generate_workout(&config, &storage, &level, days, focus, notes, save).await,
        Commands::Leaderboard(command) => run_leaderboard(command, &config, &storage).await,
    }
}

async fn run_leaderboard(command: LeaderboardCommand, config: &AppConfig, storage: &StorageConfig) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(JsonlAggregateStore::open(storage)?);
    let service = LeaderboardService::new(
        store,
        Arc::new(InMemoryCache::new()),
        clock.clone(),
        ServiceSettings::from(config),
    );

    match command {
        LeaderboardCommand::Register { name, id, season } => {
            let player_id = id.map(PlayerId::new).unwrap_or_else(PlayerId::random);
            let aggregate = service
                .register_player(player_id, &name, season.as_deref())
                .await?;
            print_json(&aggregate)?;
        }

        LeaderboardCommand::Deactivate { player } => {
            let aggregate = service.deactivate_player(&PlayerId::new(player)).await?;
            print_json(&aggregate)?;
        }

        LeaderboardCommand::Assign { player, count } => {
            let aggregate = service
                .record_assignment(&PlayerId::new(player), count)
                .await?;
            print_json(&aggregate)?;
        }

        LeaderboardCommand::LogSession {
            player,
            date,
            made,
            attempted,
            accuracy,
            calories,
            minutes,
        } => {
            let date = match date {
                Some(d) => NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                    .with_context(|| format!("invalid --date '{}'", d))?,
                None => clock.today(),
            };
            let mut session = SessionRecord::completed_on(date)
                .with_shots(made, attempted)
                .with_calories(calories)
                .with_minutes(minutes);
            session = match accuracy.or_else(|| session.shot_accuracy()) {
                Some(accuracy) => session.with_accuracy(accuracy),
                None => session,
            };

            let outcome = service
                .record_session(&PlayerId::new(player), &session)
                .await?;
            for warning in &outcome.warnings {
                eprintln!("warning: {}", warning);
            }
            for achievement in &outcome.newly_earned {
                eprintln!(
                    "unlocked: {} (+{} points)",
                    achievement.title, achievement.points
                );
            }
            println!("+{} points", outcome.points_earned());
            print_json(&outcome.aggregate)?;
        }

        LeaderboardCommand::Leaderboard { page, page_size } => {
            let pagination = Pagination::new(
                Some(page),
                Some(page_size.unwrap_or(service.settings().page_size)),
            );
            let page = service.leaderboard(pagination).await?;
            for entry in &page.entries {
                println!(
                    "{:>4}  {:<24} {:>8} pts  {:>5.1}%  streak {:>3}  ({:+})",
                    entry.rank,
                    entry.display_name,
                    entry.points,
                    entry.average_accuracy,
                    entry.current_streak,
                    entry.rank_change
                );
            }
            println!(
                "page {}/{} ({} players)",
                page.meta.page, page.meta.total_pages, page.meta.total_items
            );
        }

        LeaderboardCommand::Nearby { player, window } => {
            let rows = service.nearby(&PlayerId::new(player), window).await?;
            print_json(&rows)?;
        }

        LeaderboardCommand::Stats { player } => {
            let stats = service.player_stats(&PlayerId::new(player)).await?;
            print_json(&stats)?;
        }

        LeaderboardCommand::RecomputeRanks => {
            let written = service.recompute_ranks().await?;
            println!("Ranked {} players", written);
        }
    }

    Ok(())
}

async fn generate_workout(
    config: &AppConfig,
    storage: &StorageConfig,
    level: &str,
    days: Option<u32>,
    focus: Option<String>,
    notes: Option<String>,
    save: bool,
) -> Result<()> {
    let skill_level: SkillLevel = level.parse().map_err(anyhow::Error::msg)?;
    let mut context = PlanContext::new(skill_level);
    context.duration_days = days;
    context.focus = focus;

    let backend: Arc<dyn AiBackend> = Arc::from(create_backend(&config.ai.backend_config()?)?);
    if !backend.health_check().await.unwrap_or(false) {
        tracing::warn!("AI backend '{}' is not reachable", backend.name());
    }

    let agent = WorkoutGeneratorAgent::new(backend).with_retry_policy(config.ai.retry_policy());
    let output = agent
        .execute(WorkoutGeneratorInput { context, notes })
        .await?;

    for note in &output.notes {
        eprintln!("note: {}", note);
    }
    if output.provenance.needs_review() {
        eprintln!("plan provenance: {} (review before assigning)", output.provenance);
    }

    if save {
        let writer = JsonlWriter::for_entity(storage, EntityType::WorkoutPlan);
        writer.append(&output.data.plan)?;
        tracing::info!(plan = %output.data.plan.id, "Saved plan to {:?}", writer.path());
    }

    print_json(&output.data.plan)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
