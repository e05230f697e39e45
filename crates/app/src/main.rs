use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use epsilon_core::model::{
    Category, Difficulty, MeetingId, MeetingType, Recurrence, ResourceId, ResourceType, Theme,
    UserEmail,
};
use services::{AppServices, AuthProvider, Clock, RetryPolicy, StoredAuth};
use storage::repository::Storage;

mod commands;
mod db;
mod render;

#[derive(Parser)]
#[command(name = "epsilon")]
#[command(about = "Lessons, quizzes, videos and live sessions for business learners")]
#[command(version)]
struct Cli {
    /// Database location (path or sqlite URL)
    #[arg(long, global = true, env = "EPSILON_DB_URL", default_value = "sqlite://epsilon.sqlite3")]
    db: String,

    /// Email of the signed-in learner; omit to browse anonymously
    #[arg(long, global = true, env = "EPSILON_USER_EMAIL")]
    user: Option<String>,

    /// Display name of the signed-in learner until they save one with `profile`
    #[arg(long, global = true, env = "EPSILON_USER_NAME")]
    name: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print JSON instead of human output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Show level, XP, streak, badges and quiz statistics
    Progress,

    /// Show or edit your profile, or sign out
    Profile {
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// light, dark or high-contrast
        #[arg(long)]
        theme: Option<Theme>,
        #[arg(long, conflicts_with_all = ["name", "theme"])]
        logout: bool,
    },

    /// List the resource catalog
    Catalog {
        #[arg(long)]
        kind: Option<ResourceType>,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        difficulty: Option<Difficulty>,
        /// Case-insensitive match on title or description
        #[arg(long, short = 's')]
        search: Option<String>,
    },

    /// Read a lesson
    Lesson {
        id: ResourceId,
        /// Mark the lesson complete
        #[arg(long)]
        complete: bool,
    },

    /// Show a video
    Video {
        id: ResourceId,
        /// Mark the video watched
        #[arg(long)]
        complete: bool,
    },

    /// Save a downloadable handout
    Download {
        id: ResourceId,
        /// Directory to write the handout into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Take a quiz; without --answers the questions are printed
    Quiz {
        id: ResourceId,
        /// Selected option per question, in order
        #[arg(long, value_delimiter = ',')]
        answers: Option<Vec<usize>>,
    },

    /// List upcoming meetings
    Meetings {
        #[arg(long)]
        category: Option<Category>,
        #[arg(long = "type")]
        meeting_type: Option<MeetingType>,
        /// Only meetings on this day (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long, short = 'n')]
        limit: Option<usize>,
    },

    /// Schedule a meeting
    MeetingCreate {
        #[arg(long)]
        title: String,
        #[arg(long)]
        teacher: String,
        #[arg(long)]
        teacher_title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,
        /// HH:MM
        #[arg(long, value_parser = parse_time)]
        time: NaiveTime,
        #[arg(long, default_value_t = 60)]
        duration: u32,
        #[arg(long)]
        link: String,
        #[arg(long, default_value = "fundamentals")]
        category: Category,
        #[arg(long = "type", default_value = "live_tutoring")]
        meeting_type: MeetingType,
        #[arg(long, default_value = "none")]
        recurring: Recurrence,
    },

    /// Register for a meeting
    Register { id: MeetingId },

    /// Cancel a meeting registration
    Unregister { id: MeetingId },

    /// Progress, featured resources and your upcoming sessions
    Dashboard,

    /// Month calendar of meetings
    Calendar {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        month: Option<u32>,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long = "type")]
        meeting_type: Option<MeetingType>,
    },

    /// Load the demo catalog and meetings
    Seed,
}

fn parse_time(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(raw, "%H:%M").or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
}

fn auth_from(cli: &Cli, storage: &Storage) -> Result<Arc<dyn AuthProvider>> {
    let session = cli
        .user
        .as_deref()
        .map(UserEmail::new)
        .transpose()
        .context("invalid --user")?;
    let mut auth = StoredAuth::new(Arc::clone(&storage.profiles), session);
    if let Some(name) = &cli.name {
        auth = auth.with_default_name(name);
    }
    Ok(Arc::new(auth))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let db_url = db::normalize_sqlite_url(&cli.db);
    db::prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url)
        .await
        .with_context(|| format!("opening {db_url}"))?;
    let auth = auth_from(&cli, &storage)?;
    let app = AppServices::from_storage(storage, Clock::default(), auth, RetryPolicy::default());

    commands::Ctx::new(app, cli.json).run(cli.command).await
}
