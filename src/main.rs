/// Main entry point for the Happy Day command-line diary
///
/// Sets up logging, parses command line arguments, opens the database and
/// runs a single diary or habit command.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use happy_day::commands::{self, format_response};
use happy_day::config::{AppConfig, LogLevel, DATABASE_ENV_VAR};
use happy_day::{now, today, AppError, HappyDay};

/// Command line arguments for Happy Day
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the SQLite database file
    /// If not provided, uses a default location in the user's home directory
    #[arg(long, env = DATABASE_ENV_VAR, global = true)]
    database: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print responses as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Daily diary entries
    #[command(subcommand)]
    Diary(DiaryCommand),

    /// Recurring habits
    #[command(subcommand)]
    Habit(HabitCommand),
}

#[derive(Subcommand, Debug)]
enum DiaryCommand {
    /// Show one day's entry
    Show {
        /// Day as YYYY-MM-DD, today when omitted
        date: Option<String>,
        /// Look the entry up by id instead
        #[arg(long, conflicts_with = "date")]
        uid: Option<i64>,
    },
    /// Write or amend one day's entry
    Write(WriteArgs),
    /// List the most recent entries
    Recent,
    /// List the entries of a month
    Month {
        /// Month as YYYY-MM, the current month when omitted
        month: Option<String>,
        /// Show these days in full (YYYY-MM-DD, repeatable)
        #[arg(short, long = "select")]
        select: Vec<String>,
    },
    /// Delete an entry by its id
    Delete { uid: i64 },
}

#[derive(Args, Debug)]
struct WriteArgs {
    /// Day as YYYY-MM-DD, today when omitted
    #[arg(long)]
    date: Option<String>,
    #[arg(long)]
    for_myself: Option<String>,
    #[arg(long)]
    for_others: Option<String>,
    #[arg(long)]
    unexpressed_emotions: Option<String>,
    #[arg(long)]
    something_good: Option<String>,
    #[arg(long)]
    anticipation: Option<String>,
    #[arg(long)]
    abstinent: Option<bool>,
    #[arg(long)]
    exercised: Option<bool>,
}

#[derive(Subcommand, Debug)]
enum HabitCommand {
    /// List habits that are due
    List {
        /// Include snoozed habits
        #[arg(long)]
        snoozed: bool,
        /// List every habit, due or not
        #[arg(long)]
        all: bool,
    },
    /// Create a habit
    Add {
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<i32>,
        /// Interval between completions, e.g. 12h, 1d, 2w
        #[arg(long)]
        every: Option<String>,
        #[arg(long)]
        favourite: bool,
    },
    /// Change a habit's details
    Edit {
        habit_id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<i32>,
        /// Interval between completions, e.g. 12h, 1d, 2w
        #[arg(long)]
        every: Option<String>,
        #[arg(long)]
        favourite: Option<bool>,
    },
    /// Mark a habit as done now
    Done { habit_id: i64 },
    /// Remove the latest completion
    Undo { habit_id: i64 },
    /// Hide a habit for a while
    Snooze {
        habit_id: i64,
        duration: u32,
        /// minutes, hours, days or weeks
        #[arg(long)]
        unit: Option<String>,
    },
    /// End a snooze early
    Wake { habit_id: i64 },
    Archive { habit_id: i64 },
    /// Delete a habit and its history
    Delete { habit_id: i64 },
    /// Show a habit's completions
    History {
        habit_id: i64,
        /// Only completions from this day on (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
    },
}

async fn run_diary(app: &HappyDay, command: DiaryCommand, json: bool) -> Result<String, AppError> {
    match command {
        DiaryCommand::Show { date, uid } => {
            let params = commands::ShowEntryParams { date, uid };
            let response = commands::show_entry(app, params, today()).await?;
            format_response(&response, json)
        }
        DiaryCommand::Write(args) => {
            let params = commands::WriteEntryParams {
                date: args.date,
                for_myself: args.for_myself,
                for_others: args.for_others,
                unexpressed_emotions: args.unexpressed_emotions,
                something_good: args.something_good,
                anticipation: args.anticipation,
                abstinent: args.abstinent,
                exercised: args.exercised,
            };
            let response = commands::write_entry(app, params, today()).await?;
            format_response(&response, json)
        }
        DiaryCommand::Recent => {
            let response = commands::recent_entries(app).await?;
            format_response(&response, json)
        }
        DiaryCommand::Month { month, select } => {
            let params = commands::MonthEntriesParams {
                month,
                selected: select,
            };
            let response = commands::month_entries(app, params, today()).await?;
            format_response(&response, json)
        }
        DiaryCommand::Delete { uid } => {
            let response = commands::delete_entry(app, commands::DeleteEntryParams { uid }).await?;
            format_response(&response, json)
        }
    }
}

async fn run_habit(app: &HappyDay, command: HabitCommand, json: bool) -> Result<String, AppError> {
    use commands::HabitIdParams;

    match command {
        HabitCommand::List { snoozed, all } => {
            let params = commands::ListHabitsParams {
                include_snoozed: snoozed,
                all,
            };
            format_response(&commands::list_habits(app, params, now()).await?, json)
        }
        HabitCommand::Add {
            name,
            description,
            priority,
            every,
            favourite,
        } => {
            let params = commands::CreateHabitParams {
                name,
                description,
                priority,
                every,
                favourite,
            };
            format_response(&commands::create_habit(app, params, now()).await?, json)
        }
        HabitCommand::Edit {
            habit_id,
            name,
            description,
            priority,
            every,
            favourite,
        } => {
            let params = commands::EditHabitParams {
                habit_id,
                name,
                description,
                priority,
                every,
                favourite,
            };
            format_response(&commands::edit_habit(app, params).await?, json)
        }
        HabitCommand::Done { habit_id } => {
            format_response(&commands::mark_done(app, HabitIdParams { habit_id }, now()).await?, json)
        }
        HabitCommand::Undo { habit_id } => {
            format_response(&commands::undo_done(app, HabitIdParams { habit_id }).await?, json)
        }
        HabitCommand::Snooze {
            habit_id,
            duration,
            unit,
        } => {
            let params = commands::SnoozeHabitParams {
                habit_id,
                duration,
                unit,
            };
            format_response(&commands::snooze_habit(app, params, now()).await?, json)
        }
        HabitCommand::Wake { habit_id } => {
            format_response(&commands::wake_habit(app, HabitIdParams { habit_id }).await?, json)
        }
        HabitCommand::Archive { habit_id } => {
            format_response(&commands::archive_habit(app, HabitIdParams { habit_id }).await?, json)
        }
        HabitCommand::Delete { habit_id } => {
            format_response(&commands::delete_habit(app, HabitIdParams { habit_id }).await?, json)
        }
        HabitCommand::History { habit_id, since } => {
            let params = commands::HabitHistoryParams { habit_id, since };
            format_response(&commands::habit_history(app, params).await?, json)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging based on command line flags
    let log_level = LogLevel::from_flags(cli.debug, cli.verbose);
    tracing_subscriber::fmt()
        .with_env_filter(log_level.filter_directive())
        .with_writer(std::io::stderr) // Keep stdout for command output
        .init();

    let config = AppConfig::resolve(cli.database, log_level)?;
    info!("Using database at: {}", config.database_path.display());

    let app = HappyDay::open(&config.database_path)?;

    let output = match cli.command {
        Command::Diary(command) => run_diary(&app, command, cli.json).await?,
        Command::Habit(command) => run_habit(&app, command, cli.json).await?,
    };
    println!("{}", output);

    Ok(())
}
