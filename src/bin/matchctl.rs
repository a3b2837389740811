//! matchctl
//!
//! Operator CLI for the match store: manage cities and users, trigger a
//! city recomputation and inspect stored matches. All output is JSON on
//! stdout; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

use matchmaker_core::{
    EngineConfig, MatchEngine, MatchResult, NewUser, Orientation, ProfileTraits, SqliteStore,
};

/// Match store administration
#[derive(Parser)]
#[command(name = "matchctl")]
#[command(version)]
#[command(about = "Manage cities, users and computed matches")]
#[command(propagate_version = true)]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database path, overrides the config file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Straight,
    Gay,
    Lesbian,
    Bisexual,
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Straight => Orientation::Straight,
            OrientationArg::Gay => Orientation::Gay,
            OrientationArg::Lesbian => Orientation::Lesbian,
            OrientationArg::Bisexual => Orientation::Bisexual,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a city
    AddCity { name: String },

    /// List cities
    Cities,

    /// Create a user
    AddUser {
        username: String,

        #[arg(long)]
        city: i64,

        #[arg(long)]
        gender: Option<String>,

        #[arg(long, value_enum, default_value = "straight")]
        orientation: OrientationArg,

        #[arg(long, default_value = "")]
        story: String,

        /// Comma-separated self traits
        #[arg(long, value_delimiter = ',')]
        traits: Vec<String>,

        /// Comma-separated desired traits
        #[arg(long, value_delimiter = ',')]
        wants: Vec<String>,
    },

    /// Rebuild every match of a city
    Recompute {
        #[arg(long)]
        city: i64,
    },

    /// Show a user's matches, best first
    Matches {
        #[arg(long)]
        user: i64,
    },
}

#[derive(Serialize)]
struct Created {
    id: i64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> MatchResult<String> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(db) = cli.db {
        config = config.with_database_path(db);
    }

    let mut engine = MatchEngine::new(SqliteStore::open(&config)?);

    match cli.command {
        Commands::AddCity { name } => {
            let id = engine.store().insert_city(&name)?;
            Ok(to_json(&Created { id }))
        }
        Commands::Cities => Ok(to_json(&engine.store().list_cities()?)),
        Commands::AddUser {
            username,
            city,
            gender,
            orientation,
            story,
            traits,
            wants,
        } => {
            let mut user = NewUser::new(&username, city)
                .with_story(&story)
                .with_orientation(orientation.into());
            if let Some(gender) = gender {
                user = user.with_gender(&gender);
            }
            if !traits.is_empty() || !wants.is_empty() {
                user = user.with_traits(ProfileTraits {
                    self_traits: traits,
                    desired_traits: wants,
                    ..ProfileTraits::default()
                });
            }
            let id = engine.store().insert_user(&user)?;
            Ok(to_json(&Created { id }))
        }
        Commands::Recompute { city } => Ok(to_json(&engine.recompute_city(city)?)),
        Commands::Matches { user } => Ok(to_json(&engine.matches_for_user(user)?)),
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}
