// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

use pronouns::app_config::{Config, LogLevel};
use pronouns::catalog::{HttpCatalogClient, RemoteCatalogCache};
use pronouns::{AppError, PronounSet, StoreError, UserPronounStore};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show a user's pronoun sets in priority order
    Get {
        /// User UUID
        user: String,
    },

    /// Replace a user's pronoun sets; the first is primary
    Set {
        /// User UUID
        user: String,
        /// Six-token sets, e.g. she/her/she's/her/hers/herself
        #[arg(required = true)]
        sets: Vec<String>,
    },

    /// Remove all of a user's pronoun sets
    Clear {
        /// User UUID
        user: String,
    },

    /// Print every stored selection as JSON
    Export,

    /// Work with the community pronoun catalog
    #[command(subcommand)]
    Catalog(CatalogCommands),

    /// Generate shell completions for pronouns
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug)]
enum CatalogCommands {
    /// List the locally cached catalog
    List,
    /// Fetch the catalog from the remote service
    Update,
    /// Submit a new set to the remote service
    Submit {
        /// Six-token set
        set: String,
    },
}

/// pronouns - per-user pronoun storage administration
#[derive(Parser, Debug)]
#[command(name = "pronouns")]
#[command(version)]
#[command(about = "Manage stored pronoun sets and the community pronoun catalog")]
#[command(long_about = "Manage stored pronoun sets and the community pronoun catalog.

EXAMPLES:
    pronouns get 11111111-1111-1111-1111-111111111111
    pronouns set 11111111-1111-1111-1111-111111111111 she/her/she's/her/hers/herself
    pronouns export > pronouns.json
    pronouns catalog update
    pronouns completions bash > pronouns.bash

CONFIGURATION:
    Configuration is stored in pronouns.json by default. If the config file
    doesn't exist, a default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "pronouns.json")]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (color, tag) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "{}{} {} {}\x1B[0m",
                color,
                now,
                tag,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Some(level) = &cli.log_level {
        log::set_max_level(LogLevel::from(level.clone()).to_level_filter());
    }

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "pronouns", &mut std::io::stdout());
        return Ok(());
    }

    let config = Config::load(&cli.config_path)?;
    config.validate().context("Configuration validation failed")?;

    if cli.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    match cli.command {
        Commands::Catalog(command) => run_catalog(&config, command).await?,
        command => run_store(&config, command).await?,
    }

    Ok(())
}

async fn run_store(config: &Config, command: Commands) -> Result<(), AppError> {
    let store = UserPronounStore::open(&config.storage)?;

    match command {
        Commands::Get { user } => {
            let user = parse_user(&user)?;
            let sets = store.get(user).await?;
            if sets.is_empty() {
                println!("{} has no pronouns set", user);
            }
            for (priority, set) in sets.iter().enumerate() {
                println!("{}: {}", priority, set);
            }
        }
        Commands::Set { user, sets } => {
            let user = parse_user(&user)?;
            let sets = sets
                .iter()
                .map(|raw| PronounSet::parse(raw).map(|set| set.to_string()))
                .collect::<Result<Vec<String>, _>>()?;
            store.set_confirmed(user, sets).wait().await?;
            info!("Updated pronouns for {}", user);
        }
        Commands::Clear { user } => {
            let user = parse_user(&user)?;
            store.clear_confirmed(user).wait().await?;
            store.on_disconnect(user);
            info!("Cleared pronouns for {}", user);
        }
        Commands::Export => {
            let all = store.get_all().await?;
            let json = serde_json::to_string_pretty(&all)
                .map_err(|e| AppError::Unknown(e.to_string()))?;
            println!("{}", json);
        }
        Commands::Catalog(_) | Commands::Completions { .. } => {}
    }

    store.flush().await?;
    Ok(())
}

async fn run_catalog(config: &Config, command: CatalogCommands) -> Result<(), AppError> {
    if let CatalogCommands::Update = command {
        let catalog = RemoteCatalogCache::open_http(&config.catalog).await?;
        println!("{} sets known", catalog.get().len());
        return Ok(());
    }

    let client = Arc::new(HttpCatalogClient::from_config(&config.catalog)?);
    let catalog = RemoteCatalogCache::new(&config.catalog, client);

    match command {
        CatalogCommands::List => {
            catalog.reload().await;
            if let Some(snapshot) = catalog.snapshot() {
                info!(
                    "Catalog from {} updated {} ({} sets)",
                    snapshot.source,
                    snapshot.updated_at.to_rfc3339(),
                    snapshot.sets.len()
                );
            }
            for set in catalog.get() {
                println!("{:<12} {}", set.formatted(), set);
            }
        }
        CatalogCommands::Update => {}
        CatalogCommands::Submit { set } => {
            let set = PronounSet::parse(&set)?;
            catalog.submit(&set).await;
        }
    }

    Ok(())
}

fn parse_user(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| StoreError::InvalidUserId(raw.to_string()).into())
}
