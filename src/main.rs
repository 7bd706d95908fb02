// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use banca_db::app_config::{Config, LogLevel};
use banca_db::catalog::{Catalog, ClientQuery, ObjectQuery};
use banca_db::database::DatabaseConnection;
use banca_db::database::models::{Gender, Group, ProbeClass, Purpose};
use banca_db::protocols::Protocol;
use banca_db::{create, file_utils};

/// CLI Wrapper for Protocol to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliProtocol {
    Mc,
    Md,
    Ma,
    Ud,
    Ua,
    P,
    G,
}

impl From<CliProtocol> for Protocol {
    fn from(cli: CliProtocol) -> Self {
        match cli {
            CliProtocol::Mc => Protocol::Mc,
            CliProtocol::Md => Protocol::Md,
            CliProtocol::Ma => Protocol::Ma,
            CliProtocol::Ud => Protocol::Ud,
            CliProtocol::Ua => Protocol::Ua,
            CliProtocol::P => Protocol::P,
            CliProtocol::G => Protocol::G,
        }
    }
}

/// CLI Wrapper for Group to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliGroup {
    World,
    Dev,
    Eval,
}

impl From<CliGroup> for Group {
    fn from(cli: CliGroup) -> Self {
        match cli {
            CliGroup::World => Group::World,
            CliGroup::Dev => Group::Dev,
            CliGroup::Eval => Group::Eval,
        }
    }
}

/// CLI Wrapper for Purpose to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliPurpose {
    Train,
    Enrol,
    Probe,
}

impl From<CliPurpose> for Purpose {
    fn from(cli: CliPurpose) -> Self {
        match cli {
            CliPurpose::Train => Purpose::Train,
            CliPurpose::Enrol => Purpose::Enrol,
            CliPurpose::Probe => Purpose::Probe,
        }
    }
}

/// CLI Wrapper for ProbeClass to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliClass {
    Client,
    Impostor,
}

impl From<CliClass> for ProbeClass {
    fn from(cli: CliClass) -> Self {
        match cli {
            CliClass::Client => ProbeClass::Client,
            CliClass::Impostor => ProbeClass::Impostor,
        }
    }
}

/// CLI Wrapper for Gender to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliGender {
    F,
    M,
}

impl From<CliGender> for Gender {
    fn from(cli: CliGender) -> Self {
        match cli {
            CliGender::F => Gender::F,
            CliGender::M => Gender::M,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli: CliLogLevel) -> Self {
        match cli {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build and populate the metadata catalog
    Create {
        /// Rebuild even if the catalog is already populated
        #[arg(short, long)]
        force: bool,
    },

    /// Print the path stems of cataloged files matching the filters
    Dump {
        /// Restrict to one protocol
        #[arg(short, long, value_enum)]
        protocol: Option<CliProtocol>,

        /// Restrict to one protocol group
        #[arg(short, long, value_enum)]
        group: Option<CliGroup>,

        /// Restrict to one purpose
        #[arg(short = 'u', long, value_enum)]
        purpose: Option<CliPurpose>,

        /// Restrict probes to one access class
        #[arg(short, long, value_enum)]
        class: Option<CliClass>,

        /// Prefix the printed paths with this directory
        #[arg(short, long)]
        directory: Option<PathBuf>,

        /// Append this extension to the printed paths (e.g. '.jpg')
        #[arg(short, long)]
        extension: Option<String>,
    },

    /// Verify the raw data distribution against the catalog
    Checkfiles {
        /// Directory holding the raw data (defaults to the configured one)
        #[arg(short, long)]
        directory: Option<PathBuf>,

        /// Filename extension of the raw files (defaults to the configured one)
        #[arg(short, long)]
        extension: Option<String>,

        /// Restrict the audit to one protocol
        #[arg(short, long, value_enum)]
        protocol: Option<CliProtocol>,
    },

    /// Print complete paths for the given file identifiers
    Path {
        /// File identifiers to look up
        #[arg(value_name = "ID", required = true)]
        ids: Vec<i64>,

        /// Prefix the printed paths with this directory
        #[arg(short, long)]
        directory: Option<PathBuf>,

        /// Append this extension to the printed paths
        #[arg(short, long)]
        extension: Option<String>,
    },

    /// Print file identifiers for the given path stems
    Reverse {
        /// Path stems to look up
        #[arg(value_name = "STEM", required = true)]
        stems: Vec<String>,
    },

    /// List registered clients
    Clients {
        /// Restrict to one protocol group
        #[arg(short, long, value_enum)]
        group: Option<CliGroup>,

        /// Restrict to one gender
        #[arg(short = 'x', long, value_enum)]
        gender: Option<CliGender>,
    },

    /// List registered protocols
    Protocols,

    /// Print catalog statistics
    Stats,

    /// Generate shell completions for banca-db
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// banca-db - BANCA verification database access tool
///
/// Builds and queries the metadata catalog of the BANCA face verification
/// database: clients, recordings and the seven evaluation protocols.
#[derive(Parser, Debug)]
#[command(name = "banca-db")]
#[command(version)]
#[command(about = "BANCA verification database access tool")]
#[command(long_about = "banca-db builds and queries the metadata catalog of the BANCA face
verification database. The raw recordings are distributed separately by
their owners; this tool only manages path stems and ground-truth labels.

EXAMPLES:
    banca-db create                          # Build the catalog
    banca-db dump -p mc -g dev -u probe      # List the Mc development probes
    banca-db checkfiles -d /data/banca       # Audit the raw data distribution
    banca-db clients -g eval                 # List the evaluation set clients
    banca-db completions bash > banca-db.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a
    different config file with --config-path. If the config file doesn't
    exist, a default one will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Catalog file path, overriding the configured one
    #[arg(short = 'b', long)]
    database: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

// Custom logger implementation, colored by level, writing to stderr
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let color = Self::color_for_level(record.level());
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:5} {}\x1B[0m",
                color,
                now,
                record.level(),
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
    // Initialize the logger once with info level by default;
    // the level is adjusted after loading the config if needed.
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "banca-db", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(cmd_log_level) = cli.log_level {
        log::set_max_level(level_filter(cmd_log_level.into()));
    }

    // Load or create configuration
    let mut config = if Path::new(&cli.config_path).exists() {
        Config::from_file(&cli.config_path)
            .with_context(|| format!("Failed to load config: {}", cli.config_path))?
    } else {
        warn!(
            "Config file not found at '{}', creating default config.",
            cli.config_path
        );
        let config = Config::default();
        config.save(&cli.config_path)?;
        config
    };

    if let Some(log_level) = cli.log_level {
        config.log_level = log_level.into();
    }
    if let Some(database) = &cli.database {
        config.database_path = Some(database.clone());
    }

    config.validate().context("Configuration validation failed")?;
    log::set_max_level(level_filter(config.log_level));

    let db_path = config.resolve_database_path()?;

    match cli.command {
        Commands::Create { force } => {
            let db = DatabaseConnection::new(&db_path)?;
            let summary = create::populate(&db, force).await?;
            if force {
                // Reclaim the space freed by the cleared rows
                db.vacuum()?;
            }
            info!("Created catalog at {:?}: {}", db_path, summary);
        }

        Commands::Dump {
            protocol,
            group,
            purpose,
            class,
            directory,
            extension,
        } => {
            let catalog = Catalog::open(&db_path)?;
            let mut query = ObjectQuery::new();
            if let Some(p) = protocol {
                query = query.protocol(p.into());
            }
            if let Some(g) = group {
                query = query.group(g.into());
            }
            if let Some(u) = purpose {
                query = query.purpose(u.into());
            }
            if let Some(c) = class {
                query = query.class(c.into());
            }

            let files = catalog.objects(&query).await?;
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for file in &files {
                let path = file.make_path(directory.as_deref(), extension.as_deref());
                writeln!(out, "{}", path.display())?;
            }
            info!("Dumped {} files", files.len());
        }

        Commands::Checkfiles {
            directory,
            extension,
            protocol,
        } => {
            let catalog = Catalog::open(&db_path)?;
            let directory = directory.unwrap_or_else(|| config.data_directory.clone());
            let extension = extension.unwrap_or_else(|| config.extension.clone());
            let protocols: Vec<Protocol> = protocol.into_iter().map(Into::into).collect();

            let report =
                file_utils::check_files(&catalog, &directory, &extension, &protocols).await?;

            for path in &report.missing {
                println!("missing: {}", path.display());
            }
            for path in &report.extra {
                println!("extra: {}", path.display());
            }
            info!(
                "Checked {} files: {} missing, {} extra",
                report.total,
                report.missing.len(),
                report.extra.len()
            );

            if !report.is_complete() {
                return Err(anyhow!(
                    "{} cataloged files are missing from {:?}",
                    report.missing.len(),
                    directory
                ));
            }
        }

        Commands::Path {
            ids,
            directory,
            extension,
        } => {
            let catalog = Catalog::open(&db_path)?;
            let paths = catalog
                .paths(&ids, directory.as_deref(), extension.as_deref())
                .await?;
            for path in &paths {
                println!("{}", path.display());
            }
            if paths.len() != ids.len() {
                warn!("{} identifiers were not found", ids.len() - paths.len());
            }
        }

        Commands::Reverse { stems } => {
            let catalog = Catalog::open(&db_path)?;
            let ids = catalog.reverse(&stems).await?;
            for id in &ids {
                println!("{}", id);
            }
            if ids.len() != stems.len() {
                warn!("{} stems were not found", stems.len() - ids.len());
            }
        }

        Commands::Clients { group, gender } => {
            let catalog = Catalog::open(&db_path)?;
            let mut query = ClientQuery::new();
            if let Some(g) = group {
                query = query.group(g.into());
            }
            if let Some(x) = gender {
                query = query.gender(x.into());
            }

            let clients = catalog.clients(&query).await?;
            for client in &clients {
                println!(
                    "{} {} {} {}",
                    client.id, client.gender, client.group, client.language
                );
            }
            info!("Listed {} clients", clients.len());
        }

        Commands::Protocols => {
            let catalog = Catalog::open(&db_path)?;
            for protocol in catalog.protocols().await? {
                println!("{}", protocol.name);
            }
        }

        Commands::Stats => {
            let catalog = Catalog::open(&db_path)?;
            println!("{}", catalog.stats()?);
        }

        Commands::Completions { .. } => unreachable!("handled above"),
    }

    Ok(())
}
