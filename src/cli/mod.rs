// cli - the `migrate` command line
//
// With no subcommand, `MIGRATION_CMD` supplies one (e.g. `up` or `down-to 3`).

pub mod utils;

use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::AppConfig;
use crate::database::migrator::{self, Migrator};
use crate::database::open_store;

use utils::{output_status, output_success};

pub const MIGRATION_CMD: &str = "MIGRATION_CMD";

#[derive(Parser, Debug)]
#[command(name = "migrate")]
#[command(about = "Apply and manage versioned SQL migrations")]
#[command(version)]
pub struct MigrateCli {
    #[arg(long, default_value = "./migrations", help = "Directory with migration files")]
    pub dir: PathBuf,

    #[arg(short = 'v', long, help = "Enable verbose mode")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<MigrateCommand>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum MigrateCommand {
    #[command(about = "Migrate the DB to the most recent version available")]
    Up,

    #[command(about = "Migrate the DB to a specific version")]
    UpTo { version: i64 },

    #[command(about = "Roll back the version by 1")]
    Down,

    #[command(about = "Roll back to a specific version")]
    DownTo { version: i64 },

    #[command(about = "Re-run the latest migration")]
    Redo,

    #[command(about = "Roll back all migrations")]
    Reset,

    #[command(about = "Dump the migration status for the current DB")]
    Status,

    #[command(about = "Print the current version of the database")]
    Version,

    #[command(about = "Create a new timestamped migration")]
    Create { name: String },

    #[command(about = "Apply sequential ordering to migrations")]
    Fix,
}

/// Parser for a command given through `MIGRATION_CMD`.
#[derive(Parser, Debug)]
#[command(name = "migrate", no_binary_name = true)]
struct EnvCommand {
    #[command(subcommand)]
    command: MigrateCommand,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &MigrateCli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Parse a command line such as `up-to 3`. Blank input means no command.
pub fn parse_command(line: &str) -> anyhow::Result<Option<MigrateCommand>> {
    let args: Vec<&str> = line.split_whitespace().collect();
    if args.is_empty() {
        return Ok(None);
    }
    let parsed = EnvCommand::try_parse_from(args)
        .with_context(|| format!("invalid migration command: {:?}", line))?;
    Ok(Some(parsed.command))
}

fn command_from_env() -> anyhow::Result<Option<MigrateCommand>> {
    match std::env::var(MIGRATION_CMD) {
        Ok(line) => parse_command(&line),
        Err(_) => Ok(None),
    }
}

pub async fn run(cli: MigrateCli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    let command = match cli.command.clone() {
        Some(command) => command,
        None => match command_from_env()? {
            Some(command) => command,
            None => {
                MigrateCli::command().print_help()?;
                return Ok(());
            }
        },
    };

    match command {
        MigrateCommand::Create { name } => {
            let (up, down) = migrator::create(&cli.dir, &name, chrono::Utc::now())?;
            output_success(
                &output_format,
                &format!("Created migration {}", up.display()),
                Some(json!({ "up": up, "down": down })),
            )
        }
        MigrateCommand::Fix => {
            let renamed = migrator::fix(&cli.dir)?;
            output_success(
                &output_format,
                &format!("Renumbered {} migration(s)", renamed.len()),
                Some(json!({ "renamed": renamed })),
            )
        }
        command => {
            let config = AppConfig::load().context("failed to load configuration")?;
            let db = open_store(&config.store)
                .await
                .context("could not open database")?;

            let migrator = Migrator::new(&cli.dir, db.pool().clone());
            let result = execute(&migrator, command, &output_format).await;
            db.close().await;
            result
        }
    }
}

async fn execute(
    migrator: &Migrator,
    command: MigrateCommand,
    output_format: &OutputFormat,
) -> anyhow::Result<()> {
    match command {
        MigrateCommand::Up => {
            let applied = migrator.up().await?;
            applied_message(output_format, "Applied", &applied)
        }
        MigrateCommand::UpTo { version } => {
            let applied = migrator.up_to(version).await?;
            applied_message(output_format, "Applied", &applied)
        }
        MigrateCommand::Down => {
            let version = migrator.down().await?;
            applied_message(output_format, "Rolled back", &[version])
        }
        MigrateCommand::DownTo { version } => {
            let rolled_back = migrator.down_to(version).await?;
            applied_message(output_format, "Rolled back", &rolled_back)
        }
        MigrateCommand::Redo => {
            let version = migrator.redo().await?;
            applied_message(output_format, "Re-applied", &[version])
        }
        MigrateCommand::Reset => {
            let rolled_back = migrator.reset().await?;
            applied_message(output_format, "Rolled back", &rolled_back)
        }
        MigrateCommand::Status => output_status(output_format, &migrator.status().await?),
        MigrateCommand::Version => {
            let version = migrator.version().await?;
            output_success(
                output_format,
                &format!("version {}", version),
                Some(json!({ "version": version })),
            )
        }
        MigrateCommand::Create { .. } | MigrateCommand::Fix => {
            anyhow::bail!("{:?} does not need a database connection", command)
        }
    }
}

fn applied_message(output_format: &OutputFormat, verb: &str, versions: &[i64]) -> anyhow::Result<()> {
    output_success(
        output_format,
        &format!("{} {} migration(s)", verb, versions.len()),
        Some(json!({ "versions": versions })),
    )
}
