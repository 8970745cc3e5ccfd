//! FeedAPI to Feeds migration CLI
//!
//! Moves legacy feed-import settings, feeds and items into importers.
//! Pedantic lints relaxed for CLI ergonomics.

// CLI tool - relax pedantic lints for ergonomics
#![allow(clippy::pedantic)]

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use feeds_migrate::config::EXAMPLE_CONFIG;
use feeds_migrate::ui::ConsoleUI;
use feeds_migrate::{MigrationConfig, MigrationReport, Migrator, SqliteBackend};

#[derive(Parser)]
#[command(name = "feeds-migrate")]
#[command(version)]
#[command(about = "Migrate FeedAPI content types to Feeds importers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the categories a run would migrate
    List {
        /// Configuration file path
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Run the migration
    Run {
        /// Configuration file path
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,

        /// Only migrate this category (repeatable)
        #[arg(long = "category", value_name = "CATEGORY")]
        categories: Vec<String>,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Create the importer tables if they are missing
        #[arg(long)]
        install_schema: bool,

        /// Disable the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Validate configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long, value_name = "FILE")]
        config: PathBuf,
    },

    /// Generate example configuration
    Init {
        /// Output file path
        #[arg(short, long, default_value = "feeds-migrate.yaml")]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::List { config } => list_categories(&config)?,
        Commands::Run {
            config,
            categories,
            yes,
            install_schema,
            no_progress,
        } => {
            let outcome = run_migration(&config, categories, yes, install_schema, no_progress)?;
            if outcome != RunOutcome::Success {
                std::process::exit(outcome.exit_code());
            }
        }
        Commands::Validate { config } => validate_config(&config)?,
        Commands::Init { output } => generate_config(&output)?,
    }

    Ok(())
}

/// How a run ended, as seen by the shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunOutcome {
    Success,
    /// Some categories failed on their own.
    CategoryFailures,
    /// A failure came from the database or the registry.
    EnvironmentFailure,
}

impl RunOutcome {
    fn from_report(report: &MigrationReport) -> Self {
        if report.has_environment_failures() {
            Self::EnvironmentFailure
        } else if report.is_success() {
            Self::Success
        } else {
            Self::CategoryFailures
        }
    }

    fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::EnvironmentFailure => 1,
            Self::CategoryFailures => 2,
        }
    }
}

fn load(config_path: &Path) -> anyhow::Result<(MigrationConfig, SqliteBackend)> {
    info!("Loading configuration from {:?}", config_path);

    let config = MigrationConfig::from_file(config_path)?;
    config.validate()?;
    let backend = SqliteBackend::open(&config.database)?;
    Ok((config, backend))
}

fn list_categories(config_path: &Path) -> anyhow::Result<()> {
    let (config, backend) = load(config_path)?;
    let migrator = Migrator::from_config(backend, &config)?;

    ConsoleUI::new().print_candidates(&migrator.list_candidate_categories()?);
    Ok(())
}

fn run_migration(
    config_path: &Path,
    categories: Vec<String>,
    yes: bool,
    install_schema: bool,
    no_progress: bool,
) -> anyhow::Result<RunOutcome> {
    let ui = ConsoleUI::new();
    let (config, backend) = load(config_path)?;
    if install_schema {
        backend.install_current_schema()?;
    }
    let mut migrator = Migrator::from_config(backend, &config)?;
    if no_progress {
        migrator.set_progress(false);
    }

    let selected = if !categories.is_empty() {
        categories
    } else if !config.options.categories.is_empty() {
        config.options.categories.clone()
    } else {
        migrator.list_candidate_categories()?
    };

    ui.print_header();
    if selected.is_empty() {
        ui.print_candidates(&selected);
        return Ok(RunOutcome::Success);
    }
    if !yes && !ui.confirm_run(&selected)? {
        ui.print_cancelled();
        return Ok(RunOutcome::Success);
    }

    info!("Starting migration...");
    let report = migrator.migrate_categories(&selected);
    ui.print_report(&report, migrator.messages());

    Ok(RunOutcome::from_report(&report))
}

fn validate_config(config_path: &Path) -> anyhow::Result<()> {
    info!("Validating configuration from {:?}", config_path);

    let config = MigrationConfig::from_file(config_path)?;
    config.validate()?;

    println!("✅ Configuration is valid!");
    println!("   Database:        {:?}", config.database);
    println!("   Capabilities:    {} declared", config.capabilities.len());
    println!("   Dictionary:      {} extra entries", config.dictionary.len());
    println!("   Field lookup:    {} overrides", config.field_lookup.len());
    println!(
        "   Default mapping: {}",
        config
            .default_mapping()?
            .map_or("built-in".to_string(), |m| format!("{} entries", m.entries().len()))
    );

    Ok(())
}

fn generate_config(output: &Path) -> anyhow::Result<()> {
    if output.exists() {
        ConsoleUI::new().print_error(&format!("{} already exists", output.display()));
        std::process::exit(1);
    }
    std::fs::write(output, EXAMPLE_CONFIG)?;
    println!("✅ Configuration written to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_outcome_exit_codes() {
        let mut report = MigrationReport::default();
        report.migrated.push("article".to_string());
        assert_eq!(RunOutcome::from_report(&report), RunOutcome::Success);

        report
            .failures
            .insert("blog".to_string(), "[MIGR-002] unsupported".to_string());
        assert_eq!(RunOutcome::from_report(&report).exit_code(), 2);

        report
            .failures
            .insert("news".to_string(), "[MIGR-008] locked".to_string());
        report.environment_failures.push("news".to_string());
        assert_eq!(RunOutcome::from_report(&report).exit_code(), 1);
    }
}
