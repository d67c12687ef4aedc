//! Lakeland CLI
//!
//! Command-line interface for the Airtable → v4 archive migration:
//! - Running the full migration and writing one JSON file per v4 table
//! - Normalizing a single raw NAS path entry
//! - Checking exports for schema drift against the field mappings

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use lakeland_migrate::{
    check_mappings, run_migration, write_outputs, MigrationConfig, MigrationReport, TableStatus,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lakeland")]
#[command(author, version, about = "Lakeland archive: Airtable → v4 migration")]
struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate every source table and build v4 records.
    Migrate {
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory holding the Airtable JSON exports
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Directory receiving the v4 JSON files
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Construct rows in parallel
        #[arg(long)]
        parallel: bool,
        /// Run without writing any output
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the canonical paths for one raw `File Path` entry.
    NormalizePath {
        /// Raw cell value, e.g. `"Photos/img1.jpg","Documents/scan2.pdf"`
        raw: String,
        /// Configuration file (JSON) with root overrides
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Check every export for columns missing from the field mappings.
    CheckMappings {
        /// Directory holding the Airtable JSON exports
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Configuration file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn load_config(path: Option<&Path>) -> Result<MigrationConfig> {
    match path {
        Some(path) => MigrationConfig::load(path),
        None => Ok(MigrationConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Migrate {
            config,
            input,
            output,
            parallel,
            dry_run,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(input) = input {
                config.input_dir = input;
            }
            if let Some(output) = output {
                config.output_dir = output;
            }
            if parallel {
                config.parallel_validation = true;
            }
            tracing::debug!(?config, "resolved configuration");
            if !cmd_migrate(&config, dry_run)? {
                std::process::exit(1);
            }
        }
        Commands::NormalizePath { raw, config } => {
            let config = load_config(config.as_deref())?;
            for path in config.path_normalizer().normalize(&raw) {
                println!("{path}");
            }
        }
        Commands::CheckMappings { input, config } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(input) = input {
                config.input_dir = input;
            }
            if !cmd_check_mappings(&config.input_dir)? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Returns `false` when any table failed.
fn cmd_migrate(config: &MigrationConfig, dry_run: bool) -> Result<bool> {
    println!(
        "{} {}",
        "Migrating".green().bold(),
        config.input_dir.display()
    );

    let outcome = run_migration(config)?;
    print_report(&outcome.report);

    if dry_run {
        println!("  {} dry run, nothing written", "→".yellow());
    } else {
        let written = write_outputs(&outcome, &config.output_dir)?;
        println!(
            "{} {} files to {}",
            "wrote".green().bold(),
            written.len(),
            config.output_dir.display().to_string().bold()
        );
    }

    Ok(!outcome.report.has_failures())
}

fn print_report(report: &MigrationReport) {
    for table in &report.tables {
        let status = match &table.status {
            TableStatus::Completed => "ok".green().bold(),
            TableStatus::Failed { .. } => "failed".red().bold(),
            TableStatus::Skipped { .. } => "skipped".yellow().bold(),
        };
        println!(
            "  {:<14} {:<8} {} rows, {} validated, {} built, {} rejected, {} unresolved",
            table.table.to_string(),
            status,
            table.input_rows,
            table.validated,
            table.built,
            table.rejected(),
            table.unresolved.len()
        );
        match &table.status {
            TableStatus::Failed { reason } => println!("    {} {reason}", "→".yellow()),
            TableStatus::Skipped { blocked_by } => {
                let names: Vec<String> = blocked_by.iter().map(|t| t.to_string()).collect();
                println!("    {} blocked by {}", "→".yellow(), names.join(", "));
            }
            TableStatus::Completed => {}
        }
        for err in &table.record_errors {
            println!("    {} {err}", "✗".red());
        }
        for err in &table.build_errors {
            println!("    {} {err}", "✗".red());
        }
    }
    println!(
        "  {} {} rows in, {} records built, {} rejected, {} unresolved references",
        "→".yellow(),
        report.total_input_rows(),
        report.total_built(),
        report.total_rejected(),
        report.total_unresolved()
    );
}

/// Returns `false` when any table drifted.
fn cmd_check_mappings(input_dir: &Path) -> Result<bool> {
    println!(
        "{} {}",
        "Checking mappings in".green().bold(),
        input_dir.display()
    );

    let mut clean = true;
    for check in check_mappings(input_dir)? {
        match &check.drift {
            None => println!(
                "  {:<14} {} ({} rows)",
                check.table.to_string(),
                "ok".green().bold(),
                check.rows
            ),
            Some(drift) => {
                clean = false;
                println!(
                    "  {:<14} {} unmapped: {}",
                    check.table.to_string(),
                    "drift".red().bold(),
                    drift.unmapped.join(", ")
                );
            }
        }
    }
    Ok(clean)
}
