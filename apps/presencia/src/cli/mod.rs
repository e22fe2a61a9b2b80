//! # Presencia CLI Module
//!
//! ## Available Commands
//!
//! - `kiosk` - Run the interactive kiosk loop (rollover sweep runs first)
//! - `enroll` - Enroll or re-enroll a person from a template file
//! - `scan` - Walk-up identification and clocking from a capture file
//! - `verify` - Claimed-identity verification and clocking
//! - `roster` - List enrolled identities
//! - `edit` - Update an identity's profile fields
//! - `report` - Monthly attendance report
//! - `reset-delays` - Zero every delay counter
//! - `rollover` - Run the annual sweep on demand
//! - `status` - Show store status

mod commands;

use clap::{Parser, Subcommand};
use presencia_core::PresenciaError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Presencia - biometric attendance kiosk
///
/// One shared capture device, a roster of enrolled people, one attendance
/// row per person per day.
#[derive(Parser, Debug)]
#[command(name = "presencia")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the attendance database (overrides the config file)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Path to the kiosk configuration file
    #[arg(short = 'C', long, global = true, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the interactive kiosk loop
    Kiosk,

    /// Enroll or re-enroll a person
    Enroll {
        /// External identifier (dots and dashes are stripped)
        #[arg(long)]
        id: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        middle_name: Option<String>,

        #[arg(long)]
        paternal_surname: String,

        #[arg(long)]
        maternal_surname: String,

        /// Cohort label; defaults to the configured cohort
        #[arg(long)]
        cohort: Option<String>,

        /// Late threshold as HH:MM or HH:MM:SS; defaults to the configured one
        #[arg(long)]
        late_threshold: Option<String>,

        /// Delay count that triggers the receipt warning
        #[arg(long)]
        warning_threshold: Option<u32>,

        /// File whose bytes stand in for the enrollment capture
        #[arg(long)]
        template_file: PathBuf,
    },

    /// Walk-up identification and clocking (one-to-many scan)
    Scan {
        /// File whose bytes stand in for the live capture
        #[arg(long)]
        capture_file: PathBuf,
    },

    /// Claimed-identity verification and clocking (one-to-one)
    Verify {
        /// External identifier claimed at the pad
        #[arg(long)]
        id: String,

        /// File whose bytes stand in for the live capture
        #[arg(long)]
        capture_file: PathBuf,
    },

    /// List enrolled identities
    Roster,

    /// Update an identity's profile fields (template and history untouched)
    Edit {
        #[arg(long)]
        id: String,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        middle_name: Option<String>,

        #[arg(long)]
        paternal_surname: Option<String>,

        #[arg(long)]
        maternal_surname: Option<String>,

        #[arg(long)]
        cohort: Option<String>,

        #[arg(long)]
        late_threshold: Option<String>,

        #[arg(long)]
        warning_threshold: Option<u32>,
    },

    /// Monthly attendance report, chronologically sorted
    Report {
        /// Month (1-12)
        #[arg(short, long)]
        month: u32,

        /// Year
        #[arg(short, long)]
        year: i32,
    },

    /// Zero every delay counter
    ResetDelays {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Run the annual rollover sweep on demand
    Rollover {
        /// Sweep year; defaults to the current year
        #[arg(long)]
        year: Option<u64>,
    },

    /// Show store status
    Status,
}

// =============================================================================
// DISPATCH
// =============================================================================

/// Execute the parsed command line.
pub async fn execute(cli: Cli) -> Result<(), PresenciaError> {
    let config = crate::config::KioskConfig::load(&cli.config)?;
    let database = cli.database.unwrap_or_else(|| config.database.clone());

    match cli.command {
        Some(Commands::Kiosk) | None => cmd_kiosk(&database).await,
        Some(Commands::Enroll {
            id,
            first_name,
            middle_name,
            paternal_surname,
            maternal_surname,
            cohort,
            late_threshold,
            warning_threshold,
            template_file,
        }) => cmd_enroll(
            &database,
            &config,
            EnrollArgs {
                id,
                first_name,
                middle_name,
                paternal_surname,
                maternal_surname,
                cohort,
                late_threshold,
                warning_threshold,
                template_file,
            },
            cli.json_mode,
        ),
        Some(Commands::Scan { capture_file }) => cmd_scan(&database, &capture_file, cli.json_mode),
        Some(Commands::Verify { id, capture_file }) => {
            cmd_verify(&database, &id, &capture_file, cli.json_mode)
        }
        Some(Commands::Roster) => cmd_roster(&database, cli.json_mode),
        Some(Commands::Edit {
            id,
            first_name,
            middle_name,
            paternal_surname,
            maternal_surname,
            cohort,
            late_threshold,
            warning_threshold,
        }) => cmd_edit(
            &database,
            EditArgs {
                id,
                first_name,
                middle_name,
                paternal_surname,
                maternal_surname,
                cohort,
                late_threshold,
                warning_threshold,
            },
        ),
        Some(Commands::Report { month, year }) => {
            cmd_report(&database, month, year, cli.json_mode)
        }
        Some(Commands::ResetDelays { yes }) => cmd_reset_delays(&database, yes),
        Some(Commands::Rollover { year }) => cmd_rollover(&database, year),
        Some(Commands::Status) => cmd_status(&database, cli.json_mode),
    }
}
