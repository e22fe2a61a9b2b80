//! # Presencia - Attendance Kiosk
//!
//! The main binary for the Presencia biometric attendance system.
//!
//! This application provides:
//! - Interactive kiosk loop (worker tasks + completion channel)
//! - CLI interface for enrollment, clocking, reports, and rollover
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                apps/presencia (THE BINARY)                 │
//! │                                                            │
//! │  ┌─────────────┐   ┌──────────────┐   ┌────────────────┐  │
//! │  │   CLI       │   │  Kiosk loop  │   │  Simulated     │  │
//! │  │  (clap)     │   │  (tokio)     │   │  device        │  │
//! │  └──────┬──────┘   └──────┬───────┘   └───────┬────────┘  │
//! │         │                 │                   │            │
//! │         └─────────────────┼───────────────────┘            │
//! │                           ▼                                │
//! │                 ┌──────────────────┐                       │
//! │                 │  presencia-core  │                       │
//! │                 │   (THE LOGIC)    │                       │
//! │                 └──────────────────┘                       │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Run the kiosk (annual rollover sweeps first)
//! presencia kiosk
//!
//! # Admin operations
//! presencia enroll --id 12345678-5 --first-name Ana --paternal-surname Rojas \
//!     --maternal-surname Soto --template-file finger.bin
//! presencia report --month 3 --year 2026
//! presencia roster
//! ```

use clap::Parser;
use presencia::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — PRESENCIA_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("PRESENCIA_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "presencia=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    println!(
        r#"
  ██████╗ ██████╗ ███████╗███████╗███████╗███╗   ██╗ ██████╗██╗ █████╗
  ██╔══██╗██╔══██╗██╔════╝██╔════╝██╔════╝████╗  ██║██╔════╝██║██╔══██╗
  ██████╔╝██████╔╝█████╗  ███████╗█████╗  ██╔██╗ ██║██║     ██║███████║
  ██╔═══╝ ██╔══██╗██╔══╝  ╚════██║██╔══╝  ██║╚██╗██║██║     ██║██╔══██║
  ██║     ██║  ██║███████╗███████║███████╗██║ ╚████║╚██████╗██║██║  ██║
  ╚═╝     ╚═╝  ╚═╝╚══════╝╚══════╝╚══════╝╚═╝  ╚═══╝ ╚═════╝╚═╝╚═╝  ╚═╝

  Attendance Kiosk v{}

  One device • One row per day • Counters that add up
"#,
        env!("CARGO_PKG_VERSION")
    );
}
