//! # Interactive Kiosk Loop
//!
//! The long-lived front of the kiosk binary. Capture operations run on
//! blocking worker tasks (the capture primitive waits on physical
//! interaction and cannot be interrupted); completion messages come back
//! over a channel consumed by this loop. Workers never touch the terminal
//! state directly.
//!
//! A second trigger while a capture is in flight reaches the coordinator's
//! non-blocking acquisition and comes back as `DeviceBusy`, which the loop
//! surfaces distinctly from hardware failures.

use presencia_core::{Kiosk, PersonId, PresenciaError, ScanClock, VerifyClock};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::cli::render_receipt;
use crate::device_sim::{CaptureFeed, SimulatedDevice};

/// Completion message posted by a worker task.
enum KioskMessage {
    Scan(Result<ScanClock, PresenciaError>),
    Verify(PersonId, Result<VerifyClock, PresenciaError>),
}

fn print_help() {
    println!("Commands:");
    println!("  scan <capture-file>          walk-up identification");
    println!("  verify <id> <capture-file>   claimed-identity verification");
    println!("  quit                         stop the kiosk");
}

fn load_finger(feed: &CaptureFeed, path: &str) -> bool {
    match std::fs::read(Path::new(path)) {
        Ok(bytes) => {
            feed.place(bytes);
            true
        }
        Err(e) => {
            println!("Cannot read capture file '{}': {}", path, e);
            false
        }
    }
}

fn print_message(message: KioskMessage) {
    match message {
        KioskMessage::Scan(Ok(ScanClock::Clocked(receipt))) => {
            print!("{}", render_receipt(&receipt));
        }
        KioskMessage::Scan(Ok(ScanClock::NoMatch)) => {
            println!("Capture matched no enrolled person.");
        }
        KioskMessage::Scan(Ok(ScanClock::Empty)) => {
            println!("Nothing to compare against: no one is enrolled.");
        }
        KioskMessage::Verify(_, Ok(VerifyClock::Clocked(receipt))) => {
            print!("{}", render_receipt(&receipt));
        }
        KioskMessage::Verify(person, Ok(VerifyClock::Rejected)) => {
            println!("Capture does not match {}.", person);
        }
        KioskMessage::Scan(Err(PresenciaError::DeviceBusy))
        | KioskMessage::Verify(_, Err(PresenciaError::DeviceBusy)) => {
            println!("A capture is already in progress; try again in a moment.");
        }
        KioskMessage::Scan(Err(e)) | KioskMessage::Verify(_, Err(e)) => {
            tracing::error!("capture operation failed: {}", e);
            println!("Operation failed: {}", e);
        }
    }
}

/// Run the loop until `quit`, end of input, or Ctrl-C.
pub async fn run(
    kiosk: Arc<Kiosk<SimulatedDevice>>,
    feed: CaptureFeed,
) -> Result<(), PresenciaError> {
    let (tx, mut rx) = mpsc::channel::<KioskMessage>(16);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Presencia kiosk ready.");
    print_help();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Ok(Some(line)) = line else { break };
                let parts: Vec<&str> = line.split_whitespace().collect();
                match parts.as_slice() {
                    ["scan", path] => {
                        if !load_finger(&feed, path) {
                            continue;
                        }
                        let kiosk = Arc::clone(&kiosk);
                        let tx = tx.clone();
                        tokio::task::spawn_blocking(move || {
                            let now = chrono::Local::now().naive_local();
                            let result = kiosk.clock_by_scan(now);
                            let _ = tx.blocking_send(KioskMessage::Scan(result));
                        });
                    }
                    ["verify", id, path] => {
                        let person = match PersonId::new(id) {
                            Ok(person) => person,
                            Err(e) => {
                                println!("{}", e);
                                continue;
                            }
                        };
                        if !load_finger(&feed, path) {
                            continue;
                        }
                        let kiosk = Arc::clone(&kiosk);
                        let tx = tx.clone();
                        tokio::task::spawn_blocking(move || {
                            let now = chrono::Local::now().naive_local();
                            let result = kiosk.clock_by_verify(&person, now);
                            let _ = tx.blocking_send(KioskMessage::Verify(person, result));
                        });
                    }
                    ["quit" | "exit"] => break,
                    [] => {}
                    _ => print_help(),
                }
            }
            Some(message) = rx.recv() => print_message(message),
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    println!("Kiosk stopped.");
    Ok(())
}
