//! # CLI Command Implementations
//!
//! One-shot admin and walk-up commands. Each command opens the store, builds
//! a kiosk around the simulated device, performs its operation, and prints a
//! text or JSON result.

use crate::config::{KioskConfig, parse_time_of_day};
use crate::device_sim::{CaptureFeed, SimulatedDevice};
use crate::sink::TracingSink;
use base64::Engine as _;
use chrono::{Datelike, Local, NaiveDate};
use presencia_core::{
    AttendanceStore, ClockReceipt, EnrollmentProfile, Kiosk, PersonId, PresenciaError,
    RolloverEngine, ScanClock, SweepOutcome, VerifyClock,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a template or capture stand-in file (1 MB).
///
/// Real device templates are a few kilobytes; anything larger is a mistake.
const MAX_CAPTURE_FILE_SIZE: u64 = 1024 * 1024;

/// Validate and read a capture stand-in file.
fn read_capture_file(path: &Path) -> Result<Vec<u8>, PresenciaError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        PresenciaError::Storage(format!("cannot read '{}': {}", path.display(), e))
    })?;
    if metadata.len() > MAX_CAPTURE_FILE_SIZE {
        return Err(PresenciaError::InvalidProfile(format!(
            "capture file '{}' exceeds {} bytes",
            path.display(),
            MAX_CAPTURE_FILE_SIZE
        )));
    }
    std::fs::read(path)
        .map_err(|e| PresenciaError::Storage(format!("cannot read '{}': {}", path.display(), e)))
}

// =============================================================================
// KIOSK ASSEMBLY
// =============================================================================

fn open_kiosk(
    database: &Path,
) -> Result<(Arc<Kiosk<SimulatedDevice>>, CaptureFeed), PresenciaError> {
    let store = Arc::new(AttendanceStore::open(database)?);
    let (device, feed) = SimulatedDevice::new();
    let kiosk = Arc::new(Kiosk::new(device, store, Arc::new(TracingSink)));
    Ok((kiosk, feed))
}

/// Render a receipt the way the ticket printer would.
#[must_use]
pub fn render_receipt(receipt: &ClockReceipt) -> String {
    let mut out = String::new();
    out.push_str("ATTENDANCE RECEIPT\n");
    out.push_str("--------------------------------\n");
    out.push_str(&format!("NAME:   {}\n", receipt.full_name));
    out.push_str(&format!("ID:     {}\n", receipt.person));
    out.push_str(&format!("STATUS: {}\n", receipt.status));
    out.push_str(&format!(
        "DELAYS: {} (warning at {})\n",
        receipt.delays, receipt.warning_threshold
    ));
    if receipt.duplicate {
        out.push_str("Already recorded today.\n");
    }
    if receipt.warning_due() {
        out.push_str("*** DELAY LIMIT REACHED ***\n");
    }
    out
}

fn receipt_json(receipt: &ClockReceipt) -> serde_json::Value {
    serde_json::json!({
        "person": receipt.person.as_str(),
        "full_name": receipt.full_name,
        "status": receipt.status.as_str(),
        "delays": receipt.delays,
        "warning_threshold": receipt.warning_threshold,
        "warning_due": receipt.warning_due(),
        "duplicate": receipt.duplicate,
    })
}

// =============================================================================
// KIOSK COMMAND
// =============================================================================

/// Run the rollover sweep, then the interactive kiosk loop.
pub async fn cmd_kiosk(database: &Path) -> Result<(), PresenciaError> {
    let (kiosk, feed) = open_kiosk(database)?;

    // The sweep runs before any capture traffic is accepted.
    let engine = RolloverEngine::new(Arc::clone(kiosk.store()), Arc::new(TracingSink))?;
    let year = Local::now().year() as u64;
    match engine.run_if_due(year)? {
        SweepOutcome::Applied(report) => {
            tracing::info!(
                "rollover {}: {} promoted, {} graduated, {} skipped",
                year,
                report.promoted,
                report.graduated,
                report.skipped.len()
            );
        }
        SweepOutcome::AlreadyApplied => {
            tracing::debug!("rollover already applied for {}", year);
        }
    }

    crate::kiosk_loop::run(kiosk, feed).await
}

// =============================================================================
// ENROLLMENT
// =============================================================================

/// Parsed `enroll` arguments.
pub struct EnrollArgs {
    pub id: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub paternal_surname: String,
    pub maternal_surname: String,
    pub cohort: Option<String>,
    pub late_threshold: Option<String>,
    pub warning_threshold: Option<u32>,
    pub template_file: PathBuf,
}

/// Enroll a person with a template file standing in for the capture.
pub fn cmd_enroll(
    database: &Path,
    config: &KioskConfig,
    args: EnrollArgs,
    json_mode: bool,
) -> Result<(), PresenciaError> {
    let late_threshold = match &args.late_threshold {
        Some(raw) => parse_time_of_day(raw)?,
        None => config.late_threshold,
    };
    let profile = EnrollmentProfile {
        person: PersonId::new(&args.id)?,
        first_name: args.first_name,
        middle_name: args.middle_name,
        paternal_surname: args.paternal_surname,
        maternal_surname: args.maternal_surname,
        cohort: args.cohort.unwrap_or_else(|| config.default_cohort.clone()),
        late_threshold,
        warning_threshold: args.warning_threshold.unwrap_or(config.warning_threshold),
    };

    let (kiosk, feed) = open_kiosk(database)?;
    feed.place(read_capture_file(&args.template_file)?);
    let person = profile.person.clone();
    let template = kiosk.enroll(profile)?;

    if json_mode {
        let output = serde_json::json!({
            "person": person.as_str(),
            "template_bytes": template.len(),
            "template_b64": base64::engine::general_purpose::STANDARD.encode(template.as_bytes()),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
    } else {
        println!(
            "Enrolled {} ({} template bytes)",
            person,
            template.len()
        );
    }
    Ok(())
}

// =============================================================================
// WALK-UP COMMANDS
// =============================================================================

/// One-to-many scan and clocking.
pub fn cmd_scan(
    database: &Path,
    capture_file: &Path,
    json_mode: bool,
) -> Result<(), PresenciaError> {
    let (kiosk, feed) = open_kiosk(database)?;
    feed.place(read_capture_file(capture_file)?);

    match kiosk.clock_by_scan(Local::now().naive_local())? {
        ScanClock::Clocked(receipt) => {
            if json_mode {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&receipt_json(&receipt)).unwrap_or_default()
                );
            } else {
                print!("{}", render_receipt(&receipt));
            }
        }
        ScanClock::NoMatch => println!("Capture matched no enrolled person."),
        ScanClock::Empty => println!("Nothing to compare against: no one is enrolled."),
    }
    Ok(())
}

/// One-to-one verification and clocking.
pub fn cmd_verify(
    database: &Path,
    id: &str,
    capture_file: &Path,
    json_mode: bool,
) -> Result<(), PresenciaError> {
    let person = PersonId::new(id)?;
    let (kiosk, feed) = open_kiosk(database)?;
    feed.place(read_capture_file(capture_file)?);

    match kiosk.clock_by_verify(&person, Local::now().naive_local())? {
        VerifyClock::Clocked(receipt) => {
            if json_mode {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&receipt_json(&receipt)).unwrap_or_default()
                );
            } else {
                print!("{}", render_receipt(&receipt));
            }
        }
        VerifyClock::Rejected => println!("Capture does not match the claimed identity."),
    }
    Ok(())
}

// =============================================================================
// ROSTER COMMANDS
// =============================================================================

/// List enrolled identities.
pub fn cmd_roster(database: &Path, json_mode: bool) -> Result<(), PresenciaError> {
    let store = AttendanceStore::open(database)?;
    let roster = store.identities()?;

    if json_mode {
        let entries: Vec<serde_json::Value> = roster
            .iter()
            .map(|i| {
                serde_json::json!({
                    "person": i.person.as_str(),
                    "full_name": i.full_name(),
                    "cohort": i.cohort,
                    "late_threshold": i.late_threshold.to_string(),
                    "warning_threshold": i.warning_threshold,
                    "delay_count": i.delay_count,
                    "active": i.active,
                    "enrolled": i.is_enrolled(),
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).unwrap_or_default()
        );
        return Ok(());
    }

    if roster.is_empty() {
        println!("No identities enrolled.");
        return Ok(());
    }
    println!("Enrolled identities");
    println!("===================");
    for identity in roster {
        println!(
            "{} | {} | {} | threshold {} | delays {}{}",
            identity.person,
            identity.full_name(),
            identity.cohort,
            identity.late_threshold,
            identity.delay_count,
            if identity.is_enrolled() { "" } else { " | NO TEMPLATE" }
        );
    }
    Ok(())
}

/// Parsed `edit` arguments.
pub struct EditArgs {
    pub id: String,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub paternal_surname: Option<String>,
    pub maternal_surname: Option<String>,
    pub cohort: Option<String>,
    pub late_threshold: Option<String>,
    pub warning_threshold: Option<u32>,
}

/// Update profile fields of an existing identity.
pub fn cmd_edit(database: &Path, args: EditArgs) -> Result<(), PresenciaError> {
    let person = PersonId::new(&args.id)?;
    let (kiosk, _feed) = open_kiosk(database)?;

    let current = kiosk
        .roster()?
        .into_iter()
        .find(|i| i.person == person)
        .ok_or_else(|| PresenciaError::UnknownIdentity(person.as_str().to_string()))?;

    let late_threshold = match &args.late_threshold {
        Some(raw) => parse_time_of_day(raw)?,
        None => current.late_threshold,
    };
    let profile = EnrollmentProfile {
        person: person.clone(),
        first_name: args.first_name.unwrap_or(current.first_name),
        middle_name: args.middle_name.or(current.middle_name),
        paternal_surname: args.paternal_surname.unwrap_or(current.paternal_surname),
        maternal_surname: args.maternal_surname.unwrap_or(current.maternal_surname),
        cohort: args.cohort.unwrap_or(current.cohort),
        late_threshold,
        warning_threshold: args.warning_threshold.unwrap_or(current.warning_threshold),
    };

    kiosk.update_identity(profile)?;
    println!("Updated {}", person);
    Ok(())
}

// =============================================================================
// REPORTING
// =============================================================================

/// Monthly attendance report, sorted by date then clock-in time.
pub fn cmd_report(
    database: &Path,
    month: u32,
    year: i32,
    json_mode: bool,
) -> Result<(), PresenciaError> {
    let from = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
        PresenciaError::InvalidProfile(format!("{:02}/{} is not a valid month", month, year))
    })?;
    let to = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .and_then(|d| d.pred_opt())
    .ok_or_else(|| {
        PresenciaError::InvalidProfile(format!("{:02}/{} is not a valid month", month, year))
    })?;

    let store = AttendanceStore::open(database)?;
    let names: std::collections::BTreeMap<String, String> = store
        .identities()?
        .into_iter()
        .map(|i| (i.person.as_str().to_string(), i.full_name()))
        .collect();

    let mut rows = store.attendance_between(from, to)?;
    rows.sort_by(|a, b| (a.date, a.clock_in).cmp(&(b.date, b.clock_in)));
    let late_total = rows.iter().filter(|r| r.status.is_late()).count();

    if json_mode {
        let entries: Vec<serde_json::Value> = rows
            .iter()
            .map(|r| {
                serde_json::json!({
                    "person": r.person.as_str(),
                    "full_name": names.get(r.person.as_str()),
                    "date": r.date.to_string(),
                    "clock_in": r.clock_in.map(|t| t.to_string()),
                    "status": r.status.as_str(),
                })
            })
            .collect();
        let output = serde_json::json!({
            "month": format!("{:02}/{}", month, year),
            "rows": entries,
            "late_total": late_total,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    if rows.is_empty() {
        println!("No clockings for {:02}/{}.", month, year);
        return Ok(());
    }
    println!("Clockings {:02}/{}", month, year);
    println!("================");
    for row in &rows {
        let clock_in = row
            .clock_in
            .map(|t| t.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} {} | {} | {} | {}",
            row.date,
            clock_in,
            row.person,
            names.get(row.person.as_str()).map_or("?", String::as_str),
            row.status
        );
    }
    println!();
    println!("Total late: {}", late_total);
    Ok(())
}

// =============================================================================
// ADMIN COMMANDS
// =============================================================================

/// Zero every delay counter.
pub fn cmd_reset_delays(database: &Path, yes: bool) -> Result<(), PresenciaError> {
    if !yes {
        println!("This zeroes the delay counter of every identity. Re-run with --yes.");
        return Ok(());
    }
    let (kiosk, _feed) = open_kiosk(database)?;
    let touched = kiosk.reset_all_delays()?;
    println!("Delay counters reset for {} identities.", touched);
    Ok(())
}

/// Run the rollover sweep on demand.
pub fn cmd_rollover(database: &Path, year: Option<u64>) -> Result<(), PresenciaError> {
    let store = Arc::new(AttendanceStore::open(database)?);
    let engine = RolloverEngine::new(store, Arc::new(TracingSink))?;
    let year = year.unwrap_or(Local::now().year() as u64);

    match engine.run_if_due(year)? {
        SweepOutcome::Applied(report) => {
            println!(
                "Rollover {} applied: {} counters reset, {} promoted, {} graduated, {} skipped.",
                year,
                report.counters_reset,
                report.promoted,
                report.graduated,
                report.skipped.len()
            );
        }
        SweepOutcome::AlreadyApplied => {
            println!("Rollover already applied for {}.", year);
        }
    }
    Ok(())
}

/// Show store status.
pub fn cmd_status(database: &Path, json_mode: bool) -> Result<(), PresenciaError> {
    let store = AttendanceStore::open(database)?;
    let roster = store.identities()?;
    let enrolled = roster.iter().filter(|i| i.is_enrolled()).count();
    let marker = store.rollover_year()?;

    if json_mode {
        let output = serde_json::json!({
            "database": database.to_string_lossy(),
            "identities": roster.len(),
            "enrolled": enrolled,
            "rollover_year": marker,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Presencia Store Status");
    println!("======================");
    println!("Database:      {:?}", database);
    println!("Identities:    {}", roster.len());
    println!("With template: {}", enrolled);
    match marker {
        Some(year) => println!("Rollover:      applied for {}", year),
        None => println!("Rollover:      never run"),
    }
    Ok(())
}
