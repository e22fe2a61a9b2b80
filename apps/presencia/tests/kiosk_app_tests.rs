//! # Application-Level Tests
//!
//! Drive the kiosk the way the binary does: simulated device, capture feed,
//! config file, CLI command implementations.

#![allow(clippy::unwrap_used, clippy::panic)]

use chrono::{NaiveDate, NaiveTime};
use presencia::cli::{EnrollArgs, cmd_enroll, cmd_report, cmd_roster, cmd_status};
use presencia::config::KioskConfig;
use presencia::device_sim::SimulatedDevice;
use presencia::sink::TracingSink;
use presencia_core::{
    AttendanceStore, EnrollmentProfile, Kiosk, PersonId, PresenciaError, ScanClock, VerifyClock,
};
use std::sync::Arc;

fn profile(id: &str) -> EnrollmentProfile {
    EnrollmentProfile {
        person: PersonId::new(id).expect("id"),
        first_name: "Ana".to_string(),
        middle_name: None,
        paternal_surname: "Rojas".to_string(),
        maternal_surname: "Soto".to_string(),
        cohort: "1ro Medio".to_string(),
        late_threshold: NaiveTime::from_hms_opt(8, 15, 0).expect("time"),
        warning_threshold: 10,
    }
}

fn at(h: u32, m: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 2)
        .expect("date")
        .and_hms_opt(h, m, 0)
        .expect("time")
}

#[test]
fn enroll_then_verify_through_the_feed() {
    let temp = tempfile::tempdir().expect("temp dir");
    let store = Arc::new(AttendanceStore::open(temp.path().join("app.redb")).expect("open db"));
    let (device, feed) = SimulatedDevice::new();
    let kiosk = Kiosk::new(device, store, Arc::new(TracingSink));

    feed.place(vec![1, 2, 3]);
    kiosk.enroll(profile("12345678-5")).expect("enroll");

    let person = PersonId::new("12345678-5").expect("id");
    feed.place(vec![1, 2, 3]);
    let outcome = kiosk.clock_by_verify(&person, at(8, 0)).expect("verify");
    assert!(matches!(outcome, VerifyClock::Clocked(_)));

    // Same finger later that day: duplicate, not an error.
    feed.place(vec![1, 2, 3]);
    let outcome = kiosk.clock_by_scan(at(10, 30)).expect("scan");
    let ScanClock::Clocked(receipt) = outcome else {
        panic!("expected a receipt");
    };
    assert!(receipt.duplicate);
}

#[test]
fn missing_finger_surfaces_as_capture_failure() {
    let temp = tempfile::tempdir().expect("temp dir");
    let store = Arc::new(AttendanceStore::open(temp.path().join("app.redb")).expect("open db"));
    let (device, feed) = SimulatedDevice::new();
    let kiosk = Kiosk::new(device, store, Arc::new(TracingSink));

    feed.place(vec![1]);
    kiosk.enroll(profile("12345678-5")).expect("enroll");

    // No finger placed for the scan.
    let result = kiosk.clock_by_scan(at(8, 0));
    assert!(matches!(result, Err(PresenciaError::CaptureFailed(_))));
}

#[test]
fn cli_commands_run_against_a_fresh_store() {
    let temp = tempfile::tempdir().expect("temp dir");
    let database = temp.path().join("cli.redb");
    let template_file = temp.path().join("finger.bin");
    std::fs::write(&template_file, [9u8, 9, 9]).expect("write template");

    let config = KioskConfig::default();
    cmd_enroll(
        &database,
        &config,
        EnrollArgs {
            id: "12.345.678-5".to_string(),
            first_name: "Ana".to_string(),
            middle_name: None,
            paternal_surname: "Rojas".to_string(),
            maternal_surname: "Soto".to_string(),
            cohort: None,
            late_threshold: Some("08:15".to_string()),
            warning_threshold: None,
            template_file,
        },
        false,
    )
    .expect("enroll command");

    cmd_roster(&database, true).expect("roster command");
    cmd_status(&database, true).expect("status command");
    cmd_report(&database, 3, 2026, true).expect("report command");

    // The enrollment landed with the configured defaults.
    let store = AttendanceStore::open(&database).expect("open db");
    let roster = store.identities().expect("roster");
    assert_eq!(roster.len(), 1);
    assert_eq!(roster[0].person.as_str(), "123456785");
    assert_eq!(roster[0].cohort, "1ro Medio");
    assert_eq!(roster[0].warning_threshold, 10);
    assert!(roster[0].is_enrolled());
}
