//! # redb-backed Attendance Store
//!
//! A disk-backed store for the roster, the attendance ledger, and the
//! rollover marker, using the redb embedded database:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! ## Uniqueness as correctness mechanism
//!
//! The attendance table is keyed by `(person, day)`. Insert-if-absent within
//! one write transaction is the sole mechanism that makes same-day clockings
//! idempotent under races: redb serializes writers, so of two concurrent
//! insert attempts exactly one creates the row and the other observes it.
//! No application-level lock is taken for ledger writes.
//!
//! All methods take `&self`; the store is shared across worker threads via
//! `Arc`.

use crate::types::{AttendanceRecord, Identity, PersonId, PresenciaError, Template};
use chrono::{Datelike, NaiveDate};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::path::Path;

/// Table for identities: person id -> serialized Identity bytes
const IDENTITIES: TableDefinition<&str, &[u8]> = TableDefinition::new("identities");

/// Table for attendance: (person id, days-from-CE) -> serialized record bytes.
/// The key layout is the per-day uniqueness constraint.
const ATTENDANCE: TableDefinition<(&str, i32), &[u8]> = TableDefinition::new("attendance");

/// Table for metadata: key string -> value u64 (rollover marker)
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

/// Metadata key holding the last year the rollover sweep completed.
const ROLLOVER_YEAR_KEY: &str = "rollover_year";

/// Result of an attendance insert attempt within one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockInsert {
    /// The row was created; `delays` reflects any increment applied.
    Created { delays: u32 },
    /// The row already existed; nothing was written.
    Existing { delays: u32 },
}

/// A disk-backed attendance store using redb.
pub struct AttendanceStore {
    db: Database,
}

impl std::fmt::Debug for AttendanceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttendanceStore").finish_non_exhaustive()
    }
}

fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, PresenciaError> {
    postcard::to_allocvec(value).map_err(|e| PresenciaError::Serialization(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T, PresenciaError> {
    postcard::from_bytes(bytes).map_err(|e| PresenciaError::Serialization(e.to_string()))
}

impl AttendanceStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PresenciaError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| PresenciaError::Storage(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;
            let _ = write_txn
                .open_table(IDENTITIES)
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;
            let _ = write_txn
                .open_table(ATTENDANCE)
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;
            let _ = write_txn
                .open_table(METADATA)
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        }

        Ok(Self { db })
    }

    // =========================================================================
    // IDENTITIES
    // =========================================================================

    /// Insert or replace the identity keyed by its person id.
    pub fn upsert_identity(&self, identity: &Identity) -> Result<(), PresenciaError> {
        let bytes = encode(identity)?;
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(IDENTITIES)
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;
            table
                .insert(identity.person.as_str(), bytes.as_slice())
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Load one identity.
    pub fn get_identity(&self, person: &PersonId) -> Result<Option<Identity>, PresenciaError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(IDENTITIES)
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;

        match table
            .get(person.as_str())
            .map_err(|e| PresenciaError::Storage(e.to_string()))?
        {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    /// All identities in person-id order.
    pub fn identities(&self) -> Result<Vec<Identity>, PresenciaError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(IDENTITIES)
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;

        let mut identities = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| PresenciaError::Storage(e.to_string()))?;
            identities.push(decode(value.value())?);
        }
        Ok(identities)
    }

    /// All (person, template) pairs with a usable enrollment, in id order.
    /// This is the candidate set for a one-to-many scan; inactive
    /// identities are excluded.
    pub fn enrolled_templates(&self) -> Result<Vec<(PersonId, Template)>, PresenciaError> {
        let mut templates = Vec::new();
        for identity in self.identities()? {
            if !identity.active {
                continue;
            }
            if let Some(bytes) = identity.template {
                if !bytes.is_empty() {
                    templates.push((identity.person, Template::new(bytes)));
                }
            }
        }
        Ok(templates)
    }

    /// Delete an identity together with all of its attendance rows, as one
    /// transaction. Idempotent: a missing identity removes nothing.
    /// Returns the number of attendance rows removed.
    pub fn remove_identity_cascade(&self, person: &PersonId) -> Result<usize, PresenciaError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        let removed;
        {
            let mut identities = write_txn
                .open_table(IDENTITIES)
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;
            identities
                .remove(person.as_str())
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;

            let mut attendance = write_txn
                .open_table(ATTENDANCE)
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;

            let days: Vec<i32> = {
                let mut collected = Vec::new();
                for entry in attendance
                    .range((person.as_str(), i32::MIN)..=(person.as_str(), i32::MAX))
                    .map_err(|e| PresenciaError::Storage(e.to_string()))?
                {
                    let (key, _) = entry.map_err(|e| PresenciaError::Storage(e.to_string()))?;
                    let (_, day) = key.value();
                    collected.push(day);
                }
                collected
            };

            for day in &days {
                attendance
                    .remove((person.as_str(), *day))
                    .map_err(|e| PresenciaError::Storage(e.to_string()))?;
            }
            removed = days.len();
        }
        write_txn
            .commit()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        Ok(removed)
    }

    // =========================================================================
    // ATTENDANCE
    // =========================================================================

    /// Insert today's attendance row if absent, and iff the row was created
    /// with a late status, increment the identity's delay counter — all in
    /// one write transaction. The counter can neither double-increment for
    /// one day nor miss an increment after a successful late insert.
    ///
    /// Returns `UnknownIdentity` without writing anything when the person is
    /// not in the roster.
    pub fn insert_clocking(
        &self,
        record: &AttendanceRecord,
    ) -> Result<ClockInsert, PresenciaError> {
        let day = record.date.num_days_from_ce();
        let key = (record.person.as_str(), day);

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        let outcome;
        {
            let mut identities = write_txn
                .open_table(IDENTITIES)
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;
            let mut attendance = write_txn
                .open_table(ATTENDANCE)
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;

            // Identity first: an unknown person writes no row at all.
            let identity_bytes = identities
                .get(record.person.as_str())
                .map_err(|e| PresenciaError::Storage(e.to_string()))?
                .map(|data| data.value().to_vec());
            let Some(identity_bytes) = identity_bytes else {
                return Err(PresenciaError::UnknownIdentity(
                    record.person.as_str().to_string(),
                ));
            };
            let mut identity: Identity = decode(&identity_bytes)?;

            let exists = attendance
                .get(key)
                .map_err(|e| PresenciaError::Storage(e.to_string()))?
                .is_some();

            if exists {
                outcome = ClockInsert::Existing {
                    delays: identity.delay_count,
                };
            } else {
                let bytes = encode(record)?;
                attendance
                    .insert(key, bytes.as_slice())
                    .map_err(|e| PresenciaError::Storage(e.to_string()))?;

                if record.status.is_late() {
                    identity.delay_count = identity.delay_count.saturating_add(1);
                    let identity_bytes = encode(&identity)?;
                    identities
                        .insert(record.person.as_str(), identity_bytes.as_slice())
                        .map_err(|e| PresenciaError::Storage(e.to_string()))?;
                }
                outcome = ClockInsert::Created {
                    delays: identity.delay_count,
                };
            }
        }
        write_txn
            .commit()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        Ok(outcome)
    }

    /// Attendance rows for one person, in date order.
    pub fn attendance_for(
        &self,
        person: &PersonId,
    ) -> Result<Vec<AttendanceRecord>, PresenciaError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(ATTENDANCE)
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;

        let mut records = Vec::new();
        for entry in table
            .range((person.as_str(), i32::MIN)..=(person.as_str(), i32::MAX))
            .map_err(|e| PresenciaError::Storage(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| PresenciaError::Storage(e.to_string()))?;
            records.push(decode(value.value())?);
        }
        Ok(records)
    }

    /// All attendance rows with `from <= date <= to`, for the reporting
    /// collaborators. Ordered by person id, then date.
    pub fn attendance_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, PresenciaError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(ATTENDANCE)
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;

        let mut records = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| PresenciaError::Storage(e.to_string()))?;
            let record: AttendanceRecord = decode(value.value())?;
            if record.date >= from && record.date <= to {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Re-enrollment amnesty: zero the person's delay counter and reclassify
    /// every historical `Late` row to `Present`, in one transaction.
    /// Returns the number of rows reclassified.
    pub fn apply_amnesty(&self, person: &PersonId) -> Result<u32, PresenciaError> {
        use crate::types::ClockStatus;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        let reclassified;
        {
            let mut identities = write_txn
                .open_table(IDENTITIES)
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;

            let identity_bytes = identities
                .get(person.as_str())
                .map_err(|e| PresenciaError::Storage(e.to_string()))?
                .map(|data| data.value().to_vec());
            let Some(identity_bytes) = identity_bytes else {
                return Err(PresenciaError::UnknownIdentity(person.as_str().to_string()));
            };
            let mut identity: Identity = decode(&identity_bytes)?;
            identity.delay_count = 0;
            let identity_bytes = encode(&identity)?;
            identities
                .insert(person.as_str(), identity_bytes.as_slice())
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;

            let mut attendance = write_txn
                .open_table(ATTENDANCE)
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;

            let late_rows: Vec<(i32, AttendanceRecord)> = {
                let mut collected = Vec::new();
                for entry in attendance
                    .range((person.as_str(), i32::MIN)..=(person.as_str(), i32::MAX))
                    .map_err(|e| PresenciaError::Storage(e.to_string()))?
                {
                    let (key, value) =
                        entry.map_err(|e| PresenciaError::Storage(e.to_string()))?;
                    let (_, day) = key.value();
                    let record: AttendanceRecord = decode(value.value())?;
                    if record.status.is_late() {
                        collected.push((day, record));
                    }
                }
                collected
            };

            for (day, mut record) in late_rows.iter().cloned() {
                record.status = ClockStatus::Present;
                let bytes = encode(&record)?;
                attendance
                    .insert((person.as_str(), day), bytes.as_slice())
                    .map_err(|e| PresenciaError::Storage(e.to_string()))?;
            }
            reclassified = late_rows.len() as u32;
        }
        write_txn
            .commit()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        Ok(reclassified)
    }

    /// Zero every identity's delay counter in one transaction.
    /// Returns the number of identities touched.
    pub fn reset_all_delays(&self) -> Result<usize, PresenciaError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        let touched;
        {
            let mut identities = write_txn
                .open_table(IDENTITIES)
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;

            let all: Vec<Identity> = {
                let mut collected = Vec::new();
                for entry in identities
                    .iter()
                    .map_err(|e| PresenciaError::Storage(e.to_string()))?
                {
                    let (_, value) =
                        entry.map_err(|e| PresenciaError::Storage(e.to_string()))?;
                    collected.push(decode(value.value())?);
                }
                collected
            };

            touched = all.len();
            for mut identity in all {
                identity.delay_count = 0;
                let bytes = encode(&identity)?;
                identities
                    .insert(identity.person.as_str(), bytes.as_slice())
                    .map_err(|e| PresenciaError::Storage(e.to_string()))?;
            }
        }
        write_txn
            .commit()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        Ok(touched)
    }

    // =========================================================================
    // ROLLOVER MARKER
    // =========================================================================

    /// Last year the rollover sweep completed. `None` means never run.
    pub fn rollover_year(&self) -> Result<Option<u64>, PresenciaError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        let table = read_txn
            .open_table(METADATA)
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        let year = table
            .get(ROLLOVER_YEAR_KEY)
            .map_err(|e| PresenciaError::Storage(e.to_string()))?
            .map(|v| v.value());
        Ok(year)
    }

    /// Persist the marker. Written only after a fully successful sweep.
    pub fn set_rollover_year(&self, year: u64) -> Result<(), PresenciaError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(METADATA)
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;
            table
                .insert(ROLLOVER_YEAR_KEY, year)
                .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| PresenciaError::Storage(e.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
