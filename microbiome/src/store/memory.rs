// Copyright (c) 2020-present, UMD Database Group.
//
// This program is free software: you can use, redistribute, and/or modify
// it under the terms of the GNU Affero General Public License, version 3
// or later ("AGPL"), as published by the Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or
// FITNESS FOR A PARTICULAR PURPOSE.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <http://www.gnu.org/licenses/>.

//! An in-process store with the same keys and constraints as the MySQL
//! schema. Used for dry runs and tests.

use super::{
    AssociationRecord, MicroorganismRecord, SampleRecord, Store, Table, Upsert, AGE_RANGE, KINGDOMS,
    SEQ_LENGTH_RANGE,
};
use crate::error::{MicrobiomeError, Result};
use async_trait::async_trait;
use datagen::ident::IDENTIFIER_LENGTH;
use datagen::PatientRow;
use log::debug;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// The contents of the four tables, keyed by primary key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Tables {
    /// `microorganism`, keyed by `Microorganism_ID`.
    pub microorganism:        BTreeMap<String, MicroorganismRecord>,
    /// `patient`, keyed by `Patient_ID`.
    pub patient:              BTreeMap<String, PatientRow>,
    /// `sample`, keyed by `Sample_ID`.
    pub sample:               BTreeMap<String, SampleRecord>,
    /// `sample_microorganism`, keyed by `(Microorganism_ID, Sample_ID)`.
    pub sample_microorganism: BTreeMap<(String, String), AssociationRecord>,
}

fn check_key(table: Table, key: &str) -> Result<()> {
    if key.len() > IDENTIFIER_LENGTH {
        return Err(MicrobiomeError::Constraint(format!(
            "Data too long for key '{}' of table '{}'",
            key, table
        )));
    }
    Ok(())
}

fn check_between(table: Table, column: &str, value: u32, (min, max): (u32, u32)) -> Result<()> {
    if value < min || value > max {
        return Err(MicrobiomeError::Constraint(format!(
            "Check constraint on {}.{} is violated: {} not in [{}, {}]",
            table, column, value, min, max
        )));
    }
    Ok(())
}

impl Tables {
    /// Number of rows in `table`.
    pub fn count(&self, table: Table) -> usize {
        match table {
            Table::Microorganism => self.microorganism.len(),
            Table::Patient => self.patient.len(),
            Table::Sample => self.sample.len(),
            Table::SampleMicroorganism => self.sample_microorganism.len(),
        }
    }

    /// Inserts a row, or updates the non-key columns of the row with the same
    /// primary key. The same columns are updated as by the MySQL statements.
    /// Returns how to restore the previous row.
    fn upsert(&mut self, upsert: &Upsert) -> Result<Undo> {
        let undo = match upsert {
            Upsert::Microorganism(record) => {
                check_key(Table::Microorganism, &record.id)?;
                if !KINGDOMS.contains(&record.kingdom.as_str()) {
                    return Err(MicrobiomeError::Constraint(format!(
                        "Data truncated for column 'Kingdom': '{}'",
                        record.kingdom
                    )));
                }
                check_between(
                    Table::Microorganism,
                    "Seq_length",
                    record.seq_length,
                    SEQ_LENGTH_RANGE,
                )?;
                let previous = self.microorganism.insert(record.id.clone(), record.clone());
                Undo::Microorganism(record.id.clone(), previous)
            }
            Upsert::Patient(row) => {
                check_key(Table::Patient, &row.patient_id)?;
                check_between(Table::Patient, "Age", row.age, AGE_RANGE)?;
                let previous = self.patient.insert(row.patient_id.clone(), row.clone());
                Undo::Patient(row.patient_id.clone(), previous)
            }
            Upsert::Sample(record) => {
                check_key(Table::Sample, &record.id)?;
                if !self.patient.contains_key(&record.patient_id) {
                    return Err(MicrobiomeError::Constraint(format!(
                        "Cannot add or update a child row: sample '{}' references \
                         unknown patient '{}'",
                        record.id, record.patient_id
                    )));
                }
                let previous = self.sample.get(&record.id).cloned();
                // The owning patient of an existing sample is never changed.
                self.sample
                    .entry(record.id.clone())
                    .and_modify(|existing| {
                        existing.date = record.date;
                        existing.body_part = record.body_part;
                        existing.sample_type = record.sample_type;
                    })
                    .or_insert_with(|| record.clone());
                Undo::Sample(record.id.clone(), previous)
            }
            Upsert::SampleMicroorganism(record) => {
                if !self.sample.contains_key(&record.sample_id) {
                    return Err(MicrobiomeError::Constraint(format!(
                        "Cannot add or update a child row: detection references \
                         unknown sample '{}'",
                        record.sample_id
                    )));
                }
                if !self.microorganism.contains_key(&record.microorganism_id) {
                    return Err(MicrobiomeError::Constraint(format!(
                        "Cannot add or update a child row: detection references \
                         unknown microorganism '{}'",
                        record.microorganism_id
                    )));
                }
                let key = (record.microorganism_id.clone(), record.sample_id.clone());
                let previous = self.sample_microorganism.insert(key.clone(), record.clone());
                Undo::SampleMicroorganism(key, previous)
            }
        };
        Ok(undo)
    }

    /// Reverts the upserts that produced `log`, newest first.
    fn rollback(&mut self, log: Vec<Undo>) {
        fn restore<K: Ord, V>(table: &mut BTreeMap<K, V>, key: K, previous: Option<V>) {
            match previous {
                Some(row) => table.insert(key, row),
                None => table.remove(&key),
            };
        }

        for undo in log.into_iter().rev() {
            match undo {
                Undo::Microorganism(key, previous) => {
                    restore(&mut self.microorganism, key, previous)
                }
                Undo::Patient(key, previous) => restore(&mut self.patient, key, previous),
                Undo::Sample(key, previous) => restore(&mut self.sample, key, previous),
                Undo::SampleMicroorganism(key, previous) => {
                    restore(&mut self.sample_microorganism, key, previous)
                }
            }
        }
    }
}

/// A row as it was before an upsert: `None` if the upsert inserted it.
enum Undo {
    Microorganism(String, Option<MicroorganismRecord>),
    Patient(String, Option<PatientRow>),
    Sample(String, Option<SampleRecord>),
    SampleMicroorganism((String, String), Option<AssociationRecord>),
}

/// A store that keeps its tables in memory.
///
/// Transactions are applied in place. The previous version of every touched
/// row is logged, and the log is replayed backwards if a statement fails.
#[derive(Debug)]
pub struct MemoryStore {
    database:     String,
    tables:       Mutex<Option<Tables>>,
    transactions: AtomicUsize,
}

impl MemoryStore {
    /// Creates a store for a database that does not exist yet.
    pub fn new(database: &str) -> Self {
        MemoryStore {
            database:     database.to_string(),
            tables:       Mutex::new(None),
            transactions: AtomicUsize::new(0),
        }
    }

    /// Returns a copy of the tables, or `None` if the schema does not exist.
    pub async fn snapshot(&self) -> Option<Tables> {
        self.tables.lock().await.clone()
    }

    /// Number of transactions started so far, committed or not.
    pub fn transactions(&self) -> usize {
        self.transactions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ensure_schema(&self) -> Result<()> {
        let mut tables = self.tables.lock().await;
        if tables.is_none() {
            debug!("Creating in-memory database {}.", self.database);
            *tables = Some(Tables::default());
        }
        Ok(())
    }

    async fn apply(&self, upserts: &[Upsert]) -> Result<()> {
        self.transactions.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.tables.lock().await;
        let tables = guard.as_mut().ok_or_else(|| {
            MicrobiomeError::Connection(format!("Unknown database '{}'", self.database))
        })?;

        let mut log = Vec::with_capacity(upserts.len());
        for upsert in upserts {
            match tables.upsert(upsert) {
                Ok(undo) => log.push(undo),
                Err(e) => {
                    tables.rollback(log);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    async fn drop_schema(&self) -> Result<()> {
        *self.tables.lock().await = None;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("memory://{}", self.database)
    }
}
