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

//! The relational store the generated rows are persisted into.
//!
//! The store holds four tables:
//!
//! ```text
//! patient(Patient_ID PK, Age, Birth_Type, Location, Lifestyle, Disease, Sex)
//! sample(Sample_ID PK, Patient_ID FK, Date, Body_Part, Sample_Type)
//! microorganism(Microorganism_ID PK, Species, Kingdom, FASTA, Seq_length)
//! sample_microorganism(Microorganism_ID FK, Sample_ID FK, qPCR,
//!                      PK(Microorganism_ID, Sample_ID))
//! ```
//!
//! Every write is an upsert: inserting a row whose primary key already exists
//! updates the non-key columns instead, so replaying a batch is idempotent.

pub mod memory;
pub mod mysql;

pub use memory::{MemoryStore, Tables};
pub use mysql::MySqlStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use datagen::entity::{BodyPart, SampleType};
use datagen::{CatalogEntry, PatientRow, SampleRow};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Values of the `Kingdom` column.
pub const KINGDOMS: [&str; 4] = ["Bacteria", "Fungi", "Virus", "Protozoa"];

/// Bounds of the `Age` column.
pub const AGE_RANGE: (u32, u32) = (0, 100);

/// Bounds of the `Seq_length` column.
pub const SEQ_LENGTH_RANGE: (u32, u32) = (1_000_000, 100_000_000);

/// The four destination tables.
#[derive(Eq, PartialEq, Ord, PartialOrd, Clone, Copy, Serialize, Deserialize, Debug, Hash)]
pub enum Table {
    /// Reference table filled from the catalog.
    Microorganism,
    /// One row per simulated patient.
    Patient,
    /// One row per sample.
    Sample,
    /// One row per detected microorganism.
    SampleMicroorganism,
}

impl Table {
    /// The SQL table name.
    pub fn name(&self) -> &'static str {
        match self {
            Table::Microorganism => "microorganism",
            Table::Patient => "patient",
            Table::Sample => "sample",
            Table::SampleMicroorganism => "sample_microorganism",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A row of the `microorganism` table.
#[derive(Eq, PartialEq, Clone, Serialize, Deserialize, Debug, Hash)]
pub struct MicroorganismRecord {
    /// `Microorganism_ID`, taken from the catalog.
    pub id:         String,
    /// `Species`.
    pub species:    String,
    /// `Kingdom`.
    pub kingdom:    String,
    /// `FASTA`, the genome file label.
    pub fasta:      String,
    /// `Seq_length`, the genome length.
    pub seq_length: u32,
}

impl MicroorganismRecord {
    /// Creates the row of a catalog entry with the given genome length.
    pub fn new(entry: &CatalogEntry, seq_length: u32) -> Self {
        MicroorganismRecord {
            id: entry.id.clone(),
            species: entry.species.clone(),
            kingdom: entry.kingdom.clone(),
            fasta: entry.fasta(),
            seq_length,
        }
    }
}

/// A row of the `sample` table.
#[derive(Eq, PartialEq, Clone, Serialize, Deserialize, Debug, Hash)]
pub struct SampleRecord {
    /// `Sample_ID`.
    pub id:          String,
    /// `Patient_ID`, referencing `patient`.
    pub patient_id:  String,
    /// `Date`.
    pub date:        NaiveDate,
    /// `Body_Part`.
    pub body_part:   BodyPart,
    /// `Sample_Type`.
    pub sample_type: SampleType,
}

impl From<&SampleRow> for SampleRecord {
    fn from(row: &SampleRow) -> Self {
        SampleRecord {
            id:          row.sample_id.clone(),
            patient_id:  row.patient_id.clone(),
            date:        row.date,
            body_part:   row.body_part,
            sample_type: row.sample_type,
        }
    }
}

/// A row of the `sample_microorganism` table.
#[derive(Eq, PartialEq, Clone, Serialize, Deserialize, Debug, Hash)]
pub struct AssociationRecord {
    /// `Microorganism_ID`, referencing `microorganism`.
    pub microorganism_id: String,
    /// `Sample_ID`, referencing `sample`.
    pub sample_id:        String,
    /// `qPCR`.
    pub qpcr:             u32,
}

impl From<&SampleRow> for AssociationRecord {
    fn from(row: &SampleRow) -> Self {
        AssociationRecord {
            microorganism_id: row.microorganism_id.clone(),
            sample_id:        row.sample_id.clone(),
            qpcr:             row.qpcr,
        }
    }
}

/// One "insert or update on conflicting primary key" statement.
#[derive(Eq, PartialEq, Clone, Serialize, Deserialize, Debug)]
pub enum Upsert {
    /// Upserts into `microorganism`.
    Microorganism(MicroorganismRecord),
    /// Upserts into `patient`.
    Patient(PatientRow),
    /// Upserts into `sample`.
    Sample(SampleRecord),
    /// Upserts into `sample_microorganism`.
    SampleMicroorganism(AssociationRecord),
}

impl Upsert {
    /// The table the statement writes to.
    pub fn table(&self) -> Table {
        match self {
            Upsert::Microorganism(_) => Table::Microorganism,
            Upsert::Patient(_) => Table::Patient,
            Upsert::Sample(_) => Table::Sample,
            Upsert::SampleMicroorganism(_) => Table::SampleMicroorganism,
        }
    }
}

/// A relational database that accepts upserts in transactions.
///
/// Implementations acquire their resources per call and release them before
/// returning, on both the success and the failure path.
#[async_trait]
pub trait Store: Send + Sync {
    /// Creates the database and the four tables if they do not exist yet.
    async fn ensure_schema(&self) -> Result<()>;

    /// Executes all upserts in one transaction. If any statement fails, the
    /// transaction is rolled back and nothing of `upserts` is kept.
    async fn apply(&self, upserts: &[Upsert]) -> Result<()>;

    /// Drops the database with all its tables.
    async fn drop_schema(&self) -> Result<()>;

    /// A short description for log messages.
    fn describe(&self) -> String;
}
