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

//! The persistence writer turns a generated batch into upserts and commits
//! them to a store in a single transaction.

use crate::error::Result;
use crate::store::{
    AssociationRecord, MicroorganismRecord, SampleRecord, Store, Upsert, SEQ_LENGTH_RANGE,
};
use datagen::{Batch, Catalog};
use log::error;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::sync::Arc;

/// Number of upserts issued per table.
#[derive(Eq, PartialEq, Clone, Copy, Serialize, Deserialize, Debug, Default)]
pub struct WriteSummary {
    /// Upserts into `microorganism`.
    pub microorganisms: usize,
    /// Upserts into `patient`.
    pub patients:       usize,
    /// Upserts into `sample`.
    pub samples:        usize,
    /// Upserts into `sample_microorganism`.
    pub associations:   usize,
}

impl WriteSummary {
    /// Counts the statements of a transaction.
    pub fn of(upserts: &[Upsert]) -> Self {
        upserts
            .iter()
            .fold(WriteSummary::default(), |mut summary, upsert| {
                match upsert {
                    Upsert::Microorganism(_) => summary.microorganisms += 1,
                    Upsert::Patient(_) => summary.patients += 1,
                    Upsert::Sample(_) => summary.samples += 1,
                    Upsert::SampleMicroorganism(_) => summary.associations += 1,
                }
                summary
            })
    }

    /// Total number of statements.
    pub fn total(&self) -> usize {
        self.microorganisms + self.patients + self.samples + self.associations
    }
}

impl AddAssign for WriteSummary {
    fn add_assign(&mut self, other: Self) {
        self.microorganisms += other.microorganisms;
        self.patients += other.patients;
        self.samples += other.samples;
        self.associations += other.associations;
    }
}

/// Persists batches into a store.
#[derive(Clone)]
pub struct BatchWriter {
    store:            Arc<dyn Store>,
    catalog:          Arc<Catalog>,
    seq_length_range: (u32, u32),
}

impl BatchWriter {
    /// Creates a writer that fills the microorganism table from `catalog`.
    pub fn new(store: Arc<dyn Store>, catalog: Arc<Catalog>) -> Self {
        BatchWriter {
            store,
            catalog,
            seq_length_range: SEQ_LENGTH_RANGE,
        }
    }

    /// Sets the bounds of the genome lengths assigned to microorganisms.
    pub fn with_seq_length_range(mut self, min: u32, max: u32) -> Self {
        self.seq_length_range = (min, max);
        self
    }

    /// Returns the upserts of `batch` in an order that satisfies every
    /// foreign key: microorganisms if `include_catalog` is set, then
    /// patients, then every sample followed by its detections.
    ///
    /// Genome lengths are drawn from a random source seeded with the batch
    /// seed, so planning the same batch twice gives the same statements.
    pub fn plan(&self, batch: &Batch, include_catalog: bool) -> Vec<Upsert> {
        let mut upserts = Vec::with_capacity(
            batch.patients.len() + batch.samples.len() + batch.num_samples(),
        );

        if include_catalog {
            let (min, max) = self.seq_length_range;
            let mut rng = StdRng::seed_from_u64(batch.seed);
            upserts.extend(self.catalog.entries().iter().map(|entry| {
                Upsert::Microorganism(MicroorganismRecord::new(entry, rng.gen_range(min..=max)))
            }));
        }

        upserts.extend(batch.patients.iter().cloned().map(Upsert::Patient));

        for row in &batch.samples {
            // Only the first detection of a sample carries the sample itself.
            if row.is_first() {
                upserts.push(Upsert::Sample(SampleRecord::from(row)));
            }
            upserts.push(Upsert::SampleMicroorganism(AssociationRecord::from(row)));
        }
        upserts
    }

    /// Writes `batch` in one transaction. The catalog is written along with
    /// the first batch of a run. An empty batch does not reach the store.
    pub async fn persist(&self, batch: &Batch) -> Result<WriteSummary> {
        if batch.is_empty() {
            return Ok(WriteSummary::default());
        }

        let upserts = self.plan(batch, batch.index == 0);
        self.store.apply(&upserts).await.map_err(|e| {
            error!(
                "Batch {} (seed {}) was rolled back on {}: {}",
                batch.index,
                batch.seed,
                self.store.describe(),
                e
            );
            e
        })?;
        Ok(WriteSummary::of(&upserts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MicrobiomeError;
    use crate::store::{MemoryStore, Table};
    use chrono::NaiveDate;
    use datagen::entity::{
        BirthType, BodyPart, Detection, Lifestyle, Location, Patient, Sample, SampleType, Sex,
    };
    use datagen::{CatalogEntry, PatientRow, SampleRow};

    fn catalog() -> Arc<Catalog> {
        Arc::new(Catalog::new(vec![
            CatalogEntry::new("MIC-00001-BAC", "Bacteria", "Escherichia coli", "Gastroenteritis"),
            CatalogEntry::new("MIC-00002-FUN", "Fungi", "Candida albicans", "Candidiasis"),
            CatalogEntry::new("MIC-00003-VIR", "Virus", "Influenza A", "Flu, Pneumonia"),
        ]))
    }

    fn detection(microorganism: &str, qpcr: u32) -> Detection {
        Detection {
            microorganism: microorganism.to_string(),
            disease: None,
            qpcr,
        }
    }

    /// One patient with one sample in which `microorganisms` were detected.
    fn batch(index: usize, microorganisms: &[&str]) -> Batch {
        let patient = Patient {
            id:         "PAC-00001-AAA".to_string(),
            age:        42,
            birth_type: BirthType::Cesarean,
            location:   Location::Europe,
            lifestyle:  Lifestyle::Sedentary,
            sex:        Sex::M,
        };
        let sample = Sample {
            id:          "SMP-00001-AAA".to_string(),
            date:        NaiveDate::from_ymd_opt(2019, 7, 4).unwrap(),
            body_part:   BodyPart::Head,
            sample_type: SampleType::Tissue,
        };

        let mut batch = Batch::new(index, 42 + index as u64);
        batch.patients.push(PatientRow::new(patient, "Flu".to_string()));
        batch.samples = microorganisms
            .iter()
            .enumerate()
            .map(|(i, id)| {
                SampleRow::new(&sample, "PAC-00001-AAA", detection(id, 100 + i as u32), i)
            })
            .collect();
        batch
    }

    #[tokio::test]
    async fn test_one_sample_row_per_sample() -> Result<()> {
        let store = Arc::new(MemoryStore::new("microbiome"));
        store.ensure_schema().await?;
        let writer = BatchWriter::new(store.clone(), catalog());

        let batch = batch(0, &["MIC-00001-BAC", "MIC-00002-FUN", "MIC-00003-VIR"]);
        let summary = writer.persist(&batch).await?;
        assert_eq!(summary, WriteSummary {
            microorganisms: 3,
            patients:       1,
            samples:        1,
            associations:   3,
        });

        let tables = store.snapshot().await.unwrap();
        assert_eq!(tables.count(Table::Sample), 1);
        assert_eq!(tables.count(Table::SampleMicroorganism), 3);
        assert_eq!(tables.count(Table::Patient), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_persist_is_idempotent() -> Result<()> {
        let store = Arc::new(MemoryStore::new("microbiome"));
        store.ensure_schema().await?;
        let writer = BatchWriter::new(store.clone(), catalog());
        let batch = batch(0, &["MIC-00001-BAC", "MIC-00003-VIR"]);

        writer.persist(&batch).await?;
        let once = store.snapshot().await;
        writer.persist(&batch).await?;
        assert_eq!(store.snapshot().await, once);
        assert_eq!(store.transactions(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_batch_is_not_written() -> Result<()> {
        let store = Arc::new(MemoryStore::new("microbiome"));
        let writer = BatchWriter::new(store.clone(), catalog());

        let summary = writer.persist(&Batch::new(0, 42)).await?;
        assert_eq!(summary, WriteSummary::default());
        assert_eq!(store.transactions(), 0);
        Ok(())
    }

    #[test]
    fn test_catalog_only_with_first_batch() {
        let store = Arc::new(MemoryStore::new("microbiome"));
        let writer = BatchWriter::new(store, catalog());

        let plan = writer.plan(&batch(0, &["MIC-00001-BAC"]), true);
        let microorganisms = plan
            .iter()
            .filter_map(|u| match u {
                Upsert::Microorganism(record) => Some(record.clone()),
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(microorganisms.len(), 3);
        assert!(microorganisms
            .iter()
            .all(|m| (1_000_000..=100_000_000).contains(&m.seq_length)));
        assert_eq!(microorganisms[2].fasta, "seq_MIC-00003-VIR.fasta");

        // The catalog precedes every row that references it.
        assert!(plan[..3].iter().all(|u| u.table() == Table::Microorganism));
        assert_eq!(plan[3].table(), Table::Patient);
        assert_eq!(plan[4].table(), Table::Sample);
        assert_eq!(plan[5].table(), Table::SampleMicroorganism);

        // Planning is deterministic.
        assert_eq!(plan, writer.plan(&batch(0, &["MIC-00001-BAC"]), true));

        let plan = writer.plan(&batch(1, &["MIC-00001-BAC"]), false);
        assert!(plan.iter().all(|u| u.table() != Table::Microorganism));
        assert_eq!(WriteSummary::of(&plan).total(), 3);
    }

    #[tokio::test]
    async fn test_failed_batch_leaves_no_rows() -> Result<()> {
        let store = Arc::new(MemoryStore::new("microbiome"));
        store.ensure_schema().await?;
        let writer = BatchWriter::new(store.clone(), catalog());

        // Batch 1 does not carry the catalog, so the detection has no parent.
        let err = writer
            .persist(&batch(1, &["MIC-00001-BAC"]))
            .await
            .unwrap_err();
        assert!(matches!(err, MicrobiomeError::Constraint(_)));
        assert_eq!(store.snapshot().await.unwrap().count(Table::Patient), 0);
        Ok(())
    }

    #[test]
    fn test_summary_add() {
        let mut total = WriteSummary::default();
        total += WriteSummary {
            microorganisms: 30,
            patients:       100,
            samples:        150,
            associations:   800,
        };
        total += WriteSummary {
            microorganisms: 0,
            patients:       20,
            samples:        31,
            associations:   170,
        };
        assert_eq!(total.patients, 120);
        assert_eq!(total.associations, 970);
        assert_eq!(total.total(), 1301);
    }
}
