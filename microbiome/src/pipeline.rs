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

//! A generation run: the schema is ensured once, then every batch is
//! generated, assembled and persisted before the next one starts.
//!
//! ```text
//! Idle -> SchemaEnsured -> [Generating(i) -> Assembled(i) -> Persisted(i)]* -> Done
//!                                 |               |
//!                                 +---------------+-> Failed(i)
//! ```
//!
//! A failed run leaves the database at the last committed batch. Running again
//! with the same configuration regenerates and upserts the same rows.

use crate::configs;
use crate::error::{MicrobiomeError, Result};
use crate::store::Store;
use crate::writer::{BatchWriter, WriteSummary};
use datagen::{Batch, BatchGenerator, Catalog, GeneratorConfig};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Pipeline configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Number of patients generated and committed per batch.
    pub batch_size: usize,
    /// The generator configuration.
    pub generator:  GeneratorConfig,
}

impl PipelineConfig {
    /// Creates a configuration with the default batch size of the global
    /// settings.
    pub fn new(generator: GeneratorConfig) -> Result<Self> {
        Ok(PipelineConfig {
            batch_size: configs::default_batch_size()?,
            generator,
        })
    }

    /// Sets the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Returns the number of patients of every batch for a run of `total`
    /// patients. Only the last batch may be smaller than the batch size.
    pub fn batch_targets(&self, total: usize) -> Vec<usize> {
        if self.batch_size == 0 {
            return vec![];
        }
        (0..total)
            .step_by(self.batch_size)
            .map(|start| self.batch_size.min(total - start))
            .collect()
    }
}

/// The state of a run.
#[derive(Eq, PartialEq, Clone, Copy, Serialize, Deserialize, Debug)]
pub enum RunState {
    /// Nothing happened yet.
    Idle,
    /// The database and its tables exist.
    SchemaEnsured,
    /// The rows of batch `i` are being generated.
    Generating(usize),
    /// The rows of batch `i` are ready to be written.
    Assembled(usize),
    /// Batch `i` is committed.
    Persisted(usize),
    /// Every batch is committed.
    Done,
    /// Batch `i` could not be committed. Batches before it are.
    Failed(usize),
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::SchemaEnsured => write!(f, "schema ensured"),
            RunState::Generating(i) => write!(f, "generating batch {}", i),
            RunState::Assembled(i) => write!(f, "assembled batch {}", i),
            RunState::Persisted(i) => write!(f, "persisted batch {}", i),
            RunState::Done => write!(f, "done"),
            RunState::Failed(i) => write!(f, "failed at batch {}", i),
        }
    }
}

/// The outcome of a successful run.
#[derive(Eq, PartialEq, Clone, Serialize, Deserialize, Debug)]
pub struct RunSummary {
    /// Number of committed batches.
    pub batches:    usize,
    /// Seed of the first batch.
    pub base_seed:  u64,
    /// The store the batches were committed to.
    pub store:      String,
    /// Upserts issued over all batches.
    pub total:      WriteSummary,
    /// Upserts issued per batch.
    pub per_batch:  Vec<WriteSummary>,
    /// Wall-clock time of the run in milliseconds.
    pub elapsed_ms: u64,
}

/// Drives a generation run against a store.
pub struct Pipeline {
    config:    PipelineConfig,
    generator: BatchGenerator,
    writer:    BatchWriter,
    store:     Arc<dyn Store>,
    state:     RunState,
}

impl Pipeline {
    /// Creates a pipeline that draws microorganisms from `catalog` and writes
    /// to `store`.
    pub fn new(config: PipelineConfig, store: Arc<dyn Store>, catalog: Arc<Catalog>) -> Result<Self> {
        let generator = BatchGenerator::new(config.generator.clone(), catalog.clone())?;
        let writer = BatchWriter::new(store.clone(), catalog).with_seq_length_range(
            config.generator.seq_length_min,
            config.generator.seq_length_max,
        );
        Ok(Pipeline {
            config,
            generator,
            writer,
            store,
            state: RunState::Idle,
        })
    }

    /// The current state.
    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug!("Run state: {} -> {}.", self.state, next);
        self.state = next;
    }

    /// Generates batch `index` off the async runtime. Generation is CPU bound
    /// and runs on the rayon pool.
    async fn generate(&self, index: usize, target: usize) -> Result<Batch> {
        let generator = self.generator.clone();
        tokio::task::spawn_blocking(move || generator.generate(index, target))
            .await
            .map_err(|e| MicrobiomeError::Internal(format!("batch {} generation: {}", index, e)))
    }

    /// Generates and persists `total` patients in batches.
    pub async fn run(&mut self, total: usize) -> Result<RunSummary> {
        let now = Instant::now();
        let targets = self.config.batch_targets(total);
        let mut summary = RunSummary {
            batches:    0,
            base_seed:  self.config.generator.base_seed,
            store:      self.store.describe(),
            total:      WriteSummary::default(),
            per_batch:  vec![],
            elapsed_ms: 0,
        };

        if targets.is_empty() {
            info!("Nothing to generate: {} patients in batches of {}.", total, self.config.batch_size);
            self.transition(RunState::Done);
            return Ok(summary);
        }

        self.store.ensure_schema().await?;
        self.transition(RunState::SchemaEnsured);

        let num_batches = targets.len();
        for (index, target) in targets.into_iter().enumerate() {
            self.transition(RunState::Generating(index));
            let batch = match self.generate(index, target).await {
                Ok(batch) => batch,
                Err(e) => {
                    self.transition(RunState::Failed(index));
                    error!("Run stopped at batch {}: {}", index, e);
                    return Err(e);
                }
            };
            self.transition(RunState::Assembled(index));

            let written = match self.writer.persist(&batch).await {
                Ok(written) => written,
                Err(e) => {
                    self.transition(RunState::Failed(index));
                    error!(
                        "Run stopped at batch {}; {} batches are committed.",
                        index, summary.batches
                    );
                    return Err(e);
                }
            };
            self.transition(RunState::Persisted(index));

            info!(
                "[{}/{}] batch {} (seed {}): {} patients, {} samples, {} detections.",
                index + 1,
                num_batches,
                index,
                batch.seed,
                written.patients,
                written.samples,
                written.associations
            );
            summary.batches += 1;
            summary.total += written;
            summary.per_batch.push(written);
        }

        self.transition(RunState::Done);
        summary.elapsed_ms = now.elapsed().as_millis() as u64;
        info!(
            "Committed {} batches to {} in {} ms.",
            summary.batches, summary.store, summary.elapsed_ms
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Table, Tables, Upsert};
    use async_trait::async_trait;
    use datagen::Config;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn catalog() -> Arc<Catalog> {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../data/microorganisms.csv");
        Arc::new(Catalog::load(path).unwrap())
    }

    fn config(batch_size: usize) -> PipelineConfig {
        let generator = GeneratorConfig::new(&Config::new()).unwrap();
        PipelineConfig {
            batch_size,
            generator,
        }
    }

    /// A store that fails every transaction after the first `healthy` ones.
    struct FlakyStore {
        inner:   MemoryStore,
        healthy: usize,
        calls:   AtomicUsize,
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn ensure_schema(&self) -> Result<()> {
            self.inner.ensure_schema().await
        }

        async fn apply(&self, upserts: &[Upsert]) -> Result<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.healthy {
                return Err(MicrobiomeError::Connection("Lost connection".to_string()));
            }
            self.inner.apply(upserts).await
        }

        async fn drop_schema(&self) -> Result<()> {
            self.inner.drop_schema().await
        }

        fn describe(&self) -> String {
            self.inner.describe()
        }
    }

    /// Checks foreign keys and the derived disease of every patient.
    fn assert_consistent(tables: &Tables, catalog: &Catalog) {
        let mut microbiome: HashMap<&str, HashSet<&str>> = HashMap::new();
        for association in tables.sample_microorganism.values() {
            assert!(tables.microorganism.contains_key(&association.microorganism_id));
            let sample = &tables.sample[&association.sample_id];
            microbiome
                .entry(sample.patient_id.as_str())
                .or_default()
                .insert(association.microorganism_id.as_str());
        }

        for patient in tables.patient.values() {
            let diseases = microbiome[patient.patient_id.as_str()]
                .iter()
                .flat_map(|id| catalog.get(id).unwrap().diseases.iter())
                .collect::<HashSet<_>>();
            assert!(diseases.contains(&patient.disease));
        }
    }

    #[test]
    fn test_batch_targets() {
        assert_eq!(config(100).batch_targets(250), vec![100, 100, 50]);
        assert_eq!(config(100).batch_targets(200), vec![100, 100]);
        assert_eq!(config(100).batch_targets(1), vec![1]);
        assert!(config(100).batch_targets(0).is_empty());
        assert!(config(0).batch_targets(250).is_empty());
    }

    #[tokio::test]
    async fn test_run() -> Result<()> {
        let catalog = catalog();
        let store = Arc::new(MemoryStore::new("microbiome"));
        let mut pipeline = Pipeline::new(config(100), store.clone(), catalog.clone())?;
        assert_eq!(pipeline.state(), RunState::Idle);

        let summary = pipeline.run(250).await?;
        assert_eq!(pipeline.state(), RunState::Done);
        assert_eq!(summary.batches, 3);
        assert_eq!(summary.total.patients, 250);
        assert_eq!(summary.total.microorganisms, catalog.len());
        assert_eq!(summary.per_batch[2].patients, 50);
        assert_eq!(summary.per_batch[1].microorganisms, 0);

        let tables = store.snapshot().await.unwrap();
        assert_eq!(tables.count(Table::Microorganism), catalog.len());
        assert_eq!(tables.count(Table::Sample), summary.total.samples);
        assert_consistent(&tables, &catalog);
        assert_eq!(store.transactions(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() -> Result<()> {
        let store = Arc::new(MemoryStore::new("microbiome"));
        let mut pipeline = Pipeline::new(config(50), store.clone(), catalog())?;

        pipeline.run(120).await?;
        let once = store.snapshot().await;
        pipeline.run(120).await?;
        assert_eq!(store.snapshot().await, once);
        Ok(())
    }

    #[tokio::test]
    async fn test_deterministic() -> Result<()> {
        let store_1 = Arc::new(MemoryStore::new("microbiome"));
        let store_2 = Arc::new(MemoryStore::new("microbiome"));
        Pipeline::new(config(40), store_1.clone(), catalog())?
            .run(100)
            .await?;
        Pipeline::new(config(40), store_2.clone(), catalog())?
            .run(100)
            .await?;
        assert_eq!(store_1.snapshot().await, store_2.snapshot().await);
        Ok(())
    }

    #[tokio::test]
    async fn test_nothing_to_do() -> Result<()> {
        for (batch_size, total) in [(0, 250), (100, 0)] {
            let store = Arc::new(MemoryStore::new("microbiome"));
            let mut pipeline = Pipeline::new(config(batch_size), store.clone(), catalog())?;
            let summary = pipeline.run(total).await?;

            assert_eq!(summary.batches, 0);
            assert_eq!(summary.total, WriteSummary::default());
            assert_eq!(pipeline.state(), RunState::Done);
            assert_eq!(store.transactions(), 0);
            assert_eq!(store.snapshot().await, None);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_keeps_committed_batches() -> Result<()> {
        let store = Arc::new(FlakyStore {
            inner:   MemoryStore::new("microbiome"),
            healthy: 1,
            calls:   AtomicUsize::new(0),
        });
        let mut pipeline = Pipeline::new(config(100), store.clone(), catalog())?;

        let err = pipeline.run(300).await.unwrap_err();
        assert!(matches!(err, MicrobiomeError::Connection(_)));
        assert_eq!(pipeline.state(), RunState::Failed(1));

        // The run stops at the first failure.
        assert_eq!(store.calls.load(Ordering::SeqCst), 2);
        let tables = store.inner.snapshot().await.unwrap();
        assert_eq!(tables.count(Table::Patient), 100);
        Ok(())
    }

    #[tokio::test]
    async fn test_summary_serializes() -> Result<()> {
        let store = Arc::new(MemoryStore::new("microbiome"));
        let summary = Pipeline::new(config(10), store, catalog())?
            .run(10)
            .await?;
        let json = serde_json::to_value(&summary)?;
        assert_eq!(json["batches"], 1);
        assert_eq!(json["total"]["patients"], 10);
        assert_eq!(json["store"], "memory://microbiome");
        Ok(())
    }
}
