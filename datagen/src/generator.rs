// Copyright 2021 UMD Database Group. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The batch assembler.
//!
//! A batch owns a `StdRng` seeded with the batch seed. Every patient slot gets
//! its own seed drawn from it, and slots are expanded in parallel, each with a
//! private `SmallRng`. Slot results are merged in slot order, so the output
//! only depends on the batch seed and never on thread scheduling.

use crate::batch::{Batch, PatientRow, SampleRow};
use crate::catalog::Catalog;
use crate::config::{GeneratorConfig, PATIENT_PREFIX, SAMPLE_PREFIX};
use crate::entity::{Detection, Patient, Sample};
use crate::error::{DataGenError, Result};
use crate::ident::IdentifierRng;
use log::debug;
use rand::rngs::{SmallRng, StdRng};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;

/// A simulated patient with the rows of all its samples.
struct PatientGroup {
    patient: Patient,
    disease: String,
    rows:    Vec<SampleRow>,
}

/// The patient, sample and detection generator.
#[derive(Clone, Debug)]
pub struct BatchGenerator {
    /// The generator configuration.
    pub config: GeneratorConfig,
    catalog:    Arc<Catalog>,
}

impl BatchGenerator {
    /// Creates a new `BatchGenerator` drawing microorganisms from `catalog`.
    pub fn new(config: GeneratorConfig, catalog: Arc<Catalog>) -> Result<Self> {
        if catalog.is_empty() {
            return Err(DataGenError::EmptyCatalog);
        }
        Ok(BatchGenerator { config, catalog })
    }

    /// The reference catalog.
    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    /// Generates the batch with the given index, holding `target_patients`
    /// patients.
    pub fn generate(&self, batch_index: usize, target_patients: usize) -> Batch {
        let seed = self.config.batch_seed(batch_index);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut batch = Batch::new(batch_index, seed);
        let mut patient_ids = HashSet::new();
        let mut sample_ids = HashSet::new();

        let mut rounds = 0;
        while batch.patients.len() < target_patients {
            let slots = (0..target_patients - batch.patients.len())
                .map(|_| rng.gen::<u64>())
                .collect::<Vec<_>>();
            let groups = slots
                .into_par_iter()
                .filter_map(|slot| self.generate_patient(&mut SmallRng::seed_from_u64(slot)))
                .collect::<Vec<_>>();
            for group in groups {
                Self::merge(&mut batch, group, &mut rng, &mut patient_ids, &mut sample_ids);
            }
            rounds += 1;
        }

        debug!(
            "Batch {} (seed {}): {} patients, {} samples, {} detections in {} rounds.",
            batch_index,
            seed,
            batch.patients.len(),
            batch.num_samples(),
            batch.samples.len(),
            rounds
        );
        batch
    }

    /// Generates one patient with its samples, or `None` if the patient drew
    /// no samples and therefore has no disease to derive.
    fn generate_patient<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<PatientGroup> {
        let patient = Patient::random(rng, &self.config);
        let num_samples = rng.gen_range(0..=self.config.samples_per_patient);
        if num_samples == 0 {
            return None;
        }

        let mut rows = vec![];
        let mut candidates: Vec<String> = vec![];
        for _ in 0..num_samples {
            let (sample_rows, diseases) = self.generate_sample_rows(rng, &patient.id);
            rows.extend(sample_rows);
            for disease in diseases {
                if !candidates.contains(&disease) {
                    candidates.push(disease);
                }
            }
        }

        // The disease follows from the microbiome assigned to the patient.
        let disease = candidates.choose(rng).cloned().unwrap_or_default();
        Some(PatientGroup {
            patient,
            disease,
            rows,
        })
    }

    /// Generates one sample with between one and `max_detections` detected
    /// microorganisms. Returns one row per detection and the diseases implied
    /// by them.
    fn generate_sample_rows<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        patient_id: &str,
    ) -> (Vec<SampleRow>, Vec<String>) {
        let sample = Sample::random(rng, &self.config);
        let num_detections = rng.gen_range(1..=self.config.max_detections);
        let detections = (0..num_detections)
            .filter_map(|_| Detection::random(rng, &self.catalog, &self.config))
            .collect::<Vec<_>>();

        let diseases = detections
            .iter()
            .filter_map(|d| d.disease.clone())
            .collect::<Vec<_>>();
        let rows = detections
            .into_iter()
            .enumerate()
            .map(|(position, detection)| SampleRow::new(&sample, patient_id, detection, position))
            .collect();
        (rows, diseases)
    }

    /// Appends a patient group to the batch. Identifiers that collide with one
    /// already in the batch are re-drawn from the batch random source.
    fn merge(
        batch: &mut Batch,
        group: PatientGroup,
        rng: &mut StdRng,
        patient_ids: &mut HashSet<String>,
        sample_ids: &mut HashSet<String>,
    ) {
        let PatientGroup {
            mut patient,
            disease,
            mut rows,
        } = group;

        while !patient_ids.insert(patient.id.clone()) {
            patient.id = rng.gen_identifier(PATIENT_PREFIX);
        }

        // Rows of one sample are contiguous and start at position zero.
        let mut sample_id = String::new();
        for row in rows.iter_mut() {
            if row.is_first() {
                sample_id = row.sample_id.clone();
                while !sample_ids.insert(sample_id.clone()) {
                    sample_id = rng.gen_identifier(SAMPLE_PREFIX);
                }
            }
            row.sample_id = sample_id.clone();
            row.patient_id = patient.id.clone();
        }

        batch.patients.push(PatientRow::new(patient, disease));
        batch.samples.extend(rows);
    }
}
