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

//! The two tabular outputs of a batch: a patient table and a flat
//! sample/detection table.

use crate::entity::{
    BirthType, BodyPart, Detection, Lifestyle, Location, Patient, Sample, SampleType, Sex,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One row of the patient table.
#[derive(Eq, PartialEq, Clone, Serialize, Deserialize, Debug, Hash)]
pub struct PatientRow {
    /// `PAC-DDDDD-LLL`.
    pub patient_id: String,
    /// Age in years.
    pub age:        u32,
    /// How the patient was born.
    pub birth_type: BirthType,
    /// Where the patient lives.
    pub location:   Location,
    /// The patient's activity level.
    pub lifestyle:  Lifestyle,
    /// A disease associated with a microorganism found in one of the
    /// patient's samples. Empty only if the catalog lists no disease for any
    /// of those microorganisms.
    pub disease:    String,
    /// The patient's sex.
    pub sex:        Sex,
}

impl PatientRow {
    /// Creates a patient row from an assembled patient and its disease.
    pub fn new(patient: Patient, disease: String) -> Self {
        PatientRow {
            patient_id: patient.id,
            age: patient.age,
            birth_type: patient.birth_type,
            location: patient.location,
            lifestyle: patient.lifestyle,
            disease,
            sex: patient.sex,
        }
    }
}

/// One row of the flat sample table: one detected microorganism, carrying the
/// metadata of the sample it was found in.
#[derive(Eq, PartialEq, Clone, Serialize, Deserialize, Debug, Hash)]
pub struct SampleRow {
    /// `SMP-DDDDD-LLL`.
    pub sample_id:        String,
    /// The owning patient.
    pub patient_id:       String,
    /// Collection date.
    pub date:             NaiveDate,
    /// Where the sample was collected.
    pub body_part:        BodyPart,
    /// What the sample consists of.
    pub sample_type:      SampleType,
    /// The catalog identifier of the detected microorganism.
    pub microorganism_id: String,
    /// The qPCR copy count.
    pub qpcr:             u32,
    /// Index of this detection among the detections of its sample.
    pub position:         usize,
}

impl SampleRow {
    /// Creates the row for the `position`-th detection of `sample`.
    pub fn new(sample: &Sample, patient_id: &str, detection: Detection, position: usize) -> Self {
        SampleRow {
            sample_id: sample.id.clone(),
            patient_id: patient_id.to_string(),
            date: sample.date,
            body_part: sample.body_part,
            sample_type: sample.sample_type,
            microorganism_id: detection.microorganism,
            qpcr: detection.qpcr,
            position,
        }
    }

    /// Returns true for the first detection of a sample. Only that row carries
    /// the sample itself to the database; the others add associations.
    pub fn is_first(&self) -> bool {
        self.position == 0
    }
}

/// The rows produced by one seeded batch.
#[derive(Eq, PartialEq, Clone, Serialize, Deserialize, Debug, Default)]
pub struct Batch {
    /// The batch number within the run.
    pub index:    usize,
    /// The seed the batch was generated with.
    pub seed:     u64,
    /// One row per patient.
    pub patients: Vec<PatientRow>,
    /// One row per detected microorganism.
    pub samples:  Vec<SampleRow>,
}

impl Batch {
    /// Creates an empty batch.
    pub fn new(index: usize, seed: u64) -> Self {
        Batch {
            index,
            seed,
            patients: vec![],
            samples: vec![],
        }
    }

    /// Returns true if the batch has no rows at all.
    pub fn is_empty(&self) -> bool {
        self.patients.is_empty() && self.samples.is_empty()
    }

    /// The distinct patient identifiers.
    pub fn patient_ids(&self) -> HashSet<&str> {
        self.patients.iter().map(|p| p.patient_id.as_str()).collect()
    }

    /// The distinct sample identifiers.
    pub fn sample_ids(&self) -> HashSet<&str> {
        self.samples.iter().map(|s| s.sample_id.as_str()).collect()
    }

    /// Number of distinct samples.
    pub fn num_samples(&self) -> usize {
        self.samples.iter().filter(|s| s.is_first()).count()
    }
}
