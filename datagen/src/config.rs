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

//! The data generator configuration.

use crate::error::{DataGenError, Result};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::str::FromStr;

/// Generator settings given as `key=value` pairs, keyed by option name.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct Config {
    args: HashMap<String, String>,
}

impl Config {
    /// Creates a new `Config`.
    pub fn new() -> Self {
        Config {
            args: HashMap::new(),
        }
    }

    /// Inserts the given value for the given key.
    ///
    /// If the key already exists, its value is overwritten.
    pub fn insert(&mut self, key: &str, value: String) {
        self.args.insert(String::from(key), value);
    }

    /// Returns true if a value was given for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.args.contains_key(key)
    }

    /// Returns the value for the given key automatically parsed if possible.
    pub fn get_as<T: FromStr>(&self, key: &str) -> Option<T> {
        self.args.get(key).and_then(|x| x.parse::<T>().ok())
    }

    /// Returns the value for the given key or a default value if the key does
    /// not exist.
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.args
            .get(key)
            .map_or(String::from(default), |x| x.clone())
    }

    /// Returns the value for the given key automatically parsed, or a default
    /// value if the key does not exist.
    pub fn get_as_or<T: FromStr>(&self, key: &str, default: T) -> T {
        self.get_as(key).unwrap_or(default)
    }
}

/// Seed of the first batch. Batch `i` is seeded with `BASE_SEED + i`.
pub const BASE_SEED: u64 = 42;

/// Prefix of generated patient identifiers.
pub const PATIENT_PREFIX: &str = "PAC";

/// Prefix of generated sample identifiers.
pub const SAMPLE_PREFIX: &str = "SMP";

fn parse_date(key: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| DataGenError::Config(format!("invalid {} '{}': {}", key, value, e)))
}

fn check_range<T: PartialOrd + std::fmt::Display>(name: &str, min: T, max: T) -> Result<()> {
    if min > max {
        return Err(DataGenError::Config(format!(
            "{} range is empty: {} > {}",
            name, min, max
        )));
    }
    Ok(())
}

/// Generator configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneratorConfig {
    /// Seed of batch zero. Every following batch increments it by one, so
    /// batches are reproducible on their own yet distinct.
    pub base_seed:           u64,
    /// Upper bound of the number of samples drawn per simulated patient. The
    /// actual count is uniform in `[0, samples_per_patient]`; patients that
    /// draw zero samples are discarded.
    pub samples_per_patient: usize,
    /// Upper bound of the microorganisms detected in a single sample. The
    /// actual count is uniform in `[1, max_detections]`.
    pub max_detections:      usize,
    /// Youngest patient age.
    pub age_min:             u32,
    /// Oldest patient age.
    pub age_max:             u32,
    /// Lowest qPCR copy count.
    pub qpcr_min:            u32,
    /// Highest qPCR copy count.
    pub qpcr_max:            u32,
    /// Shortest microorganism genome length.
    pub seq_length_min:      u32,
    /// Longest microorganism genome length.
    pub seq_length_max:      u32,
    /// Earliest sample collection date.
    pub first_date:          NaiveDate,
    /// Latest sample collection date.
    pub last_date:           NaiveDate,
}

impl GeneratorConfig {
    /// Creates the generator configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let base_seed = config.get_as_or("seed", BASE_SEED);
        let samples_per_patient = config.get_as_or("samples-per-patient", 2);
        let max_detections = config.get_as_or("max-detections", 10);
        let age_min = config.get_as_or("age-min", 0);
        let age_max = config.get_as_or("age-max", 100);
        let qpcr_min = config.get_as_or("qpcr-min", 50);
        let qpcr_max = config.get_as_or("qpcr-max", 1000);
        let seq_length_min = config.get_as_or("seq-length-min", 1_000_000);
        let seq_length_max = config.get_as_or("seq-length-max", 100_000_000);
        let first_date = parse_date("first-date", &config.get_or("first-date", "2002-01-01"))?;
        let last_date = parse_date("last-date", &config.get_or("last-date", "2023-12-31"))?;

        if samples_per_patient == 0 {
            return Err(DataGenError::Config(
                "samples-per-patient must be at least 1".to_string(),
            ));
        }
        if max_detections == 0 {
            return Err(DataGenError::Config(
                "max-detections must be at least 1".to_string(),
            ));
        }
        check_range("age", age_min, age_max)?;
        check_range("qpcr", qpcr_min, qpcr_max)?;
        check_range("seq-length", seq_length_min, seq_length_max)?;
        check_range("date", first_date, last_date)?;

        Ok(GeneratorConfig {
            base_seed,
            samples_per_patient,
            max_detections,
            age_min,
            age_max,
            qpcr_min,
            qpcr_max,
            seq_length_min,
            seq_length_max,
            first_date,
            last_date,
        })
    }

    /// Returns the seed of the given batch.
    pub fn batch_seed(&self, batch_index: usize) -> u64 {
        self.base_seed.wrapping_add(batch_index as u64)
    }
}
