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

//! A synthetic microbiome dataset generator. It produces patients, the samples
//! taken from them, and the microorganisms detected in every sample, so that
//! a relational schema can be populated before migration and query
//! benchmarking.
//!
//! Data is generated in batches. Every batch is driven by its own seeded random
//! source, so a batch can be reproduced on its own and two batches never share
//! random state. Microorganisms are not generated: they are drawn from a static
//! reference [`catalog`](crate::catalog::Catalog).
//!
//! # Patient
//!
//! - id: `PAC-DDDDD-LLL`, unique within a batch.
//! - age: An integer in `[0, 100]`.
//! - birth_type: `Cesarean` or `Natural`.
//! - location: One of ten world regions.
//! - lifestyle: `Active` or `Sedentary`.
//! - sex: `M` or `F`.
//! - disease: One of the diseases associated with a microorganism detected in
//!   one of the patient's own samples.
//!
//! # Sample
//!
//! - id: `SMP-DDDDD-LLL`, unique within a batch.
//! - patient: The ID of the patient the sample was taken from.
//! - date: A collection date between 2002-01-01 and 2023-12-31.
//! - body_part: One of `Head`, `Chest`, `Arm`, `Leg`, `Foot`, `Hand`.
//! - sample_type: One of `Blood`, `Tissue`, `Saliva`, `Urine`.
//!
//! # Detection
//!
//! - sample: The ID of the sample the microorganism was found in.
//! - microorganism: The catalog ID of the detected microorganism.
//! - qpcr: The quantitative PCR copy count, an integer in `[50, 1000]`.

#![warn(missing_docs)]
// Clippy lints, some should be disabled incrementally
#![allow(clippy::module_inception, clippy::new_without_default)]

pub mod batch;
pub mod catalog;
pub mod config;
pub mod entity;
pub mod error;
pub mod generator;
pub mod ident;

pub use self::batch::{Batch, PatientRow, SampleRow};
pub use self::catalog::{Catalog, CatalogEntry};
pub use self::config::{Config, GeneratorConfig};
pub use self::error::{DataGenError, Result};
pub use self::generator::BatchGenerator;
