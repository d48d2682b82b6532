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

//! The static microorganism reference catalog.
//!
//! The catalog is a CSV file with one row per known microorganism:
//!
//! ```text
//! Microorganism_ID,Kingdom,Species,Diseases
//! MIC-00001-BAC,Bacteria,Escherichia coli,"Urinary tract infection, Gastroenteritis"
//! ```

use crate::error::{DataGenError, Result};
use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CatalogRecord {
    #[serde(rename = "Microorganism_ID")]
    id:       String,
    #[serde(rename = "Kingdom")]
    kingdom:  String,
    #[serde(rename = "Species")]
    species:  String,
    #[serde(rename = "Diseases")]
    diseases: String,
}

/// A known microorganism and the diseases it is associated with.
#[derive(Eq, PartialEq, Clone, Serialize, Deserialize, Debug, Hash)]
pub struct CatalogEntry {
    /// The microorganism identifier.
    pub id:       String,
    /// The kingdom, e.g. `Bacteria`.
    pub kingdom:  String,
    /// The species name.
    pub species:  String,
    /// The associated diseases.
    pub diseases: Vec<String>,
}

impl CatalogEntry {
    /// Creates a catalog entry from the comma-separated disease list found in
    /// the catalog file.
    pub fn new(id: &str, kingdom: &str, species: &str, diseases: &str) -> Self {
        CatalogEntry {
            id:       id.to_string(),
            kingdom:  kingdom.to_string(),
            species:  species.to_string(),
            diseases: diseases
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    /// Returns one of the associated diseases uniformly at random, or `None`
    /// if the catalog lists none for this microorganism.
    pub fn choose_disease<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&String> {
        self.diseases.choose(rng)
    }

    /// The FASTA file name under which the genome of this microorganism is
    /// stored.
    pub fn fasta(&self) -> String {
        format!("seq_{}.fasta", self.id)
    }
}

impl From<CatalogRecord> for CatalogEntry {
    fn from(record: CatalogRecord) -> Self {
        CatalogEntry::new(
            &record.id,
            &record.kingdom,
            &record.species,
            &record.diseases,
        )
    }
}

/// The microorganism reference table, held in memory.
#[derive(Eq, PartialEq, Clone, Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Creates a catalog from the given entries.
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Catalog { entries }
    }

    /// Loads the catalog file at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => DataGenError::ResourceNotFound(path.to_path_buf()),
            _ => DataGenError::IoError(e),
        })?;
        let catalog = Self::from_reader(file)?;
        debug!(
            "Loaded {} microorganisms from {}.",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Reads a catalog in CSV format.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(reader);
        let entries = reader
            .deserialize::<CatalogRecord>()
            .map(|record| record.map(CatalogEntry::from))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Catalog { entries })
    }

    /// Returns a catalog row uniformly at random.
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&CatalogEntry> {
        self.entries.choose(rng)
    }

    /// Returns true if a microorganism with the given identifier is listed.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Returns the entry with the given identifier.
    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// All entries in file order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Number of microorganisms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the catalog has no rows.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
