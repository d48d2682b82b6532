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

//! This module provides the default configurations of the generator and of the
//! database connection.

pub mod database;
pub use database::DatabaseConfig;

use crate::error::{MicrobiomeError, Result};
use ini::Ini;
use lazy_static::lazy_static;
use std::path::PathBuf;
use std::str::FromStr;

lazy_static! {
    /// Global settings.
    pub static ref MICROBIOME_CONF: Ini =
        Ini::load_from_str(include_str!("./microbiome.toml")).unwrap_or_else(|_| Ini::new());
}

/// Returns the raw value of `key` in `section` of the global settings.
pub fn setting(section: &str, key: &str) -> Result<String> {
    MICROBIOME_CONF
        .get_from(Some(section), key)
        .map(String::from)
        .ok_or_else(|| MicrobiomeError::Config(format!("missing setting [{}] {}", section, key)))
}

/// Returns the value of `key` in `section` of the global settings, parsed.
pub fn setting_as<T: FromStr>(section: &str, key: &str) -> Result<T> {
    let value = setting(section, key)?;
    value.parse::<T>().map_err(|_| {
        MicrobiomeError::Config(format!(
            "invalid setting [{}] {} = '{}'",
            section, key, value
        ))
    })
}

/// Number of patients generated and committed per batch.
pub fn default_batch_size() -> Result<usize> {
    setting_as("generator", "batch_size")
}

/// Seed of the first batch.
pub fn default_seed() -> Result<u64> {
    setting_as("generator", "seed")
}

/// Path of the microorganism reference catalog.
pub fn default_catalog_path() -> Result<PathBuf> {
    setting("generator", "catalog").map(PathBuf::from)
}
