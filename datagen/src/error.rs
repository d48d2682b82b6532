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

//! Data generator error types

use std::error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;
use std::result;

/// Result type for operations that could result in a [DataGenError]
pub type Result<T> = result::Result<T, DataGenError>;

/// Data generator error
#[derive(Debug)]
pub enum DataGenError {
    /// The reference catalog file does not exist. Generation cannot produce
    /// biologically consistent data without it, so this is fatal.
    ResourceNotFound(PathBuf),
    /// Error associated to I/O operations and associated traits.
    IoError(io::Error),
    /// Error returned when the catalog is not well-formed CSV.
    Csv(csv::Error),
    /// Error returned when a generator is built from a catalog without rows.
    EmptyCatalog,
    /// Error returned when a configuration value is out of range.
    Config(String),
}

impl From<io::Error> for DataGenError {
    fn from(e: io::Error) -> Self {
        DataGenError::IoError(e)
    }
}

impl From<csv::Error> for DataGenError {
    fn from(e: csv::Error) -> Self {
        DataGenError::Csv(e)
    }
}

impl Display for DataGenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            DataGenError::ResourceNotFound(ref path) => {
                write!(f, "Resource not found: {}", path.display())
            }
            DataGenError::IoError(ref desc) => write!(f, "IO error: {}", desc),
            DataGenError::Csv(ref desc) => write!(f, "CSV error: {}", desc),
            DataGenError::EmptyCatalog => write!(f, "The microorganism catalog has no rows"),
            DataGenError::Config(ref desc) => write!(f, "Configuration error: {}", desc),
        }
    }
}

impl error::Error for DataGenError {}
