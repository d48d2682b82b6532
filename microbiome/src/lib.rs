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

#![warn(missing_docs, clippy::needless_borrow)]
// Clippy lints, some should be disabled incrementally
#![allow(clippy::module_inception, clippy::new_without_default)]

//! Populates a relational microbiome schema with synthetic, referentially
//! consistent data.
//!
//! Rows are produced by the [`datagen`] crate one seeded batch at a time and
//! written through a [`Store`](crate::store::Store), one transaction per batch,
//! with upsert semantics so that replaying a run is idempotent.

pub mod configs;
pub mod error;
pub mod pipeline;
pub mod prelude;
pub mod store;
pub mod writer;
