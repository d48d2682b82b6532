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

//! Drops the generated database.

use crate::args::{get_connection_args, get_database_config};
use anyhow::{anyhow, Context as _, Result};
use clap::{App, ArgMatches};
use microbiome::store::{MySqlStore, Store};

pub async fn command(matches: &ArgMatches) -> Result<()> {
    let store = MySqlStore::new(get_database_config(matches)?)?;
    store
        .drop_schema()
        .await
        .with_context(|| anyhow!("drop command failed on {}", store.describe()))
}

pub fn command_args() -> App<'static> {
    App::new("drop")
        .about("Drops the database with all generated tables")
        .args(get_connection_args())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_password_required() -> Result<()> {
        let matches = command_args().try_get_matches_from(vec!["drop", "-d", "microbiome"])?;
        assert!(command(&matches).await.is_err());
        Ok(())
    }
}
