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

mod args;
mod drop;
mod generate;

use anyhow::{bail, Result};
use clap::{crate_version, App, AppSettings};

fn app() -> App<'static> {
    App::new("microbiome")
        .version(crate_version!())
        .about("Fills a MySQL microbiome schema with synthetic, referentially consistent data")
        .author("UMD Database Group")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .args(args::get_logging_args())
        .subcommand(generate::command_args())
        .subcommand(drop::command_args())
}

#[tokio::main]
pub async fn main() -> Result<()> {
    let matches = app().get_matches();

    match matches.subcommand() {
        Some(("generate", generate_matches)) => {
            args::get_logging(&matches, generate_matches)?.init();
            generate::command(generate_matches).await
        }
        Some(("drop", drop_matches)) => {
            args::get_logging(&matches, drop_matches)?.init();
            drop::command(drop_matches).await
        }
        Some((command, _)) => bail!("Unknown command {}", command),
        None => bail!("No command given"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subcommands() {
        let matches = app()
            .try_get_matches_from(vec!["microbiome", "--silent", "drop", "-p", "secret"])
            .unwrap();
        let (command, drop_matches) = matches.subcommand().unwrap();
        assert_eq!(command, "drop");
        assert_eq!(drop_matches.value_of("password"), Some("secret"));
        assert!(drop_matches.is_present("silent"));

        assert!(app().try_get_matches_from(vec!["microbiome"]).is_err());
    }
}
