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

//! Generates a synthetic dataset and writes it to the database.

use crate::args::{get_connection_args, get_database_config, parse_value};
use anyhow::{anyhow, Context as _, Result};
use clap::{App, Arg, ArgMatches};
use log::info;
use microbiome::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

pub async fn command(matches: &ArgMatches) -> Result<()> {
    run(matches)
        .await
        .with_context(|| anyhow!("generate command failed"))
}

pub fn command_args() -> App<'static> {
    App::new("generate")
        .about("Generates synthetic patients, samples and detections")
        .args(get_connection_args())
        .arg(
            Arg::new("samples")
                .short('n')
                .long("samples")
                .value_name("N")
                .help(
                    "Sets the number of simulated patients to generate; every patient \
                     carries its own samples and detections",
                )
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::new("batch size")
                .short('b')
                .long("batch-size")
                .value_name("N")
                .help("Sets the number of patients committed per transaction [default: 100]")
                .takes_value(true),
        )
        .arg(
            Arg::new("seed")
                .short('s')
                .long("seed")
                .value_name("SEED")
                .help("Sets the seed of the first batch [default: 42]")
                .takes_value(true),
        )
        .arg(
            Arg::new("catalog")
                .long("catalog")
                .value_name("FILE")
                .help("Sets the microorganism catalog [default: data/microorganisms.csv]")
                .takes_value(true),
        )
        .arg(
            Arg::new("generator option")
                .long("set")
                .value_name("KEY=VALUE")
                .help("Overrides a generator setting, e.g. samples-per-patient=3")
                .takes_value(true)
                .multiple_occurrences(true),
        )
        .arg(
            Arg::new("dry run")
                .long("dry-run")
                .help("Writes to an in-memory database instead of MySQL"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Prints the run summary as JSON"),
        )
}

/// Collects the generator settings given on the command line.
pub fn generator_config(matches: &ArgMatches) -> Result<GeneratorConfig> {
    let mut config = Config::new();
    if let Some(options) = matches.values_of("generator option") {
        for option in options {
            let (key, value) = option
                .split_once('=')
                .ok_or_else(|| anyhow!("Expected KEY=VALUE, got '{}'", option))?;
            config.insert(key.trim(), value.trim().to_string());
        }
    }

    // `-s` takes precedence over `--set seed=...`.
    if let Some(seed) = parse_value::<u64>(matches, "seed")? {
        config.insert("seed", seed.to_string());
    } else if !config.contains("seed") {
        config.insert("seed", default_seed()?.to_string());
    }

    Ok(GeneratorConfig::new(&config)?)
}

async fn run(matches: &ArgMatches) -> Result<()> {
    let total = parse_value::<usize>(matches, "samples")?
        .ok_or_else(|| anyhow!("No sample count provided"))?;
    let batch_size = match parse_value::<usize>(matches, "batch size")? {
        Some(batch_size) => batch_size,
        None => default_batch_size()?,
    };
    let catalog_path = match matches.value_of("catalog") {
        Some(path) => PathBuf::from(path),
        None => default_catalog_path()?,
    };
    let catalog = Arc::new(
        Catalog::load(&catalog_path)
            .with_context(|| anyhow!("Cannot load catalog {}", catalog_path.display()))?,
    );

    let config = PipelineConfig::new(generator_config(matches)?)?.with_batch_size(batch_size);

    if matches.is_present("dry run") {
        let database = matches.value_of("database").unwrap_or("microbiome");
        let store = Arc::new(MemoryStore::new(database));
        let summary = Pipeline::new(config, store.clone(), catalog)?
            .run(total)
            .await?;
        report(matches, &summary)?;

        if let Some(tables) = store.snapshot().await {
            for table in [
                Table::Microorganism,
                Table::Patient,
                Table::Sample,
                Table::SampleMicroorganism,
            ] {
                info!("{}: {} rows", table, tables.count(table));
            }
        }
        return Ok(());
    }

    let store = Arc::new(MySqlStore::new(get_database_config(matches)?)?);
    let summary = Pipeline::new(config, store, catalog)?.run(total).await?;
    report(matches, &summary)
}

fn report(matches: &ArgMatches, summary: &RunSummary) -> Result<()> {
    if matches.is_present("json") {
        println!("{}", serde_json::to_string_pretty(summary)?);
    } else {
        info!(
            "{} patients, {} samples and {} detections written to {} in {} batches.",
            summary.total.patients,
            summary.total.samples,
            summary.total.associations,
            summary.store,
            summary.batches
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_config() -> Result<()> {
        let matches = command_args().try_get_matches_from(vec![
            "generate",
            "-n",
            "1000",
            "-s",
            "7",
            "--set",
            "samples-per-patient=3",
            "--set",
            "first-date = 2020-01-01",
        ])?;
        let config = generator_config(&matches)?;
        assert_eq!(config.base_seed, 7);
        assert_eq!(config.samples_per_patient, 3);
        assert_eq!(config.first_date.to_string(), "2020-01-01");
        assert_eq!(config.max_detections, 10);
        Ok(())
    }

    #[test]
    fn test_default_seed() -> Result<()> {
        let matches = command_args().try_get_matches_from(vec!["generate", "-n", "10"])?;
        assert_eq!(generator_config(&matches)?.base_seed, 42);
        Ok(())
    }

    #[test]
    fn test_seed_option() -> Result<()> {
        let matches = command_args().try_get_matches_from(vec![
            "generate", "-n", "10", "--set", "seed=7",
        ])?;
        assert_eq!(generator_config(&matches)?.base_seed, 7);

        let matches = command_args().try_get_matches_from(vec![
            "generate", "-n", "10", "--set", "seed=7", "-s", "9",
        ])?;
        assert_eq!(generator_config(&matches)?.base_seed, 9);
        Ok(())
    }

    #[test]
    fn test_malformed_option() -> Result<()> {
        let matches = command_args().try_get_matches_from(vec![
            "generate",
            "-n",
            "10",
            "--set",
            "samples-per-patient",
        ])?;
        assert!(generator_config(&matches).is_err());
        Ok(())
    }

    #[test]
    fn test_samples_counts_patients() {
        let app = command_args();
        let samples = app
            .get_arguments()
            .find(|arg| arg.get_name() == "samples")
            .unwrap();
        assert!(samples.get_help().unwrap().contains("simulated patients"));
    }

    #[test]
    fn test_samples_required() {
        assert!(command_args()
            .try_get_matches_from(vec!["generate", "-p", "secret"])
            .is_err());
    }

    #[tokio::test]
    async fn test_dry_run() -> Result<()> {
        let catalog = concat!(env!("CARGO_MANIFEST_DIR"), "/../data/microorganisms.csv");
        let matches = command_args().try_get_matches_from(vec![
            "generate",
            "-n",
            "30",
            "-b",
            "20",
            "--catalog",
            catalog,
            "--dry-run",
        ])?;
        run(&matches).await
    }

    #[tokio::test]
    async fn test_missing_catalog() -> Result<()> {
        let matches = command_args().try_get_matches_from(vec![
            "generate",
            "-n",
            "30",
            "--catalog",
            "/definitely/not/here.csv",
            "--dry-run",
        ])?;
        let err = run(&matches).await.unwrap_err();
        assert!(err.to_string().contains("Cannot load catalog"));
        Ok(())
    }
}
