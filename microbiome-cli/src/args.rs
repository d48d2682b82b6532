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

use anyhow::{anyhow, Context as _, Result};
use clap::{Arg, ArgMatches};
use microbiome::configs::DatabaseConfig;
use std::io::Write;
use std::str::FromStr;

pub fn get_logging_args() -> Vec<Arg<'static>> {
    [
        Arg::new("log-level")
            .short('L')
            .long("log-level")
            .possible_values(["error", "warn", "info", "debug", "trace", "off"])
            .help("Log level [default: info]")
            .global(true)
            .takes_value(true),
        Arg::new("trace")
            .long("trace")
            .help("Log ultra-verbose (trace level) information")
            .global(true)
            .takes_value(false),
        Arg::new("silent")
            .long("silent")
            .help("Suppress all output")
            .global(true)
            .takes_value(false),
    ]
    .to_vec()
}

/// Arguments locating the MySQL database.
pub fn get_connection_args() -> Vec<Arg<'static>> {
    [
        Arg::new("password")
            .short('p')
            .long("password")
            .value_name("PASSWORD")
            .help("Sets the MySQL password")
            .takes_value(true),
        Arg::new("database")
            .short('d')
            .long("database")
            .value_name("NAME")
            .help("Sets the database name [default: microbiome]")
            .takes_value(true),
        Arg::new("host")
            .long("host")
            .value_name("HOST")
            .help("Sets the MySQL host [default: localhost]")
            .takes_value(true),
        Arg::new("port")
            .long("port")
            .value_name("PORT")
            .help("Sets the MySQL port [default: 3306]")
            .takes_value(true),
        Arg::new("user")
            .long("user")
            .value_name("USER")
            .help("Sets the MySQL user [default: root]")
            .takes_value(true),
    ]
    .to_vec()
}

/// Parses the value of argument `name`, if present.
pub fn parse_value<T>(matches: &ArgMatches, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    matches
        .value_of(name)
        .map(|value| {
            value
                .parse::<T>()
                .with_context(|| anyhow!("Invalid {} '{}'", name, value))
        })
        .transpose()
}

/// Builds the connection configuration from the defaults and the arguments.
pub fn get_database_config(matches: &ArgMatches) -> Result<DatabaseConfig> {
    let password = matches
        .value_of("password")
        .ok_or_else(|| anyhow!("No MySQL password provided, use --password"))?;

    let mut config = DatabaseConfig::new(password)?;
    if let Some(database) = matches.value_of("database") {
        config = config.with_database(database);
    }
    if let Some(host) = matches.value_of("host") {
        config = config.with_host(host);
    }
    if let Some(port) = parse_value::<u16>(matches, "port")? {
        config = config.with_port(port);
    }
    if let Some(user) = matches.value_of("user") {
        config = config.with_user(user);
    }
    Ok(config)
}

pub fn get_logging(
    global_matches: &ArgMatches,
    matches: &ArgMatches,
) -> Result<env_logger::Builder> {
    let mut builder = env_logger::Builder::new();

    let level = if matches.is_present("trace") {
        log::LevelFilter::Trace
    } else if matches.is_present("silent") {
        log::LevelFilter::Off
    } else {
        match matches
            .value_of("log-level")
            .or_else(|| global_matches.value_of("log-level"))
        {
            Some("error") => log::LevelFilter::Error,
            Some("warn") => log::LevelFilter::Warn,
            Some("debug") => log::LevelFilter::Debug,
            Some("trace") => log::LevelFilter::Trace,
            Some("off") => log::LevelFilter::Off,
            _ => log::LevelFilter::Info,
        }
    };
    builder.filter(None, level);
    builder.filter_module("mysql_async", log::LevelFilter::Warn);

    if level == log::LevelFilter::Trace {
        builder.format_timestamp_secs();
    } else {
        builder.format(|f, record| {
            writeln!(
                f,
                "[{}] {}",
                record.level().to_string().to_lowercase(),
                record.args()
            )
        });
    }

    Ok(builder)
}
