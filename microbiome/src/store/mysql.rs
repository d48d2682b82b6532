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

//! The MySQL store.
//!
//! Every operation opens its own connection and closes it before returning,
//! whether the operation succeeded or not.

use super::{Store, Upsert};
use crate::configs::DatabaseConfig;
use crate::error::{MicrobiomeError, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, Transaction, TxOpts};

const CREATE_PATIENT: &str = "CREATE TABLE IF NOT EXISTS patient (
    Patient_ID CHAR(13) PRIMARY KEY,
    Age INT CHECK (Age BETWEEN 0 AND 100),
    Birth_Type ENUM('Cesarean', 'Natural'),
    Location ENUM('Europe', 'Africa', 'North America', 'South America', 'Central Asia', \
                  'East Asia', 'Antarctica', 'Southeast Asia', 'Middle East', 'Oceania'),
    Lifestyle ENUM('Active', 'Sedentary'),
    Disease TEXT,
    Sex ENUM('M', 'F')
)";

const CREATE_SAMPLE: &str = "CREATE TABLE IF NOT EXISTS sample (
    Sample_ID CHAR(13) PRIMARY KEY,
    Patient_ID CHAR(13),
    Date DATE,
    Body_Part VARCHAR(10),
    Sample_Type VARCHAR(10),
    CONSTRAINT sample_patient FOREIGN KEY (Patient_ID) REFERENCES patient (Patient_ID)
)";

const CREATE_MICROORGANISM: &str = "CREATE TABLE IF NOT EXISTS microorganism (
    Microorganism_ID CHAR(13) PRIMARY KEY,
    Species TEXT,
    Kingdom ENUM('Bacteria', 'Fungi', 'Virus', 'Protozoa'),
    FASTA CHAR(23),
    Seq_length INT CHECK (Seq_length BETWEEN 1000000 AND 100000000)
)";

const CREATE_SAMPLE_MICROORGANISM: &str = "CREATE TABLE IF NOT EXISTS sample_microorganism (
    Microorganism_ID CHAR(13),
    Sample_ID CHAR(13),
    qPCR INT,
    PRIMARY KEY (Microorganism_ID, Sample_ID),
    CONSTRAINT sample_fk FOREIGN KEY (Sample_ID) REFERENCES sample (Sample_ID),
    CONSTRAINT microog_fk FOREIGN KEY (Microorganism_ID) REFERENCES microorganism (Microorganism_ID)
)";

/// Table definitions in dependency order.
pub const CREATE_TABLES: [&str; 4] = [
    CREATE_PATIENT,
    CREATE_SAMPLE,
    CREATE_MICROORGANISM,
    CREATE_SAMPLE_MICROORGANISM,
];

const UPSERT_MICROORGANISM: &str = "INSERT INTO microorganism \
    (Microorganism_ID, Species, Kingdom, FASTA, Seq_length) VALUES (?, ?, ?, ?, ?) \
    ON DUPLICATE KEY UPDATE Species=VALUES(Species), Kingdom=VALUES(Kingdom), \
    FASTA=VALUES(FASTA), Seq_length=VALUES(Seq_length)";

const UPSERT_PATIENT: &str = "INSERT INTO patient \
    (Patient_ID, Age, Birth_Type, Location, Lifestyle, Disease, Sex) \
    VALUES (?, ?, ?, ?, ?, ?, ?) \
    ON DUPLICATE KEY UPDATE Age=VALUES(Age), Birth_Type=VALUES(Birth_Type), \
    Location=VALUES(Location), Lifestyle=VALUES(Lifestyle), Disease=VALUES(Disease), \
    Sex=VALUES(Sex)";

const UPSERT_SAMPLE: &str = "INSERT INTO sample \
    (Sample_ID, Patient_ID, Date, Body_Part, Sample_Type) VALUES (?, ?, ?, ?, ?) \
    ON DUPLICATE KEY UPDATE Date=VALUES(Date), Body_Part=VALUES(Body_Part), \
    Sample_Type=VALUES(Sample_Type)";

const UPSERT_SAMPLE_MICROORGANISM: &str = "INSERT INTO sample_microorganism \
    (Microorganism_ID, Sample_ID, qPCR) VALUES (?, ?, ?) \
    ON DUPLICATE KEY UPDATE qPCR=VALUES(qPCR)";

/// Returns true if `name` can be used as an unquoted MySQL database name.
fn is_valid_database_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// A store backed by a MySQL server.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    config: DatabaseConfig,
}

impl MySqlStore {
    /// Creates a store for the database named in `config`. No connection is
    /// opened until the first operation.
    pub fn new(config: DatabaseConfig) -> Result<Self> {
        if !is_valid_database_name(&config.database) {
            return Err(MicrobiomeError::Config(format!(
                "invalid database name '{}'",
                config.database
            )));
        }
        Ok(MySqlStore { config })
    }

    /// The connection configuration.
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    /// Opens a connection, to the configured database if `use_database` is
    /// set, or to the server only otherwise.
    async fn connect(&self, use_database: bool) -> Result<Conn> {
        let mut opts = OptsBuilder::default()
            .ip_or_hostname(self.config.host.as_str())
            .tcp_port(self.config.port)
            .user(Some(self.config.user.as_str()))
            .pass(Some(self.config.password.as_str()));
        if use_database {
            opts = opts.db_name(Some(self.config.database.as_str()));
        }
        debug!("Connecting to {}.", self.describe());
        Conn::new(opts).await.map_err(|e| {
            MicrobiomeError::Connection(format!("cannot connect to {}: {}", self.describe(), e))
        })
    }

    /// Closes `conn` and passes `result` through. An error of the operation
    /// takes precedence over an error while disconnecting.
    async fn release<T>(conn: Conn, result: Result<T>) -> Result<T> {
        match (conn.disconnect().await, result) {
            (Err(e), Err(err)) => {
                warn!("Failed to close the connection: {}", e);
                Err(err)
            }
            (_, Err(err)) => Err(err),
            (Err(e), Ok(_)) => Err(e.into()),
            (Ok(()), Ok(value)) => Ok(value),
        }
    }

    async fn create_schema(conn: &mut Conn, database: &str) -> Result<()> {
        conn.query_drop(format!("CREATE DATABASE IF NOT EXISTS `{}`", database))
            .await?;
        conn.query_drop(format!("USE `{}`", database)).await?;
        for ddl in CREATE_TABLES.iter() {
            conn.query_drop(*ddl).await?;
        }
        Ok(())
    }

    async fn exec(tx: &mut Transaction<'_>, upsert: &Upsert) -> Result<()> {
        match upsert {
            Upsert::Microorganism(r) => {
                tx.exec_drop(
                    UPSERT_MICROORGANISM,
                    (
                        r.id.as_str(),
                        r.species.as_str(),
                        r.kingdom.as_str(),
                        r.fasta.as_str(),
                        r.seq_length,
                    ),
                )
                .await?
            }
            Upsert::Patient(r) => {
                tx.exec_drop(
                    UPSERT_PATIENT,
                    (
                        r.patient_id.as_str(),
                        r.age,
                        r.birth_type.as_str(),
                        r.location.as_str(),
                        r.lifestyle.as_str(),
                        r.disease.as_str(),
                        r.sex.as_str(),
                    ),
                )
                .await?
            }
            Upsert::Sample(r) => {
                tx.exec_drop(
                    UPSERT_SAMPLE,
                    (
                        r.id.as_str(),
                        r.patient_id.as_str(),
                        r.date.format("%Y-%m-%d").to_string(),
                        r.body_part.as_str(),
                        r.sample_type.as_str(),
                    ),
                )
                .await?
            }
            Upsert::SampleMicroorganism(r) => {
                tx.exec_drop(
                    UPSERT_SAMPLE_MICROORGANISM,
                    (r.microorganism_id.as_str(), r.sample_id.as_str(), r.qpcr),
                )
                .await?
            }
        }
        Ok(())
    }

    async fn upsert_all(conn: &mut Conn, upserts: &[Upsert]) -> Result<()> {
        let mut tx = conn.start_transaction(TxOpts::default()).await?;
        for upsert in upserts {
            if let Err(err) = Self::exec(&mut tx, upsert).await {
                if let Err(e) = tx.rollback().await {
                    warn!("Failed to roll back the transaction: {}", e);
                }
                return Err(err);
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn ensure_schema(&self) -> Result<()> {
        let mut conn = self.connect(false).await?;
        let result = Self::create_schema(&mut conn, &self.config.database).await;
        Self::release(conn, result).await?;
        info!("Schema {} is ready.", self.config.database);
        Ok(())
    }

    async fn apply(&self, upserts: &[Upsert]) -> Result<()> {
        let mut conn = self.connect(true).await?;
        let result = Self::upsert_all(&mut conn, upserts).await;
        Self::release(conn, result).await
    }

    async fn drop_schema(&self) -> Result<()> {
        let mut conn = self.connect(false).await?;
        let result = conn
            .query_drop(format!("DROP SCHEMA IF EXISTS `{}`", self.config.database))
            .await
            .map_err(MicrobiomeError::from);
        Self::release(conn, result).await?;
        info!("Schema {} dropped.", self.config.database);
        Ok(())
    }

    fn describe(&self) -> String {
        format!(
            "mysql://{}@{}:{}/{}",
            self.config.user, self.config.host, self.config.port, self.config.database
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_name() -> Result<()> {
        assert!(is_valid_database_name("microbiome"));
        assert!(is_valid_database_name("microbiome_2024"));
        assert!(!is_valid_database_name(""));
        assert!(!is_valid_database_name("micro`biome"));
        assert!(!is_valid_database_name("microbiome; DROP TABLE patient"));

        let config = DatabaseConfig::new("secret")?;
        let store = MySqlStore::new(config.clone().with_database("bad name"));
        assert!(matches!(store, Err(MicrobiomeError::Config(_))));

        let store = MySqlStore::new(config)?;
        assert_eq!(store.describe(), "mysql://root@localhost:3306/microbiome");
        assert!(!store.describe().contains("secret"));
        Ok(())
    }

    #[test]
    fn test_statements() {
        let tables = CREATE_TABLES
            .iter()
            .map(|ddl| ddl.split_whitespace().nth(5).unwrap_or_default())
            .collect::<Vec<_>>();
        assert_eq!(tables, vec![
            "patient",
            "sample",
            "microorganism",
            "sample_microorganism"
        ]);
        assert!(CREATE_SAMPLE_MICROORGANISM.contains("PRIMARY KEY (Microorganism_ID, Sample_ID)"));

        for (statement, placeholders) in [
            (UPSERT_MICROORGANISM, 5),
            (UPSERT_PATIENT, 7),
            (UPSERT_SAMPLE, 5),
            (UPSERT_SAMPLE_MICROORGANISM, 3),
        ] {
            assert!(statement.contains("ON DUPLICATE KEY UPDATE"));
            assert_eq!(statement.matches('?').count(), placeholders);
        }

        // The owner of an existing sample is left untouched.
        assert!(!UPSERT_SAMPLE.contains("Patient_ID=VALUES"));
    }
}
