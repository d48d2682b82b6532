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

//! Microbiome error types

use datagen::DataGenError;

use std::error;
use std::fmt::{Display, Formatter};
use std::result;

/// MySQL server error codes that report a violated constraint.
const ER_ROW_IS_REFERENCED_2: u16 = 1451;
const ER_NO_REFERENCED_ROW_2: u16 = 1452;
const ER_CHECK_CONSTRAINT_VIOLATED: u16 = 3819;
const WARN_DATA_TRUNCATED: u16 = 1265;
const ER_DATA_TOO_LONG: u16 = 1406;

/// Result type for operations that could result in a [MicrobiomeError]
pub type Result<T> = result::Result<T, MicrobiomeError>;

/// Microbiome error
#[derive(Debug)]
pub enum MicrobiomeError {
    /// Error returned by the data generator, e.g. a missing catalog.
    DataGen(DataGenError),
    /// Error returned by the MySQL driver that fits no other category.
    MySql(mysql_async::Error),
    /// Error returned when the database cannot be reached, or the connection
    /// drops in the middle of an operation.
    Connection(String),
    /// Error returned when an upsert violates a foreign key, check or enum
    /// constraint. The enclosing batch is rolled back.
    Constraint(String),
    /// Error returned when a configuration value is missing or malformed.
    Config(String),
    /// Error returned when serde_json failed to serialize or deserialize data.
    SerdeJson(serde_json::Error),
    /// Error returned as a consequence of an error in this crate.
    /// This error should not happen in normal usage.
    Internal(String),
}

impl From<DataGenError> for MicrobiomeError {
    fn from(e: DataGenError) -> Self {
        MicrobiomeError::DataGen(e)
    }
}

impl From<mysql_async::Error> for MicrobiomeError {
    fn from(e: mysql_async::Error) -> Self {
        match e {
            mysql_async::Error::Server(ref err)
                if matches!(
                    err.code,
                    ER_ROW_IS_REFERENCED_2
                        | ER_NO_REFERENCED_ROW_2
                        | ER_CHECK_CONSTRAINT_VIOLATED
                        | WARN_DATA_TRUNCATED
                        | ER_DATA_TOO_LONG
                ) =>
            {
                MicrobiomeError::Constraint(err.message.clone())
            }
            mysql_async::Error::Io(ref err) => MicrobiomeError::Connection(err.to_string()),
            _ => MicrobiomeError::MySql(e),
        }
    }
}

impl From<serde_json::Error> for MicrobiomeError {
    fn from(e: serde_json::Error) -> Self {
        MicrobiomeError::SerdeJson(e)
    }
}

impl Display for MicrobiomeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            MicrobiomeError::DataGen(ref desc) => write!(f, "Data generation error: {}", desc),
            MicrobiomeError::MySql(ref desc) => write!(f, "MySQL error: {}", desc),
            MicrobiomeError::Connection(ref desc) => write!(f, "Connection error: {}", desc),
            MicrobiomeError::Constraint(ref desc) => {
                write!(f, "Constraint violation: {}", desc)
            }
            MicrobiomeError::Config(ref desc) => write!(f, "Configuration error: {}", desc),
            MicrobiomeError::SerdeJson(ref desc) => write!(f, "serde_json error: {:?}", desc),
            MicrobiomeError::Internal(ref desc) => write!(
                f,
                "Internal error: {}. This was likely caused by a bug in the generator's \
                    code and we would welcome that you file an bug report in our issue tracker",
                desc
            ),
        }
    }
}

impl error::Error for MicrobiomeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use mysql_async::ServerError;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_display() {
        let err = MicrobiomeError::from(DataGenError::ResourceNotFound(PathBuf::from(
            "data/microorganisms.csv",
        )));
        assert_eq!(
            err.to_string(),
            "Data generation error: Resource not found: data/microorganisms.csv"
        );

        let err = MicrobiomeError::Constraint("Cannot add or update a child row".to_string());
        assert!(err.to_string().starts_with("Constraint violation"));
    }

    #[test]
    fn test_from_mysql() {
        let server = |code: u16| {
            mysql_async::Error::Server(ServerError {
                code,
                message: format!("error {}", code),
                state: "23000".to_string(),
            })
        };
        for code in [1451, 1452, 3819, 1265, 1406] {
            let err = MicrobiomeError::from(server(code));
            assert!(matches!(err, MicrobiomeError::Constraint(_)), "{}", code);
        }
        assert!(matches!(
            MicrobiomeError::from(server(1045)),
            MicrobiomeError::MySql(_)
        ));

        // Socket failures surface as lost connections.
        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        let err = MicrobiomeError::from(mysql_async::Error::from(reset));
        assert!(matches!(err, MicrobiomeError::Connection(_)));
    }
}
