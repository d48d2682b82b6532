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

//! MySQL connection settings.

use crate::configs::{setting, setting_as};
use crate::error::Result;
use std::fmt;

/// MySQL connection configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Host name or IP address of the server.
    pub host:     String,
    /// TCP port of the server.
    pub port:     u16,
    /// User to connect as.
    pub user:     String,
    /// Password of `user`.
    pub password: String,
    /// Name of the database holding the four tables.
    pub database: String,
}

impl DatabaseConfig {
    /// Creates a configuration from the `[mysql]` section of the global
    /// settings and the given password.
    pub fn new(password: &str) -> Result<Self> {
        Ok(DatabaseConfig {
            host:     setting("mysql", "host")?,
            port:     setting_as("mysql", "port")?,
            user:     setting("mysql", "user")?,
            password: password.to_string(),
            database: setting("mysql", "database")?,
        })
    }

    /// Sets the database name.
    pub fn with_database(mut self, database: &str) -> Self {
        self.database = database.to_string();
        self
    }

    /// Sets the server host.
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Sets the server port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the user.
    pub fn with_user(mut self, user: &str) -> Self {
        self.user = user.to_string();
        self
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}
