//! Source connection configuration.
//!
//! The job store carries this as an opaque JSON blob; only the worker (and
//! the `/api/database/connect` probe) deserialize it into `SourceConfig`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported source backend, selecting a connector dialect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Postgres,
    MySql,
    MariaDb,
    Sqlite,
}

impl Vendor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Postgres => "postgres",
            Vendor::MySql => "mysql",
            Vendor::MariaDb => "mariadb",
            Vendor::Sqlite => "sqlite",
        }
    }

    /// Default TCP port for networked vendors.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Vendor::Postgres => Some(5432),
            Vendor::MySql | Vendor::MariaDb => Some(3306),
            Vendor::Sqlite => None,
        }
    }
}

impl std::fmt::Display for Vendor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported database vendor: {0}")]
pub struct ParseVendorError(pub String);

impl std::str::FromStr for Vendor {
    type Err = ParseVendorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Vendor::Postgres),
            "mysql" => Ok(Vendor::MySql),
            "mariadb" => Ok(Vendor::MariaDb),
            "sqlite" => Ok(Vendor::Sqlite),
            other => Err(ParseVendorError(other.to_string())),
        }
    }
}

/// Connection parameters plus the selected table list for one import.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Host, optionally `host:port`. For SQLite this is the database path's
    /// directory or empty.
    pub server: String,
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub vendor: Vendor,
    pub source_id: Uuid,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Schema to introspect; vendor default applies when absent
    /// (`public` for Postgres, the database itself for MySQL/MariaDB).
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub selected_tables: Vec<String>,
}

impl SourceConfig {
    /// Host and port split out of `server`, with the vendor default port.
    pub fn host_port(&self) -> (String, Option<u16>) {
        match self.server.split_once(':') {
            Some((host, port)) => {
                (host.to_string(), port.parse().ok().or(self.vendor.default_port()))
            }
            None => (self.server.clone(), self.vendor.default_port()),
        }
    }

    /// Checkpoint key schema component for this connection.
    pub fn schema_or_default(&self) -> String {
        match (&self.schema, self.vendor) {
            (Some(schema), _) => schema.clone(),
            (None, Vendor::Postgres) => "public".to_string(),
            (None, Vendor::Sqlite) => "main".to_string(),
            (None, _) => self.database.clone(),
        }
    }
}
