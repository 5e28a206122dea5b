//! Data source descriptions handed to the agent factory.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParrotError;

/// Where the agent's tools point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DataSource {
    Sql {
        user: String,
        password: String,
        host: String,
        port: u16,
        database: String,
    },
    Csv {
        path: PathBuf,
    },
    Parquet {
        path: PathBuf,
    },
}

/// Tag of a `DataSource`, parsed from user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSourceKind {
    Sql,
    Csv,
    Parquet,
}

impl DataSourceKind {
    pub const ALL: [DataSourceKind; 3] = [Self::Sql, Self::Csv, Self::Parquet];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sql => "sql",
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        }
    }
}

impl FromStr for DataSourceKind {
    type Err = ParrotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sql" => Ok(Self::Sql),
            "csv" => Ok(Self::Csv),
            "parquet" => Ok(Self::Parquet),
            other => Err(ParrotError::UnsupportedDataSource(other.to_string())),
        }
    }
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DataSource {
    pub fn kind(&self) -> DataSourceKind {
        match self {
            Self::Sql { .. } => DataSourceKind::Sql,
            Self::Csv { .. } => DataSourceKind::Csv,
            Self::Parquet { .. } => DataSourceKind::Parquet,
        }
    }

    /// PostgreSQL connection string for SQL sources.
    pub fn connection_string(&self) -> Option<String> {
        match self {
            Self::Sql {
                user,
                password,
                host,
                port,
                database,
            } => Some(format!(
                "postgresql://{}:{}@{}:{}/{}",
                user, password, host, port, database
            )),
            Self::Csv { .. } | Self::Parquet { .. } => None,
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sql {
                user,
                host,
                port,
                database,
                ..
            } => write!(f, "postgresql://{}:****@{}:{}/{}", user, host, port, database),
            Self::Csv { path } => write!(f, "csv:{}", path.display()),
            Self::Parquet { path } => write!(f, "parquet:{}", path.display()),
        }
    }
}
