//! Redshift connection settings

use std::fmt;

/// Driver name registered by the Amazon Redshift ODBC driver on Linux
pub const DEFAULT_DRIVER: &str = "Amazon Redshift (x64)";

/// Default Redshift port
pub const DEFAULT_PORT: u16 = 5439;

/// Connection settings for a Redshift cluster reached over ODBC
#[derive(Clone, PartialEq, Eq)]
pub struct RedshiftConnection {
    pub driver: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl RedshiftConnection {
    pub fn new(
        host: impl Into<String>,
        database: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            driver: DEFAULT_DRIVER.to_string(),
            host: host.into(),
            port: DEFAULT_PORT,
            database: database.into(),
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// ODBC connection string, values are brace-quoted so `;` and `}` in passwords survive
    pub fn connection_string(&self) -> String {
        format!(
            "Driver={};Server={};Port={};Database={};UID={};PWD={};",
            quote(&self.driver),
            quote(&self.host),
            self.port,
            quote(&self.database),
            quote(&self.user),
            quote(&self.password),
        )
    }
}

fn quote(value: &str) -> String {
    format!("{{{}}}", value.replace('}', "}}"))
}

impl fmt::Debug for RedshiftConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedshiftConnection")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}
