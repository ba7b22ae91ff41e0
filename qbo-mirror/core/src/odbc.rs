//! [`Warehouse`] over ODBC, backed by `qbo-mirror-odbc`

use async_trait::async_trait;
use qbo_mirror_odbc::OdbcError;
use std::{fmt, sync::Arc};

pub use qbo_mirror_odbc::RedshiftConnection;

use crate::loader::{StatementError, Warehouse};

/// Redshift reached through an ODBC driver.
///
/// Every call opens its own connection on a blocking thread.
#[derive(Clone)]
pub struct OdbcWarehouse {
    connection_string: Arc<str>,
}

impl fmt::Debug for OdbcWarehouse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OdbcWarehouse")
            .field("connection_string", &"***")
            .finish()
    }
}

impl OdbcWarehouse {
    pub fn new(connection: &RedshiftConnection) -> Self {
        Self::from_connection_string(connection.connection_string())
    }

    pub fn from_connection_string(connection_string: impl Into<String>) -> Self {
        Self {
            connection_string: Arc::from(connection_string.into()),
        }
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StatementError>
    where
        T: Send + 'static,
        F: FnOnce(&str) -> qbo_mirror_odbc::Result<T> + Send + 'static,
    {
        let connection_string = self.connection_string.clone();

        tokio::task::spawn_blocking(move || f(&connection_string))
            .await
            .map_err(|e| StatementError::new(format!("warehouse task failed: {e}")))?
            .map_err(statement_error)
    }
}

fn statement_error(error: OdbcError) -> StatementError {
    StatementError {
        index: error.statement_index(),
        cause: error.to_string(),
    }
}

#[async_trait]
impl Warehouse for OdbcWarehouse {
    async fn table_exists(&self, table: &str) -> Result<bool, StatementError> {
        let table = table.to_string();
        self.blocking(move |cs| qbo_mirror_odbc::table_exists(cs, &table))
            .await
    }

    async fn execute(&self, sql: &str) -> Result<(), StatementError> {
        let sql = sql.to_string();
        self.blocking(move |cs| qbo_mirror_odbc::execute(cs, &sql))
            .await
    }

    async fn execute_transaction(&self, statements: &[String]) -> Result<(), StatementError> {
        let statements = statements.to_vec();
        self.blocking(move |cs| qbo_mirror_odbc::execute_in_transaction(cs, &statements))
            .await
    }
}
