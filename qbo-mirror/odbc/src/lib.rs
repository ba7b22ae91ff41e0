//! Warehouse statements over ODBC using [arrow-odbc](https://docs.rs/arrow-odbc)'s
//! re-export of `odbc-api`.
//!
//! Every call opens its own connection. All functions block and are meant to be
//! driven from a blocking thread.

use arrow_odbc::odbc_api::{ConnectionOptions, Cursor, Environment, IntoParameter};
use tracing::{debug, error};

pub mod connection;
pub mod error;

pub use connection::RedshiftConnection;
pub use error::{OdbcError, Result};

/// Run a single statement in autocommit mode
/// ```rust,ignore
/// let connection_string: &str = "\
///     Driver={PostgreSQL Unicode};\
///     Server=localhost;\
///     UID=postgres;\
///     PWD=postgres;\
/// ";
///
/// execute(connection_string, "CREATE TABLE finance.temp_qb_bills (id INT)").unwrap();
/// ```
pub fn execute(connection_string: &str, sql: &str) -> Result<()> {
    let odbc_environment = Environment::new()?;

    let connection = odbc_environment
        .connect_with_connection_string(connection_string, ConnectionOptions::default())?;

    debug!(sql, "executing statement");
    connection.execute(sql, (), None)?;

    Ok(())
}

/// Executes all statements within the same transaction. The transaction is rolled
/// back if any statement fails, the error carries the position of the failing statement.
pub fn execute_in_transaction(connection_string: &str, statements: &[String]) -> Result<()> {
    let odbc_environment = Environment::new()?;

    let connection = odbc_environment
        .connect_with_connection_string(connection_string, ConnectionOptions::default())?;

    connection.set_autocommit(false)?;

    let result = statements
        .iter()
        .enumerate()
        .try_for_each(|(index, sql)| {
            debug!(index, sql, "executing statement in transaction");
            connection
                .execute(sql, (), None)
                .map(|_| ())
                .map_err(|source| OdbcError::Transaction { index, source })
        });

    match result {
        Ok(_) => {
            connection.commit()?;
            Ok(())
        }
        Err(err) => {
            if let Err(rollback_err) = connection.rollback() {
                error!("ROLLBACK failed: {rollback_err}");
            }
            error!("ROLLBACK transaction: {err}");
            Err(err)
        }
    }
}

/// Checks whether `table` (`<schema>.<table>` or `<table>` in `public`) exists
/// by probing `information_schema.tables`
pub fn table_exists(connection_string: &str, table: &str) -> Result<bool> {
    let odbc_environment = Environment::new()?;

    let connection = odbc_environment
        .connect_with_connection_string(connection_string, ConnectionOptions::default())?;

    let (schema, name) = split_table_name(table);
    let schema = schema.to_ascii_lowercase();
    let name = name.to_ascii_lowercase();

    let query = "SELECT 1 FROM information_schema.tables WHERE table_schema = ? AND table_name = ?";
    let parameters = (&schema.as_str().into_parameter(), &name.as_str().into_parameter());

    let Some(mut cursor) = connection.execute(query, parameters, None)? else {
        return Ok(false);
    };
    let exists = cursor.next_row()?.is_some();

    debug!(table, exists, "probed information_schema");
    Ok(exists)
}

/// Split a possibly schema-qualified table name
pub fn split_table_name(table: &str) -> (&str, &str) {
    table.split_once('.').unwrap_or(("public", table))
}
