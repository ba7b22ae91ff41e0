use thiserror::Error;

pub type Result<T> = core::result::Result<T, OdbcError>;

/// Failure of a warehouse call. Messages come from the driver and never contain
/// the connection string.
#[derive(Error, Debug)]
pub enum OdbcError {
    #[error(transparent)]
    OdbcApi(#[from] arrow_odbc::odbc_api::Error),

    /// A statement inside a transaction failed, the transaction was rolled back
    #[error("statement {index} failed, transaction rolled back: {source}")]
    Transaction {
        index: usize,
        #[source]
        source: arrow_odbc::odbc_api::Error,
    },
}

impl OdbcError {
    /// Position of the failing statement when raised by [`crate::execute_in_transaction`]
    pub fn statement_index(&self) -> Option<usize> {
        match self {
            OdbcError::Transaction { index, .. } => Some(*index),
            OdbcError::OdbcApi(_) => None,
        }
    }
}
