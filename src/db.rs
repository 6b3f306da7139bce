//! Database setup and shared helpers for working with the SQLite connection.

use std::sync::{Mutex, MutexGuard};

use rusqlite::{
    Connection, Transaction as SqlTransaction, TransactionBehavior, functions::FunctionFlags,
};

use crate::{Error, auth::create_user_table, transaction::create_transaction_table};

/// The name of the SQL function that lower-cases text with Unicode rules.
///
/// SQLite's built-in `lower` only folds ASCII letters.
pub const UNICODE_LOWER: &str = "unicode_lower";

/// Create the tables for the domain models if they do not already exist and
/// register the custom SQL functions the queries rely on.
///
/// All tables are created inside a single exclusive SQL transaction, so either
/// every table exists afterwards or none of the changes are applied.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;
    register_functions(connection)?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_transaction_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Register [UNICODE_LOWER] on `connection`.
///
/// Functions live on the connection, not in the database file, so this must
/// run for every newly opened connection.
fn register_functions(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.create_scalar_function(
        UNICODE_LOWER,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |context| {
            let text: String = context.get(0)?;
            Ok(text.to_lowercase())
        },
    )
}

/// Lock the shared database connection.
///
/// # Errors
/// Returns an [Error::DatabaseLockError] if the lock has been poisoned by a
/// thread that panicked while holding it.
pub fn acquire_connection(
    connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    connection.lock().map_err(|error| {
        tracing::error!("Could not acquire database lock: {error}");
        Error::DatabaseLockError
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::{UNICODE_LOWER, initialize};

    #[test]
    fn initialize_creates_tables() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        let table_count: i64 = connection
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'table' AND name IN ('user', 'transaction')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(table_count, 2);
    }

    #[test]
    fn initialize_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        assert!(initialize(&connection).is_ok());
    }

    #[test]
    fn unicode_lower_folds_non_ascii() {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();

        let lowered: String = connection
            .query_row(&format!("SELECT {UNICODE_LOWER}('CAFÉ Élan')"), [], |row| {
                row.get(0)
            })
            .unwrap();

        assert_eq!(lowered, "café élan");
    }
}
