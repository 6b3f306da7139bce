//! Defines the core data models and database queries for transactions.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Deserializer, Serialize};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{AppState, Error, auth::UserID, database_id::TransactionId};

// ============================================================================
// MODELS
// ============================================================================

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// The format of dates in JSON bodies and query strings, e.g. "2024-01-31".
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// An expense or income, i.e. an event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that created, and therefore owns, the transaction.
    pub user_id: UserID,
    /// A short label for the transaction.
    pub title: String,
    /// The amount of money spent or earned in this transaction.
    ///
    /// The sign convention is up to the client.
    pub amount: f64,
    /// A free-form label used for filtering and summaries.
    pub category: String,
    /// When the transaction happened.
    #[serde(with = "iso_date")]
    pub date: Date,
    /// Optional free text.
    pub notes: Option<String>,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [NewTransaction] for discoverability.
    pub fn build(title: &str, amount: f64, category: &str, date: Date) -> NewTransaction {
        NewTransaction {
            title: title.to_owned(),
            amount,
            category: category.to_owned(),
            date,
            notes: None,
        }
    }
}

/// The fields a client supplies to create a [Transaction].
///
/// The owner is never part of the request body, it always comes from the
/// caller's identity.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTransaction {
    /// A short label for the transaction.
    pub title: String,
    /// The amount of money spent or earned.
    pub amount: f64,
    /// A free-form label.
    pub category: String,
    /// When the transaction happened.
    #[serde(with = "iso_date")]
    pub date: Date,
    /// Optional free text.
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewTransaction {
    /// Set the notes for the transaction.
    pub fn notes(mut self, notes: Option<&str>) -> Self {
        self.notes = notes.map(str::to_owned);
        self
    }
}

/// A partial update to a [Transaction].
///
/// Fields that are `None` are left unchanged. For `notes`, `Some(None)` clears
/// the note. Any `userId` in the request body is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionUpdate {
    /// The new title.
    #[serde(default)]
    pub title: Option<String>,
    /// The new amount.
    #[serde(default)]
    pub amount: Option<f64>,
    /// The new category.
    #[serde(default)]
    pub category: Option<String>,
    /// The new date.
    #[serde(default, with = "iso_date::option")]
    pub date: Option<Date>,
    /// The new notes, `Some(None)` when the client sent `null`.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub notes: Option<Option<String>>,
}

impl TransactionUpdate {
    /// Whether the update would leave the transaction as it is.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.amount.is_none()
            && self.category.is_none()
            && self.date.is_none()
            && self.notes.is_none()
    }
}

/// Distinguishes a field that is absent from a field that is explicitly `null`.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Parse a date from a query string, e.g. "2024-01-31".
///
/// # Errors
/// Returns an [Error::InvalidDate] if `raw_date` is not a valid date.
pub fn parse_date(raw_date: &str) -> Result<Date, Error> {
    Date::parse(raw_date.trim(), DATE_FORMAT).map_err(|_| Error::InvalidDate(raw_date.to_owned()))
}

/// The state needed by the transaction endpoints that do not page results.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// The columns of the transaction table in the order expected by [map_transaction_row].
pub const TRANSACTION_COLUMNS: &str = "id, user_id, title, amount, category, date, notes";

/// Create the transaction table.
///
/// # Errors
/// Returns an error if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                amount REAL NOT NULL,
                category TEXT NOT NULL,
                date TEXT NOT NULL,
                notes TEXT,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_date
         ON \"transaction\"(user_id, date)",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [Transaction].
///
/// The row must contain [TRANSACTION_COLUMNS] in order.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        title: row.get(2)?,
        amount: row.get(3)?,
        category: row.get(4)?,
        date: row.get(5)?,
        notes: row.get(6)?,
    })
}

/// Create a new transaction owned by `user_id`.
///
/// # Errors
/// This function will return an [Error::SqlError] if there is an SQL error,
/// e.g. `user_id` does not refer to a registered user.
pub fn create_transaction(
    user_id: UserID,
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (user_id, title, amount, category, date, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                user_id.as_i64(),
                new_transaction.title,
                new_transaction.amount,
                new_transaction.category,
                new_transaction.date,
                new_transaction.notes,
            ),
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction by its `id`, regardless of who owns it.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id"
        ))?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Check that transaction `id` exists and is owned by `user_id`.
///
/// Callers that go on to modify the transaction should run this check and the
/// modification inside the same SQL transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - [Error::Unauthorized] if the transaction belongs to another user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn check_owner(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let owner_id: i64 = connection.query_row(
        "SELECT user_id FROM \"transaction\" WHERE id = ?1",
        [id],
        |row| row.get(0),
    )?;

    if owner_id == user_id.as_i64() {
        Ok(())
    } else {
        tracing::warn!("User {user_id} tried to access transaction {id} owned by user {owner_id}");
        Err(Error::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::date;

    use crate::{
        Error,
        auth::UserID,
        test_utils::{create_test_user, must_create_test_connection},
        transaction::core::{
            Transaction, TransactionUpdate, check_owner, create_transaction, get_transaction,
            parse_date,
        },
    };

    #[test]
    fn create_sets_owner_to_caller() {
        let connection = must_create_test_connection();
        let user = create_test_user("alice@example.com", "averysecurepassword123", &connection);

        let transaction = create_transaction(
            user.id,
            Transaction::build("Coffee", 4.5, "Food", date!(2024 - 01 - 01))
                .notes(Some("flat white")),
            &connection,
        )
        .unwrap();

        assert_eq!(transaction.user_id, user.id);
        assert_eq!(transaction.title, "Coffee");
        assert_eq!(transaction.notes.as_deref(), Some("flat white"));
        assert_eq!(get_transaction(transaction.id, &connection), Ok(transaction));
    }

    #[test]
    fn create_for_unknown_user_fails() {
        let connection = must_create_test_connection();

        let result = create_transaction(
            UserID::new(999),
            Transaction::build("Coffee", 4.5, "Food", date!(2024 - 01 - 01)),
            &connection,
        );

        assert!(matches!(result, Err(Error::SqlError(_))));
    }

    #[test]
    fn get_missing_transaction_is_not_found() {
        let connection = must_create_test_connection();

        assert_eq!(get_transaction(1, &connection), Err(Error::NotFound));
    }

    #[test]
    fn check_owner_distinguishes_missing_and_foreign() {
        let connection = must_create_test_connection();
        let alice = create_test_user("alice@example.com", "averysecurepassword123", &connection);
        let bob = create_test_user("bob@example.com", "averysecurepassword123", &connection);
        let transaction = create_transaction(
            alice.id,
            Transaction::build("Rent", 1200.0, "Housing", date!(2024 - 02 - 01)),
            &connection,
        )
        .unwrap();

        assert_eq!(check_owner(transaction.id, alice.id, &connection), Ok(()));
        assert_eq!(
            check_owner(transaction.id, bob.id, &connection),
            Err(Error::Unauthorized)
        );
        assert_eq!(
            check_owner(transaction.id + 1, alice.id, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn transaction_serializes_with_camel_case_and_iso_date() {
        let transaction = Transaction {
            id: 1,
            user_id: UserID::new(2),
            title: "Coffee".to_owned(),
            amount: 4.5,
            category: "Food".to_owned(),
            date: date!(2024 - 01 - 01),
            notes: None,
        };

        assert_eq!(
            serde_json::to_value(&transaction).unwrap(),
            json!({
                "id": 1,
                "userId": 2,
                "title": "Coffee",
                "amount": 4.5,
                "category": "Food",
                "date": "2024-01-01",
                "notes": null
            })
        );
    }

    #[test]
    fn update_distinguishes_missing_and_null_notes() {
        let absent: TransactionUpdate = serde_json::from_value(json!({"amount": 3.0})).unwrap();
        let null: TransactionUpdate = serde_json::from_value(json!({"notes": null})).unwrap();

        assert_eq!(absent.amount, Some(3.0));
        assert_eq!(absent.notes, None);
        assert_eq!(null.notes, Some(None));
    }

    #[test]
    fn update_ignores_user_id() {
        let update: TransactionUpdate =
            serde_json::from_value(json!({"userId": 99, "date": "2024-03-04"})).unwrap();

        assert_eq!(
            update,
            TransactionUpdate {
                date: Some(date!(2024 - 03 - 04)),
                ..Default::default()
            }
        );
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert_eq!(parse_date("2024-01-31"), Ok(date!(2024 - 01 - 31)));
        assert!(matches!(parse_date("yesterday"), Err(Error::InvalidDate(_))));
    }
}
