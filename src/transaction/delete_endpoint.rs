use axum::{Extension, Json, extract::State};
use rusqlite::Connection;
use serde_json::{Value, json};

use crate::{
    Error,
    auth::UserID,
    database_id::TransactionId,
    db::acquire_connection,
    extract::AppPath,
    transaction::core::{TransactionState, check_owner},
};

/// A route handler for deleting one of the caller's transactions.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    AppPath(transaction_id): AppPath<TransactionId>,
) -> Result<Json<Value>, Error> {
    let connection = acquire_connection(&state.db_connection)?;
    delete_transaction(transaction_id, user_id, &connection)?;

    tracing::debug!("User {user_id} deleted transaction {transaction_id}");

    Ok(Json(json!({ "message": "Transaction deleted successfully" })))
}

/// Delete transaction `id` if it is owned by `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - [Error::Unauthorized] if the transaction belongs to another user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    check_owner(id, user_id, &sql_transaction)?;
    sql_transaction.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    sql_transaction.commit()?;

    Ok(())
}
