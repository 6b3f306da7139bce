//! Defines the endpoint for creating a new transaction.

use axum::{Extension, Json, extract::State, http::StatusCode};

use crate::{
    Error,
    auth::UserID,
    db::acquire_connection,
    extract::AppJson,
    transaction::core::{NewTransaction, Transaction, TransactionState, create_transaction},
};

/// A route handler for creating a new transaction owned by the caller.
///
/// Responds with the stored transaction, including its generated ID.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    AppJson(new_transaction): AppJson<NewTransaction>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let connection = acquire_connection(&state.db_connection)?;
    let transaction = create_transaction(user_id, new_transaction, &connection)?;

    tracing::debug!("User {user_id} created transaction {}", transaction.id);

    Ok((StatusCode::CREATED, Json(transaction)))
}
