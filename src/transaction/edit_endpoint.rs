use axum::{Extension, Json, extract::State};
use rusqlite::{Connection, ToSql, params_from_iter};

use crate::{
    Error,
    auth::UserID,
    database_id::TransactionId,
    db::acquire_connection,
    extract::{AppJson, AppPath},
    transaction::core::{
        Transaction, TransactionState, TransactionUpdate, check_owner, get_transaction,
    },
};

/// A route handler for partially updating one of the caller's transactions.
///
/// Responds with the transaction as stored after the update.
pub async fn edit_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    AppPath(transaction_id): AppPath<TransactionId>,
    AppJson(update): AppJson<TransactionUpdate>,
) -> Result<Json<Transaction>, Error> {
    let connection = acquire_connection(&state.db_connection)?;
    let transaction = update_transaction(transaction_id, user_id, &update, &connection)?;

    Ok(Json(transaction))
}

/// Apply `update` to transaction `id` if it is owned by `user_id`.
///
/// The ownership check and the write happen in one SQL transaction. The owner
/// of a transaction can never be changed.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - [Error::Unauthorized] if the transaction belongs to another user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    user_id: UserID,
    update: &TransactionUpdate,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let sql_transaction = connection.unchecked_transaction()?;

    check_owner(id, user_id, &sql_transaction)?;

    if !update.is_empty() {
        let mut set_clause_parts = Vec::new();
        let mut query_parameters: Vec<Box<dyn ToSql>> = Vec::new();

        let mut set = |column: &str, value: Box<dyn ToSql>| {
            query_parameters.push(value);
            set_clause_parts.push(format!("{column} = ?{}", query_parameters.len()));
        };

        if let Some(title) = &update.title {
            set("title", Box::new(title.clone()));
        }
        if let Some(amount) = update.amount {
            set("amount", Box::new(amount));
        }
        if let Some(category) = &update.category {
            set("category", Box::new(category.clone()));
        }
        if let Some(date) = update.date {
            set("date", Box::new(date));
        }
        if let Some(notes) = &update.notes {
            set("notes", Box::new(notes.clone()));
        }

        let id_index = query_parameters.len() + 1;
        let query = format!(
            "UPDATE \"transaction\" SET {} WHERE id = ?{id_index} AND user_id = ?{}",
            set_clause_parts.join(", "),
            id_index + 1
        );
        query_parameters.push(Box::new(id));
        query_parameters.push(Box::new(user_id.as_i64()));

        sql_transaction.execute(&query, params_from_iter(query_parameters.iter()))?;
    }

    let transaction = get_transaction(id, &sql_transaction)?;
    sql_transaction.commit()?;

    Ok(transaction)
}
