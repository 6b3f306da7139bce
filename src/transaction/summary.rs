//! Aggregates over all of a user's transactions: spending totals and the set of categories in use.

use std::collections::BTreeMap;

use axum::{Extension, Json, extract::State};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{Error, auth::UserID, db::acquire_connection, transaction::core::TransactionState};

/// The total of a user's transactions, overall and per category.
#[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// The sum of the amounts of every transaction.
    pub total_expense: f64,
    /// The sum of the amounts for each category that has at least one transaction.
    pub category_breakdown: BTreeMap<String, f64>,
}

/// A route handler for summarising the caller's transactions.
pub async fn get_summary_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Summary>, Error> {
    let connection = acquire_connection(&state.db_connection)?;

    Ok(Json(get_summary(user_id, &connection)?))
}

/// A route handler for listing the distinct categories the caller has used.
pub async fn get_categories_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<Vec<String>>, Error> {
    let connection = acquire_connection(&state.db_connection)?;

    Ok(Json(get_categories(user_id, &connection)?))
}

/// Sum the amounts of all of `user_id`'s transactions, overall and by category.
///
/// Amounts are added in insertion order so repeated calls give identical totals.
///
/// # Errors
/// This function will return a [Error::SqlError] there is a SQL error.
pub fn get_summary(user_id: UserID, connection: &Connection) -> Result<Summary, Error> {
    let mut statement = connection.prepare(
        "SELECT category, amount FROM \"transaction\" WHERE user_id = ?1 ORDER BY id ASC",
    )?;
    let rows = statement.query_map([user_id.as_i64()], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
    })?;

    let mut summary = Summary::default();

    for row in rows {
        let (category, amount) = row?;
        summary.total_expense += amount;
        *summary.category_breakdown.entry(category).or_insert(0.0) += amount;
    }

    Ok(summary)
}

/// Get the distinct categories of `user_id`'s transactions in alphabetical order.
///
/// # Errors
/// This function will return a [Error::SqlError] there is a SQL error.
pub fn get_categories(user_id: UserID, connection: &Connection) -> Result<Vec<String>, Error> {
    connection
        .prepare(
            "SELECT DISTINCT category FROM \"transaction\" WHERE user_id = ?1 ORDER BY category",
        )?
        .query_map([user_id.as_i64()], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()
        .map_err(Error::from)
}
