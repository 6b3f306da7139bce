//! Lists a page of the caller's transactions with optional search, category, and date filters.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
};
use rusqlite::{Connection, ToSql, params_from_iter};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    auth::UserID,
    db::{UNICODE_LOWER, acquire_connection},
    pagination::{Page, PaginationConfig},
    transaction::core::{TRANSACTION_COLUMNS, Transaction, map_transaction_row, parse_date},
};

/// The category value that clients send to mean "every category".
const ALL_CATEGORIES: &str = "All";

/// The state needed to list transactions.
#[derive(Debug, Clone)]
pub struct ListTransactionsState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The config that controls how to page transactions.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for ListTransactionsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// The raw query string of a list request.
///
/// Paging values are kept as strings so that malformed numbers fall back to
/// the defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTransactionsQuery {
    page: Option<String>,
    limit: Option<String>,
    search: Option<String>,
    category: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
}

/// Restricts which of a user's transactions are listed.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransactionFilter {
    /// Case-insensitive substring that the title must contain.
    pub search: Option<String>,
    /// The exact category to match.
    pub category: Option<String>,
    /// The earliest date to include.
    pub start_date: Option<Date>,
    /// The latest date to include.
    pub end_date: Option<Date>,
}

impl TryFrom<&ListTransactionsQuery> for TransactionFilter {
    type Error = Error;

    fn try_from(query: &ListTransactionsQuery) -> Result<Self, Self::Error> {
        let non_empty = |value: &Option<String>| value.clone().filter(|value| !value.is_empty());

        let parse_optional_date = |value: &Option<String>| -> Result<Option<Date>, Error> {
            non_empty(value).map(|date| parse_date(&date)).transpose()
        };

        Ok(Self {
            search: non_empty(&query.search),
            category: non_empty(&query.category).filter(|category| category != ALL_CATEGORIES),
            start_date: parse_optional_date(&query.start_date)?,
            end_date: parse_optional_date(&query.end_date)?,
        })
    }
}

/// A page of transactions and the information needed to fetch the other pages.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    /// The transactions on this page, most recent first.
    pub transactions: Vec<Transaction>,
    /// The 1-based page number.
    pub current_page: u64,
    /// The number of pages needed to show every matching transaction.
    pub total_pages: u64,
    /// The number of transactions matching the filter across all pages.
    pub total_transactions: u64,
}

/// A route handler for listing the caller's transactions.
pub async fn get_transactions_endpoint(
    State(state): State<ListTransactionsState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<TransactionPage>, Error> {
    let filter = TransactionFilter::try_from(&query)?;
    let page = Page::from_query(
        query.page.as_deref(),
        query.limit.as_deref(),
        &state.pagination_config,
    );

    let connection = acquire_connection(&state.db_connection)?;
    let transaction_page = query_transactions(user_id, &filter, page, &connection)?;

    Ok(Json(transaction_page))
}

/// Fetch one page of `user_id`'s transactions that match `filter`, sorted by date descending.
///
/// The count and the page are read inside one SQL transaction so the totals
/// describe the same snapshot as the returned rows.
///
/// # Errors
/// This function will return a [Error::SqlError] there is a SQL error.
pub fn query_transactions(
    user_id: UserID,
    filter: &TransactionFilter,
    page: Page,
    connection: &Connection,
) -> Result<TransactionPage, Error> {
    let mut where_clause_parts = vec!["user_id = ?1".to_owned()];
    let mut query_parameters: Vec<Box<dyn ToSql>> = vec![Box::new(user_id.as_i64())];

    if let Some(search) = &filter.search {
        where_clause_parts.push(format!(
            "instr({UNICODE_LOWER}(title), ?{}) > 0",
            query_parameters.len() + 1
        ));
        query_parameters.push(Box::new(search.to_lowercase()));
    }

    if let Some(category) = &filter.category {
        where_clause_parts.push(format!("category = ?{}", query_parameters.len() + 1));
        query_parameters.push(Box::new(category.clone()));
    }

    if let Some(start_date) = filter.start_date {
        where_clause_parts.push(format!("date >= ?{}", query_parameters.len() + 1));
        query_parameters.push(Box::new(start_date));
    }

    if let Some(end_date) = filter.end_date {
        where_clause_parts.push(format!("date <= ?{}", query_parameters.len() + 1));
        query_parameters.push(Box::new(end_date));
    }

    let where_clause = where_clause_parts.join(" AND ");
    let sql_transaction = connection.unchecked_transaction()?;

    let total_transactions: i64 = sql_transaction.query_row(
        &format!("SELECT COUNT(id) FROM \"transaction\" WHERE {where_clause}"),
        params_from_iter(query_parameters.iter()),
        |row| row.get(0),
    )?;

    let limit_index = query_parameters.len() + 1;
    let query_string = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE {where_clause} \
         ORDER BY date DESC, id DESC LIMIT ?{limit_index} OFFSET ?{}",
        limit_index + 1
    );
    query_parameters.push(Box::new(i64::try_from(page.size).unwrap_or(i64::MAX)));
    query_parameters.push(Box::new(i64::try_from(page.offset()).unwrap_or(i64::MAX)));

    let transactions = sql_transaction
        .prepare(&query_string)?
        .query_map(params_from_iter(query_parameters.iter()), map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;

    sql_transaction.commit()?;

    let total_transactions = u64::try_from(total_transactions).unwrap_or_default();

    Ok(TransactionPage {
        transactions,
        current_page: page.number,
        total_pages: page.page_count(total_transactions),
        total_transactions,
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::{Date, Duration, macros::date};

    use crate::{
        Error,
        auth::User,
        pagination::Page,
        test_utils::{create_test_user, must_create_test_connection},
        transaction::{
            core::{Transaction, create_transaction},
            list_endpoint::{
                ListTransactionsQuery, TransactionFilter, TransactionPage, query_transactions,
            },
        },
    };

    fn setup() -> (Connection, User) {
        let connection = must_create_test_connection();
        let user = create_test_user("alice@example.com", "averysecurepassword123", &connection);

        (connection, user)
    }

    fn add(connection: &Connection, user: &User, title: &str, category: &str, date: Date) {
        create_transaction(
            user.id,
            Transaction::build(title, 1.0, category, date),
            connection,
        )
        .expect("could not create test transaction");
    }

    fn list(connection: &Connection, user: &User, filter: TransactionFilter) -> TransactionPage {
        query_transactions(user.id, &filter, Page { number: 1, size: 100 }, connection).unwrap()
    }

    fn titles(page: &TransactionPage) -> Vec<&str> {
        page.transactions
            .iter()
            .map(|transaction| transaction.title.as_str())
            .collect()
    }

    #[test]
    fn second_page_of_twelve() {
        let (connection, user) = setup();
        let start = date!(2024 - 01 - 01);
        for i in 0..12 {
            add(
                &connection,
                &user,
                &format!("T{i}"),
                "Food",
                start + Duration::days(i),
            );
        }

        let got = query_transactions(
            user.id,
            &TransactionFilter::default(),
            Page { number: 2, size: 5 },
            &connection,
        )
        .unwrap();

        // Ranked by date descending T11..T0, so ranks 6-10 are T6..T2.
        assert_eq!(titles(&got), ["T6", "T5", "T4", "T3", "T2"]);
        assert_eq!(got.current_page, 2);
        assert_eq!(got.total_pages, 3);
        assert_eq!(got.total_transactions, 12);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let (connection, user) = setup();
        add(&connection, &user, "Only", "Food", date!(2024 - 01 - 01));

        let got = query_transactions(
            user.id,
            &TransactionFilter::default(),
            Page { number: 4, size: 5 },
            &connection,
        )
        .unwrap();

        assert!(got.transactions.is_empty());
        assert_eq!(got.total_transactions, 1);
        assert_eq!(got.total_pages, 1);
    }

    #[test]
    fn only_lists_callers_transactions() {
        let (connection, alice) = setup();
        let bob = create_test_user("bob@example.com", "averysecurepassword123", &connection);
        add(&connection, &alice, "Alice's", "Food", date!(2024 - 01 - 01));
        add(&connection, &bob, "Bob's", "Food", date!(2024 - 01 - 01));

        let got = list(&connection, &alice, TransactionFilter::default());

        assert_eq!(titles(&got), ["Alice's"]);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let (connection, user) = setup();
        add(&connection, &user, "Morning COFFEE", "Food", date!(2024 - 01 - 02));
        add(&connection, &user, "Groceries", "Food", date!(2024 - 01 - 01));

        let got = list(
            &connection,
            &user,
            TransactionFilter {
                search: Some("coff".to_owned()),
                ..Default::default()
            },
        );

        assert_eq!(titles(&got), ["Morning COFFEE"]);
    }

    #[test]
    fn search_is_case_insensitive_for_non_ascii() {
        let (connection, user) = setup();
        add(&connection, &user, "Café Élan", "Food", date!(2024 - 01 - 02));
        add(&connection, &user, "Cafeteria", "Food", date!(2024 - 01 - 01));

        for search in ["CAFÉ", "élan", "É"] {
            let got = list(
                &connection,
                &user,
                TransactionFilter {
                    search: Some(search.to_owned()),
                    ..Default::default()
                },
            );

            assert_eq!(titles(&got), ["Café Élan"], "search {search:?}");
        }
    }

    #[test]
    fn search_treats_wildcards_literally() {
        let (connection, user) = setup();
        add(&connection, &user, "100% juice", "Food", date!(2024 - 01 - 02));
        add(&connection, &user, "100 apples", "Food", date!(2024 - 01 - 01));

        let got = list(
            &connection,
            &user,
            TransactionFilter {
                search: Some("0%".to_owned()),
                ..Default::default()
            },
        );

        assert_eq!(titles(&got), ["100% juice"]);
    }

    #[test]
    fn category_filter_matches_exactly() {
        let (connection, user) = setup();
        add(&connection, &user, "Coffee", "Food", date!(2024 - 01 - 02));
        add(&connection, &user, "Fast food", "Food & Drink", date!(2024 - 01 - 01));

        let got = list(
            &connection,
            &user,
            TransactionFilter {
                category: Some("Food".to_owned()),
                ..Default::default()
            },
        );

        assert_eq!(titles(&got), ["Coffee"]);
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let (connection, user) = setup();
        add(&connection, &user, "Before", "Food", date!(2024 - 01 - 01));
        add(&connection, &user, "Start", "Food", date!(2024 - 01 - 02));
        add(&connection, &user, "End", "Food", date!(2024 - 01 - 04));
        add(&connection, &user, "After", "Food", date!(2024 - 01 - 05));

        let got = list(
            &connection,
            &user,
            TransactionFilter {
                start_date: Some(date!(2024 - 01 - 02)),
                end_date: Some(date!(2024 - 01 - 04)),
                ..Default::default()
            },
        );

        assert_eq!(titles(&got), ["End", "Start"]);
    }

    #[test]
    fn start_date_alone_is_open_ended() {
        let (connection, user) = setup();
        add(&connection, &user, "Before", "Food", date!(2024 - 01 - 01));
        add(&connection, &user, "After", "Food", date!(2024 - 06 - 01));

        let got = list(
            &connection,
            &user,
            TransactionFilter {
                start_date: Some(date!(2024 - 02 - 01)),
                ..Default::default()
            },
        );

        assert_eq!(titles(&got), ["After"]);
    }

    #[test]
    fn all_category_applies_no_filter() {
        let query = ListTransactionsQuery {
            category: Some("All".to_owned()),
            search: Some(String::new()),
            ..Default::default()
        };

        assert_eq!(
            TransactionFilter::try_from(&query),
            Ok(TransactionFilter::default())
        );
    }

    #[test]
    fn query_dates_are_parsed() {
        let query = ListTransactionsQuery {
            start_date: Some("2024-01-01".to_owned()),
            end_date: Some(String::new()),
            ..Default::default()
        };

        let filter = TransactionFilter::try_from(&query).unwrap();

        assert_eq!(filter.start_date, Some(date!(2024 - 01 - 01)));
        assert_eq!(filter.end_date, None);
    }

    #[test]
    fn invalid_query_date_is_rejected() {
        let query = ListTransactionsQuery {
            end_date: Some("not-a-date".to_owned()),
            ..Default::default()
        };

        assert!(matches!(
            TransactionFilter::try_from(&query),
            Err(Error::InvalidDate(_))
        ));
    }
}
