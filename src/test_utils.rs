#![allow(missing_docs)]

use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::json;

use crate::{
    AppState, PaginationConfig,
    auth::{COOKIE_TOKEN, PasswordHash, User, create_user},
    build_router, endpoints, initialize_db,
};

/// Bcrypt's minimum cost, keeps tests fast.
const TEST_HASH_COST: u32 = 4;

pub(crate) const TEST_PASSWORD: &str = "averysecurepassword123";

#[track_caller]
pub(crate) fn must_create_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("could not create in-memory SQLite database");
    initialize_db(&connection).expect("could not initialize test database");

    connection
}

#[track_caller]
pub(crate) fn create_test_user(email: &str, password: &str, connection: &Connection) -> User {
    let password_hash = PasswordHash::from_raw_password(password, TEST_HASH_COST)
        .expect("could not hash test password");

    create_user(email, password_hash, connection).expect("could not create test user")
}

/// Start a server over a fresh in-memory database with the full router.
pub(crate) fn get_test_server() -> TestServer {
    let connection =
        Connection::open_in_memory().expect("could not create in-memory SQLite database");
    let state = AppState::new(connection, "42", PaginationConfig::default())
        .expect("could not create app state");

    TestServer::try_new(build_router(state)).expect("could not create test server")
}

/// Register `email` and log in, returning the auth cookie for later requests.
pub(crate) async fn sign_up(
    server: &TestServer,
    email: &str,
) -> axum_extra::extract::cookie::Cookie<'static> {
    server
        .post(endpoints::USERS)
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .await
        .assert_status(axum::http::StatusCode::CREATED);

    let response = server
        .post(endpoints::LOG_IN)
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .await;
    response.assert_status_ok();

    response.cookie(COOKIE_TOKEN)
}
