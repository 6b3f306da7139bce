//! The state shared by every route handler.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use time::Duration;

use crate::{
    Error,
    auth::{DEFAULT_COOKIE_DURATION, cookie_key_from_secret},
    db::initialize,
    pagination::PaginationConfig,
};

/// Everything the router needs to serve requests.
///
/// Handlers take a narrower state built from this one with [FromRef].
#[derive(Debug, Clone)]
pub struct AppState {
    /// Encrypts the private auth cookie.
    pub cookie_key: Key,
    /// How long a session lasts when the user did not ask to be remembered.
    pub cookie_duration: Duration,
    /// Page size limits for transaction listings.
    pub pagination_config: PaginationConfig,
    /// The single connection shared by all handlers.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Prepare `db_connection` for serving and bundle it with the server settings.
    ///
    /// The cookie key is derived from `cookie_secret`, so sessions survive a
    /// restart with the same secret.
    ///
    /// # Errors
    /// Returns an [Error::SqlError] if the schema or the SQL functions cannot
    /// be set up on `db_connection`.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        pagination_config: PaginationConfig,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            cookie_key: cookie_key_from_secret(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            pagination_config,
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }
}

// Lets `PrivateCookieJar` extract directly from the router state, e.g. in log-out.
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}
