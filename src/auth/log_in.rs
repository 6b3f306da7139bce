//! The endpoint for logging in with an email and password.
//! The cookie module handles the lower level cookie auth logic.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error,
    auth::{User, get_user_by_email, set_auth_cookie},
    db::acquire_connection,
    extract::AppJson,
};

/// How long the auth cookie should last if the user selects "remember me" at log-in.
const REMEMBER_ME_COOKIE_DURATION: Duration = Duration::days(7);

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// The JSON body of a log-in request.
#[derive(Debug, Deserialize)]
pub struct LogInData {
    /// The email the user registered with.
    pub email: String,
    /// Password entered during log-in.
    pub password: String,
    /// Whether to keep the user logged in for a week.
    #[serde(default)]
    pub remember_me: bool,
}

/// Handler for log-in requests.
///
/// On success the auth cookie is set and the user is returned as JSON.
///
/// # Errors
///
/// Returns an [Error::InvalidCredentials] if the email is not registered or the
/// password is wrong, so clients cannot tell which of the two was incorrect.
pub async fn post_log_in(
    State(state): State<LoginState>,
    jar: PrivateCookieJar,
    AppJson(user_data): AppJson<LogInData>,
) -> Result<(PrivateCookieJar, Json<User>), Error> {
    let email = user_data.email.trim().to_lowercase();
    let user = {
        let connection = acquire_connection(&state.db_connection)?;

        match get_user_by_email(&email, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return Err(Error::InvalidCredentials),
            Err(error) => return Err(error),
        }
    };

    let password_hash = user.password_hash.clone();
    let password = user_data.password;
    let is_password_valid =
        tokio::task::spawn_blocking(move || password_hash.verify(&password))
            .await
            .map_err(|error| Error::HashingError(error.to_string()))?
            .map_err(|error| Error::HashingError(error.to_string()))?;

    if !is_password_valid {
        tracing::info!("Failed log-in attempt for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    let cookie_duration = if user_data.remember_me {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    let jar = set_auth_cookie(jar, user.id, cookie_duration)?;

    Ok((jar, Json(user)))
}
