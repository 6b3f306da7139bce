//! The endpoint for registering a new user.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::{PasswordHash, User, create_user, parse_email},
    db::acquire_connection,
    extract::AppJson,
};

/// The state needed to register a user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The JSON body of a registration request.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    /// The address the user will log in with.
    pub email: String,
    /// The user's chosen password in plain text.
    pub password: String,
}

/// A route handler for registering a new user.
///
/// Responds with 201 and the new user on success. The password hash is never
/// part of the response.
pub async fn register_user(
    State(state): State<RegistrationState>,
    AppJson(form): AppJson<RegisterForm>,
) -> Result<(StatusCode, Json<User>), Error> {
    let email = parse_email(&form.email)?;

    // bcrypt blocks for a long time, keep it off the async workers and outside the lock.
    let password = form.password;
    let password_hash = tokio::task::spawn_blocking(move || {
        PasswordHash::from_raw_password(&password, PasswordHash::DEFAULT_COST)
    })
    .await
    .map_err(|error| Error::HashingError(error.to_string()))??;

    let connection = acquire_connection(&state.db_connection)?;
    let user = create_user(&email, password_hash, &connection)?;
    tracing::info!("Registered user {}", user.id);

    Ok((StatusCode::CREATED, Json(user)))
}
