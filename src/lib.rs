//! Spendtrack is a backend for a personal finance tracker.
//!
//! This library provides a JSON REST API where authenticated users record, list,
//! filter, update, delete and summarise their monetary transactions.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;

mod app_state;
mod auth;
mod database_id;
mod db;
pub mod endpoints;
mod extract;
mod logging;
mod not_found;
mod pagination;
mod routing;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{PasswordHash, User, UserID, ValidatedPassword};
pub use db::initialize as initialize_db;
pub use logging::logging_middleware;
pub use pagination::PaginationConfig;
pub use routing::build_router;
pub use transaction::{NewTransaction, Summary, Transaction, TransactionPage, TransactionUpdate};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The JSON request body was missing, malformed, or did not have the expected fields.
    #[error("the request body is not valid JSON for this endpoint")]
    InvalidBody,

    /// A path parameter, e.g. a transaction ID, could not be parsed.
    #[error("the request path contains an invalid parameter")]
    InvalidPath,

    /// The resource exists but belongs to another user.
    #[error("not authorized to access this resource")]
    Unauthorized,

    /// A date in a query string could not be parsed.
    #[error("\"{0}\" is not a valid date, expected YYYY-MM-DD")]
    InvalidDate(String),

    /// The request did not carry a valid auth cookie.
    #[error("you must be logged in to access this resource")]
    NotAuthenticated,

    /// The email and password combination did not match a registered user.
    #[error("incorrect email or password")]
    InvalidCredentials,

    /// A user with the same email address is already registered.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// The user provided an email address that could not be parsed.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The auth token could not be written to or read from a cookie.
    #[error("could not process auth token: {0}")]
    TokenError(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                Some(ref desc),
            ) if desc.ends_with("user.email") => Error::DuplicateEmail,
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

/// The message sent to clients in place of the details of internal faults.
const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred";

/// The JSON body of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::InvalidDate(_) | Error::InvalidPath => StatusCode::BAD_REQUEST,
            Error::Unauthorized | Error::NotAuthenticated | Error::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Error::DuplicateEmail => StatusCode::CONFLICT,
            Error::InvalidBody | Error::InvalidEmail(_) | Error::TooWeak(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Error::HashingError(_)
            | Error::TokenError(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Error::NotFound => "not_found",
            Error::Unauthorized => "unauthorized",
            Error::InvalidBody => "invalid_body",
            Error::InvalidPath => "invalid_path",
            Error::InvalidDate(_) => "invalid_date",
            Error::NotAuthenticated => "not_authenticated",
            Error::InvalidCredentials => "invalid_credentials",
            Error::DuplicateEmail => "duplicate_email",
            Error::InvalidEmail(_) => "invalid_email",
            Error::TooWeak(_) => "password_too_weak",
            Error::HashingError(_) => "hashing_error",
            Error::TokenError(_) => "token_error",
            Error::SqlError(_) => "database_error",
            Error::DatabaseLockError => "database_lock_error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Internal details are for the server logs only.
            tracing::error!("An unexpected error occurred: {}", self);
            INTERNAL_ERROR_MESSAGE.to_owned()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            code: self.code(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
