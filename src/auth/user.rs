//! Code for creating the user table and fetching users from the database.

use std::{fmt::Display, str::FromStr};

use email_address::EmailAddress;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, auth::PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered user of the application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The address the user logs in with.
    pub email: String,
    /// The user's password hash.
    #[serde(skip_serializing)]
    pub password_hash: PasswordHash,
}

/// Check that `raw_email` is a valid email address and normalise it to lower case.
///
/// # Errors
///
/// Returns an [Error::InvalidEmail] if `raw_email` is not a valid email address.
pub fn parse_email(raw_email: &str) -> Result<String, Error> {
    EmailAddress::from_str(raw_email.trim())
        .map(|email| email.as_str().to_lowercase())
        .map_err(|error| Error::InvalidEmail(error.to_string()))
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// `email` is expected to have been validated with [parse_email].
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateEmail] if a user with `email` already exists,
/// - or [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(
    email: &str,
    password_hash: PasswordHash,
    connection: &Connection,
) -> Result<User, Error> {
    connection.execute(
        "INSERT INTO user (email, password) VALUES (?1, ?2)",
        (email, password_hash.as_ref()),
    )?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        email: email.to_owned(),
        password_hash,
    })
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(2)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        email: row.get(1)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
    })
}

/// Get the user registered with `email`.
///
/// # Errors
///
/// Returns an [Error::NotFound] if no user has registered with `email`.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare("SELECT id, email, password FROM user WHERE email = :email")?
        .query_row(&[(":email", email)], map_user_row)
        .map_err(|error| error.into())
}
