//! Defines functions for handling user authentication with cookies.

use std::cmp::max;

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, Key, SameSite},
};
use sha2::{Digest, Sha512};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    auth::{Token, UserID},
};

/// The name of the cookie holding the serialized [Token].
pub(crate) const COOKIE_TOKEN: &str = "token";
/// The default duration for which auth cookies are valid.
pub const DEFAULT_COOKIE_DURATION: Duration = Duration::minutes(5);

/// Derive the key for encrypting auth cookies from `secret`.
///
/// The same secret always gives the same key.
pub fn cookie_key_from_secret(secret: &str) -> Key {
    Key::from(&Sha512::digest(secret))
}

/// Add an auth cookie to the cookie jar, indicating that a user is logged in and authenticated.
///
/// The token and the cookie both expire `duration` from now.
///
/// # Errors
///
/// Returns an [Error::TokenError] if the token cannot be serialized.
pub fn set_auth_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let expires_at = OffsetDateTime::now_utc() + duration;

    set_token_cookie(
        jar,
        Token {
            user_id,
            expires_at,
        },
    )
}

fn set_token_cookie(jar: PrivateCookieJar, token: Token) -> Result<PrivateCookieJar, Error> {
    let token_string =
        serde_json::to_string(&token).map_err(|error| Error::TokenError(error.to_string()))?;

    Ok(jar.add(
        Cookie::build((COOKIE_TOKEN, token_string))
            .expires(token.expires_at)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true)
            .path("/"),
    ))
}

/// Set the auth cookie to an invalid value and set its max age to zero, which should delete the cookie on the client side.
pub fn invalidate_auth_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_TOKEN, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true)
            .path("/"),
    )
}

/// Read and validate the auth token in `jar`.
///
/// # Errors
///
/// Returns an [Error::NotAuthenticated] if the cookie is missing, cannot be
/// parsed, or the token has expired.
pub(crate) fn get_token_from_cookies(jar: &PrivateCookieJar) -> Result<Token, Error> {
    let cookie = jar.get(COOKIE_TOKEN).ok_or(Error::NotAuthenticated)?;
    let token: Token =
        serde_json::from_str(cookie.value_trimmed()).map_err(|_| Error::NotAuthenticated)?;

    if token.is_valid_at(OffsetDateTime::now_utc()) {
        Ok(token)
    } else {
        Err(Error::NotAuthenticated)
    }
}

/// Set the expiry of the auth cookie in `jar` to the latest of UTC now
/// plus `duration` and the token's current expiry.
///
/// # Errors
///
/// The cookie jar is not modified if an error is returned.
pub(crate) fn extend_auth_cookie_duration_if_needed(
    jar: PrivateCookieJar,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let token = get_token_from_cookies(&jar)?;
    let new_expiry = OffsetDateTime::now_utc()
        .checked_add(duration)
        .ok_or_else(|| Error::TokenError("cookie expiry overflowed".to_owned()))?;

    set_token_cookie(
        jar,
        Token {
            user_id: token.user_id,
            expires_at: max(token.expires_at, new_expiry),
        },
    )
}
