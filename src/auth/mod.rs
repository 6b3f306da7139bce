//! User registration, log-in, and the cookie-based auth guard that resolves the caller's identity.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod password;
mod register_user;
mod token;
mod user;

pub use cookie::{
    DEFAULT_COOKIE_DURATION, cookie_key_from_secret, invalidate_auth_cookie, set_auth_cookie,
};
pub use log_in::post_log_in;
pub use log_out::get_log_out;
pub use middleware::{AuthState, auth_guard};
pub use password::{PasswordHash, ValidatedPassword};
pub use register_user::register_user;
pub(crate) use token::Token;
pub use user::{User, UserID, create_user, create_user_table, get_user_by_email, parse_email};

#[cfg(test)]
pub(crate) use cookie::COOKIE_TOKEN;
