//! The endpoint for logging out a user.

use axum::Json;
use axum_extra::extract::PrivateCookieJar;
use serde_json::{Value, json};

use crate::auth::invalidate_auth_cookie;

/// Invalidate the auth cookie so that later requests are not authenticated.
pub async fn get_log_out(jar: PrivateCookieJar) -> (PrivateCookieJar, Json<Value>) {
    (
        invalidate_auth_cookie(jar),
        Json(json!({ "message": "Logged out" })),
    )
}

#[cfg(test)]
mod tests {
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use time::Duration;

    use crate::{
        Error,
        auth::{UserID, cookie::get_token_from_cookies, log_out::get_log_out, set_auth_cookie},
    };

    #[tokio::test]
    async fn log_out_invalidates_cookie() {
        let jar = set_auth_cookie(
            PrivateCookieJar::new(Key::generate()),
            UserID::new(1),
            Duration::minutes(5),
        )
        .unwrap();

        let (jar, _) = get_log_out(jar).await;

        assert_eq!(get_token_from_cookies(&jar), Err(Error::NotAuthenticated));
    }
}
