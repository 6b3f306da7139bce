//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Extension, Json, Router, middleware,
    routing::{get, post, put},
};
use serde_json::{Value, json};

use crate::{
    AppState,
    auth::{UserID, auth_guard, get_log_out, post_log_in, register_user},
    endpoints,
    not_found::get_404_not_found,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, edit_transaction_endpoint,
        get_categories_endpoint, get_summary_endpoint, get_transactions_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::ROOT, get(get_health))
        .route(endpoints::USERS, post(register_user))
        .route(endpoints::LOG_IN, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out));

    let protected_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS,
            post(create_transaction_endpoint).get(get_transactions_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            put(edit_transaction_endpoint).delete(delete_transaction_endpoint),
        )
        .route(endpoints::TRANSACTIONS_SUMMARY, get(get_summary_endpoint))
        .route(
            endpoints::TRANSACTION_CATEGORIES,
            get(get_categories_endpoint),
        )
        .route(endpoints::WHOAMI, get(get_whoami))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Lets clients and load balancers check that the server is up.
async fn get_health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Lets a client check that its session is valid and which user it belongs to.
async fn get_whoami(Extension(user_id): Extension<UserID>) -> Json<Value> {
    Json(json!({ "message": "Protected route accessed", "userId": user_id }))
}
