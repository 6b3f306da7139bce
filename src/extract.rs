//! Request extractors whose rejections are reported as [Error] JSON bodies.

use axum::extract::{
    FromRequest, FromRequestParts,
    rejection::{JsonRejection, PathRejection},
};

use crate::Error;

/// Like [axum::Json], but a body that cannot be parsed is rejected with
/// [Error::InvalidBody].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct AppJson<T>(pub T);

/// Like [axum::extract::Path], but a parameter that cannot be parsed is
/// rejected with [Error::InvalidPath].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(Error))]
pub struct AppPath<T>(pub T);

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected request body: {}", rejection.body_text());
        Error::InvalidBody
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("Rejected path parameters: {}", rejection.body_text());
        Error::InvalidPath
    }
}
