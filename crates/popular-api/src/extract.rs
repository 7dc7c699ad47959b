//! Extractors whose rejections render as [`ApiError`] JSON bodies instead of
//! axum's plain-text defaults.

use axum::{
  extract::{
    FromRequest, FromRequestParts, Query, Request,
    rejection::{JsonRejection, QueryRejection},
  },
  http::request::Parts,
};

use crate::error::ApiError;

/// Drop-in replacement for `axum::Json<T>` on the request side.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
  axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
    let path = req.uri().path().to_owned();
    match axum::Json::<T>::from_request(req, state).await {
      Ok(axum::Json(value)) => Ok(JsonBody(value)),
      Err(rejection) => {
        tracing::debug!(%path, error = %rejection, "rejected request body");
        Err(ApiError::BadRequest(rejection.body_text()))
      }
    }
  }
}

/// Drop-in replacement for `axum::extract::Query<T>`.
pub struct QueryParams<T>(pub T);

impl<S, T> FromRequestParts<S> for QueryParams<T>
where
  Query<T>: FromRequestParts<S, Rejection = QueryRejection>,
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &S,
  ) -> Result<Self, Self::Rejection> {
    match Query::<T>::from_request_parts(parts, state).await {
      Ok(Query(value)) => Ok(QueryParams(value)),
      Err(rejection) => {
        tracing::debug!(path = %parts.uri.path(), error = %rejection, "rejected query");
        Err(ApiError::BadRequest(rejection.body_text()))
      }
    }
  }
}
