//! JSON extractor whose rejections use the `{errorCode, errorMessage}` body

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    response::{IntoResponse, Response},
    Json as AxumJson,
};
use serde::de::DeserializeOwned;

use super::error::{ApiError, VALIDATION_ERROR};

/// Wrapper around `axum::Json` reporting bad bodies as [`ApiError`]
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match AxumJson::<T>::from_request(req, state).await {
            Ok(AxumJson(value)) => Ok(Json(value)),
            Err(rejection) => Err(ApiError::new(
                rejection.status(),
                VALIDATION_ERROR,
                rejection_message(&rejection),
            )),
        }
    }
}

fn rejection_message(rejection: &JsonRejection) -> String {
    match rejection {
        JsonRejection::JsonDataError(err) => format!("invalid request body: {}", err.body_text()),
        JsonRejection::JsonSyntaxError(err) => {
            format!("invalid json syntax: {}", err.body_text())
        }
        JsonRejection::MissingJsonContentType(_) => {
            "missing Content-Type header, expected 'application/json'".to_string()
        }
        JsonRejection::BytesRejection(err) => {
            format!("unable to read request body: {}", err.body_text())
        }
        _ => "invalid json request".to_string(),
    }
}

impl<T> IntoResponse for Json<T>
where
    T: serde::Serialize,
{
    fn into_response(self) -> Response {
        AxumJson(self.0).into_response()
    }
}
