use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::ACCESS_CONTROL_ALLOW_ORIGIN},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::database::StoreError;

pub const SAVE_FAILED: &str = "Failed to save project";
pub const LIST_FAILED: &str = "Failed to list projects";
pub const GET_FAILED: &str = "Failed to fetch project";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized: Authentication Failed")]
    AuthenticationFailed,

    #[error("Unauthorized: User Not Found")]
    UserNotFound,

    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Payload too large")]
    PayloadTooLarge,

    #[error("Project not found or missing source image")]
    MissingProjectFields,

    #[error("Missing project id")]
    MissingProjectId,

    #[error("Project not found")]
    ProjectNotFound,

    #[error("{action}")]
    Internal {
        action: &'static str,
        #[source]
        source: StoreError,
    },
}

impl AppError {
    /// Wraps a store failure under the route's own message.
    pub fn internal(action: &'static str) -> impl FnOnce(StoreError) -> AppError {
        move |source| AppError::Internal { action, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::AuthenticationFailed | AppError::UserNotFound => StatusCode::UNAUTHORIZED,
            AppError::MalformedPayload
            | AppError::MissingProjectFields
            | AppError::MissingProjectId => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::ProjectNotFound => StatusCode::NOT_FOUND,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("error".to_string(), Value::String(self.to_string()));

        if let AppError::Internal { source, .. } = self {
            body.insert("message".to_string(), Value::String(source.to_string()));
        }

        Value::Object(body)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal { action, source } = &self {
            tracing::error!("{action}: {source}");
        }

        let mut response = (self.status(), Json(self.body())).into_response();
        response
            .headers_mut()
            .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));

        response
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::to_bytes,
        http::{StatusCode, header::ACCESS_CONTROL_ALLOW_ORIGIN},
        response::IntoResponse,
    };
    use serde_json::{Value, json};

    use super::{AppError, SAVE_FAILED};
    use crate::database::StoreError;

    async fn parts(error: AppError) -> (StatusCode, Option<String>, Value) {
        let response = error.into_response();
        let status = response.status();
        let origin = response
            .headers()
            .get(ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|value| value.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, origin, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_client_errors() {
        let (status, origin, body) = parts(AppError::UserNotFound).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(origin.as_deref(), Some("*"));
        assert_eq!(body, json!({ "error": "Unauthorized: User Not Found" }));

        let (status, _, body) = parts(AppError::MissingProjectId).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Missing project id" }));

        let (status, _, _) = parts(AppError::ProjectNotFound).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, body) = parts(AppError::PayloadTooLarge).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body, json!({ "error": "Payload too large" }));
    }

    #[tokio::test]
    async fn test_internal_carries_message() {
        let error = AppError::internal(SAVE_FAILED)(StoreError::Unavailable("down".to_string()));
        let (status, origin, body) = parts(error).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(origin.as_deref(), Some("*"));
        assert_eq!(
            body,
            json!({
                "error": "Failed to save project",
                "message": "Store unavailable: down",
            })
        );
    }
}
