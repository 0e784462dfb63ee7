use axum::{body::Bytes, extract::rejection::BytesRejection, http::StatusCode};
use serde_json::Value;

use crate::{error::AppError, project::Project};

pub fn get_project_from_body(body: &Bytes) -> Result<Project, AppError> {
    let body: Value = serde_json::from_slice(body).map_err(|_| AppError::MalformedPayload)?;

    Project::from_body(&body)
}

/// Body that could not be buffered, usually because it went over the body limit.
pub fn payload_error(rejection: BytesRejection) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::MalformedPayload
    }
}

/// First value for `name`, later repeats are ignored.
pub fn first_param(params: &[(String, String)], name: &str) -> Option<String> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.clone())
}

/// `?id=` must be present and non-empty.
pub fn required_id(id: Option<String>) -> Result<String, AppError> {
    id.filter(|id| !id.is_empty())
        .ok_or(AppError::MissingProjectId)
}
