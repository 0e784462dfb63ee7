use axum::{
    Json,
    body::Bytes,
    extract::{
        Query,
        rejection::{BytesRejection, QueryRejection},
    },
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{
    auth::RequestContext,
    database::KvStore,
    error::{AppError, GET_FAILED, LIST_FAILED, SAVE_FAILED},
    project::{PROJECT_PREFIX, project_key, publish},
    utils::{first_param, get_project_from_body, payload_error, required_id},
};

/// Raw `?key=value` pairs in request order, repeats included.
pub type QueryPairs = Vec<(String, String)>;

#[derive(Serialize)]
pub struct SaveResponse {
    saved: bool,
    id: String,
    project: Value,
}

#[derive(Serialize)]
pub struct ListResponse {
    projects: Vec<Value>,
}

#[derive(Serialize)]
pub struct GetResponse {
    project: Value,
}

pub async fn save_handler(
    context: RequestContext,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<SaveResponse>, AppError> {
    let user = context.authorize().await?;
    let body = body.map_err(payload_error)?;
    let project = get_project_from_body(&body)?;

    let id = project.id.clone();
    let key = project.key();
    let payload = project.stamped(Utc::now());

    user.store()
        .set(&key, &payload)
        .await
        .map_err(AppError::internal(SAVE_FAILED))?;

    info!(user = %user.identity(), id = %id, "Saved project");

    Ok(Json(SaveResponse {
        saved: true,
        id,
        project: payload,
    }))
}

pub async fn list_handler(context: RequestContext) -> Result<Json<ListResponse>, AppError> {
    let user = context.authorize().await?;

    let entries = user
        .store()
        .list(PROJECT_PREFIX, true)
        .await
        .map_err(AppError::internal(LIST_FAILED))?;

    let projects = entries
        .into_iter()
        .filter(|entry| entry.key.starts_with(PROJECT_PREFIX))
        .filter_map(|entry| {
            let value = entry.value?;
            let published = publish(value);
            if published.is_none() {
                warn!(key = %entry.key, "Skipping project that is not a JSON object");
            }
            published
        })
        .collect();

    Ok(Json(ListResponse { projects }))
}

pub async fn get_handler(
    context: RequestContext,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> Result<Json<GetResponse>, AppError> {
    let user = context.authorize().await?;
    let params = match query {
        Ok(Query(params)) => params,
        Err(e) => {
            warn!("Ignoring unreadable query string: {e}");
            Vec::new()
        }
    };
    let id = required_id(first_param(&params, "id"))?;

    let project = user
        .store()
        .get(&project_key(&id))
        .await
        .map_err(AppError::internal(GET_FAILED))?
        .ok_or(AppError::ProjectNotFound)?;

    Ok(Json(GetResponse { project }))
}
