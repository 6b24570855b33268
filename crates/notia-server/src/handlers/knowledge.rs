use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use notia::db::knowledge_repo::KnowledgeRecord;

use crate::error::{ok, ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddKnowledgeRequest {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    source: Option<String>,
}

pub async fn add_knowledge(
    State(state): State<AppState>,
    request: Result<Json<AddKnowledgeRequest>, JsonRejection>,
) -> ApiResult<KnowledgeRecord> {
    let Json(request) = request.map_err(ApiError::rejected)?;
    ok(state.service.add_knowledge(
        &request.title,
        &request.content,
        request.source.as_deref(),
    )?)
}

pub async fn list_knowledge(State(state): State<AppState>) -> ApiResult<Vec<KnowledgeRecord>> {
    ok(state.service.list_knowledge()?)
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    query: String,
}

pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Vec<KnowledgeRecord>> {
    let Query(params) = params.map_err(ApiError::rejected)?;
    ok(state.service.search_knowledge(&params.query)?)
}
