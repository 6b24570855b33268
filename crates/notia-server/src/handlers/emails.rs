use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use serde::Deserialize;

use notia::db::email_repo::{EmailFilter, EmailRecord};
use notia::Category;

use super::parse_optional;
use crate::error::{ok, ApiError, ApiResult};
use crate::state::AppState;

/// Upper bound on a single page of emails.
const MAX_LIMIT: u32 = 500;

#[derive(Debug, Default, Deserialize)]
pub struct EmailsQuery {
    category: Option<String>,
    limit: Option<u32>,
    offset: Option<u32>,
}

pub async fn list_emails(
    State(state): State<AppState>,
    query: Result<Query<EmailsQuery>, QueryRejection>,
) -> ApiResult<Vec<EmailRecord>> {
    let Query(query) = query.map_err(ApiError::rejected)?;
    let filter = EmailFilter {
        category: parse_optional::<Category>(query.category.as_deref())?,
        limit: query.limit.map(|l| l.clamp(1, MAX_LIMIT)),
        offset: query.offset,
    };
    ok(state.service.list_emails(&filter)?)
}
