//! HTTP handlers, grouped by resource.

pub mod chat;
pub mod emails;
pub mod ingest;
pub mod knowledge;
pub mod stats;
pub mod tasks;

use axum::extract::State;
use serde::Serialize;

use crate::error::{ok, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Banner {
    message: &'static str,
    version: &'static str,
    model_backend: String,
}

pub async fn root(State(state): State<AppState>) -> ApiResult<Banner> {
    ok(Banner {
        message: "Notia智能邮件助手API",
        version: env!("CARGO_PKG_VERSION"),
        model_backend: state.service.model_name().to_string(),
    })
}

/// Parses an optional query value, treating empty strings as absent.
pub(crate) fn parse_optional<T>(raw: Option<&str>) -> Result<Option<T>, T::Err>
where
    T: std::str::FromStr,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => value.parse().map(Some),
        None => Ok(None),
    }
}
