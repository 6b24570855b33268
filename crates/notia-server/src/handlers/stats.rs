use axum::extract::State;

use notia::db::stats_repo::StatisticsSnapshot;

use crate::error::{ok, ApiResult};
use crate::state::AppState;

pub async fn statistics(State(state): State<AppState>) -> ApiResult<StatisticsSnapshot> {
    ok(state.service.statistics()?)
}
