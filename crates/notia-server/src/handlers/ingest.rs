use axum::extract::State;

use notia::IngestionSummary;

use crate::error::{ok, ApiResult};
use crate::state::AppState;

/// Runs one ingestion batch now. 409 while another run is active.
pub async fn process_emails(State(state): State<AppState>) -> ApiResult<IngestionSummary> {
    ok(state.service.trigger_ingestion().await?)
}
