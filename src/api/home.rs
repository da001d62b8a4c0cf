use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use super::context::{RequestContext, USER_LIST_ROUTE};
use super::{ApiError, ApiResponse, AppState, HomepageDto};

/// GET /
/// Signed-in users go straight to the user list; everyone else learns whether
/// the store is still empty (first-run bootstrap).
pub async fn homepage(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Response, ApiError> {
    let credentials = state.credentials();

    if ctx.access(credentials.as_ref()).await?.is_granted() {
        return Ok(Redirect::to(USER_LIST_ROUTE).into_response());
    }

    let is_empty = credentials.is_empty().await?;
    Ok(Json(ApiResponse::success(HomepageDto { is_empty })).into_response())
}
