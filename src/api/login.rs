use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use super::context::{HOME_ROUTE, RequestContext, USER_LIST_ROUTE};
use super::validation::{validate_password_present, validate_user_name_present};
use super::{ApiError, ApiResponse, AppState, CredentialsForm, SignInPageDto};

/// GET /log/in
pub async fn sign_in_page(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Response, ApiError> {
    if ctx.access(state.credentials().as_ref()).await?.is_granted() {
        return Ok(Redirect::to(USER_LIST_ROUTE).into_response());
    }

    Ok(Json(ApiResponse::success(SignInPageDto::default())).into_response())
}

/// POST /log/in
/// Authenticate with name and password and bind the identity to the session
pub async fn sign_in(
    State(state): State<Arc<AppState>>,
    mut ctx: RequestContext,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, ApiError> {
    validate_user_name_present(&form.name)?;
    validate_password_present(&form.pass)?;

    let identity = match state.credentials().authenticate(&form.name, &form.pass).await {
        Ok(identity) => identity,
        Err(e) => {
            // Internal failures are not login failures; the shared message
            // only covers unknown names and wrong passwords.
            if e.is_bad_credentials() {
                metrics::counter!("usergate_logins_total", "outcome" => "rejected").increment(1);
                tracing::debug!("Sign-in rejected: {e}");
            }
            return Err(e.into());
        }
    };

    metrics::counter!("usergate_logins_total", "outcome" => "success").increment(1);
    tracing::Span::current().record("user_id", identity.id);
    tracing::info!(user_id = identity.id, "User signed in");

    ctx.sign_in(identity).await?;

    Ok(Redirect::to(USER_LIST_ROUTE).into_response())
}

/// GET|POST /log/out
/// Ends the session (if any) and returns to the homepage
pub async fn sign_out(mut ctx: RequestContext) -> Result<Redirect, ApiError> {
    if let Some(identity) = ctx.identity() {
        tracing::info!(user_id = identity.id, "User signed out");
    }

    ctx.sign_out().await?;

    Ok(Redirect::to(HOME_ROUTE))
}
