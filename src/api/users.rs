use axum::{
    Form, Json,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use super::context::{RequestContext, USER_LIST_ROUTE};
use super::validation::{
    validate_new_password, validate_new_user_name, validate_password_present,
    validate_user_name,
};
use super::{
    ApiError, ApiResponse, AppState, CreateUserPageDto, CredentialsForm, CurrentUserDto,
    EditUserForm, EditUserPageDto, UserDto, UserListDto,
};
use crate::services::{CredentialError, Identity};

/// Valid session identity, or the redirect the gate prescribes.
async fn require_identity(
    state: &AppState,
    ctx: &RequestContext,
) -> Result<Result<Identity, Redirect>, ApiError> {
    Ok(ctx.access(state.credentials().as_ref()).await?.require())
}

/// Creating users needs a valid session, except while the store is empty:
/// the very first account can be created by anyone.
async fn creation_gate(
    state: &AppState,
    ctx: &RequestContext,
) -> Result<Result<Option<Identity>, Redirect>, ApiError> {
    if state.credentials().is_empty().await? {
        return Ok(Ok(None));
    }

    let access = ctx.access(state.credentials().as_ref()).await?;
    Ok(access.require().map(Some))
}

/// GET /user
/// Lists all users (never their hashes)
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Response, ApiError> {
    let identity = match require_identity(&state, &ctx).await? {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let users = state
        .credentials()
        .list_users()
        .await?
        .into_iter()
        .map(UserDto::from)
        .collect();

    Ok(Json(ApiResponse::success(UserListDto {
        current: CurrentUserDto::from(identity),
        users,
    }))
    .into_response())
}

/// GET /user/create
pub async fn create_page(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Response, ApiError> {
    let current = match creation_gate(&state, &ctx).await? {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let is_empty = state.credentials().is_empty().await?;

    Ok(Json(ApiResponse::success(CreateUserPageDto {
        is_empty,
        current: current.map(CurrentUserDto::from),
    }))
    .into_response())
}

/// POST /user/create
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Form(form): Form<CredentialsForm>,
) -> Result<Response, ApiError> {
    let creator = match creation_gate(&state, &ctx).await? {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    validate_user_name(&form.name)?;
    validate_password_present(&form.pass)?;
    validate_new_password(&form.pass, state.config().security.min_password_length)?;

    match state.credentials().user_create(&form.name, &form.pass).await {
        Ok(id) => {
            if creator.is_none() {
                tracing::info!(user_id = id, "Bootstrap user created on empty store");
            }
            Ok(Redirect::to(USER_LIST_ROUTE).into_response())
        }
        Err(e) if e.is_name_conflict() => Err(ApiError::form_conflict("create", &e)),
        Err(e) => Err(e.into()),
    }
}

/// GET /user/edit/{id}
pub async fn edit_page(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let identity = match require_identity(&state, &ctx).await? {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let name = match state.credentials().get_user_name(id).await {
        Ok(name) => name,
        Err(CredentialError::IdNotFound(_)) => {
            return Ok(Redirect::to(USER_LIST_ROUTE).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let is_empty = state.credentials().is_empty().await?;

    Ok(Json(ApiResponse::success(EditUserPageDto {
        edit_id: id,
        name,
        is_empty,
        current: CurrentUserDto::from(identity),
    }))
    .into_response())
}

/// POST /user/edit/{id}
/// Empty fields leave the corresponding credential unchanged
pub async fn edit_user(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<i32>,
    Form(form): Form<EditUserForm>,
) -> Result<Response, ApiError> {
    let identity = match require_identity(&state, &ctx).await? {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    validate_new_user_name(&form.name)?;
    validate_new_password(&form.pass, state.config().security.min_password_length)?;

    match state
        .credentials()
        .change_credentials(id, &form.name, &form.pass)
        .await
    {
        Ok(()) => {
            tracing::info!(user_id = id, editor_id = identity.id, "User edited");
            Ok(Redirect::to(USER_LIST_ROUTE).into_response())
        }
        Err(CredentialError::IdNotFound(_)) => Ok(Redirect::to(USER_LIST_ROUTE).into_response()),
        Err(e) if e.is_name_conflict() => Err(ApiError::form_conflict("edit", &e)),
        Err(e) => Err(e.into()),
    }
}

/// POST /user/delete/{id}
/// Unknown ids are ignored; always returns to the list
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<i32>,
) -> Result<Response, ApiError> {
    let identity = match require_identity(&state, &ctx).await? {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    match state.credentials().delete_user(id).await {
        Ok(()) => {
            tracing::info!(user_id = id, deleted_by = identity.id, "User removed");
        }
        Err(CredentialError::IdNotFound(_)) => {
            tracing::debug!(user_id = id, "Delete requested for unknown user");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Redirect::to(USER_LIST_ROUTE).into_response())
}
