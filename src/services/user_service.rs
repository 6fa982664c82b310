use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    dto::users::{RegisterRequest, SetPasswordRequest, UserList},
    entity::users::{ActiveModel, Column, Entity as Users},
    error::{AppError, AppResult, FieldErrors},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::{
        auth_service::{hash_password, verify_password},
        read_model::user_from_entity,
    },
    state::AppState,
    viewer::ViewerContext,
};

pub async fn register(state: &AppState, payload: RegisterRequest) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        email,
        username,
        first_name,
        last_name,
        password,
    } = payload.into_valid()?;

    let taken = Users::find()
        .filter(
            Condition::any()
                .add(Column::Email.eq(email.as_str()))
                .add(Column::Username.eq(username.as_str())),
        )
        .all(&state.orm)
        .await?;
    let mut errors = FieldErrors::new();
    if taken.iter().any(|u| u.email == email) {
        errors.add("email", "A user with this email already exists.");
    }
    if taken.iter().any(|u| u.username == username) {
        errors.add("username", "A user with this username already exists.");
    }
    errors.into_result()?;

    let password_hash = hash_password(&password)?;
    let user = ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        email: Set(email),
        first_name: Set(first_name),
        last_name: Set(last_name),
        password_hash: Set(password_hash),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "A user with this email or username already exists"))?;

    tracing::info!(user_id = %user.id, "user registered");
    audit::record(
        state,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "User registered",
        user_from_entity(user, &ViewerContext::anonymous()),
        Some(Meta::empty()),
    ))
}

pub async fn list_users(
    state: &AppState,
    viewer: Option<&AuthUser>,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    let viewer = ViewerContext::load(state, viewer).await?;
    let (page, limit, offset) = pagination.normalize(state.config.recipes_per_page);

    let finder = Users::find().order_by_asc(Column::Username);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|u| user_from_entity(u, &viewer))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Users", UserList { items }, Some(meta)))
}

pub async fn get_user(
    state: &AppState,
    viewer: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<ApiResponse<User>> {
    let user = match Users::find_by_id(id).one(&state.orm).await? {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };
    let viewer = ViewerContext::load(state, viewer).await?;
    Ok(ApiResponse::success(
        "User",
        user_from_entity(user, &viewer),
        None,
    ))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    // A valid token for a deleted account is treated as no credentials.
    let model = match Users::find_by_id(user.user_id).one(&state.orm).await? {
        Some(u) => u,
        None => return Err(AppError::Unauthorized),
    };
    Ok(ApiResponse::success(
        "User",
        user_from_entity(model, &ViewerContext::anonymous()),
        None,
    ))
}

pub async fn set_password(
    state: &AppState,
    user: &AuthUser,
    payload: SetPasswordRequest,
) -> AppResult<()> {
    let SetPasswordRequest {
        current_password,
        new_password,
    } = payload.into_valid()?;

    let model = match Users::find_by_id(user.user_id).one(&state.orm).await? {
        Some(u) => u,
        None => return Err(AppError::Unauthorized),
    };

    if !verify_password(&current_password, &model.password_hash)? {
        let mut errors = FieldErrors::new();
        errors.add("current_password", "Invalid password.");
        return Err(AppError::Validation(errors));
    }

    let mut active: ActiveModel = model.into();
    active.password_hash = Set(hash_password(&new_password)?);
    active.update(&state.orm).await?;

    audit::record(
        state,
        Some(user.user_id),
        "password_change",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(())
}
