use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    audit,
    db::DbPool,
    dto::recipes::RecipeLinkList,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::RecipeLink,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub(crate) async fn ensure_recipe_exists(pool: &DbPool, recipe_id: Uuid) -> AppResult<()> {
    let recipe: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?;
    match recipe {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound),
    }
}

pub async fn list_favorites(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<RecipeLinkList>> {
    let rows = sqlx::query_as::<_, (Uuid, Uuid, DateTime<Utc>)>(
        r#"
        SELECT recipe_id, user_id, created_at
        FROM favorites
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    let items: Vec<RecipeLink> = rows
        .into_iter()
        .map(|(recipe, user, created_at)| RecipeLink {
            recipe,
            user,
            created_at,
        })
        .collect();

    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success("OK", RecipeLinkList { items }, Some(meta)))
}

pub async fn add_favorite(
    state: &AppState,
    user: &AuthUser,
    recipe_id: Uuid,
) -> AppResult<ApiResponse<RecipeLink>> {
    ensure_recipe_exists(&state.pool, recipe_id).await?;

    // The unique (user_id, recipe_id) index decides; a conflicting row yields no RETURNING row.
    let inserted = sqlx::query_as::<_, (Uuid, Uuid, DateTime<Utc>)>(
        r#"
        INSERT INTO favorites (id, user_id, recipe_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, recipe_id) DO NOTHING
        RETURNING recipe_id, user_id, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.user_id)
    .bind(recipe_id)
    .fetch_optional(&state.pool)
    .await?;

    let (recipe, user_id, created_at) = match inserted {
        Some(row) => row,
        None => return Err(AppError::BadRequest("Recipe is already in favorites".into())),
    };

    audit::record(
        state,
        Some(user.user_id),
        "favorite_add",
        "favorites",
        serde_json::json!({ "recipe_id": recipe_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Added to favorites",
        RecipeLink {
            recipe,
            user: user_id,
            created_at,
        },
        Some(Meta::empty()),
    ))
}

pub async fn remove_favorite(state: &AppState, user: &AuthUser, recipe_id: Uuid) -> AppResult<()> {
    ensure_recipe_exists(&state.pool, recipe_id).await?;

    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user.user_id)
        .bind(recipe_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::BadRequest("Recipe is not in favorites".into()));
    }

    audit::record(
        state,
        Some(user.user_id),
        "favorite_remove",
        "favorites",
        serde_json::json!({ "recipe_id": recipe_id }),
    )
    .await;

    Ok(())
}
