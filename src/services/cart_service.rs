use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    audit,
    dto::recipes::ShortRecipeList,
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{RecipeLink, ShortRecipe, image_url},
    response::{ApiResponse, Meta},
    services::favorite_service::ensure_recipe_exists,
    state::AppState,
};

#[derive(FromRow)]
struct CartRecipeRow {
    id: Uuid,
    name: String,
    cooking_time: i16,
    has_image: bool,
}

pub async fn list_cart(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ShortRecipeList>> {
    let rows = sqlx::query_as::<_, CartRecipeRow>(
        r#"
        SELECT r.id, r.name, r.cooking_time,
               EXISTS (SELECT 1 FROM recipe_images i WHERE i.recipe_id = r.id) AS has_image
        FROM shopping_carts c
        JOIN recipes r ON r.id = c.recipe_id
        WHERE c.user_id = $1
        ORDER BY c.created_at DESC
        "#,
    )
    .bind(user.user_id)
    .fetch_all(&state.pool)
    .await?;

    let items: Vec<ShortRecipe> = rows
        .into_iter()
        .map(|row| ShortRecipe {
            image: row.has_image.then(|| image_url(row.id)),
            id: row.id,
            name: row.name,
            cooking_time: row.cooking_time,
        })
        .collect();

    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success("OK", ShortRecipeList { items }, Some(meta)))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    recipe_id: Uuid,
) -> AppResult<ApiResponse<RecipeLink>> {
    ensure_recipe_exists(&state.pool, recipe_id).await?;

    let inserted = sqlx::query_as::<_, (Uuid, Uuid, DateTime<Utc>)>(
        r#"
        INSERT INTO shopping_carts (id, user_id, recipe_id)
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

    let Some((recipe, user_id, created_at)) = inserted else {
        return Err(AppError::BadRequest(
            "Recipe is already in the shopping cart".into(),
        ));
    };

    tracing::debug!(%recipe_id, user_id = %user.user_id, "recipe added to cart");
    audit::record(
        state,
        Some(user.user_id),
        "cart_add",
        "shopping_carts",
        serde_json::json!({ "recipe_id": recipe_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Added to shopping cart",
        RecipeLink {
            recipe,
            user: user_id,
            created_at,
        },
        Some(Meta::empty()),
    ))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    recipe_id: Uuid,
) -> AppResult<()> {
    ensure_recipe_exists(&state.pool, recipe_id).await?;

    let result = sqlx::query("DELETE FROM shopping_carts WHERE user_id = $1 AND recipe_id = $2")
        .bind(user.user_id)
        .bind(recipe_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::BadRequest(
            "Recipe is not in the shopping cart".into(),
        ));
    }

    audit::record(
        state,
        Some(user.user_id),
        "cart_remove",
        "shopping_carts",
        serde_json::json!({ "recipe_id": recipe_id }),
    )
    .await;

    Ok(())
}
