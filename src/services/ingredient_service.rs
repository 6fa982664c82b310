use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    dto::ingredients::{IngredientList, IngredientQuery, IngredientRequest},
    entity::ingredients::{ActiveModel, Column, Entity as Ingredients},
    error::{AppError, AppResult},
    models::Ingredient,
    response::{ApiResponse, Meta},
    services::read_model::ingredient_from_entity,
    state::AppState,
};

const INGREDIENT_CONFLICT: &str = "This ingredient already exists with the same measurement unit";

/// All ingredients, optionally narrowed to names starting with `query.name` (case-sensitive).
pub async fn list_ingredients(
    state: &AppState,
    query: IngredientQuery,
) -> AppResult<ApiResponse<IngredientList>> {
    let mut finder = Ingredients::find();
    if let Some(prefix) = query.name.as_deref().filter(|p| !p.is_empty()) {
        finder = finder.filter(Column::Name.starts_with(prefix));
    }

    let items: Vec<Ingredient> = finder
        .order_by_asc(Column::Name)
        .order_by_asc(Column::MeasurementUnit)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(ingredient_from_entity)
        .collect();

    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success(
        "Ingredients",
        IngredientList { items },
        Some(meta),
    ))
}

pub async fn get_ingredient(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Ingredient>> {
    let ingredient = match Ingredients::find_by_id(id).one(&state.orm).await? {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success(
        "Ingredient",
        ingredient_from_entity(ingredient),
        None,
    ))
}

pub async fn create_ingredient(
    state: &AppState,
    payload: IngredientRequest,
) -> AppResult<ApiResponse<Ingredient>> {
    let IngredientRequest {
        name,
        measurement_unit,
    } = payload.into_valid()?;

    let ingredient = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        measurement_unit: Set(measurement_unit),
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, INGREDIENT_CONFLICT))?;

    Ok(ApiResponse::success(
        "Ingredient created",
        ingredient_from_entity(ingredient),
        Some(Meta::empty()),
    ))
}

pub async fn update_ingredient(
    state: &AppState,
    id: Uuid,
    payload: IngredientRequest,
) -> AppResult<ApiResponse<Ingredient>> {
    let IngredientRequest {
        name,
        measurement_unit,
    } = payload.into_valid()?;
    let existing = match Ingredients::find_by_id(id).one(&state.orm).await? {
        Some(i) => i,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    active.name = Set(name);
    active.measurement_unit = Set(measurement_unit);
    let ingredient = active
        .update(&state.orm)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, INGREDIENT_CONFLICT))?;

    Ok(ApiResponse::success(
        "Updated",
        ingredient_from_entity(ingredient),
        Some(Meta::empty()),
    ))
}

pub async fn delete_ingredient(state: &AppState, id: Uuid) -> AppResult<()> {
    let result = Ingredients::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
