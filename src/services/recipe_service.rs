use std::collections::{HashMap, HashSet};

use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, Query, SelectStatement};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::recipes::{IngredientAmount, RecipeList, RecipePatch, RecipeWriteRequest},
    entity::{
        favorites::{Column as FavoriteCol, Entity as Favorites},
        ingredients::{Column as IngredientCol, Entity as Ingredients},
        recipe_images::{ActiveModel as ImageActive, Entity as RecipeImages},
        recipe_ingredients::{
            ActiveModel as RecipeIngredientActive, Column as RecipeIngredientCol,
            Entity as RecipeIngredients, Model as RecipeIngredientModel,
        },
        recipe_tags::{ActiveModel as RecipeTagActive, Column as RecipeTagCol, Entity as RecipeTags},
        recipes::{ActiveModel, Column, Entity as Recipes},
        shopping_carts::{Column as CartCol, Entity as ShoppingCarts},
        tags::{Column as TagCol, Entity as Tags},
    },
    error::{AppError, AppResult, FieldErrors},
    media::DecodedImage,
    middleware::auth::AuthUser,
    models::Recipe,
    response::{ApiResponse, Meta},
    routes::params::RecipeListQuery,
    services::read_model::{recipe_detail, recipe_details},
    state::AppState,
    viewer::ViewerContext,
};

pub async fn list_recipes(
    state: &AppState,
    user: Option<&AuthUser>,
    query: RecipeListQuery,
) -> AppResult<ApiResponse<RecipeList>> {
    let viewer = ViewerContext::load(state, user).await?;
    let (page, limit, offset) = query
        .pagination
        .normalize(state.config.recipes_per_page);

    let wants_membership = query.is_favorited || query.is_in_shopping_cart;
    let condition = match (viewer.user_id(), wants_membership) {
        // Membership filters mean nothing without a viewer.
        (None, true) => {
            let meta = Meta::new(page, limit, 0);
            return Ok(ApiResponse::success(
                "Recipes",
                RecipeList { items: Vec::new() },
                Some(meta),
            ));
        }
        (viewer_id, _) => list_condition(&query, viewer_id),
    };

    let finder = Recipes::find()
        .filter(condition)
        .order_by_desc(Column::PubDate);

    let total = finder.clone().count(&state.orm).await? as i64;

    let recipes = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = recipe_details(state, recipes, &viewer).await?;

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Recipes", RecipeList { items }, Some(meta)))
}

fn list_condition(query: &RecipeListQuery, viewer_id: Option<Uuid>) -> Condition {
    let mut condition = Condition::all();
    if !query.tags.is_empty() {
        condition = condition.add(Column::Id.in_subquery(tagged_with(&query.tags)));
    }
    if let Some(author) = query.author {
        condition = condition.add(Column::AuthorId.eq(author));
    }
    if let Some(viewer_id) = viewer_id {
        if query.is_favorited {
            condition = condition.add(Column::Id.in_subquery(favorited_by(viewer_id)));
        }
        if query.is_in_shopping_cart {
            condition = condition.add(Column::Id.in_subquery(in_cart_of(viewer_id)));
        }
    }
    condition
}

fn tagged_with(slugs: &[String]) -> SelectStatement {
    Query::select()
        .column((RecipeTags, RecipeTagCol::RecipeId))
        .from(RecipeTags)
        .inner_join(
            Tags,
            Expr::col((Tags, TagCol::Id)).equals((RecipeTags, RecipeTagCol::TagId)),
        )
        .and_where(Expr::col((Tags, TagCol::Slug)).is_in(slugs.iter().cloned()))
        .to_owned()
}

fn favorited_by(user_id: Uuid) -> SelectStatement {
    Query::select()
        .column(FavoriteCol::RecipeId)
        .from(Favorites)
        .and_where(FavoriteCol::UserId.eq(user_id))
        .to_owned()
}

fn in_cart_of(user_id: Uuid) -> SelectStatement {
    Query::select()
        .column(CartCol::RecipeId)
        .from(ShoppingCarts)
        .and_where(CartCol::UserId.eq(user_id))
        .to_owned()
}

pub async fn get_recipe(
    state: &AppState,
    user: Option<&AuthUser>,
    id: Uuid,
) -> AppResult<ApiResponse<Recipe>> {
    let recipe = match Recipes::find_by_id(id).one(&state.orm).await? {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };
    let viewer = ViewerContext::load(state, user).await?;
    let recipe = recipe_detail(state, recipe, &viewer).await?;
    Ok(ApiResponse::success("Recipe", recipe, None))
}

pub async fn create_recipe(
    state: &AppState,
    user: &AuthUser,
    payload: RecipeWriteRequest,
) -> AppResult<ApiResponse<Recipe>> {
    let RecipePatch {
        name,
        text,
        cooking_time,
        tags,
        ingredients,
        image,
    } = payload.into_patch(true)?;
    let name = require(name, "name")?;
    let text = require(text, "text")?;
    let cooking_time = require(cooking_time, "cooking_time")?;
    let tags = require(tags, "tags")?;
    let ingredients = require(ingredients, "ingredients")?;
    ensure_references_exist(state, Some(tags.as_slice()), Some(ingredients.as_slice())).await?;

    let txn = state.orm.begin().await?;

    let recipe = ActiveModel {
        id: Set(Uuid::new_v4()),
        author_id: Set(user.user_id),
        name: Set(name),
        text: Set(text),
        cooking_time: Set(cooking_time),
        pub_date: NotSet,
    }
    .insert(&txn)
    .await?;

    replace_ingredients(&txn, recipe.id, &ingredients).await?;
    replace_tags(&txn, recipe.id, &tags).await?;
    if let Some(image) = image {
        store_image(&txn, recipe.id, image).await?;
    }

    txn.commit().await?;

    tracing::info!(recipe_id = %recipe.id, author_id = %user.user_id, "recipe created");
    audit::record(
        state,
        Some(user.user_id),
        "recipe_create",
        "recipes",
        serde_json::json!({ "recipe_id": recipe.id }),
    )
    .await;

    let viewer = ViewerContext::load(state, Some(user)).await?;
    let recipe = recipe_detail(state, recipe, &viewer).await?;
    Ok(ApiResponse::success("Recipe created", recipe, Some(Meta::empty())))
}

/// PUT (`partial == false`) requires every field; PATCH keeps whatever is omitted.
/// The image is only replaced when a new one is supplied.
pub async fn update_recipe(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: RecipeWriteRequest,
    partial: bool,
) -> AppResult<ApiResponse<Recipe>> {
    let existing = match Recipes::find_by_id(id).one(&state.orm).await? {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };
    user.ensure_owner(existing.author_id)?;

    let RecipePatch {
        name,
        text,
        cooking_time,
        tags,
        ingredients,
        image,
    } = payload.into_patch(!partial)?;
    ensure_references_exist(state, tags.as_deref(), ingredients.as_deref()).await?;

    let txn = state.orm.begin().await?;

    let mut active: ActiveModel = existing.clone().into();
    if let Some(name) = name {
        active.name = Set(name);
    }
    if let Some(text) = text {
        active.text = Set(text);
    }
    if let Some(cooking_time) = cooking_time {
        active.cooking_time = Set(cooking_time);
    }
    let recipe = if active.is_changed() {
        active.update(&txn).await?
    } else {
        existing
    };

    if let Some(ingredients) = ingredients {
        replace_ingredients(&txn, recipe.id, &ingredients).await?;
    }
    if let Some(tags) = tags {
        replace_tags(&txn, recipe.id, &tags).await?;
    }
    if let Some(image) = image {
        store_image(&txn, recipe.id, image).await?;
    }

    txn.commit().await?;

    audit::record(
        state,
        Some(user.user_id),
        "recipe_update",
        "recipes",
        serde_json::json!({ "recipe_id": recipe.id, "partial": partial }),
    )
    .await;

    let viewer = ViewerContext::load(state, Some(user)).await?;
    let recipe = recipe_detail(state, recipe, &viewer).await?;
    Ok(ApiResponse::success("Updated", recipe, Some(Meta::empty())))
}

pub async fn delete_recipe(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<()> {
    let existing = match Recipes::find_by_id(id).one(&state.orm).await? {
        Some(r) => r,
        None => return Err(AppError::NotFound),
    };
    user.ensure_owner(existing.author_id)?;

    let result = Recipes::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    audit::record(
        state,
        Some(user.user_id),
        "recipe_delete",
        "recipes",
        serde_json::json!({ "recipe_id": id }),
    )
    .await;

    Ok(())
}

/// Stored image of a recipe as `(content_type, bytes)`.
pub async fn recipe_image(state: &AppState, id: Uuid) -> AppResult<(String, Vec<u8>)> {
    match RecipeImages::find_by_id(id).one(&state.orm).await? {
        Some(image) => Ok((image.content_type, image.data)),
        None => Err(AppError::NotFound),
    }
}

fn require<T>(value: Option<T>, field: &str) -> AppResult<T> {
    value.ok_or_else(|| {
        let mut errors = FieldErrors::new();
        errors.add(field, "This field is required.");
        AppError::Validation(errors)
    })
}

async fn ensure_references_exist(
    state: &AppState,
    tags: Option<&[Uuid]>,
    ingredients: Option<&[IngredientAmount]>,
) -> AppResult<()> {
    let mut errors = FieldErrors::new();

    if let Some(tags) = tags.filter(|t| !t.is_empty()) {
        let found = Tags::find()
            .filter(TagCol::Id.is_in(tags.to_vec()))
            .count(&state.orm)
            .await?;
        if found as usize != tags.len() {
            errors.add("tags", "One or more tags do not exist.");
        }
    }

    if let Some(ingredients) = ingredients.filter(|i| !i.is_empty()) {
        let ids: Vec<Uuid> = ingredients.iter().map(|i| i.ingredient_id).collect();
        let found = Ingredients::find()
            .filter(IngredientCol::Id.is_in(ids))
            .count(&state.orm)
            .await?;
        if found as usize != ingredients.len() {
            errors.add("ingredients", "One or more ingredients do not exist.");
        }
    }

    errors.into_result()
}

/// Row-level changes that turn the current ingredient rows into `wanted`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct IngredientDiff {
    /// Row ids to delete.
    pub delete: Vec<Uuid>,
    /// `(row id, new amount)` for rows whose amount changed.
    pub update: Vec<(Uuid, i32)>,
    pub insert: Vec<IngredientAmount>,
}

pub fn diff_ingredients(
    existing: &[RecipeIngredientModel],
    wanted: &[IngredientAmount],
) -> IngredientDiff {
    let mut pending: HashMap<Uuid, i32> = wanted
        .iter()
        .map(|i| (i.ingredient_id, i.amount))
        .collect();
    let mut diff = IngredientDiff::default();

    for row in existing {
        match pending.remove(&row.ingredient_id) {
            Some(amount) if row.amount == Some(amount) => {}
            Some(amount) => diff.update.push((row.id, amount)),
            None => diff.delete.push(row.id),
        }
    }

    diff.insert = wanted
        .iter()
        .filter(|i| pending.contains_key(&i.ingredient_id))
        .copied()
        .collect();
    diff
}

/// `(to_delete, to_insert)` turning the current tag set into `wanted`.
pub fn diff_tags(existing: &[Uuid], wanted: &[Uuid]) -> (Vec<Uuid>, Vec<Uuid>) {
    let current: HashSet<Uuid> = existing.iter().copied().collect();
    let target: HashSet<Uuid> = wanted.iter().copied().collect();
    let delete = existing
        .iter()
        .filter(|id| !target.contains(id))
        .copied()
        .collect();
    let insert = wanted
        .iter()
        .filter(|id| !current.contains(id))
        .copied()
        .collect();
    (delete, insert)
}

async fn replace_ingredients<C: ConnectionTrait>(
    conn: &C,
    recipe_id: Uuid,
    wanted: &[IngredientAmount],
) -> AppResult<()> {
    let existing = RecipeIngredients::find()
        .filter(RecipeIngredientCol::RecipeId.eq(recipe_id))
        .all(conn)
        .await?;
    let diff = diff_ingredients(&existing, wanted);

    if !diff.delete.is_empty() {
        RecipeIngredients::delete_many()
            .filter(RecipeIngredientCol::Id.is_in(diff.delete))
            .exec(conn)
            .await?;
    }

    for (row_id, amount) in diff.update {
        RecipeIngredients::update_many()
            .col_expr(RecipeIngredientCol::Amount, Expr::value(amount))
            .filter(RecipeIngredientCol::Id.eq(row_id))
            .exec(conn)
            .await?;
    }

    if !diff.insert.is_empty() {
        let rows = diff.insert.iter().map(|item| RecipeIngredientActive {
            id: Set(Uuid::new_v4()),
            recipe_id: Set(recipe_id),
            ingredient_id: Set(item.ingredient_id),
            amount: Set(Some(item.amount)),
        });
        RecipeIngredients::insert_many(rows)
            .exec_without_returning(conn)
            .await?;
    }

    Ok(())
}

async fn replace_tags<C: ConnectionTrait>(
    conn: &C,
    recipe_id: Uuid,
    wanted: &[Uuid],
) -> AppResult<()> {
    let existing = RecipeTags::find()
        .select_only()
        .column(RecipeTagCol::TagId)
        .filter(RecipeTagCol::RecipeId.eq(recipe_id))
        .into_tuple::<Uuid>()
        .all(conn)
        .await?;
    let (delete, insert) = diff_tags(&existing, wanted);

    if !delete.is_empty() {
        RecipeTags::delete_many()
            .filter(RecipeTagCol::RecipeId.eq(recipe_id))
            .filter(RecipeTagCol::TagId.is_in(delete))
            .exec(conn)
            .await?;
    }

    if !insert.is_empty() {
        let rows = insert.into_iter().map(|tag_id| RecipeTagActive {
            recipe_id: Set(recipe_id),
            tag_id: Set(tag_id),
        });
        RecipeTags::insert_many(rows)
            .exec_without_returning(conn)
            .await?;
    }

    Ok(())
}

async fn store_image<C: ConnectionTrait>(
    conn: &C,
    recipe_id: Uuid,
    image: DecodedImage,
) -> AppResult<()> {
    RecipeImages::delete_by_id(recipe_id).exec(conn).await?;
    RecipeImages::insert(ImageActive {
        recipe_id: Set(recipe_id),
        content_type: Set(image.content_type),
        data: Set(image.data),
    })
    .exec_without_returning(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ingredient_id: Uuid, amount: i32) -> RecipeIngredientModel {
        RecipeIngredientModel {
            id: Uuid::new_v4(),
            recipe_id: Uuid::nil(),
            ingredient_id,
            amount: Some(amount),
        }
    }

    fn wanted(ingredient_id: Uuid, amount: i32) -> IngredientAmount {
        IngredientAmount {
            ingredient_id,
            amount,
        }
    }

    #[test]
    fn ingredient_diff_replaces_whole_set() {
        let (salt, flour, egg) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let existing = vec![row(salt, 5), row(flour, 200)];

        let diff = diff_ingredients(&existing, &[wanted(flour, 250), wanted(egg, 2)]);

        assert_eq!(diff.delete, vec![existing[0].id]);
        assert_eq!(diff.update, vec![(existing[1].id, 250)]);
        assert_eq!(diff.insert, vec![wanted(egg, 2)]);
    }

    #[test]
    fn ingredient_diff_is_empty_when_unchanged() {
        let salt = Uuid::new_v4();
        let diff = diff_ingredients(&[row(salt, 5)], &[wanted(salt, 5)]);
        assert_eq!(diff, IngredientDiff::default());
    }

    #[test]
    fn ingredient_diff_to_empty_deletes_everything() {
        let existing = vec![row(Uuid::new_v4(), 1), row(Uuid::new_v4(), 2)];
        let diff = diff_ingredients(&existing, &[]);
        assert_eq!(diff.delete.len(), 2);
        assert!(diff.insert.is_empty());
    }

    #[test]
    fn tag_diff() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let (delete, insert) = diff_tags(&[a, b], &[b, c]);
        assert_eq!(delete, vec![a]);
        assert_eq!(insert, vec![c]);
    }

    #[test]
    fn list_condition_without_filters_is_empty() {
        let condition = list_condition(&RecipeListQuery::default(), None);
        assert!(condition.is_empty());
    }
}
