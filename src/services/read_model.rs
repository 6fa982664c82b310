//! Assembly of read representations from entity rows.
//!
//! Related rows are fetched in batches for a whole page of recipes, and
//! membership flags come from the [`ViewerContext`].

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use uuid::Uuid;

use crate::{
    entity::{
        ingredients::{Column as IngredientCol, Entity as Ingredients, Model as IngredientModel},
        recipe_images::{Column as ImageCol, Entity as RecipeImages},
        recipe_ingredients::{Column as RecipeIngredientCol, Entity as RecipeIngredients},
        recipe_tags::{Column as RecipeTagCol, Entity as RecipeTags},
        recipes::{Column as RecipeCol, Entity as Recipes, Model as RecipeModel},
        tags::{Column as TagCol, Entity as Tags, Model as TagModel},
        users::{Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    models::{Ingredient, Recipe, RecipeIngredient, ShortRecipe, Tag, User, image_url},
    state::AppState,
    viewer::ViewerContext,
};

pub fn user_from_entity(model: UserModel, viewer: &ViewerContext) -> User {
    User {
        is_subscribed: viewer.is_subscribed(model.id),
        id: model.id,
        username: model.username,
        email: model.email,
        first_name: model.first_name,
        last_name: model.last_name,
    }
}

pub fn tag_from_entity(model: TagModel) -> Tag {
    Tag {
        id: model.id,
        name: model.name,
        color: model.color,
        slug: model.slug,
    }
}

pub fn ingredient_from_entity(model: IngredientModel) -> Ingredient {
    Ingredient {
        id: model.id,
        name: model.name,
        measurement_unit: model.measurement_unit,
    }
}

pub fn short_recipe(model: &RecipeModel, has_image: bool) -> ShortRecipe {
    ShortRecipe {
        id: model.id,
        name: model.name.clone(),
        image: has_image.then(|| image_url(model.id)),
        cooking_time: model.cooking_time,
    }
}

/// Ids of the given recipes that have a stored image.
pub async fn recipes_with_images(state: &AppState, ids: &[Uuid]) -> AppResult<HashSet<Uuid>> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }
    let found = RecipeImages::find()
        .select_only()
        .column(ImageCol::RecipeId)
        .filter(ImageCol::RecipeId.is_in(ids.to_vec()))
        .into_tuple::<Uuid>()
        .all(&state.orm)
        .await?;
    Ok(found.into_iter().collect())
}

/// Full read representation for each recipe, preserving input order.
pub async fn recipe_details(
    state: &AppState,
    recipes: Vec<RecipeModel>,
    viewer: &ViewerContext,
) -> AppResult<Vec<Recipe>> {
    if recipes.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
    let author_ids: Vec<Uuid> = recipes
        .iter()
        .map(|r| r.author_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let mut tags_by_recipe: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for (link, tag) in RecipeTags::find()
        .filter(RecipeTagCol::RecipeId.is_in(ids.clone()))
        .find_also_related(Tags)
        .order_by_asc(TagCol::Name)
        .all(&state.orm)
        .await?
    {
        if let Some(tag) = tag {
            tags_by_recipe
                .entry(link.recipe_id)
                .or_default()
                .push(tag_from_entity(tag));
        }
    }

    let mut ingredients_by_recipe: HashMap<Uuid, Vec<RecipeIngredient>> = HashMap::new();
    for (row, ingredient) in RecipeIngredients::find()
        .filter(RecipeIngredientCol::RecipeId.is_in(ids.clone()))
        .find_also_related(Ingredients)
        .order_by_asc(IngredientCol::Name)
        .all(&state.orm)
        .await?
    {
        if let Some(ingredient) = ingredient {
            ingredients_by_recipe
                .entry(row.recipe_id)
                .or_default()
                .push(RecipeIngredient {
                    id: ingredient.id,
                    name: ingredient.name,
                    measurement_unit: ingredient.measurement_unit,
                    amount: row.amount,
                });
        }
    }

    let authors: HashMap<Uuid, UserModel> = Users::find()
        .filter(UserCol::Id.is_in(author_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    let images = recipes_with_images(state, &ids).await?;

    recipes
        .into_iter()
        .map(|recipe| {
            let author = authors
                .get(&recipe.author_id)
                .cloned()
                .ok_or_else(|| {
                    AppError::Internal(anyhow::anyhow!(
                        "author {} of recipe {} is missing",
                        recipe.author_id,
                        recipe.id
                    ))
                })?;
            Ok(Recipe {
                id: recipe.id,
                tags: tags_by_recipe.remove(&recipe.id).unwrap_or_default(),
                author: user_from_entity(author, viewer),
                ingredients: ingredients_by_recipe.remove(&recipe.id).unwrap_or_default(),
                image: images.contains(&recipe.id).then(|| image_url(recipe.id)),
                name: recipe.name,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
                pub_date: recipe.pub_date.with_timezone(&Utc),
                is_favorited: viewer.is_favorited(recipe.id),
                is_in_shopping_cart: viewer.is_in_shopping_cart(recipe.id),
            })
        })
        .collect()
}

pub async fn recipe_detail(
    state: &AppState,
    recipe: RecipeModel,
    viewer: &ViewerContext,
) -> AppResult<Recipe> {
    recipe_details(state, vec![recipe], viewer)
        .await?
        .pop()
        .ok_or(AppError::NotFound)
}

/// Short recipes of each author, newest first, together with each author's total.
pub async fn recipes_by_author(
    state: &AppState,
    author_ids: &[Uuid],
    limit: Option<usize>,
) -> AppResult<HashMap<Uuid, (Vec<ShortRecipe>, i64)>> {
    if author_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let recipes = Recipes::find()
        .filter(RecipeCol::AuthorId.is_in(author_ids.to_vec()))
        .order_by_desc(RecipeCol::PubDate)
        .all(&state.orm)
        .await?;
    let ids: Vec<Uuid> = recipes.iter().map(|r| r.id).collect();
    let images = recipes_with_images(state, &ids).await?;

    let mut grouped: HashMap<Uuid, (Vec<ShortRecipe>, i64)> = HashMap::new();
    for recipe in &recipes {
        let entry = grouped.entry(recipe.author_id).or_default();
        entry.1 += 1;
        if limit.is_none_or(|limit| entry.0.len() < limit) {
            entry
                .0
                .push(short_recipe(recipe, images.contains(&recipe.id)));
        }
    }
    Ok(grouped)
}
