use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    dto::tags::{TagList, TagRequest},
    entity::tags::{ActiveModel, Column, Entity as Tags},
    error::{AppError, AppResult},
    models::Tag,
    response::{ApiResponse, Meta},
    services::read_model::tag_from_entity,
    state::AppState,
};

const TAG_CONFLICT: &str = "A tag with this name, color or slug already exists";

pub async fn list_tags(state: &AppState) -> AppResult<ApiResponse<TagList>> {
    let items: Vec<Tag> = Tags::find()
        .order_by_asc(Column::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(tag_from_entity)
        .collect();
    let meta = Meta::total(items.len() as i64);
    Ok(ApiResponse::success("Tags", TagList { items }, Some(meta)))
}

pub async fn get_tag(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Tag>> {
    match Tags::find_by_id(id).one(&state.orm).await? {
        Some(tag) => Ok(ApiResponse::success("Tag", tag_from_entity(tag), None)),
        None => Err(AppError::NotFound),
    }
}

pub async fn create_tag(state: &AppState, payload: TagRequest) -> AppResult<ApiResponse<Tag>> {
    let TagRequest { name, color, slug } = payload.into_valid()?;
    let tag = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        color: Set(color),
        slug: Set(slug),
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, TAG_CONFLICT))?;

    tracing::info!(tag_id = %tag.id, slug = %tag.slug, "tag created");
    Ok(ApiResponse::success(
        "Tag created",
        tag_from_entity(tag),
        Some(Meta::empty()),
    ))
}

pub async fn update_tag(
    state: &AppState,
    id: Uuid,
    payload: TagRequest,
) -> AppResult<ApiResponse<Tag>> {
    let TagRequest { name, color, slug } = payload.into_valid()?;
    let existing = match Tags::find_by_id(id).one(&state.orm).await? {
        Some(tag) => tag,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    active.name = Set(name);
    active.color = Set(color);
    active.slug = Set(slug);
    let tag = active
        .update(&state.orm)
        .await
        .map_err(|e| AppError::conflict_on_unique(e, TAG_CONFLICT))?;

    Ok(ApiResponse::success(
        "Updated",
        tag_from_entity(tag),
        Some(Meta::empty()),
    ))
}

pub async fn delete_tag(state: &AppState, id: Uuid) -> AppResult<()> {
    let result = Tags::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}
