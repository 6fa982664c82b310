use std::collections::HashMap;

use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::users::{SUBSCRIPTIONS_PAGE_SIZE, SubscriptionList, SubscriptionsQuery},
    entity::{
        follows::{ActiveModel as FollowActive, Column as FollowCol, Entity as Follows},
        users::{Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{ShortRecipe, Subscription},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::read_model::recipes_by_author,
    state::AppState,
    viewer::ViewerContext,
};

fn subscription_from(
    user: UserModel,
    recipes: &mut HashMap<Uuid, (Vec<ShortRecipe>, i64)>,
    viewer: &ViewerContext,
) -> Subscription {
    let (recipes, recipes_count) = recipes.remove(&user.id).unwrap_or_default();
    Subscription {
        email: user.email,
        id: user.id,
        username: user.username,
        first_name: user.first_name,
        last_name: user.last_name,
        is_subscribed: viewer.is_subscribed(user.id),
        recipes,
        recipes_count,
    }
}

/// Users followed by the caller, most recently followed first.
pub async fn list_subscriptions(
    state: &AppState,
    user: &AuthUser,
    query: SubscriptionsQuery,
) -> AppResult<ApiResponse<SubscriptionList>> {
    let pagination = Pagination {
        page: query.page,
        per_page: Some(SUBSCRIPTIONS_PAGE_SIZE),
    };
    let (page, limit, offset) = pagination.normalize(SUBSCRIPTIONS_PAGE_SIZE);

    let finder = Follows::find()
        .filter(FollowCol::FollowerId.eq(user.user_id))
        .order_by_desc(FollowCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;

    let followed: Vec<Uuid> = finder
        .select_only()
        .column(FollowCol::FollowingId)
        .limit(limit as u64)
        .offset(offset as u64)
        .into_tuple::<Uuid>()
        .all(&state.orm)
        .await?;

    let mut users: HashMap<Uuid, UserModel> = Users::find()
        .filter(UserCol::Id.is_in(followed.clone()))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();
    let mut recipes = recipes_by_author(state, &followed, query.recipes_limit).await?;
    let viewer = ViewerContext::load(state, Some(user)).await?;

    let items = followed
        .iter()
        .filter_map(|id| users.remove(id))
        .map(|u| subscription_from(u, &mut recipes, &viewer))
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Subscriptions",
        SubscriptionList { items },
        Some(meta),
    ))
}

pub async fn subscribe(
    state: &AppState,
    user: &AuthUser,
    target_id: Uuid,
    recipes_limit: Option<usize>,
) -> AppResult<ApiResponse<Subscription>> {
    let target = match Users::find_by_id(target_id).one(&state.orm).await? {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };
    if target.id == user.user_id {
        return Err(AppError::BadRequest("You cannot subscribe to yourself".into()));
    }

    FollowActive {
        id: Set(Uuid::new_v4()),
        follower_id: Set(user.user_id),
        following_id: Set(target.id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "You are already subscribed to this user"))?;

    audit::record(
        state,
        Some(user.user_id),
        "subscribe",
        "follows",
        serde_json::json!({ "following_id": target.id }),
    )
    .await;

    let mut recipes = recipes_by_author(state, &[target.id], recipes_limit).await?;
    let viewer = ViewerContext::load(state, Some(user)).await?;
    Ok(ApiResponse::success(
        "Subscribed",
        subscription_from(target, &mut recipes, &viewer),
        Some(Meta::empty()),
    ))
}

/// Removing a follow that does not exist is a no-op.
pub async fn unsubscribe(state: &AppState, user: &AuthUser, target_id: Uuid) -> AppResult<()> {
    if Users::find_by_id(target_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let result = Follows::delete_many()
        .filter(FollowCol::FollowerId.eq(user.user_id))
        .filter(FollowCol::FollowingId.eq(target_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected > 0 {
        audit::record(
            state,
            Some(user.user_id),
            "unsubscribe",
            "follows",
            serde_json::json!({ "following_id": target_id }),
        )
        .await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use chrono::Utc;

    use super::*;

    fn user(id: Uuid) -> UserModel {
        UserModel {
            id,
            username: "writer".into(),
            email: "writer@example.com".into(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: String::new(),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn subscribed_flag_follows_the_viewer() {
        let followed = Uuid::new_v4();
        let viewer = ViewerContext::new(
            Uuid::new_v4(),
            HashSet::new(),
            HashSet::new(),
            HashSet::from([followed]),
        );
        let mut recipes = HashMap::new();
        recipes.insert(followed, (Vec::new(), 4));

        let known = subscription_from(user(followed), &mut recipes, &viewer);
        assert!(known.is_subscribed);
        assert_eq!(known.recipes_count, 4);

        let stranger = subscription_from(user(Uuid::new_v4()), &mut recipes, &viewer);
        assert!(!stranger.is_subscribed);
        assert_eq!(stranger.recipes_count, 0);
    }
}
