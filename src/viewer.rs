//! Per-request membership sets of the requesting user.
//!
//! Built once per request and handed to the read path so that membership
//! flags (`is_favorited`, `is_in_shopping_cart`, `is_subscribed`) are plain
//! set lookups instead of one query per serialized row.

use std::collections::HashSet;

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};
use uuid::Uuid;

use crate::{
    entity::{
        favorites::{self, Entity as Favorites},
        follows::{self, Entity as Follows},
        shopping_carts::{self, Entity as ShoppingCarts},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    state::AppState,
};

#[derive(Debug, Clone, Default)]
pub struct ViewerContext {
    user_id: Option<Uuid>,
    favorites: HashSet<Uuid>,
    cart: HashSet<Uuid>,
    subscriptions: HashSet<Uuid>,
}

impl ViewerContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn new(
        user_id: Uuid,
        favorites: HashSet<Uuid>,
        cart: HashSet<Uuid>,
        subscriptions: HashSet<Uuid>,
    ) -> Self {
        Self {
            user_id: Some(user_id),
            favorites,
            cart,
            subscriptions,
        }
    }

    pub async fn load(state: &AppState, user: Option<&AuthUser>) -> AppResult<Self> {
        let Some(user) = user else {
            return Ok(Self::anonymous());
        };

        let favorites = Favorites::find()
            .select_only()
            .column(favorites::Column::RecipeId)
            .filter(favorites::Column::UserId.eq(user.user_id))
            .into_tuple::<Uuid>()
            .all(&state.orm)
            .await?;

        let cart = ShoppingCarts::find()
            .select_only()
            .column(shopping_carts::Column::RecipeId)
            .filter(shopping_carts::Column::UserId.eq(user.user_id))
            .into_tuple::<Uuid>()
            .all(&state.orm)
            .await?;

        let subscriptions = Follows::find()
            .select_only()
            .column(follows::Column::FollowingId)
            .filter(follows::Column::FollowerId.eq(user.user_id))
            .into_tuple::<Uuid>()
            .all(&state.orm)
            .await?;

        Ok(Self::new(
            user.user_id,
            favorites.into_iter().collect(),
            cart.into_iter().collect(),
            subscriptions.into_iter().collect(),
        ))
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn is_favorited(&self, recipe_id: Uuid) -> bool {
        self.favorites.contains(&recipe_id)
    }

    pub fn is_in_shopping_cart(&self, recipe_id: Uuid) -> bool {
        self.cart.contains(&recipe_id)
    }

    pub fn is_subscribed(&self, user_id: Uuid) -> bool {
        self.subscriptions.contains(&user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_viewer_has_no_memberships() {
        let viewer = ViewerContext::anonymous();
        let id = Uuid::new_v4();
        assert_eq!(viewer.user_id(), None);
        assert!(!viewer.is_favorited(id));
        assert!(!viewer.is_in_shopping_cart(id));
        assert!(!viewer.is_subscribed(id));
    }

    #[test]
    fn membership_is_a_set_lookup() {
        let (fav, cart, author) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let viewer = ViewerContext::new(
            Uuid::new_v4(),
            HashSet::from([fav]),
            HashSet::from([cart]),
            HashSet::from([author]),
        );
        assert!(viewer.is_favorited(fav));
        assert!(!viewer.is_favorited(cart));
        assert!(viewer.is_in_shopping_cart(cart));
        assert!(viewer.is_subscribed(author));
        assert!(!viewer.is_subscribed(fav));
    }
}
