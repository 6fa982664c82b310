use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, TokenResponse},
        ingredients::{IngredientList, IngredientQuery, IngredientRequest},
        recipes::{IngredientAmountRequest, RecipeLinkList, RecipeList, RecipeWriteRequest, ShortRecipeList},
        tags::{TagList, TagRequest},
        users::{RegisterRequest, SetPasswordRequest, SubscriptionList, SubscriptionsQuery, UserList},
    },
    error::FieldErrors,
    models::{Ingredient, Recipe, RecipeIngredient, RecipeLink, ShortRecipe, Subscription, Tag, User},
    response::{ApiResponse, Meta},
    routes::{auth, cart, favorites, health, ingredients, params, recipes, tags, users},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::token_login,
        recipes::list_recipes,
        recipes::get_recipe,
        recipes::create_recipe,
        recipes::replace_recipe,
        recipes::patch_recipe,
        recipes::delete_recipe,
        recipes::recipe_image,
        recipes::download_shopping_cart,
        favorites::list_favorites,
        favorites::add_favorite,
        favorites::remove_favorite,
        cart::cart_list,
        cart::add_to_cart,
        cart::remove_from_cart,
        tags::list_tags,
        tags::get_tag,
        tags::create_tag,
        tags::update_tag,
        tags::delete_tag,
        ingredients::list_ingredients,
        ingredients::get_ingredient,
        ingredients::create_ingredient,
        ingredients::update_ingredient,
        ingredients::delete_ingredient,
        users::list_users,
        users::register,
        users::get_user,
        users::me,
        users::set_password,
        users::list_subscriptions,
        users::subscribe,
        users::unsubscribe
    ),
    components(
        schemas(
            User,
            Tag,
            Ingredient,
            Recipe,
            RecipeIngredient,
            ShortRecipe,
            RecipeLink,
            Subscription,
            FieldErrors,
            LoginRequest,
            TokenResponse,
            RegisterRequest,
            SetPasswordRequest,
            SubscriptionsQuery,
            TagRequest,
            IngredientRequest,
            IngredientQuery,
            IngredientAmountRequest,
            RecipeWriteRequest,
            RecipeList,
            ShortRecipeList,
            RecipeLinkList,
            TagList,
            IngredientList,
            UserList,
            SubscriptionList,
            params::Pagination,
            Meta,
            ApiResponse<Recipe>,
            ApiResponse<RecipeList>,
            ApiResponse<User>,
            ApiResponse<Subscription>,
            ApiResponse<SubscriptionList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Token login"),
        (name = "Recipes", description = "Recipe endpoints"),
        (name = "Favorites", description = "Favorite endpoints"),
        (name = "Shopping cart", description = "Shopping cart endpoints"),
        (name = "Tags", description = "Tag endpoints"),
        (name = "Ingredients", description = "Ingredient endpoints"),
        (name = "Users", description = "Users and subscriptions"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
