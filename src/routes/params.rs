use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{AppResult, FieldErrors};

pub const MAX_PER_PAGE: i64 = 100;
/// Highest page whose offset still fits in an `i64`.
pub const MAX_PAGE: i64 = i64::MAX / MAX_PER_PAGE;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    /// Returns `(page, per_page, offset)` with `per_page` defaulting to `default_per_page`.
    pub fn normalize(&self, default_per_page: i64) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).clamp(1, MAX_PAGE);
        let per_page = self
            .per_page
            .unwrap_or(default_per_page)
            .clamp(1, MAX_PER_PAGE);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

/// Recipe list filters. `tags` may repeat (`?tags=a&tags=b`), so this is
/// built from raw query pairs rather than a flat struct.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecipeListQuery {
    pub pagination: Pagination,
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub author: Option<Uuid>,
}

impl RecipeListQuery {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> AppResult<Self> {
        let mut query = Self::default();
        let mut errors = FieldErrors::new();

        for (key, value) in pairs {
            match key.as_str() {
                "tags" => {
                    let slug = value.trim();
                    if !slug.is_empty() {
                        query.tags.push(slug.to_string());
                    }
                }
                "is_favorited" => query.is_favorited = value == "1",
                "is_in_shopping_cart" => query.is_in_shopping_cart = value == "1",
                "author" => match Uuid::parse_str(value.trim()) {
                    Ok(id) => query.author = Some(id),
                    Err(_) => errors.add("author", "Enter a valid UUID."),
                },
                "page" => match value.parse::<i64>() {
                    Ok(page) => query.pagination.page = Some(page),
                    Err(_) => errors.add("page", "A valid integer is required."),
                },
                "per_page" | "limit" => match value.parse::<i64>() {
                    Ok(per_page) => query.pagination.per_page = Some(per_page),
                    Err(_) => errors.add(key.as_str(), "A valid integer is required."),
                },
                _ => {}
            }
        }

        errors.into_result()?;
        query.tags.sort_unstable();
        query.tags.dedup();
        Ok(query)
    }
}

/// Documentation-only view of the recipe list query string.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
#[allow(dead_code)]
pub struct RecipeListParams {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Tag slug; repeat to match any of several tags.
    pub tags: Option<Vec<String>>,
    /// `1` to list only the caller's favorites.
    pub is_favorited: Option<String>,
    /// `1` to list only recipes in the caller's shopping cart.
    pub is_in_shopping_cart: Option<String>,
    pub author: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn normalize_clamps_and_defaults() {
        let p = Pagination::default();
        assert_eq!(p.normalize(6), (1, 6, 0));
        let p = Pagination {
            page: Some(3),
            per_page: Some(500),
        };
        assert_eq!(p.normalize(6), (3, 100, 200));
        let p = Pagination {
            page: Some(0),
            per_page: Some(0),
        };
        assert_eq!(p.normalize(6), (1, 1, 0));
    }

    #[test]
    fn huge_page_is_capped() {
        let p = Pagination {
            page: Some(i64::MAX),
            per_page: None,
        };
        let (page, per_page, offset) = p.normalize(6);
        assert_eq!(page, MAX_PAGE);
        assert_eq!(offset, (MAX_PAGE - 1) * per_page);

        let p = Pagination {
            page: Some(i64::MAX),
            per_page: Some(i64::MAX),
        };
        let (_, per_page, offset) = p.normalize(6);
        assert_eq!(per_page, MAX_PER_PAGE);
        assert!(offset > 0);

        let query = RecipeListQuery::from_pairs(pairs(&[("page", "9223372036854775807")]))
            .expect("valid query");
        assert_eq!(query.pagination.normalize(6).0, MAX_PAGE);
    }

    #[test]
    fn repeated_tags_and_flags() {
        let query = RecipeListQuery::from_pairs(pairs(&[
            ("tags", "breakfast"),
            ("tags", "dinner"),
            ("is_favorited", "1"),
            ("is_in_shopping_cart", "0"),
            ("page", "2"),
        ]))
        .expect("valid query");
        assert_eq!(query.tags, vec!["breakfast", "dinner"]);
        assert!(query.is_favorited);
        assert!(!query.is_in_shopping_cart);
        assert_eq!(query.pagination.page, Some(2));
    }

    #[test]
    fn flags_only_activate_on_one() {
        let query = RecipeListQuery::from_pairs(pairs(&[("is_favorited", "true")]))
            .expect("valid query");
        assert!(!query.is_favorited);
    }

    #[test]
    fn invalid_author_is_a_field_error() {
        assert!(RecipeListQuery::from_pairs(pairs(&[("author", "bob")])).is_err());
    }
}
