use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    error::{AppResult, FieldErrors},
    media::{DecodedImage, decode_image},
    models::{Recipe, RecipeLink, ShortRecipe},
};

const REQUIRED: &str = "This field is required.";

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct IngredientAmountRequest {
    pub id: Uuid,
    pub amount: i64,
}

/// Write payload for create (POST), replace (PUT) and partial update (PATCH).
///
/// Every field is optional at the wire level so that missing fields come back
/// as per-field validation messages instead of a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema, Validate)]
pub struct RecipeWriteRequest {
    pub tags: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<IngredientAmountRequest>>,
    /// Base64 data URI, e.g. `data:image/png;base64,iVBOR...`.
    pub image: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters."))]
    pub name: Option<String>,
    #[validate(custom(function = "not_blank", message = "This field may not be blank."))]
    pub text: Option<String>,
    #[validate(range(
        min = 1,
        max = 32767,
        message = "Cooking time must be between 1 and 32767 minutes."
    ))]
    pub cooking_time: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub ingredient_id: Uuid,
    pub amount: i32,
}

/// Validated recipe changes. `None` means "keep the current value".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipePatch {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i16>,
    pub tags: Option<Vec<Uuid>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub image: Option<DecodedImage>,
}

impl RecipeWriteRequest {
    /// Validate the payload. With `require_all`, every field except `image` must be present.
    pub fn into_patch(self, require_all: bool) -> AppResult<RecipePatch> {
        let mut request = self;
        request.name = request.name.map(|name| name.trim().to_string());
        let mut errors = match request.validate() {
            Ok(()) => FieldErrors::new(),
            Err(invalid) => FieldErrors::from(invalid),
        };

        let name = required(request.name, "name", require_all, &mut errors);
        let text = required(request.text, "text", require_all, &mut errors);
        let cooking_time = required(request.cooking_time, "cooking_time", require_all, &mut errors)
            .and_then(|minutes| i16::try_from(minutes).ok());
        let tags = required(request.tags, "tags", require_all, &mut errors)
            .and_then(|tags| check_tags(tags, &mut errors));
        let ingredients = required(request.ingredients, "ingredients", require_all, &mut errors)
            .and_then(|items| check_ingredients(items, &mut errors));
        let image = request
            .image
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| match decode_image(&raw) {
                Ok(image) => Some(image),
                Err(err) => {
                    errors.add("image", err.to_string());
                    None
                }
            });

        errors.into_result()?;

        Ok(RecipePatch {
            name,
            text,
            cooking_time,
            tags,
            ingredients,
            image,
        })
    }
}

fn required<T>(
    value: Option<T>,
    field: &str,
    require_all: bool,
    errors: &mut FieldErrors,
) -> Option<T> {
    if value.is_none() && require_all {
        errors.add(field, REQUIRED);
    }
    value
}

fn not_blank(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

fn check_tags(tags: Vec<Uuid>, errors: &mut FieldErrors) -> Option<Vec<Uuid>> {
    let mut seen = HashSet::new();
    if tags.iter().any(|id| !seen.insert(*id)) {
        errors.add("tags", "Tags must not repeat.");
        return None;
    }
    Some(tags)
}

fn check_ingredients(
    items: Vec<IngredientAmountRequest>,
    errors: &mut FieldErrors,
) -> Option<Vec<IngredientAmount>> {
    if items.is_empty() {
        errors.add("ingredients", "A recipe needs at least one ingredient.");
        return None;
    }

    let mut seen = HashSet::new();
    let mut valid = Vec::with_capacity(items.len());
    let before = errors.clone();
    for item in items {
        if !seen.insert(item.id) {
            errors.add("ingredients", format!("Ingredient {} is listed twice.", item.id));
            continue;
        }
        match i32::try_from(item.amount) {
            Ok(amount) if amount >= 1 => valid.push(IngredientAmount {
                ingredient_id: item.id,
                amount,
            }),
            _ => errors.add(
                "ingredients",
                format!("Amount of ingredient {} must be a positive number.", item.id),
            ),
        }
    }

    (*errors == before).then_some(valid)
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct RecipeList {
    #[schema(value_type = Vec<Recipe>)]
    pub items: Vec<Recipe>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ShortRecipeList {
    #[schema(value_type = Vec<ShortRecipe>)]
    pub items: Vec<ShortRecipe>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct RecipeLinkList {
    #[schema(value_type = Vec<RecipeLink>)]
    pub items: Vec<RecipeLink>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn full_request() -> RecipeWriteRequest {
        RecipeWriteRequest {
            tags: Some(vec![Uuid::new_v4()]),
            ingredients: Some(vec![IngredientAmountRequest {
                id: Uuid::new_v4(),
                amount: 5,
            }]),
            image: None,
            name: Some("  Soup ".into()),
            text: Some("Boil water".into()),
            cooking_time: Some(10),
        }
    }

    fn fields_of(result: AppResult<RecipePatch>) -> FieldErrors {
        match result {
            Err(AppError::Validation(fields)) => fields,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn full_payload_is_valid() {
        let patch = full_request().into_patch(true).expect("valid");
        assert_eq!(patch.name.as_deref(), Some("Soup"));
        assert_eq!(patch.cooking_time, Some(10));
        assert_eq!(patch.ingredients.map(|i| i.len()), Some(1));
    }

    #[test]
    fn cooking_time_must_be_positive() {
        for minutes in [0, -5] {
            let request = RecipeWriteRequest {
                cooking_time: Some(minutes),
                ..full_request()
            };
            let fields = fields_of(request.into_patch(true));
            assert!(fields.contains("cooking_time"));
        }
    }

    #[test]
    fn cooking_time_must_fit_smallint() {
        let request = RecipeWriteRequest {
            cooking_time: Some(40_000),
            ..full_request()
        };
        assert!(fields_of(request.into_patch(true)).contains("cooking_time"));
    }

    #[test]
    fn strict_mode_reports_every_missing_field() {
        let fields = fields_of(RecipeWriteRequest::default().into_patch(true));
        for field in ["name", "text", "cooking_time", "tags", "ingredients"] {
            assert!(fields.contains(field), "{field} should be required");
        }
        assert!(!fields.contains("image"));
    }

    #[test]
    fn partial_mode_accepts_missing_fields() {
        let request = RecipeWriteRequest {
            name: Some("New name".into()),
            ..RecipeWriteRequest::default()
        };
        let patch = request.into_patch(false).expect("valid patch");
        assert_eq!(patch.name.as_deref(), Some("New name"));
        assert!(patch.tags.is_none());
        assert!(patch.ingredients.is_none());
        assert!(patch.cooking_time.is_none());
    }

    #[test]
    fn blank_name_and_text_are_rejected() {
        let request = RecipeWriteRequest {
            name: Some("   ".into()),
            text: Some("\n".into()),
            ..full_request()
        };
        let fields = fields_of(request.into_patch(false));
        assert!(fields.contains("name"));
        assert!(fields.contains("text"));
    }

    #[test]
    fn duplicate_ingredients_are_rejected() {
        let id = Uuid::new_v4();
        let request = RecipeWriteRequest {
            ingredients: Some(vec![
                IngredientAmountRequest { id, amount: 1 },
                IngredientAmountRequest { id, amount: 2 },
            ]),
            ..full_request()
        };
        assert!(fields_of(request.into_patch(true)).contains("ingredients"));
    }

    #[test]
    fn zero_amount_is_rejected() {
        let request = RecipeWriteRequest {
            ingredients: Some(vec![IngredientAmountRequest {
                id: Uuid::new_v4(),
                amount: 0,
            }]),
            ..full_request()
        };
        assert!(fields_of(request.into_patch(true)).contains("ingredients"));
    }

    #[test]
    fn empty_ingredient_list_is_rejected() {
        let request = RecipeWriteRequest {
            ingredients: Some(vec![]),
            ..full_request()
        };
        assert!(fields_of(request.into_patch(true)).contains("ingredients"));
    }

    #[test]
    fn duplicate_tags_are_rejected() {
        let tag = Uuid::new_v4();
        let request = RecipeWriteRequest {
            tags: Some(vec![tag, tag]),
            ..full_request()
        };
        assert!(fields_of(request.into_patch(true)).contains("tags"));
    }

    #[test]
    fn broken_image_is_a_field_error() {
        let request = RecipeWriteRequest {
            image: Some("data:image/png;base64,@@@".into()),
            ..full_request()
        };
        assert!(fields_of(request.into_patch(true)).contains("image"));
    }
}
