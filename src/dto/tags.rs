use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use validator::{Validate, ValidationError};

use crate::{error::AppResult, models::Tag};

/// Allowed tag colors as (hex code, label).
pub const TAG_COLORS: &[(&str, &str)] = &[
    ("#E26C2D", "orange"),
    ("#49B64E", "green"),
    ("#8775D2", "purple"),
    ("#F9A62B", "yellow"),
    ("#2F80ED", "blue"),
    ("#EB5757", "red"),
    ("#6FCF97", "mint"),
    ("#BB6BD9", "violet"),
];

pub fn is_allowed_color(color: &str) -> bool {
    TAG_COLORS
        .iter()
        .any(|(hex, _)| hex.eq_ignore_ascii_case(color))
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct TagRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters."))]
    pub name: String,
    #[validate(custom(function = "palette_color", message = "Choose a color from the tag palette."))]
    pub color: String,
    #[validate(length(min = 1, max = 200, message = "Slug must be between 1 and 200 characters."))]
    #[validate(custom(
        function = "slug_characters",
        message = "Enter a valid slug of letters, numbers, underscores or hyphens."
    ))]
    pub slug: String,
}

impl TagRequest {
    /// Trim fields, normalise the color to upper case and check every constraint.
    pub fn into_valid(self) -> AppResult<Self> {
        let request = Self {
            name: self.name.trim().to_string(),
            color: self.color.trim().to_ascii_uppercase(),
            slug: self.slug.trim().to_string(),
        };
        request.validate()?;
        Ok(request)
    }
}

fn palette_color(color: &str) -> Result<(), ValidationError> {
    if is_allowed_color(color) {
        Ok(())
    } else {
        Err(ValidationError::new("choice"))
    }
}

fn slug_characters(value: &str) -> Result<(), ValidationError> {
    if value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("slug"))
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct TagList {
    #[schema(value_type = Vec<Tag>)]
    pub items: Vec<Tag>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_and_accepts_palette_color() {
        let tag = TagRequest {
            name: " Breakfast ".into(),
            color: "#e26c2d".into(),
            slug: "breakfast".into(),
        }
        .into_valid()
        .expect("valid");
        assert_eq!(tag.name, "Breakfast");
        assert_eq!(tag.color, "#E26C2D");
    }

    #[test]
    fn rejects_unknown_color_and_bad_slug() {
        let result = TagRequest {
            name: "Lunch".into(),
            color: "#000000".into(),
            slug: "lunch time".into(),
        }
        .into_valid();
        match result {
            Err(crate::error::AppError::Validation(fields)) => {
                assert!(fields.contains("color"));
                assert!(fields.contains("slug"));
                assert!(!fields.contains("name"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn blank_name_is_rejected_after_trimming() {
        let result = TagRequest {
            name: "   ".into(),
            color: "#49B64E".into(),
            slug: "green".into(),
        }
        .into_valid();
        assert!(matches!(result, Err(crate::error::AppError::Validation(f)) if f.contains("name")));
    }
}
