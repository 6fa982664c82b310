use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use validator::{Validate, ValidationError};

use crate::{
    error::AppResult,
    models::{Subscription, User},
};

pub const SUBSCRIPTIONS_PAGE_SIZE: i64 = 6;

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address."))]
    #[validate(length(max = 254, message = "Ensure this field has no more than 254 characters."))]
    pub email: String,
    #[validate(length(min = 1, max = 150, message = "Use 1-150 characters."))]
    #[validate(custom(
        function = "username_characters",
        message = "Use only letters, digits and @/./+/-/_ characters."
    ))]
    pub username: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    pub last_name: String,
    #[validate(length(min = 8, message = "Password must contain at least 8 characters."))]
    pub password: String,
}

impl RegisterRequest {
    /// Trim names, lower-case the email, then check every field.
    pub fn into_valid(self) -> AppResult<Self> {
        let request = Self {
            email: self.email.trim().to_lowercase(),
            username: self.username.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            password: self.password,
        };
        request.validate()?;
        Ok(request)
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct SetPasswordRequest {
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must contain at least 8 characters."))]
    pub new_password: String,
}

impl SetPasswordRequest {
    pub fn into_valid(self) -> AppResult<Self> {
        self.validate()?;
        Ok(self)
    }
}

fn username_characters(value: &str) -> Result<(), ValidationError> {
    if value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        Ok(())
    } else {
        Err(ValidationError::new("username"))
    }
}

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubscriptionsQuery {
    pub page: Option<i64>,
    /// Cap on recipes embedded per followed user.
    pub recipes_limit: Option<usize>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct UserList {
    #[schema(value_type = Vec<User>)]
    pub items: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct SubscriptionList {
    #[schema(value_type = Vec<Subscription>)]
    pub items: Vec<Subscription>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    fn request() -> RegisterRequest {
        RegisterRequest {
            email: " Cook@Example.com ".into(),
            username: "cook".into(),
            first_name: "Julia".into(),
            last_name: "Child".into(),
            password: "longenough".into(),
        }
    }

    #[test]
    fn normalises_email() {
        let valid = request().into_valid().expect("valid");
        assert_eq!(valid.email, "cook@example.com");
    }

    #[test]
    fn rejects_bad_fields() {
        let bad = RegisterRequest {
            email: "nope".into(),
            username: "has space".into(),
            password: "short".into(),
            ..request()
        };
        match bad.into_valid() {
            Err(AppError::Validation(fields)) => {
                assert!(fields.contains("email"));
                assert!(fields.contains("username"));
                assert!(fields.contains("password"));
                assert!(!fields.contains("first_name"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn username_length_is_capped_and_punctuation_allowed() {
        let long = RegisterRequest {
            username: "a".repeat(151),
            ..request()
        };
        assert!(matches!(long.into_valid(), Err(AppError::Validation(f)) if f.contains("username")));

        let dotted = RegisterRequest {
            username: "julia.child+1@home".into(),
            ..request()
        };
        assert!(dotted.into_valid().is_ok());
    }

    #[test]
    fn blank_current_password_is_rejected() {
        let result = SetPasswordRequest {
            current_password: String::new(),
            new_password: "long enough".into(),
        }
        .into_valid();
        assert!(matches!(result, Err(AppError::Validation(f)) if f.contains("current_password")));
    }

    #[test]
    fn new_password_has_minimum_length() {
        let result = SetPasswordRequest {
            current_password: "whatever".into(),
            new_password: "1234".into(),
        }
        .into_valid();
        assert!(matches!(result, Err(AppError::Validation(f)) if f.contains("new_password")));
    }
}
