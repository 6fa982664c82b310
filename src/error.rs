use std::collections::BTreeMap;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

use crate::response::{ApiResponse, Meta};

/// Per-field validation messages, keyed by payload field name.
#[derive(Debug, Default, Clone, Serialize, ToSchema, PartialEq, Eq)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing was recorded, otherwise a validation error.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(self))
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        collect_validation(&mut fields, None, &errors);
        fields
    }
}

/// Nested and list errors are reported under their top-level field.
fn collect_validation(fields: &mut FieldErrors, parent: Option<&str>, errors: &ValidationErrors) {
    for (field, kind) in errors.errors() {
        let key = parent.map_or_else(|| field.to_string(), str::to_string);
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    fields.add(key.clone(), validation_message(error));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_validation(fields, Some(&key), inner),
            ValidationErrorsKind::List(items) => {
                for inner in items.values() {
                    collect_validation(fields, Some(&key), inner);
                }
            }
        }
    }
}

fn validation_message(error: &ValidationError) -> String {
    match &error.message {
        Some(message) => message.to_string(),
        None => format!("Invalid value ({}).", error.code),
    }
}

const JSON_BODY_PREFIX: &str = "Failed to deserialize the JSON body into the target type: ";

/// Field a JSON data error points at, from the `path: message` body text.
fn rejected_field(detail: &str) -> Option<(String, String)> {
    let (path, message) = detail.strip_prefix(JSON_BODY_PREFIX)?.split_once(": ")?;
    let is_path = !path.is_empty()
        && path
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '[' | ']'));
    if !is_path {
        return None;
    }
    let field = path.split(['.', '[']).next().unwrap_or(path);
    Some((field.to_string(), message.to_string()))
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(FieldErrors),

    #[error("Authentication credentials were not provided")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let detail = rejection.body_text();
        match rejection {
            JsonRejection::JsonDataError(_) => match rejected_field(&detail) {
                Some((field, message)) => {
                    let mut fields = FieldErrors::new();
                    fields.add(field, message);
                    AppError::Validation(fields)
                }
                None => AppError::BadRequest(detail),
            },
            _ => AppError::BadRequest(detail),
        }
    }
}

impl AppError {
    /// Maps a unique-constraint violation to a conflict with `detail`, anything else stays an ORM error.
    pub fn conflict_on_unique(err: DbErr, detail: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => AppError::BadRequest(detail.to_string()),
            _ => AppError::OrmError(err),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<FieldErrors>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed");
        }

        let error = match &self {
            AppError::BadRequest(detail) => detail.clone(),
            _ => self.to_string(),
        };
        let fields = match self {
            AppError::Validation(fields) => Some(fields),
            _ => None,
        };

        let body = ApiResponse {
            message: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            data: Some(ErrorData { error, fields }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_field_errors_pass() {
        assert!(FieldErrors::new().into_result().is_ok());
    }

    #[test]
    fn field_errors_collect_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("cooking_time", "must be at least 1");
        errors.add("cooking_time", "second");
        errors.add("name", "required");
        assert_eq!(errors.get("cooking_time").map(<[String]>::len), Some(2));
        match errors.into_result() {
            Err(AppError::Validation(fields)) => assert!(fields.contains("name")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::BadRequest("dup".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Validation(FieldErrors::new()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
    }

    #[derive(validator::Validate)]
    struct Sample {
        #[validate(length(min = 3, message = "too short"))]
        name: String,
        #[validate(range(min = 1))]
        count: i64,
    }

    #[test]
    fn validation_errors_become_field_errors() {
        let sample = Sample {
            name: "ab".into(),
            count: 0,
        };
        let errors = match validator::Validate::validate(&sample) {
            Err(errors) => FieldErrors::from(errors),
            Ok(()) => panic!("sample should be invalid"),
        };
        assert_eq!(errors.get("name"), Some(&["too short".to_string()][..]));
        assert!(errors.contains("count"));
    }

    #[test]
    fn json_data_error_points_at_top_level_field() {
        let detail = format!(
            "{JSON_BODY_PREFIX}ingredients[0].id: invalid length 3 at line 1 column 20"
        );
        let (field, message) = rejected_field(&detail).expect("field");
        assert_eq!(field, "ingredients");
        assert!(message.starts_with("invalid length"));

        let detail = format!("{JSON_BODY_PREFIX}missing field `name` at line 1 column 2");
        assert!(rejected_field(&detail).is_none());
    }
}
