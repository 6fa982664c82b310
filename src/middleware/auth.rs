use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError, state::AppState};

/// Authenticated caller, resolved from `Authorization: Bearer <jwt>` (or `Token <jwt>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl AuthUser {
    /// Fails with `Forbidden` unless the caller is `owner_id`.
    pub fn ensure_owner(&self, owner_id: Uuid) -> Result<(), AppError> {
        if self.user_id != owner_id {
            return Err(AppError::Forbidden);
        }
        Ok(())
    }
}

/// Strip the auth scheme and return the raw token.
fn token_from_header(value: &str) -> Result<&str, AppError> {
    ["Bearer ", "Token "]
        .iter()
        .find_map(|scheme| value.strip_prefix(scheme))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::BadRequest("Invalid Authorization scheme".into()))
}

pub fn decode_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;

    let user_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::BadRequest("Invalid user id in token".into()))?;

    Ok(AuthUser { user_id })
}

fn resolve(parts: &Parts, state: &AppState) -> Result<Option<AuthUser>, AppError> {
    let Some(auth_header) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::BadRequest("Invalid Authorization header".into()))?;

    let token = token_from_header(auth_str)?;
    decode_token(token, &state.config.jwt_secret).map(Some)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        resolve(parts, state)?.ok_or(AppError::Unauthorized)
    }
}

impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        resolve(parts, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::issue_token;

    #[test]
    fn accepts_bearer_and_token_schemes() {
        assert_eq!(token_from_header("Bearer abc").ok(), Some("abc"));
        assert_eq!(token_from_header("Token abc").ok(), Some("abc"));
        assert!(token_from_header("Basic abc").is_err());
        assert!(token_from_header("Bearer   ").is_err());
    }

    #[test]
    fn issued_token_decodes_to_same_user() {
        let user_id = Uuid::new_v4();
        let token = issue_token(user_id, "secret", 1).expect("token");
        let user = decode_token(&token, "secret").expect("decode");
        assert_eq!(user.user_id, user_id);
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = issue_token(Uuid::new_v4(), "secret", 1).expect("token");
        assert!(matches!(
            decode_token(&token, "other"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn ensure_owner_rejects_other_users() {
        let owner = Uuid::new_v4();
        let user = AuthUser { user_id: owner };
        assert!(user.ensure_owner(owner).is_ok());
        assert!(matches!(
            user.ensure_owner(Uuid::new_v4()),
            Err(AppError::Forbidden)
        ));
    }
}
