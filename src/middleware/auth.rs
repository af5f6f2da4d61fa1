use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{json, Value};

use crate::models::auth::{AuthenticatedUser, Claims};

/// Extension type to carry the JWT secret through request extensions.
#[derive(Clone)]
pub struct JwtSecret(pub String);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| unauthorized("No authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| unauthorized("Invalid authorization header format"))?;

        let secret = parts.extensions.get::<JwtSecret>().ok_or((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "JWT secret not configured" })),
        ))?;

        decode_access_token(token, &secret.0).map_err(|_| unauthorized("Invalid token"))
    }
}

fn unauthorized(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": message })))
}

pub fn decode_access_token(token: &str, secret: &str) -> anyhow::Result<AuthenticatedUser> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<Claims>(token, &key, &validation)?;
    let claims = data.claims;

    Ok(AuthenticatedUser {
        user_id: claims.sub.parse()?,
        role: claims.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::UserRole;
    use crate::services::auth::AuthService;
    use uuid::Uuid;

    #[test]
    fn issued_token_decodes_back_to_the_user() {
        let user_id = Uuid::new_v4();
        let token =
            AuthService::generate_access_token(user_id, UserRole::Nauczyciel, "sekret", 900)
                .unwrap();
        let user = decode_access_token(&token, "sekret").unwrap();
        assert_eq!(user.user_id, user_id);
        assert_eq!(user.role, UserRole::Nauczyciel);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token =
            AuthService::generate_access_token(Uuid::new_v4(), UserRole::Uczen, "sekret", 900)
                .unwrap();
        assert!(decode_access_token(&token, "inny-sekret").is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(decode_access_token("not.a.jwt", "sekret").is_err());
    }
}
