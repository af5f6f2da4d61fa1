use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserRole;
use crate::permissions::Capabilities;

/// Claims embedded in the JWT access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user UUID
    pub role: UserRole,
    pub exp: usize,
    pub iat: usize,
}

/// Extracted from the validated JWT — available via Axum extractors
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_role(Some(self.role))
    }
}
