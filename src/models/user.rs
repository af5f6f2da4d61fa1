use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Administrator,
    Konsultant,
    Nauczyciel,
    Opiekun,
    Uczen,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserRole::Administrator => "administrator",
            UserRole::Konsultant => "konsultant",
            UserRole::Nauczyciel => "nauczyciel",
            UserRole::Opiekun => "opiekun",
            UserRole::Uczen => "uczen",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "administrator" => Ok(UserRole::Administrator),
            "konsultant" => Ok(UserRole::Konsultant),
            "nauczyciel" => Ok(UserRole::Nauczyciel),
            "opiekun" => Ok(UserRole::Opiekun),
            "uczen" => Ok(UserRole::Uczen),
            _ => Err(anyhow::anyhow!("Unknown role: {s}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvitationToken {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub token: String,
    pub invited_by: Option<Uuid>,
    pub used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Profile joined with the account row — the admin listing shape.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserWithEmail {
    pub user_id: Uuid,
    pub email: String,
    pub role: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// Request/Response DTOs
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: ProfileDto,
}

#[derive(Debug, Serialize)]
pub struct ProfileDto {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct InviteUserRequest {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterFromInviteRequest {
    pub token: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trips_through_display() {
        for role in [
            UserRole::Administrator,
            UserRole::Konsultant,
            UserRole::Nauczyciel,
            UserRole::Opiekun,
            UserRole::Uczen,
        ] {
            assert_eq!(UserRole::from_str(&role.to_string()).unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(UserRole::from_str("superuser").is_err());
        assert!(UserRole::from_str("").is_err());
    }

    #[test]
    fn role_serde_uses_wire_strings() {
        assert_eq!(
            serde_json::to_string(&UserRole::Nauczyciel).unwrap(),
            "\"nauczyciel\""
        );
        let parsed: UserRole = serde_json::from_str("\"opiekun\"").unwrap();
        assert_eq!(parsed, UserRole::Opiekun);
    }
}
