use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AssignGuardianRequest {
    pub user_id: Uuid,
}

/// Guardian listed for a student, joined with the profile and account.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GuardianUser {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
}
