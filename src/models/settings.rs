use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::{SqlValue, ToRow};

/// Per-user security settings; the failed-login counter and lock expiry
/// are written by the login flow, everything else by the owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AuthSettings {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub enable_2fa: bool,
    pub session_timeout_minutes: i32,
    pub require_password_change: bool,
    pub last_password_change: Option<DateTime<Utc>>,
    pub failed_login_attempts: i32,
    pub account_locked_until: Option<DateTime<Utc>>,
    pub email_notifications: bool,
    pub login_notification: bool,
    pub allowed_ip_addresses: Option<Vec<String>>,
    pub security_questions_set: bool,
    pub backup_email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAuthSettingsRequest {
    pub enable_2fa: Option<bool>,
    pub session_timeout_minutes: Option<i32>,
    pub email_notifications: Option<bool>,
    pub login_notification: Option<bool>,
    pub allowed_ip_addresses: Option<Vec<String>>,
    pub backup_email: Option<String>,
}

impl UpdateAuthSettingsRequest {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(minutes) = self.session_timeout_minutes {
            if !(5..=480).contains(&minutes) {
                return Err("Limit sesji musi być w zakresie 5-480 minut".into());
            }
        }
        Ok(())
    }
}

impl ToRow for UpdateAuthSettingsRequest {
    fn to_row(&self) -> Vec<(&'static str, SqlValue)> {
        let mut row = Vec::new();
        if let Some(v) = self.enable_2fa {
            row.push(("enable_2fa", v.into()));
        }
        if let Some(v) = self.session_timeout_minutes {
            row.push(("session_timeout_minutes", v.into()));
        }
        if let Some(v) = self.email_notifications {
            row.push(("email_notifications", v.into()));
        }
        if let Some(v) = self.login_notification {
            row.push(("login_notification", v.into()));
        }
        if let Some(v) = &self.allowed_ip_addresses {
            row.push(("allowed_ip_addresses", v.clone().into()));
        }
        if let Some(v) = &self.backup_email {
            row.push(("backup_email", v.clone().into()));
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_timeout_bounds() {
        let mut req = UpdateAuthSettingsRequest::default();
        assert!(req.validate().is_ok());
        req.session_timeout_minutes = Some(4);
        assert!(req.validate().is_err());
        req.session_timeout_minutes = Some(481);
        assert!(req.validate().is_err());
        req.session_timeout_minutes = Some(60);
        assert!(req.validate().is_ok());
    }
}
