use rand::{distributions::Alphanumeric, Rng};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::user::{InvitationToken, UserRole, UserWithEmail},
    services::{email::EmailService, metrics},
};

const INVITE_TOKEN_LEN: usize = 48;
const INVITE_EXPIRY_DAYS: i32 = 7;

fn build_invite_url(base_url: &str, token: &str) -> String {
    format!("{}/register?token={}", base_url.trim_end_matches('/'), token)
}

pub struct UserService;

impl UserService {
    /// The caller's role as persisted in the profile store. Privileged
    /// handlers use this, never the role claimed by the client.
    pub async fn role_of(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<UserRole>> {
        let role: Option<String> = sqlx::query_scalar(
            "SELECT role FROM user_profiles WHERE user_id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(role.and_then(|r| r.parse().ok()))
    }

    /// All profiles, each with the email derived from the account row.
    pub async fn list_with_email(pool: &PgPool) -> anyhow::Result<Vec<UserWithEmail>> {
        let users = sqlx::query_as::<_, UserWithEmail>(
            "SELECT p.user_id, u.email, p.role, p.full_name, p.phone, p.is_active, \
                    p.last_login_at, p.created_at \
             FROM user_profiles p JOIN users u ON u.id = p.user_id \
             ORDER BY p.created_at DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(users)
    }

    /// Issue an invitation and email the registration link when SMTP is
    /// configured. Any previous pending invitation for the address is
    /// invalidated.
    pub async fn invite(
        pool: &PgPool,
        email_svc: Option<&EmailService>,
        app_base_url: &str,
        invited_by: Uuid,
        email: &str,
        full_name: &str,
        role: UserRole,
    ) -> anyhow::Result<InvitationToken> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(pool)
                .await?;
        if exists {
            anyhow::bail!("User already registered");
        }

        sqlx::query("UPDATE invitation_tokens SET used = TRUE WHERE email = $1 AND used = FALSE")
            .bind(email)
            .execute(pool)
            .await?;

        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(INVITE_TOKEN_LEN)
            .map(char::from)
            .collect();

        let invitation = sqlx::query_as::<_, InvitationToken>(
            "INSERT INTO invitation_tokens (email, full_name, role, token, invited_by, expires_at) \
             VALUES ($1, $2, $3, $4, $5, NOW() + make_interval(days => $6)) \
             RETURNING *",
        )
        .bind(email)
        .bind(full_name)
        .bind(role.to_string())
        .bind(&token)
        .bind(invited_by)
        .bind(INVITE_EXPIRY_DAYS)
        .fetch_one(pool)
        .await?;

        if let Some(svc) = email_svc {
            let url = build_invite_url(app_base_url, &invitation.token);
            if let Err(e) = svc
                .send_invitation(email, full_name, &role.to_string(), &url)
                .await
            {
                tracing::warn!("invitation email to {email} failed: {e}");
            }
        }

        metrics::INVITATIONS
            .with_label_values(&[&role.to_string()])
            .inc();
        Ok(invitation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invite_url_joins_base_and_token() {
        assert_eq!(
            build_invite_url("https://korki.example.pl", "abc123"),
            "https://korki.example.pl/register?token=abc123"
        );
        assert_eq!(
            build_invite_url("https://korki.example.pl/", "abc123"),
            "https://korki.example.pl/register?token=abc123"
        );
    }
}
