use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use std::sync::Arc;

use crate::{
    config::Config,
    models::{
        auth::Claims,
        user::{LoginResponse, ProfileDto, RegisterFromInviteRequest, UserRole},
    },
    services::{email::EmailService, metrics},
};

/// Account joined with its profile — the shape the login flow needs.
#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: String,
    full_name: Option<String>,
    is_active: bool,
    last_login_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl AccountRow {
    fn into_profile(self) -> ProfileDto {
        ProfileDto {
            id: self.id,
            email: self.email,
            full_name: self.full_name,
            role: self.role.parse().unwrap_or(UserRole::Uczen),
            is_active: self.is_active,
            last_login_at: self.last_login_at,
        }
    }
}

const ACCOUNT_JOIN: &str = "SELECT u.id, u.email, u.password_hash, p.role, p.full_name, \
     p.is_active, p.last_login_at \
     FROM users u JOIN user_profiles p ON p.user_id = u.id";

pub struct AuthService;

impl AuthService {
    pub async fn login(
        pool: &PgPool,
        email_svc: Option<Arc<EmailService>>,
        config: &Config,
        email: &str,
        password: &str,
    ) -> anyhow::Result<LoginResponse> {
        let account = sqlx::query_as::<_, AccountRow>(&format!("{ACCOUNT_JOIN} WHERE u.email = $1"))
            .bind(email)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Nieprawidłowe dane logowania"))?;

        if !account.is_active {
            metrics::LOGINS.with_label_values(&["inactive"]).inc();
            anyhow::bail!("Konto jest nieaktywne");
        }

        let locked: Option<bool> = sqlx::query_scalar(
            "SELECT account_locked_until > NOW() FROM auth_settings WHERE user_id = $1",
        )
        .bind(account.id)
        .fetch_optional(pool)
        .await?
        .flatten();
        if locked == Some(true) {
            metrics::LOGINS.with_label_values(&["locked"]).inc();
            anyhow::bail!("Konto tymczasowo zablokowane. Spróbuj ponownie później.");
        }

        let valid = bcrypt::verify(password, &account.password_hash).unwrap_or(false);
        if !valid {
            Self::record_failed_login(pool, account.id, config).await?;
            metrics::LOGINS.with_label_values(&["failure"]).inc();
            anyhow::bail!("Nieprawidłowe dane logowania");
        }

        // Successful login: reset the lockout counter, stamp last login.
        sqlx::query(
            "UPDATE auth_settings SET failed_login_attempts = 0, account_locked_until = NULL \
             WHERE user_id = $1",
        )
        .bind(account.id)
        .execute(pool)
        .await?;
        sqlx::query("UPDATE user_profiles SET last_login_at = NOW() WHERE user_id = $1")
            .bind(account.id)
            .execute(pool)
            .await?;

        let role: UserRole = account.role.parse().unwrap_or(UserRole::Uczen);
        let access_token = Self::generate_access_token(
            account.id,
            role,
            &config.jwt_secret,
            config.jwt_expiry_seconds,
        )?;

        Self::notify_login(pool, email_svc, &account).await;
        metrics::LOGINS.with_label_values(&["success"]).inc();

        Ok(LoginResponse {
            access_token,
            user: account.into_profile(),
        })
    }

    async fn record_failed_login(pool: &PgPool, user_id: Uuid, config: &Config) -> anyhow::Result<()> {
        let lock_at = Utc::now() + Duration::minutes(config.lockout_minutes);
        sqlx::query(
            "UPDATE auth_settings \
             SET failed_login_attempts = failed_login_attempts + 1, \
                 account_locked_until = CASE \
                     WHEN failed_login_attempts + 1 >= $2 THEN $3 \
                     ELSE account_locked_until \
                 END \
             WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(config.max_failed_logins)
        .bind(lock_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Fire-and-forget login notification, honoring the user's setting.
    async fn notify_login(pool: &PgPool, email_svc: Option<Arc<EmailService>>, account: &AccountRow) {
        let Some(svc) = email_svc else { return };
        let wants: Option<bool> =
            sqlx::query_scalar("SELECT login_notification FROM auth_settings WHERE user_id = $1")
                .bind(account.id)
                .fetch_optional(pool)
                .await
                .unwrap_or(None);
        if wants != Some(true) {
            return;
        }
        // The send happens outside the login latency path.
        let email = account.email.clone();
        let name = account.full_name.clone().unwrap_or_default();
        tokio::spawn(async move {
            if let Err(e) = svc.send_login_notification(&email, &name, Utc::now()).await {
                tracing::warn!("login notification failed for {email}: {e}");
            }
        });
    }

    pub fn generate_access_token(
        user_id: Uuid,
        role: UserRole,
        secret: &str,
        ttl_seconds: u64,
    ) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now,
            exp: now + ttl_seconds as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok(token)
    }

    pub async fn me(pool: &PgPool, user_id: Uuid) -> anyhow::Result<Option<ProfileDto>> {
        let account = sqlx::query_as::<_, AccountRow>(&format!("{ACCOUNT_JOIN} WHERE u.id = $1"))
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(account.map(AccountRow::into_profile))
    }

    /// Complete an invitation: create the account, profile (with the
    /// invited role) and default auth settings, and burn the token.
    pub async fn register_from_invite(
        pool: &PgPool,
        req: &RegisterFromInviteRequest,
    ) -> anyhow::Result<ProfileDto> {
        if req.password.chars().count() < 8 {
            anyhow::bail!("Hasło musi mieć co najmniej 8 znaków");
        }

        let mut tx = pool.begin().await?;

        let invitation: Option<(Uuid, String, String, String)> = sqlx::query_as(
            "SELECT id, email, full_name, role FROM invitation_tokens \
             WHERE token = $1 AND used = FALSE AND expires_at > NOW()",
        )
        .bind(&req.token)
        .fetch_optional(&mut *tx)
        .await?;
        let (invitation_id, email, full_name, role) = invitation
            .ok_or_else(|| anyhow::anyhow!("Nieprawidłowy lub wygasły token zaproszenia"))?;

        let password_hash = bcrypt::hash(&req.password, 12)?;

        let user_id: Uuid = sqlx::query_scalar(
            "INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING id",
        )
        .bind(&email)
        .bind(&password_hash)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO user_profiles (user_id, role, full_name, phone) VALUES ($1, $2, $3, $4)",
        )
        .bind(user_id)
        .bind(&role)
        .bind(&full_name)
        .bind(&req.phone)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO auth_settings (user_id) VALUES ($1)")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE invitation_tokens SET used = TRUE WHERE id = $1")
            .bind(invitation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(ProfileDto {
            id: user_id,
            email,
            full_name: Some(full_name),
            role: role.parse().unwrap_or(UserRole::Uczen),
            is_active: true,
            last_login_at: None,
        })
    }

    pub async fn change_password(
        pool: &PgPool,
        user_id: Uuid,
        current: &str,
        new: &str,
    ) -> anyhow::Result<()> {
        if new.chars().count() < 8 {
            anyhow::bail!("Hasło musi mieć co najmniej 8 znaków");
        }

        let hash: Option<String> =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        let hash = hash.ok_or_else(|| anyhow::anyhow!("Nie znaleziono użytkownika"))?;

        if !bcrypt::verify(current, &hash).unwrap_or(false) {
            anyhow::bail!("Obecne hasło jest nieprawidłowe");
        }

        let new_hash = bcrypt::hash(new, 12)?;
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(user_id)
            .bind(&new_hash)
            .execute(pool)
            .await?;
        sqlx::query(
            "UPDATE auth_settings SET last_password_change = NOW(), \
             require_password_change = FALSE WHERE user_id = $1",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
