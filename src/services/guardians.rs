use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{guardian::GuardianUser, student::Student, user::UserRole};

pub struct GuardianService;

impl GuardianService {
    pub async fn list_for_student(
        pool: &PgPool,
        student_id: Uuid,
    ) -> anyhow::Result<Vec<GuardianUser>> {
        let guardians = sqlx::query_as::<_, GuardianUser>(
            "SELECT p.user_id, u.email, p.full_name, p.phone \
             FROM opiekun_uczen ou \
             JOIN user_profiles p ON p.user_id = ou.user_id \
             JOIN users u ON u.id = ou.user_id \
             WHERE ou.student_id = $1 \
             ORDER BY p.full_name",
        )
        .bind(student_id)
        .fetch_all(pool)
        .await?;
        Ok(guardians)
    }

    /// Students visible to a guardian: only the ones they are linked to.
    pub async fn students_for_guardian(
        pool: &PgPool,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<Student>> {
        let students = sqlx::query_as::<_, Student>(
            "SELECT s.* FROM uczniowie s \
             JOIN opiekun_uczen ou ON ou.student_id = s.id \
             WHERE ou.user_id = $1 \
             ORDER BY s.nazwisko",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(students)
    }

    pub async fn is_guardian_of(
        pool: &PgPool,
        student_id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM opiekun_uczen WHERE student_id = $1 AND user_id = $2)",
        )
        .bind(student_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(exists)
    }

    /// Link a guardian to a student. The target account must carry the
    /// guardian role.
    pub async fn assign(pool: &PgPool, student_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        let role: Option<String> =
            sqlx::query_scalar("SELECT role FROM user_profiles WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        let is_guardian = role
            .and_then(|r| r.parse::<UserRole>().ok())
            .is_some_and(|r| r == UserRole::Opiekun);
        if !is_guardian {
            anyhow::bail!("Użytkownik nie ma roli opiekuna");
        }

        sqlx::query(
            "INSERT INTO opiekun_uczen (student_id, user_id) VALUES ($1, $2) \
             ON CONFLICT (student_id, user_id) DO NOTHING",
        )
        .bind(student_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn remove(pool: &PgPool, student_id: Uuid, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM opiekun_uczen WHERE student_id = $1 AND user_id = $2")
            .bind(student_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
