//! Bootstrap the first administrator account.
//!
//! Usage:
//!   DATABASE_URL=... create-admin --email admin@example.pl \
//!       --full-name "Anna Nowak" --password '...'

use anyhow::Context;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

#[derive(Parser)]
#[command(about = "Create an administrator account")]
struct Args {
    #[arg(long)]
    email: String,
    #[arg(long)]
    full_name: String,
    #[arg(long)]
    password: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if args.password.chars().count() < 8 {
        anyhow::bail!("Password must be at least 8 characters");
    }

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL required")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    korepetycje_api::db::run_migrations(&pool).await?;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&args.email)
        .fetch_one(&pool)
        .await?;
    if exists {
        anyhow::bail!("A user with email {} already exists", args.email);
    }

    let password_hash = bcrypt::hash(&args.password, 12)?;

    let mut tx = pool.begin().await?;
    let user_id: Uuid =
        sqlx::query_scalar("INSERT INTO users (email, password_hash) VALUES ($1, $2) RETURNING id")
            .bind(&args.email)
            .bind(&password_hash)
            .fetch_one(&mut *tx)
            .await?;
    sqlx::query("INSERT INTO user_profiles (user_id, role, full_name) VALUES ($1, 'administrator', $2)")
        .bind(user_id)
        .bind(&args.full_name)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO auth_settings (user_id) VALUES ($1)")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    println!("Administrator created: {} ({})", args.email, user_id);
    Ok(())
}
