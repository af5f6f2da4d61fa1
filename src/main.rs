use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{AllowHeaders, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use korepetycje_api::{
    config::Config,
    db,
    middleware::auth::JwtSecret,
    routes,
    services::email::EmailService,
    store::{live::ChangeHub, Store},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let hub = Arc::new(ChangeHub::new());
    let store = Arc::new(Store::new(pool.clone(), hub.clone()));

    let email = EmailService::new(&config).map(Arc::new);
    if email.is_some() {
        info!("SMTP email service configured");
    } else {
        info!("SMTP not configured — email features disabled");
    }

    let state = AppState {
        db: pool,
        config: config.clone(),
        store,
        hub,
        email,
    };

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(Any);

    let jwt_secret = JwtSecret(config.jwt_secret.clone());

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        // Auth
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/register", post(routes::auth::register_from_invite))
        .route("/auth/me", get(routes::auth::me))
        .route("/auth/change-password", post(routes::auth::change_password))
        .route(
            "/auth/settings",
            get(routes::settings::get_settings).put(routes::settings::update_settings),
        )
        // Admin (privileged; role re-derived from the profile store)
        .route("/admin/users", get(routes::admin::list_users))
        .route("/admin/invite", post(routes::admin::invite_user))
        // Students
        .route(
            "/uczniowie",
            get(routes::students::list_students).post(routes::students::create_student),
        )
        .route(
            "/uczniowie/{id}",
            get(routes::students::get_student)
                .put(routes::students::update_student)
                .delete(routes::students::delete_student),
        )
        // Guardian links
        .route(
            "/uczniowie/{id}/opiekunowie",
            get(routes::guardians::list_guardians).post(routes::guardians::assign_guardian),
        )
        .route(
            "/uczniowie/{id}/opiekunowie/{user_id}",
            delete(routes::guardians::remove_guardian),
        )
        // Classes
        .route(
            "/zajecia",
            get(routes::classes::list_classes).post(routes::classes::create_class),
        )
        .route(
            "/zajecia/{id}",
            put(routes::classes::update_class).delete(routes::classes::delete_class),
        )
        // Payments
        .route(
            "/platnosci",
            get(routes::payments::list_payments).post(routes::payments::create_payment),
        )
        .route(
            "/platnosci/{id}",
            put(routes::payments::update_payment).delete(routes::payments::delete_payment),
        )
        // Diagnostics
        .route(
            "/diagnozy",
            get(routes::diagnostics::list_diagnostics).post(routes::diagnostics::create_diagnostic),
        )
        .route(
            "/diagnozy/{id}",
            put(routes::diagnostics::update_diagnostic)
                .delete(routes::diagnostics::delete_diagnostic),
        )
        // Books and assignments
        .route(
            "/ksiazki",
            get(routes::books::list_books).post(routes::books::create_book),
        )
        .route(
            "/ksiazki/{id}",
            put(routes::books::update_book).delete(routes::books::delete_book),
        )
        .route(
            "/uczen-ksiazka",
            get(routes::books::list_student_books).post(routes::books::assign_book),
        )
        .route("/uczen-ksiazka/{id}", delete(routes::books::unassign_book))
        // Links
        .route(
            "/linki",
            get(routes::links::list_links).post(routes::links::create_link),
        )
        .route(
            "/linki/{id}",
            put(routes::links::update_link).delete(routes::links::delete_link),
        )
        // WebSocket change feed
        .route("/ws", get(routes::websocket::ws_handler))
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("korepetycje API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
