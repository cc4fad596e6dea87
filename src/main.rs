mod handlers;
mod middleware;
mod models;
mod services;
mod utils;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    handlers::{admin, comments, interviews, role_changes, tracks, users},
    middleware::auth::auth_middleware,
    services::status_sweep,
    utils::{config::Config, database::create_pool},
};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_secret: String,
    pub sweep_grace_minutes: i64,
}

fn build_router(state: AppState) -> Router {
    let protected_routes = Router::new()
        .route(
            "/interviews",
            get(interviews::get_all_interviews).post(interviews::create_interview),
        )
        .route("/interviews/mine", get(interviews::get_my_interviews))
        .route("/interviews/page", get(interviews::get_interview_page))
        .route("/interviews/grouped", get(interviews::get_grouped_interviews))
        .route(
            "/interviews/call/:stream_call_id",
            get(interviews::get_interview_by_call_id),
        )
        .route(
            "/interviews/:id",
            axum::routing::delete(interviews::delete_interview),
        )
        .route("/interviews/:id/status", put(interviews::update_interview_status))
        .route("/interviews/:id/feedback", put(interviews::update_interview_feedback))
        .route(
            "/interviews/:id/comments",
            get(comments::get_comments).post(comments::add_comment),
        )
        .route("/users", get(users::get_users))
        .route("/users/sync", post(users::sync_user))
        .route("/users/me", get(users::get_current_user))
        .route("/users/page", get(users::get_users_page))
        .route(
            "/users/by-external/:external_id",
            get(users::get_user_by_external_id),
        )
        .route("/users/:external_id/role", put(users::update_user_role))
        .route(
            "/role-changes",
            get(role_changes::get_role_changes).post(role_changes::create_role_change),
        )
        .route("/role-changes/mine", get(role_changes::get_my_role_changes))
        .route("/role-changes/:id", get(role_changes::get_role_change))
        .route(
            "/role-changes/:id/status",
            put(role_changes::update_role_change_status),
        )
        .route(
            "/tracks",
            get(tracks::get_student_tracks).put(tracks::store_track),
        )
        .route("/admin/analytics", get(admin::get_analytics))
        .route("/admin/interviews/sweep", post(admin::trigger_status_sweep))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .merge(protected_routes)
        .with_state(state)
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let allowed = if origin == "*" {
        HeaderValue::from_static("*")
    } else {
        origin.parse::<HeaderValue>()?
    };

    Ok(CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "admission_interview_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db = create_pool(&config.database_url, config.db_max_connections).await?;

    sqlx::migrate!("./migrations").run(&db).await?;

    let state = AppState {
        db: db.clone(),
        jwt_secret: config.jwt_secret.clone(),
        sweep_grace_minutes: config.sweep_grace_minutes,
    };

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&config.cors_allowed_origin)?)
            .layer(DefaultBodyLimit::max(config.max_request_body_kb * 1024)),
    );

    // keep the handle alive for the lifetime of the server
    let _scheduler =
        status_sweep::start_scheduler(db, &config.sweep_cron, config.sweep_grace_minutes).await?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server running on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
