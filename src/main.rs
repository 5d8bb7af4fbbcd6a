use axum::handler::Handler;
use axum::routing::{get, post};
use axum::Router;
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use provlog_api::database::manager::DatabaseManager;
use provlog_api::handlers;
use provlog_api::middleware::jwt_auth_middleware;

#[tokio::main]
async fn main() {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = provlog_api::config::config();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "provlog_api=info,tower_http=info".into()),
        )
        .init();

    tracing::info!("Starting ProVlog API in {:?} mode", config.environment);

    // Idempotent migrations + category seeding, guarded by an advisory lock.
    // A failure leaves the server up but degraded; /health reports it.
    if let Err(e) = DatabaseManager::bootstrap().await {
        tracing::error!("Database bootstrap failed: {}", e);
    }

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("PROVLOG_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {}", bind_addr, e));

    tracing::info!("ProVlog API listening on http://{}", bind_addr);

    axum::serve(listener, app).await.expect("server");
}

fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_routes())
        .merge(catalog_routes())
        .merge(video_routes())
        .merge(protected_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Public token acquisition
fn auth_routes() -> Router {
    Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
}

/// Public catalog reads
fn catalog_routes() -> Router {
    Router::new()
        .route("/api/categories", get(handlers::categories::category_list))
        .route("/api/professionals", get(handlers::professionals::professional_list))
        .route("/api/professionals/:id", get(handlers::professionals::professional_get))
        .route("/api/ratings/video/:id", get(handlers::ratings::rating_list_for_video))
}

/// Video catalog is public to read; publishing requires an authenticated
/// professional, so only the POST side carries the JWT layer.
fn video_routes() -> Router {
    Router::new()
        .route(
            "/api/videos",
            get(handlers::videos::video_list).post(
                handlers::videos::video_post
                    .layer(axum::middleware::from_fn(jwt_auth_middleware)),
            ),
        )
        .route("/api/videos/:id", get(handlers::videos::video_get))
}

/// Everything here requires a valid bearer token
fn protected_routes() -> Router {
    Router::new()
        .route("/api/purchases", post(handlers::purchases::purchase_post))
        .route("/api/purchases/user", get(handlers::purchases::purchase_list_user))
        .route("/api/ratings", post(handlers::ratings::rating_post))
        .route("/api/dashboard/professional", get(handlers::dashboard::professional_dashboard))
        .route("/api/dashboard/student", get(handlers::dashboard::student_dashboard))
        .route_layer(axum::middleware::from_fn(jwt_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "ProVlog API",
            "version": version,
            "description": "Career vlog marketplace: professionals publish, students purchase and rate",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/auth/register, /auth/login (public - token acquisition)",
                "categories": "/api/categories (public)",
                "videos": "/api/videos[/:id] (read public, create professional)",
                "professionals": "/api/professionals[/:id] (public)",
                "purchases": "/api/purchases, /api/purchases/user (student)",
                "ratings": "/api/ratings (student), /api/ratings/video/:id (public)",
                "dashboard": "/api/dashboard/professional, /api/dashboard/student (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
