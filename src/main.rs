use axum::{routing::get, routing::post, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use pokehunt_backend::{api, auth, config, db, locks::TeamLocks, metrics};

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "pokehunt-backend" }))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cfg = config::Config::load();

    let db = db::Database::new(&cfg.database_url)
        .await
        .expect("Failed to initialize database");
    let db = Arc::new(db);

    metrics::register_metrics();
    match db.game_open().await {
        Ok(open) => metrics::GAME_OPEN.set(open as i64),
        Err(e) => tracing::error!("Failed to read game switch: {e}"),
    }

    // Auto-create the admin account when a password is configured.
    if let Some(password) = &cfg.admin_password {
        let hash = auth::hash_password(password).expect("Failed to hash admin password");
        db.ensure_admin(config::ADMIN_USERNAME, &hash)
            .await
            .expect("Failed to create admin account");
    }

    let locks = TeamLocks::new();

    let app = Router::new()
        .route("/health", get(health_check))
        // Auth routes (no auth required)
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .with_state(db.clone())
        .merge(api::router(db, locks, cfg.server_no))
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", cfg.port))
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to port {}: {e}", cfg.port));

    tracing::info!("Pokehunt backend listening on port {}", cfg.port);
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
