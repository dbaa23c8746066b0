use axum::{
    routing::{delete, get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod state;

use state::AppState;
use unicode_explorer_backend::config;
use unicode_explorer_backend::corpus::SqliteCorpusStore;
use unicode_explorer_backend::db;
use unicode_explorer_backend::favorites::FavoriteStore;
use unicode_explorer_backend::filter::PropertyCatalog;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unicode_explorer_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::init_config()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?
        .read()
        .clone();
    tracing::info!("Server will listen on {}", app_config.get_bind_address());
    if !app_config.auth_enabled() {
        tracing::warn!("Google client credentials missing, sign-in is disabled");
    }

    // Create data directory if not exists / 创建数据目录
    let data_dir = app_config.get_data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!("Created data directory: {:?}", data_dir);
    }

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| app_config.get_database_url());

    let pool = db::connect(&database_url).await?;
    db::run_migrations(&pool).await?;

    let corpus = Arc::new(SqliteCorpusStore::new(pool.clone()));
    let catalog = PropertyCatalog::load(corpus.as_ref()).await?;

    let state = Arc::new(AppState {
        db: pool.clone(),
        corpus,
        catalog: Arc::new(catalog),
        favorites: FavoriteStore::new(pool.clone()),
        http: reqwest::Client::new(),
    });

    let mut app = Router::new()
        .route("/api/health", get(api::server::health_check))
        // Property catalog
        .route("/api/scripts", get(api::characters::list_scripts))
        .route("/api/categories", get(api::characters::list_categories))
        .route("/api/classes", get(api::characters::list_classes))
        .route("/api/versions", get(api::characters::list_versions))
        .route("/api/decomposition-types", get(api::characters::list_decomposition_types))
        // Characters
        .route("/api/characters", get(api::characters::get_characters))
        .route("/api/character/:codepoint", get(api::characters::get_character))
        // Favorites
        .route("/api/favorites", get(api::favorites::list_favorites).post(api::favorites::add_favorite))
        .route("/api/favorites/:codepoint", delete(api::favorites::remove_favorite))
        // Google sign-in
        .route("/auth/google", get(api::oauth::google_login))
        .route("/auth/google/callback", get(api::oauth::google_callback))
        .route("/auth/me", get(api::oauth::me))
        .route("/auth/logout", post(api::oauth::logout));

    // Built client, with index.html for client-side routes / 前端静态文件
    let static_dir = Path::new(&app_config.server.static_dir);
    if !app_config.server.static_dir.is_empty() && static_dir.is_dir() {
        tracing::info!("Serving client files from {:?}", static_dir);
        app = app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(static_dir.join("index.html"))),
        );
    }

    let app = app
        .layer(CookieManagerLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
