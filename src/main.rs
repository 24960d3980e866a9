//! Poop or Cloud? game server
//!
//! The authoritative orchestrator for the drawing party game, backed by a
//! subscribable SQLite state store.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod game;
mod models;
mod store;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::SqliteStore;
use game::Game;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub game: Arc<Game>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Poop or Cloud? game server");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.room_key.is_none() {
        tracing::warn!("No room key configured (POC_ROOM_KEY). The game is open to anyone!");
    }

    // Initialize the state store
    let pool = db::init_database(&config.db_path).await?;
    let store = Arc::new(SqliteStore::new(pool, config.event_buffer));
    let game = Arc::new(Game::new(store));

    let round = game.round().await?;
    tracing::info!(
        phase = round.phase().as_str(),
        round_number = round.round_number(),
        revision = game.revision().await?,
        "Loaded game state"
    );

    let state = AppState {
        game,
        config: Arc::new(config.clone()),
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let room_key = state.config.room_key.clone();
    let body_limit = state.config.max_body_bytes;

    let api_routes = Router::new()
        // Game
        .route("/game", get(api::get_game))
        .route("/game/revision", get(api::get_revision))
        .route("/game/start", post(api::start_game))
        .route("/game/reset", post(api::reset_game))
        // Roster
        .route("/players", get(api::list_players))
        .route("/players", post(api::join_game))
        .route("/scores", get(api::get_scoreboard))
        // Round
        .route("/round", get(api::get_round))
        .route("/round/drawing", post(api::submit_drawing))
        .route("/round/votes", post(api::cast_vote))
        .route("/round/advance", post(api::advance_round))
        // Gallery
        .route("/gallery", get(api::list_gallery))
        .route("/gallery/{id}", get(api::get_gallery_entry))
        .route("/gallery/{id}/comments", post(api::add_gallery_comment))
        // Store replica
        .route("/store/{*key}", get(api::read_key))
        .route("/subscribe/{*key}", get(api::subscribe_key))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(move |req, next| {
            auth::room_key_layer(room_key.clone(), req, next)
        }));

    // Health check (no room key required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
