mod ai;
mod config;
mod db;
mod entities;
mod error;
mod models;
mod opinions;
mod routes;
mod stats;
mod sync;
mod tmdb;

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    routing::{get, post, put},
};
use clap::{Parser, Subcommand};
use sea_orm::DatabaseConnection;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{ai::AiClient, config::Config, tmdb::TmdbClient};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: DatabaseConnection,
    pub tmdb: Arc<TmdbClient>,
    pub ai: Arc<AiClient>,
}

#[derive(Debug, Parser)]
#[command(name = "cinemeter", about = "Movie opinions backend and catalog sync jobs")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP API server (default).
    Serve,
    /// Pull the source feeds and upsert movies and genres.
    SyncMovies {
        /// Stop after this many movie records.
        #[arg(long, default_value_t = 200)]
        limit: usize,
    },
    /// Refresh cast and crew for the most recently updated movies.
    SyncCredits {
        /// Number of movies to refresh.
        #[arg(long, default_value_t = 50)]
        limit: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,cinemeter=debug,sqlx=warn".to_string()),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(Config::from_env()?);

    let http = reqwest::Client::builder()
        .user_agent("cinemeter/0.1")
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let db = db::connect_and_migrate(&config.database_url).await?;
    let tmdb = Arc::new(TmdbClient::new(http.clone(), &config));
    let delay = Duration::from_millis(config.sync_delay_ms);

    match cli.command.unwrap_or(Command::Serve) {
        Command::SyncMovies { limit } => {
            let report = sync::sync_movies(&db, &tmdb, limit, delay).await?;
            tracing::info!(
                genres = report.genres,
                processed = report.processed,
                feeds_failed = report.feeds_failed,
                "sync-movies done"
            );
        },
        Command::SyncCredits { limit } => {
            let report = sync::sync_cast_and_crew(&db, &tmdb, limit, delay).await?;
            tracing::info!(
                synced = report.movies_synced,
                skipped = report.movies_skipped,
                enriched = report.persons_enriched,
                "sync-credits done"
            );
        },
        Command::Serve => {
            let ai = Arc::new(AiClient::new(http, &config));
            let state = Arc::new(AppState { config: config.clone(), db, tmdb, ai });

            let app = Router::new()
                .route("/api/movies", get(routes::list_movies))
                .route("/api/movies/{id}", get(routes::movie_detail))
                .route("/api/movies/{id}/reviews", get(routes::list_reviews))
                .route("/api/movies/{id}/vote", post(routes::vote))
                .route("/api/movies/{id}/hype", post(routes::hype))
                .route("/api/movies/{id}/watchlist", post(routes::toggle_watchlist))
                .route(
                    "/api/movies/{id}/review",
                    put(routes::put_review).delete(routes::delete_review),
                )
                .route("/api/movies/{id}/assist/rewrite", post(routes::assist_rewrite))
                .route("/api/people/{id}", get(routes::person_detail))
                .route("/api/reviews/{id}/like", post(routes::toggle_review_like))
                .route("/api/reviews/{id}/comments", post(routes::post_comment))
                .route("/api/reviews/{id}/assist/pros-cons", post(routes::assist_pros_cons))
                .route("/api/comments/{id}/like", post(routes::toggle_comment_like))
                .route("/api/me/watchlist", get(routes::my_watchlist))
                .with_state(state)
                .layer(CorsLayer::new().allow_origin(Any).allow_headers(Any))
                .layer(TraceLayer::new_for_http());

            let listener = tokio::net::TcpListener::bind(config.addr).await?;
            tracing::info!(addr = %config.addr, "listening");
            axum::serve(listener, app).await?;
        },
    }

    Ok(())
}
