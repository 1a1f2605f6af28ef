use crate::catalog::CatalogFetcher;
use crate::config::Config;
use crate::favorites::{FavoritesStore, FAVORITES_KEY};
use crate::kv::FileStore;
use crate::models::MovieSummary;
use crate::tmdb::{TmdbApi, TmdbClient};
use crate::views;
use anyhow::{Context, Result};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        Html, IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures_util::stream::Stream;
use serde::Deserialize;
use serde_json::json;
use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{debug, error, info};

const MAX_BODY_BYTES: usize = 64 * 1024;
const KEEP_ALIVE_SECS: u64 = 30;

#[derive(Clone)]
pub struct AppState {
    pub catalog: CatalogFetcher,
    pub favorites: FavoritesStore,
    pub image_base: String,
}

impl AppState {
    pub fn new(tmdb: Arc<dyn TmdbApi>, favorites: FavoritesStore, image_base: String) -> Self {
        Self {
            catalog: CatalogFetcher::new(tmdb),
            favorites,
            image_base,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

pub async fn run_server(config: Config) -> Result<()> {
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::from_config(&config));
    let store = FileStore::open(&config.data_dir)
        .with_context(|| format!("opening data dir {}", config.data_dir.display()))?;
    info!("Favorites stored under {}", store.dir().display());
    let favorites = FavoritesStore::new(Arc::new(store));

    let counter = favorites.clone();
    let _favorites_log = favorites.subscribe(move || {
        debug!("Favorites updated ({} entries)", counter.get_all().len());
    });

    let state = AppState::new(tmdb, favorites, config.image_base_url.clone());
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(catalog_page))
        .route("/favorites", get(favorites_page))
        .route("/movie/:id", get(detail_page))
        .route("/api/favorites", get(list_favorites))
        .route("/api/favorites/toggle", post(toggle_favorite))
        .route("/api/favorites/events", get(favorite_events))
        .route("/api/favorites/:id", get(favorite_status))
        .route("/static/placeholder-poster.svg", get(placeholder_poster))
        .route("/static/placeholder-profile.svg", get(placeholder_profile))
        .route("/health", get(health))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn catalog_page(
    State(state): State<AppState>,
    Query(search): Query<SearchQuery>,
) -> Html<String> {
    let movies = state.catalog.popular().await;
    let favorites = state.favorites.get_all();
    Html(views::render_catalog(
        &movies,
        &search.q,
        |id| favorites.iter().any(|m| m.id == id),
        &state.image_base,
    ))
}

async fn favorites_page(State(state): State<AppState>) -> Html<String> {
    let favorites = state.favorites.get_all();
    Html(views::render_favorites(&favorites, &state.image_base))
}

async fn detail_page(State(state): State<AppState>, Path(raw_id): Path<String>) -> Response {
    let Ok(id) = raw_id.parse::<i64>() else {
        return not_found();
    };
    match state.catalog.detail(id).await {
        Some(detail) => {
            let is_favorite = state.favorites.is_favorite(id);
            Html(views::render_detail(&detail, is_favorite, &state.image_base)).into_response()
        }
        None => not_found(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Html(views::render_not_found())).into_response()
}

async fn list_favorites(State(state): State<AppState>) -> Json<Vec<MovieSummary>> {
    Json(state.favorites.get_all())
}

async fn favorite_status(State(state): State<AppState>, Path(id): Path<i64>) -> Json<serde_json::Value> {
    Json(json!({ "id": id, "favorite": state.favorites.is_favorite(id) }))
}

async fn toggle_favorite(
    State(state): State<AppState>,
    Json(movie): Json<MovieSummary>,
) -> Response {
    let id = movie.id;
    match state.favorites.toggle_favorite(movie) {
        Ok(favorite) => Json(json!({ "id": id, "favorite": favorite })).into_response(),
        Err(e) => {
            error!("Failed to toggle favorite {}: {}", id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "message": "Failed to update favorites" })),
            )
                .into_response()
        }
    }
}

/// Storage-change events for other tabs. Each connected tab is one
/// subscriber; lagging tabs skip missed events and reload on the next one.
async fn favorite_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send + 'static> {
    let receiver = state.favorites.storage_events();
    let stream = BroadcastStream::new(receiver).filter_map(|result| match result {
        Ok(change) if change.key == FAVORITES_KEY => match serde_json::to_string(&change) {
            Ok(data) => Some(Ok(Event::default().event("storage").data(data))),
            Err(e) => {
                tracing::warn!("Failed to serialize storage event: {}", e);
                None
            }
        },
        Ok(_) => None,
        Err(e) => {
            debug!("SSE stream error: {}", e);
            None
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("ping"),
    )
}

async fn placeholder_poster() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "image/svg+xml")],
        views::PLACEHOLDER_POSTER_SVG,
    )
}

async fn placeholder_profile() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "image/svg+xml")],
        views::PLACEHOLDER_PROFILE_SVG,
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
