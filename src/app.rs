use crate::cache::MemoryCache;
use crate::config::Settings;
use crate::error::ResolveError;
use crate::imports::NoImports;
use crate::query::Query;
use crate::resolver::Resolver;
use crate::tmdb::TmdbClient;
use anyhow::Result;
use axum::{
    extract::{Path, Query as UrlQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{info, warn};

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
}

pub async fn run_server(settings: Settings) -> Result<()> {
    let settings = Arc::new(settings);
    let tmdb = Arc::new(TmdbClient::new(settings.require_api_key()?)?);
    let resolver = Arc::new(Resolver::new(
        tmdb,
        Arc::new(MemoryCache::new()),
        Arc::new(NoImports),
        settings.clone(),
    ));
    info!(
        "Cache {} ({} day TTL), primary country {}, alternate {}",
        if settings.cache_enabled { "enabled" } else { "disabled" },
        settings.cache_expire_days,
        settings.country,
        settings.country_alt
    );

    let app = build_router(AppState { resolver });

    info!("Listening on {}", settings.bind);
    let listener = tokio::net::TcpListener::bind(settings.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", post(search))
        .route("/check-api-key", get(check_api_key))
        .route("/movies/:id/images", get(movie_images))
        .route("/movies/:id/posters", get(movie_posters))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

/// Search request body; unset fields fall back to the configured defaults.
#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub s: Option<String>,
    pub lang: Option<String>,
    pub adult: Option<bool>,
    pub year: Option<i32>,
    pub pyear: Option<i32>,
    pub page: Option<u32>,
    pub post_id: Option<i64>,
}

impl SearchRequest {
    fn into_query(self, resolver: &Resolver) -> Result<Query, ResolveError> {
        let text = self
            .s
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| ResolveError::Validation("Empty search query.".to_string()))?;
        let mut query = resolver
            .query(text)
            .year(self.year)
            .primary_release_year(self.pyear)
            .page(self.page.unwrap_or(1))
            .related_post_id(self.post_id);
        if let Some(lang) = self.lang.filter(|l| !l.trim().is_empty()) {
            query = query.language(lang);
        }
        if let Some(adult) = self.adult {
            query = query.include_adult(adult);
        }
        Ok(query)
    }
}

async fn search(State(state): State<AppState>, Json(req): Json<SearchRequest>) -> Response {
    let query = match req.into_query(&state.resolver) {
        Ok(q) => q,
        Err(e) => return failure(e),
    };
    match state.resolver.search(&query).await {
        Ok(resolution) => success(resolution),
        Err(e) => failure(e),
    }
}

#[derive(Debug, Deserialize)]
struct KeyParams {
    key: Option<String>,
}

async fn check_api_key(
    State(state): State<AppState>,
    UrlQuery(params): UrlQuery<KeyParams>,
) -> Response {
    let key = params.key.unwrap_or_default();
    match state.resolver.check_api_key(&key).await {
        Ok(()) => success(json!({
            "message": "Valid API key - Save your settings and have fun!"
        })),
        Err(ResolveError::Upstream(e)) => {
            warn!("API key check rejected upstream: {}", e);
            failure(ResolveError::Validation(
                "Invalid API key - You must be granted a valid key".to_string(),
            ))
        }
        Err(e) => failure(e),
    }
}

async fn movie_images(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match movie_id(&id) {
        Ok(id) => listing(state.resolver.list_images(Some(id)).await),
        Err(e) => failure(e),
    }
}

async fn movie_posters(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match movie_id(&id) {
        Ok(id) => listing(state.resolver.list_posters(Some(id)).await),
        Err(e) => failure(e),
    }
}

fn movie_id(raw: &str) -> Result<u64, ResolveError> {
    raw.trim()
        .parse()
        .map_err(|_| ResolveError::Validation(format!("Invalid movie id '{}'.", raw)))
}

fn listing<T: Serialize>(result: Result<Option<T>, ResolveError>) -> Response {
    match result {
        Ok(Some(images)) => success(images),
        Ok(None) => failure(ResolveError::Validation("Missing movie id.".to_string())),
        Err(e) => failure(e),
    }
}

fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(json!({ "success": true, "data": data }))).into_response()
}

fn failure(err: ResolveError) -> Response {
    let status = match &err {
        ResolveError::Validation(_) => StatusCode::BAD_REQUEST,
        ResolveError::NotFound(_) => StatusCode::NOT_FOUND,
        ResolveError::Upstream(_) => StatusCode::BAD_GATEWAY,
    };
    let body = json!({
        "success": false,
        "data": { "code": err.code(), "message": err.message() }
    });
    (status, Json(body)).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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
