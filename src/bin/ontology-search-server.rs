//! ontology-search HTTP server.
//!
//! - `GET /search?query=...&limit=...`: ranked term search
//! - `POST /ingest`: fetch and ingest an ontology document into the served store
//! - `GET /health`: server status and entity counts
//!
//! The server holds the durable store open, so `ontology-search ingest
//! --server URL` feeds it through `/ingest` while it runs.
//!
//! Build and run: `cargo run --features server --bin ontology-search-server`

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use miette::{IntoDiagnostic, Result};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use ontology_search::config::OntologySearchConfig;
use ontology_search::error::{FetchError, IngestError, SearchError};
use ontology_search::fetch::{Fetch, HttpFetcher};
use ontology_search::graph::DocumentFormat;
use ontology_search::ingest::{IngestConfig, IngestReport, ingest_url};
use ontology_search::paths::AppPaths;
use ontology_search::remote::{ErrorBody, IngestRequest};
use ontology_search::search::{SearchQuery, TermView, render, search};
use ontology_search::store::{Repository, RepositoryCounts, open_repository};

// ── Server state ──────────────────────────────────────────────────────────

struct ServerState {
    repo: Arc<dyn Repository>,
    fetcher: Arc<dyn Fetch>,
    ingest: IngestConfig,
}

// ── Request / response types ──────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    query: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    counts: RepositoryCounts,
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

fn search_error(e: SearchError) -> ApiError {
    match e {
        SearchError::MissingQuery => api_error(StatusCode::BAD_REQUEST, e.to_string()),
        SearchError::Store(store) => {
            tracing::error!(error = %store, "search failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, store.to_string())
        }
    }
}

fn ingest_error(e: IngestError) -> ApiError {
    let status = match &e {
        IngestError::Fetch(FetchError::InvalidUrl { .. }) => StatusCode::BAD_REQUEST,
        IngestError::Fetch(_) => StatusCode::BAD_GATEWAY,
        IngestError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
        IngestError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        IngestError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
    };
    if status.is_server_error() {
        tracing::error!(error = %e, "ingestion failed");
    } else {
        tracing::warn!(error = %e, "ingestion rejected");
    }
    api_error(status, e.to_string())
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health(State(state): State<Arc<ServerState>>) -> Result<Json<HealthResponse>, ApiError> {
    let repo = Arc::clone(&state.repo);
    let counts = tokio::task::spawn_blocking(move || repo.counts())
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        counts,
    }))
}

async fn search_terms(
    State(state): State<Arc<ServerState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<TermView>>, ApiError> {
    let query = SearchQuery::parse(params.query.as_deref())
        .map_err(search_error)?
        .with_limit(params.limit);

    let repo = Arc::clone(&state.repo);
    let views = tokio::task::spawn_blocking(move || {
        let hits = search(repo.as_ref(), &query)?;
        render(repo.as_ref(), hits)
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(search_error)?;

    Ok(Json(views))
}

async fn ingest_document(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestReport>, ApiError> {
    let mut config = state.ingest.clone();
    if let Some(name) = request.format.as_deref() {
        let format = DocumentFormat::resolve(name)
            .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
        config.format = Some(format);
    }
    if let Some(policy) = request.policy {
        config.policy = policy;
    }

    let report = tokio::task::spawn_blocking(move || {
        let cancel = AtomicBool::new(false);
        ingest_url(
            state.fetcher.as_ref(),
            &request.url,
            state.repo.as_ref(),
            &config,
            &cancel,
        )
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(ingest_error)?;

    Ok(Json(report))
}

fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search_terms))
        .route("/ingest", post(ingest_document))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Main ──────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let paths = AppPaths::resolve()?;
    let config = OntologySearchConfig::discover(None, &paths)?;
    let data_dir = config.data_dir.clone().unwrap_or_else(|| paths.data_dir.clone());
    let server = config.server.clone().with_env_overrides()?;
    let addr = server.addr();

    let repo: Arc<dyn Repository> = open_repository(Some(&data_dir))?.into();
    tracing::info!(data_dir = %data_dir.display(), "ontology-search server initialized");

    let app = router(Arc::new(ServerState {
        repo,
        fetcher: Arc::new(HttpFetcher::new(config.fetch_options())),
        ingest: config.ingest_config()?,
    }));

    tracing::info!("ontology-search server listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await.into_diagnostic()?;
    axum::serve(listener, app).await.into_diagnostic()?;
    Ok(())
}
