//! Herald server library logic.

pub mod api;
pub mod api_sse;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod modules;

use auth::Authenticator;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use context::RequestContext;
use error::ApiError;
use gateway::MutationGateway;
use herald_db::DbPool;
use herald_events::Bus;
use herald_schema::{
    assemble, AssembleError, Assembled, ParseSchemaError, Providers, ResolverMap, Schema,
};
use herald_types::AuthContext;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// The assembled API: merged schema, resolvers, and providers.
pub type Api = Assembled<RequestContext, ApiError>;

/// Reasons the API cannot be built. The server refuses to start on any of
/// them.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Schema(#[from] ParseSchemaError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

/// Parses every module's schema and merges the modules.
pub fn build_api(authenticator: Arc<Authenticator>) -> Result<Api, StartupError> {
    let api = assemble(modules::all(authenticator)?)?;
    tracing::info!(
        fields = api.schema.field_count(),
        operations = api.resolvers.len(),
        "api assembled"
    );
    Ok(api)
}

/// Application state shared across all request handlers.
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    /// Live-update bus.
    pub bus: Bus,
    /// Mutation path for posts and comments.
    pub gateway: MutationGateway,
    /// Session token verification.
    pub authenticator: Arc<Authenticator>,
    /// Merged schema.
    pub schema: Schema,
    /// Operation resolvers keyed by `"Type.field"`.
    pub resolvers: ResolverMap<RequestContext, ApiError>,
    /// Providers exported by the modules.
    pub providers: Arc<Providers>,
    /// Whether anonymous callers are refused live-update streams.
    pub require_auth_for_subscriptions: bool,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        api: Api,
        authenticator: Arc<Authenticator>,
        require_auth_for_subscriptions: bool,
    ) -> Self {
        let bus = Bus::new();
        let Assembled {
            schema,
            resolvers,
            providers,
        } = api;

        Self {
            gateway: MutationGateway::new(pool.clone(), bus.clone()),
            pool,
            bus,
            authenticator,
            schema,
            resolvers,
            providers: Arc::new(providers),
            require_auth_for_subscriptions,
        }
    }

    /// Builds the context for one operation.
    pub fn context(&self, auth: AuthContext) -> RequestContext {
        RequestContext {
            pool: self.pool.clone(),
            gateway: self.gateway.clone(),
            bus: self.bus.clone(),
            auth,
            providers: Arc::clone(&self.providers),
        }
    }
}

/// Maximum request body size (1 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/schema", get(api::schema_handler))
        .route("/api/ops", post(api::ops_handler))
        .route(
            "/api/stats/subscriptions",
            get(api::subscription_stats_handler),
        )
        .route("/events/posts", get(api_sse::posts_stream_handler))
        .route(
            "/events/posts/{postId}/comments",
            get(api_sse::comments_stream_handler),
        )
        .layer(axum::middleware::from_fn(middleware::auth_middleware))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
