//! Operation dispatch, schema, and introspection handlers.

use axum::{
    extract::{Extension, Json},
    http::header,
    response::IntoResponse,
};
use herald_types::AuthContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use crate::error::ApiError;
use crate::AppState;

/// Request body for `POST /api/ops`.
#[derive(Debug, Deserialize)]
pub struct OperationRequest {
    /// `"Type.field"`, e.g. `"Mutation.createPost"`.
    pub operation: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub data: Value,
}

/// Handler for `POST /api/ops`.
pub async fn ops_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<OperationRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    let Some(resolver) = state.resolvers.get(&request.operation).cloned() else {
        return Err(ApiError::NotFound(format!(
            "unknown operation {}",
            request.operation
        )));
    };

    tracing::debug!(
        operation = %request.operation,
        user = ?auth.user_id(),
        "dispatching operation"
    );
    let data = resolver.resolve(state.context(auth), request.args).await?;
    Ok(Json(OperationResponse { data }))
}

/// Handler for `GET /api/schema`. Returns the merged schema as SDL.
pub async fn schema_handler(Extension(state): Extension<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        state.schema.to_sdl(),
    )
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopicStats {
    pub topic: String,
    pub subscribers: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubscriptionStats {
    #[serde(rename = "topicCount")]
    pub topic_count: usize,
    #[serde(rename = "eventsPublished")]
    pub events_published: u64,
    pub topics: Vec<TopicStats>,
}

/// Handler for `GET /api/stats/subscriptions`.
pub async fn subscription_stats_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Json<SubscriptionStats> {
    let mut topics: Vec<TopicStats> = state
        .bus
        .topics()
        .into_iter()
        .map(|(topic, subscribers)| TopicStats {
            topic: topic.to_string(),
            subscribers,
        })
        .collect();
    topics.sort_by(|a, b| a.topic.cmp(&b.topic));

    Json(SubscriptionStats {
        topic_count: topics.len(),
        events_published: state.bus.events_published(),
        topics,
    })
}
