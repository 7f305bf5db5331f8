//! SSE live-update streams.

use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Extension, Path},
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
};
use futures_util::Stream;
use herald_content::PostLookup;
use herald_events::{open_subscription, GateError};
use herald_types::{AuthContext, Topic};
use std::{convert::Infallible, sync::Arc};
use tokio_stream::StreamExt;

/// Handler for `GET /events/posts`.
///
/// Streams CREATED/UPDATED/DELETED events for published posts.
pub async fn posts_stream_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    open_stream(state, Topic::Posts, auth).await
}

/// Handler for `GET /events/posts/{postId}/comments`.
///
/// Refused with 404, before any event is streamed, when the post is missing
/// or unpublished.
pub async fn comments_stream_handler(
    Extension(state): Extension<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    Path(post_id): Path<i64>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    open_stream(state, Topic::Comments(post_id), auth).await
}

async fn open_stream(
    state: Arc<AppState>,
    topic: Topic,
    auth: AuthContext,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    if state.require_auth_for_subscriptions && auth == AuthContext::Anonymous {
        return Err(ApiError::login_required());
    }

    let gate_state = Arc::clone(&state);
    let subscription = tokio::task::spawn_blocking(move || {
        let conn = gate_state.pool.get()?;
        open_subscription(&gate_state.bus, &PostLookup(&conn), topic, auth).map_err(|e| match e {
            GateError::NotFound => ApiError::NotFound(format!("{topic} not found")),
            GateError::Lookup(err) => ApiError::from(err),
        })
    })
    .await??;

    tracing::info!(%topic, subscription = %subscription.id(), "live-update stream opened");

    let stream = subscription.filter_map(|event| {
        match Event::default().event(event.kind().as_str()).json_data(&*event) {
            Ok(sse_event) => Some(Ok(sse_event)),
            Err(e) => {
                tracing::error!(
                    topic = %event.topic(),
                    "failed to serialize lifecycle event: {}",
                    e
                );
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
