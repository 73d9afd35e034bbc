//! Server-Sent Events for live updates

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use verboard_core::{BroadcastHub, CoreError, SessionId, Topic, VersionManager};

use crate::api::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct SseQuery {
    /// Required when the server has an auth token configured
    pub token: Option<String>,
}

/// Removes the hub session once the client stream is dropped
struct SessionGuard {
    hub: Arc<BroadcastHub>,
    id: SessionId,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.hub.disconnect(self.id);
    }
}

/// `GET /api/events`: every topic as SSE, event name = wire event name
pub async fn sse_handler(
    State(manager): State<Arc<VersionManager>>,
    Query(query): Query<SseQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let hub = Arc::clone(manager.hub());
    let (id, rx) = hub.connect();
    let guard = SessionGuard {
        hub: Arc::clone(&hub),
        id,
    };

    if hub.auth_required() {
        let token = query.token.as_deref().ok_or(CoreError::Unauthorized)?;
        hub.authenticate(id, token)?;
        for topic in Topic::ALL {
            hub.subscribe(id, topic)?;
        }
    }

    Ok(create_sse_stream(rx, guard))
}

fn create_sse_stream(
    rx: tokio::sync::mpsc::Receiver<verboard_core::ServerEvent>,
    guard: SessionGuard,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = ReceiverStream::new(rx).map(move |event| {
        let _ = &guard;
        Ok(Event::default().event(event.name()).data(event.data_json()))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
