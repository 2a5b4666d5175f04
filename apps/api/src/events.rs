use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use shared_utils::AppState;

/// Streams every committed store change. A subscriber that falls behind gets
/// a `resync` event and should re-read what it shows.
pub async fn change_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.db.bus().subscribe();
    debug!("Change stream opened, {} subscribers", state.db.bus().receiver_count());

    let stream = stream::unfold(receiver, |mut receiver| async move {
        let event = match receiver.recv().await {
            Ok(change) => Event::default()
                .event("change")
                .id(change.version.to_string())
                .json_data(&change)
                .unwrap_or_else(|_| Event::default().event("change").data(change.key)),
            Err(RecvError::Lagged(skipped)) => {
                warn!("Change stream subscriber lagged by {} events", skipped);
                Event::default().event("resync").data(skipped.to_string())
            }
            Err(RecvError::Closed) => return None,
        };
        Some((Ok::<_, Infallible>(event), receiver))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
