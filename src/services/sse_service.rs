use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::dto::sse::ServerEvent;
use crate::state::SharedState;

/// Subscribe to the SSE stream of one username.
pub fn subscribe(state: &SharedState, username: &str) -> broadcast::Receiver<ServerEvent> {
    state.sse().subscribe(username)
}

/// Convert a broadcast receiver into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: reads from broadcast and pushes into mpsc
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    if !forward_broadcast(recv_result, &tx).await {
                        break;
                    }
                }
            }
        }
        tracing::debug!("SSE stream disconnected");
    });

    // response stream reads from mpsc; when the client disconnects axum
    // drops this stream and the forwarder exits on the closed channel
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Forward a broadcast payload to the SSE mpsc channel, handling lag and
/// closed receivers gracefully.
async fn forward_broadcast(
    recv_result: Result<ServerEvent, RecvError>,
    tx: &mpsc::Sender<Result<Event, Infallible>>,
) -> bool {
    match recv_result {
        Ok(payload) => {
            let mut event = Event::default().data(payload.data);
            if let Some(name) = payload.event {
                event = event.event(name);
            }

            tx.send(Ok(event)).await.is_ok()
        }
        Err(RecvError::Closed) => false,
        Err(RecvError::Lagged(_)) => true,
    }
}
