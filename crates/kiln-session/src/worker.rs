//! Background inference worker
//!
//! One invocation runs exactly one generate call off the interactive
//! task and forwards its events, tagged with the request generation,
//! over an mpsc channel. The receiver applies them to the session on
//! the interactive task. There is no cancellation: a request runs to
//! completion, error, or the client timeout, and superseded results
//! are filtered out by the session's generation check.

use futures::StreamExt;
use kiln_api::{GenerateEvent, OllamaClient};
use tokio::sync::mpsc;

use crate::events::WorkerEvent;
use crate::session::PendingRequest;

/// Run one inference call and forward its events.
///
/// In streaming mode each stream event is forwarded as it arrives; in
/// non-streaming mode the single result maps to one `Done` or `Error`.
/// Send failures mean the receiver is gone and the worker just stops.
pub async fn run_request(
    client: OllamaClient,
    pending: PendingRequest,
    tx: mpsc::Sender<WorkerEvent>,
) {
    let generation = pending.generation;

    if pending.streaming {
        let mut stream = client.generate_stream(&pending.request);
        while let Some(event) = stream.next().await {
            let terminal = event.is_terminal();
            if tx.send(WorkerEvent { generation, event }).await.is_err() {
                return;
            }
            if terminal {
                return;
            }
        }
        tracing::debug!(generation, "stream ended without a terminal event");
    } else {
        let event = match client.generate(&pending.request).await {
            Ok(text) => GenerateEvent::Done { text },
            Err(e) => GenerateEvent::Error {
                message: e.to_string(),
            },
        };
        let _ = tx.send(WorkerEvent { generation, event }).await;
    }
}
