use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::fanout::events::{ChangeEvent, Room};
use crate::fanout::rooms::RoomRegistry;
use crate::observability::metrics::Metrics;

/// Background task draining the fanout queue into per-user rooms.
///
/// Runs for the lifetime of the process; exits when every `QueueFanout`
/// handle has been dropped.
pub async fn run_fanout_publisher(
    rooms: Arc<RoomRegistry>,
    metrics: Metrics,
    mut rx: mpsc::Receiver<ChangeEvent>,
) {
    info!("fanout publisher started");

    while let Some(event) = rx.recv().await {
        let payload = match serde_json::to_string(&event.to_payload()) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(event = event.name(), error = %err, "failed to serialize change event");
                continue;
            }
        };

        let mut delivered = 0;
        for room in event.targets() {
            delivered += match room {
                Room::User(user_id) => rooms.send_to_user(user_id, &payload),
                Room::Movers => rooms.send_to_movers(&payload),
            };
        }

        metrics
            .fanout_events_total
            .with_label_values(&[event.name()])
            .inc();
        debug!(event = event.name(), delivered, "change event published");
    }

    warn!("fanout publisher stopped: queue channel closed");
}
