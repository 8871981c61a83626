use std::sync::Arc;

use tokio::sync::mpsc;

use crate::engine::lifecycle::JobLifecycleService;
use crate::fanout::QueueFanout;
use crate::fanout::events::ChangeEvent;
use crate::fanout::rooms::RoomRegistry;
use crate::observability::metrics::Metrics;
use crate::store::memory::{MemoryAccountStore, MemoryJobStore, MemoryOrderStore};
use crate::store::{AccountStore, JobStore, OrderStore};

pub struct AppState {
    pub jobs: Arc<dyn JobStore>,
    pub orders: Arc<dyn OrderStore>,
    pub lifecycle: JobLifecycleService,
    pub rooms: Arc<RoomRegistry>,
    pub metrics: Metrics,
}

impl AppState {
    /// Wires the in-memory stores, the lifecycle service and the fanout
    /// queue. The returned receiver is the feed for
    /// `fanout::publisher::run_fanout_publisher`.
    pub fn new(
        event_queue_size: usize,
        room_buffer_size: usize,
    ) -> (Self, mpsc::Receiver<ChangeEvent>) {
        let (event_tx, event_rx) = mpsc::channel(event_queue_size);

        let jobs: Arc<dyn JobStore> = Arc::new(MemoryJobStore::new());
        let orders: Arc<dyn OrderStore> = Arc::new(MemoryOrderStore::new());
        let accounts: Arc<dyn AccountStore> = Arc::new(MemoryAccountStore::new());
        let metrics = Metrics::new();
        let fanout = Arc::new(QueueFanout::new(event_tx, metrics.clone()));
        let rooms = Arc::new(RoomRegistry::new(room_buffer_size));

        let lifecycle = JobLifecycleService::new(
            jobs.clone(),
            orders.clone(),
            accounts,
            fanout,
            metrics.clone(),
        );

        (
            Self {
                jobs,
                orders,
                lifecycle,
                rooms,
                metrics,
            },
            event_rx,
        )
    }
}
