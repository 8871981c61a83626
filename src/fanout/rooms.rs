use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Per-user broadcast channels plus one shared channel for all movers.
/// A room comes into existence on first subscribe and sticks around; a
/// send into a room with no live receivers is a non-event.
pub struct RoomRegistry {
    users: DashMap<Uuid, broadcast::Sender<String>>,
    movers: broadcast::Sender<String>,
    buffer: usize,
}

impl RoomRegistry {
    pub fn new(buffer: usize) -> Self {
        let (movers, _unused_rx) = broadcast::channel(buffer);
        Self {
            users: DashMap::new(),
            movers,
            buffer,
        }
    }

    pub fn subscribe_user(&self, user_id: Uuid) -> broadcast::Receiver<String> {
        self.users
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.buffer).0)
            .subscribe()
    }

    pub fn subscribe_movers(&self) -> broadcast::Receiver<String> {
        self.movers.subscribe()
    }

    /// Number of payloads handed to live receivers.
    pub fn send_to_user(&self, user_id: Uuid, payload: &str) -> usize {
        match self.users.get(&user_id) {
            Some(room) => room.send(payload.to_string()).unwrap_or(0),
            None => 0,
        }
    }

    pub fn send_to_movers(&self, payload: &str) -> usize {
        self.movers.send(payload.to_string()).unwrap_or(0)
    }
}
