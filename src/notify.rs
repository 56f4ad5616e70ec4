use dashmap::DashMap;
use tokio::sync::broadcast;
use ulid::Ulid;

use crate::model::Event;

const CHANNEL_CAPACITY: usize = 256;

/// Per-turf broadcast of ledger events, for mailers and live calendars.
pub struct NotifyHub {
    channels: DashMap<Ulid, broadcast::Sender<Event>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to a turf's events. Creates the channel if needed.
    pub fn subscribe(&self, turf_id: Ulid) -> broadcast::Receiver<Event> {
        self.channels
            .entry(turf_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// No-op if nobody is listening.
    pub fn send(&self, turf_id: Ulid, event: &Event) {
        if let Some(sender) = self.channels.get(&turf_id) {
            let _ = sender.send(event.clone());
        }
    }
}
