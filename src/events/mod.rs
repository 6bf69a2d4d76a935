use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("{}", e);
        }
    }
}

/// Domain events emitted by the portal services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    PalletsReleased {
        load_id: Uuid,
        assignment_ids: Vec<Uuid>,
        release_number: String,
        destination: String,
    },
    PalletsPutOnHold {
        load_id: Uuid,
        assignment_ids: Vec<Uuid>,
    },
    InventorySynced {
        synced_at: DateTime<Utc>,
        rows: usize,
    },
    VirtualPalletsSuperseded {
        pallet_ids: Vec<Uuid>,
    },
}

/// Drains the event channel, logging every event until all senders are dropped
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::PalletsReleased {
                load_id,
                assignment_ids,
                release_number,
                destination,
            } => info!(
                %load_id,
                pallets = assignment_ids.len(),
                release_number = %release_number,
                destination = %destination,
                "pallets released"
            ),
            Event::PalletsPutOnHold {
                load_id,
                assignment_ids,
            } => info!(%load_id, pallets = assignment_ids.len(), "pallets put on hold"),
            Event::InventorySynced { synced_at, rows } => {
                info!(%synced_at, rows, "inventory snapshot replaced")
            }
            Event::VirtualPalletsSuperseded { pallet_ids } => {
                info!(pallets = pallet_ids.len(), "virtual pallets superseded")
            }
        }
    }
    info!("event channel closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_survives_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        sender
            .send_or_log(Event::VirtualPalletsSuperseded { pallet_ids: vec![] })
            .await;
        assert!(sender
            .send(Event::VirtualPalletsSuperseded { pallet_ids: vec![] })
            .await
            .is_err());
    }
}
