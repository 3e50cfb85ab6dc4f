use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

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
}

/// Audit events emitted after each committed lifecycle operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Item events
    ItemCreated(i64),
    ItemUpdated(i64),

    // Purchase indent events
    PurchaseIndentCreated(i64),
    PurchaseIndentUpdated(i64),
    PurchaseIndentApproved(i64),
    PurchaseIndentRejected(i64),
    PurchaseIndentCancelled(i64),

    // Purchase order events
    PurchaseOrderCreated(i64),
    PurchaseOrderReceived {
        order_id: i64,
        items_received: usize,
    },
    PurchaseOrderCancelled(i64),

    // QC events
    QcApproved {
        movement_id: i64,
        item_id: i64,
    },
    QcRejected {
        movement_id: i64,
        item_id: i64,
    },

    // Dispatch and return events
    ItemDispatched {
        item_id: i64,
        movement_id: i64,
    },
    ItemReturned {
        item_id: i64,
        movement_id: i64,
    },

    // Job work events
    JobWorkAssigned {
        job_work_id: i64,
        item_id: i64,
    },
    JobWorkCompleted {
        job_work_id: i64,
        item_id: i64,
    },
}

/// Processes incoming events. Runs as a background task for the life of
/// the server; every event is logged as the audit trail, with extra
/// attention on the few that usually need a human to follow up.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::QcRejected {
                movement_id,
                item_id,
            } => {
                warn!(
                    "QC rejected movement {} for item {}; item sent back to vendor",
                    movement_id, item_id
                );
            }
            Event::PurchaseOrderReceived {
                order_id,
                items_received,
            } => {
                info!(
                    "Purchase order {} received, {} item(s) now awaiting QC",
                    order_id, items_received
                );
            }
            other => {
                info!("Received event: {:?}", other);
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_sender_delivers_to_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);

        sender.send(Event::ItemCreated(7)).await.unwrap();

        match rx.recv().await {
            Some(Event::ItemCreated(id)) => assert_eq!(id, 7),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn event_sender_reports_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let err = sender.send(Event::ItemUpdated(1)).await.unwrap_err();
        assert!(err.contains("Failed to send event"));
    }
}
