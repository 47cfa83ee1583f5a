use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
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

    /// Sends an event, logging instead of failing when nobody is listening.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Domain event dropped");
        }
    }
}

/// Creates a bounded event channel.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    OrderCreated { order_id: Uuid, code: String },
    OrderUpdated(Uuid),
    OrderCancelled(Uuid),
    OrderDeleted(Uuid),
    OrdersImported { imported: usize, skipped: usize, failed: usize },
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: &Event) -> Result<(), String>;
}

/// Logs every event it receives.
pub struct LoggingHandler;

#[async_trait]
impl EventHandler for LoggingHandler {
    async fn handle_event(&self, event: &Event) -> Result<(), String> {
        match event {
            Event::OrderCreated { order_id, code } => {
                info!(%order_id, %code, "order created")
            }
            Event::OrderUpdated(order_id) => info!(%order_id, "order updated"),
            Event::OrderCancelled(order_id) => info!(%order_id, "order cancelled"),
            Event::OrderDeleted(order_id) => info!(%order_id, "order deleted"),
            Event::OrdersImported {
                imported,
                skipped,
                failed,
            } => info!(imported, skipped, failed, "order import finished"),
        }
        Ok(())
    }
}

/// Drains the channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    process_events_with(&mut rx, &[Box::new(LoggingHandler)]).await
}

pub async fn process_events_with(
    rx: &mut mpsc::Receiver<Event>,
    handlers: &[Box<dyn EventHandler>],
) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        for handler in handlers {
            if let Err(e) = handler.handle_event(&event).await {
                error!(error = %e, ?event, "Event handler failed");
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Recorder(Arc<Mutex<Vec<Event>>>);

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle_event(&self, event: &Event) -> Result<(), String> {
            self.0.lock().unwrap().push(event.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn delivers_events_to_every_handler_in_order() {
        let (sender, mut rx) = channel(4);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let id = Uuid::new_v4();

        sender.send(Event::OrderUpdated(id)).await.unwrap();
        sender.send(Event::OrderCancelled(id)).await.unwrap();
        drop(sender);

        let handlers: Vec<Box<dyn EventHandler>> =
            vec![Box::new(LoggingHandler), Box::new(Recorder(seen.clone()))];
        process_events_with(&mut rx, &handlers).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Event::OrderUpdated(id), Event::OrderCancelled(id)]
        );
    }

    #[tokio::test]
    async fn send_or_log_survives_closed_channel() {
        let (sender, rx) = channel(1);
        drop(rx);
        assert!(sender.send(Event::OrderDeleted(Uuid::nil())).await.is_err());
        sender.send_or_log(Event::OrderDeleted(Uuid::nil())).await;
    }
}
