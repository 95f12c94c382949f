use crate::events::MessageEvent;
use crate::services::LoggerService;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Cloneable producer side of the event queue.
#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::Sender<MessageEvent>,
}

impl EventSender {
    /// Returns `false` if the listener has stopped and the event was dropped.
    pub async fn send(&self, event: MessageEvent) -> bool {
        match self.tx.send(event).await {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                warn!(
                    "Event listener: Queue closed, dropping {} event for message {}",
                    event.kind(),
                    event.message_id()
                );
                false
            }
        }
    }
}

pub struct ListenerHandle {
    sender: EventSender,
    stop: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// Stops accepting events, drains what is already queued and waits for
    /// the listener task to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(());
        if let Err(e) = self.task.await {
            error!("Event listener: Task ended abnormally: {}", e);
        }
    }
}

/// Consumes message lifecycle events and forwards them to the logger.
pub struct EventListener {
    logger: LoggerService,
    events: mpsc::Receiver<MessageEvent>,
}

impl EventListener {
    pub fn spawn(logger: LoggerService, capacity: usize) -> ListenerHandle {
        let (tx, events) = mpsc::channel(capacity.max(1));
        let (stop, stop_rx) = oneshot::channel();
        let listener = Self { logger, events };
        let task = tokio::spawn(listener.run(stop_rx));

        ListenerHandle {
            sender: EventSender { tx },
            stop,
            task,
        }
    }

    async fn run(mut self, mut stop: oneshot::Receiver<()>) {
        info!("Event listener: Started");
        let mut stopping = false;
        loop {
            let next = if stopping {
                self.events.recv().await
            } else {
                tokio::select! {
                    _ = &mut stop => {
                        debug!("Event listener: Stop requested, draining queue");
                        self.events.close();
                        stopping = true;
                        continue;
                    }
                    event = self.events.recv() => event,
                }
            };

            let Some(event) = next else {
                break;
            };
            self.process(event).await;
        }
        info!("Event listener: Stopped");
    }

    /// Each event runs in its own task so that a panic while handling one
    /// message cannot take the listener down.
    async fn process(&self, event: MessageEvent) {
        let kind = event.kind();
        let message_id = event.message_id().to_string();
        let logger = self.logger.clone();

        if let Err(e) = tokio::spawn(dispatch(logger, event)).await {
            error!(
                "Event listener: Error processing {} event for message {}: {}",
                kind, message_id, e
            );
        }
    }
}

async fn dispatch(logger: LoggerService, event: MessageEvent) {
    match event {
        MessageEvent::Created(message) => {
            if !message.is_eligible() {
                debug!(
                    "Event listener: Skipping {} message {} (webhook: {})",
                    message.kind, message.message_id, message.from_webhook
                );
                return;
            }
            debug!(
                "Event listener: Received message from {} in {}",
                message.author_name, message.channel_name
            );
            logger.log_message(&message).await;
        }
        MessageEvent::Updated(message) => {
            if !message.is_eligible() {
                debug!(
                    "Event listener: Skipping update to {} message {}",
                    message.kind, message.message_id
                );
                return;
            }
            debug!(
                "Event listener: Message updated by {} in {}",
                message.author_name, message.channel_name
            );
            logger.update_message(&message).await;
        }
        MessageEvent::Deleted {
            message_id,
            channel_id,
        } => {
            debug!(
                "Event listener: Message deleted in {}: {}",
                channel_id, message_id
            );
            logger.delete_message(&message_id).await;
        }
    }
}
