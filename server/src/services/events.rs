use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;

// Event names kept from the previous back office so existing consumers keep
// working; "admin" is what that system called a staff record.
pub const NEW_ADMIN: &str = "new_admin";
pub const ADMIN_UPDATED: &str = "admin_updated";
pub const ADMIN_DELETED: &str = "admin_deleted";
pub const NEW_CLIENT: &str = "new_client";
pub const CLIENT_UPDATED: &str = "client_updated";
pub const CLIENT_DELETED: &str = "client_deleted";
pub const NEW_PACKAGE: &str = "new_package";
pub const PACKAGE_UPDATED: &str = "package_updated";
pub const PACKAGE_DELETED: &str = "package_deleted";

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub event: &'static str,
    pub payload: Value,
}

/// In-process notification channel. Mutation handlers emit after a successful
/// commit and never wait on delivery; subscribers that lag simply miss events.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<Notification>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: &'static str, payload: Value) {
        if self.tx.send(Notification { event, payload }).is_err() {
            tracing::debug!(event, "no notification subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Background subscriber that mirrors every notification into the log.
pub fn spawn_logger(bus: &EventBus) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(n) => tracing::info!(event = n.event, payload = %n.payload, "notification"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "notification logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn subscribers_receive_emitted_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.emit(NEW_ADMIN, json!({"id": "abc"}));

        let n = rx.recv().await.unwrap();
        assert_eq!(n.event, NEW_ADMIN);
        assert_eq!(n.payload["id"], "abc");
    }

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.emit(PACKAGE_DELETED, json!({"id": "gone"}));
    }
}
