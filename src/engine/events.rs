//! Domain events
//!
//! Published after the ledger confirms a submission. Subscribers receive
//! events over a broadcast channel and never block the publisher.

use serde::Serialize;
use tokio::sync::broadcast;

/// Maximum number of events to buffer per subscriber
const EVENT_CAPACITY: usize = 100;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum EngineEvent {
    AccountCreated {
        account_id: String,
        hash: String,
    },
    PaymentSent {
        from: String,
        payments: usize,
        hash: String,
    },
    AssetIssued {
        asset: String,
        hash: String,
    },
    AssetClawedBack {
        asset: String,
        holders: usize,
        hash: String,
    },
    AccountMerged {
        account_id: String,
        destination: String,
        hash: String,
    },
    FeeBumped {
        inner_hash: String,
        fee_source: String,
    },
    SwapExecuted {
        hash: String,
    },
    TrustlineAuthorized {
        trustor: String,
        asset_code: String,
        authorize: bool,
        hash: String,
    },
}

/// Broadcaster for engine events
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<EngineEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: EngineEvent) {
        log::debug!("Publishing event {:?}", event);
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_subscribers() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(EngineEvent::SwapExecuted {
            hash: "abc".to_string(),
        });
        assert_eq!(
            rx.recv().await.unwrap(),
            EngineEvent::SwapExecuted {
                hash: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::default();
        bus.publish(EngineEvent::FeeBumped {
            inner_hash: "h".to_string(),
            fee_source: "s".to_string(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serialization() {
        let json = serde_json::to_value(EngineEvent::AssetIssued {
            asset: "GOLD:ISSUER".to_string(),
            hash: "h".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "AssetIssued");
        assert_eq!(json["data"]["asset"], "GOLD:ISSUER");
    }
}
