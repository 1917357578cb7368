use crate::network::messages::ChatEntry;
use parking_lot::Mutex;
use tokio::sync::mpsc;

// ── ChatTransport ───────────────────────────────────────────────────────────

/// The one-way broadcast channel the session coordinator rides on.
///
/// Fire-and-forget: no acknowledgment, no ordering guarantee between peers,
/// no delivery guarantee, no history replay. The real implementation is the
/// chat WebSocket; tests and local demos use [`LoopbackHub`]. Inbound
/// delivery is wired by the embedding application, which feeds received
/// entries into `CoopCoordinator::handle_inbound`.
pub trait ChatTransport: Send + Sync {
    fn broadcast(&self, entry: ChatEntry);
}

// ── LoopbackHub ─────────────────────────────────────────────────────────────

/// In-memory broadcast feed connecting peers in the same process.
///
/// Every broadcast is delivered to every subscriber, including the sender,
/// matching real chat feeds, which echo the sender's own messages back.
#[derive(Default)]
pub struct LoopbackHub {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ChatEntry>>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new subscriber and return its inbound feed.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<ChatEntry> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl ChatTransport for LoopbackHub {
    fn broadcast(&self, entry: ChatEntry) {
        // Deliver to everyone, dropping subscribers whose receiver is gone.
        self.subscribers
            .lock()
            .retain(|tx| tx.send(entry.clone()).is_ok());
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_reaches_all_subscribers() {
        let hub = LoopbackHub::new();
        let mut rx1 = hub.subscribe();
        let mut rx2 = hub.subscribe();

        hub.broadcast(ChatEntry::new("pet-1", "🐶", "hello"));

        assert_eq!(rx1.recv().await.unwrap().text, "hello");
        assert_eq!(rx2.recv().await.unwrap().text, "hello");
    }

    #[tokio::test]
    async fn test_sender_receives_own_echo() {
        let hub = LoopbackHub::new();
        let mut rx = hub.subscribe();

        hub.broadcast(ChatEntry::new("pet-1", "🐶", "join:k"));

        let echo = rx.recv().await.unwrap();
        assert_eq!(echo.from, "pet-1");
        assert_eq!(echo.text, "join:k");
    }

    #[tokio::test]
    async fn test_dropped_subscribers_are_pruned() {
        let hub = LoopbackHub::new();
        let rx1 = hub.subscribe();
        let _rx2 = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 2);

        drop(rx1);
        hub.broadcast(ChatEntry::new("pet-1", "🐶", "x"));

        assert_eq!(hub.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_broadcasts_arrive_in_order_per_subscriber() {
        let hub = LoopbackHub::new();
        let mut rx = hub.subscribe();

        for i in 0..5 {
            hub.broadcast(ChatEntry::new("pet-1", "🐶", format!("m{i}")));
        }

        for i in 0..5 {
            assert_eq!(rx.recv().await.unwrap().text, format!("m{i}"));
        }
    }
}
