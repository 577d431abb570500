//! Correlating `Get` requests with `Retrieved` replies.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::oneshot;

pub type RetrievedKeys = HashMap<String, Value>;

/// Outstanding `Get` requests keyed by `request_id`.
#[derive(Default)]
pub struct PendingReplies {
    inner: HashMap<String, oneshot::Sender<RetrievedKeys>>,
}

impl PendingReplies {
    pub fn insert(&mut self, request_id: String, reply: oneshot::Sender<RetrievedKeys>) {
        self.inner.insert(request_id, reply);
    }

    pub fn remove(&mut self, request_id: &str) -> bool {
        self.inner.remove(request_id).is_some()
    }

    /// Resolve and remove a pending request.
    ///
    /// Returns true if a pending request was found.
    pub fn resolve(&mut self, request_id: &str, keys: RetrievedKeys) -> bool {
        match self.inner.remove(request_id) {
            Some(reply) => {
                // The requester may have timed out and gone away.
                let _ = reply.send(keys);
                true
            }
            None => false,
        }
    }

    /// Drop every waiter; their receivers observe a closed channel.
    pub fn clear(&mut self) -> usize {
        let count = self.inner.len();
        self.inner.clear();
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolve_delivers_keys_once() {
        let mut pending = PendingReplies::default();
        let (tx, rx) = oneshot::channel();
        pending.insert("req-1".to_string(), tx);

        let keys = RetrievedKeys::from([("Slot:1:ApBridgeTokens".to_string(), Value::from(7))]);
        assert!(pending.resolve("req-1", keys.clone()));
        assert!(!pending.resolve("req-1", keys.clone()));

        assert_eq!(rx.await.expect("reply delivered"), keys);
        assert_eq!(pending.clear(), 0);
    }

    #[tokio::test]
    async fn clear_closes_waiters() {
        let mut pending = PendingReplies::default();
        let (tx, rx) = oneshot::channel();
        pending.insert("req-1".to_string(), tx);

        assert_eq!(pending.clear(), 1);
        assert!(rx.await.is_err());
    }
}
