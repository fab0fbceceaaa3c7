// In-process broadcast hub implementing the live channel transport
use crate::application::live_transport::{
    Authorization, LiveTransport, Subscription, SubscriptionHandle,
};
use crate::domain::error::LiveError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;

struct Subscriber {
    handle: SubscriptionHandle,
    event: String,
    sender: mpsc::UnboundedSender<Value>,
}

/// Fans broadcast messages out to private, record-scoped channels.
///
/// Row-change hooks on the backing store call [`BroadcastHub::publish`]; each
/// subscriber receives messages for its channel whose event matches the one it
/// subscribed to.
pub struct BroadcastHub {
    channels: Mutex<HashMap<String, Vec<Subscriber>>>,
    next_handle: AtomicU64,
    /// Accepted credentials. Empty accepts any non-empty credential.
    credentials: HashSet<String>,
}

impl BroadcastHub {
    pub fn new(credentials: impl IntoIterator<Item = String>) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            credentials: credentials.into_iter().collect(),
        }
    }

    /// Deliver `payload` to every subscriber of `channel` listening for
    /// `event`. Returns the number of subscribers reached.
    pub fn publish(&self, channel: &str, event: &str, payload: Value) -> usize {
        let mut channels = self.lock();
        let Some(subscribers) = channels.get_mut(channel) else {
            tracing::debug!("No subscribers on {} for {}", channel, event);
            return 0;
        };

        // Receivers dropped without unsubscribing are pruned here.
        subscribers.retain(|s| !s.sender.is_closed());

        let mut delivered = 0;
        for subscriber in subscribers.iter().filter(|s| s.event == event) {
            if subscriber.sender.send(payload.clone()).is_ok() {
                delivered += 1;
            }
        }

        if subscribers.is_empty() {
            channels.remove(channel);
        }

        tracing::debug!("Published {} on {} to {} subscribers", event, channel, delivered);
        delivered
    }

    #[cfg(test)]
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.lock().get(channel).map_or(0, Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Subscriber>>> {
        // No invariant spans a panic here; recover the map.
        self.channels.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl LiveTransport for BroadcastHub {
    async fn authorize(&self, credential: &str) -> Result<Authorization, LiveError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(LiveError::Unauthorized("missing credential".to_string()));
        }
        if !self.credentials.is_empty() && !self.credentials.contains(credential) {
            return Err(LiveError::Unauthorized("credential not recognised".to_string()));
        }

        Ok(Authorization {
            subject: credential.to_string(),
        })
    }

    async fn subscribe(
        &self,
        _authorization: &Authorization,
        channel: &str,
        event: &str,
    ) -> Result<Subscription, LiveError> {
        let (sender, messages) = mpsc::unbounded_channel();
        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));

        self.lock()
            .entry(channel.to_string())
            .or_default()
            .push(Subscriber {
                handle,
                event: event.to_string(),
                sender,
            });

        tracing::debug!("Opened channel {} ({:?}) for {}", channel, handle, event);
        Ok(Subscription { handle, messages })
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        let mut channels = self.lock();
        channels.retain(|_, subscribers| {
            subscribers.retain(|s| s.handle != handle);
            !subscribers.is_empty()
        });
        tracing::debug!("Closed channel subscription {:?}", handle);
    }
}
