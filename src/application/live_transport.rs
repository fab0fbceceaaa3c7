// Live channel transport trait: authorize, subscribe, unsubscribe
use crate::domain::error::LiveError;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

/// Grant returned by a successful authorization handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub subject: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// An open channel. Messages arrive in publish order on `messages`; each is
/// the broadcast payload (`{ "record": { ... } }`).
#[derive(Debug)]
pub struct Subscription {
    pub handle: SubscriptionHandle,
    pub messages: mpsc::UnboundedReceiver<Value>,
}

#[async_trait]
pub trait LiveTransport: Send + Sync {
    /// Authorize a live session with the caller's credential.
    async fn authorize(&self, credential: &str) -> Result<Authorization, LiveError>;

    /// Open a private channel filtered to `event`.
    async fn subscribe(
        &self,
        authorization: &Authorization,
        channel: &str,
        event: &str,
    ) -> Result<Subscription, LiveError>;

    /// Close a channel. Once this returns no further message is delivered on it.
    fn unsubscribe(&self, handle: SubscriptionHandle);
}
