// Live channel manager - Snapshot read, authorized subscribe, update application, teardown
use crate::application::backing_store::{BackingStore, Filter};
use crate::application::live_transport::{LiveTransport, Subscription, SubscriptionHandle};
use crate::domain::error::DashboardError;
use crate::domain::live::{LiveResource, LiveState, LiveStatus, LookupKey};
use crate::domain::widget::{WidgetId, WidgetRecord};
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;

type Slot = Arc<AsyncMutex<Option<LiveFeed>>>;

/// An open subscription plus the task applying its messages.
///
/// `gate` is held while an update is applied; teardown flips it under the same
/// lock, so nothing is applied once `close` returns.
struct Channel {
    transport: Arc<dyn LiveTransport>,
    handle: SubscriptionHandle,
    gate: Arc<Mutex<bool>>,
    pump: JoinHandle<()>,
}

impl Channel {
    fn close(self) {
        *lock(&self.gate) = false;
        self.transport.unsubscribe(self.handle);
        self.pump.abort();
    }
}

/// Live state for one widget: the snapshot, kept current by its channel.
///
/// Dropping the feed closes the channel.
pub struct LiveFeed {
    key: LookupKey,
    state: Arc<watch::Sender<LiveState>>,
    channel: Option<Channel>,
}

impl LiveFeed {
    pub fn watch(&self) -> watch::Receiver<LiveState> {
        self.state.subscribe()
    }

    #[cfg(test)]
    pub fn current(&self) -> LiveState {
        self.state.borrow().clone()
    }

    /// Tear down the channel. No update is applied after this returns.
    pub fn close(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
        self.state.send_modify(|s| s.status = LiveStatus::Closed);
    }

    fn reusable_for(&self, key: &LookupKey) -> bool {
        self.key == *key
            && !matches!(
                self.state.borrow().status,
                LiveStatus::Unavailable | LiveStatus::Closed
            )
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
    }
}

/// Keeps each rendered widget's live fields current.
///
/// Feeds are either owned directly by the caller ([`open`](Self::open)) or
/// held in per-widget slots ([`attach`](Self::attach) / [`sync`](Self::sync)).
/// A slot serializes its own attach/detach calls, so a widget never has two
/// subscribe attempts in flight; different widgets proceed independently.
pub struct LiveChannelManager {
    store: Arc<dyn BackingStore>,
    transport: Arc<dyn LiveTransport>,
    slots: Mutex<HashMap<WidgetId, Slot>>,
}

impl LiveChannelManager {
    pub fn new(store: Arc<dyn BackingStore>, transport: Arc<dyn LiveTransport>) -> Self {
        Self {
            store,
            transport,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Read the snapshot for `key`, then subscribe for updates when the row
    /// has an id and a credential is available.
    ///
    /// Never fails: a failed snapshot yields an `Unavailable` feed, a rejected
    /// subscription a `SnapshotOnly` feed carrying the error.
    pub async fn open(&self, key: LookupKey, credential: Option<&str>) -> LiveFeed {
        let resource = key.resource;
        let filter = key
            .columns
            .iter()
            .fold(Filter::new(), |f, (column, value)| f.eq(column.as_str(), value.as_str()));

        let mut feed = LiveFeed {
            key,
            state: Arc::new(watch::channel(LiveState::pending()).0),
            channel: None,
        };

        let row = match self.store.query_one(resource.table(), &filter).await {
            Ok(Some(row)) => row,
            Ok(None) => {
                tracing::debug!("No {} row for {:?}", resource.table(), feed.key.columns);
                feed.state.send_replace(LiveState::not_found());
                return feed;
            }
            Err(e) => {
                let err = DashboardError::RecordRead(e);
                tracing::error!("Snapshot of {} failed: {}", resource.table(), err);
                feed.state.send_replace(LiveState::unavailable(err.to_string()));
                return feed;
            }
        };

        let record_id = row.get("id").and_then(Value::as_i64);
        feed.state.send_replace(LiveState::snapshot(
            record_id,
            resource.live_fields(&row).cloned(),
        ));

        let Some(record_id) = record_id else {
            tracing::warn!("{} row has no id; live updates disabled", resource.table());
            return feed;
        };
        let Some(credential) = credential else {
            tracing::warn!("No credential for {}; serving snapshot only", resource.channel_name(record_id));
            feed.state
                .send_modify(|s| s.error = Some("no live credential supplied".to_string()));
            return feed;
        };

        match self.subscribe(resource, record_id, credential).await {
            Ok(subscription) => {
                feed.state.send_modify(|s| s.status = LiveStatus::Live);
                let gate = Arc::new(Mutex::new(true));
                let pump = spawn_pump(
                    resource,
                    subscription.messages,
                    feed.state.clone(),
                    gate.clone(),
                );
                feed.channel = Some(Channel {
                    transport: self.transport.clone(),
                    handle: subscription.handle,
                    gate,
                    pump,
                });
                tracing::info!("Live channel {} open", resource.channel_name(record_id));
            }
            Err(err) => {
                tracing::warn!(
                    "Live channel {} unavailable, serving snapshot only: {}",
                    resource.channel_name(record_id),
                    err
                );
                feed.state.send_modify(|s| s.error = Some(err.to_string()));
            }
        }

        feed
    }

    async fn subscribe(
        &self,
        resource: LiveResource,
        record_id: i64,
        credential: &str,
    ) -> Result<Subscription, DashboardError> {
        let authorization = self
            .transport
            .authorize(credential)
            .await
            .map_err(DashboardError::SubscribeAuth)?;

        self.transport
            .subscribe(
                &authorization,
                &resource.channel_name(record_id),
                resource.event_name(),
            )
            .await
            .map_err(DashboardError::SubscribeAuth)
    }

    /// Bind `slot` to `key`. An existing feed for the same key is reused; a
    /// feed for a different key is closed before the new one is opened.
    pub async fn attach(
        &self,
        slot: WidgetId,
        key: LookupKey,
        credential: Option<&str>,
    ) -> watch::Receiver<LiveState> {
        let cell = lock(&self.slots).entry(slot).or_default().clone();
        let mut current = cell.lock().await;

        if let Some(feed) = current.as_ref() {
            if feed.reusable_for(&key) {
                return feed.watch();
            }
        }

        if let Some(mut previous) = current.take() {
            tracing::debug!("Widget {} lookup changed; closing previous channel", slot);
            previous.close();
        }

        let feed = self.open(key, credential).await;
        let receiver = feed.watch();
        *current = Some(feed);
        receiver
    }

    /// Close and forget the feed for `slot`. Returns whether one existed.
    pub async fn detach(&self, slot: WidgetId) -> bool {
        let cell = lock(&self.slots).remove(&slot);
        let Some(cell) = cell else {
            return false;
        };

        let mut current = cell.lock().await;
        match current.take() {
            Some(mut feed) => {
                feed.close();
                true
            }
            None => false,
        }
    }

    /// Reconcile slots with a newly resolved render set: widgets that left are
    /// detached, live-capable widgets are attached concurrently.
    pub async fn sync(
        &self,
        records: &[WidgetRecord],
        credential: Option<&str>,
    ) -> Vec<(WidgetId, watch::Receiver<LiveState>)> {
        let wanted: Vec<(WidgetId, LookupKey)> = records
            .iter()
            .filter_map(|r| LookupKey::for_widget(r).map(|key| (r.id, key)))
            .collect();

        let stale: Vec<WidgetId> = lock(&self.slots)
            .keys()
            .filter(|slot| !wanted.iter().any(|(id, _)| id == *slot))
            .copied()
            .collect();
        for slot in stale {
            self.detach(slot).await;
        }

        join_all(wanted.into_iter().map(|(slot, key)| async move {
            (slot, self.attach(slot, key, credential).await)
        }))
        .await
    }

    pub fn active_slots(&self) -> Vec<WidgetId> {
        let mut slots: Vec<WidgetId> = lock(&self.slots).keys().copied().collect();
        slots.sort_unstable();
        slots
    }

    /// Detach every slot.
    pub async fn shutdown(&self) {
        for slot in self.active_slots() {
            self.detach(slot).await;
        }
    }
}

fn spawn_pump(
    resource: LiveResource,
    mut messages: mpsc::UnboundedReceiver<Value>,
    state: Arc<watch::Sender<LiveState>>,
    gate: Arc<Mutex<bool>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(message) = messages.recv().await {
            let Some(record) = message.get("record") else {
                tracing::debug!("Ignoring {} message without record", resource.event_name());
                continue;
            };
            let Some(fields) = resource.live_fields(record) else {
                tracing::debug!("Ignoring {} message without live fields", resource.event_name());
                continue;
            };

            let applied = {
                let open = lock(&gate);
                if *open {
                    state.send_modify(|s| s.apply_update(fields.clone()));
                }
                *open
            };
            if !applied {
                break;
            }
        }

        let open = lock(&gate);
        if *open {
            state.send_modify(|s| {
                s.status = LiveStatus::SnapshotOnly;
                s.error = Some("live channel ended".to_string());
            });
        }
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
