// Application state for HTTP handlers
use crate::application::backing_store::BackingStore;
use crate::application::display_service::DisplayService;
use crate::application::fantasy_service::FantasyService;
use crate::application::live_channel::LiveChannelManager;
use crate::application::widget_service::WidgetService;
use crate::infrastructure::broadcast_hub::BroadcastHub;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub display_service: DisplayService,
    pub widget_service: WidgetService,
    pub fantasy_service: FantasyService,
    pub store: Arc<dyn BackingStore>,
    pub hub: Arc<BroadcastHub>,
    pub publish_key: Option<String>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn BackingStore>,
        hub: Arc<BroadcastHub>,
        fantasy_service: FantasyService,
        publish_key: Option<String>,
    ) -> Self {
        Self {
            display_service: DisplayService::new(store.clone()),
            widget_service: WidgetService::new(store.clone()),
            fantasy_service,
            store,
            hub,
            publish_key,
        }
    }

    /// Live channels for one streaming connection; dropping it closes them.
    pub fn live_session(&self) -> LiveChannelManager {
        LiveChannelManager::new(self.store.clone(), self.hub.clone())
    }
}
