// Application layer - Use cases and the seams they depend on
pub mod backing_store;
pub mod display_service;
pub mod fantasy_service;
pub mod live_channel;
pub mod live_transport;
pub mod ttl_cache;
pub mod widget_service;
