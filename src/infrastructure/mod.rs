// Infrastructure layer - External dependencies and adapters
pub mod broadcast_hub;
pub mod cache_storage;
pub mod chunked_json;
pub mod config;
pub mod http_response;
pub mod memory_store;
pub mod rest_store;
pub mod sleeper_client;
