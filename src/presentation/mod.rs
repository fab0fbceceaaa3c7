// Presentation layer - HTTP handlers, routing and error mapping
pub mod api_error;
pub mod app_state;
pub mod handlers;
pub mod router;
