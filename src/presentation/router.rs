// Route table and middleware
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    broadcast, create_widget, delete_widget, edit_panels, fantasy_league, get_dashboard,
    health_check, list_widget_types, list_widgets, save_display, stream_dashboard_live,
    stream_widget_live, update_widget, validate_widget_config,
};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

// Compression is applied per response by the handlers, so no CompressionLayer.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/widget-types", get(list_widget_types))
        .route("/widget-types/:widget_type/validate", post(validate_widget_config))
        .route("/users/:user_id/dashboard", get(get_dashboard))
        .route("/users/:user_id/dashboard/live", get(stream_dashboard_live))
        .route("/users/:user_id/display", put(save_display))
        .route("/users/:user_id/display/panels", post(edit_panels))
        .route("/users/:user_id/widgets", get(list_widgets).post(create_widget))
        .route(
            "/users/:user_id/widgets/:widget_id",
            put(update_widget).delete(delete_widget),
        )
        .route("/users/:user_id/widgets/:widget_id/live", get(stream_widget_live))
        .route("/realtime/broadcast", post(broadcast))
        .route("/feeds/fantasy/:league_id", get(fantasy_league))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
