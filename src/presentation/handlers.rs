// HTTP request handlers
use crate::application::display_service::PanelEdit;
use crate::domain::display::DisplayDraft;
use crate::domain::error::DashboardError;
use crate::domain::live::{LiveState, LookupKey};
use crate::domain::widget::{WidgetDraft, WidgetId, WidgetRecord};
use crate::domain::widget_type::{self, WidgetDefinition, WidgetType};
use crate::infrastructure::chunked_json::chunked_json_stream;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::presentation::api_error::ApiError;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_stream::wrappers::WatchStream;

#[derive(Serialize)]
struct CatalogEntry {
    #[serde(flatten)]
    definition: WidgetDefinition,
    default_configuration: Value,
}

#[derive(Serialize)]
struct PanelLiveState {
    widget_id: WidgetId,
    #[serde(flatten)]
    live: LiveState,
}

#[derive(Deserialize)]
pub struct BroadcastMessage {
    pub channel: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Deserialize)]
pub struct FantasyQuery {
    pub user_id: Option<String>,
}

async fn respond<T: Serialize>(status: StatusCode, data: &T, headers: &HeaderMap) -> Response {
    match json_response(status, data, accepts_brotli(headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Credential from `Authorization: Bearer <token>`.
fn bearer_credential(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Widget catalog with field schemas and default configurations
pub async fn list_widget_types(headers: HeaderMap) -> Response {
    let catalog: Vec<CatalogEntry> = WidgetType::ALL
        .iter()
        .map(|t| {
            let definition = t.definition();
            CatalogEntry {
                default_configuration: definition.default_configuration(),
                definition,
            }
        })
        .collect();

    respond(StatusCode::OK, &catalog, &headers).await
}

/// Validate a configuration draft without saving it
pub async fn validate_widget_config(
    Path(widget_type): Path<String>,
    Json(draft): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let configuration = widget_type::validate(&widget_type, &draft).map_err(DashboardError::from)?;
    Ok(Json(json!({ "configuration": configuration })))
}

/// Resolved render plan for a user
pub async fn get_dashboard(
    Path(user_id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let view = state.display_service.dashboard(&user_id).await;
    respond(StatusCode::OK, &view, &headers).await
}

pub async fn save_display(
    Path(user_id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(draft): Json<DisplayDraft>,
) -> Result<Response, ApiError> {
    state.display_service.save(&user_id, &draft).await?;
    let view = state.display_service.dashboard(&user_id).await;
    Ok(respond(StatusCode::OK, &view, &headers).await)
}

pub async fn edit_panels(
    Path(user_id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(edit): Json<PanelEdit>,
) -> Result<Response, ApiError> {
    let view = state.display_service.edit_panels(&user_id, edit).await?;
    Ok(respond(StatusCode::OK, &view, &headers).await)
}

pub async fn list_widgets(
    Path(user_id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let widgets = state.widget_service.list(&user_id).await?;
    Ok(respond(StatusCode::OK, &widgets, &headers).await)
}

pub async fn create_widget(
    Path(user_id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(draft): Json<WidgetDraft>,
) -> Result<Response, ApiError> {
    let widget = state.widget_service.create(&user_id, &draft).await?;
    Ok(respond(StatusCode::CREATED, &widget, &headers).await)
}

pub async fn update_widget(
    Path((user_id, widget_id)): Path<(String, WidgetId)>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(draft): Json<WidgetDraft>,
) -> Result<Response, ApiError> {
    let widget = state.widget_service.update(&user_id, widget_id, &draft).await?;
    Ok(respond(StatusCode::OK, &widget, &headers).await)
}

pub async fn delete_widget(
    Path((user_id, widget_id)): Path<(String, WidgetId)>,
    State(state): State<Arc<AppState>>,
) -> Result<StatusCode, ApiError> {
    state.widget_service.delete(&user_id, widget_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Stream one widget's live state: the snapshot first, then every applied
/// update. Ends once no further updates can arrive; a dropped connection
/// closes the channel.
pub async fn stream_widget_live(
    Path((user_id, widget_id)): Path<(String, WidgetId)>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let record = state.widget_service.get(&user_id, widget_id).await?;
    let key = LookupKey::for_widget(&record).ok_or_else(|| {
        ApiError::Unprocessable(format!("widget {} has no live data source", widget_id))
    })?;

    let credential = bearer_credential(&headers);
    let feed = state.live_session().open(key, credential.as_deref()).await;

    let updates = async_stream::stream! {
        let mut feed = feed;
        let mut states = WatchStream::new(feed.watch());
        while let Some(live) = states.next().await {
            let terminal = live.status.is_terminal();
            yield live;
            if terminal {
                break;
            }
        }
        feed.close();
    };

    Ok(chunked_json_stream(updates, accepts_brotli(&headers)).unwrap_or_else(|s| s.into_response()))
}

/// Stream live state for every live panel on the user's dashboard.
pub async fn stream_dashboard_live(
    Path(user_id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let view = state.display_service.dashboard(&user_id).await;
    let records: Vec<WidgetRecord> = view.panels.into_iter().map(|p| p.widget).collect();

    let credential = bearer_credential(&headers);
    let session = state.live_session();
    let receivers = session.sync(&records, credential.as_deref()).await;
    tracing::debug!("Streaming {} live panels for {}", receivers.len(), user_id);

    let updates = async_stream::stream! {
        let session = session;
        let mut merged = futures::stream::select_all(receivers.into_iter().map(|(widget_id, rx)| {
            WatchStream::new(rx).map(move |live| PanelLiveState { widget_id, live })
        }));
        while let Some(update) = merged.next().await {
            yield update;
        }
        session.shutdown().await;
    };

    chunked_json_stream(updates, accepts_brotli(&headers)).unwrap_or_else(|s| s.into_response())
}

/// Row-change hook: fan a broadcast out to channel subscribers. The caller
/// must present the configured publish key as a bearer token.
pub async fn broadcast(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(message): Json<BroadcastMessage>,
) -> Result<Json<Value>, ApiError> {
    let Some(publish_key) = state.publish_key.as_deref() else {
        tracing::warn!("Refusing publish on {}: no publish key configured", message.channel);
        return Err(ApiError::Unauthorized("broadcast publishing is disabled".to_string()));
    };
    if bearer_credential(&headers).as_deref() != Some(publish_key) {
        tracing::warn!("Refusing publish on {}: bad or missing publish key", message.channel);
        return Err(ApiError::Unauthorized("publish key rejected".to_string()));
    }

    let delivered = state
        .hub
        .publish(&message.channel, &message.event, message.payload);
    Ok(Json(json!({ "delivered": delivered })))
}

pub async fn fantasy_league(
    Path(league_id): Path<String>,
    Query(query): Query<FantasyQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    let summary = state
        .fantasy_service
        .league_summary(&league_id, query.user_id.as_deref())
        .await?;
    Ok(respond(StatusCode::OK, &summary, &headers).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_credential() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_credential(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer  abc "));
        assert_eq!(bearer_credential(&headers).as_deref(), Some("abc"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_credential(&headers), None);
    }
}
