// Live record resources, lookup keys and per-widget live state
use crate::domain::widget::WidgetRecord;
use crate::domain::widget_type::RenderCapability;
use serde::Serialize;
use serde_json::Value;

/// A backing-store table whose rows are pushed to subscribers on change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveResource {
    Discord,
    Stattrak,
}

impl LiveResource {
    /// Table holding the live rows; also the channel prefix.
    pub fn table(&self) -> &'static str {
        match self {
            LiveResource::Discord => "widget_discord",
            LiveResource::Stattrak => "widget_stattrak",
        }
    }

    /// Broadcast event carried on the channel.
    pub fn event_name(&self) -> &'static str {
        match self {
            LiveResource::Discord => "discord_update",
            LiveResource::Stattrak => "stattrak_update",
        }
    }

    /// Channel scoped to one row id. The format is shared with the publisher
    /// and must not change.
    pub fn channel_name(&self, record_id: i64) -> String {
        format!("{}:{}:update", self.table(), record_id)
    }

    /// Project the live-fields sub-object out of a full row.
    pub fn live_fields<'a>(&self, row: &'a Value) -> Option<&'a Value> {
        match self {
            LiveResource::Discord => row.get("discord_details"),
            LiveResource::Stattrak => Some(row),
        }
    }
}

/// Owner-scoped lookup for the live row backing a widget. Not necessarily the
/// row id: Discord rows are found by server id, StatTrak rows by user + asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey {
    pub resource: LiveResource,
    pub columns: Vec<(String, String)>,
}

impl LookupKey {
    pub fn new(resource: LiveResource, columns: Vec<(String, String)>) -> Self {
        Self { resource, columns }
    }

    /// Derive the lookup key from a widget's type and configuration.
    ///
    /// Returns `None` for widgets without a live capability or whose
    /// configuration lacks the key columns.
    pub fn for_widget(record: &WidgetRecord) -> Option<Self> {
        let RenderCapability::LiveRecord(resource) = record.kind()?.definition().capability else {
            return None;
        };
        let config = record.configuration.as_ref()?;

        let columns = match resource {
            LiveResource::Discord => vec![(
                "discord_server_id".to_string(),
                config_text(config, "discord_server_id")?,
            )],
            LiveResource::Stattrak => vec![
                (
                    "steam_user_id".to_string(),
                    config_text(config, "steam_user_id")?,
                ),
                (
                    "steam_asset_id".to_string(),
                    config_text(config, "csgo_item_id")?,
                ),
            ],
        };

        Some(Self::new(resource, columns))
    }
}

fn config_text(config: &Value, key: &str) -> Option<String> {
    match config.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveStatus {
    /// Snapshot not yet read.
    Pending,
    /// Snapshot applied and channel open.
    Live,
    /// Snapshot applied; no channel (no row id, no credential or rejected).
    SnapshotOnly,
    /// Snapshot read succeeded but no row matched.
    NotFound,
    /// Snapshot read failed.
    Unavailable,
    /// Torn down by the consumer.
    Closed,
}

impl LiveStatus {
    /// No further updates will arrive in this state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LiveStatus::Pending | LiveStatus::Live)
    }
}

/// What the render layer sees for one live widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveState {
    pub status: LiveStatus,
    pub record_id: Option<i64>,
    pub fields: Option<Value>,
    pub updates_applied: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LiveState {
    pub fn pending() -> Self {
        Self {
            status: LiveStatus::Pending,
            record_id: None,
            fields: None,
            updates_applied: 0,
            error: None,
        }
    }

    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            status: LiveStatus::Unavailable,
            error: Some(error.into()),
            ..Self::pending()
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: LiveStatus::NotFound,
            ..Self::pending()
        }
    }

    pub fn snapshot(record_id: Option<i64>, fields: Option<Value>) -> Self {
        Self {
            status: LiveStatus::SnapshotOnly,
            record_id,
            fields,
            ..Self::pending()
        }
    }

    /// Replace the live fields wholesale with a pushed row.
    pub fn apply_update(&mut self, fields: Value) {
        self.fields = Some(fields);
        self.updates_applied += 1;
    }
}
