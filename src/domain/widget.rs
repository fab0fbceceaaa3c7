// Widget record domain model
use crate::domain::widget_type::WidgetType;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Owner-scoped widget row id.
pub type WidgetId = i64;

/// A user's configured widget, as stored in the `user_widget` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetRecord {
    pub id: WidgetId,
    #[serde(rename = "widget_title", default)]
    pub title: Option<String>,
    #[serde(rename = "widget_type", default, deserialize_with = "null_as_default")]
    pub widget_type: String,
    #[serde(rename = "widget_configuration", default)]
    pub configuration: Option<Value>,
    #[serde(rename = "requires_config", default, deserialize_with = "null_as_default")]
    pub requires_configuration: bool,
}

impl WidgetRecord {
    /// Catalog entry for this record, if the stored type string is known.
    pub fn kind(&self) -> Option<WidgetType> {
        self.widget_type.parse().ok()
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(untitled)")
    }

    /// Parse a store row, tolerating nullable columns.
    pub fn from_row(row: &Value) -> Option<Self> {
        match serde_json::from_value(row.clone()) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping malformed widget row {}: {}", row, e);
                None
            }
        }
    }
}

/// Create/edit form submission for a widget.
#[derive(Debug, Clone, Deserialize)]
pub struct WidgetDraft {
    pub title: String,
    pub widget_type: String,
    #[serde(default)]
    pub configuration: Value,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
