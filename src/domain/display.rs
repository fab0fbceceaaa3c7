// Display configuration domain model and panel editing rules
use crate::domain::widget::WidgetId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;

/// Saved as the only element when the user explicitly chose no widgets.
pub const SENTINEL_EMPTY: WidgetId = -1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutType {
    FourTileGrid,
    #[default]
    SixTileGrid,
}

impl LayoutType {
    pub const ALL: [LayoutType; 2] = [LayoutType::FourTileGrid, LayoutType::SixTileGrid];

    /// Maximum number of panels the layout can show.
    pub fn capacity(&self) -> usize {
        match self {
            LayoutType::FourTileGrid => 4,
            LayoutType::SixTileGrid => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutType::FourTileGrid => "four_tile_grid",
            LayoutType::SixTileGrid => "six_tile_grid",
        }
    }

    /// Best-effort read of `layout_setting.widget_settings.layout.type`.
    pub fn from_layout_setting(setting: &Value) -> Option<Self> {
        let name = setting
            .pointer("/widget_settings/layout/type")
            .and_then(Value::as_str)?;
        LayoutType::ALL.into_iter().find(|l| l.as_str() == name)
    }

    pub fn to_layout_setting(self) -> Value {
        json!({ "widget_settings": { "layout": { "type": self.as_str() } } })
    }
}

/// A user's saved display row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayConfiguration {
    pub row_id: Option<i64>,
    pub widget_ids: Vec<WidgetId>,
    pub layout: LayoutType,
    pub zip_code: Option<String>,
}

impl DisplayConfiguration {
    pub fn from_row(row: &Value) -> Self {
        Self {
            row_id: row.get("id").and_then(Value::as_i64),
            widget_ids: normalize_widget_ids(row.get("widget_ids").unwrap_or(&Value::Null)),
            layout: row
                .get("layout_setting")
                .and_then(LayoutType::from_layout_setting)
                .unwrap_or_default(),
            zip_code: row
                .get("zip_code")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|z| !z.is_empty())
                .map(str::to_string),
        }
    }
}

/// Display-settings form submission.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DisplayDraft {
    /// Row the editor loaded, if any. Saves fall back to an owner lookup when
    /// this is absent or stale.
    #[serde(default)]
    pub row_id: Option<i64>,
    pub widget_ids: Vec<WidgetId>,
    #[serde(default)]
    pub layout: LayoutType,
    #[serde(default)]
    pub zip_code: Option<String>,
}

impl DisplayDraft {
    /// Ids as persisted: sentinel stripped, deduplicated, truncated to the
    /// layout capacity, then padded with the sentinel to exactly capacity.
    pub fn padded_widget_ids(&self) -> Vec<String> {
        let capacity = self.layout.capacity();
        let mut seen = HashSet::new();
        let cleaned: Vec<WidgetId> = self
            .widget_ids
            .iter()
            .copied()
            .filter(|id| *id != SENTINEL_EMPTY && seen.insert(*id))
            .take(capacity)
            .collect();

        (0..capacity)
            .map(|i| cleaned.get(i).copied().unwrap_or(SENTINEL_EMPTY).to_string())
            .collect()
    }

    /// Column values written on insert or update.
    pub fn to_row(&self, user_id: &str) -> Value {
        json!({
            "user_id": user_id,
            "widget_ids": self.padded_widget_ids(),
            "layout_setting": self.layout.to_layout_setting(),
            "zip_code": self.zip_code.as_deref().map(str::trim),
        })
    }
}

/// Coerce string-encoded ids, drop non-numeric and non-integral entries, and
/// deduplicate keeping the first occurrence.
pub fn normalize_widget_ids(raw: &Value) -> Vec<WidgetId> {
    let Value::Array(items) = raw else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    items
        .iter()
        .filter_map(coerce_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

fn coerce_id(value: &Value) -> Option<WidgetId> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

fn integral(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f <= i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}

fn is_sentinel_only(ids: &[WidgetId]) -> bool {
    ids == [SENTINEL_EMPTY]
}

/// Move the panel at `index` one slot up (negative `direction`) or down
/// (positive). Only the sign counts. Out-of-range moves are ignored.
pub fn move_panel(ids: &mut [WidgetId], index: usize, direction: isize) {
    let Some(target) = index.checked_add_signed(direction.signum()) else {
        return;
    };
    if index < ids.len() && target < ids.len() {
        ids.swap(index, target);
    }
}

pub fn remove_panel(ids: &mut Vec<WidgetId>, index: usize) {
    if index < ids.len() {
        ids.remove(index);
    }
}

/// Append a widget to the panel list. Adding to an explicitly empty list
/// replaces the sentinel. Returns `false` for duplicates or a full layout.
pub fn add_panel(ids: &mut Vec<WidgetId>, id: WidgetId, capacity: usize) -> bool {
    if is_sentinel_only(ids) {
        ids.clear();
    }
    if id == SENTINEL_EMPTY || ids.contains(&id) || ids.len() >= capacity {
        return false;
    }
    ids.push(id);
    true
}
