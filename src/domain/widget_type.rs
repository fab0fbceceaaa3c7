// Widget catalog: type definitions, configuration schemas and validation
use crate::domain::error::ValidationError;
use crate::domain::live::LiveResource;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

/// One case per catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    DiscordLive,
    FantasyFootballMatchups,
    Calendar,
    HockeyScoreboard,
    StattrakTracker,
    PictureScroller,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    StringList,
    StructuredEventList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub placeholder: &'static str,
}

/// External data source a widget renders from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    FantasyLeague,
    NhlScores,
}

/// What the render layer must provide for a widget type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "source", rename_all = "snake_case")]
pub enum RenderCapability {
    LiveRecord(LiveResource),
    ExternalFeed(FeedKind),
    PhotoStorage,
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WidgetDefinition {
    pub widget_type: WidgetType,
    pub title: &'static str,
    pub requires_configuration: bool,
    pub capability: RenderCapability,
    pub fields: &'static [FieldDef],
}

const NO_FIELDS: &[FieldDef] = &[];

const DISCORD_FIELDS: &[FieldDef] = &[FieldDef {
    key: "discord_server_id",
    label: "Discord Server ID",
    kind: FieldKind::Text,
    required: true,
    placeholder: "your_discord_server_id_here",
}];

const FANTASY_FIELDS: &[FieldDef] = &[
    FieldDef {
        key: "sleeper_user_id",
        label: "Sleeper User ID",
        kind: FieldKind::Text,
        required: true,
        placeholder: "your_sleeper_user_id_here",
    },
    FieldDef {
        key: "sleeper_league_ids",
        label: "Sleeper League IDs",
        kind: FieldKind::StringList,
        required: true,
        placeholder: "comma separated league ids",
    },
];

const CALENDAR_FIELDS: &[FieldDef] = &[FieldDef {
    key: "events",
    label: "Events",
    kind: FieldKind::StructuredEventList,
    required: true,
    placeholder: "[{...}]",
}];

const STATTRAK_FIELDS: &[FieldDef] = &[
    FieldDef {
        key: "steam_user_id",
        label: "Steam User ID",
        kind: FieldKind::Text,
        required: true,
        placeholder: "your_steam_user_id_here",
    },
    FieldDef {
        key: "csgo_item_id",
        label: "CSGO Item ID",
        kind: FieldKind::Text,
        required: true,
        placeholder: "your_csgo_item_id_here",
    },
];

impl WidgetType {
    pub const ALL: [WidgetType; 6] = [
        WidgetType::DiscordLive,
        WidgetType::FantasyFootballMatchups,
        WidgetType::Calendar,
        WidgetType::HockeyScoreboard,
        WidgetType::StattrakTracker,
        WidgetType::PictureScroller,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetType::DiscordLive => "discord_live",
            WidgetType::FantasyFootballMatchups => "fantasy_football_matchups",
            WidgetType::Calendar => "calendar",
            WidgetType::HockeyScoreboard => "hockey_scoreboard",
            WidgetType::StattrakTracker => "stattrak_tracker",
            WidgetType::PictureScroller => "picture_scroller",
        }
    }

    pub fn definition(&self) -> WidgetDefinition {
        let (title, requires_configuration, capability, fields) = match self {
            WidgetType::DiscordLive => (
                "Discord Server Live Status",
                true,
                RenderCapability::LiveRecord(LiveResource::Discord),
                DISCORD_FIELDS,
            ),
            WidgetType::FantasyFootballMatchups => (
                "Fantasy Football Matchups",
                true,
                RenderCapability::ExternalFeed(FeedKind::FantasyLeague),
                FANTASY_FIELDS,
            ),
            WidgetType::Calendar => ("Calendar", true, RenderCapability::Static, CALENDAR_FIELDS),
            WidgetType::HockeyScoreboard => (
                "NHL Scoreboard",
                false,
                RenderCapability::ExternalFeed(FeedKind::NhlScores),
                NO_FIELDS,
            ),
            WidgetType::StattrakTracker => (
                "StatTrak Tracker",
                true,
                RenderCapability::LiveRecord(LiveResource::Stattrak),
                STATTRAK_FIELDS,
            ),
            WidgetType::PictureScroller => {
                ("Picture Scroller", true, RenderCapability::PhotoStorage, NO_FIELDS)
            }
        };

        WidgetDefinition {
            widget_type: *self,
            title,
            requires_configuration,
            capability,
            fields,
        }
    }
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WidgetType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownType(s.to_string()))
    }
}

/// Registry lookup by declared type string.
pub fn lookup(type_name: &str) -> Result<WidgetDefinition, ValidationError> {
    Ok(type_name.parse::<WidgetType>()?.definition())
}

/// Validate a draft configuration against the schema of `type_name`.
pub fn validate(type_name: &str, draft: &Value) -> Result<Value, ValidationError> {
    lookup(type_name)?.validate(draft)
}

impl WidgetDefinition {
    /// Configuration a freshly created widget starts from.
    pub fn default_configuration(&self) -> Value {
        match self.widget_type {
            WidgetType::DiscordLive => json!({
                "discord_server_id": "your_discord_server_id_here",
            }),
            WidgetType::FantasyFootballMatchups => json!({
                "sleeper_user_id": "your_sleeper_user_id_here",
                "sleeper_league_ids": ["your_sleeper_league_id_here"],
            }),
            WidgetType::Calendar => json!({
                "events": [
                    { "name": "New Year's Day", "month": 0, "day": 1, "type": "holiday" },
                    { "name": "Halloween", "month": 9, "day": 31, "type": "holiday" },
                    { "name": "Christmas", "month": 11, "day": 25, "type": "holiday" },
                ],
            }),
            WidgetType::StattrakTracker => json!({
                "steam_user_id": "your_steam_user_id_here",
                "csgo_item_id": "your_csgo_item_id_here",
            }),
            WidgetType::HockeyScoreboard | WidgetType::PictureScroller => json!({}),
        }
    }

    /// Normalize each schema field of `draft` and enforce required fields.
    ///
    /// Keys outside the schema are carried through untouched. A `null` draft is
    /// treated as an empty object.
    pub fn validate(&self, draft: &Value) -> Result<Value, ValidationError> {
        let mut config = match draft {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            _ => return Err(ValidationError::NotAnObject),
        };

        for field in self.fields {
            let raw = config.remove(field.key).unwrap_or(Value::Null);
            let normalized = normalize_field(field, raw)?;

            if field.required && is_blank(&normalized) {
                return Err(ValidationError::Required { label: field.label });
            }

            config.insert(field.key.to_string(), normalized);
        }

        Ok(Value::Object(config))
    }
}

fn normalize_field(field: &FieldDef, raw: Value) -> Result<Value, ValidationError> {
    match field.kind {
        FieldKind::Text => Ok(raw),
        FieldKind::StringList => Ok(match raw {
            Value::Array(items) => Value::Array(items),
            Value::String(s) => Value::Array(
                s.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            ),
            _ => Value::Array(Vec::new()),
        }),
        FieldKind::StructuredEventList => match raw {
            Value::Null => Ok(Value::Array(Vec::new())),
            Value::String(text) => {
                let text = if text.trim().is_empty() { "[]" } else { text.as_str() };
                serde_json::from_str(text).map_err(|e| ValidationError::InvalidStructuredData {
                    label: field.label,
                    reason: e.to_string(),
                })
            }
            structured @ (Value::Array(_) | Value::Object(_)) => Ok(structured),
            other => Err(ValidationError::InvalidStructuredData {
                label: field.label,
                reason: format!("unexpected value {}", other),
            }),
        },
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
