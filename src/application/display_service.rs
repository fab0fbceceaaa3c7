// Display service - Use cases for loading, resolving and saving a user's display
use crate::application::backing_store::{BackingStore, Filter, Order};
use crate::domain::display::{
    add_panel, move_panel, remove_panel, DisplayConfiguration, DisplayDraft, LayoutType,
    SENTINEL_EMPTY,
};
use crate::domain::error::{DashboardError, StoreError};
use crate::domain::resolution::{default_widgets, resolve, Resolution};
use crate::domain::widget::{WidgetId, WidgetRecord};
use crate::domain::widget_type::RenderCapability;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

pub const DISPLAY_TABLE: &str = "user_display";
pub const WIDGET_TABLE: &str = "user_widget";

/// Raw inputs to resolution for one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedDisplay {
    /// Newest display row, `None` if the user never saved one.
    pub configuration: Option<DisplayConfiguration>,
    /// Widget records in id order.
    pub records: Vec<WidgetRecord>,
}

impl LoadedDisplay {
    pub fn layout(&self) -> LayoutType {
        self.configuration
            .as_ref()
            .map(|c| c.layout)
            .unwrap_or_default()
    }

    pub fn resolve(&self) -> Resolution {
        resolve(
            self.configuration.as_ref().map(|c| c.widget_ids.as_slice()),
            &self.records,
            self.layout().capacity(),
        )
    }
}

/// Single edit made in the display editor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PanelEdit {
    Add { widget_id: WidgetId },
    Remove { index: usize },
    Move { index: usize, direction: isize },
    Layout { layout: LayoutType },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    Widgets,
    Empty,
    Unconfigured,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    pub widget: WidgetRecord,
    /// `None` for types missing from the catalog; rendered as the generic panel.
    pub capability: Option<RenderCapability>,
}

impl Panel {
    fn new(widget: WidgetRecord) -> Self {
        let capability = widget.kind().map(|k| k.definition().capability);
        Self { widget, capability }
    }
}

/// Render plan handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub user_id: String,
    pub layout: LayoutType,
    pub capacity: usize,
    pub zip_code: Option<String>,
    pub resolution: ResolutionKind,
    pub panels: Vec<Panel>,
    /// Render the single fallback panel instead of `panels`.
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
}

#[derive(Clone)]
pub struct DisplayService {
    store: Arc<dyn BackingStore>,
}

impl DisplayService {
    pub fn new(store: Arc<dyn BackingStore>) -> Self {
        Self { store }
    }

    /// Read the newest display row and the user's widgets concurrently.
    pub async fn load(&self, user_id: &str) -> Result<LoadedDisplay, DashboardError> {
        let owner = Filter::new().eq("user_id", user_id);

        let (display_rows, widget_rows) = tokio::try_join!(
            self.store
                .query_many(DISPLAY_TABLE, &owner, Some(Order::desc("id"))),
            self.store
                .query_many(WIDGET_TABLE, &owner, Some(Order::asc("id"))),
        )
        .map_err(DashboardError::ConfigurationRead)?;

        let configuration = display_rows.first().map(DisplayConfiguration::from_row);
        let records = widget_rows.iter().filter_map(WidgetRecord::from_row).collect();

        Ok(LoadedDisplay {
            configuration,
            records,
        })
    }

    /// Resolve the user's display into a render plan.
    ///
    /// A failed read is reported through `banner` and resolved as
    /// `Unconfigured`; it never fails the request.
    pub async fn dashboard(&self, user_id: &str) -> DashboardView {
        let (loaded, banner) = match self.load(user_id).await {
            Ok(loaded) => (loaded, None),
            Err(e) => {
                tracing::error!("Display load for {} failed: {}", user_id, e);
                (LoadedDisplay::default(), Some(e.to_string()))
            }
        };

        let layout = loaded.layout();
        let capacity = layout.capacity();
        let (resolution, widgets) = match loaded.resolve() {
            Resolution::Widgets(records) => (ResolutionKind::Widgets, records),
            Resolution::Empty => (ResolutionKind::Empty, Vec::new()),
            Resolution::Unconfigured => (
                ResolutionKind::Unconfigured,
                default_widgets(&loaded.records, capacity),
            ),
        };

        tracing::debug!(
            "Resolved display for {}: {:?} with {} panels",
            user_id,
            resolution,
            widgets.len()
        );

        DashboardView {
            user_id: user_id.to_string(),
            layout,
            capacity,
            zip_code: loaded.configuration.and_then(|c| c.zip_code),
            resolution,
            panels: widgets.into_iter().map(Panel::new).collect(),
            fallback: resolution == ResolutionKind::Empty,
            banner,
        }
    }

    /// Persist a display configuration, keeping one row per user.
    ///
    /// Updates the row the editor loaded when it still exists; otherwise
    /// re-reads the user's rows and updates the newest, inserting only when
    /// none exist. Returns the id of the row written.
    pub async fn save(&self, user_id: &str, draft: &DisplayDraft) -> Result<i64, DashboardError> {
        let row = draft.to_row(user_id);

        if let Some(row_id) = draft.row_id {
            let filter = Filter::new().eq("id", row_id).eq("user_id", user_id);
            let updated = self
                .store
                .update(DISPLAY_TABLE, &filter, row.clone())
                .await
                .map_err(DashboardError::Persist)?;
            if !updated.is_empty() {
                tracing::info!("Updated display row {} for {}", row_id, user_id);
                return Ok(row_id);
            }
            tracing::debug!("Display row {} gone for {}; re-checking owner rows", row_id, user_id);
        }

        let existing = self
            .store
            .query_many(
                DISPLAY_TABLE,
                &Filter::new().eq("user_id", user_id),
                Some(Order::desc("id")),
            )
            .await
            .map_err(DashboardError::Persist)?;

        if existing.len() > 1 {
            tracing::warn!(
                "User {} has {} display rows; updating the newest",
                user_id,
                existing.len()
            );
        }

        if let Some(newest) = existing.first().and_then(|r| r.get("id")).and_then(Value::as_i64) {
            self.store
                .update(DISPLAY_TABLE, &Filter::new().eq("id", newest), row)
                .await
                .map_err(DashboardError::Persist)?;
            tracing::info!("Updated display row {} for {}", newest, user_id);
            return Ok(newest);
        }

        let inserted = self
            .store
            .insert(DISPLAY_TABLE, row)
            .await
            .map_err(DashboardError::Persist)?;
        let id = inserted.get("id").and_then(Value::as_i64).ok_or_else(|| {
            DashboardError::Persist(StoreError::Decode("inserted display row has no id".to_string()))
        })?;

        tracing::info!("Created display row {} for {}", id, user_id);
        Ok(id)
    }

    /// Apply one editor action to the currently shown panels and save.
    ///
    /// Removing the last panel saves an explicit empty display.
    pub async fn edit_panels(
        &self,
        user_id: &str,
        edit: PanelEdit,
    ) -> Result<DashboardView, DashboardError> {
        let loaded = self.load(user_id).await?;
        let layout = match &edit {
            PanelEdit::Layout { layout } => *layout,
            _ => loaded.layout(),
        };

        // A smaller layout drops trailing panels.
        let mut ids: Vec<WidgetId> = match loaded.resolve().truncate(layout.capacity()) {
            Resolution::Empty => vec![SENTINEL_EMPTY],
            Resolution::Unconfigured => default_widgets(&loaded.records, layout.capacity())
                .iter()
                .map(|r| r.id)
                .collect(),
            resolved => resolved.widget_ids(),
        };

        match edit {
            PanelEdit::Add { widget_id } => {
                if !loaded.records.iter().any(|r| r.id == widget_id) {
                    return Err(DashboardError::WidgetNotFound(widget_id));
                }
                if !add_panel(&mut ids, widget_id, layout.capacity()) {
                    tracing::debug!("Widget {} not added for {}: duplicate or layout full", widget_id, user_id);
                }
            }
            PanelEdit::Remove { index } => remove_panel(&mut ids, index),
            PanelEdit::Move { index, direction } => move_panel(&mut ids, index, direction),
            PanelEdit::Layout { .. } => {}
        }

        let draft = DisplayDraft {
            row_id: loaded.configuration.as_ref().and_then(|c| c.row_id),
            widget_ids: ids,
            layout,
            zip_code: loaded.configuration.and_then(|c| c.zip_code),
        };
        self.save(user_id, &draft).await?;

        Ok(self.dashboard(user_id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::live::LiveResource;
    use crate::infrastructure::memory_store::MemoryStore;
    use serde_json::json;

    async fn setup() -> (Arc<MemoryStore>, DisplayService) {
        let store = Arc::new(MemoryStore::new());
        let service = DisplayService::new(store.clone());
        (store, service)
    }

    async fn seed_widgets(store: &MemoryStore, user_id: &str, ids: &[i64]) {
        for id in ids {
            store
                .insert(
                    WIDGET_TABLE,
                    json!({
                        "id": id,
                        "user_id": user_id,
                        "widget_title": format!("Widget {}", id),
                        "widget_type": "calendar",
                        "widget_configuration": { "events": [] },
                        "requires_config": true,
                    }),
                )
                .await
                .unwrap();
        }
    }

    fn draft(ids: &[i64]) -> DisplayDraft {
        DisplayDraft {
            widget_ids: ids.to_vec(),
            ..Default::default()
        }
    }

    fn panel_ids(view: &DashboardView) -> Vec<i64> {
        view.panels.iter().map(|p| p.widget.id).collect()
    }

    #[tokio::test]
    async fn test_unconfigured_uses_first_widgets_by_id() {
        let (store, service) = setup().await;
        seed_widgets(&store, "u1", &[8, 2, 5, 1, 9, 3, 7]).await;

        let view = service.dashboard("u1").await;

        assert_eq!(view.resolution, ResolutionKind::Unconfigured);
        assert_eq!(panel_ids(&view), vec![1, 2, 3, 5, 7, 8]);
        assert!(!view.fallback);
        assert!(view.banner.is_none());
    }

    #[tokio::test]
    async fn test_saved_order_is_rendered() {
        let (store, service) = setup().await;
        seed_widgets(&store, "u1", &[1, 2, 3, 4, 5, 6]).await;

        service.save("u1", &draft(&[3, 1, 4, 1, 5, 9, 2, 6])).await.unwrap();
        let view = service.dashboard("u1").await;

        assert_eq!(view.resolution, ResolutionKind::Widgets);
        assert_eq!(panel_ids(&view), vec![3, 1, 4, 5, 2, 6]);
    }

    #[tokio::test]
    async fn test_save_pads_with_sentinel_strings() {
        let (store, service) = setup().await;

        let id = service
            .save(
                "u1",
                &DisplayDraft {
                    widget_ids: vec![4, 4, 2],
                    layout: LayoutType::FourTileGrid,
                    zip_code: Some(" 02139 ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let row = store
            .query_one(DISPLAY_TABLE, &Filter::new().eq("id", id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row["widget_ids"], json!(["4", "2", "-1", "-1"]));
        assert_eq!(
            row["layout_setting"],
            json!({ "widget_settings": { "layout": { "type": "four_tile_grid" } } })
        );
        assert_eq!(row["zip_code"], "02139");
    }

    #[tokio::test]
    async fn test_explicit_empty_renders_fallback() {
        let (store, service) = setup().await;
        seed_widgets(&store, "u1", &[1, 2]).await;

        service.save("u1", &draft(&[SENTINEL_EMPTY])).await.unwrap();
        let view = service.dashboard("u1").await;

        assert_eq!(view.resolution, ResolutionKind::Empty);
        assert!(view.fallback);
        assert!(view.panels.is_empty());
    }

    #[tokio::test]
    async fn test_all_dangling_ids_render_fallback() {
        let (store, service) = setup().await;
        seed_widgets(&store, "u1", &[1]).await;

        service.save("u1", &draft(&[9])).await.unwrap();
        let view = service.dashboard("u1").await;

        assert_eq!(view.resolution, ResolutionKind::Empty);
        assert!(view.fallback);
    }

    #[tokio::test]
    async fn test_saving_twice_keeps_one_row() {
        let (store, service) = setup().await;

        let first = service.save("u1", &draft(&[1, 2])).await.unwrap();
        let second = service.save("u1", &draft(&[1, 2])).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.row_count(DISPLAY_TABLE).await, 1);
    }

    #[tokio::test]
    async fn test_stale_row_id_falls_back_to_owner_rows() {
        let (store, service) = setup().await;
        let existing = service.save("u1", &draft(&[1])).await.unwrap();

        let stale = DisplayDraft {
            row_id: Some(999),
            ..draft(&[2])
        };
        let written = service.save("u1", &stale).await.unwrap();

        assert_eq!(written, existing);
        assert_eq!(store.row_count(DISPLAY_TABLE).await, 1);
    }

    #[tokio::test]
    async fn test_row_id_of_other_user_is_not_updated() {
        let (store, service) = setup().await;
        let theirs = service.save("u2", &draft(&[7])).await.unwrap();

        let sneaky = DisplayDraft {
            row_id: Some(theirs),
            ..draft(&[1])
        };
        let mine = service.save("u1", &sneaky).await.unwrap();

        assert_ne!(mine, theirs);
        assert_eq!(store.row_count(DISPLAY_TABLE).await, 2);
        let loaded = service.load("u2").await.unwrap();
        assert_eq!(loaded.configuration.unwrap().widget_ids, vec![7, SENTINEL_EMPTY]);
    }

    #[tokio::test]
    async fn test_duplicate_rows_update_newest() {
        let (store, service) = setup().await;
        for ids in [json!(["1"]), json!(["2"])] {
            store
                .insert(DISPLAY_TABLE, json!({ "user_id": "u1", "widget_ids": ids }))
                .await
                .unwrap();
        }

        let written = service.save("u1", &draft(&[5])).await.unwrap();

        assert_eq!(written, 2);
        assert_eq!(store.row_count(DISPLAY_TABLE).await, 2);
        let loaded = service.load("u1").await.unwrap();
        assert_eq!(loaded.configuration.unwrap().row_id, Some(2));
    }

    #[tokio::test]
    async fn test_read_failure_yields_banner_and_unconfigured() {
        let (store, service) = setup().await;
        seed_widgets(&store, "u1", &[1]).await;
        store.fail_table(DISPLAY_TABLE).await;

        let view = service.dashboard("u1").await;

        assert_eq!(view.resolution, ResolutionKind::Unconfigured);
        assert!(view.panels.is_empty());
        assert!(view.banner.unwrap().contains("display configuration"));
    }

    #[tokio::test]
    async fn test_save_failure_is_persist_error() {
        let (store, service) = setup().await;
        store.fail_table(DISPLAY_TABLE).await;

        let err = service.save("u1", &draft(&[1])).await.unwrap_err();
        assert!(matches!(err, DashboardError::Persist(_)));
    }

    #[tokio::test]
    async fn test_layout_change_truncates_render_set() {
        let (store, service) = setup().await;
        seed_widgets(&store, "u1", &[1, 2, 3, 4, 5, 6]).await;
        service.save("u1", &draft(&[6, 5, 4, 3, 2, 1])).await.unwrap();

        service
            .save(
                "u1",
                &DisplayDraft {
                    layout: LayoutType::FourTileGrid,
                    ..draft(&[6, 5, 4, 3, 2, 1])
                },
            )
            .await
            .unwrap();
        let view = service.dashboard("u1").await;

        assert_eq!(view.capacity, 4);
        assert_eq!(panel_ids(&view), vec![6, 5, 4, 3]);
    }

    #[tokio::test]
    async fn test_panels_carry_render_capability() {
        let (store, service) = setup().await;
        store
            .insert(
                WIDGET_TABLE,
                json!({
                    "id": 1,
                    "user_id": "u1",
                    "widget_title": "Guild",
                    "widget_type": "discord_live",
                    "widget_configuration": { "discord_server_id": "42" },
                    "requires_config": true,
                }),
            )
            .await
            .unwrap();
        store
            .insert(
                WIDGET_TABLE,
                json!({ "id": 2, "user_id": "u1", "widget_type": "retired_widget" }),
            )
            .await
            .unwrap();

        let view = service.dashboard("u1").await;

        assert_eq!(
            view.panels[0].capability,
            Some(RenderCapability::LiveRecord(LiveResource::Discord))
        );
        assert_eq!(view.panels[1].capability, None);
    }

    #[tokio::test]
    async fn test_edit_add_starts_from_default_set() {
        let (store, service) = setup().await;
        seed_widgets(&store, "u1", &[1, 2, 3, 4, 5, 6, 7]).await;

        let view = service
            .edit_panels("u1", PanelEdit::Remove { index: 0 })
            .await
            .unwrap();
        assert_eq!(panel_ids(&view), vec![2, 3, 4, 5, 6]);

        let view = service
            .edit_panels("u1", PanelEdit::Add { widget_id: 7 })
            .await
            .unwrap();
        assert_eq!(view.resolution, ResolutionKind::Widgets);
        assert_eq!(panel_ids(&view), vec![2, 3, 4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn test_edit_add_unknown_widget_is_not_found() {
        let (store, service) = setup().await;
        seed_widgets(&store, "u1", &[1]).await;

        let err = service
            .edit_panels("u1", PanelEdit::Add { widget_id: 40 })
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::WidgetNotFound(40)));
    }

    #[tokio::test]
    async fn test_edit_removing_last_panel_saves_empty() {
        let (store, service) = setup().await;
        seed_widgets(&store, "u1", &[1]).await;
        service.save("u1", &draft(&[1])).await.unwrap();

        let view = service
            .edit_panels("u1", PanelEdit::Remove { index: 0 })
            .await
            .unwrap();
        assert_eq!(view.resolution, ResolutionKind::Empty);

        let view = service
            .edit_panels("u1", PanelEdit::Add { widget_id: 1 })
            .await
            .unwrap();
        assert_eq!(panel_ids(&view), vec![1]);
    }

    #[tokio::test]
    async fn test_edit_move_and_layout() {
        let (store, service) = setup().await;
        seed_widgets(&store, "u1", &[1, 2, 3, 4, 5]).await;
        service.save("u1", &draft(&[1, 2, 3, 4, 5])).await.unwrap();

        let view = service
            .edit_panels("u1", PanelEdit::Move { index: 4, direction: -1 })
            .await
            .unwrap();
        assert_eq!(panel_ids(&view), vec![1, 2, 3, 5, 4]);

        let view = service
            .edit_panels(
                "u1",
                PanelEdit::Layout {
                    layout: LayoutType::FourTileGrid,
                },
            )
            .await
            .unwrap();
        assert_eq!(view.layout, LayoutType::FourTileGrid);
        assert_eq!(panel_ids(&view), vec![1, 2, 3, 5]);
        assert_eq!(store.row_count(DISPLAY_TABLE).await, 1);
    }
}
