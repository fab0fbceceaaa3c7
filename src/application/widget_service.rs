// Widget service - Owner-scoped widget CRUD with catalog validation
use crate::application::backing_store::{BackingStore, Filter, Order};
use crate::application::display_service::WIDGET_TABLE;
use crate::domain::error::{DashboardError, StoreError, ValidationError};
use crate::domain::widget::{WidgetDraft, WidgetId, WidgetRecord};
use crate::domain::widget_type;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct WidgetService {
    store: Arc<dyn BackingStore>,
}

impl WidgetService {
    pub fn new(store: Arc<dyn BackingStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<WidgetRecord>, DashboardError> {
        let rows = self
            .store
            .query_many(WIDGET_TABLE, &owner(user_id), Some(Order::asc("id")))
            .await
            .map_err(DashboardError::RecordRead)?;
        Ok(rows.iter().filter_map(WidgetRecord::from_row).collect())
    }

    pub async fn get(&self, user_id: &str, id: WidgetId) -> Result<WidgetRecord, DashboardError> {
        let row = self
            .store
            .query_one(WIDGET_TABLE, &owner(user_id).eq("id", id))
            .await
            .map_err(DashboardError::RecordRead)?
            .ok_or(DashboardError::WidgetNotFound(id))?;
        decode(&row)
    }

    pub async fn create(
        &self,
        user_id: &str,
        draft: &WidgetDraft,
    ) -> Result<WidgetRecord, DashboardError> {
        let mut row = prepare(draft)?;
        row["user_id"] = Value::from(user_id);

        let stored = self
            .store
            .insert(WIDGET_TABLE, row)
            .await
            .map_err(DashboardError::Persist)?;
        let record = decode(&stored)?;

        tracing::info!(
            "Created {} widget {} ({}) for {}",
            record.widget_type,
            record.id,
            record.display_title(),
            user_id
        );
        Ok(record)
    }

    pub async fn update(
        &self,
        user_id: &str,
        id: WidgetId,
        draft: &WidgetDraft,
    ) -> Result<WidgetRecord, DashboardError> {
        let patch = prepare(draft)?;

        let updated = self
            .store
            .update(WIDGET_TABLE, &owner(user_id).eq("id", id), patch)
            .await
            .map_err(DashboardError::Persist)?;
        let row = updated.first().ok_or(DashboardError::WidgetNotFound(id))?;

        tracing::info!("Updated widget {} for {}", id, user_id);
        decode(row)
    }

    pub async fn delete(&self, user_id: &str, id: WidgetId) -> Result<(), DashboardError> {
        let removed = self
            .store
            .delete(WIDGET_TABLE, &owner(user_id).eq("id", id))
            .await
            .map_err(DashboardError::Persist)?;
        if removed == 0 {
            return Err(DashboardError::WidgetNotFound(id));
        }

        tracing::info!("Deleted widget {} for {}", id, user_id);
        Ok(())
    }
}

fn owner(user_id: &str) -> Filter {
    Filter::new().eq("user_id", user_id)
}

/// Validate a draft into the column values written to the store. Nothing is
/// written when this fails.
fn prepare(draft: &WidgetDraft) -> Result<Value, DashboardError> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err(ValidationError::MissingTitle.into());
    }

    let definition = widget_type::lookup(draft.widget_type.trim())?;
    let configuration = definition.validate(&draft.configuration)?;

    Ok(json!({
        "widget_title": title,
        "widget_type": definition.widget_type.as_str(),
        "widget_configuration": configuration,
        "requires_config": definition.requires_configuration,
    }))
}

fn decode(row: &Value) -> Result<WidgetRecord, DashboardError> {
    WidgetRecord::from_row(row).ok_or_else(|| {
        DashboardError::RecordRead(StoreError::Decode("malformed widget row".to_string()))
    })
}
