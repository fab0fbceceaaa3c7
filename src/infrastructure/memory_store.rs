// In-memory backing store, used for local runs and tests
use crate::application::backing_store::{BackingStore, Filter, Order};
use crate::domain::error::StoreError;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Value>>>,
    next_id: AtomicI64,
    failing_tables: RwLock<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    /// Make every call against `table` fail until further notice.
    #[cfg(test)]
    pub async fn fail_table(&self, table: &str) {
        self.failing_tables.write().await.insert(table.to_string());
    }

    /// Number of rows currently stored in `table`.
    #[cfg(test)]
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, Vec::len)
    }

    async fn check(&self, table: &str) -> Result<(), StoreError> {
        if self.failing_tables.read().await.contains(table) {
            return Err(StoreError::Request(format!("table {} is unreachable", table)));
        }
        Ok(())
    }
}

#[async_trait]
impl BackingStore for MemoryStore {
    async fn query_one(&self, table: &str, filter: &Filter) -> Result<Option<Value>, StoreError> {
        self.check(table).await?;
        let tables = self.tables.read().await;
        Ok(tables
            .get(table)
            .and_then(|rows| rows.iter().find(|row| filter.matches(row)).cloned()))
    }

    async fn query_many(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<Order>,
    ) -> Result<Vec<Value>, StoreError> {
        self.check(table).await?;
        let tables = self.tables.read().await;
        let mut rows: Vec<Value> = tables
            .get(table)
            .map(|rows| rows.iter().filter(|row| filter.matches(row)).cloned().collect())
            .unwrap_or_default();

        if let Some(order) = order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending { ordering } else { ordering.reverse() }
            });
        }

        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        self.check(table).await?;
        let Value::Object(mut fields) = row else {
            return Err(StoreError::Decode("row must be a JSON object".to_string()));
        };

        match fields.get("id").and_then(Value::as_i64) {
            // Generated ids must stay clear of explicit ones.
            Some(explicit) => {
                self.next_id
                    .fetch_max(explicit.saturating_add(1), AtomicOrdering::SeqCst);
            }
            None if !fields.contains_key("id") => {
                let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
                fields.insert("id".to_string(), Value::from(id));
            }
            None => {}
        }

        let stored = Value::Object(fields);
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn update(
        &self,
        table: &str,
        filter: &Filter,
        patch: Value,
    ) -> Result<Vec<Value>, StoreError> {
        self.check(table).await?;
        let Value::Object(patch) = patch else {
            return Err(StoreError::Decode("patch must be a JSON object".to_string()));
        };

        let mut tables = self.tables.write().await;
        let mut updated = Vec::new();
        for row in tables.get_mut(table).into_iter().flatten() {
            if !filter.matches(row) {
                continue;
            }
            if let Value::Object(fields) = row {
                for (column, value) in &patch {
                    fields.insert(column.clone(), value.clone());
                }
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<usize, StoreError> {
        self.check(table).await?;
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| !filter.matches(row));
        Ok(before - rows.len())
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = store.insert("t", json!({ "name": "a" })).await.unwrap();
        let b = store.insert("t", json!({ "name": "b" })).await.unwrap();
        assert_eq!(a["id"], 1);
        assert_eq!(b["id"], 2);
    }

    #[tokio::test]
    async fn test_insert_keeps_explicit_id() {
        let store = MemoryStore::new();
        let row = store.insert("t", json!({ "id": 40 })).await.unwrap();
        assert_eq!(row["id"], 40);
    }

    #[tokio::test]
    async fn test_generated_ids_skip_past_explicit_ones() {
        let store = MemoryStore::new();
        store.insert("t", json!({ "id": 2 })).await.unwrap();
        store.insert("other", json!({ "id": 7 })).await.unwrap();
        store.insert("t", json!({ "id": 3 })).await.unwrap();

        let generated = store.insert("t", json!({ "name": "next" })).await.unwrap();
        assert_eq!(generated["id"], 8);
    }

    #[tokio::test]
    async fn test_query_many_orders_descending() {
        let store = MemoryStore::new();
        for owner in ["u", "u", "v", "u"] {
            store.insert("t", json!({ "owner": owner })).await.unwrap();
        }

        let rows = store
            .query_many("t", &Filter::new().eq("owner", "u"), Some(Order::desc("id")))
            .await
            .unwrap();
        let ids: Vec<i64> = rows.iter().filter_map(|r| r["id"].as_i64()).collect();
        assert_eq!(ids, vec![4, 2, 1]);
    }

    #[tokio::test]
    async fn test_update_merges_patch() {
        let store = MemoryStore::new();
        store.insert("t", json!({ "a": 1, "b": 1 })).await.unwrap();

        let updated = store
            .update("t", &Filter::new().eq("id", 1), json!({ "b": 2 }))
            .await
            .unwrap();
        assert_eq!(updated, vec![json!({ "id": 1, "a": 1, "b": 2 })]);
    }

    #[tokio::test]
    async fn test_delete_counts_rows() {
        let store = MemoryStore::new();
        store.insert("t", json!({ "k": 1 })).await.unwrap();
        store.insert("t", json!({ "k": 1 })).await.unwrap();
        store.insert("t", json!({ "k": 2 })).await.unwrap();

        assert_eq!(store.delete("t", &Filter::new().eq("k", 1)).await.unwrap(), 2);
        assert_eq!(store.row_count("t").await, 1);
        assert_eq!(store.delete("missing", &Filter::new()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failing_table_returns_error() {
        let store = MemoryStore::new();
        store.fail_table("t").await;
        assert!(store.query_one("t", &Filter::new()).await.is_err());
        assert!(store.query_one("other", &Filter::new()).await.is_ok());
    }
}
