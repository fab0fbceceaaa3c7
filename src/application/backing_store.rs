// Backing store trait for row-oriented data access
use crate::domain::error::StoreError;
use async_trait::async_trait;
use serde_json::Value;

/// Conjunction of column equality conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((column.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    /// Whether `row` satisfies every condition.
    pub fn matches(&self, row: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(column, expected)| row.get(column) == Some(expected))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: true,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            ascending: false,
        }
    }
}

/// Generic query/mutation interface over the remote store. Rows are JSON
/// objects; callers own the mapping into domain types.
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// First row matching `filter`, if any.
    async fn query_one(&self, table: &str, filter: &Filter) -> Result<Option<Value>, StoreError>;

    /// All rows matching `filter`, optionally ordered.
    async fn query_many(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<Order>,
    ) -> Result<Vec<Value>, StoreError>;

    /// Insert a row and return it as stored (including its generated `id`).
    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError>;

    /// Merge `patch` into every matching row; returns the updated rows.
    async fn update(
        &self,
        table: &str,
        filter: &Filter,
        patch: Value,
    ) -> Result<Vec<Value>, StoreError>;

    /// Delete matching rows; returns how many were removed.
    async fn delete(&self, table: &str, filter: &Filter) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_matches_all_conditions() {
        let filter = Filter::new().eq("user_id", "u1").eq("id", 3);
        assert!(filter.matches(&json!({ "id": 3, "user_id": "u1", "other": true })));
        assert!(!filter.matches(&json!({ "id": 3, "user_id": "u2" })));
        assert!(!filter.matches(&json!({ "user_id": "u1" })));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(Filter::new().matches(&json!({})));
    }
}
