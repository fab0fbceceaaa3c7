// REST backing store over a PostgREST-style HTTP API
use crate::application::backing_store::{BackingStore, Filter, Order};
use crate::domain::error::StoreError;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct RestStore {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl RestStore {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, table: &str, query: &str) -> String {
        format!("{}/rest/v1/{}?{}", self.base_url, table, query)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", self.api_key.as_str())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json")
    }

    async fn rows(&self, builder: RequestBuilder) -> Result<Vec<Value>, StoreError> {
        let response = builder
            .send()
            .await
            .map_err(|e| StoreError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }
}

/// `select=*` plus `col=eq.value` per condition, ordering and limit.
fn query_string(filter: &Filter, order: Option<&Order>, limit: Option<usize>) -> String {
    let mut parts = vec!["select=*".to_string()];

    for (column, value) in filter.conditions() {
        let value = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        parts.push(format!(
            "{}=eq.{}",
            urlencoding::encode(column),
            urlencoding::encode(&value)
        ));
    }

    if let Some(order) = order {
        let direction = if order.ascending { "asc" } else { "desc" };
        parts.push(format!("order={}.{}", urlencoding::encode(&order.column), direction));
    }
    if let Some(limit) = limit {
        parts.push(format!("limit={}", limit));
    }

    parts.join("&")
}

#[async_trait]
impl BackingStore for RestStore {
    async fn query_one(&self, table: &str, filter: &Filter) -> Result<Option<Value>, StoreError> {
        let url = self.url(table, &query_string(filter, None, Some(1)));
        let rows = self.rows(self.request(Method::GET, &url)).await?;
        Ok(rows.into_iter().next())
    }

    async fn query_many(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<Order>,
    ) -> Result<Vec<Value>, StoreError> {
        let url = self.url(table, &query_string(filter, order.as_ref(), None));
        self.rows(self.request(Method::GET, &url)).await
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let url = self.url(table, "select=*");
        let builder = self
            .request(Method::POST, &url)
            .header("Prefer", "return=representation")
            .json(&row);

        self.rows(builder)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Decode(format!("insert into {} returned no row", table)))
    }

    async fn update(
        &self,
        table: &str,
        filter: &Filter,
        patch: Value,
    ) -> Result<Vec<Value>, StoreError> {
        let url = self.url(table, &query_string(filter, None, None));
        let builder = self
            .request(Method::PATCH, &url)
            .header("Prefer", "return=representation")
            .json(&patch);
        self.rows(builder).await
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<usize, StoreError> {
        let url = self.url(table, &query_string(filter, None, None));
        let builder = self
            .request(Method::DELETE, &url)
            .header("Prefer", "return=representation");
        Ok(self.rows(builder).await?.len())
    }
}
