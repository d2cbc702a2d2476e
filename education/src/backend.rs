use async_trait::async_trait;
use serde_json::Value;
use shared::Result;

/// Row filter and ordering for a table read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query {
    pub filters: Vec<(String, String)>, // column -> value, equality only
    pub order: Option<String>,          // ascending by this column
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.filters.push((column.into(), value.to_string()));
        self
    }

    pub fn order(mut self, column: impl Into<String>) -> Self {
        self.order = Some(column.into());
        self
    }
}

/// Port for the hosted database the data-access layer reads through.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Rows of `table` matching `query`, as raw JSON objects.
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>>;

    /// Apply `patch` to the row with `id` and return the updated rows.
    async fn update(&self, table: &str, id: i64, patch: Value) -> Result<Vec<Value>>;
}
