//! PostgREST-style table reads and writes.
//!
//! Queries are built up as `(key, value)` pairs and rendered to the
//! `column=eq.value` filter syntax the REST layer expects. Reads default to
//! the anon key as the bearer; callers holding a session pass its access
//! token so row-level security applies to the signed-in user.

use crate::error::error_message;
use crate::{StoreClient, StoreError};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Single-row responses use the PostgREST object media type; the store
/// answers 406 when the filter does not match exactly one row.
const SINGLE_OBJECT_ACCEPT: &str = "application/vnd.pgrst.object+json";

/// Sort direction for `order` clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Ascending,
    Descending,
}

/// A pending query against one table.
#[derive(Debug)]
pub struct TableQuery<'a> {
    client: &'a StoreClient,
    table: String,
    columns: String,
    filters: Vec<(String, String)>,
    order: Option<(String, Direction)>,
    limit: Option<u32>,
    bearer: Option<String>,
}

impl<'a> TableQuery<'a> {
    pub(crate) fn new(client: &'a StoreClient, table: String) -> Self {
        Self {
            client,
            table,
            columns: "*".to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
            bearer: None,
        }
    }

    /// Restricts the selected columns (defaults to `*`).
    pub fn select(mut self, columns: impl Into<String>) -> Self {
        self.columns = columns.into();
        self
    }

    /// Adds an equality filter (`column=eq.value`).
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    pub fn order_ascending(mut self, column: impl Into<String>) -> Self {
        self.order = Some((column.into(), Direction::Ascending));
        self
    }

    pub fn order_descending(mut self, column: impl Into<String>) -> Self {
        self.order = Some((column.into(), Direction::Descending));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sends the signed-in user's access token instead of the anon key.
    pub fn bearer(mut self, access_token: impl Into<String>) -> Self {
        self.bearer = Some(access_token.into());
        self
    }

    /// Fetches all matching rows.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>, StoreError> {
        let (table, text) = self.get(false).await?;
        serde_json::from_str(&text)
            .map_err(|e| StoreError::Shape(format!("rows from `{table}` did not parse: {e}")))
    }

    /// Fetches exactly one row; errors with [`StoreError::RowNotFound`] when
    /// the filter matches no row.
    pub async fn single<T: DeserializeOwned>(self) -> Result<T, StoreError> {
        let (table, text) = self.get(true).await?;
        serde_json::from_str(&text)
            .map_err(|e| StoreError::Shape(format!("row from `{table}` did not parse: {e}")))
    }

    async fn get(self, single: bool) -> Result<(String, String), StoreError> {
        let mut query: Vec<(String, String)> = vec![("select".into(), self.columns.clone())];
        for (column, value) in &self.filters {
            query.push((column.clone(), format!("eq.{value}")));
        }
        if let Some((column, direction)) = &self.order {
            let suffix = match direction {
                Direction::Ascending => "asc",
                Direction::Descending => "desc",
            };
            query.push(("order".into(), format!("{column}.{suffix}")));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".into(), limit.to_string()));
        }

        let bearer = self
            .bearer
            .as_deref()
            .unwrap_or_else(|| self.client.anon_key());

        let mut request = self
            .client
            .http()
            .get(self.client.rest_url(&self.table))
            .header("apikey", self.client.anon_key())
            .bearer_auth(bearer)
            .query(&query);
        if single {
            request = request.header(reqwest::header::ACCEPT, SINGLE_OBJECT_ACCEPT);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if single && status == StatusCode::NOT_ACCEPTABLE {
            return Err(StoreError::RowNotFound { table: self.table });
        }
        if !status.is_success() {
            return Err(StoreError::Request {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        Ok((self.table, text))
    }
}

impl StoreClient {
    /// Inserts one row (`POST /rest/v1/{table}`, `Prefer: return=minimal`).
    pub async fn insert<T: Serialize>(
        &self,
        table: &str,
        row: &T,
        access_token: Option<&str>,
    ) -> Result<(), StoreError> {
        let bearer = access_token.unwrap_or_else(|| self.anon_key());
        let response = self
            .http()
            .post(self.rest_url(table))
            .header("apikey", self.anon_key())
            .bearer_auth(bearer)
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await?;
            return Err(StoreError::Request {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }
        Ok(())
    }
}
