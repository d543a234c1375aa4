// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod stream;

pub use stream::{
    DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY, DEFAULT_MAX_RETRIES, JobStream, ReconnectPolicy,
    ReconnectState, Reconnector, run_job_listener,
};

use anyhow::{Context, Result, anyhow, bail};
use reqwest::StatusCode;
use reqwest::blocking::{Client as HttpClient, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlpane_app::{
    ColumnDescriptor, ConnectionId, Filter, JobId, Pagination, Row, SessionBus, SessionEvent,
    Sort, TableRef,
};
use std::fmt;
use std::io::{BufRead, BufReader};
use std::time::Duration;
use url::Url;

/// A non-2xx response, with the server's message pulled out of its JSON
/// envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "server returned {}", self.status)
        } else {
            write!(f, "server error ({}): {}", self.status, self.message)
        }
    }
}

impl std::error::Error for ApiError {}

pub fn is_unauthorized(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<ApiError>()
        .is_some_and(|error| error.status == StatusCode::UNAUTHORIZED.as_u16())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub name: String,
    #[serde(default)]
    pub row_estimate: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPage {
    pub rows: Vec<Row>,
    #[serde(default)]
    pub total_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    timeout: Duration,
    token: Option<String>,
    http: HttpClient,
    stream_http: HttpClient,
    session: Option<SessionBus>,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            bail!("api.base_url must not be empty");
        }
        let base_url = Url::parse(trimmed)
            .with_context(|| format!("api.base_url {trimmed:?} is not a valid URL"))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            bail!("api.base_url {trimmed:?} must be an http or https URL");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        // The event stream stays open indefinitely, so only connecting is bounded.
        let stream_http = HttpClient::builder()
            .connect_timeout(timeout)
            .timeout(None::<Duration>)
            .build()
            .context("build streaming HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            token: None,
            http,
            stream_http,
            session: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|token| !token.trim().is_empty());
        self
    }

    /// 401 responses are published here as `SessionEvent::Unauthorized`.
    pub fn with_session_bus(mut self, bus: SessionBus) -> Self {
        self.session = Some(bus);
        self
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn list_tables(&self, connection: ConnectionId, schema: &str) -> Result<Vec<TableSummary>> {
        let connection = connection.to_string();
        let url = self.endpoint(&["connections", &connection, "schemas", schema, "tables"])?;
        let response = self.send(self.http.get(url))?;
        response.json().context("decode table list")
    }

    pub fn table_columns(&self, table: &TableRef) -> Result<Vec<ColumnDescriptor>> {
        let url = self.table_endpoint(table, &["columns"])?;
        let response = self.send(self.http.get(url))?;
        let parsed: ColumnsResponse = response
            .json()
            .with_context(|| format!("decode columns of {table}"))?;
        Ok(parsed.columns)
    }

    pub fn fetch_rows(
        &self,
        table: &TableRef,
        filters: &[Filter],
        sort: Option<&Sort>,
        pagination: Pagination,
    ) -> Result<RowPage> {
        let url = self.table_endpoint(table, &["rows", "query"])?;
        let active = filters
            .iter()
            .filter(|filter| filter.is_active())
            .collect::<Vec<_>>();
        let body = RowsQuery {
            filters: active,
            sort,
            page: pagination.page,
            page_size: pagination.page_size,
        };
        tracing::debug!(
            %table,
            page = pagination.page,
            page_size = pagination.page_size,
            "fetching rows"
        );
        let response = self.send(self.http.post(url).json(&body))?;
        response
            .json()
            .with_context(|| format!("decode rows of {table}"))
    }

    pub fn insert_row(&self, table: &TableRef, values: &Row) -> Result<()> {
        let url = self.table_endpoint(table, &["rows"])?;
        self.send(self.http.post(url).json(&InsertBody { values }))?;
        Ok(())
    }

    pub fn update_row(
        &self,
        table: &TableRef,
        primary_key: &Row,
        column: &str,
        value: &Value,
    ) -> Result<()> {
        let url = self.table_endpoint(table, &["rows"])?;
        self.send(self.http.patch(url).json(&UpdateBody {
            primary_key,
            column,
            value,
        }))?;
        Ok(())
    }

    /// Returns how many rows the server reports as deleted.
    pub fn delete_rows(&self, table: &TableRef, primary_keys: &[Row]) -> Result<usize> {
        let url = self.table_endpoint(table, &["rows"])?;
        let response = self.send(self.http.delete(url).json(&DeleteBody { primary_keys }))?;
        let parsed: DeleteResponse = response.json().unwrap_or(DeleteResponse {
            deleted: primary_keys.len(),
        });
        Ok(parsed.deleted)
    }

    pub fn generate_sql(&self, connection: ConnectionId, prompt: &str) -> Result<String> {
        let connection = connection.to_string();
        let url = self.endpoint(&["connections", &connection, "query", "generate"])?;
        let response = self.send(self.http.post(url).json(&GenerateBody { prompt }))?;
        let parsed: GenerateResponse = response.json().context("decode generated SQL")?;
        let sql = parsed.sql.trim().to_owned();
        if sql.is_empty() {
            bail!("server returned no SQL for the question");
        }
        Ok(sql)
    }

    pub fn execute_sql(&self, connection: ConnectionId, sql: &str) -> Result<QueryResult> {
        let connection = connection.to_string();
        let url = self.endpoint(&["connections", &connection, "query", "execute"])?;
        let response = self.send(self.http.post(url).json(&ExecuteBody { sql }))?;
        response.json().context("decode query result")
    }

    pub fn start_schema_sync(&self, connection: ConnectionId) -> Result<JobId> {
        let connection = connection.to_string();
        let url = self.endpoint(&["connections", &connection, "schema", "sync"])?;
        let response = self.send(self.http.post(url))?;
        let parsed: JobStarted = response.json().context("decode schema sync job")?;
        Ok(parsed.job_id)
    }

    pub fn job_events(&self) -> Result<JobStream> {
        let url = self.endpoint(&["jobs", "events"])?;
        let request = self
            .stream_http
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let response = self.send(request)?;
        Ok(JobStream::new(BufReader::new(response).lines()))
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("api.base_url cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn table_endpoint(&self, table: &TableRef, rest: &[&str]) -> Result<Url> {
        let connection = table.connection.to_string();
        let mut segments = vec![
            "connections",
            connection.as_str(),
            "schemas",
            table.schema.as_str(),
            "tables",
            table.table.as_str(),
        ];
        segments.extend_from_slice(rest);
        self.endpoint(&segments)
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request
            .send()
            .map_err(|error| connection_error(self.base_url(), error))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED
            && let Some(bus) = &self.session
        {
            let notified = bus.publish(SessionEvent::Unauthorized);
            tracing::info!(notified, "server rejected credentials");
        }
        let body = response.text().unwrap_or_default();
        Err(clean_error_response(status, &body).into())
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> anyhow::Error {
    anyhow!(
        "cannot reach {} -- check that the sqlpane server is running and api.base_url is right ({})",
        base_url,
        error
    )
}

fn clean_error_response(status: StatusCode, body: &str) -> ApiError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|parsed| envelope_message(&parsed))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.len() < 100 && !trimmed.contains('{') {
                trimmed.to_owned()
            } else {
                String::new()
            }
        });
    ApiError {
        status: status.as_u16(),
        message,
    }
}

fn envelope_message(parsed: &Value) -> Option<String> {
    for key in ["detail", "error", "message"] {
        let Some(field) = parsed.get(key) else {
            continue;
        };
        let message = match field {
            Value::String(text) => text.clone(),
            Value::Object(object) => object
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            Value::Array(items) => items
                .iter()
                .filter_map(|item| {
                    item.get("msg")
                        .or_else(|| item.get("message"))
                        .and_then(Value::as_str)
                })
                .collect::<Vec<_>>()
                .join("; "),
            _ => String::new(),
        };
        if !message.is_empty() {
            return Some(message);
        }
    }
    None
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RowsQuery<'a> {
    filters: Vec<&'a Filter>,
    sort: Option<&'a Sort>,
    page: usize,
    page_size: usize,
}

#[derive(Debug, Serialize)]
struct InsertBody<'a> {
    values: &'a Row,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBody<'a> {
    primary_key: &'a Row,
    column: &'a str,
    value: &'a Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteBody<'a> {
    primary_keys: &'a [Row],
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    deleted: usize,
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    sql: String,
}

#[derive(Debug, Serialize)]
struct ExecuteBody<'a> {
    sql: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobStarted {
    job_id: JobId,
}

#[derive(Debug, Deserialize)]
struct ColumnsResponse {
    columns: Vec<ColumnDescriptor>,
}
