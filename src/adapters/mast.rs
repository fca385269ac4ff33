//! TIC lookups through the MAST `invoke` API.

use crate::adapters::http::HttpFetcher;
use crate::domain::model::Table;
use crate::domain::ports::CatalogService;
use crate::utils::error::{FetchError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const TIC_SERVICE: &str = "Mast.Catalogs.Filtered.Tic";

#[derive(Debug, Deserialize)]
struct MastResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    fields: Vec<MastField>,
    #[serde(default)]
    data: Vec<serde_json::Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct MastField {
    name: String,
}

#[derive(Debug, Clone)]
pub struct MastCatalog {
    http: HttpFetcher,
    endpoint: String,
    batch_size: usize,
    concurrent_requests: usize,
}

impl MastCatalog {
    pub fn new(
        http: HttpFetcher,
        endpoint: impl Into<String>,
        batch_size: usize,
        concurrent_requests: usize,
    ) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            batch_size: batch_size.max(1),
            concurrent_requests: concurrent_requests.max(1),
        }
    }

    fn request_body(ids: &[String], page_size: usize) -> Value {
        json!({
            "service": TIC_SERVICE,
            "format": "json",
            "params": {
                "columns": "*",
                "filters": [
                    { "paramName": "ID", "values": ids }
                ]
            },
            "pagesize": page_size,
            "page": 1,
            "removenullcolumns": false
        })
    }

    async fn query_batch(http: HttpFetcher, endpoint: String, ids: Vec<String>) -> Result<Table> {
        let request = Self::request_body(&ids, ids.len());
        let body = http
            .post_form(&endpoint, &[("request", request.to_string())])
            .await?;
        parse_response(&body)
    }
}

fn parse_response(body: &[u8]) -> Result<Table> {
    let response: MastResponse = serde_json::from_slice(body)?;

    if response.status.eq_ignore_ascii_case("ERROR") {
        return Err(FetchError::CatalogError {
            message: response
                .msg
                .unwrap_or_else(|| "MAST returned an error without a message".to_string()),
        });
    }

    let headers: Vec<String> = if response.fields.is_empty() {
        let mut keys: Vec<String> = response
            .data
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    } else {
        response.fields.into_iter().map(|f| f.name).collect()
    };

    let mut table = Table::new(headers.clone());
    for row in &response.data {
        table.push_row(headers.iter().map(|h| cell(row.get(h))).collect())?;
    }
    Ok(table)
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl CatalogService for MastCatalog {
    async fn query_tic(&self, ticids: &[String]) -> Result<Table> {
        if ticids.is_empty() {
            return Ok(Table::new(vec!["ID".to_string()]));
        }

        let batches: Vec<Vec<String>> = ticids
            .chunks(self.batch_size)
            .map(<[String]>::to_vec)
            .collect();
        tracing::debug!(
            "Querying {} TIC IDs in {} batch(es) of up to {}",
            ticids.len(),
            batches.len(),
            self.batch_size
        );

        let semaphore = Arc::new(Semaphore::new(self.concurrent_requests));
        let mut tasks = JoinSet::new();

        for (index, ids) in batches.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let http = self.http.clone();
            let endpoint = self.endpoint.clone();
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| FetchError::CatalogError {
                        message: format!("request limiter closed: {}", e),
                    })?;
                let table = Self::query_batch(http, endpoint, ids).await?;
                Ok::<_, FetchError>((index, table))
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (index, table) = joined.map_err(|e| FetchError::CatalogError {
                message: format!("catalog task failed: {}", e),
            })??;
            tracing::debug!("TIC batch {} returned {} rows", index + 1, table.len());
            results.push((index, table));
        }

        results.sort_by_key(|(index, _)| *index);
        let tables: Vec<Table> = results.into_iter().map(|(_, table)| table).collect();
        Ok(Table::concat(&tables))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::RequestSettings;
    use httpmock::prelude::*;
    use std::time::{Duration, Instant};

    fn catalog(endpoint: String, batch_size: usize) -> MastCatalog {
        catalog_with_limit(endpoint, batch_size, 2)
    }

    fn catalog_with_limit(endpoint: String, batch_size: usize, concurrent: usize) -> MastCatalog {
        let http = HttpFetcher::new(&RequestSettings {
            timeout_seconds: 5,
            retry_attempts: 0,
            retry_delay_ms: 0,
        })
        .unwrap();
        MastCatalog::new(http, endpoint, batch_size, concurrent)
    }

    async fn mock_batch<'a>(server: &'a MockServer, id: &str, delay: Duration) -> httpmock::Mock<'a> {
        let needle = format!("%22{}%22", id);
        let row = serde_json::json!({
            "status": "COMPLETE",
            "fields": [{"name": "ID"}],
            "data": [{"ID": id}]
        });
        server
            .mock_async(move |when, then| {
                when.method(POST).path("/api/v0/invoke").body_contains(needle);
                then.status(200).delay(delay).json_body(row);
            })
            .await
    }

    #[test]
    fn test_parse_response_orders_by_fields() {
        let body = serde_json::json!({
            "status": "COMPLETE",
            "msg": "",
            "fields": [{"name": "ID", "type": "string"}, {"name": "Tmag", "type": "float"}, {"name": "ra", "type": "float"}],
            "data": [
                {"ra": 84.29, "Tmag": 5.1, "ID": "261136679"},
                {"ID": "38846515", "Tmag": null, "ra": 90.0}
            ]
        });

        let table = parse_response(body.to_string().as_bytes()).unwrap();

        assert_eq!(table.headers(), &["ID", "Tmag", "ra"]);
        assert_eq!(table.rows()[0], vec!["261136679", "5.1", "84.29"]);
        assert_eq!(table.value(1, "Tmag"), Some(""));
    }

    #[test]
    fn test_parse_response_error_status() {
        let body = r#"{"status":"ERROR","msg":"Request too large","data":[],"fields":[]}"#;
        let err = parse_response(body.as_bytes()).unwrap_err();
        match err {
            FetchError::CatalogError { message } => assert_eq!(message, "Request too large"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_query_makes_no_request() {
        let table = catalog("http://127.0.0.1:1/api/v0/invoke".to_string(), 10)
            .query_tic(&[])
            .await
            .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.headers(), &["ID"]);
    }

    #[tokio::test]
    async fn test_query_tic_batches_and_concatenates() {
        let server = MockServer::start_async().await;
        let first = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v0/invoke")
                    .body_contains(TIC_SERVICE)
                    .body_contains("%221%22");
                then.status(200).json_body(serde_json::json!({
                    "status": "COMPLETE",
                    "fields": [{"name": "ID"}, {"name": "Tmag"}],
                    "data": [{"ID": "1", "Tmag": 9.0}, {"ID": "2", "Tmag": 10.0}]
                }));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/v0/invoke")
                    .body_contains("%223%22");
                then.status(200).json_body(serde_json::json!({
                    "status": "COMPLETE",
                    "fields": [{"name": "ID"}, {"name": "Tmag"}],
                    "data": [{"ID": "3", "Tmag": 11.0}]
                }));
            })
            .await;

        let ids: Vec<String> = ["1", "2", "3"].iter().map(|s| s.to_string()).collect();
        let table = catalog(server.url("/api/v0/invoke"), 2)
            .query_tic(&ids)
            .await
            .unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(table.column("ID").unwrap(), vec!["1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_slow_first_batch_keeps_batch_order() {
        let server = MockServer::start_async().await;
        mock_batch(&server, "11", Duration::from_millis(400)).await;
        mock_batch(&server, "22", Duration::ZERO).await;
        mock_batch(&server, "33", Duration::ZERO).await;

        let ids: Vec<String> = ["11", "22", "33"].iter().map(|s| s.to_string()).collect();
        let table = catalog_with_limit(server.url("/api/v0/invoke"), 1, 3)
            .query_tic(&ids)
            .await
            .unwrap();

        assert_eq!(table.column("ID").unwrap(), vec!["11", "22", "33"]);
    }

    #[tokio::test]
    async fn test_batches_respect_request_limit() {
        let server = MockServer::start_async().await;
        let delay = Duration::from_millis(200);
        let mut mocks = Vec::new();
        for id in ["11", "22", "33"] {
            mocks.push(mock_batch(&server, id, delay).await);
        }

        let ids: Vec<String> = ["11", "22", "33"].iter().map(|s| s.to_string()).collect();
        let started = Instant::now();
        let table = catalog_with_limit(server.url("/api/v0/invoke"), 1, 1)
            .query_tic(&ids)
            .await
            .unwrap();
        let elapsed = started.elapsed();

        for mock in &mocks {
            mock.assert_hits_async(1).await;
        }
        assert_eq!(table.column("ID").unwrap(), vec!["11", "22", "33"]);
        // one request at a time: the delays add up
        assert!(elapsed >= delay * 3, "batches overlapped: {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_query_tic_http_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v0/invoke");
                then.status(400);
            })
            .await;

        let err = catalog(server.url("/api/v0/invoke"), 100)
            .query_tic(&["1".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus { status: 400, .. }));
    }
}
