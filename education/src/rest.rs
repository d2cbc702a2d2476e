use crate::backend::{Backend, Query};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde_json::Value;
use shared::config::Config;
use shared::{Error, Result};
use std::time::Duration;
use tracing::{debug, warn};

/// Backend client for a PostgREST-style hosted database.
pub struct RestBackend {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestBackend {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build http client: {e}")))?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.backend_url.clone(),
            config.backend_api_key.clone(),
            config.request_timeout,
        )
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str, params: &[(String, String)]) -> RequestBuilder {
        let mut builder = self.client.request(method, self.table_url(table)).query(params);
        if let Some(key) = &self.api_key {
            builder = builder.header("apikey", key.as_str()).bearer_auth(key);
        }
        builder
    }
}

/// Query-string parameters for a select.
fn select_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    for (column, value) in &query.filters {
        params.push((column.clone(), format!("eq.{value}")));
    }
    if let Some(column) = &query.order {
        params.push(("order".to_string(), format!("{column}.asc")));
    }
    params
}

async fn read_rows(table: &str, response: Response) -> Result<Vec<Value>> {
    let status = response.status();
    if !status.is_success() {
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read error body from '{}': {}", table, e);
                format!("<unreadable body: {e}>")
            }
        };
        return Err(Error::Backend(format!("{table}: HTTP {status}: {body}")));
    }
    response
        .json::<Vec<Value>>()
        .await
        .map_err(|e| Error::MalformedPayload(format!("{table}: {e}")))
}

#[async_trait]
impl Backend for RestBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>> {
        debug!("Selecting from '{}' with {:?}", table, query);
        let response = self
            .request(Method::GET, table, &select_params(query))
            .send()
            .await
            .map_err(|e| Error::Backend(format!("{table}: {e}")))?;
        read_rows(table, response).await
    }

    async fn update(&self, table: &str, id: i64, patch: Value) -> Result<Vec<Value>> {
        debug!("Updating '{}' row {}", table, id);
        let params = [("id".to_string(), format!("eq.{id}"))];
        let response = self
            .request(Method::PATCH, table, &params)
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("{table}: {e}")))?;
        read_rows(table, response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port and return its base URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request: Vec<u8> = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}")
    }

    fn local_backend(url: String) -> RestBackend {
        let client = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        RestBackend::with_client(client, url, None)
    }

    #[test]
    fn test_select_params() {
        let query = Query::new().eq("course_id", 5).order("position");
        let params = select_params(&query);
        assert_eq!(
            params,
            vec![
                ("select".to_string(), "*".to_string()),
                ("course_id".to_string(), "eq.5".to_string()),
                ("order".to_string(), "position.asc".to_string()),
            ]
        );
    }

    #[test]
    fn test_table_url_strips_trailing_slash() {
        let backend = RestBackend::new("http://localhost:54321/", None, Duration::from_secs(1)).unwrap();
        assert_eq!(backend.table_url("courses"), "http://localhost:54321/rest/v1/courses");
    }

    #[test]
    fn test_request_carries_api_key() {
        let backend = RestBackend::new(
            "http://localhost:54321",
            Some("anon".to_string()),
            Duration::from_secs(1),
        )
        .unwrap();
        let request = backend
            .request(Method::GET, "courses", &select_params(&Query::new().eq("id", 1)))
            .build()
            .unwrap();

        assert_eq!(request.headers()["apikey"], "anon");
        assert_eq!(request.headers()["authorization"], "Bearer anon");
        assert_eq!(
            request.url().as_str(),
            "http://localhost:54321/rest/v1/courses?select=*&id=eq.1"
        );
    }

    #[tokio::test]
    async fn test_rows_are_decoded() {
        let url = serve_once("200 OK", r#"[{"id":1,"title":"Cumbia 101"}]"#).await;
        let backend = local_backend(url);

        let rows = backend.select("courses", &Query::new().eq("id", 1)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], "Cumbia 101");
    }

    #[tokio::test]
    async fn test_error_status_is_a_backend_error_with_body() {
        let url = serve_once("503 Service Unavailable", "down").await;
        let backend = local_backend(url);

        match backend.select("courses", &Query::new()).await {
            Err(Error::Backend(message)) => {
                assert!(message.contains("503"), "{message}");
                assert!(message.contains("down"), "{message}");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let url = serve_once("200 OK", "not json").await;
        let backend = local_backend(url);

        let result = backend.select("courses", &Query::new()).await;
        assert!(matches!(result, Err(Error::MalformedPayload(_))));
    }

    #[tokio::test]
    async fn test_closed_port_is_a_backend_error() {
        // bind then drop to get a local port nothing listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = local_backend(format!("http://{addr}"));
        let result = backend.select("courses", &Query::new()).await;
        assert!(matches!(result, Err(Error::Backend(_))));
    }
}
