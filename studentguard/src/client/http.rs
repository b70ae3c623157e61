//! `reqwest`-backed implementation of [`PipelineClient`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::protocol::{DatasetFile, HealthStatus, PipelineClient};
use super::wire::{self, CleanEnvelope, MessageEnvelope, PredictEnvelope, TrainEnvelope, UploadEnvelope};
use crate::config::ClientConfig;
use crate::errors::{ClientError, ConfigError};
use crate::models::{
    CleanSummary, DatasetComparison, DatasetInfo, EvaluationReport, ExportReceipt,
    Hyperparameters, PredictionInput, PredictionResult, TrainMetrics, UploadSummary,
};

/// HTTP client for the pipeline service.
#[derive(Debug, Clone)]
pub struct HttpPipelineClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpPipelineClient {
    /// Creates a client from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is invalid or the
    /// underlying HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        for (name, value) in &config.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ConfigError::InvalidHeader(name.clone()))?;
            let header_value =
                HeaderValue::from_str(value).map_err(|_| ConfigError::InvalidHeader(name.clone()))?;
            headers.insert(header_name, header_value);
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers);
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        if let Some(timeout) = config.connect_timeout() {
            builder = builder.connect_timeout(timeout);
        }

        let http = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// Gets the configuration.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.http.get(self.config.endpoint(path))
    }

    fn post_empty(&self, path: &str) -> RequestBuilder {
        self.http
            .post(self.config.endpoint(path))
            .json(&serde_json::json!({}))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        path: &'static str,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        debug!(endpoint = path, "Sending pipeline request");

        let response = request.send().await.map_err(|e| {
            warn!(endpoint = path, error = %e, "Pipeline service unreachable");
            ClientError::transport(e.to_string())
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::invalid_payload(status, e.to_string()))?;

        debug!(endpoint = path, status, bytes = body.len(), "Pipeline response received");

        if !(200..300).contains(&status) {
            return Err(wire::failure(status, &body));
        }
        wire::decode(status, &body)
    }
}

#[async_trait]
impl PipelineClient for HttpPipelineClient {
    async fn health(&self) -> Result<HealthStatus, ClientError> {
        self.send("health", self.get("health")).await
    }

    async fn upload(&self, file: DatasetFile) -> Result<UploadSummary, ClientError> {
        let part = Part::bytes(file.bytes).file_name(file.file_name);
        let form = Form::new().part("file", part);
        let request = self.http.post(self.config.endpoint("upload")).multipart(form);

        let envelope: UploadEnvelope = self.send("upload", request).await?;
        Ok(envelope.into_summary(self.config.preview_rows))
    }

    async fn clean(&self) -> Result<CleanSummary, ClientError> {
        let envelope: CleanEnvelope = self.send("clean", self.post_empty("clean")).await?;
        Ok(envelope.into_summary(self.config.preview_rows))
    }

    async fn train(&self) -> Result<TrainMetrics, ClientError> {
        let envelope: TrainEnvelope = self.send("train", self.post_empty("train")).await?;
        Ok(envelope.metrics)
    }

    async fn train_with_params(&self, params: &Hyperparameters) -> Result<TrainMetrics, ClientError> {
        let request = self
            .http
            .post(self.config.endpoint("train_with_params"))
            .json(params);
        let envelope: TrainEnvelope = self.send("train_with_params", request).await?;
        Ok(envelope.metrics)
    }

    async fn metrics(&self) -> Result<EvaluationReport, ClientError> {
        self.send("get_metrics", self.get("get_metrics")).await
    }

    async fn predict(&self, input: &PredictionInput) -> Result<PredictionResult, ClientError> {
        let request = self.http.post(self.config.endpoint("predict")).json(input);
        let envelope: PredictEnvelope = self.send("predict", request).await?;
        Ok(envelope.result)
    }

    async fn dataset_info(&self) -> Result<DatasetInfo, ClientError> {
        self.send("data/info", self.get("data/info")).await
    }

    async fn compare(&self) -> Result<DatasetComparison, ClientError> {
        self.send("data/compare", self.get("data/compare")).await
    }

    async fn export(&self) -> Result<ExportReceipt, ClientError> {
        self.send("data/export", self.get("data/export")).await
    }

    async fn reset(&self) -> Result<String, ClientError> {
        let envelope: MessageEnvelope = self.send("reset", self.post_empty("reset")).await?;
        Ok(envelope.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned response per connection and returns each request head.
    async fn stub_server(
        responses: Vec<(u16, String)>,
    ) -> (String, tokio::task::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/api", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let mut heads = Vec::new();
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0_u8; 4096];
                let header_end = loop {
                    let n = socket.read(&mut chunk).await.unwrap();
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                        break pos + 4;
                    }
                    assert!(n > 0, "connection closed before headers");
                };
                let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
                let content_length = head
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                while buf.len() < header_end + content_length {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                }

                let response = format!(
                    "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.unwrap();
                heads.push(head);
            }
            heads
        });

        (base_url, handle)
    }

    fn client_for(base_url: &str) -> HttpPipelineClient {
        HttpPipelineClient::new(ClientConfig::new().with_base_url(base_url)).unwrap()
    }

    #[tokio::test]
    async fn test_health_success() {
        let body = serde_json::json!({
            "status": "ok",
            "message": "StudentGuard API is running",
            "version": "1.0.0"
        })
        .to_string();
        let (base_url, server) = stub_server(vec![(200, body)]).await;

        let health = client_for(&base_url).health().await.unwrap();
        assert_eq!(health.version.as_deref(), Some("1.0.0"));

        let heads = server.await.unwrap();
        assert!(heads[0].starts_with("GET /api/health HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_clean_application_error() {
        let body = r#"{"error": "No hay datos cargados. Primero sube un archivo CSV"}"#.to_string();
        let (base_url, server) = stub_server(vec![(400, body)]).await;

        let err = client_for(&base_url).clean().await.unwrap_err();
        assert_eq!(err.status(), 400);
        assert_eq!(
            err.service_message(),
            Some("No hay datos cargados. Primero sube un archivo CSV")
        );

        let heads = server.await.unwrap();
        assert!(heads[0].starts_with("POST /api/clean HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_train_with_params_sends_body() {
        let body = fixtures::train_body(Some(fixtures::echoed_params(0.5))).to_string();
        let (base_url, server) = stub_server(vec![(200, body)]).await;

        let params = Hyperparameters::default().with_c(-1.0);
        let metrics = client_for(&base_url).train_with_params(&params).await.unwrap();
        assert_eq!(metrics.hyperparams_used.unwrap().c, 0.5);

        let heads = server.await.unwrap();
        assert!(heads[0].starts_with("POST /api/train_with_params HTTP/1.1"));
    }

    #[tokio::test]
    async fn test_invalid_payload() {
        let (base_url, server) = stub_server(vec![(200, "not json".to_string())]).await;

        let err = client_for(&base_url).metrics().await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidPayload { status: 200, .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = client_for(&format!("http://{addr}/api"));
        let err = client.health().await.unwrap_err();
        assert!(err.is_transport());
        assert_eq!(err.status(), 0);
    }

    #[test]
    fn test_invalid_header_rejected() {
        let config = ClientConfig::new().with_header("bad header", "x");
        let err = HttpPipelineClient::new(config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidHeader(_)));
    }
}
