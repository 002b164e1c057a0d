//! # Compression Client Module
//!
//! Client per il servizio di compressione remoto (Tinify / TinyPNG).
//!
//! ## Responsabilità:
//! - Definisce il trait `CompressionClient` usato dal workflow (sostituibile nei test)
//! - Implementa `TinifyClient` sulle API REST con `reqwest`
//! - Classifica gli errori remoti (account, client, server, connessione)
//! - Tiene traccia del contatore `Compression-Count` restituito dal servizio
//!
//! ## Protocollo:
//! 1. `POST /shrink` con i byte dell'immagine → `201 Created` + header `Location`
//! 2. `POST <Location>` con `{"resize": {"method": "scale", "width": N}}` → byte risultanti
//!
//! Autenticazione HTTP basic con utente `api` e password = API key.
//! La validazione invia un body vuoto a `/shrink`: un 400 significa chiave valida.

use crate::error::ClientError;
use async_trait::async_trait;
use reqwest::header::LOCATION;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

pub const API_ENDPOINT: &str = "https://api.tinify.com";

const USER_AGENT: &str = concat!("tinify-optimizer/", env!("CARGO_PKG_VERSION"));
const COMPRESSION_COUNT_HEADER: &str = "compression-count";
const UNKNOWN_COUNT: u64 = u64::MAX;

/// Resize strategy understood by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMethod {
    /// Keep the aspect ratio, constrained by width
    Scale,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResizeOptions {
    pub method: ResizeMethod,
    pub width: u32,
}

impl ResizeOptions {
    pub fn scale_to_width(width: u32) -> Self {
        Self {
            method: ResizeMethod::Scale,
            width,
        }
    }
}

/// Handle to an image uploaded to the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    /// URL of the stored compression result
    pub location: String,
    pub input_size: Option<u64>,
    pub output_size: Option<u64>,
}

/// Remote resize + compress service
#[async_trait]
pub trait CompressionClient: Send + Sync {
    /// Check that the credentials are accepted
    async fn validate(&self) -> Result<(), ClientError>;

    /// Upload image bytes for compression
    async fn upload(&self, bytes: Vec<u8>) -> Result<Source, ClientError>;

    /// Resize a previously uploaded image and download the result
    async fn resize(&self, source: &Source, options: &ResizeOptions) -> Result<Vec<u8>, ClientError>;

    /// Compressions used this month, as last reported by the service
    fn compression_count(&self) -> Option<u64> {
        None
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    size: u64,
}

#[derive(Debug, Deserialize)]
struct ShrinkBody {
    input: Option<ImageInfo>,
    output: Option<ImageInfo>,
}

#[derive(Serialize)]
struct ResizeRequest<'a> {
    resize: &'a ResizeOptions,
}

enum RequestBody<'a> {
    Empty,
    Bytes(Vec<u8>),
    Resize(&'a ResizeOptions),
}

/// HTTP client for the Tinify API
pub struct TinifyClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    compression_count: AtomicU64,
}

impl TinifyClient {
    /// Create a client authenticated with `api_key`
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        Self::with_base_url(api_key, timeout, API_ENDPOINT)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        timeout: Duration,
        base_url: impl Into<String>,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            compression_count: AtomicU64::new(UNKNOWN_COUNT),
        })
    }

    fn absolute_url(&self, location: &str) -> String {
        if location.starts_with('/') {
            format!("{}{}", self.base_url, location)
        } else {
            location.to_string()
        }
    }

    async fn post(&self, url: &str, body: RequestBody<'_>) -> Result<reqwest::Response, ClientError> {
        let request = self.http.post(url).basic_auth("api", Some(&self.api_key));
        let request = match body {
            RequestBody::Empty => request,
            RequestBody::Bytes(bytes) => request.body(bytes),
            RequestBody::Resize(options) => request.json(&ResizeRequest { resize: options }),
        };

        let response = request.send().await?;
        self.record_compression_count(&response);

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from_response(response).await)
        }
    }

    fn record_compression_count(&self, response: &reqwest::Response) {
        let count = response
            .headers()
            .get(COMPRESSION_COUNT_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<u64>().ok());
        if let Some(count) = count {
            self.compression_count.store(count, Ordering::Relaxed);
        }
    }

    async fn error_from_response(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => format!("{} ({})", body.message, body.error),
            Err(_) => format!("Error while parsing response: received status {}", status),
        };

        match status {
            401 | 429 => ClientError::Account { status, message },
            400..=499 => ClientError::Client { status, message },
            500..=599 => ClientError::Server { status, message },
            _ => ClientError::Response(message),
        }
    }
}

#[async_trait]
impl CompressionClient for TinifyClient {
    async fn validate(&self) -> Result<(), ClientError> {
        let url = format!("{}/shrink", self.base_url);
        match self.post(&url, RequestBody::Empty).await {
            Ok(_) => Ok(()),
            // Over the monthly limit, but the key itself is valid
            Err(ClientError::Account { status: 429, .. }) => Ok(()),
            // "Input missing": credentials were accepted
            Err(ClientError::Client { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }

    async fn upload(&self, bytes: Vec<u8>) -> Result<Source, ClientError> {
        let url = format!("{}/shrink", self.base_url);
        let response = self.post(&url, RequestBody::Bytes(bytes)).await?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(|value| self.absolute_url(value))
            .ok_or_else(|| ClientError::Response("missing Location header".to_string()))?;

        let body = response.json::<ShrinkBody>().await.ok();
        let (input_size, output_size) = match body {
            Some(body) => (body.input.map(|i| i.size), body.output.map(|o| o.size)),
            None => (None, None),
        };

        debug!("Uploaded image stored at {}", location);
        Ok(Source {
            location,
            input_size,
            output_size,
        })
    }

    async fn resize(&self, source: &Source, options: &ResizeOptions) -> Result<Vec<u8>, ClientError> {
        let response = self.post(&source.location, RequestBody::Resize(options)).await?;
        Ok(response.bytes().await?.to_vec())
    }

    fn compression_count(&self) -> Option<u64> {
        match self.compression_count.load(Ordering::Relaxed) {
            UNKNOWN_COUNT => None,
            count => Some(count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_bytes, body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, key: &str) -> TinifyClient {
        TinifyClient::with_base_url(key, Duration::from_secs(5), server.uri()).unwrap()
    }

    fn error_body(error: &str, message: &str) -> serde_json::Value {
        json!({ "error": error, "message": message })
    }

    #[tokio::test]
    async fn test_validate_accepts_input_missing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/shrink"))
            .and(header("authorization", "Basic YXBpOnNlY3JldA=="))
            .respond_with(
                ResponseTemplate::new(400)
                    .insert_header("Compression-Count", "12")
                    .set_body_json(error_body("InputMissing", "Input file is empty")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, "secret");
        assert!(client.validate().await.is_ok());
        assert_eq!(client.compression_count(), Some(12));
    }

    #[tokio::test]
    async fn test_validate_accepts_exhausted_quota() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/shrink"))
            .respond_with(ResponseTemplate::new(429).set_body_json(error_body("TooManyRequests", "Limit reached")))
            .mount(&server)
            .await;

        assert!(client(&server, "secret").validate().await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_rejects_bad_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/shrink"))
            .respond_with(ResponseTemplate::new(401).set_body_json(error_body("Unauthorized", "Credentials are invalid")))
            .mount(&server)
            .await;

        let err = client(&server, "wrong").validate().await.unwrap_err();
        match err {
            ClientError::Account { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Credentials are invalid (Unauthorized)");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_upload_and_resize() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/shrink"))
            .and(body_bytes(b"raw image".to_vec()))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("Location", "/output/abc123")
                    .set_body_json(json!({
                        "input": { "size": 9, "type": "image/png" },
                        "output": { "size": 5, "type": "image/png", "width": 10, "height": 10 }
                    })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/output/abc123"))
            .and(body_json(json!({ "resize": { "method": "scale", "width": 2560 } })))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"tiny".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client(&server, "secret");
        let source = client.upload(b"raw image".to_vec()).await.unwrap();
        assert_eq!(source.location, format!("{}/output/abc123", server.uri()));
        assert_eq!(source.input_size, Some(9));
        assert_eq!(source.output_size, Some(5));

        let bytes = client
            .resize(&source, &ResizeOptions::scale_to_width(2560))
            .await
            .unwrap();
        assert_eq!(bytes, b"tiny");
    }

    #[tokio::test]
    async fn test_upload_without_location_fails() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/shrink"))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let err = client(&server, "secret").upload(vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, ClientError::Response(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_classified() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/shrink"))
            .respond_with(ResponseTemplate::new(503).set_body_string("gateway down"))
            .mount(&server)
            .await;

        let err = client(&server, "secret").upload(vec![1]).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(matches!(err, ClientError::Server { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_connection_error() {
        let client = TinifyClient::with_base_url("secret", Duration::from_millis(500), "http://127.0.0.1:9").unwrap();
        let err = client.validate().await.unwrap_err();
        assert!(matches!(err, ClientError::Connection(_)));
        assert_eq!(client.compression_count(), None);
    }
}
