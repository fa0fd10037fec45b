//! # Collector Client
//!
//! A thin asynchronous wrapper around `reqwest` that ships one `UploadBatch`
//! per request. The response body is never read; only the status is checked
//! so that failures show up in debug logs.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::configs::config_pipeline::PipelineConfig;
use crate::core::outbound::{UploadBatch, UploadError, UploadSink};

/// # Collector Client
///
/// Holds a pooled `reqwest::Client`, the collector base URL and the namespace
/// segment of the record path.
#[derive(Debug, Clone)]
pub struct CollectorClient {
    /// The underlying client, reused across uploads for connection pooling.
    inner: reqwest::Client,
    /// Scheme, host and optional base path of the collector.
    base_url: Url,
    /// Segment following `/record/`.
    namespace: String,
}

impl CollectorClient {
    /// Creates a client for `base_url`.
    ///
    /// # Errors
    /// Returns `UploadError::InvalidUrl` if `base_url` is not an absolute URL
    /// that can carry a path, or `UploadError::Transport` if the HTTP client
    /// cannot be built.
    pub fn new(base_url: &str, namespace: &str, timeout: Duration) -> Result<Self, UploadError> {
        let url = Url::parse(base_url).map_err(|e| UploadError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if url.cannot_be_a_base() {
            return Err(UploadError::InvalidUrl(format!("{} cannot carry a path", base_url)));
        }

        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("lib_telemetry/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        Ok(Self {
            inner,
            base_url: url,
            namespace: namespace.to_string(),
        })
    }

    /// Creates a client from the collector fields of `config`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, UploadError> {
        Self::new(
            &config.collector_url,
            &config.collector_namespace,
            config.request_timeout(),
        )
    }

    /// Builds `<base>/record/<namespace>/<site_host>/<client_id>`, escaping
    /// each segment.
    pub fn record_url(&self, site_host: &str, client_id: &str) -> Result<Url, UploadError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| UploadError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["record", self.namespace.as_str(), site_host, client_id]);
        Ok(url)
    }

    /// POSTs the batch records as a JSON array and returns the status code.
    ///
    /// # Errors
    /// Any transport failure, or a non-2xx status.
    pub async fn post_batch(&self, batch: &UploadBatch) -> Result<u16, UploadError> {
        // 1. Address the request
        let url = self.record_url(&batch.site_host, &batch.client_id)?;

        // 2. Serialize the opaque payloads
        let body = serde_json::to_string(&batch.records)
            .map_err(|e| UploadError::Serialization(e.to_string()))?;

        // 3. Send; the body of the response is of no interest
        let response = self
            .inner
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(status.as_u16())
        } else {
            Err(UploadError::Status(status.as_u16()))
        }
    }
}

impl UploadSink for CollectorClient {
    async fn upload(&self, batch: UploadBatch) -> Result<(), UploadError> {
        self.post_batch(&batch).await.map(|_| ())
    }
}
