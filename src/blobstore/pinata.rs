//! Pinata pinning service client.
//!
//! # Endpoints
//! - `POST {api}/pinning/pinFileToIPFS` (multipart `file` and
//!   `pinataMetadata` fields) → `IpfsHash`
//! - `DELETE {api}/pinning/unpin/{cid}`
//! - `GET {gateway}/ipfs/{cid}`
//!
//! Authentication uses the `pinata_api_key` / `pinata_secret_api_key`
//! header pair on API calls. Gateway downloads are unauthenticated and may go
//! through an HTTP proxy.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Proxy, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::blobstore::types::{BlobError, BlobResult, ContentAddress};
use crate::blobstore::BlobStore;
use crate::config::BlobStoreConfig;

const API_KEY_HEADER: &str = "pinata_api_key";
const API_SECRET_HEADER: &str = "pinata_secret_api_key";

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// HTTP client for the Pinata API and gateway.
pub struct PinataClient {
    config: BlobStoreConfig,
    api: Client,
    gateway: Client,
}

impl PinataClient {
    /// Create a new client with the static credential headers installed.
    pub fn new(config: BlobStoreConfig, api_key: &str, api_secret: &str) -> BlobResult<Self> {
        let header = |value: &str| {
            HeaderValue::from_str(value)
                .map_err(|_| BlobError::StoreUnavailable("credential is not a valid header value".to_string()))
        };
        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, header(api_key)?);
        headers.insert(API_SECRET_HEADER, header(api_secret)?);

        let timeout = Duration::from_secs(config.timeout_secs);
        let api = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let mut gateway = Client::builder().timeout(timeout);
        if let Some(proxy_url) = &config.proxy_url {
            gateway = gateway.proxy(Proxy::all(proxy_url.as_str())?);
        }
        let gateway = gateway.build()?;

        Ok(Self { config, api, gateway })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// Map a non-success API status to the error taxonomy.
    async fn status_error(response: reqwest::Response) -> BlobError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = format!("status {}: {}", status.as_u16(), body);
        match status {
            StatusCode::PAYMENT_REQUIRED | StatusCode::PAYLOAD_TOO_LARGE => {
                BlobError::QuotaExceeded(message)
            }
            _ => BlobError::StoreUnavailable(message),
        }
    }
}

#[async_trait]
impl BlobStore for PinataClient {
    async fn upload(&self, name: &str, bytes: Bytes) -> BlobResult<ContentAddress> {
        let size = bytes.len();
        let part = Part::bytes(bytes.to_vec()).file_name(name.to_string());
        let metadata = serde_json::json!({ "name": name }).to_string();
        let form = Form::new()
            .part("file", part)
            .text("pinataMetadata", metadata);

        let response = self
            .api
            .post(self.api_url("/pinning/pinFileToIPFS"))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| BlobError::StoreUnavailable(format!("unexpected pin response: {}", e)))?;

        tracing::info!(blob_address = %pinned.ipfs_hash, name = name, size = size, "File pinned");
        Ok(ContentAddress(pinned.ipfs_hash))
    }

    async fn download(&self, address: &ContentAddress) -> BlobResult<Bytes> {
        let url = format!(
            "{}/ipfs/{}",
            self.config.gateway_url.trim_end_matches('/'),
            address
        );
        let response = self.gateway.get(&url).send().await?;

        match response.status() {
            status if status.is_success() => {
                let bytes = response.bytes().await?;
                tracing::debug!(blob_address = %address, size = bytes.len(), "File downloaded");
                Ok(bytes)
            }
            StatusCode::NOT_FOUND => Err(BlobError::NotFound(address.clone())),
            _ => Err(Self::status_error(response).await),
        }
    }

    async fn delete(&self, address: &ContentAddress) -> BlobResult<()> {
        let response = self
            .api
            .delete(self.api_url(&format!("/pinning/unpin/{}", address)))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            tracing::info!(blob_address = %address, "File unpinned");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        // Pinata reports an already-unpinned CID as a client error.
        if body.contains("HAS_NOT_PINNED") || body.to_ascii_lowercase().contains("not pinned") {
            tracing::debug!(blob_address = %address, "File was already unpinned");
            return Ok(());
        }

        Err(BlobError::StoreUnavailable(format!(
            "unpin failed with status {}: {}",
            status.as_u16(),
            body
        )))
    }
}

impl std::fmt::Debug for PinataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinataClient")
            .field("api_url", &self.config.api_url)
            .field("gateway_url", &self.config.gateway_url)
            .finish()
    }
}
