//! Block-blob storage client
//!
//! Every call is a single attempt; retry and timeout policy belong to the
//! caller. The SAS URI is treated as a secret and never logged with its query.

use crate::client::{redact_query, NetClient};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use lobup_errors::{BlobError, Error, NetworkError};
use reqwest::{Method, Response};
use std::fmt::Write as _;
use std::time::Duration;
use url::Url;

/// Storage operations the chunk uploader depends on
#[async_trait]
pub trait BlobApi: Send + Sync {
    /// Stage one block under `block_id` (already base64-encoded)
    async fn put_block(
        &self,
        sas_uri: &str,
        block_id: &str,
        data: Bytes,
        timeout: Duration,
    ) -> Result<(), Error>;

    /// Commit the staged blocks in order
    async fn put_block_list(&self, sas_uri: &str, block_ids: &[String]) -> Result<(), Error>;
}

/// Encode a block identifier for transmission
#[must_use]
pub fn encode_block_id(raw: &str) -> String {
    STANDARD.encode(raw.as_bytes())
}

/// Body of a Put Block List request listing every block as `Latest`
#[must_use]
pub fn block_list_xml(block_ids: &[String]) -> String {
    let mut xml = String::from(r#"<?xml version="1.0" encoding="utf-8"?><BlockList>"#);
    for id in block_ids {
        let _ = write!(xml, "<Latest>{id}</Latest>");
    }
    xml.push_str("</BlockList>");
    xml
}

/// HTTP implementation of [`BlobApi`]
#[derive(Debug, Clone)]
pub struct BlobClient {
    net: NetClient,
}

impl BlobClient {
    #[must_use]
    pub fn new(net: NetClient) -> Self {
        Self { net }
    }

    /// Append storage query parameters to a SAS URI
    fn with_params(sas_uri: &str, params: &[(&str, &str)]) -> Result<Url, Error> {
        let mut url = Url::parse(sas_uri).map_err(|e| BlobError::InvalidSasUri {
            message: e.to_string(),
        })?;
        {
            let mut query = url.query_pairs_mut();
            for (key, value) in params {
                query.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn check(response: Response) -> Result<(), Error> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let message = response.text().await.unwrap_or_default();
        Err(NetworkError::HttpError {
            status: status.as_u16(),
            message,
        }
        .into())
    }
}

#[async_trait]
impl BlobApi for BlobClient {
    async fn put_block(
        &self,
        sas_uri: &str,
        block_id: &str,
        data: Bytes,
        timeout: Duration,
    ) -> Result<(), Error> {
        let url = Self::with_params(sas_uri, &[("comp", "block"), ("blockid", block_id)])?;
        tracing::trace!(url = %redact_query(&url), bytes = data.len(), "put block");
        let request = self
            .net
            .request(Method::PUT, url.as_str())
            .timeout(timeout)
            // A retry must not ride the connection of the attempt that failed
            .header("Connection", "close")
            .header("x-ms-blob-type", "BlockBlob")
            .body(data);
        let response = self.net.send(request).await?;
        Self::check(response).await
    }

    async fn put_block_list(&self, sas_uri: &str, block_ids: &[String]) -> Result<(), Error> {
        let url = Self::with_params(sas_uri, &[("comp", "blocklist")])?;
        tracing::debug!(url = %redact_query(&url), blocks = block_ids.len(), "put block list");
        let request = self
            .net
            .request(Method::PUT, url.as_str())
            .body(block_list_xml(block_ids));
        let response = self.net.send(request).await?;
        Self::check(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_id_encoding() {
        assert_eq!(encode_block_id("0000"), "MDAwMA==");
        assert_eq!(encode_block_id("0001"), "MDAwMQ==");
    }

    #[test]
    fn test_block_list_xml() {
        let xml = block_list_xml(&["MDAwMA==".into(), "MDAwMQ==".into()]);
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><BlockList><Latest>MDAwMA==</Latest><Latest>MDAwMQ==</Latest></BlockList>"
        );
    }

    #[test]
    fn test_params_keep_signature_and_encode_id() {
        let url = BlobClient::with_params(
            "https://acct.blob.test/c/b?sv=1&sig=abc%2B",
            &[("comp", "block"), ("blockid", "MDAwMA==")],
        )
        .unwrap();
        let query = url.query().unwrap();
        assert!(query.starts_with("sv=1&sig=abc%2B"));
        assert!(query.ends_with("comp=block&blockid=MDAwMA%3D%3D"));
    }

    #[test]
    fn test_invalid_sas_uri() {
        let err = BlobClient::with_params("not a url", &[]).unwrap_err();
        assert!(matches!(err, Error::Blob(BlobError::InvalidSasUri { .. })));
    }
}
