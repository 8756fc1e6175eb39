//! The connection to a Celestia node.
use std::time::Duration;

use async_trait::async_trait;
use jsonrpsee::{
    core::ClientError,
    http_client::{
        HeaderMap,
        HeaderValue,
        HttpClient,
        HttpClientBuilder,
    },
};

use crate::{
    celestia::{
        BlobApiClient as _,
        BlobProof,
        Namespace,
        ShareCommitment,
        WireBlob,
    },
    fee::SubmitOptions,
};

const BLOB_NOT_FOUND: &str = "blob: not found";
const INVALID_PROOF: &str = "blob: invalid proof";

/// The blob operations the adapter needs from a Celestia node.
///
/// Implementations must be safe to share between concurrent requests.
#[async_trait]
pub trait NodeClient: Send + Sync + 'static {
    async fn submit(&self, blobs: Vec<WireBlob>, options: SubmitOptions)
        -> Result<u64, ClientError>;

    async fn get(
        &self,
        height: u64,
        namespace: Namespace,
        commitment: ShareCommitment,
    ) -> Result<WireBlob, ClientError>;

    async fn get_all(
        &self,
        height: u64,
        namespaces: Vec<Namespace>,
    ) -> Result<Vec<WireBlob>, ClientError>;

    async fn get_proof(
        &self,
        height: u64,
        namespace: Namespace,
        commitment: ShareCommitment,
    ) -> Result<BlobProof, ClientError>;

    async fn included(
        &self,
        height: u64,
        namespace: Namespace,
        proof: BlobProof,
        commitment: ShareCommitment,
    ) -> Result<bool, ClientError>;
}

#[async_trait]
impl NodeClient for HttpClient {
    async fn submit(
        &self,
        blobs: Vec<WireBlob>,
        options: SubmitOptions,
    ) -> Result<u64, ClientError> {
        self.blob_submit(blobs, options).await
    }

    async fn get(
        &self,
        height: u64,
        namespace: Namespace,
        commitment: ShareCommitment,
    ) -> Result<WireBlob, ClientError> {
        self.blob_get(height, namespace, commitment).await
    }

    async fn get_all(
        &self,
        height: u64,
        namespaces: Vec<Namespace>,
    ) -> Result<Vec<WireBlob>, ClientError> {
        Ok(self
            .blob_get_all(height, namespaces)
            .await?
            .unwrap_or_default())
    }

    async fn get_proof(
        &self,
        height: u64,
        namespace: Namespace,
        commitment: ShareCommitment,
    ) -> Result<BlobProof, ClientError> {
        self.blob_get_proof(height, namespace, commitment).await
    }

    async fn included(
        &self,
        height: u64,
        namespace: Namespace,
        proof: BlobProof,
        commitment: ShareCommitment,
    ) -> Result<bool, ClientError> {
        self.blob_included(height, namespace, proof, commitment)
            .await
    }
}

/// Returns whether the node reported that the requested blob does not exist.
#[must_use]
pub fn is_blob_not_found(error: &ClientError) -> bool {
    call_error_contains(error, BLOB_NOT_FOUND)
}

/// Returns whether the node rejected a proof as not matching the commitment.
///
/// Nodes answer such inclusion checks with an error instead of `false`.
#[must_use]
pub fn is_invalid_proof(error: &ClientError) -> bool {
    call_error_contains(error, INVALID_PROOF)
}

fn call_error_contains(error: &ClientError, needle: &str) -> bool {
    matches!(error, ClientError::Call(object) if object.message().contains(needle))
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("the bearer token contains characters that are not allowed in an HTTP header")]
    InvalidBearerToken(#[source] http::header::InvalidHeaderValue),
    #[error("failed to construct the JSON-RPC client for endpoint `{endpoint}`")]
    Client {
        endpoint: String,
        #[source]
        source: ClientError,
    },
}

/// Builder for the HTTP JSON-RPC client talking to a Celestia node.
#[derive(Debug)]
pub struct NodeClientBuilder {
    endpoint: String,
    bearer_token: Option<String>,
    request_timeout: Duration,
}

impl NodeClientBuilder {
    #[must_use]
    pub fn new(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            bearer_token: None,
            request_timeout: Duration::from_secs(60),
        }
    }

    /// Sets the token sent as `Authorization: Bearer <token>`. Empty tokens are ignored.
    #[must_use]
    pub fn bearer_token(self, bearer_token: &str) -> Self {
        Self {
            bearer_token: (!bearer_token.is_empty()).then(|| bearer_token.to_string()),
            ..self
        }
    }

    #[must_use]
    pub fn request_timeout(self, request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            ..self
        }
    }

    /// Builds the client.
    ///
    /// The connection is established lazily on the first request.
    ///
    /// # Errors
    /// Returns an error if the bearer token is not a valid header value or if the endpoint is
    /// not a valid URL.
    pub fn build(self) -> Result<HttpClient, BuildError> {
        let Self {
            endpoint,
            bearer_token,
            request_timeout,
        } = self;
        let mut headers = HeaderMap::new();
        if let Some(bearer_token) = bearer_token {
            let value = HeaderValue::from_str(&format!("Bearer {bearer_token}"))
                .map_err(BuildError::InvalidBearerToken)?;
            headers.insert("Authorization", value);
        }
        HttpClientBuilder::default()
            .set_headers(headers)
            .request_timeout(request_timeout)
            .build(&endpoint)
            .map_err(|source| BuildError::Client {
                endpoint,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use jsonrpsee::types::ErrorObjectOwned;

    use super::*;

    fn call_error(message: &str) -> ClientError {
        ClientError::Call(ErrorObjectOwned::owned(1, message, None::<()>))
    }

    #[test]
    fn not_found_is_detected_in_call_errors_only() {
        assert!(is_blob_not_found(&call_error("getting blob: blob: not found")));
        assert!(!is_blob_not_found(&call_error("connection refused")));
        assert!(!is_blob_not_found(&ClientError::RequestTimeout));
    }

    #[test]
    fn invalid_proof_is_detected() {
        assert!(is_invalid_proof(&call_error("blob: invalid proof")));
        assert!(!is_invalid_proof(&call_error("blob: not found")));
    }

    #[test]
    fn invalid_bearer_token_is_rejected() {
        let error = NodeClientBuilder::new("http://127.0.0.1:26658")
            .bearer_token("line\nbreak")
            .build()
            .unwrap_err();
        assert!(matches!(error, BuildError::InvalidBearerToken(_)));
    }

    #[test]
    fn invalid_endpoint_is_rejected() {
        let error = NodeClientBuilder::new("not a url").build().unwrap_err();
        assert!(matches!(error, BuildError::Client { .. }));
    }

    #[tokio::test]
    async fn client_is_built_with_token() {
        NodeClientBuilder::new("http://127.0.0.1:26658")
            .bearer_token("secret")
            .request_timeout(Duration::from_secs(1))
            .build()
            .unwrap();
    }
}
