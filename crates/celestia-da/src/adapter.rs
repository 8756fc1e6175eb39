//! A [`DataAvailability`] implementation backed by a Celestia node.
//!
//! The adapter turns opaque payloads into Celestia blobs under a namespace, submits them with a
//! fee derived from a gas price, and addresses them by the height they were included at together
//! with their share commitment (see [`crate::id`]).
//!
//! The adapter holds no mutable state: the default namespace and gas price are fixed at
//! construction and per-call overrides are only threaded through the call they were passed to.
//! All requests to the node are bounded by a deadline and abort early once the adapter's
//! shutdown token is cancelled. Batched reads send at most [`MAX_CONCURRENT_NODE_REQUESTS`]
//! requests at a time and answer in the order of the ids they were given.
use std::{
    future::Future,
    time::Duration,
};

use async_trait::async_trait;
use futures::{
    stream,
    StreamExt as _,
    TryStreamExt as _,
};
use jsonrpsee::core::ClientError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{
    debug,
    info,
    instrument,
};

use crate::{
    celestia::{
        blob,
        namespace,
        BlobProof,
        Namespace,
        ShareCommitment,
        ShareVersion,
        WireBlob,
        MAX_BLOB_SIZE,
    },
    da::{
        Blob,
        Commitment,
        DataAvailability,
        Id,
        Proof,
    },
    error::{
        EncodingError,
        Error,
    },
    fee::{
        self,
        GasPrice,
    },
    id::{
        make_id,
        split_id,
        HEIGHT_LEN,
    },
    node::{
        is_blob_not_found,
        is_invalid_proof,
        NodeClient,
    },
    telemetry::display,
    Metrics,
};


/// How long a single request to the node may take unless configured otherwise.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// The most requests a single batched call keeps in flight to the node.
pub const MAX_CONCURRENT_NODE_REQUESTS: usize = 16;

pub struct CelestiaAdapter<C> {
    client: C,
    namespace: Namespace,
    default_gas_price: Option<GasPrice>,
    request_timeout: Duration,
    shutdown_token: CancellationToken,
    metrics: &'static Metrics,
}

impl<C: NodeClient> CelestiaAdapter<C> {
    /// Creates an adapter publishing to `namespace` unless a call overrides it.
    ///
    /// Submissions without a gas price of their own use `default_gas_price`; if that is unset as
    /// well the node picks the fee.
    pub fn new(
        client: C,
        namespace: Namespace,
        default_gas_price: Option<GasPrice>,
        metrics: &'static Metrics,
    ) -> Self {
        Self {
            client,
            namespace,
            default_gas_price,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            shutdown_token: CancellationToken::new(),
            metrics,
        }
    }

    #[must_use]
    pub fn with_request_timeout(self, request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            ..self
        }
    }

    /// Cancelling `shutdown_token` fails all in-flight and future requests with
    /// [`Error::Cancelled`].
    #[must_use]
    pub fn with_shutdown_token(self, shutdown_token: CancellationToken) -> Self {
        Self {
            shutdown_token,
            ..self
        }
    }

    #[must_use]
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    fn resolve_namespace(&self, requested: Option<&[u8]>) -> Result<Namespace, EncodingError> {
        match requested {
            None | Some([]) => Ok(self.namespace),
            Some(raw) => Ok(namespace::from_raw(raw)?),
        }
    }

    /// Sends `request` to the node, racing it against the deadline and the shutdown token.
    ///
    /// The outer result carries cancellation and deadline errors, the inner one the node's
    /// answer so that callers can special case errors like missing blobs.
    async fn request<T, F>(
        &self,
        method: &'static str,
        request: F,
    ) -> Result<Result<T, ClientError>, Error>
    where
        F: Future<Output = Result<T, ClientError>>,
    {
        let start = Instant::now();
        let response = tokio::select! {
            biased;

            () = self.shutdown_token.cancelled() => Err(Error::Cancelled {
                method,
            }),
            response = tokio::time::timeout(self.request_timeout, request) => {
                response.map_err(|_| Error::DeadlineExceeded {
                    method,
                    timeout: self.request_timeout,
                })
            }
        };
        self.metrics.record_node_request(
            method,
            start.elapsed(),
            !matches!(response, Ok(Ok(_))),
        );
        response
    }

    fn node_error(
        &self,
        method: &'static str,
        height: u64,
        namespace: Namespace,
        source: ClientError,
    ) -> Error {
        if is_blob_not_found(&source) {
            Error::NotFound {
                height,
                namespace: display::hex(namespace.as_bytes()).to_string(),
                source,
            }
        } else {
            Error::from_client(method, self.request_timeout, source)
        }
    }
}

/// Splits every id up front so that no request is sent if any of them is malformed.
fn parse_ids(ids: &[Id]) -> Result<Vec<(u64, ShareCommitment)>, EncodingError> {
    ids.iter()
        .enumerate()
        .map(|(index, id)| {
            let len = id.as_bytes().len();
            if len <= HEIGHT_LEN {
                return Err(EncodingError::MalformedId {
                    index,
                    len,
                });
            }
            let (height, commitment) = split_id(id.as_bytes());
            let commitment = blob::commitment_from_slice(commitment).ok_or(
                EncodingError::MalformedCommitment {
                    index,
                    len: commitment.len(),
                },
            )?;
            Ok((height, commitment))
        })
        .collect()
}

/// Transcodes all payloads into wire blobs, failing the whole batch on the first bad payload.
fn to_wire_blobs(namespace: Namespace, blobs: &[Blob]) -> Result<Vec<WireBlob>, EncodingError> {
    blobs
        .iter()
        .enumerate()
        .map(|(index, blob)| {
            ShareVersion::V0
                .new_blob(namespace, blob.0.clone())
                .map_err(|source| EncodingError::Blob {
                    index,
                    source,
                })
        })
        .collect()
}

#[async_trait]
impl<C: NodeClient> DataAvailability for CelestiaAdapter<C> {
    async fn max_blob_size(&self) -> Result<u64, Error> {
        Ok(MAX_BLOB_SIZE as u64)
    }

    #[instrument(skip_all, fields(id_count = ids.len()), err)]
    async fn get(&self, ids: &[Id], namespace: Option<&[u8]>) -> Result<Vec<Blob>, Error> {
        const METHOD: &str = "blob.Get";
        let namespace = self.resolve_namespace(namespace)?;
        let ids = parse_ids(ids)?;
        stream::iter(ids)
            .map(|(height, commitment)| async move {
                match self
                    .request(METHOD, self.client.get(height, namespace, commitment))
                    .await?
                {
                    Ok(blob) => Ok(Blob(blob.data)),
                    Err(source) => Err(self.node_error(METHOD, height, namespace, source)),
                }
            })
            .buffered(MAX_CONCURRENT_NODE_REQUESTS)
            .try_collect()
            .await
    }

    #[instrument(skip(self, namespace), err)]
    async fn get_ids(&self, height: u64, namespace: Option<&[u8]>) -> Result<Vec<Id>, Error> {
        const METHOD: &str = "blob.GetAll";
        let namespace = self.resolve_namespace(namespace)?;
        match self
            .request(METHOD, self.client.get_all(height, vec![namespace]))
            .await?
        {
            Ok(blobs) => Ok(blobs
                .iter()
                .map(|blob| make_id(height, &blob.commitment.0))
                .collect()),
            Err(source) if is_blob_not_found(&source) => {
                debug!("no blobs at height");
                Ok(Vec::new())
            }
            Err(source) => Err(Error::from_client(METHOD, self.request_timeout, source)),
        }
    }

    #[instrument(skip_all, fields(id_count = ids.len()), err)]
    async fn get_proofs(
        &self,
        ids: &[Id],
        namespace: Option<&[u8]>,
    ) -> Result<Vec<Proof>, Error> {
        const METHOD: &str = "blob.GetProof";
        let namespace = self.resolve_namespace(namespace)?;
        let ids = parse_ids(ids)?;
        stream::iter(ids.into_iter().enumerate())
            .map(|(index, (height, commitment))| async move {
                let proof = match self
                    .request(METHOD, self.client.get_proof(height, namespace, commitment))
                    .await?
                {
                    Ok(proof) => proof,
                    Err(source) => return Err(self.node_error(METHOD, height, namespace, source)),
                };
                let bytes = proof.to_bytes().map_err(|source| EncodingError::ProofEncoding {
                    index,
                    source,
                })?;
                Ok(Proof(bytes))
            })
            .buffered(MAX_CONCURRENT_NODE_REQUESTS)
            .try_collect()
            .await
    }

    #[instrument(skip_all, fields(blob_count = blobs.len()), err)]
    async fn commit(
        &self,
        blobs: &[Blob],
        namespace: Option<&[u8]>,
    ) -> Result<Vec<Commitment>, Error> {
        let namespace = self.resolve_namespace(namespace)?;
        let commitments = blobs
            .iter()
            .enumerate()
            .map(|(index, blob)| {
                blob::commit(namespace, blob.as_bytes())
                    .map(|commitment| Commitment(commitment.0.to_vec()))
                    .map_err(|source| EncodingError::Blob {
                        index,
                        source,
                    })
            })
            .collect::<Result<_, _>>()?;
        Ok(commitments)
    }

    #[instrument(skip(self, blobs, namespace), fields(blob_count = blobs.len()), err)]
    async fn submit(
        &self,
        blobs: &[Blob],
        gas_price: f64,
        namespace: Option<&[u8]>,
    ) -> Result<Vec<Id>, Error> {
        const METHOD: &str = "blob.Submit";
        if blobs.is_empty() {
            return Ok(Vec::new());
        }
        let namespace = self.resolve_namespace(namespace)?;
        let per_call_price = GasPrice::from_sentinel(gas_price).map_err(EncodingError::from)?;
        let price = fee::resolve_gas_price(per_call_price, self.default_gas_price);

        let wire_blobs = to_wire_blobs(namespace, blobs)?;
        let commitments: Vec<_> = wire_blobs.iter().map(|blob| blob.commitment).collect();
        let options = fee::submit_options(price, wire_blobs.iter().map(|blob| blob.data.len()))
            .map_err(EncodingError::from)?;

        let start = Instant::now();
        let height = match self
            .request(METHOD, self.client.submit(wire_blobs, options))
            .await
        {
            Ok(Ok(height)) => height,
            Ok(Err(source)) => {
                self.metrics.increment_failed_submissions();
                return Err(Error::from_client(METHOD, self.request_timeout, source));
            }
            Err(error) => {
                self.metrics.increment_failed_submissions();
                return Err(error);
            }
        };
        self.metrics.record_submission_latency(start.elapsed());
        self.metrics.increment_submitted_blobs(commitments.len());
        self.metrics.set_submission_height(height);

        info!(
            height,
            namespace = %display::hex(namespace.as_bytes()),
            gas_price = price.map(GasPrice::get),
            fee = options.fee,
            gas_limit = options.gas_limit,
            "submitted blobs to celestia",
        );
        Ok(commitments
            .iter()
            .map(|commitment| make_id(height, &commitment.0))
            .collect())
    }

    #[instrument(skip_all, fields(id_count = ids.len()), err)]
    async fn validate(
        &self,
        ids: &[Id],
        proofs: &[Proof],
        namespace: Option<&[u8]>,
    ) -> Result<Vec<bool>, Error> {
        const METHOD: &str = "blob.Included";
        if ids.len() != proofs.len() {
            return Err(EncodingError::LengthMismatch {
                ids: ids.len(),
                proofs: proofs.len(),
            }
            .into());
        }
        let namespace = self.resolve_namespace(namespace)?;
        let ids = parse_ids(ids)?;
        let proofs = proofs
            .iter()
            .enumerate()
            .map(|(index, proof)| {
                BlobProof::from_bytes(proof.as_bytes()).map_err(|source| {
                    EncodingError::MalformedProof {
                        index,
                        source,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        stream::iter(ids.into_iter().zip(proofs))
            .map(|((height, commitment), proof)| async move {
                match self
                    .request(
                        METHOD,
                        self.client.included(height, namespace, proof, commitment),
                    )
                    .await?
                {
                    Ok(included) => Ok(included),
                    Err(source) if is_invalid_proof(&source) => {
                        debug!(height, "node rejected proof as not matching the commitment");
                        Ok(false)
                    }
                    Err(source) => Err(self.node_error(METHOD, height, namespace, source)),
                }
            })
            .buffered(MAX_CONCURRENT_NODE_REQUESTS)
            .try_collect()
            .await
    }
}
