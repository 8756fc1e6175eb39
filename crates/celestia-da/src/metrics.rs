use std::{
    collections::HashMap,
    time::Duration,
};

use metrics::{
    counter,
    describe_counter,
    describe_gauge,
    describe_histogram,
    gauge,
    histogram,
    Counter,
    Gauge,
    Histogram,
    Unit,
};
use tracing::error;

const METHOD_LABEL: &str = "method";

/// The node methods the adapter sends requests for.
pub(crate) const NODE_METHODS: &[&str] = &[
    "blob.Submit",
    "blob.Get",
    "blob.GetAll",
    "blob.GetProof",
    "blob.Included",
];

/// Handles to all metrics emitted by the adapter.
///
/// Constructed once after the metrics recorder is installed and handed to the components that
/// need it. If no recorder is installed all handles are no-ops.
pub struct Metrics {
    submitted_blobs: Counter,
    failed_submissions: Counter,
    submission_latency: Histogram,
    submission_height: Gauge,
    node_requests: HashMap<&'static str, NodeRequestMetrics>,
}

struct NodeRequestMetrics {
    requests: Counter,
    failures: Counter,
    duration: Histogram,
}

impl Metrics {
    #[must_use]
    pub fn register() -> Self {
        describe_counter!(
            SUBMITTED_BLOBS,
            Unit::Count,
            "The number of blobs successfully submitted to the celestia node"
        );
        describe_counter!(
            FAILED_SUBMISSIONS,
            Unit::Count,
            "The number of blob submissions that failed"
        );
        describe_histogram!(
            SUBMISSION_LATENCY,
            Unit::Seconds,
            "The time it takes to submit blobs to the celestia node"
        );
        describe_gauge!(
            SUBMISSION_HEIGHT,
            Unit::Count,
            "The celestia height of the last successful submission"
        );

        Self {
            submitted_blobs: counter!(SUBMITTED_BLOBS),
            failed_submissions: counter!(FAILED_SUBMISSIONS),
            submission_latency: histogram!(SUBMISSION_LATENCY),
            submission_height: gauge!(SUBMISSION_HEIGHT),
            node_requests: register_node_requests(),
        }
    }

    pub(crate) fn increment_submitted_blobs(&self, count: usize) {
        self.submitted_blobs.increment(count as u64);
    }

    pub(crate) fn increment_failed_submissions(&self) {
        self.failed_submissions.increment(1);
    }

    pub(crate) fn record_submission_latency(&self, latency: Duration) {
        self.submission_latency.record(latency.as_secs_f64());
    }

    #[allow(
        clippy::cast_precision_loss,
        reason = "heights stay well below 2^52 for the foreseeable future"
    )]
    pub(crate) fn set_submission_height(&self, height: u64) {
        self.submission_height.set(height as f64);
    }

    /// Records a finished request for `method` to the node.
    pub(crate) fn record_node_request(&self, method: &str, duration: Duration, failed: bool) {
        let Some(handles) = self.node_requests.get(method) else {
            error!(method, "no metrics registered for node method");
            return;
        };
        handles.requests.increment(1);
        handles.duration.record(duration.as_secs_f64());
        if failed {
            handles.failures.increment(1);
        }
    }
}

fn register_node_requests() -> HashMap<&'static str, NodeRequestMetrics> {
    describe_counter!(
        NODE_REQUESTS,
        Unit::Count,
        "The number of requests sent to the celestia node, labelled by method"
    );
    describe_counter!(
        FAILED_NODE_REQUESTS,
        Unit::Count,
        "The number of requests to the celestia node that failed, labelled by method"
    );
    describe_histogram!(
        NODE_REQUEST_DURATION,
        Unit::Seconds,
        "The time it takes the celestia node to answer a request, labelled by method"
    );

    NODE_METHODS
        .iter()
        .map(|&method| {
            let handles = NodeRequestMetrics {
                requests: counter!(NODE_REQUESTS, METHOD_LABEL => method),
                failures: counter!(FAILED_NODE_REQUESTS, METHOD_LABEL => method),
                duration: histogram!(NODE_REQUEST_DURATION, METHOD_LABEL => method),
            };
            (method, handles)
        })
        .collect()
}

// Buckets are configured explicitly so that latencies are exported as Prometheus histograms
// rather than summaries.
pub(crate) const SUBMISSION_LATENCY_BUCKETS: &[f64] = &[0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 40.0, 60.0];
pub(crate) const NODE_REQUEST_DURATION_BUCKETS: &[f64] =
    &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

pub const SUBMITTED_BLOBS: &str = "celestia_da_submitted_blobs";
pub const FAILED_SUBMISSIONS: &str = "celestia_da_failed_submissions";
pub const SUBMISSION_LATENCY: &str = "celestia_da_submission_latency";
pub const SUBMISSION_HEIGHT: &str = "celestia_da_submission_height";
pub const NODE_REQUESTS: &str = "celestia_da_node_requests";
pub const FAILED_NODE_REQUESTS: &str = "celestia_da_failed_node_requests";
pub const NODE_REQUEST_DURATION: &str = "celestia_da_node_request_duration";
