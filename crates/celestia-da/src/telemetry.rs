//! Initialization of tracing and metrics.
//!
//! # Examples
//! ```no_run
//! # async fn run() {
//! let metrics = celestia_da::telemetry::configure()
//!     .set_filter_directives("info")
//!     .try_init()
//!     .expect("must be able to initialize telemetry");
//! tracing::info!("telemetry initialized");
//! # }
//! ```
pub mod display;

use std::{
    io::IsTerminal as _,
    net::SocketAddr,
};

use metrics_exporter_prometheus::{
    BuildError,
    Matcher,
    PrometheusBuilder,
};
use tracing_subscriber::{
    filter::{
        LevelFilter,
        ParseError,
    },
    layer::SubscriberExt as _,
    util::{
        SubscriberInitExt as _,
        TryInitError,
    },
    EnvFilter,
};

use crate::{
    metrics::{
        NODE_REQUEST_DURATION,
        NODE_REQUEST_DURATION_BUCKETS,
        SUBMISSION_LATENCY,
        SUBMISSION_LATENCY_BUCKETS,
    },
    Metrics,
};

/// The errors that can occur when initializing telemetry.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Error(ErrorKind);

impl Error {
    fn filter_directives(source: ParseError) -> Self {
        Self(ErrorKind::FilterDirectives(source))
    }

    fn init_subscriber(source: TryInitError) -> Self {
        Self(ErrorKind::InitSubscriber(source))
    }

    fn metrics_address(address: String, source: std::net::AddrParseError) -> Self {
        Self(ErrorKind::MetricsAddress {
            address,
            source,
        })
    }

    fn metrics_exporter(source: BuildError) -> Self {
        Self(ErrorKind::MetricsExporter(source))
    }
}

#[derive(Debug, thiserror::Error)]
enum ErrorKind {
    #[error("failed to parse filter directives")]
    FilterDirectives(#[source] ParseError),
    #[error("failed installing global tracing subscriber")]
    InitSubscriber(#[source] TryInitError),
    #[error("failed to parse metrics listener address `{address}`")]
    MetricsAddress {
        address: String,
        #[source]
        source: std::net::AddrParseError,
    },
    #[error("failed installing the prometheus metrics exporter")]
    MetricsExporter(#[source] BuildError),
}

#[must_use = "telemetry must be initialized to be useful"]
pub fn configure() -> Config {
    Config::new()
}

struct MetricsConfig {
    listening_addr: String,
    service_name: String,
}

pub struct Config {
    filter_directives: String,
    force_stdout: bool,
    pretty_print: bool,
    metrics: Option<MetricsConfig>,
}

impl Config {
    fn new() -> Self {
        Self {
            filter_directives: String::new(),
            force_stdout: false,
            pretty_print: false,
            metrics: None,
        }
    }

    #[must_use = "telemetry must be initialized to be useful"]
    pub fn set_filter_directives(mut self, filter_directives: &str) -> Self {
        self.filter_directives = filter_directives.to_string();
        self
    }

    #[must_use = "telemetry must be initialized to be useful"]
    pub fn set_force_stdout(mut self, force_stdout: bool) -> Self {
        self.force_stdout = force_stdout;
        self
    }

    #[must_use = "telemetry must be initialized to be useful"]
    pub fn set_pretty_print(mut self, pretty_print: bool) -> Self {
        self.pretty_print = pretty_print;
        self
    }

    /// Serves Prometheus metrics on `listening_addr`, labelled with `service_name`.
    #[must_use = "telemetry must be initialized to be useful"]
    pub fn set_metrics(mut self, listening_addr: &str, service_name: &str) -> Self {
        self.metrics = Some(MetricsConfig {
            listening_addr: listening_addr.to_string(),
            service_name: service_name.to_string(),
        });
        self
    }

    /// Initialize telemetry, consuming the config.
    ///
    /// Must be called from within a tokio runtime if metrics are enabled.
    ///
    /// # Errors
    /// Fails if the filter directives could not be parsed, if the global tracing subscriber
    /// could not be installed, or if the metrics exporter could not be started.
    pub fn try_init(self) -> Result<&'static Metrics, Error> {
        let Self {
            filter_directives,
            force_stdout,
            pretty_print,
            metrics,
        } = self;

        let env_filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .parse(filter_directives)
            .map_err(Error::filter_directives)?;

        let mut pretty_printer = None;
        let mut json_printer = None;
        if force_stdout || std::io::stdout().is_terminal() {
            if pretty_print {
                pretty_printer = Some(tracing_subscriber::fmt::layer().compact());
            } else {
                json_printer = Some(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(false),
                );
            }
        }
        tracing_subscriber::registry()
            .with(pretty_printer)
            .with(json_printer)
            .with(env_filter)
            .try_init()
            .map_err(Error::init_subscriber)?;

        if let Some(MetricsConfig {
            listening_addr,
            service_name,
        }) = metrics
        {
            let addr: SocketAddr = listening_addr
                .parse()
                .map_err(|source| Error::metrics_address(listening_addr.clone(), source))?;
            PrometheusBuilder::new()
                .with_http_listener(addr)
                .add_global_label("service", service_name)
                .set_buckets_for_metric(
                    Matcher::Full(SUBMISSION_LATENCY.to_string()),
                    SUBMISSION_LATENCY_BUCKETS,
                )
                .map_err(Error::metrics_exporter)?
                .set_buckets_for_metric(
                    Matcher::Full(NODE_REQUEST_DURATION.to_string()),
                    NODE_REQUEST_DURATION_BUCKETS,
                )
                .map_err(Error::metrics_exporter)?
                .install()
                .map_err(Error::metrics_exporter)?;
        }

        // Handles are bound to the recorder installed at the time of registration.
        Ok(Box::leak(Box::new(Metrics::register())))
    }
}
