//! Configuration of the service, read from the environment.
use std::time::Duration;

use figment::{
    providers::Env,
    Figment,
};
use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    celestia::{
        namespace,
        Namespace,
        NamespaceError,
    },
    fee::{
        FeeError,
        GasPrice,
    },
    server::ListenNetwork,
};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// The JSON-RPC endpoint of the Celestia node.
    pub celestia_node_endpoint: String,
    /// Bearer token for the Celestia node. Empty if the node does not require one.
    #[serde(skip_serializing)]
    pub celestia_node_auth_token: String,
    /// Hex encoded namespace id of at most 10 bytes.
    pub namespace: String,
    /// Default gas price in utia; negative leaves the fee to the node.
    pub gas_price: f64,
    pub request_timeout_ms: u64,
    pub listen_network: ListenNetwork,
    pub listen_address: String,
    /// Log level for the service.
    pub log: String,
    /// Forces writing trace data to stdout no matter if connected to a tty or not.
    pub force_stdout: bool,
    /// Writes a human readable format to stdout instead of JSON formatted logs.
    pub pretty_print: bool,
    /// Set to true to disable the metrics server
    pub no_metrics: bool,
    /// The endpoint which will be listened on for serving prometheus metrics
    pub metrics_http_listener_addr: String,
}

impl Config {
    pub const PREFIX: &'static str = "CELESTIA_DA_";

    /// Reads the config from environment variables prefixed with [`Config::PREFIX`].
    ///
    /// `RUST_LOG` is read as `log` as well, but is overridden by the prefixed variable.
    ///
    /// # Errors
    /// Returns an error if a variable is missing, unknown, or cannot be parsed.
    pub fn get() -> Result<Self, figment::Error> {
        Self::get_with_prefix(Self::PREFIX)
    }

    fn get_with_prefix(prefix: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Env::prefixed("RUST_").split("_").only(&["log"]))
            .merge(Env::prefixed(prefix))
            .extract()
    }

    /// The default namespace blobs are published under.
    ///
    /// # Errors
    /// Returns an error if the configured namespace is not a valid hex encoded namespace id.
    pub fn namespace(&self) -> Result<Namespace, NamespaceError> {
        namespace::from_hex_id(&self.namespace)
    }

    /// The default gas price, if set.
    ///
    /// # Errors
    /// Returns an error if the configured price is infinite.
    pub fn default_gas_price(&self) -> Result<Option<GasPrice>, FeeError> {
        GasPrice::from_sentinel(self.gas_price)
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
