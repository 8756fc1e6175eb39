use celestia_da::{
    server::{
        DaApiClient as _,
        ListenAddr,
        ListenNetwork,
    },
    telemetry,
    CelestiaDa,
    Config,
    Metrics,
};
use celestia_da_mock::MockCelestiaNode;
use jsonrpsee::http_client::{
    HttpClient,
    HttpClientBuilder,
};
use once_cell::sync::Lazy;

pub(crate) const NAMESPACE_ID: &str = "000008e5f679bf7116cb";

static TELEMETRY: Lazy<&'static Metrics> = Lazy::new(|| {
    if std::env::var_os("TEST_LOG").is_some() {
        let filter_directives = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
        telemetry::configure()
            .set_force_stdout(true)
            .set_pretty_print(true)
            .set_filter_directives(&filter_directives)
            .try_init()
            .unwrap()
    } else {
        telemetry::configure()
            .set_filter_directives("off")
            .try_init()
            .unwrap()
    }
});

pub(crate) fn metrics() -> &'static Metrics {
    *Lazy::force(&TELEMETRY)
}

pub(crate) fn make_config(celestia_node_endpoint: String) -> Config {
    Config {
        celestia_node_endpoint,
        celestia_node_auth_token: String::new(),
        namespace: NAMESPACE_ID.to_string(),
        gas_price: -1.0,
        request_timeout_ms: 5_000,
        listen_network: ListenNetwork::Tcp,
        listen_address: "127.0.0.1:0".to_string(),
        log: String::new(),
        force_stdout: false,
        pretty_print: false,
        no_metrics: true,
        metrics_http_listener_addr: String::new(),
    }
}

pub(crate) struct TestCelestiaDa {
    pub(crate) node: MockCelestiaNode,
    pub(crate) service: CelestiaDa,
    pub(crate) client: HttpClient,
}

impl TestCelestiaDa {
    pub(crate) async fn assert_serving(&self) {
        assert_eq!(
            celestia_da::celestia::MAX_BLOB_SIZE as u64,
            self.client.max_blob_size().await.unwrap()
        );
    }
}

/// Spawns a mock celestia node and the service connected to it, listening on TCP.
pub(crate) async fn spawn_celestia_da() -> TestCelestiaDa {
    let node = MockCelestiaNode::spawn().await.unwrap();
    spawn_celestia_da_with_node(node, |_| {}).await
}

pub(crate) async fn spawn_celestia_da_with_node(
    node: MockCelestiaNode,
    adjust_config: impl FnOnce(&mut Config),
) -> TestCelestiaDa {
    let mut config = make_config(node.endpoint());
    adjust_config(&mut config);
    let service = CelestiaDa::spawn(config, metrics()).await.unwrap();
    let ListenAddr::Tcp(addr) = service.local_addr() else {
        panic!("service must listen on TCP for the http client to connect");
    };
    let client = HttpClientBuilder::default()
        .build(format!("http://{addr}"))
        .unwrap();
    TestCelestiaDa {
        node,
        service,
        client,
    }
}
