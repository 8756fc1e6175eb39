use std::process::ExitCode;

use celestia_da::{
    telemetry::display,
    CelestiaDa,
    Config,
    BUILD_INFO,
};
use eyre::{
    eyre,
    WrapErr as _,
};
use tokio::{
    select,
    signal::unix::{
        signal,
        SignalKind,
    },
};
use tracing::{
    error,
    info,
    instrument,
    warn,
};

#[tokio::main]
async fn main() -> ExitCode {
    eprintln!("{}", display::json(&BUILD_INFO));

    let cfg: Config = match Config::get() {
        Err(err) => {
            eprintln!("failed to read configuration:\n{err:?}");
            return ExitCode::FAILURE;
        }
        Ok(cfg) => cfg,
    };
    eprintln!("starting with configuration:\n{}", display::json(&cfg));

    let mut telemetry_conf = celestia_da::telemetry::configure()
        .set_force_stdout(cfg.force_stdout)
        .set_pretty_print(cfg.pretty_print)
        .set_filter_directives(&cfg.log);

    if !cfg.no_metrics {
        telemetry_conf =
            telemetry_conf.set_metrics(&cfg.metrics_http_listener_addr, env!("CARGO_PKG_NAME"));
    }

    let metrics = match telemetry_conf
        .try_init()
        .wrap_err("failed to setup telemetry")
    {
        Err(e) => {
            eprintln!("initializing celestia-da failed:\n{e:?}");
            return ExitCode::FAILURE;
        }
        Ok(metrics) => metrics,
    };

    info!(
        config = %display::json(&cfg),
        "initializing celestia-da"
    );

    let mut service = match CelestiaDa::spawn(cfg, metrics).await {
        Ok(service) => service,
        Err(error) => {
            error!(%error, "failed initializing celestia-da");
            return ExitCode::FAILURE;
        }
    };

    let mut sigterm = signal(SignalKind::terminate())
        .expect("setting a SIGTERM listener should always work on Unix");

    let exit_reason = select! {
        _ = sigterm.recv() => Ok("received SIGTERM"),
        res = tokio::signal::ctrl_c() => {
            res.map(|()| "received SIGINT").wrap_err("failed listening for SIGINT")
        }
        res = &mut service => {
            res.and_then(|()| Err(eyre!("celestia-da task exited unexpectedly")))
        }
    };

    shutdown(exit_reason, service).await
}

#[instrument(skip_all)]
async fn shutdown(reason: eyre::Result<&'static str>, mut service: CelestiaDa) -> ExitCode {
    let message = "shutting down";
    let exit_code = match reason {
        Ok(reason) => {
            info!(reason, message);
            if let Err(error) = service.shutdown().await {
                warn!(%error, "encountered errors during shutdown");
            };
            ExitCode::SUCCESS
        }
        Err(reason) => {
            error!(%reason, message);
            ExitCode::FAILURE
        }
    };
    info!("shutdown target reached");
    exit_code
}
