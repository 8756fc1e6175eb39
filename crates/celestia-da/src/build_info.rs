use serde::Serialize;

/// Build information about this binary, captured at compile time.
#[derive(Debug, Serialize)]
pub struct BuildInfo {
    pub build_timestamp: &'static str,
    pub cargo_opt_level: &'static str,
    pub cargo_pkg_name: &'static str,
    pub cargo_pkg_version: &'static str,
    pub cargo_target_triple: &'static str,
    pub rustc_channel: &'static str,
    pub rustc_commit_hash: &'static str,
    pub rustc_host_triple: &'static str,
    pub rustc_semver: &'static str,
}

pub const BUILD_INFO: BuildInfo = BuildInfo {
    build_timestamp: env!("VERGEN_BUILD_TIMESTAMP"),
    cargo_opt_level: env!("VERGEN_CARGO_OPT_LEVEL"),
    cargo_pkg_name: env!("CARGO_PKG_NAME"),
    cargo_pkg_version: env!("CARGO_PKG_VERSION"),
    cargo_target_triple: env!("VERGEN_CARGO_TARGET_TRIPLE"),
    rustc_channel: env!("VERGEN_RUSTC_CHANNEL"),
    rustc_commit_hash: env!("VERGEN_RUSTC_COMMIT_HASH"),
    rustc_host_triple: env!("VERGEN_RUSTC_HOST_TRIPLE"),
    rustc_semver: env!("VERGEN_RUSTC_SEMVER"),
};
