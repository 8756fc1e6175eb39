fn main() -> Result<(), Box<dyn std::error::Error>> {
    vergen::EmitBuilder::builder()
        .build_timestamp()
        .cargo_opt_level()
        .cargo_target_triple()
        .rustc_channel()
        .rustc_commit_hash()
        .rustc_host_triple()
        .rustc_semver()
        .emit()?;
    Ok(())
}
