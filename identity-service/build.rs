use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_root = PathBuf::from("../proto");

    // Tell cargo to recompile if any proto files change
    println!("cargo:rerun-if-changed=../proto/sso/v1/");

    // Server for the service itself, client for integration tests and callers
    tonic_build::configure()
        .build_server(true)
        .build_client(true)
        .file_descriptor_set_path(
            PathBuf::from(std::env::var("OUT_DIR")?).join("sso_descriptor.bin"),
        )
        .compile_protos(&["../proto/sso/v1/sso.proto"], &[proto_root])?;

    Ok(())
}
