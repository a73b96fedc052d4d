// Build script for identity-service
// Compiles qaengine.proto for gRPC server and client code generation
fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed=../proto/services/qaengine.proto");

    // protoc ships with protoc-bin-vendored, along with the well-known types
    std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    let well_known = protoc_bin_vendored::include_path()?;

    // identity-service PROVIDES AuthService and UserService
    // Client code is also generated for integration tests
    tonic_build::configure()
        .compile_well_known_types(false)
        .extern_path(".google.protobuf.Timestamp", "::prost_types::Timestamp")
        .build_server(true)
        .build_client(true)
        .compile_protos(
            &["../proto/services/qaengine.proto"],
            &[std::path::Path::new("../proto/services"), well_known.as_path()],
        )?;

    Ok(())
}
