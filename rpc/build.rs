fn main() -> Result<(), Box<dyn std::error::Error>> {
    let proto_file = "proto/ticket_service.proto";
    println!("cargo:rerun-if-changed={proto_file}");
    tonic_build::configure()
        .build_server(true)
        .build_client(false)
        .compile_protos(&[proto_file], &["proto"])?;
    Ok(())
}
