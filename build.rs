//! Compiles the ONNX protobuf schema subset into Rust types via prost-build.

use std::env;
use std::path::PathBuf;

const ONNX_PROTO: &str = "proto/onnx.proto";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed={ONNX_PROTO}");
    println!("cargo:rerun-if-changed=build.rs");

    let mut config = prost_build::Config::new();
    // BTreeMap keeps generated map fields deterministically ordered
    config.btree_map(["."]);
    config.out_dir(PathBuf::from(env::var("OUT_DIR")?));
    config.compile_protos(&[ONNX_PROTO], &["proto/"])?;

    Ok(())
}
