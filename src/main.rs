//! CLI entry point
//!
//! Post-processes a PackNet ONNX export in place so the TensorRT parser can
//! map its upsample and group-normalization subgraphs onto custom plugins.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use packnet_onnx::io::{post_process_file, PostProcessOptions};
use packnet_onnx::DEFAULT_OPSET;

#[derive(Parser, Debug)]
#[command(
    name = "packnet-convert",
    version,
    about = "Rewrites a PackNet ONNX export to use TensorRT plugin nodes"
)]
struct Args {
    /// Path to the exported ONNX model; rewritten in place
    #[arg(short, long, default_value = "model.onnx")]
    output: PathBuf,

    /// ONNX opset the model was exported with
    #[arg(short = 'p', long, default_value_t = DEFAULT_OPSET)]
    opset: i64,

    /// Enable verbose logging of the rewrite passes
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let options = PostProcessOptions {
        opset: args.opset,
        ..Default::default()
    };

    match post_process_file(&args.output, &options) {
        Ok(stats) => {
            println!(
                "Saved the rewritten model to {} ({} -> {} nodes)",
                args.output.display(),
                stats.original_nodes,
                stats.final_nodes
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
