pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ebtel")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Kernel telemetry aggregation agent with Prometheus text export", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the aggregation loop and export metrics to stdout")]
    Run {
        #[arg(short, long, help = "YAML configuration file")]
        config: Option<PathBuf>,

        #[arg(short, long, help = "Export interval in seconds")]
        interval: Option<u64>,

        #[arg(short, long, help = "Value of the node label")]
        node_name: Option<String>,

        #[arg(short, long, help = "Feed the pipeline from synthetic producers")]
        synthetic: bool,
    },
    #[command(about = "Print the effective configuration as YAML")]
    Config {
        #[arg(short, long, help = "YAML configuration file")]
        config: Option<PathBuf>,
    },
}
