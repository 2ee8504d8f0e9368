//! Demo driver of the ringlet simulation.

use clap::Parser;
use ringlet_node::logging::init_logging;
use ringlet_node::logging::LogLevel;
use ringlet_node::scenario;

#[derive(Parser, Debug)]
#[command(
    name = "ringlet",
    about = "Simulate a Chord ring: spawn nodes, route reads and writes, join and leave."
)]
struct Cli {
    /// Ring positions of the initial nodes.
    #[arg(long, value_delimiter = ',', default_value = "0,42,100,172")]
    nodes: Vec<u8>,

    /// Mailbox poll timeout in milliseconds.
    #[arg(long, default_value_t = ringlet_core::consts::POLL_INTERVAL_MS)]
    poll_interval_ms: u64,

    /// Print node reports as JSON instead of tables.
    #[arg(long)]
    json: bool,

    /// Log level.
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);
    scenario::run_demo(cli.nodes, cli.poll_interval_ms, cli.json).await
}
