use clap::Parser;
use ferrous_orb_domain::{CacheConcurrency, CliOverrides};
use tracing::info;

mod bootstrap;
mod load;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "ferrous-orb")]
#[command(version = "0.1.0")]
#[command(about = "Ferrous ORB - connection cache load driver")]
struct Cli {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Worker threads per cache
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Operations per worker thread
    #[arg(short = 'n', long)]
    iterations: Option<usize>,

    /// Cache flavour for both caches (blocking, non_blocking)
    #[arg(long, value_parser = parse_concurrency)]
    concurrency: Option<CacheConcurrency>,

    /// TCP endpoint (host:port); repeatable. Without one, loopback
    /// endpoints are used.
    #[arg(short = 'e', long = "endpoint", value_name = "ADDR")]
    endpoints: Vec<String>,
}

fn parse_concurrency(s: &str) -> Result<CacheConcurrency, String> {
    s.parse()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cli_overrides = CliOverrides {
        log_level: cli.log_level,
        threads: cli.threads,
        iterations: cli.iterations,
        concurrency: cli.concurrency,
        endpoints: cli.endpoints,
    };

    let config = bootstrap::load_config(cli.config.as_deref(), cli_overrides)?;

    bootstrap::init_logging(&config);

    info!("Starting Ferrous ORB v{}", env!("CARGO_PKG_VERSION"));

    let outbound = load::run_outbound(&config)?;
    load::log_report("outbound", &outbound);

    let inbound = load::run_inbound(&config)?;
    load::log_report("inbound", &inbound);

    info!("Load run complete");
    Ok(())
}
