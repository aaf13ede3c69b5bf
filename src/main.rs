use clap::Parser;
use routeweave::cli::{run_cli, Cli};
use routeweave::logging::{init_logging_with_config, LogConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig {
        log_level: cli.log_level.clone(),
        ..LogConfig::from_env()
    };
    init_logging_with_config(&log_config)?;

    run_cli(&cli)
}
