//! haccp-plan CLI entry point.

use clap::Parser;

use haccp_plan::cli::commands::{calendar, init, plan, record, reference, task};
use haccp_plan::cli::{handle_error, AppContext, Cli, Commands};
use haccp_plan::infrastructure::config::ConfigLoader;
use haccp_plan::infrastructure::logging::{LogConfig, LoggerImpl};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        handle_error(err, json);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if std::env::var_os("NO_COLOR").is_some() {
        console::set_colors_enabled(false);
    }

    let config = ConfigLoader::load()?;
    let _logger = LoggerImpl::init(&LogConfig::from(&config.logging))?;

    let json = cli.json;
    match cli.command {
        Commands::Init(args) => init::execute(args, json).await,
        Commands::Task(args) => task::execute(args, &AppContext::open(&config).await?, json).await,
        Commands::Plan(args) => plan::execute(args, &AppContext::open(&config).await?, json).await,
        Commands::Record(args) => record::execute(args, &AppContext::open(&config).await?, json).await,
        Commands::Calendar(args) => calendar::execute(args, &AppContext::open(&config).await?, json).await,
        Commands::Reference(args) => reference::execute(args, &AppContext::open(&config).await?, json).await,
    }
}
