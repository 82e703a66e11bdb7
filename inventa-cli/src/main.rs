//! inventa -- software discovery command-line tool

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::CliError;
use output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "error:".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    // 설정 파일 오류는 각 명령이 보고하므로 로깅은 기본값으로 대체
    let general = commands::load_config(&cli.config)
        .await
        .map(|config| config.general)
        .unwrap_or_default();
    let general = logging::with_overrides(
        general,
        cli.log_level.as_deref(),
        cli.log_format.as_deref(),
    );
    logging::init_tracing(&general).map_err(|e| CliError::Config(e.to_string()))?;

    let writer = OutputWriter::new(cli.output);

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, &cli.config, &writer).await,
        Commands::Library(args) => commands::library::execute(args, &cli.config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    }
}
