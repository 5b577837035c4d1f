//! vidshelf - live video catalog browser
//!
//! Loads a video catalog feed and answers search, lookup and category
//! queries through the live view model.
//!
//! # Usage
//!
//! ```bash
//! vidshelf --feed videos.json search "nature"
//! vidshelf categories --json
//! printf 'query cat\nquit\n' | vidshelf watch
//! ```

use clap::Parser;

use vidshelf::cli::{Cli, Command, ExitCode, Output};
use vidshelf::commands::{self, Session};
use vidshelf::config::Config;
use vidshelf::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    logging::init(config.log_filter.as_deref());

    let exit_code = run_cli(cli, config).await;
    std::process::exit(exit_code.into());
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli, config: Config) -> ExitCode {
    let output = Output::new(&cli);

    let session = match Session::open(config, cli.feed.as_deref(), &output).await {
        Ok(session) => session,
        Err(code) => return code,
    };

    match cli.command {
        Command::Search(cmd) => commands::search_cmd(cmd, &session, &output).await,

        Command::Video(cmd) => commands::video_cmd(cmd, &session, &output).await,

        Command::Category(cmd) => commands::category_cmd(cmd, &session, &output).await,

        Command::Categories => commands::categories_cmd(&session, &output).await,

        Command::Update(cmd) => commands::update_cmd(cmd, &session, &output).await,

        Command::Watch => commands::watch_cmd(&session, &output).await,
    }
}
