mod cli;
mod commands;
mod paths;

use std::fs;
use std::fs::File;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::error;
use simplelog::Config;
use simplelog::LevelFilter;
use simplelog::WriteLogger;
use ticketdesk_lib::TicketDeskClient;
use ticketdesk_lib::auth::RefreshCookiePolicy;
use ticketdesk_lib::auth::SqliteTokenStore;

use crate::cli::Cli;
use crate::commands::PromptLogin;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("fatal: {:#}", e);
            eprintln!("error: {:#}", e);
            let expired = e
                .downcast_ref::<ticketdesk_lib::error::Error>()
                .is_some_and(|e| e.is_session_expired());
            if expired { ExitCode::from(2) } else { ExitCode::FAILURE }
        }
    }
}

/// Logs to `latest.log` in the cache directory. Logging is skipped if the
/// directory cannot be determined or created.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    paths::rotate_logs();

    let Some(path) = paths::log_file() else { return };
    if let Some(dir) = path.parent() {
        if fs::create_dir_all(dir).is_err() {
            return;
        }
    }
    let Ok(file) = File::create(&path) else { return };
    let _ = WriteLogger::init(level, Config::default(), file);
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let data_dir = cli
        .data_dir
        .or_else(paths::data_dir)
        .context("could not determine a data directory, pass --data-dir")?;
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("failed to create {}", data_dir.display()))?;

    let store = SqliteTokenStore::open(paths::session_db(&data_dir), cli.url.as_str())
        .context("failed to open the session database")?
        .with_policy(RefreshCookiePolicy::default().secure(!cli.allow_insecure_refresh));

    let client = TicketDeskClient::builder()
        .url(cli.url.as_str())
        .token_store(store)
        .login_redirect(PromptLogin)
        .timeout(Duration::from_secs(cli.timeout))
        .build()?;

    commands::run(&client, cli.command, cli.json).await
}
