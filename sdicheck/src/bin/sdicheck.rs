use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser as _;
use log::log_enabled;
use sdicheck::SdiCheckResult;
use sdicheck::args::Args;
use sdicheck::config::{Config, read_config};
use sdicheck::logging::{LOG_FORMAT_VAR, ensure_core_log_level_matches, init_tracing};
use sdicheck::run_check;
use sdicheck_core::Logger;
use sdicheck_core::config::env::OsEnv;
use sdicheck_core::http::ReqwestHttpClient;
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");

async fn start(args: Args) -> SdiCheckResult<()> {
    info!("Starting sdicheck v{VERSION}");

    let env = OsEnv::default();
    let logger = Logger::current();
    let mut config = if let Some(ref cfg_filename) = args.meta.config {
        info!("Using {}", cfg_filename.display());
        read_config(cfg_filename, &env)?
    } else {
        Config::default()
    };

    let save_config = args.meta.save_config.clone();
    let json = args.meta.json;
    args.meta.merge_into_config(&mut config);
    config.finalize()?;

    if let Some(file_name) = save_config {
        config.save_to_file(file_name.as_path())?;
    }

    let http = Arc::new(ReqwestHttpClient::new(config.http_config(&env, &logger)?)?);
    let report = run_check(&args.command, &config, http, &logger).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let filter = ensure_core_log_level_matches(env::var("RUST_LOG").ok());
    init_tracing(&filter, env::var(LOG_FORMAT_VAR).ok());

    let args = Args::parse();
    if let Err(e) = start(args).await {
        // Ensure the message is printed, even if the logging is disabled
        if log_enabled!(log::Level::Error) {
            error!("{e}");
        } else {
            eprintln!("{e}");
        }
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
