//! Entry point. Wires CLI -> Config -> Alpaca -> Wheel, and maps the outcome to an exit code.

mod alpaca_client;
mod cli;
mod config;
mod error;
mod occ;
mod report;
mod risk;
mod strategy;
mod types;
mod utils;
mod wheel;

use chrono::Local;
use clap::Parser;
use dotenvy::dotenv;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use crate::alpaca_client::AlpacaClient;
use crate::error::EXIT_BOOTSTRAP;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Args::parse();
    println!("{}", report::banner());

    // Load config & credentials
    let (opts, params, client) = match bootstrap(&args) {
        Ok(v) => v,
        Err(e) => {
            error!("startup failed: {:#}", e);
            return ExitCode::from(EXIT_BOOTSTRAP);
        }
    };

    match wheel::run(&client, &opts, &params, Local::now().date_naive()).await {
        Ok(outcome) => {
            let order = outcome.order();
            match &outcome {
                wheel::Outcome::Submitted { ack, .. } => info!(
                    id = %ack.id,
                    client_order_id = %ack.client_order_id,
                    status = %ack.status,
                    symbol = %order.symbol,
                    "order accepted"
                ),
                wheel::Outcome::DryRun(_) => {
                    info!(symbol = %order.symbol, limit_price = order.limit_price, "dry run finished")
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            println!("{}", report::failure(&e));
            error!("run aborted: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn bootstrap(
    args: &cli::Args,
) -> anyhow::Result<(wheel::RunOptions, config::WheelCfg, AlpacaClient)> {
    let cfg = config::AppConfig::load_or_default(&args.config)?;
    let mut params = cfg.wheel.clone();
    args.apply(&mut params);

    let creds = config::Credentials::from_env(args.paper_override())?;
    let client = AlpacaClient::new(&creds, &cfg.alpaca)?;

    let opts = wheel::RunOptions {
        symbol: args.symbol(),
        paper: client.is_paper,
        dry_run: args.dryrun,
        danger: args.danger,
        leap: args.leap,
    };
    info!(
        "Wheel params: delta_lte={}, must_earn={}, profit_multiple={}, dryrun={}, danger={}",
        params.delta_lte, params.must_earn, params.profit_multiple, opts.dry_run, opts.danger
    );
    Ok((opts, params, client))
}
