//! One pass of the wheel: snapshot the account, pick PUT or CALL, pick a contract, sell it.
//! Every gate short-circuits with a `WheelError`; the order is submitted at most once, last.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::alpaca_client::Broker;
use crate::config::WheelCfg;
use crate::error::WheelError;
use crate::report;
use crate::risk::RiskEngine;
use crate::strategy;
use crate::types::{LimitOrderRequest, SubmittedOrder};

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Upper-cased underlying symbol.
    pub symbol: String,
    pub paper: bool,
    pub dry_run: bool,
    /// Proceed despite an open short option on the underlying.
    pub danger: bool,
    /// Collateralize with a long call LEAP instead of cash. Accepted but not wired.
    pub leap: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    DryRun(LimitOrderRequest),
    Submitted {
        order: LimitOrderRequest,
        ack: SubmittedOrder,
    },
}

impl Outcome {
    pub fn order(&self) -> &LimitOrderRequest {
        match self {
            Outcome::DryRun(o) | Outcome::Submitted { order: o, .. } => o,
        }
    }
}

pub async fn run<B: Broker + ?Sized>(
    broker: &B,
    opts: &RunOptions,
    cfg: &WheelCfg,
    today: NaiveDate,
) -> Result<Outcome, WheelError> {
    if opts.leap {
        warn!("--leap is not supported yet; strike selection ignores it");
    }
    let risk = RiskEngine::new(cfg.must_earn, opts.danger);

    // Account & positions
    let account = broker.account().await?;
    println!("{}", report::account_overview(&account, opts.paper));
    let portfolio = broker.positions().await?;
    println!("{}", report::positions(&portfolio));

    // Asset
    println!("SELECTED ASSET: {}", opts.symbol);
    let asset = broker.asset(&opts.symbol).await?;
    risk.pre_check_positions(&portfolio, &asset.symbol)?;
    if !asset.tradable {
        warn!(symbol = %asset.symbol, status = %asset.status, "asset not tradable");
        return Err(WheelError::NotTradable {
            symbol: opts.symbol.clone(),
        });
    }

    let quote = broker.latest_quote(&opts.symbol).await?;

    // Shares already held decide the leg
    let position = match broker.open_position(&opts.symbol).await {
        Ok(p) => p,
        Err(e) => {
            warn!("position lookup for {} failed, assuming none: {}", opts.symbol, e);
            None
        }
    };
    if let Some(p) = &position {
        println!("{}", report::position_detail(p));
    }
    let mode = strategy::select_mode(position.as_ref());
    println!("{}", report::mode(mode));

    let bound = strategy::strike_bound(
        mode,
        quote.bid_price,
        quote.ask_price,
        Some(&account),
        position.as_ref(),
        cfg,
    )?;
    println!("{}", report::bid_ask(&opts.symbol, &quote, Some(&bound)));

    // Chain
    let request = strategy::chain_request(&asset.symbol, mode, bound, today, cfg);
    let chain = broker.option_chain(&request).await?;
    info!(contracts = chain.len(), "option chain retrieved, filtering acceptable contracts");

    let survivors = strategy::filter_candidates(&chain, cfg.delta_lte);
    println!("{}", report::option_chain(&survivors));
    let best = strategy::pick_best(&survivors)?;

    // Premium gate
    let limit_price = strategy::limit_price(best, cfg.limit_offset)?;
    let premium = risk.check_premium(limit_price)?;
    info!(symbol = %best.symbol, limit_price, premium, "candidate selected");

    let order = strategy::build_order(best, limit_price);
    println!("{}", report::order(&order));

    if opts.dry_run {
        println!("DRY RUN! No orders submitted");
        return Ok(Outcome::DryRun(order));
    }

    let ack = broker.submit_order(&order).await?;
    println!("Order Submitted! id: {}", ack.id);
    Ok(Outcome::Submitted { order, ack })
}
