//! Command-line options for one wheel run.

use clap::Parser;
use std::path::PathBuf;

use crate::config::WheelCfg;
use crate::utils::sanitize_symbol;

/// Sell one cash-secured put or covered call on SYMBOL via Alpaca.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Underlying ticker, e.g. SMCI
    pub symbol: String,

    /// Only sell contracts with |delta| <= this
    #[arg(long, allow_negative_numbers = true)]
    pub delta_lte: Option<f64>,

    /// Minimum premium in USD for one contract
    #[arg(long)]
    pub must_earn: Option<f64>,

    /// Covered calls are struck at or above cost basis times this
    #[arg(long)]
    pub profit_multiple: Option<f64>,

    /// Use a long call LEAP as collateral (not supported yet)
    #[arg(long, default_value_t = false)]
    pub leap: bool,

    /// Force the paper account
    #[arg(long, default_value_t = false, conflicts_with = "live")]
    pub paper: bool,

    /// Force the live account
    #[arg(long, default_value_t = false)]
    pub live: bool,

    /// Do everything except submit the order
    #[arg(long, default_value_t = false)]
    pub dryrun: bool,

    /// Sell even with a short option already open on SYMBOL
    #[arg(long, default_value_t = false)]
    pub danger: bool,

    /// YAML config file; missing means defaults
    #[arg(long, default_value = "config.yaml")]
    pub config: PathBuf,
}

impl Args {
    /// `None` leaves the choice to `ALPACA_PAPER`.
    pub fn paper_override(&self) -> Option<bool> {
        match (self.paper, self.live) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }

    pub fn symbol(&self) -> String {
        sanitize_symbol(&self.symbol)
    }

    /// Command-line values win over the config file.
    pub fn apply(&self, cfg: &mut WheelCfg) {
        if let Some(v) = self.delta_lte {
            cfg.delta_lte = v;
        }
        if let Some(v) = self.must_earn {
            cfg.must_earn = v;
        }
        if let Some(v) = self.profit_multiple {
            cfg.profit_multiple = v;
        }
    }
}
