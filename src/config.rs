//! Load runtime configuration (YAML) and resolve Alpaca credentials from the environment.

use anyhow::{bail, Context};
use serde::Deserialize;
use std::{fs, path::Path};
use tracing::info;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AlpacaCfg {
    pub paper_url: String,
    pub live_url: String,
    pub data_url: String,
    pub timeout_sec: u64,
    pub options_feed: String, // "indicative" or "opra"
}

impl Default for AlpacaCfg {
    fn default() -> Self {
        Self {
            paper_url: "https://paper-api.alpaca.markets".to_string(),
            live_url: "https://api.alpaca.markets".to_string(),
            data_url: "https://data.alpaca.markets".to_string(),
            timeout_sec: 15,
            options_feed: "indicative".to_string(),
        }
    }
}

/// Strategy knobs. CLI options override these per run.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct WheelCfg {
    /// Sell only contracts with |delta| <= this.
    pub delta_lte: f64,
    /// Minimum premium in USD per contract.
    pub must_earn: f64,
    /// Calls are struck at or above cost basis/share times this.
    pub profit_multiple: f64,
    pub expiry_days: i64,
    pub chain_limit: u32,
    /// Shaved off the bid to build the limit price.
    pub limit_offset: f64,
    /// PUT strike cap as a fraction of the underlying bid.
    pub put_discount: f64,
    /// CALL strike floor as a multiple of the underlying ask (no cost basis known).
    pub call_markup: f64,
}

impl Default for WheelCfg {
    fn default() -> Self {
        Self {
            delta_lte: 0.31,
            must_earn: 100.0,
            profit_multiple: 1.0,
            expiry_days: 7,
            chain_limit: 100,
            limit_offset: 0.02,
            put_discount: 0.95,
            call_markup: 1.05,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub alpaca: AlpacaCfg,
    pub wheel: WheelCfg,
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let s = fs::read_to_string(path)?;
        let cfg: Self = serde_yaml::from_str(&s)?;
        Ok(cfg)
    }

    /// Like `load`, but a missing file means all defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config file at {}; using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path).with_context(|| format!("load config {}", path.display()))
    }
}

/// API key pair for one Alpaca environment.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
    pub paper: bool,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &crate::utils::mask_key(&self.api_key))
            .field("paper", &self.paper)
            .finish()
    }
}

impl Credentials {
    pub fn from_env(paper: Option<bool>) -> anyhow::Result<Self> {
        Self::resolve(paper, |k| std::env::var(k).ok())
    }

    /// `paper = None` defers to `ALPACA_PAPER` (unset means paper).
    pub fn resolve(
        paper: Option<bool>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let paper = paper.unwrap_or_else(|| {
            first_of(&lookup, &["ALPACA_PAPER", "ALPACA-PAPER"])
                .map(|v| parse_flag(&v))
                .unwrap_or(true)
        });

        let (key_names, secret_names): (&[&str], &[&str]) = if paper {
            (
                &["PAPER_ALPACA_API_KEY", "PAPER-ALPACA-API-KEY"],
                &["PAPER_ALPACA_SECRET_KEY", "PAPER-ALPACA-SECRET-KEY"],
            )
        } else {
            (
                &["ALPACA_API_KEY", "ALPACA-API-KEY"],
                &["ALPACA_SECRET_KEY", "ALPACA-SECRET-KEY"],
            )
        };

        let api_key = first_of(&lookup, key_names)
            .with_context(|| format!("{} required", key_names[0]))?;
        let secret_key = first_of(&lookup, secret_names)
            .with_context(|| format!("{} required", secret_names[0]))?;
        if api_key.trim().is_empty() || secret_key.trim().is_empty() {
            bail!("empty Alpaca credentials for {} mode", if paper { "paper" } else { "live" });
        }

        Ok(Self {
            api_key,
            secret_key,
            paper,
        })
    }
}

fn first_of(lookup: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| lookup(*k))
}

/// Env-style boolean: "0", "false", "no", "off" (any case) are false, everything else true.
pub fn parse_flag(s: &str) -> bool {
    !matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "0" | "false" | "no" | "off"
    )
}
