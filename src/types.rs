//! Core domain types for account snapshots, positions, quotes, option contracts and orders.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    UsEquity,
    UsOption,
    Crypto,
    #[serde(other)]
    Other,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::UsEquity => "us_equity",
            AssetClass::UsOption => "us_option",
            AssetClass::Crypto => "crypto",
            AssetClass::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionSide::Long => "long",
            PositionSide::Short => "short",
        }
    }
}

/// Option right. Also the wheel's mode for a run: sell a PUT until assigned, then a CALL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    Put,
    Call,
}

impl ContractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::Put => "put",
            ContractType::Call => "call",
        }
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account balances. Amounts are USD, sent by Alpaca as decimal strings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    #[serde(with = "rust_decimal::serde::str")]
    pub cash: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub buying_power: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub equity: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub last_equity: Decimal,
}

impl Account {
    /// Today's P/L: equity against the previous close.
    pub fn balance_change(&self) -> Decimal {
        self.equity - self.last_equity
    }
}

/// An open position. `qty_available <= qty` (shares held for open orders are unavailable).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub asset_class: AssetClass,
    pub side: PositionSide,
    #[serde(with = "rust_decimal::serde::str")]
    pub qty: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub qty_available: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub avg_entry_price: Decimal,
    /// Total cost of the lot.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub cost_basis: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::str")]
    pub unrealized_pl: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    pub symbol: String,
    pub tradable: bool,
    #[serde(default)]
    pub status: String,
}

/// Latest top-of-book for an underlying.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub bid_price: f64,
    pub ask_price: f64,
}

/// Only built for contracts that came with a delta.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OptionGreeks {
    pub delta: f64,
    pub gamma: f64,
    pub rho: f64,
    pub theta: f64,
    pub vega: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptionContract {
    /// OCC symbol, e.g. `AAPL240119P00190000`.
    pub symbol: String,
    pub underlying_symbol: String,
    pub contract_type: ContractType,
    pub strike_price: f64,
    pub expiration_date: NaiveDate,
    pub latest_quote: Option<Quote>,
    /// Absent for illiquid or unpriced contracts.
    pub greeks: Option<OptionGreeks>,
    pub implied_volatility: Option<f64>,
}

impl OptionContract {
    pub fn bid(&self) -> Option<f64> {
        self.latest_quote.map(|q| q.bid_price)
    }
}

/// Option chain keyed by contract symbol.
pub type OptionChain = BTreeMap<String, OptionContract>;

/// One-sided strike filter for the chain query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrikeBound {
    /// `strike_price_lte` (puts).
    Upper(f64),
    /// `strike_price_gte` (calls).
    Lower(f64),
}

impl StrikeBound {
    pub fn value(&self) -> f64 {
        match self {
            StrikeBound::Upper(v) | StrikeBound::Lower(v) => *v,
        }
    }
}

impl fmt::Display for StrikeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrikeBound::Upper(v) => write!(f, "<= {:.2}", v),
            StrikeBound::Lower(v) => write!(f, ">= {:.2}", v),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainRequest {
    pub underlying_symbol: String,
    pub status: AssetStatus,
    pub expiration_date_lte: NaiveDate,
    pub strike: StrikeBound,
    pub contract_type: ContractType,
    pub limit: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Day,
    Gtc,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PositionIntent {
    BuyToOpen,
    BuyToClose,
    SellToOpen,
    SellToClose,
}

/// Single-leg limit order. Built once per run and submitted at most once.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitOrderRequest {
    pub symbol: String,
    pub limit_price: f64,
    pub qty: u32,
    pub side: OrderSide,
    pub time_in_force: TimeInForce,
    pub position_intent: PositionIntent,
}

/// Broker acknowledgement of a submitted order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmittedOrder {
    pub id: String,
    #[serde(default)]
    pub client_order_id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub status: String,
}
