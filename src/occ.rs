//! OCC option symbols: `ROOT YYMMDD C|P STRIKE*1000` packed without separators.
//! e.g. `AAPL240119C00190000` = AAPL, 2024-01-19, call, 190.000.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::ContractType;

// The 8 strike digits are split into leading zeros / dollars / cents / tenth-of-cent for display.
static RE_OCC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Z]{1,6})(\d{6})([CP])(0{0,4})(\d{1,5})(\d{2})(\d)$").expect("valid OCC regex")
});

/// Borrowed pieces of an OCC symbol, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccParts<'a> {
    pub root: &'a str,
    pub date: &'a str,
    pub right: &'a str,
    pub zeros: &'a str,
    pub dollars: &'a str,
    pub cents: &'a str,
    pub mills: &'a str,
}

impl<'a> OccParts<'a> {
    pub fn split(symbol: &'a str) -> Option<Self> {
        let c = RE_OCC.captures(symbol)?;
        let g = |i: usize| c.get(i).map(|m| m.as_str()).unwrap_or("");
        Some(Self {
            root: g(1),
            date: g(2),
            right: g(3),
            zeros: g(4),
            dollars: g(5),
            cents: g(6),
            mills: g(7),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OccSymbol {
    pub underlying: String,
    pub expiration: NaiveDate,
    pub contract_type: ContractType,
    pub strike: f64,
}

impl OccSymbol {
    pub fn parse(symbol: &str) -> Option<Self> {
        let p = OccParts::split(symbol.trim())?;
        let expiration = NaiveDate::parse_from_str(p.date, "%y%m%d").ok()?;
        let contract_type = match p.right {
            "C" => ContractType::Call,
            _ => ContractType::Put,
        };
        let digits = format!("{}{}{}{}", p.zeros, p.dollars, p.cents, p.mills);
        let strike = digits.parse::<u64>().ok()? as f64 / 1000.0;
        Some(Self {
            underlying: p.root.to_string(),
            expiration,
            contract_type,
            strike,
        })
    }
}
