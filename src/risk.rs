//! Risk checks before order placement: no stacking on an open short option, minimum premium.

use tracing::warn;

use crate::error::WheelError;
use crate::occ::OccSymbol;
use crate::strategy::CONTRACT_MULTIPLIER;
use crate::types::{AssetClass, Position, PositionSide};
use crate::utils::round2;

pub struct RiskEngine {
    must_earn: f64,
    allow_open_short: bool,
}

impl RiskEngine {
    pub fn new(must_earn: f64, allow_open_short: bool) -> Self {
        Self {
            must_earn,
            allow_open_short,
        }
    }

    /// Fails if any short option on `underlying` is already open, unless overridden.
    pub fn pre_check_positions(&self, positions: &[Position], underlying: &str) -> Result<(), WheelError> {
        let open: Vec<String> = short_options_on(positions, underlying)
            .into_iter()
            .map(|p| p.symbol.clone())
            .collect();
        if open.is_empty() {
            return Ok(());
        }
        if self.allow_open_short {
            warn!(underlying, positions = ?open, "open short option position; continuing anyway (danger)");
            return Ok(());
        }
        Err(WheelError::ShortPositionOpen {
            symbol: underlying.to_string(),
            positions: open,
        })
    }

    /// Premium for one contract at `limit_price`; fails under the `must_earn` floor.
    pub fn check_premium(&self, limit_price: f64) -> Result<f64, WheelError> {
        let premium = round2(limit_price * CONTRACT_MULTIPLIER);
        if premium < self.must_earn {
            return Err(WheelError::InsufficientPremium {
                premium,
                must_earn: self.must_earn,
            });
        }
        Ok(premium)
    }
}

/// Short option positions whose OCC root is `underlying`.
pub fn short_options_on<'a>(positions: &'a [Position], underlying: &str) -> Vec<&'a Position> {
    positions
        .iter()
        .filter(|p| p.asset_class == AssetClass::UsOption && p.side == PositionSide::Short)
        .filter(|p| match OccSymbol::parse(&p.symbol) {
            Some(occ) => occ.underlying.eq_ignore_ascii_case(underlying),
            None => p.symbol.starts_with(underlying),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn pos(symbol: &str, class: AssetClass, side: PositionSide) -> Position {
        Position {
            symbol: symbol.to_string(),
            asset_class: class,
            side,
            qty: if side == PositionSide::Short { dec!(-1) } else { dec!(1) },
            qty_available: Decimal::ZERO,
            avg_entry_price: Decimal::ONE,
            cost_basis: None,
            unrealized_pl: Decimal::ZERO,
        }
    }

    // ---------- Short-position guard ----------

    #[test]
    fn short_option_on_underlying_blocks() {
        let ps = vec![
            pos("SMCI", AssetClass::UsEquity, PositionSide::Long),
            pos("SMCI251024P00040000", AssetClass::UsOption, PositionSide::Short),
        ];
        let err = RiskEngine::new(100.0, false)
            .pre_check_positions(&ps, "SMCI")
            .unwrap_err();
        match err {
            WheelError::ShortPositionOpen { symbol, positions } => {
                assert_eq!(symbol, "SMCI");
                assert_eq!(positions, vec!["SMCI251024P00040000".to_string()]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn danger_overrides_the_guard() {
        let ps = vec![pos("SMCI251024P00040000", AssetClass::UsOption, PositionSide::Short)];
        assert!(RiskEngine::new(100.0, true).pre_check_positions(&ps, "SMCI").is_ok());
    }

    #[test]
    fn long_options_and_other_underlyings_pass() {
        let ps = vec![
            pos("SMCI251024C00060000", AssetClass::UsOption, PositionSide::Long),
            pos("AAPL251024P00150000", AssetClass::UsOption, PositionSide::Short),
            pos("SMCI", AssetClass::UsEquity, PositionSide::Short),
        ];
        assert!(RiskEngine::new(100.0, false).pre_check_positions(&ps, "SMCI").is_ok());
    }

    #[test]
    fn root_match_is_exact_not_prefix() {
        // F must not match FORD options
        let ps = vec![pos("FORD251024P00010000", AssetClass::UsOption, PositionSide::Short)];
        assert!(short_options_on(&ps, "F").is_empty());
        assert_eq!(short_options_on(&ps, "FORD").len(), 1);
    }

    // ---------- Premium gate ----------

    #[test]
    fn premium_below_floor_is_rejected() {
        let err = RiskEngine::new(100.0, false).check_premium(0.98).unwrap_err();
        match err {
            WheelError::InsufficientPremium { premium, must_earn } => {
                assert_eq!(premium, 98.0);
                assert_eq!(must_earn, 100.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn premium_at_or_above_floor_passes() {
        let risk = RiskEngine::new(100.0, false);
        assert_eq!(risk.check_premium(1.98).unwrap(), 198.0);
        assert_eq!(risk.check_premium(1.00).unwrap(), 100.0);
    }
}
