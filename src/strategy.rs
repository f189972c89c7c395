//! Wheel decisions: which leg to sell, where to bound the strike, which contract to pick,
//! and the order to send for it.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::config::WheelCfg;
use crate::error::WheelError;
use crate::types::{
    Account, AssetStatus, ChainRequest, ContractType, LimitOrderRequest, OptionChain,
    OptionContract, OrderSide, Position, PositionIntent, StrikeBound, TimeInForce,
};
use crate::utils::{round2, to_f64};

/// Shares per standard US equity option contract.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

/// CALL once a full lot of shares is available to cover it, PUT otherwise.
pub fn mode_for_shares(qty_available: Decimal) -> ContractType {
    if qty_available >= Decimal::ONE_HUNDRED {
        ContractType::Call
    } else {
        ContractType::Put
    }
}

/// No position in the underlying counts as zero shares.
pub fn select_mode(position: Option<&Position>) -> ContractType {
    mode_for_shares(position.map(|p| p.qty_available).unwrap_or(Decimal::ZERO))
}

/// PUT: upper bound = min(bid * put_discount, cash / 100, buying_power / 100).
/// CALL: lower bound = cost basis per share * profit_multiple, else ask * call_markup.
pub fn strike_bound(
    mode: ContractType,
    bid: f64,
    ask: f64,
    account: Option<&Account>,
    position: Option<&Position>,
    cfg: &WheelCfg,
) -> Result<StrikeBound, WheelError> {
    let bound = match mode {
        ContractType::Put => {
            let mut consider = vec![bid * cfg.put_discount];
            if let Some(a) = account {
                consider.push(to_f64(a.cash) / CONTRACT_MULTIPLIER);
                consider.push(to_f64(a.buying_power) / CONTRACT_MULTIPLIER);
            }
            if let Some(bad) = consider.iter().find(|v| !v.is_finite()) {
                return Err(WheelError::Computation(format!(
                    "non-finite put strike candidate {} (bid={}, account={:?})",
                    bad, bid, account
                )));
            }
            let lowest = consider.iter().copied().fold(f64::INFINITY, f64::min);
            StrikeBound::Upper(round2(lowest))
        }
        ContractType::Call => match position.and_then(|p| p.cost_basis).filter(|c| *c > Decimal::ZERO) {
            Some(cost_basis) => StrikeBound::Lower(round2(
                to_f64(cost_basis) / CONTRACT_MULTIPLIER * cfg.profit_multiple,
            )),
            None => StrikeBound::Lower(round2(ask * cfg.call_markup)),
        },
    };

    if !bound.value().is_finite() {
        return Err(WheelError::Computation(format!(
            "non-finite {} strike bound (bid={}, ask={}, position={:?})",
            mode, bid, ask, position
        )));
    }
    debug!(%mode, bound = %bound, "strike bound");
    Ok(bound)
}

/// Active contracts of `mode`, bounded by `strike`, expiring within `cfg.expiry_days` of `today`.
pub fn chain_request(
    symbol: &str,
    mode: ContractType,
    strike: StrikeBound,
    today: NaiveDate,
    cfg: &WheelCfg,
) -> ChainRequest {
    ChainRequest {
        underlying_symbol: symbol.to_string(),
        status: AssetStatus::Active,
        expiration_date_lte: today + Duration::days(cfg.expiry_days),
        strike,
        contract_type: mode,
        limit: cfg.chain_limit,
    }
}

/// Contracts with greeks, a bid and |delta| <= |delta_lte|, ascending by bid.
/// Ties keep chain order.
pub fn filter_candidates(chain: &OptionChain, delta_lte: f64) -> Vec<&OptionContract> {
    let threshold = delta_lte.abs();
    let mut survivors: Vec<&OptionContract> = chain
        .values()
        .filter(|c| {
            let Some(greeks) = c.greeks else {
                debug!(symbol = %c.symbol, "no greeks, skipping");
                return false;
            };
            let Some(bid) = c.bid().filter(|b| b.is_finite()) else {
                debug!(symbol = %c.symbol, "no bid, skipping");
                return false;
            };
            if !greeks.delta.is_finite() {
                warn!(symbol = %c.symbol, ?greeks, bid, "malformed greeks, skipping contract");
                return false;
            }
            greeks.delta.abs() <= threshold
        })
        .collect();
    survivors.sort_by(|a, b| {
        let (a, b) = (a.bid().unwrap_or(0.0), b.bid().unwrap_or(0.0));
        a.total_cmp(&b)
    });
    survivors
}

/// Highest bid among the survivors (last of the ascending order).
pub fn pick_best<'a>(survivors: &[&'a OptionContract]) -> Result<&'a OptionContract, WheelError> {
    survivors.last().copied().ok_or(WheelError::NoCandidates)
}

/// Limit price a few cents under the bid.
pub fn limit_price(contract: &OptionContract, offset: f64) -> Result<f64, WheelError> {
    let bid = contract.bid().unwrap_or(f64::NAN);
    let px = round2(bid - offset);
    if !px.is_finite() {
        return Err(WheelError::Computation(format!(
            "non-finite limit price for {} (quote={:?}, greeks={:?})",
            contract.symbol, contract.latest_quote, contract.greeks
        )));
    }
    Ok(px)
}

/// Sell-to-open one contract, DAY, at `limit_price`.
pub fn build_order(contract: &OptionContract, limit_price: f64) -> LimitOrderRequest {
    LimitOrderRequest {
        symbol: contract.symbol.clone(),
        limit_price,
        qty: 1,
        side: OrderSide::Sell,
        time_in_force: TimeInForce::Day,
        position_intent: PositionIntent::SellToOpen,
    }
}
