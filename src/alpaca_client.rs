//! Thin Alpaca REST client: account, positions, assets, quotes, option chain snapshots and orders.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{AlpacaCfg, Credentials};
use crate::error::BrokerError;
use crate::occ::OccSymbol;
use crate::types::{
    Account, Asset, ChainRequest, LimitOrderRequest, OptionChain, OptionContract, OptionGreeks,
    OrderSide, Position, PositionIntent, Quote, StrikeBound, SubmittedOrder, TimeInForce,
};
use crate::utils::mask_key;

/// What the wheel needs from a brokerage.
#[async_trait(?Send)]
pub trait Broker {
    async fn account(&self) -> Result<Account, BrokerError>;
    async fn positions(&self) -> Result<Vec<Position>, BrokerError>;
    /// `Ok(None)` when there is no open position in `symbol`.
    async fn open_position(&self, symbol: &str) -> Result<Option<Position>, BrokerError>;
    async fn asset(&self, symbol: &str) -> Result<Asset, BrokerError>;
    async fn latest_quote(&self, symbol: &str) -> Result<Quote, BrokerError>;
    async fn option_chain(&self, req: &ChainRequest) -> Result<OptionChain, BrokerError>;
    async fn submit_order(&self, order: &LimitOrderRequest) -> Result<SubmittedOrder, BrokerError>;
}

pub struct AlpacaClient {
    http: reqwest::Client,
    trading_url: String,
    data_url: String,
    options_feed: String,
    pub is_paper: bool,
}

// ---------- Wire formats ----------

#[derive(Debug, Deserialize)]
struct LatestQuoteResponse {
    quote: WireQuote,
}

// Either side may be missing or null on thin books.
#[derive(Debug, Deserialize)]
struct WireQuote {
    #[serde(rename = "bp", default)]
    bid_price: Option<f64>,
    #[serde(rename = "ap", default)]
    ask_price: Option<f64>,
}

impl From<WireQuote> for Quote {
    fn from(q: WireQuote) -> Self {
        Quote {
            bid_price: q.bid_price.unwrap_or(f64::NAN),
            ask_price: q.ask_price.unwrap_or(f64::NAN),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireGreeks {
    #[serde(default)]
    delta: Option<f64>,
    #[serde(default)]
    gamma: Option<f64>,
    #[serde(default)]
    rho: Option<f64>,
    #[serde(default)]
    theta: Option<f64>,
    #[serde(default)]
    vega: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SnapshotsResponse {
    #[serde(default)]
    snapshots: HashMap<String, WireSnapshot>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSnapshot {
    #[serde(default)]
    latest_quote: Option<WireQuote>,
    #[serde(default)]
    greeks: Option<WireGreeks>,
    #[serde(default)]
    implied_volatility: Option<f64>,
}

#[derive(Debug, Serialize)]
struct OrderBody<'a> {
    symbol: &'a str,
    qty: String,
    side: OrderSide,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: TimeInForce,
    limit_price: String,
    position_intent: PositionIntent,
}

impl<'a> From<&'a LimitOrderRequest> for OrderBody<'a> {
    fn from(o: &'a LimitOrderRequest) -> Self {
        OrderBody {
            symbol: &o.symbol,
            qty: o.qty.to_string(),
            side: o.side,
            order_type: "limit",
            time_in_force: o.time_in_force,
            limit_price: format!("{:.2}", o.limit_price),
            position_intent: o.position_intent,
        }
    }
}

impl AlpacaClient {
    pub fn new(creds: &Credentials, cfg: &AlpacaCfg) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("apca-api-key-id"),
            HeaderValue::from_str(&creds.api_key).context("api key is not a valid header")?,
        );
        let mut secret =
            HeaderValue::from_str(&creds.secret_key).context("secret key is not a valid header")?;
        secret.set_sensitive(true);
        headers.insert(HeaderName::from_static("apca-api-secret-key"), secret);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(cfg.timeout_sec))
            .build()
            .context("build http client")?;

        let trading_url = if creds.paper { &cfg.paper_url } else { &cfg.live_url };
        info!(
            "Alpaca client: key={}, mode={}, trading={}",
            mask_key(&creds.api_key),
            if creds.paper { "paper" } else { "live" },
            trading_url
        );

        Ok(Self {
            http,
            trading_url: trading_url.trim_end_matches('/').to_string(),
            data_url: cfg.data_url.trim_end_matches('/').to_string(),
            options_feed: cfg.options_feed.clone(),
            is_paper: creds.paper,
        })
    }

    async fn send<T: DeserializeOwned>(&self, endpoint: &str, rb: RequestBuilder) -> Result<T, BrokerError> {
        let resp = rb.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(BrokerError::Api {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|source| BrokerError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    async fn get_trading<T: DeserializeOwned>(&self, path: &str) -> Result<T, BrokerError> {
        debug!("GET {}{}", self.trading_url, path);
        let rb = self.http.get(format!("{}{}", self.trading_url, path));
        self.send(path, rb).await
    }
}

/// Query parameters for the option chain snapshot endpoint.
fn chain_query(req: &ChainRequest, feed: &str) -> Vec<(&'static str, String)> {
    let strike = match req.strike {
        StrikeBound::Upper(v) => ("strike_price_lte", format!("{:.2}", v)),
        StrikeBound::Lower(v) => ("strike_price_gte", format!("{:.2}", v)),
    };
    vec![
        ("type", req.contract_type.as_str().to_string()),
        ("status", "active".to_string()),
        (
            "expiration_date_lte",
            req.expiration_date_lte.format("%Y-%m-%d").to_string(),
        ),
        strike,
        ("limit", req.limit.to_string()),
        ("feed", feed.to_string()),
    ]
}

/// Attach contract metadata (decoded from the OCC symbol) to each snapshot.
/// A snapshot with greeks but no delta is dropped; one without a bid keeps no quote.
fn chain_from_snapshots(snapshots: HashMap<String, WireSnapshot>) -> OptionChain {
    let mut chain = OptionChain::new();
    for (symbol, snap) in snapshots {
        let Some(occ) = OccSymbol::parse(&symbol) else {
            warn!(symbol = %symbol, "unparseable option symbol in chain, skipping");
            continue;
        };
        let greeks = match snap.greeks {
            None => None,
            Some(g) => match g.delta {
                Some(delta) => Some(OptionGreeks {
                    delta,
                    gamma: g.gamma.unwrap_or_default(),
                    rho: g.rho.unwrap_or_default(),
                    theta: g.theta.unwrap_or_default(),
                    vega: g.vega.unwrap_or_default(),
                }),
                None => {
                    warn!(symbol = %symbol, greeks = ?g, "malformed greeks (no delta), skipping contract");
                    continue;
                }
            },
        };
        let latest_quote = snap
            .latest_quote
            .filter(|q| q.bid_price.is_some())
            .map(Quote::from);
        chain.insert(
            symbol.clone(),
            OptionContract {
                symbol,
                underlying_symbol: occ.underlying,
                contract_type: occ.contract_type,
                strike_price: occ.strike,
                expiration_date: occ.expiration,
                latest_quote,
                greeks,
                implied_volatility: snap.implied_volatility,
            },
        );
    }
    chain
}

#[async_trait(?Send)]
impl Broker for AlpacaClient {
    async fn account(&self) -> Result<Account, BrokerError> {
        self.get_trading("/v2/account").await
    }

    async fn positions(&self) -> Result<Vec<Position>, BrokerError> {
        self.get_trading("/v2/positions").await
    }

    async fn open_position(&self, symbol: &str) -> Result<Option<Position>, BrokerError> {
        let path = format!("/v2/positions/{}", symbol);
        match self.get_trading::<Position>(&path).await {
            Ok(p) => Ok(Some(p)),
            Err(BrokerError::Api { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                debug!(symbol, "no open position");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn asset(&self, symbol: &str) -> Result<Asset, BrokerError> {
        self.get_trading(&format!("/v2/assets/{}", symbol)).await
    }

    async fn latest_quote(&self, symbol: &str) -> Result<Quote, BrokerError> {
        let path = format!("/v2/stocks/{}/quotes/latest", symbol);
        debug!("GET {}{}", self.data_url, path);
        let rb = self.http.get(format!("{}{}", self.data_url, path));
        let resp: LatestQuoteResponse = self.send(&path, rb).await?;
        Ok(resp.quote.into())
    }

    async fn option_chain(&self, req: &ChainRequest) -> Result<OptionChain, BrokerError> {
        let path = format!("/v1beta1/options/snapshots/{}", req.underlying_symbol);
        let query = chain_query(req, &self.options_feed);
        debug!(?query, "GET {}{}", self.data_url, path);
        let rb = self
            .http
            .get(format!("{}{}", self.data_url, path))
            .query(&query);
        let resp: SnapshotsResponse = self.send(&path, rb).await?;
        if resp.next_page_token.is_some() {
            warn!(
                limit = req.limit,
                returned = resp.snapshots.len(),
                "option chain truncated at limit; remaining contracts were not considered"
            );
        }
        Ok(chain_from_snapshots(resp.snapshots))
    }

    async fn submit_order(&self, order: &LimitOrderRequest) -> Result<SubmittedOrder, BrokerError> {
        let path = "/v2/orders";
        info!(symbol = %order.symbol, limit = order.limit_price, "POST {}{}", self.trading_url, path);
        let rb = self
            .http
            .post(format!("{}{}", self.trading_url, path))
            .json(&OrderBody::from(order));
        self.send(path, rb).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::{filter_candidates, pick_best};
    use crate::types::{AssetStatus, ContractType};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> AlpacaClient {
        let creds = Credentials {
            api_key: "PKTEST".to_string(),
            secret_key: "SECRET".to_string(),
            paper: true,
        };
        let cfg = AlpacaCfg {
            paper_url: server.uri(),
            data_url: server.uri(),
            ..AlpacaCfg::default()
        };
        AlpacaClient::new(&creds, &cfg).unwrap()
    }

    fn position_json(symbol: &str) -> serde_json::Value {
        json!({
            "asset_id": "x",
            "symbol": symbol,
            "exchange": "NASDAQ",
            "asset_class": "us_equity",
            "avg_entry_price": "45.10",
            "qty": "100",
            "qty_available": "100",
            "side": "long",
            "market_value": "4600",
            "cost_basis": "4510",
            "unrealized_pl": "90"
        })
    }

    #[tokio::test]
    async fn account_sends_auth_headers_and_parses_amounts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/account"))
            .and(header("APCA-API-KEY-ID", "PKTEST"))
            .and(header("APCA-API-SECRET-KEY", "SECRET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "acc",
                "cash": "25000.50",
                "buying_power": "50001",
                "equity": "30000",
                "last_equity": "29500"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let a = client_for(&server).account().await.unwrap();
        assert_eq!(a.cash, dec!(25000.50));
        assert_eq!(a.buying_power, dec!(50001));
        assert_eq!(a.balance_change(), dec!(500));
    }

    #[tokio::test]
    async fn missing_position_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/positions/SMCI"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "code": 40410000,
                "message": "position does not exist"
            })))
            .mount(&server)
            .await;

        let p = client_for(&server).open_position("SMCI").await.unwrap();
        assert!(p.is_none());
    }

    #[tokio::test]
    async fn existing_position_is_some() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/positions/SMCI"))
            .respond_with(ResponseTemplate::new(200).set_body_json(position_json("SMCI")))
            .mount(&server)
            .await;

        let p = client_for(&server).open_position("SMCI").await.unwrap().unwrap();
        assert_eq!(p.qty_available, dec!(100));
        assert_eq!(p.cost_basis, Some(dec!(4510)));
    }

    #[tokio::test]
    async fn other_errors_propagate_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/assets/SMCI"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = client_for(&server).asset("SMCI").await.unwrap_err();
        match err {
            BrokerError::Api { status, body, .. } => {
                assert_eq!(status, 403);
                assert_eq!(body, "forbidden");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn latest_quote_reads_bid_and_ask() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/stocks/SMCI/quotes/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "symbol": "SMCI",
                "quote": {"t": "2026-10-19T15:00:00Z", "bp": 41.95, "bs": 3, "ap": 42.05, "as": 2}
            })))
            .mount(&server)
            .await;

        let q = client_for(&server).latest_quote("SMCI").await.unwrap();
        assert_eq!(q.bid_price, 41.95);
        assert_eq!(q.ask_price, 42.05);
    }

    #[tokio::test]
    async fn option_chain_sends_one_sided_filter_and_decodes_symbols() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1beta1/options/snapshots/SMCI"))
            .and(query_param("type", "put"))
            .and(query_param("strike_price_lte", "39.85"))
            .and(query_param("expiration_date_lte", "2026-10-26"))
            .and(query_param("limit", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "snapshots": {
                    "SMCI261023P00039000": {
                        "latestQuote": {"bp": 0.85, "ap": 0.95},
                        "greeks": {"delta": -0.21, "gamma": 0.05, "rho": -0.01, "theta": -0.04, "vega": 0.02},
                        "impliedVolatility": 0.71
                    },
                    "SMCI261023P00035000": {
                        "latestQuote": {"bp": 0.20, "ap": 0.30}
                    },
                    "NOT-AN-OPTION": {}
                },
                "next_page_token": "U01DSTI2MTAyM1AwMDAzNTAwMA=="
            })))
            .expect(1)
            .mount(&server)
            .await;

        let req = ChainRequest {
            underlying_symbol: "SMCI".to_string(),
            status: AssetStatus::Active,
            expiration_date_lte: NaiveDate::from_ymd_opt(2026, 10, 26).unwrap(),
            strike: StrikeBound::Upper(39.85),
            contract_type: ContractType::Put,
            limit: 100,
        };
        let chain = client_for(&server).option_chain(&req).await.unwrap();
        assert_eq!(chain.len(), 2);

        let c = &chain["SMCI261023P00039000"];
        assert_eq!(c.underlying_symbol, "SMCI");
        assert_eq!(c.contract_type, ContractType::Put);
        assert_eq!(c.strike_price, 39.0);
        assert_eq!(c.bid(), Some(0.85));
        assert_eq!(c.greeks.unwrap().delta, -0.21);
        assert!(chain["SMCI261023P00035000"].greeks.is_none());
    }

    fn snapshots(body: serde_json::Value) -> OptionChain {
        let resp: SnapshotsResponse = serde_json::from_value(body).unwrap();
        chain_from_snapshots(resp.snapshots)
    }

    #[test]
    fn greeks_without_delta_are_dropped_not_zeroed() {
        let ch = snapshots(json!({
            "snapshots": {
                "SMCI261023P00041000": {
                    "latestQuote": {"bp": 3.10, "ap": 3.30},
                    "greeks": {"gamma": 0.05}
                },
                "SMCI261023P00040000": {
                    "latestQuote": {"bp": 2.50, "ap": 2.60},
                    "greeks": {"delta": null, "gamma": 0.04}
                },
                "SMCI261023P00039000": {
                    "latestQuote": {"bp": 1.00, "ap": 1.10},
                    "greeks": {"delta": -0.2}
                }
            }
        }));
        assert_eq!(ch.len(), 1);
        let survivors = filter_candidates(&ch, 0.31);
        assert_eq!(pick_best(&survivors).unwrap().symbol, "SMCI261023P00039000");
    }

    #[test]
    fn null_bid_drops_only_that_contract() {
        let ch = snapshots(json!({
            "snapshots": {
                "SMCI261023P00041000": {
                    "latestQuote": {"bp": null, "ap": 3.30},
                    "greeks": {"delta": -0.1}
                },
                "SMCI261023P00038000": {
                    "latestQuote": null,
                    "greeks": {"delta": -0.1}
                },
                "SMCI261023P00039000": {
                    "latestQuote": {"bp": 1.00, "ap": null},
                    "greeks": {"delta": -0.2, "gamma": null},
                    "impliedVolatility": null
                }
            },
            "next_page_token": null
        }));
        assert_eq!(ch.len(), 3);
        assert!(ch["SMCI261023P00041000"].latest_quote.is_none());
        assert!(ch["SMCI261023P00038000"].latest_quote.is_none());
        assert_eq!(ch["SMCI261023P00039000"].bid(), Some(1.00));

        let survivors = filter_candidates(&ch, 0.31);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].symbol, "SMCI261023P00039000");
    }

    #[test]
    fn call_chain_query_uses_lower_bound() {
        let req = ChainRequest {
            underlying_symbol: "SMCI".to_string(),
            status: AssetStatus::Active,
            expiration_date_lte: NaiveDate::from_ymd_opt(2026, 10, 26).unwrap(),
            strike: StrikeBound::Lower(52.5),
            contract_type: ContractType::Call,
            limit: 100,
        };
        let q = chain_query(&req, "indicative");
        assert!(q.contains(&("strike_price_gte", "52.50".to_string())));
        assert!(q.contains(&("type", "call".to_string())));
        assert!(!q.iter().any(|(k, _)| *k == "strike_price_lte"));
    }

    #[tokio::test]
    async fn submit_order_posts_limit_sell_to_open() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/orders"))
            .and(body_partial_json(json!({
                "symbol": "SMCI261023P00039000",
                "qty": "1",
                "side": "sell",
                "type": "limit",
                "time_in_force": "day",
                "limit_price": "0.83",
                "position_intent": "sell_to_open"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "61e69015-8549-4bfd-b9c3-01e75843f47d",
                "client_order_id": "eb9e2aaa",
                "symbol": "SMCI261023P00039000",
                "status": "accepted"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let order = LimitOrderRequest {
            symbol: "SMCI261023P00039000".to_string(),
            limit_price: 0.83,
            qty: 1,
            side: OrderSide::Sell,
            time_in_force: TimeInForce::Day,
            position_intent: PositionIntent::SellToOpen,
        };
        let ack = client_for(&server).submit_order(&order).await.unwrap();
        assert_eq!(ack.id, "61e69015-8549-4bfd-b9c3-01e75843f47d");
        assert_eq!(ack.status, "accepted");
    }

    #[tokio::test]
    async fn undecodable_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/positions"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).positions().await.unwrap_err();
        assert!(matches!(err, BrokerError::Decode { .. }));
    }
}
