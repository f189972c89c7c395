//! Error kinds for broker calls and the wheel run, with their process exit codes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("alpaca api error {status} on {endpoint}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("undecodable response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum WheelError {
    #[error("open short option position on {symbol}: {}", positions.join(", "))]
    ShortPositionOpen {
        symbol: String,
        positions: Vec<String>,
    },
    #[error("{symbol} is not tradable")]
    NotTradable { symbol: String },
    #[error("no acceptable contracts found")]
    NoCandidates,
    #[error("not enough premium! {premium:.2} < {must_earn:.2}")]
    InsufficientPremium { premium: f64, must_earn: f64 },
    #[error("computation error: {0}")]
    Computation(String),
    #[error(transparent)]
    Broker(#[from] BrokerError),
}

/// Exit code for failures before the run starts (config, credentials, client setup).
pub const EXIT_BOOTSTRAP: u8 = 7;

impl WheelError {
    pub fn exit_code(&self) -> u8 {
        match self {
            WheelError::NotTradable { .. } => 1,
            WheelError::NoCandidates => 2,
            WheelError::InsufficientPremium { .. } => 3,
            WheelError::ShortPositionOpen { .. } => 4,
            WheelError::Computation(_) => 5,
            WheelError::Broker(_) => 6,
        }
    }
}
