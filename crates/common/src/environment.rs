//! Binance environment configuration.
//!
//! Maps production and testnet onto their REST and stream endpoints, and
//! builds the per-stream WebSocket URLs used by the subscribers.

use std::fmt;
use std::str::FromStr;

/// Binance environment (production or testnet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BinanceEnvironment {
    /// Production environment (real money).
    #[default]
    Production,
    /// Testnet environment (fake money for testing).
    Testnet,
}

impl BinanceEnvironment {
    /// REST API base URL.
    pub fn rest_base_url(&self) -> &'static str {
        match self {
            Self::Production => "https://api.binance.com",
            Self::Testnet => "https://testnet.binance.vision",
        }
    }

    /// WebSocket base URL for streams.
    pub fn ws_base_url(&self) -> &'static str {
        match self {
            Self::Production => "wss://stream.binance.com:9443",
            Self::Testnet => "wss://testnet.binance.vision",
        }
    }

    /// Full URL of a single raw stream, e.g. `btcusdt@depth` or a listen key.
    pub fn stream_url(&self, stream: &str) -> String {
        format!("{}/ws/{}", self.ws_base_url(), stream)
    }

    /// Name of the diff depth stream for `symbol`.
    ///
    /// The symbol is lowercased; `update_speed_ms` selects the
    /// `@depth@<ms>ms` variant when set.
    pub fn depth_stream_name(symbol: &str, update_speed_ms: Option<u32>) -> String {
        let symbol = symbol.to_lowercase();
        match update_speed_ms {
            Some(ms) => format!("{}@depth@{}ms", symbol, ms),
            None => format!("{}@depth", symbol),
        }
    }

    /// Returns true if this is the production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Load environment from `BINANCE_ENVIRONMENT` env var.
    ///
    /// Returns `Production` if not set or invalid.
    pub fn from_env() -> Self {
        std::env::var("BINANCE_ENVIRONMENT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for BinanceEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for BinanceEnvironment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" | "mainnet" => Ok(Self::Production),
            "testnet" | "test" => Ok(Self::Testnet),
            _ => Err(ParseEnvironmentError(s.to_string())),
        }
    }
}

/// Error parsing environment string.
#[derive(Debug, Clone)]
pub struct ParseEnvironmentError(String);

impl fmt::Display for ParseEnvironmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid environment '{}', expected 'production' or 'testnet'",
            self.0
        )
    }
}

impl std::error::Error for ParseEnvironmentError {}
