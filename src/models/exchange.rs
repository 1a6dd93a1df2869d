use serde::{Deserialize, Serialize};
use std::fmt;

use super::LedgerAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Location {
    Kraken,
    Poloniex,
    Bittrex,
    Binance,
    BinanceUs,
    Coinbase,
    CoinbasePro,
    Gemini,
    Bitstamp,
    Bitfinex,
    Kucoin,
    Ftx,
    Iconomi,
    Independentreserve,
}

impl Location {
    /// Binance style exchanges page their history per market and keep their own sync loop.
    pub fn has_dedicated_history_sync(&self) -> bool {
        matches!(self, Location::Binance | Location::BinanceUs)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Location::Kraken => "kraken",
            Location::Poloniex => "poloniex",
            Location::Bittrex => "bittrex",
            Location::Binance => "binance",
            Location::BinanceUs => "binanceus",
            Location::Coinbase => "coinbase",
            Location::CoinbasePro => "coinbasepro",
            Location::Gemini => "gemini",
            Location::Bitstamp => "bitstamp",
            Location::Bitfinex => "bitfinex",
            Location::Kucoin => "kucoin",
            Location::Ftx => "ftx",
            Location::Iconomi => "iconomi",
            Location::Independentreserve => "independentreserve",
        };
        write!(f, "{}", name)
    }
}

/// Identity of one connected exchange instance: user given name plus location.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExchangeId {
    pub name: String,
    pub location: Location,
}

/// Everything an exchange history query returns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExchangeHistory {
    pub trades: Vec<serde_json::Value>,
    pub margin_positions: Vec<serde_json::Value>,
    pub asset_movements: Vec<serde_json::Value>,
    pub ledger_actions: Vec<LedgerAction>,
    pub exchange_specific_data: Option<serde_json::Value>,
}
