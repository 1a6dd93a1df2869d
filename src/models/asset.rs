use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// Identifier of the reporting currency used for history event values.
pub const A_USD: &str = "USD";

// An asset as known to the local asset registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, FromRow)]
pub struct Asset {
    pub identifier: String,
    pub symbol: Option<String>,
    /// Symbol used by CryptoCompare. An empty string marks the asset as unsupported there.
    pub cryptocompare: Option<String>,
    pub is_fiat: bool,
}

impl Asset {
    pub fn new(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        Self {
            symbol: Some(identifier.clone()),
            cryptocompare: None,
            is_fiat: false,
            identifier,
        }
    }

    pub fn fiat(identifier: impl Into<String>) -> Self {
        Self {
            is_fiat: true,
            ..Self::new(identifier)
        }
    }

    pub fn is_fiat(&self) -> bool {
        self.is_fiat
    }

    /// True when the asset is explicitly marked as not supported by CryptoCompare.
    pub fn is_unsupported_by_cryptocompare(&self) -> bool {
        matches!(self.cryptocompare.as_deref(), Some(""))
    }

    /// Symbol to send to CryptoCompare, falling back to the plain symbol.
    pub fn cryptocompare_symbol(&self) -> Option<&str> {
        match self.cryptocompare.as_deref() {
            Some(s) if !s.is_empty() => Some(s),
            Some(_) => None,
            None => self.symbol.as_deref(),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier)
    }
}

/// Sources the global price cache can hold ranges for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoricalPriceOracle {
    Cryptocompare,
}

impl HistoricalPriceOracle {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoricalPriceOracle::Cryptocompare => "cryptocompare",
        }
    }
}
