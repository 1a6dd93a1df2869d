use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use super::{Asset, Location, Timestamp};

/// A history event row whose USD value has not been computed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingPriceEntry {
    pub identifier: String,
    pub amount: BigDecimal,
    pub asset: Asset,
    pub timestamp: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerActionType {
    Income,
    Expense,
    Loss,
    DividendsIncome,
    DonationReceived,
    Airdrop,
    Gift,
    GrantIncome,
}

// A user or exchange supplied accounting entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerAction {
    pub identifier: i64,
    pub timestamp: Timestamp,
    pub action_type: LedgerActionType,
    pub location: Option<Location>,
    pub amount: BigDecimal,
    pub asset: String,
    pub rate: Option<BigDecimal>,
    pub rate_asset: Option<String>,
    pub link: Option<String>,
    pub notes: Option<String>,
}
