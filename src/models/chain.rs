use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use super::Timestamp;

pub type EthAddress = String;

/// Raw transaction hash as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHash(pub Vec<u8>);

impl TxHash {
    pub fn from_hex(value: &str) -> Option<Self> {
        let digits = value.strip_prefix("0x").unwrap_or(value);
        if !digits.is_ascii() || digits.len() % 2 != 0 {
            return None;
        }
        (0..digits.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&digits[i..i + 2], 16).ok())
            .collect::<Option<Vec<u8>>>()
            .map(TxHash)
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthTransaction {
    pub tx_hash: TxHash,
    pub block_number: i64,
    pub timestamp: Timestamp,
    pub from_address: EthAddress,
    pub to_address: Option<EthAddress>,
    pub value: String,
    pub gas: String,
    pub gas_price: String,
    pub gas_used: String,
    pub input_data: String,
    pub nonce: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub contract_address: Option<EthAddress>,
    pub status: bool,
    pub tx_type: i32,
    pub logs: serde_json::Value,
}

/// A registered bitcoin extended public key with its derivation path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct XpubData {
    pub xpub: String,
    pub derivation_path: Option<String>,
    pub label: Option<String>,
}
