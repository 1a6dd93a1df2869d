pub mod cryptocompare;
pub mod ethereum;
pub mod etherscan;
pub mod exchange;
pub mod price_oracle;
