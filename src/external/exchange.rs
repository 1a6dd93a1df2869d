use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::errors::AppError;
use crate::models::{ExchangeHistory, ExchangeId, Location, Timestamp};

#[async_trait]
pub trait Exchange: Send + Sync {
    fn name(&self) -> &str;

    fn location(&self) -> Location;

    fn location_id(&self) -> ExchangeId {
        ExchangeId {
            name: self.name().to_string(),
            location: self.location(),
        }
    }

    async fn query_history(
        &self,
        start_ts: Timestamp,
        end_ts: Timestamp,
    ) -> Result<ExchangeHistory, AppError>;
}

pub trait ExchangeManager: Send + Sync {
    fn connected_exchanges(&self) -> Vec<Arc<dyn Exchange>>;
}

/// In-memory registry of the exchanges the user has connected.
#[derive(Default)]
pub struct ConnectedExchanges {
    exchanges: RwLock<Vec<Arc<dyn Exchange>>>,
}

impl ConnectedExchanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces an existing exchange with the same identity.
    pub fn connect(&self, exchange: Arc<dyn Exchange>) {
        let id = exchange.location_id();
        let mut exchanges = self.exchanges.write();
        exchanges.retain(|e| e.location_id() != id);
        exchanges.push(exchange);
    }
}

impl ExchangeManager for ConnectedExchanges {
    fn connected_exchanges(&self) -> Vec<Arc<dyn Exchange>> {
        self.exchanges.read().clone()
    }
}
