//! Matchmaker core
//!
//! Owns the orderbook, keeps a forecast per registered order and scans
//! every ordered pair for clears worth attempting.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use orderbook::{BountyConfig, LedgerError, OrderEval, Orderbook};
use thiserror::Error;
use tracing::{debug, info};
use types::errors::NumericError;
use types::ids::OrderHash;
use types::numeric::to_decimal;
use types::order::Order;

use crate::config::MatcherConfig;
use crate::events::MatchRecord;
use crate::forecast::Forecast;
use crate::matching::executor::ClearTime;
use crate::matching::{can_match, crossing_ios, MatchExecutor};

/// Matcher errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchError {
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("order {0} has no forecast")]
    NoForecast(OrderHash),

    #[error("forecast arithmetic failed: {0}")]
    Numeric(#[from] NumericError),
}

/// Forecasting matcher over one orderbook
#[derive(Debug)]
pub struct Matchmaker {
    book: Orderbook,
    forecasts: HashMap<OrderHash, Forecast>,
    config: MatcherConfig,
    executor: MatchExecutor,
}

impl Matchmaker {
    pub fn new(book: Orderbook) -> Self {
        Self::with_config(book, MatcherConfig::default())
    }

    pub fn with_config(book: Orderbook, config: MatcherConfig) -> Self {
        Self {
            book,
            forecasts: HashMap::new(),
            config,
            executor: MatchExecutor::new(0),
        }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    pub fn book(&self) -> &Orderbook {
        &self.book
    }

    /// Direct ledger access for deposits and withdrawals.
    pub fn book_mut(&mut self) -> &mut Orderbook {
        &mut self.book
    }

    pub fn into_book(self) -> Orderbook {
        self.book
    }

    pub fn forecast(&self, hash: &OrderHash) -> Option<&Forecast> {
        self.forecasts.get(hash)
    }

    /// Sample `order` at `t` and at `t + horizon`.
    ///
    /// Missing time inputs sample from zero. No counterparty is known, so
    /// the counterparty context slot is the zero address.
    pub fn order_eval(
        &self,
        order: &Order,
        timestamp: Option<u64>,
        block_number: Option<u64>,
    ) -> Result<Forecast, MatchError> {
        let t = timestamp.unwrap_or(0);
        let block = block_number.unwrap_or(0);
        let samples: [OrderEval; 2] = [
            self.book.eval_order(order, Address::ZERO, Some(t), Some(block))?,
            self.book.eval_order(
                order,
                Address::ZERO,
                Some(t.saturating_add(self.config.horizon_seconds)),
                Some(block.saturating_add(self.config.horizon_blocks)),
            )?,
        ];
        Ok(Forecast::from_samples(&samples)?)
    }

    /// Register `order` with the book, then forecast it.
    ///
    /// A newly registered order whose forecast fails is deregistered again.
    pub fn add_order(
        &mut self,
        sender: Address,
        order: Order,
        timestamp: Option<u64>,
        block_number: Option<u64>,
    ) -> Result<OrderHash, MatchError> {
        let known = self.book.order(&order.hash()).is_some();
        let hash = self.book.add_order(sender, order.clone())?;
        match self.order_eval(&order, timestamp, block_number) {
            Ok(forecast) => {
                debug!(
                    %hash,
                    min_price = ?to_decimal(forecast.min_price),
                    max_price = ?to_decimal(forecast.max_price),
                    "order forecast"
                );
                self.forecasts.insert(hash, forecast);
                Ok(hash)
            }
            Err(err) => {
                if !known {
                    self.book.remove_order(sender, hash)?;
                }
                Err(err)
            }
        }
    }

    pub fn remove_order(&mut self, sender: Address, hash: OrderHash) -> Result<Order, MatchError> {
        let order = self.book.remove_order(sender, hash)?;
        self.forecasts.remove(&hash);
        Ok(order)
    }

    /// Greedy pairwise scan over registered orders in registration order.
    ///
    /// For each ordered pair `(i, j)` and each crossing IO combination where
    /// `i`'s output vault is funded and the forecasts cross, `clear` is run
    /// immediately so later pairs see its effects. Every attempt is
    /// returned, settled or not.
    pub fn make_match(
        &mut self,
        sender: Address,
        bounty: BountyConfig,
        timestamp: Option<u64>,
        block_number: Option<u64>,
    ) -> Result<Vec<MatchRecord>, MatchError> {
        let orders: Vec<(OrderHash, Order)> = self
            .book
            .orders()
            .map(|(hash, order)| (hash, order.clone()))
            .collect();
        let time = ClearTime {
            timestamp,
            block_number,
        };

        let mut records = Vec::new();
        for (i_hash, i) in &orders {
            let i_forecast = *self.forecasts.get(i_hash).ok_or(MatchError::NoForecast(*i_hash))?;
            for (j_hash, j) in &orders {
                if i.owner == j.owner {
                    continue;
                }
                let j_forecast = self.forecasts.get(j_hash).ok_or(MatchError::NoForecast(*j_hash))?;
                if !can_match(&i_forecast, j_forecast) {
                    continue;
                }
                for pairing in crossing_ios(i, j) {
                    let output = i.outputs[pairing.a_output];
                    let funded = self
                        .book
                        .vault_balance(i.owner, output.token, output.vault_id)
                        .unwrap_or(U256::ZERO);
                    if funded.is_zero() {
                        debug!(order = %i_hash, token = %output.token, "output vault empty");
                        continue;
                    }
                    let record = self
                        .executor
                        .execute_clear(&mut self.book, sender, i, j, pairing, bounty, time)?;
                    records.push(record);
                }
            }
        }

        info!(
            attempted = records.len(),
            settled = records.iter().filter(|r| r.is_settled()).count(),
            "matching pass complete"
        );
        Ok(records)
    }
}
