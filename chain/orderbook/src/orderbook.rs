//! Order registry, vault custody and clear settlement
//!
//! All balances live in one [`Orderbook`]. Every state-changing operation
//! takes `&mut self`, so a clear's reads and writes are never interleaved
//! with another operation's.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use interpreter::{ChainState, Interpreter, RunInput, RuntimeError};
use tracing::{debug, info, warn};
use types::ids::{address_to_word, OrderHash};
use types::numeric::{rescale, scale18, to_decimal, FP_DECIMALS};
use types::order::{Io, Order};

use crate::clear::{state_change, BountyConfig, ClearOutcome, ClearStateChange, OrderEval};
use crate::config::OrderbookConfig;
use crate::errors::LedgerError;
use crate::events::{
    AddOrder, AfterClear, Clear, Deposit, OrderbookEvent, RemoveOrder, Withdraw,
};
use crate::opcodes::{
    counterparty_funds_cleared, order_funds_cleared, orderbook_table,
    COUNTERPARTY_FUNDS_CLEARED, ORDER_FUNDS_CLEARED,
};
use crate::token::SimulatedChain;
use crate::vault::{VaultKey, VaultLedger};

#[derive(Debug)]
pub struct Orderbook {
    config: OrderbookConfig,
    chain: SimulatedChain,
    vaults: VaultLedger,
    orders: HashMap<OrderHash, Order>,
    /// Registration order of live orders.
    order_index: Vec<OrderHash>,
    cleared: HashMap<OrderHash, U256>,
    counterparty_cleared: HashMap<OrderHash, HashMap<Address, U256>>,
    events: Vec<OrderbookEvent>,
}

impl Default for Orderbook {
    fn default() -> Self {
        Self::new()
    }
}

fn io_at(hash: OrderHash, ios: &[Io], index: usize) -> Result<Io, LedgerError> {
    ios.get(index).copied().ok_or(LedgerError::IoOutOfRange {
        order: hash,
        index,
        len: ios.len(),
    })
}

impl Orderbook {
    pub fn new() -> Self {
        Self::with_config(OrderbookConfig::default())
    }

    pub fn with_config(config: OrderbookConfig) -> Self {
        Self {
            config,
            chain: SimulatedChain::new(),
            vaults: VaultLedger::new(),
            orders: HashMap::new(),
            order_index: Vec::new(),
            cleared: HashMap::new(),
            counterparty_cleared: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Address holding deposited tokens on the simulated chain.
    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn config(&self) -> &OrderbookConfig {
        &self.config
    }

    pub fn chain(&self) -> &SimulatedChain {
        &self.chain
    }

    pub fn chain_mut(&mut self) -> &mut SimulatedChain {
        &mut self.chain
    }

    /// Interpreter over the orderbook table with the cleared-funds opcodes
    /// wired to this ledger.
    pub fn interpreter(&self) -> Result<Interpreter<Orderbook>, RuntimeError> {
        let config = self
            .config
            .interpreter
            .clone()
            .with_address(self.config.address);
        Ok(Interpreter::with_config(orderbook_table(), config)?
            .with_extension(ORDER_FUNDS_CLEARED, order_funds_cleared)
            .with_extension(COUNTERPARTY_FUNDS_CLEARED, counterparty_funds_cleared))
    }

    // ───────────────────────── Orders ─────────────────────────

    /// Register `order`. Registering the same order again changes nothing.
    ///
    /// Every vault the order references is created at zero if missing.
    pub fn add_order(&mut self, sender: Address, order: Order) -> Result<OrderHash, LedgerError> {
        if order.inputs.is_empty() || order.outputs.is_empty() {
            return Err(LedgerError::InvalidOrder(
                "order needs at least one input and one output".to_string(),
            ));
        }
        if order.config.sources.is_empty() {
            return Err(LedgerError::InvalidOrder("order has no sources".to_string()));
        }
        order
            .config
            .validate(&orderbook_table())
            .map_err(|err| LedgerError::InvalidOrder(err.to_string()))?;
        let hash = order.hash();
        if sender != order.owner {
            return Err(LedgerError::NotOwner { sender, order: hash });
        }

        for io in order.inputs.iter().chain(order.outputs.iter()) {
            self.vaults.touch(VaultKey::new(order.owner, io.token, io.vault_id));
        }
        self.cleared.entry(hash).or_insert(U256::ZERO);
        self.counterparty_cleared.entry(hash).or_default();

        if self.orders.contains_key(&hash) {
            debug!(%hash, "order already registered");
            return Ok(hash);
        }

        info!(%hash, owner = %order.owner, "order added");
        self.orders.insert(hash, order.clone());
        self.order_index.push(hash);
        self.events.push(OrderbookEvent::AddOrder(AddOrder {
            sender,
            order_hash: hash,
            order,
        }));
        Ok(hash)
    }

    /// Deregister an order. Its vaults and cleared totals are kept.
    pub fn remove_order(&mut self, sender: Address, hash: OrderHash) -> Result<Order, LedgerError> {
        let owner = self
            .orders
            .get(&hash)
            .map(|order| order.owner)
            .ok_or(LedgerError::UnknownOrder(hash))?;
        if owner != sender {
            return Err(LedgerError::NotOwner {
                sender,
                order: hash,
            });
        }
        self.order_index.retain(|h| *h != hash);
        let order = self.orders.remove(&hash).ok_or(LedgerError::UnknownOrder(hash))?;
        info!(%hash, "order removed");
        self.events.push(OrderbookEvent::RemoveOrder(RemoveOrder {
            sender,
            order_hash: hash,
        }));
        Ok(order)
    }

    pub fn order(&self, hash: &OrderHash) -> Option<&Order> {
        self.orders.get(hash)
    }

    /// Live orders in registration order.
    pub fn orders(&self) -> impl Iterator<Item = (OrderHash, &Order)> + '_ {
        self.order_index
            .iter()
            .filter_map(|hash| self.orders.get(hash).map(|order| (*hash, order)))
    }

    pub fn order_count(&self) -> usize {
        self.order_index.len()
    }

    pub fn order_cleared(&self, hash: &OrderHash) -> Option<U256> {
        self.cleared.get(hash).copied()
    }

    /// Cleared total of `hash` against `counterparty`; zero when the order
    /// is known but never cleared against it.
    pub fn counterparty_cleared(&self, hash: &OrderHash, counterparty: &Address) -> Option<U256> {
        self.counterparty_cleared
            .get(hash)
            .map(|by| by.get(counterparty).copied().unwrap_or(U256::ZERO))
    }

    // ───────────────────────── Vaults ─────────────────────────

    pub fn vault_balance(&self, owner: Address, token: Address, vault_id: U256) -> Option<U256> {
        self.vaults.get(&VaultKey::new(owner, token, vault_id))
    }

    pub fn vaults(&self) -> &VaultLedger {
        &self.vaults
    }

    /// Move `units` (native decimals) of `token` from `sender` into one of
    /// their vaults. Returns the 18-decimal amount credited.
    pub fn deposit(
        &mut self,
        sender: Address,
        token: Address,
        vault_id: U256,
        units: U256,
        decimals: u8,
    ) -> Result<U256, LedgerError> {
        let amount = scale18(units, decimals)?;
        let key = VaultKey::new(sender, token, vault_id);
        if self.vaults.balance(&key).checked_add(amount).is_none() {
            return Err(LedgerError::Overflow);
        }
        let book = self.address();
        self.chain.transfer(token, sender, book, units)?;
        self.vaults.credit(key, amount)?;

        info!(
            %sender,
            %token,
            %vault_id,
            amount = ?to_decimal(amount),
            "deposit"
        );
        self.events.push(OrderbookEvent::Deposit(Deposit {
            sender,
            token,
            vault_id,
            units,
            amount,
        }));
        Ok(amount)
    }

    /// Withdraw up to `units` (native decimals) from an existing vault.
    ///
    /// The vault is debited at most its balance. Returns the 18-decimal
    /// amount that left the vault.
    pub fn withdraw(
        &mut self,
        sender: Address,
        token: Address,
        vault_id: U256,
        units: U256,
        decimals: u8,
    ) -> Result<U256, LedgerError> {
        let key = VaultKey::new(sender, token, vault_id);
        if !self.vaults.exists(&key) {
            return Err(LedgerError::VaultNotFound {
                owner: sender,
                token,
                vault_id,
            });
        }
        let requested = scale18(units, decimals)?;
        let amount = self.vaults.debit_saturating(key, requested);
        let native = rescale(amount, FP_DECIMALS, decimals)?;
        let book = self.address();
        self.chain.transfer_saturating(token, book, sender, native)?;

        info!(
            %sender,
            %token,
            %vault_id,
            amount = ?to_decimal(amount),
            "withdraw"
        );
        self.events.push(OrderbookEvent::Withdraw(Withdraw {
            sender,
            token,
            vault_id,
            requested,
            amount,
        }));
        Ok(amount)
    }

    // ───────────────────────── Evaluation ─────────────────────────

    /// Run source 0 of `order` as seen by `counterparty`.
    ///
    /// The last two stack values are `(max_output, price)`.
    pub fn eval_order(
        &self,
        order: &Order,
        counterparty: Address,
        timestamp: Option<u64>,
        block_number: Option<u64>,
    ) -> Result<OrderEval, LedgerError> {
        let hash = order.hash();
        let input = RunInput::new(vec![hash.to_word(), address_to_word(counterparty)])
            .with_timestamp(timestamp)
            .with_block_number(block_number)
            .with_sender(self.address());
        let stack = self.interpreter()?.run(self, &order.config, &input, 0)?;
        match stack.as_slice() {
            [.., max_output, price] => Ok(OrderEval {
                max_output: *max_output,
                price: *price,
            }),
            _ => Err(LedgerError::MissingResults {
                order: hash,
                found: stack.len(),
            }),
        }
    }

    // ───────────────────────── Clear ─────────────────────────

    /// Settle `a` against `b`, paying residuals to `sender`'s bounty vaults.
    ///
    /// Both orders are evaluated before anything is written. When either
    /// residual would be negative nothing is written and the outcome is
    /// [`ClearOutcome::NoOp`].
    pub fn clear(
        &mut self,
        sender: Address,
        a: &Order,
        b: &Order,
        bounty: BountyConfig,
        timestamp: Option<u64>,
        block_number: Option<u64>,
    ) -> Result<ClearOutcome, LedgerError> {
        let a_hash = a.hash();
        let b_hash = b.hash();
        if !self.orders.contains_key(&a_hash) {
            return Err(LedgerError::UnknownOrder(a_hash));
        }
        if !self.orders.contains_key(&b_hash) {
            return Err(LedgerError::UnknownOrder(b_hash));
        }
        if a.owner == b.owner {
            return Err(LedgerError::SameOwner(a_hash, b_hash));
        }

        let a_input = io_at(a_hash, &a.inputs, bounty.a_input_io_index)?;
        let a_output = io_at(a_hash, &a.outputs, bounty.a_output_io_index)?;
        let b_input = io_at(b_hash, &b.inputs, bounty.b_input_io_index)?;
        let b_output = io_at(b_hash, &b.outputs, bounty.b_output_io_index)?;
        if a_output.token != b_input.token {
            return Err(LedgerError::TokenMismatch {
                output: a_output.token,
                input: b_input.token,
            });
        }
        if b_output.token != a_input.token {
            return Err(LedgerError::TokenMismatch {
                output: b_output.token,
                input: a_input.token,
            });
        }

        let a_output_key = VaultKey::new(a.owner, a_output.token, a_output.vault_id);
        let b_output_key = VaultKey::new(b.owner, b_output.token, b_output.vault_id);

        let mut a_eval = self.eval_order(a, b.owner, timestamp, block_number)?;
        let mut b_eval = self.eval_order(b, a.owner, timestamp, block_number)?;
        a_eval.max_output = a_eval.max_output.min(self.vaults.balance(&a_output_key));
        b_eval.max_output = b_eval.max_output.min(self.vaults.balance(&b_output_key));

        let change = state_change(a_eval, b_eval)?;
        let (Some(a_bounty), Some(b_bounty)) = (change.a_bounty(), change.b_bounty()) else {
            warn!(a = %a_hash, b = %b_hash, ?change, "clear has a negative residual");
            return Ok(ClearOutcome::NoOp {
                reason: "negative bounty".to_string(),
                change,
            });
        };

        self.apply(ApplyClear {
            sender,
            a,
            b,
            a_hash,
            b_hash,
            a_input,
            b_input,
            a_output_key,
            b_output_key,
            a_bounty,
            b_bounty,
            bounty,
            change,
        })?;

        info!(
            a = %a_hash,
            b = %b_hash,
            a_output = ?to_decimal(change.a_output),
            b_output = ?to_decimal(change.b_output),
            "clear settled"
        );
        self.events.push(OrderbookEvent::Clear(Clear {
            sender,
            a: a_hash,
            b: b_hash,
            bounty,
        }));
        self.events
            .push(OrderbookEvent::AfterClear(AfterClear { change }));
        Ok(ClearOutcome::Settled(change))
    }

    fn apply(&mut self, clear: ApplyClear<'_>) -> Result<(), LedgerError> {
        let ApplyClear {
            sender,
            a,
            b,
            a_hash,
            b_hash,
            a_input,
            b_input,
            a_output_key,
            b_output_key,
            a_bounty,
            b_bounty,
            bounty,
            change,
        } = clear;

        // Credits are checked before any balance moves.
        let a_input_key = VaultKey::new(a.owner, a_input.token, a_input.vault_id);
        let b_input_key = VaultKey::new(b.owner, b_input.token, b_input.vault_id);
        let a_bounty_key = VaultKey::new(sender, a_output_key.token, bounty.a_bounty_vault_id);
        let b_bounty_key = VaultKey::new(sender, b_output_key.token, bounty.b_bounty_vault_id);
        let mut staged = self.vaults.clone();
        staged.debit_saturating(a_output_key, change.a_output);
        staged.debit_saturating(b_output_key, change.b_output);
        staged.credit(a_input_key, change.a_input)?;
        staged.credit(b_input_key, change.b_input)?;
        staged.credit(a_bounty_key, a_bounty)?;
        staged.credit(b_bounty_key, b_bounty)?;

        let a_cleared = self
            .order_cleared(&a_hash)
            .unwrap_or(U256::ZERO)
            .checked_add(change.a_output)
            .ok_or(LedgerError::Overflow)?;
        let b_cleared = self
            .order_cleared(&b_hash)
            .unwrap_or(U256::ZERO)
            .checked_add(change.b_output)
            .ok_or(LedgerError::Overflow)?;
        let a_against_b = self
            .counterparty_cleared(&a_hash, &b.owner)
            .unwrap_or(U256::ZERO)
            .checked_add(change.a_output)
            .ok_or(LedgerError::Overflow)?;
        let b_against_a = self
            .counterparty_cleared(&b_hash, &a.owner)
            .unwrap_or(U256::ZERO)
            .checked_add(change.b_output)
            .ok_or(LedgerError::Overflow)?;

        self.vaults = staged;
        self.cleared.insert(a_hash, a_cleared);
        self.cleared.insert(b_hash, b_cleared);
        self.counterparty_cleared
            .entry(a_hash)
            .or_default()
            .insert(b.owner, a_against_b);
        self.counterparty_cleared
            .entry(b_hash)
            .or_default()
            .insert(a.owner, b_against_a);
        Ok(())
    }

    // ───────────────────────── Events ─────────────────────────

    pub fn events(&self) -> &[OrderbookEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<OrderbookEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Everything `clear` resolved before writing.
struct ApplyClear<'a> {
    sender: Address,
    a: &'a Order,
    b: &'a Order,
    a_hash: OrderHash,
    b_hash: OrderHash,
    a_input: Io,
    b_input: Io,
    a_output_key: VaultKey,
    b_output_key: VaultKey,
    a_bounty: U256,
    b_bounty: U256,
    bounty: BountyConfig,
    change: ClearStateChange,
}

impl ChainState for Orderbook {
    fn erc20_balance_of(&self, token: Address, account: Address) -> Result<U256, RuntimeError> {
        Ok(self.chain.balance_of(&token, &account))
    }

    fn erc20_total_supply(&self, token: Address) -> Result<U256, RuntimeError> {
        Ok(self.chain.total_supply(&token))
    }
}
