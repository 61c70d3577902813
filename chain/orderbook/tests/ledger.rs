//! Ledger Tests
//!
//! End-to-end ledger behaviour with compiled order rules:
//! - Order registration idempotence
//! - Deposit / withdraw rescaling and failure modes
//! - Clear settlement, bounties and no-op clears
//! - Cleared-funds opcodes
//! - Fuzz testing (proptest): conservation and non-negativity

use alloy_primitives::{Address, U256};
use compiler::Compiler;
use interpreter::RuntimeError;
use orderbook::events::OrderbookEvent;
use orderbook::{orderbook_table, BountyConfig, ClearOutcome, LedgerError, Orderbook};
use types::bytecode::{Instruction, StateConfig};
use types::ids::OrderHash;
use types::numeric::FP_ONE;
use types::ops::StandardOp;
use types::order::{Io, Order};

const TOKEN_X: Address = Address::repeat_byte(0x01);
const TOKEN_Y: Address = Address::repeat_byte(0x02);
const ALICE: Address = Address::repeat_byte(0xa1);
const BOB: Address = Address::repeat_byte(0xb0);
const CLEARER: Address = Address::repeat_byte(0xc1);

fn vault() -> U256 {
    U256::from(1u64)
}

fn fp(units: u64) -> U256 {
    U256::from(units) * FP_ONE
}

fn order(owner: Address, input: Address, output: Address, rule: &str) -> Order {
    let config = Compiler::new(orderbook_table()).compile(rule);
    assert!(!config.is_empty(), "{rule} did not compile");
    Order::single(owner, Io::new(input, vault()), Io::new(output, vault()), config)
}

/// Alice sells X for Y, Bob sells Y for X; both funded with 1000 of each.
fn setup() -> Orderbook {
    let mut book = Orderbook::new();
    book.chain_mut().register(TOKEN_X, 18);
    book.chain_mut().register(TOKEN_Y, 18);
    for account in [ALICE, BOB] {
        book.chain_mut().mint(TOKEN_X, account, fp(1000)).unwrap();
        book.chain_mut().mint(TOKEN_Y, account, fp(1000)).unwrap();
    }
    book
}

fn fund(book: &mut Orderbook, owner: Address, token: Address, units: U256) {
    book.deposit(owner, token, vault(), units, 18).unwrap();
}

fn balance(book: &Orderbook, owner: Address, token: Address) -> U256 {
    book.vault_balance(owner, token, vault()).unwrap_or(U256::ZERO)
}

fn register(book: &mut Orderbook, order: &Order) -> OrderHash {
    book.add_order(order.owner, order.clone()).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
// Registration
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_add_order_creates_zero_vaults() {
    let mut book = setup();
    let alice = order(ALICE, TOKEN_Y, TOKEN_X, "10e18, 1e18");
    register(&mut book, &alice);
    assert_eq!(book.vault_balance(ALICE, TOKEN_X, vault()), Some(U256::ZERO));
    assert_eq!(book.vault_balance(ALICE, TOKEN_Y, vault()), Some(U256::ZERO));
    assert_eq!(book.order_cleared(&alice.hash()), Some(U256::ZERO));
}

#[test]
fn test_add_order_twice_keeps_balances() {
    let mut book = setup();
    let alice = order(ALICE, TOKEN_Y, TOKEN_X, "10e18, 1e18");
    let first = register(&mut book, &alice);
    fund(&mut book, ALICE, TOKEN_X, fp(25));
    let second = register(&mut book, &alice);

    assert_eq!(first, second);
    assert_eq!(balance(&book, ALICE, TOKEN_X), fp(25));
    assert_eq!(book.order_count(), 1);
    let adds = book
        .events()
        .iter()
        .filter(|e| matches!(e, OrderbookEvent::AddOrder(_)))
        .count();
    assert_eq!(adds, 1);
}

#[test]
fn test_add_order_rejects_other_sender() {
    let mut book = setup();
    let alice = order(ALICE, TOKEN_Y, TOKEN_X, "10e18, 1e18");
    let result = book.add_order(BOB, alice.clone());
    assert_eq!(
        result,
        Err(LedgerError::NotOwner {
            sender: BOB,
            order: alice.hash(),
        })
    );
}

#[test]
fn test_add_order_rejects_unknown_opcode() {
    let mut book = setup();
    let config = StateConfig::from_instructions(
        vec![vec![Instruction::new(StandardOp::Constant as u8, 0), Instruction::new(200, 0)]],
        vec![FP_ONE],
    );
    let bad = Order::single(ALICE, Io::new(TOKEN_Y, vault()), Io::new(TOKEN_X, vault()), config);
    assert!(matches!(
        book.add_order(ALICE, bad),
        Err(LedgerError::InvalidOrder(_))
    ));
    assert_eq!(book.order_count(), 0);
}

#[test]
fn test_remove_order_keeps_vaults() {
    let mut book = setup();
    let alice = order(ALICE, TOKEN_Y, TOKEN_X, "10e18, 1e18");
    let hash = register(&mut book, &alice);
    fund(&mut book, ALICE, TOKEN_X, fp(5));

    book.remove_order(ALICE, hash).unwrap();
    assert!(book.order(&hash).is_none());
    assert_eq!(balance(&book, ALICE, TOKEN_X), fp(5));
    assert_eq!(
        book.remove_order(ALICE, hash),
        Err(LedgerError::UnknownOrder(hash))
    );
}

// ═══════════════════════════════════════════════════════════════════
// Deposit / Withdraw
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_deposit_rescales_native_units() {
    let mut book = Orderbook::new();
    book.chain_mut().register(TOKEN_Y, 6);
    book.chain_mut().mint(TOKEN_Y, ALICE, U256::from(10_000_000u64)).unwrap();

    let amount = book
        .deposit(ALICE, TOKEN_Y, vault(), U256::from(2_500_000u64), 6)
        .unwrap();
    assert_eq!(amount, FP_ONE * U256::from(5u64) / U256::from(2u64));
    assert_eq!(balance(&book, ALICE, TOKEN_Y), amount);
    assert_eq!(book.chain().balance_of(&TOKEN_Y, &ALICE), U256::from(7_500_000u64));
    assert_eq!(
        book.chain().balance_of(&TOKEN_Y, &book.address()),
        U256::from(2_500_000u64)
    );
}

#[test]
fn test_deposit_insufficient_balance() {
    let mut book = setup();
    let result = book.deposit(ALICE, TOKEN_X, vault(), fp(1001), 18);
    assert!(matches!(result, Err(LedgerError::InsufficientBalance { .. })));
    assert_eq!(book.vault_balance(ALICE, TOKEN_X, vault()), None);
}

#[test]
fn test_withdraw_missing_vault() {
    let mut book = setup();
    assert_eq!(
        book.withdraw(ALICE, TOKEN_X, vault(), fp(1), 18),
        Err(LedgerError::VaultNotFound {
            owner: ALICE,
            token: TOKEN_X,
            vault_id: vault(),
        })
    );
}

#[test]
fn test_withdraw_clamps_to_balance() {
    let mut book = setup();
    fund(&mut book, ALICE, TOKEN_X, fp(5));
    let withdrawn = book.withdraw(ALICE, TOKEN_X, vault(), fp(8), 18).unwrap();
    assert_eq!(withdrawn, fp(5));
    assert_eq!(balance(&book, ALICE, TOKEN_X), U256::ZERO);
    assert_eq!(book.chain().balance_of(&TOKEN_X, &ALICE), fp(1000));
    assert_eq!(book.chain().balance_of(&TOKEN_X, &book.address()), U256::ZERO);
}

// ═══════════════════════════════════════════════════════════════════
// Clear
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_clear_settles_matching_prices() {
    let mut book = setup();
    let alice = order(ALICE, TOKEN_Y, TOKEN_X, "10e18, 2e18");
    let bob = order(BOB, TOKEN_X, TOKEN_Y, "20e18, 5e17");
    register(&mut book, &alice);
    register(&mut book, &bob);
    fund(&mut book, ALICE, TOKEN_X, fp(10));
    fund(&mut book, BOB, TOKEN_Y, fp(20));

    let outcome = book
        .clear(CLEARER, &alice, &bob, BountyConfig::new(vault()), None, None)
        .unwrap();
    assert!(outcome.is_settled());

    assert_eq!(balance(&book, ALICE, TOKEN_X), U256::ZERO);
    assert_eq!(balance(&book, ALICE, TOKEN_Y), fp(20));
    assert_eq!(balance(&book, BOB, TOKEN_Y), U256::ZERO);
    assert_eq!(balance(&book, BOB, TOKEN_X), fp(10));
    assert_eq!(balance(&book, CLEARER, TOKEN_X), U256::ZERO);
    assert_eq!(book.order_cleared(&alice.hash()), Some(fp(10)));
    assert_eq!(book.counterparty_cleared(&bob.hash(), &ALICE), Some(fp(20)));
}

#[test]
fn test_clear_pays_residual_to_clearer() {
    let mut book = setup();
    let alice = order(ALICE, TOKEN_Y, TOKEN_X, "10e18, 1e18");
    let bob = order(BOB, TOKEN_X, TOKEN_Y, "20e18, 5e17");
    register(&mut book, &alice);
    register(&mut book, &bob);
    fund(&mut book, ALICE, TOKEN_X, fp(10));
    fund(&mut book, BOB, TOKEN_Y, fp(20));

    let outcome = book
        .clear(CLEARER, &alice, &bob, BountyConfig::new(vault()), None, None)
        .unwrap();
    let change = *outcome.change();
    assert_eq!(change.a_output, fp(10));
    assert_eq!(change.b_output, fp(10));
    assert_eq!(balance(&book, CLEARER, TOKEN_X), fp(5));
    assert_eq!(balance(&book, CLEARER, TOKEN_Y), U256::ZERO);
    assert_eq!(balance(&book, BOB, TOKEN_X), fp(5));
    assert_eq!(balance(&book, BOB, TOKEN_Y), fp(10));
}

#[test]
fn test_clear_negative_residual_is_noop() {
    let mut book = setup();
    let alice = order(ALICE, TOKEN_Y, TOKEN_X, "10e18, 2e18");
    let bob = order(BOB, TOKEN_X, TOKEN_Y, "10e18, 2e18");
    register(&mut book, &alice);
    register(&mut book, &bob);
    fund(&mut book, ALICE, TOKEN_X, fp(10));
    fund(&mut book, BOB, TOKEN_Y, fp(10));
    book.drain_events();

    let outcome = book
        .clear(CLEARER, &alice, &bob, BountyConfig::new(vault()), None, None)
        .unwrap();
    assert!(matches!(outcome, ClearOutcome::NoOp { .. }));
    assert_eq!(balance(&book, ALICE, TOKEN_X), fp(10));
    assert_eq!(balance(&book, BOB, TOKEN_Y), fp(10));
    assert_eq!(book.order_cleared(&alice.hash()), Some(U256::ZERO));
    assert!(book.events().is_empty());
}

#[test]
fn test_clear_caps_output_at_vault_balance() {
    let mut book = setup();
    let alice = order(ALICE, TOKEN_Y, TOKEN_X, "100e18, 1e18");
    let bob = order(BOB, TOKEN_X, TOKEN_Y, "100e18, 1e18");
    register(&mut book, &alice);
    register(&mut book, &bob);
    fund(&mut book, ALICE, TOKEN_X, fp(3));
    fund(&mut book, BOB, TOKEN_Y, fp(50));

    let outcome = book
        .clear(CLEARER, &alice, &bob, BountyConfig::new(vault()), None, None)
        .unwrap();
    assert_eq!(outcome.change().a_output, fp(3));
    assert_eq!(outcome.change().b_output, fp(3));
    assert_eq!(balance(&book, BOB, TOKEN_Y), fp(47));
}

#[test]
fn test_clear_rejects_unregistered_and_mismatched() {
    let mut book = setup();
    let alice = order(ALICE, TOKEN_Y, TOKEN_X, "1e18, 1e18");
    let bob = order(BOB, TOKEN_X, TOKEN_Y, "1e18, 1e18");
    let carol = order(Address::repeat_byte(0xca), TOKEN_Y, TOKEN_Y, "1e18, 1e18");
    register(&mut book, &alice);

    assert_eq!(
        book.clear(CLEARER, &alice, &bob, BountyConfig::default(), None, None),
        Err(LedgerError::UnknownOrder(bob.hash()))
    );

    register(&mut book, &carol);
    assert!(matches!(
        book.clear(CLEARER, &alice, &carol, BountyConfig::default(), None, None),
        Err(LedgerError::TokenMismatch { .. })
    ));
    assert!(matches!(
        book.clear(CLEARER, &alice, &alice, BountyConfig::default(), None, None),
        Err(LedgerError::SameOwner(..))
    ));
    assert!(matches!(
        book.clear(
            CLEARER,
            &alice,
            &carol,
            BountyConfig::default().with_io(0, 3, 0, 0),
            None,
            None
        ),
        Err(LedgerError::IoOutOfRange { index: 3, .. })
    ));
}

#[test]
fn test_clear_emits_events() {
    let mut book = setup();
    let alice = order(ALICE, TOKEN_Y, TOKEN_X, "1e18, 1e18");
    let bob = order(BOB, TOKEN_X, TOKEN_Y, "1e18, 1e18");
    register(&mut book, &alice);
    register(&mut book, &bob);
    fund(&mut book, ALICE, TOKEN_X, fp(1));
    fund(&mut book, BOB, TOKEN_Y, fp(1));
    book.drain_events();

    book.clear(CLEARER, &alice, &bob, BountyConfig::new(vault()), None, None)
        .unwrap();
    let events = book.drain_events();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[0], OrderbookEvent::Clear(_)));
    assert!(matches!(events[1], OrderbookEvent::AfterClear(_)));
}

// ═══════════════════════════════════════════════════════════════════
// Orderbook opcodes
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_cleared_funds_visible_to_rules() {
    let mut book = setup();
    let alice = order(
        ALICE,
        TOKEN_Y,
        TOKEN_X,
        "SATURATING_SUB(10e18, ORDER_FUNDS_CLEARED(CONTEXT(0))), \
         ADD(1e18, COUNTERPARTY_FUNDS_CLEARED(CONTEXT(0), CONTEXT(1)))",
    );
    let bob = order(BOB, TOKEN_X, TOKEN_Y, "4e18, 1e18");
    register(&mut book, &alice);
    register(&mut book, &bob);
    fund(&mut book, ALICE, TOKEN_X, fp(10));
    fund(&mut book, BOB, TOKEN_Y, fp(4));

    let before = book.eval_order(&alice, BOB, None, None).unwrap();
    assert_eq!(before.max_output, fp(10));
    assert_eq!(before.price, FP_ONE);

    // bob's price 1.0 absorbs alice at price 1.0
    book.clear(CLEARER, &alice, &bob, BountyConfig::new(vault()), None, None)
        .unwrap();

    let after = book.eval_order(&alice, BOB, None, None).unwrap();
    assert_eq!(after.max_output, fp(6));
    assert_eq!(after.price, FP_ONE + fp(4));
    let other = book.eval_order(&alice, CLEARER, None, None).unwrap();
    assert_eq!(other.price, FP_ONE);
}

#[test]
fn test_cleared_funds_of_unknown_order_is_fatal() {
    let book = setup();
    let stranger = order(ALICE, TOKEN_Y, TOKEN_X, "ORDER_FUNDS_CLEARED(CONTEXT(0)), 1e18");
    let result = book.eval_order(&stranger, BOB, None, None);
    assert_eq!(
        result,
        Err(LedgerError::Runtime(RuntimeError::MissingLedgerEntry {
            kind: "order",
            key: stranger.hash().to_word(),
        }))
    );
}

#[test]
fn test_rules_read_simulated_token_balances() {
    let book = setup();
    let rule = "IERC20_BALANCE_OF(0x0101010101010101010101010101010101010101, CONTEXT(1)), 1e18";
    let alice = order(ALICE, TOKEN_Y, TOKEN_X, rule);
    let eval = book.eval_order(&alice, BOB, None, None).unwrap();
    assert_eq!(eval.max_output, fp(1000));
}

#[test]
fn test_rule_must_leave_two_values() {
    let book = setup();
    let alice = order(ALICE, TOKEN_Y, TOKEN_X, "1e18");
    assert_eq!(
        book.eval_order(&alice, BOB, None, None),
        Err(LedgerError::MissingResults {
            order: alice.hash(),
            found: 1,
        })
    );
}

// ═══════════════════════════════════════════════════════════════════
// Fuzz Testing (proptest)
// ═══════════════════════════════════════════════════════════════════

mod fuzz {
    use super::*;
    use proptest::prelude::*;

    fn token_total(book: &Orderbook, token: Address) -> U256 {
        [ALICE, BOB, CLEARER]
            .iter()
            .flat_map(|owner| book.vaults().owned_by(owner))
            .filter(|(key, _)| key.token == token)
            .fold(U256::ZERO, |acc, (_, balance)| acc + balance)
    }

    proptest! {
        /// Registering an order again never resets a funded vault.
        #[test]
        fn fuzz_add_order_idempotent(amount in 1u64..1000, repeats in 1usize..5) {
            let mut book = setup();
            let alice = order(ALICE, TOKEN_Y, TOKEN_X, "1e18, 1e18");
            register(&mut book, &alice);
            fund(&mut book, ALICE, TOKEN_X, fp(amount));
            for _ in 0..repeats {
                register(&mut book, &alice);
            }
            prop_assert_eq!(balance(&book, ALICE, TOKEN_X), fp(amount));
        }

        /// A settled clear moves exactly what it takes:
        /// inputs + bounties == outputs, per token and in total.
        #[test]
        fn fuzz_clear_conserves(
            a_max in 1u64..500,
            b_max in 1u64..500,
            a_price in 1u64..40,
            b_price in 1u64..40,
            a_funds in 0u64..500,
            b_funds in 0u64..500,
        ) {
            let mut book = setup();
            let a_rule = format!("{}, {}", fp(a_max), U256::from(a_price) * FP_ONE / U256::from(10u64));
            let b_rule = format!("{}, {}", fp(b_max), U256::from(b_price) * FP_ONE / U256::from(10u64));
            let alice = order(ALICE, TOKEN_Y, TOKEN_X, &a_rule);
            let bob = order(BOB, TOKEN_X, TOKEN_Y, &b_rule);
            register(&mut book, &alice);
            register(&mut book, &bob);
            fund(&mut book, ALICE, TOKEN_X, fp(a_funds));
            fund(&mut book, BOB, TOKEN_Y, fp(b_funds));

            let x_before = token_total(&book, TOKEN_X);
            let y_before = token_total(&book, TOKEN_Y);
            let outcome = book
                .clear(CLEARER, &alice, &bob, BountyConfig::new(vault()), None, None)
                .unwrap();

            prop_assert_eq!(token_total(&book, TOKEN_X), x_before);
            prop_assert_eq!(token_total(&book, TOKEN_Y), y_before);
            if let ClearOutcome::Settled(change) = outcome {
                let a_bounty = change.a_bounty().unwrap();
                let b_bounty = change.b_bounty().unwrap();
                prop_assert_eq!(
                    change.a_input + change.b_input + a_bounty + b_bounty,
                    change.a_output + change.b_output
                );
            }
        }

        /// Vault balances never exceed what the orderbook holds on chain,
        /// whatever withdrawals are attempted.
        #[test]
        fn fuzz_withdrawals_never_overdraw(
            deposit in 0u64..1000,
            withdrawals in prop::collection::vec(0u64..600, 1..6),
        ) {
            let mut book = setup();
            fund(&mut book, ALICE, TOKEN_X, fp(deposit));
            let mut withdrawn = U256::ZERO;
            for units in withdrawals {
                withdrawn += book.withdraw(ALICE, TOKEN_X, vault(), fp(units), 18).unwrap();
            }
            prop_assert!(withdrawn <= fp(deposit));
            prop_assert_eq!(balance(&book, ALICE, TOKEN_X), fp(deposit) - withdrawn);
            prop_assert_eq!(
                book.chain().balance_of(&TOKEN_X, &book.address()),
                balance(&book, ALICE, TOKEN_X)
            );
        }
    }
}
