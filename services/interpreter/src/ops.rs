//! Standard opcode implementations that only see their popped arguments
//!
//! Frame access (CONSTANT, STACK, CONTEXT, STORAGE, ZIPMAP, DEBUG) lives in
//! the engine. Everything here is a pure function of the arguments, the
//! operand, the run input and the host.

use alloy_primitives::U256;
use types::errors::NumericError;
use types::ids::{address_to_word, word_to_address};
use types::numeric::{fp_div, fp_mul, scale18, scale_by, scale_n};
use types::ops::StandardOp;

use crate::config::InterpreterConfig;
use crate::engine::RunInput;
use crate::error::RuntimeError;
use crate::host::ChainState;
use crate::tier::{self, Logic, Mode};

fn bool_word(value: bool) -> U256 {
    if value {
        U256::from(1u64)
    } else {
        U256::ZERO
    }
}

/// Left fold that fails on the first `None`.
fn checked_fold(
    name: &str,
    args: &[U256],
    step: fn(U256, U256) -> Option<U256>,
    guard_zero: bool,
) -> Result<U256, RuntimeError> {
    let Some((first, rest)) = args.split_first() else {
        return Ok(U256::ZERO);
    };
    rest.iter().try_fold(*first, |acc, value| {
        if guard_zero && value.is_zero() {
            return Err(RuntimeError::DivisionByZero(name.to_string()));
        }
        step(acc, *value).ok_or_else(|| RuntimeError::Overflow(name.to_string()))
    })
}

fn fold(args: &[U256], step: fn(U256, U256) -> U256) -> U256 {
    match args.split_first() {
        Some((first, rest)) => rest.iter().fold(*first, |acc, value| step(acc, *value)),
        None => U256::ZERO,
    }
}

fn time_word(what: &'static str, value: U256) -> Result<u32, RuntimeError> {
    u32::try_from(value).map_err(|_| RuntimeError::OutOfBounds { what, value })
}

fn select_lte_mode(operand: u8) -> (Logic, Mode) {
    let logic = if operand & 1 == 0 { Logic::Every } else { Logic::Any };
    let mode = match (operand >> 1) & 0b11 {
        0 => Mode::Min,
        1 => Mode::Max,
        _ => Mode::First,
    };
    (logic, mode)
}

/// Evaluate a standard opcode over its popped `args` (bottom first).
pub(crate) fn apply<H: ChainState>(
    op: StandardOp,
    operand: u8,
    args: &[U256],
    input: &RunInput,
    config: &InterpreterConfig,
    host: &H,
) -> Result<Vec<U256>, RuntimeError> {
    let name = op.name();
    let arg = |i: usize| args.get(i).copied().unwrap_or(U256::ZERO);
    let numeric = |e: NumericError| RuntimeError::numeric(name, e);

    let value = match op {
        StandardOp::Ierc20BalanceOf => {
            host.erc20_balance_of(word_to_address(arg(0)), word_to_address(arg(1)))?
        }
        StandardOp::Ierc20TotalSupply => host.erc20_total_supply(word_to_address(arg(0)))?,
        StandardOp::Ierc20SnapshotBalanceOfAt => host.erc20_snapshot_balance_of_at(
            word_to_address(arg(0)),
            word_to_address(arg(1)),
            arg(2),
        )?,
        StandardOp::Ierc20SnapshotTotalSupplyAt => {
            host.erc20_snapshot_total_supply_at(word_to_address(arg(0)), arg(1))?
        }
        StandardOp::Ierc721BalanceOf => {
            host.erc721_balance_of(word_to_address(arg(0)), word_to_address(arg(1)))?
        }
        StandardOp::Ierc721OwnerOf => {
            address_to_word(host.erc721_owner_of(word_to_address(arg(0)), arg(1))?)
        }
        StandardOp::Ierc1155BalanceOf => host.erc1155_balance_of(
            word_to_address(arg(0)),
            word_to_address(arg(1)),
            arg(2),
        )?,
        StandardOp::Ierc1155BalanceOfBatch => {
            let n = usize::from(operand);
            let accounts: Vec<_> = args[1..=n].iter().map(|w| word_to_address(*w)).collect();
            let ids = &args[n + 1..];
            return host.erc1155_balance_of_batch(word_to_address(arg(0)), &accounts, ids);
        }

        StandardOp::BlockNumber => U256::from(input.block_number.unwrap_or(0)),
        StandardOp::Sender => address_to_word(input.sender),
        StandardOp::ThisAddress => address_to_word(config.address),
        StandardOp::BlockTimestamp => U256::from(input.timestamp.unwrap_or(0)),

        StandardOp::Scale18 => scale18(arg(0), operand).map_err(numeric)?,
        StandardOp::Scale18Div => {
            fp_div(scale18(arg(0), operand).map_err(numeric)?, arg(1)).map_err(numeric)?
        }
        StandardOp::Scale18Mul => {
            fp_mul(scale18(arg(0), operand).map_err(numeric)?, arg(1)).map_err(numeric)?
        }
        StandardOp::ScaleBy => scale_by(arg(0), operand as i8).map_err(numeric)?,
        StandardOp::ScaleN => scale_n(arg(0), operand).map_err(numeric)?,

        StandardOp::Any => args.iter().copied().find(|v| !v.is_zero()).unwrap_or(U256::ZERO),
        StandardOp::Every => {
            if args.iter().all(|v| !v.is_zero()) {
                arg(0)
            } else {
                U256::ZERO
            }
        }
        StandardOp::EagerIf => {
            if arg(0).is_zero() {
                arg(2)
            } else {
                arg(1)
            }
        }
        StandardOp::EqualTo => bool_word(arg(0) == arg(1)),
        StandardOp::GreaterThan => bool_word(arg(0) > arg(1)),
        StandardOp::LessThan => bool_word(arg(0) < arg(1)),
        StandardOp::IsZero => bool_word(arg(0).is_zero()),

        StandardOp::SaturatingAdd => fold(args, U256::saturating_add),
        StandardOp::SaturatingMul => fold(args, U256::saturating_mul),
        StandardOp::SaturatingSub => fold(args, U256::saturating_sub),

        StandardOp::Add => checked_fold(name, args, U256::checked_add, false)?,
        StandardOp::Sub => checked_fold(name, args, U256::checked_sub, false)?,
        StandardOp::Mul => checked_fold(name, args, U256::checked_mul, false)?,
        StandardOp::Div => checked_fold(name, args, U256::checked_div, true)?,
        StandardOp::Mod => checked_fold(name, args, U256::checked_rem, true)?,
        StandardOp::Exp => checked_fold(name, args, U256::checked_pow, false)?,
        StandardOp::Max => args.iter().copied().max().unwrap_or(U256::ZERO),
        StandardOp::Min => args.iter().copied().min().unwrap_or(U256::ZERO),

        StandardOp::ItierV2Report => {
            host.tier_report(word_to_address(arg(0)), word_to_address(arg(1)), &args[2..])?
        }
        StandardOp::ItierV2ReportTimeForTier => host.tier_report_time_for_tier(
            word_to_address(arg(0)),
            word_to_address(arg(1)),
            arg(2),
            &args[3..],
        )?,
        StandardOp::SaturatingDiff => tier::saturating_diff(arg(0), arg(1)),
        StandardOp::SelectLte => {
            let (logic, mode) = select_lte_mode(operand);
            let Some((at, reports)) = args.split_last() else {
                return Ok(vec![tier::NEVER_REPORT]);
            };
            let at = time_word("a report time", *at)?;
            tier::select_lte(reports, at, logic, mode)
        }
        StandardOp::UpdateTimesForTierRange => {
            let start = usize::from(operand & 0x0f);
            let end = usize::from(operand >> 4);
            let time = time_word("a report time", arg(1))?;
            tier::update_times_for_tier_range(arg(0), start, end, time)
        }

        StandardOp::Constant
        | StandardOp::Stack
        | StandardOp::Context
        | StandardOp::Storage
        | StandardOp::Zipmap
        | StandardOp::Debug => unreachable!("{name} is dispatched by the engine"),
    };
    Ok(vec![value])
}
