//! The standard opcode set
//!
//! Indices 0..=45 are fixed; domains (such as the orderbook) append their own
//! opcodes after them with [`OpMetaTable::extend`].

use crate::opmeta::{Arity, OpMeta, OpMetaTable};

/// Standard opcodes in table order.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardOp {
    Constant = 0,
    Stack,
    Context,
    Storage,
    Zipmap,
    Debug,
    Ierc20BalanceOf,
    Ierc20TotalSupply,
    Ierc20SnapshotBalanceOfAt,
    Ierc20SnapshotTotalSupplyAt,
    Ierc721BalanceOf,
    Ierc721OwnerOf,
    Ierc1155BalanceOf,
    Ierc1155BalanceOfBatch,
    BlockNumber,
    Sender,
    ThisAddress,
    BlockTimestamp,
    Scale18,
    Scale18Div,
    Scale18Mul,
    ScaleBy,
    ScaleN,
    Any,
    EagerIf,
    EqualTo,
    Every,
    GreaterThan,
    IsZero,
    LessThan,
    SaturatingAdd,
    SaturatingMul,
    SaturatingSub,
    Add,
    Div,
    Exp,
    Max,
    Min,
    Mod,
    Mul,
    Sub,
    ItierV2Report,
    ItierV2ReportTimeForTier,
    SaturatingDiff,
    SelectLte,
    UpdateTimesForTierRange,
}

impl StandardOp {
    /// Number of standard opcodes.
    pub const COUNT: usize = 46;

    pub const ALL: [StandardOp; Self::COUNT] = [
        StandardOp::Constant,
        StandardOp::Stack,
        StandardOp::Context,
        StandardOp::Storage,
        StandardOp::Zipmap,
        StandardOp::Debug,
        StandardOp::Ierc20BalanceOf,
        StandardOp::Ierc20TotalSupply,
        StandardOp::Ierc20SnapshotBalanceOfAt,
        StandardOp::Ierc20SnapshotTotalSupplyAt,
        StandardOp::Ierc721BalanceOf,
        StandardOp::Ierc721OwnerOf,
        StandardOp::Ierc1155BalanceOf,
        StandardOp::Ierc1155BalanceOfBatch,
        StandardOp::BlockNumber,
        StandardOp::Sender,
        StandardOp::ThisAddress,
        StandardOp::BlockTimestamp,
        StandardOp::Scale18,
        StandardOp::Scale18Div,
        StandardOp::Scale18Mul,
        StandardOp::ScaleBy,
        StandardOp::ScaleN,
        StandardOp::Any,
        StandardOp::EagerIf,
        StandardOp::EqualTo,
        StandardOp::Every,
        StandardOp::GreaterThan,
        StandardOp::IsZero,
        StandardOp::LessThan,
        StandardOp::SaturatingAdd,
        StandardOp::SaturatingMul,
        StandardOp::SaturatingSub,
        StandardOp::Add,
        StandardOp::Div,
        StandardOp::Exp,
        StandardOp::Max,
        StandardOp::Min,
        StandardOp::Mod,
        StandardOp::Mul,
        StandardOp::Sub,
        StandardOp::ItierV2Report,
        StandardOp::ItierV2ReportTimeForTier,
        StandardOp::SaturatingDiff,
        StandardOp::SelectLte,
        StandardOp::UpdateTimesForTierRange,
    ];

    pub fn from_u8(opcode: u8) -> Option<Self> {
        Self::ALL.get(usize::from(opcode)).copied()
    }

    /// Canonical table name.
    pub fn name(self) -> &'static str {
        match self {
            StandardOp::Constant => "CONSTANT",
            StandardOp::Stack => "STACK",
            StandardOp::Context => "CONTEXT",
            StandardOp::Storage => "STORAGE",
            StandardOp::Zipmap => "ZIPMAP",
            StandardOp::Debug => "DEBUG",
            StandardOp::Ierc20BalanceOf => "IERC20_BALANCE_OF",
            StandardOp::Ierc20TotalSupply => "IERC20_TOTAL_SUPPLY",
            StandardOp::Ierc20SnapshotBalanceOfAt => "IERC20_SNAPSHOT_BALANCE_OF_AT",
            StandardOp::Ierc20SnapshotTotalSupplyAt => "IERC20_SNAPSHOT_TOTAL_SUPPLY_AT",
            StandardOp::Ierc721BalanceOf => "IERC721_BALANCE_OF",
            StandardOp::Ierc721OwnerOf => "IERC721_OWNER_OF",
            StandardOp::Ierc1155BalanceOf => "IERC1155_BALANCE_OF",
            StandardOp::Ierc1155BalanceOfBatch => "IERC1155_BALANCE_OF_BATCH",
            StandardOp::BlockNumber => "BLOCK_NUMBER",
            StandardOp::Sender => "SENDER",
            StandardOp::ThisAddress => "THIS_ADDRESS",
            StandardOp::BlockTimestamp => "BLOCK_TIMESTAMP",
            StandardOp::Scale18 => "SCALE18",
            StandardOp::Scale18Div => "SCALE18_DIV",
            StandardOp::Scale18Mul => "SCALE18_MUL",
            StandardOp::ScaleBy => "SCALE_BY",
            StandardOp::ScaleN => "SCALEN",
            StandardOp::Any => "ANY",
            StandardOp::EagerIf => "EAGER_IF",
            StandardOp::EqualTo => "EQUAL_TO",
            StandardOp::Every => "EVERY",
            StandardOp::GreaterThan => "GREATER_THAN",
            StandardOp::IsZero => "ISZERO",
            StandardOp::LessThan => "LESS_THAN",
            StandardOp::SaturatingAdd => "SATURATING_ADD",
            StandardOp::SaturatingMul => "SATURATING_MUL",
            StandardOp::SaturatingSub => "SATURATING_SUB",
            StandardOp::Add => "ADD",
            StandardOp::Div => "DIV",
            StandardOp::Exp => "EXP",
            StandardOp::Max => "MAX",
            StandardOp::Min => "MIN",
            StandardOp::Mod => "MOD",
            StandardOp::Mul => "MUL",
            StandardOp::Sub => "SUB",
            StandardOp::ItierV2Report => "ITIERV2_REPORT",
            StandardOp::ItierV2ReportTimeForTier => "ITIERV2_REPORT_TIME_FOR_TIER",
            StandardOp::SaturatingDiff => "SATURATING_DIFF",
            StandardOp::SelectLte => "SELECT_LTE",
            StandardOp::UpdateTimesForTierRange => "UPDATE_TIMES_FOR_TIER_RANGE",
        }
    }

    /// Canonical names of all standard opcodes, in order.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|op| op.name()).collect()
    }
}

fn op(name: &str, pops: Arity, pushes: Arity, aliases: &[&str], description: &str) -> OpMeta {
    OpMeta::new(name, pops, pushes)
        .with_aliases(aliases)
        .with_description(description)
}

/// Metadata entries for the standard opcodes.
pub fn standard_entries() -> Vec<OpMeta> {
    use Arity::{Fixed, Operand, OperandPlus};

    vec![
        op("CONSTANT", Fixed(0), Fixed(1), &["VAL", "CONST"], "Push a value from the constant pool"),
        op("STACK", Fixed(0), Fixed(1), &[], "Copy a value from the current stack frame"),
        op("CONTEXT", Fixed(0), Fixed(1), &["CTX"], "Push a caller-supplied context value"),
        op("STORAGE", Fixed(0), Fixed(1), &[], "Push a storage slot"),
        op("ZIPMAP", Arity::ZipmapInputs, Arity::ZipmapOutputs, &[], "Run a source over packed value chunks"),
        op("DEBUG", Fixed(0), Fixed(0), &[], "Log the current stack"),
        op("IERC20_BALANCE_OF", Fixed(2), Fixed(1), &["ERC20_BALANCE_OF"], "ERC20 balance of an account"),
        op("IERC20_TOTAL_SUPPLY", Fixed(1), Fixed(1), &["ERC20_TOTAL_SUPPLY"], "ERC20 total supply"),
        op(
            "IERC20_SNAPSHOT_BALANCE_OF_AT",
            Fixed(3),
            Fixed(1),
            &["ERC20_SNAPSHOT_BALANCE_OF_AT"],
            "ERC20 balance at a snapshot",
        ),
        op(
            "IERC20_SNAPSHOT_TOTAL_SUPPLY_AT",
            Fixed(2),
            Fixed(1),
            &["ERC20_SNAPSHOT_TOTAL_SUPPLY_AT"],
            "ERC20 total supply at a snapshot",
        ),
        op("IERC721_BALANCE_OF", Fixed(2), Fixed(1), &["ERC721_BALANCE_OF"], "ERC721 balance of an account"),
        op("IERC721_OWNER_OF", Fixed(2), Fixed(1), &["ERC721_OWNER_OF"], "Owner of an ERC721 token id"),
        op("IERC1155_BALANCE_OF", Fixed(3), Fixed(1), &["ERC1155_BALANCE_OF"], "ERC1155 balance of an account"),
        op(
            "IERC1155_BALANCE_OF_BATCH",
            Arity::BalanceOfBatch,
            Operand,
            &["ERC1155_BALANCE_OF_BATCH"],
            "ERC1155 balances for several accounts",
        ),
        op("BLOCK_NUMBER", Fixed(0), Fixed(1), &["CURRENT_BLOCK"], "Current block number"),
        op("SENDER", Fixed(0), Fixed(1), &["MSG_SENDER"], "Caller address"),
        op("THIS_ADDRESS", Fixed(0), Fixed(1), &[], "Address of the running interpreter"),
        op("BLOCK_TIMESTAMP", Fixed(0), Fixed(1), &["NOW", "CURRENT_TIMESTAMP"], "Current block timestamp"),
        op("SCALE18", Fixed(1), Fixed(1), &[], "Rescale a value to 18 decimals"),
        op("SCALE18_DIV", Fixed(2), Fixed(1), &[], "Fixed-point division of rescaled values"),
        op("SCALE18_MUL", Fixed(2), Fixed(1), &[], "Fixed-point multiplication of rescaled values"),
        op("SCALE_BY", Fixed(1), Fixed(1), &[], "Scale by a signed power of ten"),
        op("SCALEN", Fixed(1), Fixed(1), &[], "Rescale an 18-decimal value to N decimals"),
        op("ANY", Operand, Fixed(1), &["OR", "||"], "First non-zero value, or zero"),
        op("EAGER_IF", Fixed(3), Fixed(1), &["IF"], "Select between two values by a condition"),
        op("EQUAL_TO", Fixed(2), Fixed(1), &["EQ", "=="], "1 if both values are equal"),
        op("EVERY", Operand, Fixed(1), &["AND", "&&"], "First value if all are non-zero, or zero"),
        op("GREATER_THAN", Fixed(2), Fixed(1), &["GT", ">"], "1 if a > b"),
        op("ISZERO", Fixed(1), Fixed(1), &["NOT", "!"], "1 if the value is zero"),
        op("LESS_THAN", Fixed(2), Fixed(1), &["LT", "<"], "1 if a < b"),
        op("SATURATING_ADD", Operand, Fixed(1), &["SAT_ADD"], "Sum clamped at the maximum"),
        op("SATURATING_MUL", Operand, Fixed(1), &["SAT_MUL"], "Product clamped at the maximum"),
        op("SATURATING_SUB", Operand, Fixed(1), &["SAT_SUB"], "Difference clamped at zero"),
        op("ADD", Operand, Fixed(1), &["SUM", "+"], "Checked sum"),
        op("DIV", Operand, Fixed(1), &["/"], "Checked left-to-right division"),
        op("EXP", Operand, Fixed(1), &["POW", "^"], "Checked left-to-right exponentiation"),
        op("MAX", Operand, Fixed(1), &[], "Largest value"),
        op("MIN", Operand, Fixed(1), &[], "Smallest value"),
        op("MOD", Operand, Fixed(1), &["%"], "Checked left-to-right modulo"),
        op("MUL", Operand, Fixed(1), &["*"], "Checked product"),
        op("SUB", Operand, Fixed(1), &["-"], "Checked left-to-right difference"),
        op("ITIERV2_REPORT", OperandPlus(2), Fixed(1), &["REPORT"], "Tier report of an account"),
        op(
            "ITIERV2_REPORT_TIME_FOR_TIER",
            OperandPlus(3),
            Fixed(1),
            &["REPORT_TIME_FOR_TIER"],
            "Time an account reached a tier",
        ),
        op("SATURATING_DIFF", Fixed(2), Fixed(1), &["SAT_DIFF"], "Per-tier saturating difference of two reports"),
        op("SELECT_LTE", Arity::SelectLteInputs, Fixed(1), &[], "Combine reports reached before a time"),
        op(
            "UPDATE_TIMES_FOR_TIER_RANGE",
            Fixed(2),
            Fixed(1),
            &[],
            "Set the times of a tier range in a report",
        ),
    ]
}

/// The standard opcode table.
///
/// The entries are static and known to be valid, so this cannot fail.
pub fn standard_table() -> OpMetaTable {
    match OpMetaTable::new(standard_entries()) {
        Ok(table) => table,
        Err(err) => unreachable!("standard opcode table is invalid: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_order() {
        let table = standard_table();
        assert_eq!(table.len(), StandardOp::COUNT);
        for op in StandardOp::ALL {
            let meta = table.get(op as u8).unwrap();
            assert_eq!(meta.name, op.name());
            assert_eq!(StandardOp::from_u8(op as u8), Some(op));
        }
        assert!(table.check_prefix(&StandardOp::names()).is_ok());
        assert_eq!(StandardOp::from_u8(46), None);
    }

    #[test]
    fn test_known_indices() {
        assert_eq!(StandardOp::Constant as u8, 0);
        assert_eq!(StandardOp::BlockTimestamp as u8, 17);
        assert_eq!(StandardOp::Any as u8, 23);
        assert_eq!(StandardOp::Add as u8, 33);
        assert_eq!(StandardOp::Mod as u8, 38);
        assert_eq!(StandardOp::UpdateTimesForTierRange as u8, 45);
    }

    #[test]
    fn test_aliases_resolve() {
        let table = standard_table();
        assert_eq!(table.lookup("+"), Some(StandardOp::Add as u8));
        assert_eq!(table.lookup("now"), Some(StandardOp::BlockTimestamp as u8));
        assert_eq!(table.lookup("erc20-balance-of"), Some(StandardOp::Ierc20BalanceOf as u8));
        assert_eq!(table.lookup("&&"), Some(StandardOp::Every as u8));
        assert_eq!(table.lookup("if"), Some(StandardOp::EagerIf as u8));
        assert_eq!(table.lookup("sat-diff"), Some(StandardOp::SaturatingDiff as u8));
    }

    #[test]
    fn test_every_entry_has_description() {
        for meta in standard_table().entries() {
            assert!(meta.description().is_some(), "{} lacks a description", meta.name);
        }
    }
}
