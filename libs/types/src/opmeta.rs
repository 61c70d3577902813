//! Opcode metadata table
//!
//! The table is the contract between compiler and interpreter: index
//! position is an opcode's runtime identity, and the arity descriptors say how
//! many stack items the opcode pops and pushes for a given operand. Word
//! lookup (names and aliases) is built once when the table is loaded, and
//! duplicate words are rejected at that point rather than per lookup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::OpMetaError;

/// Stack arity of an opcode as a function of its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Arity {
    /// Independent of the operand.
    Fixed(usize),
    /// Equal to the operand; the count is decided per call site.
    Operand,
    /// A fixed prefix plus the operand.
    OperandPlus(usize),
    /// `2 * operand + 1` (token, then accounts and ids).
    BalanceOfBatch,
    /// Value count stored in bits 5..8, minus one.
    ZipmapInputs,
    /// `2 ^ loopSize`, loop size stored in bits 3..5.
    ZipmapOutputs,
    /// Reference time plus the report count stored in bits 3..8.
    SelectLteInputs,
}

impl Arity {
    /// Evaluate the arity for a concrete operand.
    pub fn eval(&self, operand: u8) -> usize {
        let operand = usize::from(operand);
        match self {
            Arity::Fixed(n) => *n,
            Arity::Operand => operand,
            Arity::OperandPlus(n) => n + operand,
            Arity::BalanceOfBatch => 2 * operand + 1,
            Arity::ZipmapInputs => (operand >> 5) + 1,
            Arity::ZipmapOutputs => 1 << ((operand >> 3) & 0b11),
            Arity::SelectLteInputs => (operand >> 3) + 1,
        }
    }

    /// `true` when the pop count is only known from the call site.
    pub fn is_variadic(&self) -> bool {
        matches!(self, Arity::Operand)
    }
}

/// Metadata for a single opcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpMeta {
    pub name: String,
    pub pushes: Arity,
    pub pops: Arity,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl OpMeta {
    pub fn new(name: impl Into<String>, pops: Arity, pushes: Arity) -> Self {
        Self {
            name: name.into(),
            pushes,
            pops,
            aliases: Vec::new(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.data = serde_json::json!({ "description": description });
        self
    }

    /// Human-readable description carried in `data`, if any.
    pub fn description(&self) -> Option<&str> {
        self.data.get("description").and_then(|d| d.as_str())
    }
}

/// Normalize a word for lookup: uppercase, `-` becomes `_`.
pub fn normalize(word: &str) -> String {
    word.chars()
        .map(|c| if c == '-' { '_' } else { c.to_ascii_uppercase() })
        .collect()
}

/// Validated opcode table with a prebuilt word index.
#[derive(Debug, Clone)]
pub struct OpMetaTable {
    entries: Vec<OpMeta>,
    words: HashMap<String, u8>,
}

impl OpMetaTable {
    /// Validate entries and build the word index.
    pub fn new(entries: Vec<OpMeta>) -> Result<Self, OpMetaError> {
        if entries.is_empty() {
            return Err(OpMetaError::Empty);
        }
        if entries.len() > 256 {
            return Err(OpMetaError::TooManyOpcodes {
                count: entries.len(),
            });
        }

        let mut words: HashMap<String, u8> = HashMap::new();
        for (index, meta) in entries.iter().enumerate() {
            if meta.name.trim().is_empty() {
                return Err(OpMetaError::EmptyName { index });
            }
            let opcode = index as u8;
            let mut own = vec![normalize(&meta.name)];
            own.extend(meta.aliases.iter().map(|a| normalize(a)));
            own.sort();
            own.dedup();
            for word in own {
                if let Some(first) = words.insert(word.clone(), opcode) {
                    return Err(OpMetaError::DuplicateWord {
                        word,
                        first: usize::from(first),
                        second: index,
                    });
                }
            }
        }

        Ok(Self { entries, words })
    }

    /// Append further opcodes (e.g. domain opcodes) after the existing ones.
    pub fn extend(self, extra: Vec<OpMeta>) -> Result<Self, OpMetaError> {
        let mut entries = self.entries;
        entries.extend(extra);
        Self::new(entries)
    }

    pub fn get(&self, opcode: u8) -> Option<&OpMeta> {
        self.entries.get(usize::from(opcode))
    }

    /// Resolve a name or alias (case-insensitive, `-` == `_`).
    pub fn lookup(&self, word: &str) -> Option<u8> {
        self.words.get(&normalize(word)).copied()
    }

    /// Opcode index of a canonical name.
    pub fn index_of(&self, name: &str) -> Option<u8> {
        let wanted = normalize(name);
        self.entries
            .iter()
            .position(|meta| normalize(&meta.name) == wanted)
            .map(|index| index as u8)
    }

    /// Every normalized word (names and aliases) known to the table.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.words.keys().map(String::as_str)
    }

    pub fn entries(&self) -> &[OpMeta] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check that the first entries follow the given canonical names in order.
    pub fn check_prefix(&self, names: &[&str]) -> Result<(), OpMetaError> {
        for (index, expected) in names.iter().enumerate() {
            let found = self
                .entries
                .get(index)
                .map(|meta| normalize(&meta.name))
                .unwrap_or_default();
            if found != normalize(expected) {
                return Err(OpMetaError::StandardOrder {
                    index,
                    expected: expected.to_string(),
                    found,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> OpMetaTable {
        OpMetaTable::new(vec![
            OpMeta::new("CONSTANT", Arity::Fixed(0), Arity::Fixed(1)),
            OpMeta::new("ADD", Arity::Operand, Arity::Fixed(1)).with_aliases(&["+", "sum"]),
            OpMeta::new("block-number", Arity::Fixed(0), Arity::Fixed(1)),
        ])
        .unwrap()
    }

    #[test]
    fn test_arity_eval() {
        assert_eq!(Arity::Fixed(2).eval(9), 2);
        assert_eq!(Arity::Operand.eval(4), 4);
        assert_eq!(Arity::OperandPlus(3).eval(8), 11);
        assert_eq!(Arity::BalanceOfBatch.eval(2), 5);
        // 3 values, loop size 2
        let zipmap = 1 | (2 << 3) | (2 << 5);
        assert_eq!(Arity::ZipmapInputs.eval(zipmap), 3);
        assert_eq!(Arity::ZipmapOutputs.eval(zipmap), 4);
        assert_eq!(Arity::SelectLteInputs.eval(3 << 3), 4);
    }

    #[test]
    fn test_only_operand_is_variadic() {
        assert!(Arity::Operand.is_variadic());
        assert!(!Arity::OperandPlus(2).is_variadic());
        assert!(!Arity::Fixed(0).is_variadic());
    }

    #[test]
    fn test_lookup_is_normalized() {
        let table = small_table();
        assert_eq!(table.lookup("add"), Some(1));
        assert_eq!(table.lookup("Sum"), Some(1));
        assert_eq!(table.lookup("+"), Some(1));
        assert_eq!(table.lookup("BLOCK_NUMBER"), Some(2));
        assert_eq!(table.lookup("block-number"), Some(2));
        assert_eq!(table.lookup("MUL"), None);
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let result = OpMetaTable::new(vec![
            OpMeta::new("ADD", Arity::Operand, Arity::Fixed(1)).with_aliases(&["plus"]),
            OpMeta::new("SUM", Arity::Operand, Arity::Fixed(1)).with_aliases(&["PLUS"]),
        ]);
        assert_eq!(
            result.unwrap_err(),
            OpMetaError::DuplicateWord {
                word: "PLUS".to_string(),
                first: 0,
                second: 1,
            }
        );
    }

    #[test]
    fn test_alias_repeating_own_name_is_fine() {
        let table = OpMetaTable::new(vec![
            OpMeta::new("ADD", Arity::Operand, Arity::Fixed(1)).with_aliases(&["add"]),
        ]);
        assert!(table.is_ok());
    }

    #[test]
    fn test_empty_table_rejected() {
        assert_eq!(OpMetaTable::new(vec![]).unwrap_err(), OpMetaError::Empty);
    }

    #[test]
    fn test_empty_name_rejected() {
        let result = OpMetaTable::new(vec![OpMeta::new(" ", Arity::Fixed(0), Arity::Fixed(0))]);
        assert_eq!(result.unwrap_err(), OpMetaError::EmptyName { index: 0 });
    }

    #[test]
    fn test_extend_appends_after_existing() {
        let table = small_table()
            .extend(vec![OpMeta::new("EXTRA", Arity::Fixed(1), Arity::Fixed(1))])
            .unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.lookup("extra"), Some(3));
    }

    #[test]
    fn test_check_prefix() {
        let table = small_table();
        assert!(table.check_prefix(&["CONSTANT", "ADD"]).is_ok());
        assert!(matches!(
            table.check_prefix(&["CONSTANT", "MUL"]),
            Err(OpMetaError::StandardOrder { index: 1, .. })
        ));
    }

    #[test]
    fn test_opmeta_deserializes_from_json() {
        let json = r#"{
            "name": "MUL",
            "pushes": { "kind": "fixed", "value": 1 },
            "pops": { "kind": "operand" },
            "aliases": ["*"],
            "data": { "description": "product" }
        }"#;
        let meta: OpMeta = serde_json::from_str(json).unwrap();
        assert_eq!(meta.pops, Arity::Operand);
        assert_eq!(meta.description(), Some("product"));
    }
}
