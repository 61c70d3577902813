//! Rule-language compiler
//!
//! Turns rule text into a parse tree and the parse tree into a
//! [`StateConfig`]. Parsing never fails outright: malformed constructs
//! become Error nodes and a tree with any error emits an empty config.
//!
//! ```text
//! text ──parse──▶ ParseTree ──build_bytes──▶ StateConfig ──decompile──▶ text
//! ```

pub mod config;
pub mod decompile;
pub mod emit;
pub mod error;
pub mod lexer;
pub mod operand;
pub mod parser;
pub mod tree;

pub use config::CompilerConfig;
pub use decompile::decompile;
pub use emit::{build_bytes, build_bytes_with_arg_offset, try_build_bytes};
pub use error::{BuildError, CompileError, DecompileError};
pub use lexer::Span;
pub use parser::parse;
pub use tree::{Node, NodeId, NodeKind, Notation, OpNode, ParseTree, ValueKind};

use types::bytecode::StateConfig;
use types::opmeta::OpMetaTable;

/// A compiler bound to one opcode table.
#[derive(Debug, Clone)]
pub struct Compiler {
    table: OpMetaTable,
    config: CompilerConfig,
}

impl Compiler {
    pub fn new(table: OpMetaTable) -> Self {
        Self::with_config(table, CompilerConfig::default())
    }

    pub fn with_config(table: OpMetaTable, config: CompilerConfig) -> Self {
        Self { table, config }
    }

    pub fn table(&self) -> &OpMetaTable {
        &self.table
    }

    pub fn parse(&self, text: &str) -> ParseTree {
        parse(text, &self.table, &self.config)
    }

    /// Parse and emit; an empty config means the text did not compile.
    pub fn compile(&self, text: &str) -> StateConfig {
        build_bytes(&self.parse(text))
    }

    pub fn try_compile(&self, text: &str) -> Result<StateConfig, BuildError> {
        try_build_bytes(&self.parse(text), 0)
    }

    pub fn decompile(&self, config: &StateConfig) -> Result<String, DecompileError> {
        decompile(config, &self.table)
    }
}
