//! Notation-aware parser
//!
//! A source is a comma-separated list of expressions. Each expression is a
//! run of juxtaposed items (values, calls, groups and bare operator words)
//! that is classified as a single term, an infix chain, or a postfix call:
//!
//! ```text
//! ADD(1, 2)        prefix, the word abuts its `(`
//! 1 + 2 + 3        infix, one operator repeated between terms
//! 1 2 3 ADD        postfix, the operator closes the expression
//! ```
//!
//! Malformed input never aborts parsing; it becomes an Error node (or a
//! poisoned Op node) in the tree and parsing continues after it.

use tracing::debug;
use types::opmeta::{normalize, Arity, OpMetaTable};

use crate::config::CompilerConfig;
use crate::error::CompileError;
use crate::lexer::{Lexer, Span, Token, TokenKind, SYMBOL_CHARS};
use crate::operand::OperandRule;
use crate::tree::{ErrorNode, NodeId, NodeKind, Notation, OpNode, ParseTree, ValueKind, ValueNode};

/// Comparison sugar that never reaches bytecode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sugar {
    /// `a GTE b` is `ISZERO(LESS_THAN(a, b))`
    Gte,
    /// `a LTE b` is `ISZERO(GREATER_THAN(a, b))`
    Lte,
}

impl Sugar {
    const GTE_WORDS: [&'static str; 3] = ["GTE", ">=", "GREATER_THAN_OR_EQUAL_TO"];
    const LTE_WORDS: [&'static str; 3] = ["LTE", "<=", "LESS_THAN_OR_EQUAL_TO"];

    pub fn from_word(word: &str) -> Option<Self> {
        let word = normalize(word);
        if Self::GTE_WORDS.contains(&word.as_str()) {
            Some(Sugar::Gte)
        } else if Self::LTE_WORDS.contains(&word.as_str()) {
            Some(Sugar::Lte)
        } else {
            None
        }
    }

    fn name(self) -> &'static str {
        match self {
            Sugar::Gte => "GTE",
            Sugar::Lte => "LTE",
        }
    }

    fn comparison(self) -> &'static str {
        match self {
            Sugar::Gte => "LESS_THAN",
            Sugar::Lte => "GREATER_THAN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Callable {
    Op(u8),
    Sugar(Sugar),
}

enum Word {
    Call(Callable),
    MaxUint256,
    Unknown(CompileError),
}

enum Item {
    Term { nodes: Vec<NodeId>, span: Span },
    Operator { callable: Callable, span: Span },
}

impl Item {
    fn span(&self) -> Span {
        match self {
            Item::Term { span, .. } | Item::Operator { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Close {
    Eof,
    Brace,
    Paren,
}

/// Words made only of symbol characters, as written in the table.
pub fn symbol_words(table: &OpMetaTable) -> Vec<String> {
    let is_symbolic = |word: &str| !word.is_empty() && word.chars().all(|c| SYMBOL_CHARS.contains(c));
    let table_words = table
        .entries()
        .iter()
        .flat_map(|meta| std::iter::once(meta.name.as_str()).chain(meta.aliases.iter().map(String::as_str)));
    let sugar_words = Sugar::GTE_WORDS.iter().chain(Sugar::LTE_WORDS.iter()).copied();
    let mut symbols: Vec<String> = table_words
        .chain(sugar_words)
        .filter(|word| is_symbolic(word))
        .map(str::to_string)
        .collect();
    symbols.sort();
    symbols.dedup();
    symbols
}

/// Per-invocation parser state. Nothing here outlives a single `parse`.
pub struct ParseContext<'a> {
    table: &'a OpMetaTable,
    text: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_nesting: usize,
    tree: ParseTree,
}

/// Parse `text` against `table`.
pub fn parse(text: &str, table: &OpMetaTable, config: &CompilerConfig) -> ParseTree {
    let symbols = symbol_words(table);
    let tokens = Lexer::new(text, config.placeholder(), &symbols).tokenize();
    let mut context = ParseContext::new(text, table, tokens, config.max_nesting);
    context.parse_program();
    let tree = context.finish();
    debug!(
        sources = tree.sources().len(),
        nodes = tree.nodes().len(),
        errors = tree.errors().len(),
        "parsed rule text"
    );
    tree
}

impl<'a> ParseContext<'a> {
    fn new(text: &'a str, table: &'a OpMetaTable, tokens: Vec<Token>, max_nesting: usize) -> Self {
        let tree = ParseTree {
            constant_opcode: table.index_of("CONSTANT"),
            stack_opcode: table.index_of("STACK"),
            ..ParseTree::default()
        };
        Self {
            table,
            text,
            tokens,
            pos: 0,
            depth: 0,
            max_nesting,
            tree,
        }
    }

    fn finish(self) -> ParseTree {
        self.tree
    }

    // ------------------------------------------------------------------
    // Token cursor
    // ------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> Option<Span> {
        match self.peek() {
            Some(token) if &token.kind == kind => {
                let span = token.span;
                self.pos += 1;
                Some(span)
            }
            _ => None,
        }
    }

    /// Span at the current position, for errors about missing tokens.
    fn here(&self) -> Span {
        match self.peek() {
            Some(token) => Span::at(token.span.start.0),
            None => Span::at(self.text.len() as u32),
        }
    }

    fn abuts_paren(&self, word_span: Span) -> bool {
        matches!(
            self.tokens.get(self.pos + 1),
            Some(Token { kind: TokenKind::LParen, span }) if span.start == word_span.end
        )
    }

    /// Step over a parenthesised run without parsing it; the cursor is
    /// just past its `(`. Stops before a brace or at end of input.
    fn skip_nested(&mut self) -> Option<Span> {
        let mut open = 1usize;
        while let Some(token) = self.peek() {
            let (span, kind) = (token.span, token.kind.clone());
            match kind {
                TokenKind::LBrace | TokenKind::RBrace => return None,
                TokenKind::LParen => open += 1,
                TokenKind::RParen => {
                    open -= 1;
                    if open == 0 {
                        self.pos += 1;
                        return Some(span);
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        None
    }

    /// Parse a parenthesised list; the cursor is just past its `(`.
    ///
    /// Past the nesting limit the contents are skipped and replaced by one
    /// error covering them.
    fn parse_nested(&mut self, open: Span) -> Result<(Vec<NodeId>, Option<Span>), NodeId> {
        if self.depth >= self.max_nesting {
            let close = self.skip_nested();
            let span = open.merge(close.unwrap_or_else(|| self.here()));
            let limit = self.max_nesting;
            return Err(self.error(CompileError::NestingTooDeep { limit }, span));
        }
        self.depth += 1;
        let list = self.parse_list(Close::Paren);
        self.depth -= 1;
        Ok((list, self.eat(&TokenKind::RParen)))
    }

    // ------------------------------------------------------------------
    // Node constructors
    // ------------------------------------------------------------------

    fn value(&mut self, kind: ValueKind, span: Span) -> NodeId {
        self.tree.push(NodeKind::Value(ValueNode { kind, span }))
    }

    fn error(&mut self, error: CompileError, span: Span) -> NodeId {
        self.tree.push(NodeKind::Error(ErrorNode { error, span }))
    }

    fn attach(&mut self, parent: NodeId, params: &[NodeId]) {
        for param in params {
            self.tree.node_mut(*param).parent = Some(parent);
        }
    }

    fn make_op(
        &mut self,
        opcode: u8,
        params: Vec<NodeId>,
        span: Span,
        paren_span: Option<Span>,
        notation: Notation,
    ) -> NodeId {
        let table = self.table;
        let Some(meta) = table.get(opcode) else {
            return self.error(CompileError::UnknownOpcode(opcode.to_string()), span);
        };
        let resolution = OperandRule::for_name(&meta.name).resolve(&self.tree, meta, &params);
        let (operand, consumed, output, error) = match resolution {
            Ok(resolved) => (
                Some(resolved.operand),
                resolved.consumed,
                meta.pushes.eval(resolved.operand),
                None,
            ),
            Err(error) => (None, 0, 1, Some(error)),
        };
        let op = OpNode {
            name: meta.name.clone(),
            opcode,
            operand,
            output,
            params: params.clone(),
            span,
            paren_span,
            notation,
            consumed,
            error,
        };
        let id = self.tree.push(NodeKind::Op(op));
        self.attach(id, &params);
        id
    }

    fn make_call(
        &mut self,
        callable: Callable,
        params: Vec<NodeId>,
        span: Span,
        paren_span: Option<Span>,
        notation: Notation,
    ) -> NodeId {
        match callable {
            Callable::Op(opcode) => self.make_op(opcode, params, span, paren_span, notation),
            Callable::Sugar(sugar) => self.make_sugar(sugar, params, span, paren_span, notation),
        }
    }

    fn make_sugar(
        &mut self,
        sugar: Sugar,
        params: Vec<NodeId>,
        span: Span,
        paren_span: Option<Span>,
        notation: Notation,
    ) -> NodeId {
        if params.len() != 2 {
            return self.error(
                CompileError::ArityMismatch {
                    name: sugar.name().to_string(),
                    expected: "2".to_string(),
                    found: params.len(),
                },
                span,
            );
        }
        let (Some(compare), Some(is_zero)) = (
            self.table.index_of(sugar.comparison()),
            self.table.index_of("ISZERO"),
        ) else {
            return self.error(CompileError::UnknownOpcode(sugar.name().to_string()), span);
        };
        let inner = self.make_op(compare, params, span, paren_span, notation);
        self.make_op(is_zero, vec![inner], span, paren_span, notation)
    }

    // ------------------------------------------------------------------
    // Words
    // ------------------------------------------------------------------

    fn is_known(&self, word: &str) -> bool {
        !word.is_empty() && (self.table.lookup(word).is_some() || Sugar::from_word(word).is_some())
    }

    fn classify(&self, word: &str) -> Word {
        let normalized = normalize(word);
        if normalized == "MAXUINT256" || normalized == "MAX_UINT256" {
            return Word::MaxUint256;
        }
        if let Some(sugar) = Sugar::from_word(word) {
            return Word::Call(Callable::Sugar(sugar));
        }
        if let Some(opcode) = self.table.lookup(word) {
            return Word::Call(Callable::Op(opcode));
        }
        let splits = (1..normalized.len()).filter(|k| normalized.is_char_boundary(*k));
        for k in splits {
            let (head, tail) = normalized.split_at(k);
            if self.is_known(head) && self.is_known(tail.trim_start_matches('_')) {
                return Word::Unknown(CompileError::Ambiguous(word.to_string()));
            }
        }
        Word::Unknown(CompileError::UnknownOpcode(word.to_string()))
    }

    // ------------------------------------------------------------------
    // Grammar
    // ------------------------------------------------------------------

    fn parse_program(&mut self) {
        let braced = self
            .tokens
            .iter()
            .any(|t| matches!(t.kind, TokenKind::LBrace | TokenKind::RBrace));

        if !braced {
            if self.tokens.is_empty() {
                return;
            }
            let mut source = Vec::new();
            loop {
                source.extend(self.parse_list(Close::Eof));
                if !self.skip_stray() {
                    break;
                }
            }
            self.tree.sources.push(source);
            return;
        }

        while let Some(token) = self.peek() {
            if token.kind != TokenKind::LBrace {
                self.skip_stray();
                continue;
            }
            let open = token.span;
            self.pos += 1;
            let mut source = Vec::new();
            loop {
                source.extend(self.parse_list(Close::Brace));
                match self.peek_kind() {
                    Some(TokenKind::RBrace) => {
                        self.pos += 1;
                        break;
                    }
                    None => {
                        self.error(CompileError::MissingBrace, open);
                        break;
                    }
                    Some(_) => {
                        self.skip_stray();
                    }
                }
            }
            self.tree.sources.push(source);
        }
    }

    /// Record an unexpected token as a detached error and step over it.
    fn skip_stray(&mut self) -> bool {
        let Some(token) = self.peek() else {
            return false;
        };
        let span = token.span;
        let error = match &token.kind {
            TokenKind::Invalid(error) => error.clone(),
            _ => CompileError::UnexpectedToken(span.slice(self.text).to_string()),
        };
        self.pos += 1;
        self.error(error, span);
        true
    }

    /// Comma-separated expressions up to (not including) the closer.
    fn parse_list(&mut self, close: Close) -> Vec<NodeId> {
        let mut list = Vec::new();
        loop {
            let start = self.here();
            let exprs = self.parse_expr();
            let comma = self.eat(&TokenKind::Comma).is_some();
            if exprs.is_empty() {
                if comma || !list.is_empty() {
                    let error = self.error(CompileError::EmptyExpression, start);
                    list.push(error);
                }
            } else {
                list.extend(exprs);
            }
            if !comma {
                break;
            }
        }
        self.claim_outputs(&list, close != Close::Paren);
        list
    }

    /// One expression: juxtaposed items up to a comma or a closer.
    fn parse_expr(&mut self) -> Vec<NodeId> {
        let mut items = Vec::new();
        while let Some(token) = self.peek() {
            let span = token.span;
            let item = match token.kind.clone() {
                TokenKind::Comma | TokenKind::RParen | TokenKind::RBrace => break,
                TokenKind::Number(value) => {
                    self.pos += 1;
                    let node = self.value(ValueKind::Literal(value), span);
                    Item::Term {
                        nodes: vec![node],
                        span,
                    }
                }
                TokenKind::Placeholder => {
                    self.pos += 1;
                    let node = self.value(ValueKind::Placeholder, span);
                    Item::Term {
                        nodes: vec![node],
                        span,
                    }
                }
                TokenKind::Word(word) | TokenKind::Symbol(word) => self.parse_word(word, span),
                TokenKind::LParen => self.parse_group(span),
                TokenKind::LBrace => {
                    self.pos += 1;
                    let node = self.error(CompileError::UnexpectedToken("{".to_string()), span);
                    Item::Term {
                        nodes: vec![node],
                        span,
                    }
                }
                TokenKind::Invalid(error) => {
                    self.pos += 1;
                    let node = self.error(error, span);
                    Item::Term {
                        nodes: vec![node],
                        span,
                    }
                }
            };
            items.push(item);
        }
        self.build_segment(items)
    }

    fn parse_word(&mut self, word: String, span: Span) -> Item {
        if self.abuts_paren(span) {
            self.pos += 1;
            let node = self.parse_call(&word, span);
            let span = self.tree.node(node).span();
            return Item::Term {
                nodes: vec![node],
                span,
            };
        }
        self.pos += 1;
        let node = match self.classify(&word) {
            Word::Call(callable) => return Item::Operator { callable, span },
            Word::MaxUint256 => self.value(ValueKind::MaxUint256, span),
            Word::Unknown(error) => self.error(error, span),
        };
        Item::Term {
            nodes: vec![node],
            span,
        }
    }

    /// `(` ... `)` not attached to a word.
    fn parse_group(&mut self, open: Span) -> Item {
        self.pos += 1;
        let (mut nodes, close) = match self.parse_nested(open) {
            Ok(nested) => nested,
            Err(error) => {
                let span = self.tree.node(error).span();
                return Item::Term {
                    nodes: vec![error],
                    span,
                };
            }
        };
        let span = open.merge(close.unwrap_or_else(|| self.here()));
        if close.is_none() {
            nodes = vec![self.error(CompileError::MissingParen, span)];
        } else if nodes.is_empty() {
            nodes = vec![self.error(CompileError::EmptyExpression, span)];
        }
        Item::Term { nodes, span }
    }

    /// A word abutting `(`; the cursor is on the `(`.
    fn parse_call(&mut self, word: &str, span: Span) -> NodeId {
        let open = self.tokens[self.pos].span;
        self.pos += 1;
        let (params, close) = match self.parse_nested(open) {
            Ok(nested) => nested,
            Err(error) => return error,
        };
        let paren_span = open.merge(close.unwrap_or_else(|| self.here()));

        let node = if normalize(word) == "ARG" {
            match params.as_slice() {
                [index] => match self.tree.literal(*index).and_then(|v| u8::try_from(v).ok()) {
                    Some(index) => self.value(ValueKind::Arg(index), span.merge(paren_span)),
                    None => self.error(CompileError::InvalidArg, span.merge(paren_span)),
                },
                _ => self.error(CompileError::InvalidArg, span.merge(paren_span)),
            }
        } else {
            match self.classify(word) {
                Word::Call(callable) => {
                    self.make_call(callable, params, span, Some(paren_span), Notation::Prefix)
                }
                Word::MaxUint256 => self.error(
                    CompileError::UnexpectedToken(word.to_string()),
                    span.merge(paren_span),
                ),
                Word::Unknown(error) => self.error(error, span),
            }
        };
        if close.is_none() {
            self.tree.poison(node, CompileError::MissingParen);
        }
        node
    }

    /// Classify a run of items as a term, an infix chain, or a postfix call.
    fn build_segment(&mut self, items: Vec<Item>) -> Vec<NodeId> {
        let last = items.len().saturating_sub(1);
        let items: Vec<Item> = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| if i < last { self.bare_call(item) } else { item })
            .collect();
        let Some(first) = items.first() else {
            return Vec::new();
        };
        let span = items
            .iter()
            .fold(first.span(), |acc, item| acc.merge(item.span()));
        let operators: Vec<(usize, Callable, Span)> = items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match item {
                Item::Operator { callable, span } => Some((i, *callable, *span)),
                Item::Term { .. } => None,
            })
            .collect();

        // a lone term
        if operators.is_empty() {
            if items.len() == 1 {
                if let Some(Item::Term { nodes, .. }) = items.into_iter().next() {
                    return nodes;
                }
                return Vec::new();
            }
            return vec![self.error(CompileError::MissingOperator, span)];
        }

        // postfix: the only operator closes the expression
        if operators.len() == 1 && operators[0].0 == items.len() - 1 {
            let (_, callable, op_span) = operators[0];
            let params: Vec<NodeId> = items
                .into_iter()
                .filter_map(|item| match item {
                    Item::Term { nodes, .. } => Some(nodes),
                    Item::Operator { .. } => None,
                })
                .flatten()
                .collect();
            self.claim_outputs(&params, false);
            return vec![self.make_call(callable, params, op_span, None, Notation::Postfix)];
        }

        let alternating = items.len() % 2 == 1
            && items.iter().enumerate().all(|(i, item)| match item {
                Item::Term { nodes, .. } => i % 2 == 0 && nodes.len() == 1,
                Item::Operator { .. } => i % 2 == 1,
            });

        if alternating {
            let (_, callable, op_span) = operators[0];
            if operators.iter().any(|(_, c, _)| *c != callable) {
                return vec![self.error(CompileError::MixedOperators, span)];
            }
            let params: Vec<NodeId> = items
                .into_iter()
                .filter_map(|item| match item {
                    Item::Term { nodes, .. } => nodes.into_iter().next(),
                    Item::Operator { .. } => None,
                })
                .collect();
            self.claim_outputs(&params, false);
            return vec![self.make_call(callable, params, op_span, None, Notation::Infix)];
        }

        if let (Some(Item::Operator { span: op_span, .. }), Some(Item::Term { .. })) =
            (items.first(), items.get(1))
        {
            let word = op_span.slice(self.text).to_string();
            return vec![self.error(CompileError::DetachedParen(word), span)];
        }
        vec![self.error(CompileError::Malformed, span)]
    }

    /// A bare word that takes no inputs, like `NOW`, is a term unless it
    /// closes the expression.
    fn bare_call(&mut self, item: Item) -> Item {
        let (opcode, span) = match item {
            Item::Operator {
                callable: Callable::Op(opcode),
                span,
            } => (opcode, span),
            other => return other,
        };
        let takes_nothing = self
            .table
            .get(opcode)
            .is_some_and(|meta| meta.pops == Arity::Fixed(0));
        if !takes_nothing {
            return Item::Operator {
                callable: Callable::Op(opcode),
                span,
            };
        }
        let node = self.make_op(opcode, Vec::new(), span, None, Notation::Prefix);
        Item::Term {
            nodes: vec![node],
            span,
        }
    }

    /// Turn the placeholders following each multi-output op into `Output`
    /// nodes of that op, and reject placeholders nothing claims.
    fn claim_outputs(&mut self, list: &[NodeId], top_level: bool) {
        let mut i = 0;
        while i < list.len() {
            let id = list[i];
            let (output, name) = match &self.tree.node(id).kind {
                NodeKind::Op(op) => (op.output, op.name.clone()),
                NodeKind::Value(ValueNode {
                    kind: ValueKind::Placeholder,
                    ..
                }) => {
                    self.tree.poison(id, CompileError::UnclaimedPlaceholder);
                    i += 1;
                    continue;
                }
                _ => {
                    i += 1;
                    continue;
                }
            };

            if output == 0 && !top_level {
                self.tree.poison(id, CompileError::NoOutputs { name });
                i += 1;
                continue;
            }

            let mut claimed = 1;
            while claimed < output {
                let Some(next) = list.get(i + claimed).copied() else {
                    break;
                };
                let node = self.tree.node_mut(next);
                match &mut node.kind {
                    NodeKind::Value(value) if value.kind == ValueKind::Placeholder => {
                        value.kind = ValueKind::Output {
                            of: id,
                            index: claimed,
                        };
                    }
                    NodeKind::Value(ValueNode {
                        kind: ValueKind::Output { of, .. },
                        ..
                    }) if *of == id => {}
                    _ => break,
                }
                claimed += 1;
            }
            if claimed < output {
                self.tree.poison(
                    id,
                    CompileError::IllegalOutputPlacement {
                        name,
                        missing: output - claimed,
                    },
                );
            }
            i += claimed.max(1);
        }
    }
}
