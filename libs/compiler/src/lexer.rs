//! Tokenizer for rule text
//!
//! Words are case-preserved here; normalization happens at lookup. Runs of
//! symbol characters are split by longest prefix against the symbolic words
//! the opcode table knows, so `>=!` lexes as `>=` then `!`.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::CompileError;

/// A byte offset within the source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BytePos(pub u32);

/// A half-open `[start, end)` byte range in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: BytePos,
    pub end: BytePos,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self {
            start: BytePos(start),
            end: BytePos(end),
        }
    }

    /// Creates a zero-length span at position `pos` (for synthetic nodes).
    pub fn at(pos: u32) -> Self {
        Self::new(pos, pos)
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// The covered slice of `text`.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.start.0 as usize..self.end.0 as usize)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Number(U256),
    Word(String),
    Symbol(String),
    Placeholder,
    Invalid(CompileError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

pub const SYMBOL_CHARS: &str = "+-*/%^<>=&|!";

fn is_symbol_char(c: char) -> bool {
    SYMBOL_CHARS.contains(c)
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub struct Lexer<'a> {
    text: &'a str,
    pos: usize,
    placeholder: &'a str,
    /// Symbolic words, longest first.
    symbols: Vec<&'a str>,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str, placeholder: &'a str, symbols: &'a [String]) -> Self {
        let mut symbols: Vec<&str> = symbols.iter().map(String::as_str).collect();
        symbols.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        Self {
            text,
            pos: 0,
            placeholder,
            symbols,
        }
    }

    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token() {
            tokens.push(token);
        }
        tokens
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(start as u32, self.pos as u32)
    }

    fn next_token(&mut self) -> Option<Token> {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        let c = self.peek()?;
        let start = self.pos;

        if self.at_placeholder() {
            self.pos += self.placeholder.len();
            return Some(Token {
                kind: TokenKind::Placeholder,
                span: self.span_from(start),
            });
        }

        let kind = match c {
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            ',' => self.single(TokenKind::Comma),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.word(),
            c if is_symbol_char(c) => self.symbol(),
            other => {
                self.pos += other.len_utf8();
                TokenKind::Invalid(CompileError::UnexpectedToken(other.to_string()))
            }
        };
        Some(Token {
            kind,
            span: self.span_from(start),
        })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    fn at_placeholder(&self) -> bool {
        if self.placeholder.is_empty() || !self.rest().starts_with(self.placeholder) {
            return false;
        }
        let ends_word = self.placeholder.chars().last().is_some_and(is_word_char);
        let next = self.rest()[self.placeholder.len()..].chars().next();
        !(ends_word && next.is_some_and(is_word_char))
    }

    fn number(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek().is_some_and(is_word_char) {
            self.pos += 1;
        }
        parse_number(&self.text[start..self.pos])
    }

    fn word(&mut self) -> TokenKind {
        let start = self.pos;
        let starts_with_letter = self.peek().is_some_and(|c| c.is_ascii_alphabetic());
        loop {
            match self.peek() {
                Some(c) if is_word_char(c) => self.pos += 1,
                // hyphens join words like `max-uint256`; `NOW-1` stays a subtraction
                Some('-')
                    if starts_with_letter
                        && self.rest()[1..]
                            .chars()
                            .next()
                            .is_some_and(|c| c.is_ascii_alphabetic()) =>
                {
                    self.pos += 1
                }
                _ => break,
            }
        }
        TokenKind::Word(self.text[start..self.pos].to_string())
    }

    fn symbol(&mut self) -> TokenKind {
        let rest = self.rest();
        let matched = self
            .symbols
            .iter()
            .find(|symbol| rest.starts_with(**symbol))
            .copied();
        match matched {
            Some(symbol) => {
                self.pos += symbol.len();
                TokenKind::Symbol(symbol.to_string())
            }
            None => {
                let run: String = rest.chars().take_while(|c| is_symbol_char(*c)).collect();
                self.pos += run.len();
                TokenKind::Invalid(CompileError::UnknownSymbol(run))
            }
        }
    }
}

/// Parse a decimal, `0x` hex, or `<int>e<exp>` literal.
pub fn parse_number(raw: &str) -> TokenKind {
    let invalid = || TokenKind::Invalid(CompileError::InvalidLiteral(raw.to_string()));
    let overflow = || TokenKind::Invalid(CompileError::LiteralOverflow(raw.to_string()));

    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return invalid();
        }
        if hex.trim_start_matches('0').len() > 64 {
            return overflow();
        }
        return match U256::from_str_radix(hex, 16) {
            Ok(value) => TokenKind::Number(value),
            Err(_) => overflow(),
        };
    }

    let (mantissa, exponent) = match raw.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (raw, None),
    };
    if mantissa.is_empty() || !mantissa.chars().all(|c| c.is_ascii_digit()) {
        return invalid();
    }
    let Ok(value) = U256::from_str_radix(mantissa, 10) else {
        return overflow();
    };
    let Some(exponent) = exponent else {
        return TokenKind::Number(value);
    };
    if exponent.is_empty() || !exponent.chars().all(|c| c.is_ascii_digit()) {
        return invalid();
    }
    let Ok(exponent) = exponent.parse::<u32>() else {
        return overflow();
    };
    match types::numeric::pow10(exponent).and_then(|factor| value.checked_mul(factor)) {
        Some(value) => TokenKind::Number(value),
        None if value.is_zero() => TokenKind::Number(U256::ZERO),
        None => overflow(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(text: &str) -> Vec<TokenKind> {
        let symbols: Vec<String> = ["+", "-", ">", ">=", "==", "!", "&&"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        Lexer::new(text, "_", &symbols)
            .tokenize()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn num(n: u64) -> TokenKind {
        TokenKind::Number(U256::from(n))
    }

    #[test]
    fn test_prefix_call_tokens() {
        assert_eq!(
            lex("ADD(1, 2)"),
            vec![
                TokenKind::Word("ADD".into()),
                TokenKind::LParen,
                num(1),
                TokenKind::Comma,
                num(2),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_number_forms() {
        assert_eq!(lex("0x10"), vec![num(16)]);
        assert_eq!(lex("3e2"), vec![num(300)]);
        assert_eq!(
            lex("1e18"),
            vec![TokenKind::Number(U256::from(1_000_000_000_000_000_000u64))]
        );
        assert!(matches!(
            lex("12ab")[0],
            TokenKind::Invalid(CompileError::InvalidLiteral(_))
        ));
        assert!(matches!(
            lex("1e80")[0],
            TokenKind::Invalid(CompileError::LiteralOverflow(_))
        ));
    }

    #[test]
    fn test_hyphenated_words() {
        assert_eq!(lex("max-uint256"), vec![TokenKind::Word("max-uint256".into())]);
        assert_eq!(lex("scale18-mul"), vec![TokenKind::Word("scale18-mul".into())]);
        assert_eq!(lex("1-2"), vec![num(1), TokenKind::Symbol("-".into()), num(2)]);
        assert_eq!(
            lex("NOW-1"),
            vec![TokenKind::Word("NOW".into()), TokenKind::Symbol("-".into()), num(1)]
        );
        assert_eq!(
            lex("a - b"),
            vec![
                TokenKind::Word("a".into()),
                TokenKind::Symbol("-".into()),
                TokenKind::Word("b".into()),
            ]
        );
    }

    #[test]
    fn test_symbols_longest_prefix() {
        assert_eq!(lex(">="), vec![TokenKind::Symbol(">=".into())]);
        assert_eq!(
            lex(">=!"),
            vec![TokenKind::Symbol(">=".into()), TokenKind::Symbol("!".into())]
        );
        assert!(matches!(
            lex("~")[0],
            TokenKind::Invalid(CompileError::UnexpectedToken(_))
        ));
        assert!(matches!(
            lex("<")[0],
            TokenKind::Invalid(CompileError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn test_placeholder_vs_word() {
        assert_eq!(lex("_"), vec![TokenKind::Placeholder]);
        assert_eq!(lex("_x"), vec![TokenKind::Word("_x".into())]);
        assert_eq!(lex("_,_"), vec![TokenKind::Placeholder, TokenKind::Comma, TokenKind::Placeholder]);
    }

    #[test]
    fn test_spans() {
        let symbols = vec![];
        let tokens = Lexer::new("  ADD(", "_", &symbols).tokenize();
        assert_eq!(tokens[0].span, Span::new(2, 5));
        assert_eq!(tokens[1].span, Span::new(5, 6));
        assert_eq!(tokens[0].span.slice("  ADD("), "ADD");
    }
}
