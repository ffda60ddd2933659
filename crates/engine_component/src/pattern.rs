//! Lexer and recursive-descent parser for filter patterns.
//!
//! ```text
//! pattern := or
//! or      := and ('|' and)*
//! and     := unary ('&' unary)*
//! unary   := '!' unary | primary
//! primary := ident | '(' or ')'
//! ident   := [A-Za-z0-9_]+
//! ```

use std::fmt;

use crate::filter::Filter;

/// Errors produced while parsing a filter pattern. Columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterParseError {
    /// The pattern contained no tokens.
    #[error("empty filter pattern")]
    Empty,

    /// A character that is not part of the pattern syntax.
    #[error("unexpected character '{ch}' at column {col}")]
    UnexpectedChar { ch: char, col: usize },

    /// A token appeared where something else was required.
    #[error("expected {expected}, got {found} at column {col}")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
        col: usize,
    },

    /// The pattern ended early.
    #[error("unexpected end of pattern, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    /// A `(` without a matching `)`, or the reverse.
    #[error("unbalanced parenthesis at column {col}")]
    UnbalancedParen { col: usize },

    /// More than [`MAX_DEPTH`] nested `!` or `(`.
    #[error("filter pattern nested too deeply at column {col}")]
    TooDeep { col: usize },
}

/// Deepest nesting of `!` and `(` a pattern may use.
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    And,
    Or,
    Not,
    LParen,
    RParen,
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "'{s}'"),
            Token::And => write!(f, "'&'"),
            Token::Or => write!(f, "'|'"),
            Token::Not => write!(f, "'!'"),
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::Eof => write!(f, "end of pattern"),
        }
    }
}

#[derive(Debug, Clone)]
struct SpannedToken {
    token: Token,
    col: usize,
}

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn tokenize(&mut self) -> Result<Vec<SpannedToken>, FilterParseError> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.token == Token::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek_byte(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn next_token(&mut self) -> Result<SpannedToken, FilterParseError> {
        while self.peek_byte().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }

        let col = self.pos + 1;
        let Some(b) = self.peek_byte() else {
            return Ok(SpannedToken {
                token: Token::Eof,
                col,
            });
        };

        let punct = match b {
            b'&' => Some(Token::And),
            b'|' => Some(Token::Or),
            b'!' => Some(Token::Not),
            b'(' => Some(Token::LParen),
            b')' => Some(Token::RParen),
            _ => None,
        };
        if let Some(token) = punct {
            self.pos += 1;
            return Ok(SpannedToken { token, col });
        }

        if b.is_ascii_alphanumeric() || b == b'_' {
            let start = self.pos;
            while self
                .peek_byte()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
            {
                self.pos += 1;
            }
            // Only ASCII bytes were consumed.
            let word = String::from_utf8_lossy(&self.input[start..self.pos]).into_owned();
            return Ok(SpannedToken {
                token: Token::Ident(word),
                col,
            });
        }

        // Report the whole (possibly multi-byte) character.
        let ch = std::str::from_utf8(&self.input[self.pos..])
            .ok()
            .and_then(|rest| rest.chars().next())
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        Err(FilterParseError::UnexpectedChar { ch, col })
    }
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
    depth: usize,
}

const OPERAND: &str = "component name, '!' or '('";

impl Parser {
    fn peek(&self) -> &SpannedToken {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> SpannedToken {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, token: &Token) -> bool {
        if &self.peek().token == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn enter(&mut self, col: usize) -> Result<(), FilterParseError> {
        if self.depth >= MAX_DEPTH {
            return Err(FilterParseError::TooDeep { col });
        }
        self.depth += 1;
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Filter, FilterParseError> {
        let mut items = vec![self.parse_and()?];
        while self.eat(&Token::Or) {
            items.push(self.parse_and()?);
        }
        Ok(collapse(items, Filter::RequireAny))
    }

    fn parse_and(&mut self) -> Result<Filter, FilterParseError> {
        let mut items = vec![self.parse_unary()?];
        while self.eat(&Token::And) {
            items.push(self.parse_unary()?);
        }
        Ok(collapse(items, Filter::RequireAll))
    }

    fn parse_unary(&mut self) -> Result<Filter, FilterParseError> {
        let col = self.peek().col;
        if self.eat(&Token::Not) {
            self.enter(col)?;
            let inner = self.parse_unary();
            self.depth -= 1;
            return Ok(Filter::not(inner?));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Filter, FilterParseError> {
        let tok = self.advance();
        match tok.token {
            Token::Ident(name) => Ok(Filter::from(name.as_str())),
            Token::LParen => {
                self.enter(tok.col)?;
                let inner = self.parse_or();
                self.depth -= 1;
                let inner = inner?;
                if self.eat(&Token::RParen) {
                    Ok(inner)
                } else if self.peek().token == Token::Eof {
                    Err(FilterParseError::UnbalancedParen { col: tok.col })
                } else {
                    let next = self.peek();
                    Err(FilterParseError::UnexpectedToken {
                        expected: "')'",
                        found: next.token.to_string(),
                        col: next.col,
                    })
                }
            }
            Token::Eof => Err(FilterParseError::UnexpectedEnd { expected: OPERAND }),
            other => Err(FilterParseError::UnexpectedToken {
                expected: OPERAND,
                found: other.to_string(),
                col: tok.col,
            }),
        }
    }
}

fn collapse(mut items: Vec<Filter>, combine: fn(Vec<Filter>) -> Filter) -> Filter {
    if items.len() == 1 {
        items.pop().unwrap_or_else(|| combine(Vec::new()))
    } else {
        combine(items)
    }
}

/// Parse a pattern into a [`Filter`].
pub(crate) fn parse(input: &str) -> Result<Filter, FilterParseError> {
    let tokens = Lexer::new(input).tokenize()?;
    if tokens.len() == 1 {
        return Err(FilterParseError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let filter = parser.parse_or()?;

    let rest = parser.peek();
    match rest.token {
        Token::Eof => Ok(filter),
        Token::RParen => Err(FilterParseError::UnbalancedParen { col: rest.col }),
        ref other => Err(FilterParseError::UnexpectedToken {
            expected: "'&', '|' or end of pattern",
            found: other.to_string(),
            col: rest.col,
        }),
    }
}

#[cfg(test)]
mod tests {
    use crate::component::Component;
    use crate::entity::Entity;
    use crate::store::ComponentStore;

    use super::*;

    macro_rules! marker {
        ($ty:ident, $name:literal) => {
            struct $ty;
            impl Component for $ty {
                fn type_name() -> &'static str {
                    $name
                }
            }
        };
    }

    marker!(A, "a");
    marker!(B, "b");
    marker!(C, "c");

    /// Every combination of a, b, c presence, as (a, b, c, entity).
    fn truth_table() -> (ComponentStore, Vec<(bool, bool, bool, Entity)>) {
        let mut store = ComponentStore::new();
        let mut rows = Vec::new();
        for bits in 0..8u8 {
            let e = store.spawn();
            let (a, b, c) = (bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            if a {
                store.insert(e, A);
            }
            if b {
                store.insert(e, B);
            }
            if c {
                store.insert(e, C);
            }
            rows.push((a, b, c, e));
        }
        (store, rows)
    }

    fn check(pattern: &str, expected: impl Fn(bool, bool, bool) -> bool) {
        let filter = parse(pattern).unwrap();
        let (store, rows) = truth_table();
        for (a, b, c, e) in rows {
            assert_eq!(
                filter.matches(e, &store),
                expected(a, b, c),
                "pattern {pattern:?} with a={a} b={b} c={c}"
            );
        }
    }

    #[test]
    fn test_single_token() {
        check("a", |a, _, _| a);
        check("  b  ", |_, b, _| b);
    }

    #[test]
    fn test_or_chain() {
        check("a|b|c", |a, b, c| a || b || c);
    }

    #[test]
    fn test_and_with_negation() {
        check("a&!b&c", |a, b, c| a && !b && c);
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        check("a | b & c", |a, b, c| a || (b && c));
        check("a & b | c", |a, b, c| (a && b) || c);
    }

    #[test]
    fn test_parentheses_and_nested_negation() {
        check("(a | b) & c", |a, b, c| (a || b) && c);
        check("!(a | b)", |a, b, _| !(a || b));
        check("!!a", |a, _, _| a);
    }

    #[test]
    fn test_empty_pattern() {
        assert_eq!(parse("").unwrap_err(), FilterParseError::Empty);
        assert_eq!(parse("   ").unwrap_err(), FilterParseError::Empty);
    }

    #[test]
    fn test_unexpected_char() {
        assert_eq!(
            parse("a + b").unwrap_err(),
            FilterParseError::UnexpectedChar { ch: '+', col: 3 }
        );
    }

    #[test]
    fn test_unexpected_end() {
        assert!(matches!(
            parse("a &").unwrap_err(),
            FilterParseError::UnexpectedEnd { .. }
        ));
        assert!(matches!(
            parse("!").unwrap_err(),
            FilterParseError::UnexpectedEnd { .. }
        ));
    }

    #[test]
    fn test_unexpected_token() {
        assert!(matches!(
            parse("a b").unwrap_err(),
            FilterParseError::UnexpectedToken { col: 3, .. }
        ));
        assert!(matches!(
            parse("& a").unwrap_err(),
            FilterParseError::UnexpectedToken { col: 1, .. }
        ));
    }

    #[test]
    fn test_unbalanced_parens() {
        assert_eq!(
            parse("(a | b").unwrap_err(),
            FilterParseError::UnbalancedParen { col: 1 }
        );
        assert_eq!(
            parse("a | b)").unwrap_err(),
            FilterParseError::UnbalancedParen { col: 6 }
        );
    }

    #[test]
    fn test_nesting_limit() {
        let deepest = format!("{}a", "!".repeat(MAX_DEPTH));
        assert!(parse(&deepest).is_ok());

        let too_many_nots = format!("{}a", "!".repeat(MAX_DEPTH + 1));
        assert_eq!(
            parse(&too_many_nots).unwrap_err(),
            FilterParseError::TooDeep { col: MAX_DEPTH + 1 }
        );

        let too_many_parens = format!("{}a{}", "(".repeat(300), ")".repeat(300));
        assert_eq!(
            parse(&too_many_parens).unwrap_err(),
            FilterParseError::TooDeep { col: MAX_DEPTH + 1 }
        );
    }

    #[test]
    fn test_very_long_negation_run_is_an_error() {
        let pattern = format!("{}a", "!".repeat(200_000));
        assert!(matches!(
            parse(&pattern).unwrap_err(),
            FilterParseError::TooDeep { .. }
        ));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            parse("a | b)").unwrap_err().to_string(),
            "unbalanced parenthesis at column 6"
        );
        assert_eq!(
            parse("a ?").unwrap_err().to_string(),
            "unexpected character '?' at column 3"
        );
    }
}
