//! Interpreter for the filter-expression grammar the query builder emits.
//!
//! Covers what the service's queries use: conjunctive comparisons over
//! `Col`-addressed values and a single-column ordering. Not a general query
//! engine.
//!
//! ```text
//! query   := "select" "*" ("where" clause ("and" clause)*)?
//!            ("order" "by" col ("asc" | "desc")?)?
//! clause  := col op literal
//! col     := "Col" <1-based number>
//! op      := "=" | "<>" | "<" | "<=" | ">" | ">="
//! literal := '<text, '' escapes>' | <number>
//! ```
//!
//! `Col1` is the synthetic row address; `ColN` for N >= 2 addresses cell
//! N - 1. Comparisons are type-homogeneous: comparing a text cell to a
//! numeric literal (or vice versa) is simply false, as is addressing a column
//! the row does not have.

use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

use crate::engine::{Cell, QueryHit};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub(crate) struct ParseError(String);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Text(String),
    Number(f64),
}

#[derive(Debug)]
struct Clause {
    col: usize,
    op: Op,
    literal: Literal,
}

#[derive(Debug)]
struct Order {
    col: usize,
    descending: bool,
}

/// A parsed filter expression.
#[derive(Debug)]
pub(crate) struct Filter {
    clauses: Vec<Clause>,
    order: Option<Order>,
}

impl Filter {
    pub(crate) fn parse(input: &str) -> Result<Self, ParseError> {
        Parser::new(tokenize(input)?).parse()
    }

    /// Run the filter over `rows`, producing hits with 1-indexed addresses.
    pub(crate) fn run(&self, rows: &[Vec<Cell>]) -> Vec<QueryHit> {
        let mut hits: Vec<QueryHit> = rows
            .iter()
            .enumerate()
            .map(|(i, cells)| QueryHit {
                address: (i + 1) as u32,
                cells: cells.clone(),
            })
            .filter(|hit| {
                self.clauses
                    .iter()
                    .all(|c| c.matches(hit.address, &hit.cells))
            })
            .collect();
        if let Some(order) = &self.order {
            hits.sort_by(|a, b| {
                let ord = compare_column(a, b, order.col);
                if order.descending {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        hits
    }
}

impl Clause {
    fn matches(&self, address: u32, cells: &[Cell]) -> bool {
        let cell = match column_value(address, cells, self.col) {
            Some(cell) => cell,
            None => return false,
        };
        let ordering = match (&cell, &self.literal) {
            (Cell::Text(a), Literal::Text(b)) => a.as_str().cmp(b.as_str()),
            (Cell::Number(a), Literal::Number(b)) => match a.partial_cmp(b) {
                Some(o) => o,
                None => return false,
            },
            _ => return false,
        };
        match self.op {
            Op::Eq => ordering.is_eq(),
            Op::Ne => ordering.is_ne(),
            Op::Lt => ordering.is_lt(),
            Op::Le => ordering.is_le(),
            Op::Gt => ordering.is_gt(),
            Op::Ge => ordering.is_ge(),
        }
    }
}

fn column_value(address: u32, cells: &[Cell], col: usize) -> Option<Cell> {
    if col == 1 {
        Some(Cell::Number(f64::from(address)))
    } else {
        cells.get(col - 2).cloned()
    }
}

/// Ordering between two hits on one column. Numbers sort before text, absent
/// cells before everything; ties keep sheet order (the sort is stable).
fn compare_column(a: &QueryHit, b: &QueryHit, col: usize) -> Ordering {
    let left = column_value(a.address, &a.cells, col);
    let right = column_value(b.address, &b.cells, col);
    match (left, right) {
        (Some(Cell::Number(x)), Some(Cell::Number(y))) => {
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Cell::Text(x)), Some(Cell::Text(y))) => x.cmp(&y),
        (Some(Cell::Number(_)), Some(Cell::Text(_))) => Ordering::Less,
        (Some(Cell::Text(_)), Some(Cell::Number(_))) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Op(Op),
    Text(String),
    Number(f64),
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '\'' => {
                chars.next();
                tokens.push(Token::Text(read_quoted(&mut chars)?));
            }
            '=' => {
                chars.next();
                tokens.push(Token::Op(Op::Eq));
            }
            '<' => {
                chars.next();
                let op = match chars.peek() {
                    Some('=') => {
                        chars.next();
                        Op::Le
                    }
                    Some('>') => {
                        chars.next();
                        Op::Ne
                    }
                    _ => Op::Lt,
                };
                tokens.push(Token::Op(op));
            }
            '>' => {
                chars.next();
                let op = if chars.peek() == Some(&'=') {
                    chars.next();
                    Op::Ge
                } else {
                    Op::Gt
                };
                tokens.push(Token::Op(op));
            }
            '*' => {
                chars.next();
                tokens.push(Token::Word("*".to_string()));
            }
            c if c.is_ascii_digit() || c == '-' => {
                tokens.push(read_number(&mut chars)?);
            }
            c if c.is_alphanumeric() || c == '_' => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' {
                        word.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Word(word));
            }
            other => {
                return Err(ParseError(format!("unexpected character {other:?}")));
            }
        }
    }
    Ok(tokens)
}

fn read_quoted(chars: &mut Peekable<Chars<'_>>) -> Result<String, ParseError> {
    let mut out = String::new();
    loop {
        match chars.next() {
            Some('\'') => {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    out.push('\'');
                } else {
                    return Ok(out);
                }
            }
            Some(c) => out.push(c),
            None => return Err(ParseError("unterminated string literal".to_string())),
        }
    }
}

fn read_number(chars: &mut Peekable<Chars<'_>>) -> Result<Token, ParseError> {
    let mut raw = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
            raw.push(c);
            chars.next();
        } else {
            break;
        }
    }
    raw.parse::<f64>()
        .map(Token::Number)
        .map_err(|_| ParseError(format!("invalid number {raw:?}")))
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse(mut self) -> Result<Filter, ParseError> {
        self.expect_word("select")?;
        self.expect_word("*")?;

        let mut clauses = Vec::new();
        if self.take_word("where") {
            loop {
                clauses.push(self.clause()?);
                if !self.take_word("and") {
                    break;
                }
            }
        }

        let mut order = None;
        if self.take_word("order") {
            self.expect_word("by")?;
            let col = self.column()?;
            let descending = if self.take_word("desc") {
                true
            } else {
                self.take_word("asc");
                false
            };
            order = Some(Order { col, descending });
        }

        if self.pos != self.tokens.len() {
            return Err(ParseError("trailing tokens after query".to_string()));
        }
        Ok(Filter { clauses, order })
    }

    fn clause(&mut self) -> Result<Clause, ParseError> {
        let col = self.column()?;
        let op = match self.next() {
            Some(Token::Op(op)) => *op,
            other => return Err(ParseError(format!("expected an operator, got {other:?}"))),
        };
        let literal = match self.next() {
            Some(Token::Text(s)) => Literal::Text(s.clone()),
            Some(Token::Number(n)) => Literal::Number(*n),
            other => return Err(ParseError(format!("expected a literal, got {other:?}"))),
        };
        Ok(Clause { col, op, literal })
    }

    fn column(&mut self) -> Result<usize, ParseError> {
        match self.next() {
            Some(Token::Word(w))
                if w.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("col")) && w.len() > 3 =>
            {
                w[3..]
                    .parse::<usize>()
                    .ok()
                    .filter(|&n| n >= 1)
                    .ok_or_else(|| ParseError(format!("invalid column reference {w:?}")))
            }
            other => Err(ParseError(format!(
                "expected a column reference, got {other:?}"
            ))),
        }
    }

    fn next(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn take_word(&mut self, word: &str) -> bool {
        match self.tokens.get(self.pos) {
            Some(Token::Word(w)) if w.eq_ignore_ascii_case(word) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), ParseError> {
        if self.take_word(word) {
            Ok(())
        } else {
            Err(ParseError(format!("expected {word:?}")))
        }
    }
}
