//! Delimiter validation for splices.
//!
//! Anchors are located without a parser, so the only structural check
//! available is delimiter bookkeeping. The scanner understands the lexical
//! shapes shared by C-family languages (quoted strings, template literals,
//! line and block comments) and ignores delimiters inside them.
//!
//! # Hard Rules
//!
//! 1. A splice must leave the balance of the whole document unchanged. The
//!    fragment comparison in [`splice_preserves_balance`] is only a quick
//!    reject: a span that starts inside a string lexes differently on its own.
//! 2. Inserted fragments must be balanced on their own.
//! 3. If a block's closing delimiter cannot be found, nobody splices there.

use serde::Deserialize;
use std::ops::Range;

/// Net delimiter counts of a fragment: opening minus closing per kind.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Balance {
    pub parens: i64,
    pub brackets: i64,
    pub braces: i64,
}

impl Balance {
    pub fn of(text: &str) -> Self {
        let mut balance = Balance::default();
        for (_, c) in CodeChars::new(text, 0) {
            match c {
                '(' => balance.parens += 1,
                ')' => balance.parens -= 1,
                '[' => balance.brackets += 1,
                ']' => balance.brackets -= 1,
                '{' => balance.braces += 1,
                '}' => balance.braces -= 1,
                _ => {}
            }
        }
        balance
    }

    pub fn is_zero(&self) -> bool {
        *self == Balance::default()
    }
}

/// Compare two fragments lexed in isolation.
///
/// A mismatch means the splice is certainly unbalanced; a match still has to
/// be confirmed against the whole document.
pub fn splice_preserves_balance(removed: &str, inserted: &str) -> bool {
    Balance::of(removed) == Balance::of(inserted)
}

/// Which opening delimiter a block search looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockDelimiter {
    #[default]
    Any,
    Paren,
    Bracket,
    Brace,
}

impl BlockDelimiter {
    fn opens(self, c: char) -> bool {
        match self {
            BlockDelimiter::Any => matches!(c, '(' | '[' | '{'),
            BlockDelimiter::Paren => c == '(',
            BlockDelimiter::Bracket => c == '[',
            BlockDelimiter::Brace => c == '{',
        }
    }
}

/// A delimited block: byte offsets of its opening and closing characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub open: usize,
    pub close: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockError {
    /// No opening delimiter between the search start and the limit
    NoOpening,
    /// The block does not close before the limit
    Unclosed { open: usize },
    /// A closing delimiter of the wrong kind was found first
    Mismatched { open: usize, at: usize },
}

/// Find the first block opening at or after `range.start` whose closing
/// delimiter lies before `range.end`.
pub fn find_block(
    text: &str,
    range: Range<usize>,
    delimiter: BlockDelimiter,
) -> Result<Block, BlockError> {
    let end = range.end.min(text.len());
    let mut stack: Vec<char> = Vec::new();
    let mut open = None;

    for (idx, c) in CodeChars::new(text, range.start) {
        if idx >= end {
            break;
        }
        match open {
            None => {
                if delimiter.opens(c) {
                    open = Some(idx);
                    stack.push(c);
                }
            }
            Some(open_at) => match c {
                '(' | '[' | '{' => stack.push(c),
                ')' | ']' | '}' => {
                    let expected = match stack.pop() {
                        Some('(') => ')',
                        Some('[') => ']',
                        _ => '}',
                    };
                    if c != expected {
                        return Err(BlockError::Mismatched { open: open_at, at: idx });
                    }
                    if stack.is_empty() {
                        return Ok(Block {
                            open: open_at,
                            close: idx,
                        });
                    }
                }
                _ => {}
            },
        }
    }

    match open {
        None => Err(BlockError::NoOpening),
        Some(open) => Err(BlockError::Unclosed { open }),
    }
}

/// Iterator over characters that are code: outside strings and comments.
struct CodeChars<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> CodeChars<'a> {
    fn new(text: &'a str, start: usize) -> Self {
        let pos = if text.is_char_boundary(start.min(text.len())) {
            start.min(text.len())
        } else {
            text.len()
        };
        Self { text, pos }
    }

    /// Advance past a quoted run that started just before `self.pos`.
    fn skip_quoted(&mut self, quote: char) {
        let rest = &self.text[self.pos..];
        let mut escaped = false;
        for (idx, c) in rest.char_indices() {
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '\n' if quote != '`' => {
                    // unterminated single-line string; resume at the newline
                    self.pos += idx;
                    return;
                }
                c if c == quote => {
                    self.pos += idx + c.len_utf8();
                    return;
                }
                _ => {}
            }
        }
        self.pos = self.text.len();
    }
}

impl Iterator for CodeChars<'_> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = &self.text[self.pos..];
            let c = rest.chars().next()?;
            let at = self.pos;

            if rest.starts_with("//") {
                self.pos += rest.find('\n').unwrap_or(rest.len());
                continue;
            }
            if rest.starts_with("/*") {
                self.pos += rest[2..].find("*/").map_or(rest.len(), |idx| idx + 4);
                continue;
            }

            self.pos += c.len_utf8();
            if matches!(c, '\'' | '"' | '`') {
                self.skip_quoted(c);
                continue;
            }
            return Some((at, c));
        }
    }
}
