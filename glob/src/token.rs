//! Tokenizer for glob patterns.

use crate::SEPARATOR;
use crate::error::{GlobError, Result};

/// A single element of a parsed glob pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A run of literal characters (never contains the separator).
    Literal(String),

    /// The path separator `/`.
    Separator,

    /// `*`: any run of characters within a segment.
    AnyChars,

    /// `?`: a single character within a segment.
    AnyChar,

    /// `[...]`: a single character from a class.
    Class(CharClass),

    /// `**`: any number of characters across segments.
    AnyDepth,
}

impl Token {
    /// Whether this token can match more than one fixed string.
    pub fn is_wildcard(&self) -> bool {
        !matches!(self, Token::Literal(_) | Token::Separator)
    }
}

/// A bracket expression such as `[a-z_]` or `[!0-9]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    /// Whether the class was written with a leading `!` or `^`.
    pub negated: bool,

    /// Members of the class, in source order.
    pub items: Vec<ClassItem>,
}

/// A member of a character class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassItem {
    Char(char),
    Range(char, char),
}

/// Split a pattern into tokens.
pub fn tokenize(pattern: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            SEPARATOR => {
                flush(&mut literal, &mut tokens);
                tokens.push(Token::Separator);
                i += 1;
            }
            '*' => {
                flush(&mut literal, &mut tokens);
                let start = i;
                while i < chars.len() && chars[i] == '*' {
                    i += 1;
                }
                if i - start > 1 {
                    tokens.push(Token::AnyDepth);
                } else {
                    tokens.push(Token::AnyChars);
                }
            }
            '?' => {
                flush(&mut literal, &mut tokens);
                tokens.push(Token::AnyChar);
                i += 1;
            }
            '[' => {
                flush(&mut literal, &mut tokens);
                let (class, next) = parse_class(pattern, &chars, i)?;
                tokens.push(Token::Class(class));
                i = next;
            }
            ']' => {
                return Err(GlobError::UnbalancedBracket {
                    pattern: pattern.to_string(),
                    position: i,
                });
            }
            '\\' => {
                let escaped = chars
                    .get(i + 1)
                    .copied()
                    .ok_or_else(|| GlobError::TrailingEscape(pattern.to_string()))?;
                literal.push(escaped);
                i += 2;
            }
            _ => {
                literal.push(c);
                i += 1;
            }
        }
    }

    flush(&mut literal, &mut tokens);
    Ok(tokens)
}

fn flush(literal: &mut String, tokens: &mut Vec<Token>) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::take(literal)));
    }
}

/// Parse a bracket expression starting at `open` (the index of `[`).
/// Returns the class and the index just past the closing `]`.
fn parse_class(pattern: &str, chars: &[char], open: usize) -> Result<(CharClass, usize)> {
    let unbalanced = || GlobError::UnbalancedBracket {
        pattern: pattern.to_string(),
        position: open,
    };

    let mut i = open + 1;
    let negated = matches!(chars.get(i), Some('!') | Some('^'));
    if negated {
        i += 1;
    }

    let mut items = Vec::new();
    loop {
        let c = *chars.get(i).ok_or_else(unbalanced)?;
        match c {
            ']' => {
                i += 1;
                break;
            }
            '[' | SEPARATOR => return Err(unbalanced()),
            _ => {}
        }

        let start = if c == '\\' {
            i += 1;
            *chars.get(i).ok_or_else(unbalanced)?
        } else {
            c
        };
        i += 1;

        // `a-z`, but a `-` right before `]` is a literal dash.
        if chars.get(i) == Some(&'-') && chars.get(i + 1).is_some_and(|next| *next != ']') {
            let mut end = chars[i + 1];
            i += 2;
            if end == '\\' {
                end = *chars.get(i).ok_or_else(unbalanced)?;
                i += 1;
            }
            if start > end {
                return Err(GlobError::InvalidRange {
                    pattern: pattern.to_string(),
                    start,
                    end,
                });
            }
            items.push(ClassItem::Range(start, end));
        } else {
            items.push(ClassItem::Char(start));
        }
    }

    if items.is_empty() {
        return Err(GlobError::EmptyClass {
            pattern: pattern.to_string(),
            position: open,
        });
    }

    Ok((CharClass { negated, items }, i))
}
