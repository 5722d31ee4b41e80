//! Compiled glob patterns.

use std::borrow::Cow;
use std::fmt;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::SEPARATOR;
use crate::error::{GlobError, Result};
use crate::token::{CharClass, ClassItem, Token, tokenize};

/// Options that affect how a pattern matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GlobOptions {
    /// Compare characters case-sensitively. Off by default.
    #[serde(default)]
    pub case_sensitive: bool,
}

impl GlobOptions {
    /// Options for case-sensitive matching.
    pub fn case_sensitive() -> Self {
        Self {
            case_sensitive: true,
        }
    }
}

/// Prefix `pattern` with the separator unless it already starts with one.
///
/// Every path in the virtual tree is rooted, so patterns are anchored the
/// same way before they are compiled.
pub fn anchor(pattern: &str) -> Cow<'_, str> {
    if pattern.starts_with(SEPARATOR) {
        Cow::Borrowed(pattern)
    } else {
        Cow::Owned(format!("{SEPARATOR}{pattern}"))
    }
}

/// A compiled glob pattern.
#[derive(Clone)]
pub struct Glob {
    source: String,
    options: GlobOptions,
    tokens: Vec<Token>,
    regex: Regex,
}

impl Glob {
    /// Compile a pattern with default (case-insensitive) options.
    pub fn new(pattern: &str) -> Result<Self> {
        Self::with_options(pattern, GlobOptions::default())
    }

    /// Compile a pattern with explicit options.
    pub fn with_options(pattern: &str, options: GlobOptions) -> Result<Self> {
        let tokens = tokenize(pattern)?;
        let expression = translate(&tokens, options);
        trace!("compiled glob {pattern} -> {expression}");

        let regex = Regex::new(&expression).map_err(|e| GlobError::Regex {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            source: pattern.to_string(),
            options,
            tokens,
            regex,
        })
    }

    /// Test a full path against the pattern.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// The pattern source.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Options the pattern was compiled with.
    pub fn options(&self) -> GlobOptions {
        self.options
    }

    /// Parsed tokens.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// The literal directory every match lives under.
    ///
    /// This is the pattern text up to the last separator that precedes the
    /// first wildcard (or the final segment when there is none), without the
    /// trailing separator. `/some/dir/*.txt` gives `/some/dir`, and
    /// `/file.txt` gives the empty root path.
    pub fn base_directory(&self) -> String {
        let first_wildcard = self
            .tokens
            .iter()
            .position(Token::is_wildcard)
            .unwrap_or(self.tokens.len());

        let cut = self.tokens[..first_wildcard]
            .iter()
            .rposition(|t| *t == Token::Separator)
            .unwrap_or(0);

        let mut base = String::new();
        for token in &self.tokens[..cut] {
            match token {
                Token::Separator => base.push(SEPARATOR),
                Token::Literal(text) => base.push_str(text),
                _ => {}
            }
        }
        base
    }

    /// Whether a match can sit deeper than one segment below
    /// [`Glob::base_directory`].
    pub fn spans_subdirectories(&self) -> bool {
        let last_separator = self.tokens.iter().rposition(|t| *t == Token::Separator);
        self.tokens.iter().enumerate().any(|(i, token)| match token {
            Token::AnyDepth => true,
            t if t.is_wildcard() => last_separator.is_some_and(|sep| i < sep),
            _ => false,
        })
    }
}

impl fmt::Debug for Glob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Glob")
            .field("source", &self.source)
            .field("options", &self.options)
            .finish()
    }
}

impl fmt::Display for Glob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Translate tokens into an anchored regular expression.
fn translate(tokens: &[Token], options: GlobOptions) -> String {
    let mut expression = String::from(if options.case_sensitive {
        "(?s)^"
    } else {
        "(?is)^"
    });

    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Literal(text) => expression.push_str(&regex_lite::escape(text)),
            Token::Separator => expression.push(SEPARATOR),
            Token::AnyChars => expression.push_str("[^/]*"),
            Token::AnyChar => expression.push_str("[^/]"),
            Token::Class(class) => push_class(&mut expression, class),
            Token::AnyDepth => {
                // `**/` also matches nothing at all, so `/a/**/b` covers `/a/b`.
                if tokens.get(i + 1) == Some(&Token::Separator) {
                    expression.push_str("(?:.*/)?");
                    i += 1;
                } else {
                    expression.push_str(".*");
                }
            }
        }
        i += 1;
    }

    expression.push('$');
    expression
}

fn push_class(expression: &mut String, class: &CharClass) {
    expression.push('[');
    if class.negated {
        expression.push('^');
        push_class_char(expression, SEPARATOR);
    }
    for item in &class.items {
        match *item {
            ClassItem::Char(c) => push_class_char(expression, c),
            ClassItem::Range(start, end) => {
                push_class_char(expression, start);
                expression.push('-');
                push_class_char(expression, end);
            }
        }
    }
    expression.push(']');
}

fn push_class_char(expression: &mut String, c: char) {
    if c.is_alphanumeric() {
        expression.push(c);
    } else {
        expression.push_str(&format!("\\x{{{:X}}}", c as u32));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_star_stays_in_segment() {
        let glob = Glob::new("/foo/*.txt").unwrap();
        assert!(glob.is_match("/foo/bar.txt"));
        assert!(!glob.is_match("/foo/bar.txt.min"));
        assert!(!glob.is_match("/foo/sub/bar.txt"));
    }

    #[test]
    fn test_double_star_crosses_segments() {
        let glob = Glob::new("/foo/**/*.txt").unwrap();
        assert!(glob.is_match("/foo/bar.txt"));
        assert!(glob.is_match("/foo/sub/bar.txt"));
        assert!(glob.is_match("/foo/a/b/c/bar.txt"));
        assert!(!glob.is_match("/other/bar.txt"));
        assert!(!glob.is_match("/foo/bar.md"));
    }

    #[test]
    fn test_trailing_double_star() {
        let glob = Glob::new("/foo/**").unwrap();
        assert!(glob.is_match("/foo/a"));
        assert!(glob.is_match("/foo/a/b.txt"));
        assert!(!glob.is_match("/foobar"));
    }

    #[test]
    fn test_question_mark_and_classes() {
        let glob = Glob::new("/log?.[ct]x[!0-9]").unwrap();
        assert!(glob.is_match("/log1.txt"));
        assert!(glob.is_match("/logA.cxa"));
        assert!(!glob.is_match("/log.txt"));
        assert!(!glob.is_match("/log1.tx9"));
        assert!(!glob.is_match("/log/.txt"));
    }

    #[test]
    fn test_class_with_punctuation() {
        let glob = Glob::new("/a[.-]b").unwrap();
        assert!(glob.is_match("/a.b"));
        assert!(glob.is_match("/a-b"));
        assert!(!glob.is_match("/axb"));
    }

    #[test]
    fn test_literal_metacharacters_are_escaped() {
        let glob = Glob::new("/a+b(1).txt").unwrap();
        assert!(glob.is_match("/a+b(1).txt"));
        assert!(!glob.is_match("/aab1.txt"));
    }

    #[test]
    fn test_case_sensitivity() {
        let insensitive = Glob::new("/Foo/*.TXT").unwrap();
        assert!(insensitive.is_match("/foo/bar.txt"));

        let sensitive = Glob::with_options("/Foo/*.TXT", GlobOptions::case_sensitive()).unwrap();
        assert!(!sensitive.is_match("/foo/bar.txt"));
        assert!(sensitive.is_match("/Foo/bar.TXT"));
    }

    #[test]
    fn test_full_string_match() {
        let glob = Glob::new("/foo").unwrap();
        assert!(glob.is_match("/foo"));
        assert!(!glob.is_match("/foo/bar"));
        assert!(!glob.is_match("/x/foo"));
    }

    #[test]
    fn test_base_directory() {
        let cases = [
            ("/some/dir/folder/newfile.*", "/some/dir/folder"),
            ("/foo/**/*.txt", "/foo"),
            ("/file.txt", ""),
            ("/a/b/c.txt", "/a/b"),
            ("/a/b?/c.txt", "/a"),
            ("/**", ""),
        ];
        for (pattern, expected) in cases {
            let glob = Glob::new(pattern).unwrap();
            assert_eq!(glob.base_directory(), expected, "pattern {pattern}");
        }
    }

    #[test]
    fn test_spans_subdirectories() {
        assert!(!Glob::new("/a/*.txt").unwrap().spans_subdirectories());
        assert!(!Glob::new("/a/b/c.txt").unwrap().spans_subdirectories());
        assert!(Glob::new("/a/**/c.txt").unwrap().spans_subdirectories());
        assert!(Glob::new("/a/*/c.txt").unwrap().spans_subdirectories());
        assert!(Glob::new("/a/**").unwrap().spans_subdirectories());
    }

    #[test]
    fn test_anchor() {
        assert_eq!(anchor("foo/*.txt"), "/foo/*.txt");
        assert_eq!(anchor("/foo/*.txt"), "/foo/*.txt");
        assert!(matches!(anchor("/x"), Cow::Borrowed(_)));
    }
}
