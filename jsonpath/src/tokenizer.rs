use std::{error::Error, fmt::Display};

/// One accessor step within a path expression: either an object key or
/// an array index.
///
/// Keys are borrowed verbatim from the path expression. The grammar does
/// no escape processing, so a bracket-quoted key holds exactly the
/// characters between the quotes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PathToken<'path> {
    Key(&'path str),
    Index(i64),
}

impl Display for PathToken<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathToken::Key(key) => {
                if is_bare_identifier(key) {
                    write!(f, ".{}", key)
                } else {
                    write!(f, "[\"{}\"]", key)
                }
            }
            PathToken::Index(index) => write!(f, "[{}]", index),
        }
    }
}

/// A key can be rendered in dot form only if it is a bare identifier:
/// letters, digits, or underscores, not starting with a digit.
pub(crate) fn is_bare_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        None => false,
        Some(first) => {
            (first.is_alphabetic() || first == '_')
                && chars.all(|ch| ch.is_alphanumeric() || ch == '_')
        }
    }
}

/// Parses a path expression into its token sequence.
///
/// The expression must start with `$`. The remainder is consumed
/// left-to-right by exactly three productions, tried in this order at
/// each position:
///
/// 1. `["<text>"]` - a bracket-quoted key; any non-empty run of
///    characters excluding the double-quote, taken verbatim.
/// 2. `.<text>` - a dot key; a non-empty maximal run of characters
///    excluding `.` and `[`.
/// 3. `[<digits>]` - a non-negative array index.
///
/// `$` alone yields the empty sequence, addressing the whole document.
pub fn parse(path: &str) -> Result<Vec<PathToken<'_>>, PathParseErr> {
    PathTokenizer::new(path).collect()
}

pub(crate) struct PathTokenizer<'path> {
    rest: &'path str,
    /// characters consumed so far, the leading '$' included
    consumed: usize,
    matched_root: bool,
}

impl<'path> PathTokenizer<'path> {
    pub(crate) fn new(path: &'path str) -> Self {
        Self {
            rest: path,
            consumed: 0,
            matched_root: false,
        }
    }

    fn advance(&mut self, bytes: usize) {
        let (eaten, rest) = self.rest.split_at(bytes);
        self.consumed += eaten.chars().count();
        self.rest = rest;
    }

    fn match_quoted_key(&self) -> Option<(PathToken<'path>, usize)> {
        let inner = self.rest.strip_prefix("[\"")?;
        let end = inner.find('"')?;
        if end == 0 || !inner[end + 1..].starts_with(']') {
            return None;
        }
        Some((PathToken::Key(&inner[..end]), end + 4))
    }

    fn match_dot_key(&self) -> Option<(PathToken<'path>, usize)> {
        let key = self.rest.strip_prefix('.')?;
        let end = key
            .find(|ch: char| ch == '.' || ch == '[')
            .unwrap_or(key.len());
        if end == 0 {
            return None;
        }
        Some((PathToken::Key(&key[..end]), end + 1))
    }

    fn match_index(&self) -> Option<(PathToken<'path>, usize)> {
        let digits = self.rest.strip_prefix('[')?;
        let end = digits
            .find(|ch: char| !ch.is_ascii_digit())
            .unwrap_or(digits.len());
        if end == 0 || !digits[end..].starts_with(']') {
            return None;
        }
        let index = digits[..end].parse::<i64>().ok()?;
        Some((PathToken::Index(index), end + 2))
    }
}

impl<'path> Iterator for PathTokenizer<'path> {
    type Item = Result<PathToken<'path>, PathParseErr>;

    fn next(&mut self) -> Option<Self::Item> {
        if !self.matched_root {
            self.matched_root = true;
            if !self.rest.starts_with('$') {
                self.rest = "";
                return Some(Err(PathParseErr::MissingRoot));
            }
            self.advance(1);
        }

        if self.rest.is_empty() {
            return None;
        }

        let matched = self
            .match_quoted_key()
            .or_else(|| self.match_dot_key())
            .or_else(|| self.match_index());

        match matched {
            Some((token, bytes)) => {
                self.advance(bytes);
                Some(Ok(token))
            }
            None => {
                let err = PathParseErr::UnexpectedCharacters {
                    offset: self.consumed + 1,
                    remainder: self.rest.to_string(),
                };
                // fatal; fuse the iterator
                self.rest = "";
                Some(Err(err))
            }
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathParseErr {
    /// Path expressions are root-relative and must begin with '$'.
    MissingRoot,
    /// None of the accessor productions matched. The offset is the
    /// 1-based character position within the whole expression.
    UnexpectedCharacters { offset: usize, remainder: String },
}

impl Error for PathParseErr {}
impl Display for PathParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathParseErr::MissingRoot => f.write_str("Path must start with '$'"),
            PathParseErr::UnexpectedCharacters { offset, remainder } => {
                write!(
                    f,
                    "Invalid path segment at position {}: ...{:?}",
                    offset, remainder
                )
            }
        }
    }
}
