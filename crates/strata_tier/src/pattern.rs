// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Glob-style key patterns.
//!
//! [`KeyPattern`] accepts the glob dialect understood by Redis `SCAN ... MATCH`:
//!
//! | Syntax    | Matches                                   |
//! |-----------|-------------------------------------------|
//! | `*`       | any run of characters, including none     |
//! | `?`       | exactly one character                     |
//! | `[abc]`   | one of the listed characters              |
//! | `[^abc]`  | one character not in the list             |
//! | `[a-z]`   | one character in the inclusive range      |
//! | `\x`      | the literal character `x`                 |
//!
//! Parsing rejects malformed input up front so callers learn about a bad pattern before any
//! backend work starts.

use std::{fmt, str::FromStr};

use regex::{Regex, RegexBuilder};

/// Upper bound on the compiled size of a pattern, in bytes.
const COMPILED_SIZE_LIMIT: usize = 10 * (1 << 20);

/// A malformed key pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum PatternError {
    /// The pattern is empty.
    #[error("key pattern is empty")]
    Empty,

    /// A `[` opened a character class that never closes.
    #[error("unterminated character class starting at byte {position}")]
    UnterminatedClass {
        /// Byte offset of the opening bracket.
        position: usize,
    },

    /// A character class contains no characters.
    #[error("empty character class at byte {position}")]
    EmptyClass {
        /// Byte offset of the opening bracket.
        position: usize,
    },

    /// The pattern ends with a lone backslash.
    #[error("pattern ends with a dangling escape")]
    DanglingEscape,

    /// A character range runs backwards, such as `[z-a]`.
    #[error("invalid character range {start}-{end}")]
    InvalidRange {
        /// First character of the range.
        start: char,
        /// Last character of the range.
        end: char,
    },

    /// The pattern is well formed but compiles to a matcher beyond the size limit.
    #[error("key pattern is too complex: {detail}")]
    TooComplex {
        /// What the matcher compiler reported.
        detail: String,
    },
}

/// A validated glob pattern over cache keys.
///
/// # Examples
///
/// ```
/// use strata_tier::KeyPattern;
///
/// let pattern = KeyPattern::parse("user:1:*")?;
/// assert!(pattern.matches("user:1:profile"));
/// assert!(!pattern.matches("user:2:profile"));
///
/// assert!(KeyPattern::parse("user:[1-").is_err());
/// # Ok::<(), strata_tier::PatternError>(())
/// ```
#[derive(Debug, Clone)]
pub struct KeyPattern {
    source: String,
    regex: Regex,
}

impl KeyPattern {
    /// Parses and validates a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns a [`PatternError`] describing the first malformed construct.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        if pattern.is_empty() {
            return Err(PatternError::Empty);
        }

        let regex = compile(&translate(pattern)?, COMPILED_SIZE_LIMIT)?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Returns the glob exactly as it was given.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns `true` if `key` matches the whole pattern.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }
}

impl FromStr for KeyPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn translate(pattern: &str) -> Result<String, PatternError> {
    let mut out = String::with_capacity(pattern.len() * 2 + 8);
    out.push_str("(?s)^");

    let mut chars = pattern.char_indices().peekable();
    while let Some((position, c)) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => {
                let (_, escaped) = chars.next().ok_or(PatternError::DanglingEscape)?;
                push_literal(&mut out, escaped);
            }
            '[' => {
                let mut items = Vec::new();
                let mut negated = false;
                let mut closed = false;

                if chars.peek().is_some_and(|&(_, next)| next == '^') {
                    negated = true;
                    chars.next();
                }

                while let Some((_, member)) = chars.next() {
                    let member = match member {
                        ']' => {
                            closed = true;
                            break;
                        }
                        '\\' => chars.next().map(|(_, escaped)| escaped).ok_or(PatternError::DanglingEscape)?,
                        other => other,
                    };

                    let is_range = chars.peek().is_some_and(|&(_, next)| next == '-');
                    if is_range {
                        let mut lookahead = chars.clone();
                        lookahead.next();
                        match lookahead.next() {
                            Some((_, end)) if end != ']' => {
                                chars.next();
                                chars.next();
                                let end = if end == '\\' {
                                    chars.next().map(|(_, escaped)| escaped).ok_or(PatternError::DanglingEscape)?
                                } else {
                                    end
                                };
                                if end < member {
                                    return Err(PatternError::InvalidRange { start: member, end });
                                }
                                items.push((member, Some(end)));
                                continue;
                            }
                            _ => {}
                        }
                    }

                    items.push((member, None));
                }

                if !closed {
                    return Err(PatternError::UnterminatedClass { position });
                }
                if items.is_empty() {
                    return Err(PatternError::EmptyClass { position });
                }

                out.push('[');
                if negated {
                    out.push('^');
                }
                for (start, end) in items {
                    out.push_str(&regex::escape(start.encode_utf8(&mut [0; 4])));
                    if let Some(end) = end {
                        out.push('-');
                        out.push_str(&regex::escape(end.encode_utf8(&mut [0; 4])));
                    }
                }
                out.push(']');
            }
            other => push_literal(&mut out, other),
        }
    }

    out.push('$');
    Ok(out)
}

/// Compiles a translated pattern. Every construct was validated during translation, so only
/// the size limit can fail here.
fn compile(translated: &str, size_limit: usize) -> Result<Regex, PatternError> {
    RegexBuilder::new(translated)
        .size_limit(size_limit)
        .build()
        .map_err(|error| PatternError::TooComplex {
            detail: error.to_string(),
        })
}

fn push_literal(out: &mut String, c: char) {
    out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
}
