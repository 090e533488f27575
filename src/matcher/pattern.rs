//! Pattern matching implementation.

use std::str::FromStr;

use regex::Regex;

use crate::crypto::Address;

/// Errors raised while compiling a pattern.
#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),

    #[error("literal patterns may only contain hex characters (0-9, a-f), got {0:?}")]
    NotHex(String),

    #[error("literal pattern cannot be longer than 40 characters")]
    TooLong,
}

/// How the pattern text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PatternType {
    /// Regular expression searched in the `0x`-prefixed lowercase address
    #[default]
    Regex,
    /// Literal hex at the beginning of the address
    Prefix,
    /// Literal hex at the end of the address
    Suffix,
    /// Literal hex anywhere in the address
    Contains,
}

impl FromStr for PatternType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "regex" | "re" => Ok(PatternType::Regex),
            "prefix" | "start" | "begin" => Ok(PatternType::Prefix),
            "suffix" | "end" => Ok(PatternType::Suffix),
            "contains" | "anywhere" | "any" => Ok(PatternType::Contains),
            _ => Err(format!("Unknown pattern type: {}", s)),
        }
    }
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PatternType::Regex => write!(f, "regex"),
            PatternType::Prefix => write!(f, "prefix"),
            PatternType::Suffix => write!(f, "suffix"),
            PatternType::Contains => write!(f, "contains"),
        }
    }
}

/// Result of a pattern match operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// Full match found
    Match,
    /// No match
    NoMatch,
}

impl MatchResult {
    #[inline]
    pub fn is_match(self) -> bool {
        matches!(self, MatchResult::Match)
    }
}

/// A compiled pattern. An empty pattern matches every address.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// The pattern text as given (literal kinds are normalized to lowercase hex)
    source: String,
    pattern_type: PatternType,
    /// `None` for the match-anything pattern
    regex: Option<Regex>,
}

impl Pattern {
    /// Compiles pattern text.
    ///
    /// Literal kinds accept an optional `0x` and are case-insensitive; they compile to an
    /// anchored expression over the lowercase address.
    pub fn compile(text: &str, pattern_type: PatternType) -> Result<Self, PatternError> {
        if text.is_empty() {
            return Ok(Self::any());
        }

        let (source, expr) = match pattern_type {
            PatternType::Regex => (text.to_string(), text.to_string()),
            literal => {
                let lit = text.strip_prefix("0x").unwrap_or(text).to_lowercase();
                if !lit.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(PatternError::NotHex(text.to_string()));
                }
                if lit.len() > 40 {
                    return Err(PatternError::TooLong);
                }
                if lit.is_empty() {
                    return Ok(Self::any());
                }
                let expr = match literal {
                    PatternType::Prefix => format!("^0x{}", lit),
                    PatternType::Suffix => format!("{}$", lit),
                    _ => format!("^0x[0-9a-f]*{}", lit),
                };
                (lit, expr)
            }
        };

        Ok(Self {
            source,
            pattern_type,
            regex: Some(Regex::new(&expr)?),
        })
    }

    /// The pattern that accepts every address.
    pub fn any() -> Self {
        Self {
            source: String::new(),
            pattern_type: PatternType::Regex,
            regex: None,
        }
    }

    /// Returns the pattern text.
    pub fn pattern(&self) -> &str {
        &self.source
    }

    /// Returns the pattern type.
    pub fn pattern_type(&self) -> PatternType {
        self.pattern_type
    }

    /// Returns true if this pattern accepts every address.
    pub fn is_any(&self) -> bool {
        self.regex.is_none()
    }

    /// Matches an address against this pattern.
    #[inline]
    pub fn matches(&self, address: &Address) -> MatchResult {
        match &self.regex {
            None => MatchResult::Match,
            Some(_) => self.matches_str(&address.to_hex_prefixed()),
        }
    }

    /// Matches an address already rendered as `0x` + lowercase hex.
    pub fn matches_str(&self, address: &str) -> MatchResult {
        let matched = self.regex.as_ref().map_or(true, |re| re.is_match(address));
        if matched {
            MatchResult::Match
        } else {
            MatchResult::NoMatch
        }
    }

    /// Returns the estimated number of attempts for literal patterns (16^n).
    pub fn estimated_difficulty(&self) -> Option<u64> {
        match self.pattern_type {
            PatternType::Regex if self.is_any() => Some(1),
            PatternType::Regex => None,
            _ => Some(16u64.saturating_pow(self.source.len() as u32)),
        }
    }

    /// Returns a human-readable difficulty estimate.
    pub fn difficulty_description(&self) -> String {
        match self.estimated_difficulty() {
            None => "Unknown (regular expression)".into(),
            Some(0..=1_000) => "Very Easy (< 1 second)".into(),
            Some(1_001..=100_000) => "Easy (seconds)".into(),
            Some(100_001..=10_000_000) => "Medium (minutes)".into(),
            Some(10_000_001..=1_000_000_000) => "Hard (hours)".into(),
            Some(_) => "Very Hard (days or more)".into(),
        }
    }
}
