//! Size tokens understood by the image CDN.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A CDN size segment such as `w342` or `original`.
///
/// Named aliases (`small`, `medium`, `large`, `xlarge`) are accepted on
/// construction and normalised to the concrete token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SizeToken(Cow<'static, str>);

impl SizeToken {
    pub const SMALL: SizeToken = SizeToken(Cow::Borrowed("w154"));
    pub const MEDIUM: SizeToken = SizeToken(Cow::Borrowed("w342"));
    pub const LARGE: SizeToken = SizeToken(Cow::Borrowed("w500"));
    pub const XLARGE: SizeToken = SizeToken(Cow::Borrowed("w780"));
    pub const ORIGINAL: SizeToken = SizeToken(Cow::Borrowed("original"));

    /// Builds a token, resolving named aliases.
    pub fn new(token: impl AsRef<str>) -> Self {
        let token = token.as_ref().trim();
        match token.to_ascii_lowercase().as_str() {
            "small" => Self::SMALL,
            "medium" => Self::MEDIUM,
            "large" => Self::LARGE,
            "xlarge" => Self::XLARGE,
            "original" => Self::ORIGINAL,
            _ => SizeToken(Cow::Owned(token.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric width of the token, if it has one.
    pub fn width(&self) -> Option<u32> {
        parse_width(self.as_str())
    }
}

impl Default for SizeToken {
    fn default() -> Self {
        Self::MEDIUM
    }
}

impl fmt::Display for SizeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for SizeToken {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

impl From<&str> for SizeToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<SizeToken> for String {
    fn from(token: SizeToken) -> Self {
        token.0.into_owned()
    }
}

/// Every size the CDN serves, smallest first.
pub const DEFINED_SIZES: [SizeToken; 5] = [
    SizeToken::SMALL,
    SizeToken::MEDIUM,
    SizeToken::LARGE,
    SizeToken::XLARGE,
    SizeToken::ORIGINAL,
];

/// The size placeholders are rendered at.
pub const SMALLEST: SizeToken = SizeToken::SMALL;

/// Parses the width out of a token like `w342`.
///
/// One leading unit letter is stripped and the remainder must be a plain
/// integer. Anything else (`original`, `w`, `wide`) yields `None`.
pub fn parse_width(token: &str) -> Option<u32> {
    let digits = match token.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => &token[c.len_utf8()..],
        _ => token,
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
