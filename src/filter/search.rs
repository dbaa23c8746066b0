//! Free-text search term normalization / 搜索词规范化

use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::MAX_CODEPOINT;

/// Search terms longer than this are truncated (in characters) / 搜索词最大长度
pub const MAX_SEARCH_LEN: usize = 200;

/// `U+0041`, `0x41` or bare `41` / 十六进制码位
static HEX_CODEPOINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[Uu]\+|0[Xx])?([0-9A-Fa-f]{1,6})$").expect("valid hex codepoint regex")
});

/// Normalized search term / 规范化后的搜索词
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    text: String,
    codepoint: Option<u32>,
}

impl SearchTerm {
    /// Trim, truncate and detect an explicit codepoint. `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        let text: String = trimmed.chars().take(MAX_SEARCH_LEN).collect();
        let codepoint = detect_codepoint(&text);
        Some(Self { text, codepoint })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Codepoint the term refers to, if any / 搜索词指向的码位
    pub fn codepoint(&self) -> Option<u32> {
        self.codepoint
    }
}

/// A single character stands for itself; otherwise try hex notation
fn detect_codepoint(text: &str) -> Option<u32> {
    let mut chars = text.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(c as u32);
    }

    let caps = HEX_CODEPOINT.captures(text)?;
    let value = u32::from_str_radix(&caps[1], 16).ok()?;
    (value <= MAX_CODEPOINT).then_some(value)
}
