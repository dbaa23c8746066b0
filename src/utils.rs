/// Codepoint and request-parameter utility functions / 码位与请求参数工具函数

use crate::error::{ExplorerError, Result};

/// Highest assignable Unicode codepoint / 最大Unicode码位
pub const MAX_CODEPOINT: u32 = 0x10FFFF;

/// Format codepoint as canonical `U+XXXX` id / 格式化为 U+XXXX
/// At least four upper-case hex digits, more for supplementary planes / 至少4位大写十六进制
pub fn format_code(codepoint: u32) -> String {
    format!("U+{:04X}", codepoint)
}

/// Render a codepoint reference as a string, if it is a scalar value / 码位转字符串
pub fn codepoint_to_string(codepoint: i64) -> Option<String> {
    u32::try_from(codepoint)
        .ok()
        .and_then(char::from_u32)
        .map(|c| c.to_string())
}

/// Parse page parameter / 解析页码参数
/// Non-numeric or negative values coerce to page 0 / 非数字或负数归零
pub fn parse_page(raw: Option<&str>) -> u32 {
    let raw = match raw {
        Some(r) => r.trim(),
        None => return 0,
    };

    if let Ok(page) = raw.parse::<i64>() {
        return page.clamp(0, u32::MAX as i64) as u32;
    }

    // "2.7" style values truncate like an integer parse would / 小数向下取整
    match raw.parse::<f64>() {
        Ok(page) if page.is_finite() && page > 0.0 => page.trunc().min(u32::MAX as f64) as u32,
        _ => 0,
    }
}

/// Parse codepoint path parameter (decimal) / 解析码位路径参数
/// Unlike pages, a malformed codepoint is rejected rather than coerced / 非法码位直接拒绝
pub fn parse_codepoint_param(raw: &str) -> Result<u32> {
    let trimmed = raw.trim();
    let value: i64 = trimmed
        .parse()
        .map_err(|_| ExplorerError::InvalidCodepoint(raw.to_string()))?;

    if value < 0 || value > MAX_CODEPOINT as i64 {
        return Err(ExplorerError::InvalidCodepoint(raw.to_string()));
    }
    Ok(value as u32)
}
