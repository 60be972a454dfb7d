mod json;

pub use self::json::JsonFormatter;
use crate::value::Value;

/// Default indentation step of pretty output
pub const DEFAULT_INDENT_SPACES: usize = 4;

/// Layout of serialized JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatMode {
    /// One key or element per line, indented
    Pretty,
    /// No whitespace between tokens
    #[default]
    Compact,
}

impl FormatMode {
    pub fn from_pretty(pretty: bool) -> Self {
        if pretty {
            Self::Pretty
        } else {
            Self::Compact
        }
    }
}

/// Configuration options for formatting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatConfig {
    /// Number of spaces per nesting level in pretty mode
    pub indent_spaces: usize,
    pub mode: FormatMode,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            indent_spaces: DEFAULT_INDENT_SPACES,
            mode: FormatMode::Compact,
        }
    }
}

impl FormatConfig {
    pub fn pretty() -> Self {
        Self {
            mode: FormatMode::Pretty,
            ..Self::default()
        }
    }

    pub fn compact() -> Self {
        Self::default()
    }
}

/// Trait for formatting a Value as a string
pub trait Formatter {
    fn format(&self, value: &Value, config: &FormatConfig) -> String;
}

/// Serializes `value` with the default indentation for `mode`
pub fn serialize(value: &Value, mode: FormatMode) -> String {
    let config = FormatConfig {
        mode,
        ..FormatConfig::default()
    };
    JsonFormatter.format(value, &config)
}

/// Helper functions for formatting scalars
pub mod helpers {
    use std::fmt::Write;

    pub fn format_number(n: f64) -> String {
        if n.is_finite() {
            n.to_string()
        } else {
            "null".to_string()
        }
    }

    /// Writes `s` as a quoted JSON string
    pub fn write_escaped(out: &mut String, s: &str) {
        out.push('"');
        for ch in s.chars() {
            match ch {
                '"' => out.push_str("\\\""),
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                '\u{08}' => out.push_str("\\b"),
                '\u{0c}' => out.push_str("\\f"),
                c if u32::from(c) < 0x20 => {
                    let _ = write!(out, "\\u{:04x}", u32::from(c));
                }
                c => out.push(c),
            }
        }
        out.push('"');
    }
}
