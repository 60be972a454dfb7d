use super::{helpers, FormatConfig, FormatMode, Formatter};
use crate::value::{Array, Object, Value};

/// JSON text formatter
///
/// Object keys are written in stored order. Pretty output has no trailing whitespace and no
/// trailing newline.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format(&self, value: &Value, config: &FormatConfig) -> String {
        let mut out = String::new();
        Self::format_value(&mut out, value, 0, config);
        out
    }
}

impl JsonFormatter {
    fn format_value(out: &mut String, value: &Value, indent: usize, config: &FormatConfig) {
        match value {
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => out.push_str(&helpers::format_number(*n)),
            Value::String(s) => helpers::write_escaped(out, s),
            Value::Array(arr) => Self::format_array(out, arr, indent, config),
            Value::Object(obj) => Self::format_object(out, obj, indent, config),
        }
    }

    fn format_array(out: &mut String, arr: &Array, indent: usize, config: &FormatConfig) {
        if arr.is_empty() {
            out.push_str("[]");
            return;
        }

        out.push('[');
        for (i, item) in arr.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            Self::newline(out, indent + 1, config);
            Self::format_value(out, item, indent + 1, config);
        }
        Self::newline(out, indent, config);
        out.push(']');
    }

    fn format_object(out: &mut String, obj: &Object, indent: usize, config: &FormatConfig) {
        if obj.is_empty() {
            out.push_str("{}");
            return;
        }

        out.push('{');
        for (i, (key, value)) in obj.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            Self::newline(out, indent + 1, config);
            helpers::write_escaped(out, key);
            out.push(':');
            if config.mode == FormatMode::Pretty {
                out.push(' ');
            }
            Self::format_value(out, value, indent + 1, config);
        }
        Self::newline(out, indent, config);
        out.push('}');
    }

    fn newline(out: &mut String, indent: usize, config: &FormatConfig) {
        if config.mode == FormatMode::Pretty {
            out.push('\n');
            out.extend(std::iter::repeat_n(' ', indent * config.indent_spaces));
        }
    }
}
