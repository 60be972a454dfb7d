//! Conversion entry points and the output sink

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};

use crate::aggregate::aggregate_dir;
use crate::config::{ParserConfig, WalkConfig};
use crate::error::Result;
use crate::formatter::{FormatConfig, FormatMode, Formatter, JsonFormatter, DEFAULT_INDENT_SPACES};
use crate::mapper::map_document;
use crate::source::Source;
use crate::utils::write_output;
use crate::value::Value;
use crate::xml::parser::{parse_file, parse_str_with_config};

/// Result of a conversion
///
/// Pretty conversions hand back finished text; compact conversions hand back the value so the
/// caller can serialize it however it likes.
#[derive(Debug, Clone, PartialEq)]
pub enum Output {
    Text(String),
    Structured(Value),
}

impl Output {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Structured(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Structured(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    /// Text form: pretty text as returned, structured values serialized compactly
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Structured(value) => JsonFormatter.format(&value, &FormatConfig::compact()),
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Structured(value) => {
                f.write_str(&JsonFormatter.format(value, &FormatConfig::compact()))
            }
        }
    }
}

/// Conversion options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Return indented text instead of a structured value
    pub pretty: bool,
    /// Also write the serialized result here
    pub output: Option<PathBuf>,
    /// Indentation step of pretty output
    pub indent_spaces: usize,
    pub parser: ParserConfig,
    pub walk: WalkConfig,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            pretty: false,
            output: None,
            indent_spaces: DEFAULT_INDENT_SPACES,
            parser: ParserConfig::default(),
            walk: WalkConfig::default(),
        }
    }
}

impl ConvertOptions {
    pub fn format_config(&self) -> FormatConfig {
        FormatConfig {
            indent_spaces: self.indent_spaces,
            mode: FormatMode::from_pretty(self.pretty),
        }
    }
}

/// Converts a file, a directory or XML text to JSON
///
/// # Examples
/// ```
/// use iati_json::{convert, Output};
///
/// # fn main() -> iati_json::Result<()> {
/// let output = convert(r#"<a x="1">hi</a>"#, true, None)?;
/// assert_eq!(
///     output,
///     Output::Text("{\n    \"a\": {\n        \"@x\": \"1\",\n        \"#text\": \"hi\"\n    }\n}".into())
/// );
/// # Ok(())
/// # }
/// ```
pub fn convert(source: &str, pretty: bool, file: Option<&Path>) -> Result<Output> {
    let options = ConvertOptions {
        pretty,
        output: file.map(Path::to_path_buf),
        ..ConvertOptions::default()
    };
    convert_with_options(source, &options)
}

/// Converts with explicit options
pub fn convert_with_options(source: &str, options: &ConvertOptions) -> Result<Output> {
    let source = Source::resolve(source)?;
    convert_source(&source, options)
}

/// Converts an already classified source
#[instrument(skip_all, fields(source = %source.describe(), pretty = options.pretty))]
pub fn convert_source(source: &Source, options: &ConvertOptions) -> Result<Output> {
    let value = load_value(source, options)?;
    emit(value, &options.format_config(), options.output.as_deref())
}

/// Parses and maps a source into one value
pub fn load_value(source: &Source, options: &ConvertOptions) -> Result<Value> {
    match source {
        Source::Text(xml) => {
            let document = parse_str_with_config(xml, &options.parser)?;
            Ok(map_document(&document))
        }
        Source::File(path) => {
            let document = parse_file(path, &options.parser)?;
            Ok(map_document(&document))
        }
        Source::Directory(dir) => aggregate_dir(dir, &options.walk, &options.parser),
    }
}

/// Shapes the result for `config.mode`, writing its text to `destination` when given
pub fn emit(value: Value, config: &FormatConfig, destination: Option<&Path>) -> Result<Output> {
    match config.mode {
        FormatMode::Pretty => {
            let text = JsonFormatter.format(&value, config);
            if let Some(path) = destination {
                write_output(path, &text)?;
            }
            Ok(Output::Text(text))
        }
        FormatMode::Compact => {
            if let Some(path) = destination {
                write_output(path, &JsonFormatter.format(&value, config))?;
            }
            debug!("returning structured value");
            Ok(Output::Structured(value))
        }
    }
}
