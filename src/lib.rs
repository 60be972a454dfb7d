//! iati-json: converts IATI XML documents to JSON
//!
//! This crate provides functionality to:
//! - Parse an XML document into an element tree
//! - Map elements to JSON with `@attribute`, `#text` and repeated-tag array rules
//! - Aggregate a directory of documents into one value keyed by root tag
//! - Serialize the result as compact or indented JSON, optionally to a file
//!
//! # Examples
//! ```
//! use iati_json::{convert, Result};
//!
//! fn example() -> Result<()> {
//!     let output = convert("<iati-activities><iati-activity/></iati-activities>", false, None)?;
//!     println!("{output}");
//!     Ok(())
//! }
//! # example().ok();
//! ```

pub mod aggregate;
pub mod config;
pub mod convert;
pub mod error;
pub mod formatter;
pub mod mapper;
pub mod source;
pub mod utils;
pub mod value;
pub mod xml;

// Re-exports
pub use aggregate::{aggregate, aggregate_dir, collect_sources};
pub use config::{KeyConvention, ParserConfig, WalkConfig};
pub use convert::{convert, convert_source, convert_with_options, ConvertOptions, Output};
pub use error::{ConvertError, Pos, ReadFailure, Result};
pub use formatter::{serialize, FormatConfig, FormatMode, Formatter, JsonFormatter};
pub use mapper::{map, map_document};
pub use source::Source;
pub use value::{Array, Object, Value};
pub use xml::{parse_file, parse_str, parse_str_with_config, Content, Document, Element, Parser};
