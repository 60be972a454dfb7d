//! XML tree builder

pub mod model;
pub mod parser;

pub use model::{Content, Document, Element};
pub use parser::{parse_file, parse_str, parse_str_with_config, Parser};
