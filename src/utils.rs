use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ConvertError, Result};

/// Reads a source file into text
///
/// UTF-8 is expected; a UTF-8 byte order mark is dropped and files starting with a UTF-16
/// byte order mark are decoded as UTF-16. Anything else is reported as an encoding failure.
pub fn read_source(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|e| ConvertError::source_read(path, e))?;
    debug!(path = %path.display(), bytes = bytes.len(), "read source file");
    decode_source(bytes).ok_or_else(|| ConvertError::invalid_encoding(path))
}

pub fn decode_source(bytes: Vec<u8>) -> Option<String> {
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(rest, u16::from_be_bytes);
    }

    let text = String::from_utf8(bytes).ok()?;
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => Some(stripped.to_string()),
        None => Some(text),
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .filter_map(|pair| <[u8; 2]>::try_from(pair).ok())
        .map(to_unit)
        .collect();
    String::from_utf16(&units).ok()
}

/// Writes `content` to `path`, creating or truncating the file
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| ConvertError::output_write(path, e))?;
    info!(path = %path.display(), bytes = content.len(), "wrote output file");
    Ok(())
}
