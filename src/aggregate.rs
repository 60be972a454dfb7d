//! Directory aggregation
//!
//! A directory behaves like a synthetic parent element whose children are the root elements
//! of its files: the result is keyed by root tag, and a tag shared by several files becomes an
//! array ordered by file name.

use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use crate::config::{ParserConfig, WalkConfig, XML_EXTENSION};
use crate::error::{ConvertError, Result};
use crate::mapper::{collapse_into, map};
use crate::value::{Object, Value};
use crate::xml::model::Document;
use crate::xml::parser::parse_file;

/// Lists the XML documents below `dir`, sorted by path
///
/// The walk is recursive and follows symbolic links. Only regular files with the `xml`
/// extension are kept, minus names ending in one of the configured excluded suffixes.
pub fn collect_sources(dir: &Path, config: &WalkConfig) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            ConvertError::source_read(&path, io::Error::from(e))
        })?;

        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(OsStr::to_str) != Some(XML_EXTENSION) {
            continue;
        }
        if config.is_excluded(&entry.file_name().to_string_lossy()) {
            debug!(path = %path.display(), "skipping excluded file");
            continue;
        }
        files.push(path.to_path_buf());
    }

    sort_by_name(&mut files);
    Ok(files)
}

/// Maps every document in `paths` and combines them under their root tags
///
/// Sources are sorted first, so the result does not depend on the order given. The first
/// failure in sorted order is returned and no partial result is produced.
#[instrument(skip_all, fields(files = paths.len(), parallel = walk.parallel))]
pub fn aggregate(paths: &[PathBuf], walk: &WalkConfig, parser: &ParserConfig) -> Result<Value> {
    let mut sorted = paths.to_vec();
    sort_by_name(&mut sorted);

    let roots = if walk.parallel {
        // Workers finish out of order; the reported error is the first in path order.
        let results: Vec<Result<(String, Value)>> =
            sorted.par_iter().map(|path| map_file(path, parser)).collect();
        results.into_iter().collect::<Result<Vec<_>>>()?
    } else {
        sorted
            .iter()
            .map(|path| map_file(path, parser))
            .collect::<Result<Vec<_>>>()?
    };

    let mut combined = Object::new();
    collapse_into(&mut combined, roots);
    Ok(Value::Object(combined))
}

/// Walks `dir` and aggregates what it finds
pub fn aggregate_dir(dir: &Path, walk: &WalkConfig, parser: &ParserConfig) -> Result<Value> {
    let files = collect_sources(dir, walk)?;
    info!(dir = %dir.display(), files = files.len(), "aggregating directory");
    aggregate(&files, walk, parser)
}

fn map_file(path: &Path, parser: &ParserConfig) -> Result<(String, Value)> {
    let Document { root } = parse_file(path, parser)?;
    let value = map(&root);
    debug!(path = %path.display(), root = %root.name, "mapped file");
    Ok((root.name, value))
}

fn sort_by_name(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
}
