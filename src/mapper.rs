//! Element tree to JSON value mapping
//!
//! The encoding, per element:
//! - no attributes, no child elements and at most one text run: the text itself, or `""`
//! - otherwise an object holding `@name` for every attribute, `#text` for non-blank text, then
//!   one key per distinct child tag in order of first appearance; a tag that repeats maps to an
//!   array of its occurrences in document order
//!
//! Qualified names are used as keys verbatim, prefix included.

use std::hash::Hash;

use indexmap::IndexMap;

use crate::config::KeyConvention;
use crate::value::{Array, Object, Value};
use crate::xml::model::{is_blank, Content, Document, Element};

/// Maps a whole document to `{root-tag: value}`
pub fn map_document(document: &Document) -> Value {
    let mut root = Object::with_capacity(1);
    root.insert(document.root.name.as_str(), map(&document.root));
    Value::Object(root)
}

/// Maps one element to its JSON value
pub fn map(element: &Element) -> Value {
    if let Some(text) = leaf_text(element) {
        return Value::String(text.to_string());
    }

    let mut obj = Object::new();

    for (name, value) in &element.attributes {
        obj.insert(KeyConvention::attribute_key(name), value.as_str());
    }

    let text: String = element.text_runs().collect();
    if !is_blank(&text) {
        obj.insert(KeyConvention::TEXT_KEY, text);
    }

    collapse_into(
        &mut obj,
        element
            .child_elements()
            .map(|child| (child.name.as_str(), map(child))),
    );

    Value::Object(obj)
}

/// Text of an element that maps to a plain string, `None` if it needs an object
fn leaf_text(element: &Element) -> Option<&str> {
    if !element.attributes.is_empty() {
        return None;
    }
    match element.children.as_slice() {
        [] => Some(""),
        [Content::Text(text)] => Some(text.as_str()),
        _ => None,
    }
}

/// Inserts named values into `obj`, turning names that occur more than once into arrays
///
/// Keys are inserted in order of first occurrence and array items keep their input order.
pub(crate) fn collapse_into<K, I>(obj: &mut Object, entries: I)
where
    K: AsRef<str> + Hash + Eq,
    I: IntoIterator<Item = (K, Value)>,
{
    let mut groups: IndexMap<K, Vec<Value>> = IndexMap::new();
    for (name, value) in entries {
        groups.entry(name).or_default().push(value);
    }

    for (name, mut values) in groups {
        let value = if values.len() == 1 {
            values.pop().unwrap_or_default()
        } else {
            Value::Array(Array::from(values))
        };
        obj.insert(name.as_ref(), value);
    }
}
