//! Property-based tests for XML to JSON mapping
//!
//! These tests use proptest to verify:
//! 1. Conversion is deterministic and never panics on generated documents
//! 2. Every child element lands under its tag, as a scalar once or an array when repeated
//! 3. Compact and pretty output describe the same JSON document

use proptest::prelude::*;
use iati_json::{convert, map, parse_str, serialize, FormatMode, Value};

#[derive(Clone, Debug)]
struct Node {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<Node>,
}

impl Node {
    fn to_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push_str(&format!(" {key}=\"{}\"", escape(value)));
        }
        if self.text.is_none() && self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        if let Some(text) = &self.text {
            out.push_str(&escape(text));
        }
        for child in &self.children {
            child.to_xml(out);
        }
        out.push_str(&format!("</{}>", self.name));
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn tag_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("narrative".to_string()),
        Just("sector".to_string()),
        Just("iati-identifier".to_string()),
        "[a-z][a-z-]{0,6}",
    ]
}

fn attributes() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::btree_map("[a-z]{1,5}", "[ -~]{0,8}", 0..3)
        .prop_map(|map| map.into_iter().collect())
}

fn text() -> impl Strategy<Value = Option<String>> {
    prop::option::of("[a-zA-Z0-9 &<>\"é]{1,12}".prop_filter("not blank", |s| !s.trim().is_empty()))
}

fn node() -> impl Strategy<Value = Node> {
    let leaf = (tag_name(), attributes(), text()).prop_map(|(name, attributes, text)| Node {
        name,
        attributes,
        text,
        children: Vec::new(),
    });
    leaf.prop_recursive(4, 48, 6, |inner| {
        (
            tag_name(),
            attributes(),
            prop::collection::vec(inner, 0..6),
        )
            .prop_map(|(name, attributes, children)| Node {
                name,
                attributes,
                text: None,
                children,
            })
    })
}

fn document() -> impl Strategy<Value = String> {
    node().prop_map(|root| {
        let mut xml = String::new();
        root.to_xml(&mut xml);
        xml
    })
}

fn occurrences(node: &Node) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for child in &node.children {
        match counts.iter_mut().find(|(name, _)| *name == child.name) {
            Some((_, count)) => *count += 1,
            None => counts.push((child.name.clone(), 1)),
        }
    }
    counts
}

proptest! {
    #[test]
    fn conversion_is_deterministic(xml in document()) {
        let first = convert(&xml, true, None);
        let second = convert(&xml, true, None);
        prop_assert!(first.is_ok());
        prop_assert_eq!(first.ok(), second.ok());
    }

    #[test]
    fn children_collapse_by_tag(root in node()) {
        let mut xml = String::new();
        root.to_xml(&mut xml);
        let document = parse_str(&xml);
        prop_assert!(document.is_ok());
        let Ok(document) = document else { return Ok(()) };
        let value = map(&document.root);

        for (name, count) in occurrences(&root) {
            let entry = value.get(&name);
            prop_assert!(entry.is_some(), "missing key {}", name);
            match entry {
                Some(Value::Array(items)) if count > 1 => prop_assert_eq!(items.len(), count),
                Some(Value::Array(_)) => prop_assert!(false, "single {} became an array", name),
                Some(_) => prop_assert_eq!(count, 1),
                None => {}
            }
        }
        for (key, _) in &root.attributes {
            let attr_key = format!("@{key}");
            prop_assert!(value.get(&attr_key).is_some());
        }
    }

    #[test]
    fn compact_and_pretty_agree(xml in document()) {
        let document = parse_str(&xml);
        prop_assert!(document.is_ok());
        let Ok(document) = document else { return Ok(()) };
        let value = iati_json::map_document(&document);

        let compact: serde_json::Value =
            serde_json::from_str(&serialize(&value, FormatMode::Compact)).unwrap_or_default();
        let pretty: serde_json::Value =
            serde_json::from_str(&serialize(&value, FormatMode::Pretty)).unwrap_or_default();
        prop_assert_ne!(&compact, &serde_json::Value::Null);
        prop_assert_eq!(compact, pretty);
    }
}
