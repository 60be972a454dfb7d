//! XML parser implementation
//!
//! Tokenizing is done by `quick-xml`; this module assembles the events into an owned
//! [`Document`] tree with an explicit element stack, so document depth never turns into
//! recursion here.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::config::ParserConfig;
use crate::error::{ConvertError, Pos, Result};
use crate::utils::read_source;
use crate::xml::model::{is_blank, Content, Document, Element};

#[allow(clippy::expect_used)]
static BRACKETED_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<https?://[^>]*>").expect("bracketed url pattern is valid"));

#[allow(clippy::expect_used)]
static ENTITY_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<!ENTITY\s+([^\s%"'>]+)\s+(?:"([^"]*)"|'([^']*)')\s*>"#)
        .expect("entity declaration pattern is valid")
});

/// Prefixes bound without a declaration
const RESERVED_PREFIXES: [&str; 2] = ["xml", "xmlns"];

/// Internal DTD entities, name to replacement text
type Entities = HashMap<String, String>;

/// XML parser
#[derive(Debug)]
pub struct Parser<'a> {
    input: &'a str,
    config: ParserConfig,
}

/// Element under construction
struct Frame {
    element: Element,
    /// Text seen since the last child element; comments do not split it
    pending: String,
    opened_at: usize,
}

impl Frame {
    fn new(element: Element, opened_at: usize) -> Self {
        Self {
            element,
            pending: String::new(),
            opened_at,
        }
    }

    fn flush_text(&mut self) {
        if is_blank(&self.pending) {
            self.pending.clear();
        } else {
            let text = std::mem::take(&mut self.pending);
            self.element.children.push(Content::Text(text));
        }
    }
}

impl<'a> Parser<'a> {
    /// Create a new XML parser
    pub fn new(input: &'a str) -> Self {
        Self::with_config(input, ParserConfig::default())
    }

    pub fn with_config(input: &'a str, config: ParserConfig) -> Self {
        Self {
            input: input.strip_prefix('\u{feff}').unwrap_or(input),
            config,
        }
    }

    /// Parse an XML document
    pub fn parse(&mut self) -> Result<Document> {
        if is_blank(self.input) {
            return Err(ConvertError::parse("empty document", Pos::new(0, 1, 1)));
        }

        let mut reader = Reader::from_str(self.input);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<Frame> = Vec::new();
        let mut root: Option<Element> = None;
        let mut entities = Entities::new();
        let mut seen_markup = false;

        loop {
            let at = offset(reader.buffer_position());
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(err) => {
                    return Err(self.error(err.to_string(), offset(reader.error_position())));
                }
            };

            if matches!(event, Event::Decl(_)) && seen_markup {
                return Err(self.error("xml declaration must come first", at));
            }
            if !matches!(event, Event::Text(_)) {
                seen_markup = true;
            }

            match event {
                Event::Start(start) => {
                    self.check_open(&stack, root.as_ref(), at)?;
                    let element = self.open_element(&start, &stack, &entities, at)?;
                    if let Some(parent) = stack.last_mut() {
                        parent.flush_text();
                    }
                    stack.push(Frame::new(element, at));
                }
                Event::Empty(start) => {
                    self.check_open(&stack, root.as_ref(), at)?;
                    let element = self.open_element(&start, &stack, &entities, at)?;
                    self.attach(&mut stack, &mut root, element, at)?;
                }
                Event::End(end) => {
                    let name = self.decode_name(end.name().as_ref(), at)?;
                    let Some(mut frame) = stack.pop() else {
                        return Err(self.error(format!("unexpected closing tag </{name}>"), at));
                    };
                    if frame.element.name != name {
                        return Err(self.error(
                            format!(
                                "mismatched closing tag: expected </{}>, found </{name}>",
                                frame.element.name
                            ),
                            at,
                        ));
                    }
                    frame.flush_text();
                    self.attach(&mut stack, &mut root, frame.element, at)?;
                }
                Event::Text(text) => {
                    let text = text
                        .unescape_with(|name| resolve_entity(&entities, name))
                        .map_err(|err| self.error(err.to_string(), at))?;
                    self.append_text(&mut stack, &text, at)?;
                }
                Event::CData(cdata) => {
                    let text = std::str::from_utf8(&cdata)
                        .map_err(|_| self.error("invalid utf-8 in CDATA section", at))?;
                    self.append_text(&mut stack, text, at)?;
                }
                Event::DocType(doctype) => {
                    let doctype = std::str::from_utf8(&doctype)
                        .map_err(|_| self.error("invalid utf-8 in DOCTYPE", at))?;
                    entities.extend(internal_entities(doctype));
                }
                Event::Eof => break,
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) => {}
            }
        }

        if let Some(frame) = stack.last() {
            return Err(self.error(
                format!("unclosed tag <{}>", frame.element.name),
                frame.opened_at,
            ));
        }

        let root = root.ok_or_else(|| self.error("no root element", self.input.len()))?;
        debug!(root = %root.name, "parsed xml document");
        Ok(Document { root })
    }

    fn check_open(&self, stack: &[Frame], root: Option<&Element>, at: usize) -> Result<()> {
        if stack.is_empty() && root.is_some() {
            return Err(self.error("multiple root elements", at));
        }
        if stack.len() >= self.config.max_depth {
            return Err(self.error(
                format!("maximum nesting depth of {} exceeded", self.config.max_depth),
                at,
            ));
        }
        Ok(())
    }

    fn open_element(
        &self,
        start: &BytesStart<'_>,
        stack: &[Frame],
        entities: &Entities,
        at: usize,
    ) -> Result<Element> {
        let name = self.decode_name(start.name().as_ref(), at)?;
        let mut element = Element::new(name);

        for attr in start.attributes() {
            let attr = attr.map_err(|err| self.error(format!("invalid attribute: {err}"), at))?;
            let key = self.decode_name(attr.key.as_ref(), at)?;
            if attr.value.contains(&b'<') {
                return Err(self.error(format!("'<' in value of attribute {key}"), at));
            }
            let value = attr
                .unescape_value_with(|name| resolve_entity(entities, name))
                .map_err(|err| self.error(err.to_string(), at))?;

            if element.attributes.contains_key(&key) {
                return Err(self.error(format!("duplicate attribute {key}"), at));
            }
            element.attributes.insert(key, value.into_owned());
        }

        if let Some(prefix) = element.prefix() {
            self.check_bound(prefix, &element, stack, at)?;
        }
        for key in element.attributes.keys() {
            if let Some((prefix, _)) = key.split_once(':') {
                self.check_bound(prefix, &element, stack, at)?;
            }
        }

        Ok(element)
    }

    /// Fails unless `prefix` is declared on `element` or one of its open ancestors
    fn check_bound(&self, prefix: &str, element: &Element, stack: &[Frame], at: usize) -> Result<()> {
        if RESERVED_PREFIXES.contains(&prefix) {
            return Ok(());
        }
        let declaration = format!("xmlns:{prefix}");
        let declared = element.attributes.contains_key(&declaration)
            || stack
                .iter()
                .any(|frame| frame.element.attributes.contains_key(&declaration));
        if declared {
            Ok(())
        } else {
            Err(self.error(format!("unbound namespace prefix {prefix}"), at))
        }
    }

    fn attach(
        &self,
        stack: &mut [Frame],
        root: &mut Option<Element>,
        element: Element,
        at: usize,
    ) -> Result<()> {
        match stack.last_mut() {
            Some(parent) => {
                parent.flush_text();
                parent.element.children.push(Content::Element(element));
                Ok(())
            }
            None if root.is_some() => Err(self.error("multiple root elements", at)),
            None => {
                *root = Some(element);
                Ok(())
            }
        }
    }

    fn append_text(&self, stack: &mut [Frame], text: &str, at: usize) -> Result<()> {
        match stack.last_mut() {
            Some(frame) => {
                frame.pending.push_str(text);
                Ok(())
            }
            None if is_blank(text) => Ok(()),
            None => Err(self.error("text outside the root element", at)),
        }
    }

    fn decode_name(&self, raw: &[u8], at: usize) -> Result<String> {
        let name = std::str::from_utf8(raw).map_err(|_| self.error("invalid utf-8 in name", at))?;
        if !is_valid_name(name) {
            return Err(self.error(format!("invalid name {name:?}"), at));
        }
        Ok(name.to_string())
    }

    fn error(&self, reason: impl Into<String>, at: usize) -> ConvertError {
        ConvertError::parse(reason, Pos::locate(self.input, at))
    }
}

/// XML name production, approximated: a letter or `_` first, then letters, digits, `-`, `.`,
/// `_` or `:`; anything outside ASCII is accepted
fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let start_ok = first.is_ascii_alphabetic() || first == '_' || !first.is_ascii();
    start_ok
        && chars.all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | ':') || !c.is_ascii()
        })
}

fn resolve_entity<'e>(entities: &'e Entities, name: &str) -> Option<&'e str> {
    entities
        .get(name)
        .map(String::as_str)
        .or_else(|| resolve_predefined_entity(name))
}

/// General entities declared in the internal subset of a DOCTYPE
fn internal_entities(doctype: &str) -> impl Iterator<Item = (String, String)> + '_ {
    ENTITY_DECL.captures_iter(doctype).filter_map(|caps| {
        let name = caps.get(1)?.as_str().to_string();
        let value = caps.get(2).or_else(|| caps.get(3))?.as_str().to_string();
        Some((name, value))
    })
}

fn offset(position: u64) -> usize {
    usize::try_from(position).unwrap_or(usize::MAX)
}

/// Parse XML text with default settings
pub fn parse_str(input: &str) -> Result<Document> {
    parse_str_with_config(input, &ParserConfig::default())
}

/// Parse XML text
///
/// HTML pages are rejected as unsupported. When the first attempt fails and bracketed URL
/// pseudo-tags (`<https://...>`) are present, they are removed and the parse is retried once;
/// a failed retry reports the original error.
pub fn parse_str_with_config(input: &str, config: &ParserConfig) -> Result<Document> {
    reject_html(input)?;

    match Parser::with_config(input, config.clone()).parse() {
        Err(err)
            if config.strip_bracketed_urls && err.is_parse() && BRACKETED_URL.is_match(input) =>
        {
            let stripped: Cow<'_, str> = BRACKETED_URL.replace_all(input, "");
            match Parser::with_config(&stripped, config.clone()).parse() {
                Ok(document) => {
                    warn!(%err, "recovered by removing bracketed urls");
                    Ok(document)
                }
                Err(_) => Err(err),
            }
        }
        other => other,
    }
}

/// Read and parse one XML file
#[instrument(skip(config), fields(path = %path.display()))]
pub fn parse_file(path: &Path, config: &ParserConfig) -> Result<Document> {
    let content = read_source(path)?;
    parse_str_with_config(&content, config).map_err(|err| err.in_file(path))
}

fn reject_html(input: &str) -> Result<()> {
    let declared_xml = input
        .trim_start_matches('\u{feff}')
        .trim_start()
        .starts_with("<?xml");
    if !declared_xml && (input.contains("<!DOCTYPE html") || input.contains("<!doctype html")) {
        return Err(ConvertError::unsupported(
            "input is an HTML page, not an XML document",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_of(input: &str) -> Element {
        match parse_str(input) {
            Ok(document) => document.root,
            Err(err) => panic!("failed to parse {input:?}: {err}"),
        }
    }

    fn parse_error(input: &str) -> ConvertError {
        match parse_str(input) {
            Ok(document) => panic!("expected an error for {input:?}, got {document:?}"),
            Err(err) => err,
        }
    }

    #[test]
    fn test_parse_simple_element() {
        let root = root_of("<root></root>");
        assert_eq!(root.name, "root");
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_parse_attributes_in_document_order() {
        let root = root_of(r#"<root zeta="1" alpha='two' mid="&amp;"/>"#);
        let attributes: Vec<_> = root
            .attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        assert_eq!(attributes, vec![("zeta", "1"), ("alpha", "two"), ("mid", "&")]);
    }

    #[test]
    fn test_prefixes_preserved_verbatim() {
        let root = root_of(
            r#"<iati-activities xmlns:iati-extra="http://datastore.iatistandard.org/ns"><iati-extra:version iati-extra:v="2"/></iati-activities>"#,
        );
        let child = root.child_elements().next().map(|child| child.name.clone());
        assert_eq!(child.as_deref(), Some("iati-extra:version"));
        assert!(root.attributes.contains_key("xmlns:iati-extra"));
    }

    #[test]
    fn test_whitespace_runs_dropped_text_kept_verbatim() {
        let root = root_of("<a>\n  <b>  padded  </b>\n</a>");
        assert_eq!(root.children.len(), 1);
        let b = root.child_elements().next().map(|b| b.children.clone());
        assert_eq!(b, Some(vec![Content::Text("  padded  ".to_string())]));
    }

    #[test]
    fn test_text_split_by_comment_and_cdata_is_merged() {
        let root = root_of("<a>one<!-- note --> two<![CDATA[ <three> ]]></a>");
        assert_eq!(
            root.children,
            vec![Content::Text("one two <three> ".to_string())]
        );
    }

    #[test]
    fn test_entities_decoded() {
        let root = root_of("<a>&lt;x&gt; &#65;&#x42; &quot;q&quot;</a>");
        assert_eq!(root.text_runs().collect::<String>(), "<x> AB \"q\"");
    }

    #[test]
    fn test_declaration_comments_and_doctype_skipped() {
        let root = root_of(
            "\u{feff}<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- generated -->\n<!DOCTYPE a>\n<a/>\n",
        );
        assert_eq!(root.name, "a");
    }

    #[test]
    fn test_unclosed_tag_reports_position() {
        let err = parse_error("<a>\n  <b>text</b>");
        assert!(err.to_string().contains("unclosed tag <a>"));
        assert_eq!(err.pos(), Some(Pos::new(0, 1, 1)));
    }

    #[test]
    fn test_mismatched_namespace_prefix_fails() {
        let err = parse_error(r#"<iati:a xmlns:iati="urn:i" xmlns:other="urn:o"></other:a>"#);
        assert!(err.is_parse(), "{err}");
    }

    #[test]
    fn test_unbound_prefixes_fail() {
        let err = parse_error("<a><y:b/></a>");
        assert!(err.to_string().contains("unbound namespace prefix y"), "{err}");
        assert!(parse_error(r#"<a y:attr="1"/>"#).is_parse());
        assert!(parse_error(r#"<a><b xmlns:y="urn:y"/><y:c/></a>"#).is_parse());
    }

    #[test]
    fn test_declared_and_reserved_prefixes_pass() {
        let root = root_of(r#"<a xmlns:y="urn:y" xml:lang="en"><b><y:c y:d="1"/></b></a>"#);
        assert_eq!(root.attributes.get("xml:lang").map(String::as_str), Some("en"));
        assert!(root_of(r#"<y:a xmlns:y="urn:y"/>"#).name == "y:a");
    }

    #[test]
    fn test_invalid_names_fail() {
        assert!(parse_error("<1a/>").to_string().contains("invalid name"));
        assert!(parse_error(r#"<a -x="1"/>"#).is_parse());
        assert_eq!(root_of("<_a.b-c/>").name, "_a.b-c");
    }

    #[test]
    fn test_lt_in_attribute_value_fails() {
        assert!(parse_error(r#"<a x="<"/>"#).is_parse());
        assert_eq!(
            root_of(r#"<a x="&lt;"/>"#).attributes.get("x").map(String::as_str),
            Some("<")
        );
    }

    #[test]
    fn test_misplaced_declaration_fails() {
        assert!(parse_error("<a/><?xml version=\"1.0\"?>").is_parse());
        assert!(parse_error("<!-- c --><?xml version=\"1.0\"?><a/>").is_parse());
        assert_eq!(root_of("\n<?xml version=\"1.0\"?><a/>").name, "a");
    }

    #[test]
    fn test_internal_entities_are_expanded() {
        let root = root_of(r#"<!DOCTYPE a [<!ENTITY e "x"><!ENTITY f 'y z'>]><a v="&e;">&e;&amp;&f;</a>"#);
        assert_eq!(root.attributes.get("v").map(String::as_str), Some("x"));
        assert_eq!(root.text_runs().collect::<String>(), "x&y z");
    }

    #[test]
    fn test_invalid_character_reference_fails() {
        assert!(parse_error("<a>&#xZZ;</a>").is_parse());
        assert!(parse_error("<a>&unknown;</a>").is_parse());
    }

    #[test]
    fn test_duplicate_attribute_fails() {
        assert!(parse_error(r#"<a x="1" x="2"/>"#).is_parse());
    }

    #[test]
    fn test_multiple_roots_and_stray_text_fail() {
        assert!(parse_error("<a/><b/>").to_string().contains("multiple root"));
        assert!(parse_error("oops<a/>").to_string().contains("outside the root"));
    }

    #[test]
    fn test_empty_document_fails() {
        assert!(parse_error("  \n ").to_string().contains("empty document"));
        assert!(parse_error("<!-- only a comment -->")
            .to_string()
            .contains("no root element"));
    }

    #[test]
    fn test_depth_limit() {
        let config = ParserConfig {
            max_depth: 3,
            ..ParserConfig::default()
        };
        assert!(parse_str_with_config("<a><b><c/></b></a>", &config).is_ok());
        let err = parse_str_with_config("<a><b><c><d/></c></b></a>", &config);
        assert!(matches!(err, Err(ref e) if e.to_string().contains("nesting depth")));
    }

    #[test]
    fn test_bracketed_urls_are_recovered() {
        let input = "<a><b>see <https://example.org/x> here</b></a>";
        let root = root_of(input);
        let text: String = root
            .child_elements()
            .flat_map(|b| b.text_runs())
            .collect();
        assert_eq!(text, "see  here");

        let strict = ParserConfig {
            strip_bracketed_urls: false,
            ..ParserConfig::default()
        };
        assert!(parse_str_with_config(input, &strict).is_err());
    }

    #[test]
    fn test_html_page_is_unsupported() {
        let err = parse_error("<!DOCTYPE html><html><body>404</body></html>");
        assert!(matches!(err, ConvertError::UnsupportedSource { .. }));
    }
}
