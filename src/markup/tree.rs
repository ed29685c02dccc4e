//! Reads a markup fragment into a generic node tree.
//!
//! The reader is XML-strict about nesting and attribute syntax, with two HTML
//! allowances: `<br>` needs no closing tag, and the common HTML named
//! entities decode alongside the XML ones.

use quick_xml::escape::unescape_with;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::PressError;

/// Tags that never have children or a closing tag.
const VOID_TAGS: &[&str] = &["br"];

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Text(String),
    Element(MarkupElement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkupElement {
    /// Lower-cased tag name.
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl MarkupElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(nodes: &[MarkupNode], out: &mut String) {
    for node in nodes {
        match node {
            MarkupNode::Text(t) => out.push_str(t),
            MarkupNode::Element(e) => collect_text(&e.children, out),
        }
    }
}

/// Read `markup` into its top-level nodes.
pub fn parse_tree(markup: &str) -> Result<Vec<MarkupNode>, PressError> {
    let mut reader = Reader::from_str(markup);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = false;

    let mut stack: Vec<MarkupElement> = Vec::new();
    let mut roots: Vec<MarkupNode> = Vec::new();
    let mut buf = Vec::new();

    loop {
        let pos = reader.buffer_position();
        match reader.read_event_into(&mut buf) {
            Err(e) => {
                return Err(PressError::Parse(format!(
                    "malformed markup at byte {}: {}",
                    pos, e
                )))
            }
            Ok(Event::Start(e)) => {
                let element = open_element(&e)?;
                if VOID_TAGS.contains(&element.name.as_str()) {
                    attach(&mut stack, &mut roots, MarkupNode::Element(element));
                } else {
                    stack.push(element);
                }
            }
            Ok(Event::Empty(e)) => {
                let element = open_element(&e)?;
                attach(&mut stack, &mut roots, MarkupNode::Element(element));
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
                if VOID_TAGS.contains(&name.as_str()) {
                    buf.clear();
                    continue;
                }
                match stack.pop() {
                    Some(element) if element.name == name => {
                        attach(&mut stack, &mut roots, MarkupNode::Element(element))
                    }
                    Some(element) => {
                        return Err(PressError::Parse(format!(
                            "found </{}> while <{}> is open",
                            name, element.name
                        )))
                    }
                    None => {
                        return Err(PressError::Parse(format!(
                            "closing </{}> has no opening tag",
                            name
                        )))
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let raw = std::str::from_utf8(e.as_ref())
                    .map_err(|e| PressError::Parse(format!("markup is not UTF-8: {}", e)))?;
                let text = decode(raw)?;
                attach(&mut stack, &mut roots, MarkupNode::Text(text));
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                attach(&mut stack, &mut roots, MarkupNode::Text(text));
            }
            Ok(Event::Eof) => break,
            // Comments, declarations and processing instructions carry no content.
            Ok(_) => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(PressError::Parse(format!("<{}> is never closed", open.name)));
    }
    Ok(roots)
}

fn open_element(e: &BytesStart) -> Result<MarkupElement, PressError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_ascii_lowercase();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| {
            PressError::Parse(format!("bad attribute on <{}>: {}", name, err))
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
        let raw = std::str::from_utf8(&attr.value)
            .map_err(|err| PressError::Parse(format!("attribute is not UTF-8: {}", err)))?;
        attributes.push((key, decode(raw)?));
    }
    Ok(MarkupElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(stack: &mut [MarkupElement], roots: &mut Vec<MarkupNode>, node: MarkupNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => roots.push(node),
    }
}

fn decode(raw: &str) -> Result<String, PressError> {
    unescape_with(raw, html_entity)
        .map(|text| text.into_owned())
        .map_err(|e| PressError::Parse(format!("bad character reference: {}", e)))
}

fn html_entity(name: &str) -> Option<&'static str> {
    let decoded = match name {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "deg" => "\u{b0}",
        "plusmn" => "\u{b1}",
        "times" => "\u{d7}",
        "le" => "\u{2264}",
        "ge" => "\u{2265}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "hellip" => "\u{2026}",
        _ => return None,
    };
    Some(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(node: &MarkupNode) -> &MarkupElement {
        match node {
            MarkupNode::Element(e) => e,
            other => panic!("expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_fragment_with_several_roots() {
        let nodes = parse_tree("<p>One</p>\n<p>Two</p>").unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(element(&nodes[0]).text_content(), "One");
        assert_eq!(nodes[1], MarkupNode::Text("\n".to_string()));
    }

    #[test]
    fn test_attributes_and_case() {
        let nodes = parse_tree(r#"<SPAN Data-Ref="R1" class="reference big">[1]</SPAN>"#).unwrap();
        let span = element(&nodes[0]);
        assert_eq!(span.name, "span");
        assert_eq!(span.attr("data-ref"), Some("R1"));
        assert!(span.has_class("reference"));
    }

    #[test]
    fn test_entities_decode() {
        let nodes = parse_tree("<p>5&nbsp;kW &mdash; 3&#176; &amp; more&hellip;</p>").unwrap();
        assert_eq!(
            element(&nodes[0]).text_content(),
            "5\u{a0}kW \u{2014} 3\u{b0} & more\u{2026}"
        );
    }

    #[test]
    fn test_unclosed_br_is_void() {
        let nodes = parse_tree("<p>a<br>b<br/>c</p>").unwrap();
        let p = element(&nodes[0]);
        assert_eq!(p.children.len(), 5);
        assert_eq!(element(&p.children[1]).name, "br");
    }

    #[test]
    fn test_malformed_markup() {
        assert!(matches!(parse_tree("<p><b>x</p></b>"), Err(PressError::Parse(_))));
        assert!(matches!(parse_tree("<p>open"), Err(PressError::Parse(_))));
        assert!(matches!(parse_tree("</p>"), Err(PressError::Parse(_))));
        assert!(matches!(parse_tree("<p>&bogus;</p>"), Err(PressError::Parse(_))));
    }
}
