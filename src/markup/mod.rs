//! # Markup
//!
//! Turns characterization markup into typed content: styled text runs,
//! reference badges, tables, list items and embedded value tables.
//!
//! Only a fixed tag vocabulary is understood. Any other tag fails the whole
//! parse with [`PressError::Parse`] naming the tag.

pub mod tree;

pub use tree::{parse_tree, MarkupElement, MarkupNode};

use log::trace;

use crate::error::PressError;
use crate::layout::table::{MarkupRow, TableSource};
use crate::style::StyleSheet;
use crate::text::{merge_runs, ElementKind, ParagraphElement, Styles};

/// The supported tag vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    P,
    Div,
    Span,
    A,
    Strong,
    Em,
    Sup,
    Sub,
    Br,
    Table,
    Thead,
    Tbody,
    Tr,
    Th,
    Td,
    Ul,
    Ol,
    Li,
}

impl Tag {
    pub fn from_name(name: &str) -> Result<Tag, PressError> {
        Ok(match name {
            "p" => Tag::P,
            "div" => Tag::Div,
            "span" => Tag::Span,
            "a" => Tag::A,
            "strong" | "b" => Tag::Strong,
            "em" | "i" => Tag::Em,
            "sup" => Tag::Sup,
            "sub" => Tag::Sub,
            "br" => Tag::Br,
            "table" => Tag::Table,
            "thead" => Tag::Thead,
            "tbody" => Tag::Tbody,
            "tr" => Tag::Tr,
            "th" => Tag::Th,
            "td" => Tag::Td,
            "ul" => Tag::Ul,
            "ol" => Tag::Ol,
            "li" => Tag::Li,
            other => return Err(PressError::Parse(format!("unsupported tag <{}>", other))),
        })
    }

    /// Tags that start a new paragraph or stand as blocks of their own.
    fn is_block(self) -> bool {
        matches!(self, Tag::P | Tag::Div | Tag::Table | Tag::Ul | Tag::Ol)
    }
}

/// How a list item is marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMarker {
    Bullet,
    Number(usize),
}

impl ListMarker {
    pub fn label(&self) -> String {
        match self {
            ListMarker::Bullet => "\u{2022}".to_string(),
            ListMarker::Number(n) => format!("{}.", n),
        }
    }
}

/// One list item and its parsed content.
#[derive(Debug, Clone)]
pub struct ListNode {
    pub marker: ListMarker,
    pub content: Vec<Content>,
}

impl ListNode {
    /// The item's runs, with nested blocks flattened onto new lines.
    pub fn runs(&self) -> Result<Vec<ParagraphElement>, PressError> {
        flatten(&self.content)
    }
}

/// A reference to one of the measure's value tables.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedTable {
    pub name: String,
    /// Column subset from the markup. `None` defers to configuration.
    pub columns: Option<Vec<String>>,
}

/// Parsed content in document order.
#[derive(Debug, Clone)]
pub enum Content {
    Element(ParagraphElement),
    Table(TableSource),
    List(ListNode),
    ValueTable(EmbeddedTable),
}

/// Content grouped at paragraph boundaries.
#[derive(Debug, Clone)]
pub enum Block {
    Paragraph {
        /// Paragraph style named by the element's class, if any.
        style: Option<String>,
        runs: Vec<ParagraphElement>,
    },
    Table(TableSource),
    ListItem(ListNode),
    ValueTable(EmbeddedTable),
}

pub struct MarkupParser<'a> {
    sheet: &'a StyleSheet,
}

impl<'a> MarkupParser<'a> {
    pub fn new(sheet: &'a StyleSheet) -> Self {
        Self { sheet }
    }

    /// Parse a node list into flat content.
    pub fn parse(&self, nodes: &[MarkupNode]) -> Result<Vec<Content>, PressError> {
        let mut out = Vec::new();
        for node in nodes {
            self.node(node, &mut out)?;
        }
        Ok(out)
    }

    /// Read and parse a markup string.
    pub fn parse_str(&self, markup: &str) -> Result<Vec<Content>, PressError> {
        self.parse(&parse_tree(markup)?)
    }

    /// Read a markup string and group it into blocks.
    pub fn parse_blocks_str(&self, markup: &str) -> Result<Vec<Block>, PressError> {
        self.parse_blocks(&parse_tree(markup)?)
    }

    /// Parse and group into blocks: each `p`/`div` is its own paragraph, and
    /// tables, list items and value tables stand alone.
    pub fn parse_blocks(&self, nodes: &[MarkupNode]) -> Result<Vec<Block>, PressError> {
        let mut blocks = Vec::new();
        self.collect_blocks(nodes, &mut blocks)?;
        Ok(blocks)
    }

    fn collect_blocks(&self, nodes: &[MarkupNode], blocks: &mut Vec<Block>) -> Result<(), PressError> {
        let mut pending = Vec::new();
        for node in nodes {
            match node {
                MarkupNode::Element(el) if self.is_container(el)? => {
                    flush(&mut pending, None, blocks);
                    if self.has_block_children(el)? {
                        self.collect_blocks(&el.children, blocks)?;
                    } else {
                        let style = self.class_style(el);
                        let mut inner = Vec::new();
                        for content in self.parse(std::slice::from_ref(node))? {
                            push_content(content, &mut inner, style.clone(), blocks);
                        }
                        flush(&mut inner, style, blocks);
                    }
                }
                _ => {
                    for content in self.parse(std::slice::from_ref(node))? {
                        push_content(content, &mut pending, None, blocks);
                    }
                }
            }
        }
        flush(&mut pending, None, blocks);
        Ok(())
    }

    /// A plain `p`/`div` (not a badge or value table placeholder).
    fn is_container(&self, el: &MarkupElement) -> Result<bool, PressError> {
        let tag = Tag::from_name(&el.name)?;
        Ok(matches!(tag, Tag::P | Tag::Div)
            && !is_badge(el)
            && el.attr("data-value-table").is_none())
    }

    fn has_block_children(&self, el: &MarkupElement) -> Result<bool, PressError> {
        for child in &el.children {
            if let MarkupNode::Element(c) = child {
                if Tag::from_name(&c.name)?.is_block() {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// The first class naming a paragraph style in the catalog.
    fn class_style(&self, el: &MarkupElement) -> Option<String> {
        el.classes()
            .find(|c| self.sheet.has_paragraph(c))
            .map(str::to_string)
    }

    fn node(&self, node: &MarkupNode, out: &mut Vec<Content>) -> Result<(), PressError> {
        let el = match node {
            MarkupNode::Text(text) => {
                let text = collapse_whitespace(text);
                if text == " " {
                    out.push(Content::Element(ParagraphElement::space()));
                } else if !text.is_empty() {
                    out.push(Content::Element(ParagraphElement::text(text)));
                }
                return Ok(());
            }
            MarkupNode::Element(el) => el,
        };

        let tag = Tag::from_name(&el.name)?;
        if is_badge(el) {
            let label = match el.attr("data-label") {
                Some(label) => label.to_string(),
                None => collapse_whitespace(&el.text_content()),
            };
            trace!("reference badge {:?}", label);
            out.push(Content::Element(ParagraphElement::reference(label)));
            return Ok(());
        }

        match tag {
            Tag::P | Tag::Div => match el.attr("data-value-table") {
                Some(name) => out.push(Content::ValueTable(EmbeddedTable {
                    name: name.trim().to_string(),
                    columns: el.attr("data-columns").map(split_columns),
                })),
                None => self.children(el, out)?,
            },
            Tag::Span | Tag::A => {
                let start = out.len();
                self.children(el, out)?;
                if let Some(style) = self.class_style(el) {
                    for content in &mut out[start..] {
                        if let Content::Element(e) = content {
                            if e.style.is_none() {
                                e.style = Some(style.clone());
                            }
                        }
                    }
                }
            }
            Tag::Strong => self.styled(el, Styles::STRONG, out)?,
            Tag::Em => self.styled(el, Styles::ITALIC, out)?,
            Tag::Sup => self.styled(el, Styles::SUPERSCRIPT, out)?,
            Tag::Sub => self.styled(el, Styles::SUBSCRIPT, out)?,
            Tag::Br => out.push(Content::Element(ParagraphElement::line_break())),
            Tag::Table => out.push(Content::Table(self.table(el)?)),
            Tag::Ul | Tag::Ol => {
                let mut number = 0;
                for child in &el.children {
                    match child {
                        MarkupNode::Text(t) if t.trim().is_empty() => {}
                        MarkupNode::Element(item) if item.name == "li" => {
                            number += 1;
                            let marker = if tag == Tag::Ol {
                                ListMarker::Number(number)
                            } else {
                                ListMarker::Bullet
                            };
                            out.push(Content::List(ListNode {
                                marker,
                                content: self.parse(&item.children)?,
                            }));
                        }
                        other => {
                            return Err(PressError::Parse(format!(
                                "<{}> may only contain <li>, found {}",
                                el.name,
                                describe(other)
                            )))
                        }
                    }
                }
            }
            Tag::Li => out.push(Content::List(ListNode {
                marker: ListMarker::Bullet,
                content: self.parse(&el.children)?,
            })),
            Tag::Thead | Tag::Tbody | Tag::Tr | Tag::Th | Tag::Td => {
                return Err(PressError::Parse(format!("<{}> outside <table>", el.name)))
            }
        }
        Ok(())
    }

    fn children(&self, el: &MarkupElement, out: &mut Vec<Content>) -> Result<(), PressError> {
        for child in &el.children {
            self.node(child, out)?;
        }
        Ok(())
    }

    fn styled(&self, el: &MarkupElement, styles: Styles, out: &mut Vec<Content>) -> Result<(), PressError> {
        let start = out.len();
        self.children(el, out)?;
        for content in &mut out[start..] {
            if let Content::Element(e) = content {
                e.styles = e.styles.union(styles);
            }
        }
        Ok(())
    }

    fn table(&self, el: &MarkupElement) -> Result<TableSource, PressError> {
        let mut rows = Vec::new();
        for child in &el.children {
            match child {
                MarkupNode::Text(t) if t.trim().is_empty() => {}
                MarkupNode::Element(section) => match Tag::from_name(&section.name)? {
                    Tag::Thead | Tag::Tbody => {
                        let in_head = section.name == "thead";
                        for row in &section.children {
                            match row {
                                MarkupNode::Text(t) if t.trim().is_empty() => {}
                                MarkupNode::Element(tr) if tr.name == "tr" => {
                                    rows.push(self.row(tr, in_head)?)
                                }
                                other => {
                                    return Err(PressError::Parse(format!(
                                        "<{}> may only contain <tr>, found {}",
                                        section.name,
                                        describe(other)
                                    )))
                                }
                            }
                        }
                    }
                    Tag::Tr => rows.push(self.row(section, false)?),
                    _ => {
                        return Err(PressError::Parse(format!(
                            "<{}> inside <table>",
                            section.name
                        )))
                    }
                },
                other => {
                    return Err(PressError::Parse(format!(
                        "{} directly inside <table>",
                        describe(other)
                    )))
                }
            }
        }
        TableSource::from_markup(rows)
    }

    fn row(&self, tr: &MarkupElement, in_head: bool) -> Result<MarkupRow, PressError> {
        let mut cells = Vec::new();
        let mut header_cells = true;
        for child in &tr.children {
            match child {
                MarkupNode::Text(t) if t.trim().is_empty() => {}
                MarkupNode::Element(cell) if cell.name == "th" || cell.name == "td" => {
                    header_cells &= cell.name == "th";
                    cells.push(self.cell(cell)?);
                }
                other => {
                    return Err(PressError::Parse(format!(
                        "<tr> may only contain <th> or <td>, found {}",
                        describe(other)
                    )))
                }
            }
        }
        Ok(MarkupRow {
            cells,
            in_head,
            header_cells: header_cells && !tr.children.is_empty(),
        })
    }

    /// Cell runs; consecutive block children go on separate lines.
    fn cell(&self, cell: &MarkupElement) -> Result<Vec<ParagraphElement>, PressError> {
        let mut runs = Vec::new();
        for child in &cell.children {
            let block = match child {
                MarkupNode::Element(el) => Tag::from_name(&el.name)?.is_block(),
                MarkupNode::Text(_) => false,
            };
            if block && has_visible(&runs) {
                runs.push(ParagraphElement::line_break());
            }
            runs.extend(flatten(&self.parse(std::slice::from_ref(child))?)?);
        }
        while runs.last().is_some_and(|r| r.kind == ElementKind::Break) {
            runs.pop();
        }
        Ok(merge_runs(runs))
    }
}

fn push_content(
    content: Content,
    pending: &mut Vec<ParagraphElement>,
    style: Option<String>,
    blocks: &mut Vec<Block>,
) {
    match content {
        Content::Element(e) => pending.push(e),
        Content::Table(t) => {
            flush(pending, style, blocks);
            blocks.push(Block::Table(t));
        }
        Content::List(item) => {
            flush(pending, style, blocks);
            blocks.push(Block::ListItem(item));
        }
        Content::ValueTable(v) => {
            flush(pending, style, blocks);
            blocks.push(Block::ValueTable(v));
        }
    }
}

/// Close the pending paragraph unless it is only whitespace.
fn flush(pending: &mut Vec<ParagraphElement>, style: Option<String>, blocks: &mut Vec<Block>) {
    let runs = std::mem::take(pending);
    if has_visible(&runs) {
        blocks.push(Block::Paragraph {
            style,
            runs: merge_runs(runs),
        });
    }
}

fn has_visible(runs: &[ParagraphElement]) -> bool {
    runs.iter().any(|r| match r.kind {
        ElementKind::Text | ElementKind::Reference => !r.text.trim().is_empty(),
        ElementKind::Space | ElementKind::Break => false,
    })
}

/// Flatten content into runs. List items become marker-prefixed lines.
fn flatten(contents: &[Content]) -> Result<Vec<ParagraphElement>, PressError> {
    let mut runs = Vec::new();
    for content in contents {
        match content {
            Content::Element(e) => runs.push(e.clone()),
            Content::List(item) => {
                if has_visible(&runs) {
                    runs.push(ParagraphElement::line_break());
                }
                runs.push(ParagraphElement::text(format!("{} ", item.marker.label())));
                runs.extend(item.runs()?);
                runs.push(ParagraphElement::line_break());
            }
            Content::Table(_) => {
                return Err(PressError::Parse("tables cannot be nested here".to_string()))
            }
            Content::ValueTable(v) => {
                return Err(PressError::Parse(format!(
                    "value table '{}' cannot be nested here",
                    v.name
                )))
            }
        }
    }
    Ok(runs)
}

fn is_badge(el: &MarkupElement) -> bool {
    el.attr("data-ref").is_some() || el.has_class("reference")
}

fn split_columns(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Collapse runs of markup whitespace to one space. No-break spaces survive.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if matches!(ch, ' ' | '\t' | '\n' | '\r' | '\x0c') {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}

fn describe(node: &MarkupNode) -> String {
    match node {
        MarkupNode::Text(_) => "text".to_string(),
        MarkupNode::Element(e) => format!("<{}>", e.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::names;

    fn elements(contents: &[Content]) -> Vec<ParagraphElement> {
        contents
            .iter()
            .filter_map(|c| match c {
                Content::Element(e) => Some(e.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_four_run_scenario() {
        let sheet = StyleSheet::standard("Helvetica");
        let parser = MarkupParser::new(&sheet);
        let contents = parser
            .parse_str(r#"<p>Saves <strong>20%</strong> energy<span data-ref="R100">[1]</span></p>"#)
            .unwrap();
        let runs = merge_runs(elements(&contents));
        assert_eq!(runs.len(), 4);
        assert_eq!(runs[0].text, "Saves ");
        assert!(runs[0].styles.is_normal());
        assert_eq!(runs[1].text, "20%");
        assert!(runs[1].styles.contains(Styles::STRONG));
        assert_eq!(runs[2].text, " energy");
        assert_eq!(runs[3].kind, ElementKind::Reference);
        assert_eq!(runs[3].text, "[1]");
    }

    #[test]
    fn test_unsupported_tag_names_tag() {
        let sheet = StyleSheet::standard("Helvetica");
        let parser = MarkupParser::new(&sheet);
        let err = parser
            .parse_str(r#"<p>See <iframe src="x"></iframe></p>"#)
            .unwrap_err();
        assert!(matches!(err, PressError::Parse(_)));
        assert!(err.to_string().contains("iframe"));
    }

    #[test]
    fn test_table_parts_outside_table() {
        let sheet = StyleSheet::standard("Helvetica");
        let parser = MarkupParser::new(&sheet);
        for markup in ["<thead><tr><th>A</th></tr></thead>", "<td>x</td>", "<tr></tr>"] {
            assert!(matches!(parser.parse_str(markup), Err(PressError::Parse(_))));
        }
    }

    #[test]
    fn test_nested_styles_union() {
        let sheet = StyleSheet::standard("Helvetica");
        let parser = MarkupParser::new(&sheet);
        let runs = elements(
            &parser
                .parse_str("<p><b><i>x</i></b>m<sup>2</sup>H<sub>2</sub>O</p>")
                .unwrap(),
        );
        assert!(runs[0].styles.contains(Styles::STRONG | Styles::ITALIC));
        assert!(runs[2].styles.contains(Styles::SUPERSCRIPT));
        assert!(runs[4].styles.contains(Styles::SUBSCRIPT));
        assert!(runs[5].styles.is_normal());
    }

    #[test]
    fn test_badge_label_and_marker_forms() {
        let sheet = StyleSheet::standard("Helvetica");
        let parser = MarkupParser::new(&sheet);
        let runs = elements(
            &parser
                .parse_str(
                    r#"<p><span class="reference" data-label="DEER">ignored <b>text</b></span><a data-ref="2">[2]</a></p>"#,
                )
                .unwrap(),
        );
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].kind, ElementKind::Reference);
        assert_eq!(runs[0].text, "DEER");
        assert_eq!(runs[1].text, "[2]");
    }

    #[test]
    fn test_whitespace_between_elements_is_space() {
        let sheet = StyleSheet::standard("Helvetica");
        let parser = MarkupParser::new(&sheet);
        let runs = elements(&parser.parse_str("<p><b>a</b>\n   <i>b</i></p>").unwrap());
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[1].kind, ElementKind::Space);
    }

    #[test]
    fn test_lists() {
        let sheet = StyleSheet::standard("Helvetica");
        let parser = MarkupParser::new(&sheet);
        let contents = parser
            .parse_str("<ol>\n<li>First</li>\n<li>Second <b>item</b></li>\n</ol><ul><li>Dot</li></ul>")
            .unwrap();
        let items: Vec<&ListNode> = contents
            .iter()
            .filter_map(|c| match c {
                Content::List(l) => Some(l),
                _ => None,
            })
            .collect();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].marker, ListMarker::Number(1));
        assert_eq!(items[1].marker.label(), "2.");
        assert_eq!(items[2].marker, ListMarker::Bullet);
        assert_eq!(items[1].runs().unwrap().len(), 2);
    }

    #[test]
    fn test_markup_table() {
        let sheet = StyleSheet::standard("Helvetica");
        let parser = MarkupParser::new(&sheet);
        let contents = parser
            .parse_str(
                "<table>\n<tr><th>Zone</th><th>kWh</th></tr>\n<tr><td>CZ01</td><td><p>10</p><p>12</p></td></tr>\n</table>",
            )
            .unwrap();
        let Content::Table(table) = &contents[0] else {
            panic!("expected a table");
        };
        assert_eq!(table.header.as_ref().unwrap().len(), 2);
        assert_eq!(table.body.len(), 1);
        let kinds: Vec<ElementKind> = table.body[0][1].iter().map(|r| r.kind).collect();
        assert_eq!(kinds, [ElementKind::Text, ElementKind::Break, ElementKind::Text]);
    }

    #[test]
    fn test_table_without_header_is_structure_error() {
        let sheet = StyleSheet::standard("Helvetica");
        let parser = MarkupParser::new(&sheet);
        let err = parser
            .parse_str("<table><tr><td>a</td></tr><tr><td>b</td></tr></table>")
            .unwrap_err();
        assert!(matches!(err, PressError::Structure(_)));
    }

    #[test]
    fn test_value_table_placeholder() {
        let sheet = StyleSheet::standard("Helvetica");
        let parser = MarkupParser::new(&sheet);
        let contents = parser
            .parse_str(r#"<div data-value-table="UES" data-columns="cz, kwh"></div>"#)
            .unwrap();
        match &contents[0] {
            Content::ValueTable(v) => {
                assert_eq!(v.name, "UES");
                assert_eq!(v.columns.as_deref(), Some(&["cz".to_string(), "kwh".to_string()][..]));
            }
            other => panic!("expected value table, got {:?}", other),
        }
    }

    #[test]
    fn test_blocks_follow_paragraph_boundaries() {
        let sheet = StyleSheet::standard("Helvetica");
        let parser = MarkupParser::new(&sheet);
        let blocks = parser
            .parse_blocks_str(
                "<p>One</p>\n<p class=\"Subheading\">Two</p>\n<div><p>Three</p><ul><li>Four</li></ul></div><table><thead><tr><th>H</th></tr></thead><tr><td>v</td></tr></table>tail",
            )
            .unwrap();
        assert_eq!(blocks.len(), 6);
        assert!(matches!(&blocks[0], Block::Paragraph { style: None, .. }));
        match &blocks[1] {
            Block::Paragraph { style, runs } => {
                assert_eq!(style.as_deref(), Some(names::SUBHEADING));
                assert_eq!(runs[0].text, "Two");
            }
            other => panic!("unexpected block {:?}", other),
        }
        assert!(matches!(&blocks[2], Block::Paragraph { .. }));
        assert!(matches!(&blocks[3], Block::ListItem(_)));
        assert!(matches!(&blocks[4], Block::Table(_)));
        assert!(matches!(&blocks[5], Block::Paragraph { .. }));
    }

    #[test]
    fn test_span_class_sets_owning_style() {
        let sheet = StyleSheet::standard("Helvetica");
        let parser = MarkupParser::new(&sheet);
        let runs = elements(
            &parser
                .parse_str(r#"<p>see <span class="Link">the guide</span></p>"#)
                .unwrap(),
        );
        assert_eq!(runs[0].style, None);
        assert_eq!(runs[1].style.as_deref(), Some(names::LINK));
    }
}
