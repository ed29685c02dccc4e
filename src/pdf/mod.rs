//! # PDF Serializer
//!
//! Takes finished pages from the layout engine and writes a PDF 1.7 file.
//!
//! The writer emits raw bytes itself: the subset of PDF needed here (text,
//! filled and stroked rectangles, lines, two kinds of fonts) is small.
//!
//! ```text
//! %PDF-1.7            <- header
//! 1 0 obj ... endobj  <- catalog, page tree, fonts, pages, content streams
//! ...
//! xref                <- byte offsets of each object
//! trailer             <- points to the catalog and info dictionary
//! %%EOF
//! ```
//!
//! Standard fonts are referenced as Type1 with WinAnsiEncoding. Custom
//! TrueType fonts are embedded whole as CIDFontType2 with Identity-H
//! encoding: FontFile2, FontDescriptor, CIDFont, ToUnicode CMap and the root
//! Type0 dictionary, five objects per font.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

use log::{debug, warn};
use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::error::PressError;
use crate::font::metrics::ascii_substitute;
use crate::font::{FontContext, FontData, FontKey};
use crate::layout::{DrawCommand, LayoutPage};
use crate::model::Metadata;
use crate::style::Color;

const PRODUCER: &str = concat!("measure-press ", env!("CARGO_PKG_VERSION"));

#[derive(Default)]
pub struct PdfWriter;

/// Glyph mapping for an embedded TrueType font.
struct EmbeddedFont {
    char_to_gid: HashMap<char, u16>,
}

/// Objects allocated while writing. Index 0 is the unused free entry.
struct PdfBuilder {
    objects: Vec<Vec<u8>>,
    /// Resource order: `/F{i}` refers to `font_objects[i]`.
    font_objects: Vec<(FontKey, usize)>,
    embedded: HashMap<FontKey, EmbeddedFont>,
}

impl PdfBuilder {
    fn push(&mut self, data: Vec<u8>) -> usize {
        self.objects.push(data);
        self.objects.len() - 1
    }
}

impl PdfWriter {
    pub fn new() -> Self {
        Self
    }

    /// Serialize `pages` into PDF bytes.
    pub fn write(
        &self,
        pages: &[LayoutPage],
        metadata: &Metadata,
        fonts: &FontContext,
    ) -> Result<Vec<u8>, PressError> {
        let mut builder = PdfBuilder {
            // 0 = free entry, 1 = catalog, 2 = page tree
            objects: vec![Vec::new(), Vec::new(), Vec::new()],
            font_objects: Vec::new(),
            embedded: HashMap::new(),
        };

        self.register_fonts(&mut builder, pages, fonts)?;
        let font_resources = self.build_font_resource_dict(&builder.font_objects);

        // Reserved first; a link may point at a later page.
        let page_ids: Vec<usize> = pages.iter().map(|_| builder.push(Vec::new())).collect();
        let anchors = Self::collect_anchors(pages);

        for (index, page) in pages.iter().enumerate() {
            let content = self.build_content_stream(page, &builder);
            let compressed = compress_to_vec_zlib(content.as_bytes(), 6);
            let mut stream: Vec<u8> = Vec::new();
            let _ = write!(
                stream,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            stream.extend_from_slice(&compressed);
            stream.extend_from_slice(b"\nendstream");
            let content_id = builder.push(stream);

            let annots = self.write_link_annotations(&mut builder, page, &anchors, &page_ids, pages);
            let annots = if annots.is_empty() {
                String::new()
            } else {
                let refs: Vec<String> = annots.iter().map(|id| format!("{} 0 R", id)).collect();
                format!(" /Annots [{}]", refs.join(" "))
            };
            let page_dict = format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Contents {} 0 R /Resources << /Font << {} >> >>{} >>",
                page.width, page.height, content_id, font_resources, annots
            );
            builder.objects[page_ids[index]] = page_dict.into_bytes();
        }

        builder.objects[1] = b"<< /Type /Catalog /Pages 2 0 R >>".to_vec();
        let kids = page_ids
            .iter()
            .map(|id| format!("{} 0 R", id))
            .collect::<Vec<_>>()
            .join(" ");
        builder.objects[2] = format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            page_ids.len()
        )
        .into_bytes();

        let mut info = String::from("<< ");
        if let Some(title) = &metadata.title {
            let _ = write!(info, "/Title ({}) ", Self::escape_pdf_string(title));
        }
        if let Some(author) = &metadata.author {
            let _ = write!(info, "/Author ({}) ", Self::escape_pdf_string(author));
        }
        if let Some(subject) = &metadata.subject {
            let _ = write!(info, "/Subject ({}) ", Self::escape_pdf_string(subject));
        }
        let _ = write!(info, "/Producer ({}) /Creator (measure-press) >>", PRODUCER);
        let info_id = builder.push(info.into_bytes());

        let bytes = self.serialize(&builder, info_id);
        debug!(
            "wrote PDF: {} page(s), {} font(s), {} bytes",
            pages.len(),
            builder.font_objects.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Where each named destination landed: page index and top-down y.
    /// The first anchor with a name wins.
    fn collect_anchors(pages: &[LayoutPage]) -> HashMap<&str, (usize, f64)> {
        let mut anchors = HashMap::new();
        for (index, page) in pages.iter().enumerate() {
            for command in &page.commands {
                if let DrawCommand::Anchor { name, y } = command {
                    anchors.entry(name.as_str()).or_insert((index, *y));
                }
            }
        }
        anchors
    }

    /// One `/Link` annotation per resolvable link on the page. Links to
    /// anchors that were never drawn are dropped.
    fn write_link_annotations(
        &self,
        builder: &mut PdfBuilder,
        page: &LayoutPage,
        anchors: &HashMap<&str, (usize, f64)>,
        page_ids: &[usize],
        pages: &[LayoutPage],
    ) -> Vec<usize> {
        let mut ids = Vec::new();
        for command in &page.commands {
            let DrawCommand::Link {
                x,
                y,
                width,
                height,
                target,
            } = command
            else {
                continue;
            };
            let Some(&(dest_page, dest_y)) = anchors.get(target.as_str()) else {
                debug!("link target '{}' not found; no annotation", target);
                continue;
            };
            let dest_top = pages[dest_page].height - dest_y;
            let annot = format!(
                "<< /Type /Annot /Subtype /Link /Rect [{:.2} {:.2} {:.2} {:.2}] \
                 /Border [0 0 0] /Dest [{} 0 R /XYZ 0 {:.2} null] >>",
                x,
                page.height - y - height,
                x + width,
                page.height - y,
                page_ids[dest_page],
                dest_top
            );
            ids.push(builder.push(annot.into_bytes()));
        }
        ids
    }

    fn build_content_stream(&self, page: &LayoutPage, builder: &PdfBuilder) -> String {
        let mut stream = String::new();
        for command in &page.commands {
            self.write_command(&mut stream, command, page.height, builder);
        }
        stream
    }

    fn write_command(
        &self,
        stream: &mut String,
        command: &DrawCommand,
        page_height: f64,
        builder: &PdfBuilder,
    ) {
        match command {
            DrawCommand::Text {
                x,
                y,
                text,
                font,
                size,
                color,
            } => {
                let encoded = match builder.embedded.get(font) {
                    Some(embedded) => {
                        let hex: String = text
                            .chars()
                            .map(|ch| format!("{:04X}", embedded.char_to_gid.get(&ch).copied().unwrap_or(0)))
                            .collect();
                        format!("<{}>", hex)
                    }
                    None => format!("({})", Self::encode_winansi(text)),
                };
                let _ = write!(
                    stream,
                    "BT\n/F{} {:.1} Tf\n{}{:.2} {:.2} Td\n{} Tj\nET\n",
                    self.font_index(font, &builder.font_objects),
                    size,
                    fill_color(color),
                    x,
                    page_height - y,
                    encoded
                );
            }
            DrawCommand::Rect {
                x,
                y,
                width,
                height,
                fill,
                stroke,
            } => {
                let pdf_y = page_height - y - height;
                if let Some(fill) = fill {
                    let _ = write!(
                        stream,
                        "q\n{}{:.2} {:.2} {:.2} {:.2} re\nf\nQ\n",
                        fill_color(fill),
                        x,
                        pdf_y,
                        width,
                        height
                    );
                }
                if let Some(stroke) = stroke {
                    let _ = write!(
                        stream,
                        "q\n{}{:.2} w\n{:.2} {:.2} {:.2} {:.2} re\nS\nQ\n",
                        stroke_color(&stroke.color),
                        stroke.width,
                        x,
                        pdf_y,
                        width,
                        height
                    );
                }
            }
            DrawCommand::Anchor { .. } | DrawCommand::Link { .. } => {}
            DrawCommand::Line {
                x1,
                y1,
                x2,
                y2,
                width,
                color,
            } => {
                let _ = write!(
                    stream,
                    "q\n{}{:.2} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ\n",
                    stroke_color(color),
                    width,
                    x1,
                    page_height - y1,
                    x2,
                    page_height - y2
                );
            }
        }
    }

    fn register_fonts(
        &self,
        builder: &mut PdfBuilder,
        pages: &[LayoutPage],
        fonts: &FontContext,
    ) -> Result<(), PressError> {
        let mut font_chars = Self::collect_font_chars(pages);
        if font_chars.is_empty() {
            font_chars.insert(FontKey::new("Helvetica", false, false), BTreeSet::new());
        }

        for (key, chars) in &font_chars {
            match fonts.resolve(&key.family, key.weight, key.italic)? {
                FontData::Standard(std_font) => {
                    let dict = format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} \
                         /Encoding /WinAnsiEncoding >>",
                        std_font.pdf_name()
                    );
                    let id = builder.push(dict.into_bytes());
                    builder.font_objects.push((key.clone(), id));
                }
                FontData::Custom { data, .. } => {
                    let id = Self::write_custom_font_objects(builder, key, data, chars)?;
                    builder.font_objects.push((key.clone(), id));
                }
            }
        }
        Ok(())
    }

    /// Fonts used across all pages with the characters drawn in each, in
    /// key order so output is deterministic.
    fn collect_font_chars(pages: &[LayoutPage]) -> BTreeMap<FontKey, BTreeSet<char>> {
        let mut font_chars: BTreeMap<FontKey, BTreeSet<char>> = BTreeMap::new();
        for page in pages {
            for command in &page.commands {
                if let DrawCommand::Text { text, font, .. } = command {
                    font_chars.entry(font.clone()).or_default().extend(text.chars());
                }
            }
        }
        font_chars
    }

    fn write_custom_font_objects(
        builder: &mut PdfBuilder,
        key: &FontKey,
        ttf_data: &[u8],
        used_chars: &BTreeSet<char>,
    ) -> Result<usize, PressError> {
        let face = ttf_parser::Face::parse(ttf_data, 0).map_err(|e| {
            PressError::Font(format!("failed to parse font '{}': {}", key.family, e))
        })?;

        let units_per_em = face.units_per_em();
        let ascender = face.ascender();
        let descender = face.descender();
        let char_to_gid: HashMap<char, u16> = used_chars
            .iter()
            .filter_map(|&ch| face.glyph_index(ch).map(|gid| (ch, gid.0)))
            .collect();
        let pdf_font_name = Self::sanitize_font_name(&key.family, key.weight, key.italic);

        // FontFile2: the whole font program, compressed.
        let compressed = compress_to_vec_zlib(ttf_data, 6);
        let mut fontfile: Vec<u8> = Vec::new();
        let _ = write!(
            fontfile,
            "<< /Length {} /Length1 {} /Filter /FlateDecode >>\nstream\n",
            compressed.len(),
            ttf_data.len()
        );
        fontfile.extend_from_slice(&compressed);
        fontfile.extend_from_slice(b"\nendstream");
        let fontfile_id = builder.push(fontfile);

        let scale = 1000.0 / units_per_em as f64;
        let bbox = face.global_bounding_box();
        let cap_height = face.capital_height().unwrap_or(ascender) as f64 * scale;
        let descriptor = format!(
            "<< /Type /FontDescriptor /FontName /{} /Flags 4 \
             /FontBBox [{} {} {} {}] /ItalicAngle {} \
             /Ascent {} /Descent {} /CapHeight {} /StemV {} \
             /FontFile2 {} 0 R >>",
            pdf_font_name,
            (bbox.x_min as f64 * scale) as i32,
            (bbox.y_min as f64 * scale) as i32,
            (bbox.x_max as f64 * scale) as i32,
            (bbox.y_max as f64 * scale) as i32,
            if key.italic { -12 } else { 0 },
            (ascender as f64 * scale) as i32,
            (descender as f64 * scale) as i32,
            cap_height as i32,
            if key.is_bold() { 120 } else { 80 },
            fontfile_id,
        );
        let descriptor_id = builder.push(descriptor.into_bytes());

        let default_width = face
            .glyph_hor_advance(ttf_parser::GlyphId(0))
            .map(|adv| (adv as f64 * scale) as u32)
            .unwrap_or(1000);
        let cidfont = format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /FontDescriptor {} 0 R /DW {} /W {} /CIDToGIDMap /Identity >>",
            pdf_font_name,
            descriptor_id,
            default_width,
            Self::build_w_array(&char_to_gid, &face, units_per_em),
        );
        let cidfont_id = builder.push(cidfont.into_bytes());

        let cmap = Self::build_tounicode_cmap(&char_to_gid, &pdf_font_name);
        let compressed_cmap = compress_to_vec_zlib(cmap.as_bytes(), 6);
        let mut tounicode: Vec<u8> = Vec::new();
        let _ = write!(
            tounicode,
            "<< /Length {} /Filter /FlateDecode >>\nstream\n",
            compressed_cmap.len()
        );
        tounicode.extend_from_slice(&compressed_cmap);
        tounicode.extend_from_slice(b"\nendstream");
        let tounicode_id = builder.push(tounicode);

        let type0 = format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H \
             /DescendantFonts [{} 0 R] /ToUnicode {} 0 R >>",
            pdf_font_name, cidfont_id, tounicode_id,
        );
        let type0_id = builder.push(type0.into_bytes());

        builder
            .embedded
            .insert(key.clone(), EmbeddedFont { char_to_gid });
        Ok(type0_id)
    }

    /// Per-glyph widths for the CIDFont: `[gid [width] gid [width] ...]`.
    fn build_w_array(
        char_to_gid: &HashMap<char, u16>,
        face: &ttf_parser::Face,
        units_per_em: u16,
    ) -> String {
        let scale = 1000.0 / units_per_em as f64;
        let mut seen = HashSet::new();
        let mut entries: Vec<(u16, u32)> = char_to_gid
            .values()
            .filter(|gid| seen.insert(**gid))
            .map(|&gid| {
                let advance = face.glyph_hor_advance(ttf_parser::GlyphId(gid)).unwrap_or(0);
                (gid, (advance as f64 * scale) as u32)
            })
            .collect();
        entries.sort_by_key(|(gid, _)| *gid);

        let mut result = String::from("[");
        for (gid, width) in &entries {
            let _ = write!(result, " {} [{}]", gid, width);
        }
        result.push_str(" ]");
        result
    }

    /// ToUnicode CMap so text in embedded fonts can be extracted and copied.
    fn build_tounicode_cmap(char_to_gid: &HashMap<char, u16>, font_name: &str) -> String {
        let mut gid_to_unicode: Vec<(u16, u32)> = char_to_gid
            .iter()
            .map(|(&ch, &gid)| (gid, ch as u32))
            .collect();
        gid_to_unicode.sort_by_key(|(gid, _)| *gid);

        let mut cmap = String::new();
        cmap.push_str("/CIDInit /ProcSet findresource begin\n12 dict begin\nbegincmap\n");
        cmap.push_str("/CIDSystemInfo\n<< /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n");
        let _ = writeln!(cmap, "/CMapName /{}-UTF16 def", font_name);
        cmap.push_str("/CMapType 2 def\n1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

        // At most 100 entries per bfchar block.
        for chunk in gid_to_unicode.chunks(100) {
            let _ = writeln!(cmap, "{} beginbfchar", chunk.len());
            for &(gid, unicode) in chunk {
                let _ = writeln!(cmap, "<{:04X}> <{:04X}>", gid, unicode);
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
        cmap
    }

    /// A PDF name for an embedded font: family without punctuation plus
    /// weight and style suffixes.
    fn sanitize_font_name(family: &str, weight: u32, italic: bool) -> String {
        let mut name: String = family
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        if name.is_empty() {
            name = "CustomFont".to_string();
        }
        if weight >= 600 {
            name.push_str("-Bold");
        }
        if italic {
            name.push_str("-Italic");
        }
        name
    }

    fn build_font_resource_dict(&self, font_objects: &[(FontKey, usize)]) -> String {
        font_objects
            .iter()
            .enumerate()
            .map(|(i, (_, id))| format!("/F{} {} 0 R", i, id))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn font_index(&self, key: &FontKey, font_objects: &[(FontKey, usize)]) -> usize {
        font_objects
            .iter()
            .position(|(k, _)| k == key)
            .unwrap_or(0)
    }

    /// Escape the delimiters of a PDF literal string.
    fn escape_pdf_string(s: &str) -> String {
        s.replace('\\', "\\\\")
            .replace('(', "\\(")
            .replace(')', "\\)")
    }

    /// Encode text for a standard font: WinAnsi bytes inside a literal
    /// string, with bytes above ASCII written as octal escapes. Symbols with
    /// an ASCII spelling are written out; anything else becomes `?`.
    fn encode_winansi(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for ch in text.chars() {
            if let Some(sub) = ascii_substitute(ch) {
                out.push_str(sub);
                continue;
            }
            let byte = Self::unicode_to_winansi(ch).unwrap_or_else(|| {
                warn!("U+{:04X} has no WinAnsi encoding; drawn as '?'", ch as u32);
                b'?'
            });
            match byte {
                b'(' => out.push_str("\\("),
                b')' => out.push_str("\\)"),
                b'\\' => out.push_str("\\\\"),
                b @ 0x20..=0x7e => out.push(b as char),
                b => {
                    let _ = write!(out, "\\{:03o}", b);
                }
            }
        }
        out
    }

    /// Map a character onto WinAnsiEncoding (Windows-1252).
    fn unicode_to_winansi(ch: char) -> Option<u8> {
        let cp = ch as u32;
        if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
            return Some(cp as u8);
        }
        match cp {
            0x20AC => Some(0x80), // euro
            0x201A => Some(0x82),
            0x0192 => Some(0x83),
            0x201E => Some(0x84),
            0x2026 => Some(0x85), // ellipsis
            0x2020 => Some(0x86),
            0x2021 => Some(0x87),
            0x02C6 => Some(0x88),
            0x2030 => Some(0x89), // per mille
            0x0160 => Some(0x8A),
            0x2039 => Some(0x8B),
            0x0152 => Some(0x8C),
            0x017D => Some(0x8E),
            0x2018 => Some(0x91), // curly quotes
            0x2019 => Some(0x92),
            0x201C => Some(0x93),
            0x201D => Some(0x94),
            0x2022 => Some(0x95), // bullet
            0x2013 => Some(0x96), // en dash
            0x2014 => Some(0x97), // em dash
            0x02DC => Some(0x98),
            0x2122 => Some(0x99), // trade mark
            0x0161 => Some(0x9A),
            0x203A => Some(0x9B),
            0x0153 => Some(0x9C),
            0x017E => Some(0x9E),
            0x0178 => Some(0x9F),
            _ => None,
        }
    }

    fn serialize(&self, builder: &PdfBuilder, info_id: usize) -> Vec<u8> {
        let count = builder.objects.len();
        let mut output: Vec<u8> = Vec::new();
        let mut offsets = vec![0usize; count];

        output.extend_from_slice(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n");
        for (i, data) in builder.objects.iter().enumerate().skip(1) {
            offsets[i] = output.len();
            let _ = write!(output, "{} 0 obj\n", i);
            output.extend_from_slice(data);
            output.extend_from_slice(b"\nendobj\n\n");
        }

        let xref_offset = output.len();
        let _ = write!(output, "xref\n0 {}\n0000000000 65535 f \n", count);
        for offset in offsets.iter().skip(1) {
            let _ = write!(output, "{:010} 00000 n \n", offset);
        }
        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root 1 0 R /Info {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            count, info_id, xref_offset
        );
        output
    }
}

fn fill_color(c: &Color) -> String {
    format!("{:.3} {:.3} {:.3} rg\n", c.r, c.g, c.b)
}

fn stroke_color(c: &Color) -> String {
    format!("{:.3} {:.3} {:.3} RG\n", c.r, c.g, c.b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Stroke;

    fn page(commands: Vec<DrawCommand>) -> LayoutPage {
        LayoutPage {
            width: 612.0,
            height: 792.0,
            commands,
        }
    }

    fn text(s: &str, bold: bool, y: f64) -> DrawCommand {
        DrawCommand::Text {
            x: 54.0,
            y,
            text: s.to_string(),
            font: FontKey::new("Helvetica", bold, false),
            size: 10.0,
            color: Color::BLACK,
        }
    }

    fn content_of(bytes: &[u8]) -> String {
        // First content stream follows the first "stream\n" marker.
        let start = bytes
            .windows(7)
            .position(|w| w == b"stream\n")
            .map(|p| p + 7)
            .unwrap();
        let end = start
            + bytes[start..]
                .windows(10)
                .position(|w| w == b"\nendstream")
                .unwrap();
        let inflated = miniz_oxide::inflate::decompress_to_vec_zlib(&bytes[start..end]).unwrap();
        String::from_utf8(inflated).unwrap()
    }

    #[test]
    fn test_escape_pdf_string() {
        assert_eq!(PdfWriter::escape_pdf_string("Hello (World)"), "Hello \\(World\\)");
        assert_eq!(PdfWriter::escape_pdf_string("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_winansi_encoding() {
        assert_eq!(PdfWriter::encode_winansi("a(b)"), "a\\(b\\)");
        assert_eq!(PdfWriter::encode_winansi("\u{2022}"), "\\225");
        assert_eq!(PdfWriter::encode_winansi("3\u{b0}"), "3\\260");
        assert_eq!(PdfWriter::encode_winansi("\u{2264} 30 kW"), "<= 30 kW");
        assert_eq!(PdfWriter::encode_winansi("\u{2265}4"), ">=4");
        assert_eq!(PdfWriter::encode_winansi("\u{4e2d}"), "?");
    }

    #[test]
    fn test_empty_document_produces_valid_pdf() {
        let bytes = PdfWriter::new()
            .write(&[page(vec![])], &Metadata::default(), &FontContext::new())
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(bytes.windows(5).any(|w| w == b"%%EOF"));
        assert!(bytes.windows(4).any(|w| w == b"xref"));
        assert!(bytes.windows(7).any(|w| w == b"trailer"));
    }

    #[test]
    fn test_metadata_in_info_dictionary() {
        let metadata = Metadata {
            title: Some("Measure Report".to_string()),
            author: Some("Program Team".to_string()),
            subject: None,
        };
        let bytes = PdfWriter::new()
            .write(&[page(vec![])], &metadata, &FontContext::new())
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Title (Measure Report)"));
        assert!(text.contains("/Author (Program Team)"));
        assert!(text.contains("/Producer (measure-press"));
    }

    #[test]
    fn test_bold_font_registered_separately() {
        let pages = [page(vec![text("A", false, 64.0), text("A", true, 80.0)])];
        let bytes = PdfWriter::new()
            .write(&pages, &Metadata::default(), &FontContext::new())
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/BaseFont /Helvetica "));
        assert!(text.contains("/BaseFont /Helvetica-Bold "));
        assert!(!text.contains("CIDFontType2"));
    }

    #[test]
    fn test_coordinates_flip_to_pdf_space() {
        let pages = [page(vec![
            text("Hi", false, 64.0),
            DrawCommand::Rect {
                x: 54.0,
                y: 100.0,
                width: 20.0,
                height: 10.0,
                fill: Some(Color::WHITE),
                stroke: Some(Stroke {
                    width: 0.5,
                    color: Color::BLACK,
                }),
            },
            DrawCommand::Line {
                x1: 0.0,
                y1: 0.0,
                x2: 612.0,
                y2: 0.0,
                width: 1.0,
                color: Color::BLACK,
            },
        ])];
        let bytes = PdfWriter::new()
            .write(&pages, &Metadata::default(), &FontContext::new())
            .unwrap();
        let content = content_of(&bytes);
        assert!(content.contains("54.00 728.00 Td\n(Hi) Tj"));
        assert!(content.contains("54.00 682.00 20.00 10.00 re\nf"));
        assert!(content.contains("54.00 682.00 20.00 10.00 re\nS"));
        assert!(content.contains("0.00 792.00 m\n612.00 792.00 l"));
    }

    #[test]
    fn test_link_annotation_points_at_anchor_page() {
        let first = page(vec![DrawCommand::Link {
            x: 54.0,
            y: 100.0,
            width: 80.0,
            height: 11.0,
            target: "M1/shared_parameters".to_string(),
        }]);
        let second = page(vec![DrawCommand::Anchor {
            name: "M1/shared_parameters".to_string(),
            y: 54.0,
        }]);
        let fonts = FontContext::new();
        let bytes = PdfWriter::new()
            .write(&[first, second], &Metadata::default(), &fonts)
            .unwrap();
        let text = String::from_utf8_lossy(&bytes);

        assert_eq!(text.matches("/Subtype /Link").count(), 1);
        assert!(text.contains("/Rect [54.00 681.00 134.00 692.00]"));
        // 3 is the fallback font, 4 and 5 the pages.
        assert!(text.contains("/Dest [5 0 R /XYZ 0 738.00 null]"));
        assert!(text.contains("/Annots ["));
    }

    #[test]
    fn test_link_without_anchor_is_dropped() {
        let pages = [page(vec![DrawCommand::Link {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            target: "nowhere".to_string(),
        }])];
        let fonts = FontContext::new();
        let bytes = PdfWriter::new().write(&pages, &Metadata::default(), &fonts).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(!text.contains("/Annots"));
        assert!(!text.contains("/Subtype /Link"));
    }

    #[test]
    fn test_unregistered_font_fails() {
        let pages = [page(vec![DrawCommand::Text {
            x: 0.0,
            y: 0.0,
            text: "x".to_string(),
            font: FontKey::new("Nope", false, false),
            size: 10.0,
            color: Color::BLACK,
        }])];
        assert!(PdfWriter::new()
            .write(&pages, &Metadata::default(), &FontContext::new())
            .is_err());
    }

    #[test]
    fn test_tounicode_cmap_format() {
        let mut char_to_gid = HashMap::new();
        char_to_gid.insert('A', 36u16);
        char_to_gid.insert('B', 37u16);
        let cmap = PdfWriter::build_tounicode_cmap(&char_to_gid, "TestFont");
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0024> <0041>"));
        assert!(cmap.contains("<0025> <0042>"));
        assert!(cmap.contains("/CMapName /TestFont-UTF16 def"));
    }

    #[test]
    fn test_sanitize_font_name() {
        assert_eq!(PdfWriter::sanitize_font_name("Inter", 400, false), "Inter");
        assert_eq!(PdfWriter::sanitize_font_name("Inter", 700, true), "Inter-Bold-Italic");
        assert_eq!(PdfWriter::sanitize_font_name("Noto Sans", 400, false), "NotoSans");
        assert_eq!(PdfWriter::sanitize_font_name("()", 700, false), "CustomFont-Bold");
    }
}
