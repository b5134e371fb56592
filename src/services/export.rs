//! PDF export of a published content row.
//!
//! Produces an A4 document in memory: title, a meta line and the body as
//! word-wrapped text over as many pages as needed. Text is set in an
//! embedded DejaVu Sans, so Arabic and other non-Latin scripts keep their
//! glyphs. Right-to-left paragraphs are put into visual order and
//! right-aligned; letters are not joined into contextual forms.

use std::io::Cursor;

use anyhow::{anyhow, Result};
use printpdf::{Mm, PdfDocument, Pt};
use ttf_parser::Face;
use unicode_bidi::{Level, ParagraphBidiInfo};

use crate::models::Content;
use crate::services::markdown::MarkdownRenderer;

static FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;
const LINE_SPACING: f32 = 1.4;

const TITLE_SIZE: f32 = 18.0;
const META_SIZE: f32 = 9.0;
const BODY_SIZE: f32 = 11.0;

const LAYER: &str = "Text";

#[derive(Debug, Clone, PartialEq)]
struct Line {
    /// Characters in drawing order, left to right
    text: String,
    size: f32,
    /// Left edge in points
    x: f32,
}

impl Line {
    fn blank(size: f32) -> Self {
        Self { text: String::new(), size, x: MARGIN }
    }
}

/// Greedy word wrap. `fits` decides whether a candidate line is short
/// enough; words that never fit are split between characters.
pub fn wrap_text(text: &str, fits: impl Fn(&str) -> bool) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };
        if fits(&candidate) {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if fits(word) {
            current = word.to_string();
            continue;
        }

        for c in word.chars() {
            current.push(c);
            if current.chars().count() > 1 && !fits(&current) {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(c);
            }
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Width of `text` in points when set at `size`
fn text_width(face: &Face, text: &str, size: f32) -> f32 {
    let units_per_em = f32::from(face.units_per_em().max(1));
    let units: u32 = text
        .chars()
        .map(|c| {
            face.glyph_index(c)
                .and_then(|g| face.glyph_hor_advance(g))
                .map_or(0, u32::from)
        })
        .sum();
    units as f32 * size / units_per_em
}

/// Reorder one wrapped line for drawing, keeping the paragraph's direction
fn visual_order(line: &str, level: Level) -> String {
    let info = ParagraphBidiInfo::new(line, Some(level));
    info.reorder_line(0..line.len()).into_owned()
}

fn push_paragraph(face: &Face, text: &str, size: f32, lines: &mut Vec<Line>) {
    let level = ParagraphBidiInfo::new(text, None).paragraph_level;
    let max_width = PAGE_WIDTH - 2.0 * MARGIN;

    for logical in wrap_text(text, |candidate| text_width(face, candidate, size) <= max_width) {
        let text = visual_order(&logical, level);
        let x = if level.is_rtl() {
            PAGE_WIDTH - MARGIN - text_width(face, &text, size)
        } else {
            MARGIN
        };
        lines.push(Line { text, size, x });
    }
}

fn layout(face: &Face, title: &str, meta: &str, body: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    push_paragraph(face, title, TITLE_SIZE, &mut lines);
    push_paragraph(face, meta, META_SIZE, &mut lines);
    lines.push(Line::blank(BODY_SIZE));

    for paragraph in body.lines() {
        if paragraph.trim().is_empty() {
            continue;
        }
        push_paragraph(face, paragraph, BODY_SIZE, &mut lines);
        // blank line between paragraphs
        lines.push(Line::blank(BODY_SIZE * 0.5));
    }
    lines
}

fn mm(points: f32) -> Mm {
    Mm::from(Pt(points))
}

/// Build a PDF from already plain text.
pub fn render_pdf(title: &str, meta: &str, body: &str) -> Result<Vec<u8>> {
    let face = Face::parse(FONT, 0).map_err(|e| anyhow!("Failed to parse embedded font: {}", e))?;
    let lines = layout(&face, title, meta, body);

    let (doc, page, layer) = PdfDocument::new(title, mm(PAGE_WIDTH), mm(PAGE_HEIGHT), LAYER);
    let font = doc
        .add_external_font(Cursor::new(FONT))
        .map_err(|e| anyhow!("Failed to embed font: {:?}", e))?;

    let mut current = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT - MARGIN;
    let mut page_has_text = false;

    for line in &lines {
        let advance = line.size * LINE_SPACING;
        if y - advance < MARGIN && page_has_text {
            let (page, layer) = doc.add_page(mm(PAGE_WIDTH), mm(PAGE_HEIGHT), LAYER);
            current = doc.get_page(page).get_layer(layer);
            y = PAGE_HEIGHT - MARGIN;
            page_has_text = false;
        }
        y -= advance;
        if !line.text.is_empty() {
            current.use_text(line.text.as_str(), line.size, mm(line.x), mm(y), &font);
            page_has_text = true;
        }
    }

    doc.save_to_bytes()
        .map_err(|e| anyhow!("Failed to write PDF: {:?}", e))
}

/// PDF of a content row: title, "Kind - Author - date" and the body as text.
pub fn content_pdf(content: &Content, markdown: &MarkdownRenderer) -> Result<Vec<u8>> {
    let mut meta = vec![content.kind.label().to_string()];
    if !content.author_name.is_empty() {
        meta.push(content.author_name.clone());
    }
    if let Some(published) = content.published_at {
        meta.push(published.format("%-d %B %Y").to_string());
    }

    let mut body = markdown.to_plain_text(&content.body);
    if body.is_empty() {
        body = content.summary.clone();
    }
    if let Some(url) = &content.media_url {
        body.push_str(&format!("\n\n{}", url));
    }

    render_pdf(&content.title, &meta.join(" - "), &body)
}

/// `attachment` file name for a content row
pub fn pdf_filename(content: &Content) -> String {
    let ascii: String = content
        .slug
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if ascii.is_empty() {
        format!("{}-{}.pdf", content.kind.route_slug(), content.id)
    } else {
        format!("{}.pdf", ascii)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Content as PageContent;
    use lopdf::{Document, Object};
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn face() -> Face<'static> {
        Face::parse(FONT, 0).unwrap()
    }

    /// Glyph id to character, read from every ToUnicode CMap in the file
    fn to_unicode(doc: &Document) -> HashMap<u16, char> {
        let mut map = HashMap::new();
        for object in doc.objects.values() {
            let Object::Stream(stream) = object else { continue };
            let data = stream.decompressed_content().unwrap_or_else(|_| stream.content.clone());
            let cmap = String::from_utf8_lossy(&data);
            if !cmap.contains("beginbf") {
                continue;
            }

            let mut section = "";
            for line in cmap.lines().map(str::trim) {
                if line.ends_with("beginbfchar") {
                    section = "char";
                    continue;
                }
                if line.ends_with("beginbfrange") {
                    section = "range";
                    continue;
                }
                if line.starts_with("end") {
                    section = "";
                    continue;
                }
                let hex: Vec<u32> = line
                    .split(['<', '>'])
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .filter_map(|s| u32::from_str_radix(s, 16).ok())
                    .collect();
                match (section, hex.as_slice()) {
                    ("char", [gid, code]) => {
                        if let Some(c) = char::from_u32(*code) {
                            map.insert(*gid as u16, c);
                        }
                    }
                    ("range", [lo, hi, code]) => {
                        for gid in *lo..=*hi {
                            if let Some(c) = char::from_u32(code + gid - lo) {
                                map.insert(gid as u16, c);
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        map
    }

    fn push_glyphs(operand: &Object, map: &HashMap<u16, char>, out: &mut String) {
        match operand {
            Object::String(bytes, _) => {
                for pair in bytes.chunks_exact(2) {
                    if let Some(c) = map.get(&u16::from_be_bytes([pair[0], pair[1]])) {
                        out.push(*c);
                    }
                }
            }
            Object::Array(items) => {
                for item in items {
                    push_glyphs(item, map, out);
                }
            }
            _ => {}
        }
    }

    /// Every drawn line of every page, decoded back to characters
    fn extract_lines(pdf: &[u8]) -> (usize, Vec<String>) {
        let doc = Document::load_mem(pdf).unwrap();
        let map = to_unicode(&doc);
        assert!(!map.is_empty());

        let pages = doc.get_pages();
        let mut lines = Vec::new();
        for page_id in pages.values() {
            let content = PageContent::decode(&doc.get_page_content(*page_id).unwrap()).unwrap();
            for op in content.operations {
                if op.operator == "Tj" || op.operator == "TJ" {
                    let mut line = String::new();
                    for operand in &op.operands {
                        push_glyphs(operand, &map, &mut line);
                    }
                    lines.push(line);
                }
            }
        }
        (pages.len(), lines)
    }

    #[test]
    fn test_single_page_document() {
        let pdf = render_pdf("Surah Al-Asr", "Lesson - Shaykh Ahmad", "By time.\nIndeed mankind is in loss.").unwrap();
        assert!(pdf.starts_with(b"%PDF-"));

        let (pages, lines) = extract_lines(&pdf);
        assert_eq!(pages, 1);
        assert_eq!(lines[0], "Surah Al-Asr");
        assert!(lines.iter().any(|l| l == "Indeed mankind is in loss."));
    }

    #[test]
    fn test_long_body_spans_pages() {
        let body = "A sentence about patience and gratitude.\n".repeat(200);
        let (pages, lines) = extract_lines(&render_pdf("Long", "", &body).unwrap());

        assert!(pages > 1);
        assert_eq!(lines.iter().filter(|l| l.starts_with("A sentence")).count(), 200);
    }

    #[test]
    fn test_arabic_text_keeps_its_letters() {
        let title = "سورة العصر";
        let body = "وَالْعَصْرِ إِنَّ الْإِنسَانَ لَفِي خُسْرٍ";
        let (_, lines) = extract_lines(&render_pdf(title, "درس", body).unwrap());

        // drawn right to left, so the stored line reads backwards
        let title_line: String = lines[0].chars().rev().collect();
        assert_eq!(title_line, title);
        assert!(lines.iter().all(|l| !l.contains('?')));
        assert!(lines.iter().any(|l| l.contains('ع')));
    }

    #[test]
    fn test_rtl_lines_are_right_aligned() {
        let face = face();
        let lines = layout(&face, "سورة العصر", "Lesson", "Mixed: العصر text");

        let title = &lines[0];
        assert_eq!(title.text, "رصعلا ةروس");
        let right_edge = title.x + text_width(&face, &title.text, TITLE_SIZE);
        assert!((right_edge - (PAGE_WIDTH - MARGIN)).abs() < 0.01);

        assert_eq!(lines[1].x, MARGIN);
        assert_eq!(lines[3].x, MARGIN);
        assert_eq!(lines[3].text, "Mixed: رصعلا text");
    }

    #[test]
    fn test_wrap_text() {
        let chars = |max: usize| move |s: &str| s.chars().count() <= max;
        assert_eq!(wrap_text("one two three", chars(7)), vec!["one two", "three"]);
        assert_eq!(wrap_text("abcdefghij", chars(4)), vec!["abcd", "efgh", "ij"]);
        assert!(wrap_text("   ", chars(10)).is_empty());
    }

    #[test]
    fn test_wrapped_lines_fit_the_page() {
        let face = face();
        let body = "Patience is light and gratitude is a treasure. ".repeat(40);
        for line in layout(&face, "T", "", &body).iter().skip(3) {
            assert!(text_width(&face, &line.text, line.size) <= PAGE_WIDTH - 2.0 * MARGIN);
        }
    }

    proptest! {
        #[test]
        fn wrapped_lines_fit(words in proptest::collection::vec("[a-z]{1,15}", 0..50), width in 5usize..40) {
            let text = words.join(" ");
            for line in wrap_text(&text, |s| s.chars().count() <= width) {
                prop_assert!(line.chars().count() <= width);
                prop_assert!(!line.is_empty());
            }
        }
    }
}
