//! Pagination hints and page furniture applied after content has been merged.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::docx::format::{Alignment, Font};
use crate::docx::{Document, DocumentBuilder, FieldKind, HeaderFooterKind, NodeData, NodeId};
use crate::error::DocumentError;

pub const DEFAULT_HEADER_TEXT: &str = "Enterprise AI Status Report";

const MIN_HEADING_SPACE_AFTER: f64 = 6.0;
const MIN_HEADING_SPACE_BEFORE: f64 = 12.0;
const MAX_HEADING_LEVEL: u8 = 6;
const HEADING_MIN_SIZE: f64 = 14.0;
const HEADING_TEXT_LIMIT: std::ops::RangeInclusive<usize> = 2..=200;

const HEADING_WORDS: [&str; 8] = [
    "week",
    "accomplishment",
    "planned",
    "risk",
    "status",
    "initiative",
    "goal",
    "next step",
];

const MAJOR_SECTION_WORDS: [&str; 7] = [
    "accomplishment",
    "planned",
    "risk",
    "top 25",
    "initiative",
    "next week",
    "current week",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Start known major sections on a new page. Off unless configured.
    pub major_section_page_breaks: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutStats {
    pub headings: usize,
    pub page_breaks: usize,
}

/// Whether directly formatted text reads like a heading.
pub fn looks_like_heading(text: &str, bold: bool, size: Option<f64>) -> bool {
    let text = text.trim();
    if !HEADING_TEXT_LIMIT.contains(&text.chars().count()) {
        return false;
    }
    if !bold && !size.is_some_and(|size| size >= HEADING_MIN_SIZE) {
        return false;
    }
    let lowered = text.to_lowercase();
    !text.contains('.') || text.ends_with(':') || HEADING_WORDS.iter().any(|w| lowered.contains(w))
}

pub fn is_major_section(text: &str) -> bool {
    let lowered = text.to_lowercase();
    MAJOR_SECTION_WORDS.iter().any(|w| lowered.contains(w))
}

fn is_heading_paragraph(doc: &Document, paragraph: NodeId) -> bool {
    let styled = doc
        .paragraph_format(paragraph)
        .and_then(|format| format.style.heading_level())
        .is_some_and(|level| (1..=MAX_HEADING_LEVEL).contains(&level));
    styled || (doc.parent(paragraph) == Some(doc.body()) && doc.node(paragraph).looks_like_heading())
}

fn is_major_heading(doc: &Document, paragraph: NodeId, text: &str) -> bool {
    let level = doc
        .paragraph_format(paragraph)
        .and_then(|format| format.style.heading_level());
    matches!(level, Some(1 | 2)) || is_major_section(text)
}

fn should_break_before(doc: &Document, paragraph: NodeId, text: &str) -> bool {
    if doc.paragraph_format(paragraph).is_some_and(|f| f.page_break_before) {
        return false;
    }
    let Some(previous) = doc.previous_sibling(paragraph) else {
        return false;
    };
    if !is_major_section(text) {
        return false;
    }
    // A blank paragraph before usually means the heading already starts a page.
    !(matches!(doc.data(previous), NodeData::Paragraph(_)) && doc.is_blank(previous))
}

/// Keeps headings with the content that follows them and gives them breathing room.
pub fn fix_heading_layout(doc: &mut Document, options: &LayoutOptions) -> LayoutStats {
    info!("Checking headings for orphan prevention");
    let mut stats = LayoutStats::default();
    for paragraph in doc.paragraphs() {
        if !is_heading_paragraph(doc, paragraph) {
            continue;
        }
        let text = doc.text(paragraph);
        let page_break = options.major_section_page_breaks
            && is_major_heading(doc, paragraph, &text)
            && should_break_before(doc, paragraph, &text);

        let Some(format) = doc.paragraph_format_mut(paragraph) else {
            continue;
        };
        format.keep_with_next = true;
        if format.space_after.is_none_or(|space| space < MIN_HEADING_SPACE_AFTER) {
            format.space_after = Some(MIN_HEADING_SPACE_AFTER);
        }
        if format.space_before.is_none_or(|space| space < MIN_HEADING_SPACE_BEFORE) {
            format.space_before = Some(MIN_HEADING_SPACE_BEFORE);
        }
        if page_break {
            format.page_break_before = true;
            stats.page_breaks += 1;
            debug!("Page break before heading: {}", text.trim());
        }
        stats.headings += 1;
    }
    info!(
        "Adjusted {} heading(s), {} page break(s)",
        stats.headings, stats.page_breaks
    );
    stats
}

/// Marks the first row of every table as a repeating header row. Returns the table count.
pub fn ensure_table_header_repetition(doc: &mut Document) -> usize {
    let tables = doc.tables();
    for table in &tables {
        let Some(row) = doc.first_row(*table) else {
            continue;
        };
        if let Some(format) = doc.row_format_mut(row) {
            format.heading_format = true;
        }
    }
    info!("Configured table header repetition for {} tables", tables.len());
    tables.len()
}

/// Template content already in a header or footer stays above what is written here.
fn move_to_fresh_paragraph(builder: &mut DocumentBuilder, kind: HeaderFooterKind) -> Result<(), DocumentError> {
    builder.move_to_header_footer(kind);
    if !builder.document().is_blank(builder.current_paragraph()) {
        builder.insert_paragraph()?;
    }
    Ok(())
}

/// Writes the primary header text and a "Page X of Y" footer.
pub fn configure_headers_and_footers(doc: &mut Document, header_text: &str) -> Result<(), DocumentError> {
    let mut builder = DocumentBuilder::new(doc);

    move_to_fresh_paragraph(&mut builder, HeaderFooterKind::HeaderPrimary)?;
    builder.paragraph_format().alignment = Some(Alignment::Left);
    *builder.font() = Font {
        name: Some("Arial".to_string()),
        size: Some(11.0),
        ..Font::default()
    };
    builder.writeln(header_text)?;

    move_to_fresh_paragraph(&mut builder, HeaderFooterKind::FooterPrimary)?;
    builder.paragraph_format().alignment = Some(Alignment::Center);
    builder.font().size = Some(10.0);
    builder.write("Page ");
    builder.insert_field(FieldKind::Page);
    builder.write(" of ");
    builder.insert_field(FieldKind::NumPages);

    info!("Configured document headers and footers");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::format::{CellFormat, ParagraphFormat, RowFormat, StyleId, TableFormat};

    fn paragraph(doc: &mut Document, style: StyleId, text: &str, font: Font) -> NodeId {
        let p = doc.append_child(doc.body(), NodeData::Paragraph(ParagraphFormat::with_style(style)));
        if !text.is_empty() {
            doc.append_child(
                p,
                NodeData::Run {
                    text: text.to_string(),
                    font,
                },
            );
        }
        p
    }

    fn table(doc: &mut Document, rows: usize) -> NodeId {
        let table = doc.append_child(doc.body(), NodeData::Table(TableFormat::default()));
        for _ in 0..rows {
            let row = doc.append_child(table, NodeData::Row(RowFormat::default()));
            let cell = doc.append_child(row, NodeData::Cell(CellFormat::default()));
            doc.append_child(cell, NodeData::Paragraph(ParagraphFormat::default()));
        }
        table
    }

    #[test]
    fn test_heading_heuristic() {
        assert!(looks_like_heading("Next Week Goals", true, None));
        assert!(looks_like_heading("Summary", false, Some(16.0)));
        assert!(looks_like_heading("Status as of 3.1:", true, None));
        assert!(looks_like_heading("Risk review v2.0", true, None));
        assert!(!looks_like_heading("Summary", false, Some(11.0)));
        assert!(!looks_like_heading("We shipped it.", true, None));
        assert!(!looks_like_heading("A", true, None));
        assert!(!looks_like_heading(&"x".repeat(201), true, None));
    }

    #[test]
    fn test_headings_keep_with_next_and_spacing() {
        let mut doc = Document::new();
        let styled = paragraph(&mut doc, StyleId::Heading(5), "Details", Font::default());
        let bold = paragraph(&mut doc, StyleId::Normal, "Key Risks", Font::bold());
        let plain = paragraph(&mut doc, StyleId::Normal, "Body text.", Font::default());
        doc.paragraph_format_mut(styled).unwrap().space_before = Some(24.0);

        let stats = fix_heading_layout(&mut doc, &LayoutOptions::default());
        assert_eq!(stats, LayoutStats { headings: 2, page_breaks: 0 });

        let styled = doc.paragraph_format(styled).unwrap();
        assert!(styled.keep_with_next);
        assert_eq!(styled.space_before, Some(24.0));
        assert_eq!(styled.space_after, Some(6.0));
        let bold = doc.paragraph_format(bold).unwrap();
        assert!(bold.keep_with_next);
        assert_eq!(bold.space_before, Some(12.0));
        assert!(!bold.page_break_before);
        assert!(!doc.paragraph_format(plain).unwrap().keep_with_next);
    }

    #[test]
    fn test_major_section_page_breaks_when_enabled() {
        let mut doc = Document::new();
        let first = paragraph(&mut doc, StyleId::Heading(1), "Current Week Accomplishments", Font::default());
        paragraph(&mut doc, StyleId::Normal, "Did things.", Font::default());
        let risks = paragraph(&mut doc, StyleId::Heading(2), "Risks", Font::default());
        paragraph(&mut doc, StyleId::Normal, "", Font::default());
        let after_blank = paragraph(&mut doc, StyleId::Heading(2), "Next Week", Font::default());
        paragraph(&mut doc, StyleId::Normal, "More.", Font::default());
        let minor = paragraph(&mut doc, StyleId::Heading(2), "Appendix", Font::default());

        let options = LayoutOptions {
            major_section_page_breaks: true,
        };
        let stats = fix_heading_layout(&mut doc, &options);
        assert_eq!(stats.page_breaks, 1);
        assert!(!doc.paragraph_format(first).unwrap().page_break_before);
        assert!(doc.paragraph_format(risks).unwrap().page_break_before);
        assert!(!doc.paragraph_format(after_blank).unwrap().page_break_before);
        assert!(!doc.paragraph_format(minor).unwrap().page_break_before);
    }

    #[test]
    fn test_every_table_gets_a_header_row() {
        let mut doc = Document::new();
        let single = table(&mut doc, 1);
        let multi = table(&mut doc, 3);
        assert_eq!(ensure_table_header_repetition(&mut doc), 2);
        for t in [single, multi] {
            let first = doc.first_row(t).unwrap();
            assert!(matches!(doc.data(first), NodeData::Row(f) if f.heading_format));
        }
        let second = doc.children(multi)[1];
        assert!(matches!(doc.data(second), NodeData::Row(f) if !f.heading_format));
    }

    #[test]
    fn test_header_and_footer_content() {
        let mut doc = Document::new();
        configure_headers_and_footers(&mut doc, DEFAULT_HEADER_TEXT).unwrap();

        let header = doc.header_footer(HeaderFooterKind::HeaderPrimary).unwrap();
        let header_paragraph = doc.children(header)[0];
        assert_eq!(doc.text(header_paragraph), DEFAULT_HEADER_TEXT);
        assert_eq!(doc.paragraph_format(header_paragraph).unwrap().alignment, Some(Alignment::Left));
        let font = doc.first_run_font(header_paragraph).unwrap();
        assert_eq!((font.name.as_deref(), font.size), (Some("Arial"), Some(11.0)));

        let footer = doc.header_footer(HeaderFooterKind::FooterPrimary).unwrap();
        let footer_paragraph = doc.children(footer)[0];
        assert_eq!(doc.paragraph_format(footer_paragraph).unwrap().alignment, Some(Alignment::Center));
        let fields: Vec<FieldKind> = doc
            .children(footer_paragraph)
            .iter()
            .filter_map(|c| match doc.data(*c) {
                NodeData::Field { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(fields, vec![FieldKind::Page, FieldKind::NumPages]);
        assert_eq!(doc.text(footer_paragraph), "Page  of ");
        assert_eq!(doc.first_run_font(footer_paragraph).unwrap().size, Some(10.0));
    }
}
