//! Loads an HTML report into a [`Document`].
//!
//! Headings become heading-styled paragraphs, lists become list paragraphs carrying their
//! marker as text, tables keep their rows, cells and explicit widths. Inline formatting is
//! limited to bold, italic and font size; anything else is reported through the warning
//! callback and dropped.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::docx::format::{Alignment, CellFormat, Font, ParagraphFormat, RowFormat, StyleId, TableFormat};
use crate::docx::warnings::{WarningCallback, WarningInfo, WarningKind};
use crate::docx::{BreakKind, Document, NodeData, NodeId, Picture};
use crate::error::DocumentError;
use crate::parsing::html_document::{HtmlDocument, HtmlNode};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// CSS pixels to points.
const PX_TO_PT: f64 = 0.75;

const SKIPPED_TAGS: &[&str] = &[
    "head", "script", "style", "template", "noscript", "meta", "link", "title",
];

const UNREPRESENTABLE_TAGS: &[&str] = &["canvas", "svg", "iframe", "video", "audio", "object", "embed"];

const FORM_TAGS: &[&str] = &["input", "button", "select", "textarea"];

const PARAGRAPH_TAGS: &[&str] = &[
    "p", "pre", "blockquote", "address", "dt", "dd", "figcaption", "caption", "summary",
];

const CONTAINER_TAGS: &[&str] = &[
    "div", "section", "article", "main", "header", "footer", "nav", "aside", "figure", "center",
    "form", "fieldset", "details", "dl", "body", "html",
];

#[derive(Default)]
pub struct LoadOptions {
    /// Directory relative image sources resolve against. Defaults to the file's directory.
    pub base_uri: Option<PathBuf>,
    pub warning_callback: Option<Box<dyn WarningCallback>>,
}

pub fn import_file(path: &Path, options: &LoadOptions) -> Result<Document, DocumentError> {
    let html = HtmlDocument::load(path)?;
    let base = options
        .base_uri
        .clone()
        .or_else(|| path.parent().map(Path::to_path_buf));
    Ok(import_html(&html, base.as_deref(), options))
}

/// Converts an already parsed document. `base` resolves relative image sources.
pub fn import_html(html: &HtmlDocument, base: Option<&Path>, options: &LoadOptions) -> Document {
    let mut importer = Importer {
        doc: Document::new(),
        options,
        base: base.map(Path::to_path_buf),
        reported: HashSet::new(),
    };
    let root = html.body().unwrap_or_else(|| html.root());
    let body = importer.doc.body();
    let mut flow = Flow::new(body, ParagraphFormat::default());
    importer.walk(&root, &mut flow, &Font::default());
    importer.close(&mut flow);
    debug!(
        "Imported HTML into {} paragraphs and {} tables",
        importer.doc.paragraphs().len(),
        importer.doc.tables().len()
    );
    importer.doc
}

/// Paragraph flow inside one block container.
struct Flow {
    container: NodeId,
    /// Paragraph receiving inline content, if one is open.
    open: Option<NodeId>,
    /// Format of paragraphs this flow opens.
    format: ParagraphFormat,
    /// Text written at the start of the next paragraph, such as a list marker.
    prefix: Option<String>,
    has_content: bool,
    keep_empty: bool,
}

impl Flow {
    fn new(container: NodeId, format: ParagraphFormat) -> Self {
        Self {
            container,
            open: None,
            format,
            prefix: None,
            has_content: false,
            keep_empty: false,
        }
    }
}

struct Importer<'o> {
    doc: Document,
    options: &'o LoadOptions,
    base: Option<PathBuf>,
    reported: HashSet<String>,
}

impl Importer<'_> {
    fn warn(&self, kind: WarningKind, description: String) {
        if let Some(callback) = &self.options.warning_callback {
            callback.warning(&WarningInfo::new(kind, description));
        }
    }

    /// Reports a formatting loss once per key.
    fn warn_once(&mut self, key: String, kind: WarningKind, description: String) {
        if self.reported.insert(key) {
            self.warn(kind, description);
        }
    }

    fn walk(&mut self, node: &HtmlNode, flow: &mut Flow, font: &Font) {
        for child in node.children() {
            if let Some(text) = child.text_contents() {
                self.text(flow, &text, font);
                continue;
            }
            let Some(tag) = child.tag_name() else {
                continue;
            };
            let tag = tag.as_str();
            if SKIPPED_TAGS.contains(&tag) {
                continue;
            }
            if UNREPRESENTABLE_TAGS.contains(&tag) {
                self.warn(
                    WarningKind::MajorFormattingLoss,
                    format!("<{tag}> element cannot be represented and was dropped"),
                );
                continue;
            }
            if FORM_TAGS.contains(&tag) {
                self.warn_once(
                    tag.to_string(),
                    WarningKind::MinorFormattingLoss,
                    format!("form control <{tag}> was dropped"),
                );
                continue;
            }
            match tag {
                "br" => {
                    let paragraph = self.ensure_paragraph(flow);
                    self.doc.append_child(paragraph, NodeData::Break(BreakKind::Line));
                }
                "img" => self.image(&child, flow),
                "hr" => self.close(flow),
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                    let level = tag[1..].parse::<u8>().unwrap_or(1);
                    let format = ParagraphFormat {
                        alignment: self.alignment(&child),
                        ..ParagraphFormat::with_style(StyleId::Heading(level))
                    };
                    self.block(&child, flow, format, font);
                }
                "ul" | "ol" => self.list(&child, flow, tag == "ol", font),
                "table" => {
                    self.close(flow);
                    self.table(&child, flow.container, font);
                }
                _ if PARAGRAPH_TAGS.contains(&tag) => {
                    let format = ParagraphFormat {
                        alignment: self.alignment(&child).or(flow.format.alignment),
                        ..ParagraphFormat::default()
                    };
                    let font = self.font_for(&child, tag, font);
                    self.block(&child, flow, format, &font);
                }
                _ if CONTAINER_TAGS.contains(&tag) || tag == "li" => {
                    self.close(flow);
                    let format = ParagraphFormat {
                        alignment: self.alignment(&child).or(flow.format.alignment),
                        ..flow.format.clone()
                    };
                    let font = self.font_for(&child, tag, font);
                    let mut inner = Flow::new(flow.container, format);
                    self.walk(&child, &mut inner, &font);
                    self.close(&mut inner);
                }
                _ => {
                    let font = self.font_for(&child, tag, font);
                    self.walk(&child, flow, &font);
                }
            }
        }
    }

    /// Emits `node` as its own paragraph with `format`.
    fn block(&mut self, node: &HtmlNode, flow: &mut Flow, format: ParagraphFormat, font: &Font) {
        self.close(flow);
        let mut inner = Flow::new(flow.container, format);
        inner.keep_empty = true;
        self.ensure_paragraph(&mut inner);
        self.walk(node, &mut inner, font);
        self.close(&mut inner);
    }

    fn list(&mut self, node: &HtmlNode, flow: &mut Flow, ordered: bool, font: &Font) {
        self.close(flow);
        let mut number = node
            .attr("start")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(1);
        for item in node.children().into_iter().filter(|c| c.is_element("li")) {
            let marker = if ordered {
                let marker = format!("{number}. ");
                number += 1;
                marker
            } else {
                crate::report::BULLET_MARKER.to_string()
            };
            let mut inner = Flow::new(flow.container, ParagraphFormat::with_style(StyleId::ListParagraph));
            inner.prefix = Some(marker);
            let font = self.font_for(&item, "li", font);
            self.walk(&item, &mut inner, &font);
            self.close(&mut inner);
        }
    }

    fn table(&mut self, node: &HtmlNode, container: NodeId, font: &Font) {
        let table = self.doc.append_child(container, NodeData::Table(TableFormat::default()));
        let rows = node.children().into_iter().flat_map(|child| {
            if child.is_element("thead") || child.is_element("tbody") || child.is_element("tfoot") {
                child.children()
            } else {
                vec![child]
            }
        });
        for tr in rows.filter(|r| r.is_element("tr")) {
            let row = self.doc.append_child(table, NodeData::Row(RowFormat::default()));
            for td in tr
                .children()
                .into_iter()
                .filter(|c| c.is_element("td") || c.is_element("th"))
            {
                let format = CellFormat {
                    width: self.cell_width(&td),
                    ..CellFormat::default()
                };
                let cell = self.doc.append_child(row, NodeData::Cell(format));
                let tag = if td.is_element("th") { "th" } else { "td" };
                let font = self.font_for(&td, tag, font);
                let mut flow = Flow::new(
                    cell,
                    ParagraphFormat {
                        alignment: self.alignment(&td),
                        ..ParagraphFormat::default()
                    },
                );
                self.walk(&td, &mut flow, &font);
                self.close(&mut flow);
                if self.doc.children(cell).is_empty() {
                    self.doc
                        .append_child(cell, NodeData::Paragraph(ParagraphFormat::default()));
                }
            }
            if self.doc.children(row).is_empty() {
                self.doc.remove(row);
            }
        }
        if self.doc.children(table).is_empty() {
            self.doc.remove(table);
        }
    }

    fn image(&mut self, node: &HtmlNode, flow: &mut Flow) {
        let Some(src) = node.attr("src").map(|s| s.trim().to_string()) else {
            return;
        };
        let lowered = src.to_ascii_lowercase();
        if lowered.starts_with("data:") || lowered.starts_with("http://") || lowered.starts_with("https://") {
            self.warn(
                WarningKind::UnexpectedContent,
                format!("image {src} is not a local file and was skipped"),
            );
            return;
        }
        let relative = src.strip_prefix("file://").unwrap_or(&src);
        let path = match &self.base {
            Some(base) => base.join(relative),
            None => PathBuf::from(relative),
        };
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                self.warn(
                    WarningKind::UnexpectedContent,
                    format!("image {} could not be read: {e}", path.display()),
                );
                return;
            }
        };
        let size = match imagesize::blob_size(&data) {
            Ok(size) => size,
            Err(e) => {
                self.warn(
                    WarningKind::UnexpectedContent,
                    format!("image {} has an unknown format: {e:?}", path.display()),
                );
                return;
            }
        };
        let width = pixel_attr(node, "width").unwrap_or(size.width as f64) * PX_TO_PT;
        let height = pixel_attr(node, "height").unwrap_or(size.height as f64) * PX_TO_PT;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_else(|| "png".to_string());
        let picture = Picture {
            data,
            extension,
            width,
            height,
            description: node.attr("alt").unwrap_or_default(),
        };
        let paragraph = self.ensure_paragraph(flow);
        self.doc
            .append_child(paragraph, NodeData::Picture(Box::new(picture)));
        flow.has_content = true;
    }

    fn text(&mut self, flow: &mut Flow, raw: &str, font: &Font) {
        let collapsed = WHITESPACE_RE.replace_all(raw, " ");
        if flow.open.is_none() && collapsed.trim().is_empty() {
            return;
        }
        let paragraph = self.ensure_paragraph(flow);
        let text = if self.ends_with_space(paragraph) {
            collapsed.trim_start()
        } else {
            &collapsed
        };
        if text.is_empty() {
            return;
        }
        self.doc.append_child(
            paragraph,
            NodeData::Run {
                text: text.to_string(),
                font: font.clone(),
            },
        );
        if !text.trim().is_empty() {
            flow.has_content = true;
        }
    }

    fn ends_with_space(&self, paragraph: NodeId) -> bool {
        match self.doc.children(paragraph).last().map(|c| self.doc.data(*c)) {
            None | Some(NodeData::Break(_)) => true,
            Some(NodeData::Run { text, .. }) => text.ends_with(' '),
            Some(_) => false,
        }
    }

    fn ensure_paragraph(&mut self, flow: &mut Flow) -> NodeId {
        if let Some(paragraph) = flow.open {
            return paragraph;
        }
        let paragraph = self
            .doc
            .append_child(flow.container, NodeData::Paragraph(flow.format.clone()));
        if let Some(prefix) = flow.prefix.take() {
            self.doc.append_child(
                paragraph,
                NodeData::Run {
                    text: prefix,
                    font: Font::default(),
                },
            );
        }
        flow.open = Some(paragraph);
        flow.has_content = false;
        paragraph
    }

    /// Finishes the open paragraph: trims trailing spaces and drops it when it carries no
    /// content.
    fn close(&mut self, flow: &mut Flow) {
        let Some(paragraph) = flow.open.take() else {
            return;
        };
        while let Some(last) = self.doc.children(paragraph).last().copied() {
            let NodeData::Run { text, .. } = self.doc.data_mut(last) else {
                break;
            };
            let trimmed = text.trim_end().len();
            text.truncate(trimmed);
            if !text.is_empty() {
                break;
            }
            self.doc.remove(last);
        }
        if !flow.has_content && !flow.keep_empty {
            self.doc.remove(paragraph);
        }
        flow.keep_empty = false;
    }

    fn alignment(&self, node: &HtmlNode) -> Option<Alignment> {
        let from_style = declarations(node)
            .into_iter()
            .find(|(name, _)| name == "text-align")
            .and_then(|(_, value)| Alignment::from_css(&value));
        from_style.or_else(|| node.attr("align").and_then(|a| Alignment::from_css(&a)))
    }

    fn cell_width(&self, node: &HtmlNode) -> Option<f64> {
        declarations(node)
            .into_iter()
            .find(|(name, _)| name == "width")
            .and_then(|(_, value)| length_in_points(&value))
            .or_else(|| node.attr("width").and_then(|w| length_in_points(&w)))
    }

    /// Font for the content of `node`, derived from its tag and inline style.
    fn font_for(&mut self, node: &HtmlNode, tag: &str, inherited: &Font) -> Font {
        let mut font = inherited.clone();
        match tag {
            "b" | "strong" | "th" => font.bold = true,
            "i" | "em" | "cite" | "var" => font.italic = true,
            _ => {}
        }
        for (name, value) in declarations(node) {
            match name.as_str() {
                "font-weight" => {
                    font.bold = match value.as_str() {
                        "bold" | "bolder" => true,
                        "normal" | "lighter" => false,
                        number => number.parse::<u32>().map(|w| w >= 600).unwrap_or(font.bold),
                    }
                }
                "font-style" => font.italic = value == "italic" || value == "oblique",
                "font-size" => match length_in_points(&value) {
                    Some(size) => font.size = Some(size),
                    None => self.warn_once(
                        format!("font-size:{value}"),
                        WarningKind::MinorFormattingLoss,
                        format!("font-size {value} is not supported"),
                    ),
                },
                "text-align" | "width" => {}
                other => self.warn_once(
                    other.to_string(),
                    WarningKind::MinorFormattingLoss,
                    format!("CSS property {other} is not supported"),
                ),
            }
        }
        font
    }
}

/// Lowercased `(property, value)` pairs of an inline `style` attribute.
fn declarations(node: &HtmlNode) -> Vec<(String, String)> {
    let Some(style) = node.attr("style") else {
        return Vec::new();
    };
    style
        .split(';')
        .filter_map(|declaration| {
            let (name, value) = declaration.split_once(':')?;
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().to_ascii_lowercase();
            (!name.is_empty() && !value.is_empty()).then_some((name, value))
        })
        .collect()
}

/// `12pt`, `16px` or a bare pixel count in points. Relative units are not resolved.
fn length_in_points(value: &str) -> Option<f64> {
    let value = value.trim();
    if let Some(pt) = value.strip_suffix("pt") {
        return pt.trim().parse().ok();
    }
    let px = value.strip_suffix("px").unwrap_or(value);
    px.trim().parse::<f64>().ok().map(|px| px * PX_TO_PT)
}

fn pixel_attr(node: &HtmlNode, name: &str) -> Option<f64> {
    node.attr(name)
        .and_then(|v| v.trim().trim_end_matches("px").parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn import(html: &str) -> Document {
        let parsed = HtmlDocument::parse(html).unwrap();
        import_html(&parsed, None, &LoadOptions::default())
    }

    fn texts(doc: &Document) -> Vec<String> {
        doc.children(doc.body())
            .iter()
            .map(|id| doc.text(*id))
            .collect()
    }

    #[test]
    fn test_headings_paragraphs_and_lists() {
        let doc = import(
            "<html><body><h2>Current Week</h2><ul><li>One</li><li> Two  <b>bold</b> </li></ul>\
             <p>Plain   text</p><ol><li>First</li></ol></body></html>",
        );
        assert_eq!(
            texts(&doc),
            vec!["Current Week", "• One", "• Two bold", "Plain text", "1. First"]
        );
        let first = doc.children(doc.body())[0];
        assert_eq!(doc.paragraph_format(first).unwrap().style, StyleId::Heading(2));
        let item = doc.children(doc.body())[1];
        assert_eq!(doc.paragraph_format(item).unwrap().style, StyleId::ListParagraph);
    }

    #[test]
    fn test_table_with_widths_and_header_cells() {
        let doc = import(
            r#"<table><thead><tr><th style="width: 40px">ID</th><th>Name</th></tr></thead>
               <tbody><tr><td>1</td><td></td></tr></tbody></table>"#,
        );
        let table = doc.tables()[0];
        let rows = doc.children(table).to_vec();
        assert_eq!(rows.len(), 2);
        let header_cell = doc.children(rows[0])[0];
        assert!(matches!(doc.data(header_cell), NodeData::Cell(f) if f.width == Some(30.0)));
        let header_paragraph = doc.children(header_cell)[0];
        assert!(doc.first_run_font(header_paragraph).unwrap().bold);
        let empty_cell = doc.children(rows[1])[1];
        assert_eq!(doc.children(empty_cell).len(), 1);
    }

    #[test]
    fn test_inline_text_around_blocks() {
        let doc = import("<div>intro<p>inner</p>tail<br>next</div>");
        assert_eq!(texts(&doc), vec!["intro", "inner", "tail\nnext"]);
    }

    #[test]
    fn test_warnings_for_dropped_content() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let options = LoadOptions {
            base_uri: None,
            warning_callback: Some(Box::new(move |info: &WarningInfo| {
                sink.borrow_mut().push(info.kind)
            })),
        };
        let parsed = HtmlDocument::parse(
            r#"<p style="color: red">x</p><p style="color: blue">y</p><canvas id="c"></canvas>
               <img src="https://example.com/a.png">"#,
        )
        .unwrap();
        import_html(&parsed, None, &options);
        assert_eq!(
            *seen.borrow(),
            vec![
                WarningKind::MinorFormattingLoss,
                WarningKind::MajorFormattingLoss,
                WarningKind::UnexpectedContent
            ]
        );
    }

    #[test]
    fn test_font_size_and_alignment() {
        let doc = import(r#"<p style="text-align:center"><span style="font-size:16pt;font-weight:700">Big</span></p>"#);
        let paragraph = doc.children(doc.body())[0];
        assert_eq!(doc.paragraph_format(paragraph).unwrap().alignment, Some(Alignment::Center));
        let font = doc.first_run_font(paragraph).unwrap();
        assert_eq!(font.size, Some(16.0));
        assert!(font.bold);
    }
}
