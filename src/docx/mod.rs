//! Minimal WordprocessingML document model.
//!
//! A [`Document`] is an arena of nodes: body and header/footer containers, paragraphs with
//! runs, breaks, fields, charts and pictures, and tables made of rows and cells. Content the
//! model does not understand is kept as raw XML so templates survive a load/save round trip.

pub mod builder;
pub mod chart;
pub mod format;
pub mod html_import;
pub mod node;
pub mod reader;
pub mod warnings;
pub mod writer;
pub mod xml;

use std::collections::BTreeMap;
use std::path::Path;

pub use builder::DocumentBuilder;
pub use chart::{ChartShape, ChartType, DataLabels, LegendPosition};
pub use format::{Alignment, CellFormat, Font, ParagraphFormat, RowFormat, StyleId, TableFormat};
pub use html_import::LoadOptions;
pub use node::DocNode;
pub use warnings::{LoggingWarningCallback, WarningCallback, WarningInfo, WarningKind};

use crate::error::DocumentError;
use crate::report::SectionKeywordSet;
use crate::structure::find_section;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderFooterKind {
    HeaderPrimary,
    FooterPrimary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakKind {
    Line,
    Page,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Page,
    NumPages,
}

impl FieldKind {
    pub fn instruction(self) -> &'static str {
        match self {
            FieldKind::Page => "PAGE",
            FieldKind::NumPages => "NUMPAGES",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Picture {
    pub data: Vec<u8>,
    /// Lowercase file extension without the dot, e.g. `png`.
    pub extension: String,
    /// Points.
    pub width: f64,
    /// Points.
    pub height: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Body,
    HeaderFooter(HeaderFooterKind),
    Paragraph(ParagraphFormat),
    Run { text: String, font: Font },
    Break(BreakKind),
    Field { kind: FieldKind, font: Font },
    Chart(Box<ChartShape>),
    Picture(Box<Picture>),
    Table(TableFormat),
    Row(RowFormat),
    Cell(CellFormat),
    /// Markup carried through unchanged. `text` is its visible text, used for matching.
    Raw { xml: String, text: String },
}

impl NodeData {
    fn is_container(&self) -> bool {
        matches!(
            self,
            NodeData::Body | NodeData::HeaderFooter(_) | NodeData::Table(_) | NodeData::Row(_) | NodeData::Cell(_)
        )
    }
}

#[derive(Debug, Clone)]
struct Entry {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

/// Package content loaded from a template that the node tree does not model.
#[derive(Debug, Clone, Default)]
pub struct Package {
    /// Zip path of the main document part when it is not `word/document.xml`.
    pub document_part: Option<String>,
    /// Parts copied verbatim on save, keyed by zip path.
    pub parts: BTreeMap<String, Vec<u8>>,
    /// Relationships of the main document part, kept with their original ids.
    pub relationships: Vec<Relationship>,
    pub content_type_defaults: Vec<(String, String)>,
    pub content_type_overrides: Vec<(String, String)>,
    /// Namespace declarations found on part roots, `(prefix, uri)`.
    pub namespaces: Vec<(String, String)>,
    pub ignorable: Option<String>,
    /// Raw children of the final `w:sectPr`, minus the primary header/footer references.
    pub section_properties: Vec<String>,
    pub header_part: Option<String>,
    pub footer_part: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Entry>,
    body: NodeId,
    header: Option<NodeId>,
    footer: Option<NodeId>,
    pub package: Package,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Entry {
                data: NodeData::Body,
                parent: None,
                children: Vec::new(),
            }],
            body: NodeId(0),
            header: None,
            footer: None,
            package: Package::default(),
        }
    }

    /// Imports an HTML file. Formatting that cannot be represented is reported to the
    /// warning callback of `options`.
    pub fn load_html(path: &Path, options: &LoadOptions) -> Result<Self, DocumentError> {
        html_import::import_file(path, options)
    }

    /// Opens a `.docx` package, typically a template.
    pub fn load_docx(path: &Path) -> Result<Self, DocumentError> {
        reader::read_docx(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        writer::write_docx(self, path)
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn header_footer(&self, kind: HeaderFooterKind) -> Option<NodeId> {
        match kind {
            HeaderFooterKind::HeaderPrimary => self.header,
            HeaderFooterKind::FooterPrimary => self.footer,
        }
    }

    pub fn ensure_header_footer(&mut self, kind: HeaderFooterKind) -> NodeId {
        if let Some(id) = self.header_footer(kind) {
            return id;
        }
        let id = self.create(NodeData::HeaderFooter(kind));
        match kind {
            HeaderFooterKind::HeaderPrimary => self.header = Some(id),
            HeaderFooterKind::FooterPrimary => self.footer = Some(id),
        }
        id
    }

    /// Creates a detached node.
    pub fn create(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Entry {
            data,
            parent: None,
            children: Vec::new(),
        });
        NodeId(self.nodes.len() - 1)
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0].data
    }

    pub fn node(&self, id: NodeId) -> DocNode<'_> {
        DocNode::new(self, id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    fn position(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let index = self.children(parent).iter().position(|c| *c == id)?;
        Some((parent, index))
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.position(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.position(id)?;
        index
            .checked_sub(1)
            .and_then(|i| self.children(parent).get(i).copied())
    }

    pub fn append_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.create(data);
        self.attach(parent, None, id);
        id
    }

    pub fn insert_after(&mut self, reference: NodeId, data: NodeData) -> Result<NodeId, DocumentError> {
        let (parent, index) = self
            .position(reference)
            .ok_or(DocumentError::DetachedNode(reference.0))?;
        let id = self.create(data);
        self.attach(parent, Some(index + 1), id);
        Ok(id)
    }

    pub fn insert_before(&mut self, reference: NodeId, data: NodeData) -> Result<NodeId, DocumentError> {
        let (parent, index) = self
            .position(reference)
            .ok_or(DocumentError::DetachedNode(reference.0))?;
        let id = self.create(data);
        self.attach(parent, Some(index), id);
        Ok(id)
    }

    fn attach(&mut self, parent: NodeId, index: Option<usize>, id: NodeId) {
        self.nodes[id.0].parent = Some(parent);
        let children = &mut self.nodes[parent.0].children;
        match index {
            Some(index) if index <= children.len() => children.insert(index, id),
            _ => children.push(id),
        }
    }

    /// Unlinks `id` from the tree. Returns false when it was already detached.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some((parent, index)) = self.position(id) else {
            return false;
        };
        self.nodes[parent.0].children.remove(index);
        self.nodes[id.0].parent = None;
        true
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current == self.body || Some(current) == self.header || Some(current) == self.footer
    }

    /// Descendants of `id` in document order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Body paragraphs in document order, including those inside tables.
    pub fn paragraphs(&self) -> Vec<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .filter(|id| matches!(self.data(*id), NodeData::Paragraph(_)))
            .collect()
    }

    /// Body tables in document order, nested tables included.
    pub fn tables(&self) -> Vec<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .filter(|id| matches!(self.data(*id), NodeData::Table(_)))
            .collect()
    }

    pub fn text(&self, id: NodeId) -> String {
        match self.data(id) {
            NodeData::Run { text, .. } => text.clone(),
            NodeData::Raw { text, .. } => text.clone(),
            NodeData::Break(BreakKind::Line) => "\n".to_string(),
            NodeData::Paragraph(_) => self.children(id).iter().map(|c| self.text(*c)).collect(),
            data if data.is_container() => self
                .children(id)
                .iter()
                .map(|c| self.text(*c))
                .collect::<Vec<_>>()
                .join("\n"),
            _ => String::new(),
        }
    }

    pub fn paragraph_format(&self, id: NodeId) -> Option<&ParagraphFormat> {
        match self.data(id) {
            NodeData::Paragraph(format) => Some(format),
            _ => None,
        }
    }

    pub fn paragraph_format_mut(&mut self, id: NodeId) -> Option<&mut ParagraphFormat> {
        match self.data_mut(id) {
            NodeData::Paragraph(format) => Some(format),
            _ => None,
        }
    }

    pub fn row_format_mut(&mut self, id: NodeId) -> Option<&mut RowFormat> {
        match self.data_mut(id) {
            NodeData::Row(format) => Some(format),
            _ => None,
        }
    }

    pub fn chart(&self, id: NodeId) -> Option<&ChartShape> {
        match self.data(id) {
            NodeData::Chart(chart) => Some(chart),
            _ => None,
        }
    }

    pub fn chart_mut(&mut self, id: NodeId) -> Option<&mut ChartShape> {
        match self.data_mut(id) {
            NodeData::Chart(chart) => Some(chart),
            _ => None,
        }
    }

    /// Font of the first run of a paragraph.
    pub fn first_run_font(&self, paragraph: NodeId) -> Option<&Font> {
        self.children(paragraph).iter().find_map(|c| match self.data(*c) {
            NodeData::Run { font, .. } => Some(font),
            _ => None,
        })
    }

    /// No visible text and no drawing content.
    pub fn is_blank(&self, id: NodeId) -> bool {
        self.text(id).trim().is_empty()
            && !self
                .descendants(id)
                .iter()
                .any(|c| matches!(self.data(*c), NodeData::Chart(_) | NodeData::Picture(_) | NodeData::Table(_)))
    }

    /// First row of a table.
    pub fn first_row(&self, table: NodeId) -> Option<NodeId> {
        self.children(table)
            .iter()
            .copied()
            .find(|c| matches!(self.data(*c), NodeData::Row(_)))
    }

    /// First body paragraph whose heading status holds and whose text matches `keywords`.
    pub fn find_section(&self, keywords: &SectionKeywordSet) -> Option<NodeId> {
        find_section(self.paragraphs().into_iter().map(|id| self.node(id)), keywords).map(|n| n.id())
    }

    pub fn charts(&self) -> Vec<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .filter(|id| matches!(self.data(*id), NodeData::Chart(_)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(doc: &mut Document, text: &str) -> NodeId {
        let p = doc.append_child(doc.body(), NodeData::Paragraph(ParagraphFormat::default()));
        doc.append_child(
            p,
            NodeData::Run {
                text: text.to_string(),
                font: Font::default(),
            },
        );
        p
    }

    #[test]
    fn test_sibling_navigation_and_insertion() {
        let mut doc = Document::new();
        let a = paragraph(&mut doc, "a");
        let c = paragraph(&mut doc, "c");
        let b = doc
            .insert_after(a, NodeData::Paragraph(ParagraphFormat::default()))
            .unwrap();
        assert_eq!(doc.next_sibling(a), Some(b));
        assert_eq!(doc.previous_sibling(c), Some(b));
        assert_eq!(doc.previous_sibling(a), None);

        let first = doc
            .insert_before(a, NodeData::Paragraph(ParagraphFormat::default()))
            .unwrap();
        assert_eq!(doc.children(doc.body())[0], first);
    }

    #[test]
    fn test_remove_detaches() {
        let mut doc = Document::new();
        let a = paragraph(&mut doc, "a");
        assert!(doc.is_attached(a));
        assert!(doc.remove(a));
        assert!(!doc.remove(a));
        assert!(!doc.is_attached(a));
        assert!(matches!(
            doc.insert_after(a, NodeData::Body),
            Err(DocumentError::DetachedNode(_))
        ));
    }

    #[test]
    fn test_text_and_blank() {
        let mut doc = Document::new();
        let p = paragraph(&mut doc, "Hello ");
        doc.append_child(
            p,
            NodeData::Run {
                text: "world".to_string(),
                font: Font::bold(),
            },
        );
        assert_eq!(doc.text(p), "Hello world");
        let empty = doc.append_child(doc.body(), NodeData::Paragraph(ParagraphFormat::default()));
        assert!(doc.is_blank(empty));
        assert!(!doc.is_blank(p));
        assert_eq!(doc.text(doc.body()), "Hello world\n");
    }

    #[test]
    fn test_paragraphs_include_table_cells() {
        let mut doc = Document::new();
        paragraph(&mut doc, "before");
        let table = doc.append_child(doc.body(), NodeData::Table(TableFormat::default()));
        let row = doc.append_child(table, NodeData::Row(RowFormat::default()));
        let cell = doc.append_child(row, NodeData::Cell(CellFormat::default()));
        doc.append_child(cell, NodeData::Paragraph(ParagraphFormat::default()));
        assert_eq!(doc.paragraphs().len(), 2);
        assert_eq!(doc.tables(), vec![table]);
        assert_eq!(doc.first_row(table), Some(row));
    }
}
