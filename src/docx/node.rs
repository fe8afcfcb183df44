use crate::docx::format::StyleId;
use crate::docx::{Document, NodeData, NodeId};
use crate::layout::looks_like_heading;
use crate::structure::{MAX_SECTION_HEADING_LEVEL, NodeKind, StructuralNode};

/// Borrowed view of one node of a [`Document`], for the section locator.
#[derive(Clone, Copy)]
pub struct DocNode<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> DocNode<'a> {
    pub fn new(doc: &'a Document, id: NodeId) -> Self {
        Self { doc, id }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    fn is_body_level(&self) -> bool {
        self.doc.parent(self.id) == Some(self.doc.body())
    }

    /// Paragraph that reads like a heading from its direct formatting.
    pub fn looks_like_heading(&self) -> bool {
        let Some(font) = self.doc.first_run_font(self.id) else {
            return false;
        };
        looks_like_heading(&self.doc.text(self.id), font.bold, font.size)
    }
}

impl StructuralNode for DocNode<'_> {
    fn kind(&self) -> NodeKind {
        match self.doc.data(self.id) {
            NodeData::Paragraph(format) => match &format.style {
                StyleId::Heading(level) => NodeKind::Heading(*level),
                StyleId::ListParagraph => NodeKind::ListItem,
                _ => NodeKind::Paragraph,
            },
            NodeData::Table(_) => NodeKind::Table,
            NodeData::Row(_) => NodeKind::TableRow,
            NodeData::Cell(_) => NodeKind::TableCell,
            NodeData::Run { .. } => NodeKind::TextRun,
            _ => NodeKind::Other,
        }
    }

    fn next_sibling(&self) -> Option<Self> {
        self.doc.next_sibling(self.id).map(|id| Self::new(self.doc, id))
    }

    fn previous_sibling(&self) -> Option<Self> {
        self.doc
            .previous_sibling(self.id)
            .map(|id| Self::new(self.doc, id))
    }

    fn parent(&self) -> Option<Self> {
        self.doc.parent(self.id).map(|id| Self::new(self.doc, id))
    }

    fn text(&self) -> String {
        self.doc.text(self.id)
    }

    /// Heading styles 1-4, or a body-level paragraph formatted like a heading. Bold text
    /// inside table cells never counts.
    fn is_heading(&self) -> bool {
        match self.kind() {
            NodeKind::Heading(level) => (1..=MAX_SECTION_HEADING_LEVEL).contains(&level),
            NodeKind::Paragraph => self.is_body_level() && self.looks_like_heading(),
            _ => false,
        }
    }
}
