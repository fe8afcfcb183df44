//! Cursor-style editing of a [`Document`].
//!
//! The cursor always sits at the end of a paragraph. Text, breaks, fields and charts are
//! appended to that paragraph; `writeln` and `insert_paragraph` start a new one after it.
//! Paragraph formatting is read and written on the paragraph under the cursor, font settings
//! apply to runs written from then on.

use crate::docx::chart::{ChartShape, ChartType};
use crate::docx::format::{CellFormat, Font, ParagraphFormat, RowFormat, TableFormat};
use crate::docx::{BreakKind, Document, FieldKind, HeaderFooterKind, NodeData, NodeId};
use crate::error::DocumentError;

struct TableState {
    table: NodeId,
    row: Option<NodeId>,
    cell: Option<NodeId>,
    /// Paragraph the cursor returns to after the table.
    after: NodeId,
}

pub struct DocumentBuilder<'a> {
    doc: &'a mut Document,
    paragraph: NodeId,
    font: Font,
    cell_format: CellFormat,
    row_format: RowFormat,
    table: Option<TableState>,
}

/// Last child of `container` when it is a paragraph, else a new empty paragraph appended.
fn trailing_paragraph(doc: &mut Document, container: NodeId) -> NodeId {
    match doc.children(container).last() {
        Some(last) if matches!(doc.data(*last), NodeData::Paragraph(_)) => *last,
        _ => doc.append_child(container, NodeData::Paragraph(ParagraphFormat::default())),
    }
}

impl<'a> DocumentBuilder<'a> {
    /// Builder positioned at the end of the body.
    pub fn new(doc: &'a mut Document) -> Self {
        let body = doc.body();
        let paragraph = trailing_paragraph(doc, body);
        Self {
            doc,
            paragraph,
            font: Font::default(),
            cell_format: CellFormat::default(),
            row_format: RowFormat::default(),
            table: None,
        }
    }

    pub fn document(&self) -> &Document {
        &*self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut *self.doc
    }

    pub fn current_paragraph(&self) -> NodeId {
        self.paragraph
    }

    pub fn move_to_document_end(&mut self) {
        let body = self.doc.body();
        self.paragraph = trailing_paragraph(self.doc, body);
        self.table = None;
    }

    /// Moves to the end of `node`. Inline nodes move to their paragraph; block nodes other
    /// than paragraphs get a fresh paragraph inserted after them.
    pub fn move_to(&mut self, node: NodeId) -> Result<(), DocumentError> {
        if !self.doc.is_attached(node) {
            return Err(DocumentError::DetachedNode(node.index()));
        }
        self.table = None;
        match self.doc.data(node) {
            NodeData::Paragraph(_) => self.paragraph = node,
            NodeData::Run { .. }
            | NodeData::Break(_)
            | NodeData::Field { .. }
            | NodeData::Chart(_)
            | NodeData::Picture(_) => {
                self.paragraph = self
                    .doc
                    .parent(node)
                    .ok_or(DocumentError::DetachedNode(node.index()))?;
            }
            NodeData::Body | NodeData::HeaderFooter(_) | NodeData::Cell(_) => {
                self.paragraph = trailing_paragraph(self.doc, node);
            }
            _ => {
                self.paragraph = self
                    .doc
                    .insert_after(node, NodeData::Paragraph(ParagraphFormat::default()))?;
            }
        }
        Ok(())
    }

    pub fn move_to_header_footer(&mut self, kind: HeaderFooterKind) {
        let container = self.doc.ensure_header_footer(kind);
        self.paragraph = trailing_paragraph(self.doc, container);
        self.table = None;
    }

    pub fn font(&mut self) -> &mut Font {
        &mut self.font
    }

    pub fn paragraph_format(&mut self) -> &mut ParagraphFormat {
        match self.doc.data_mut(self.paragraph) {
            NodeData::Paragraph(format) => format,
            _ => unreachable!("builder cursor always rests on a paragraph"),
        }
    }

    /// Format of the cell being built, or of the next cell when none is open. New cells
    /// start from the previous cell's format.
    pub fn cell_format(&mut self) -> &mut CellFormat {
        if let Some(cell) = self.table.as_ref().and_then(|t| t.cell) {
            if let NodeData::Cell(format) = self.doc.data_mut(cell) {
                return format;
            }
        }
        &mut self.cell_format
    }

    /// Format of the row being built, or of the next row when none is open.
    pub fn row_format(&mut self) -> &mut RowFormat {
        if let Some(row) = self.table.as_ref().and_then(|t| t.row) {
            if let NodeData::Row(format) = self.doc.data_mut(row) {
                return format;
            }
        }
        &mut self.row_format
    }

    pub fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.doc.append_child(
            self.paragraph,
            NodeData::Run {
                text: text.to_string(),
                font: self.font.clone(),
            },
        );
    }

    pub fn writeln(&mut self, text: &str) -> Result<(), DocumentError> {
        self.write(text);
        self.insert_paragraph()?;
        Ok(())
    }

    /// Ends the current paragraph and starts a new one with the same formatting, minus any
    /// page break. Returns the paragraph that was ended.
    pub fn insert_paragraph(&mut self) -> Result<NodeId, DocumentError> {
        let mut format = self.paragraph_format().clone();
        format.page_break_before = false;
        let finished = self.paragraph;
        self.paragraph = self.doc.insert_after(finished, NodeData::Paragraph(format))?;
        Ok(finished)
    }

    pub fn insert_break(&mut self, kind: BreakKind) {
        self.doc.append_child(self.paragraph, NodeData::Break(kind));
    }

    pub fn insert_field(&mut self, kind: FieldKind) {
        self.doc.append_child(
            self.paragraph,
            NodeData::Field {
                kind,
                font: self.font.clone(),
            },
        );
    }

    /// Inserts an empty chart of `width` x `height` points inline at the cursor.
    pub fn insert_chart(&mut self, chart_type: ChartType, width: f64, height: f64) -> NodeId {
        self.doc.append_child(
            self.paragraph,
            NodeData::Chart(Box::new(ChartShape::new(chart_type, width, height))),
        )
    }

    /// Starts a table at the cursor. An empty current paragraph ends up after the table,
    /// otherwise the table follows it.
    pub fn start_table(&mut self) -> Result<NodeId, DocumentError> {
        let (table, after) = if self.doc.children(self.paragraph).is_empty() {
            let table = self
                .doc
                .insert_before(self.paragraph, NodeData::Table(TableFormat::default()))?;
            (table, self.paragraph)
        } else {
            let format = self.paragraph_format().clone();
            let table = self
                .doc
                .insert_after(self.paragraph, NodeData::Table(TableFormat::default()))?;
            let after = self.doc.insert_after(table, NodeData::Paragraph(format))?;
            (table, after)
        };
        self.table = Some(TableState {
            table,
            row: None,
            cell: None,
            after,
        });
        Ok(table)
    }

    /// Opens a new cell in the current row, starting the row if needed, and moves the
    /// cursor into it.
    pub fn insert_cell(&mut self) -> Result<NodeId, DocumentError> {
        let Some(state) = self.table.as_ref() else {
            return Err(DocumentError::NoTable("insert_cell"));
        };
        let (table, row, previous_cell) = (state.table, state.row, state.cell);

        let row = match row {
            Some(row) => row,
            None => self.doc.append_child(table, NodeData::Row(self.row_format.clone())),
        };
        let format = match previous_cell.map(|cell| self.doc.data(cell)) {
            Some(NodeData::Cell(format)) => format.clone(),
            _ => self.cell_format.clone(),
        };
        let cell = self.doc.append_child(row, NodeData::Cell(format));
        self.paragraph = self
            .doc
            .append_child(cell, NodeData::Paragraph(ParagraphFormat::default()));

        if let Some(state) = self.table.as_mut() {
            state.row = Some(row);
            state.cell = Some(cell);
        }
        Ok(cell)
    }

    pub fn end_row(&mut self) -> Result<NodeId, DocumentError> {
        let state = self.table.as_mut().ok_or(DocumentError::NoTable("end_row"))?;
        let row = state.row.take().ok_or(DocumentError::NoTable("end_row"))?;
        Ok(row)
    }

    pub fn end_table(&mut self) -> Result<NodeId, DocumentError> {
        let state = self.table.take().ok_or(DocumentError::NoTable("end_table"))?;
        self.paragraph = state.after;
        Ok(state.table)
    }
}
