//! Injects extracted report content into the output document.
//!
//! Each section of a [`StatusReport`] is located in the output tree by its heading and the
//! content is written after whatever the section already holds. Sections whose heading is
//! missing are skipped; nothing here fails the conversion.

pub mod charts;
pub mod risk_table;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub use charts::{PLACEHOLDER_SCAN_WINDOW, VISUALS_SECTION_TITLE};
pub use risk_table::{RISK_COLUMN_WIDTHS, RISK_TABLE_HEADERS, build_risk_table};

use crate::charts::ChartDescriptor;
use crate::docx::format::{Font, ParagraphFormat};
use crate::docx::{Document, DocumentBuilder, NodeId};
use crate::error::DocumentError;
use crate::report::{ReportSection, SectionContent, SectionKeywords, StatusReport};
use crate::structure::StructuralNode;

/// What happens to content already under a section heading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SectionMergePolicy {
    /// New content goes after the existing content.
    #[default]
    Append,
    /// Existing content up to the next heading is removed first.
    ReplaceExisting,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub merged: Vec<ReportSection>,
    /// Sections with content but no matching heading in the document.
    pub skipped: Vec<ReportSection>,
    pub failed: Vec<ReportSection>,
    pub risk_rows: usize,
}

impl MergeSummary {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty() && self.failed.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MergeEngine {
    policy: SectionMergePolicy,
    keywords: SectionKeywords,
}

impl MergeEngine {
    pub fn new(policy: SectionMergePolicy, keywords: SectionKeywords) -> Self {
        Self { policy, keywords }
    }

    pub fn policy(&self) -> SectionMergePolicy {
        self.policy
    }

    /// Writes every non-empty section of `report` under its heading in `doc`.
    pub fn merge(&self, doc: &mut Document, report: &StatusReport) -> MergeSummary {
        let mut summary = MergeSummary::default();
        if report.is_empty() {
            debug!("Report has no content, nothing to merge");
            return summary;
        }

        for section in ReportSection::ALL {
            if !report.has_content(section) {
                continue;
            }
            let Some(heading) = doc.find_section(self.keywords.get(section)) else {
                warn!("No heading found for {}, skipping", section.display_name());
                summary.skipped.push(section);
                continue;
            };
            let result = match report.section_text(section) {
                Some(content) => self.merge_text(doc, heading, content),
                None => self.merge_risks(doc, heading, report).map(|rows| {
                    summary.risk_rows = rows;
                }),
            };
            match result {
                Ok(()) => {
                    info!("Merged {}", section.display_name());
                    summary.merged.push(section);
                }
                Err(e) => {
                    warn!("Failed to merge {}: {e}", section.display_name());
                    summary.failed.push(section);
                }
            }
        }
        summary
    }

    /// Inserts charts into the Visuals section; see [`charts::insert_charts`].
    pub fn insert_charts(&self, doc: &mut Document, charts: &[ChartDescriptor]) -> usize {
        charts::insert_charts(doc, charts)
    }

    /// Node after which new content for the section under `heading` goes.
    fn section_anchor(&self, doc: &mut Document, heading: NodeId) -> NodeId {
        let existing: Vec<NodeId> = doc
            .node(heading)
            .section_siblings()
            .iter()
            .map(|node| node.id())
            .collect();
        match self.policy {
            SectionMergePolicy::Append => existing.last().copied().unwrap_or(heading),
            SectionMergePolicy::ReplaceExisting => {
                debug!("Removing {} existing node(s) under the heading", existing.len());
                for node in existing {
                    doc.remove(node);
                }
                heading
            }
        }
    }

    /// Builder sitting on a fresh Normal paragraph that follows one blank paragraph after
    /// the section's existing content.
    fn open_section<'a>(&self, doc: &'a mut Document, heading: NodeId) -> Result<DocumentBuilder<'a>, DocumentError> {
        let anchor = self.section_anchor(doc, heading);
        let mut builder = DocumentBuilder::new(doc);
        builder.move_to(anchor)?;
        if builder.current_paragraph() == anchor {
            builder.insert_paragraph()?;
        }
        *builder.paragraph_format() = ParagraphFormat::default();
        *builder.font() = Font::default();
        builder.insert_paragraph()?;
        Ok(builder)
    }

    fn merge_text(&self, doc: &mut Document, heading: NodeId, content: &SectionContent) -> Result<(), DocumentError> {
        let mut builder = self.open_section(doc, heading)?;
        for (index, line) in content.lines().enumerate() {
            if index > 0 {
                builder.insert_paragraph()?;
            }
            builder.write(line);
        }
        Ok(())
    }

    fn merge_risks(&self, doc: &mut Document, heading: NodeId, report: &StatusReport) -> Result<usize, DocumentError> {
        let mut builder = self.open_section(doc, heading)?;
        build_risk_table(&mut builder, &report.risks)?;
        Ok(report.risks.len())
    }
}
