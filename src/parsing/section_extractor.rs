use std::path::Path;

use chrono::{DateTime, Local};
use log::{debug, error, info, warn};

use crate::error::DocumentError;
use crate::parsing::html_document::{HtmlDocument, HtmlNode};
use crate::report::{
    BULLET_MARKER, ReportSection, RiskRecord, RiskStatus, SectionContent, SectionKeywordSet,
    SectionKeywords, StatusReport,
};
use crate::structure::{NodeKind, StructuralNode};

/// Minimum number of cells a risk row needs: description, impact, mitigation, status.
pub const MIN_RISK_CELLS: usize = 4;

/// Text of the section introduced by the first heading matching `keywords`.
///
/// Lists contribute one bulleted line per item, paragraphs and bare text one line each.
/// Anything else between the heading and the next heading is ignored.
pub fn extract_section(doc: &HtmlDocument, keywords: &SectionKeywordSet) -> SectionContent {
    let Some(heading) = doc.find_section(keywords) else {
        return SectionContent::default();
    };

    let mut lines = Vec::new();
    for node in heading.section_siblings() {
        match node.kind() {
            NodeKind::List => {
                for item in node.descendants() {
                    if !item.is_element("li") {
                        continue;
                    }
                    let text = item.text();
                    let text = text.trim();
                    if !text.is_empty() {
                        lines.push(format!("{BULLET_MARKER}{text}"));
                    }
                }
            }
            NodeKind::Paragraph | NodeKind::TextRun => {
                let text = node.text();
                let text = text.trim();
                if !text.is_empty() {
                    lines.push(text.to_string());
                }
            }
            _ => {}
        }
    }
    SectionContent::from_lines(lines)
}

/// The table holding the risks: the first table sibling after the heading, else the first
/// table anywhere after it in document order.
fn risk_table_after(doc: &HtmlDocument, heading: &HtmlNode) -> Option<HtmlNode> {
    let mut current = heading.next_sibling();
    while let Some(node) = current {
        if node.kind() == NodeKind::Table {
            return Some(node);
        }
        current = node.next_sibling();
    }

    let mut seen_heading = false;
    for node in doc.nodes() {
        if node.same_node(heading) {
            seen_heading = true;
            continue;
        }
        if seen_heading && node.kind() == NodeKind::Table && !node.is_descendant_of(heading) {
            return Some(node);
        }
    }
    None
}

/// Only `td` cells count; a `th` row header does not shift the columns.
fn risk_from_row(row: &HtmlNode, now: DateTime<Local>) -> Option<RiskRecord> {
    let cells: Vec<String> = row
        .descendants()
        .into_iter()
        .filter(|node| node.is_element("td"))
        .map(|cell| cell.text().trim().to_string())
        .collect();
    if cells.len() < MIN_RISK_CELLS {
        debug!("Skipping risk row with {} cells", cells.len());
        return None;
    }
    if cells[0].is_empty() {
        return None;
    }

    let status = RiskStatus::parse(&cells[3]).unwrap_or_else(|| {
        debug!("Unknown risk status '{}', using Open", cells[3]);
        RiskStatus::Open
    });
    Some(RiskRecord {
        description: cells[0].clone(),
        impact: cells[1].clone(),
        mitigation: cells[2].clone(),
        status,
        date_identified: now,
        ..RiskRecord::default()
    })
}

/// Risk records from the table following the risk heading, header row skipped, rows in
/// document order. Rows with fewer than four cells or a blank description are dropped.
pub fn extract_risk_table(
    doc: &HtmlDocument,
    keywords: &SectionKeywordSet,
    now: DateTime<Local>,
) -> Vec<RiskRecord> {
    let Some(heading) = doc.find_section(keywords) else {
        return Vec::new();
    };
    let Some(table) = risk_table_after(doc, &heading) else {
        debug!("Risk heading found but no table follows it");
        return Vec::new();
    };

    table
        .descendants()
        .into_iter()
        .filter(|node| node.kind() == NodeKind::TableRow)
        .skip(1)
        .filter_map(|row| risk_from_row(&row, now))
        .collect()
}

/// Builds a [`StatusReport`] from an HTML file, isolating failures per section.
pub struct HtmlReportExtractor {
    keywords: SectionKeywords,
}

impl Default for HtmlReportExtractor {
    fn default() -> Self {
        Self::new(SectionKeywords::default())
    }
}

impl HtmlReportExtractor {
    pub fn new(keywords: SectionKeywords) -> Self {
        Self { keywords }
    }

    pub fn extract(&self, path: &Path) -> StatusReport {
        let mut report = StatusReport {
            input_path: path.to_path_buf(),
            ..StatusReport::default()
        };

        if !path.exists() {
            warn!("HTML file not found: {}", path.display());
            return report;
        }

        match HtmlDocument::load(path) {
            Ok(doc) => {
                self.extract_into(&doc, &mut report);
                info!("Successfully extracted content from HTML");
            }
            Err(e) => error!("Error parsing HTML file {}: {e}", path.display()),
        }
        report
    }

    pub fn extract_from_str(&self, html: &str) -> Result<StatusReport, DocumentError> {
        let doc = HtmlDocument::parse(html)?;
        let mut report = StatusReport::default();
        self.extract_into(&doc, &mut report);
        Ok(report)
    }

    fn extract_into(&self, doc: &HtmlDocument, report: &mut StatusReport) {
        for section in ReportSection::ALL {
            let keywords = self.keywords.get(section);
            // Extraction walks a DOM that can be arbitrarily malformed.
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| match section {
                ReportSection::Risks => {
                    report.risks = extract_risk_table(doc, keywords, Local::now());
                }
                ReportSection::CurrentWeek => {
                    report.current_week_status = extract_section(doc, keywords);
                }
                ReportSection::NextWeek => {
                    report.next_week_goals = extract_section(doc, keywords);
                }
            }));
            match result {
                Ok(()) if section == ReportSection::Risks => {
                    info!("Extracted {} risks", report.risks.len())
                }
                Ok(()) if report.has_content(section) => {
                    info!("Extracted {}", section.display_name())
                }
                Ok(()) => debug!("No content found for {}", section.display_name()),
                Err(_) => error!("Error extracting {}", section.display_name()),
            }
        }
    }
}
