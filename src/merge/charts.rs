//! Places extracted chart data into the output document.

use log::{debug, info, warn};

use crate::charts::{ChartDescriptor, ChartKind, is_known_chart_title};
use crate::docx::chart::{ChartShape, ChartType, DataLabels, LegendPosition, Stroke};
use crate::docx::format::{Font, ParagraphFormat, StyleId};
use crate::docx::{BreakKind, Document, DocumentBuilder, NodeData, NodeId};
use crate::error::DocumentError;

/// How many siblings after the Visuals heading are searched for placeholder titles. An
/// approximation of "the visuals section"; placeholders further down are left alone.
pub const PLACEHOLDER_SCAN_WINDOW: usize = 20;

pub const VISUALS_SECTION_TITLE: &str = "Visuals: Top 25 Initiative Analysis";

const CHART_WIDTH: f64 = 288.0;
const CHART_HEIGHT: f64 = 216.0;
const CIRCULAR_CHART_HEIGHT: f64 = 288.0;
const BORDER_WEIGHT: f64 = 2.0;

pub fn is_visuals_heading(text: &str) -> bool {
    let lowered = text.to_lowercase();
    lowered.contains("visual")
        && (lowered.contains("top 25") || lowered.contains("initiative") || lowered.contains("analysis"))
}

/// First paragraph reading like the Visuals heading.
pub fn find_visuals_heading(doc: &Document) -> Option<NodeId> {
    doc.paragraphs()
        .into_iter()
        .find(|p| is_visuals_heading(&doc.text(*p)))
}

/// Removes paragraphs repeating a known chart title among the first
/// [`PLACEHOLDER_SCAN_WINDOW`] siblings after `heading`.
pub fn remove_chart_placeholders(doc: &mut Document, heading: NodeId) -> usize {
    let mut removed = 0;
    let mut current = doc.next_sibling(heading);
    for _ in 0..PLACEHOLDER_SCAN_WINDOW {
        let Some(node) = current else {
            break;
        };
        current = doc.next_sibling(node);
        if matches!(doc.data(node), NodeData::Paragraph(_)) && is_known_chart_title(&doc.text(node)) {
            debug!("Removing chart placeholder '{}'", doc.text(node).trim());
            doc.remove(node);
            removed += 1;
        }
    }
    removed
}

/// Positions the builder where charts go: right after an existing Visuals heading (with
/// its placeholders cleared), else under a new heading on a fresh page at the end.
fn prepare_visuals_section(builder: &mut DocumentBuilder) -> Result<(), DocumentError> {
    match find_visuals_heading(builder.document()) {
        Some(heading) => {
            let removed = remove_chart_placeholders(builder.document_mut(), heading);
            info!("Found visuals section, removed {removed} placeholder(s)");
            builder.move_to(heading)?;
            builder.insert_paragraph()?;
        }
        None => {
            info!("No visuals section found, adding one at the end of the document");
            builder.move_to_document_end();
            if !builder.document().is_blank(builder.current_paragraph()) {
                builder.insert_paragraph()?;
            }
            *builder.paragraph_format() = ParagraphFormat::with_style(StyleId::Heading(2));
            builder.insert_break(BreakKind::Page);
            builder.writeln(VISUALS_SECTION_TITLE)?;
        }
    }
    *builder.paragraph_format() = ParagraphFormat::default();
    *builder.font() = Font::default();
    Ok(())
}

/// Sets data, labels, legend and border of a freshly inserted chart.
pub fn configure_chart(shape: &mut ChartShape, descriptor: &ChartDescriptor) {
    shape.title = Some(descriptor.title.clone());
    shape.show_title = false;
    shape.legend = LegendPosition::Bottom;
    shape.stroke = Stroke {
        on: true,
        color: "000000".to_string(),
        weight: BORDER_WEIGHT,
    };
    let labels = if descriptor.kind.is_circular() {
        DataLabels {
            show_value: false,
            show_percentage: true,
            show_leader_lines: true,
        }
    } else {
        shape.axis_x_title = Some("Categories".to_string());
        shape.axis_y_title = Some("Values".to_string());
        DataLabels {
            show_value: true,
            ..DataLabels::default()
        }
    };

    shape.series.clear();
    for (index, source) in descriptor.series.iter().enumerate() {
        let (categories, values): (Vec<String>, Vec<f64>) = descriptor
            .points(index)
            .into_iter()
            .map(|(label, value)| (label.to_string(), value))
            .unzip();
        let series = shape.add_series("", &categories, &values);
        series.colors = source.colors.clone();
        series.data_labels = Some(labels);
    }
}

fn chart_size(kind: ChartKind) -> (f64, f64) {
    if kind.is_circular() {
        (CHART_WIDTH, CIRCULAR_CHART_HEIGHT)
    } else {
        (CHART_WIDTH, CHART_HEIGHT)
    }
}

/// Writes one chart at the cursor: bold title kept with the chart, then the chart. The cursor
/// ends on a fresh paragraph.
fn insert_chart(builder: &mut DocumentBuilder, descriptor: &ChartDescriptor) -> Result<NodeId, DocumentError> {
    builder.paragraph_format().keep_with_next = true;
    builder.font().bold = true;
    builder.writeln(&descriptor.title)?;
    builder.font().bold = false;
    builder.paragraph_format().keep_with_next = false;

    let (width, height) = chart_size(descriptor.kind);
    let id = builder.insert_chart(ChartType::from(descriptor.kind), width, height);
    if let Some(shape) = builder.document_mut().chart_mut(id) {
        configure_chart(shape, descriptor);
    }
    builder.writeln("")?;
    Ok(id)
}

/// Inserts every chart, isolating failures per chart. Returns how many were inserted.
pub fn insert_charts(doc: &mut Document, charts: &[ChartDescriptor]) -> usize {
    if charts.is_empty() {
        debug!("No charts to insert");
        return 0;
    }
    let mut builder = DocumentBuilder::new(doc);
    if let Err(e) = prepare_visuals_section(&mut builder) {
        warn!("Could not prepare the visuals section: {e}");
        return 0;
    }
    let mut inserted = 0;
    for descriptor in charts {
        match insert_chart(&mut builder, descriptor) {
            Ok(_) => {
                inserted += 1;
                info!("Inserted chart: {}", descriptor.title);
            }
            Err(e) => warn!("Failed to insert chart {}: {e}", descriptor.title),
        }
    }
    let trailing = builder.current_paragraph();
    if builder.document().children(trailing).is_empty() {
        builder.document_mut().remove(trailing);
    }
    inserted
}
