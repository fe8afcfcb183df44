use crate::docx::{DocumentBuilder, NodeId};
use crate::error::DocumentError;
use crate::report::RiskRecord;

pub const RISK_TABLE_HEADERS: [&str; 6] = [
    "ID",
    "Description",
    "Impact",
    "Mitigation",
    "Status",
    "Date Identified",
];

/// Column widths in points, matching [`RISK_TABLE_HEADERS`].
pub const RISK_COLUMN_WIDTHS: [f64; 6] = [50.0, 150.0, 100.0, 150.0, 70.0, 80.0];

fn risk_cells(risk: &RiskRecord) -> [String; 6] {
    [
        risk.id.clone(),
        risk.description.clone(),
        risk.impact.clone(),
        risk.mitigation.clone(),
        risk.status.as_str().to_string(),
        risk.short_date(),
    ]
}

/// Writes the risk table at the builder's cursor: a bold header row repeated on every page,
/// then one plain row per risk in order. Returns the table.
pub fn build_risk_table(builder: &mut DocumentBuilder, risks: &[RiskRecord]) -> Result<NodeId, DocumentError> {
    let table = builder.start_table()?;

    builder.font().bold = true;
    for (header, width) in RISK_TABLE_HEADERS.iter().zip(RISK_COLUMN_WIDTHS) {
        builder.insert_cell()?;
        builder.cell_format().width = Some(width);
        builder.write(header);
    }
    builder.row_format().heading_format = true;
    builder.end_row()?;
    builder.font().bold = false;

    for risk in risks {
        for (value, width) in risk_cells(risk).iter().zip(RISK_COLUMN_WIDTHS) {
            builder.insert_cell()?;
            builder.cell_format().width = Some(width);
            builder.write(value);
        }
        builder.end_row()?;
    }
    builder.end_table()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::{Document, NodeData};
    use chrono::{Local, TimeZone};

    #[test]
    fn test_header_row_and_records() {
        let mut first = RiskRecord::new("Vendor delay");
        first.impact = "High".to_string();
        first.date_identified = Local.with_ymd_and_hms(2024, 11, 2, 9, 0, 0).unwrap();
        let second = RiskRecord::new("Staffing");

        let mut doc = Document::new();
        let mut builder = DocumentBuilder::new(&mut doc);
        let table = build_risk_table(&mut builder, &[first.clone(), second]).unwrap();

        let rows = doc.children(table).to_vec();
        assert_eq!(rows.len(), 3);
        assert!(matches!(doc.data(rows[0]), NodeData::Row(f) if f.heading_format));
        assert!(matches!(doc.data(rows[1]), NodeData::Row(f) if !f.heading_format));

        let header_cells = doc.children(rows[0]).to_vec();
        assert_eq!(header_cells.len(), 6);
        assert_eq!(doc.text(header_cells[5]), "Date Identified");
        let header_paragraph = doc.children(header_cells[0])[0];
        assert!(doc.first_run_font(header_paragraph).unwrap().bold);

        let data_cells = doc.children(rows[1]).to_vec();
        assert_eq!(doc.text(data_cells[0]), first.id);
        assert_eq!(doc.text(data_cells[2]), "High");
        assert_eq!(doc.text(data_cells[4]), "Open");
        assert_eq!(doc.text(data_cells[5]), "11/2/2024");
        let data_paragraph = doc.children(data_cells[1])[0];
        assert!(!doc.first_run_font(data_paragraph).unwrap().bold);
        for (cell, width) in data_cells.iter().zip(RISK_COLUMN_WIDTHS) {
            assert!(matches!(doc.data(*cell), NodeData::Cell(f) if f.width == Some(width)));
        }
    }
}
