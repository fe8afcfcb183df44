use reportmerge::docx::{Document, HeaderFooterKind, NodeData};
use reportmerge::parsing::HtmlReportExtractor;
use reportmerge::report::{RiskStatus, SectionKeywords};
use reportmerge::test_utils::simple_fake_reports::FakeReportConfig;
use reportmerge::test_utils::test_helpers::{TempReportDir, paragraph_texts};

#[test]
fn test_extraction_scenario() {
    let dir = TempReportDir::default();
    let report = HtmlReportExtractor::new(SectionKeywords::default()).extract(dir.report_path());

    let current: Vec<&str> = report.current_week_status.lines().collect();
    assert_eq!(
        current,
        vec!["• Finished data pipeline migration", "• Onboarded two analysts"]
    );
    let next: Vec<&str> = report.next_week_goals.lines().collect();
    assert_eq!(next, vec!["Start model evaluation"]);

    assert_eq!(report.risks.len(), 2);
    assert_eq!(report.risks[0].description, "GPU quota exhausted");
    assert_eq!(report.risks[1].description, "Vendor contract pending");
    assert_eq!(report.risks[1].status, RiskStatus::InProgress);
    assert_ne!(report.risks[0].id, report.risks[1].id);
}

#[test]
fn test_no_charts_in_plain_report() {
    let dir = TempReportDir::default();
    let service = dir.service(dir.config());
    let prepared = service.prepare(dir.report_path(), &dir.output_path()).unwrap();
    assert!(prepared.charts.is_empty());
    assert_eq!(prepared.report.output_path, dir.output_path());
}

#[test]
fn test_convert_html_to_docx() {
    let dir = TempReportDir::default();
    let outcome = dir.service(dir.config()).run(dir.report_path(), &dir.output_path());
    assert!(outcome.success, "{outcome:?}");
    assert_eq!(outcome.status_message, "Conversion completed successfully!");
    assert!(outcome.evaluation_mode);

    let doc = Document::load_docx(&dir.output_path()).unwrap();
    let texts = paragraph_texts(&doc);
    assert!(texts.iter().any(|t| t == "Start model evaluation"));

    let tables = doc.tables();
    assert_eq!(tables.len(), 2, "source table plus generated risk table");
    for table in &tables {
        let first = doc.first_row(*table).unwrap();
        assert!(matches!(doc.data(first), NodeData::Row(f) if f.heading_format));
    }
    let risk_rows = doc.children(tables[1]).to_vec();
    assert_eq!(risk_rows.len(), 3);
    let header_cells = doc.children(risk_rows[0]).to_vec();
    assert_eq!(doc.text(header_cells[5]), "Date Identified");
    let first_risk = doc.children(risk_rows[1]).to_vec();
    assert_eq!(doc.text(first_risk[1]), "GPU quota exhausted");
    assert_eq!(doc.text(first_risk[4]), "Open");

    let heading = doc
        .paragraphs()
        .into_iter()
        .find(|p| doc.text(*p) == "Risks and Issues")
        .unwrap();
    let format = doc.paragraph_format(heading).unwrap();
    assert!(format.keep_with_next);
    assert_eq!(format.space_before, Some(12.0));

    let header = doc.header_footer(HeaderFooterKind::HeaderPrimary).unwrap();
    assert!(doc.text(header).contains("Enterprise AI Status Report"));
    assert!(doc.header_footer(HeaderFooterKind::FooterPrimary).is_some());
}

#[test]
fn test_charts_replace_placeholders() {
    let report = FakeReportConfig {
        with_charts: true,
        ..FakeReportConfig::weekly()
    };
    let dir = TempReportDir::new(&report).unwrap();
    let mut config = dir.config();

    let rejected = dir.service(config.clone()).run(dir.report_path(), &dir.output_path());
    assert!(!rejected.success, "scripts are unsafe unless chart scripts are allowed");

    config.allow_chart_scripts = true;
    let service = dir.service(config);
    let prepared = service.prepare(dir.report_path(), &dir.output_path()).unwrap();
    assert_eq!(prepared.charts.len(), 2);
    assert_eq!(prepared.charts[0].labels, vec!["On Track", "At Risk", "Delayed"]);
    assert_eq!(prepared.charts[1].series[0].values, vec![1.5, 2.25]);
    service.convert(&prepared).unwrap();

    let file = std::fs::File::open(dir.output_path()).unwrap();
    let archive = zip::ZipArchive::new(file).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    assert!(names.contains(&"word/charts/chart1.xml"));
    assert!(names.contains(&"word/charts/chart2.xml"));

    let doc = Document::load_docx(&dir.output_path()).unwrap();
    let titles = paragraph_texts(&doc)
        .into_iter()
        .filter(|t| t == "Top 25 Initiative Status Distribution")
        .count();
    assert_eq!(titles, 1, "placeholder removed, chart title written once");
}
