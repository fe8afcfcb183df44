use reportmerge::docx::{Document, HeaderFooterKind, NodeData};
use reportmerge::layout::ensure_table_header_repetition;
use reportmerge::merge::{MergeEngine, SectionMergePolicy};
use reportmerge::report::{SectionKeywords, StatusReport};
use reportmerge::test_utils::simple_fake_reports::{FakeReportConfig, FakeTemplateConfig, create_template_docx};
use reportmerge::test_utils::test_helpers::{TempReportDir, body_texts};
use tempfile::TempDir;

fn template_dir() -> TempReportDir {
    TempReportDir::with_template(&FakeReportConfig::weekly(), &FakeTemplateConfig::weekly()).unwrap()
}

#[test]
fn test_empty_report_leaves_template_unchanged() {
    let dir = template_dir();
    let mut doc = Document::load_docx(dir.template_path().unwrap()).unwrap();
    let before = body_texts(&doc);
    let tables = doc.tables();

    let summary = MergeEngine::default().merge(&mut doc, &StatusReport::default());
    assert!(summary.merged.is_empty());
    assert_eq!(body_texts(&doc), before);
    assert_eq!(doc.tables(), tables);
}

#[test]
fn test_merge_into_template() {
    let dir = template_dir();
    let outcome = dir.service(dir.config()).run(dir.report_path(), &dir.output_path());
    assert!(outcome.success, "{outcome:?}");

    let doc = Document::load_docx(&dir.output_path()).unwrap();
    let texts = body_texts(&doc);
    let this_week = texts.iter().position(|t| t == "This Week").unwrap();
    assert_eq!(
        &texts[this_week + 1..this_week + 6],
        &[
            "This Week note 1",
            "",
            "• Finished data pipeline migration",
            "• Onboarded two analysts",
            "Next Week",
        ]
    );

    let tables = doc.tables();
    assert_eq!(tables.len(), 2);
    let template_first_row = doc.first_row(tables[0]).unwrap();
    assert!(matches!(doc.data(template_first_row), NodeData::Row(f) if f.heading_format));
    assert_eq!(doc.children(tables[1]).len(), 3);

    let header = doc.header_footer(HeaderFooterKind::HeaderPrimary).unwrap();
    let header_text = doc.text(header);
    assert!(header_text.starts_with("Template header"));
    assert!(header_text.contains("Enterprise AI Status Report"));
}

#[test]
fn test_replace_policy_drops_template_notes() {
    let dir = template_dir();
    let mut config = dir.config();
    config.merge_policy = SectionMergePolicy::ReplaceExisting;
    assert!(dir.service(config).run(dir.report_path(), &dir.output_path()).success);

    let doc = Document::load_docx(&dir.output_path()).unwrap();
    let texts = body_texts(&doc);
    assert!(!texts.iter().any(|t| t == "This Week note 1"));
    assert!(!texts.iter().any(|t| t == "Risks note 1"));
    assert!(texts.iter().any(|t| t == "Weekly Status note 1"));
    assert_eq!(doc.tables().len(), 1, "template table sat inside the risks section");
}

#[test]
fn test_header_repetition_counts_every_table() {
    let scratch = TempDir::new().unwrap();
    let path = scratch.path().join("t.docx");
    create_template_docx(&path, &FakeTemplateConfig::weekly()).unwrap();
    let mut doc = Document::load_docx(&path).unwrap();

    let engine = MergeEngine::new(SectionMergePolicy::Append, SectionKeywords::default());
    let mut report = StatusReport::default();
    report.add_risk();
    engine.merge(&mut doc, &report);

    assert_eq!(ensure_table_header_repetition(&mut doc), 2);
    for table in doc.tables() {
        let first = doc.first_row(table).unwrap();
        assert!(matches!(doc.data(first), NodeData::Row(f) if f.heading_format));
    }
}
