/// Simple fake report creator that writes HTML status reports and minimal DOCX templates
use std::fs;
use std::path::Path;

/// Configuration for a fake HTML status report
#[derive(Debug, Clone, Default)]
pub struct FakeReportConfig {
    pub title: String,
    pub current_week: Vec<String>,
    pub next_week: Vec<String>,
    /// Description, impact, mitigation, status
    pub risks: Vec<[String; 4]>,
    pub with_charts: bool,
}

impl FakeReportConfig {
    /// Two accomplishments, one goal, two risks, no charts
    pub fn weekly() -> Self {
        Self {
            title: "Enterprise AI Weekly Report".to_string(),
            current_week: vec![
                "Finished data pipeline migration".to_string(),
                "Onboarded two analysts".to_string(),
            ],
            next_week: vec!["Start model evaluation".to_string()],
            risks: vec![
                risk("GPU quota exhausted", "High", "Request increase", "Open"),
                risk("Vendor contract pending", "Medium", "Escalate to legal", "In Progress"),
            ],
            with_charts: false,
        }
    }
}

fn risk(description: &str, impact: &str, mitigation: &str, status: &str) -> [String; 4] {
    [
        description.to_string(),
        impact.to_string(),
        mitigation.to_string(),
        status.to_string(),
    ]
}

/// Chart.js snippet for the three dashboard charts
pub const CHART_SCRIPT: &str = r#"<canvas id="statusChart"></canvas>
<canvas id="valueChart"></canvas>
<script>
new Chart(document.getElementById('statusChart'), {
    type: 'doughnut',
    data: {
        labels: ['On Track', 'At Risk', 'Delayed'],
        datasets: [{ data: [15, 7, 3], backgroundColor: ['#28a745', '#ffc107', '#dc3545'] }]
    }
});
new Chart(document.getElementById('valueChart'), {
    type: 'bar',
    data: {
        labels: ['Q1', 'Q2'],
        datasets: [{ label: 'Value', data: [1.5, 2.25], backgroundColor: '#007bff' }]
    }
});
</script>"#;

/// Renders the report HTML for `config`
pub fn generate_report_html(config: &FakeReportConfig) -> String {
    let mut html = format!(
        r#"<!DOCTYPE html>
<html>
<head><title>{0}</title></head>
<body>
    <h1>{0}</h1>
    <h2>Current Week Accomplishments</h2>
    <ul>
"#,
        config.title
    );
    for item in &config.current_week {
        html.push_str(&format!("        <li>{item}</li>\n"));
    }
    html.push_str("    </ul>\n    <h2>Next Week Goals</h2>\n");
    for goal in &config.next_week {
        html.push_str(&format!("    <p>{goal}</p>\n"));
    }
    html.push_str(
        r#"    <h2>Risks and Issues</h2>
    <table>
        <tr><th>Description</th><th>Impact</th><th>Mitigation</th><th>Status</th></tr>
"#,
    );
    for [description, impact, mitigation, status] in &config.risks {
        html.push_str(&format!(
            "        <tr><td>{description}</td><td>{impact}</td><td>{mitigation}</td><td>{status}</td></tr>\n"
        ));
    }
    html.push_str("    </table>\n");
    if config.with_charts {
        html.push_str("    <h2>Visuals: Top 25 Initiative Analysis</h2>\n");
        html.push_str("    <p>Top 25 Initiative Status Distribution</p>\n");
        html.push_str(CHART_SCRIPT);
        html.push('\n');
    }
    html.push_str("</body>\n</html>\n");
    html
}

/// Writes the report HTML for `config` to `path`
pub fn create_fake_report_file<P: AsRef<Path>>(
    path: P,
    config: &FakeReportConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    fs::write(path, generate_report_html(config))?;
    Ok(())
}

/// Configuration for a fake DOCX template
#[derive(Debug, Clone, Default)]
pub struct FakeTemplateConfig {
    /// Heading level and text, each followed by `body_lines` Normal paragraphs
    pub headings: Vec<(u8, String)>,
    pub body_lines: usize,
    /// Adds a two-row table at the end of the body
    pub with_table: bool,
    pub header_text: Option<String>,
}

impl FakeTemplateConfig {
    pub fn weekly() -> Self {
        Self {
            headings: vec![
                (1, "Weekly Status".to_string()),
                (2, "This Week".to_string()),
                (2, "Next Week".to_string()),
                (2, "Risks".to_string()),
            ],
            body_lines: 1,
            with_table: true,
            header_text: Some("Template header".to_string()),
        }
    }
}

const WML: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

fn paragraph(style: Option<&str>, text: &str) -> String {
    let ppr = style
        .map(|s| format!(r#"<w:pPr><w:pStyle w:val="{s}"/></w:pPr>"#))
        .unwrap_or_default();
    format!(r#"<w:p>{ppr}<w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
}

/// Creates a minimal, valid DOCX file at the given path
pub fn create_template_docx<P: AsRef<Path>>(
    path: P,
    config: &FakeTemplateConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    use std::io::Write;
    use zip::write::FileOptions;

    let file = fs::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let header_override = if config.header_text.is_some() {
        r#"<Override PartName="/word/header1.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/>"#
    } else {
        ""
    };
    zip.start_file("[Content_Types].xml", options)?;
    zip.write_all(
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
    <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
    <Default Extension="xml" ContentType="application/xml"/>
    <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
    <Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/>
    {header_override}
</Types>"#
        )
        .as_bytes(),
    )?;

    zip.start_file("_rels/.rels", options)?;
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#,
    )?;

    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
    <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
"#,
    );
    if config.header_text.is_some() {
        rels.push_str(
            r#"    <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/>
"#,
        );
    }
    rels.push_str("</Relationships>");
    zip.start_file("word/_rels/document.xml.rels", options)?;
    zip.write_all(rels.as_bytes())?;

    zip.start_file("word/styles.xml", options)?;
    zip.write_all(
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="{WML}">
    <w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>
    <w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/><w:basedOn w:val="Normal"/></w:style>
    <w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/></w:style>
</w:styles>"#
        )
        .as_bytes(),
    )?;

    if let Some(text) = &config.header_text {
        zip.start_file("word/header1.xml", options)?;
        zip.write_all(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:hdr xmlns:w="{WML}" xmlns:r="{REL}">{}</w:hdr>"#,
                paragraph(None, text)
            )
            .as_bytes(),
        )?;
    }

    let mut body = String::new();
    for (level, text) in &config.headings {
        body.push_str(&paragraph(Some(&format!("Heading{level}")), text));
        for line in 0..config.body_lines {
            body.push_str(&paragraph(None, &format!("{text} note {}", line + 1)));
        }
    }
    if config.with_table {
        body.push_str(
            r#"<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/></w:tblPr><w:tblGrid><w:gridCol w:w="2000"/></w:tblGrid>"#,
        );
        for cell in ["Owner", "Alice"] {
            body.push_str(&format!("<w:tr><w:tc>{}</w:tc></w:tr>", paragraph(None, cell)));
        }
        body.push_str("</w:tbl>");
        body.push_str("<w:p/>");
    }
    let header_reference = if config.header_text.is_some() {
        r#"<w:headerReference w:type="default" r:id="rId2"/>"#
    } else {
        ""
    };
    zip.start_file("word/document.xml", options)?;
    zip.write_all(
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="{WML}" xmlns:r="{REL}"><w:body>{body}<w:sectPr>{header_reference}<w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#
        )
        .as_bytes(),
    )?;

    zip.finish()?;
    Ok(())
}

/// Create a report and a template in a directory, returning their paths
pub fn create_test_inputs_in_dir<P: AsRef<Path>>(
    dir: P,
    report: &FakeReportConfig,
    template: &FakeTemplateConfig,
) -> Result<(std::path::PathBuf, std::path::PathBuf), Box<dyn std::error::Error>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let report_path = dir.join("status_report.html");
    let template_path = dir.join("template.docx");
    create_fake_report_file(&report_path, report)?;
    create_template_docx(&template_path, template)?;
    Ok((report_path, template_path))
}
