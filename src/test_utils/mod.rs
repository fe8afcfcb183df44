pub mod simple_fake_reports;

pub mod test_helpers {
    use std::path::{Path, PathBuf};

    use super::simple_fake_reports::{
        FakeReportConfig, FakeTemplateConfig, create_fake_report_file, create_template_docx,
    };
    use crate::config::AppConfig;
    use crate::converter::ConversionService;
    use crate::docx::Document;
    use crate::license::LicenseState;

    /// Scratch directory holding a fake report, an optional template and the output
    pub struct TempReportDir {
        temp_dir: tempfile::TempDir,
        report_path: PathBuf,
        template_path: Option<PathBuf>,
    }

    impl TempReportDir {
        pub fn new(report: &FakeReportConfig) -> Result<Self, Box<dyn std::error::Error>> {
            let temp_dir = tempfile::TempDir::new()?;
            let report_path = temp_dir.path().join("status_report.html");
            create_fake_report_file(&report_path, report)?;
            Ok(Self {
                temp_dir,
                report_path,
                template_path: None,
            })
        }

        pub fn with_template(
            report: &FakeReportConfig,
            template: &FakeTemplateConfig,
        ) -> Result<Self, Box<dyn std::error::Error>> {
            let mut dir = Self::new(report)?;
            let template_path = dir.temp_dir.path().join("template.docx");
            create_template_docx(&template_path, template)?;
            dir.template_path = Some(template_path);
            Ok(dir)
        }

        pub fn path(&self) -> &Path {
            self.temp_dir.path()
        }

        pub fn report_path(&self) -> &Path {
            &self.report_path
        }

        pub fn template_path(&self) -> Option<&Path> {
            self.template_path.as_deref()
        }

        pub fn output_path(&self) -> PathBuf {
            self.temp_dir.path().join("out").join("status_report.docx")
        }

        /// Configuration pointing at this directory's template, if any
        pub fn config(&self) -> AppConfig {
            AppConfig {
                template_path: self.template_path.clone(),
                log_path: self.temp_dir.path().join("logs"),
                ..AppConfig::default()
            }
        }

        pub fn service(&self, config: AppConfig) -> ConversionService {
            ConversionService::new(config, LicenseState::evaluation())
        }
    }

    impl Default for TempReportDir {
        fn default() -> Self {
            Self::new(&FakeReportConfig::weekly()).expect("Failed to create temporary report")
        }
    }

    /// Text of every body-level node, in order
    pub fn body_texts(doc: &Document) -> Vec<String> {
        doc.children(doc.body()).iter().map(|n| doc.text(*n)).collect()
    }

    /// Text of every paragraph, table paragraphs included, in order
    pub fn paragraph_texts(doc: &Document) -> Vec<String> {
        doc.paragraphs().iter().map(|p| doc.text(*p)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::simple_fake_reports::*;
    use super::test_helpers::*;

    #[test]
    fn test_fake_report_layout() {
        let html = generate_report_html(&FakeReportConfig::weekly());
        assert!(html.contains("<li>Onboarded two analysts</li>"));
        assert_eq!(html.matches("<tr>").count(), 3);
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_template_dir() {
        let dir = TempReportDir::with_template(&FakeReportConfig::weekly(), &FakeTemplateConfig::weekly()).unwrap();
        assert!(dir.report_path().is_file());
        assert!(dir.template_path().unwrap().is_file());
        assert_eq!(dir.config().template_path.as_deref(), dir.template_path());
    }
}
