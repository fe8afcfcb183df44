//! The conversion pipeline: validate, extract, load the template, merge, lay out, save.
//!
//! Only a missing input, a failed template load and a failed save abort a conversion.
//! Every other step is isolated: its failure is logged and the pipeline moves on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info, warn};

use crate::charts::ChartDescriptor;
use crate::config::AppConfig;
use crate::docx::{Document, LoadOptions, LoggingWarningCallback};
use crate::error::ConversionError;
use crate::layout::{configure_headers_and_footers, ensure_table_header_repetition, fix_heading_layout};
use crate::license::LicenseState;
use crate::merge::MergeEngine;
use crate::panic_handler::run_isolated;
use crate::parsing::{ChartScriptExtractor, HtmlNormalizer, HtmlReportExtractor};
use crate::report::StatusReport;
use crate::validation::{validate_html_file, validate_output_path};

pub const SUCCESS_MESSAGE: &str = "Conversion completed successfully!";
pub const FAILURE_MESSAGE: &str = "Conversion failed. Check logs for details.";

/// What a caller is shown. Details of a failure only go to the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub success: bool,
    pub status_message: String,
    pub evaluation_mode: bool,
}

/// Extracted content ready to be merged, possibly after user edits.
#[derive(Debug, Clone, Default)]
pub struct PreparedReport {
    pub report: StatusReport,
    pub charts: Vec<ChartDescriptor>,
}

pub struct ConversionService {
    config: AppConfig,
    license: LicenseState,
    engine: MergeEngine,
}

impl ConversionService {
    pub fn new(config: AppConfig, license: LicenseState) -> Self {
        let engine = MergeEngine::new(config.merge_policy, config.keywords.clone());
        Self {
            config,
            license,
            engine,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn evaluation_mode(&self) -> bool {
        self.license.evaluation_mode()
    }

    /// Validates both paths and extracts sections and charts from the input.
    pub fn prepare(&self, input: &Path, output: &Path) -> Result<PreparedReport, ConversionError> {
        validate_html_file(input, &self.config.validation_options())?;
        validate_output_path(output)?;

        let extractor = HtmlReportExtractor::new(self.config.keywords.clone());
        let mut report = extractor.extract(input);
        report.output_path = output.to_path_buf();

        let charts = run_isolated("chart extraction", || ChartScriptExtractor::default().extract_file(input))
            .unwrap_or_default();
        info!(
            "Prepared report: {} risk(s), {} chart(s)",
            report.risks.len(),
            charts.len()
        );
        Ok(PreparedReport { report, charts })
    }

    /// Loads the configured `.docx` template, or the input HTML cleaned by the normalizer
    /// (the raw input when normalization fails).
    fn load_template(&self, input: &Path) -> Result<Document, ConversionError> {
        if let Some(template) = &self.config.template_path {
            info!("Loading template {}", template.display());
            return Document::load_docx(template).map_err(|source| ConversionError::Load {
                path: template.clone(),
                source,
            });
        }

        let options = LoadOptions {
            base_uri: input.parent().map(Path::to_path_buf),
            warning_callback: Some(Box::new(LoggingWarningCallback)),
        };
        let cleaned = match HtmlNormalizer::preprocess_file(input) {
            Ok(cleaned) => Some(cleaned),
            Err(e) => {
                warn!("HTML preprocessing failed, using original file: {e}");
                None
            }
        };
        let source: PathBuf = cleaned
            .as_ref()
            .map_or_else(|| input.to_path_buf(), |c| c.path().to_path_buf());
        let loaded = Document::load_html(&source, &options).map_err(|source_error| ConversionError::Load {
            path: source.clone(),
            source: source_error,
        });
        if let Some(cleaned) = cleaned {
            cleaned.close();
        }
        loaded
    }

    /// Runs the merge pipeline for a prepared report and saves the result.
    pub fn convert(&self, prepared: &PreparedReport) -> Result<(), ConversionError> {
        let report = &prepared.report;
        let input = report.input_path.as_path();
        let output = report.output_path.as_path();
        if !input.is_file() {
            error!("Input HTML file not found: {}", input.display());
            return Err(ConversionError::InputMissing(input.to_path_buf()));
        }
        info!("Starting conversion from {} to {}", input.display(), output.display());

        let mut doc = self.load_template(input)?;

        if let Some(summary) = run_isolated("content merge", || self.engine.merge(&mut doc, report)) {
            info!(
                "Merged {} section(s), skipped {}, failed {}",
                summary.merged.len(),
                summary.skipped.len(),
                summary.failed.len()
            );
        }
        if !prepared.charts.is_empty() {
            let inserted = run_isolated("chart insertion", || self.engine.insert_charts(&mut doc, &prepared.charts));
            info!("Inserted {} of {} chart(s)", inserted.unwrap_or(0), prepared.charts.len());
        }
        match run_isolated("headers and footers", || {
            configure_headers_and_footers(&mut doc, &self.config.header_text)
        }) {
            Some(Err(e)) => error!("Error configuring document formatting: {e}"),
            Some(Ok(())) | None => {}
        }
        let layout = self.config.layout_options();
        run_isolated("heading layout", || fix_heading_layout(&mut doc, &layout));
        run_isolated("table headers", || ensure_table_header_repetition(&mut doc));

        validate_output_path(output)?;
        doc.save(output).map_err(|source| ConversionError::Save {
            path: output.to_path_buf(),
            source,
        })?;
        info!("Conversion completed successfully");
        Ok(())
    }

    fn outcome(&self, result: Result<(), ConversionError>) -> ConversionOutcome {
        let success = match result {
            Ok(()) => true,
            Err(e) => {
                error!("Error during document conversion: {e}");
                false
            }
        };
        ConversionOutcome {
            success,
            status_message: (if success { SUCCESS_MESSAGE } else { FAILURE_MESSAGE }).to_string(),
            evaluation_mode: self.evaluation_mode(),
        }
    }

    /// Prepares and converts in one go.
    pub fn run(&self, input: &Path, output: &Path) -> ConversionOutcome {
        let result = self.prepare(input, output).and_then(|prepared| self.convert(&prepared));
        self.outcome(result)
    }

    /// Converts on a blocking worker of the tokio runtime.
    pub async fn convert_in_background(self: Arc<Self>, prepared: PreparedReport) -> ConversionOutcome {
        let service = Arc::clone(&self);
        let result = tokio::task::spawn_blocking(move || service.convert(&prepared))
            .await
            .unwrap_or_else(|e| Err(ConversionError::Worker(e.to_string())));
        self.outcome(result)
    }
}
