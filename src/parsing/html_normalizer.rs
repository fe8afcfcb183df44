//! Cleans up report HTML before it is extracted from and rendered into the output document.
//!
//! Browsers tolerate vertical-text styles, invisible Unicode and right-to-left overrides
//! that turn into garbage once laid out as WordprocessingML. The normalizer removes those
//! while keeping the styles that carry table formatting.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use tempfile::TempDir;

use crate::error::DocumentError;
use crate::parsing::html_document::HtmlDocument;

static WRITING_MODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)writing-mode\s*:\s*[^;]+;?").unwrap());
static TRANSFORM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)transform\s*:\s*[^;]+;?").unwrap());
static TEXT_ORIENTATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)text-orientation\s*:\s*[^;]+;?").unwrap());
static DUPLICATE_SEMICOLONS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r";\s*;+").unwrap());
static ZERO_WIDTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{200B}-\u{200D}\u{FEFF}]").unwrap());
static INVISIBLE_SPACE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\u{2000}-\u{200F}\u{2028}-\u{202F}\u{205F}-\u{206F}]").unwrap()
});
static WHITESPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeStats {
    pub scripts_removed: usize,
    pub styles_cleaned: usize,
    pub text_nodes_cleaned: usize,
    pub rtl_overrides_removed: usize,
}

/// Cleaned copy of a report on disk. The file lives in a private temporary directory that
/// is deleted when this value is closed or dropped.
#[derive(Debug)]
pub struct CleanedHtml {
    path: PathBuf,
    dir: TempDir,
}

impl CleanedHtml {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the temporary file. Failures are logged, never returned.
    pub fn close(self) {
        let dir = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => debug!("Removed temporary file {}", self.path.display()),
            Err(e) => warn!("Failed to delete temporary directory {}: {e}", dir.display()),
        }
    }
}

pub struct HtmlNormalizer;

impl HtmlNormalizer {
    /// Applies every cleanup step to `doc` in place.
    pub fn normalize(doc: &HtmlDocument) -> NormalizeStats {
        let mut stats = NormalizeStats::default();

        // Style elements are kept: they carry table formatting.
        for script in doc.elements_by_tag("script") {
            script.detach();
            stats.scripts_removed += 1;
        }

        for node in doc.nodes() {
            let Some(style) = node.attr("style") else {
                continue;
            };
            if let Some(cleaned) = Self::clean_style(&style) {
                if cleaned.is_empty() {
                    node.remove_attr("style");
                } else {
                    node.set_attr("style", &cleaned);
                }
                stats.styles_cleaned += 1;
            }
        }

        for node in doc.nodes() {
            let Some(text) = node.text_contents() else {
                continue;
            };
            if text.trim().is_empty() {
                continue;
            }
            let cleaned = Self::clean_text(&text);
            if cleaned != text {
                node.set_text_contents(&cleaned);
                stats.text_nodes_cleaned += 1;
            }
        }

        if let Some(body) = doc.body() {
            body.set_attr("dir", "ltr");
            for node in doc.nodes() {
                if node
                    .attr("dir")
                    .is_some_and(|dir| dir.eq_ignore_ascii_case("rtl"))
                {
                    node.remove_attr("dir");
                    stats.rtl_overrides_removed += 1;
                }
            }
        }

        debug!("Normalized HTML: {stats:?}");
        stats
    }

    /// Returns the rewritten declaration list when `style` carries vertical-text or
    /// rotation declarations, `None` when it can stay as it is. An empty string means the
    /// attribute should go.
    pub fn clean_style(style: &str) -> Option<String> {
        let problematic = style.contains("writing-mode")
            || (style.contains("transform") && style.contains("rotate"))
            || style.contains("text-orientation");
        if !problematic {
            return None;
        }
        let cleaned = WRITING_MODE_RE.replace_all(style, "");
        let cleaned = TRANSFORM_RE.replace_all(&cleaned, "");
        let cleaned = TEXT_ORIENTATION_RE.replace_all(&cleaned, "");
        let cleaned = DUPLICATE_SEMICOLONS_RE.replace_all(&cleaned, ";");
        Some(cleaned.trim().to_string())
    }

    pub fn clean_text(text: &str) -> String {
        let text = ZERO_WIDTH_RE.replace_all(text, "");
        let text = text.replace('\u{00A0}', " ");
        let text = INVISIBLE_SPACE_RE.replace_all(&text, " ");
        WHITESPACE_RUN_RE.replace_all(&text, " ").into_owned()
    }

    /// Serializes the cleaned DOM to `cleaned_<source_name>` in a fresh temporary directory.
    pub fn write_cleaned(doc: &HtmlDocument, source_name: &str) -> Result<CleanedHtml, DocumentError> {
        let dir = tempfile::Builder::new()
            .prefix("reportmerge")
            .tempdir()
            .map_err(DocumentError::Write)?;
        let path = dir.path().join(format!("cleaned_{source_name}"));
        let html = doc.serialize()?;
        fs::write(&path, html).map_err(|e| DocumentError::io(&path, e))?;
        info!("HTML preprocessed and saved to: {}", path.display());
        Ok(CleanedHtml { path, dir })
    }

    /// Loads, normalizes and writes a cleaned copy of `input`.
    pub fn preprocess_file(input: &Path) -> Result<CleanedHtml, DocumentError> {
        let doc = HtmlDocument::load(input)?;
        Self::normalize(&doc);
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report.html".to_string());
        Self::write_cleaned(&doc, &name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_style_removes_vertical_text() {
        let cleaned =
            HtmlNormalizer::clean_style("color: red; writing-mode: vertical-rl; border: 1px")
                .unwrap();
        assert_eq!(cleaned, "color: red; border: 1px");
    }

    #[test]
    fn test_clean_style_leaves_plain_transform_alone() {
        assert!(HtmlNormalizer::clean_style("transform: scale(2)").is_none());
        assert_eq!(
            HtmlNormalizer::clean_style("transform: rotate(90deg);").as_deref(),
            Some("")
        );
    }

    #[test]
    fn test_clean_text_invisible_characters() {
        let text = "a\u{200B}b\u{00A0}c\u{2003}d   e\n\nf";
        assert_eq!(HtmlNormalizer::clean_text(text), "ab c d e f");
    }

    #[test]
    fn test_normalize_document() {
        let doc = HtmlDocument::parse(
            r#"<html><body dir="rtl"><p dir="rtl" style="text-orientation: upright">x&nbsp;y</p>
<script>new Chart(ctx, {})</script><style>td { border: 1px }</style></body></html>"#,
        )
        .unwrap();
        let stats = HtmlNormalizer::normalize(&doc);
        assert_eq!(stats.scripts_removed, 1);
        assert_eq!(stats.styles_cleaned, 1);
        assert!(stats.text_nodes_cleaned >= 1);

        let body = doc.body().unwrap();
        assert_eq!(body.attr("dir").as_deref(), Some("ltr"));
        let p = doc.elements_by_tag("p").remove(0);
        assert!(p.attr("dir").is_none());
        assert!(p.attr("style").is_none());
        assert_eq!(doc.elements_by_tag("style").len(), 1);
    }

    #[test]
    fn test_write_cleaned_and_close() {
        let doc = HtmlDocument::parse("<p>hello</p>").unwrap();
        let cleaned = HtmlNormalizer::write_cleaned(&doc, "report.html").unwrap();
        let path = cleaned.path().to_path_buf();
        assert!(path.ends_with("cleaned_report.html"));
        assert!(fs::read_to_string(&path).unwrap().contains("hello"));
        cleaned.close();
        assert!(!path.exists());
    }
}
