//! Checks run on user-supplied paths before any document work.

use std::fs;
use std::path::Path;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

static UNSAFE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script([^>]*)>(.*?)</script>|<iframe[^>]*>.*?</iframe>").unwrap());
static TRAVERSAL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\.[\\/]").unwrap());
static SRC_ATTR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bsrc\s*=").unwrap());
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

const HTML_EXTENSIONS: [&str; 2] = ["html", "htm"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    /// Accept inline scripts that only construct charts, so chart data can be extracted.
    pub allow_chart_scripts: bool,
}

fn is_blank(path: &Path) -> bool {
    path.as_os_str().to_string_lossy().trim().is_empty()
}

fn has_traversal(path: &Path) -> bool {
    TRAVERSAL_RE.is_match(&path.to_string_lossy())
}

fn is_html_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .is_some_and(|ext| HTML_EXTENSIONS.contains(&ext.as_str()))
}

/// Whether raw HTML holds a script or iframe block the options do not allow.
pub fn contains_unsafe_content(html: &str, options: &ValidationOptions) -> bool {
    UNSAFE_BLOCK_RE.captures_iter(html).any(|caps| {
        let (Some(attributes), Some(body)) = (caps.get(1), caps.get(2)) else {
            // iframe
            return true;
        };
        let chart_only = options.allow_chart_scripts
            && !SRC_ATTR_RE.is_match(attributes.as_str())
            && body.as_str().contains("new Chart(");
        if chart_only {
            debug!("Allowing inline chart script");
        }
        !chart_only
    })
}

/// Validates the HTML input: non-empty, no traversal, exists, `.html`/`.htm`, and free of
/// script and iframe blocks.
pub fn validate_html_file(path: &Path, options: &ValidationOptions) -> Result<(), ValidationError> {
    if is_blank(path) {
        return Err(ValidationError::EmptyInputPath);
    }
    if has_traversal(path) {
        warn!("Rejected input path with traversal sequence");
        return Err(ValidationError::InputTraversal);
    }
    if !path.is_file() {
        return Err(ValidationError::NotFound(path.to_path_buf()));
    }
    if !is_html_extension(path) {
        return Err(ValidationError::NotHtml(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|source| ValidationError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    if contains_unsafe_content(&content, options) {
        warn!("Rejected {}: unsafe content", path.display());
        return Err(ValidationError::UnsafeContent(path.to_path_buf()));
    }
    Ok(())
}

/// Validates the output path and creates its parent directory when missing.
pub fn validate_output_path(path: &Path) -> Result<(), ValidationError> {
    if is_blank(path) {
        return Err(ValidationError::EmptyOutputPath);
    }
    if has_traversal(path) {
        warn!("Rejected output path with traversal sequence");
        return Err(ValidationError::OutputTraversal);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| ValidationError::OutputDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
            debug!("Created output directory {}", parent.display());
        }
    }
    Ok(())
}

/// Strips tags, escapes markup characters and trims.
pub fn sanitize_text(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }
    let stripped = TAG_RE.replace_all(input, "");
    html_escape::encode_quoted_attribute(&stripped)
        .replace("&#x27;", "&#39;")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_traversal_rejected_before_io() {
        let options = ValidationOptions::default();
        assert!(matches!(
            validate_html_file(Path::new("../missing/report.html"), &options),
            Err(ValidationError::InputTraversal)
        ));
        assert!(matches!(
            validate_html_file(Path::new(r"C:\reports\..\x.html"), &options),
            Err(ValidationError::InputTraversal)
        ));
        assert!(matches!(
            validate_output_path(Path::new("out/../../x.docx")),
            Err(ValidationError::OutputTraversal)
        ));
    }

    #[test]
    fn test_input_checks_in_order() {
        let dir = TempDir::new().unwrap();
        let options = ValidationOptions::default();
        assert!(matches!(validate_html_file(Path::new("  "), &options), Err(ValidationError::EmptyInputPath)));
        assert!(matches!(
            validate_html_file(&dir.path().join("absent.html"), &options),
            Err(ValidationError::NotFound(_))
        ));
        let text = write(&dir, "notes.txt", "<p>hi</p>");
        assert!(matches!(validate_html_file(&text, &options), Err(ValidationError::NotHtml(_))));
        let upper = write(&dir, "REPORT.HTM", "<p>hi</p>");
        assert!(validate_html_file(&upper, &options).is_ok());
    }

    #[test]
    fn test_script_and_iframe_blocks_are_unsafe() {
        let dir = TempDir::new().unwrap();
        let options = ValidationOptions::default();
        let script = write(&dir, "a.html", "<p>x</p><SCRIPT type=\"x\">\nalert(1)\n</script>");
        assert!(matches!(validate_html_file(&script, &options), Err(ValidationError::UnsafeContent(_))));
        let iframe = write(&dir, "b.html", "<iframe src=\"http://x\"></iframe>");
        assert!(matches!(validate_html_file(&iframe, &options), Err(ValidationError::UnsafeContent(_))));
    }

    #[test]
    fn test_chart_scripts_allowed_when_enabled() {
        let chart = "<script>new Chart(ctx, {type: 'pie'});</script>";
        let remote = "<script src=\"chart.js\">new Chart(ctx, {});</script>";
        let other = "<script>document.cookie</script>";
        let allow = ValidationOptions {
            allow_chart_scripts: true,
        };
        assert!(contains_unsafe_content(chart, &ValidationOptions::default()));
        assert!(!contains_unsafe_content(chart, &allow));
        assert!(contains_unsafe_content(remote, &allow));
        assert!(contains_unsafe_content(&format!("{chart}{other}"), &allow));
        assert!(contains_unsafe_content("<iframe></iframe>", &allow));
    }

    #[test]
    fn test_output_directory_created() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("nested/deeper/out.docx");
        validate_output_path(&output).unwrap();
        assert!(output.parent().unwrap().is_dir());
        assert!(matches!(validate_output_path(Path::new("")), Err(ValidationError::EmptyOutputPath)));
        assert!(validate_output_path(Path::new("out.docx")).is_ok());
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("  <b>Tom</b> & \"Jerry's\" <i>5 > 3</i> "), "Tom &amp; &quot;Jerry&#39;s&quot; 5 &gt; 3");
        assert_eq!(sanitize_text(" \t"), "");
    }
}
