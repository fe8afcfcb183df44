pub mod chart_script;
pub mod html_document;
pub mod html_normalizer;
pub mod section_extractor;

pub use chart_script::ChartScriptExtractor;
pub use html_document::{HtmlDocument, HtmlNode};
pub use html_normalizer::{CleanedHtml, HtmlNormalizer, NormalizeStats};
pub use section_extractor::{HtmlReportExtractor, extract_risk_table, extract_section};
