use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::parsing::HtmlDocument;
use crate::structure::StructuralNode;

/// Marker prefixed to every list item when lists are flattened into section text.
pub const BULLET_MARKER: &str = "• ";

static LINE_BREAKS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n]+").unwrap());
static LEADING_WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t\f\v]+").unwrap());

/// The three logical regions of a status report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportSection {
    CurrentWeek,
    NextWeek,
    Risks,
}

impl ReportSection {
    pub const ALL: [ReportSection; 3] = [
        ReportSection::CurrentWeek,
        ReportSection::NextWeek,
        ReportSection::Risks,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            ReportSection::CurrentWeek => "current week status",
            ReportSection::NextWeek => "next week goals",
            ReportSection::Risks => "risks",
        }
    }
}

/// Case-insensitive substrings identifying a section heading.
///
/// A heading matches when its lowercased text contains any keyword. Keywords are stored
/// lowercased so matching never allocates per keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct SectionKeywordSet(Vec<String>);

impl From<Vec<String>> for SectionKeywordSet {
    fn from(keywords: Vec<String>) -> Self {
        Self::new(keywords)
    }
}

impl From<SectionKeywordSet> for Vec<String> {
    fn from(set: SectionKeywordSet) -> Self {
        set.0
    }
}

impl SectionKeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        )
    }

    pub fn current_week() -> Self {
        Self::new(["current week", "this week"])
    }

    pub fn next_week() -> Self {
        Self::new(["next week", "upcoming"])
    }

    pub fn risks() -> Self {
        Self::new(["risk", "risks"])
    }

    pub fn for_section(section: ReportSection) -> Self {
        match section {
            ReportSection::CurrentWeek => Self::current_week(),
            ReportSection::NextWeek => Self::next_week(),
            ReportSection::Risks => Self::risks(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.0
    }

    /// True when `text` (any case) contains one of the keywords.
    pub fn matches(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.0.iter().any(|keyword| lowered.contains(keyword.as_str()))
    }
}

/// Keyword sets for all three sections, configurable as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionKeywords {
    pub current_week: SectionKeywordSet,
    pub next_week: SectionKeywordSet,
    pub risks: SectionKeywordSet,
}

impl Default for SectionKeywords {
    fn default() -> Self {
        Self {
            current_week: SectionKeywordSet::current_week(),
            next_week: SectionKeywordSet::next_week(),
            risks: SectionKeywordSet::risks(),
        }
    }
}

impl SectionKeywords {
    pub fn get(&self, section: ReportSection) -> &SectionKeywordSet {
        match section {
            ReportSection::CurrentWeek => &self.current_week,
            ReportSection::NextWeek => &self.next_week,
            ReportSection::Risks => &self.risks,
        }
    }
}

/// Normalized text of one section.
///
/// Whitespace-only content is indistinguishable from absent content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct SectionContent(String);

impl SectionContent {
    /// Collapses line-break runs to `\n`, drops leading indentation of every line and trims
    /// the whole block. `raw` is taken as plain text; `<` and `>` are kept.
    pub fn new(raw: &str) -> Self {
        let text = LINE_BREAKS_RE.replace_all(raw, "\n");
        let text = LEADING_WS_RE.replace_all(&text, "");
        Self(text.trim().to_string())
    }

    /// Text of an HTML fragment, tags dropped and entities decoded.
    pub fn from_markup(raw: &str) -> Self {
        match HtmlDocument::parse(raw) {
            Ok(doc) => Self::new(&doc.body().map(|body| body.text()).unwrap_or_default()),
            Err(e) => {
                log::warn!("Could not parse section markup, keeping it as text: {e}");
                Self::new(raw)
            }
        }
    }

    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = lines
            .into_iter()
            .map(|line| line.as_ref().trim().to_string())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        Self::new(&joined)
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.0.lines().filter(|line| !line.trim().is_empty())
    }
}

impl From<String> for SectionContent {
    fn from(value: String) -> Self {
        SectionContent::new(&value)
    }
}

impl From<SectionContent> for String {
    fn from(value: SectionContent) -> Self {
        value.0
    }
}

impl fmt::Display for SectionContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskStatus {
    #[default]
    Open,
    #[serde(rename = "In Progress")]
    InProgress,
    Mitigated,
    Closed,
}

impl RiskStatus {
    /// Lenient parse of a table cell. Blank cells are `Open`; unknown words are `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let normalized: String = text
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match normalized.as_str() {
            "" | "open" | "new" => Some(RiskStatus::Open),
            "inprogress" | "ongoing" | "active" => Some(RiskStatus::InProgress),
            "mitigated" => Some(RiskStatus::Mitigated),
            "closed" | "resolved" | "done" => Some(RiskStatus::Closed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskStatus::Open => "Open",
            RiskStatus::InProgress => "In Progress",
            RiskStatus::Mitigated => "Mitigated",
            RiskStatus::Closed => "Closed",
        }
    }
}

impl fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Eight lowercase hex characters, the same shape as a truncated GUID.
pub fn generate_risk_id() -> String {
    format!("{:08x}", rand::random::<u32>())
}

fn default_risk_id() -> String {
    generate_risk_id()
}

fn default_date() -> DateTime<Local> {
    Local::now()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    #[serde(default = "default_risk_id")]
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub impact: String,
    #[serde(default)]
    pub mitigation: String,
    #[serde(default)]
    pub status: RiskStatus,
    #[serde(default = "default_date")]
    pub date_identified: DateTime<Local>,
}

impl Default for RiskRecord {
    fn default() -> Self {
        Self {
            id: generate_risk_id(),
            description: String::new(),
            impact: String::new(),
            mitigation: String::new(),
            status: RiskStatus::Open,
            date_identified: Local::now(),
        }
    }
}

impl RiskRecord {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    /// `M/D/YYYY`, the short date shown in the risk table.
    pub fn short_date(&self) -> String {
        self.date_identified.format("%-m/%-d/%Y").to_string()
    }
}

/// Everything one conversion needs: paths plus extracted (and possibly edited) content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub current_week_status: SectionContent,
    pub next_week_goals: SectionContent,
    pub risks: Vec<RiskRecord>,
}

impl StatusReport {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            ..Self::default()
        }
    }

    pub fn section_text(&self, section: ReportSection) -> Option<&SectionContent> {
        match section {
            ReportSection::CurrentWeek => Some(&self.current_week_status),
            ReportSection::NextWeek => Some(&self.next_week_goals),
            ReportSection::Risks => None,
        }
    }

    /// Replaces a text section with user-edited content, which may carry markup. Risks are
    /// edited per record.
    pub fn set_section(&mut self, section: ReportSection, text: &str) {
        match section {
            ReportSection::CurrentWeek => self.current_week_status = SectionContent::from_markup(text),
            ReportSection::NextWeek => self.next_week_goals = SectionContent::from_markup(text),
            ReportSection::Risks => {
                log::warn!("Risks are edited per record, ignoring free text for that section")
            }
        }
    }

    pub fn has_content(&self, section: ReportSection) -> bool {
        match section {
            ReportSection::CurrentWeek => !self.current_week_status.is_empty(),
            ReportSection::NextWeek => !self.next_week_goals.is_empty(),
            ReportSection::Risks => !self.risks.is_empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        ReportSection::ALL
            .iter()
            .all(|section| !self.has_content(*section))
    }

    /// Appends a blank risk and returns its generated id.
    pub fn add_risk(&mut self) -> String {
        let risk = RiskRecord::default();
        let id = risk.id.clone();
        log::info!("Added new risk: {id}");
        self.risks.push(risk);
        id
    }

    pub fn remove_risk(&mut self, id: &str) -> Option<RiskRecord> {
        let index = self.risks.iter().position(|risk| risk.id == id)?;
        let removed = self.risks.remove(index);
        log::info!("Deleted risk: {id}");
        Some(removed)
    }

    pub fn risk_mut(&mut self, id: &str) -> Option<&mut RiskRecord> {
        self.risks.iter_mut().find(|risk| risk.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_section_content_normalizes_lines() {
        let content = SectionContent::new("  first line\r\n\r\n   second\n\n\nthird  ");
        assert_eq!(content.as_str(), "first line\nsecond\nthird");
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn test_section_content_keeps_angle_brackets() {
        let content = SectionContent::from_lines(["Latency < 5ms and throughput > 100 rps"]);
        assert_eq!(content.as_str(), "Latency < 5ms and throughput > 100 rps");
    }

    #[test]
    fn test_edited_section_drops_markup() {
        let mut report = StatusReport::default();
        report.set_section(ReportSection::CurrentWeek, "<b>Done</b> with <i>migration</i> &amp; tests");
        assert_eq!(report.current_week_status.as_str(), "Done with migration & tests");
        report.set_section(ReportSection::NextWeek, "p95 < 5ms\nship");
        assert_eq!(report.next_week_goals.as_str(), "p95 < 5ms\nship");
    }

    #[test]
    fn test_whitespace_only_content_is_empty() {
        assert!(SectionContent::new(" \n\t \r\n").is_empty());
        assert!(SectionContent::default().is_empty());
    }

    #[test]
    fn test_keyword_set_is_case_insensitive() {
        let keywords = SectionKeywordSet::new(["Current Week"]);
        assert!(keywords.matches("CURRENT WEEK ACCOMPLISHMENTS"));
        assert!(!keywords.matches("Next week"));
    }

    #[test]
    fn test_risk_status_parse() {
        assert_eq!(RiskStatus::parse(""), Some(RiskStatus::Open));
        assert_eq!(RiskStatus::parse("In Progress"), Some(RiskStatus::InProgress));
        assert_eq!(RiskStatus::parse("in-progress"), Some(RiskStatus::InProgress));
        assert_eq!(RiskStatus::parse("CLOSED"), Some(RiskStatus::Closed));
        assert_eq!(RiskStatus::parse("escalated"), None);
    }

    #[test]
    fn test_generated_ids_are_eight_hex_chars() {
        let id = generate_risk_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_short_date_format() {
        let mut risk = RiskRecord::new("Vendor delay");
        risk.date_identified = Local.with_ymd_and_hms(2024, 3, 7, 10, 0, 0).unwrap();
        assert_eq!(risk.short_date(), "3/7/2024");
    }

    #[test]
    fn test_risk_editing() {
        let mut report = StatusReport::default();
        assert!(report.is_empty());

        let id = report.add_risk();
        report.risk_mut(&id).unwrap().description = "Budget overrun".to_string();
        assert!(report.has_content(ReportSection::Risks));

        assert!(report.remove_risk(&id).is_some());
        assert!(report.remove_risk(&id).is_none());
        assert!(report.is_empty());
    }

    #[test]
    fn test_report_json_roundtrip_keeps_edits() {
        let mut report = StatusReport::new("in.html", "out.docx");
        report.set_section(ReportSection::CurrentWeek, "• Shipped v2\n• Closed audit");
        report.risks.push(RiskRecord::new("Staffing"));

        let json = serde_json::to_string(&report).unwrap();
        let restored: StatusReport = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, report);
    }

    #[test]
    fn test_edited_risk_json_without_id_gets_one() {
        let json = r#"{"description": "Late hardware", "status": "In Progress"}"#;
        let risk: RiskRecord = serde_json::from_str(json).unwrap();
        assert_eq!(risk.id.len(), 8);
        assert_eq!(risk.status, RiskStatus::InProgress);
    }
}
