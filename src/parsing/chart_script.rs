//! Recovers chart data from Chart.js initialisation code embedded in a report.
//!
//! Scripts are never executed. The configuration object literal of a `new Chart(...)` call is
//! located by bracket matching and only the handful of keys the output needs are read from it.

use std::fs;
use std::path::Path;

use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::charts::{ChartDescriptor, ChartKind, ChartSeries, KNOWN_CHARTS, KnownChart, VISUALS_HINT};

static CONSTRUCTOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"new\s+Chart\s*\(").unwrap());
static LABELS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\blabels\s*:\s*\[").unwrap());
static DATASETS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bdatasets\s*:\s*\[").unwrap());
static DATA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bdata\s*:\s*\[").unwrap());
static COLORS_LIST_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bbackgroundColor\s*:\s*\[").unwrap());
static COLOR_SINGLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\bbackgroundColor\s*:\s*(?:'([^']*)'|"([^"]*)")"#).unwrap());
static LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\blabel\s*:\s*(?:'([^']*)'|"([^"]*)")"#).unwrap());
static TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\btype\s*:\s*['"]([A-Za-z]+)['"]"#).unwrap());
static SCRIPT_BODY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>(.*?)</script>").unwrap());
static CANVAS_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)<canvas\b[^>]*\bid\s*=\s*(?:'([^']*)'|"([^"]*)")"#).unwrap());
static QUOTED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"'([^']*)'|"([^"]*)""#).unwrap());

/// Slice from the bracket at `open` through its matching closer. Quoted strings are skipped.
fn balanced(text: &str, open: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if !matches!(bytes.get(open), Some(b'{' | b'[' | b'(')) {
        return None;
    }
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut escaped = false;
    for (offset, &byte) in bytes[open..].iter().enumerate() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == q {
                quote = None;
            }
            continue;
        }
        match byte {
            b'\'' | b'"' | b'`' => quote = Some(byte),
            b'{' | b'[' | b'(' => depth += 1,
            b'}' | b']' | b')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[open..=open + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits on commas that are outside quotes and nested brackets.
fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '{' | '[' | '(' => depth += 1,
            '}' | ']' | ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn inner(delimited: &str) -> &str {
    &delimited[1..delimited.len() - 1]
}

/// The bracketed list following the first match of `re` (which must end at the `[`).
fn list_after<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    let m = re.find(text)?;
    balanced(text, m.end() - 1).map(inner)
}

fn quoted_strings(list: &str) -> Vec<String> {
    QUOTED_RE
        .captures_iter(list)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn first_quoted(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str().to_string())
}

/// Comma-separated numbers. Tokens that do not parse count as zero.
fn numbers(list: &str) -> Vec<f64> {
    split_top_level(list)
        .into_iter()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| token.parse::<f64>().unwrap_or(0.0))
        .collect()
}

fn series_from_object(object: &str, fallback_label: &str) -> ChartSeries {
    let colors = match list_after(&COLORS_LIST_RE, object) {
        Some(list) => quoted_strings(list),
        None => first_quoted(&COLOR_SINGLE_RE, object).into_iter().collect(),
    };
    ChartSeries {
        label: first_quoted(&LABEL_RE, object).unwrap_or_else(|| fallback_label.to_string()),
        values: list_after(&DATA_RE, object).map(numbers).unwrap_or_default(),
        colors,
    }
}

/// Reads a Chart.js configuration object literal into a descriptor.
pub fn parse_chart_config(config: &str, title: &str, default_kind: ChartKind) -> ChartDescriptor {
    let kind = TYPE_RE
        .captures(config)
        .and_then(|c| ChartKind::from_script_type(&c[1]))
        .unwrap_or(default_kind);
    let labels = list_after(&LABELS_RE, config)
        .map(quoted_strings)
        .unwrap_or_default();

    let series = match list_after(&DATASETS_RE, config) {
        Some(datasets) => split_top_level(datasets)
            .into_iter()
            .map(str::trim)
            .filter(|object| object.starts_with('{'))
            .map(|object| series_from_object(object, title))
            .collect(),
        None => vec![series_from_object(config, title)],
    };

    ChartDescriptor {
        title: title.to_string(),
        kind,
        labels,
        series,
        insertion_hint: VISUALS_HINT.to_string(),
    }
}

/// Byte ranges of inline script bodies. Text without any `<script>` element is treated as
/// one script.
fn script_ranges(html: &str) -> Vec<(usize, usize)> {
    let ranges: Vec<(usize, usize)> = SCRIPT_BODY_RE
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| (m.start(), m.end()))
        .collect();
    if ranges.is_empty() && !html.contains("<script") {
        vec![(0, html.len())]
    } else {
        ranges
    }
}

/// Start offsets of every `new Chart(` call with its argument text.
fn constructor_calls(html: &str) -> Vec<(usize, &str)> {
    CONSTRUCTOR_RE
        .find_iter(html)
        .filter_map(|m| {
            let args = balanced(html, m.end() - 1)?;
            Some((m.start(), inner(args)))
        })
        .collect()
}

/// Index of the call bound to `chart_id`.
///
/// In order of preference:
/// 1. the first call whose first argument mentions the id;
/// 2. the first call after the id's first quoted occurrence inside script text
///    (`getElementById('<id>')` and the like);
/// 3. when only a `<canvas>` declares the id, canvases declared back to back before a run
///    of calls pair with those calls in order.
fn bound_call(html: &str, calls: &[(usize, &str)], chart_id: &str) -> Option<usize> {
    if let Some(index) = calls.iter().position(|(_, args)| {
        split_top_level(args)
            .first()
            .is_some_and(|first| first.contains(chart_id))
    }) {
        return Some(index);
    }

    let id_re = Regex::new(&format!(r#"['"]{}['"]"#, regex::escape(chart_id))).ok()?;
    let in_script = script_ranges(html).into_iter().find_map(|(start, end)| {
        id_re.find(&html[start..end]).map(|m| start + m.start())
    });
    if let Some(anchor) = in_script {
        return calls.iter().position(|(start, _)| *start > anchor);
    }

    let canvases: Vec<(usize, &str)> = CANVAS_ID_RE
        .captures_iter(html)
        .filter_map(|c| {
            let whole = c.get(0)?;
            let id = c.get(1).or_else(|| c.get(2))?;
            Some((whole.start(), id.as_str()))
        })
        .collect();
    let &(anchor, _) = canvases.iter().find(|(_, id)| *id == chart_id)?;
    let first_call = calls.iter().position(|(start, _)| *start > anchor)?;
    let run_start = first_call
        .checked_sub(1)
        .map_or(0, |previous| calls[previous].0);
    let ordinal = canvases
        .iter()
        .filter(|(start, _)| *start >= run_start && *start < anchor)
        .count();
    let paired = first_call + ordinal;
    Some(if paired < calls.len() { paired } else { first_call })
}

/// The `{...}` configuration of the `new Chart(` call bound to `chart_id`.
pub fn find_chart_config<'a>(html: &'a str, chart_id: &str) -> Option<&'a str> {
    let calls = constructor_calls(html);
    let (_, args) = calls[bound_call(html, &calls, chart_id)?];

    let parts = split_top_level(args);
    if parts.len() < 2 {
        return None;
    }
    let rest = &args[parts[0].len() + 1..];
    let open = rest.find('{')?;
    if !rest[..open].trim().is_empty() {
        return None;
    }
    balanced(rest, open)
}

pub struct ChartScriptExtractor {
    charts: Vec<KnownChart>,
}

impl Default for ChartScriptExtractor {
    fn default() -> Self {
        Self {
            charts: KNOWN_CHARTS.to_vec(),
        }
    }
}

impl ChartScriptExtractor {
    pub fn with_charts(charts: Vec<KnownChart>) -> Self {
        Self { charts }
    }

    /// Descriptors for every known chart present in `html`, in registration order.
    pub fn extract(&self, html: &str) -> Vec<ChartDescriptor> {
        let charts: Vec<ChartDescriptor> = self
            .charts
            .iter()
            .filter_map(|known| self.extract_one(html, known))
            .collect();
        info!("Extracted {} charts from HTML", charts.len());
        charts
    }

    pub fn extract_file(&self, path: &Path) -> Vec<ChartDescriptor> {
        match fs::read(path) {
            Ok(bytes) => self.extract(&String::from_utf8_lossy(&bytes)),
            Err(e) => {
                error!("Error extracting chart data from {}: {e}", path.display());
                Vec::new()
            }
        }
    }

    fn extract_one(&self, html: &str, known: &KnownChart) -> Option<ChartDescriptor> {
        let Some(config) = find_chart_config(html, known.id) else {
            warn!("Could not find chart data for {}", known.id);
            return None;
        };
        let chart = parse_chart_config(config, known.title, known.kind);
        info!(
            "Extracted chart: {} with {} data points",
            chart.title,
            chart.series.first().map_or(0, |s| s.values.len())
        );
        Some(chart)
    }
}
