//! Paragraph, run, row and cell formatting plus their WordprocessingML property elements.
//!
//! Only the properties the merge and layout passes touch are modelled. Everything else a
//! template carries is kept verbatim in `preserved` and written back in schema order.

use std::fmt::Write as _;

use html_escape::encode_double_quoted_attribute;

use crate::docx::xml::twips;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StyleId {
    #[default]
    Normal,
    Heading(u8),
    Title,
    ListParagraph,
    Other(String),
}

impl StyleId {
    pub fn from_style_id(id: &str) -> Self {
        if let Some(level) = id
            .strip_prefix("Heading")
            .and_then(|rest| rest.parse::<u8>().ok())
            .filter(|level| (1..=9).contains(level))
        {
            return StyleId::Heading(level);
        }
        match id {
            "Normal" => StyleId::Normal,
            "Title" => StyleId::Title,
            "ListParagraph" => StyleId::ListParagraph,
            other => StyleId::Other(other.to_string()),
        }
    }

    pub fn style_id(&self) -> String {
        match self {
            StyleId::Normal => "Normal".to_string(),
            StyleId::Heading(level) => format!("Heading{level}"),
            StyleId::Title => "Title".to_string(),
            StyleId::ListParagraph => "ListParagraph".to_string(),
            StyleId::Other(id) => id.clone(),
        }
    }

    pub fn heading_level(&self) -> Option<u8> {
        match self {
            StyleId::Heading(level) => Some(*level),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn from_wml(value: &str) -> Option<Self> {
        match value {
            "left" | "start" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            "both" | "distribute" => Some(Alignment::Justify),
            _ => None,
        }
    }

    pub fn from_css(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "start" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            "justify" => Some(Alignment::Justify),
            _ => None,
        }
    }

    pub fn as_wml(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "both",
        }
    }
}

/// Unmodelled property element: local name plus its serialized XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreservedProperty {
    pub name: String,
    pub xml: String,
}

const PPR_ORDER: &[&str] = &[
    "pStyle",
    "keepNext",
    "keepLines",
    "pageBreakBefore",
    "framePr",
    "widowControl",
    "numPr",
    "suppressLineNumbers",
    "pBdr",
    "shd",
    "tabs",
    "suppressAutoHyphens",
    "kinsoku",
    "wordWrap",
    "overflowPunct",
    "topLinePunct",
    "autoSpaceDE",
    "autoSpaceDN",
    "bidi",
    "adjustRightInd",
    "snapToGrid",
    "spacing",
    "ind",
    "contextualSpacing",
    "mirrorIndents",
    "suppressOverlap",
    "jc",
    "textDirection",
    "textAlignment",
    "textboxTightWrap",
    "outlineLvl",
    "divId",
    "cnfStyle",
    "rPr",
    "sectPr",
    "pPrChange",
];

const RPR_ORDER: &[&str] = &[
    "rStyle",
    "rFonts",
    "b",
    "bCs",
    "i",
    "iCs",
    "caps",
    "smallCaps",
    "strike",
    "dstrike",
    "outline",
    "shadow",
    "emboss",
    "imprint",
    "noProof",
    "snapToGrid",
    "vanish",
    "webHidden",
    "color",
    "spacing",
    "w",
    "kern",
    "position",
    "sz",
    "szCs",
    "highlight",
    "u",
    "effect",
    "bdr",
    "shd",
    "fitText",
    "vertAlign",
    "rtl",
    "cs",
    "em",
    "lang",
    "eastAsianLayout",
    "specVanish",
    "oMath",
];

fn order_of(order: &[&str], name: &str) -> usize {
    order.iter().position(|n| *n == name).unwrap_or(order.len())
}

/// Writes `known` and `preserved` property elements interleaved in schema order.
fn write_properties(
    out: &mut String,
    tag: &str,
    order: &[&str],
    known: Vec<(&'static str, String)>,
    preserved: &[PreservedProperty],
) {
    let mut elements: Vec<(usize, &str)> = known
        .iter()
        .map(|(name, xml)| (order_of(order, name), xml.as_str()))
        .collect();
    elements.extend(
        preserved
            .iter()
            .filter(|p| !known.iter().any(|(name, _)| *name == p.name))
            .map(|p| (order_of(order, &p.name), p.xml.as_str())),
    );
    if elements.is_empty() {
        return;
    }
    elements.sort_by_key(|(index, _)| *index);
    let _ = write!(out, "<w:{tag}>");
    for (_, xml) in elements {
        out.push_str(xml);
    }
    let _ = write!(out, "</w:{tag}>");
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParagraphFormat {
    pub style: StyleId,
    pub alignment: Option<Alignment>,
    pub keep_with_next: bool,
    pub page_break_before: bool,
    /// Points.
    pub space_before: Option<f64>,
    /// Points.
    pub space_after: Option<f64>,
    pub preserved: Vec<PreservedProperty>,
}

impl ParagraphFormat {
    pub fn with_style(style: StyleId) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    pub fn write_ppr(&self, out: &mut String) {
        let mut known: Vec<(&'static str, String)> = Vec::new();
        if self.style != StyleId::Normal {
            known.push((
                "pStyle",
                format!(r#"<w:pStyle w:val="{}"/>"#, encode_double_quoted_attribute(&self.style.style_id())),
            ));
        }
        if self.keep_with_next {
            known.push(("keepNext", "<w:keepNext/>".to_string()));
        }
        if self.page_break_before {
            known.push(("pageBreakBefore", "<w:pageBreakBefore/>".to_string()));
        }
        if self.space_before.is_some() || self.space_after.is_some() {
            let mut spacing = String::from("<w:spacing");
            if let Some(before) = self.space_before {
                let _ = write!(spacing, r#" w:before="{}""#, twips(before));
            }
            if let Some(after) = self.space_after {
                let _ = write!(spacing, r#" w:after="{}""#, twips(after));
            }
            // Line spacing attributes of a preserved element would be lost otherwise.
            if let Some(line) = self
                .preserved
                .iter()
                .find(|p| p.name == "spacing")
                .and_then(|p| line_attributes(&p.xml))
            {
                spacing.push_str(&line);
            }
            spacing.push_str("/>");
            known.push(("spacing", spacing));
        }
        if let Some(alignment) = self.alignment {
            known.push(("jc", format!(r#"<w:jc w:val="{}"/>"#, alignment.as_wml())));
        }
        write_properties(out, "pPr", PPR_ORDER, known, &self.preserved);
    }
}

fn line_attributes(spacing_xml: &str) -> Option<String> {
    let mut extra = String::new();
    for attr in ["w:line=", "w:lineRule="] {
        if let Some(start) = spacing_xml.find(attr) {
            let rest = &spacing_xml[start..];
            let quote = rest[attr.len()..].chars().next()?;
            let end = rest[attr.len() + 1..].find(quote)?;
            let _ = write!(extra, " {}", &rest[..attr.len() + 2 + end]);
        }
    }
    (!extra.is_empty()).then_some(extra)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Font {
    pub bold: bool,
    pub italic: bool,
    /// Points.
    pub size: Option<f64>,
    pub name: Option<String>,
    pub preserved: Vec<PreservedProperty>,
}

impl Font {
    pub fn bold() -> Self {
        Self {
            bold: true,
            ..Self::default()
        }
    }

    pub fn write_rpr(&self, out: &mut String) {
        let mut known: Vec<(&'static str, String)> = Vec::new();
        if let Some(name) = &self.name {
            let name = encode_double_quoted_attribute(name);
            known.push((
                "rFonts",
                format!(r#"<w:rFonts w:ascii="{name}" w:hAnsi="{name}" w:cs="{name}"/>"#),
            ));
        }
        if self.bold {
            known.push(("b", "<w:b/>".to_string()));
        }
        if self.italic {
            known.push(("i", "<w:i/>".to_string()));
        }
        if let Some(size) = self.size {
            let half_points = (size * 2.0).round() as i64;
            known.push(("sz", format!(r#"<w:sz w:val="{half_points}"/>"#)));
            known.push(("szCs", format!(r#"<w:szCs w:val="{half_points}"/>"#)));
        }
        write_properties(out, "rPr", RPR_ORDER, known, &self.preserved);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFormat {
    /// Repeat this row at the top of every page the table spans.
    pub heading_format: bool,
    pub preserved: Vec<PreservedProperty>,
}

const TRPR_ORDER: &[&str] = &[
    "cnfStyle",
    "divId",
    "gridBefore",
    "gridAfter",
    "wBefore",
    "wAfter",
    "cantSplit",
    "trHeight",
    "tblHeader",
    "tblCellSpacing",
    "jc",
    "hidden",
];

impl RowFormat {
    pub fn write_trpr(&self, out: &mut String) {
        let mut known = Vec::new();
        if self.heading_format {
            known.push(("tblHeader", "<w:tblHeader/>".to_string()));
        }
        write_properties(out, "trPr", TRPR_ORDER, known, &self.preserved);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellFormat {
    /// Preferred width in points.
    pub width: Option<f64>,
    pub preserved: Vec<PreservedProperty>,
}

const TCPR_ORDER: &[&str] = &[
    "cnfStyle",
    "tcW",
    "gridSpan",
    "hMerge",
    "vMerge",
    "tcBorders",
    "shd",
    "noWrap",
    "tcMar",
    "textDirection",
    "tcFitText",
    "vAlign",
    "hideMark",
];

impl CellFormat {
    pub fn write_tcpr(&self, out: &mut String) {
        let mut known = Vec::new();
        if let Some(width) = self.width {
            known.push(("tcW", format!(r#"<w:tcW w:w="{}" w:type="dxa"/>"#, twips(width))));
        }
        write_properties(out, "tcPr", TCPR_ORDER, known, &self.preserved);
    }
}

/// Table-level properties and grid of a loaded table. Generated tables leave this empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableFormat {
    pub preserved: Vec<PreservedProperty>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_id_roundtrip() {
        assert_eq!(StyleId::from_style_id("Heading2"), StyleId::Heading(2));
        assert_eq!(StyleId::Heading(2).style_id(), "Heading2");
        assert_eq!(
            StyleId::from_style_id("Caption"),
            StyleId::Other("Caption".to_string())
        );
        assert_eq!(StyleId::from_style_id("HeadingX").heading_level(), None);
    }

    #[test]
    fn test_ppr_is_written_in_schema_order() {
        let format = ParagraphFormat {
            style: StyleId::Heading(1),
            keep_with_next: true,
            space_before: Some(12.0),
            space_after: Some(6.0),
            alignment: Some(Alignment::Center),
            preserved: vec![PreservedProperty {
                name: "numPr".to_string(),
                xml: r#"<w:numPr><w:numId w:val="3"/></w:numPr>"#.to_string(),
            }],
            ..ParagraphFormat::default()
        };
        let mut out = String::new();
        format.write_ppr(&mut out);
        let style = out.find("pStyle").unwrap();
        let keep = out.find("keepNext").unwrap();
        let num = out.find("numPr").unwrap();
        let spacing = out.find(r#"w:before="240""#).unwrap();
        let jc = out.find("<w:jc").unwrap();
        assert!(style < keep && keep < num && num < spacing && spacing < jc);
    }

    #[test]
    fn test_plain_paragraph_writes_no_ppr() {
        let mut out = String::new();
        ParagraphFormat::default().write_ppr(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_modelled_spacing_keeps_preserved_line_rule() {
        let format = ParagraphFormat {
            space_after: Some(6.0),
            preserved: vec![PreservedProperty {
                name: "spacing".to_string(),
                xml: r#"<w:spacing w:after="0" w:line="276" w:lineRule="auto"/>"#.to_string(),
            }],
            ..ParagraphFormat::default()
        };
        let mut out = String::new();
        format.write_ppr(&mut out);
        assert_eq!(
            out,
            r#"<w:pPr><w:spacing w:after="120" w:line="276" w:lineRule="auto"/></w:pPr>"#
        );
    }

    #[test]
    fn test_font_rpr() {
        let font = Font {
            bold: true,
            size: Some(11.0),
            name: Some("Arial".to_string()),
            ..Font::default()
        };
        let mut out = String::new();
        font.write_rpr(&mut out);
        assert_eq!(
            out,
            r#"<w:rPr><w:rFonts w:ascii="Arial" w:hAnsi="Arial" w:cs="Arial"/><w:b/><w:sz w:val="22"/><w:szCs w:val="22"/></w:rPr>"#
        );
    }
}
