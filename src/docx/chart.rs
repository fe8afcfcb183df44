use std::fmt::Write as _;

use html_escape::encode_text;

use crate::charts::ChartKind;
use crate::docx::xml::{CHART_NS, DML_NS, REL_NS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartType {
    Pie,
    Doughnut,
    Column,
    Line,
}

impl From<ChartKind> for ChartType {
    fn from(kind: ChartKind) -> Self {
        match kind {
            ChartKind::Pie => ChartType::Pie,
            ChartKind::Doughnut => ChartType::Doughnut,
            ChartKind::Bar | ChartKind::Column => ChartType::Column,
            ChartKind::Line => ChartType::Line,
        }
    }
}

impl ChartType {
    pub fn has_axes(self) -> bool {
        matches!(self, ChartType::Column | ChartType::Line)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LegendPosition {
    #[default]
    Right,
    Bottom,
    Top,
    Left,
    None,
}

impl LegendPosition {
    fn as_drawingml(self) -> Option<&'static str> {
        match self {
            LegendPosition::Right => Some("r"),
            LegendPosition::Bottom => Some("b"),
            LegendPosition::Top => Some("t"),
            LegendPosition::Left => Some("l"),
            LegendPosition::None => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataLabels {
    pub show_value: bool,
    pub show_percentage: bool,
    pub show_leader_lines: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartSeriesData {
    pub name: String,
    pub categories: Vec<String>,
    pub values: Vec<f64>,
    /// CSS colors per point. Entries that are not `#rgb`/`#rrggbb` are left to the theme.
    pub colors: Vec<String>,
    pub data_labels: Option<DataLabels>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub on: bool,
    /// `RRGGBB`.
    pub color: String,
    /// Points.
    pub weight: f64,
}

impl Default for Stroke {
    fn default() -> Self {
        Self {
            on: false,
            color: "000000".to_string(),
            weight: 0.75,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartShape {
    pub chart_type: ChartType,
    /// Points.
    pub width: f64,
    /// Points.
    pub height: f64,
    pub title: Option<String>,
    pub show_title: bool,
    pub series: Vec<ChartSeriesData>,
    pub legend: LegendPosition,
    pub axis_x_title: Option<String>,
    pub axis_y_title: Option<String>,
    pub stroke: Stroke,
}

impl ChartShape {
    pub fn new(chart_type: ChartType, width: f64, height: f64) -> Self {
        Self {
            chart_type,
            width,
            height,
            title: None,
            show_title: true,
            series: Vec::new(),
            legend: LegendPosition::default(),
            axis_x_title: None,
            axis_y_title: None,
            stroke: Stroke::default(),
        }
    }

    /// Adds a series. Category/value length mismatches are truncated to the shorter side.
    pub fn add_series(
        &mut self,
        name: &str,
        categories: &[String],
        values: &[f64],
    ) -> &mut ChartSeriesData {
        let len = categories.len().min(values.len());
        self.series.push(ChartSeriesData {
            name: name.to_string(),
            categories: categories[..len].to_vec(),
            values: values[..len].to_vec(),
            ..ChartSeriesData::default()
        });
        let last = self.series.len() - 1;
        &mut self.series[last]
    }

    /// The `c:chartSpace` part for this chart.
    pub fn to_chart_xml(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<c:chartSpace xmlns:c="{CHART_NS}" xmlns:a="{DML_NS}" xmlns:r="{REL_NS}"><c:roundedCorners val="0"/><c:chart>"#
        );
        match (&self.title, self.show_title) {
            (Some(title), true) => {
                out.push_str("<c:title>");
                write_rich_text(&mut out, title);
                out.push_str(r#"<c:overlay val="0"/></c:title><c:autoTitleDeleted val="0"/>"#);
            }
            _ => out.push_str(r#"<c:autoTitleDeleted val="1"/>"#),
        }

        out.push_str("<c:plotArea><c:layout/>");
        match self.chart_type {
            ChartType::Pie => {
                out.push_str(r#"<c:pieChart><c:varyColors val="1"/>"#);
                self.write_series(&mut out);
                out.push_str(r#"<c:firstSliceAng val="0"/></c:pieChart>"#);
            }
            ChartType::Doughnut => {
                out.push_str(r#"<c:doughnutChart><c:varyColors val="1"/>"#);
                self.write_series(&mut out);
                out.push_str(r#"<c:firstSliceAng val="0"/><c:holeSize val="50"/></c:doughnutChart>"#);
            }
            ChartType::Column => {
                out.push_str(
                    r#"<c:barChart><c:barDir val="col"/><c:grouping val="clustered"/><c:varyColors val="0"/>"#,
                );
                self.write_series(&mut out);
                out.push_str(r#"<c:gapWidth val="150"/><c:axId val="1"/><c:axId val="2"/></c:barChart>"#);
            }
            ChartType::Line => {
                out.push_str(r#"<c:lineChart><c:grouping val="standard"/><c:varyColors val="0"/>"#);
                self.write_series(&mut out);
                out.push_str(r#"<c:marker val="1"/><c:axId val="1"/><c:axId val="2"/></c:lineChart>"#);
            }
        }
        if self.chart_type.has_axes() {
            self.write_axes(&mut out);
        }
        out.push_str("</c:plotArea>");

        if let Some(position) = self.legend.as_drawingml() {
            let _ = write!(
                out,
                r#"<c:legend><c:legendPos val="{position}"/><c:overlay val="0"/></c:legend>"#
            );
        }
        out.push_str(r#"<c:plotVisOnly val="1"/></c:chart>"#);

        if self.stroke.on {
            let _ = write!(
                out,
                r#"<c:spPr><a:ln w="{}"><a:solidFill><a:srgbClr val="{}"/></a:solidFill></a:ln></c:spPr>"#,
                crate::docx::xml::emu(self.stroke.weight),
                self.stroke.color
            );
        }
        out.push_str("</c:chartSpace>");
        out
    }

    fn write_series(&self, out: &mut String) {
        for (index, series) in self.series.iter().enumerate() {
            let _ = write!(
                out,
                r#"<c:ser><c:idx val="{index}"/><c:order val="{index}"/><c:tx><c:v>{}</c:v></c:tx>"#,
                encode_text(&series.name)
            );
            match self.chart_type {
                ChartType::Column => out.push_str(r#"<c:invertIfNegative val="0"/>"#),
                ChartType::Line => out.push_str(r#"<c:marker><c:symbol val="circle"/></c:marker>"#),
                ChartType::Pie | ChartType::Doughnut => {}
            }
            for (point, color) in series.colors.iter().enumerate() {
                if point >= series.values.len() {
                    break;
                }
                let Some(rgb) = css_hex_color(color) else {
                    continue;
                };
                let _ = write!(
                    out,
                    r#"<c:dPt><c:idx val="{point}"/>{}<c:spPr><a:solidFill><a:srgbClr val="{rgb}"/></a:solidFill></c:spPr></c:dPt>"#,
                    match self.chart_type {
                        ChartType::Column => r#"<c:invertIfNegative val="0"/><c:bubble3D val="0"/>"#,
                        _ => r#"<c:bubble3D val="0"/>"#,
                    }
                );
            }
            if let Some(labels) = series.data_labels {
                let _ = write!(
                    out,
                    r#"<c:dLbls><c:showLegendKey val="0"/><c:showVal val="{}"/><c:showCatName val="0"/><c:showSerName val="0"/><c:showPercent val="{}"/><c:showBubbleSize val="0"/>"#,
                    u8::from(labels.show_value),
                    u8::from(labels.show_percentage)
                );
                if self.chart_type != ChartType::Column && self.chart_type != ChartType::Line {
                    let _ = write!(
                        out,
                        r#"<c:showLeaderLines val="{}"/>"#,
                        u8::from(labels.show_leader_lines)
                    );
                }
                out.push_str("</c:dLbls>");
            }

            let _ = write!(
                out,
                r#"<c:cat><c:strLit><c:ptCount val="{}"/>"#,
                series.categories.len()
            );
            for (i, category) in series.categories.iter().enumerate() {
                let _ = write!(out, r#"<c:pt idx="{i}"><c:v>{}</c:v></c:pt>"#, encode_text(category));
            }
            let _ = write!(
                out,
                r#"</c:strLit></c:cat><c:val><c:numLit><c:formatCode>General</c:formatCode><c:ptCount val="{}"/>"#,
                series.values.len()
            );
            for (i, value) in series.values.iter().enumerate() {
                let _ = write!(out, r#"<c:pt idx="{i}"><c:v>{value}</c:v></c:pt>"#);
            }
            out.push_str("</c:numLit></c:val>");
            if self.chart_type == ChartType::Line {
                out.push_str(r#"<c:smooth val="0"/>"#);
            }
            out.push_str("</c:ser>");
        }
    }

    fn write_axes(&self, out: &mut String) {
        out.push_str(
            r#"<c:catAx><c:axId val="1"/><c:scaling><c:orientation val="minMax"/></c:scaling><c:delete val="0"/><c:axPos val="b"/>"#,
        );
        if let Some(title) = &self.axis_x_title {
            write_axis_title(out, title);
        }
        out.push_str(
            r#"<c:numFmt formatCode="General" sourceLinked="0"/><c:tickLblPos val="nextTo"/><c:crossAx val="2"/><c:crosses val="autoZero"/><c:auto val="1"/><c:lblAlgn val="ctr"/><c:lblOffset val="100"/></c:catAx>"#,
        );
        out.push_str(
            r#"<c:valAx><c:axId val="2"/><c:scaling><c:orientation val="minMax"/></c:scaling><c:delete val="0"/><c:axPos val="l"/><c:majorGridlines/>"#,
        );
        if let Some(title) = &self.axis_y_title {
            write_axis_title(out, title);
        }
        out.push_str(
            r#"<c:numFmt formatCode="General" sourceLinked="0"/><c:tickLblPos val="nextTo"/><c:crossAx val="1"/><c:crosses val="autoZero"/><c:crossBetween val="between"/></c:valAx>"#,
        );
    }
}

fn write_rich_text(out: &mut String, text: &str) {
    let _ = write!(
        out,
        r#"<c:tx><c:rich><a:bodyPr/><a:lstStyle/><a:p><a:r><a:t>{}</a:t></a:r></a:p></c:rich></c:tx>"#,
        encode_text(text)
    );
}

fn write_axis_title(out: &mut String, title: &str) {
    out.push_str("<c:title>");
    write_rich_text(out, title);
    out.push_str(r#"<c:overlay val="0"/></c:title>"#);
}

/// `#abc` or `#aabbcc` as uppercase `AABBCC`.
pub fn css_hex_color(color: &str) -> Option<String> {
    let hex = color.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => Some(hex.chars().flat_map(|c| [c, c]).collect::<String>().to_ascii_uppercase()),
        6 => Some(hex.to_ascii_uppercase()),
        _ => None,
    }
}
