use serde::{Deserialize, Serialize};

/// Section of the output document charts are meant for.
pub const VISUALS_HINT: &str = "Visuals";

/// A chart the dashboard is known to render, keyed by its canvas id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownChart {
    pub id: &'static str,
    pub title: &'static str,
    pub kind: ChartKind,
}

/// Extraction order is this order.
pub const KNOWN_CHARTS: [KnownChart; 3] = [
    KnownChart {
        id: "statusChart",
        title: "Top 25 Initiative Status Distribution",
        kind: ChartKind::Doughnut,
    },
    KnownChart {
        id: "valueChart",
        title: "Top 25 Value Analysis",
        kind: ChartKind::Bar,
    },
    KnownChart {
        id: "categoryChart",
        title: "Top 25 AI Category Analysis",
        kind: ChartKind::Pie,
    },
];

pub fn is_known_chart_title(text: &str) -> bool {
    let text = text.trim();
    KNOWN_CHARTS
        .iter()
        .any(|chart| chart.title.eq_ignore_ascii_case(text))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartKind {
    #[default]
    Pie,
    Doughnut,
    Bar,
    Column,
    Line,
}

impl ChartKind {
    /// Maps a Chart.js `type:` value.
    pub fn from_script_type(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pie" => Some(ChartKind::Pie),
            "doughnut" => Some(ChartKind::Doughnut),
            "bar" => Some(ChartKind::Bar),
            "column" => Some(ChartKind::Column),
            "line" => Some(ChartKind::Line),
            _ => None,
        }
    }

    pub fn is_circular(self) -> bool {
        matches!(self, ChartKind::Pie | ChartKind::Doughnut)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub label: String,
    pub values: Vec<f64>,
    pub colors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartDescriptor {
    pub title: String,
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub series: Vec<ChartSeries>,
    pub insertion_hint: String,
}

impl ChartDescriptor {
    /// Label/value pairs of one series. Length mismatches are tolerated: the shorter side wins.
    pub fn points(&self, series_index: usize) -> Vec<(&str, f64)> {
        let Some(series) = self.series.get(series_index) else {
            return Vec::new();
        };
        self.labels
            .iter()
            .map(String::as_str)
            .zip(series.values.iter().copied())
            .collect()
    }

    pub fn has_data(&self) -> bool {
        self.series.iter().any(|s| !s.values.is_empty())
    }
}
