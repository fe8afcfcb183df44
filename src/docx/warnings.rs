use std::fmt;

use log::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    UnexpectedContent,
    MinorFormattingLoss,
    MajorFormattingLoss,
    Other,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WarningKind::UnexpectedContent => "UnexpectedContent",
            WarningKind::MinorFormattingLoss => "MinorFormattingLoss",
            WarningKind::MajorFormattingLoss => "MajorFormattingLoss",
            WarningKind::Other => "Other",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarningInfo {
    pub kind: WarningKind,
    pub description: String,
}

impl WarningInfo {
    pub fn new(kind: WarningKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }
}

/// Receives fidelity warnings raised while a document is loaded.
pub trait WarningCallback {
    fn warning(&self, info: &WarningInfo);
}

impl<F> WarningCallback for F
where
    F: Fn(&WarningInfo),
{
    fn warning(&self, info: &WarningInfo) {
        self(info)
    }
}

/// Routes warnings to the log, one level per kind.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingWarningCallback;

impl WarningCallback for LoggingWarningCallback {
    fn warning(&self, info: &WarningInfo) {
        match info.kind {
            WarningKind::UnexpectedContent => {
                warn!("Unexpected content warning: {}", info.description)
            }
            WarningKind::MinorFormattingLoss => {
                debug!("Minor formatting loss: {}", info.description)
            }
            WarningKind::MajorFormattingLoss => {
                warn!("Major formatting loss: {}", info.description)
            }
            WarningKind::Other => {
                info!("Conversion warning ({}): {}", info.kind, info.description)
            }
        }
    }
}
