pub mod charts;
pub mod config;
pub mod converter;
pub mod docx;
pub mod error;
pub mod layout;
pub mod license;
pub mod logging;
pub mod merge;
pub mod panic_handler;
pub mod parsing;
pub mod report;
pub mod structure;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use charts::{ChartDescriptor, ChartKind, ChartSeries};
pub use config::AppConfig;
pub use converter::{ConversionOutcome, ConversionService, PreparedReport};
pub use docx::{Document, DocumentBuilder};
pub use error::{ConversionError, DocumentError, ValidationError};
pub use license::LicenseState;
pub use merge::{MergeEngine, MergeSummary, SectionMergePolicy};
pub use report::{RiskRecord, RiskStatus, SectionContent, SectionKeywordSet, StatusReport};
