use plotters::drawing::DrawingAreaErrorKind;
use thiserror::Error;

use crate::constants::TrackId;

#[derive(Error, Debug)]
pub enum MsdError {
    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Invalid configuration file: {0}")]
    ConfigError(#[from] toml::de::Error),

    #[error("Invalid file name pattern: {0}")]
    PatternError(#[from] regex::Error),

    #[error("Plot rendering failed: {0}")]
    PlotError(String),

    #[error("Unrecognized spot table header in {0}")]
    UnknownSpotTableLayout(String),

    #[error("Column {column} not found in {file}")]
    MissingColumn { file: String, column: String },

    #[error("Invalid value {value:?} in column {column} of {file}")]
    InvalidCell {
        file: String,
        column: String,
        value: String,
    },

    #[error("Columns of {file} differ from the first table ({expected:?} vs {found:?})")]
    HeaderMismatch {
        file: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Track {track} has a missing or non-finite position at sample {index}")]
    NonFinitePosition { track: TrackId, index: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unsupported detector: {0}")]
    UnsupportedDetector(String),

    #[error("Unable to open image: {0}")]
    ImageOpenError(String),

    #[error("Tracking backend failure: {0}")]
    TrackerFailure(String),
}

impl<E> From<DrawingAreaErrorKind<E>> for MsdError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        MsdError::PlotError(err.to_string())
    }
}

impl PartialEq for MsdError {
    fn eq(&self, other: &Self) -> bool {
        use MsdError::*;
        match (self, other) {
            // Wrapped library errors: equal if same variant
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (ConfigError(_), ConfigError(_)) => true,
            (PatternError(_), PatternError(_)) => true,

            (PlotError(a), PlotError(b)) => a == b,
            (UnknownSpotTableLayout(a), UnknownSpotTableLayout(b)) => a == b,
            (
                MissingColumn {
                    file: fa,
                    column: ca,
                },
                MissingColumn {
                    file: fb,
                    column: cb,
                },
            ) => fa == fb && ca == cb,
            (
                InvalidCell {
                    file: fa,
                    column: ca,
                    value: va,
                },
                InvalidCell {
                    file: fb,
                    column: cb,
                    value: vb,
                },
            ) => fa == fb && ca == cb && va == vb,
            (
                HeaderMismatch {
                    file: fa,
                    expected: ea,
                    found: xa,
                },
                HeaderMismatch {
                    file: fb,
                    expected: eb,
                    found: xb,
                },
            ) => fa == fb && ea == eb && xa == xb,
            (
                NonFinitePosition {
                    track: ta,
                    index: ia,
                },
                NonFinitePosition {
                    track: tb,
                    index: ib,
                },
            ) => ta == tb && ia == ib,
            (InvalidParameter(a), InvalidParameter(b)) => a == b,
            (UnsupportedDetector(a), UnsupportedDetector(b)) => a == b,
            (ImageOpenError(a), ImageOpenError(b)) => a == b,
            (TrackerFailure(a), TrackerFailure(b)) => a == b,

            _ => false,
        }
    }
}
