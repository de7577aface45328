use thiserror::Error;

/// Hard failures while loading shape data. Any of these aborts the whole
/// load: partial shape data is unsafe to match trips against.
#[derive(Debug, Error)]
pub enum ShapeLoadError {
    #[error("failed to parse {file}")]
    Parse {
        file: String,
        #[source]
        source: csv::Error,
    },

    #[error("{file} is missing required column '{column}'")]
    MissingColumn { file: String, column: &'static str },
}
