use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    ConfigValidation(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(String),

    #[error("failed to decode review response: {0}")]
    Decode(String),

    #[error("no field {0} in change JSON")]
    FieldMissing(String),

    #[error("invalid field {0} in change JSON: {1}")]
    FieldInvalid(String, String),

    #[error("process error: {0}")]
    Process(String),

    #[error("vcs error: {0}")]
    Vcs(String),

    #[error("timed out after {after:?}: {what}")]
    Timeout { what: String, after: Duration },

    #[error("working directory error: {0}")]
    Workdir(String),

    #[error("report error: {0}")]
    Report(String),

    #[error("lock error: {0}")]
    Lock(String),

    #[error("interrupted")]
    Interrupted,
}

impl Error {
    /// Errors that invalidate one author's batch but leave the rest of the run usable.
    pub fn is_batch_local(&self) -> bool {
        matches!(
            self,
            Error::FieldMissing(_) | Error::FieldInvalid(..) | Error::Decode(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
