use thiserror::Error;

/// Only raised if a pattern fails to compile — i.e. a bug in this crate,
/// never a property of the input utterance.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern { pattern: String, source: regex::Error },
}

pub type Result<T> = std::result::Result<T, RouterError>;
