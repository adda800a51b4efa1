use thiserror::Error;

/// Errors raised while compiling filter patterns.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid regular expression in filter '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
