use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Raised while building a Transformer; never from transform() itself
    #[error("Invalid rule set '{set}': {reason}")]
    InvalidRuleSet { set: String, reason: String },
    #[error("Filter '{0}' is already registered")]
    DuplicateFilter(String),
    #[error("Malformed XML: {0}")]
    Xml(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
