use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("configuration error: {message}")]
    Configuration { message: String },
    #[error("interval unit `{unit}` is not one of `day`, `week`, `month`")]
    InvalidUnit { unit: String },
    #[error("no value supplied for placeholder(s): {}", names.join(", "))]
    MissingValues { names: Vec<String> },
}

impl DomainError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn invalid_unit(unit: impl Into<String>) -> Self {
        Self::InvalidUnit { unit: unit.into() }
    }
}
