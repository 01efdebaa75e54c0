use thiserror::Error;

use crate::{
    application::render::RenderError, domain::error::DomainError, infra::error::InfraError,
};

/// Everything that can abort a run. No variant is retried.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("missing value(s) for placeholder(s): {}", names.join(", "))]
    MissingValue { names: Vec<String> },
    #[error("missing asset `{name}` in {dir}")]
    MissingAsset { name: String, dir: String },
    #[error("pdf conversion failed: {0}")]
    Conversion(String),
    #[error("email delivery failed: {0}")]
    Delivery(String),
    #[error(transparent)]
    Render(RenderError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Stable identifier used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Configuration(_) => "configuration",
            AppError::MissingValue { .. } => "missing_value",
            AppError::MissingAsset { .. } => "missing_asset",
            AppError::Conversion(_) => "conversion",
            AppError::Delivery(_) => "delivery",
            AppError::Render(_) => "render",
            AppError::Io(_) => "io",
            AppError::Unexpected(_) => "unexpected",
        }
    }
}

impl From<DomainError> for AppError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::MissingValues { names } => AppError::MissingValue { names },
            other => AppError::Configuration(other.to_string()),
        }
    }
}

impl From<RenderError> for AppError {
    fn from(error: RenderError) -> Self {
        match error {
            RenderError::MissingValues { names } => AppError::MissingValue { names },
            other => AppError::Render(other),
        }
    }
}

impl From<InfraError> for AppError {
    fn from(error: InfraError) -> Self {
        match error {
            InfraError::Io(err) => AppError::Io(err),
            InfraError::MissingAsset { name, dir } => AppError::MissingAsset { name, dir },
            InfraError::Conversion { message } => AppError::Conversion(message),
            InfraError::Delivery { message } => AppError::Delivery(message),
            InfraError::Telemetry(message) => AppError::Unexpected(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_onto_the_run_taxonomy() {
        let missing = AppError::from(DomainError::MissingValues {
            names: vec!["total".into(), "client".into()],
        });
        assert_eq!(missing.kind(), "missing_value");
        assert_eq!(
            missing.to_string(),
            "missing value(s) for placeholder(s): total, client"
        );

        let unit = AppError::from(DomainError::invalid_unit("year"));
        assert_eq!(unit.kind(), "configuration");
        assert!(unit.to_string().contains("year"));
    }

    #[test]
    fn infra_errors_keep_their_context() {
        let err = AppError::from(InfraError::missing_asset("missing.png", "template/assets"));
        assert_eq!(err.kind(), "missing_asset");
        assert!(err.to_string().contains("missing.png"));

        let err = AppError::from(InfraError::delivery("535 authentication failed"));
        assert_eq!(err.kind(), "delivery");
    }
}
