use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("asset `{name}` not found in {dir}")]
    MissingAsset { name: String, dir: String },
    #[error("pdf conversion failed: {message}")]
    Conversion { message: String },
    #[error("email delivery failed: {message}")]
    Delivery { message: String },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn missing_asset(name: impl Into<String>, dir: impl Into<String>) -> Self {
        Self::MissingAsset {
            name: name.into(),
            dir: dir.into(),
        }
    }

    pub fn conversion(message: impl Into<String>) -> Self {
        Self::Conversion {
            message: message.into(),
        }
    }

    pub fn delivery(message: impl Into<String>) -> Self {
        Self::Delivery {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
