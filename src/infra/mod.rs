//! Side-effecting adapters: filesystem assets, PDF conversion, SMTP and telemetry.

pub mod assets;
pub mod error;
pub mod pdf;
pub mod smtp;
pub mod telemetry;
