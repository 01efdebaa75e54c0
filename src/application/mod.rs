//! Application services: rendering, artifact output, email assembly and run orchestration.

pub mod email;
pub mod error;
pub mod invoice;
pub mod output;
pub mod render;
