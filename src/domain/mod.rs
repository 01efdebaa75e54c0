//! Pure invoice types and rules: placeholders, values, recurrence and asset references.

pub mod assets;
pub mod error;
pub mod placeholders;
pub mod recurrence;
pub mod values;
