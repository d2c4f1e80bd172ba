//! Output formatting for CLI.

mod json;
mod text;

pub use json::{BulkOutput, CleanOutput, JsonFormatter, ProfileOutput};
pub use text::TextFormatter;
#[cfg(test)]
mod tests;
