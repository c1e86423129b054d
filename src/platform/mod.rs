/// Common cross-platform file utilities
pub mod common;
