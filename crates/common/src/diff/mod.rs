// Line-level text diffing.

pub mod unified;

pub use unified::{line_edits, unified_diff, LineEdit};
