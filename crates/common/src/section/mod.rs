// Markdown section handling: heading parsing and block partitioning.

pub mod blocks;
pub mod parser;

pub use blocks::{split_blocks, SectionBlock, SectionedText};
pub use parser::{parse_sections, Section};
