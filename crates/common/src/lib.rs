// folio-common: shared document types and text utilities for the folio workspace

pub mod diff;
pub mod path;
pub mod section;
pub mod types;
