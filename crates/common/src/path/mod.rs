// Document path handling: normalization, root containment, file naming.

pub mod normalize;
pub mod slug;

pub use normalize::{normalize_path, resolve_within, PathError};
pub use slug::{document_file_name, slugify};
