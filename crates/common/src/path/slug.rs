// Title slugs and document file names.

/// Fallback file stem for titles with no ASCII alphanumerics.
const UNTITLED_STEM: &str = "untitled";

/// Maximum slug length; long titles are cut at a hyphen boundary.
const MAX_SLUG_CHARS: usize = 80;

/// Convert a title or heading into a lowercase, hyphen-separated slug.
///
/// Returns an empty string when the input has no ASCII alphanumerics.
pub fn slugify(text: &str) -> String {
    let raw: String = text
        .trim()
        .to_lowercase()
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '-' })
        .collect();

    raw.split('-').filter(|part| !part.is_empty()).collect::<Vec<_>>().join("-")
}

/// File name for a document created from `title`.
///
/// `attempt` 1 yields `<slug>.md`; later attempts add a numeric suffix so
/// colliding titles map to distinct files (`<slug>-2.md`, `<slug>-3.md`, …).
pub fn document_file_name(title: &str, attempt: usize) -> String {
    let mut slug = slugify(title);
    if slug.len() > MAX_SLUG_CHARS {
        let cut = slug[..MAX_SLUG_CHARS].rfind('-').unwrap_or(MAX_SLUG_CHARS);
        slug.truncate(cut);
    }
    if slug.is_empty() {
        slug = UNTITLED_STEM.to_string();
    }

    if attempt <= 1 {
        format!("{slug}.md")
    } else {
        format!("{slug}-{attempt}.md")
    }
}
