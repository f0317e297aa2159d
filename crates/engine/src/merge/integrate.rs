// Section-aware integration of new content into an existing document.
//
// Sections are matched by exact heading text. A matched section keeps its
// body and gains an "Updated Findings" sub-section; unmatched sections are
// appended at the end of the document.

use chrono::{DateTime, Utc};
use folio_common::section::{split_blocks, SectionedText};

use crate::error::MergeError;

pub(crate) const UPDATED_FINDINGS: &str = "Updated Findings";

#[derive(Debug)]
pub(crate) struct Integrated {
    pub content: String,
    pub operations: Vec<String>,
}

pub(crate) fn integrate(
    existing: &str,
    incoming: &str,
    now: DateTime<Utc>,
) -> Result<Integrated, MergeError> {
    let mut base = split_blocks(existing);
    if !base.has_headings() {
        return Err(MergeError::Unsectionable { side: "existing" });
    }
    let incoming = split_blocks(incoming);
    if !incoming.has_headings() {
        return Err(MergeError::Unsectionable { side: "new" });
    }

    let stamp = now.format("%Y-%m-%d %H:%M UTC").to_string();
    let mut operations = Vec::new();

    merge_preamble(&mut base, &incoming.preamble, &mut operations);

    let mut taken: Vec<usize> = Vec::new();
    for block in &incoming.blocks {
        match base.position_of(&block.heading, &taken) {
            Some(index) => {
                taken.push(index);
                let target = &mut base.blocks[index];
                let addition = block.body.trim();
                if addition.is_empty() || target.body.contains(addition) {
                    operations.push(format!("section `{}` unchanged", block.heading));
                    continue;
                }
                let level = (target.level + 1).min(6);
                target.append(&format!(
                    "{} {UPDATED_FINDINGS} ({stamp})\n\n{addition}\n",
                    "#".repeat(usize::from(level))
                ));
                if index + 1 < base.blocks.len() {
                    base.blocks[index].body.push('\n');
                }
                operations.push(format!("section `{}` extended with updated findings", block.heading));
            }
            None => {
                let mut added = block.clone();
                if !added.heading_line.ends_with('\n') {
                    added.heading_line.push('\n');
                }
                let heading = added.heading.clone();
                base.push_block(added);
                // The pushed block is now claimed; a later duplicate heading
                // in the incoming text must not merge into it.
                taken.push(base.blocks.len() - 1);
                operations.push(format!("section `{heading}` added"));
            }
        }
    }

    Ok(Integrated { content: base.render(), operations })
}

fn merge_preamble(base: &mut SectionedText, incoming: &str, operations: &mut Vec<String>) {
    let addition = incoming.trim();
    if addition.is_empty() || base.preamble.contains(addition) {
        return;
    }
    let mut preamble = base.preamble.trim_end().to_string();
    if !preamble.is_empty() {
        preamble.push_str("\n\n");
    }
    preamble.push_str(addition);
    preamble.push_str("\n\n");
    base.preamble = preamble;
    operations.push("preamble extended".to_string());
}
