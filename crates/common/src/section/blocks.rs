// Flat partitioning of markdown into heading-delimited blocks.
//
// Unlike parsed sections, blocks carry the raw text of each section so a
// document can be edited block by block and rendered back byte for byte:
// `split_blocks(text).render() == text` for every input.

use super::parser::parse_sections;

/// One heading line plus the raw text up to the next heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionBlock {
    /// Parsed heading text, used for matching.
    pub heading: String,
    pub level: u8,
    /// The raw heading line including its line terminator, if any.
    pub heading_line: String,
    pub body: String,
}

impl SectionBlock {
    /// Build a block with an ATX heading line of the given level.
    pub fn new(level: u8, heading: impl Into<String>, body: impl Into<String>) -> Self {
        let heading = heading.into();
        let level = level.clamp(1, 6);
        Self {
            heading_line: format!("{} {heading}\n", "#".repeat(usize::from(level))),
            heading,
            level,
            body: body.into(),
        }
    }

    /// Append text after the existing body, separated by a blank line.
    pub fn append(&mut self, text: &str) {
        ensure_blank_line_break(&mut self.body);
        self.body.push_str(text);
        if !self.body.ends_with('\n') {
            self.body.push('\n');
        }
    }

    pub fn render_into(&self, out: &mut String) {
        out.push_str(&self.heading_line);
        if !self.heading_line.ends_with('\n') && !self.body.is_empty() {
            out.push('\n');
        }
        out.push_str(&self.body);
    }
}

/// A markdown document split into a preamble and heading blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionedText {
    /// Text before the first heading.
    pub preamble: String,
    pub blocks: Vec<SectionBlock>,
}

impl SectionedText {
    pub fn has_headings(&self) -> bool {
        !self.blocks.is_empty()
    }

    /// Index of the first block whose heading equals `heading` exactly and
    /// which is not listed in `skip`.
    pub fn position_of(&self, heading: &str, skip: &[usize]) -> Option<usize> {
        self.blocks
            .iter()
            .enumerate()
            .position(|(index, block)| block.heading == heading && !skip.contains(&index))
    }

    /// Append a block at the end of the document.
    pub fn push_block(&mut self, block: SectionBlock) {
        let tail = match self.blocks.last_mut() {
            Some(last) => &mut last.body,
            None => &mut self.preamble,
        };
        if !tail.is_empty() {
            ensure_blank_line_break(tail);
        }
        self.blocks.push(block);
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(
            self.preamble.len()
                + self
                    .blocks
                    .iter()
                    .map(|block| block.heading_line.len() + block.body.len() + 1)
                    .sum::<usize>(),
        );
        out.push_str(&self.preamble);
        for block in &self.blocks {
            block.render_into(&mut out);
        }
        out
    }
}

/// Split `markdown` into a preamble and one block per ATX heading.
pub fn split_blocks(markdown: &str) -> SectionedText {
    let sections = parse_sections(markdown);
    let lines: Vec<&str> = markdown.split_inclusive('\n').collect();
    let join = |from: usize, to: usize| -> String {
        lines[from.min(lines.len())..to.min(lines.len())].concat()
    };

    let Some(first) = sections.first() else {
        return SectionedText { preamble: markdown.to_string(), blocks: Vec::new() };
    };

    let preamble = join(0, first.start_line as usize - 1);
    let blocks = sections
        .iter()
        .map(|section| {
            let heading_index = section.start_line as usize - 1;
            SectionBlock {
                heading: section.heading.clone(),
                level: section.level,
                heading_line: join(heading_index, heading_index + 1),
                body: join(heading_index + 1, section.end_line as usize - 1),
            }
        })
        .collect();

    SectionedText { preamble, blocks }
}

fn ensure_blank_line_break(text: &mut String) {
    if text.is_empty() {
        return;
    }
    if !text.ends_with('\n') {
        text.push('\n');
    }
    if !text.ends_with("\n\n") {
        text.push('\n');
    }
}
