use pulldown_cmark::{Event, HeadingLevel, Parser, Tag, TagEnd};

/// One ATX heading and the lines it governs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Heading text without markers, e.g. "Findings".
    pub heading: String,
    /// 1 through 6.
    pub level: u8,
    /// Line of the heading (1-based).
    pub start_line: u32,
    /// First line after the section (1-based, exclusive).
    pub end_line: u32,
}

/// Parse the ATX headings of a markdown document into flat sections.
///
/// Setext headings and `#` lines inside code fences or HTML blocks are not
/// sections. Each section spans from its heading line up to (not including)
/// the next heading of any level.
pub fn parse_sections(markdown: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    let mut open: Option<Section> = None;

    for (event, range) in Parser::new(markdown).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading { level, .. }) => {
                open = is_atx_heading(markdown, range.start).then(|| Section {
                    heading: String::new(),
                    level: heading_level(level),
                    start_line: line_number_for_offset(markdown, range.start),
                    end_line: 0,
                });
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some(section) = open.as_mut() {
                    section.heading.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(mut section) = open.take() {
                    section.heading = section.heading.trim().to_string();
                    sections.push(section);
                }
            }
            _ => {}
        }
    }

    let past_end = markdown.lines().count() as u32 + 1;
    let starts: Vec<u32> = sections.iter().skip(1).map(|section| section.start_line).collect();
    for (index, section) in sections.iter_mut().enumerate() {
        section.end_line = starts.get(index).copied().unwrap_or(past_end);
    }
    sections
}

fn is_atx_heading(markdown: &str, offset: usize) -> bool {
    let line_start = markdown[..offset].rfind('\n').map_or(0, |index| index + 1);
    markdown[line_start..].trim_start().starts_with('#')
}

fn line_number_for_offset(markdown: &str, offset: usize) -> u32 {
    markdown[..offset].bytes().filter(|byte| *byte == b'\n').count() as u32 + 1
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_sections;

    #[test]
    fn sections_span_to_the_next_heading_of_any_level() {
        let markdown = "# Report\n\n## Findings\n\n### Caveats\n\n## Sources\n";
        let sections = parse_sections(markdown);

        let spans: Vec<_> = sections
            .iter()
            .map(|s| (s.heading.as_str(), s.level, s.start_line, s.end_line))
            .collect();
        assert_eq!(
            spans,
            [("Report", 1, 1, 3), ("Findings", 2, 3, 5), ("Caveats", 3, 5, 7), ("Sources", 2, 7, 8)]
        );
    }

    #[test]
    fn ignores_setext_headings_and_fenced_hashes() {
        let markdown = "Title\n=====\n\n## Real\n\n```\n## Not a heading\n```\n";
        let sections = parse_sections(markdown);

        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, "Real");
    }

    #[test]
    fn heading_text_keeps_case_and_punctuation() {
        let sections = parse_sections("## Key Findings:  \n\nbody\n## `code` heading\n");
        assert_eq!(sections[0].heading, "Key Findings:");
        assert_eq!(sections[1].heading, "code heading");
    }

    #[test]
    fn empty_heading_is_still_a_section() {
        let sections = parse_sections("##\n\ntext\n");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].heading, "");
        assert_eq!((sections[0].start_line, sections[0].end_line), (1, 4));
    }
}
