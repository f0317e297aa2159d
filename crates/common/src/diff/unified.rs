// Unified-diff rendering over a line-level Myers edit script.

use std::fmt::Write as _;

/// Lines of unchanged context kept around each hunk.
pub const DEFAULT_CONTEXT_LINES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEdit<'a> {
    Equal(&'a str),
    Delete(&'a str),
    Insert(&'a str),
}

impl LineEdit<'_> {
    fn is_change(&self) -> bool {
        !matches!(self, LineEdit::Equal(_))
    }
}

/// Marker printed after a last line that has no terminator.
pub const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// Computes the shortest line edit script turning `old_text` into `new_text`.
///
/// Lines keep their terminators, so `"a\n"`, `"a"` and `"a\r\n"` differ.
pub fn line_edits<'a>(old_text: &'a str, new_text: &'a str) -> Vec<LineEdit<'a>> {
    let old_lines: Vec<&str> = old_text.split_inclusive('\n').collect();
    let new_lines: Vec<&str> = new_text.split_inclusive('\n').collect();
    myers_line_edits(&old_lines, &new_lines)
}

/// Renders a unified diff between two texts.
///
/// Returns an empty string exactly when the texts are equal, so callers can
/// test `is_empty()` for "no changes".
pub fn unified_diff(old_text: &str, new_text: &str, old_label: &str, new_label: &str) -> String {
    if old_text == new_text {
        return String::new();
    }

    let edits = line_edits(old_text, new_text);
    let hunks = hunk_ranges(&edits, DEFAULT_CONTEXT_LINES);
    if hunks.is_empty() {
        return String::new();
    }

    // positions[i] = (old line index, new line index) before edit i.
    let mut positions = Vec::with_capacity(edits.len() + 1);
    let (mut old_pos, mut new_pos) = (0usize, 0usize);
    for edit in &edits {
        positions.push((old_pos, new_pos));
        match edit {
            LineEdit::Equal(_) => {
                old_pos += 1;
                new_pos += 1;
            }
            LineEdit::Delete(_) => old_pos += 1,
            LineEdit::Insert(_) => new_pos += 1,
        }
    }
    positions.push((old_pos, new_pos));

    let mut out = String::new();
    let _ = writeln!(out, "--- {old_label}");
    let _ = writeln!(out, "+++ {new_label}");

    for (start, end) in hunks {
        let (old_start, new_start) = positions[start];
        let (old_end, new_end) = positions[end];
        let _ = writeln!(
            out,
            "@@ -{} +{} @@",
            hunk_range(old_start, old_end - old_start),
            hunk_range(new_start, new_end - new_start)
        );
        for edit in &edits[start..end] {
            let (marker, line) = match edit {
                LineEdit::Equal(line) => (' ', line),
                LineEdit::Delete(line) => ('-', line),
                LineEdit::Insert(line) => ('+', line),
            };
            out.push(marker);
            out.push_str(line);
            if !line.ends_with('\n') {
                out.push('\n');
                out.push_str(NO_NEWLINE_MARKER);
                out.push('\n');
            }
        }
    }

    out
}

fn hunk_range(start: usize, len: usize) -> String {
    match len {
        0 => format!("{start},0"),
        1 => format!("{}", start + 1),
        _ => format!("{},{len}", start + 1),
    }
}

/// Groups changed edits into `[start, end)` ranges padded with context;
/// ranges whose context overlaps are merged.
fn hunk_ranges(edits: &[LineEdit<'_>], context: usize) -> Vec<(usize, usize)> {
    let mut hunks: Vec<(usize, usize)> = Vec::new();

    for (index, edit) in edits.iter().enumerate() {
        if !edit.is_change() {
            continue;
        }
        let start = index.saturating_sub(context);
        let end = (index + 1 + context).min(edits.len());
        match hunks.last_mut() {
            Some((_, last_end)) if start <= *last_end => *last_end = end,
            _ => hunks.push((start, end)),
        }
    }

    hunks
}

fn myers_line_edits<'a>(old_lines: &[&'a str], new_lines: &[&'a str]) -> Vec<LineEdit<'a>> {
    let old_len = old_lines.len();
    let new_len = new_lines.len();

    if old_len == 0 {
        return new_lines.iter().map(|line| LineEdit::Insert(line)).collect();
    }
    if new_len == 0 {
        return old_lines.iter().map(|line| LineEdit::Delete(line)).collect();
    }

    let max = old_len + new_len;
    let offset = max as isize;
    let mut v = vec![0isize; 2 * max + 1];
    let mut trace: Vec<Vec<isize>> = Vec::with_capacity(max + 1);
    let mut solved_d = 0usize;

    'outer: for d in 0..=max {
        trace.push(v.clone());

        let d_isize = d as isize;
        let mut k = -d_isize;
        while k <= d_isize {
            let mut x = if k == -d_isize
                || (k != d_isize && v[(k - 1 + offset) as usize] < v[(k + 1 + offset) as usize])
            {
                v[(k + 1 + offset) as usize]
            } else {
                v[(k - 1 + offset) as usize] + 1
            };
            let mut y = x - k;

            while x < old_len as isize
                && y < new_len as isize
                && old_lines[x as usize] == new_lines[y as usize]
            {
                x += 1;
                y += 1;
            }

            v[(k + offset) as usize] = x;

            if x >= old_len as isize && y >= new_len as isize {
                solved_d = d;
                break 'outer;
            }

            k += 2;
        }
    }

    backtrack(old_lines, new_lines, &trace, solved_d, offset)
}

fn backtrack<'a>(
    old_lines: &[&'a str],
    new_lines: &[&'a str],
    trace: &[Vec<isize>],
    solved_d: usize,
    offset: isize,
) -> Vec<LineEdit<'a>> {
    let mut edits = Vec::new();
    let mut x = old_lines.len() as isize;
    let mut y = new_lines.len() as isize;

    for d in (0..=solved_d).rev() {
        let v = &trace[d];
        let k = x - y;
        let d_isize = d as isize;

        let prev_k = if d == 0 {
            0
        } else if k == -d_isize
            || (k != d_isize && v[(k - 1 + offset) as usize] < v[(k + 1 + offset) as usize])
        {
            k + 1
        } else {
            k - 1
        };
        let prev_x = if d == 0 { 0 } else { v[(prev_k + offset) as usize] };
        let prev_y = prev_x - prev_k;

        while x > prev_x && y > prev_y {
            edits.push(LineEdit::Equal(old_lines[(x - 1) as usize]));
            x -= 1;
            y -= 1;
        }

        if d == 0 {
            break;
        }

        if x == prev_x {
            edits.push(LineEdit::Insert(new_lines[(y - 1) as usize]));
            y -= 1;
        } else {
            edits.push(LineEdit::Delete(old_lines[(x - 1) as usize]));
            x -= 1;
        }
    }

    edits.reverse();
    edits
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    #[test]
    fn identical_texts_produce_empty_diff() {
        assert_eq!(unified_diff("a\nb\n", "a\nb\n", "a", "b"), "");
    }

    #[test]
    fn renders_single_hunk_with_context() {
        let old = "one\ntwo\nthree\nfour\n";
        let new = "one\ntwo\nTHREE\nfour\n";
        let diff = unified_diff(old, new, "doc.md@1111111", "doc.md@2222222");

        assert_eq!(
            diff,
            "--- doc.md@1111111\n+++ doc.md@2222222\n@@ -1,4 +1,4 @@\n one\n two\n-three\n+THREE\n four\n"
        );
    }

    #[test]
    fn distant_changes_split_into_separate_hunks() {
        let old: String = (1..=20).map(|n| format!("line {n}\n")).collect();
        let new = old.replace("line 2\n", "line two\n").replace("line 18\n", "line eighteen\n");
        let diff = unified_diff(&old, &new, "a", "b");

        assert_eq!(diff.matches("@@ -").count(), 2, "diff was:\n{diff}");
        assert!(diff.contains("-line 2\n+line two\n"));
        assert!(diff.contains("-line 18\n+line eighteen\n"));
    }

    #[test]
    fn pure_insertion_into_empty_text_uses_zero_length_old_range() {
        let diff = unified_diff("", "# New\n", "a", "b");
        assert!(diff.contains("@@ -0,0 +1 @@"), "diff was:\n{diff}");
        assert!(diff.ends_with("+# New\n"));
    }

    #[test]
    fn missing_final_newline_is_a_change() {
        let diff = unified_diff("line\n", "line", "a", "b");
        assert_eq!(diff, "--- a\n+++ b\n@@ -1 +1 @@\n-line\n+line\n\\ No newline at end of file\n");
    }

    #[test]
    fn line_ending_changes_are_reported() {
        let diff = unified_diff("one\ntwo\n", "one\r\ntwo\n", "a", "b");
        assert!(diff.contains("-one\n+one\r\n two\n"), "diff was:\n{diff}");
    }

    fn apply(old: &str, edits: &[LineEdit<'_>]) -> Vec<String> {
        let mut old_lines = old.split_inclusive('\n');
        let mut out = Vec::new();
        for edit in edits {
            match edit {
                LineEdit::Equal(line) => {
                    assert_eq!(old_lines.next(), Some(*line));
                    out.push((*line).to_string());
                }
                LineEdit::Delete(line) => assert_eq!(old_lines.next(), Some(*line)),
                LineEdit::Insert(line) => out.push((*line).to_string()),
            }
        }
        assert_eq!(old_lines.next(), None);
        out
    }

    proptest! {
        #[test]
        fn edit_script_transforms_old_into_new(
            old in vec(prop_oneof![Just("a"), Just("b"), Just("c"), Just("## h")], 0..24),
            new in vec(prop_oneof![Just("a"), Just("b"), Just("c"), Just("## h")], 0..24),
        ) {
            let old_text = old.join("\n");
            let new_text = new.join("\n");
            let edits = line_edits(&old_text, &new_text);
            let rebuilt = apply(&old_text, &edits);
            prop_assert_eq!(rebuilt.concat(), new_text);
        }
    }
}
