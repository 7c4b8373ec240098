//! Inline conflict markers
//!
//! Markers wrap each differing hunk of a line diff between the local and
//! remote bodies. This is a presentation of both sides for manual editing,
//! not a merge: stripping with a side returns that side's text.

use crate::{Error, Result};
use similar::{DiffOp, TextDiff};

pub const LOCAL_MARKER: &str = "<<<<<<< local";
pub const SEPARATOR: &str = "=======";
pub const REMOTE_MARKER: &str = ">>>>>>> remote";

const OPEN_PREFIX: &str = "<<<<<<<";
const CLOSE_PREFIX: &str = ">>>>>>>";

/// Which side of a conflict to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Local,
    Remote,
}

/// Wrap every differing hunk between `local` and `remote` in markers.
pub fn inject_markers(local: &str, remote: &str) -> String {
    let diff = TextDiff::from_lines(local, remote);
    let (old, new) = (diff.old_slices(), diff.new_slices());
    let ops = diff.ops();

    let mut out = String::with_capacity(local.len() + remote.len());
    let mut i = 0;
    while i < ops.len() {
        if let DiffOp::Equal { old_index, len, .. } = ops[i] {
            old[old_index..old_index + len]
                .iter()
                .for_each(|line| out.push_str(line));
            i += 1;
            continue;
        }

        let (mut ours, mut theirs) = (Vec::new(), Vec::new());
        while i < ops.len() && !matches!(ops[i], DiffOp::Equal { .. }) {
            ours.extend_from_slice(&old[ops[i].old_range()]);
            theirs.extend_from_slice(&new[ops[i].new_range()]);
            i += 1;
        }

        push_line(&mut out, LOCAL_MARKER);
        ours.iter().for_each(|line| push_line(&mut out, line));
        push_line(&mut out, SEPARATOR);
        theirs.iter().for_each(|line| push_line(&mut out, line));
        push_line(&mut out, REMOTE_MARKER);
    }
    out
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    if !line.ends_with('\n') {
        out.push('\n');
    }
}

/// True if any conflict open/close marker line remains.
pub fn has_markers(text: &str) -> bool {
    text.lines()
        .any(|line| line.starts_with(OPEN_PREFIX) || line.starts_with(CLOSE_PREFIX))
}

/// Remove all marker blocks, keeping the lines of `side`.
///
/// Text without markers is returned unchanged.
pub fn strip_markers(text: &str, side: Side) -> Result<String> {
    #[derive(Clone, Copy, PartialEq)]
    enum Section {
        Outside,
        Local,
        Remote,
    }

    let mut section = Section::Outside;
    let mut out = String::with_capacity(text.len());
    let mut opened_at = 0;

    for (index, line) in text.split_inclusive('\n').enumerate() {
        let number = index + 1;
        let bare = line.trim_end_matches(['\n', '\r']);
        let opens = bare.starts_with(OPEN_PREFIX);
        let closes = bare.starts_with(CLOSE_PREFIX);

        match section {
            Section::Outside if opens => {
                section = Section::Local;
                opened_at = number;
            }
            Section::Outside if closes => {
                return Err(malformed(number, "close marker without open marker"));
            }
            Section::Outside => out.push_str(line),
            Section::Local if bare == SEPARATOR => section = Section::Remote,
            Section::Local | Section::Remote if opens => {
                return Err(malformed(number, "nested open marker"));
            }
            Section::Local if closes => {
                return Err(malformed(number, "close marker before separator"));
            }
            Section::Local => {
                if side == Side::Local {
                    out.push_str(line);
                }
            }
            Section::Remote if closes => section = Section::Outside,
            Section::Remote => {
                if side == Side::Remote {
                    out.push_str(line);
                }
            }
        }
    }

    if section != Section::Outside {
        return Err(malformed(opened_at, "unterminated conflict block"));
    }
    Ok(out)
}

fn malformed(line: usize, message: &str) -> Error {
    Error::MalformedMarkers {
        line,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LOCAL: &str = "# Title\nshared\nlocal edit\ntail\n";
    const REMOTE: &str = "# Title\nshared\nremote edit\nmore remote\ntail\n";

    #[test]
    fn inject_wraps_only_differing_hunks() {
        let merged = inject_markers(LOCAL, REMOTE);
        assert_eq!(
            merged,
            "# Title\nshared\n<<<<<<< local\nlocal edit\n=======\nremote edit\nmore remote\n>>>>>>> remote\ntail\n"
        );
    }

    #[test]
    fn strip_recovers_each_side() {
        let merged = inject_markers(LOCAL, REMOTE);
        assert_eq!(strip_markers(&merged, Side::Local).unwrap(), LOCAL);
        assert_eq!(strip_markers(&merged, Side::Remote).unwrap(), REMOTE);
    }

    #[test]
    fn identical_sides_have_no_markers() {
        let merged = inject_markers(LOCAL, LOCAL);
        assert_eq!(merged, LOCAL);
        assert!(!has_markers(&merged));
    }

    #[test]
    fn setext_underline_is_not_a_marker() {
        assert!(!has_markers("Heading\n=======\n"));
        assert_eq!(
            strip_markers("Heading\n=======\n", Side::Local).unwrap(),
            "Heading\n=======\n"
        );
    }

    #[test]
    fn unterminated_block_is_rejected() {
        let result = strip_markers("a\n<<<<<<< local\nb\n=======\nc\n", Side::Local);
        assert!(matches!(result, Err(Error::MalformedMarkers { line: 2, .. })));
    }

    #[test]
    fn stray_close_is_rejected() {
        let result = strip_markers(">>>>>>> remote\n", Side::Remote);
        assert!(matches!(result, Err(Error::MalformedMarkers { line: 1, .. })));
    }
}
