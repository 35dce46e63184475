//! # Line Segmentation
//!
//! Splits an insert-only delta into lines. A line ends at each `\n` in a
//! text insert and takes the attributes of the op that newline belongs to
//! as its line attributes. Runs borrow from the delta; nothing is copied.

use serde_json::Value;

use crate::delta::{Attributes, Delta, InsertContent};
use crate::error::ConvertError;

/// Line attributes of a final line that has no terminating newline.
static NO_ATTRIBUTES: Attributes = Attributes::new();

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunContent<'a> {
    Text(&'a str),
    Embed(&'a Value),
}

/// A contiguous span of content within a line sharing one attribute set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InlineRun<'a> {
    pub content: RunContent<'a>,
    pub attributes: &'a Attributes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line<'a> {
    pub runs: Vec<InlineRun<'a>>,
    /// Attributes of the op holding the terminating newline.
    pub attributes: &'a Attributes,
}

/// Groups the delta's inserts into lines.
///
/// Fails without producing anything if any op is not an insert.
pub fn segment(delta: &Delta) -> Result<Vec<Line<'_>>, ConvertError> {
    let inserts = delta.inserts()?;

    let mut lines = vec![];
    let mut current: Vec<InlineRun<'_>> = vec![];

    for op in inserts {
        let attributes = &op.attributes;
        match &op.insert {
            InsertContent::Text(text) => {
                let mut pieces = text.split('\n');
                if let Some(first) = pieces.next() {
                    push_text(&mut current, first, attributes);
                }
                // Every further piece sits after a newline from this op.
                for piece in pieces {
                    lines.push(Line {
                        runs: std::mem::take(&mut current),
                        attributes,
                    });
                    push_text(&mut current, piece, attributes);
                }
            }
            InsertContent::Embed(value) => current.push(InlineRun {
                content: RunContent::Embed(value),
                attributes,
            }),
        }
    }

    if !current.is_empty() {
        lines.push(Line {
            runs: current,
            attributes: &NO_ATTRIBUTES,
        });
    }

    log::debug!(
        "segmented {} ops into {} lines",
        delta.ops.len(),
        lines.len()
    );
    Ok(lines)
}

fn push_text<'a>(current: &mut Vec<InlineRun<'a>>, text: &'a str, attributes: &'a Attributes) {
    if !text.is_empty() {
        current.push(InlineRun {
            content: RunContent::Text(text),
            attributes,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delta::{AttributeValue, InsertOp};
    use pretty_assertions::assert_eq;

    fn texts<'a>(line: &Line<'a>) -> Vec<&'a str> {
        line.runs
            .iter()
            .map(|run| match run.content {
                RunContent::Text(text) => text,
                RunContent::Embed(_) => "<embed>",
            })
            .collect()
    }

    #[test]
    fn newline_op_attributes_become_line_attributes() {
        let delta = Delta::from_inserts([
            InsertOp::text("Consecutive list elements"),
            InsertOp::text("\n").with_attribute("list", true),
            InsertOp::text("Plain"),
            InsertOp::text("\n"),
        ]);

        let lines = segment(&delta).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(texts(&lines[0]), vec!["Consecutive list elements"]);
        assert_eq!(lines[0].attributes.get("list"), Some(&AttributeValue::Bool(true)));
        assert_eq!(texts(&lines[1]), vec!["Plain"]);
        assert!(lines[1].attributes.is_empty());
    }

    #[test]
    fn multi_line_insert_splits_and_keeps_run_attributes() {
        let delta = Delta::from_inserts([
            InsertOp::text("Hello, World!\nThis is a second line.").with_attribute("bold", true),
            InsertOp::text("\n").with_attribute("firstheader", true),
        ]);

        let lines = segment(&delta).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(texts(&lines[0]), vec!["Hello, World!"]);
        // The first newline belongs to the bold op.
        assert!(lines[0].attributes.contains_key("bold"));
        assert_eq!(texts(&lines[1]), vec!["This is a second line."]);
        assert!(lines[1].runs[0].attributes.contains_key("bold"));
        assert!(lines[1].attributes.contains_key("firstheader"));
    }

    #[test]
    fn trailing_content_without_newline_forms_final_line() {
        let delta = Delta::from_inserts([
            InsertOp::text("first\nsecond "),
            InsertOp::text("tail").with_attribute("link", "http://x"),
        ]);

        let lines = segment(&delta).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(texts(&lines[1]), vec!["second ", "tail"]);
        assert!(lines[1].attributes.is_empty());
    }

    #[test]
    fn embeds_are_atomic_and_do_not_end_lines() {
        let delta = Delta::from_inserts([
            InsertOp::text("a "),
            InsertOp::embed(1).with_attribute("image", "http://i/x.gif"),
            InsertOp::text(" b\n"),
        ]);

        let lines = segment(&delta).unwrap();

        assert_eq!(lines.len(), 1);
        assert_eq!(texts(&lines[0]), vec!["a ", "<embed>", " b"]);
    }

    #[test]
    fn blank_lines_are_kept_and_no_empty_trailing_line() {
        let delta = Delta::from_inserts([InsertOp::text("a\n\nb\n")]);

        let lines = segment(&delta).unwrap();

        assert_eq!(lines.len(), 3);
        assert_eq!(texts(&lines[0]), vec!["a"]);
        assert!(lines[1].runs.is_empty());
        assert_eq!(texts(&lines[2]), vec!["b"]);
    }

    #[test]
    fn empty_delta_has_no_lines() {
        assert!(segment(&Delta::default()).unwrap().is_empty());
    }

    #[test]
    fn non_insert_rejects_whole_delta() {
        let delta = Delta::from_json(r#"{"ops": [{"insert": "abc\n"}, {"delete": 3}]}"#).unwrap();

        let err = segment(&delta).unwrap_err();

        assert!(err.to_string().contains("Cannot convert delta with non-insert operations"));
    }

    #[test]
    fn no_character_is_lost() {
        let delta = Delta::from_inserts([
            InsertOp::text("ab\ncd"),
            InsertOp::text("e\n\nf").with_attribute("bold", true),
            InsertOp::text("g"),
        ]);

        let lines = segment(&delta).unwrap();
        let joined = lines
            .iter()
            .map(|line| texts(line).concat())
            .collect::<Vec<_>>()
            .join("\n");

        assert_eq!(joined, "ab\ncde\n\nfg");
    }
}
