//! Grouping of lines into a hierarchy based on indentation

use crate::ParseError;
use crate::Schema;

/// One indentation step
const INDENT: &str = "  ";

/// A line, possibly with the lines indented below it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node<'input> {
    /// A line without any indented lines below it
    Leaf(&'input str),
    /// A header line and the nodes indented below it
    Group {
        header: &'input str,
        children: Vec<Node<'input>>,
    },
}

/// Partition lines into nodes based on two-space indentation.
///
/// The first line must not be indented. An empty input gives no nodes.
pub fn partition<'input>(
    lines: &[&'input str],
    schema: &Schema,
) -> Result<Vec<Node<'input>>, ParseError> {
    partition_at(lines, 0, schema)
}

/// Partition `lines`, all of which are indented by at least `depth` steps.
fn partition_at<'input>(
    lines: &[&'input str],
    depth: usize,
    schema: &Schema,
) -> Result<Vec<Node<'input>>, ParseError> {
    let mut nodes = Vec::new();
    let mut remaining = lines;

    while let Some((&line, rest)) = remaining.split_first() {
        let header = strip_indent(line, depth);
        if header.starts_with(INDENT) {
            return Err(ParseError::UnexpectedIndent(line.trim().into()));
        }

        let child_count = rest
            .iter()
            .take_while(|line| is_indented(line, depth + 1))
            .count();
        let (children, rest) = rest.split_at(child_count);
        remaining = rest;

        let node = if children.is_empty() {
            Node::Leaf(header)
        } else if schema.discards_children(header) {
            // lsusb prints the HID class descriptor (with broken indentation)
            // below the iInterface line.
            tracing::trace!(
                "Discarding {} lines below {:?}",
                children.len(),
                header.trim_end()
            );
            Node::Leaf(header)
        } else {
            Node::Group {
                header,
                children: partition_at(children, depth + 1, schema)?,
            }
        };
        nodes.push(node);
    }

    Ok(nodes)
}

/// Check if `line` is indented at least `depth` steps
fn is_indented(line: &str, depth: usize) -> bool {
    line.as_bytes()
        .get(..INDENT.len() * depth)
        .is_some_and(|prefix| prefix.iter().all(|&b| b == b' '))
}

/// Remove `depth` steps of indentation.
///
/// Lines at `depth` have been checked with [`is_indented`] by the caller, so
/// the prefix is ASCII spaces.
fn strip_indent(line: &str, depth: usize) -> &str {
    line.get(INDENT.len() * depth..).unwrap_or(line)
}
