//! Keyed tree built from the partitioned lines

use compact_str::CompactString;
use serde::Serialize;
use serde::ser::SerializeMap;

use crate::Arity;
use crate::Node;
use crate::ParseError;
use crate::Schema;

/// Key under which the raw value of a bit field is stored
pub const RAW_VALUE: &str = "raw_value";

/// Separator between key and value on a line
const SEPARATOR: &str = "  ";

/// A mapping of field and group names to values.
///
/// Keys keep the order they were first seen in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceTree {
    entries: Vec<(CompactString, Value)>,
}

/// A value in a [`DeviceTree`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A group with [`Arity::Single`]
    Tree(DeviceTree),
    /// All occurrences of a group with [`Arity::Multiple`]
    List(Vec<DeviceTree>),
    /// A field with a value
    Text(CompactString),
    /// A line without a value (such as `(Bus Powered)`)
    Flag,
}

impl DeviceTree {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find_map(|(k, v)| (k.as_str() == key).then_some(v))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Get a text field
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            Value::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Get a single-valued group
    pub fn tree(&self, key: &str) -> Option<&Self> {
        match self.get(key)? {
            Value::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    /// Get all occurrences of a multi-valued group (empty if there are none)
    pub fn list(&self, key: &str) -> &[Self] {
        match self.get(key) {
            Some(Value::List(list)) => list,
            _ => &[],
        }
    }

    /// Iterate over keys and values in the order they were first seen
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find_map(|(k, v)| (k.as_str() == key).then_some(v))
    }

    /// Insert a value, replacing any existing value in place
    fn set(&mut self, key: &str, value: Value) {
        match self.get_mut(key) {
            Some(existing) => *existing = value,
            None => self.entries.push((key.into(), value)),
        }
    }
}

/// Build a tree from partitioned nodes
pub fn build_tree(nodes: &[Node<'_>], schema: &Schema) -> Result<DeviceTree, ParseError> {
    let mut tree = DeviceTree::default();
    build_into(&mut tree, nodes, schema)?;
    Ok(tree)
}

fn build_into(
    tree: &mut DeviceTree,
    nodes: &[Node<'_>],
    schema: &Schema,
) -> Result<(), ParseError> {
    for node in nodes {
        match node {
            Node::Leaf(line) => {
                let (key, value) = split_leaf(line);
                tree.set(key, value);
            }
            Node::Group { header, children } => {
                let (key, arity, mut child) = group_header(header, schema)?;
                build_into(&mut child, children, schema)?;
                insert_group(tree, key, arity, child)?;
            }
        }
    }
    Ok(())
}

/// Split a leaf line into key and value.
///
/// Key and value are separated by (at least) two spaces. A line without
/// separator is a flag.
fn split_leaf(line: &str) -> (&str, Value) {
    match line.split_once(SEPARATOR) {
        Some((key, value)) => (key, Value::Text(value.trim().into())),
        None => (line, Value::Flag),
    }
}

/// Work out key and arity of a group header, and the initial contents of the
/// group.
fn group_header<'h>(
    header: &'h str,
    schema: &Schema,
) -> Result<(&'h str, Arity, DeviceTree), ParseError> {
    if schema.bitmask_prefix(header).is_some() {
        // Bit fields look like "bmAttributes 0x80" with the decoded bits
        // indented below. Keep the raw value next to the decoded bits.
        let (key, raw_value) = header.split_once(' ').unwrap_or((header, ""));
        let raw_value = raw_value.trim();
        let raw_value = raw_value.strip_suffix(':').unwrap_or(raw_value);

        let mut child = DeviceTree::default();
        child.set(RAW_VALUE, Value::Text(raw_value.into()));
        return Ok((key, Arity::Single, child));
    }

    let key = header
        .strip_suffix(':')
        .ok_or_else(|| ParseError::UnknownGroup(header.into()))?;
    let arity = schema
        .arity(key)
        .ok_or_else(|| ParseError::UnknownGroup(key.into()))?;
    Ok((key, arity, DeviceTree::default()))
}

fn insert_group(
    tree: &mut DeviceTree,
    key: &str,
    arity: Arity,
    child: DeviceTree,
) -> Result<(), ParseError> {
    match (arity, tree.get_mut(key)) {
        (Arity::Single, None) => tree.entries.push((key.into(), Value::Tree(child))),
        (Arity::Multiple, None) => tree.entries.push((key.into(), Value::List(vec![child]))),
        (Arity::Multiple, Some(Value::List(list))) => list.push(child),
        (_, Some(_)) => {
            return Err(ParseError::DuplicateKey(key.into()));
        }
    }
    Ok(())
}

impl Serialize for DeviceTree {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Tree(tree) => tree.serialize(serializer),
            Self::List(list) => serializer.collect_seq(list),
            Self::Text(text) => serializer.serialize_str(text),
            Self::Flag => serializer.serialize_bool(true),
        }
    }
}
