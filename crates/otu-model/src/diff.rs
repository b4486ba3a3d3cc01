//! Structural diff of JSON documents
//!
//! Produces the change list stored in history records. Each operation is
//! serialized as a three-element array `[kind, path, payload]`:
//!
//! - `["change", path, [old, new]]`
//! - `["add", path, [[key, value], ...]]`
//! - `["remove", path, [[key, value], ...]]`
//!
//! A path is a dotted string (`"isolates"`, `""` for the root) when every
//! segment is a plain key, or an array such as `["isolates", 0, "default"]`
//! once an index or awkward key is involved.
//!
//! Object keys are compared in sorted order and arrays position by position,
//! so two semantically equal documents always diff to nothing. Applying the
//! diff of `a` to `b` onto `a` yields `b`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt::{self, Display, Formatter};

/// One step of a [`DiffPath`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl PathSegment {
    fn to_value(&self) -> Value {
        match self {
            Self::Key(key) => Value::String(key.clone()),
            Self::Index(index) => Value::from(*index),
        }
    }

    fn from_value(value: &Value) -> Result<Self, DiffError> {
        match value {
            Value::String(key) => Ok(Self::Key(key.clone())),
            Value::Number(number) => number
                .as_u64()
                .and_then(|index| usize::try_from(index).ok())
                .map(Self::Index)
                .ok_or_else(|| DiffError::Malformed(format!("bad index {number}"))),
            other => Err(DiffError::Malformed(format!("bad path segment {other}"))),
        }
    }

    fn is_plain_key(&self) -> bool {
        matches!(self, Self::Key(key) if !key.is_empty() && !key.contains('.'))
    }
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Location of a node inside a document
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DiffPath(pub Vec<PathSegment>);

impl DiffPath {
    /// The document root
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path extended by one segment
    #[must_use]
    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    /// Path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    fn is_dotted(&self) -> bool {
        self.0.iter().all(PathSegment::is_plain_key)
    }
}

impl Display for DiffPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join("."))
    }
}

impl From<&str> for DiffPath {
    fn from(dotted: &str) -> Self {
        if dotted.is_empty() {
            return Self::root();
        }
        Self(dotted.split('.').map(|key| PathSegment::Key(key.to_string())).collect())
    }
}

impl Serialize for DiffPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_dotted() {
            serializer.serialize_str(&self.to_string())
        } else {
            self.0.serialize(serializer)
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPath {
    Dotted(String),
    Segments(Vec<PathSegment>),
}

impl<'de> Deserialize<'de> for DiffPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawPath::deserialize(deserializer)? {
            RawPath::Dotted(dotted) => Self::from(dotted.as_str()),
            RawPath::Segments(segments) => Self(segments),
        })
    }
}

/// Errors applying or decoding a diff
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiffError {
    /// Path does not resolve in the target document
    #[error("path not found: {0}")]
    PathNotFound(String),

    /// Path resolves to a scalar where a container was expected
    #[error("not a container at: {0}")]
    NotAContainer(String),

    /// Serialized operation has the wrong shape
    #[error("malformed diff operation: {0}")]
    Malformed(String),
}

/// One diff operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawOp", into = "RawOp")]
pub enum DiffOp {
    /// Keys or indexes added to the container at `path`
    Add {
        path: DiffPath,
        entries: Vec<(PathSegment, Value)>,
    },
    /// Keys or indexes removed from the container at `path`
    Remove {
        path: DiffPath,
        entries: Vec<(PathSegment, Value)>,
    },
    /// Value at `path` replaced
    Change { path: DiffPath, from: Value, to: Value },
}

impl DiffOp {
    /// Path this operation targets
    #[must_use]
    pub fn path(&self) -> &DiffPath {
        match self {
            Self::Add { path, .. } | Self::Remove { path, .. } | Self::Change { path, .. } => path,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct RawOp(String, DiffPath, Value);

fn entries_to_value(entries: Vec<(PathSegment, Value)>) -> Value {
    Value::Array(
        entries
            .into_iter()
            .map(|(key, value)| Value::Array(vec![key.to_value(), value]))
            .collect(),
    )
}

fn entries_from_value(value: Value) -> Result<Vec<(PathSegment, Value)>, DiffError> {
    let Value::Array(items) = value else {
        return Err(DiffError::Malformed("entries must be an array".to_string()));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::Array(mut pair) if pair.len() == 2 => {
                let value = pair.pop().unwrap_or(Value::Null);
                let key = PathSegment::from_value(&pair[0])?;
                Ok((key, value))
            }
            other => Err(DiffError::Malformed(format!("bad entry {other}"))),
        })
        .collect()
}

impl From<DiffOp> for RawOp {
    fn from(op: DiffOp) -> Self {
        match op {
            DiffOp::Add { path, entries } => Self("add".to_string(), path, entries_to_value(entries)),
            DiffOp::Remove { path, entries } => {
                Self("remove".to_string(), path, entries_to_value(entries))
            }
            DiffOp::Change { path, from, to } => {
                Self("change".to_string(), path, Value::Array(vec![from, to]))
            }
        }
    }
}

impl TryFrom<RawOp> for DiffOp {
    type Error = DiffError;

    fn try_from(RawOp(kind, path, payload): RawOp) -> Result<Self, Self::Error> {
        match kind.as_str() {
            "add" => Ok(Self::Add {
                path,
                entries: entries_from_value(payload)?,
            }),
            "remove" => Ok(Self::Remove {
                path,
                entries: entries_from_value(payload)?,
            }),
            "change" => match payload {
                Value::Array(mut pair) if pair.len() == 2 => {
                    let to = pair.pop().unwrap_or(Value::Null);
                    let from = pair.pop().unwrap_or(Value::Null);
                    Ok(Self::Change { path, from, to })
                }
                other => Err(DiffError::Malformed(format!("bad change payload {other}"))),
            },
            other => Err(DiffError::Malformed(format!("unknown kind {other}"))),
        }
    }
}

/// Compute the operations turning `old` into `new`
#[must_use]
pub fn diff(old: &Value, new: &Value) -> Vec<DiffOp> {
    let mut ops = Vec::new();
    diff_node(&DiffPath::root(), old, new, &mut ops);
    ops
}

fn diff_node(path: &DiffPath, old: &Value, new: &Value, ops: &mut Vec<DiffOp>) {
    match (old, new) {
        (Value::Object(old_map), Value::Object(new_map)) => diff_objects(path, old_map, new_map, ops),
        (Value::Array(old_items), Value::Array(new_items)) => {
            diff_arrays(path, old_items, new_items, ops);
        }
        _ if old != new => ops.push(DiffOp::Change {
            path: path.clone(),
            from: old.clone(),
            to: new.clone(),
        }),
        _ => {}
    }
}

fn diff_objects(
    path: &DiffPath,
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    ops: &mut Vec<DiffOp>,
) {
    let mut keys: Vec<&String> = old.keys().filter(|key| new.contains_key(*key)).collect();
    keys.sort();

    for key in keys {
        diff_node(
            &path.child(PathSegment::Key(key.clone())),
            &old[key.as_str()],
            &new[key.as_str()],
            ops,
        );
    }

    let mut added: Vec<(PathSegment, Value)> = new
        .iter()
        .filter(|(key, _)| !old.contains_key(*key))
        .map(|(key, value)| (PathSegment::Key(key.clone()), value.clone()))
        .collect();
    added.sort_by(|a, b| a.0.cmp(&b.0));

    let mut removed: Vec<(PathSegment, Value)> = old
        .iter()
        .filter(|(key, _)| !new.contains_key(*key))
        .map(|(key, value)| (PathSegment::Key(key.clone()), value.clone()))
        .collect();
    removed.sort_by(|a, b| a.0.cmp(&b.0));

    push_entries(path, added, removed, ops);
}

fn diff_arrays(path: &DiffPath, old: &[Value], new: &[Value], ops: &mut Vec<DiffOp>) {
    let common = old.len().min(new.len());

    for index in 0..common {
        diff_node(&path.child(PathSegment::Index(index)), &old[index], &new[index], ops);
    }

    let added = (common..new.len())
        .map(|index| (PathSegment::Index(index), new[index].clone()))
        .collect();

    // Highest index first so sequential removal keeps earlier indexes valid
    let removed = (common..old.len())
        .rev()
        .map(|index| (PathSegment::Index(index), old[index].clone()))
        .collect();

    push_entries(path, added, removed, ops);
}

fn push_entries(
    path: &DiffPath,
    added: Vec<(PathSegment, Value)>,
    removed: Vec<(PathSegment, Value)>,
    ops: &mut Vec<DiffOp>,
) {
    if !added.is_empty() {
        ops.push(DiffOp::Add {
            path: path.clone(),
            entries: added,
        });
    }
    if !removed.is_empty() {
        ops.push(DiffOp::Remove {
            path: path.clone(),
            entries: removed,
        });
    }
}

fn resolve<'a>(root: &'a mut Value, path: &DiffPath) -> Result<&'a mut Value, DiffError> {
    let mut node = root;
    for segment in path.segments() {
        node = match (node, segment) {
            (Value::Object(map), PathSegment::Key(key)) => map.get_mut(key),
            (Value::Array(items), PathSegment::Index(index)) => items.get_mut(*index),
            _ => None,
        }
        .ok_or_else(|| DiffError::PathNotFound(path.to_string()))?;
    }
    Ok(node)
}

/// Apply `ops` to a copy of `document`
///
/// # Errors
/// Fails when an operation targets a path absent from the document
pub fn apply(document: &Value, ops: &[DiffOp]) -> Result<Value, DiffError> {
    let mut result = document.clone();

    for op in ops {
        match op {
            DiffOp::Change { path, to, .. } => {
                *resolve(&mut result, path)? = to.clone();
            }
            DiffOp::Add { path, entries } => {
                let target = resolve(&mut result, path)?;
                for (key, value) in entries {
                    match (&mut *target, key) {
                        (Value::Object(map), PathSegment::Key(key)) => {
                            map.insert(key.clone(), value.clone());
                        }
                        (Value::Array(items), PathSegment::Index(index)) if *index <= items.len() => {
                            items.insert(*index, value.clone());
                        }
                        _ => return Err(DiffError::NotAContainer(path.to_string())),
                    }
                }
            }
            DiffOp::Remove { path, entries } => {
                let target = resolve(&mut result, path)?;
                for (key, _) in entries {
                    match (&mut *target, key) {
                        (Value::Object(map), PathSegment::Key(key)) => {
                            map.remove(key);
                        }
                        (Value::Array(items), PathSegment::Index(index)) if *index < items.len() => {
                            items.remove(*index);
                        }
                        _ => return Err(DiffError::NotAContainer(path.to_string())),
                    }
                }
            }
        }
    }

    Ok(result)
}
