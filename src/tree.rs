//! Configuration tree value type
//!
//! A tagged union over the property-list value kinds the store uses, with an
//! insertion-ordered [`Mapping`] and typed accessors. Wrong-type reads are
//! reported as [`Error::ParseError`] naming the dotted key path, never as
//! silent absence. Reals, dates and UIDs are not interpreted by the codec but
//! are carried through load/save untouched.

use std::io::Cursor;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    String(String),
    Integer(plist::Integer),
    Bool(bool),
    Binary(Vec<u8>),
    Mapping(Mapping),
    Sequence(Vec<Node>),
    Real(f64),
    Date(plist::Date),
    Uid(u64),
}

impl Node {
    pub fn int(value: i64) -> Self {
        Node::Integer(plist::Integer::from(value))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Node::String(_) => "string",
            Node::Integer(_) => "integer",
            Node::Bool(_) => "bool",
            Node::Binary(_) => "binary",
            Node::Mapping(_) => "mapping",
            Node::Sequence(_) => "sequence",
            Node::Real(_) => "real",
            Node::Date(_) => "date",
            Node::Uid(_) => "uid",
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Node::Mapping(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Node::Integer(i) => i.as_signed(),
            _ => None,
        }
    }

    /// Parse a serialized tree (binary or XML) from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Node> {
        let value = plist::Value::from_reader(Cursor::new(bytes))
            .map_err(|e| Error::parse("<root>", e.to_string()))?;
        Node::from_plist(value, "")
    }

    /// Serialize to the binary property-list format
    pub fn to_binary(&self) -> std::result::Result<Vec<u8>, plist::Error> {
        let mut out = Vec::new();
        self.to_plist().to_writer_binary(&mut out)?;
        Ok(out)
    }

    fn from_plist(value: plist::Value, path: &str) -> Result<Node> {
        Ok(match value {
            plist::Value::String(s) => Node::String(s),
            plist::Value::Integer(i) => Node::Integer(i),
            plist::Value::Boolean(b) => Node::Bool(b),
            plist::Value::Data(d) => Node::Binary(d),
            plist::Value::Real(r) => Node::Real(r),
            plist::Value::Date(d) => Node::Date(d),
            plist::Value::Uid(u) => Node::Uid(u.get()),
            plist::Value::Array(items) => Node::Sequence(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| Node::from_plist(v, &join(path, &i.to_string())))
                    .collect::<Result<_>>()?,
            ),
            plist::Value::Dictionary(dict) => {
                let mut mapping = Mapping::new();
                for (key, v) in dict {
                    let child = Node::from_plist(v, &join(path, &key))?;
                    mapping.entries.push((key, child));
                }
                Node::Mapping(mapping)
            }
            other => {
                return Err(Error::parse(
                    display_path(path),
                    format!("unsupported value {other:?}"),
                ));
            }
        })
    }

    fn to_plist(&self) -> plist::Value {
        match self {
            Node::String(s) => plist::Value::String(s.clone()),
            Node::Integer(i) => plist::Value::Integer(*i),
            Node::Bool(b) => plist::Value::Boolean(*b),
            Node::Binary(d) => plist::Value::Data(d.clone()),
            Node::Real(r) => plist::Value::Real(*r),
            Node::Date(d) => plist::Value::Date(*d),
            Node::Uid(u) => plist::Value::Uid(plist::Uid::new(*u)),
            Node::Sequence(items) => {
                plist::Value::Array(items.iter().map(Node::to_plist).collect())
            }
            Node::Mapping(m) => {
                let mut dict = plist::Dictionary::new();
                for (key, v) in &m.entries {
                    dict.insert(key.clone(), v.to_plist());
                }
                plist::Value::Dictionary(dict)
            }
        }
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::String(value.to_string())
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Node::String(value)
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Node::Bool(value)
    }
}

impl From<Mapping> for Node {
    fn from(value: Mapping) -> Self {
        Node::Mapping(value)
    }
}

/// String-keyed mapping that keeps the on-disk key order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    entries: Vec<(String, Node)>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping from literal pairs, keeping their order
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, Node)>) -> Self {
        let mut mapping = Mapping::new();
        for (k, v) in pairs {
            mapping.insert(k, v);
        }
        mapping
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Insert or replace in place; a new key is appended
    pub fn insert(&mut self, key: impl Into<String>, value: Node) -> Option<Node> {
        let key = key.into();
        match self.get_mut(&key) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Walk `path` through nested mappings.
    ///
    /// Returns `Ok(None)` as soon as a key is absent and a `ParseError`
    /// naming the prefix when an intermediate value is not a mapping.
    pub fn lookup(&self, path: &[&str]) -> Result<Option<&Node>> {
        let Some((last, parents)) = path.split_last() else {
            return Ok(None);
        };
        let mut current = self;
        let mut walked = String::new();
        for key in parents {
            walked = join(&walked, key);
            match current.get(key) {
                None => return Ok(None),
                Some(Node::Mapping(m)) => current = m,
                Some(other) => return Err(mistyped(&walked, "mapping", other)),
            }
        }
        Ok(current.get(last))
    }

    /// Nested mapping at `path`, if every key is present
    pub fn mapping_at(&self, path: &[&str]) -> Result<Option<&Mapping>> {
        match self.lookup(path)? {
            None => Ok(None),
            Some(Node::Mapping(m)) => Ok(Some(m)),
            Some(other) => Err(mistyped(&path.join("."), "mapping", other)),
        }
    }

    /// Mutable nested mapping at `path`, creating empty mappings for absent keys
    pub fn ensure_mapping(&mut self, path: &[&str]) -> Result<&mut Mapping> {
        let mut current = self;
        let mut walked = String::new();
        for key in path {
            walked = join(&walked, key);
            let idx = match current.entries.iter().position(|(k, _)| k == key) {
                Some(idx) => idx,
                None => {
                    current
                        .entries
                        .push((key.to_string(), Node::Mapping(Mapping::new())));
                    current.entries.len() - 1
                }
            };
            current = match &mut current.entries[idx].1 {
                Node::Mapping(m) => m,
                other => return Err(mistyped(&walked, "mapping", other)),
            };
        }
        Ok(current)
    }

    pub fn mapping(&self, key: &str) -> Result<Option<&Mapping>> {
        self.typed(key, "mapping", Node::as_mapping)
    }

    pub fn string(&self, key: &str) -> Result<Option<&str>> {
        self.typed(key, "string", Node::as_str)
    }

    pub fn integer(&self, key: &str) -> Result<Option<i64>> {
        self.typed(key, "integer", Node::as_i64)
    }

    pub fn boolean(&self, key: &str) -> Result<Option<bool>> {
        self.typed(key, "bool", |n| match n {
            Node::Bool(b) => Some(*b),
            _ => None,
        })
    }

    pub fn binary(&self, key: &str) -> Result<Option<&[u8]>> {
        self.typed(key, "binary", |n| match n {
            Node::Binary(d) => Some(d.as_slice()),
            _ => None,
        })
    }

    pub fn sequence(&self, key: &str) -> Result<Option<&[Node]>> {
        self.typed(key, "sequence", |n| match n {
            Node::Sequence(items) => Some(items.as_slice()),
            _ => None,
        })
    }

    /// Like [`Mapping::mapping`] but a missing key is an error too
    pub fn require_mapping(&self, key: &str) -> Result<&Mapping> {
        self.mapping(key)?
            .ok_or_else(|| Error::parse(key, "missing mapping"))
    }

    pub fn require_string(&self, key: &str) -> Result<&str> {
        self.string(key)?
            .ok_or_else(|| Error::parse(key, "missing string"))
    }

    pub fn require_integer(&self, key: &str) -> Result<i64> {
        self.integer(key)?
            .ok_or_else(|| Error::parse(key, "missing integer"))
    }

    fn typed<'a, T>(
        &'a self,
        key: &str,
        expected: &str,
        view: impl FnOnce(&'a Node) -> Option<T>,
    ) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(node) => view(node)
                .map(Some)
                .ok_or_else(|| mistyped(key, expected, node)),
        }
    }
}

/// Prefix the key path of a nested `ParseError` with the parent key
pub(crate) fn within(parent: &str, err: Error) -> Error {
    match err {
        Error::ParseError { path, reason } => Error::parse(join(parent, &path), reason),
        other => other,
    }
}

fn mistyped(path: &str, expected: &str, found: &Node) -> Error {
    Error::parse(
        display_path(path),
        format!("expected {expected}, found {}", found.kind()),
    )
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() { "<root>".to_string() } else { path.to_string() }
}
