//! Typed views over display entries and their choice lists

use crate::codec::Choice;
use crate::constants::keys;
use crate::error::{Error, Result};
use crate::tree::{Mapping, Node, within};

/// The two independent slots of a display entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Screen saver
    Idle,
    /// Wallpaper
    Desktop,
}

impl Section {
    pub fn key(self) -> &'static str {
        match self {
            Section::Idle => keys::IDLE,
            Section::Desktop => keys::DESKTOP,
        }
    }
}

/// Ordered choices (only the first is honored) plus options
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChoiceList {
    pub choices: Vec<Choice>,
    pub encoded_option_values: Option<Vec<u8>>,
    pub shuffle: Option<bool>,
}

impl ChoiceList {
    pub fn single(choice: Choice) -> Self {
        Self {
            choices: vec![choice],
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: Vec<u8>) -> Self {
        self.encoded_option_values = Some(options);
        self
    }

    pub fn first(&self) -> Option<&Choice> {
        self.choices.first()
    }

    pub fn from_mapping(content: &Mapping) -> Result<Self> {
        let choices = match content.sequence(keys::CHOICES)? {
            None => Vec::new(),
            Some(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let at = format!("{}.{i}", keys::CHOICES);
                    match item {
                        Node::Mapping(m) => Choice::from_mapping(m).map_err(|e| within(&at, e)),
                        other => Err(Error::parse(
                            at,
                            format!("expected mapping, found {}", other.kind()),
                        )),
                    }
                })
                .collect::<Result<_>>()?,
        };
        let encoded_option_values = match nullable(content, keys::ENCODED_OPTION_VALUES) {
            None => None,
            Some(Node::Binary(bytes)) => Some(bytes.clone()),
            Some(other) => return Err(mistyped(keys::ENCODED_OPTION_VALUES, "binary", other)),
        };
        let shuffle = match nullable(content, keys::SHUFFLE) {
            None => None,
            Some(Node::Bool(b)) => Some(*b),
            Some(other) => return Err(mistyped(keys::SHUFFLE, "bool", other)),
        };
        Ok(Self {
            choices,
            encoded_option_values,
            shuffle,
        })
    }

    /// Overwrite the keys this list carries in `content`; absent options and
    /// shuffle, and any other key, stay as found
    pub fn merge_into(&self, content: &mut Mapping) {
        content.insert(
            keys::CHOICES,
            Node::Sequence(self.choices.iter().map(Choice::to_node).collect()),
        );
        if let Some(options) = &self.encoded_option_values {
            content.insert(keys::ENCODED_OPTION_VALUES, Node::Binary(options.clone()));
        }
        if let Some(shuffle) = self.shuffle {
            content.insert(keys::SHUFFLE, Node::Bool(shuffle));
        }
    }
}

/// `content[key]` unless it is missing or the `$null` placeholder
fn nullable<'a>(content: &'a Mapping, key: &str) -> Option<&'a Node> {
    content
        .get(key)
        .filter(|node| !matches!(node, Node::String(s) if s == keys::NULL))
}

fn mistyped(key: &str, expected: &str, found: &Node) -> Error {
    Error::parse(key, format!("expected {expected}, found {}", found.kind()))
}

/// `entry[section].Content` as a choice list, if present
pub fn read_section(entry: &Mapping, section: Section) -> Result<Option<ChoiceList>> {
    match entry.mapping_at(&[section.key(), keys::CONTENT])? {
        None => Ok(None),
        Some(content) => ChoiceList::from_mapping(content)
            .map(Some)
            .map_err(|e| within(&format!("{}.{}", section.key(), keys::CONTENT), e)),
    }
}

/// Merge `list` into `entry[section].Content`, creating the path as needed
pub fn write_section(entry: &mut Mapping, section: Section, list: &ChoiceList) -> Result<()> {
    let content = entry.ensure_mapping(&[section.key(), keys::CONTENT])?;
    list.merge_into(content);
    Ok(())
}
