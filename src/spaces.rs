//! Space/display index
//!
//! Flattens the OS space-management preference domain
//! (`SpacesDisplayConfiguration` → `Management Data` → `Monitors`) into a
//! list of [`SpaceDescriptor`]s sorted by numeric space id.

use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use crate::constants::spaces as keys;
use crate::displays::DisplayDescriptor;
use crate::error::{Error, Result};
use crate::store::ConfigStore;
use crate::tree::{Mapping, Node, within};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceDescriptor {
    pub uuid: String,
    pub id: i64,
    /// Identifier of the monitor hosting this space
    pub display: String,
    pub is_current: bool,
    pub is_collapsed: bool,
    pub is_auto_created: bool,
}

impl SpaceDescriptor {
    /// Leftover spaces the OS keeps around but does not show
    pub fn is_historical(&self) -> bool {
        self.is_collapsed || self.is_auto_created
    }
}

/// One monitor entry as the index sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSpaces {
    pub display: String,
    pub current_space: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpaceIndex {
    monitors: Vec<MonitorSpaces>,
    spaces: Vec<SpaceDescriptor>,
}

impl SpaceIndex {
    /// Load the index from a preference file. A missing file is an empty index.
    pub fn load(path: &Path) -> Result<Self> {
        match ConfigStore::new(path).load() {
            Ok(root) => Self::parse(&root),
            Err(Error::NotFound(_)) => {
                info!(path = %path.display(), "No space configuration found, using an empty index");
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn parse(root: &Mapping) -> Result<Self> {
        let base = format!("{}.{}", keys::DISPLAY_CONFIGURATION, keys::MANAGEMENT_DATA);
        let Some(monitors) = root
            .mapping_at(&[keys::DISPLAY_CONFIGURATION, keys::MANAGEMENT_DATA])?
            .map(|data| data.sequence(keys::MONITORS))
            .transpose()
            .map_err(|e| within(&base, e))?
            .flatten()
        else {
            return Ok(Self::default());
        };

        let mut index = Self::default();
        for (i, node) in monitors.iter().enumerate() {
            let at = format!("{base}.{}.{i}", keys::MONITORS);
            let Node::Mapping(monitor) = node else {
                return Err(Error::parse(at, format!("expected mapping, found {}", node.kind())));
            };
            index.add_monitor(monitor).map_err(|e| within(&at, e))?;
        }
        index.spaces.sort_by_key(|s| s.id);
        debug!(
            monitors = index.monitors.len(),
            spaces = index.spaces.len(),
            "Parsed space index"
        );
        Ok(index)
    }

    fn add_monitor(&mut self, monitor: &Mapping) -> Result<()> {
        let display = monitor.require_string(keys::DISPLAY_IDENTIFIER)?.to_string();
        let current_space = match monitor.mapping(keys::CURRENT_SPACE)? {
            Some(space) => Some(
                space
                    .require_string(keys::UUID)
                    .map_err(|e| within(keys::CURRENT_SPACE, e))?
                    .to_string(),
            ),
            None => None,
        };

        for (i, node) in monitor.sequence(keys::SPACES)?.unwrap_or_default().iter().enumerate() {
            let at = format!("{}.{i}", keys::SPACES);
            let Node::Mapping(space) = node else {
                return Err(Error::parse(at, format!("expected mapping, found {}", node.kind())));
            };
            let (uuid, id) = space_identity(space).map_err(|e| within(&at, e))?;
            let is_current = current_space.as_deref() == Some(uuid.as_str());
            self.spaces.push(SpaceDescriptor {
                uuid,
                id,
                display: display.clone(),
                is_current,
                is_collapsed: false,
                is_auto_created: false,
            });
        }

        if let Some(collapsed) = monitor.mapping(keys::COLLAPSED_SPACE)? {
            let (uuid, id) =
                space_identity(collapsed).map_err(|e| within(keys::COLLAPSED_SPACE, e))?;
            let flag = collapsed
                .integer(keys::TYPE)
                .map_err(|e| within(keys::COLLAPSED_SPACE, e))?
                .unwrap_or(0);
            self.spaces.push(SpaceDescriptor {
                is_current: current_space.as_deref() == Some(uuid.as_str()),
                uuid,
                id,
                display: display.clone(),
                is_collapsed: true,
                is_auto_created: flag != 0,
            });
        }

        self.monitors.push(MonitorSpaces {
            display,
            current_space,
        });
        Ok(())
    }

    pub fn spaces(&self) -> &[SpaceDescriptor] {
        &self.spaces
    }

    pub fn monitors(&self) -> &[MonitorSpaces] {
        &self.monitors
    }

    pub fn space(&self, uuid: &str) -> Option<&SpaceDescriptor> {
        self.spaces.iter().find(|s| s.uuid == uuid)
    }

    pub fn spaces_on<'a>(&'a self, display: &'a str) -> impl Iterator<Item = &'a SpaceDescriptor> {
        self.spaces.iter().filter(move |s| s.display == display)
    }

    pub fn has_display(&self, display: &str) -> bool {
        self.monitors.iter().any(|m| m.display == display)
    }

    pub fn current_space(&self, display: &str) -> Option<&str> {
        self.monitors
            .iter()
            .find(|m| m.display == display)
            .and_then(|m| m.current_space.as_deref())
    }

    /// Rewrite the `Main` placeholder identifier to the main display's UUID
    pub fn correlate(&mut self, displays: &[DisplayDescriptor]) {
        let Some(main) = displays.iter().find(|d| d.is_main).or_else(|| displays.first()) else {
            return;
        };
        for monitor in self.monitors.iter_mut().filter(|m| m.display == keys::MAIN_DISPLAY) {
            monitor.display = main.uuid.clone();
        }
        for space in self.spaces.iter_mut().filter(|s| s.display == keys::MAIN_DISPLAY) {
            space.display = main.uuid.clone();
        }
    }
}

/// `(uuid, ManagedSpaceID)`. The first desktop may have an empty uuid.
fn space_identity(space: &Mapping) -> Result<(String, i64)> {
    let uuid = space.string(keys::UUID)?.unwrap_or_default().to_string();
    let id = space.require_integer(keys::MANAGED_SPACE_ID)?;
    Ok((uuid, id))
}
