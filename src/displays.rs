//! Display descriptors and the enumeration collaborator

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use tracing::warn;

use crate::constants::spaces::MAIN_DISPLAY;
use crate::error::Result;
use crate::spaces::SpaceIndex;

/// Volatile numeric display handle, stable only while the display is connected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ScreenIdentifier(pub u32);

impl fmt::Display for ScreenIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayGeometry {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: f64,
    pub scale: f64,
}

/// One physical monitor, keyed by its stable UUID
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayDescriptor {
    pub uuid: String,
    pub screen: Option<ScreenIdentifier>,
    pub is_main: bool,
    pub geometry: Option<DisplayGeometry>,
}

impl DisplayDescriptor {
    pub fn new(uuid: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            screen: None,
            is_main: false,
            geometry: None,
        }
    }

    pub fn main(mut self) -> Self {
        self.is_main = true;
        self
    }

    pub fn with_screen(mut self, id: u32) -> Self {
        self.screen = Some(ScreenIdentifier(id));
        self
    }

    pub fn with_geometry(mut self, geometry: DisplayGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }
}

/// Source of the attached displays
pub trait DisplayEnumerator: Send + Sync {
    fn displays(&self) -> Result<Vec<DisplayDescriptor>>;
}

/// A fixed display list
impl DisplayEnumerator for Vec<DisplayDescriptor> {
    fn displays(&self) -> Result<Vec<DisplayDescriptor>> {
        Ok(self.clone())
    }
}

/// Displays as recorded by the space index: one per monitor entry, the first
/// one main, screen ids numbered from 1 in monitor order.
///
/// With a single display attached the index names it `Main` rather than by
/// UUID, and the store keys written for it will not be the ones the OS reads.
/// List the real UUID in the settings' `displays` instead.
#[derive(Debug, Clone)]
pub struct IndexedDisplays {
    spaces_path: PathBuf,
}

impl IndexedDisplays {
    pub fn new(spaces_path: impl Into<PathBuf>) -> Self {
        Self {
            spaces_path: spaces_path.into(),
        }
    }
}

impl DisplayEnumerator for IndexedDisplays {
    fn displays(&self) -> Result<Vec<DisplayDescriptor>> {
        let index = SpaceIndex::load(&self.spaces_path)?;
        if index.has_display(MAIN_DISPLAY) {
            warn!("Display recorded as `Main` without a UUID, set `displays` in the config file");
        }
        Ok(index
            .monitors()
            .iter()
            .enumerate()
            .map(|(i, monitor)| {
                let descriptor =
                    DisplayDescriptor::new(monitor.display.clone()).with_screen(i as u32 + 1);
                if i == 0 { descriptor.main() } else { descriptor }
            })
            .collect())
    }
}

/// The display flagged as main, else the first one
pub fn main_display(displays: &[DisplayDescriptor]) -> Option<&DisplayDescriptor> {
    displays.iter().find(|d| d.is_main).or_else(|| displays.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spaces::tests::{monitor, space, spaces_root};
    use crate::tree::Node;
    use tempfile::TempDir;

    #[test]
    fn test_main_display_prefers_flag() {
        let displays = vec![DisplayDescriptor::new("A"), DisplayDescriptor::new("B").main()];
        assert_eq!(main_display(&displays).unwrap().uuid, "B");
        let displays = vec![DisplayDescriptor::new("A"), DisplayDescriptor::new("B")];
        assert_eq!(main_display(&displays).unwrap().uuid, "A");
        assert!(main_display(&[]).is_none());
    }

    #[test]
    fn test_indexed_displays_follow_monitor_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("com.apple.spaces.plist");
        let root = spaces_root(vec![
            monitor("D1", "S1", vec![space("S1", 1)]),
            monitor("D2", "S2", vec![space("S2", 2)]),
        ]);
        std::fs::write(&path, Node::Mapping(root).to_binary().unwrap()).unwrap();

        let displays = IndexedDisplays::new(&path).displays().unwrap();
        assert_eq!(displays.len(), 2);
        assert!(displays[0].is_main && !displays[1].is_main);
        assert_eq!(displays[1].screen, Some(ScreenIdentifier(2)));
    }

    #[test]
    fn test_descriptor_serializes_camel_case() {
        let d = DisplayDescriptor::new("D1").main().with_screen(1);
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["isMain"], true);
        assert_eq!(json["screen"], 1);
    }
}
