//! Sonoma and later: per-display, per-space store
//!
//! Reads resolve `Spaces[s].Displays[d]`, then `Spaces[s].Default`, then
//! `Displays[d]`; the first leaf whose section holds a choice answers.
//! Writes merge a single section of a single leaf and leave everything else
//! in the tree as it was.

use std::path::Path;
use tracing::{debug, info, warn};

use crate::codec::{
    self, ScreensaverKind, WallpaperStyle, decode_screensaver_choice, decode_wallpaper_image,
    decode_wallpaper_options,
};
use crate::constants::keys;
use crate::displays::{DisplayDescriptor, main_display};
use crate::error::{Error, Result};
use crate::schema::entry::{ChoiceList, Section, read_section, write_section};
use crate::schema::{ActiveScreensaver, ActiveWallpaper, Scope, Source};
use crate::spaces::SpaceIndex;
use crate::store::ConfigStore;
use crate::tree::{Mapping, within};

#[derive(Debug, Clone)]
pub struct ModernStrategy {
    store: ConfigStore,
    index: SpaceIndex,
    displays: Vec<DisplayDescriptor>,
}

impl ModernStrategy {
    pub fn new(
        store: ConfigStore,
        mut index: SpaceIndex,
        displays: Vec<DisplayDescriptor>,
    ) -> Self {
        index.correlate(&displays);
        Self {
            store,
            index,
            displays,
        }
    }

    pub fn index(&self) -> &SpaceIndex {
        &self.index
    }

    /// Enumerated displays followed by any extra monitors the index knows
    pub fn known_displays(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.displays.iter().map(|d| d.uuid.as_str()).collect();
        for monitor in self.index.monitors() {
            if !out.contains(&monitor.display.as_str()) {
                out.push(&monitor.display);
            }
        }
        out
    }

    /// Every indexed space in id order. The first desktop's uuid is empty.
    pub fn known_spaces(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for space in self.index.spaces() {
            if !out.contains(&space.uuid.as_str()) {
                out.push(&space.uuid);
            }
        }
        out
    }

    pub fn screensaver(&self, scope: &Scope) -> Result<Option<ActiveScreensaver>> {
        Ok(self.read(scope, Section::Idle)?.and_then(|(list, source)| {
            let choice = list.first()?;
            let (name, kind) = decode_screensaver_choice(choice);
            Some(ActiveScreensaver {
                name,
                kind,
                provider: Some(choice.provider.clone()),
                source,
            })
        }))
    }

    pub fn set_screensaver(
        &self,
        scope: &Scope,
        module: &Path,
        kind: ScreensaverKind,
    ) -> Result<usize> {
        let list = ChoiceList::single(codec::screensaver_choice(module, kind)?);
        let written = self.write(scope, Section::Idle, &list)?;
        info!(module = %module.display(), %kind, %scope, leaves = written, "Set screen saver");
        Ok(written)
    }

    pub fn wallpaper(&self, scope: &Scope) -> Result<Option<ActiveWallpaper>> {
        Ok(self.read(scope, Section::Desktop)?.and_then(|(list, source)| {
            let choice = list.first()?;
            let url = decode_wallpaper_image(&choice.configuration)
                .or_else(|| choice.file_urls().first().map(|u| u.to_string()));
            let style = list
                .encoded_option_values
                .as_deref()
                .and_then(decode_wallpaper_options);
            Some(ActiveWallpaper { url, style, source })
        }))
    }

    pub fn set_wallpaper(
        &self,
        scope: &Scope,
        image: &Path,
        style: WallpaperStyle,
    ) -> Result<usize> {
        let list = ChoiceList::single(codec::wallpaper_choice(&codec::file_url(image))?)
            .with_options(codec::encode_wallpaper_options(style)?);
        let written = self.write(scope, Section::Desktop, &list)?;
        info!(image = %image.display(), %style, %scope, leaves = written, "Set wallpaper");
        Ok(written)
    }

    fn read(&self, scope: &Scope, section: Section) -> Result<Option<(ChoiceList, Source)>> {
        let tree = self.store.load()?;
        match scope {
            Scope::Global => {
                let Some(display) = main_display(&self.displays)
                    .map(|d| d.uuid.as_str())
                    .or_else(|| self.known_displays().first().copied())
                else {
                    debug!("No displays known, nothing to resolve");
                    return Ok(None);
                };
                resolve(&tree, self.index.current_space(display), display, section)
            }
            Scope::Display(display) => {
                self.check_display(display)?;
                resolve(&tree, self.index.current_space(display), display, section)
            }
            Scope::Space { space, display } => {
                self.check_space_on(space, display)?;
                resolve(&tree, Some(space.as_str()), display, section)
            }
            Scope::SpaceDefault(space) => {
                self.check_space(space)?;
                Ok(read_leaf(&tree, &[keys::SPACES, space.as_str(), keys::DEFAULT], section)?
                    .map(|list| (list, Source::SpaceDefault)))
            }
        }
    }

    fn write(&self, scope: &Scope, section: Section, list: &ChoiceList) -> Result<usize> {
        let leaf: Vec<&str> = match scope {
            Scope::Global => return self.set_everywhere(section, list),
            Scope::Display(display) => {
                self.check_display(display)?;
                vec![keys::DISPLAYS, display.as_str()]
            }
            Scope::Space { space, display } => {
                self.check_space_on(space, display)?;
                vec![keys::SPACES, space.as_str(), keys::DISPLAYS, display.as_str()]
            }
            Scope::SpaceDefault(space) => {
                self.check_space(space)?;
                vec![keys::SPACES, space.as_str(), keys::DEFAULT]
            }
        };
        self.store.update(|tree| {
            write_leaf(tree, &leaf, section, list)?;
            Ok(1)
        })
    }

    /// Write `list` to `Spaces[s].Displays[d]` for every known space and
    /// display. `Displays[d]` is written too when `d` hosts the first desktop,
    /// or for every display when no space is indexed.
    pub fn set_everywhere(&self, section: Section, list: &ChoiceList) -> Result<usize> {
        let displays = self.known_displays();
        let spaces = self.known_spaces();
        if displays.is_empty() {
            warn!("No displays known, nothing written");
            return Ok(0);
        }
        let display_level: Vec<&str> = if spaces.is_empty() {
            displays.clone()
        } else {
            displays
                .iter()
                .copied()
                .filter(|&d| self.index.spaces_on(d).any(|s| s.uuid.is_empty()))
                .collect()
        };
        self.store.update(|tree| {
            let mut written = 0;
            for &space in &spaces {
                for &display in &displays {
                    let leaf = [keys::SPACES, space, keys::DISPLAYS, display];
                    write_leaf(tree, &leaf, section, list)?;
                    written += 1;
                }
            }
            for &display in &display_level {
                write_leaf(tree, &[keys::DISPLAYS, display], section, list)?;
                written += 1;
            }
            Ok(written)
        })
    }

    fn check_display(&self, display: &str) -> Result<()> {
        if self.known_displays().contains(&display) {
            Ok(())
        } else {
            Err(Error::DisplayNotFound(display.to_string()))
        }
    }

    fn check_space(&self, space: &str) -> Result<()> {
        match self.index.space(space) {
            Some(_) => Ok(()),
            None => Err(Error::SpaceNotFound(space.to_string())),
        }
    }

    fn check_space_on(&self, space: &str, display: &str) -> Result<()> {
        self.check_display(display)?;
        if self.index.spaces_on(display).any(|s| s.uuid == space) {
            return Ok(());
        }
        match self.index.space(space) {
            None => Err(Error::SpaceNotFound(space.to_string())),
            Some(_) => Err(Error::SpaceNotFoundOnDisplay {
                display: display.to_string(),
                space: space.to_string(),
            }),
        }
    }
}

/// First leaf along the fallback chain whose section holds a choice
pub fn resolve(
    tree: &Mapping,
    space: Option<&str>,
    display: &str,
    section: Section,
) -> Result<Option<(ChoiceList, Source)>> {
    let mut chain: Vec<(Vec<&str>, Source)> = Vec::with_capacity(3);
    if let Some(space) = space {
        chain.push((vec![keys::SPACES, space, keys::DISPLAYS, display], Source::SpaceDisplay));
        chain.push((vec![keys::SPACES, space, keys::DEFAULT], Source::SpaceDefault));
    }
    chain.push((vec![keys::DISPLAYS, display], Source::Display));

    for (leaf, source) in chain {
        if let Some(list) = read_leaf(tree, &leaf, section)? {
            if !list.choices.is_empty() {
                debug!(leaf = %leaf.join("."), ?source, "Resolved entry");
                return Ok(Some((list, source)));
            }
        }
    }
    Ok(None)
}

fn read_leaf(tree: &Mapping, leaf: &[&str], section: Section) -> Result<Option<ChoiceList>> {
    match tree.mapping_at(leaf)? {
        None => Ok(None),
        Some(entry) => read_section(entry, section).map_err(|e| within(&leaf.join("."), e)),
    }
}

fn write_leaf(
    tree: &mut Mapping,
    leaf: &[&str],
    section: Section,
    list: &ChoiceList,
) -> Result<()> {
    let entry = tree.ensure_mapping(leaf)?;
    write_section(entry, section, list).map_err(|e| within(&leaf.join("."), e))?;
    debug!(leaf = %leaf.join("."), section = section.key(), "Wrote leaf");
    Ok(())
}
