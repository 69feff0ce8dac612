//! Provider payload codec
//!
//! Translates between the binary `Configuration` blob of a [`Choice`] and a
//! typed value. Screen saver blobs are a closed set of variants; decoding tries
//! each variant's validator in a fixed order (traditional, app extension,
//! aerial video) and the first structural match wins.
//!
//! The app extension and aerial video layouts were captured from a handful of
//! real stores and may drift between OS point releases.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;
use url::Url;

use crate::constants::{builtins, keys, payload, providers};
use crate::error::{Error, Result};
use crate::tree::{Mapping, Node, within};

/// Kind of screen saver module, which decides its payload layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScreensaverKind {
    /// `.saver` bundles and legacy `.qtz` compositions
    Traditional,
    /// `.appex` screen saver extensions
    AppExtension,
    /// Aerial video screen savers
    SequoiaVideo,
    /// The built-in "Macintosh" screen saver
    BuiltInMac,
    /// Whatever the system default is
    DefaultScreen,
}

impl ScreensaverKind {
    pub const ALL: [ScreensaverKind; 5] = [
        ScreensaverKind::Traditional,
        ScreensaverKind::AppExtension,
        ScreensaverKind::SequoiaVideo,
        ScreensaverKind::BuiltInMac,
        ScreensaverKind::DefaultScreen,
    ];

    /// Infer the kind from a bundle's extension; unknown extensions are traditional
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("appex") => ScreensaverKind::AppExtension,
            _ => ScreensaverKind::Traditional,
        }
    }

    pub fn provider(self) -> &'static str {
        match self {
            ScreensaverKind::Traditional | ScreensaverKind::AppExtension => providers::SCREEN_SAVER,
            ScreensaverKind::SequoiaVideo => providers::SEQUOIA_VIDEO,
            ScreensaverKind::BuiltInMac => providers::MACINTOSH,
            ScreensaverKind::DefaultScreen => providers::DEFAULT,
        }
    }

    /// Integer code stored in the legacy `moduleDict.type` key
    pub fn code(self) -> i64 {
        match self {
            ScreensaverKind::Traditional => 0,
            ScreensaverKind::AppExtension => 1,
            ScreensaverKind::SequoiaVideo => 2,
            ScreensaverKind::BuiltInMac => 3,
            ScreensaverKind::DefaultScreen => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }

    /// Name of the built-in screen saver of this kind, if there is one
    pub fn builtin_name(self) -> Option<&'static str> {
        match self {
            ScreensaverKind::Traditional | ScreensaverKind::AppExtension => None,
            ScreensaverKind::SequoiaVideo => Some(builtins::AERIAL),
            ScreensaverKind::BuiltInMac => Some(builtins::MACINTOSH),
            ScreensaverKind::DefaultScreen => Some(builtins::DEFAULT),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScreensaverKind::Traditional => "traditional",
            ScreensaverKind::AppExtension => "appExtension",
            ScreensaverKind::SequoiaVideo => "sequoiaVideo",
            ScreensaverKind::BuiltInMac => "builtInMac",
            ScreensaverKind::DefaultScreen => "defaultScreen",
        }
    }
}

impl fmt::Display for ScreensaverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// `{ module: { relative: <url> } }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReference {
    pub url: String,
}

impl ModuleReference {
    fn extract(root: &Mapping) -> Result<Self> {
        let module = root.require_mapping("module")?;
        let url = module
            .require_string(keys::RELATIVE)
            .map_err(|e| within("module", e))?;
        Ok(Self { url: url.to_string() })
    }

    fn to_node(&self) -> Node {
        Node::Mapping(Mapping::from_pairs([(
            "module",
            Node::Mapping(Mapping::from_pairs([(keys::RELATIVE, Node::from(self.url.as_str()))])),
        )]))
    }
}

/// `{ values: { legacyScreenSaverGenerationCount, style }, picker: { id } }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionPayload {
    pub generation_count: i64,
    pub style: String,
    pub picker_id: i64,
}

impl Default for ExtensionPayload {
    fn default() -> Self {
        Self {
            generation_count: payload::LEGACY_GENERATION_COUNT,
            style: payload::EXTENSION_STYLE.to_string(),
            picker_id: payload::PICKER_ID,
        }
    }
}

impl ExtensionPayload {
    fn extract(root: &Mapping) -> Result<Self> {
        let values = root.require_mapping("values")?;
        let generation_count = values
            .require_integer("legacyScreenSaverGenerationCount")
            .map_err(|e| within("values", e))?;
        let style = values
            .require_string("style")
            .map_err(|e| within("values", e))?;
        let picker_id = root
            .require_mapping("picker")?
            .require_integer("id")
            .map_err(|e| within("picker", e))?;
        Ok(Self {
            generation_count,
            style: style.to_string(),
            picker_id,
        })
    }

    fn to_node(&self) -> Node {
        Node::Mapping(Mapping::from_pairs([
            (
                "values",
                Node::Mapping(Mapping::from_pairs([
                    ("legacyScreenSaverGenerationCount", Node::int(self.generation_count)),
                    ("style", Node::from(self.style.as_str())),
                ])),
            ),
            (
                "picker",
                Node::Mapping(Mapping::from_pairs([("id", Node::int(self.picker_id))])),
            ),
        ]))
    }
}

/// `{ values: { appearance, picker: { id } } }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoPayload {
    pub appearance: String,
    pub picker_id: i64,
}

impl Default for VideoPayload {
    fn default() -> Self {
        Self {
            appearance: payload::VIDEO_APPEARANCE.to_string(),
            picker_id: payload::PICKER_ID,
        }
    }
}

impl VideoPayload {
    fn extract(root: &Mapping) -> Result<Self> {
        let values = root.require_mapping("values")?;
        let appearance = values
            .require_string("appearance")
            .map_err(|e| within("values", e))?;
        let picker_id = values
            .require_mapping("picker")
            .and_then(|p| p.require_integer("id").map_err(|e| within("picker", e)))
            .map_err(|e| within("values", e))?;
        Ok(Self {
            appearance: appearance.to_string(),
            picker_id,
        })
    }

    fn to_node(&self) -> Node {
        Node::Mapping(Mapping::from_pairs([(
            "values",
            Node::Mapping(Mapping::from_pairs([
                ("appearance", Node::from(self.appearance.as_str())),
                (
                    "picker",
                    Node::Mapping(Mapping::from_pairs([("id", Node::int(self.picker_id))])),
                ),
            ])),
        )]))
    }
}

/// Screen saver configuration blob, one variant per module kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreensaverPayload {
    Traditional(ModuleReference),
    AppExtension(ExtensionPayload),
    SequoiaVideo(VideoPayload),
    BuiltInMac,
    DefaultScreen,
}

impl ScreensaverPayload {
    pub fn for_module(path: &Path, kind: ScreensaverKind) -> Self {
        match kind {
            ScreensaverKind::Traditional => ScreensaverPayload::Traditional(ModuleReference {
                url: file_url(path),
            }),
            ScreensaverKind::AppExtension => {
                ScreensaverPayload::AppExtension(ExtensionPayload::default())
            }
            ScreensaverKind::SequoiaVideo => {
                ScreensaverPayload::SequoiaVideo(VideoPayload::default())
            }
            ScreensaverKind::BuiltInMac => ScreensaverPayload::BuiltInMac,
            ScreensaverKind::DefaultScreen => ScreensaverPayload::DefaultScreen,
        }
    }

    pub fn kind(&self) -> ScreensaverKind {
        match self {
            ScreensaverPayload::Traditional(_) => ScreensaverKind::Traditional,
            ScreensaverPayload::AppExtension(_) => ScreensaverKind::AppExtension,
            ScreensaverPayload::SequoiaVideo(_) => ScreensaverKind::SequoiaVideo,
            ScreensaverPayload::BuiltInMac => ScreensaverKind::BuiltInMac,
            ScreensaverPayload::DefaultScreen => ScreensaverKind::DefaultScreen,
        }
    }

    /// Module name carried by the blob itself (traditional modules only)
    pub fn module_name(&self) -> Option<String> {
        match self {
            ScreensaverPayload::Traditional(module) => name_from_url(&module.url),
            _ => None,
        }
    }

    /// Built-in payloads encode to an empty blob
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self {
            ScreensaverPayload::Traditional(m) => encode_node(&m.to_node()),
            ScreensaverPayload::AppExtension(p) => encode_node(&p.to_node()),
            ScreensaverPayload::SequoiaVideo(p) => encode_node(&p.to_node()),
            ScreensaverPayload::BuiltInMac | ScreensaverPayload::DefaultScreen => Ok(Vec::new()),
        }
    }

    /// Try each validator in order; `None` when the blob matches none of them
    pub fn probe(blob: &[u8]) -> Option<Self> {
        let root = match decode_mapping(blob) {
            Ok(root) => root,
            Err(e) => {
                debug!(error = %e, bytes = blob.len(), "Screen saver blob is not a mapping");
                return None;
            }
        };

        let traditional = match ModuleReference::extract(&root) {
            Ok(m) => return Some(ScreensaverPayload::Traditional(m)),
            Err(e) => e,
        };
        let extension = match ExtensionPayload::extract(&root) {
            Ok(p) => return Some(ScreensaverPayload::AppExtension(p)),
            Err(e) => e,
        };
        match VideoPayload::extract(&root) {
            Ok(p) => Some(ScreensaverPayload::SequoiaVideo(p)),
            Err(video) => {
                debug!(
                    %traditional,
                    %extension,
                    %video,
                    "Screen saver blob matched no known layout"
                );
                None
            }
        }
    }
}

/// Blob for a screen saver module at `path`
pub fn encode_screensaver(path: &Path, kind: ScreensaverKind) -> Result<Vec<u8>> {
    ScreensaverPayload::for_module(path, kind).encode()
}

/// Inverse of [`encode_screensaver`]; `(None, Traditional)` when nothing matches
pub fn decode_screensaver(blob: &[u8]) -> (Option<String>, ScreensaverKind) {
    match ScreensaverPayload::probe(blob) {
        Some(payload) => (payload.module_name(), payload.kind()),
        None => (None, ScreensaverKind::Traditional),
    }
}

/// `{ type: "imageFile", url: { relative: <url> } }`
pub fn encode_wallpaper_image(image_url: &str) -> Result<Vec<u8>> {
    encode_node(&Node::Mapping(Mapping::from_pairs([
        ("type", Node::from(payload::IMAGE_FILE_TYPE)),
        (
            "url",
            Node::Mapping(Mapping::from_pairs([(keys::RELATIVE, Node::from(image_url))])),
        ),
    ])))
}

pub fn decode_wallpaper_image(blob: &[u8]) -> Option<String> {
    let root = decode_mapping(blob).ok()?;
    match root
        .mapping_at(&["url"])
        .and_then(|url| url.map(|u| u.require_string(keys::RELATIVE)).transpose())
    {
        Ok(found) => found.map(str::to_string),
        Err(e) => {
            debug!(error = %e, "Wallpaper blob has no image url");
            None
        }
    }
}

/// Wallpaper scaling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WallpaperStyle {
    #[default]
    Fill,
    Fit,
    Stretch,
    Center,
    Tile,
}

impl WallpaperStyle {
    pub fn raw_value(self) -> &'static str {
        match self {
            WallpaperStyle::Fill => "fill",
            WallpaperStyle::Fit => "fit",
            WallpaperStyle::Stretch => "stretch",
            WallpaperStyle::Center => "center",
            WallpaperStyle::Tile => "tile",
        }
    }
}

impl fmt::Display for WallpaperStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.raw_value())
    }
}

impl FromStr for WallpaperStyle {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fill" => Ok(WallpaperStyle::Fill),
            "fit" => Ok(WallpaperStyle::Fit),
            "stretch" => Ok(WallpaperStyle::Stretch),
            "center" | "centre" => Ok(WallpaperStyle::Center),
            "tile" => Ok(WallpaperStyle::Tile),
            other => Err(format!(
                "unknown wallpaper style '{other}' (expected fill, fit, stretch, center or tile)"
            )),
        }
    }
}

/// `{ values: { style: { picker: { _0: { id: <style> } } } } }`
pub fn encode_wallpaper_options(style: WallpaperStyle) -> Result<Vec<u8>> {
    let id = Node::Mapping(Mapping::from_pairs([("id", Node::from(style.raw_value()))]));
    let picker = Node::Mapping(Mapping::from_pairs([("_0", id)]));
    let style = Node::Mapping(Mapping::from_pairs([("picker", picker)]));
    let values = Node::Mapping(Mapping::from_pairs([("style", style)]));
    encode_node(&Node::Mapping(Mapping::from_pairs([("values", values)])))
}

pub fn decode_wallpaper_options(blob: &[u8]) -> Option<WallpaperStyle> {
    let root = decode_mapping(blob).ok()?;
    let id = root
        .lookup(&["values", "style", "picker", "_0", "id"])
        .ok()
        .flatten()?;
    id.as_str()?.parse().ok()
}

/// One entry of a choice list: a provider and its opaque configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub provider: String,
    pub configuration: Vec<u8>,
    pub files: Option<Vec<Node>>,
}

impl Choice {
    pub fn from_mapping(m: &Mapping) -> Result<Self> {
        let provider = m.require_string(keys::PROVIDER)?.to_string();
        let configuration = m
            .binary(keys::CONFIGURATION)?
            .map(<[u8]>::to_vec)
            .unwrap_or_default();
        let files = m.sequence(keys::FILES)?.map(<[Node]>::to_vec);
        Ok(Self {
            provider,
            configuration,
            files,
        })
    }

    pub fn to_node(&self) -> Node {
        let mut m = Mapping::new();
        m.insert(keys::CONFIGURATION, Node::Binary(self.configuration.clone()));
        if let Some(files) = &self.files {
            m.insert(keys::FILES, Node::Sequence(files.clone()));
        }
        m.insert(keys::PROVIDER, Node::from(self.provider.as_str()));
        Node::Mapping(m)
    }

    /// `relative` URLs of the `Files` entries, in order
    pub fn file_urls(&self) -> Vec<&str> {
        self.files
            .iter()
            .flatten()
            .filter_map(|f| f.as_mapping()?.get(keys::RELATIVE)?.as_str())
            .collect()
    }
}

/// Choice for a screen saver module. `Files` records the module URL so the
/// name survives kinds whose blob carries no module reference; built-ins
/// (empty `path`) have no file to record.
pub fn screensaver_choice(path: &Path, kind: ScreensaverKind) -> Result<Choice> {
    let files = if path.as_os_str().is_empty() {
        None
    } else {
        Some(vec![file_entry(&file_url(path))])
    };
    Ok(Choice {
        provider: kind.provider().to_string(),
        configuration: encode_screensaver(path, kind)?,
        files,
    })
}

/// Name and kind of a screen saver choice. Exclusive providers decide the
/// kind; otherwise the blob is probed.
pub fn decode_screensaver_choice(choice: &Choice) -> (Option<String>, ScreensaverKind) {
    let by_provider = match choice.provider.as_str() {
        providers::MACINTOSH => Some(ScreensaverKind::BuiltInMac),
        providers::DEFAULT => Some(ScreensaverKind::DefaultScreen),
        providers::SEQUOIA_VIDEO => Some(ScreensaverKind::SequoiaVideo),
        _ => None,
    };
    let (name, probed) = decode_screensaver(&choice.configuration);
    let kind = by_provider.unwrap_or(probed);
    let name = name
        .or_else(|| choice.file_urls().first().and_then(|u| name_from_url(u)))
        .or_else(|| by_provider.and_then(ScreensaverKind::builtin_name).map(str::to_string));
    (name, kind)
}

pub fn wallpaper_choice(image_url: &str) -> Result<Choice> {
    Ok(Choice {
        provider: providers::IMAGE.to_string(),
        configuration: encode_wallpaper_image(image_url)?,
        files: Some(vec![file_entry(image_url)]),
    })
}

/// Absolute `file://` URL for `path`, without a trailing slash
pub fn file_url(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let url = Url::from_file_path(&absolute)
        .map(String::from)
        .unwrap_or_else(|_| format!("file://{}", absolute.display()));
    url.trim_end_matches('/').to_string()
}

/// Module name for a path: the file name without its extension
pub fn module_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Module name from a `file://` URL (percent-decoded)
pub fn name_from_url(url: &str) -> Option<String> {
    let path = Url::parse(url)
        .ok()
        .and_then(|u| u.to_file_path().ok())
        .unwrap_or_else(|| PathBuf::from(url.trim_end_matches('/')));
    let name = module_name(&path);
    (!name.is_empty()).then_some(name)
}

fn file_entry(url: &str) -> Node {
    Node::Mapping(Mapping::from_pairs([(keys::RELATIVE, Node::from(url))]))
}

fn encode_node(node: &Node) -> Result<Vec<u8>> {
    node.to_binary().map_err(|e| Error::WriteError {
        path: PathBuf::from("<payload>"),
        reason: e.to_string(),
    })
}

fn decode_mapping(blob: &[u8]) -> Result<Mapping> {
    match Node::from_bytes(blob)? {
        Node::Mapping(m) => Ok(m),
        other => Err(Error::parse(
            "<root>",
            format!("expected mapping, found {}", other.kind()),
        )),
    }
}
