//! Project properties (`hexbook.toml`).
//!
//! Loading follows a two-layer scheme: the stock defaults are serialized to a
//! `toml::Value`, the user's file is merged on top key-by-key, and the merged
//! table is deserialized and validated. Unknown keys are rejected to catch
//! typos early.
//!
//! ```toml
//! modid = "hexcasting"
//! version = "0.11.2"
//! book = "hexcasting:thehexbook"
//! default_lang = "en_us"
//! url = "https://hexcasting.example/docs"
//! asset_url = "https://raw.githubusercontent.com/example/hexcasting/main"
//! entry_id_blacklist = ["hexcasting:interop/gravity"]
//!
//! [[resource_dirs]]
//! path = "src/main/resources"
//!
//! [[resource_dirs]]
//! path = "vendor/hexal"
//! modid = "hexal"
//!
//! [macros]
//! "$(thing)" = "$(l:items/thing)"
//!
//! [link_overrides]
//! "hexcasting:patterns/great" = "https://hexcasting.example/great-spells"
//!
//! [textures]
//! missing = ["minecraft:chest"]
//! ```
//!
//! Relative paths are resolved against the directory containing the file.

use crate::plugin::MinecraftVersion;
use crate::resource::ResourceLocation;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Setup mistakes detectable before any book is processed. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("duplicate variant `{key}` registered in group {group}")]
    DuplicateVariant { group: String, key: String },
    #[error("validation context has no {0} facet")]
    MissingFacet(&'static str),
    #[error("unknown book type `{book_type}` (known: {})", .known.join(", "))]
    UnknownBookType {
        book_type: String,
        known: Vec<String>,
    },
    #[error("no plugin provides mod `{0}`")]
    UnknownMod(String),
    #[error("book redirect chain starting at {start} reached the limit of {cap} hops")]
    RedirectLimit { start: ResourceLocation, cap: usize },
    #[error("no plugin declares a minecraft version")]
    NoMinecraftVersion,
    #[error("unknown template `{0}`")]
    UnknownTemplate(String),
}

/// Properties loaded from `hexbook.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Properties {
    /// Mod id of the project being documented.
    pub modid: String,
    /// Version string published in the book url (`<url>/v/<version>`).
    pub version: String,
    /// Book to build. Optional only for metadata-only invocations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book: Option<ResourceLocation>,
    /// Further books of the same format, built and exported after `book`.
    pub extra_books: Vec<ResourceLocation>,
    /// Book format, matched against each book plugin's `book_type`.
    pub book_type: String,
    pub default_lang: String,
    pub default_branch: String,
    /// Gates format differences such as the pre-1.20 `extend` redirect.
    pub minecraft_version: String,
    /// Root url the rendered book is published at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Base url textures exported by this mod are served from.
    pub asset_url: String,
    /// Resource roots in priority order; later roots override earlier ones.
    pub resource_dirs: Vec<ResourceDirProps>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
    pub cache_dir: PathBuf,
    pub entry_id_blacklist: BTreeSet<ResourceLocation>,
    pub macros: BTreeMap<String, String>,
    /// `$(l:...)` targets sent to a fixed url instead of into the book.
    pub link_overrides: BTreeMap<String, String>,
    /// `$(0)` sets the text color to black instead of resetting it.
    pub is_0_black: bool,
    /// Maximum number of `extend` hops followed when loading book data.
    pub max_redirects: usize,
    pub textures: TexturesProps,
    /// Free-form settings for plugins. Not interpreted here.
    pub extra: toml::Table,
    /// Directory containing the properties file. Set by [`Properties::load`].
    #[serde(skip)]
    pub props_dir: PathBuf,
}

impl Default for Properties {
    fn default() -> Self {
        Self {
            modid: String::new(),
            version: "0.0.0".to_string(),
            book: None,
            extra_books: Vec::new(),
            book_type: "patchouli".to_string(),
            default_lang: "en_us".to_string(),
            default_branch: "main".to_string(),
            minecraft_version: "1.20.1".to_string(),
            url: None,
            asset_url: String::new(),
            resource_dirs: Vec::new(),
            export_dir: None,
            cache_dir: PathBuf::from(".hexbook"),
            entry_id_blacklist: BTreeSet::new(),
            macros: BTreeMap::new(),
            link_overrides: BTreeMap::new(),
            is_0_black: false,
            max_redirects: 10,
            textures: TexturesProps::default(),
            extra: toml::Table::new(),
            props_dir: PathBuf::new(),
        }
    }
}

/// One resource root. Either a directory, a mod whose plugin supplies its
/// own directories, or a directory attributed to a mod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResourceDirProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Mod that ships this root. `None` means the project itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modid: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TexturesProps {
    /// Set to false to skip texture resolution entirely.
    pub enabled: bool,
    /// Texture ids allowed to be absent (`"*"` allows all).
    pub missing: BTreeSet<String>,
    #[serde(rename = "override")]
    pub overrides: BTreeMap<ResourceLocation, TextureOverride>,
}

impl Default for TexturesProps {
    fn default() -> Self {
        Self {
            enabled: true,
            missing: BTreeSet::new(),
            overrides: BTreeMap::new(),
        }
    }
}

impl TexturesProps {
    pub fn allows_missing(&self, id: &ResourceLocation) -> bool {
        self.missing.contains("*") || self.missing.contains(&id.to_string())
    }
}

/// Replacement for a texture: a direct url, or another texture id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextureOverride {
    Url {
        url: String,
        #[serde(default)]
        pixelated: bool,
    },
    Texture {
        texture: ResourceLocation,
    },
}

impl Properties {
    /// Validate values that serde alone cannot check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.modid.is_empty() {
            return Err(ConfigError::Validation("modid must be set".into()));
        }
        if ResourceLocation::new(&self.modid, "x").is_err() {
            return Err(ConfigError::Validation(format!(
                "modid `{}` is not a valid namespace",
                self.modid
            )));
        }
        if self.default_lang.is_empty() {
            return Err(ConfigError::Validation(
                "default_lang must not be empty".into(),
            ));
        }
        if self.max_redirects == 0 {
            return Err(ConfigError::Validation(
                "max_redirects must be at least 1".into(),
            ));
        }
        if MinecraftVersion::parse(&self.minecraft_version).is_none() {
            return Err(ConfigError::Validation(format!(
                "minecraft_version `{}` is not a dotted version",
                self.minecraft_version
            )));
        }
        let mut books = BTreeSet::new();
        for id in self.book.iter().chain(&self.extra_books) {
            if !books.insert(id) {
                return Err(ConfigError::Validation(format!(
                    "book `{id}` is listed more than once in book and extra_books"
                )));
            }
        }
        for (i, dir) in self.resource_dirs.iter().enumerate() {
            if dir.path.is_none() && dir.modid.is_none() {
                return Err(ConfigError::Validation(format!(
                    "resource_dirs[{i}] needs a path or a modid"
                )));
            }
        }
        Ok(())
    }

    /// The configured book id, or a configuration error if none is set.
    pub fn book_id(&self) -> Result<&ResourceLocation, ConfigError> {
        self.book
            .as_ref()
            .ok_or_else(|| ConfigError::Validation("book must be set to build a book".into()))
    }

    /// The configured book followed by `extra_books`.
    pub fn book_ids(&self) -> Result<Vec<&ResourceLocation>, ConfigError> {
        let mut ids = vec![self.book_id()?];
        ids.extend(&self.extra_books);
        Ok(ids)
    }

    /// Url this version of the book is published at.
    pub fn book_url(&self) -> Option<String> {
        self.url
            .as_ref()
            .map(|url| format!("{}/v/{}", url.trim_end_matches('/'), self.version))
    }

    /// Location in this mod's namespace.
    pub fn mod_loc(&self, path: &str) -> Result<ResourceLocation, crate::resource::ParseError> {
        ResourceLocation::new(&self.modid, path)
    }

    /// Resolve relative paths against `props_dir`.
    fn resolve_paths(&mut self) {
        let base = self.props_dir.clone();
        let resolve = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };
        for dir in &mut self.resource_dirs {
            if let Some(path) = &dir.path {
                dir.path = Some(resolve(path));
            }
        }
        self.export_dir = self.export_dir.as_deref().map(resolve);
        self.cache_dir = resolve(&self.cache_dir);
    }

    /// Load properties from a file. See the module docs for the format.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let props_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self::load_str(&content, props_dir)
    }

    /// Load properties from TOML text, resolving paths against `props_dir`.
    pub fn load_str(content: &str, props_dir: PathBuf) -> Result<Self, ConfigError> {
        let overlay: toml::Value = toml::from_str(content)?;
        let merged = merge_toml(stock_defaults_value(), overlay);
        let mut props: Properties = merged.try_into()?;
        props.props_dir = props_dir;
        props.resolve_paths();
        props.validate()?;
        log::trace!("{props:?}");
        Ok(props)
    }
}

/// Returns the stock default properties as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Properties::default()).expect("default properties must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Returns a fully-commented stock `hexbook.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# hexbook properties
# ==================
# Values shown below are the defaults unless marked as an example.
# Unknown keys cause an error.

# Mod id of the project being documented (required).
modid = "examplemod"

# Version published in the book url: <url>/v/<version>
version = "0.0.0"

# Book to build, as namespace:path (required for `build` and `check`).
book = "examplemod:guide"

# More books to build from the same roots. Each is exported under
# <lang>/<namespace>/<path>/ next to the main book.
extra_books = []

# Book format. Must match a book plugin; "patchouli" is built in.
book_type = "patchouli"

default_lang = "en_us"
default_branch = "main"

# Minecraft version the book targets. Below 1.20, book.json may use the
# legacy `extend` field to redirect to another book.
minecraft_version = "1.20.1"

# Where the rendered book is published (example). Other mods link to
# entries in this book through <url>/v/<version>.
# url = "https://example.github.io/examplemod"

# Base url this mod's textures are served from.
asset_url = ""

# Output directory for rendered files and exported metadata (example).
# export_dir = "dist"

# Build cache (export hashes). Safe to delete.
cache_dir = ".hexbook"

# Entries left out of the book entirely.
entry_id_blacklist = []

# Give up after this many `extend` redirects.
max_redirects = 10

# If true, the style code $(0) turns text black; otherwise it resets the
# text color.
is_0_black = false

# ---------------------------------------------------------------------------
# Resource roots, lowest priority first. A root with only `modid` pulls the
# directories that mod's plugin provides; `path` + `modid` marks a directory
# as shipped by another mod (its entries link to that mod's book).
# ---------------------------------------------------------------------------
# [[resource_dirs]]
# path = "src/main/resources"
#
# [[resource_dirs]]
# path = "vendor/othermod"
# modid = "othermod"

# ---------------------------------------------------------------------------
# Text macros applied to all formatted text after book macros.
# ---------------------------------------------------------------------------
[macros]
# "$(media)" = "$(l:items/amethyst)media$(/l)"

# ---------------------------------------------------------------------------
# Link targets that point somewhere other than this book.
# ---------------------------------------------------------------------------
[link_overrides]
# "examplemod:patterns/great" = "https://example.com/great-spells"

# ---------------------------------------------------------------------------
# Textures
# ---------------------------------------------------------------------------
[textures]
enabled = true
# Texture ids allowed to be missing; "*" allows any.
missing = []

# [textures.override]
# "examplemod:item/wand" = { url = "https://example.com/wand.png", pixelated = true }
# "examplemod:item/staff" = { texture = "examplemod:item/wand" }

# ---------------------------------------------------------------------------
# Settings read by plugins, passed through untouched.
# ---------------------------------------------------------------------------
[extra]
# [extra.examplemod]
# pattern_stubs = ["src/main/java/Patterns.java"]
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn load(toml: &str) -> Result<Properties, ConfigError> {
        Properties::load_str(toml, PathBuf::from("/project"))
    }

    #[test]
    fn defaults_fill_missing_keys() {
        let props = load(r#"modid = "hexcasting""#).unwrap();
        assert_eq!(props.modid, "hexcasting");
        assert_eq!(props.book_type, "patchouli");
        assert_eq!(props.default_lang, "en_us");
        assert_eq!(props.default_branch, "main");
        assert_eq!(props.max_redirects, 10);
        assert!(props.textures.enabled);
        assert!(props.book.is_none());
    }

    #[test]
    fn modid_is_required() {
        let err = load("").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("modid")));
    }

    #[test]
    fn invalid_modid_rejected() {
        assert!(load(r#"modid = "Hex Casting""#).is_err());
    }

    #[test]
    fn unknown_key_rejected() {
        let err = load("modid = \"hex\"\nbogus = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let err = load("modid = \"hex\"\n[textures]\nbogus = true").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn relative_paths_resolve_against_props_dir() {
        let props = load(
            r#"
modid = "hex"
export_dir = "dist"

[[resource_dirs]]
path = "resources"

[[resource_dirs]]
path = "/abs/other"
modid = "other"
"#,
        )
        .unwrap();
        assert_eq!(props.export_dir, Some(PathBuf::from("/project/dist")));
        assert_eq!(props.cache_dir, PathBuf::from("/project/.hexbook"));
        assert_eq!(
            props.resource_dirs[0].path,
            Some(PathBuf::from("/project/resources"))
        );
        assert_eq!(props.resource_dirs[1].path, Some(PathBuf::from("/abs/other")));
        assert_eq!(props.resource_dirs[1].modid.as_deref(), Some("other"));
    }

    #[test]
    fn resource_dir_needs_path_or_modid() {
        let err = load("modid = \"hex\"\n[[resource_dirs]]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("resource_dirs[0]")));
    }

    #[test]
    fn zero_redirects_rejected() {
        assert!(load("modid = \"hex\"\nmax_redirects = 0").is_err());
    }

    #[test]
    fn bad_minecraft_version_rejected() {
        assert!(load("modid = \"hex\"\nminecraft_version = \"latest\"").is_err());
    }

    #[test]
    fn blacklist_and_macros_parse() {
        let props = load(
            r#"
modid = "hex"
entry_id_blacklist = ["hex:secret", "hidden"]

[macros]
"$(thing)" = "stuff"
"#,
        )
        .unwrap();
        assert!(
            props
                .entry_id_blacklist
                .contains(&ResourceLocation::parse("hex:secret").unwrap())
        );
        assert!(
            props
                .entry_id_blacklist
                .contains(&ResourceLocation::parse("minecraft:hidden").unwrap())
        );
        assert_eq!(props.macros["$(thing)"], "stuff");
    }

    #[test]
    fn texture_overrides_parse_both_forms() {
        let props = load(
            r#"
modid = "hex"

[textures]
missing = ["*"]

[textures.override]
"hex:item/wand" = { url = "https://example.com/wand.png", pixelated = true }
"hex:item/staff" = { texture = "hex:item/wand" }
"#,
        )
        .unwrap();
        let wand = ResourceLocation::parse("hex:item/wand").unwrap();
        let staff = ResourceLocation::parse("hex:item/staff").unwrap();
        assert_eq!(
            props.textures.overrides[&wand],
            TextureOverride::Url {
                url: "https://example.com/wand.png".into(),
                pixelated: true
            }
        );
        assert_eq!(
            props.textures.overrides[&staff],
            TextureOverride::Texture {
                texture: wand.clone()
            }
        );
        assert!(props.textures.allows_missing(&wand));
    }

    #[test]
    fn book_url_includes_version() {
        let props = load(
            r#"
modid = "hex"
version = "1.2.3"
url = "https://hex.example/"
"#,
        )
        .unwrap();
        assert_eq!(props.book_url().as_deref(), Some("https://hex.example/v/1.2.3"));
    }

    #[test]
    fn book_id_required_when_building() {
        let props = load(r#"modid = "hex""#).unwrap();
        assert!(props.book_id().is_err());
    }

    #[test]
    fn extra_books_follow_the_main_book() {
        let props = load(
            r#"
modid = "hex"
book = "hex:guide"
extra_books = ["hex:lore", "other:manual"]
"#,
        )
        .unwrap();
        let ids: Vec<String> = props.book_ids().unwrap().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, vec!["hex:guide", "hex:lore", "other:manual"]);

        let err = load("modid = \"hex\"\nbook = \"hex:guide\"\nextra_books = [\"hex:guide\"]").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(msg) if msg.contains("hex:guide")));
    }

    #[test]
    fn link_overrides_and_black_reset_parse() {
        let props = load(
            r#"
modid = "hex"
is_0_black = true

[link_overrides]
"hex:patterns/great" = "https://hex.example/great"
"#,
        )
        .unwrap();
        assert!(props.is_0_black);
        assert_eq!(
            props.link_overrides["hex:patterns/great"],
            "https://hex.example/great"
        );
        assert!(!load(r#"modid = "hex""#).unwrap().is_0_black);
    }

    #[test]
    fn extra_table_is_passed_through() {
        let props = load(
            r#"
modid = "hex"

[extra.hexcasting]
pattern_stubs = ["Patterns.java"]
"#,
        )
        .unwrap();
        let stubs = props.extra["hexcasting"]["pattern_stubs"].as_array().unwrap();
        assert_eq!(stubs[0].as_str(), Some("Patterns.java"));
        assert!(load(r#"modid = "hex""#).unwrap().extra.is_empty());
    }

    #[test]
    fn load_reads_file_and_sets_props_dir() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("hexbook.toml");
        fs::write(&path, "modid = \"hex\"\nbook = \"hex:guide\"").unwrap();

        let props = Properties::load(&path).unwrap();
        assert_eq!(props.props_dir, tmp.path());
        assert_eq!(props.book_id().unwrap().to_string(), "hex:guide");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = Properties::load(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn merge_toml_table_merge() {
        let base: toml::Value = toml::from_str("[textures]\nenabled = true\nmissing = []").unwrap();
        let overlay: toml::Value = toml::from_str("[textures]\nenabled = false").unwrap();
        let merged = merge_toml(base, overlay);
        let textures = merged.get("textures").unwrap();
        assert_eq!(textures.get("enabled").unwrap().as_bool(), Some(false));
        assert!(textures.get("missing").is_some());
    }

    #[test]
    fn merge_toml_scalar_override() {
        let merged = merge_toml(
            toml::Value::String("a".into()),
            toml::Value::String("b".into()),
        );
        assert_eq!(merged.as_str(), Some("b"));
    }

    #[test]
    fn stock_config_toml_is_valid() {
        let props = load(stock_config_toml()).unwrap();
        assert_eq!(props.modid, "examplemod");
        assert_eq!(props.book_id().unwrap().to_string(), "examplemod:guide");
    }
}
