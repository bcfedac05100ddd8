//! Plugin contract and the plugin manager.
//!
//! Plugins are statically linked trait objects handed to
//! [`PluginManager::new`]. Each may contribute up to three capabilities:
//!
//! - **Unions**: variants for the page, recipe and ingredient groups
//!   ([`Plugin::register_unions`]).
//! - **A mod**: a publishable identity with a version, resource roots and
//!   the templates rendered by default ([`ModPlugin`]).
//! - **A book format**: how to load and validate a book's raw data
//!   ([`BookPlugin`]).
//!
//! Registration is one closed pass inside [`PluginManager::new`]; the
//! resulting [`TaggedUnions`] snapshot is immutable and shared by every
//! language build.

use crate::context::ValidationContext;
use crate::error::Error;
use crate::loader::{ResourceKind, ResourceLoader};
use crate::model::book::Book;
use crate::model::{ingredient, page, recipe};
use crate::props::{ConfigError, Properties, ResourceDirProps};
use crate::resolve;
use crate::resource::ResourceLocation;
use crate::union::{TaggedUnions, TaggedUnionsBuilder};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Mod id of the built-in plugin.
pub const HEXBOOK_MODID: &str = "hexbook";

pub trait Plugin: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    fn register_unions(&self, _unions: &mut TaggedUnionsBuilder) -> Result<(), ConfigError> {
        Ok(())
    }

    fn mod_plugin(&self, _branch: &str) -> Option<Box<dyn ModPlugin>> {
        None
    }

    fn book_plugin(&self) -> Option<Box<dyn BookPlugin>> {
        None
    }

    /// Minecraft version this plugin pins, if any.
    fn minecraft_version(&self) -> Option<String> {
        None
    }
}

/// Publishable identity of one mod.
pub trait ModPlugin: Send + Sync {
    fn modid(&self) -> &str;

    /// Version of the mod itself, e.g. `0.11.2`.
    fn full_version(&self) -> &str;

    /// Version of the documentation plugin for the mod.
    fn plugin_version(&self) -> &str {
        self.full_version()
    }

    /// Resource roots this mod ships, lowest priority first.
    fn resource_dirs(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Output file name -> template name, rendered for every language.
    fn default_rendered_templates(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// One book format.
pub trait BookPlugin: Send + Sync {
    /// Format name matched against `book_type` in the properties.
    fn book_type(&self) -> &str;

    /// Load the raw book data for `book_id`, following any redirects the
    /// format supports. Returns the final id with its data.
    fn load_book_data(
        &self,
        book_id: &ResourceLocation,
        loader: &ResourceLoader,
        minecraft: &MinecraftVersion,
        max_redirects: usize,
    ) -> Result<(ResourceLocation, Arc<Value>), Error>;

    fn is_i18n_enabled(&self, book_data: &Value) -> bool;

    /// Build, validate and link the book in the context's language.
    fn validate_book(&self, book_data: &Value, ctx: &ValidationContext) -> Result<Book, Error>;
}

/// Dotted numeric version (`1.19.2`). Missing components compare as zero.
#[derive(Debug, Clone)]
pub struct MinecraftVersion {
    raw: String,
    parts: Vec<u32>,
}

impl MinecraftVersion {
    pub fn parse(text: &str) -> Option<Self> {
        let parts = text
            .split('.')
            .map(|p| p.parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            raw: text.to_string(),
            parts,
        })
    }

    /// True if this version is strictly older than `other`.
    pub fn is_before(&self, other: &str) -> bool {
        match Self::parse(other) {
            Some(other) => *self < other,
            None => false,
        }
    }

    fn part(&self, i: usize) -> u32 {
        self.parts.get(i).copied().unwrap_or(0)
    }
}

impl PartialEq for MinecraftVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MinecraftVersion {}

impl PartialOrd for MinecraftVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MinecraftVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| self.part(i).cmp(&other.part(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl fmt::Display for MinecraftVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// =============================================================================
// Manager
// =============================================================================

pub struct PluginManager {
    branch: String,
    plugins: Vec<Box<dyn Plugin>>,
    mod_plugins: Vec<Box<dyn ModPlugin>>,
    book_plugins: Vec<Box<dyn BookPlugin>>,
    unions: TaggedUnions,
}

impl PluginManager {
    /// Collect every plugin's contributions and freeze the union registry.
    pub fn new(branch: &str, plugins: Vec<Box<dyn Plugin>>) -> Result<Self, ConfigError> {
        let mut builder = TaggedUnionsBuilder::new();
        let mut mod_plugins: Vec<Box<dyn ModPlugin>> = Vec::new();
        let mut book_plugins: Vec<Box<dyn BookPlugin>> = Vec::new();

        for plugin in &plugins {
            log::debug!("loading plugin {}", plugin.name());
            plugin.register_unions(&mut builder)?;

            if let Some(mod_plugin) = plugin.mod_plugin(branch) {
                if mod_plugins.iter().any(|m| m.modid() == mod_plugin.modid()) {
                    return Err(ConfigError::Validation(format!(
                        "mod `{}` is provided by more than one plugin",
                        mod_plugin.modid()
                    )));
                }
                mod_plugins.push(mod_plugin);
            }

            if let Some(book_plugin) = plugin.book_plugin() {
                if book_plugins
                    .iter()
                    .any(|b| b.book_type() == book_plugin.book_type())
                {
                    return Err(ConfigError::Validation(format!(
                        "book type `{}` is provided by more than one plugin",
                        book_plugin.book_type()
                    )));
                }
                book_plugins.push(book_plugin);
            }
        }

        Ok(Self {
            branch: branch.to_string(),
            plugins,
            mod_plugins,
            book_plugins,
            unions: builder.build(),
        })
    }

    /// The project plugin followed by the built-in one.
    pub fn for_props(props: &Properties) -> Result<Self, ConfigError> {
        Self::new(
            &props.default_branch,
            vec![
                Box::new(PropsModPlugin::new(props)),
                Box::new(HexbookPlugin),
            ],
        )
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn unions(&self) -> &TaggedUnions {
        &self.unions
    }

    pub fn mod_plugins(&self) -> impl Iterator<Item = &dyn ModPlugin> {
        self.mod_plugins.iter().map(|m| m.as_ref())
    }

    pub fn mod_plugin(&self, modid: &str) -> Result<&dyn ModPlugin, ConfigError> {
        self.mod_plugins()
            .find(|m| m.modid() == modid)
            .ok_or_else(|| ConfigError::UnknownMod(modid.to_string()))
    }

    pub fn mod_version(&self, modid: &str) -> Result<&str, ConfigError> {
        Ok(self.mod_plugin(modid)?.full_version())
    }

    pub fn book_plugin(&self, book_type: &str) -> Result<&dyn BookPlugin, ConfigError> {
        self.book_plugins
            .iter()
            .map(|b| b.as_ref())
            .find(|b| b.book_type() == book_type)
            .ok_or_else(|| ConfigError::UnknownBookType {
                book_type: book_type.to_string(),
                known: self
                    .book_plugins
                    .iter()
                    .map(|b| b.book_type().to_string())
                    .collect(),
            })
    }

    /// The first plugin that pins a version wins.
    pub fn minecraft_version(&self) -> Result<MinecraftVersion, ConfigError> {
        let raw = self
            .plugins
            .iter()
            .find_map(|p| p.minecraft_version())
            .ok_or(ConfigError::NoMinecraftVersion)?;
        MinecraftVersion::parse(&raw).ok_or_else(|| {
            ConfigError::Validation(format!("minecraft version `{raw}` is not a dotted version"))
        })
    }
}

// =============================================================================
// Built-in plugins
// =============================================================================

/// Registers the built-in unions, the `patchouli` book format and the
/// `hexbook` mod with its default templates.
pub struct HexbookPlugin;

impl Plugin for HexbookPlugin {
    fn name(&self) -> &str {
        HEXBOOK_MODID
    }

    fn register_unions(&self, unions: &mut TaggedUnionsBuilder) -> Result<(), ConfigError> {
        page::register(&mut unions.pages)?;
        recipe::register(&mut unions.recipes)?;
        ingredient::register(&mut unions.ingredients)?;
        Ok(())
    }

    fn mod_plugin(&self, _branch: &str) -> Option<Box<dyn ModPlugin>> {
        Some(Box::new(HexbookModPlugin))
    }

    fn book_plugin(&self) -> Option<Box<dyn BookPlugin>> {
        Some(Box::new(PatchouliBookPlugin))
    }
}

struct HexbookModPlugin;

impl ModPlugin for HexbookModPlugin {
    fn modid(&self) -> &str {
        HEXBOOK_MODID
    }

    fn full_version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    fn default_rendered_templates(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("index.html".to_string(), crate::render::INDEX_TEMPLATE.to_string()),
            ("book.json".to_string(), crate::render::BOOK_JSON_TEMPLATE.to_string()),
        ])
    }
}

/// The project being documented, described by its properties.
#[derive(Debug, Clone)]
pub struct PropsModPlugin {
    modid: String,
    version: String,
    minecraft_version: String,
    resource_dirs: Vec<PathBuf>,
}

impl PropsModPlugin {
    pub fn new(props: &Properties) -> Self {
        let resource_dirs = props
            .resource_dirs
            .iter()
            .filter(|dir| dir.modid.as_deref().is_none_or(|m| m == props.modid))
            .filter_map(|ResourceDirProps { path, .. }| path.clone())
            .collect();
        Self {
            modid: props.modid.clone(),
            version: props.version.clone(),
            minecraft_version: props.minecraft_version.clone(),
            resource_dirs,
        }
    }
}

impl Plugin for PropsModPlugin {
    fn name(&self) -> &str {
        &self.modid
    }

    fn mod_plugin(&self, _branch: &str) -> Option<Box<dyn ModPlugin>> {
        Some(Box::new(self.clone()))
    }

    fn minecraft_version(&self) -> Option<String> {
        Some(self.minecraft_version.clone())
    }
}

impl ModPlugin for PropsModPlugin {
    fn modid(&self) -> &str {
        &self.modid
    }

    fn full_version(&self) -> &str {
        &self.version
    }

    fn resource_dirs(&self) -> Vec<PathBuf> {
        self.resource_dirs.clone()
    }
}

/// Patchouli books: `data/<ns>/patchouli_books/<path>/book.json`.
pub struct PatchouliBookPlugin;

impl BookPlugin for PatchouliBookPlugin {
    fn book_type(&self) -> &str {
        "patchouli"
    }

    /// Before 1.20 a book.json may hold only `extend`, pointing at the book
    /// it adds to. Redirects are followed until `max_redirects` hops.
    fn load_book_data(
        &self,
        book_id: &ResourceLocation,
        loader: &ResourceLoader,
        minecraft: &MinecraftVersion,
        max_redirects: usize,
    ) -> Result<(ResourceLocation, Arc<Value>), Error> {
        let legacy = minecraft.is_before("1.20");
        let mut id = book_id.clone();
        let mut hops = 0;
        loop {
            let resource =
                loader.load_resource(ResourceKind::Data, "patchouli_books", &id.join("book")?)?;
            let extend = match resource.data.get("extend") {
                Some(extend) if legacy => extend,
                _ => return Ok((id, resource.data)),
            };
            hops += 1;
            if hops >= max_redirects {
                return Err(ConfigError::RedirectLimit {
                    start: book_id.clone(),
                    cap: max_redirects,
                }
                .into());
            }
            let next = extend
                .as_str()
                .ok_or_else(|| Error::invalid(format!("{id}: extend must be a string")))?;
            let next = ResourceLocation::parse(next)?;
            log::debug!("book {id} extends {next}");
            id = next;
        }
    }

    fn is_i18n_enabled(&self, book_data: &Value) -> bool {
        book_data.get("i18n").and_then(Value::as_bool) == Some(true)
    }

    fn validate_book(&self, book_data: &Value, ctx: &ValidationContext) -> Result<Book, Error> {
        let book = Book::load(book_data, ctx)?;
        resolve::link_book(book, ctx)
    }
}
