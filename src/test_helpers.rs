//! Shared test utilities for the hexbook test suite.
//!
//! Provides resource-root fixtures on temp directories and prebuilt
//! validation contexts with as many facets as a test needs.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let root = TempRoot::new();
//! root.write_json("assets/hex/lang/en_us.json", &json!({"hex.x": "X"}));
//!
//! let ctx = ctx_with_roots("hex", vec![root.root("hex")]);
//! assert_eq!(ctx.i18n().unwrap().lookup("hex.x"), Some("X"));
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;

use crate::context::{BookFacet, ValidationContext};
use crate::i18n::I18n;
use crate::loader::{ResourceLoader, ResourceRoot};
use crate::metadata::MetadataIndex;
use crate::model::book::Book;
use crate::pipeline;
use crate::plugin::{BookPlugin, HexbookPlugin, ModPlugin, PatchouliBookPlugin, Plugin, PluginManager, PropsModPlugin};
use crate::props::{Properties, ResourceDirProps};
use crate::resource::ResourceLocation;

// =========================================================================
// Properties and ids
// =========================================================================

/// Properties for `modid` with a book url of `https://<modid>.example/v/1.0.0`.
pub fn props(modid: &str) -> Properties {
    Properties {
        modid: modid.to_string(),
        version: "1.0.0".to_string(),
        book: Some(loc(&format!("{modid}:guide"))),
        url: Some(format!("https://{modid}.example")),
        asset_url: format!("https://{modid}.cdn"),
        ..Properties::default()
    }
}

/// Parse a resource location. Panics on malformed input.
pub fn loc(text: &str) -> ResourceLocation {
    ResourceLocation::parse(text).unwrap_or_else(|e| panic!("bad test id `{text}`: {e}"))
}

// =========================================================================
// Resource roots on disk
// =========================================================================

/// A temp directory laid out like a resource root.
pub struct TempRoot {
    dir: TempDir,
}

impl TempRoot {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// This directory as a root of the project itself.
    pub fn root(&self, modid: &str) -> ResourceRoot {
        ResourceRoot {
            path: self.path().to_path_buf(),
            modid: modid.to_string(),
            own: true,
        }
    }

    /// This directory as a root shipped by another mod.
    pub fn foreign(&self, modid: &str) -> ResourceRoot {
        ResourceRoot {
            own: false,
            ..self.root(modid)
        }
    }

    /// This directory as a `resource_dirs` entry of the project.
    pub fn dir_props(&self) -> ResourceDirProps {
        ResourceDirProps {
            path: Some(self.path().to_path_buf()),
            modid: None,
        }
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn write_json(&self, rel: &str, value: &Value) -> PathBuf {
        self.write(rel, &serde_json::to_string_pretty(value).unwrap())
    }
}

// =========================================================================
// Loaders and plugins
// =========================================================================

pub fn loader_with_roots(modid: &str, roots: Vec<ResourceRoot>) -> ResourceLoader {
    ResourceLoader::new(Arc::new(props(modid)), roots)
}

/// The default plugins for `props("hex")` followed by `extra`.
pub fn plugin_manager_with(extra: Vec<Box<dyn Plugin>>) -> PluginManager {
    let mut plugins: Vec<Box<dyn Plugin>> = vec![
        Box::new(PropsModPlugin::new(&props("hex"))),
        Box::new(HexbookPlugin),
    ];
    plugins.extend(extra);
    PluginManager::new("main", plugins).unwrap()
}

/// A mod that ships fixed resource directories.
#[derive(Clone)]
pub struct StaticModPlugin {
    modid: String,
    dirs: Vec<PathBuf>,
}

impl StaticModPlugin {
    pub fn new(modid: &str, dirs: Vec<PathBuf>) -> Self {
        Self {
            modid: modid.to_string(),
            dirs,
        }
    }
}

impl Plugin for StaticModPlugin {
    fn name(&self) -> &str {
        &self.modid
    }

    fn mod_plugin(&self, _branch: &str) -> Option<Box<dyn ModPlugin>> {
        Some(Box::new(self.clone()))
    }
}

impl ModPlugin for StaticModPlugin {
    fn modid(&self) -> &str {
        &self.modid
    }

    fn full_version(&self) -> &str {
        "0.1.0"
    }

    fn resource_dirs(&self) -> Vec<PathBuf> {
        self.dirs.clone()
    }
}

// =========================================================================
// Validation contexts
// =========================================================================

/// Every facet but the book, with no resource roots and no translations.
pub fn full_ctx(modid: &str) -> ValidationContext {
    let props = Arc::new(props(modid));
    let plugins = PluginManager::for_props(&props).unwrap();
    let loader = ResourceLoader::new(Arc::clone(&props), Vec::new());
    ValidationContext::new(Arc::clone(&props))
        .with_plugins(Arc::new(plugins))
        .with_loader(Arc::new(loader))
        .with_i18n(Arc::new(I18n::from_entries(&props.default_lang, &[], None, false)))
        .with_metadata(Arc::new(MetadataIndex::new(modid, BTreeMap::new())))
}

/// Every facet but the book, loaded from `roots` the way a build does.
pub fn ctx_with_roots(modid: &str, roots: Vec<ResourceRoot>) -> ValidationContext {
    ctx_with_props(props(modid), roots)
}

pub fn ctx_with_props(props: Properties, roots: Vec<ResourceRoot>) -> ValidationContext {
    let props = Arc::new(props);
    let plugins = PluginManager::for_props(&props).unwrap();
    let loader = ResourceLoader::new(Arc::clone(&props), roots);
    let i18n = I18n::load(&loader, &props.default_lang, false).unwrap();
    let metadata = pipeline::load_all_metadata(&loader).unwrap();
    ValidationContext::new(Arc::clone(&props))
        .with_plugins(Arc::new(plugins))
        .with_i18n(Arc::new(i18n))
        .with_metadata(Arc::new(metadata))
        .with_loader(Arc::new(loader))
}

/// [`full_ctx`] with the given translations and the `<modid>:guide` book.
pub fn book_ctx(modid: &str, entries: &[(&str, &str)]) -> ValidationContext {
    full_ctx(modid)
        .with_i18n(Arc::new(I18n::from_entries("en_us", entries, None, false)))
        .with_book(BookFacet::new(loc(&format!("{modid}:guide")), modid))
}

/// A translated book owned by the namespace of `id`.
pub fn book_facet(id: &str) -> BookFacet {
    let id = loc(id);
    let modid = id.namespace().to_string();
    BookFacet::new(id, modid)
}

// =========================================================================
// Sample book
// =========================================================================

/// Write a one-category, one-entry `hex:guide` into `root`.
pub fn write_sample_book(root: &TempRoot) {
    root.write("assets/hex/textures/gui/basics.png", "png");
    root.write_json(
        "assets/hex/lang/en_us.json",
        &json!({
            "hex.book.name": "Hex Notebook",
            "hex.book.landing": "Welcome.",
            "hex.cat.basics": "Basics",
            "hex.cat.basics.desc": "The basics.",
            "hex.entry.media": "Media",
            "hex.entry.media.0": "Media is energy."
        }),
    );
    root.write_json(
        "data/hex/patchouli_books/guide/book.json",
        &json!({
            "name": "hex.book.name",
            "landing_text": "hex.book.landing",
            "i18n": true
        }),
    );
    root.write_json(
        "data/hex/patchouli_books/guide/en_us/categories/basics.json",
        &json!({
            "name": "hex.cat.basics",
            "description": "hex.cat.basics.desc",
            "icon": "hex:textures/gui/basics.png",
            "sortnum": 1
        }),
    );
    root.write_json(
        "data/hex/patchouli_books/guide/en_us/entries/basics/media.json",
        &json!({
            "name": "hex.entry.media",
            "category": "basics",
            "icon": "hex:textures/gui/basics.png",
            "pages": ["hex.entry.media.0"]
        }),
    );
}

/// The sample book, validated and linked in `en_us`.
pub fn sample_book(root: &TempRoot) -> Book {
    write_sample_book(root);
    let mut ctx = ctx_with_roots("hex", vec![root.root("hex")]);
    let data = json!({
        "name": "hex.book.name",
        "landing_text": "hex.book.landing",
        "i18n": true
    });
    let facet = Book::facet(&loc("hex:guide"), &data, true, &ctx).unwrap();
    ctx.set_book(facet);
    PatchouliBookPlugin.validate_book(&data, &ctx).unwrap()
}
