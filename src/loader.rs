//! Merged view over the configured resource roots.
//!
//! A resource root is a directory laid out like a Minecraft resource or data
//! pack:
//!
//! ```text
//! <root>/
//! ├── othermod.hexdoc.json                  # published metadata (optional)
//! ├── assets/<ns>/lang/en_us.json
//! ├── assets/<ns>/textures/item/wand.png
//! └── data/<ns>/patchouli_books/<book>/
//!     ├── book.json
//!     └── en_us/{categories,entries}/**/*.json
//! ```
//!
//! Roots are listed lowest priority first. When two roots hold the same
//! relative path, the later one wins. Parsed JSON is cached per absolute path
//! for the lifetime of the loader, which is one invocation.

use crate::cache::Exporter;
use crate::error::Error;
use crate::metadata::{HexdocMetadata, METADATA_SUFFIX};
use crate::plugin::PluginManager;
use crate::props::{ConfigError, Properties};
use crate::resource::ResourceLocation;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Assets,
    Data,
}

impl ResourceKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            ResourceKind::Assets => "assets",
            ResourceKind::Data => "data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRoot {
    pub path: PathBuf,
    /// Mod that ships this root.
    pub modid: String,
    /// True for roots belonging to the project being documented.
    pub own: bool,
}

/// One JSON resource and the root it came from.
#[derive(Debug, Clone)]
pub struct LoadedResource {
    pub id: ResourceLocation,
    /// Index into [`ResourceLoader::roots`].
    pub root: usize,
    pub data: Arc<Value>,
}

/// A non-JSON file found by [`ResourceLoader::find_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundFile {
    pub id: ResourceLocation,
    pub root: usize,
    pub path: PathBuf,
}

pub struct ResourceLoader {
    props: Arc<Properties>,
    roots: Vec<ResourceRoot>,
    exporter: Option<Exporter>,
    cache: Mutex<HashMap<PathBuf, Arc<Value>>>,
}

impl ResourceLoader {
    pub fn new(props: Arc<Properties>, roots: Vec<ResourceRoot>) -> Self {
        Self {
            props,
            roots,
            exporter: None,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Expand `resource_dirs` into roots. A dir naming only a mod pulls in
    /// the directories that mod's plugin provides.
    pub fn from_props(props: Arc<Properties>, plugins: &PluginManager) -> Result<Self, ConfigError> {
        let mut roots = Vec::new();
        for dir in &props.resource_dirs {
            let modid = dir.modid.clone().unwrap_or_else(|| props.modid.clone());
            let own = modid == props.modid;
            match &dir.path {
                Some(path) => roots.push(ResourceRoot {
                    path: path.clone(),
                    modid,
                    own,
                }),
                None => {
                    let plugin = plugins.mod_plugin(&modid)?;
                    for path in plugin.resource_dirs() {
                        roots.push(ResourceRoot {
                            path,
                            modid: modid.clone(),
                            own,
                        });
                    }
                }
            }
        }
        for root in &roots {
            log::debug!("resource root {} ({})", root.path.display(), root.modid);
        }
        Ok(Self::new(props, roots))
    }

    pub fn with_exporter(mut self, exporter: Exporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn props(&self) -> &Properties {
        &self.props
    }

    pub fn props_arc(&self) -> Arc<Properties> {
        Arc::clone(&self.props)
    }

    pub fn roots(&self) -> &[ResourceRoot] {
        &self.roots
    }

    pub fn root(&self, index: usize) -> Option<&ResourceRoot> {
        self.roots.get(index)
    }

    pub fn exporter(&self) -> Option<&Exporter> {
        self.exporter.as_ref()
    }

    /// Load `<kind>/<ns>/<folder>/<path>.json` from the highest-priority root
    /// that has it.
    pub fn load_resource(
        &self,
        kind: ResourceKind,
        folder: &str,
        id: &ResourceLocation,
    ) -> Result<LoadedResource, Error> {
        let relative = Path::new(kind.dir_name()).join(id.file_path(folder, ".json"));
        for (index, root) in self.roots.iter().enumerate().rev() {
            let path = root.path.join(&relative);
            if path.is_file() {
                return Ok(LoadedResource {
                    id: id.clone(),
                    root: index,
                    data: self.read_json(&path)?,
                });
            }
        }
        Err(Error::not_found(folder, id))
    }

    /// Every JSON resource under `<kind>/*/<folder>/`, one per id, with later
    /// roots overriding earlier ones. Sorted by id.
    pub fn find_all(&self, kind: ResourceKind, folder: &str) -> Result<Vec<LoadedResource>, Error> {
        let mut by_id = BTreeMap::new();
        for resource in self.find_layers(kind, folder)? {
            by_id.insert(resource.id.clone(), resource);
        }
        Ok(by_id.into_values().collect())
    }

    /// Like [`find_all`](Self::find_all) but keeps every root's copy, in
    /// root order. Used where files merge rather than replace (lang tables).
    pub fn find_layers(&self, kind: ResourceKind, folder: &str) -> Result<Vec<LoadedResource>, Error> {
        self.find_files(kind, folder, "json")?
            .into_iter()
            .map(|file| {
                Ok(LoadedResource {
                    data: self.read_json(&file.path)?,
                    id: file.id,
                    root: file.root,
                })
            })
            .collect()
    }

    /// Files with extension `ext` under `<kind>/*/<folder>/`, in root order.
    /// Ids are the path below `folder` without the extension.
    pub fn find_files(&self, kind: ResourceKind, folder: &str, ext: &str) -> Result<Vec<FoundFile>, Error> {
        let mut found = Vec::new();
        for (index, root) in self.roots.iter().enumerate() {
            let base = root.path.join(kind.dir_name());
            for namespace in sorted_dirs(&base)? {
                let dir = base.join(&namespace).join(folder);
                if !dir.is_dir() {
                    continue;
                }
                for entry in WalkDir::new(&dir).sort_by_file_name() {
                    let entry = entry.map_err(|e| Error::invalid(e.to_string()))?;
                    let path = entry.path();
                    if !entry.file_type().is_file()
                        || path.extension().and_then(|e| e.to_str()) != Some(ext)
                    {
                        continue;
                    }
                    let Ok(relative) = path.with_extension("").strip_prefix(&dir).map(Path::to_path_buf) else {
                        continue;
                    };
                    let relative = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    let id = match ResourceLocation::new(&namespace, &relative) {
                        Ok(id) => id,
                        Err(e) => {
                            log::warn!("skipping {}: {e}", path.display());
                            continue;
                        }
                    };
                    found.push(FoundFile {
                        id,
                        root: index,
                        path: path.to_path_buf(),
                    });
                }
            }
        }
        Ok(found)
    }

    /// Read every `<modid>.hexdoc.json` at the top level of each root.
    pub fn load_metadata(&self) -> Result<BTreeMap<String, HexdocMetadata>, Error> {
        let mut out = BTreeMap::new();
        for root in &self.roots {
            let Ok(dir) = fs::read_dir(&root.path) else {
                continue;
            };
            let mut files: Vec<PathBuf> = dir
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.is_file())
                .collect();
            files.sort();
            for path in files {
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                let Some(modid) = name.strip_suffix(METADATA_SUFFIX) else {
                    continue;
                };
                let data = self.read_json(&path)?;
                let metadata: HexdocMetadata = serde_json::from_value((*data).clone())
                    .map_err(|e| Error::invalid(format!("{}: {e}", path.display())))?;
                log::debug!("loaded metadata for {modid} from {}", path.display());
                out.insert(modid.to_string(), metadata);
            }
        }
        Ok(out)
    }

    /// Write an artifact through the export cache.
    pub fn export(&self, path: &Path, content: &[u8]) -> Result<bool, Error> {
        let exporter = self
            .exporter
            .as_ref()
            .ok_or_else(|| ConfigError::Validation("export_dir must be set to export files".into()))?;
        Ok(exporter.export(path, content)?)
    }

    fn read_json(&self, path: &Path) -> Result<Arc<Value>, Error> {
        if let Some(hit) = self
            .cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
        {
            return Ok(Arc::clone(hit));
        }
        let content = fs::read_to_string(path)?;
        let value: Value = serde_json::from_str(&content)
            .map_err(|e| Error::invalid(format!("{}: {e}", path.display())))?;
        let value = Arc::new(value);
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(path.to_path_buf(), Arc::clone(&value));
        Ok(value)
    }
}

/// Subdirectory names of `dir`, sorted. Missing directories have none.
fn sorted_dirs(dir: &Path) -> Result<Vec<String>, Error> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use serde_json::json;

    fn loader_for(roots: Vec<ResourceRoot>) -> ResourceLoader {
        ResourceLoader::new(Arc::new(props("hex")), roots)
    }

    #[test]
    fn later_roots_override_earlier() {
        let base = TempRoot::new();
        base.write_json("data/hex/things/a.json", &json!({"from": "base"}));
        base.write_json("data/hex/things/b.json", &json!({"from": "base"}));
        let over = TempRoot::new();
        over.write_json("data/hex/things/a.json", &json!({"from": "over"}));

        let loader = loader_for(vec![base.root("hex"), over.root("hex")]);
        let a = loader
            .load_resource(ResourceKind::Data, "things", &loc("hex:a"))
            .unwrap();
        assert_eq!(a.data["from"], "over");
        assert_eq!(a.root, 1);

        let all = loader.find_all(ResourceKind::Data, "things").unwrap();
        let ids: Vec<String> = all.iter().map(|r| r.id.to_string()).collect();
        assert_eq!(ids, vec!["hex:a", "hex:b"]);
        assert_eq!(all[0].data["from"], "over");

        let layers = loader.find_layers(ResourceKind::Data, "things").unwrap();
        assert_eq!(layers.len(), 3);
    }

    #[test]
    fn missing_resource_is_not_found() {
        let loader = loader_for(vec![TempRoot::new().root("hex")]);
        let err = loader
            .load_resource(ResourceKind::Assets, "lang", &loc("hex:en_us"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { ref group, .. } if group == "lang"));
    }

    #[test]
    fn nested_ids_use_forward_slashes() {
        let root = TempRoot::new();
        root.write_json("data/hex/things/deep/er/x.json", &json!({}));
        root.write("data/hex/things/notes.txt", "ignored");
        let loader = loader_for(vec![root.root("hex")]);
        let all = loader.find_all(ResourceKind::Data, "things").unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, loc("hex:deep/er/x"));
    }

    #[test]
    fn find_files_by_extension() {
        let root = TempRoot::new();
        root.write("assets/hex/textures/item/wand.png", "png");
        root.write("assets/hex/textures/item/wand.png.mcmeta", "{}");
        let loader = loader_for(vec![root.root("hex")]);
        let files = loader
            .find_files(ResourceKind::Assets, "textures", "png")
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].id, loc("hex:item/wand"));
    }

    #[test]
    fn files_with_invalid_ids_are_skipped() {
        let root = TempRoot::new();
        root.write("assets/hex/textures/item/wand.png", "png");
        root.write("assets/hex/textures/item/Wand Old.png", "png");
        let loader = loader_for(vec![root.root("hex")]);
        let files = loader
            .find_files(ResourceKind::Assets, "textures", "png")
            .unwrap();
        let ids: Vec<String> = files.iter().map(|f| f.id.to_string()).collect();
        assert_eq!(ids, vec!["hex:item/wand"]);
    }

    #[test]
    fn invalid_json_names_the_file() {
        let root = TempRoot::new();
        root.write("data/hex/things/bad.json", "{ nope");
        let loader = loader_for(vec![root.root("hex")]);
        let err = loader.find_all(ResourceKind::Data, "things").unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn metadata_files_are_read_from_root_top_level() {
        let root = TempRoot::new();
        root.write_json(
            "other.hexdoc.json",
            &json!({"book_url": "https://other.example/v/1", "asset_url": "https://cdn", "textures": []}),
        );
        let loader = loader_for(vec![root.root("other")]);
        let metadata = loader.load_metadata().unwrap();
        assert_eq!(
            metadata["other"].book_url.as_deref(),
            Some("https://other.example/v/1")
        );
    }

    #[test]
    fn export_requires_export_dir() {
        let loader = loader_for(Vec::new());
        let err = loader.export(Path::new("a.json"), b"{}").unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn modid_only_dirs_expand_through_plugins() {
        let vendored = TempRoot::new();
        let mut p = props("hex");
        p.resource_dirs = vec![crate::props::ResourceDirProps {
            path: None,
            modid: Some("other".into()),
        }];
        let plugins = plugin_manager_with(vec![Box::new(StaticModPlugin::new(
            "other",
            vec![vendored.path().to_path_buf()],
        ))]);
        let loader = ResourceLoader::from_props(Arc::new(p), &plugins).unwrap();
        assert_eq!(loader.roots().len(), 1);
        assert_eq!(loader.roots()[0].modid, "other");
        assert!(!loader.roots()[0].own);

        let mut p = props("hex");
        p.resource_dirs = vec![crate::props::ResourceDirProps {
            path: None,
            modid: Some("missing".into()),
        }];
        assert!(matches!(
            ResourceLoader::from_props(Arc::new(p), &plugins),
            Err(ConfigError::UnknownMod(_))
        ));
    }
}
