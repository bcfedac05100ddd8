//! Published per-mod metadata and cross-mod lookups.
//!
//! Each documented mod exports a `<modid>.hexdoc.json` next to its rendered
//! book:
//!
//! ```json
//! {
//!   "book_url": "https://hexcasting.example/v/0.11.2",
//!   "asset_url": "https://raw.githubusercontent.com/example/hexcasting/main",
//!   "textures": [
//!     { "id": "hexcasting:item/wand", "url": "assets/hexcasting/textures/item/wand.png" }
//!   ]
//! }
//! ```
//!
//! Other mods' builds read these files from their resource roots, so the
//! format must stay backward-readable: unknown fields are ignored and
//! everything except `asset_url` has a default.
//!
//! [`MetadataIndex`] is the finalized view over every loaded file. It is
//! assembled once before book builds start and shared read-only.

use crate::error::Error;
use crate::loader::{ResourceKind, ResourceLoader};
use crate::props::TextureOverride;
use crate::resource::ResourceLocation;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use thiserror::Error;

/// Suffix of published metadata files.
pub const METADATA_SUFFIX: &str = ".hexdoc.json";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no metadata loaded for mod `{modid}`, so its book url and assets are unknown")]
    UnknownMod { modid: String },
    #[error("mod `{modid}` did not publish a book url")]
    NoBookUrl { modid: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexdocMetadata {
    #[serde(default)]
    pub book_url: Option<String>,
    pub asset_url: String,
    #[serde(default)]
    pub textures: Vec<Texture>,
}

impl HexdocMetadata {
    /// File name the metadata for `modid` is exported under.
    pub fn path(modid: &str) -> PathBuf {
        PathBuf::from(format!("{modid}{METADATA_SUFFIX}"))
    }

    /// Absolute url of a texture path published by this mod.
    pub fn asset(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") || self.asset_url.is_empty() {
            url.to_string()
        } else {
            format!(
                "{}/{}",
                self.asset_url.trim_end_matches('/'),
                url.trim_start_matches('/')
            )
        }
    }
}

/// A texture id and where it is served from (relative to the publishing
/// mod's `asset_url`, or absolute).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Texture {
    pub id: ResourceLocation,
    pub url: String,
}

impl Texture {
    /// Index the textures shipped by the project's own roots, then apply
    /// `[textures.override]`.
    pub fn load_all(loader: &ResourceLoader) -> Result<Vec<Texture>, Error> {
        let mut by_id = BTreeMap::new();
        for file in loader.find_files(ResourceKind::Assets, "textures", "png")? {
            let Some(root) = loader.root(file.root) else {
                continue;
            };
            if !root.own {
                continue;
            }
            let Ok(relative) = file.path.strip_prefix(&root.path) else {
                continue;
            };
            let url = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            by_id.insert(file.id, url);
        }

        for (id, texture_override) in &loader.props().textures.overrides {
            let url = match texture_override {
                TextureOverride::Url { url, .. } => url.clone(),
                TextureOverride::Texture { texture } => match by_id.get(texture) {
                    Some(url) => url.clone(),
                    None => return Err(Error::not_found("textures", texture)),
                },
            };
            by_id.insert(id.clone(), url);
        }

        log::debug!("indexed {} textures", by_id.len());
        Ok(by_id
            .into_iter()
            .map(|(id, url)| Texture { id, url })
            .collect())
    }
}

/// Every mod's metadata, including the project's own.
#[derive(Debug, Clone, Default)]
pub struct MetadataIndex {
    own_modid: String,
    mods: BTreeMap<String, HexdocMetadata>,
    /// texture id -> (publishing mod, url relative to its asset_url)
    textures: HashMap<ResourceLocation, (String, String)>,
}

impl MetadataIndex {
    pub fn new(own_modid: &str, mods: BTreeMap<String, HexdocMetadata>) -> Self {
        let mut textures = HashMap::new();
        // Own textures take precedence over anything another mod published.
        let order = mods
            .iter()
            .filter(|(modid, _)| modid.as_str() != own_modid)
            .chain(mods.iter().filter(|(modid, _)| modid.as_str() == own_modid));
        for (modid, metadata) in order {
            for texture in &metadata.textures {
                textures.insert(texture.id.clone(), (modid.clone(), texture.url.clone()));
            }
        }
        Self {
            own_modid: own_modid.to_string(),
            mods,
            textures,
        }
    }

    pub fn own_modid(&self) -> &str {
        &self.own_modid
    }

    pub fn mods(&self) -> impl Iterator<Item = (&str, &HexdocMetadata)> {
        self.mods.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, modid: &str) -> Result<&HexdocMetadata, LookupError> {
        self.mods.get(modid).ok_or_else(|| LookupError::UnknownMod {
            modid: modid.to_string(),
        })
    }

    /// Url entries shipped by `modid` link into. `None` for the project's
    /// own entries, which link within the book.
    pub fn link_base(&self, modid: &str) -> Result<Option<&str>, LookupError> {
        if modid == self.own_modid {
            return Ok(None);
        }
        self.get(modid)?
            .book_url
            .as_deref()
            .map(Some)
            .ok_or_else(|| LookupError::NoBookUrl {
                modid: modid.to_string(),
            })
    }

    /// Absolute url for a texture id.
    ///
    /// `Ok(None)` means the texture's mod is known but the texture is not
    /// published. A texture in a namespace with no metadata at all is a
    /// [`LookupError::UnknownMod`].
    pub fn texture_url(&self, id: &ResourceLocation) -> Result<Option<String>, LookupError> {
        if let Some((modid, url)) = self.textures.get(id) {
            return Ok(Some(self.get(modid)?.asset(url)));
        }
        let namespace = id.namespace();
        if namespace == self.own_modid || self.mods.contains_key(namespace) {
            Ok(None)
        } else {
            Err(LookupError::UnknownMod {
                modid: namespace.to_string(),
            })
        }
    }
}
