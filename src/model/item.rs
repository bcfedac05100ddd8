//! Items and icons shown in the book.

use crate::context::ValidationContext;
use crate::error::Error;
use crate::model::fields::string;
use crate::model::text::LocalizedStr;
use crate::resolve::texture_url;
use crate::resource::{ItemStack, ResourceLocation};
use serde::Serialize;
use serde_json::Value;

/// An item with its display name and texture url.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemWithTexture {
    pub stack: ItemStack,
    pub name: LocalizedStr,
    /// `None` when textures are disabled or the texture may be missing.
    pub texture: Option<String>,
}

impl ItemWithTexture {
    pub fn resolve(stack: ItemStack, ctx: &ValidationContext) -> Result<Self, Error> {
        let id = &stack.id;
        let candidates = [
            texture_id(id, "item")?,
            texture_id(id, "block")?,
        ];
        let texture = texture_url(&candidates, ctx)?;
        Ok(Self {
            name: LocalizedStr::item(id, ctx)?,
            texture,
            stack,
        })
    }

    pub fn from_value(value: &Value, ctx: &ValidationContext) -> Result<Self, Error> {
        Self::resolve(ItemStack::parse(&string(value)?)?, ctx)
    }
}

/// `ns:thing` -> `ns:item/thing`.
fn texture_id(id: &ResourceLocation, folder: &str) -> Result<ResourceLocation, Error> {
    Ok(ResourceLocation::new(
        id.namespace(),
        &format!("{folder}/{}", id.path()),
    )?)
}

/// A texture referenced by its file path, e.g. `hex:textures/gui/icon.png`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextureRef {
    pub id: ResourceLocation,
    pub url: Option<String>,
}

impl TextureRef {
    pub fn from_value(value: &Value, ctx: &ValidationContext) -> Result<Self, Error> {
        let file = ResourceLocation::parse(&string(value)?)?;
        let path = file.path();
        let path = path.strip_prefix("textures/").unwrap_or(path);
        let path = path.strip_suffix(".png").unwrap_or(path);
        let id = ResourceLocation::new(file.namespace(), path)?;
        let url = texture_url(std::slice::from_ref(&id), ctx)?;
        Ok(Self { id, url })
    }
}

/// Category and entry icons: an item, or a texture path ending in `.png`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Icon {
    Item(ItemWithTexture),
    Texture(TextureRef),
}

impl Icon {
    pub fn from_value(value: &Value, ctx: &ValidationContext) -> Result<Self, Error> {
        if string(value)?.ends_with(".png") {
            Ok(Icon::Texture(TextureRef::from_value(value, ctx)?))
        } else {
            Ok(Icon::Item(ItemWithTexture::from_value(value, ctx)?))
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Icon::Item(item) => item.texture.as_deref(),
            Icon::Texture(texture) => texture.url.as_deref(),
        }
    }
}
