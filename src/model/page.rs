//! Entry pages.
//!
//! A page is a [`PageBase`] (fields every page accepts) plus a [`PageKind`].
//! Kinds share small field groups instead of a hierarchy: [`Titled`],
//! [`WithText`] and [`DoubleRecipe`] are read by the same helpers wherever a
//! kind opts into them.
//!
//! | type | fields |
//! |------|--------|
//! | `text` | title?, text |
//! | `crafting` | title?, text?, recipe, recipe2? |
//! | `smelting` `blasting` `smoking` `campfire_cooking` | same, cooking recipes of that type |
//! | `stonecutting` | same, stonecutting recipes |
//! | `empty` | draw_filler = true |
//! | `entity` | entity, scale = 1, offset = 0, rotate = true, default_rotation = -45, name?, text? |
//! | `image` | images, border = false, title?, text? |
//! | `link` | title?, text, url, link_text |
//! | `multiblock` | name, multiblock_id?, multiblock?, enable_visualize = true, text? |
//! | `quest` | trigger?, title = "Objective", text? |
//! | `relations` | entries, title = "Related Chapters", text? |
//! | `spotlight` | item, link_recipe = false, title?, text? |
//!
//! Types default to the `patchouli` namespace. Plugin page types that have
//! no dedicated struct can register [`CustomPage::read`].

use crate::context::ValidationContext;
use crate::error::Error;
use crate::model::fields::{
    Fields, Record, boolean, location, location_in, number, required, string,
};
use crate::model::item::{ItemWithTexture, TextureRef};
use crate::model::recipe::{CookingKind, CookingRecipe, CraftingRecipe, LoadedRecipe, RecipeType, StonecuttingRecipe};
use crate::model::text::{FormatText, LocalizedStr};
use crate::props::ConfigError;
use crate::resource::ResourceLocation;
use crate::union::{Discriminator, UnionGroupBuilder};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub base: PageBase,
    pub kind: PageKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageBase {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advancement: Option<ResourceLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Titled {
    pub title: Option<LocalizedStr>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WithText {
    pub text: Option<FormatText>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoubleRecipe<R> {
    #[serde(flatten)]
    pub titled: Titled,
    #[serde(flatten)]
    pub with_text: WithText,
    pub recipe: LoadedRecipe<R>,
    pub recipe2: Option<LoadedRecipe<R>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextPage {
    pub title: Option<LocalizedStr>,
    pub text: FormatText,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityPage {
    pub entity: String,
    pub scale: f64,
    pub offset: f64,
    pub rotate: bool,
    pub default_rotation: f64,
    pub name: Option<LocalizedStr>,
    #[serde(flatten)]
    pub with_text: WithText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagePage {
    pub images: Vec<TextureRef>,
    pub border: bool,
    #[serde(flatten)]
    pub titled: Titled,
    #[serde(flatten)]
    pub with_text: WithText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkPage {
    #[serde(flatten)]
    pub page: TextPage,
    pub url: String,
    pub link_text: LocalizedStr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiblockPage {
    pub name: LocalizedStr,
    pub multiblock_id: Option<ResourceLocation>,
    pub multiblock: Option<Value>,
    pub enable_visualize: bool,
    #[serde(flatten)]
    pub with_text: WithText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestPage {
    pub trigger: Option<ResourceLocation>,
    pub title: LocalizedStr,
    #[serde(flatten)]
    pub with_text: WithText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationsPage {
    pub entries: Vec<ResourceLocation>,
    pub title: LocalizedStr,
    #[serde(flatten)]
    pub with_text: WithText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpotlightPage {
    pub item: ItemWithTexture,
    pub link_recipe: bool,
    #[serde(flatten)]
    pub titled: Titled,
    #[serde(flatten)]
    pub with_text: WithText,
}

/// A plugin page type kept as raw fields next to the common ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomPage {
    pub type_id: ResourceLocation,
    #[serde(flatten)]
    pub titled: Titled,
    #[serde(flatten)]
    pub with_text: WithText,
    pub data: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageKind {
    Text(TextPage),
    Crafting(DoubleRecipe<CraftingRecipe>),
    Cooking(DoubleRecipe<CookingRecipe>),
    Stonecutting(DoubleRecipe<StonecuttingRecipe>),
    Empty { draw_filler: bool },
    Entity(EntityPage),
    Image(ImagePage),
    Link(LinkPage),
    Multiblock(MultiblockPage),
    Quest(QuestPage),
    Relations(RelationsPage),
    Spotlight(SpotlightPage),
    Custom(CustomPage),
}

impl Page {
    /// Read the base fields, then the kind-specific ones.
    pub fn build(
        f: &mut Fields<'_>,
        ctx: &ValidationContext,
        kind: impl FnOnce(&mut Fields<'_>, &ValidationContext) -> Result<PageKind, Error>,
    ) -> Result<Page, Error> {
        let base = PageBase {
            anchor: f.optional("anchor", string),
            advancement: f.optional("advancement", location),
            flag: f.optional("flag", string),
        };
        let kind = kind(f, ctx)?;
        f.check()?;
        Ok(Page { base, kind })
    }

    /// Dispatch a page record. A bare string is shorthand for a text page.
    pub fn from_value(value: &Value, ctx: &ValidationContext) -> Result<Page, Error> {
        let pages = &ctx.unions()?.pages;
        match value {
            Value::String(text) => {
                let record = serde_json::json!({"type": "patchouli:text", "text": text});
                pages.resolve(&record, ctx)
            }
            other => pages.resolve(other, ctx),
        }
    }

    /// The page's body text, if it has one.
    pub fn text(&self) -> Option<&FormatText> {
        match &self.kind {
            PageKind::Text(p) => Some(&p.text),
            PageKind::Link(p) => Some(&p.page.text),
            PageKind::Crafting(p) => p.with_text.text.as_ref(),
            PageKind::Cooking(p) => p.with_text.text.as_ref(),
            PageKind::Stonecutting(p) => p.with_text.text.as_ref(),
            PageKind::Entity(p) => p.with_text.text.as_ref(),
            PageKind::Image(p) => p.with_text.text.as_ref(),
            PageKind::Multiblock(p) => p.with_text.text.as_ref(),
            PageKind::Quest(p) => p.with_text.text.as_ref(),
            PageKind::Relations(p) => p.with_text.text.as_ref(),
            PageKind::Spotlight(p) => p.with_text.text.as_ref(),
            PageKind::Custom(p) => p.with_text.text.as_ref(),
            PageKind::Empty { .. } => None,
        }
    }

    /// Title shown above the page, if it has one.
    pub fn title(&self) -> Option<&LocalizedStr> {
        match &self.kind {
            PageKind::Text(p) => p.title.as_ref(),
            PageKind::Link(p) => p.page.title.as_ref(),
            PageKind::Crafting(p) => p.titled.title.as_ref(),
            PageKind::Cooking(p) => p.titled.title.as_ref(),
            PageKind::Stonecutting(p) => p.titled.title.as_ref(),
            PageKind::Image(p) => p.titled.title.as_ref(),
            PageKind::Spotlight(p) => p.titled.title.as_ref(),
            PageKind::Custom(p) => p.titled.title.as_ref(),
            PageKind::Quest(p) => Some(&p.title),
            PageKind::Relations(p) => Some(&p.title),
            PageKind::Multiblock(p) => Some(&p.name),
            PageKind::Entity(p) => p.name.as_ref(),
            PageKind::Empty { .. } => None,
        }
    }
}

impl Titled {
    pub fn read(f: &mut Fields<'_>, ctx: &ValidationContext) -> Self {
        Self {
            title: f.optional("title", |v| LocalizedStr::from_value(v, ctx)),
        }
    }
}

impl WithText {
    pub fn read(f: &mut Fields<'_>, ctx: &ValidationContext) -> Self {
        Self {
            text: f.optional("text", |v| FormatText::from_value(v, ctx)),
        }
    }
}

impl<R: RecipeType> DoubleRecipe<R> {
    /// Read both recipe slots. `accept` rejects recipes of the right family
    /// but the wrong subtype.
    pub fn read(
        f: &mut Fields<'_>,
        ctx: &ValidationContext,
        accept: impl Fn(&R) -> Result<(), Error>,
    ) -> Result<Self, Error> {
        let titled = Titled::read(f, ctx);
        let with_text = WithText::read(f, ctx);
        let load = |v: &Value| -> Result<LoadedRecipe<R>, Error> {
            let loaded = LoadedRecipe::<R>::from_value(v, ctx)?;
            accept(&loaded.recipe)?;
            Ok(loaded)
        };
        let recipe = f.required("recipe", load);
        let recipe2 = f.optional("recipe2", load);
        f.check()?;
        Ok(Self {
            titled,
            with_text,
            recipe: required(recipe, "recipe")?,
            recipe2,
        })
    }
}

impl CustomPage {
    /// Generic factory for plugin page types.
    pub fn read(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
        Page::build(f, ctx, |f, ctx| {
            let type_id = f
                .discriminator()
                .cloned()
                .ok_or_else(|| Error::invalid("custom pages need a type"))?;
            let titled = Titled::read(f, ctx);
            let with_text = WithText::read(f, ctx);
            Ok(PageKind::Custom(CustomPage {
                type_id,
                titled,
                with_text,
                data: f.rest(),
            }))
        })
    }
}

// =============================================================================
// Factories
// =============================================================================

fn text(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
    Page::build(f, ctx, |f, ctx| {
        let title = f.optional("title", |v| LocalizedStr::from_value(v, ctx));
        let text = f.required("text", |v| FormatText::from_value(v, ctx));
        f.check()?;
        Ok(PageKind::Text(TextPage {
            title,
            text: required(text, "text")?,
        }))
    })
}

fn crafting(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
    Page::build(f, ctx, |f, ctx| {
        Ok(PageKind::Crafting(DoubleRecipe::read(f, ctx, |_| Ok(()))?))
    })
}

fn cooking(kind: CookingKind, f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
    Page::build(f, ctx, |f, ctx| {
        let double = DoubleRecipe::read(f, ctx, |recipe: &CookingRecipe| {
            if recipe.kind == kind {
                Ok(())
            } else {
                Err(Error::invalid(format!(
                    "expected a {} recipe, got {}",
                    kind.as_str(),
                    recipe.kind.as_str()
                )))
            }
        })?;
        Ok(PageKind::Cooking(double))
    })
}

fn smelting(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
    cooking(CookingKind::Smelting, f, ctx)
}

fn blasting(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
    cooking(CookingKind::Blasting, f, ctx)
}

fn smoking(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
    cooking(CookingKind::Smoking, f, ctx)
}

fn campfire_cooking(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
    cooking(CookingKind::CampfireCooking, f, ctx)
}

fn stonecutting(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
    Page::build(f, ctx, |f, ctx| {
        Ok(PageKind::Stonecutting(DoubleRecipe::read(f, ctx, |_| Ok(()))?))
    })
}

fn empty(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
    Page::build(f, ctx, |f, _| {
        Ok(PageKind::Empty {
            draw_filler: f.or("draw_filler", true, boolean),
        })
    })
}

fn entity(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
    Page::build(f, ctx, |f, ctx| {
        let entity = f.required("entity", string);
        let scale = f.or("scale", 1.0, number);
        let offset = f.or("offset", 0.0, number);
        let rotate = f.or("rotate", true, boolean);
        let default_rotation = f.or("default_rotation", -45.0, number);
        let name = f.optional("name", |v| LocalizedStr::from_value(v, ctx));
        let with_text = WithText::read(f, ctx);
        f.check()?;
        Ok(PageKind::Entity(EntityPage {
            entity: required(entity, "entity")?,
            scale,
            offset,
            rotate,
            default_rotation,
            name,
            with_text,
        }))
    })
}

fn image(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
    Page::build(f, ctx, |f, ctx| {
        let images = f.list("images", |v| TextureRef::from_value(v, ctx));
        let border = f.or("border", false, boolean);
        let titled = Titled::read(f, ctx);
        let with_text = WithText::read(f, ctx);
        f.check()?;
        Ok(PageKind::Image(ImagePage {
            images: required(images, "images")?,
            border,
            titled,
            with_text,
        }))
    })
}

fn link(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
    Page::build(f, ctx, |f, ctx| {
        let title = f.optional("title", |v| LocalizedStr::from_value(v, ctx));
        let text = f.required("text", |v| FormatText::from_value(v, ctx));
        let url = f.required("url", string);
        let link_text = f.required("link_text", |v| LocalizedStr::from_value(v, ctx));
        f.check()?;
        Ok(PageKind::Link(LinkPage {
            page: TextPage {
                title,
                text: required(text, "text")?,
            },
            url: required(url, "url")?,
            link_text: required(link_text, "link_text")?,
        }))
    })
}

fn multiblock(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
    Page::build(f, ctx, |f, ctx| {
        let name = f.required("name", |v| LocalizedStr::from_value(v, ctx));
        let multiblock_id = f.optional("multiblock_id", location);
        let multiblock = f.optional("multiblock", |v| Ok(v.clone()));
        let enable_visualize = f.or("enable_visualize", true, boolean);
        let with_text = WithText::read(f, ctx);
        if !f.has("multiblock_id") && !f.has("multiblock") {
            f.record(
                "multiblock_id",
                Error::invalid("one of multiblock_id or multiblock must be set"),
            );
        }
        f.check()?;
        Ok(PageKind::Multiblock(MultiblockPage {
            name: required(name, "name")?,
            multiblock_id,
            multiblock,
            enable_visualize,
            with_text,
        }))
    })
}

fn quest(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
    Page::build(f, ctx, |f, ctx| {
        let trigger = f.optional("trigger", location);
        let title = f.optional("title", |v| LocalizedStr::from_value(v, ctx));
        let with_text = WithText::read(f, ctx);
        f.check()?;
        Ok(PageKind::Quest(QuestPage {
            trigger,
            title: title.unwrap_or_else(|| LocalizedStr::literal("Objective")),
            with_text,
        }))
    })
}

fn relations(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
    Page::build(f, ctx, |f, ctx| {
        let namespace = ctx.book()?.book_id.namespace().to_string();
        let entries = f.list("entries", |v| location_in(v, &namespace));
        let title = f.optional("title", |v| LocalizedStr::from_value(v, ctx));
        let with_text = WithText::read(f, ctx);
        f.check()?;
        Ok(PageKind::Relations(RelationsPage {
            entries: required(entries, "entries")?,
            title: title.unwrap_or_else(|| LocalizedStr::literal("Related Chapters")),
            with_text,
        }))
    })
}

fn spotlight(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Page, Error> {
    Page::build(f, ctx, |f, ctx| {
        let item = f.required("item", |v| ItemWithTexture::from_value(v, ctx));
        let link_recipe = f.or("link_recipe", false, boolean);
        let titled = Titled::read(f, ctx);
        let with_text = WithText::read(f, ctx);
        f.check()?;
        Ok(PageKind::Spotlight(SpotlightPage {
            item: required(item, "item")?,
            link_recipe,
            titled,
            with_text,
        }))
    })
}

pub fn register(group: &mut UnionGroupBuilder<Page, ValidationContext>) -> Result<(), ConfigError> {
    group.register(Discriminator::key("patchouli:text"), "text", text)?;
    group.register(Discriminator::key("patchouli:crafting"), "crafting", crafting)?;
    group.register(Discriminator::key("patchouli:smelting"), "smelting", smelting)?;
    group.register(Discriminator::key("patchouli:blasting"), "blasting", blasting)?;
    group.register(Discriminator::key("patchouli:smoking"), "smoking", smoking)?;
    group.register(
        Discriminator::key("patchouli:campfire_cooking"),
        "campfire_cooking",
        campfire_cooking,
    )?;
    group.register(Discriminator::key("patchouli:stonecutting"), "stonecutting", stonecutting)?;
    group.register(Discriminator::key("patchouli:empty"), "empty", empty)?;
    group.register(Discriminator::key("patchouli:entity"), "entity", entity)?;
    group.register(Discriminator::key("patchouli:image"), "image", image)?;
    group.register(Discriminator::key("patchouli:link"), "link", link)?;
    group.register(Discriminator::key("patchouli:multiblock"), "multiblock", multiblock)?;
    group.register(Discriminator::key("patchouli:quest"), "quest", quest)?;
    group.register(Discriminator::key("patchouli:relations"), "relations", relations)?;
    group.register(Discriminator::key("patchouli:spotlight"), "spotlight", spotlight)?;
    Ok(())
}
