//! Books, categories and entries.
//!
//! Categories and entries are loaded independently into id-keyed maps and
//! refer to each other by id only. [`crate::resolve::link_book`] checks those
//! references and fills in the ordering afterwards.

use crate::context::{BookFacet, ValidationContext};
use crate::error::{Error, ValidationError};
use crate::loader::{LoadedResource, ResourceKind};
use crate::model::fields::{Fields, boolean, integer, location, location_in, required, string, value_kind};
use crate::model::item::Icon;
use crate::model::page::Page;
use crate::model::text::{FormatText, LocalizedStr};
use crate::resource::ResourceLocation;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Patchouli book.json keys that only affect the in-game book.
const BOOK_COSMETIC_KEYS: &[&str] = &[
    "book_texture",
    "filler_texture",
    "crafting_texture",
    "model",
    "text_color",
    "header_color",
    "nameplate_color",
    "link_color",
    "link_hover_color",
    "progress_bar_color",
    "progress_bar_background",
    "open_sound",
    "flip_sound",
    "index_icon",
    "show_progress",
    "pamphlet",
    "show_toasts",
    "creative_tab",
    "advancements_tab",
    "dont_generate_book",
    "custom_book_item",
    "use_blocky_font",
    "allow_extensions",
    "text_overflow_mode",
    "pause_game",
    "extend",
];

const ENTRY_COSMETIC_KEYS: &[&str] = &["entry_color", "turnin"];

/// Tag listing advancements whose entries are spoilers.
const SPOILER_TAG: (&str, &str) = ("hexbook", "spoilered");

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    pub id: ResourceLocation,
    pub name: LocalizedStr,
    pub landing_text: FormatText,
    pub subtitle: Option<LocalizedStr>,
    pub version: Option<String>,
    pub i18n: bool,
    pub use_resource_pack: bool,
    pub macros: BTreeMap<String, String>,
    pub categories: BTreeMap<ResourceLocation, Category>,
    pub entries: BTreeMap<ResourceLocation, Entry>,
    /// Top-level categories in display order. Filled by linking.
    pub roots: Vec<ResourceLocation>,
    pub blacklist: BTreeSet<ResourceLocation>,
    /// Link targets mapped to fixed urls.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub link_overrides: BTreeMap<String, String>,
    /// Whether `$(0)` means black rather than the default color.
    pub is_0_black: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: ResourceLocation,
    pub name: LocalizedStr,
    pub description: FormatText,
    pub icon: Icon,
    pub parent: Option<ResourceLocation>,
    pub flag: Option<String>,
    pub sortnum: i64,
    pub secret: bool,
    /// Child categories in display order. Filled by linking.
    pub children: Vec<ResourceLocation>,
    /// Entries in display order. Filled by linking.
    pub entries: Vec<ResourceLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub id: ResourceLocation,
    pub name: LocalizedStr,
    pub category: ResourceLocation,
    pub icon: Icon,
    pub pages: Vec<Page>,
    pub advancement: Option<ResourceLocation>,
    pub is_spoiler: bool,
    pub read_by_default: bool,
    pub priority: bool,
    pub secret: bool,
    pub sortnum: i64,
    pub flag: Option<String>,
    /// Item -> index of the page showing its recipe.
    pub extra_recipe_mappings: BTreeMap<ResourceLocation, i64>,
    /// Book url of the mod that shipped this entry, when that is not us.
    pub link_base: Option<String>,
}

impl Book {
    /// Book-wide settings read ahead of the book itself so every node can
    /// see them.
    pub fn facet(
        book_id: &ResourceLocation,
        data: &Value,
        i18n_enabled: bool,
        ctx: &ValidationContext,
    ) -> Result<BookFacet, Error> {
        let macros = match data.get("macros") {
            Some(value) => macro_map(value).map_err(|e| crate::model::fields::at("macros", e))?,
            None => BTreeMap::new(),
        };
        Ok(BookFacet {
            i18n_enabled,
            macros,
            spoilered_advancements: spoilered_advancements(ctx)?,
            ..BookFacet::new(book_id.clone(), &ctx.props().modid)
        })
    }

    /// Read book.json and every category and entry of the book. Expects the
    /// context's book facet to be set.
    pub fn load(data: &Value, ctx: &ValidationContext) -> Result<Book, Error> {
        let book_id = ctx.book()?.book_id.clone();
        let mut book = Fields::run(data, |f| {
            f.ignore(BOOK_COSMETIC_KEYS);
            let name = f.required("name", |v| LocalizedStr::from_value(v, ctx));
            let landing_text = f.required("landing_text", |v| FormatText::from_value(v, ctx));
            let subtitle = f.optional("subtitle", |v| LocalizedStr::from_value(v, ctx));
            let version = f.optional("version", |v| {
                Ok(match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
            });
            let i18n = f.or("i18n", false, boolean);
            let use_resource_pack = f.or("use_resource_pack", false, boolean);
            let macros = f.or("macros", BTreeMap::new(), macro_map);
            f.check()?;
            Ok(Book {
                id: book_id.clone(),
                name: required(name, "name")?,
                landing_text: required(landing_text, "landing_text")?,
                subtitle,
                version,
                i18n,
                use_resource_pack,
                macros,
                categories: BTreeMap::new(),
                entries: BTreeMap::new(),
                roots: Vec::new(),
                blacklist: ctx.props().entry_id_blacklist.iter().cloned().collect(),
                link_overrides: ctx.props().link_overrides.clone(),
                is_0_black: ctx.props().is_0_black,
            })
        })?;
        book.load_contents(ctx)?;
        Ok(book)
    }

    /// Folder holding this book's categories or entries.
    fn contents_folder(&self, ctx: &ValidationContext, what: &str) -> String {
        format!(
            "patchouli_books/{}/{}/{what}",
            self.id.path(),
            ctx.props().default_lang
        )
    }

    fn load_contents(&mut self, ctx: &ValidationContext) -> Result<(), Error> {
        let loader = ctx.loader()?;
        let kind = if self.use_resource_pack {
            ResourceKind::Assets
        } else {
            ResourceKind::Data
        };
        let mut errors = ValidationError::new();

        for resource in loader.find_all(kind, &self.contents_folder(ctx, "categories"))? {
            match Category::load(&resource, ctx) {
                Ok(category) => {
                    self.categories.insert(category.id.clone(), category);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => errors.push(&format!("categories[{}]", resource.id), e),
            }
        }

        for resource in loader.find_all(kind, &self.contents_folder(ctx, "entries"))? {
            if self.blacklist.contains(&resource.id) {
                log::debug!("skipping blacklisted entry {}", resource.id);
                continue;
            }
            match Entry::load(&resource, ctx) {
                Ok(entry) => {
                    self.entries.insert(entry.id.clone(), entry);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => errors.push(&format!("entries[{}]", resource.id), e),
            }
        }

        log::debug!(
            "book {} [{}]: {} categories, {} entries",
            self.id,
            ctx.lang(),
            self.categories.len(),
            self.entries.len()
        );
        errors.into_result()
    }

    pub fn category(&self, id: &ResourceLocation) -> Option<&Category> {
        self.categories.get(id)
    }

    pub fn entry(&self, id: &ResourceLocation) -> Option<&Entry> {
        self.entries.get(id)
    }
}

impl Category {
    pub fn load(resource: &LoadedResource, ctx: &ValidationContext) -> Result<Category, Error> {
        let namespace = ctx.book()?.book_id.namespace().to_string();
        Fields::run(&resource.data, |f| {
            let name = f.required("name", |v| LocalizedStr::from_value(v, ctx));
            let description = f.required("description", |v| FormatText::from_value(v, ctx));
            let icon = f.required("icon", |v| Icon::from_value(v, ctx));
            let parent = f.optional("parent", |v| location_in(v, &namespace));
            let flag = f.optional("flag", string);
            let sortnum = f.or("sortnum", 0, integer);
            let secret = f.or("secret", false, boolean);
            f.check()?;
            Ok(Category {
                id: resource.id.clone(),
                name: required(name, "name")?,
                description: required(description, "description")?,
                icon: required(icon, "icon")?,
                parent,
                flag,
                sortnum,
                secret,
                children: Vec::new(),
                entries: Vec::new(),
            })
        })
    }
}

impl Entry {
    pub fn load(resource: &LoadedResource, ctx: &ValidationContext) -> Result<Entry, Error> {
        let facet = ctx.book()?;
        let namespace = facet.book_id.namespace().to_string();
        let root = ctx
            .loader()?
            .root(resource.root)
            .ok_or_else(|| Error::invalid(format!("no resource root #{}", resource.root)))?;

        Fields::run(&resource.data, |f| {
            f.ignore(ENTRY_COSMETIC_KEYS);
            let name = f.required("name", |v| LocalizedStr::from_value(v, ctx));
            let category = f.required("category", |v| location_in(v, &namespace));
            let icon = f.required("icon", |v| Icon::from_value(v, ctx));
            let pages = f.list("pages", |v| Page::from_value(v, ctx));
            let advancement = f.optional("advancement", location);
            let read_by_default = f.or("read_by_default", false, boolean);
            let priority = f.or("priority", false, boolean);
            let secret = f.or("secret", false, boolean);
            let sortnum = f.or("sortnum", 0, integer);
            let flag = f.optional("flag", string);
            let extra_recipe_mappings = f.or("extra_recipe_mappings", BTreeMap::new(), recipe_mappings);
            let link_base = match crate::resolve::link_base(root, ctx) {
                Ok(base) => base,
                Err(e) => {
                    f.record("", e);
                    None
                }
            };
            f.check()?;

            let is_spoiler = advancement
                .as_ref()
                .is_some_and(|a| facet.spoilered_advancements.contains(a));
            Ok(Entry {
                id: resource.id.clone(),
                name: required(name, "name")?,
                category: required(category, "category")?,
                icon: required(icon, "icon")?,
                pages: required(pages, "pages")?,
                advancement,
                is_spoiler,
                read_by_default,
                priority,
                secret,
                sortnum,
                flag,
                extra_recipe_mappings,
                link_base,
            })
        })
    }

    /// Url of this entry relative to the book index.
    pub fn href(&self) -> String {
        let anchor = format!("#{}", self.id.path().replace('/', "-"));
        match &self.link_base {
            Some(base) => format!("{}{anchor}", base.trim_end_matches('/')),
            None => anchor,
        }
    }
}

fn macro_map(value: &Value) -> Result<BTreeMap<String, String>, Error> {
    let Value::Object(map) = value else {
        return Err(Error::invalid(format!(
            "expected an object, got {}",
            value_kind(value)
        )));
    };
    let mut macros = BTreeMap::new();
    let mut errors = ValidationError::new();
    for (key, expansion) in map {
        match string(expansion) {
            Ok(expansion) => {
                macros.insert(key.clone(), expansion);
            }
            Err(e) => errors.push(key, e),
        }
    }
    errors.into_result()?;
    Ok(macros)
}

fn recipe_mappings(value: &Value) -> Result<BTreeMap<ResourceLocation, i64>, Error> {
    let Value::Object(map) = value else {
        return Err(Error::invalid(format!(
            "expected an object, got {}",
            value_kind(value)
        )));
    };
    let mut out = BTreeMap::new();
    let mut errors = ValidationError::new();
    for (item, page) in map {
        let parsed = ResourceLocation::parse(item)
            .map_err(Error::from)
            .and_then(|id| Ok((id, integer(page)?)));
        match parsed {
            Ok((id, page)) => {
                out.insert(id, page);
            }
            Err(e) => errors.push(item, e),
        }
    }
    errors.into_result()?;
    Ok(out)
}

/// Values of the spoiler advancement tag, merged across roots. A missing
/// tag means no spoilers.
fn spoilered_advancements(ctx: &ValidationContext) -> Result<BTreeSet<ResourceLocation>, Error> {
    let tag = ResourceLocation::new(SPOILER_TAG.0, SPOILER_TAG.1)?;
    let resource = match ctx
        .loader()?
        .load_resource(ResourceKind::Data, "tags/advancements", &tag)
    {
        Ok(resource) => resource,
        Err(Error::NotFound { .. }) => return Ok(BTreeSet::new()),
        Err(e) => return Err(e),
    };
    let values = resource
        .data
        .get("values")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::invalid(format!("tag {tag}: values must be a list")))?;
    let mut out = BTreeSet::new();
    for value in values {
        let id = match value {
            Value::Object(record) => record.get("id"),
            other => Some(other),
        };
        let id = id.ok_or_else(|| Error::invalid(format!("tag {tag}: entry without an id")))?;
        out.insert(location(id).map_err(|e| crate::model::fields::at(&format!("tag {tag}"), e))?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use serde_json::json;

    fn guide(root: &TempRoot) {
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
                "advancement": "hex:root",
                "entry_color": "ff0000",
                "pages": ["hex.entry.media.0"]
            }),
        );
    }

    fn book_data() -> Value {
        json!({
            "name": "hex.book.name",
            "landing_text": "hex.book.landing",
            "i18n": true,
            "book_texture": "hex:textures/gui/book.png",
            "macros": {"$(media)": "$(thing)media"}
        })
    }

    fn load(root: &TempRoot, data: &Value) -> Result<Book, Error> {
        let mut ctx = ctx_with_roots("hex", vec![root.root("hex")]);
        let facet = Book::facet(&loc("hex:guide"), data, true, &ctx).unwrap();
        ctx.set_book(facet);
        Book::load(data, &ctx)
    }

    #[test]
    fn loads_categories_and_entries() {
        let root = TempRoot::new();
        guide(&root);
        let book = load(&root, &book_data()).unwrap();

        assert_eq!(book.name.value, "Hex Notebook");
        assert_eq!(book.macros["$(media)"], "$(thing)media");
        let category = book.category(&loc("hex:basics")).unwrap();
        assert_eq!(category.sortnum, 1);
        let entry = book.entry(&loc("hex:basics/media")).unwrap();
        assert_eq!(entry.category, loc("hex:basics"));
        assert_eq!(entry.pages.len(), 1);
        assert_eq!(entry.link_base, None);
        assert!(!entry.is_spoiler);
        assert_eq!(entry.href(), "#basics-media");
    }

    #[test]
    fn entry_errors_are_reported_by_id() {
        let root = TempRoot::new();
        guide(&root);
        root.write_json(
            "data/hex/patchouli_books/guide/en_us/entries/broken.json",
            &json!({
                "name": "hex.entry.media",
                "category": "basics",
                "icon": "hex:textures/gui/basics.png",
                "pages": [{"type": "patchouli:entity"}]
            }),
        );
        let err = load(&root, &book_data()).unwrap_err();
        let Error::Validation(inner) = err else {
            panic!("expected validation error");
        };
        let paths: Vec<&str> = inner.violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["entries[hex:broken].pages[0].entity"]);
    }

    #[test]
    fn blacklisted_entries_are_skipped() {
        let root = TempRoot::new();
        guide(&root);
        root.write_json(
            "data/hex/patchouli_books/guide/en_us/entries/broken.json",
            &json!({"name": 5}),
        );
        let mut props = props("hex");
        props.entry_id_blacklist = BTreeSet::from([loc("hex:broken")]);
        let mut ctx = ctx_with_props(props, vec![root.root("hex")]);
        ctx.set_book(BookFacet::new(loc("hex:guide"), "hex"));

        let book = Book::load(&book_data(), &ctx).unwrap();
        assert!(book.entry(&loc("hex:broken")).is_none());
        assert!(book.blacklist.contains(&loc("hex:broken")));
    }

    #[test]
    fn spoiler_tag_marks_entries() {
        let root = TempRoot::new();
        guide(&root);
        root.write_json(
            "data/hexbook/tags/advancements/spoilered.json",
            &json!({"values": ["hex:root", {"id": "hex:enlightenment", "required": false}]}),
        );
        let book = load(&root, &book_data()).unwrap();
        assert!(book.entry(&loc("hex:basics/media")).unwrap().is_spoiler);
    }

    #[test]
    fn book_level_violations_reported_together() {
        let root = TempRoot::new();
        guide(&root);
        let data = json!({"i18n": "yes", "colour": 1, "macros": {}});
        let err = load(&root, &data).unwrap_err();
        let Error::Validation(inner) = err else {
            panic!("expected validation error");
        };
        let paths: Vec<&str> = inner.violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["name", "landing_text", "i18n", "colour"]);
    }

    #[test]
    fn foreign_entries_take_the_mods_book_url() {
        let base = TempRoot::new();
        base.write_json(
            "data/hex/patchouli_books/guide/en_us/entries/basics/media.json",
            &json!({
                "name": "Media",
                "category": "basics",
                "icon": "hex:textures/gui/basics.png",
                "pages": []
            }),
        );
        base.write_json(
            "hex.hexdoc.json",
            &json!({
                "book_url": "https://hex.example/v1/",
                "asset_url": "https://hex.cdn",
                "textures": [{"id": "hex:gui/basics", "url": "assets/hex/textures/gui/basics.png"}]
            }),
        );
        let addon = TempRoot::new();
        let mut ctx = ctx_with_roots("addon", vec![base.foreign("hex"), addon.root("addon")]);
        ctx.set_book(BookFacet {
            i18n_enabled: false,
            ..BookFacet::new(loc("hex:guide"), "addon")
        });
        let data = json!({"name": "Guide", "landing_text": "Hi"});
        let book = Book::load(&data, &ctx).unwrap();
        let entry = book.entry(&loc("hex:basics/media")).unwrap();
        assert_eq!(entry.link_base.as_deref(), Some("https://hex.example/v1/"));
        assert_eq!(entry.href(), "https://hex.example/v1#basics-media");
    }
}
