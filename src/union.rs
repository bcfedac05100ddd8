//! Tagged-union registry.
//!
//! Content kinds (pages, recipes, ingredients) are open families: plugins
//! contribute variants without the core knowing their shapes. A record picks
//! its variant through a discriminator field, `type` by default:
//!
//! ```json
//! { "type": "patchouli:crafting", "recipe": "hexcasting:wand" }
//! ```
//!
//! # Two phases
//!
//! Registration happens on a [`TaggedUnionsBuilder`] while plugins load.
//! Duplicate keys fail right there with a [`ConfigError`], before any book is
//! read. [`TaggedUnionsBuilder::build`] then freezes everything into an
//! immutable [`TaggedUnions`] snapshot, the only type that can resolve. A
//! half-populated registry therefore cannot be resolved against.
//!
//! # Sentinel variants
//!
//! Variants registered under [`Discriminator::NoValue`] are never looked up by
//! key. They cover records that carry no discriminator at all, such as
//! Minecraft ingredients (`{"item": ...}` vs `{"tag": ...}`): each sentinel
//! variant is tried in registration order and exactly one must accept.

use crate::context::ValidationContext;
use crate::error::{Error, ValidationError};
use crate::model::fields::{Fields, at, value_kind};
use crate::model::ingredient::ItemIngredient;
use crate::model::page::Page;
use crate::model::recipe::Recipe;
use crate::props::ConfigError;
use crate::resource::ResourceLocation;
use serde_json::Value;
use std::collections::HashMap;

/// Builds a variant from a record whose discriminator is already consumed.
pub type Factory<T, C> = fn(&mut Fields<'_>, &C) -> Result<T, Error>;

/// Group names used in errors and by plugins.
pub const PAGES: &str = "pages";
pub const RECIPES: &str = "recipes";
pub const INGREDIENTS: &str = "ingredients";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discriminator {
    /// Matched when the record's discriminator equals this key.
    Key(String),
    /// Never matched by key; tried structurally when the record has none.
    NoValue,
}

impl Discriminator {
    pub fn key(key: &str) -> Self {
        Discriminator::Key(key.to_string())
    }
}

struct Variant<T, C> {
    name: String,
    factory: Factory<T, C>,
}

/// Registration side of one variant family.
pub struct UnionGroupBuilder<T, C> {
    name: &'static str,
    tag_field: &'static str,
    default_namespace: &'static str,
    keyed: HashMap<ResourceLocation, Variant<T, C>>,
    order: Vec<ResourceLocation>,
    untyped: Vec<Variant<T, C>>,
}

impl<T, C> UnionGroupBuilder<T, C> {
    pub fn new(name: &'static str, default_namespace: &'static str) -> Self {
        Self {
            name,
            tag_field: "type",
            default_namespace,
            keyed: HashMap::new(),
            order: Vec::new(),
            untyped: Vec::new(),
        }
    }

    /// Override the discriminator field name.
    pub fn with_tag_field(mut self, tag_field: &'static str) -> Self {
        self.tag_field = tag_field;
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Register a variant. Keys are normalized with the group's default
    /// namespace, so `"text"` and `"patchouli:text"` collide in the pages group.
    pub fn register(
        &mut self,
        discriminator: Discriminator,
        name: &str,
        factory: Factory<T, C>,
    ) -> Result<(), ConfigError> {
        let variant = Variant {
            name: name.to_string(),
            factory,
        };
        match discriminator {
            Discriminator::NoValue => {
                self.untyped.push(variant);
                Ok(())
            }
            Discriminator::Key(key) => {
                let id = ResourceLocation::with_default_namespace(&key, self.default_namespace)
                    .map_err(|e| {
                        ConfigError::Validation(format!("bad {} discriminator: {e}", self.name))
                    })?;
                if self.keyed.contains_key(&id) {
                    return Err(ConfigError::DuplicateVariant {
                        group: self.name.to_string(),
                        key: id.to_string(),
                    });
                }
                log::debug!("registered {} variant {id}", self.name);
                self.order.push(id.clone());
                self.keyed.insert(id, variant);
                Ok(())
            }
        }
    }

    pub fn build(self) -> UnionGroup<T, C> {
        UnionGroup {
            name: self.name,
            tag_field: self.tag_field,
            default_namespace: self.default_namespace,
            keyed: self.keyed,
            order: self.order,
            untyped: self.untyped,
        }
    }
}

/// Frozen variant family. Resolution only.
pub struct UnionGroup<T, C> {
    name: &'static str,
    tag_field: &'static str,
    default_namespace: &'static str,
    keyed: HashMap<ResourceLocation, Variant<T, C>>,
    order: Vec<ResourceLocation>,
    untyped: Vec<Variant<T, C>>,
}

impl<T, C> UnionGroup<T, C> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn tag_field(&self) -> &'static str {
        self.tag_field
    }

    /// Registered keys in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &ResourceLocation> {
        self.order.iter()
    }

    pub fn contains(&self, key: &ResourceLocation) -> bool {
        self.keyed.contains_key(key)
    }

    /// Dispatch one record to its variant.
    pub fn resolve(&self, value: &Value, ctx: &C) -> Result<T, Error> {
        let Value::Object(record) = value else {
            return Err(Error::invalid(format!(
                "expected a {} record (object), got {}",
                self.name,
                value_kind(value)
            )));
        };

        let Some(tag) = record.get(self.tag_field) else {
            return self.resolve_untyped(value, ctx);
        };
        let Some(tag) = tag.as_str() else {
            return Err(at(
                self.tag_field,
                Error::invalid(format!("expected a string, got {}", value_kind(tag))),
            ));
        };
        let id = ResourceLocation::with_default_namespace(tag, self.default_namespace)
            .map_err(|e| at(self.tag_field, e.into()))?;
        let variant = self
            .keyed
            .get(&id)
            .ok_or_else(|| Error::not_found(self.name, &id))?;

        let tag_field = self.tag_field;
        Fields::run(value, |f| {
            f.set_discriminator(tag_field, id);
            (variant.factory)(f, ctx)
        })
    }

    fn resolve_untyped(&self, value: &Value, ctx: &C) -> Result<T, Error> {
        if self.untyped.is_empty() {
            return Err(at(self.tag_field, Error::invalid("field required")));
        }

        let mut matches = Vec::new();
        let mut attempts = ValidationError::new();
        for variant in &self.untyped {
            match Fields::run(value, |f| (variant.factory)(f, ctx)) {
                Ok(v) => matches.push((variant.name.as_str(), v)),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => attempts.push(&format!("<{}>", variant.name), e),
            }
        }

        match matches.len() {
            0 => Err(Error::Validation(attempts)),
            1 => Ok(matches.remove(0).1),
            _ => {
                let names: Vec<&str> = matches.iter().map(|(name, _)| *name).collect();
                Err(Error::invalid(format!(
                    "record matches more than one {} variant: {}",
                    self.name,
                    names.join(", ")
                )))
            }
        }
    }

    /// Accept either a single record or a list of records, each dispatched
    /// independently.
    pub fn resolve_list(&self, value: &Value, ctx: &C) -> Result<Vec<T>, Error> {
        let Value::Array(items) = value else {
            return Ok(vec![self.resolve(value, ctx)?]);
        };
        let mut out = Vec::with_capacity(items.len());
        let mut errors = ValidationError::new();
        for (i, item) in items.iter().enumerate() {
            match self.resolve(item, ctx) {
                Ok(v) => out.push(v),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => errors.push(&format!("[{i}]"), e),
            }
        }
        errors.into_result()?;
        Ok(out)
    }
}

/// Registration side of every built-in variant family.
pub struct TaggedUnionsBuilder {
    pub pages: UnionGroupBuilder<Page, ValidationContext>,
    pub recipes: UnionGroupBuilder<Recipe, ValidationContext>,
    pub ingredients: UnionGroupBuilder<ItemIngredient, ValidationContext>,
}

impl Default for TaggedUnionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaggedUnionsBuilder {
    pub fn new() -> Self {
        Self {
            pages: UnionGroupBuilder::new(PAGES, "patchouli"),
            recipes: UnionGroupBuilder::new(RECIPES, "minecraft"),
            ingredients: UnionGroupBuilder::new(INGREDIENTS, "minecraft"),
        }
    }

    pub fn build(self) -> TaggedUnions {
        TaggedUnions {
            pages: self.pages.build(),
            recipes: self.recipes.build(),
            ingredients: self.ingredients.build(),
        }
    }
}

/// Immutable registry snapshot shared by every book build.
pub struct TaggedUnions {
    pub pages: UnionGroup<Page, ValidationContext>,
    pub recipes: UnionGroup<Recipe, ValidationContext>,
    pub ingredients: UnionGroup<ItemIngredient, ValidationContext>,
}
