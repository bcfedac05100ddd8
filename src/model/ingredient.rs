//! Recipe ingredients.
//!
//! Vanilla ingredients carry no discriminator: `{"item": "minecraft:stick"}`
//! or `{"tag": "minecraft:planks"}`. Both are registered as sentinel
//! variants and matched by shape. Plugins may add keyed variants for their
//! own ingredient types (`{"type": "othermod:nbt", ...}`).

use crate::context::ValidationContext;
use crate::error::Error;
use crate::model::fields::{Fields, Record, location, required};
use crate::props::ConfigError;
use crate::resource::ResourceLocation;
use crate::union::{Discriminator, UnionGroupBuilder};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemIngredient {
    Item {
        item: ResourceLocation,
    },
    Tag {
        tag: ResourceLocation,
    },
    /// A plugin-registered ingredient kept as raw fields.
    Custom {
        type_id: ResourceLocation,
        data: Record,
    },
}

impl ItemIngredient {
    /// Generic factory for keyed plugin ingredients: keeps every field.
    pub fn custom(f: &mut Fields<'_>, _ctx: &ValidationContext) -> Result<Self, Error> {
        let type_id = f
            .discriminator()
            .cloned()
            .ok_or_else(|| Error::invalid("custom ingredients need a type"))?;
        Ok(ItemIngredient::Custom {
            type_id,
            data: f.rest(),
        })
    }
}

/// One slot of a recipe: any of these ingredients fits.
pub type Ingredient = Vec<ItemIngredient>;

/// An ingredient or a list of alternatives.
pub fn ingredient(value: &Value, ctx: &ValidationContext) -> Result<Ingredient, Error> {
    let alternatives = ctx.unions()?.ingredients.resolve_list(value, ctx)?;
    if alternatives.is_empty() {
        return Err(Error::invalid("ingredient list must not be empty"));
    }
    Ok(alternatives)
}

fn item(f: &mut Fields<'_>, _ctx: &ValidationContext) -> Result<ItemIngredient, Error> {
    let item = f.required("item", location);
    f.check()?;
    Ok(ItemIngredient::Item {
        item: required(item, "item")?,
    })
}

fn tag(f: &mut Fields<'_>, _ctx: &ValidationContext) -> Result<ItemIngredient, Error> {
    let tag = f.required("tag", location);
    f.check()?;
    Ok(ItemIngredient::Tag {
        tag: required(tag, "tag")?,
    })
}

pub fn register(
    group: &mut UnionGroupBuilder<ItemIngredient, ValidationContext>,
) -> Result<(), ConfigError> {
    group.register(Discriminator::NoValue, "item", item)?;
    group.register(Discriminator::NoValue, "tag", tag)?;
    Ok(())
}
