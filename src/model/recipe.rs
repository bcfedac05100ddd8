//! Vanilla recipe types.
//!
//! Recipes live at `data/<ns>/recipes/<path>.json` and are dispatched on
//! their `type` through the `recipes` union group. Pages that show a recipe
//! ask for a specific family ([`CraftingRecipe`], [`CookingRecipe`],
//! [`StonecuttingRecipe`]) through [`RecipeType`].

use crate::context::ValidationContext;
use crate::error::Error;
use crate::loader::ResourceKind;
use crate::model::fields::{
    Fields, Record, integer, item_stack, location, number_at_least, required, string, value_kind,
};
use crate::model::ingredient::{Ingredient, ingredient};
use crate::props::ConfigError;
use crate::resource::{ItemStack, ResourceLocation};
use crate::union::{Discriminator, UnionGroupBuilder};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Keys with no bearing on the documented recipe.
const COSMETIC_KEYS: &[&str] = &["group", "category", "show_notification", "conditions"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recipe {
    Shaped(ShapedRecipe),
    Shapeless(ShapelessRecipe),
    Cooking(CookingRecipe),
    Stonecutting(StonecuttingRecipe),
    Custom(CustomRecipe),
}

impl Recipe {
    pub fn type_name(&self) -> String {
        match self {
            Recipe::Shaped(_) => "minecraft:crafting_shaped".into(),
            Recipe::Shapeless(_) => "minecraft:crafting_shapeless".into(),
            Recipe::Cooking(c) => format!("minecraft:{}", c.kind.as_str()),
            Recipe::Stonecutting(_) => "minecraft:stonecutting".into(),
            Recipe::Custom(c) => c.type_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapedRecipe {
    pub pattern: Vec<String>,
    pub key: BTreeMap<char, Ingredient>,
    pub result: ItemStack,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapelessRecipe {
    pub ingredients: Vec<Ingredient>,
    pub result: ItemStack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CookingKind {
    Smelting,
    Blasting,
    Smoking,
    CampfireCooking,
}

impl CookingKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CookingKind::Smelting => "smelting",
            CookingKind::Blasting => "blasting",
            CookingKind::Smoking => "smoking",
            CookingKind::CampfireCooking => "campfire_cooking",
        }
    }

    /// Vanilla cooking time in ticks when the recipe omits it.
    pub fn default_cooking_time(self) -> i64 {
        match self {
            CookingKind::Smelting => 200,
            CookingKind::Blasting | CookingKind::Smoking => 100,
            CookingKind::CampfireCooking => 600,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CookingRecipe {
    pub kind: CookingKind,
    pub ingredient: Ingredient,
    pub result: ItemStack,
    pub experience: f64,
    pub cookingtime: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StonecuttingRecipe {
    pub ingredient: Ingredient,
    pub result: ItemStack,
    pub count: i64,
}

/// A plugin-registered recipe type kept as raw fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomRecipe {
    pub type_id: ResourceLocation,
    pub data: Record,
}

impl CustomRecipe {
    /// Generic factory for plugin recipe types: keeps every field.
    pub fn read(f: &mut Fields<'_>, _ctx: &ValidationContext) -> Result<Recipe, Error> {
        let type_id = f
            .discriminator()
            .cloned()
            .ok_or_else(|| Error::invalid("custom recipes need a type"))?;
        Ok(Recipe::Custom(CustomRecipe {
            type_id,
            data: f.rest(),
        }))
    }
}

/// A recipe with the id it was loaded under.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadedRecipe<R = Recipe> {
    pub id: ResourceLocation,
    pub recipe: R,
}

/// A recipe family a page can require.
pub trait RecipeType: Sized {
    /// Shown in errors when a recipe has the wrong type.
    const NAME: &'static str;

    fn from_recipe(recipe: Recipe) -> Result<Self, Recipe>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CraftingRecipe {
    Shaped(ShapedRecipe),
    Shapeless(ShapelessRecipe),
}

impl RecipeType for CraftingRecipe {
    const NAME: &'static str = "crafting";

    fn from_recipe(recipe: Recipe) -> Result<Self, Recipe> {
        match recipe {
            Recipe::Shaped(r) => Ok(CraftingRecipe::Shaped(r)),
            Recipe::Shapeless(r) => Ok(CraftingRecipe::Shapeless(r)),
            other => Err(other),
        }
    }
}

impl RecipeType for CookingRecipe {
    const NAME: &'static str = "cooking";

    fn from_recipe(recipe: Recipe) -> Result<Self, Recipe> {
        match recipe {
            Recipe::Cooking(r) => Ok(r),
            other => Err(other),
        }
    }
}

impl RecipeType for StonecuttingRecipe {
    const NAME: &'static str = "stonecutting";

    fn from_recipe(recipe: Recipe) -> Result<Self, Recipe> {
        match recipe {
            Recipe::Stonecutting(r) => Ok(r),
            other => Err(other),
        }
    }
}

impl<R: RecipeType> LoadedRecipe<R> {
    /// Load `data/<ns>/recipes/<path>.json` and require family `R`.
    pub fn load(id: &ResourceLocation, ctx: &ValidationContext) -> Result<Self, Error> {
        let resource = ctx
            .loader()?
            .load_resource(ResourceKind::Data, "recipes", id)
            .map_err(|e| match e {
                Error::NotFound { .. } => Error::not_found("recipes", id),
                other => other,
            })?;
        let recipe = ctx.unions()?.recipes.resolve(&resource.data, ctx)?;
        let recipe = R::from_recipe(recipe).map_err(|other| {
            Error::invalid(format!(
                "recipe {id} is {}, expected a {} recipe",
                other.type_name(),
                R::NAME
            ))
        })?;
        Ok(Self {
            id: id.clone(),
            recipe,
        })
    }

    /// Parse a recipe id field and load it.
    pub fn from_value(value: &Value, ctx: &ValidationContext) -> Result<Self, Error> {
        Self::load(&location(value)?, ctx)
    }
}

// =============================================================================
// Factories
// =============================================================================

/// A result as `"ns:item"`, `"ns:item#2"`, or `{"item"|"id": ..., "count": n}`.
pub fn recipe_result(value: &Value) -> Result<ItemStack, Error> {
    match value {
        Value::String(_) => item_stack(value),
        Value::Object(_) => Fields::run(value, |f| {
            let id = if f.has("id") {
                f.required("id", location)
            } else {
                f.required("item", location)
            };
            let count = f.or("count", 1, integer);
            let nbt = f.optional("nbt", |v| {
                Ok(match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
            });
            f.check()?;
            if count < 1 {
                return Err(Error::invalid(format!("count {count} must be at least 1")));
            }
            let count = u32::try_from(count)
                .map_err(|_| Error::invalid(format!("count {count} is too large")))?;
            Ok(ItemStack {
                id: required(id, "item")?,
                count,
                nbt,
            })
        }),
        other => Err(Error::invalid(format!(
            "expected an item id or an object, got {}",
            value_kind(other)
        ))),
    }
}

fn shaped(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Recipe, Error> {
    f.ignore(COSMETIC_KEYS);
    let pattern = f.list("pattern", string);
    let key = f.required("key", |v| key_map(v, ctx));
    let result = f.required("result", recipe_result);
    f.check()?;

    let pattern = required(pattern, "pattern")?;
    let key = required(key, "key")?;
    check_pattern(&pattern, &key).map_err(|(path, e)| crate::model::fields::at(path, e))?;
    Ok(Recipe::Shaped(ShapedRecipe {
        pattern,
        key,
        result: required(result, "result")?,
    }))
}

fn key_map(value: &Value, ctx: &ValidationContext) -> Result<BTreeMap<char, Ingredient>, Error> {
    let Value::Object(map) = value else {
        return Err(Error::invalid(format!(
            "expected an object, got {}",
            value_kind(value)
        )));
    };
    let mut key = BTreeMap::new();
    let mut errors = crate::error::ValidationError::new();
    for (symbol, ingredient_value) in map {
        let mut chars = symbol.chars();
        let c = match (chars.next(), chars.next()) {
            (Some(c), None) if c != ' ' => c,
            _ => {
                errors.push(symbol, Error::invalid("key symbols must be one non-space character"));
                continue;
            }
        };
        match ingredient(ingredient_value, ctx) {
            Ok(i) => {
                key.insert(c, i);
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => errors.push(symbol, e),
        }
    }
    errors.into_result()?;
    Ok(key)
}

/// Pattern is at most 3x3 with rows of equal width, and its symbols and the
/// key match exactly.
fn check_pattern(
    pattern: &[String],
    key: &BTreeMap<char, Ingredient>,
) -> Result<(), (&'static str, Error)> {
    if pattern.is_empty() || pattern.len() > 3 {
        return Err((
            "pattern",
            Error::invalid(format!("pattern must have 1 to 3 rows, got {}", pattern.len())),
        ));
    }
    let width = pattern[0].chars().count();
    if width == 0 || width > 3 {
        return Err((
            "pattern",
            Error::invalid(format!("pattern rows must be 1 to 3 wide, got {width}")),
        ));
    }
    if pattern.iter().any(|row| row.chars().count() != width) {
        return Err(("pattern", Error::invalid("pattern rows must have the same width")));
    }
    let used: BTreeSet<char> = pattern
        .iter()
        .flat_map(|row| row.chars())
        .filter(|c| *c != ' ')
        .collect();
    if let Some(c) = used.iter().find(|c| !key.contains_key(c)) {
        return Err((
            "pattern",
            Error::invalid(format!("symbol '{c}' is not defined in the key")),
        ));
    }
    if let Some(c) = key.keys().find(|c| !used.contains(c)) {
        return Err((
            "key",
            Error::invalid(format!("symbol '{c}' is not used in the pattern")),
        ));
    }
    Ok(())
}

fn shapeless(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Recipe, Error> {
    f.ignore(COSMETIC_KEYS);
    let ingredients = f.list("ingredients", |v| ingredient(v, ctx));
    let result = f.required("result", recipe_result);
    f.check()?;

    let ingredients = required(ingredients, "ingredients")?;
    if ingredients.is_empty() || ingredients.len() > 9 {
        return Err(crate::model::fields::at(
            "ingredients",
            Error::invalid(format!(
                "shapeless recipes take 1 to 9 ingredients, got {}",
                ingredients.len()
            )),
        ));
    }
    Ok(Recipe::Shapeless(ShapelessRecipe {
        ingredients,
        result: required(result, "result")?,
    }))
}

fn cooking(kind: CookingKind, f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Recipe, Error> {
    f.ignore(COSMETIC_KEYS);
    let ingredient = f.required("ingredient", |v| ingredient(v, ctx));
    let result = f.required("result", recipe_result);
    let experience = f.or("experience", 0.0, |v| number_at_least(v, 0.0));
    let cookingtime = f.or("cookingtime", kind.default_cooking_time(), |v| {
        let n = integer(v)?;
        if n <= 0 {
            return Err(Error::invalid(format!("cooking time {n} must be positive")));
        }
        Ok(n)
    });
    f.check()?;
    Ok(Recipe::Cooking(CookingRecipe {
        kind,
        ingredient: required(ingredient, "ingredient")?,
        result: required(result, "result")?,
        experience,
        cookingtime,
    }))
}

fn smelting(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Recipe, Error> {
    cooking(CookingKind::Smelting, f, ctx)
}

fn blasting(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Recipe, Error> {
    cooking(CookingKind::Blasting, f, ctx)
}

fn smoking(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Recipe, Error> {
    cooking(CookingKind::Smoking, f, ctx)
}

fn campfire_cooking(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Recipe, Error> {
    cooking(CookingKind::CampfireCooking, f, ctx)
}

fn stonecutting(f: &mut Fields<'_>, ctx: &ValidationContext) -> Result<Recipe, Error> {
    f.ignore(COSMETIC_KEYS);
    let ingredient = f.required("ingredient", |v| ingredient(v, ctx));
    let result = f.required("result", recipe_result);
    let count = f.or("count", 1, |v| crate::model::fields::int_in(v, 1, i64::from(u8::MAX)));
    f.check()?;
    Ok(Recipe::Stonecutting(StonecuttingRecipe {
        ingredient: required(ingredient, "ingredient")?,
        result: required(result, "result")?,
        count,
    }))
}

pub fn register(group: &mut UnionGroupBuilder<Recipe, ValidationContext>) -> Result<(), ConfigError> {
    group.register(Discriminator::key("crafting_shaped"), "crafting_shaped", shaped)?;
    group.register(Discriminator::key("crafting_shapeless"), "crafting_shapeless", shapeless)?;
    group.register(Discriminator::key("smelting"), "smelting", smelting)?;
    group.register(Discriminator::key("blasting"), "blasting", blasting)?;
    group.register(Discriminator::key("smoking"), "smoking", smoking)?;
    group.register(Discriminator::key("campfire_cooking"), "campfire_cooking", campfire_cooking)?;
    group.register(Discriminator::key("stonecutting"), "stonecutting", stonecutting)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use serde_json::json;

    fn resolve(value: Value) -> Result<Recipe, Error> {
        let ctx = full_ctx("hex");
        ctx.unions().unwrap().recipes.resolve(&value, &ctx)
    }

    fn paths(err: Error) -> Vec<String> {
        let Error::Validation(inner) = err else {
            panic!("expected validation error, got {err:?}");
        };
        inner.violations.into_iter().map(|v| v.path).collect()
    }

    #[test]
    fn shaped_recipe_parses() {
        let recipe = resolve(json!({
            "type": "minecraft:crafting_shaped",
            "group": "wands",
            "pattern": [" S", "S "],
            "key": {"S": {"item": "stick"}},
            "result": {"item": "hex:wand", "count": 2}
        }))
        .unwrap();
        let Recipe::Shaped(shaped) = recipe else {
            panic!("expected shaped recipe");
        };
        assert_eq!(shaped.pattern, vec![" S", "S "]);
        assert_eq!(shaped.result.count, 2);
        assert_eq!(shaped.key[&'S'].len(), 1);
    }

    #[test]
    fn shaped_symbol_missing_from_key() {
        let err = resolve(json!({
            "type": "crafting_shaped",
            "pattern": ["AB"],
            "key": {"A": {"item": "stick"}},
            "result": "hex:wand"
        }))
        .unwrap_err();
        assert_eq!(paths(err), vec!["pattern"]);
    }

    #[test]
    fn shaped_pattern_too_large() {
        let err = resolve(json!({
            "type": "crafting_shaped",
            "pattern": ["AAAA"],
            "key": {"A": {"item": "stick"}},
            "result": "hex:wand"
        }))
        .unwrap_err();
        assert_eq!(paths(err), vec!["pattern"]);
    }

    #[test]
    fn shaped_unused_key_symbol() {
        let err = resolve(json!({
            "type": "crafting_shaped",
            "pattern": ["A"],
            "key": {"A": {"item": "stick"}, "B": {"item": "stone"}},
            "result": "hex:wand"
        }))
        .unwrap_err();
        assert_eq!(paths(err), vec!["key"]);
    }

    #[test]
    fn shapeless_bounds() {
        let ok = resolve(json!({
            "type": "crafting_shapeless",
            "ingredients": [{"item": "stick"}, [{"item": "coal"}, {"item": "charcoal"}]],
            "result": "torch#4"
        }))
        .unwrap();
        let Recipe::Shapeless(r) = ok else {
            panic!("expected shapeless");
        };
        assert_eq!(r.ingredients[1].len(), 2);
        assert_eq!(r.result.count, 4);

        let ten: Vec<Value> = (0..10).map(|_| json!({"item": "stick"})).collect();
        let err = resolve(json!({"type": "crafting_shapeless", "ingredients": ten, "result": "torch"}))
            .unwrap_err();
        assert_eq!(paths(err), vec!["ingredients"]);
    }

    #[test]
    fn cooking_defaults_per_kind() {
        let recipe = resolve(json!({
            "type": "campfire_cooking",
            "ingredient": {"item": "potato"},
            "result": "baked_potato"
        }))
        .unwrap();
        let Recipe::Cooking(c) = recipe else {
            panic!("expected cooking");
        };
        assert_eq!(c.kind, CookingKind::CampfireCooking);
        assert_eq!(c.cookingtime, 600);
        assert_eq!(c.experience, 0.0);
    }

    #[test]
    fn cooking_ranges_reported_together() {
        let err = resolve(json!({
            "type": "smelting",
            "ingredient": {"item": "iron_ore"},
            "result": "iron_ingot",
            "experience": -1,
            "cookingtime": 0
        }))
        .unwrap_err();
        assert_eq!(paths(err), vec!["experience", "cookingtime"]);
    }

    #[test]
    fn stonecutting_count_at_least_one() {
        let err = resolve(json!({
            "type": "stonecutting",
            "ingredient": {"item": "stone"},
            "result": "stone_slab",
            "count": 0
        }))
        .unwrap_err();
        assert_eq!(paths(err), vec!["count"]);
    }

    #[test]
    fn nested_ingredient_errors_have_full_paths() {
        let err = resolve(json!({
            "type": "crafting_shapeless",
            "ingredients": [{"item": "stick"}, {"bogus": 1}],
            "result": "torch"
        }))
        .unwrap_err();
        let paths = paths(err);
        assert!(paths.iter().all(|p| p.starts_with("ingredients[1].")), "{paths:?}");
    }

    #[test]
    fn result_forms() {
        assert_eq!(recipe_result(&json!("hex:wand")).unwrap().count, 1);
        let r = recipe_result(&json!({"id": "hex:wand", "count": 3})).unwrap();
        assert_eq!(r.id, loc("hex:wand"));
        assert_eq!(r.count, 3);
        assert!(recipe_result(&json!({"item": "hex:wand", "count": 0})).is_err());
        assert!(recipe_result(&json!(5)).is_err());
    }

    #[test]
    fn load_requires_family() {
        let root = TempRoot::new();
        root.write_json(
            "data/hex/recipes/slab.json",
            &json!({"type": "stonecutting", "ingredient": {"item": "stone"}, "result": "stone_slab", "count": 2}),
        );
        let ctx = ctx_with_roots("hex", vec![root.root("hex")]);
        let loaded = LoadedRecipe::<StonecuttingRecipe>::load(&loc("hex:slab"), &ctx).unwrap();
        assert_eq!(loaded.recipe.count, 2);

        let err = LoadedRecipe::<CraftingRecipe>::load(&loc("hex:slab"), &ctx).unwrap_err();
        assert!(err.to_string().contains("expected a crafting recipe"));

        let err = LoadedRecipe::<CraftingRecipe>::load(&loc("hex:nope"), &ctx).unwrap_err();
        assert!(matches!(err, Error::NotFound { ref group, .. } if group == "recipes"));
    }
}
