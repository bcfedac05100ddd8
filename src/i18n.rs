//! Translation tables.
//!
//! A language is the union of every `assets/<ns>/lang/<lang>.json` across all
//! resource roots; later roots override earlier ones key by key. Tables for
//! non-default languages fall back to the default language.

use crate::error::Error;
use crate::loader::{ResourceKind, ResourceLoader};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Debug)]
pub struct I18n {
    lang: String,
    entries: HashMap<String, String>,
    fallback: Option<Arc<I18n>>,
    allow_missing: bool,
}

impl I18n {
    pub fn from_entries(
        lang: &str,
        entries: &[(&str, &str)],
        fallback: Option<Arc<I18n>>,
        allow_missing: bool,
    ) -> Self {
        Self {
            lang: lang.to_string(),
            entries: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            fallback,
            allow_missing,
        }
    }

    /// Load one language from every root.
    pub fn load(loader: &ResourceLoader, lang: &str, allow_missing: bool) -> Result<Self, Error> {
        let mut entries = HashMap::new();
        for layer in loader.find_layers(ResourceKind::Assets, "lang")? {
            if layer.id.path() != lang {
                continue;
            }
            let Value::Object(table) = layer.data.as_ref() else {
                return Err(Error::invalid(format!("lang file {} is not an object", layer.id)));
            };
            for (key, value) in table {
                let Some(text) = value.as_str() else {
                    return Err(Error::invalid(format!(
                        "lang file {}: value for `{key}` is not a string",
                        layer.id
                    )));
                };
                entries.insert(key.clone(), text.to_string());
            }
        }
        log::debug!("loaded {} translations for {lang}", entries.len());
        Ok(Self {
            lang: lang.to_string(),
            entries,
            fallback: None,
            allow_missing,
        })
    }

    /// Load every language found in the roots. The default language always
    /// comes first, even with no lang files, and backs all the others.
    pub fn load_all(loader: &ResourceLoader, allow_missing: bool) -> Result<Vec<Arc<I18n>>, Error> {
        let default_lang = loader.props().default_lang.clone();
        let langs: BTreeSet<String> = loader
            .find_files(ResourceKind::Assets, "lang", "json")?
            .into_iter()
            .map(|f| f.id.path().to_string())
            .filter(|lang| *lang != default_lang)
            .collect();

        let default = Arc::new(Self::load(loader, &default_lang, allow_missing)?);
        let mut out = vec![Arc::clone(&default)];
        for lang in langs {
            let mut i18n = Self::load(loader, &lang, allow_missing)?;
            i18n.fallback = Some(Arc::clone(&default));
            out.push(Arc::new(i18n));
        }
        Ok(out)
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn allow_missing(&self) -> bool {
        self.allow_missing
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Translation for `key` in this language, else the fallback language.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(text) => Some(text.as_str()),
            None => self.fallback.as_ref()?.lookup(key),
        }
    }

    /// First key of `keys` that has a translation.
    pub fn lookup_any<'a>(&'a self, keys: &[String]) -> Option<(&'a str, &'a str)> {
        keys.iter()
            .find_map(|key| self.entries.get_key_value(key.as_str()))
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .or_else(|| self.fallback.as_ref()?.lookup_any(keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use serde_json::json;

    #[test]
    fn fallback_to_default_language() {
        let en = Arc::new(I18n::from_entries("en_us", &[("a", "A"), ("b", "B")], None, false));
        let zh = I18n::from_entries("zh_cn", &[("a", "甲")], Some(en), false);
        assert_eq!(zh.lookup("a"), Some("甲"));
        assert_eq!(zh.lookup("b"), Some("B"));
        assert_eq!(zh.lookup("c"), None);
    }

    #[test]
    fn lookup_any_prefers_own_table() {
        let en = Arc::new(I18n::from_entries("en_us", &[("item.x", "X")], None, false));
        let zh = I18n::from_entries("zh_cn", &[("block.x", "方块")], Some(en), false);
        let keys = vec!["item.x".to_string(), "block.x".to_string()];
        assert_eq!(zh.lookup_any(&keys), Some(("block.x", "方块")));
    }

    #[test]
    fn load_merges_namespaces_and_roots() {
        let base = TempRoot::new();
        base.write_json("assets/hex/lang/en_us.json", &json!({"a": "base", "b": "base"}));
        base.write_json("assets/other/lang/en_us.json", &json!({"c": "other"}));
        base.write_json("assets/hex/lang/zh_cn.json", &json!({"a": "甲"}));
        let over = TempRoot::new();
        over.write_json("assets/hex/lang/en_us.json", &json!({"a": "over"}));

        let loader = loader_with_roots("hex", vec![base.root("hex"), over.root("hex")]);
        let en = I18n::load(&loader, "en_us", false).unwrap();
        assert_eq!(en.lookup("a"), Some("over"));
        assert_eq!(en.lookup("b"), Some("base"));
        assert_eq!(en.lookup("c"), Some("other"));
        assert_eq!(en.len(), 3);
    }

    #[test]
    fn load_all_puts_default_first() {
        let root = TempRoot::new();
        root.write_json("assets/hex/lang/zh_cn.json", &json!({"a": "甲"}));
        root.write_json("assets/hex/lang/de_de.json", &json!({}));

        let loader = loader_with_roots("hex", vec![root.root("hex")]);
        let all = I18n::load_all(&loader, true).unwrap();
        let langs: Vec<&str> = all.iter().map(|i| i.lang()).collect();
        assert_eq!(langs, vec!["en_us", "de_de", "zh_cn"]);
        assert!(all[0].is_empty());
        assert!(all.iter().all(|i| i.allow_missing()));
    }

    #[test]
    fn non_string_values_rejected() {
        let root = TempRoot::new();
        root.write_json("assets/hex/lang/en_us.json", &json!({"a": 1}));
        let loader = loader_with_roots("hex", vec![root.root("hex")]);
        assert!(I18n::load(&loader, "en_us", false).is_err());
    }
}
