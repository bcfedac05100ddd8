//! Localized and formatted text.
//!
//! Patchouli text goes through three steps: translation (when the book has
//! i18n enabled), macro expansion, and style-code interpretation. Style codes
//! look like `$(br)`, `$(l:basics/media)link$(/l)` or `$(#490)`; line
//! breaks, links and colors survive into HTML.

use crate::context::ValidationContext;
use crate::error::Error;
use crate::model::fields::string;
use crate::resource::ResourceLocation;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Expansion stops after this many passes even if text keeps changing.
pub const MAX_MACRO_PASSES: usize = 10;

/// Macros Patchouli defines for every book. Book and props macros override.
const DEFAULT_MACROS: &[(&str, &str)] = &[
    ("$(obf)", "$(k)"),
    ("$(bold)", "$(l)"),
    ("$(strike)", "$(m)"),
    ("$(italic)", "$(o)"),
    ("$(italics)", "$(o)"),
    ("$(list", "$(li"),
    ("$(reset)", "$()"),
    ("$(clear)", "$()"),
    ("$(2br)", "$(br2)"),
    ("$(p)", "$(br2)"),
    ("/$", "$()"),
    ("<br>", "$(br)"),
    ("$(nocolor)", "$(0)"),
    ("$(item)", "$(#b0b)"),
    ("$(thing)", "$(#490)"),
];

/// A string resolved against the active language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalizedStr {
    /// Translation key, or the literal text for untranslated books.
    pub key: String,
    pub value: String,
    /// Set when no translation existed and allow-missing mode substituted
    /// the key.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub missing: bool,
}

impl LocalizedStr {
    pub fn literal(text: &str) -> Self {
        Self {
            key: text.to_string(),
            value: text.to_string(),
            missing: false,
        }
    }

    /// Look `key` up in the context's language, falling back to the default
    /// language.
    pub fn localize(key: &str, ctx: &ValidationContext) -> Result<Self, Error> {
        let i18n = ctx.i18n()?;
        match i18n.lookup(key) {
            Some(value) => Ok(Self {
                key: key.to_string(),
                value: value.to_string(),
                missing: false,
            }),
            None => Self::missing(key, ctx),
        }
    }

    /// Item names: `item.<ns>.<path>`, then `block.<ns>.<path>`.
    pub fn item(id: &ResourceLocation, ctx: &ValidationContext) -> Result<Self, Error> {
        let suffix = format!("{}.{}", id.namespace(), id.path().replace('/', "."));
        let keys = [format!("item.{suffix}"), format!("block.{suffix}")];
        match ctx.i18n()?.lookup_any(&keys) {
            Some((key, value)) => Ok(Self {
                key: key.to_string(),
                value: value.to_string(),
                missing: false,
            }),
            None => Self::missing(&keys[0], ctx),
        }
    }

    /// A string field: a key when the book is translated, else literal text.
    pub fn from_value(value: &Value, ctx: &ValidationContext) -> Result<Self, Error> {
        let text = string(value)?;
        if ctx.i18n_enabled() {
            Self::localize(&text, ctx)
        } else {
            Ok(Self::literal(&text))
        }
    }

    fn missing(key: &str, ctx: &ValidationContext) -> Result<Self, Error> {
        let i18n = ctx.i18n()?;
        if !i18n.allow_missing() {
            return Err(Error::MissingTranslation {
                key: key.to_string(),
                lang: i18n.lang().to_string(),
            });
        }
        ctx.warn(format!("missing translation for `{key}`"));
        Ok(Self {
            key: key.to_string(),
            value: key.to_string(),
            missing: true,
        })
    }
}

impl fmt::Display for LocalizedStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl maud::Render for LocalizedStr {
    fn render_to(&self, buffer: &mut String) {
        self.value.render_to(buffer);
    }
}

/// Patchouli-formatted text after translation and macro expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatText {
    pub source: LocalizedStr,
    /// Text with every macro expanded.
    pub text: String,
    /// Targets of `$(l:...)` links, in order of appearance.
    pub links: Vec<String>,
}

impl FormatText {
    pub fn from_value(value: &Value, ctx: &ValidationContext) -> Result<Self, Error> {
        let source = LocalizedStr::from_value(value, ctx)?;
        let (text, settled) = expand_macros(&source.value, &macros(ctx));
        if !settled {
            ctx.warn(format!(
                "macro expansion of `{}` did not settle after {MAX_MACRO_PASSES} passes",
                source.key
            ));
        }
        let links = extract_links(&text);
        Ok(Self {
            source,
            text,
            links,
        })
    }

    /// Render to HTML. `href` maps a link target to its url. `$(0)` is black
    /// when `is_0_black` is set, else it ends the current color like `$()`.
    pub fn to_html(&self, is_0_black: bool, href: impl Fn(&str) -> String) -> String {
        let mut out = String::new();
        let mut colored = false;
        let mut rest = self.text.as_str();
        while let Some(start) = rest.find("$(") {
            push_escaped(&mut out, &rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find(')') else {
                push_escaped(&mut out, &rest[start..]);
                rest = "";
                break;
            };
            let code = &after[..end];
            match code {
                "br" => out.push_str("<br>"),
                "br2" => out.push_str("<br><br>"),
                "/l" => out.push_str("</a>"),
                "li" => out.push_str("<br>&bull; "),
                "" => end_color(&mut out, &mut colored),
                "0" if is_0_black => start_color(&mut out, &mut colored, "#000"),
                "0" => end_color(&mut out, &mut colored),
                _ => {
                    if let Some(target) = code.strip_prefix("l:") {
                        out.push_str(&format!("<a href=\"{}\">", escape(&href(target))));
                    } else if let Some(color) = code.strip_prefix('#').filter(|c| is_hex_color(c)) {
                        start_color(&mut out, &mut colored, &format!("#{color}"));
                    }
                }
            }
            rest = &after[end + 1..];
        }
        push_escaped(&mut out, rest);
        end_color(&mut out, &mut colored);
        out
    }
}

/// Patchouli defaults, then book macros, then props macros.
fn macros(ctx: &ValidationContext) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = DEFAULT_MACROS
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    if let Ok(book) = ctx.book() {
        out.extend(book.macros.clone());
    }
    out.extend(ctx.props().macros.clone());
    out
}

/// Apply `macros` until the text stops changing. Longer keys are applied
/// first so `$(italics)` is not eaten by `$(italic)`. Returns the text and
/// whether it settled within [`MAX_MACRO_PASSES`].
pub fn expand_macros(text: &str, macros: &BTreeMap<String, String>) -> (String, bool) {
    let mut ordered: Vec<(&String, &String)> = macros.iter().collect();
    ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));

    let mut current = text.to_string();
    for _ in 0..MAX_MACRO_PASSES {
        let mut next = current.clone();
        for (key, value) in &ordered {
            if next.contains(key.as_str()) {
                next = next.replace(key.as_str(), value);
            }
        }
        if next == current {
            return (current, true);
        }
        current = next;
    }
    (current, false)
}

/// Targets of every `$(l:target)` in `text`.
pub fn extract_links(text: &str) -> Vec<String> {
    let mut links = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find("$(l:") {
        let after = &rest[start + 4..];
        let Some(end) = after.find(')') else {
            break;
        };
        links.push(after[..end].to_string());
        rest = &after[end + 1..];
    }
    links
}

fn is_hex_color(code: &str) -> bool {
    matches!(code.len(), 3 | 6) && code.chars().all(|c| c.is_ascii_hexdigit())
}

fn start_color(out: &mut String, colored: &mut bool, color: &str) {
    end_color(out, colored);
    out.push_str(&format!("<span style=\"color: {color}\">"));
    *colored = true;
}

fn end_color(out: &mut String, colored: &mut bool) {
    if std::mem::take(colored) {
        out.push_str("</span>");
    }
}

fn escape(text: &str) -> String {
    maud::html! { (text) }.into_string()
}

fn push_escaped(out: &mut String, text: &str) {
    if !text.is_empty() {
        out.push_str(&escape(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BookFacet;
    use crate::i18n::I18n;
    use crate::test_helpers::*;
    use serde_json::json;
    use std::sync::Arc;

    fn ctx(entries: &[(&str, &str)], allow_missing: bool) -> ValidationContext {
        ValidationContext::new(Arc::new(props("hex")))
            .with_i18n(Arc::new(I18n::from_entries("en_us", entries, None, allow_missing)))
    }

    #[test]
    fn localize_hits_and_misses() {
        let c = ctx(&[("hex.title", "Hex")], false);
        let s = LocalizedStr::localize("hex.title", &c).unwrap();
        assert_eq!(s.value, "Hex");
        assert!(!s.missing);

        let err = LocalizedStr::localize("hex.nope", &c).unwrap_err();
        assert!(matches!(err, Error::MissingTranslation { ref key, .. } if key == "hex.nope"));
    }

    #[test]
    fn allow_missing_substitutes_key_and_warns() {
        let c = ctx(&[], true);
        let s = LocalizedStr::localize("hex.nope", &c).unwrap();
        assert!(s.missing);
        assert_eq!(s.value, "hex.nope");
        let warnings = c.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("hex.nope"));
    }

    #[test]
    fn item_names_try_item_then_block() {
        let c = ctx(&[("block.hex.slate", "Slate")], false);
        let s = LocalizedStr::item(&loc("hex:slate"), &c).unwrap();
        assert_eq!(s.key, "block.hex.slate");
        assert_eq!(s.value, "Slate");

        let c = ctx(&[("item.hex.focus.full", "Focus")], false);
        assert_eq!(
            LocalizedStr::item(&loc("hex:focus/full"), &c).unwrap().value,
            "Focus"
        );
    }

    #[test]
    fn literal_when_book_not_translated() {
        let mut c = ctx(&[], false);
        c.set_book(BookFacet {
            i18n_enabled: false,
            ..BookFacet::new(loc("hex:guide"), "hex")
        });
        let s = LocalizedStr::from_value(&json!("Plain words"), &c).unwrap();
        assert_eq!(s.value, "Plain words");
    }

    #[test]
    fn missing_i18n_facet_is_fatal() {
        let c = ValidationContext::new(Arc::new(props("hex")));
        let err = LocalizedStr::localize("x", &c).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn macros_expand_to_fixpoint_longest_first() {
        let mut macros = BTreeMap::new();
        macros.insert("$(italic)".to_string(), "$(o)".to_string());
        macros.insert("$(italics)".to_string(), "$(o)".to_string());
        macros.insert("$(media)".to_string(), "$(thing)media".to_string());
        macros.insert("$(thing)".to_string(), "$(#490)".to_string());
        let (text, settled) = expand_macros("$(italics)x $(media)", &macros);
        assert!(settled);
        assert_eq!(text, "$(o)x $(#490)media");
    }

    #[test]
    fn self_referential_macro_is_capped() {
        let mut macros = BTreeMap::new();
        macros.insert("a".to_string(), "aa".to_string());
        let (_, settled) = expand_macros("a", &macros);
        assert!(!settled);
    }

    #[test]
    fn format_text_collects_links_and_applies_props_macros() {
        let mut p = props("hex");
        p.macros.insert("$(wiki)".into(), "$(l:basics/wiki)".into());
        let c = ValidationContext::new(Arc::new(p)).with_i18n(Arc::new(I18n::from_entries(
            "en_us",
            &[("hex.text", "See $(wiki)here$(/l) and $(l:https://x.example)web$(/l).")],
            None,
            false,
        )));
        let t = FormatText::from_value(&json!("hex.text"), &c).unwrap();
        assert_eq!(t.links, vec!["basics/wiki", "https://x.example"]);
    }

    #[test]
    fn html_keeps_breaks_and_links() {
        let c = ctx(&[("k", "a < b$(br)$(l:x)go$(/l)$(o)!")], false);
        let t = FormatText::from_value(&json!("k"), &c).unwrap();
        let html = t.to_html(false, |target| format!("#{target}"));
        assert_eq!(html, "a &lt; b<br><a href=\"#x\">go</a>!");
    }

    #[test]
    fn colors_become_spans() {
        let c = ctx(&[("k", "$(#490)green$() plain $(#b0b)item")], false);
        let t = FormatText::from_value(&json!("k"), &c).unwrap();
        assert_eq!(
            t.to_html(false, |target| target.to_string()),
            "<span style=\"color: #490\">green</span> plain <span style=\"color: #b0b\">item</span>"
        );
    }

    #[test]
    fn zero_is_black_or_reset() {
        let c = ctx(&[("k", "$(#490)a$(0)b")], false);
        let t = FormatText::from_value(&json!("k"), &c).unwrap();
        assert_eq!(
            t.to_html(false, |target| target.to_string()),
            "<span style=\"color: #490\">a</span>b"
        );
        assert_eq!(
            t.to_html(true, |target| target.to_string()),
            "<span style=\"color: #490\">a</span><span style=\"color: #000\">b</span>"
        );
    }
}
