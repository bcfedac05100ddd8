//! Resource identifiers.
//!
//! Every cross-reference in a book (categories, entries, recipes, items,
//! textures, advancements) is a [`ResourceLocation`]: a `namespace:path`
//! pair following the Minecraft conventions.
//!
//! ```text
//! hexcasting:basics/media     → namespace "hexcasting", path "basics/media"
//! stick                       → namespace "minecraft",  path "stick"
//! :stick                      → namespace "minecraft",  path "stick"
//! ```
//!
//! Namespaces may contain `[a-z0-9_.-]`; paths additionally allow `/` as a
//! segment separator. Empty paths and empty segments are rejected.
//!
//! Locations serialize as their canonical string so they can key JSON maps
//! and TOML tables directly.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Namespace used when a location string has none.
pub const DEFAULT_NAMESPACE: &str = "minecraft";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty resource location")]
    Empty,
    #[error("resource location `{input}` has more than one `:`")]
    TooManyColons { input: String },
    #[error("resource location `{input}` has an empty path")]
    EmptyPath { input: String },
    #[error("resource location `{input}` has an empty path segment at byte {position}")]
    EmptySegment { input: String, position: usize },
    #[error("invalid character {ch:?} in {part} of resource location `{input}` at byte {position}")]
    InvalidChar {
        input: String,
        part: &'static str,
        ch: char,
        position: usize,
    },
    #[error("invalid item stack `{input}`: {reason}")]
    ItemStack { input: String, reason: String },
}

/// A two-part `namespace:path` identifier.
///
/// Equality, ordering and hashing are structural on `(namespace, path)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceLocation {
    namespace: String,
    path: String,
}

fn is_namespace_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-')
}

fn is_path_char(c: char) -> bool {
    is_namespace_char(c) || c == '/'
}

impl ResourceLocation {
    /// Build a location from already-split parts, validating both.
    pub fn new(namespace: &str, path: &str) -> Result<Self, ParseError> {
        let input = format!("{namespace}:{path}");
        let namespace = if namespace.is_empty() {
            DEFAULT_NAMESPACE
        } else {
            namespace
        };
        check_namespace(namespace, &input, 0)?;
        check_path(path, &input, input.len() - path.len())?;
        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }

    /// Parse `namespace:path` or a bare `path` in the default namespace.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        Self::with_default_namespace(text, DEFAULT_NAMESPACE)
    }

    /// Parse a location, using `namespace` when the text has none.
    ///
    /// An explicitly empty namespace (`":path"`) is `minecraft`, the way the
    /// game reads it, whatever `namespace` is. Only a bare `path` takes
    /// `namespace`.
    pub fn with_default_namespace(text: &str, namespace: &str) -> Result<Self, ParseError> {
        if text.is_empty() {
            return Err(ParseError::Empty);
        }
        let mut parts = text.splitn(3, ':');
        let first = parts.next().unwrap_or_default();
        match (parts.next(), parts.next()) {
            (None, _) => {
                check_namespace(namespace, text, 0)?;
                check_path(first, text, 0)?;
                Ok(Self {
                    namespace: namespace.to_string(),
                    path: first.to_string(),
                })
            }
            (Some(path), None) => {
                let ns = if first.is_empty() {
                    DEFAULT_NAMESPACE
                } else {
                    check_namespace(first, text, 0)?;
                    first
                };
                check_path(path, text, first.len() + 1)?;
                Ok(Self {
                    namespace: ns.to_string(),
                    path: path.to_string(),
                })
            }
            (Some(_), Some(_)) => Err(ParseError::TooManyColons {
                input: text.to_string(),
            }),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Append `/suffix` to the path, e.g. `book_id.join("book")`.
    pub fn join(&self, suffix: &str) -> Result<Self, ParseError> {
        Self::new(&self.namespace, &format!("{}/{}", self.path, suffix))
    }

    /// Same path, different namespace.
    pub fn with_namespace(&self, namespace: &str) -> Result<Self, ParseError> {
        Self::new(namespace, &self.path)
    }

    /// Relative file path of this location under a resource folder:
    /// `<namespace>/<folder>/<path><ext>`.
    pub fn file_path(&self, folder: &str, ext: &str) -> String {
        if folder.is_empty() {
            format!("{}/{}{}", self.namespace, self.path, ext)
        } else {
            format!("{}/{}/{}{}", self.namespace, folder, self.path, ext)
        }
    }
}

fn check_namespace(ns: &str, input: &str, offset: usize) -> Result<(), ParseError> {
    if let Some((i, ch)) = ns.char_indices().find(|&(_, c)| !is_namespace_char(c)) {
        return Err(ParseError::InvalidChar {
            input: input.to_string(),
            part: "namespace",
            ch,
            position: offset + i,
        });
    }
    Ok(())
}

fn check_path(path: &str, input: &str, offset: usize) -> Result<(), ParseError> {
    if path.is_empty() {
        return Err(ParseError::EmptyPath {
            input: input.to_string(),
        });
    }
    if let Some((i, ch)) = path.char_indices().find(|&(_, c)| !is_path_char(c)) {
        return Err(ParseError::InvalidChar {
            input: input.to_string(),
            part: "path",
            ch,
            position: offset + i,
        });
    }
    let mut position = offset;
    for segment in path.split('/') {
        if segment.is_empty() {
            return Err(ParseError::EmptySegment {
                input: input.to_string(),
                position,
            });
        }
        position += segment.len() + 1;
    }
    Ok(())
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for ResourceLocation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for ResourceLocation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceLocation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// An item reference with optional count and NBT: `ns:item[#count][{nbt}]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemStack {
    pub id: ResourceLocation,
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nbt: Option<String>,
}

impl ItemStack {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let invalid = |reason: &str| ParseError::ItemStack {
            input: text.to_string(),
            reason: reason.to_string(),
        };

        let (head, nbt) = match text.find('{') {
            Some(start) => {
                if !text.ends_with('}') {
                    return Err(invalid("unterminated NBT"));
                }
                (&text[..start], Some(text[start..].to_string()))
            }
            None => (text, None),
        };

        let (id, count) = match head.split_once('#') {
            Some((id, count)) => {
                let count: u32 = count.parse().map_err(|_| invalid("count is not a number"))?;
                if count == 0 {
                    return Err(invalid("count must be at least 1"));
                }
                (id, count)
            }
            None => (head, 1),
        };

        Ok(Self {
            id: ResourceLocation::parse(id)?,
            count,
            nbt,
        })
    }
}

impl fmt::Display for ItemStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if self.count != 1 {
            write!(f, "#{}", self.count)?;
        }
        if let Some(nbt) = &self.nbt {
            write!(f, "{nbt}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn loc(s: &str) -> ResourceLocation {
        ResourceLocation::parse(s).unwrap()
    }

    #[test]
    fn parse_full_location() {
        let id = loc("hexcasting:basics/media");
        assert_eq!(id.namespace(), "hexcasting");
        assert_eq!(id.path(), "basics/media");
        assert_eq!(id.to_string(), "hexcasting:basics/media");
    }

    #[test]
    fn bare_path_gets_default_namespace() {
        assert_eq!(loc("stick").to_string(), "minecraft:stick");
        assert_eq!(loc(":stick").to_string(), "minecraft:stick");
    }

    #[test]
    fn with_default_namespace_uses_given_namespace() {
        let id = ResourceLocation::with_default_namespace("text", "patchouli").unwrap();
        assert_eq!(id.to_string(), "patchouli:text");

        let id = ResourceLocation::with_default_namespace("hexal:custom", "patchouli").unwrap();
        assert_eq!(id.to_string(), "hexal:custom");
    }

    #[test]
    fn empty_namespace_is_minecraft_not_the_given_default() {
        let id = ResourceLocation::with_default_namespace(":text", "patchouli").unwrap();
        assert_eq!(id.to_string(), "minecraft:text");
    }

    #[test]
    fn empty_is_error() {
        assert_eq!(ResourceLocation::parse(""), Err(ParseError::Empty));
    }

    #[test]
    fn empty_path_is_error() {
        assert!(matches!(
            ResourceLocation::parse("hexcasting:"),
            Err(ParseError::EmptyPath { .. })
        ));
    }

    #[test]
    fn empty_segment_reports_position() {
        let err = ResourceLocation::parse("ns:a//b").unwrap_err();
        assert_eq!(
            err,
            ParseError::EmptySegment {
                input: "ns:a//b".into(),
                position: 5
            }
        );
        assert!(matches!(
            ResourceLocation::parse("ns:a/"),
            Err(ParseError::EmptySegment { .. })
        ));
    }

    #[test]
    fn multiple_colons_is_error() {
        assert!(matches!(
            ResourceLocation::parse("a:b:c"),
            Err(ParseError::TooManyColons { .. })
        ));
    }

    #[test]
    fn invalid_chars_report_input_and_position() {
        let err = ResourceLocation::parse("Hex:stick").unwrap_err();
        match err {
            ParseError::InvalidChar {
                input,
                part,
                ch,
                position,
            } => {
                assert_eq!(input, "Hex:stick");
                assert_eq!(part, "namespace");
                assert_eq!(ch, 'H');
                assert_eq!(position, 0);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = ResourceLocation::parse("hex:st ick").unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidChar {
                part: "path",
                position: 6,
                ..
            }
        ));
        assert!(err.to_string().contains("hex:st ick"));
    }

    #[test]
    fn slash_not_allowed_in_namespace() {
        assert!(ResourceLocation::parse("a/b:c").is_err());
    }

    #[test]
    fn ordering_is_namespace_then_path() {
        let mut ids = vec![loc("b:a"), loc("a:z"), loc("a:b")];
        ids.sort();
        let strings: Vec<String> = ids.iter().map(ToString::to_string).collect();
        assert_eq!(strings, vec!["a:b", "a:z", "b:a"]);
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&loc("hexcasting:book")).unwrap();
        assert_eq!(json, "\"hexcasting:book\"");
        let back: ResourceLocation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loc("hexcasting:book"));
        assert!(serde_json::from_str::<ResourceLocation>("\"A:b\"").is_err());
    }

    #[test]
    fn join_appends_path() {
        assert_eq!(
            loc("hexcasting:thehexbook").join("book").unwrap().to_string(),
            "hexcasting:thehexbook/book"
        );
    }

    #[test]
    fn file_path_layout() {
        assert_eq!(
            loc("hexcasting:basics").file_path("patchouli_books", ".json"),
            "hexcasting/patchouli_books/basics.json"
        );
    }

    #[test]
    fn item_stack_parsing() {
        let stack = ItemStack::parse("hexcasting:amethyst_dust#4{display:{}}").unwrap();
        assert_eq!(stack.id, loc("hexcasting:amethyst_dust"));
        assert_eq!(stack.count, 4);
        assert_eq!(stack.nbt.as_deref(), Some("{display:{}}"));
        assert_eq!(stack.to_string(), "hexcasting:amethyst_dust#4{display:{}}");

        let plain = ItemStack::parse("stick").unwrap();
        assert_eq!(plain.count, 1);
        assert_eq!(plain.to_string(), "minecraft:stick");

        assert!(ItemStack::parse("stick#0").is_err());
        assert!(ItemStack::parse("stick#x").is_err());
        assert!(ItemStack::parse("stick{broken").is_err());
    }

    fn segment() -> impl Strategy<Value = String> {
        "[a-z0-9_.-]{1,8}"
    }

    proptest! {
        #[test]
        fn round_trip(ns in segment(), segments in proptest::collection::vec(segment(), 1..4)) {
            let text = format!("{}:{}", ns, segments.join("/"));
            let parsed = ResourceLocation::parse(&text).unwrap();
            prop_assert_eq!(parsed.to_string(), text.clone());
            prop_assert_eq!(ResourceLocation::parse(&parsed.to_string()).unwrap(), parsed);
        }

        #[test]
        fn bare_paths_normalize_to_default_namespace(segments in proptest::collection::vec(segment(), 1..4)) {
            let path = segments.join("/");
            let parsed = ResourceLocation::parse(&path).unwrap();
            prop_assert_eq!(parsed.to_string(), format!("minecraft:{path}"));
        }

        #[test]
        fn uppercase_never_parses(ns in segment(), upper in "[A-Z]{1,4}") {
            let text = format!("{ns}:{upper}");
            let is_invalid_char = matches!(
                ResourceLocation::parse(&text),
                Err(ParseError::InvalidChar { .. })
            );
            prop_assert!(is_invalid_char);
        }
    }
}
