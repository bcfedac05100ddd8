//! Cross-reference resolution.
//!
//! Runs once a book's categories and entries all exist. Linking checks every
//! id reference (category parents, entry categories, relations pages and
//! `$(l:...)` links), rejects parent cycles, and orders the tree. Texture and
//! link-base lookups against other mods' metadata also live here; node
//! factories call them while they are built.

use crate::context::ValidationContext;
use crate::error::{Error, ValidationError};
use crate::loader::ResourceRoot;
use crate::model::book::{Book, Category};
use crate::model::page::PageKind;
use crate::model::text::FormatText;
use crate::resource::ResourceLocation;
use std::cmp::Reverse;
use std::collections::BTreeMap;

/// Url of the first candidate texture that is published.
///
/// Returns `Ok(None)` when textures are disabled, or when none is found and
/// the first candidate may be missing (a warning is recorded). Otherwise a
/// miss is the first lookup error hit, or `NotFound` in `textures`.
pub fn texture_url(
    candidates: &[ResourceLocation],
    ctx: &ValidationContext,
) -> Result<Option<String>, Error> {
    let textures = &ctx.props().textures;
    if !textures.enabled {
        return Ok(None);
    }
    let Some(first) = candidates.first() else {
        return Ok(None);
    };

    let metadata = ctx.metadata()?;
    let mut lookup_error = None;
    for id in candidates {
        match metadata.texture_url(id) {
            Ok(Some(url)) => return Ok(Some(url)),
            Ok(None) => {}
            Err(e) => {
                lookup_error.get_or_insert(e);
            }
        }
    }

    if candidates.iter().any(|id| textures.allows_missing(id)) {
        ctx.warn(format!("missing texture {first}"));
        return Ok(None);
    }
    Err(match lookup_error {
        Some(e) => e.into(),
        None => Error::not_found("textures", first),
    })
}

/// Book url that entries from `root` link into. `None` for own roots.
pub fn link_base(root: &ResourceRoot, ctx: &ValidationContext) -> Result<Option<String>, Error> {
    if root.own {
        return Ok(None);
    }
    Ok(ctx.metadata()?.link_base(&root.modid)?.map(str::to_string))
}

/// What a `$(l:...)` target refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    External(String),
    Book {
        id: ResourceLocation,
        anchor: Option<String>,
    },
}

/// Parse a link target. Ids default to `namespace`; `http` links are
/// external, and so is any target listed in `overrides`, either as written
/// or by its full id. An anchor on an overridden target is kept.
pub fn link_target(
    target: &str,
    namespace: &str,
    overrides: &BTreeMap<String, String>,
) -> Result<LinkTarget, Error> {
    if target.starts_with("http") {
        return Ok(LinkTarget::External(target.to_string()));
    }
    let (raw, anchor) = match target.split_once('#') {
        Some((id, anchor)) => (id, Some(anchor.to_string())),
        None => (target, None),
    };
    let id = ResourceLocation::with_default_namespace(raw, namespace);
    let overridden = overrides.get(raw).or_else(|| {
        let id = id.as_ref().ok()?;
        overrides.get(&id.to_string())
    });
    if let Some(url) = overridden {
        return Ok(LinkTarget::External(match anchor {
            Some(anchor) => format!("{url}#{anchor}"),
            None => url.clone(),
        }));
    }
    Ok(LinkTarget::Book { id: id?, anchor })
}

/// Check every reference in `book` and order its tree.
pub fn link_book(mut book: Book, ctx: &ValidationContext) -> Result<Book, Error> {
    let namespace = book.id.namespace().to_string();
    let blacklist = book.blacklist.clone();
    book.entries.retain(|id, _| !blacklist.contains(id));

    let mut errors = ValidationError::new();
    check_categories(&book.categories, &mut errors);

    for (id, entry) in &book.entries {
        if !book.categories.contains_key(&entry.category) {
            errors.push(
                &format!("entries[{id}].category"),
                Error::not_found("categories", &entry.category),
            );
        }
        for (i, page) in entry.pages.iter().enumerate() {
            let path = format!("entries[{id}].pages[{i}]");
            if let PageKind::Relations(relations) = &page.kind {
                for (j, target) in relations.entries.iter().enumerate() {
                    if !book.entries.contains_key(target) {
                        errors.push(
                            &format!("{path}.entries[{j}]"),
                            Error::not_found("entries", target),
                        );
                    }
                }
            }
            if let Some(text) = page.text() {
                check_links(&book, text, &namespace, &format!("{path}.text"), &mut errors);
            }
        }
    }
    for (id, category) in &book.categories {
        check_links(
            &book,
            &category.description,
            &namespace,
            &format!("categories[{id}].description"),
            &mut errors,
        );
    }
    check_links(&book, &book.landing_text, &namespace, "landing_text", &mut errors);
    errors.into_result()?;

    order(&mut book);
    log::debug!(
        "linked book {} [{}]: {} root categories",
        book.id,
        ctx.lang(),
        book.roots.len()
    );
    Ok(book)
}

fn check_categories(categories: &BTreeMap<ResourceLocation, Category>, errors: &mut ValidationError) {
    for (id, category) in categories {
        let Some(parent) = &category.parent else {
            continue;
        };
        if !categories.contains_key(parent) {
            errors.push(
                &format!("categories[{id}].parent"),
                Error::not_found("categories", parent),
            );
            continue;
        }
        // Each cycle is reported once, at its smallest id.
        if let Some(cycle) = parent_cycle(categories, id) {
            if cycle.iter().min() == Some(id) {
                let chain: Vec<String> = cycle.iter().chain([id]).map(ToString::to_string).collect();
                errors.push(
                    &format!("categories[{id}].parent"),
                    Error::invalid(format!("category parent cycle: {}", chain.join(" -> "))),
                );
            }
        }
    }
}

/// The cycle through `start`, if following parents leads back to it.
fn parent_cycle(
    categories: &BTreeMap<ResourceLocation, Category>,
    start: &ResourceLocation,
) -> Option<Vec<ResourceLocation>> {
    let mut chain = vec![start.clone()];
    let mut current = start;
    while let Some(parent) = categories.get(current).and_then(|c| c.parent.as_ref()) {
        if parent == start {
            return Some(chain);
        }
        if chain.contains(parent) {
            return None;
        }
        chain.push(parent.clone());
        current = parent;
    }
    None
}

fn check_links(
    book: &Book,
    text: &FormatText,
    namespace: &str,
    path: &str,
    errors: &mut ValidationError,
) {
    for link in &text.links {
        match link_target(link, namespace, &book.link_overrides) {
            Ok(LinkTarget::External(_)) => {}
            Ok(LinkTarget::Book { id, .. }) => {
                if !book.entries.contains_key(&id) && !book.categories.contains_key(&id) {
                    errors.push(path, Error::not_found("entries", &id));
                }
            }
            Err(e) => errors.push(path, e),
        }
    }
}

/// Roots and children by `(sortnum, id)`; entries by priority first, then
/// `(sortnum, name)`.
fn order(book: &mut Book) {
    let mut children: BTreeMap<ResourceLocation, Vec<(i64, ResourceLocation)>> = BTreeMap::new();
    let mut roots = Vec::new();
    for (id, category) in &book.categories {
        let key = (category.sortnum, id.clone());
        match &category.parent {
            Some(parent) => children.entry(parent.clone()).or_default().push(key),
            None => roots.push(key),
        }
    }

    let mut entries: BTreeMap<ResourceLocation, Vec<_>> = BTreeMap::new();
    for (id, entry) in &book.entries {
        entries.entry(entry.category.clone()).or_default().push((
            Reverse(entry.priority),
            entry.sortnum,
            entry.name.value.clone(),
            id.clone(),
        ));
    }

    roots.sort();
    book.roots = roots.into_iter().map(|(_, id)| id).collect();
    for (id, category) in &mut book.categories {
        let mut kids = children.remove(id).unwrap_or_default();
        kids.sort();
        category.children = kids.into_iter().map(|(_, id)| id).collect();

        let mut listed = entries.remove(id).unwrap_or_default();
        listed.sort();
        category.entries = listed.into_iter().map(|(.., id)| id).collect();
    }
}
