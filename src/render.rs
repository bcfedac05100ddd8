//! Rendering of resolved books.
//!
//! Mod plugins name the files rendered for every language
//! ([`ModPlugin::default_rendered_templates`](crate::plugin::ModPlugin)),
//! mapping an output file name to a template. Two templates exist:
//!
//! | Template | Output |
//! |----------|--------|
//! | [`INDEX_TEMPLATE`] | a single HTML page with the category tree and every entry |
//! | [`BOOK_JSON_TEMPLATE`] | the resolved model as pretty JSON |
//!
//! Files are exported to `<export_dir>/<lang>/<file>` through the export
//! cache, with extra books one level down in `<lang>/<namespace>/<path>/`.
//! Only fully linked books reach this module.

use crate::error::Error;
use crate::model::book::{Book, Category, Entry};
use crate::model::item::Icon;
use crate::model::page::{Page, PageKind};
use crate::model::text::FormatText;
use crate::pipeline::{BuildReport, Common};
use crate::plugin::PluginManager;
use crate::props::ConfigError;
use crate::resolve::{LinkTarget, link_target};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const INDEX_TEMPLATE: &str = "index";
pub const BOOK_JSON_TEMPLATE: &str = "book_json";

const CSS: &str = "\
body { font-family: sans-serif; max-width: 60rem; margin: 0 auto; padding: 1rem; }
nav ul { list-style: none; padding-left: 1rem; }
.entry { border-top: 1px solid #ccc; margin-top: 2rem; }
.page { margin: 1rem 0; }
.spoiler { filter: blur(4px); }
.spoiler:hover { filter: none; }
.missing { color: #b00; }
img.icon { width: 1.5em; height: 1.5em; vertical-align: middle; image-rendering: pixelated; }
";

/// Output file -> template, merged across every mod plugin.
pub fn templates(plugins: &PluginManager) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for plugin in plugins.mod_plugins() {
        out.extend(plugin.default_rendered_templates());
    }
    out
}

pub fn render_template(template: &str, book: &Book, lang: &str) -> Result<Vec<u8>, Error> {
    match template {
        INDEX_TEMPLATE => Ok(render_book(book, lang).into_string().into_bytes()),
        BOOK_JSON_TEMPLATE => Ok(serde_json::to_vec_pretty(book)?),
        other => Err(ConfigError::UnknownTemplate(other.to_string()).into()),
    }
}

/// Render every built language and export the files. Returns the export
/// paths, relative to the export dir.
pub fn export_books(common: &Common, report: &BuildReport) -> Result<Vec<PathBuf>, Error> {
    let templates = templates(&common.plugins);
    let mut exported = Vec::new();
    for built in &report.books {
        for (file, template) in &templates {
            let content = render_template(template, &built.book, &built.lang)?;
            let path = PathBuf::from(&built.lang).join(&report.subdir).join(file);
            if common.loader.export(&path, &content)? {
                log::debug!("wrote {}", path.display());
            }
            exported.push(path);
        }
    }
    log::info!("exported {} files", exported.len());
    Ok(exported)
}

pub fn render_book(book: &Book, lang: &str) -> Markup {
    html! {
        (DOCTYPE)
        html lang=(lang.replace('_', "-")) {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (book.name) }
                style { (CSS) }
            }
            body {
                header {
                    h1 { (book.name) }
                    @if let Some(subtitle) = &book.subtitle {
                        p.subtitle { (subtitle) }
                    }
                    p { (format_text(&book.landing_text, book)) }
                }
                nav {
                    ul {
                        @for id in &book.roots {
                            @if let Some(category) = book.category(id) {
                                (render_nav_category(book, category))
                            }
                        }
                    }
                }
                main {
                    @for id in &book.roots {
                        @if let Some(category) = book.category(id) {
                            (render_category(book, category))
                        }
                    }
                }
            }
        }
    }
}

fn render_nav_category(book: &Book, category: &Category) -> Markup {
    html! {
        li {
            a href=(format!("#{}", anchor(category.id.path()))) { (category.name) }
            @if !category.children.is_empty() || !category.entries.is_empty() {
                ul {
                    @for id in &category.children {
                        @if let Some(child) = book.category(id) {
                            (render_nav_category(book, child))
                        }
                    }
                    @for id in &category.entries {
                        @if let Some(entry) = book.entry(id) {
                            li { a href=(entry.href()) { (entry.name) } }
                        }
                    }
                }
            }
        }
    }
}

fn render_category(book: &Book, category: &Category) -> Markup {
    html! {
        section.category id=(anchor(category.id.path())) {
            h2 { (icon(&category.icon)) " " (category.name) }
            p { (format_text(&category.description, book)) }
            @for id in &category.entries {
                @if let Some(entry) = book.entry(id) {
                    @if entry.link_base.is_none() {
                        (render_entry(book, entry))
                    }
                }
            }
            @for id in &category.children {
                @if let Some(child) = book.category(id) {
                    (render_category(book, child))
                }
            }
        }
    }
}

fn render_entry(book: &Book, entry: &Entry) -> Markup {
    html! {
        article.entry.spoiler[entry.is_spoiler] id=(anchor(entry.id.path())) {
            h3.missing[entry.name.missing] { (icon(&entry.icon)) " " (entry.name) }
            @for page in &entry.pages {
                (render_page(book, page))
            }
        }
    }
}

fn render_page(book: &Book, page: &Page) -> Markup {
    html! {
        div.page id=[page.base.anchor.as_deref()] {
            @if let Some(title) = page.title() {
                h4.missing[title.missing] { (title) }
            }
            (render_page_body(page))
            @if let Some(text) = page.text() {
                p.missing[text.source.missing] { (format_text(text, book)) }
            }
        }
    }
}

fn render_page_body(page: &Page) -> Markup {
    match &page.kind {
        PageKind::Crafting(double) => html! {
            p.recipe { "Recipe: " code { (double.recipe.id.to_string()) } }
            @if let Some(second) = &double.recipe2 {
                p.recipe { "Recipe: " code { (second.id.to_string()) } }
            }
        },
        PageKind::Cooking(double) => html! {
            p.recipe {
                (double.recipe.recipe.kind.as_str()) ": " code { (double.recipe.id.to_string()) }
                " (" (double.recipe.recipe.cookingtime) " ticks)"
            }
        },
        PageKind::Stonecutting(double) => html! {
            p.recipe { "Stonecutting: " code { (double.recipe.id.to_string()) } }
        },
        PageKind::Spotlight(spotlight) => html! {
            p.spotlight {
                @if let Some(url) = &spotlight.item.texture {
                    img.icon src=(url) alt=(spotlight.item.name);
                    " "
                }
                (spotlight.item.name)
            }
        },
        PageKind::Image(image) => html! {
            @for texture in &image.images {
                @if let Some(url) = &texture.url {
                    img src=(url) alt=(texture.id.to_string());
                }
            }
        },
        PageKind::Link(link) => html! {
            p { a href=(link.url) { (link.link_text) } }
        },
        PageKind::Entity(entity) => html! {
            p.entity { code { (entity.entity) } }
        },
        PageKind::Multiblock(multiblock) => html! {
            @if let Some(id) = &multiblock.multiblock_id {
                p.multiblock { code { (id.to_string()) } }
            }
        },
        PageKind::Relations(relations) => html! {
            ul.relations {
                @for id in &relations.entries {
                    li { a href=(format!("#{}", anchor(id.path()))) { (id.to_string()) } }
                }
            }
        },
        PageKind::Text(_)
        | PageKind::Empty { .. }
        | PageKind::Quest(_)
        | PageKind::Custom(_) => html! {},
    }
}

fn icon(icon: &Icon) -> Markup {
    html! {
        @if let Some(url) = icon.url() {
            img.icon src=(url) alt="";
        }
    }
}

/// Formatted text with links pointed at their anchors in this page, at the
/// book that ships them, or at their configured override.
fn format_text(text: &FormatText, book: &Book) -> Markup {
    let namespace = book.id.namespace();
    let href = |target: &str| match link_target(target, namespace, &book.link_overrides) {
        Ok(LinkTarget::External(url)) => url,
        Ok(LinkTarget::Book { id, anchor: fragment }) => {
            let local = match fragment {
                Some(fragment) => format!("#{}", anchor(&format!("{}/{fragment}", id.path()))),
                None => format!("#{}", anchor(id.path())),
            };
            match book.entry(&id).and_then(|e| e.link_base.as_deref()) {
                Some(base) => format!("{}{local}", base.trim_end_matches('/')),
                None => local,
            }
        }
        Err(_) => target.to_string(),
    };
    PreEscaped(text.to_html(book.is_0_black, href))
}

/// HTML id for a category or entry path.
fn anchor(path: &str) -> String {
    path.replace('/', "-")
}
