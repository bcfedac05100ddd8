//! # hexbook
//!
//! A documentation generator for Patchouli-style in-game guide books. The
//! book's JSON files, spread across the resource roots of the mod and its
//! addons, are validated into a typed model, cross-checked, and rendered to
//! a static site for every language the mod ships.
//!
//! # Architecture: Load Once, Build Per Language
//!
//! ```text
//! 1. Setup     hexbook.toml  →  plugins, resource loader, metadata
//! 2. Build     book.json + categories/entries  →  Book per language (rayon)
//! 3. Export    Book  →  <export_dir>/<lang>/{index.html, book.json}
//! ```
//!
//! Everything from stage 1 is frozen before stage 2 fans out. Each language
//! worker owns its [`context::ValidationContext`] and only reads the shared
//! pieces, so a broken translation fails one language and leaves the others
//! building.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`resource`] | `namespace:path` identifiers and item stacks |
//! | [`props`] | `hexbook.toml` loading, merging over stock defaults, validation |
//! | [`error`] | Error taxonomy and accumulating [`error::ValidationError`] |
//! | [`union`] | Tagged-union registry: discriminator → factory, per group |
//! | [`plugin`] | Plugin contract, plugin manager, built-in `patchouli` format |
//! | [`loader`] | Merged, prioritized view over resource roots |
//! | [`i18n`] | Translation tables with default-language fallback |
//! | [`metadata`] | Per-mod published metadata: book url, texture urls |
//! | [`context`] | Facets handed to every node factory |
//! | [`model`] | Book, category, entry, page, recipe and ingredient nodes |
//! | [`resolve`] | Cross-reference checks, cycle detection, ordering, texture urls |
//! | [`pipeline`] | Setup and the per-language parallel build |
//! | [`render`] | Maud templates for the exported site |
//! | [`cache`] | Content-hashed export cache |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Validation Accumulates
//!
//! Content errors are collected with their field paths
//! (`entries[hex:basics/media].pages[2].recipe`) instead of stopping at the
//! first one. A book author fixing a broken addon sees every problem in one
//! run. Configuration errors are the exception: they abort immediately,
//! since nothing downstream of a bad setup is meaningful.
//!
//! ## Closed Registration
//!
//! Plugins register page, recipe and ingredient variants in a single pass
//! while the [`plugin::PluginManager`] is built. The registry is immutable
//! afterwards and shared across language workers without locking.
//!
//! ## Cross-Mod Books
//!
//! An addon's entries can live in the base mod's book. Entries loaded from
//! another mod's resource root link to that mod's published book url, found
//! in its `<modid>.hexdoc.json`, which every build also exports for its own
//! mod.

pub mod cache;
pub mod context;
pub mod error;
pub mod i18n;
pub mod loader;
pub mod metadata;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod plugin;
pub mod props;
pub mod render;
pub mod resolve;
pub mod resource;
pub mod union;

#[cfg(test)]
pub(crate) mod test_helpers;
