//! Validation context.
//!
//! Node factories need more than their raw record: translations, the
//! resource loader, other mods' metadata, the book's macros. Those
//! dependencies are bundled in a [`ValidationContext`] that is assembled once
//! per language build and passed explicitly to every factory. Nodes never
//! keep a reference to it.
//!
//! Facets are optional so that smaller pieces (a single recipe, a lone
//! ingredient) can be validated with only what they need. Asking for a facet
//! that was not provided is a [`ConfigError::MissingFacet`], which is a setup
//! mistake rather than bad content.

use crate::error::Warning;
use crate::i18n::I18n;
use crate::loader::ResourceLoader;
use crate::metadata::MetadataIndex;
use crate::plugin::PluginManager;
use crate::props::{ConfigError, Properties};
use crate::resource::ResourceLocation;
use crate::union::TaggedUnions;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Book-level settings every node of the book can see.
#[derive(Debug, Clone)]
pub struct BookFacet {
    pub book_id: ResourceLocation,
    /// Mod id of the project, which owns the book.
    pub modid: String,
    /// When false, localizable fields hold literal text instead of keys.
    pub i18n_enabled: bool,
    /// Book macros; props macros are applied after these.
    pub macros: BTreeMap<String, String>,
    /// Entries unlocked by these advancements are marked as spoilers.
    pub spoilered_advancements: BTreeSet<ResourceLocation>,
}

impl BookFacet {
    /// A translated book with no macros or spoilers.
    pub fn new(book_id: ResourceLocation, modid: impl Into<String>) -> Self {
        Self {
            book_id,
            modid: modid.into(),
            i18n_enabled: true,
            macros: BTreeMap::new(),
            spoilered_advancements: BTreeSet::new(),
        }
    }
}

pub struct ValidationContext {
    props: Arc<Properties>,
    loader: Option<Arc<ResourceLoader>>,
    i18n: Option<Arc<I18n>>,
    plugins: Option<Arc<PluginManager>>,
    metadata: Option<Arc<MetadataIndex>>,
    book: Option<BookFacet>,
    warnings: RefCell<Vec<Warning>>,
}

impl ValidationContext {
    pub fn new(props: Arc<Properties>) -> Self {
        Self {
            props,
            loader: None,
            i18n: None,
            plugins: None,
            metadata: None,
            book: None,
            warnings: RefCell::new(Vec::new()),
        }
    }

    pub fn with_loader(mut self, loader: Arc<ResourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_i18n(mut self, i18n: Arc<I18n>) -> Self {
        self.i18n = Some(i18n);
        self
    }

    pub fn with_plugins(mut self, plugins: Arc<PluginManager>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    pub fn with_metadata(mut self, metadata: Arc<MetadataIndex>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_book(mut self, book: BookFacet) -> Self {
        self.book = Some(book);
        self
    }

    /// Set the book facet on an existing context (after book.json is read).
    pub fn set_book(&mut self, book: BookFacet) {
        self.book = Some(book);
    }

    pub fn props(&self) -> &Properties {
        &self.props
    }

    pub fn loader(&self) -> Result<&ResourceLoader, ConfigError> {
        self.loader.as_deref().ok_or(ConfigError::MissingFacet("loader"))
    }

    pub fn i18n(&self) -> Result<&I18n, ConfigError> {
        self.i18n.as_deref().ok_or(ConfigError::MissingFacet("i18n"))
    }

    pub fn plugins(&self) -> Result<&PluginManager, ConfigError> {
        self.plugins.as_deref().ok_or(ConfigError::MissingFacet("plugins"))
    }

    pub fn unions(&self) -> Result<&TaggedUnions, ConfigError> {
        Ok(self.plugins()?.unions())
    }

    pub fn metadata(&self) -> Result<&MetadataIndex, ConfigError> {
        self.metadata.as_deref().ok_or(ConfigError::MissingFacet("metadata"))
    }

    pub fn book(&self) -> Result<&BookFacet, ConfigError> {
        self.book.as_ref().ok_or(ConfigError::MissingFacet("book"))
    }

    /// Whether localizable fields are keys. Outside a book they always are.
    pub fn i18n_enabled(&self) -> bool {
        self.book.as_ref().is_none_or(|b| b.i18n_enabled)
    }

    /// Language being built: the i18n facet's, else the default language.
    pub fn lang(&self) -> &str {
        match &self.i18n {
            Some(i18n) => i18n.lang(),
            None => &self.props.default_lang,
        }
    }

    /// Record a non-fatal problem for the build report.
    pub fn warn(&self, message: impl Into<String>) {
        let warning = Warning {
            lang: self.lang().to_string(),
            message: message.into(),
        };
        log::warn!("{warning}");
        self.warnings.borrow_mut().push(warning);
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.borrow().len()
    }

    pub fn take_warnings(&self) -> Vec<Warning> {
        std::mem::take(&mut *self.warnings.borrow_mut())
    }
}
