//! Build pipeline.
//!
//! ```text
//! props ─► plugins ─► loader ─► metadata ─► book data ─► i18n tables
//!                                                          │
//!                       ┌──────────── rayon ───────────────┤
//!                       ▼                                  ▼
//!                en_us: validate + link   ...   zh_cn: validate + link
//!                       └──────────────┬───────────────────┘
//!                                      ▼
//!                                 BuildReport
//! ```
//!
//! Everything above the fan-out is built once and frozen. Each language
//! worker gets its own [`ValidationContext`] and shares the plugins, loader
//! and metadata index read-only. A language whose book fails is reported and
//! skipped; a configuration error stops the whole run.
//!
//! Metadata and the language tables are loaded once per run. Each book in
//! `book` and `extra_books` then goes through the book data stage and the
//! fan-out on its own and gets its own [`BuildReport`].

use crate::cache::{CacheStats, Exporter};
use crate::context::ValidationContext;
use crate::error::{Error, Warning};
use crate::i18n::I18n;
use crate::loader::ResourceLoader;
use crate::metadata::{HexdocMetadata, MetadataIndex, Texture};
use crate::model::book::Book;
use crate::plugin::PluginManager;
use crate::props::{ConfigError, Properties};
use crate::render;
use crate::resource::ResourceLocation;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Substitute keys for missing translations instead of failing.
    pub allow_missing: bool,
    /// Languages to build. Empty means every language found.
    pub langs: Vec<String>,
    /// Skip unchanged exports using the cache manifest.
    pub use_cache: bool,
    /// Write metadata and rendered books to `export_dir`.
    pub export: bool,
}

/// The frozen pieces every stage shares.
pub struct Common {
    pub props: Arc<Properties>,
    pub plugins: Arc<PluginManager>,
    pub loader: Arc<ResourceLoader>,
}

impl Common {
    pub fn new(props: Properties, plugins: PluginManager, options: &BuildOptions) -> Result<Self, Error> {
        props.validate()?;
        let props = Arc::new(props);
        let mut loader = ResourceLoader::from_props(Arc::clone(&props), &plugins)?;
        if options.export {
            let export_dir = props.export_dir.clone().ok_or_else(|| {
                ConfigError::Validation("export_dir must be set to export files".into())
            })?;
            loader = loader.with_exporter(Exporter::new(
                export_dir,
                props.cache_dir.clone(),
                options.use_cache,
            ));
        }
        log::info!(
            "loaded {} with {} resource roots",
            props.modid,
            loader.roots().len()
        );
        Ok(Self {
            props,
            plugins: Arc::new(plugins),
            loader: Arc::new(loader),
        })
    }

    /// Flush the export cache, if exporting.
    pub fn finish(&self) -> Result<Option<CacheStats>, Error> {
        match self.loader.exporter() {
            Some(exporter) => Ok(Some(exporter.finish()?)),
            None => Ok(None),
        }
    }
}

/// Plugins from props, then [`Common::new`].
pub fn load_common(props: Properties, options: &BuildOptions) -> Result<Common, Error> {
    let plugins = PluginManager::for_props(&props)?;
    Common::new(props, plugins, options)
}

/// Every mod's metadata plus our own, which is built from the own roots'
/// textures and exported when exporting.
pub fn load_all_metadata(loader: &ResourceLoader) -> Result<MetadataIndex, Error> {
    let props = loader.props();
    let mut mods = loader.load_metadata()?;
    let own = HexdocMetadata {
        book_url: props.book_url(),
        asset_url: props.asset_url.clone(),
        textures: Texture::load_all(loader)?,
    };
    if loader.exporter().is_some() {
        let content = serde_json::to_vec_pretty(&own)?;
        loader.export(&HexdocMetadata::path(&props.modid), &content)?;
    }
    if mods.insert(props.modid.clone(), own).is_some() {
        log::debug!("replaced stale published metadata for {}", props.modid);
    }
    log::info!("loaded metadata for {} mods", mods.len());
    Ok(MetadataIndex::new(&props.modid, mods))
}

/// One successfully built language.
#[derive(Debug)]
pub struct LanguageBook {
    pub lang: String,
    pub book: Book,
}

/// One language whose book failed to build.
#[derive(Debug)]
pub struct LanguageFailure {
    pub lang: String,
    pub error: Error,
}

#[derive(Debug)]
pub struct BuildReport {
    pub book_id: ResourceLocation,
    /// Where this book's files go below each language directory. Empty for
    /// the main book.
    pub subdir: PathBuf,
    /// Default language first, then the rest by name.
    pub books: Vec<LanguageBook>,
    pub failures: Vec<LanguageFailure>,
    pub warnings: Vec<Warning>,
}

impl BuildReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn book(&self, lang: &str) -> Option<&Book> {
        self.books.iter().find(|b| b.lang == lang).map(|b| &b.book)
    }

    pub fn failure(&self, lang: &str) -> Option<&Error> {
        self.failures.iter().find(|f| f.lang == lang).map(|f| &f.error)
    }
}

/// Loaded once and shared by every book of a run.
struct Shared {
    metadata: Arc<MetadataIndex>,
    /// Default language first.
    languages: Vec<Arc<I18n>>,
}

impl Shared {
    fn load(common: &Common, options: &BuildOptions) -> Result<Self, Error> {
        let metadata = Arc::new(load_all_metadata(&common.loader)?);
        let languages = select_languages(
            I18n::load_all(&common.loader, options.allow_missing)?,
            &options.langs,
        )?;
        if languages.is_empty() {
            return Err(ConfigError::Validation("no languages to build".into()).into());
        }
        Ok(Self {
            metadata,
            languages,
        })
    }
}

/// Validate and link the main book in every selected language.
pub fn build_books(common: &Common, options: &BuildOptions) -> Result<BuildReport, Error> {
    let shared = Shared::load(common, options)?;
    build_book(common, &shared, common.props.book_id()?, PathBuf::new())
}

/// The main book, then every extra book, each exported to
/// `<lang>/<namespace>/<path>/`.
pub fn build_all(common: &Common, options: &BuildOptions) -> Result<Vec<BuildReport>, Error> {
    let shared = Shared::load(common, options)?;
    let mut reports = Vec::new();
    for (i, id) in common.props.book_ids()?.into_iter().enumerate() {
        let subdir = if i == 0 {
            PathBuf::new()
        } else {
            Path::new(id.namespace()).join(id.path())
        };
        reports.push(build_book(common, &shared, id, subdir)?);
    }
    Ok(reports)
}

fn build_book(
    common: &Common,
    shared: &Shared,
    requested: &ResourceLocation,
    subdir: PathBuf,
) -> Result<BuildReport, Error> {
    let props = &common.props;
    let plugins = &common.plugins;
    let loader = &common.loader;

    let minecraft = plugins.minecraft_version()?;
    let book_plugin = plugins.book_plugin(&props.book_type)?;
    let (book_id, data) =
        book_plugin.load_book_data(requested, loader, &minecraft, props.max_redirects)?;
    if &book_id != requested {
        log::info!("book {requested} redirects to {book_id}");
    }

    let context = |i18n: &Arc<I18n>| {
        ValidationContext::new(Arc::clone(props))
            .with_loader(Arc::clone(loader))
            .with_plugins(Arc::clone(plugins))
            .with_metadata(Arc::clone(&shared.metadata))
            .with_i18n(Arc::clone(i18n))
    };
    let default = &shared.languages[0];
    let facet = Book::facet(&book_id, &data, book_plugin.is_i18n_enabled(&data), &context(default))?;

    log::info!("building {book_id} in {} languages", shared.languages.len());
    let results: Vec<(String, Result<Book, Error>, Vec<Warning>)> = shared
        .languages
        .par_iter()
        .map(|i18n| {
            let ctx = context(i18n).with_book(facet.clone());
            let result = book_plugin.validate_book(&data, &ctx);
            (i18n.lang().to_string(), result, ctx.take_warnings())
        })
        .collect();

    let mut report = BuildReport {
        book_id,
        subdir,
        books: Vec::new(),
        failures: Vec::new(),
        warnings: Vec::new(),
    };
    for (lang, result, warnings) in results {
        report.warnings.extend(warnings);
        match result {
            Ok(book) => {
                log::info!("built {lang}");
                report.books.push(LanguageBook { lang, book });
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(error) => {
                log::error!("{lang} failed: {error}");
                report.failures.push(LanguageFailure { lang, error });
            }
        }
    }
    Ok(report)
}

/// Keep the requested languages, in load order.
fn select_languages(all: Vec<Arc<I18n>>, requested: &[String]) -> Result<Vec<Arc<I18n>>, ConfigError> {
    if requested.is_empty() {
        return Ok(all);
    }
    if let Some(unknown) = requested
        .iter()
        .find(|lang| !all.iter().any(|i18n| i18n.lang() == lang.as_str()))
    {
        let known: Vec<&str> = all.iter().map(|i18n| i18n.lang()).collect();
        return Err(ConfigError::Validation(format!(
            "unknown language `{unknown}` (found: {})",
            known.join(", ")
        )));
    }
    Ok(all
        .into_iter()
        .filter(|i18n| requested.iter().any(|lang| lang == i18n.lang()))
        .collect())
}

/// Build every book, then export every built language through the default
/// templates.
pub fn run(common: &Common, options: &BuildOptions) -> Result<(Vec<BuildReport>, Option<CacheStats>), Error> {
    let reports = build_all(common, options)?;
    if options.export {
        for report in &reports {
            render::export_books(common, report)?;
        }
    }
    let stats = common.finish()?;
    Ok((reports, stats))
}
