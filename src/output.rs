//! CLI output formatting for build results.
//!
//! # Information-First Display
//!
//! Output leads with what was built, not with files. Each language gets a
//! status line; the category tree of the default language follows with
//! positional indices per sibling level, and failures list every violation
//! with its field path as indented context.
//!
//! ```text
//! Book hex:guide
//! en_us: ok (2 categories, 3 entries)
//! zh_cn: FAILED
//!     entries[hex:basics/media].pages[0].text: missing translation for `hex.media.0` in zh_cn
//!
//! Contents
//! 001 Basics (2 entries)
//!     001 Media
//!     002 Casting
//!     001 Advanced (1 entries)
//!         001 Great Spells → https://hex.example/v/1.0.0#great-spells
//!
//! Warnings
//!     [ru_ru] missing translation for `hex.media.0`
//!
//! Cache: 3 unchanged, 2 written (5 total)
//! ```
//!
//! # Architecture
//!
//! Every section has a `format_*` function returning `Vec<String>` for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure.

use crate::cache::CacheStats;
use crate::error::Error;
use crate::metadata::MetadataIndex;
use crate::model::book::{Book, Category};
use crate::pipeline::BuildReport;

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Positional index + title, with an optional entry count.
///
/// ```text
/// 001 Basics (5 entries)
/// 002 Patterns
/// ```
fn entity_header(index: usize, title: &str, count: Option<usize>) -> String {
    match count {
        Some(n) => format!("{} {} ({} entries)", format_index(index), title, n),
        None => format!("{} {}", format_index(index), title),
    }
}

/// Every violation of `error` as a `path: message` line. Non-validation
/// errors are one line.
fn error_lines(error: &Error) -> Vec<String> {
    match error {
        Error::Validation(inner) => inner.violations.iter().map(ToString::to_string).collect(),
        other => vec![other.to_string()],
    }
}

// ============================================================================
// Build report
// ============================================================================

/// Status line per language, with failures expanded.
pub fn format_report(report: &BuildReport) -> Vec<String> {
    let mut lines = vec![format!("Book {}", report.book_id)];
    for built in &report.books {
        lines.push(format!(
            "{}: ok ({} categories, {} entries)",
            built.lang,
            built.book.categories.len(),
            built.book.entries.len()
        ));
    }
    for failure in &report.failures {
        lines.push(format!("{}: FAILED", failure.lang));
        for line in error_lines(&failure.error) {
            lines.push(format!("{}{}", indent(1), line));
        }
    }
    lines
}

/// The category tree. Each category lists its entries, then its child
/// categories, the way the index page does.
pub fn format_book_tree(book: &Book) -> Vec<String> {
    let mut lines = vec!["Contents".to_string()];
    for (i, id) in book.roots.iter().enumerate() {
        if let Some(category) = book.category(id) {
            walk_category(book, category, i + 1, 0, &mut lines);
        }
    }
    lines
}

fn walk_category(book: &Book, category: &Category, position: usize, depth: usize, lines: &mut Vec<String>) {
    lines.push(format!(
        "{}{}",
        indent(depth),
        entity_header(position, &category.name.value, Some(category.entries.len()))
    ));
    for (i, id) in category.entries.iter().enumerate() {
        let Some(entry) = book.entry(id) else {
            continue;
        };
        let header = entity_header(i + 1, &entry.name.value, None);
        match &entry.link_base {
            Some(_) => lines.push(format!("{}{header} \u{2192} {}", indent(depth + 1), entry.href())),
            None => lines.push(format!("{}{header}", indent(depth + 1))),
        }
    }
    for (i, id) in category.children.iter().enumerate() {
        if let Some(child) = book.category(id) {
            walk_category(book, child, i + 1, depth + 1, lines);
        }
    }
}

pub fn format_warnings(report: &BuildReport) -> Vec<String> {
    if report.warnings.is_empty() {
        return Vec::new();
    }
    let mut lines = vec!["Warnings".to_string()];
    lines.extend(report.warnings.iter().map(|w| format!("{}{w}", indent(1))));
    lines
}

pub fn format_cache_stats(stats: &CacheStats) -> String {
    format!("Cache: {stats}")
}

/// Mods with loaded metadata and what they publish.
///
/// ```text
/// hex (own): 12 textures, book https://hex.example/v/1.0.0
/// other: 3 textures, no book url
/// ```
pub fn format_metadata(index: &MetadataIndex) -> Vec<String> {
    index
        .mods()
        .map(|(modid, metadata)| {
            let own = if modid == index.own_modid() { " (own)" } else { "" };
            let book = match &metadata.book_url {
                Some(url) => format!("book {url}"),
                None => "no book url".to_string(),
            };
            format!("{modid}{own}: {} textures, {book}", metadata.textures.len())
        })
        .collect()
}

/// Report, default-language tree and warnings.
pub fn print_report(report: &BuildReport) {
    let mut sections = vec![format_report(report)];
    if let Some(first) = report.books.first() {
        sections.push(format_book_tree(&first.book));
    }
    sections.push(format_warnings(report));
    for (i, section) in sections.iter().filter(|s| !s.is_empty()).enumerate() {
        if i > 0 {
            println!();
        }
        for line in section {
            println!("{}", line);
        }
    }
}

/// [`print_report`] for each book, separated by a blank line.
pub fn print_reports(reports: &[BuildReport]) {
    for (i, report) in reports.iter().enumerate() {
        if i > 0 {
            println!();
        }
        print_report(report);
    }
}

pub fn print_metadata(index: &MetadataIndex) {
    for line in format_metadata(index) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ValidationError, Warning};
    use crate::metadata::HexdocMetadata;
    use crate::pipeline::{LanguageBook, LanguageFailure};
    use crate::test_helpers::*;
    use std::collections::BTreeMap;

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn indent_levels() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }

    #[test]
    fn entity_header_with_and_without_count() {
        assert_eq!(entity_header(1, "Basics", Some(5)), "001 Basics (5 entries)");
        assert_eq!(entity_header(3, "Media", None), "003 Media");
    }

    fn report(books: Vec<LanguageBook>, failures: Vec<LanguageFailure>, warnings: Vec<Warning>) -> BuildReport {
        BuildReport {
            book_id: loc("hex:guide"),
            subdir: std::path::PathBuf::new(),
            books,
            failures,
            warnings,
        }
    }

    #[test]
    fn report_lists_languages_and_violations() {
        let root = TempRoot::new();
        let book = sample_book(&root);
        let mut violations = ValidationError::new();
        violations.push("entries[hex:basics/media].name", Error::invalid("field required"));
        violations.push("categories[hex:basics].parent", Error::not_found("categories", "hex:nope"));
        let r = report(
            vec![LanguageBook {
                lang: "en_us".into(),
                book,
            }],
            vec![LanguageFailure {
                lang: "zh_cn".into(),
                error: Error::Validation(violations),
            }],
            vec![],
        );
        assert_eq!(
            format_report(&r),
            vec![
                "Book hex:guide",
                "en_us: ok (1 categories, 1 entries)",
                "zh_cn: FAILED",
                "    entries[hex:basics/media].name: field required",
                "    categories[hex:basics].parent: no categories entry for `hex:nope`",
            ]
        );
    }

    #[test]
    fn tree_shows_categories_and_entries() {
        let root = TempRoot::new();
        let book = sample_book(&root);
        assert_eq!(
            format_book_tree(&book),
            vec!["Contents", "001 Basics (1 entries)", "    001 Media"]
        );
    }

    #[test]
    fn warnings_section_only_when_present() {
        assert!(format_warnings(&report(vec![], vec![], vec![])).is_empty());
        let r = report(
            vec![],
            vec![],
            vec![Warning {
                lang: "ru_ru".into(),
                message: "missing translation for `x`".into(),
            }],
        );
        assert_eq!(
            format_warnings(&r),
            vec!["Warnings", "    [ru_ru] missing translation for `x`"]
        );
    }

    #[test]
    fn cache_stats_line() {
        let stats = CacheStats {
            unchanged: 3,
            written: 2,
        };
        assert_eq!(format_cache_stats(&stats), "Cache: 3 unchanged, 2 written (5 total)");
    }

    #[test]
    fn metadata_lines() {
        let mut mods = BTreeMap::new();
        mods.insert(
            "hex".to_string(),
            HexdocMetadata {
                book_url: Some("https://hex.example/v/1.0.0".into()),
                asset_url: "https://hex.cdn".into(),
                textures: vec![],
            },
        );
        mods.insert(
            "other".to_string(),
            HexdocMetadata {
                book_url: None,
                asset_url: "https://other.cdn".into(),
                textures: vec![],
            },
        );
        let index = MetadataIndex::new("hex", mods);
        assert_eq!(
            format_metadata(&index),
            vec![
                "hex (own): 0 textures, book https://hex.example/v/1.0.0",
                "other: 0 textures, no book url",
            ]
        );
    }
}
