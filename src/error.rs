//! Crate-level error taxonomy.
//!
//! Modules keep their own `thiserror` enums ([`ParseError`], [`ConfigError`],
//! [`LookupError`]); [`Error`] is the union that node construction and the
//! pipeline propagate with `?`.
//!
//! | Kind | Fatal for | Source |
//! |------|-----------|--------|
//! | [`Error::Parse`] | the containing node | malformed identifier or literal |
//! | [`Error::Validation`] | the language build | one or more field/structure violations |
//! | [`Error::NotFound`] | the containing node | unknown discriminator or dangling id |
//! | [`Error::Configuration`] | the whole run | setup mistakes found before any book |
//! | [`Error::MissingTranslation`] | the language build, unless allow-missing | a key with no translation in any language |
//! | [`Error::Lookup`] | the containing node | cross-mod metadata not available |
//!
//! Validation accumulates: a [`ValidationError`] carries every [`Violation`]
//! found in one pass, each tagged with the field path it was found at.

use crate::metadata::LookupError;
use crate::props::ConfigError;
use crate::resource::ParseError;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no {group} entry for `{key}`")]
    NotFound { group: String, key: String },
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("missing translation for `{key}` in {lang}")]
    MissingTranslation { key: String, lang: String },
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error("{0}")]
    Invalid(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn not_found(group: impl Into<String>, key: impl ToString) -> Self {
        Error::NotFound {
            group: group.into(),
            key: key.to_string(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Error::Invalid(message.into())
    }

    /// Configuration errors abort the run and are never folded into a
    /// [`ValidationError`].
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

/// One problem found while validating a node.
#[derive(Debug)]
pub struct Violation {
    /// Dotted field path, e.g. `entries[hexcasting:basics].pages[2].recipe`.
    pub path: String,
    pub error: Error,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.error)
        } else {
            write!(f, "{}: {}", self.path, self.error)
        }
    }
}

/// Aggregate of every violation found in one validation pass.
#[derive(Debug, Default)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Record `error` at `path`. Nested validation errors are flattened with
    /// their paths prefixed.
    pub fn push(&mut self, path: &str, error: Error) {
        match error {
            Error::Validation(inner) => {
                for v in inner.violations {
                    let joined = join_path(path, &v.path);
                    self.violations.push(Violation {
                        path: joined,
                        error: v.error,
                    });
                }
            }
            error => self.violations.push(Violation {
                path: path.to_string(),
                error,
            }),
        }
    }

    pub fn extend(&mut self, other: ValidationError) {
        self.violations.extend(other.violations);
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.violations.len())?;
        for v in &self.violations {
            write!(f, "\n  - {v}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Join two field path fragments. Index fragments (`[3]`) attach directly.
pub fn join_path(prefix: &str, rest: &str) -> String {
    match (prefix.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (_, true) => prefix.to_string(),
        _ if rest.starts_with('[') => format!("{prefix}{rest}"),
        _ => format!("{prefix}.{rest}"),
    }
}

/// A non-fatal problem that must still be surfaced in the build report.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Warning {
    pub lang: String,
    pub message: String,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.lang, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_flattens_nested_errors() {
        let mut inner = ValidationError::new();
        inner.push("recipe", Error::invalid("bad"));
        inner.push("title", Error::not_found("pages", "x:y"));

        let mut outer = ValidationError::new();
        outer.push("pages[2]", Error::Validation(inner));

        let paths: Vec<&str> = outer.violations.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, vec!["pages[2].recipe", "pages[2].title"]);
    }

    #[test]
    fn join_path_handles_indices() {
        assert_eq!(join_path("pages", "[1]"), "pages[1]");
        assert_eq!(join_path("", "name"), "name");
        assert_eq!(join_path("entry", ""), "entry");
        assert_eq!(join_path("entry", "name"), "entry.name");
    }

    #[test]
    fn empty_validation_error_is_ok() {
        assert!(ValidationError::new().into_result().is_ok());
    }

    #[test]
    fn display_lists_every_violation() {
        let mut err = ValidationError::new();
        err.push("a", Error::invalid("one"));
        err.push("b", Error::invalid("two"));
        let text = err.to_string();
        assert!(text.contains("2 validation error(s)"));
        assert!(text.contains("a: one"));
        assert!(text.contains("b: two"));
    }
}
