//! Document model: books, categories, entries, pages, recipes.
//!
//! Every node is built by a factory that reads a raw JSON record through
//! [`fields::Fields`] with a [`ValidationContext`](crate::context::ValidationContext).
//! Nodes are plain data: once built they hold no reference to the context,
//! the loader or each other (cross-links are ids, linked by
//! [`resolve`](crate::resolve)).

pub mod book;
pub mod fields;
pub mod ingredient;
pub mod item;
pub mod page;
pub mod recipe;
pub mod text;
