//! # site-gen
//!
//! A small static site generator for a blog: Markdown posts, an about page,
//! YAML variables and mustache-style templates.
//!
//! # Build Pipeline
//!
//! ```text
//! site-src/global.yml ─┐
//! built-in variables ──┴─► global scope ─► templates/common/* ─► shared scope
//!                                                                    │
//!              site-src/posts/<slug>/ ─► post scope ─► templates/posts/* ─► posts/<slug>/
//!              site-src/about/        ─► about scope ─► templates/about/* ─► about/
//! ```
//!
//! Each stage finishes before the next one starts, and the first error ends
//! the build.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`generate`] | Build orchestration: output dir, scopes, posts, about, homepage |
//! | [`page`] | Scope resolution and atomic output of one content item |
//! | [`common`] | Shared fragments rendered once and exposed as `common.*` |
//! | [`locate`] | Finds the content file and variable file of an item directory |
//! | [`vars`] | Variable trees, shallow merging, YAML loading, global scope |
//! | [`template`] | Template discovery, naming rules, mustache rendering on Handlebars |
//! | [`markdown`] | Markdown to HTML |
//! | [`config`] | Optional `site-gen.toml`, merged over stock defaults |
//! | [`types`] | Shared types (`PageKind`, `ContentItem`, `BuildReport`) |
//! | [`output`] | CLI output formatting and debug diagnostics |
//!
//! # Design Decisions
//!
//! ## Shallow, Copying Merges
//!
//! Scopes are merged key by key with the later scope winning, and a nested
//! value is replaced rather than merged into. Every merge returns a new tree.
//! The shared scope is cloned for each item, so an item can never observe
//! another item's variables.
//!
//! ## Fragments Are Rendered HTML
//!
//! Common fragments see only the global scope. Pages embed their output with
//! `{{{common.header}}}`; a fragment cannot depend on the page it ends up in.
//!
//! ## No Partial Output
//!
//! The build directory must not exist, and each item is rendered into a
//! staging directory that is renamed into place once complete. A failed
//! build leaves fully written items or nothing, never half an item.

pub mod common;
pub mod config;
pub mod generate;
pub mod locate;
pub mod markdown;
pub mod output;
pub mod page;
pub mod template;
pub mod types;
pub mod vars;

#[cfg(test)]
pub(crate) mod test_helpers;
