//! Shared types passed between discovery, rendering and reporting.

use crate::locate::ContentFiles;
use crate::vars::VariableTree;
use std::path::PathBuf;

/// The kinds of content item a site is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Post,
    About,
}

impl PageKind {
    /// Scope key holding the item's own variables (`post.title`, `about.content`).
    pub fn scope_key(self) -> &'static str {
        match self {
            PageKind::Post => "post",
            PageKind::About => "about",
        }
    }

    /// Human readable name for output.
    pub fn label(self) -> &'static str {
        self.scope_key()
    }

    /// Site-relative URL of an item of this kind.
    pub fn url(self, slug: &str) -> String {
        match self {
            PageKind::Post => format!("/posts/{slug}/"),
            PageKind::About => "/about/".to_string(),
        }
    }
}

/// A content directory discovered during the build.
///
/// The slug is the directory name, used verbatim as URL segment and output
/// directory name.
#[derive(Debug, Clone)]
pub struct ContentItem {
    pub kind: PageKind,
    pub slug: String,
    pub files: ContentFiles,
}

/// An item whose output files have been written.
#[derive(Debug, Clone)]
pub struct RenderedItem {
    pub kind: PageKind,
    pub slug: String,
    /// The item's resolved variables, `content` included.
    pub page: VariableTree,
    pub outputs: Vec<PathBuf>,
}

/// Everything a finished build produced.
#[derive(Debug, Clone)]
pub struct BuildReport {
    pub assets_copied: bool,
    pub fragments: Vec<String>,
    /// In render order.
    pub posts: Vec<RenderedItem>,
    pub about: RenderedItem,
    pub home: Vec<PathBuf>,
}

impl BuildReport {
    /// Number of rendered files, assets excluded.
    pub fn file_count(&self) -> usize {
        self.posts.iter().map(|p| p.outputs.len()).sum::<usize>()
            + self.about.outputs.len()
            + self.home.len()
    }
}
