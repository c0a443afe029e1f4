//! CLI output formatting for the build.
//!
//! # Output Format
//!
//! A normal build prints one line per generated file, grouped by page kind:
//!
//! ```text
//! Posts
//!     001 hello → posts/hello/index.html
//!     002 second → posts/second/index.html
//!
//! About → about/index.html
//! Home → index.html
//!
//! Generated 2 posts, 1 about page, 4 files
//! ```
//!
//! With `--debug`, the resolved scopes are printed as the build proceeds:
//!
//! ```text
//! Parsed global vars...
//! {
//!   "site-title": "Example",
//!   "url-about": "/about/",
//!   "url-home": "/"
//! }
//! Rendered common templates...
//!     footer, header
//! Rendering post...
//!     hello
//! Resolved post variables...
//!     content, slug, title, url
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects. Debug output goes through
//! [`Diagnostics`], which components receive as a parameter.

use crate::types::{BuildReport, PageKind, RenderedItem};
use crate::vars::VariableTree;
use std::path::Path;

/// Debug switch handed to every component that reports progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct Diagnostics {
    debug: bool,
}

impl Diagnostics {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    /// No debug output.
    pub fn quiet() -> Self {
        Self::default()
    }

    /// Print the lines produced by `lines` when debug output is on.
    ///
    /// The closure is not called otherwise, so formatting costs nothing in
    /// a normal build.
    pub fn debug(&self, lines: impl FnOnce() -> Vec<String>) {
        if self.debug {
            print_lines(lines());
        }
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Path of `path` relative to the build root, with `/` separators.
fn display_rel(path: &Path, build_root: &Path) -> String {
    let rel = path.strip_prefix(build_root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

// ============================================================================
// Debug output
// ============================================================================

/// Global scope dump, as pretty JSON.
pub fn format_global_scope(scope: &VariableTree) -> Vec<String> {
    let mut lines = vec!["Parsed global vars...".to_string()];
    match serde_json::to_string_pretty(scope) {
        Ok(json) => lines.extend(json.lines().map(str::to_string)),
        Err(e) => lines.push(format!("{}<unprintable scope: {}>", indent(1), e)),
    }
    lines
}

pub fn format_common_fragments<V>(fragments: &std::collections::BTreeMap<String, V>) -> Vec<String> {
    let names: Vec<&str> = fragments.keys().map(String::as_str).collect();
    vec![
        "Rendered common templates...".to_string(),
        format!("{}{}", indent(1), names.join(", ")),
    ]
}

pub fn format_item_started(kind: PageKind, slug: &str) -> Vec<String> {
    vec![
        format!("Rendering {}...", kind.label()),
        format!("{}{}", indent(1), slug),
    ]
}

/// Keys of an item's own scope, once defaults, file variables and content
/// are merged.
pub fn format_item_vars(kind: PageKind, page: &VariableTree) -> Vec<String> {
    let keys: Vec<&str> = page.keys().collect();
    vec![
        format!("Resolved {} variables...", kind.label()),
        format!("{}{}", indent(1), keys.join(", ")),
    ]
}

// ============================================================================
// Build summary
// ============================================================================

fn item_outputs(item: &RenderedItem, build_root: &Path) -> String {
    item.outputs
        .iter()
        .map(|p| display_rel(p, build_root))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format the summary of a finished build.
pub fn format_build_output(report: &BuildReport, build_root: &Path) -> Vec<String> {
    let mut lines = Vec::new();

    if report.assets_copied {
        lines.push("Assets \u{2192} assets/".to_string());
        lines.push(String::new());
    }

    lines.push("Posts".to_string());
    if report.posts.is_empty() {
        lines.push(format!("{}(none)", indent(1)));
    }
    for (i, post) in report.posts.iter().enumerate() {
        lines.push(format!(
            "{}{} {} \u{2192} {}",
            indent(1),
            format_index(i + 1),
            post.slug,
            item_outputs(post, build_root)
        ));
    }

    lines.push(String::new());
    lines.push(format!(
        "About \u{2192} {}",
        item_outputs(&report.about, build_root)
    ));

    if !report.home.is_empty() {
        let home: Vec<String> = report
            .home
            .iter()
            .map(|p| display_rel(p, build_root))
            .collect();
        lines.push(format!("Home \u{2192} {}", home.join(", ")));
    }

    lines.push(String::new());
    let post_word = if report.posts.len() == 1 { "post" } else { "posts" };
    lines.push(format!(
        "Generated {} {}, 1 about page, {} files",
        report.posts.len(),
        post_word,
        report.file_count()
    ));

    lines
}

/// Print the build summary to stdout.
pub fn print_build_output(report: &BuildReport, build_root: &Path) {
    print_lines(format_build_output(report, build_root));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn item(kind: PageKind, slug: &str, outputs: &[&str]) -> RenderedItem {
        RenderedItem {
            kind,
            slug: slug.to_string(),
            page: VariableTree::new(),
            outputs: outputs.iter().map(|o| PathBuf::from("/b").join(o)).collect(),
        }
    }

    fn report() -> BuildReport {
        BuildReport {
            assets_copied: true,
            fragments: vec!["header".to_string()],
            posts: vec![
                item(PageKind::Post, "hello", &["posts/hello/index.html"]),
                item(PageKind::Post, "second", &["posts/second/index.html"]),
            ],
            about: item(PageKind::About, "about", &["about/index.html"]),
            home: vec![PathBuf::from("/b/index.html")],
        }
    }

    #[test]
    fn format_index_pads_to_three_digits() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn build_output_lists_every_file() {
        let lines = format_build_output(&report(), Path::new("/b"));
        assert_eq!(
            lines,
            vec![
                "Assets \u{2192} assets/",
                "",
                "Posts",
                "    001 hello \u{2192} posts/hello/index.html",
                "    002 second \u{2192} posts/second/index.html",
                "",
                "About \u{2192} about/index.html",
                "Home \u{2192} index.html",
                "",
                "Generated 2 posts, 1 about page, 4 files",
            ]
        );
    }

    #[test]
    fn build_output_without_posts_or_assets() {
        let mut r = report();
        r.assets_copied = false;
        r.posts.clear();
        r.home.clear();

        let lines = format_build_output(&r, Path::new("/b"));

        assert_eq!(lines[0], "Posts");
        assert_eq!(lines[1], "    (none)");
        assert!(lines.last().unwrap().starts_with("Generated 0 posts"));
        assert!(!lines.iter().any(|l| l.starts_with("Home")));
    }

    #[test]
    fn global_scope_dump_is_json() {
        let scope = VariableTree::new().with("url-home", "/");
        let lines = format_global_scope(&scope);
        assert_eq!(lines[0], "Parsed global vars...");
        assert!(lines.iter().any(|l| l.contains("\"url-home\": \"/\"")));
    }

    #[test]
    fn item_vars_lists_sorted_keys() {
        let page = VariableTree::new()
            .with("url", "/posts/hello/")
            .with("content", "<p>x</p>")
            .with("title", "Hello");
        assert_eq!(
            format_item_vars(PageKind::Post, &page),
            vec!["Resolved post variables...", "    content, title, url"]
        );
    }

    #[test]
    fn item_started_names_kind_and_slug() {
        assert_eq!(
            format_item_started(PageKind::About, "about"),
            vec!["Rendering about...", "    about"]
        );
    }
}
