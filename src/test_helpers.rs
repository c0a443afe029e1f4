//! Shared test utilities for the site-gen test suite.
//!
//! Provides a small but complete project tree and helpers to read what a
//! build produced.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = site_project();
//! build_site(site.path(), &SiteConfig::default(), &Diagnostics::quiet()).unwrap();
//!
//! let html = read_built(site.path(), "posts/hello/index.html");
//! assert!(html.contains("<h1>Hi</h1>"));
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

// =========================================================================
// Fixture setup
// =========================================================================

/// Files of the default fixture project, relative to its root.
///
/// - two posts, `hello` (with variables) and `second` (Markdown only)
/// - an about page
/// - `header` and `footer` fragments; posts include the footer as a partial
/// - one stylesheet under `generator/assets/`
pub const SITE_FILES: &[(&str, &str)] = &[
    ("site-src/global.yml", "site-title: Example\n"),
    ("site-src/posts/hello/hello.md", "# Hi\n"),
    ("site-src/posts/hello/hello.yml", "title: Hello\n"),
    ("site-src/posts/second/second.md", "Second post.\n"),
    ("site-src/about/about.md", "Who writes this.\n"),
    ("site-src/about/about.yml", "title: About\n"),
    (
        "generator/templates/common/header.html.mustache",
        "<header><a href=\"{{url-home}}\">{{site-title}}</a></header>",
    ),
    (
        "generator/templates/common/footer.mustache",
        "<footer>{{site-title}}</footer>",
    ),
    (
        "generator/templates/posts/index.html.mustache",
        "<!DOCTYPE html>
<html>
<head><title>{{#post}}{{#title}}{{.}}{{/title}}{{^title}}{{slug}}{{/title}}{{/post}} | {{site-title}}</title></head>
<body data-url=\"{{post.url}}\">
{{{common.header}}}
<main>{{{post.content}}}</main>
{{> footer}}
</body>
</html>
",
    ),
    (
        "generator/templates/about/index.html.mustache",
        "{{{common.header}}}
<h1>About {{site-title}}</h1>
<nav><a href=\"{{url-home}}\">Home</a> <a href=\"{{url-about}}\">{{about.title}}</a></nav>
{{{about.content}}}
{{{common.footer}}}
",
    ),
    ("generator/assets/css/style.css", "body { margin: 0; }\n"),
];

/// Write the default fixture project to a fresh temp directory.
///
/// Tests get an isolated copy they can mutate freely.
pub fn site_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (rel, body) in SITE_FILES {
        write_file(tmp.path(), rel, body);
    }
    tmp
}

/// Write `body` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, body).unwrap();
}

// =========================================================================
// Build output
// =========================================================================

/// Read a file relative to the default build directory. Panics if missing.
pub fn read_built(root: &Path, rel: &str) -> String {
    let path = root.join("tmp-site-build").join(rel);
    fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read built file {}: {e}", path.display()))
}

/// Every file under the default build directory, relative and sorted.
pub fn built_files(root: &Path) -> Vec<String> {
    let build = root.join("tmp-site-build");
    let mut files: Vec<String> = WalkDir::new(&build)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            e.path()
                .strip_prefix(&build)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}
