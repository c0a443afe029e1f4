//! Rendering of a single content item (a post or the about page).
//!
//! ## Scope
//!
//! An item renders against the shared scope (global + `common`) with one
//! extra key named after its kind:
//!
//! ```text
//! post:
//!   slug: hello             ← page-type defaults
//!   url: /posts/hello/
//!   title: Hello            ← hello.yml (overrides defaults)
//!   content: <h1>Hi</h1>    ← hello.md, always last
//! ```
//!
//! The shared scope is only borrowed; each item works on its own clone, so
//! nothing one item sets can reach the next.
//!
//! ## Output
//!
//! Every template of the item's kind is written to `<base>/<slug>/`. The
//! files are first rendered into a hidden temporary directory next to the
//! final one, which is renamed into place once every template succeeded. A
//! failing template leaves no partial output behind.

use crate::locate::{LocateError, Locator};
use crate::markdown::render_markdown;
use crate::output::{self, Diagnostics};
use crate::template::{TemplateEngine, TemplateError, TemplateFile};
use crate::types::{ContentItem, PageKind, RenderedItem};
use crate::vars::{self, VariableTree, VarsError};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PageError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Output directory {} already exists; is the slug used twice?", .0.display())]
    DirectoryCreateConflict(PathBuf),
    #[error(transparent)]
    Vars(#[from] VarsError),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> PageError + use<> {
    let path = path.to_path_buf();
    move |source| PageError::Io { path, source }
}

/// Locate the files of the item stored in `dir`.
pub fn discover(
    kind: PageKind,
    slug: &str,
    dir: &Path,
    locator: &Locator,
) -> Result<ContentItem, LocateError> {
    Ok(ContentItem {
        kind,
        slug: slug.to_string(),
        files: locator.locate(dir)?,
    })
}

/// Variables every item of `kind` starts with.
pub fn page_defaults(kind: PageKind, slug: &str) -> VariableTree {
    VariableTree::new()
        .with("slug", slug)
        .with("url", kind.url(slug))
}

/// The item's own variables: defaults, then its variable file, then the
/// rendered Markdown body as `content`.
pub fn load_page_vars(item: &ContentItem) -> Result<VariableTree, PageError> {
    let defaults = page_defaults(item.kind, &item.slug);
    let mut page = match &item.files.variables {
        Some(path) => vars::merge(&defaults, &vars::load_yaml(path)?),
        None => defaults,
    };
    let markdown = fs::read_to_string(&item.files.content).map_err(io_error(&item.files.content))?;
    page.insert("content", render_markdown(&markdown));
    Ok(page)
}

/// A copy of `shared` with the item's variables under its kind's key.
pub fn item_scope(shared: &VariableTree, kind: PageKind, page: VariableTree) -> VariableTree {
    shared.clone().with(kind.scope_key(), page)
}

/// Render `templates` against `scope` into `output_base/slug/`.
///
/// Returns the written files in template order. The target directory must
/// not exist yet.
pub fn render_item(
    output_base: &Path,
    slug: &str,
    scope: &VariableTree,
    templates: &[TemplateFile],
    engine: &TemplateEngine,
) -> Result<Vec<PathBuf>, PageError> {
    let target = output_base.join(slug);
    if target.exists() {
        return Err(PageError::DirectoryCreateConflict(target));
    }

    let staging = tempfile::Builder::new()
        .prefix(&format!(".{slug}."))
        .tempdir_in(output_base)
        .map_err(io_error(output_base))?;
    for template in templates {
        let html = engine.render(template, scope)?;
        let path = staging.path().join(&template.output_name);
        fs::write(&path, html).map_err(io_error(&path))?;
    }
    commit_staging(staging, &target)?;

    Ok(templates
        .iter()
        .map(|t| target.join(&t.output_name))
        .collect())
}

/// Move a fully written staging directory to `target`.
///
/// On failure the staging directory is removed when `staging` drops.
fn commit_staging(staging: TempDir, target: &Path) -> Result<(), PageError> {
    if let Err(source) = fs::rename(staging.path(), target) {
        if target.exists() {
            return Err(PageError::DirectoryCreateConflict(target.to_path_buf()));
        }
        return Err(PageError::Io {
            path: target.to_path_buf(),
            source,
        });
    }
    let _ = staging.keep();
    Ok(())
}

/// Resolve an item's scope and render all of its templates.
pub fn render_content_item(
    item: &ContentItem,
    shared: &VariableTree,
    templates: &[TemplateFile],
    output_base: &Path,
    engine: &TemplateEngine,
    diagnostics: &Diagnostics,
) -> Result<RenderedItem, PageError> {
    diagnostics.debug(|| output::format_item_started(item.kind, &item.slug));

    let page = load_page_vars(item)?;
    diagnostics.debug(|| output::format_item_vars(item.kind, &page));

    let scope = item_scope(shared, item.kind, page.clone());
    let outputs = render_item(output_base, &item.slug, &scope, templates, engine)?;

    Ok(RenderedItem {
        kind: item.kind,
        slug: item.slug.clone(),
        page,
        outputs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vars::Value;

    fn engine() -> TemplateEngine {
        TemplateEngine::new("mustache", false)
    }

    fn inline(output_name: &str, source: &str) -> TemplateFile {
        TemplateFile {
            path: PathBuf::from(format!("{output_name}.mustache")),
            output_name: output_name.to_string(),
            source: source.to_string(),
        }
    }

    fn post_dir(files: &[(&str, &str)]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for (name, body) in files {
            fs::write(tmp.path().join(name), body).unwrap();
        }
        tmp
    }

    fn shared() -> VariableTree {
        VariableTree::new()
            .with("site-title", "Example")
            .with("common", VariableTree::new().with("footer", "<footer/>"))
    }

    #[test]
    fn page_vars_layer_defaults_file_and_content() {
        let dir = post_dir(&[("hello.md", "# Hi"), ("hello.yml", "title: Hello\nurl: /custom/\n")]);
        let item = discover(PageKind::Post, "hello", dir.path(), &Locator::default()).unwrap();

        let page = load_page_vars(&item).unwrap();

        assert_eq!(page.text("slug"), Some("hello"));
        assert_eq!(page.text("title"), Some("Hello"));
        // The variable file overrides page-type defaults
        assert_eq!(page.text("url"), Some("/custom/"));
        assert_eq!(page.text("content"), Some("<h1>Hi</h1>\n"));
    }

    #[test]
    fn content_always_wins_over_variable_file() {
        let dir = post_dir(&[("p.md", "body"), ("p.yml", "content: sneaky\n")]);
        let item = discover(PageKind::Post, "p", dir.path(), &Locator::default()).unwrap();

        let page = load_page_vars(&item).unwrap();
        assert_eq!(page.text("content"), Some("<p>body</p>\n"));
    }

    #[test]
    fn page_vars_without_variable_file() {
        let dir = post_dir(&[("about.md", "Me.")]);
        let item = discover(PageKind::About, "about", dir.path(), &Locator::default()).unwrap();

        let page = load_page_vars(&item).unwrap();
        assert_eq!(page.text("url"), Some("/about/"));
        assert_eq!(page.len(), 3);
    }

    #[test]
    fn invalid_variable_file_is_parse_error() {
        let dir = post_dir(&[("p.md", "x"), ("p.yml", "- not\n- a mapping\n")]);
        let item = discover(PageKind::Post, "p", dir.path(), &Locator::default()).unwrap();

        assert!(matches!(
            load_page_vars(&item),
            Err(PageError::Vars(VarsError::NotAMapping { .. }))
        ));
    }

    #[test]
    fn item_scope_leaves_shared_scope_untouched() {
        let base = shared();
        let page = VariableTree::new().with("title", "One");

        let scope = item_scope(&base, PageKind::Post, page);

        assert!(!base.contains_key("post"));
        assert_eq!(scope.tree("post").unwrap().text("title"), Some("One"));
        assert_eq!(scope.text("site-title"), Some("Example"));
    }

    #[test]
    fn render_item_writes_every_template() {
        let out = TempDir::new().unwrap();
        let scope = item_scope(
            &shared(),
            PageKind::Post,
            VariableTree::new().with("title", "Hello"),
        );
        let templates = [
            inline("index.html", "<title>{{post.title}}</title>{{{common.footer}}}"),
            inline("feed.xml", "<item>{{post.title}}</item>"),
        ];

        let written = render_item(out.path(), "hello", &scope, &templates, &engine()).unwrap();

        assert_eq!(
            written,
            vec![
                out.path().join("hello/index.html"),
                out.path().join("hello/feed.xml")
            ]
        );
        assert_eq!(
            fs::read_to_string(out.path().join("hello/index.html")).unwrap(),
            "<title>Hello</title><footer/>"
        );
        assert_eq!(
            fs::read_to_string(out.path().join("hello/feed.xml")).unwrap(),
            "<item>Hello</item>"
        );
    }

    #[test]
    fn render_item_existing_directory_is_conflict() {
        let out = TempDir::new().unwrap();
        fs::create_dir(out.path().join("hello")).unwrap();

        let result = render_item(
            out.path(),
            "hello",
            &shared(),
            &[inline("index.html", "x")],
            &engine(),
        );

        assert!(matches!(result, Err(PageError::DirectoryCreateConflict(_))));
    }

    #[test]
    fn failing_template_leaves_no_partial_output() {
        let out = TempDir::new().unwrap();
        let templates = [
            inline("index.html", "fine"),
            inline("broken.html", "{{#each}}"),
        ];

        let result = render_item(out.path(), "hello", &shared(), &templates, &engine());

        assert!(matches!(result, Err(PageError::Template(_))));
        assert!(!out.path().join("hello").exists());
        // Staging directory is cleaned up as well
        assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[test]
    fn commit_onto_directory_created_meanwhile_is_conflict() {
        let out = TempDir::new().unwrap();
        let staging = tempfile::Builder::new()
            .prefix(".hello.")
            .tempdir_in(out.path())
            .unwrap();
        fs::write(staging.path().join("index.html"), "ours").unwrap();
        let staged = staging.path().to_path_buf();
        // Another writer got there between the existence check and the rename
        let target = out.path().join("hello");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("index.html"), "theirs").unwrap();

        let result = commit_staging(staging, &target);

        assert!(matches!(result, Err(PageError::DirectoryCreateConflict(p)) if p == target));
        assert_eq!(fs::read_to_string(target.join("index.html")).unwrap(), "theirs");
        assert!(!staged.exists());
    }

    #[test]
    fn section_over_item_scope_renders_page_fields() {
        let out = TempDir::new().unwrap();
        let scope = item_scope(
            &shared(),
            PageKind::Post,
            VariableTree::new().with("title", "Hello"),
        );
        let templates = [inline(
            "index.html",
            "{{#post}}<h1>{{title}}</h1>{{/post}}<p>{{site-title}}</p>",
        )];

        render_item(out.path(), "hello", &scope, &templates, &engine()).unwrap();

        assert_eq!(
            fs::read_to_string(out.path().join("hello/index.html")).unwrap(),
            "<h1>Hello</h1><p>Example</p>"
        );
    }

    #[test]
    fn separate_items_do_not_share_variables() {
        let out = TempDir::new().unwrap();
        let base = shared();
        let templates = [inline("index.html", "{{post.title}}|{{post.extra}}")];

        let first = post_dir(&[("a.md", "A"), ("a.yml", "title: First\nextra: only-first\n")]);
        let second = post_dir(&[("b.md", "B"), ("b.yml", "title: Second\n")]);

        for (slug, dir) in [("a", &first), ("b", &second)] {
            let item = discover(PageKind::Post, slug, dir.path(), &Locator::default()).unwrap();
            render_content_item(&item, &base, &templates, out.path(), &engine(), &Diagnostics::quiet())
                .unwrap();
        }

        assert_eq!(
            fs::read_to_string(out.path().join("a/index.html")).unwrap(),
            "First|only-first"
        );
        assert_eq!(
            fs::read_to_string(out.path().join("b/index.html")).unwrap(),
            "Second|"
        );
        assert_eq!(base, shared());
    }

    #[test]
    fn rendered_item_keeps_resolved_page() {
        let out = TempDir::new().unwrap();
        let dir = post_dir(&[("x.md", "text"), ("x.yml", "draft: true\n")]);
        let item = discover(PageKind::Post, "x", dir.path(), &Locator::default()).unwrap();

        let rendered = render_content_item(
            &item,
            &shared(),
            &[inline("index.html", "{{#if post.draft}}draft{{/if}}")],
            out.path(),
            &engine(),
            &Diagnostics::quiet(),
        )
        .unwrap();

        assert_eq!(rendered.slug, "x");
        assert_eq!(rendered.page.get("draft"), Some(&Value::Flag(true)));
        assert_eq!(
            fs::read_to_string(&rendered.outputs[0]).unwrap(),
            "draft"
        );
    }
}
