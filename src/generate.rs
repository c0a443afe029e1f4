//! Site build orchestration.
//!
//! A build runs these steps in order, each one finishing before the next
//! starts. Any error aborts the whole build.
//!
//! ```text
//! 1. prepare   create <build>/, copy generator/assets/ → <build>/assets/
//! 2. global    built-in variables + site-src/global.yml
//! 3. common    render templates/common/* once, store as common.*
//! 4. posts     site-src/posts/<slug>/ → <build>/posts/<slug>/
//! 5. about     site-src/about/        → <build>/about/
//! 6. home      templates/home/*       → <build>/ (only if present)
//! ```
//!
//! The build directory must not exist beforehand. Nothing is ever deleted,
//! so stale and fresh output cannot mix and no user data is lost.
//!
//! Post directories are rendered in lexicographic order, and all of them are
//! located before the first one is rendered: a post without content stops
//! the build before any post output exists.

use crate::common::{self, inject_common};
use crate::config::{ConfigError, SiteConfig, SitePaths};
use crate::locate::{LocateError, Locator};
use crate::output::{self, Diagnostics};
use crate::page::{self, PageError};
use crate::template::{TemplateEngine, TemplateError};
use crate::types::{BuildReport, ContentItem, PageKind, RenderedItem};
use crate::vars::{self, Value, VariableTree, VarsError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Name of the assets directory inside the build root.
pub const ASSETS_DIR: &str = "assets";

/// Scope key of the homepage variables.
pub const HOME_KEY: &str = "home";

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Build directory {} already exists. Please remove it and try again.", .0.display())]
    BuildDirExists(PathBuf),
    #[error("Could not find file or directory at \"{}\".", .0.display())]
    MissingInput(PathBuf),
    #[error("Post directory name {} is not valid UTF-8", .0.display())]
    InvalidSlug(PathBuf),
    #[error("Output file {} already exists", .0.display())]
    OutputConflict(PathBuf),
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to copy assets: {0}")]
    Assets(#[from] walkdir::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Locate(#[from] LocateError),
    #[error(transparent)]
    Vars(#[from] VarsError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error(transparent)]
    Page(#[from] PageError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BuildError + use<> {
    let path = path.to_path_buf();
    move |source| BuildError::Io { path, source }
}

/// Build the site of the project rooted at `root`.
pub fn build_site(
    root: &Path,
    config: &SiteConfig,
    diagnostics: &Diagnostics,
) -> Result<BuildReport, BuildError> {
    let paths = config.paths(root);
    let mut engine = TemplateEngine::new(&config.extensions.template, config.templates.strict);
    let locator = Locator::new(&config.extensions, config.variables.multiple_files);

    let assets_copied = prepare_build_dir(&paths)?;

    let global = vars::global_scope(&paths.content, &config.extensions.variables)?;
    diagnostics.debug(|| output::format_global_scope(&global));

    let fragments =
        common::render_common_fragments(&paths.common_templates, &global, &mut engine, diagnostics)?;
    let shared = inject_common(&global, &fragments);

    let posts = render_posts(&paths, &shared, &engine, &locator, diagnostics)?;
    let about = render_about(&paths, &shared, &engine, &locator, diagnostics)?;
    let home = render_home(&paths, &shared, &posts, &engine)?;

    Ok(BuildReport {
        assets_copied,
        fragments: fragments.into_keys().collect(),
        posts,
        about,
        home,
    })
}

/// Create the build root, copying the assets directory into it if there is
/// one. Returns whether assets were copied.
///
/// Parents are created as needed, the build root itself must be new.
pub fn prepare_build_dir(paths: &SitePaths) -> Result<bool, BuildError> {
    if let Some(parent) = paths.build.parent() {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    match fs::create_dir(&paths.build) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(BuildError::BuildDirExists(paths.build.clone()));
        }
        Err(e) => return Err(io_error(&paths.build)(e)),
    }

    if !paths.assets.is_dir() {
        return Ok(false);
    }
    copy_dir_recursive(&paths.assets, &paths.build.join(ASSETS_DIR))?;
    Ok(true)
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), BuildError> {
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(io_error(&target))?;
        } else {
            fs::copy(entry.path(), &target).map_err(io_error(&target))?;
        }
    }
    Ok(())
}

/// Item directories under `posts_root`, sorted by slug.
///
/// Hidden entries and plain files are skipped. A directory whose name is not
/// valid UTF-8 cannot be a slug and fails the build.
pub fn list_post_dirs(posts_root: &Path) -> Result<Vec<(String, PathBuf)>, BuildError> {
    if !posts_root.is_dir() {
        return Err(BuildError::MissingInput(posts_root.to_path_buf()));
    }
    let mut dirs = Vec::new();
    for entry in fs::read_dir(posts_root).map_err(io_error(posts_root))? {
        let path = entry.map_err(io_error(posts_root))?.path();
        let Some(name) = path.file_name() else {
            continue;
        };
        if name.as_encoded_bytes().starts_with(b".") || !path.is_dir() {
            continue;
        }
        let Some(slug) = name.to_str().map(str::to_string) else {
            return Err(BuildError::InvalidSlug(path));
        };
        dirs.push((slug, path));
    }
    dirs.sort();
    Ok(dirs)
}

fn render_posts(
    paths: &SitePaths,
    shared: &VariableTree,
    engine: &TemplateEngine,
    locator: &Locator,
    diagnostics: &Diagnostics,
) -> Result<Vec<RenderedItem>, BuildError> {
    let items = list_post_dirs(&paths.posts)?
        .into_iter()
        .map(|(slug, dir)| page::discover(PageKind::Post, &slug, &dir, locator))
        .collect::<Result<Vec<ContentItem>, _>>()?;

    let templates = engine.load_required_dir(&paths.post_templates)?;
    let output_base = paths.build.join("posts");
    fs::create_dir_all(&output_base).map_err(io_error(&output_base))?;

    let mut rendered = Vec::with_capacity(items.len());
    for item in &items {
        rendered.push(page::render_content_item(
            item,
            shared,
            &templates,
            &output_base,
            engine,
            diagnostics,
        )?);
    }
    Ok(rendered)
}

fn render_about(
    paths: &SitePaths,
    shared: &VariableTree,
    engine: &TemplateEngine,
    locator: &Locator,
    diagnostics: &Diagnostics,
) -> Result<RenderedItem, BuildError> {
    if !paths.about.is_dir() {
        return Err(BuildError::MissingInput(paths.about.clone()));
    }
    let item = page::discover(PageKind::About, "about", &paths.about, locator)?;
    let templates = engine.load_required_dir(&paths.about_templates)?;
    Ok(page::render_content_item(
        &item,
        shared,
        &templates,
        &paths.build,
        engine,
        diagnostics,
    )?)
}

/// Scope of the homepage: the shared scope plus `home.posts`, every post's
/// variables in render order.
pub fn home_scope(shared: &VariableTree, posts: &[RenderedItem]) -> VariableTree {
    let list = posts.iter().map(|p| Value::Tree(p.page.clone())).collect();
    shared
        .clone()
        .with(HOME_KEY, VariableTree::new().with("posts", Value::List(list)))
}

/// Render `templates/home/*` into the build root, if that directory exists.
///
/// Every template is rendered before the first file is written.
fn render_home(
    paths: &SitePaths,
    shared: &VariableTree,
    posts: &[RenderedItem],
    engine: &TemplateEngine,
) -> Result<Vec<PathBuf>, BuildError> {
    if !paths.home_templates.is_dir() {
        return Ok(Vec::new());
    }
    let templates = engine.load_dir(&paths.home_templates)?;
    let scope = home_scope(shared, posts);

    let mut pages = Vec::with_capacity(templates.len());
    for template in &templates {
        let target = paths.build.join(&template.output_name);
        if target.exists() {
            return Err(BuildError::OutputConflict(target));
        }
        pages.push((target, engine.render(template, &scope)?));
    }

    let mut written = Vec::with_capacity(pages.len());
    for (target, html) in pages {
        fs::write(&target, html).map_err(io_error(&target))?;
        written.push(target);
    }
    Ok(written)
}
