//! Template loading and rendering.
//!
//! Templates are logic-less mustache files rendered with
//! [Handlebars](https://docs.rs/handlebars), set up to follow mustache
//! rules:
//!
//! - `{{post.title}}`: HTML-escaped substitution (`& < > "` only)
//! - `{{{post.content}}}`: raw substitution (rendered Markdown, fragments)
//! - `{{#post}}...{{/post}}`: section. A list repeats the block per item,
//!   a tree becomes the lookup context, a falsy value skips it
//! - `{{^draft}}...{{/draft}}`: inverted section
//! - `{{.}}`: the current item inside a section
//! - `{{> header}}`: a common fragment's template, rendered in place
//!
//! Names not found in a section's context are looked up in the enclosing
//! ones, up to the root. Handlebars helpers such as `{{#if}}` and
//! `{{#each}}` keep working, which makes their names unusable as section
//! names.
//!
//! A template file's output name is its filename minus the template
//! extension (`index.html.mustache` → `index.html`). Fragment names go one
//! step further and also drop a trailing `.html`/`.htm`, so both
//! `header.html.mustache` and `header.mustache` are referenced as
//! `common.header`.

use crate::vars::VariableTree;
use handlebars::{
    BlockContext, Context, Handlebars, Helper, HelperDef, HelperResult, JsonTruthy,
    Output, RenderContext, RenderError, Renderable,
};
use serde_json::Value as Json;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Output extensions dropped when deriving a fragment name.
const FRAGMENT_OUTPUT_EXTENSIONS: &[&str] = &["html", "htm"];

/// Handlebars hook called for a block whose name is not a helper.
const SECTION_HOOK: &str = "blockHelperMissing";

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to render template {}: {source}", .path.display())]
    Render {
        path: PathBuf,
        source: Box<handlebars::RenderError>,
    },
    #[error("Invalid partial template {}: {source}", .path.display())]
    Partial {
        path: PathBuf,
        source: Box<handlebars::TemplateError>,
    },
    #[error("Template {} does not yield a usable fragment name (got \"{name}\")", .path.display())]
    InvalidFragmentName { path: PathBuf, name: String },
    #[error("Fragments {} and {} both define \"{name}\"", .first.display(), .second.display())]
    DuplicateFragment {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
    #[error("No templates found in {}", .0.display())]
    NoTemplates(PathBuf),
}

/// A template file read from disk.
#[derive(Debug, Clone)]
pub struct TemplateFile {
    pub path: PathBuf,
    /// Filename with the template extension stripped.
    pub output_name: String,
    pub source: String,
}

/// Renders template sources against a scope.
pub struct TemplateEngine {
    registry: Handlebars<'static>,
    extension: String,
}

impl TemplateEngine {
    /// `extension` is the template file extension, without the dot.
    pub fn new(extension: &str, strict: bool) -> Self {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(strict);
        registry.set_recursive_lookup(true);
        registry.register_escape_fn(escape_html);
        registry.register_helper(SECTION_HOOK, Box::new(MustacheSection));
        Self {
            registry,
            extension: extension.to_string(),
        }
    }

    /// Render a template against `scope`.
    pub fn render(&self, template: &TemplateFile, scope: &VariableTree) -> Result<String, TemplateError> {
        self.registry
            .render_template(&to_handlebars(&template.source), scope)
            .map_err(|e| TemplateError::Render {
                path: template.path.clone(),
                source: Box::new(e),
            })
    }

    /// Make `template` available to every later render as `{{> name}}`.
    pub fn register_partial(&mut self, name: &str, template: &TemplateFile) -> Result<(), TemplateError> {
        self.registry
            .register_partial(name, to_handlebars(&template.source))
            .map_err(|e| TemplateError::Partial {
                path: template.path.clone(),
                source: Box::new(e),
            })
    }

    /// Read every template file directly inside `dir`, sorted by filename.
    ///
    /// Hidden files and files without the template extension are skipped.
    pub fn load_dir(&self, dir: &Path) -> Result<Vec<TemplateFile>, TemplateError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| TemplateError::Io { path, source }
        };

        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err(dir))? {
            let path = entry.map_err(io_err(dir))?.path();
            if path.is_file() && self.output_name(&path).is_some() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut templates = Vec::with_capacity(paths.len());
        for path in paths {
            let source = fs::read_to_string(&path).map_err(io_err(&path))?;
            let output_name = self.output_name(&path).unwrap_or_default();
            templates.push(TemplateFile {
                path,
                output_name,
                source,
            });
        }
        Ok(templates)
    }

    /// Like [`load_dir`](Self::load_dir), but an empty result is an error.
    pub fn load_required_dir(&self, dir: &Path) -> Result<Vec<TemplateFile>, TemplateError> {
        let templates = self.load_dir(dir)?;
        if templates.is_empty() {
            return Err(TemplateError::NoTemplates(dir.to_path_buf()));
        }
        Ok(templates)
    }

    /// Output filename for a template path, `None` if it is not a visible
    /// template file.
    ///
    /// - `index.html.mustache` → `Some("index.html")`
    /// - `feed.xml.mustache` → `Some("feed.xml")`
    /// - `notes.txt` → `None`
    /// - `.index.html.mustache` → `None`
    pub fn output_name(&self, path: &Path) -> Option<String> {
        let file_name = path.file_name()?.to_str()?;
        if file_name.starts_with('.') {
            return None;
        }
        let stem = file_name
            .strip_suffix(self.extension.as_str())?
            .strip_suffix('.')?;
        if stem.is_empty() {
            return None;
        }
        Some(stem.to_string())
    }
}

/// Registration name of a common fragment.
///
/// Strips a trailing output extension from the template's output name. The
/// result must be non-empty and free of dots, since it becomes a key under
/// `common` and a dot would read as a nested lookup.
///
/// - `header.html` → `header`
/// - `site-nav` → `site-nav`
/// - `footer.v2.html` → error
pub fn fragment_name(template: &TemplateFile) -> Result<String, TemplateError> {
    let name = FRAGMENT_OUTPUT_EXTENSIONS
        .iter()
        .find_map(|ext| {
            template
                .output_name
                .strip_suffix(ext)
                .and_then(|s| s.strip_suffix('.'))
        })
        .unwrap_or(template.output_name.as_str());

    if name.is_empty() || name.contains('.') {
        return Err(TemplateError::InvalidFragmentName {
            path: template.path.clone(),
            name: name.to_string(),
        });
    }
    Ok(name.to_string())
}

/// Mustache section semantics for `{{#name}}...{{/name}}` blocks.
///
/// - list: the block renders once per item, with the item as context
/// - tree or other truthy value: the block renders once with it as context
/// - `true`: the block renders once, context unchanged
/// - falsy (missing, `false`, empty string or list): the inverse renders
struct MustacheSection;

impl HelperDef for MustacheSection {
    fn call<'reg: 'rc, 'rc>(
        &self,
        h: &Helper<'rc>,
        r: &'reg Handlebars<'reg>,
        ctx: &'rc Context,
        rc: &mut RenderContext<'reg, 'rc>,
        out: &mut dyn Output,
    ) -> HelperResult {
        let value = rc.evaluate(ctx, h.name())?;
        if value.is_missing() && r.strict_mode() {
            return Err(RenderError::strict_error(Some(&h.name().to_string())));
        }
        let json = value.as_json();
        let path = value.context_path();

        if !json.is_truthy(false) {
            if let Some(inverse) = h.inverse() {
                inverse.render(r, ctx, rc, out)?;
            }
            return Ok(());
        }
        let Some(block) = h.template() else {
            return Ok(());
        };

        match json {
            Json::Bool(_) => block.render(r, ctx, rc, out)?,
            Json::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    rc.push_block(section_context(path, Some(i), item));
                    let rendered = block.render(r, ctx, rc, out);
                    rc.pop_block();
                    rendered?;
                }
            }
            other => {
                rc.push_block(section_context(path, None, other));
                let rendered = block.render(r, ctx, rc, out);
                rc.pop_block();
                rendered?;
            }
        }
        Ok(())
    }
}

/// Block context pointing at a section value, or at one item of it.
fn section_context<'rc>(path: Option<&Vec<String>>, index: Option<usize>, value: &Json) -> BlockContext<'rc> {
    let mut block = BlockContext::new();
    match path {
        Some(path) => {
            let mut base = path.clone();
            if let Some(i) = index {
                base.push(i.to_string());
            }
            *block.base_path_mut() = base;
        }
        None => block.set_base_value(value.clone()),
    }
    block
}

/// Mustache escaping: `&`, `<`, `>` and `"`.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}

/// Rewrite the mustache-only tags Handlebars cannot parse.
///
/// - `{{^name}}` → `{{#name}}{{else}}`, an empty section with an inverse
/// - `{{.}}` / `{{{.}}}` → `{{this}}` / `{{{this}}}`
fn to_handlebars(source: &str) -> String {
    let source = source.replace("{{{.}}}", "{{{this}}}").replace("{{.}}", "{{this}}");

    let mut out = String::with_capacity(source.len());
    let mut rest = source.as_str();
    while let Some(start) = rest.find("{{^") {
        let after = &rest[start + 3..];
        let Some(end) = after.find("}}") else {
            break;
        };
        out.push_str(&rest[..start]);
        let name = after[..end].trim();
        if name.is_empty() {
            out.push_str("{{^}}");
        } else {
            out.push_str("{{#");
            out.push_str(name);
            out.push_str("}}{{else}}");
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}
