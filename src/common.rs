//! Shared fragments (header, footer, navigation...).
//!
//! Every template in `templates/common/` is rendered exactly once per build,
//! against the global scope only, before any page is rendered. The rendered
//! HTML, not the template source, is then exposed to every page under the
//! reserved `common` key:
//!
//! ```text
//! templates/common/header.html.mustache  →  {{{common.header}}}  or  {{> header}}
//! templates/common/footer.mustache       →  {{{common.footer}}}  or  {{> footer}}
//! ```
//!
//! `common.header` is the fragment rendered once against the global scope.
//! `{{> header}}` renders the same template again in the including page's
//! scope, as a mustache partial.

use crate::output::{self, Diagnostics};
use crate::template::{self, TemplateEngine, TemplateError, TemplateFile};
use crate::vars::VariableTree;
use std::collections::BTreeMap;
use std::path::Path;

/// Reserved top-level key holding the rendered fragments.
pub const COMMON_KEY: &str = "common";

/// Rendered fragments keyed by fragment name.
pub type Fragments = BTreeMap<String, String>;

/// Render every fragment template in `fragment_dir` against `global`.
///
/// Each fragment template is also registered with `engine` as a partial
/// under its fragment name, so pages can include it with `{{> header}}`
/// and render it in their own scope. A missing directory means a site
/// without fragments. Two templates that map to the same fragment name are
/// rejected.
pub fn render_common_fragments(
    fragment_dir: &Path,
    global: &VariableTree,
    engine: &mut TemplateEngine,
    diagnostics: &Diagnostics,
) -> Result<Fragments, TemplateError> {
    if !fragment_dir.exists() {
        return Ok(Fragments::new());
    }

    let mut named: BTreeMap<String, TemplateFile> = BTreeMap::new();
    for template in engine.load_dir(fragment_dir)? {
        let name = template::fragment_name(&template)?;
        if let Some(first) = named.get(&name) {
            return Err(TemplateError::DuplicateFragment {
                name,
                first: first.path.clone(),
                second: template.path,
            });
        }
        engine.register_partial(&name, &template)?;
        named.insert(name, template);
    }

    // Partials are all registered before the first fragment renders
    let mut fragments = Fragments::new();
    for (name, template) in &named {
        fragments.insert(name.clone(), engine.render(template, global)?);
    }

    diagnostics.debug(|| output::format_common_fragments(&fragments));
    Ok(fragments)
}

/// A copy of `scope` with `fragments` stored under [`COMMON_KEY`].
pub fn inject_common(scope: &VariableTree, fragments: &Fragments) -> VariableTree {
    let common: VariableTree = fragments
        .iter()
        .map(|(name, html)| (name.as_str(), html.as_str()))
        .collect();
    scope.clone().with(COMMON_KEY, common)
}
