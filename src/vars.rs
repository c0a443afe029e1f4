//! Layered template variables.
//!
//! Every template renders against a [`VariableTree`] assembled from four
//! scopes, each overriding the previous one:
//!
//! ```text
//! 1. global      built-ins (url-home, url-about) + global.yml
//! 2. common      rendered fragments under `common.*`
//! 3. defaults    page-type keys such as `post.slug`, `post.url`
//! 4. item        the item's own YAML file, then `content`
//! ```
//!
//! Merging is shallow and right-biased: a key present in the overlay
//! replaces the base value wholesale, nested trees included. Merges always
//! produce a new tree, so one base scope can be shared by every page.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Built-in global variables. The global file may override them, but the
/// keys are always present.
pub const BUILTIN_VARS: &[(&str, &str)] = &[("url-home", "/"), ("url-about", "/about/")];

/// File stem of the global variable file in the content root.
pub const GLOBAL_VARS_STEM: &str = "global";

#[derive(Error, Debug)]
pub enum VarsError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid YAML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Variable file {path} must contain a mapping at the top level, found {found}")]
    NotAMapping { path: PathBuf, found: &'static str },
    #[error("Variable file {path} uses a non-scalar mapping key")]
    InvalidKey { path: PathBuf },
}

/// A single template variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Flag(bool),
    Tree(VariableTree),
    List(Vec<Value>),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<VariableTree> for Value {
    fn from(tree: VariableTree) -> Self {
        Value::Tree(tree)
    }
}

/// A scope: string keys mapped to [`Value`]s.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct VariableTree(BTreeMap<String, Value>);

impl VariableTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a string value.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(Value::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Look up a nested tree.
    pub fn tree(&self, key: &str) -> Option<&VariableTree> {
        match self.0.get(key) {
            Some(Value::Tree(t)) => Some(t),
            _ => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Set `key`, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for VariableTree {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Overlay `overlay` on a copy of `base`.
///
/// Keys only in `base` keep their value, every key of `overlay` wins.
/// Neither input is modified.
pub fn merge(base: &VariableTree, overlay: &VariableTree) -> VariableTree {
    let mut merged = base.clone();
    for (key, value) in &overlay.0 {
        merged.0.insert(key.clone(), value.clone());
    }
    merged
}

/// The built-in global variables as a tree.
pub fn builtin_vars() -> VariableTree {
    BUILTIN_VARS.iter().copied().collect()
}

/// Parse the text of a YAML variable file.
///
/// `path` is only used for error reporting. An empty document is an empty
/// tree; any other non-mapping top level is rejected.
pub fn parse_vars(text: &str, path: &Path) -> Result<VariableTree, VarsError> {
    let doc: serde_yaml::Value = serde_yaml::from_str(text).map_err(|source| VarsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    match untag(doc) {
        serde_yaml::Value::Null => Ok(VariableTree::new()),
        serde_yaml::Value::Mapping(map) => mapping_to_tree(map, path),
        other => Err(VarsError::NotAMapping {
            path: path.to_path_buf(),
            found: yaml_kind(&other),
        }),
    }
}

/// Read and parse a YAML variable file.
pub fn load_yaml(path: &Path) -> Result<VariableTree, VarsError> {
    let text = fs::read_to_string(path).map_err(|source| VarsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_vars(&text, path)
}

/// Find the global variable file (`global.<ext>`) in the content root.
///
/// Extensions are tried in order; the first existing file wins.
pub fn find_global_file(content_root: &Path, extensions: &[String]) -> Option<PathBuf> {
    extensions
        .iter()
        .map(|ext| content_root.join(format!("{GLOBAL_VARS_STEM}.{ext}")))
        .find(|p| p.is_file())
}

/// Build the global scope: built-ins, then the global file on top.
pub fn global_scope(content_root: &Path, extensions: &[String]) -> Result<VariableTree, VarsError> {
    let builtins = builtin_vars();
    match find_global_file(content_root, extensions) {
        Some(path) => Ok(merge(&builtins, &load_yaml(&path)?)),
        None => Ok(builtins),
    }
}

fn untag(value: serde_yaml::Value) -> serde_yaml::Value {
    match value {
        serde_yaml::Value::Tagged(tagged) => untag(tagged.value),
        other => other,
    }
}

fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "a boolean",
        serde_yaml::Value::Number(_) => "a number",
        serde_yaml::Value::String(_) => "a string",
        serde_yaml::Value::Sequence(_) => "a sequence",
        serde_yaml::Value::Mapping(_) => "a mapping",
        serde_yaml::Value::Tagged(_) => "a tagged value",
    }
}

fn mapping_to_tree(map: serde_yaml::Mapping, path: &Path) -> Result<VariableTree, VarsError> {
    let mut tree = VariableTree::new();
    for (key, value) in map {
        let key = match untag(key) {
            serde_yaml::Value::String(s) => s,
            serde_yaml::Value::Number(n) => n.to_string(),
            serde_yaml::Value::Bool(b) => b.to_string(),
            _ => {
                return Err(VarsError::InvalidKey {
                    path: path.to_path_buf(),
                });
            }
        };
        // null removes nothing and sets nothing
        if let Some(value) = convert(value, path)? {
            tree.insert(key, value);
        }
    }
    Ok(tree)
}

fn convert(value: serde_yaml::Value, path: &Path) -> Result<Option<Value>, VarsError> {
    Ok(match value {
        serde_yaml::Value::Null => None,
        serde_yaml::Value::Bool(b) => Some(Value::Flag(b)),
        serde_yaml::Value::Number(n) => Some(Value::Text(n.to_string())),
        serde_yaml::Value::String(s) => Some(Value::Text(s)),
        serde_yaml::Value::Sequence(items) => {
            let mut list = Vec::with_capacity(items.len());
            for item in items {
                if let Some(v) = convert(item, path)? {
                    list.push(v);
                }
            }
            Some(Value::List(list))
        }
        serde_yaml::Value::Mapping(map) => Some(Value::Tree(mapping_to_tree(map, path)?)),
        serde_yaml::Value::Tagged(tagged) => convert(tagged.value, path)?,
    })
}
