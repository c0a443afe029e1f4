//! Content discovery for a single item directory.
//!
//! An item directory (`posts/<slug>/` or `about/`) holds exactly one content
//! file and at most one variable file:
//!
//! ```text
//! posts/hello/
//! ├── hello.md      # required, exactly one
//! ├── hello.yml     # optional
//! └── photo.jpg     # anything else is ignored
//! ```
//!
//! Only immediate entries are considered; hidden files and subdirectories are
//! skipped. Entries are matched in sorted order, so locating the same
//! directory twice always returns the same paths.

use crate::config::{ExtensionsConfig, VariableFilePolicy};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Content not found for \"{}\". Please create the file and try again.", .0.display())]
    MissingContentFile(PathBuf),
    #[error("Several content files in \"{}\": {}", .dir.display(), list_names(.files))]
    AmbiguousContentFile { dir: PathBuf, files: Vec<PathBuf> },
    #[error("Several variable files in \"{}\": {}", .dir.display(), list_names(.files))]
    AmbiguousVariableFile { dir: PathBuf, files: Vec<PathBuf> },
}

/// The files that make up one content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFiles {
    pub variables: Option<PathBuf>,
    pub content: PathBuf,
}

/// Extension-based matching rules for content and variable files.
#[derive(Debug, Clone)]
pub struct Locator {
    content_exts: Vec<String>,
    variable_exts: Vec<String>,
    policy: VariableFilePolicy,
}

impl Locator {
    pub fn new(extensions: &ExtensionsConfig, policy: VariableFilePolicy) -> Self {
        Self {
            content_exts: extensions.content.clone(),
            variable_exts: extensions.variables.clone(),
            policy,
        }
    }

    /// Find the content file and the optional variable file of `dir`.
    pub fn locate(&self, dir: &Path) -> Result<ContentFiles, LocateError> {
        let files = list_files(dir)?;

        let mut content: Vec<PathBuf> = files
            .iter()
            .filter(|p| has_extension(p, &self.content_exts))
            .cloned()
            .collect();
        let variables: Vec<PathBuf> = files
            .iter()
            .filter(|p| has_extension(p, &self.variable_exts))
            .cloned()
            .collect();

        let content = match content.len() {
            0 => return Err(LocateError::MissingContentFile(dir.to_path_buf())),
            1 => content.remove(0),
            _ => {
                return Err(LocateError::AmbiguousContentFile {
                    dir: dir.to_path_buf(),
                    files: content,
                });
            }
        };

        if variables.len() > 1 && self.policy == VariableFilePolicy::Strict {
            return Err(LocateError::AmbiguousVariableFile {
                dir: dir.to_path_buf(),
                files: variables,
            });
        }

        Ok(ContentFiles {
            variables: variables.into_iter().next(),
            content,
        })
    }
}

impl Default for Locator {
    fn default() -> Self {
        Self::new(&ExtensionsConfig::default(), VariableFilePolicy::default())
    }
}

/// Visible regular files directly inside `dir`, sorted by path.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>, LocateError> {
    let io_err = |source: std::io::Error| LocateError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let hidden = path
            .file_name()
            .map(|n| n.to_string_lossy().starts_with('.'))
            .unwrap_or(true);
        if !hidden && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .map(|e| {
            let e = e.to_string_lossy();
            extensions.iter().any(|ext| e.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

fn list_names(files: &[PathBuf]) -> String {
    files
        .iter()
        .map(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        })
        .collect::<Vec<_>>()
        .join(", ")
}
