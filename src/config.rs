//! Build configuration module.
//!
//! Handles loading, validating, and merging the optional `site-gen.toml`
//! file in the project root. Stock defaults reproduce the classic layout,
//! so a project that follows it needs no config file at all.
//!
//! ## Project Layout
//!
//! ```text
//! project/
//! ├── site-gen.toml              # Build config (optional)
//! ├── site-src/                  # Content root
//! │   ├── global.yml             # Global variables (optional)
//! │   ├── posts/
//! │   │   └── hello/
//! │   │       ├── hello.md       # Post body (exactly one)
//! │   │       └── hello.yml      # Post variables (optional)
//! │   └── about/
//! │       ├── about.md
//! │       └── about.yml
//! ├── generator/                 # Generator root
//! │   ├── assets/                # Copied verbatim to <build>/assets
//! │   └── templates/
//! │       ├── common/            # Fragments rendered once, exposed as common.*
//! │       ├── posts/             # Rendered once per post
//! │       ├── about/             # Rendered for the about page
//! │       └── home/              # Rendered at the build root (optional)
//! └── tmp-site-build/            # Build output (must not exist)
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! content_root = "site-src"
//! generator_root = "generator"
//! build_dir = "tmp-site-build"
//!
//! [extensions]
//! content = ["md"]              # Content body files (Markdown)
//! variables = ["yml", "yaml"]   # Variable files (YAML)
//! template = "mustache"         # Template files
//!
//! [variables]
//! multiple_files = "first-match" # or "strict": several variable files is an error
//!
//! [templates]
//! strict = false                # Fail on references to missing variables
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the optional config file in the project root.
pub const CONFIG_FILE: &str = "site-gen.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Build configuration loaded from `site-gen.toml`.
///
/// Paths are relative to the project root the build runs in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory holding `global.yml`, `posts/` and `about/`.
    pub content_root: String,
    /// Directory holding `templates/` and `assets/`.
    pub generator_root: String,
    /// Build output directory. Must not exist when a build starts.
    pub build_dir: String,
    pub extensions: ExtensionsConfig,
    pub variables: VariablesConfig,
    pub templates: TemplatesConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_root: "site-src".to_string(),
            generator_root: "generator".to_string(),
            build_dir: "tmp-site-build".to_string(),
            extensions: ExtensionsConfig::default(),
            variables: VariablesConfig::default(),
            templates: TemplatesConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ext = &self.extensions;
        if ext.content.is_empty() {
            return Err(ConfigError::Validation(
                "extensions.content must not be empty".into(),
            ));
        }
        if ext.variables.is_empty() {
            return Err(ConfigError::Validation(
                "extensions.variables must not be empty".into(),
            ));
        }
        let all = ext
            .content
            .iter()
            .chain(&ext.variables)
            .chain(std::iter::once(&ext.template));
        for e in all {
            if e.is_empty() || e.starts_with('.') {
                return Err(ConfigError::Validation(format!(
                    "extension \"{e}\" must be non-empty and given without a leading dot"
                )));
            }
        }
        if ext.content.iter().any(|c| ext.variables.contains(c)) {
            return Err(ConfigError::Validation(
                "extensions.content and extensions.variables must not overlap".into(),
            ));
        }
        if self.build_dir.is_empty() {
            return Err(ConfigError::Validation("build_dir must not be empty".into()));
        }
        if self.build_dir == self.content_root || self.build_dir == self.generator_root {
            return Err(ConfigError::Validation(
                "build_dir must differ from content_root and generator_root".into(),
            ));
        }
        Ok(())
    }

    /// Resolve every input and output location against `root`.
    pub fn paths(&self, root: &Path) -> SitePaths {
        let content = root.join(&self.content_root);
        let generator = root.join(&self.generator_root);
        let templates = generator.join("templates");
        SitePaths {
            posts: content.join("posts"),
            about: content.join("about"),
            content,
            assets: generator.join("assets"),
            common_templates: templates.join("common"),
            post_templates: templates.join("posts"),
            about_templates: templates.join("about"),
            home_templates: templates.join("home"),
            build: root.join(&self.build_dir),
        }
    }
}

/// File extensions (without the leading dot) recognised by the build.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtensionsConfig {
    pub content: Vec<String>,
    pub variables: Vec<String>,
    pub template: String,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            content: vec!["md".to_string()],
            variables: vec!["yml".to_string(), "yaml".to_string()],
            template: "mustache".to_string(),
        }
    }
}

/// What to do when a content directory holds more than one variable file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VariableFilePolicy {
    /// The first file in sorted order is used, the rest are ignored.
    #[default]
    FirstMatch,
    /// Several variable files is an error, same as several content files.
    Strict,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VariablesConfig {
    pub multiple_files: VariableFilePolicy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TemplatesConfig {
    /// Render errors on references to undefined variables instead of
    /// substituting an empty string.
    pub strict: bool,
}

/// Every location a build reads from or writes to, resolved against the
/// project root.
#[derive(Debug, Clone)]
pub struct SitePaths {
    pub content: PathBuf,
    pub posts: PathBuf,
    pub about: PathBuf,
    pub assets: PathBuf,
    pub common_templates: PathBuf,
    pub post_templates: PathBuf,
    pub about_templates: PathBuf,
    pub home_templates: PathBuf,
    pub build: PathBuf,
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// [`SiteConfig::default`] as a TOML table, the base every `site-gen.toml`
/// is layered over.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(SiteConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults: {e}")))
}

/// Lay a user table over the defaults.
///
/// An `[extensions]` section that sets only `template` keeps the stock
/// `content` and `variables` lists, because sections merge per key at every
/// depth. Scalars and arrays from the user file replace the default outright.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse `<root>/site-gen.toml` without checking its keys.
///
/// A project without the file builds with stock settings, so absence is
/// `Ok(None)`. Syntax errors surface here.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Settings for the project at `root`.
///
/// Unknown keys in `site-gen.toml` fail deserialization
/// (`deny_unknown_fields`) instead of being ignored. Path and extension
/// rules are then checked by [`SiteConfig::validate`].
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(base, overlay),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_classic_layout() {
        let config = SiteConfig::default();
        assert_eq!(config.content_root, "site-src");
        assert_eq!(config.generator_root, "generator");
        assert_eq!(config.build_dir, "tmp-site-build");
        assert_eq!(config.extensions.template, "mustache");
        assert_eq!(config.variables.multiple_files, VariableFilePolicy::FirstMatch);
        assert!(!config.templates.strict);
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.content_root, "site-src");
        assert_eq!(config.extensions.variables, vec!["yml", "yaml"]);
    }

    #[test]
    fn load_config_merges_partial_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            r#"
build_dir = "out"

[variables]
multiple_files = "strict"
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.build_dir, "out");
        assert_eq!(config.variables.multiple_files, VariableFilePolicy::Strict);
        // Untouched sections keep their defaults
        assert_eq!(config.content_root, "site-src");
        assert_eq!(config.extensions.content, vec!["md"]);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "output_dir = \"x\"\n").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn validation_rejects_dotted_extension() {
        let mut config = SiteConfig::default();
        config.extensions.template = ".mustache".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validation_rejects_overlapping_extensions() {
        let mut config = SiteConfig::default();
        config.extensions.variables.push("md".to_string());
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validation_rejects_build_dir_over_content() {
        let config = SiteConfig {
            build_dir: "site-src".to_string(),
            ..SiteConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn paths_resolve_against_root() {
        let config = SiteConfig::default();
        let paths = config.paths(Path::new("/project"));
        assert_eq!(paths.posts, Path::new("/project/site-src/posts"));
        assert_eq!(paths.about, Path::new("/project/site-src/about"));
        assert_eq!(paths.assets, Path::new("/project/generator/assets"));
        assert_eq!(
            paths.common_templates,
            Path::new("/project/generator/templates/common")
        );
        assert_eq!(paths.build, Path::new("/project/tmp-site-build"));
    }

    #[test]
    fn merge_toml_overrides_nested_keys_only() {
        let base: toml::Value = toml::from_str(
            r#"
[extensions]
template = "mustache"
content = ["md"]
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[extensions]
template = "hbs"
"#,
        )
        .unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["extensions"]["template"].as_str(), Some("hbs"));
        assert_eq!(
            merged["extensions"]["content"].as_array().map(|a| a.len()),
            Some(1)
        );
    }
}
