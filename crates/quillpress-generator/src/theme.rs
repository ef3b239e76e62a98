//! Theme loading and template execution.
//!
//! Every template file in the theme is compiled into its own [`Tera`] group
//! holding the template and everything it transitively includes, extends or
//! imports. Groups are looked up by the template's path relative to the
//! theme root (`partial/header.html`).

use std::{
    collections::{HashMap, HashSet},
    fs,
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tera::{Context, Tera, Value};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Theme and template errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// No template registered under this name.
    #[error("template '{0}' is missing")]
    Missing(String),

    /// A template references a file that does not exist.
    #[error("template '{template}' references missing template '{include}'")]
    MissingInclude { template: String, include: String },

    /// Templates reference each other in a loop.
    #[error("template include cycle: {}", chain.join(" -> "))]
    IncludeCycle { chain: Vec<String> },

    /// Template syntax error.
    #[error("failed to compile template '{name}': {source}")]
    Compile {
        name: String,
        #[source]
        source: tera::Error,
    },

    /// Error raised while executing a template.
    #[error("failed to render template '{name}': {source}")]
    Render {
        name: String,
        #[source]
        source: tera::Error,
    },

    /// Reading the theme failed.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Include pattern failed to build.
    #[error("invalid include pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result type for theme operations.
pub type Result<T> = std::result::Result<T, TemplateError>;

/// Theme settings read from the theme's own config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(default = "default_name")]
    pub name: String,

    /// Extensions of files treated as templates.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Template rendered to `/index.html`.
    #[serde(default = "default_index_template")]
    pub index_template: String,

    /// Template rendered to `/404.html`.
    #[serde(default = "default_not_found_template")]
    pub not_found_template: String,

    /// Subdirectories copied verbatim to the output root.
    #[serde(default = "default_static_dirs")]
    pub static_dirs: Vec<String>,

    #[serde(default)]
    pub enable_dark_mode: bool,

    #[serde(default)]
    pub show_version: bool,
}

fn default_name() -> String {
    "theme".to_string()
}

fn default_extensions() -> Vec<String> {
    vec![".html".to_string()]
}

fn default_index_template() -> String {
    "post-list.html".to_string()
}

fn default_not_found_template() -> String {
    "404.html".to_string()
}

fn default_static_dirs() -> Vec<String> {
    vec!["static".to_string()]
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            extensions: default_extensions(),
            index_template: default_index_template(),
            not_found_template: default_not_found_template(),
            static_dirs: default_static_dirs(),
            enable_dark_mode: false,
            show_version: false,
        }
    }
}

impl ThemeConfig {
    /// Read the theme config, falling back to defaults when it is absent or
    /// cannot be parsed.
    pub fn load(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no theme config, using defaults");
                return Self::default();
            }
        };

        match toml::from_str(&text) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid theme config, using defaults");
                Self::default()
            }
        }
    }

    /// Whether a file name has a template extension.
    pub fn is_template(&self, name: &str) -> bool {
        self.extensions.iter().any(|ext| name.ends_with(ext.as_str()))
    }
}

/// Emits markup without escaping, from either a string or a byte array.
///
/// Registered as both the `html` filter and the `html(value=...)` function.
struct RawHtml;

impl RawHtml {
    fn to_markup(value: &Value) -> tera::Result<Value> {
        match value {
            Value::String(_) => Ok(value.clone()),
            Value::Null => Ok(Value::String(String::new())),
            Value::Array(items) => {
                let bytes = items
                    .iter()
                    .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
                    .collect::<Option<Vec<u8>>>()
                    .ok_or_else(|| tera::Error::msg("html expects a string or a byte array"))?;
                Ok(Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            }
            _ => Err(tera::Error::msg("html expects a string or a byte array")),
        }
    }
}

impl tera::Filter for RawHtml {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        Self::to_markup(value)
    }

    fn is_safe(&self) -> bool {
        true
    }
}

impl tera::Function for RawHtml {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let value = args
            .get("value")
            .ok_or_else(|| tera::Error::msg("html function requires a 'value' argument"))?;
        Self::to_markup(value)
    }

    fn is_safe(&self) -> bool {
        true
    }
}

/// Resolves template references depth first over an arena of sources.
///
/// `sources` holds fully resolved templates; `stack` holds the chain being
/// resolved, so a reference back into it is a cycle.
struct IncludeResolver<'a> {
    root: &'a Path,
    config: &'a ThemeConfig,
    pattern: Regex,
    sources: HashMap<String, String>,
    deps: HashMap<String, Vec<String>>,
    stack: Vec<String>,
}

impl<'a> IncludeResolver<'a> {
    fn new(root: &'a Path, config: &'a ThemeConfig) -> Result<Self> {
        Ok(Self {
            root,
            config,
            pattern: Regex::new(
                r#"\{%-?\s*(?:include|extends|import)\s+["']([^"']+)["']"#,
            )?,
            sources: HashMap::new(),
            deps: HashMap::new(),
            stack: Vec::new(),
        })
    }

    fn resolve(&mut self, name: &str, referrer: Option<&str>) -> Result<()> {
        if self.sources.contains_key(name) {
            return Ok(());
        }
        if let Some(pos) = self.stack.iter().position(|n| n == name) {
            let mut chain = self.stack[pos..].to_vec();
            chain.push(name.to_string());
            return Err(TemplateError::IncludeCycle { chain });
        }

        let path = self.root.join(name);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(source) => {
                return Err(match referrer {
                    Some(template) if source.kind() == std::io::ErrorKind::NotFound => {
                        TemplateError::MissingInclude {
                            template: template.to_string(),
                            include: name.to_string(),
                        }
                    }
                    _ => TemplateError::Io { path, source },
                });
            }
        };

        let refs: Vec<String> = self
            .pattern
            .captures_iter(&text)
            .map(|cap| cap[1].to_string())
            .filter(|r| self.config.is_template(r))
            .collect();

        self.stack.push(name.to_string());
        for dep in &refs {
            self.resolve(dep, Some(name))?;
        }
        self.stack.pop();

        self.deps.insert(name.to_string(), refs);
        self.sources.insert(name.to_string(), text);
        Ok(())
    }

    /// `name` and its transitive references, as (name, source) pairs.
    fn closure(&self, name: &str) -> Vec<(String, String)> {
        let mut seen = HashSet::new();
        let mut pending = vec![name.to_string()];
        let mut out = Vec::new();

        while let Some(current) = pending.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(source) = self.sources.get(&current) {
                out.push((current.clone(), source.clone()));
            }
            if let Some(deps) = self.deps.get(&current) {
                pending.extend(deps.iter().cloned());
            }
        }

        out
    }
}

/// A loaded theme: config plus compiled template groups.
#[derive(Debug)]
pub struct ThemeEngine {
    dir: PathBuf,
    config: ThemeConfig,
    groups: RwLock<HashMap<String, Arc<Tera>>>,
}

impl ThemeEngine {
    /// Load every template under `dir`.
    ///
    /// Any unreadable, malformed or cyclic template aborts the load.
    pub fn load(dir: &Path, config_file: &str) -> Result<Self> {
        if !dir.is_dir() {
            return Err(TemplateError::Io {
                path: dir.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "theme directory does not exist",
                ),
            });
        }

        let config = ThemeConfig::load(&dir.join(config_file));
        let names = template_files(dir, &config);
        let mut resolver = IncludeResolver::new(dir, &config)?;

        for name in &names {
            resolver.resolve(name, None)?;
        }

        let mut groups = HashMap::with_capacity(names.len());
        for name in &names {
            let mut tera = Tera::default();
            tera.register_filter("html", RawHtml);
            tera.register_function("html", RawHtml);
            tera.add_raw_templates(resolver.closure(name))
                .map_err(|source| TemplateError::Compile {
                    name: name.clone(),
                    source,
                })?;
            groups.insert(name.clone(), Arc::new(tera));
        }

        info!(
            theme = %config.name,
            dir = %dir.display(),
            templates = groups.len(),
            "theme loaded"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            config,
            groups: RwLock::new(groups),
        })
    }

    /// Render template `name` into `writer`.
    pub fn execute(&self, writer: impl Write, name: &str, context: &Context) -> Result<()> {
        let tera = self
            .template_named(name)
            .ok_or_else(|| TemplateError::Missing(name.to_string()))?;
        tera.render_to(name, context, writer)
            .map_err(|source| TemplateError::Render {
                name: name.to_string(),
                source,
            })
    }

    /// Render template `name` into a new buffer.
    pub fn render(&self, name: &str, context: &Context) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.execute(&mut buf, name, context)?;
        Ok(buf)
    }

    /// The compiled group registered under `name`.
    pub fn template_named(&self, name: &str) -> Option<Arc<Tera>> {
        self.groups.read().get(name).cloned()
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.groups.read().contains_key(name)
    }

    /// Registered template names, sorted.
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn config(&self) -> &ThemeConfig {
        &self.config
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_template(&self) -> &str {
        &self.config.index_template
    }

    pub fn not_found_template(&self) -> &str {
        &self.config.not_found_template
    }

    /// Absolute static directories declared by the theme.
    pub fn static_dirs(&self) -> Vec<PathBuf> {
        self.config
            .static_dirs
            .iter()
            .map(|d| self.dir.join(d))
            .collect()
    }
}

/// Template names under `dir`, sorted. Static directories are skipped.
fn template_files(dir: &Path, config: &ThemeConfig) -> Vec<String> {
    let static_dirs: Vec<PathBuf> = config.static_dirs.iter().map(|d| dir.join(d)).collect();

    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !static_dirs.iter().any(|s| e.path() == s.as_path()))
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let relative = e.path().strip_prefix(dir).ok()?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            config.is_template(&name).then_some(name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, text: &str) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dirs");
        }
        fs::write(path, text).expect("write");
    }

    #[test]
    fn test_theme_config_defaults() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config = ThemeConfig::load(&dir.path().join("theme_config.toml"));
        assert_eq!(config, ThemeConfig::default());
        assert_eq!(config.index_template, "post-list.html");
        assert_eq!(config.not_found_template, "404.html");
        assert_eq!(config.static_dirs, vec!["static"]);

        write(dir.path(), "bad.toml", "this is = = not toml");
        assert_eq!(ThemeConfig::load(&dir.path().join("bad.toml")), ThemeConfig::default());
    }

    #[test]
    fn test_theme_config_custom() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write(
            dir.path(),
            "theme_config.toml",
            "name = \"plain\"\nindex_template = \"home.html\"\nenable_dark_mode = true\n",
        );
        let config = ThemeConfig::load(&dir.path().join("theme_config.toml"));
        assert_eq!(config.name, "plain");
        assert_eq!(config.index_template, "home.html");
        assert!(config.enable_dark_mode);
        assert_eq!(config.extensions, vec![".html"]);
    }

    #[test]
    fn test_include_loaded_transitively() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write(
            dir.path(),
            "list.html",
            "{% include \"partial/header.html\" %}<ul>{{ count }}</ul>",
        );
        write(dir.path(), "partial/header.html", "<header>{{ title }}</header>");
        write(dir.path(), "notes.txt", "{% include \"nope.html\" %}");

        let theme = ThemeEngine::load(dir.path(), "theme_config.toml").expect("load theme");
        assert_eq!(theme.template_names(), vec!["list.html", "partial/header.html"]);

        let mut ctx = Context::new();
        ctx.insert("title", "Blog");
        ctx.insert("count", &3);
        let out = theme.render("list.html", &ctx).expect("render");
        assert_eq!(String::from_utf8(out).expect("utf8"), "<header>Blog</header><ul>3</ul>");
    }

    #[test]
    fn test_extends_resolved() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write(
            dir.path(),
            "base.html",
            "<main>{% block body %}{% endblock body %}</main>",
        );
        write(
            dir.path(),
            "page.html",
            "{% extends \"base.html\" %}{% block body %}page{% endblock body %}",
        );

        let theme = ThemeEngine::load(dir.path(), "theme_config.toml").expect("load theme");
        let out = theme.render("page.html", &Context::new()).expect("render");
        assert_eq!(out, b"<main>page</main>");
    }

    #[test]
    fn test_include_cycle_detected() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write(dir.path(), "a.html", "{% include \"b.html\" %}");
        write(dir.path(), "b.html", "{% include \"c.html\" %}");
        write(dir.path(), "c.html", "{% include \"a.html\" %}");

        let err = ThemeEngine::load(dir.path(), "theme_config.toml").unwrap_err();
        match err {
            TemplateError::IncludeCycle { chain } => {
                assert_eq!(chain, vec!["a.html", "b.html", "c.html", "a.html"]);
            }
            other => panic!("expected cycle error, got {other}"),
        }
    }

    #[test]
    fn test_missing_include_aborts_load() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write(dir.path(), "a.html", "{% include \"gone.html\" %}");

        let err = ThemeEngine::load(dir.path(), "theme_config.toml").unwrap_err();
        assert!(matches!(err, TemplateError::MissingInclude { .. }));
        assert!(err.to_string().contains("gone.html"));
    }

    #[test]
    fn test_syntax_error_aborts_load() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write(dir.path(), "broken.html", "{% if %}");

        let err = ThemeEngine::load(dir.path(), "theme_config.toml").unwrap_err();
        assert!(matches!(err, TemplateError::Compile { .. }));
    }

    #[test]
    fn test_missing_theme_dir() {
        let err = ThemeEngine::load(Path::new("/nonexistent/theme"), "theme_config.toml")
            .unwrap_err();
        assert!(matches!(err, TemplateError::Io { .. }));
    }

    #[test]
    fn test_execute_missing_template() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write(dir.path(), "a.html", "a");

        let theme = ThemeEngine::load(dir.path(), "theme_config.toml").expect("load theme");
        let err = theme.render("post.html", &Context::new()).unwrap_err();
        assert_eq!(err.to_string(), "template 'post.html' is missing");
        assert!(theme.template_named("post.html").is_none());
        assert!(theme.template_named("a.html").is_some());
    }

    #[test]
    fn test_html_filter_and_function() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write(
            dir.path(),
            "raw.html",
            "{{ body }}|{{ body | html }}|{{ bytes | html }}|{{ html(value=body) }}",
        );

        let theme = ThemeEngine::load(dir.path(), "theme_config.toml").expect("load theme");
        let mut ctx = Context::new();
        ctx.insert("body", "<b>x</b>");
        ctx.insert("bytes", &b"<i>y</i>".to_vec());

        let out = String::from_utf8(theme.render("raw.html", &ctx).expect("render")).expect("utf8");
        assert_eq!(out, "&lt;b&gt;x&lt;&#x2F;b&gt;|<b>x</b>|<i>y</i>|<b>x</b>");
    }

    #[test]
    fn test_static_dirs_are_not_templates() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write(dir.path(), "index.html", "ok");
        write(dir.path(), "static/demo.html", "{% broken");

        let theme = ThemeEngine::load(dir.path(), "theme_config.toml").expect("load theme");
        assert_eq!(theme.template_names(), vec!["index.html"]);
        assert_eq!(theme.static_dirs(), vec![dir.path().join("static")]);
    }

    #[test]
    fn test_concurrent_execute() {
        let dir = tempfile::tempdir().expect("create temp dir");
        write(dir.path(), "n.html", "{{ n }}");
        let theme = ThemeEngine::load(dir.path(), "theme_config.toml").expect("load theme");

        std::thread::scope(|scope| {
            for n in 0..8 {
                let theme = &theme;
                scope.spawn(move || {
                    let mut ctx = Context::new();
                    ctx.insert("n", &n);
                    let out = theme.render("n.html", &ctx).expect("render");
                    assert_eq!(out, n.to_string().into_bytes());
                });
            }
        });
    }
}
