//! Template engine boundary and the built-in dialects
//!
//! Generated methods only see two traits: a [`Compiler`] turns source text into
//! a [`Template`], and a [`Template`] renders against a scope, a set of named
//! bindings and an optional content thunk. The [`DialectRegistry`] maps dialect
//! tags (`slim`, `erb`, ...) and file extensions to compilers.
//!
//! # Example
//!
//! ```rust
//! use viewsmith::engine::DialectRegistry;
//! use viewsmith::args;
//!
//! let dialects = DialectRegistry::default();
//! let compiler = dialects.compiler_for("slim").unwrap();
//! let template = compiler.compile("p Hello #{name}!", "inline").unwrap();
//! let html = template.render(&(), &args! { "name" => "Jones" }, None).unwrap();
//! assert_eq!(html, "<p>Hello Jones!</p>");
//! ```

pub mod erb;
pub mod expr;
pub mod lexer;
pub mod slim;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{CompileError, Error, Result};
use crate::scope::Scope;
use crate::value::Args;

/// Thunk producing nested content when a template yields
pub type Content<'a> = dyn Fn() -> Result<String> + 'a;

/// A compiled template; stateless and shareable across calls
pub trait Template: Send + Sync + fmt::Debug {
    fn render(&self, scope: &dyn Scope, locals: &Args, content: Option<&Content<'_>>)
        -> Result<String>;
}

/// Turns template source into a [`Template`]
pub trait Compiler: Send + Sync {
    /// `origin` names the source (file path or inline label) in error messages
    fn compile(&self, source: &str, origin: &str)
        -> std::result::Result<Arc<dyn Template>, CompileError>;
}

impl<F> Compiler for F
where
    F: Fn(&str, &str) -> std::result::Result<Arc<dyn Template>, CompileError> + Send + Sync,
{
    fn compile(
        &self,
        source: &str,
        origin: &str,
    ) -> std::result::Result<Arc<dyn Template>, CompileError> {
        self(source, origin)
    }
}

/// Built-in template dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Indentation-based HTML shorthand
    Slim,
    /// Text with embedded `<%= expr %>` tags
    Erb,
}

impl Dialect {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "slim" => Some(Dialect::Slim),
            "erb" | "rhtml" => Some(Dialect::Erb),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Dialect::Slim => "slim",
            Dialect::Erb => "erb",
        }
    }
}

impl Compiler for Dialect {
    fn compile(
        &self,
        source: &str,
        origin: &str,
    ) -> std::result::Result<Arc<dyn Template>, CompileError> {
        tracing::debug!(origin, dialect = self.tag(), "compiling template");
        match self {
            Dialect::Slim => Ok(Arc::new(slim::SlimTemplate::compile(source, origin)?)),
            Dialect::Erb => Ok(Arc::new(erb::ErbTemplate::compile(source, origin)?)),
        }
    }
}

/// Maps dialect tags to compilers.
///
/// File templates pick their dialect from the file extension, inline templates
/// name it explicitly.
#[derive(Clone)]
pub struct DialectRegistry {
    compilers: BTreeMap<String, Arc<dyn Compiler>>,
}

impl Default for DialectRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("slim", Dialect::Slim);
        registry.register("erb", Dialect::Erb);
        registry.register("rhtml", Dialect::Erb);
        registry
    }
}

impl fmt::Debug for DialectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DialectRegistry")
            .field("tags", &self.tags().collect::<Vec<_>>())
            .finish()
    }
}

impl DialectRegistry {
    /// Registry with the built-in dialects
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry without any dialect
    pub fn empty() -> Self {
        Self {
            compilers: BTreeMap::new(),
        }
    }

    /// Register (or replace) the compiler for `tag`
    pub fn register(&mut self, tag: impl Into<String>, compiler: impl Compiler + 'static) {
        self.compilers.insert(tag.into(), Arc::new(compiler));
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.compilers.contains_key(tag)
    }

    pub fn compiler_for(&self, tag: &str) -> Option<Arc<dyn Compiler>> {
        self.compilers.get(tag).cloned()
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.compilers.keys().map(|s| s.as_str())
    }

    /// Read and compile a template file; the extension selects the dialect
    pub fn compile_file(&self, path: &Path) -> Result<Arc<dyn Template>> {
        let compiler = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.compiler_for(ext))
            .ok_or_else(|| Error::NoDialectForPath {
                path: path.to_path_buf(),
            })?;

        let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(compiler.compile(&source, &path.display().to_string())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    #[derive(Debug)]
    struct Constant(&'static str);

    impl Template for Constant {
        fn render(
            &self,
            _scope: &dyn Scope,
            _locals: &Args,
            _content: Option<&Content<'_>>,
        ) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_builtin_dialects_registered() {
        let registry = DialectRegistry::default();
        assert!(registry.is_registered("slim"));
        assert!(registry.is_registered("erb"));
        assert!(!registry.is_registered("haml"));
        assert_eq!(registry.tags().collect::<Vec<_>>(), vec!["erb", "rhtml", "slim"]);
    }

    #[test]
    fn test_register_custom_compiler() {
        let mut registry = DialectRegistry::empty();
        registry.register("const", |_source: &str, _origin: &str| {
            Ok::<_, CompileError>(Arc::new(Constant("fixed")) as Arc<dyn Template>)
        });
        let template = registry
            .compiler_for("const")
            .unwrap()
            .compile("ignored", "inline")
            .unwrap();
        assert_eq!(template.render(&(), &Args::new(), None).unwrap(), "fixed");
    }

    #[test]
    fn test_dialect_from_tag() {
        assert_eq!(Dialect::from_tag("rhtml"), Some(Dialect::Erb));
        assert_eq!(Dialect::from_tag("slim"), Some(Dialect::Slim));
        assert_eq!(Dialect::from_tag("haml"), None);
    }

    #[test]
    fn test_compile_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hello.erb");
        std::fs::write(&path, "Hello <%= name %>").unwrap();

        let template = DialectRegistry::default().compile_file(&path).unwrap();
        let out = template.render(&(), &args! { "name" => "Ann" }, None).unwrap();
        assert_eq!(out, "Hello Ann");
    }

    #[test]
    fn test_compile_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DialectRegistry::default()
            .compile_file(&dir.path().join("missing.slim"))
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_compile_file_unknown_extension() {
        let err = DialectRegistry::default()
            .compile_file(Path::new("page.haml"))
            .unwrap_err();
        assert!(matches!(err, Error::NoDialectForPath { .. }));
    }
}
