//! Registration and dispatch of generated rendering methods
//!
//! A [`Configurator`] owns the methods of one host type. Each registration
//! builds an [`ArgumentContract`], a template reference and an optional layout
//! name, and installs them under a method name. Calling the method validates
//! the named arguments, obtains the compiled template, renders it against the
//! caller's scope and, when a layout is configured, hands the output to the
//! layout method as its content.
//!
//! # Example
//!
//! ```rust
//! use viewsmith::{args, Configurator, Signature};
//!
//! let mut views: Configurator<()> = Configurator::new();
//! views
//!     .template_inline(
//!         "greeting",
//!         "slim",
//!         "p Hello #{title} #{name}!",
//!         Signature::new().mandatory("name").optional("title", "Mr."),
//!     )
//!     .unwrap();
//!
//! let html = views.call(&(), "greeting", args! { "name" => "Jones" }).unwrap();
//! assert_eq!(html, "<p>Hello Mr. Jones!</p>");
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::arguments::ArgumentContract;
use crate::engine::lexer::is_identifier;
use crate::engine::{Content, DialectRegistry, Template};
use crate::error::{ConfigurationError, Error, Result};
use crate::scope::Scope;
use crate::settings::Settings;
use crate::value::{Args, Value};

/// Parameters, defaults and layout of a method being registered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    pub mandatory: Vec<String>,
    pub optional: BTreeMap<String, Value>,
    pub layout: Option<String>,
}

impl Signature {
    /// A signature without parameters or layout
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a mandatory parameter
    pub fn mandatory(mut self, name: impl Into<String>) -> Self {
        self.mandatory.push(name.into());
        self
    }

    /// Add an optional parameter with its default value
    pub fn optional(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.optional.insert(name.into(), default.into());
        self
    }

    /// Wrap the output with the method named `name`
    pub fn layout(mut self, name: impl Into<String>) -> Self {
        self.layout = Some(name.into());
        self
    }
}

/// Compiled template, or a factory compiling it on every call
#[derive(Clone)]
enum TemplateRef {
    Compiled(Arc<dyn Template>),
    Deferred(Arc<dyn Fn() -> Result<Arc<dyn Template>> + Send + Sync>),
}

impl TemplateRef {
    fn resolve(&self) -> Result<Arc<dyn Template>> {
        match self {
            TemplateRef::Compiled(template) => Ok(Arc::clone(template)),
            TemplateRef::Deferred(factory) => factory(),
        }
    }
}

/// A method generated from a template
pub struct GeneratedMethod {
    name: String,
    source: String,
    contract: ArgumentContract,
    template: TemplateRef,
    layout: Option<String>,
}

impl fmt::Debug for GeneratedMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedMethod")
            .field("name", &self.name)
            .field("source", &self.source)
            .field("contract", &self.contract)
            .field("cached", &matches!(self.template, TemplateRef::Compiled(_)))
            .field("layout", &self.layout)
            .finish()
    }
}

impl GeneratedMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Template file path, or `inline:<tag>`
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn contract(&self) -> &ArgumentContract {
        &self.contract
    }

    pub fn layout(&self) -> Option<&str> {
        self.layout.as_deref()
    }

    /// Whether the compiled template is kept between calls
    pub fn is_cached(&self) -> bool {
        matches!(self.template, TemplateRef::Compiled(_))
    }

    /// Validate, render and wrap with the layout, if any.
    ///
    /// With a layout, `content` is not passed to the template; the template's
    /// own output becomes the layout's content.
    pub fn call<S: Scope>(
        &self,
        host: &dyn Dispatch<S>,
        scope: &S,
        args: Args,
        content: Option<&Content<'_>>,
    ) -> Result<String> {
        let locals = self.contract.validate(args)?;
        let template = self.template.resolve()?;
        match &self.layout {
            Some(layout) => {
                let output = template.render(scope, &locals, None)?;
                tracing::trace!(method = %self.name, layout = %layout, "wrapping with layout");
                let inner = || -> Result<String> { Ok(output.clone()) };
                host.dispatch(scope, layout, Args::new(), Some(&inner))
            }
            None => template.render(scope, &locals, content),
        }
    }
}

/// A hand-written method installed next to the generated ones
pub type NativeMethod<S> = dyn Fn(&S, &Args, Option<&Content<'_>>) -> Result<String> + Send + Sync;

/// An installed method
pub enum Method<S> {
    Generated(Arc<GeneratedMethod>),
    Native(Arc<NativeMethod<S>>),
}

impl<S> Clone for Method<S> {
    fn clone(&self) -> Self {
        match self {
            Method::Generated(method) => Method::Generated(Arc::clone(method)),
            Method::Native(method) => Method::Native(Arc::clone(method)),
        }
    }
}

impl<S> fmt::Debug for Method<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Generated(method) => method.fmt(f),
            Method::Native(_) => f.write_str("Native(..)"),
        }
    }
}

impl<S: Scope> Method<S> {
    pub fn call(
        &self,
        host: &dyn Dispatch<S>,
        scope: &S,
        args: Args,
        content: Option<&Content<'_>>,
    ) -> Result<String> {
        match self {
            Method::Generated(method) => method.call(host, scope, args, content),
            Method::Native(method) => method(scope, &args, content),
        }
    }
}

/// Looks up a method by name and invokes it on a scope
pub trait Dispatch<S> {
    fn dispatch(
        &self,
        scope: &S,
        name: &str,
        args: Args,
        content: Option<&Content<'_>>,
    ) -> Result<String>;
}

/// Registry of the rendering methods of one host type
pub struct Configurator<S> {
    base_folder: Option<PathBuf>,
    cache: bool,
    dialects: DialectRegistry,
    methods: BTreeMap<String, Method<S>>,
    _host: PhantomData<fn(&S)>,
}

impl<S> Default for Configurator<S> {
    fn default() -> Self {
        Self {
            base_folder: None,
            cache: true,
            dialects: DialectRegistry::default(),
            methods: BTreeMap::new(),
            _host: PhantomData,
        }
    }
}

impl<S> fmt::Debug for Configurator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configurator")
            .field("base_folder", &self.base_folder)
            .field("cache", &self.cache)
            .field("dialects", &self.dialects)
            .field("methods", &self.methods)
            .finish()
    }
}

impl<S> Configurator<S> {
    /// Caching on, templates resolved against the current directory
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: &Settings) -> Self {
        let mut configurator = Self::new();
        configurator.apply_settings(settings);
        configurator
    }

    /// Take over `base_folder` and `cache`; affects later registrations only
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.base_folder = settings.base_folder.clone();
        self.cache = settings.cache;
    }

    /// Folder [`template`](Self::template) paths are resolved against;
    /// `None` means the current directory
    pub fn base_folder(&self) -> Option<&Path> {
        self.base_folder.as_deref()
    }

    pub fn set_base_folder(&mut self, folder: Option<PathBuf>) {
        self.base_folder = folder;
    }

    /// Whether file templates are compiled once at registration
    pub fn cache(&self) -> bool {
        self.cache
    }

    /// Turning caching off makes later registrations re-read their template
    /// on every call; methods already installed keep their policy
    pub fn set_cache(&mut self, cache: bool) {
        self.cache = cache;
    }

    pub fn dialects(&self) -> &DialectRegistry {
        &self.dialects
    }

    pub fn dialects_mut(&mut self) -> &mut DialectRegistry {
        &mut self.dialects
    }

    /// Register a method rendering the template at `path`, resolved against
    /// the base folder
    pub fn template(
        &mut self,
        name: impl Into<String>,
        path: impl AsRef<Path>,
        signature: Signature,
    ) -> Result<()> {
        let cwd = current_dir()?;
        let base = match &self.base_folder {
            Some(folder) => cwd.join(folder),
            None => cwd,
        };
        self.install_file(name.into(), base.join(path), signature)
    }

    /// Register a method rendering the template at `path`, resolved against
    /// the directory of the source file calling this method
    #[track_caller]
    pub fn template_relative(
        &mut self,
        name: impl Into<String>,
        path: impl AsRef<Path>,
        signature: Signature,
    ) -> Result<()> {
        let caller = std::panic::Location::caller();
        let dir = Path::new(caller.file())
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        self.template_relative_to(name, dir, path, signature)
    }

    /// Register a method rendering the template at `path`, resolved against
    /// `dir`; a relative `dir` is taken from the current directory at
    /// registration
    pub fn template_relative_to(
        &mut self,
        name: impl Into<String>,
        dir: impl AsRef<Path>,
        path: impl AsRef<Path>,
        signature: Signature,
    ) -> Result<()> {
        let dir = current_dir()?.join(dir);
        self.install_file(name.into(), dir.join(path), signature)
    }

    /// Register a method rendering `source` in the dialect named by `tag`.
    ///
    /// Inline templates are compiled right away whatever the cache setting.
    pub fn template_inline(
        &mut self,
        name: impl Into<String>,
        tag: &str,
        source: &str,
        signature: Signature,
    ) -> Result<()> {
        let name = name.into();
        let contract = build_contract(&name, &signature)?;
        let compiler = self.dialects.compiler_for(tag).ok_or_else(|| {
            ConfigurationError::UnknownDialect {
                tags: vec![tag.to_string()],
            }
        })?;
        let origin = format!("inline:{}", name);
        let template = compiler.compile(source, &origin)?;

        self.install(
            name,
            format!("inline:{}", tag),
            contract,
            TemplateRef::Compiled(template),
            signature.layout,
        );
        Ok(())
    }

    /// Install a hand-written method, e.g. a layout that is not a template
    pub fn define_method<F>(&mut self, name: impl Into<String>, method: F) -> Result<()>
    where
        F: Fn(&S, &Args, Option<&Content<'_>>) -> Result<String> + Send + Sync + 'static,
    {
        let name = name.into();
        check_method_name(&name)?;
        tracing::debug!(method = %name, "defined native method");
        self.methods.insert(name, Method::Native(Arc::new(method)));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Installed method names, sorted
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(|s| s.as_str())
    }

    pub fn method(&self, name: &str) -> Option<Method<S>> {
        self.methods.get(name).cloned()
    }

    /// Contract of a generated method
    pub fn contract(&self, name: &str) -> Option<&ArgumentContract> {
        match self.methods.get(name)? {
            Method::Generated(method) => Some(method.contract()),
            Method::Native(_) => None,
        }
    }

    fn install_file(&mut self, name: String, path: PathBuf, signature: Signature) -> Result<()> {
        let contract = build_contract(&name, &signature)?;

        let template = if self.cache {
            TemplateRef::Compiled(self.dialects.compile_file(&path)?)
        } else {
            let dialects = self.dialects.clone();
            let path = path.clone();
            TemplateRef::Deferred(Arc::new(move || dialects.compile_file(&path)))
        };

        self.install(
            name,
            path.display().to_string(),
            contract,
            template,
            signature.layout,
        );
        Ok(())
    }

    fn install(
        &mut self,
        name: String,
        source: String,
        contract: ArgumentContract,
        template: TemplateRef,
        layout: Option<String>,
    ) {
        tracing::debug!(
            method = %name,
            source = %source,
            cached = matches!(template, TemplateRef::Compiled(_)),
            layout = ?layout,
            "registered template method"
        );
        let method = GeneratedMethod {
            name: name.clone(),
            source,
            contract,
            template,
            layout,
        };
        if self
            .methods
            .insert(name, Method::Generated(Arc::new(method)))
            .is_some()
        {
            tracing::debug!("replaced previous definition");
        }
    }
}

impl<S: Scope> Configurator<S> {
    /// Call the method `name` on `scope`
    pub fn call(&self, scope: &S, name: &str, args: Args) -> Result<String> {
        self.dispatch(scope, name, args, None)
    }

    /// Call the method `name` on `scope`, with content for the template to
    /// yield
    pub fn call_with(
        &self,
        scope: &S,
        name: &str,
        args: Args,
        content: &Content<'_>,
    ) -> Result<String> {
        self.dispatch(scope, name, args, Some(content))
    }
}

impl<S: Scope> Dispatch<S> for Configurator<S> {
    fn dispatch(
        &self,
        scope: &S,
        name: &str,
        args: Args,
        content: Option<&Content<'_>>,
    ) -> Result<String> {
        tracing::trace!(method = name, "dispatch");
        let method = self.method(name).ok_or_else(|| Error::UndefinedMethod {
            name: name.to_string(),
        })?;
        method.call(self, scope, args, content)
    }
}

/// The lock is only held while looking the method up, so layouts can
/// dispatch back into the same registry
impl<S: Scope> Dispatch<S> for RwLock<Configurator<S>> {
    fn dispatch(
        &self,
        scope: &S,
        name: &str,
        args: Args,
        content: Option<&Content<'_>>,
    ) -> Result<String> {
        tracing::trace!(method = name, "dispatch");
        let method = self
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .method(name)
            .ok_or_else(|| Error::UndefinedMethod {
                name: name.to_string(),
            })?;
        method.call(self, scope, args, content)
    }
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().map_err(|source| Error::Io {
        path: PathBuf::from("."),
        source,
    })
}

fn check_method_name(name: &str) -> std::result::Result<(), ConfigurationError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidMethodName {
            name: name.to_string(),
        })
    }
}

fn build_contract(
    name: &str,
    signature: &Signature,
) -> std::result::Result<ArgumentContract, ConfigurationError> {
    check_method_name(name)?;
    ArgumentContract::new(signature.mandatory.iter().cloned(), signature.optional.clone())
}
