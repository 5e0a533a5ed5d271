//! Per-type method registries
//!
//! Every host type gets one process-wide [`Configurator`], created on first
//! access. Implementing [`Views`] on a type lets its values render the
//! methods registered for it:
//!
//! ```rust
//! use viewsmith::{args, Scope, Signature, Value, Views};
//!
//! struct Page;
//!
//! impl Scope for Page {
//!     fn lookup(&self, name: &str) -> Option<Value> {
//!         (name == "site").then(|| Value::from("docs"))
//!     }
//! }
//!
//! impl Views for Page {}
//!
//! Page::configure(|views| {
//!     views.template_inline("title", "slim", "h1 #{site}: #{text}", Signature::new().mandatory("text"))
//! })
//! .unwrap();
//!
//! assert_eq!(Page.render("title", args! { "text" => "Intro" }).unwrap(), "<h1>docs: Intro</h1>");
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError, RwLock};

use crate::configurator::{Configurator, Dispatch};
use crate::engine::Content;
use crate::error::Result;
use crate::scope::Scope;
use crate::value::Args;

type Registry = HashMap<TypeId, &'static (dyn Any + Send + Sync)>;

static CONFIGURATORS: OnceLock<Mutex<Registry>> = OnceLock::new();

/// The shared configurator of host type `H`
pub fn configurator<H: 'static>() -> &'static RwLock<Configurator<H>> {
    let registry = CONFIGURATORS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut registry = registry.lock().unwrap_or_else(PoisonError::into_inner);

    let entry = *registry.entry(TypeId::of::<H>()).or_insert_with(|| {
        tracing::debug!(host = std::any::type_name::<H>(), "creating configurator");
        let leaked: &'static RwLock<Configurator<H>> =
            Box::leak(Box::new(RwLock::new(Configurator::new())));
        leaked as &'static (dyn Any + Send + Sync)
    });

    match entry.downcast_ref::<RwLock<Configurator<H>>>() {
        Some(configurator) => configurator,
        None => unreachable!("registry entries are keyed by their own TypeId"),
    }
}

/// Rendering methods for values of a host type
pub trait Views: Scope + Sized + 'static {
    fn views() -> &'static RwLock<Configurator<Self>> {
        configurator::<Self>()
    }

    /// Register methods; holds the write lock for the duration of `f`
    fn configure<T>(f: impl FnOnce(&mut Configurator<Self>) -> T) -> T {
        let mut views = Self::views().write().unwrap_or_else(PoisonError::into_inner);
        f(&mut views)
    }

    fn render(&self, name: &str, args: Args) -> Result<String> {
        Self::views().dispatch(self, name, args, None)
    }

    fn render_with(&self, name: &str, args: Args, content: &Content<'_>) -> Result<String> {
        Self::views().dispatch(self, name, args, Some(content))
    }
}
