//! Viewsmith - template-backed rendering methods with named-argument contracts
//!
//! A [`Configurator`] turns a template (a file, or an inline snippet in a named
//! dialect) plus a parameter signature into a callable method. Calls validate
//! their named arguments against an [`ArgumentContract`], fill in defaults,
//! render the template against the caller's [`Scope`] and optionally wrap the
//! result in a layout method.
//!
//! # Example
//!
//! ```rust
//! use viewsmith::{args, Configurator, Signature};
//!
//! let mut views: Configurator<()> = Configurator::new();
//! views
//!     .template_inline("wrap", "erb", "before <%= yield %> after", Signature::new())
//!     .unwrap();
//! views
//!     .template_inline("test", "slim", "p It works!", Signature::new().layout("wrap"))
//!     .unwrap();
//!
//! assert_eq!(
//!     views.call(&(), "test", args!()).unwrap(),
//!     "before <p>It works!</p> after"
//! );
//! ```

pub mod arguments;
pub mod configurator;
pub mod engine;
pub mod error;
pub mod host;
pub mod manifest;
pub mod scope;
pub mod settings;
pub mod value;

pub use arguments::ArgumentContract;
pub use configurator::{Configurator, Dispatch, GeneratedMethod, Method, NativeMethod, Signature};
pub use engine::{Compiler, Content, Dialect, DialectRegistry, Template};
pub use error::{
    CompileError, ConfigurationError, Error, Result, SettingsError, ValidationError,
};
pub use host::{configurator, Views};
pub use manifest::{Manifest, MethodEntry};
pub use scope::Scope;
pub use settings::Settings;
pub use value::{Args, Value};
