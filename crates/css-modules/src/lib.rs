//! CSS Modules compiler for cssmod.
//!
//! This crate turns `*.module.css` stylesheets into locally scoped CSS plus
//! a JavaScript module mapping each class to its generated name:
//! - Deterministic, collision-checked class naming
//! - `composes` resolution across classes and files
//! - `:global(...)` and `:external(... from '...')` selectors
//! - Three output modes for the generated module
//!
//! # Example
//!
//! ```
//! use camino::Utf8Path;
//! use css_modules::{CompilationContext, NamerOptions, OutputMode};
//!
//! let mut context = CompilationContext::new(NamerOptions {
//!     root: "/project".into(),
//!     ..NamerOptions::default()
//! });
//! let strategy = OutputMode::Bundler.strategy("cssmod/runtime");
//! let output = context
//!     .transform(
//!         Utf8Path::new("/project/src/button.module.css"),
//!         ".base { color: red; } .primary { composes: base; }",
//!         strategy.as_ref(),
//!     )
//!     .unwrap();
//!
//! assert!(output.js.contains("export const primary"));
//! assert_eq!(output.classes["primary"].split(' ').count(), 2);
//! ```

mod codegen;
mod collect;
mod context;
mod diagnostic;
mod error;
mod namer;
pub mod paths;
mod registry;
mod rename;
mod resolve;
mod store;
mod strategy;
pub mod stylesheet;
mod transform;

pub use codegen::{identifierfy, js_string};
pub use collect::scan_dependencies;
pub use context::CompilationContext;
pub use diagnostic::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
pub use error::CompileError;
pub use namer::{Namer, NamerOptions, NamingCollision};
pub use registry::{ClassRecord, ComposeRef, FileClasses, Registry};
pub use resolve::{ClassPart, Resolved};
pub use store::{
    Asset, AssetStore, MemoryStore, CSS_CONTENT_TYPE, JS_CONTENT_TYPE, SOURCE_MAP_CONTENT_TYPE,
};
pub use strategy::{
    Bundler, ModuleLoader, OutputMode, OutputStrategy, Standalone, DEFAULT_RUNTIME_MODULE,
};
pub use transform::{AssetKeys, TransformOutput, Transformer};
