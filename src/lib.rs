//! # Events Compiler
//!
//! Translates event trees (conditions, actions and nested sub-events built
//! from typed instructions) into JavaScript or C++ source.
//!
//! ## Pipeline
//!
//! 1. **Registry**: extensions declare their objects, behaviors,
//!    instructions and expressions once, through [`Extension`] or declarative
//!    JSON files. The [`MetadataRegistry`] is read-only afterwards.
//! 2. **Preprocessing**: links are expanded and disabled events removed.
//! 3. **Generation**: [`EventsCodeGenerator`] walks the tree with a
//!    [`GenerationContext`] per scope, tracking which object lists each scope
//!    declares and has already filtered.
//! 4. **Continuations**: the actions and sub-events following an
//!    asynchronous action are moved into a callback, with the picked objects
//!    they use captured in a snapshot.
//!
//! ## Invariants
//!
//! 1. A compilation never fails on unknown metadata or malformed
//!    expressions: each problem is reported as a [`CompilerError`] and the
//!    generator emits a neutral fallback.
//! 2. Every declared parameter produces exactly one argument, in order.
//!    Missing trailing parameters take their declared default.
//! 3. An object list is fetched from the scene at most once per scope, and
//!    only if no enclosing scope already holds a filtered list for it.
//! 4. The same project compiled twice yields byte-identical code.

#[cfg(feature = "napi")]
use napi_derive::napi;

pub mod ast;
pub mod async_codegen;
pub mod backend;
pub mod builtins;
pub mod codegen;
pub mod compile;
pub mod context;
pub mod cpp_backend;
pub mod declarations;
pub mod error;
pub mod expression_codegen;
pub mod expression_parser;
pub mod js_backend;
pub mod metadata;
pub mod model;
pub mod naming;
pub mod preprocess;
pub mod project;
pub mod registry;
pub mod used_extensions;

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod context_tests;
#[cfg(test)]
mod declarations_tests;
#[cfg(test)]
mod js_syntax_tests;
#[cfg(test)]
mod parser_tests;
#[cfg(test)]
mod preprocess_tests;
#[cfg(test)]
mod registry_tests;

pub use backend::{Backend, Target};
pub use builtins::register_builtin_extensions;
pub use codegen::EventsCodeGenerator;
pub use compile::{compile_layout, compile_project, project_from_json, CompilationOutput, CompileOptions};
pub use context::GenerationContext;
pub use declarations::{load_extension_declarations, register_declared_extensions, ExtensionDeclaration};
pub use error::{CompileError, CompilerError, RegistryError, Result};
pub use expression_parser::parse_expression;
pub use metadata::{ExpressionMetadata, InstructionMetadata, ParameterType, ValueKind};
pub use model::{Event, Expression, Instruction};
pub use project::{Layout, ObjectDeclaration, ObjectGroup, Project};
pub use registry::{Extension, MetadataRegistry};
pub use used_extensions::UsedExtensionsFinder;

/// Registry holding the built-in extensions of `target`.
pub fn builtin_registry(target: Target) -> Result<MetadataRegistry> {
    let mut registry = MetadataRegistry::new();
    register_builtin_extensions(&mut registry, target)?;
    Ok(registry)
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI BRIDGE
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
fn napi_error(error: CompileError) -> napi::Error {
    napi::Error::from_reason(error.to_string())
}

#[cfg(feature = "napi")]
fn native_options(options_json: Option<String>) -> napi::Result<CompileOptions> {
    match options_json {
        Some(json) => serde_json::from_str(&json)
            .map_err(|e| napi::Error::from_reason(format!("Options parse error: {}", e))),
        None => Ok(CompileOptions::default()),
    }
}

/// Compiles one layout of a JSON project with the built-in extensions plus
/// the declarations found under `extensions_dir`.
#[cfg(feature = "napi")]
#[napi]
pub fn compile_layout_native(
    project_json: String,
    layout: String,
    options_json: Option<String>,
    extensions_dir: Option<String>,
) -> napi::Result<CompilationOutput> {
    let options = native_options(options_json)?;
    let project = project_from_json(&project_json).map_err(napi_error)?;
    let mut registry = builtin_registry(options.target).map_err(napi_error)?;
    if let Some(dir) = extensions_dir {
        register_declared_extensions(&mut registry, dir, options.target).map_err(napi_error)?;
    }
    compile_layout(&project, &layout, &registry, &options).map_err(napi_error)
}

/// Names of the extensions a JSON project uses, sorted.
#[cfg(feature = "napi")]
#[napi]
pub fn scan_project_native(
    project_json: String,
    target: String,
    extensions_dir: Option<String>,
) -> napi::Result<Vec<String>> {
    let target: Target = target.parse().map_err(napi_error)?;
    let project = project_from_json(&project_json).map_err(napi_error)?;
    let mut registry = builtin_registry(target).map_err(napi_error)?;
    if let Some(dir) = extensions_dir {
        register_declared_extensions(&mut registry, dir, target).map_err(napi_error)?;
    }
    Ok(UsedExtensionsFinder::scan_project(&project, &registry)
        .into_iter()
        .collect())
}
