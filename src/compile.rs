//! Compilation entry points.
//!
//! A compilation takes a layout of a project, expands and filters its
//! events, then generates the code of the whole tree into one compilation
//! unit. Layouts are independent: a project is compiled with one task per
//! layout, all sharing the read-only registry.

#[cfg(feature = "napi")]
use napi_derive::napi;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::backend::Target;
use crate::codegen::EventsCodeGenerator;
use crate::context::GenerationContext;
use crate::error::{CompileError, CompilerError, Result};
use crate::preprocess::preprocess_events;
use crate::project::{ObjectsScope, Project};
use crate::registry::MetadataRegistry;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Prefix of the generated namespace (`gdjs.` for the web runtime).
    pub code_namespace: Option<String>,
    pub target: Target,
    /// Keep comment events as comments in the output.
    pub emit_comments: bool,
    /// Compile disabled events and instructions as if they were enabled.
    pub generate_disabled: bool,
}

impl CompileOptions {
    pub fn for_target(target: Target) -> Self {
        CompileOptions {
            target,
            ..Default::default()
        }
    }
}

/// Result of compiling one layout. `has_errors` is set when any diagnostic
/// was reported; the code is complete either way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompilationOutput {
    pub layout: String,
    pub code: String,
    /// Files the generated code needs, sorted and without duplicates.
    pub includes: Vec<String>,
    pub has_errors: bool,
    pub diagnostics: Vec<CompilerError>,
}

/// Compiles the events of `layout_name`.
#[tracing::instrument(skip(project, registry, options), fields(platform = %options.target))]
pub fn compile_layout(
    project: &Project,
    layout_name: &str,
    registry: &MetadataRegistry,
    options: &CompileOptions,
) -> Result<CompilationOutput> {
    let layout = project
        .layout(layout_name)
        .ok_or_else(|| CompileError::UnknownLayout(layout_name.to_string()))?;

    let mut diagnostics = Vec::new();
    let events = preprocess_events(&layout.events, project, layout_name, options, &mut diagnostics);

    let scope = ObjectsScope::new(project, Some(layout));
    let mut generator = EventsCodeGenerator::new(registry, &scope, layout_name, options);
    generator.extend_diagnostics(diagnostics);

    let mut root = GenerationContext::root();
    let body = generator.generate_events_list_code(&events, &mut root);
    let main_body = format!("{}{}", generator.declarations_code(&root), body);

    let output = generator.finish(&main_body);
    tracing::debug!(
        bytes = output.code.len(),
        diagnostics = output.diagnostics.len(),
        "layout compiled"
    );
    Ok(output)
}

/// Compiles every layout of the project in parallel, in layout order.
pub fn compile_project(
    project: &Project,
    registry: &MetadataRegistry,
    options: &CompileOptions,
) -> Result<Vec<CompilationOutput>> {
    project
        .layouts
        .par_iter()
        .map(|layout| compile_layout(project, &layout.name, registry, options))
        .collect()
}

/// Decodes a project from its JSON form.
pub fn project_from_json(source: &str) -> Result<Project> {
    Ok(serde_json::from_str(source)?)
}
