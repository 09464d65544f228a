//! Declarative extensions.
//!
//! Extensions written without Rust code are described in
//! `*.extension.json` files. Each file is decoded into an
//! [`ExtensionDeclaration`] and turned into the same [`Extension`] the
//! builder API produces, with the function names of the requested target.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use crate::backend::Target;
use crate::error::{RegistryError, Result};
use crate::metadata::{InstructionMetadata, ParameterMetadata, ValueKind};
use crate::registry::{Extension, MetadataRegistry};

/// Suffix of the files picked up by [`load_extension_declarations`].
pub const DECLARATION_SUFFIX: &str = ".extension.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionDeclaration {
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    /// Free expressions are written without the `Name::` prefix.
    #[serde(default)]
    pub global_expressions: bool,
    #[serde(default)]
    pub objects: Vec<TypeDeclaration>,
    #[serde(default)]
    pub behaviors: Vec<TypeDeclaration>,
    #[serde(default)]
    pub conditions: Vec<InstructionDeclaration>,
    #[serde(default)]
    pub actions: Vec<InstructionDeclaration>,
    #[serde(default)]
    pub expressions: Vec<ExpressionDeclaration>,
}

/// Object or behavior type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDeclaration {
    pub name: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub include_files: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionDeclaration {
    pub name: String,
    /// Qualified object type, `""` for every object.
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub behavior_type: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterMetadata>,
    #[serde(default)]
    pub function_name: String,
    /// Overrides `function_name` for the native target.
    #[serde(default)]
    pub cpp_function_name: Option<String>,
    #[serde(default)]
    pub async_function_name: String,
    #[serde(default)]
    pub include_files: Vec<String>,
    #[serde(default)]
    pub manipulated_type: Option<ValueKind>,
    #[serde(default)]
    pub getter: Option<String>,
    #[serde(default)]
    pub mutators: BTreeMap<String, String>,
    #[serde(default)]
    pub returns_reference: bool,
    #[serde(default, rename = "async")]
    pub is_async: bool,
    #[serde(default)]
    pub optionally_async: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionDeclaration {
    pub name: String,
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub behavior_type: Option<String>,
    #[serde(default)]
    pub return_kind: ValueKind,
    #[serde(default)]
    pub parameters: Vec<ParameterMetadata>,
    #[serde(default)]
    pub function_name: String,
    #[serde(default)]
    pub cpp_function_name: Option<String>,
    #[serde(default)]
    pub include_files: Vec<String>,
}

fn function_for(target: Target, function_name: &str, cpp_function_name: &Option<String>) -> String {
    match (target, cpp_function_name) {
        (Target::Cpp, Some(name)) => name.clone(),
        _ => function_name.to_string(),
    }
}

impl InstructionDeclaration {
    fn configure(&self, metadata: &mut InstructionMetadata, target: Target) {
        metadata.parameters = self.parameters.clone();
        metadata.function_name = function_for(target, &self.function_name, &self.cpp_function_name);
        metadata.async_function_name = self.async_function_name.clone();
        metadata.include_files = self.include_files.clone();
        metadata.manipulated_type = self.manipulated_type;
        if let Some(getter) = &self.getter {
            metadata.set_getter(getter);
        } else if !self.mutators.is_empty() {
            let mutators: Vec<(&str, &str)> = self
                .mutators
                .iter()
                .map(|(op, method)| (op.as_str(), method.as_str()))
                .collect();
            metadata.set_mutators(&mutators);
        } else if self.returns_reference {
            metadata.set_returns_reference();
        }
        if self.optionally_async {
            metadata.set_optionally_async();
        } else if self.is_async {
            metadata.set_async();
        }
    }
}

impl ExtensionDeclaration {
    /// Builds the extension, choosing the function names of `target`.
    pub fn into_extension(self, target: Target) -> Extension {
        let mut extension = Extension::new(&self.name);
        if !self.full_name.is_empty() {
            extension = extension.set_full_name(&self.full_name);
        }
        if self.global_expressions {
            extension = extension.with_global_expressions();
        }

        for object in &self.objects {
            let metadata = extension.add_object(&object.name);
            metadata.set_class_name(&object.class_name);
            metadata.include_files = object.include_files.clone();
        }
        for behavior in &self.behaviors {
            let metadata = extension.add_behavior(&behavior.name);
            metadata.set_class_name(&behavior.class_name);
            metadata.include_files = behavior.include_files.clone();
        }

        for (declarations, is_condition) in [(&self.conditions, true), (&self.actions, false)] {
            for declaration in declarations {
                let metadata = match (&declaration.object_type, &declaration.behavior_type, is_condition) {
                    (_, Some(behavior), true) => extension.add_behavior_condition(behavior, &declaration.name),
                    (_, Some(behavior), false) => extension.add_behavior_action(behavior, &declaration.name),
                    (Some(object), None, true) => extension.add_object_condition(object, &declaration.name),
                    (Some(object), None, false) => extension.add_object_action(object, &declaration.name),
                    (None, None, true) => extension.add_condition(&declaration.name),
                    (None, None, false) => extension.add_action(&declaration.name),
                };
                declaration.configure(metadata, target);
            }
        }

        for declaration in &self.expressions {
            let kind = declaration.return_kind;
            let metadata = match (&declaration.object_type, &declaration.behavior_type) {
                (_, Some(behavior)) => extension.add_behavior_expression(behavior, &declaration.name, kind),
                (Some(object), None) => extension.add_object_expression(object, &declaration.name, kind),
                (None, None) if kind == ValueKind::String => extension.add_str_expression(&declaration.name),
                (None, None) => extension.add_expression(&declaration.name),
            };
            metadata.parameters = declaration.parameters.clone();
            metadata.function_name =
                function_for(target, &declaration.function_name, &declaration.cpp_function_name);
            metadata.include_files = declaration.include_files.clone();
        }

        extension
    }
}

/// Decodes one declaration file.
pub fn parse_extension_declaration(source: &str, path: &str) -> std::result::Result<ExtensionDeclaration, RegistryError> {
    serde_json::from_str(source).map_err(|e| RegistryError::InvalidDeclaration {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// Every `*.extension.json` file under `dir`, in path order.
#[tracing::instrument(skip(dir), fields(dir = %dir.as_ref().display()))]
pub fn load_extension_declarations(dir: impl AsRef<Path>, target: Target) -> Result<Vec<Extension>> {
    let mut extensions = Vec::new();
    let walker = WalkDir::new(dir.as_ref())
        .follow_links(true)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        let path = entry.path();
        let is_declaration = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(DECLARATION_SUFFIX));
        if !path.is_file() || !is_declaration {
            continue;
        }

        let source = fs::read_to_string(path)?;
        let declaration = parse_extension_declaration(&source, &path.display().to_string())?;
        tracing::debug!(path = %path.display(), extension = %declaration.name, "extension declaration loaded");
        extensions.push(declaration.into_extension(target));
    }
    Ok(extensions)
}

/// Loads the declarations under `dir` into `registry`, returning how many
/// extensions were added.
pub fn register_declared_extensions(
    registry: &mut MetadataRegistry,
    dir: impl AsRef<Path>,
    target: Target,
) -> Result<usize> {
    let extensions = load_extension_declarations(dir, target)?;
    let count = extensions.len();
    for extension in extensions {
        registry.register(extension)?;
    }
    Ok(count)
}
