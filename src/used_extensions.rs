//! Used-extensions finder.
//!
//! Lists the extensions a project depends on so that only their runtime
//! files get shipped. The scan is read-only and returns names in a stable
//! order.

use std::collections::BTreeSet;

use crate::ast::{walk_function_call, walk_variable, ExpressionNode, ExpressionVisitor, FunctionCall, VariableAccess};
use crate::builtins::VARIABLES_EXTENSION;
use crate::metadata::{ParameterMetadata, ValueKind};
use crate::model::{Event, Expression, Instruction};
use crate::project::{ExpressionTypeResolver, ObjectDeclaration, ObjectsScope, Project};
use crate::registry::MetadataRegistry;

/// Collects extension names while walking a project.
pub struct UsedExtensionsFinder<'a> {
    registry: &'a MetadataRegistry,
    used: BTreeSet<String>,
}

impl<'a> UsedExtensionsFinder<'a> {
    /// Names of every extension whose object types, behaviors,
    /// instructions or expressions are referenced by `project`.
    #[tracing::instrument(skip_all, fields(project = %project.name))]
    pub fn scan_project(project: &Project, registry: &'a MetadataRegistry) -> BTreeSet<String> {
        let mut finder = UsedExtensionsFinder {
            registry,
            used: BTreeSet::new(),
        };

        finder.object_declarations(&project.objects);
        for layout in &project.layouts {
            finder.object_declarations(&layout.objects);
            let scope = ObjectsScope::new(project, Some(layout));
            finder.events(&layout.events, &scope);
        }
        let global_scope = ObjectsScope::new(project, None);
        for external in &project.external_events {
            finder.events(&external.events, &global_scope);
        }

        tracing::debug!(count = finder.used.len(), "used extensions found");
        finder.used
    }

    fn add(&mut self, extension: &str) {
        if !extension.is_empty() {
            self.used.insert(extension.to_string());
        }
    }

    fn object_declarations(&mut self, objects: &[ObjectDeclaration]) {
        for object in objects {
            let extension = self.registry.object(&object.object_type).extension;
            self.add(extension);
            for behavior in &object.behaviors {
                let extension = self.registry.behavior(&behavior.behavior_type).extension;
                self.add(extension);
            }
        }
    }

    fn events(&mut self, events: &[Event], scope: &ObjectsScope<'_>) {
        for event in events {
            match event {
                Event::Standard(e) => {
                    self.instructions(&e.conditions, true, scope);
                    self.instructions(&e.actions, false, scope);
                    self.events(&e.sub_events, scope);
                }
                Event::ForEach(e) => {
                    if let Some(object_type) = scope.object_type(e.object.text().trim()) {
                        let extension = self.registry.object(&object_type).extension;
                        self.add(extension);
                    }
                    self.instructions(&e.conditions, true, scope);
                    self.instructions(&e.actions, false, scope);
                    self.events(&e.sub_events, scope);
                }
                Event::Async(e) => {
                    self.instructions(std::slice::from_ref(&e.instruction), false, scope);
                    self.instructions(&e.actions, false, scope);
                    self.events(&e.sub_events, scope);
                }
                Event::Link(_) | Event::Comment(_) | Event::Empty => {}
            }
        }
    }

    fn instructions(&mut self, instructions: &[Instruction], are_conditions: bool, scope: &ObjectsScope<'_>) {
        for instruction in instructions {
            let resolved = if are_conditions {
                self.registry.condition(&instruction.instruction_type)
            } else {
                self.registry.action(&instruction.instruction_type)
            };
            self.add(resolved.extension);
            self.parameters(&instruction.parameters, &resolved.metadata.parameters, scope);
            self.instructions(&instruction.sub_instructions, are_conditions, scope);
        }
    }

    /// Supplied parameters pair with the declared parameters that are not
    /// code-only, in order.
    fn parameters(&mut self, parameters: &[Expression], metadata: &[ParameterMetadata], scope: &ObjectsScope<'_>) {
        let declared = metadata.iter().filter(|p| !p.code_only);
        for (value, parameter) in parameters.iter().zip(declared) {
            if parameter.param_type.is_variable() {
                self.add(VARIABLES_EXTENSION);
            }
            if let Some(kind) = parameter.param_type.expression_kind() {
                if value.text().trim().is_empty() {
                    continue;
                }
                let mut visitor = ExpressionExtensions {
                    registry: self.registry,
                    resolver: scope,
                    used: &mut self.used,
                };
                visitor.visit_node(value.ast(kind));
            }
        }
    }
}

/// Adds the extensions of the functions, objects and variables used in an
/// expression.
struct ExpressionExtensions<'s> {
    registry: &'s MetadataRegistry,
    resolver: &'s dyn ExpressionTypeResolver,
    used: &'s mut BTreeSet<String>,
}

impl ExpressionExtensions<'_> {
    fn add(&mut self, extension: &str) {
        if !extension.is_empty() {
            self.used.insert(extension.to_string());
        }
    }

    fn function_extension(&self, call: &FunctionCall) -> Option<String> {
        let registry = self.registry;
        let kinds = [ValueKind::Number, ValueKind::String];
        let found = if !call.behavior_name.is_empty() {
            let behavior_type = self
                .resolver
                .behavior_type(&call.object_name, &call.behavior_name)?;
            kinds
                .iter()
                .map(|kind| registry.behavior_expression(&behavior_type, &call.function_name, *kind))
                .find(|resolved| resolved.is_found())
        } else if !call.object_name.is_empty() {
            let object_type = self.resolver.object_type(&call.object_name)?;
            kinds
                .iter()
                .map(|kind| registry.object_expression(&object_type, &call.function_name, *kind))
                .find(|resolved| resolved.is_found())
        } else {
            kinds
                .iter()
                .map(|kind| registry.expression(&call.function_name, *kind))
                .find(|resolved| resolved.is_found())
        };
        found.map(|resolved| resolved.extension.to_string())
    }
}

impl ExpressionVisitor for ExpressionExtensions<'_> {
    fn visit_identifier(&mut self, _node: &ExpressionNode, name: &str) {
        match self.resolver.object_type(name) {
            Some(object_type) => {
                let extension = self.registry.object(&object_type).extension;
                self.add(extension);
            }
            None => self.add(VARIABLES_EXTENSION),
        }
    }

    fn visit_variable(&mut self, _node: &ExpressionNode, variable: &VariableAccess) {
        self.add(VARIABLES_EXTENSION);
        walk_variable(self, variable);
    }

    fn visit_function_call(&mut self, _node: &ExpressionNode, call: &FunctionCall) {
        if let Some(extension) = self.function_extension(call) {
            self.add(&extension);
        }
        walk_function_call(self, call);
    }
}
