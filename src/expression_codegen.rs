//! Expression code generation.
//!
//! Turns the AST of a number or text expression into target code. Every
//! failure (malformed text, unknown function, value of the wrong kind) is
//! reported and replaced by the neutral value of the expected kind, so the
//! generated code always stays valid.

use crate::ast::{ExpressionNode, ExpressionValidator, FunctionCall, NodeKind, VariableAccessor};
use crate::backend::Backend;
use crate::codegen::{EventsCodeGenerator, InstructionSite};
use crate::context::GenerationContext;
use crate::error::{E_EXPRESSION_TYPE_MISMATCH, E_UNKNOWN_EXPRESSION, E_UNKNOWN_OBJECT};
use crate::metadata::{ExpressionMetadata, Owner, ParameterMetadata, ParameterType, ValueKind};
use crate::model::Expression;
use crate::naming::quote;
use crate::project::SemanticType;

/// One step from a variable to one of its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessorStep {
    /// Child of a structure, by name (code of a string).
    Child(String),
    /// Element of an array, by index (code of a number).
    ChildAt(String),
}

/// Applies accessor steps to the code of a variable.
pub fn apply_steps(backend: &dyn Backend, variable: String, steps: &[AccessorStep]) -> String {
    steps.iter().fold(variable, |code, step| match step {
        AccessorStep::Child(name) => backend.variable_child(&code, name),
        AccessorStep::ChildAt(index) => backend.variable_child_at(&code, index),
    })
}

impl<'a> EventsCodeGenerator<'a> {
    /// Code computing `expression` as a value of `kind`.
    pub fn generate_expression_code(
        &mut self,
        expression: &Expression,
        kind: ValueKind,
        context: &mut GenerationContext<'_>,
    ) -> String {
        let text = expression.text().trim();
        if text.is_empty() {
            return self.backend.default_value(kind);
        }
        let node = expression.ast(kind);
        if let Some(diagnostic) = ExpressionValidator::validate(node).into_iter().next() {
            return self.malformed_expression(text, &diagnostic.message, kind);
        }
        self.node_code(node, kind, context)
    }

    fn type_mismatch(&mut self, message: &str, kind: ValueKind) -> String {
        self.report(E_EXPRESSION_TYPE_MISMATCH, message);
        self.backend.default_value(kind)
    }

    fn node_code(
        &mut self,
        node: &ExpressionNode,
        kind: ValueKind,
        context: &mut GenerationContext<'_>,
    ) -> String {
        match &node.kind {
            NodeKind::Number { value } => match kind {
                ValueKind::String => self.type_mismatch(
                    &format!("A number ({}) was used where a text is expected", value),
                    kind,
                ),
                _ => value.clone(),
            },
            NodeKind::Text { value } => match kind {
                ValueKind::String => self.backend.string_literal(value),
                _ => self.type_mismatch(
                    &format!("A text (\"{}\") was used where a number is expected", value),
                    kind,
                ),
            },
            NodeKind::Identifier { name } => {
                if self.resolver.has_object_or_group(name) {
                    return self.type_mismatch(
                        &format!("The object \"{}\" can't be used as a value", name),
                        kind,
                    );
                }
                let variable = self
                    .backend
                    .variable_in(&self.backend.scene_variables(), name);
                self.backend.variable_value(&variable, kind)
            }
            NodeKind::VariableAccess(access) => {
                if self.resolver.has_object_or_group(&access.name) {
                    if let Some((VariableAccessor::Child { name }, rest)) = access.accessors.split_first() {
                        return self.object_variable_code(&access.name, name, rest, Some(kind), context);
                    }
                }
                let steps = self.accessor_steps(&access.accessors, context);
                let variable = self
                    .backend
                    .variable_in(&self.backend.scene_variables(), &access.name);
                let variable = apply_steps(self.backend, variable, &steps);
                self.backend.variable_value(&variable, kind)
            }
            NodeKind::UnaryOperator { operator, operand } => {
                let operand = self.node_code(operand, kind, context);
                if operand.starts_with('-') || operand.starts_with('+') {
                    format!("{}({})", operator, operand)
                } else {
                    format!("{}{}", operator, operand)
                }
            }
            NodeKind::BinaryOperator {
                operator,
                left,
                right,
            } => {
                let left = self.node_code(left, kind, context);
                let right = self.node_code(right, kind, context);
                format!("{} {} {}", left, operator, right)
            }
            NodeKind::SubExpression { expression } => {
                format!("({})", self.node_code(expression, kind, context))
            }
            NodeKind::FunctionCall(call) => self.function_call_code(call, kind, context),
            NodeKind::Empty { text } => {
                self.malformed_expression(text, "A value is missing here.", kind)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VARIABLES
    // ═══════════════════════════════════════════════════════════════════════════

    fn accessor_steps(
        &mut self,
        accessors: &[VariableAccessor],
        context: &mut GenerationContext<'_>,
    ) -> Vec<AccessorStep> {
        accessors
            .iter()
            .map(|accessor| match accessor {
                VariableAccessor::Child { name } => AccessorStep::Child(quote(name)),
                VariableAccessor::Bracket { expression } => {
                    if self.resolver.node_type(expression, self.registry) == SemanticType::String {
                        AccessorStep::Child(self.node_code(expression, ValueKind::String, context))
                    } else {
                        AccessorStep::ChildAt(self.node_code(expression, ValueKind::Number, context))
                    }
                }
            })
            .collect()
    }

    /// Variable of an object: read on the instance being iterated when the
    /// object is the one the instruction runs on, on the first picked instance
    /// otherwise. Returns the variable itself when `value_kind` is `None`.
    pub fn object_variable_code(
        &mut self,
        object_name: &str,
        variable_name: &str,
        accessors: &[VariableAccessor],
        value_kind: Option<ValueKind>,
        context: &mut GenerationContext<'_>,
    ) -> String {
        let fallback = |backend: &dyn Backend| match value_kind {
            Some(kind) => backend.default_value(kind),
            None => backend.bad_variable(),
        };
        if !self.resolver.has_object_or_group(object_name) {
            self.report(
                E_UNKNOWN_OBJECT,
                &format!("Variable \"{}\" of unknown object \"{}\"", variable_name, object_name),
            );
            return fallback(self.backend);
        }

        let member = self.instance_source(object_name, context);
        context.objects_list_needed(&member);
        let list = context.object_list_name(&member);
        let steps = self.accessor_steps(accessors, context);

        let backend = self.backend;
        let read = |instance: &str| {
            let variable = backend.variable_in(&backend.object_variables(instance), variable_name);
            let variable = apply_steps(backend, variable, &steps);
            match value_kind {
                Some(kind) => backend.variable_value(&variable, kind),
                None => variable,
            }
        };

        if context.current_object() == Some(member.as_str()) {
            read(&backend.current_instance(&list))
        } else {
            backend.first_instance_or(&list, &read(&backend.first_instance(&list)), &fallback(backend))
        }
    }

    /// The real object whose instances are read for `object_name`: the
    /// object being iterated if it belongs to `object_name`, else its first
    /// member.
    fn instance_source(&self, object_name: &str, context: &GenerationContext<'_>) -> String {
        let members = self.resolver.expand_object_name(object_name);
        match context.current_object() {
            Some(current) if members.iter().any(|m| m == current) => current.to_string(),
            _ => members
                .into_iter()
                .next()
                .unwrap_or_else(|| object_name.to_string()),
        }
    }

    /// Code of a variable parameter (the variable itself, not its value).
    pub fn variable_parameter_code(
        &mut self,
        parameter_type: &ParameterType,
        node: &ExpressionNode,
        text: &str,
        last_object: Option<&str>,
        context: &mut GenerationContext<'_>,
    ) -> String {
        let (name, accessors): (&str, &[VariableAccessor]) = match &node.kind {
            NodeKind::Identifier { name } => (name.as_str(), &[][..]),
            NodeKind::VariableAccess(access) if node.diagnostic.is_none() => {
                (access.name.as_str(), access.accessors.as_slice())
            }
            _ => {
                self.malformed_expression(text, "A variable name is expected.", ValueKind::Number);
                return self.backend.bad_variable();
            }
        };

        match parameter_type {
            ParameterType::ObjectVariable => match last_object {
                Some(object_name) => {
                    self.object_variable_code(object_name, name, accessors, None, context)
                }
                None => self.backend.bad_variable(),
            },
            ParameterType::GlobalVariable => {
                let steps = self.accessor_steps(accessors, context);
                let variable = self
                    .backend
                    .variable_in(&self.backend.global_variables(), name);
                apply_steps(self.backend, variable, &steps)
            }
            _ => {
                let steps = self.accessor_steps(accessors, context);
                let variable = self
                    .backend
                    .variable_in(&self.backend.scene_variables(), name);
                apply_steps(self.backend, variable, &steps)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FUNCTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    fn resolve_function(
        &self,
        call: &FunctionCall,
        kind: ValueKind,
    ) -> (Owner, Option<&'a ExpressionMetadata>) {
        let registry = self.registry;
        if !call.behavior_name.is_empty() {
            let behavior_type = self
                .resolver
                .behavior_type(&call.object_name, &call.behavior_name)
                .unwrap_or_default();
            let resolved = registry.behavior_expression(&behavior_type, &call.function_name, kind);
            (
                Owner::Behavior(behavior_type),
                resolved.is_found().then_some(resolved.metadata),
            )
        } else if !call.object_name.is_empty() {
            let object_type = self
                .resolver
                .object_type(&call.object_name)
                .unwrap_or_default();
            let resolved = registry.object_expression(&object_type, &call.function_name, kind);
            (
                Owner::Object(object_type),
                resolved.is_found().then_some(resolved.metadata),
            )
        } else {
            let resolved = registry.expression(&call.function_name, kind);
            (Owner::Free, resolved.is_found().then_some(resolved.metadata))
        }
    }

    fn function_call_code(
        &mut self,
        call: &FunctionCall,
        kind: ValueKind,
        context: &mut GenerationContext<'_>,
    ) -> String {
        let display_name = match (call.object_name.is_empty(), call.behavior_name.is_empty()) {
            (true, _) => call.function_name.clone(),
            (false, true) => format!("{}.{}", call.object_name, call.function_name),
            (false, false) => format!(
                "{}.{}::{}",
                call.object_name, call.behavior_name, call.function_name
            ),
        };
        if !call.object_name.is_empty() && !self.resolver.has_object_or_group(&call.object_name) {
            self.report(
                E_UNKNOWN_OBJECT,
                &format!("Function \"{}\" called on unknown object", display_name),
            );
            return self.backend.default_value(kind);
        }

        let (owner, metadata) = self.resolve_function(call, kind);
        let Some(metadata) = metadata else {
            if self.registry.has_any_expression(&owner, &call.function_name) {
                return self.type_mismatch(
                    &format!("The function \"{}\" does not return the expected kind of value", display_name),
                    kind,
                );
            }
            self.report(
                E_UNKNOWN_EXPRESSION,
                &format!("Unknown function \"{}\"", display_name),
            );
            return self.backend.default_value(kind);
        };
        self.add_includes(&metadata.include_files);

        let first_index = call.written_parameters_first_index();
        let arguments =
            self.expression_parameters_code(&metadata.parameters, &call.parameters, first_index, context);

        if let Some(generator) = metadata.custom_code_generator {
            return (generator.0)(&arguments);
        }

        let arguments = arguments.join(", ");
        if call.object_name.is_empty() {
            return format!("{}({})", metadata.function_name, arguments);
        }

        let member = self.instance_source(&call.object_name, context);
        let behavior_name = (!call.behavior_name.is_empty()).then_some(call.behavior_name.as_str());
        self.add_owner_includes(&member, behavior_name);
        context.objects_list_needed(&member);
        let list = context.object_list_name(&member);
        let backend = self.backend;
        let on_instance = |instance: String| {
            let target = if call.behavior_name.is_empty() {
                instance
            } else {
                backend.behavior_of(&instance, &call.behavior_name)
            };
            backend.member_call(&target, &metadata.function_name, &arguments)
        };

        if context.current_object() == Some(member.as_str()) {
            on_instance(backend.current_instance(&list))
        } else {
            backend.first_instance_or(
                &list,
                &on_instance(backend.first_instance(&list)),
                &backend.default_value(kind),
            )
        }
    }

    /// Arguments of a function call, for the declared parameters from
    /// `first_index` on. Written parameters fill the non code-only ones in
    /// order; missing or empty ones use their default value.
    fn expression_parameters_code(
        &mut self,
        parameters: &[ParameterMetadata],
        nodes: &[ExpressionNode],
        first_index: usize,
        context: &mut GenerationContext<'_>,
    ) -> Vec<String> {
        let mut written = nodes.iter();
        let mut last_object: Option<String> = None;
        let mut codes = Vec::new();

        for (index, parameter) in parameters.iter().enumerate() {
            if index < first_index {
                continue;
            }
            if parameter.code_only {
                let code = self.code_only_parameter_code(
                    parameter,
                    &[],
                    context,
                    InstructionSite::default(),
                );
                codes.push(code);
                continue;
            }

            let node = written.next().filter(|n| !n.is_empty());
            let code = match node {
                Some(node) => self.argument_code(parameter, node, &mut last_object, context),
                None => {
                    let default = Expression::new(&parameter.default_value);
                    let kind = parameter.param_type.expression_kind();
                    match kind {
                        Some(kind) => self.generate_expression_code(&default, kind, context),
                        None => quote(&parameter.default_value),
                    }
                }
            };
            codes.push(code);
        }
        codes
    }

    fn argument_code(
        &mut self,
        parameter: &ParameterMetadata,
        node: &ExpressionNode,
        last_object: &mut Option<String>,
        context: &mut GenerationContext<'_>,
    ) -> String {
        match &parameter.param_type {
            ParameterType::Expression => self.node_code(node, ValueKind::Number, context),
            ParameterType::String => self.node_code(node, ValueKind::String, context),
            ParameterType::SceneVariable
            | ParameterType::GlobalVariable
            | ParameterType::ObjectVariable => {
                let text = identifier_text(node).unwrap_or_default();
                self.variable_parameter_code(
                    &parameter.param_type,
                    node,
                    &text,
                    last_object.as_deref(),
                    context,
                )
            }
            parameter_type if parameter_type.is_object() => match identifier_text(node) {
                Some(name) => {
                    *last_object = Some(name.clone());
                    self.object_parameter_code(parameter_type, &name, context)
                }
                None => self.type_mismatch(
                    "An object name is expected here",
                    ValueKind::String,
                ),
            },
            _ => quote(&identifier_text(node).unwrap_or_default()),
        }
    }
}

/// Text of a node written as a bare name or a literal.
fn identifier_text(node: &ExpressionNode) -> Option<String> {
    match &node.kind {
        NodeKind::Identifier { name } => Some(name.clone()),
        NodeKind::Text { value } => Some(value.clone()),
        NodeKind::Number { value } => Some(value.clone()),
        _ => None,
    }
}
