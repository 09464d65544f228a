//! Events and instructions code generator.
//!
//! Walks a (preprocessed) events tree and emits target statements for every
//! condition, action and sub-event, consulting the metadata registry for the
//! shape of each call. Expressions are handled in
//! [`crate::expression_codegen`], asynchronous continuations in
//! [`crate::async_codegen`].

use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use crate::backend::{Backend, ListInit};
use crate::compile::{CompilationOutput, CompileOptions};
use crate::context::{GenerationContext, ListSource};
use crate::error::{
    CompilerError, E_ASYNC_IN_CONDITION, E_INVALID_OPERATOR, E_MALFORMED_EXPRESSION,
    E_UNKNOWN_INSTRUCTION, E_UNKNOWN_OBJECT,
};
use crate::metadata::{
    AccessType, CustomCodeGenerator, InstructionMetadata, ParameterMetadata, ParameterType,
    ValueKind,
};
use crate::model::{
    is_disabled, is_executable, source_path, AsyncEvent, Event, Expression, ForEachEvent, Instruction,
};
use crate::naming::{mangle_name, object_list_name, quote};
use crate::project::ExpressionTypeResolver;
use crate::registry::MetadataRegistry;

/// Once ids stay below 2^53 so the JavaScript runtime represents them exactly.
const ONCE_ID_MASK: u64 = (1 << 53) - 1;

const RELATIONAL_OPERATORS: &[&str] = &[
    "=", "==", "!=", "<", ">", "<=", ">=", "startsWith", "endsWith", "contains",
];

const OPERATORS: &[&str] = &["=", "+", "-", "*", "/"];

// ═══════════════════════════════════════════════════════════════════════════════
// CALL SITES
// ═══════════════════════════════════════════════════════════════════════════════

/// What the parameters of an instruction are generated for.
#[derive(Debug, Clone, Copy, Default)]
pub struct InstructionSite<'s> {
    /// Object replacing the first parameter, when an instruction on a group
    /// is generated for one of its members.
    pub object: Option<&'s str>,
    pub inverted: bool,
    /// Callback to pass to a `continuation` parameter.
    pub continuation: Option<&'s str>,
}

/// Function a generated call goes to.
#[derive(Debug, Clone, Copy)]
pub enum Callee<'c> {
    Free(&'c str),
    Member { instance: &'c str, method: &'c str },
}

impl Callee<'_> {
    fn is_empty(&self) -> bool {
        match self {
            Callee::Free(function) => function.is_empty(),
            Callee::Member { method, .. } => method.is_empty(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GENERATOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Generates the code of one layout. A generator is used for a single
/// compilation and then turned into a [`CompilationOutput`].
pub struct EventsCodeGenerator<'a> {
    pub(crate) registry: &'a MetadataRegistry,
    pub(crate) backend: &'a dyn Backend,
    pub(crate) resolver: &'a dyn ExpressionTypeResolver,
    layout_name: String,
    pub(crate) code_namespace: String,
    emit_comments: bool,
    includes: BTreeSet<String>,
    error_occurred: bool,
    diagnostics: Vec<CompilerError>,
    pub(crate) code_outside_main: Vec<String>,
    event_path: Vec<usize>,
    once_ids: BTreeSet<u64>,
    last_callback_id: usize,
    last_unique_id: usize,
}

impl<'a> EventsCodeGenerator<'a> {
    pub fn new(
        registry: &'a MetadataRegistry,
        resolver: &'a dyn ExpressionTypeResolver,
        layout_name: &str,
        options: &CompileOptions,
    ) -> Self {
        EventsCodeGenerator {
            registry,
            backend: options.target.backend(),
            resolver,
            layout_name: layout_name.to_string(),
            code_namespace: format!(
                "{}{}Code",
                options.code_namespace.as_deref().unwrap_or(""),
                mangle_name(layout_name)
            ),
            emit_comments: options.emit_comments,
            includes: BTreeSet::new(),
            error_occurred: false,
            diagnostics: Vec::new(),
            code_outside_main: Vec::new(),
            event_path: Vec::new(),
            once_ids: BTreeSet::new(),
            last_callback_id: 0,
            last_unique_id: 0,
        }
    }

    pub fn registry(&self) -> &'a MetadataRegistry {
        self.registry
    }

    pub fn backend(&self) -> &'a dyn Backend {
        self.backend
    }

    pub fn resolver(&self) -> &'a dyn ExpressionTypeResolver {
        self.resolver
    }

    pub fn layout_name(&self) -> &str {
        &self.layout_name
    }

    pub fn code_namespace(&self) -> &str {
        &self.code_namespace
    }

    pub fn error_occurred(&self) -> bool {
        self.error_occurred
    }

    pub fn diagnostics(&self) -> &[CompilerError] {
        &self.diagnostics
    }

    pub fn includes(&self) -> &BTreeSet<String> {
        &self.includes
    }

    pub fn code_outside_main(&self) -> &[String] {
        &self.code_outside_main
    }

    pub fn add_includes(&mut self, includes: &[String]) {
        for include in includes {
            if !include.is_empty() {
                self.includes.insert(include.clone());
            }
        }
    }

    /// Adds the files needed by the type of `object_name` and, when a
    /// behavior is named, by the type of that behavior of the object.
    pub(crate) fn add_owner_includes(&mut self, object_name: &str, behavior_name: Option<&str>) {
        let registry = self.registry;
        if let Some(object_type) = self.resolver.object_type(object_name) {
            self.add_includes(&registry.object(&object_type).metadata.include_files);
        }
        let behavior_type =
            behavior_name.and_then(|behavior| self.resolver.behavior_type(object_name, behavior));
        if let Some(behavior_type) = behavior_type {
            self.add_includes(&registry.behavior(&behavior_type).metadata.include_files);
        }
    }

    /// Records a non-fatal problem at the current event and sets the error
    /// flag. Generation goes on with a neutral fallback.
    pub fn report(&mut self, code: &str, message: &str) {
        tracing::warn!(layout = %self.layout_name, code = %code, path = ?self.event_path, "{}", message);
        self.error_occurred = true;
        self.diagnostics
            .push(CompilerError::new(code, message, &self.layout_name, &self.event_path));
    }

    /// Adds diagnostics found before generation (e.g. while expanding links).
    pub fn extend_diagnostics(&mut self, diagnostics: Vec<CompilerError>) {
        if !diagnostics.is_empty() {
            self.error_occurred = true;
        }
        self.diagnostics.extend(diagnostics);
    }

    /// Fresh number for temporaries that must not clash in one layout.
    pub fn unique_id(&mut self) -> usize {
        self.last_unique_id += 1;
        self.last_unique_id
    }

    pub(crate) fn next_callback_id(&mut self) -> usize {
        self.last_callback_id += 1;
        self.last_callback_id
    }

    /// Id for a `Once` condition. Derived from the layout name and the path
    /// of the current event, so regenerating unchanged events keeps it.
    pub fn next_once_id(&mut self) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.layout_name.as_bytes());
        for index in &self.event_path {
            hasher.update((*index as u64).to_le_bytes());
        }
        let digest = hasher.finalize();
        let mut id = digest[..8]
            .iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
            & ONCE_ID_MASK;
        while !self.once_ids.insert(id) {
            id = (id + 1) & ONCE_ID_MASK;
        }
        id
    }

    /// Wraps `main_body` into the compilation unit of the layout.
    pub fn finish(self, main_body: &str) -> CompilationOutput {
        let includes: Vec<String> = self.includes.into_iter().collect();
        let code = self.backend.compilation_unit(
            &self.code_namespace,
            &includes,
            &self.code_outside_main,
            main_body,
        );
        CompilationOutput {
            layout: self.layout_name,
            code,
            includes,
            has_errors: self.error_occurred,
            diagnostics: self.diagnostics,
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // EVENTS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Code of a list of events, each in its own block and scope.
    pub fn generate_events_list_code(
        &mut self,
        events: &[Event],
        parent: &mut GenerationContext<'_>,
    ) -> String {
        let mut code = String::new();
        for (index, event) in events.iter().enumerate() {
            if let Event::Comment(comment) = event {
                if self.emit_comments && !comment.comment.is_empty() {
                    code.push_str(&self.backend.comment(&comment.comment));
                }
                continue;
            }
            if !is_executable(event) || is_disabled(event) {
                continue;
            }

            let path = match source_path(event) {
                [] => {
                    let mut path = self.event_path.clone();
                    path.push(index);
                    path
                }
                recorded => recorded.to_vec(),
            };
            let enclosing_path = std::mem::replace(&mut self.event_path, path);
            let mut context = parent.new_child();
            let body = self.generate_event_code(event, &mut context);
            let declarations = self.declarations_code(&context);
            let used = context.into_used_objects();
            parent.absorb_used_objects(used);
            self.event_path = enclosing_path;

            code.push_str("\n{\n");
            code.push_str(&declarations);
            code.push_str(&body);
            code.push_str("}\n");
        }
        code
    }

    fn generate_event_code(&mut self, event: &Event, context: &mut GenerationContext<'_>) -> String {
        match event {
            Event::Standard(standard) => self.generate_standard_event(
                &standard.conditions,
                &standard.actions,
                &standard.sub_events,
                context,
            ),
            Event::ForEach(for_each) => self.generate_for_each_event(for_each, context),
            Event::Async(async_event) => self.generate_async_event(async_event, context),
            Event::Link(_) | Event::Comment(_) | Event::Empty => String::new(),
        }
    }

    /// Conditions, then the actions and sub-events gated by all of them.
    fn generate_standard_event(
        &mut self,
        conditions: &[Instruction],
        actions: &[Instruction],
        sub_events: &[Event],
        context: &mut GenerationContext<'_>,
    ) -> String {
        let mut code = self.generate_conditions_list_code(conditions, context);
        let predicate = self.conditions_predicate(conditions, context);
        let body = self.generate_actions_and_sub_events(actions, sub_events, context);
        if predicate.is_empty() {
            code.push_str(&body);
        } else {
            code.push_str(&format!("if ({}) {{\n{}}}\n", predicate, body));
        }
        code
    }

    /// Actions then sub-events. An asynchronous action turns itself, the
    /// actions after it and the sub-events into a continuation.
    pub(crate) fn generate_actions_and_sub_events(
        &mut self,
        actions: &[Instruction],
        sub_events: &[Event],
        context: &mut GenerationContext<'_>,
    ) -> String {
        let split = actions
            .iter()
            .position(|action| !action.disabled && self.is_async_action(action));
        match split {
            Some(index) => {
                let mut code = self.generate_actions_list_code(&actions[..index], context);
                let continuation = AsyncEvent {
                    disabled: false,
                    instruction: actions[index].clone(),
                    actions: actions[index + 1..].to_vec(),
                    sub_events: sub_events.to_vec(),
                    source_path: self.event_path.clone(),
                };
                code.push_str(&self.generate_async_event(&continuation, context));
                code
            }
            None => {
                let mut code = self.generate_actions_list_code(actions, context);
                code.push_str(&self.generate_events_list_code(sub_events, context));
                code
            }
        }
    }

    pub fn is_async_action(&self, action: &Instruction) -> bool {
        self.registry
            .action(&action.instruction_type)
            .metadata
            .is_async_when(action.awaited)
    }

    /// One loop per object (group members included), each iteration running
    /// the event with a list holding only the current instance.
    fn generate_for_each_event(
        &mut self,
        event: &ForEachEvent,
        context: &mut GenerationContext<'_>,
    ) -> String {
        let object_name = event.object.text().trim().to_string();
        if !self.resolver.has_object_or_group(&object_name) {
            self.report(
                E_UNKNOWN_OBJECT,
                &format!("For each event on unknown object \"{}\"", object_name),
            );
            return String::new();
        }
        let members = self.resolver.expand_object_name(&object_name);
        for member in &members {
            context.objects_list_needed(member);
        }

        let index = format!("forEachIndex{}", context.depth() + 1);
        let mut code = String::new();
        for member in &members {
            let list = context.object_list_name(member);
            let mut body_context = context.new_child();
            body_context.declare_element(member, &index);
            for other in members.iter().filter(|m| *m != member) {
                body_context.declare_empty(other);
            }
            let body = self.generate_standard_event(
                &event.conditions,
                &event.actions,
                &event.sub_events,
                &mut body_context,
            );
            let declarations = self.declarations_code(&body_context);
            let used = body_context.into_used_objects();
            context.absorb_used_objects(used);
            code.push_str(
                &self
                    .backend
                    .for_each_loop(&index, &list, &format!("{}{}", declarations, body)),
            );
        }
        code
    }

    /// Declarations of every objects list of a scope, to be put at the top
    /// of its block.
    pub fn declarations_code(&self, context: &GenerationContext<'_>) -> String {
        let mut code = String::new();
        for declaration in context.declarations() {
            let name = &declaration.object_name;
            let list = object_list_name(name, context.depth());
            let source_list = match &declaration.source {
                ListSource::Parent { depth } | ListSource::Element { depth, .. } => {
                    object_list_name(name, *depth)
                }
                _ => String::new(),
            };
            let init = match &declaration.source {
                ListSource::Scene => ListInit::Scene(name),
                ListSource::Empty => ListInit::Empty,
                ListSource::Parent { .. } => ListInit::Copy(&source_list),
                ListSource::Element { index_variable, .. } => ListInit::Element {
                    list: &source_list,
                    index: index_variable,
                },
                ListSource::AsyncSnapshot => ListInit::AsyncSnapshot(name),
            };
            code.push_str(&self.backend.declare_objects_list(&list, &init));
        }
        code
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CONDITIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Name of the boolean receiving the result of the condition at `index`.
    pub fn condition_boolean(&self, index: usize, context: &GenerationContext<'_>) -> String {
        match context.condition_depth() {
            0 => format!("condition{}IsTrue", index),
            depth => format!("condition{}IsTrue_{}", index, depth),
        }
    }

    /// Declares one boolean per condition, then computes each of them. Every
    /// condition runs whatever the result of the previous ones: they may pick
    /// objects.
    pub fn generate_conditions_list_code(
        &mut self,
        conditions: &[Instruction],
        context: &mut GenerationContext<'_>,
    ) -> String {
        let conditions: Vec<&Instruction> = conditions.iter().filter(|c| !c.disabled).collect();
        let mut code = String::new();
        for index in 0..conditions.len() {
            code.push_str(
                &self
                    .backend
                    .declare_boolean(&self.condition_boolean(index, context)),
            );
        }
        for (index, condition) in conditions.iter().enumerate() {
            let output = self.condition_boolean(index, context);
            let condition_code = self.generate_condition_code(condition, &output, context);
            code.push_str("{\n");
            code.push_str(&condition_code);
            code.push_str("}\n");
        }
        code
    }

    /// Conjunction of the booleans of the conditions, empty when there is
    /// no condition.
    pub fn conditions_predicate(
        &self,
        conditions: &[Instruction],
        context: &GenerationContext<'_>,
    ) -> String {
        let count = conditions.iter().filter(|c| !c.disabled).count();
        (0..count)
            .map(|index| self.condition_boolean(index, context))
            .collect::<Vec<_>>()
            .join(" && ")
    }

    /// Code assigning the result of `condition` to the boolean `output`.
    pub fn generate_condition_code(
        &mut self,
        condition: &Instruction,
        output: &str,
        context: &mut GenerationContext<'_>,
    ) -> String {
        let resolved = self.registry.condition(&condition.instruction_type);
        if !resolved.is_found() {
            self.report(
                E_UNKNOWN_INSTRUCTION,
                &format!("Unknown condition \"{}\"", condition.instruction_type),
            );
            return format!("{} = true;\n", output);
        }
        let metadata = resolved.metadata;
        self.add_includes(&metadata.include_files);
        if metadata.is_async {
            self.report(
                E_ASYNC_IN_CONDITION,
                &format!(
                    "Asynchronous instruction \"{}\" used as a condition",
                    condition.instruction_type
                ),
            );
        }

        if let Some(CustomCodeGenerator::Condition(generate)) = metadata.custom_code_generator {
            let mut code = generate(condition, self, context, output);
            if condition.inverted {
                code.push_str(&format!("{} = !{};\n", output, output));
            }
            return code;
        }

        if metadata.is_object_instruction() || metadata.is_behavior_instruction() {
            return self.generate_object_condition(condition, metadata, output, context);
        }

        let site = InstructionSite {
            inverted: condition.inverted,
            ..Default::default()
        };
        let arguments =
            self.generate_parameters_code(&condition.parameters, &metadata.parameters, context, site);
        let predicate = self.predicate_call(
            metadata,
            &arguments,
            &Callee::Free(&metadata.function_name),
            0,
        );
        if condition.inverted {
            format!("{} = !({});\n", output, predicate)
        } else {
            format!("{} = {};\n", output, predicate)
        }
    }

    /// Filters the list of every object the condition is about, keeping the
    /// instances for which it holds (or does not, when inverted).
    fn generate_object_condition(
        &mut self,
        condition: &Instruction,
        metadata: &'a InstructionMetadata,
        output: &str,
        context: &mut GenerationContext<'_>,
    ) -> String {
        let object_name = first_parameter_text(condition);
        if !self.resolver.has_object_or_group(&object_name) {
            self.report(
                E_UNKNOWN_OBJECT,
                &format!(
                    "Condition \"{}\" on unknown object \"{}\"",
                    condition.instruction_type, object_name
                ),
            );
            return format!("{} = false;\n", output);
        }
        let behavior_name = behavior_parameter_text(condition, metadata);
        let first_argument = if behavior_name.is_some() { 2 } else { 1 };

        let mut code = format!("{} = false;\n", output);
        for member in self.resolver.expand_object_name(&object_name) {
            self.add_owner_includes(&member, behavior_name.as_deref());
            context.objects_list_needed(&member);
            context.mark_filtered(&member);
            let list = context.object_list_name(&member);
            let instance = self.backend.current_instance(&list);
            let target = match &behavior_name {
                Some(behavior) => self.backend.behavior_of(&instance, behavior),
                None => instance,
            };

            context.set_current_object(Some(&member));
            let site = InstructionSite {
                object: Some(&member),
                inverted: condition.inverted,
                continuation: None,
            };
            let arguments = self.generate_parameters_code(
                &condition.parameters,
                &metadata.parameters,
                context,
                site,
            );
            context.set_current_object(None);

            let callee = Callee::Member {
                instance: &target,
                method: &metadata.function_name,
            };
            let predicate = self.predicate_call(metadata, &arguments, &callee, first_argument);
            let predicate = if condition.inverted {
                format!("!({})", predicate)
            } else {
                predicate
            };
            code.push_str(&self.backend.object_filter_loop(&list, &predicate, output));
        }
        code
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn generate_actions_list_code(
        &mut self,
        actions: &[Instruction],
        context: &mut GenerationContext<'_>,
    ) -> String {
        let mut code = String::new();
        for action in actions.iter().filter(|a| !a.disabled) {
            let action_code = self.generate_action_code(action, context);
            code.push_str("{\n");
            code.push_str(&action_code);
            code.push_str("}\n");
        }
        code
    }

    pub fn generate_action_code(
        &mut self,
        action: &Instruction,
        context: &mut GenerationContext<'_>,
    ) -> String {
        let resolved = self.registry.action(&action.instruction_type);
        if !resolved.is_found() {
            self.report(
                E_UNKNOWN_INSTRUCTION,
                &format!("Unknown action \"{}\"", action.instruction_type),
            );
            return self.backend.comment(&format!(
                "Unknown instruction \"{}\" - skipped.",
                action.instruction_type
            ));
        }
        let metadata = resolved.metadata;
        self.add_includes(&metadata.include_files);

        if let Some(CustomCodeGenerator::Action(generate)) = metadata.custom_code_generator {
            return generate(action, self, context);
        }

        if metadata.is_object_instruction() || metadata.is_behavior_instruction() {
            return self.generate_object_action(action, metadata, context);
        }

        let arguments = self.generate_parameters_code(
            &action.parameters,
            &metadata.parameters,
            context,
            InstructionSite::default(),
        );
        self.action_call(metadata, &arguments, &Callee::Free(&metadata.function_name), 0)
    }

    /// Runs the action on every picked instance of every object it is about.
    fn generate_object_action(
        &mut self,
        action: &Instruction,
        metadata: &'a InstructionMetadata,
        context: &mut GenerationContext<'_>,
    ) -> String {
        let object_name = first_parameter_text(action);
        if !self.resolver.has_object_or_group(&object_name) {
            self.report(
                E_UNKNOWN_OBJECT,
                &format!(
                    "Action \"{}\" on unknown object \"{}\"",
                    action.instruction_type, object_name
                ),
            );
            return String::new();
        }
        let behavior_name = behavior_parameter_text(action, metadata);
        let first_argument = if behavior_name.is_some() { 2 } else { 1 };

        let mut code = String::new();
        for member in self.resolver.expand_object_name(&object_name) {
            self.add_owner_includes(&member, behavior_name.as_deref());
            context.objects_list_needed(&member);
            let list = context.object_list_name(&member);
            let instance = self.backend.current_instance(&list);
            let target = match &behavior_name {
                Some(behavior) => self.backend.behavior_of(&instance, behavior),
                None => instance,
            };

            context.set_current_object(Some(&member));
            let site = InstructionSite {
                object: Some(&member),
                ..Default::default()
            };
            let arguments =
                self.generate_parameters_code(&action.parameters, &metadata.parameters, context, site);
            context.set_current_object(None);

            let callee = Callee::Member {
                instance: &target,
                method: &metadata.function_name,
            };
            let statement = self.action_call(metadata, &arguments, &callee, first_argument);
            code.push_str(&self.backend.object_loop(&list, &statement));
        }
        code
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // CALL SHAPES
    // ═══════════════════════════════════════════════════════════════════════════

    pub(crate) fn invoke(&self, callee: &Callee<'_>, arguments: &str) -> String {
        match callee {
            Callee::Free(function) => format!("{}({})", function, arguments),
            Callee::Member { instance, method } => {
                self.backend.member_call(instance, method, arguments)
            }
        }
    }

    /// Boolean expression of a condition: a plain call, or the comparison of
    /// the value returned by the call when the condition has a relational
    /// operator.
    pub fn predicate_call(
        &self,
        metadata: &InstructionMetadata,
        arguments: &[String],
        callee: &Callee<'_>,
        first_argument: usize,
    ) -> String {
        let operator_index = metadata
            .parameters
            .iter()
            .position(|p| p.param_type == ParameterType::RelationalOperator);
        let (Some(kind), Some(operator_index)) = (metadata.manipulated_type, operator_index) else {
            return self.invoke(callee, &join_arguments(arguments, first_argument, &[]));
        };

        let others = join_arguments(arguments, first_argument, &[operator_index, operator_index + 1]);
        let lhs = if callee.is_empty() {
            others
        } else {
            self.invoke(callee, &others)
        };
        let operator = unquote(arguments.get(operator_index).map(String::as_str).unwrap_or("\"=\""));
        let rhs = arguments
            .get(operator_index + 1)
            .cloned()
            .unwrap_or_else(|| self.backend.default_value(kind));
        self.backend.relational(&lhs, operator, &rhs, kind)
    }

    /// Statement of an action: a plain call, or an assignment through the
    /// access type declared by the metadata when the action has an operator.
    pub fn action_call(
        &self,
        metadata: &InstructionMetadata,
        arguments: &[String],
        callee: &Callee<'_>,
        first_argument: usize,
    ) -> String {
        let operator_index = metadata
            .parameters
            .iter()
            .position(|p| p.param_type == ParameterType::Operator);
        let (Some(kind), Some(operator_index)) = (metadata.manipulated_type, operator_index) else {
            return format!(
                "{};\n",
                self.invoke(callee, &join_arguments(arguments, first_argument, &[]))
            );
        };

        let others = join_arguments(arguments, first_argument, &[operator_index, operator_index + 1]);
        let operator = unquote(arguments.get(operator_index).map(String::as_str).unwrap_or("\"=\""));
        let rhs = arguments
            .get(operator_index + 1)
            .cloned()
            .unwrap_or_else(|| self.backend.default_value(kind));

        match &metadata.access {
            AccessType::Call => format!(
                "{};\n",
                self.invoke(callee, &join_arguments(arguments, first_argument, &[]))
            ),
            AccessType::Reference => {
                let compound = crate::backend::compound_operator(operator).unwrap_or("=");
                format!("{} {} ({});\n", self.invoke(callee, &others), compound, rhs)
            }
            AccessType::MutatorAndOrAccessor { getter } => {
                let value = if operator == "=" {
                    rhs
                } else {
                    let getter_callee = match callee {
                        Callee::Free(_) => Callee::Free(getter),
                        Callee::Member { instance, .. } => Callee::Member {
                            instance,
                            method: getter,
                        },
                    };
                    format!("{} {} ({})", self.invoke(&getter_callee, &others), operator, rhs)
                };
                let arguments = if others.is_empty() {
                    value
                } else {
                    format!("{}, {}", others, value)
                };
                format!("{};\n", self.invoke(callee, &arguments))
            }
            AccessType::Mutators { mutators } => {
                let mutator = mutators
                    .get(operator)
                    .or_else(|| mutators.get("="))
                    .map(String::as_str)
                    .unwrap_or("setValue");
                let target = if callee.is_empty() {
                    others
                } else {
                    self.invoke(callee, &others)
                };
                format!("{}.{}({});\n", target, mutator, rhs)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PARAMETERS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Code of every declared parameter of an instruction, in declaration
    /// order. Supplied values fill the non code-only parameters; missing ones
    /// use their default value, surplus ones are ignored.
    pub fn generate_parameters_code(
        &mut self,
        parameters: &[Expression],
        metadata: &[ParameterMetadata],
        context: &mut GenerationContext<'_>,
        site: InstructionSite<'_>,
    ) -> Vec<String> {
        let defaults: Vec<Expression> = metadata
            .iter()
            .map(|p| Expression::new(&p.default_value))
            .collect();
        let mut supplied = parameters.iter();
        let values: Vec<Option<&Expression>> = metadata
            .iter()
            .zip(&defaults)
            .map(|(parameter, default)| {
                if parameter.code_only {
                    return None;
                }
                match supplied.next() {
                    Some(value) if !(parameter.optional && value.text().trim().is_empty()) => {
                        Some(value)
                    }
                    _ => Some(default),
                }
            })
            .collect();

        let mut last_object: Option<String> = None;
        let mut codes = Vec::with_capacity(metadata.len());
        for (index, parameter) in metadata.iter().enumerate() {
            let code = match values[index] {
                Some(value) => {
                    self.parameter_code(parameter, value, index, context, site, &mut last_object)
                }
                None => self.code_only_parameter_code(parameter, &values, context, site),
            };
            codes.push(code);
        }
        codes
    }

    fn parameter_code(
        &mut self,
        parameter: &ParameterMetadata,
        value: &Expression,
        index: usize,
        context: &mut GenerationContext<'_>,
        site: InstructionSite<'_>,
        last_object: &mut Option<String>,
    ) -> String {
        let text = value.text().trim();
        match &parameter.param_type {
            ParameterType::Expression => {
                self.generate_expression_code(value, ValueKind::Number, context)
            }
            ParameterType::String => self.generate_expression_code(value, ValueKind::String, context),
            ParameterType::Object
            | ParameterType::ObjectList
            | ParameterType::ObjectListWithoutPicking
            | ParameterType::ObjectPtr => {
                let name = match site.object {
                    Some(member) if index == 0 => member,
                    _ => text,
                };
                *last_object = Some(name.to_string());
                self.object_parameter_code(&parameter.param_type, name, context)
            }
            ParameterType::Behavior | ParameterType::Key | ParameterType::Mouse => {
                quote(unquote(text))
            }
            ParameterType::RelationalOperator => {
                let operator = self.checked_operator(text, RELATIONAL_OPERATORS);
                quote(operator)
            }
            ParameterType::Operator => {
                let operator = self.checked_operator(text, OPERATORS);
                quote(operator)
            }
            ParameterType::SceneVariable
            | ParameterType::GlobalVariable
            | ParameterType::ObjectVariable => {
                let node = value.ast(ValueKind::Number);
                self.variable_parameter_code(
                    &parameter.param_type,
                    node,
                    text,
                    last_object.as_deref(),
                    context,
                )
            }
            ParameterType::YesOrNo => (text == "yes").to_string(),
            ParameterType::TrueOrFalse => text.eq_ignore_ascii_case("true").to_string(),
            ParameterType::CurrentScene
            | ParameterType::ConditionInverted
            | ParameterType::InlineCode
            | ParameterType::Continuation => {
                self.code_only_parameter_code(parameter, &[], context, site)
            }
            ParameterType::Unknown(type_name) => {
                tracing::warn!(
                    layout = %self.layout_name,
                    parameter_type = %type_name,
                    "unknown parameter type, passing the value as a string"
                );
                quote(text)
            }
        }
    }

    /// Code of a parameter the user never writes.
    pub(crate) fn code_only_parameter_code(
        &mut self,
        parameter: &ParameterMetadata,
        values: &[Option<&Expression>],
        context: &mut GenerationContext<'_>,
        site: InstructionSite<'_>,
    ) -> String {
        match &parameter.param_type {
            ParameterType::CurrentScene => self.backend.current_scene(),
            ParameterType::ConditionInverted => site.inverted.to_string(),
            ParameterType::InlineCode => parameter.extra_info.clone(),
            ParameterType::Continuation => site
                .continuation
                .map(str::to_string)
                .unwrap_or_else(|| self.backend.null_literal()),
            ParameterType::Object
            | ParameterType::ObjectList
            | ParameterType::ObjectListWithoutPicking
            | ParameterType::ObjectPtr => {
                // extra_info holds the index of the parameter naming the object.
                let object_name = parameter
                    .extra_info
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| values.get(i).copied().flatten())
                    .map(|v| v.text().trim().to_string());
                match object_name {
                    Some(name) => {
                        let name = match site.object {
                            Some(member) => member.to_string(),
                            None => name,
                        };
                        self.object_parameter_code(&parameter.param_type, &name, context)
                    }
                    None => self.backend.null_literal(),
                }
            }
            other => {
                tracing::warn!(
                    layout = %self.layout_name,
                    parameter_type = %other,
                    "code-only parameter of a type without generated value"
                );
                quote(&parameter.extra_info)
            }
        }
    }

    /// Code of a parameter naming an object (or group).
    pub(crate) fn object_parameter_code(
        &mut self,
        parameter_type: &ParameterType,
        object_name: &str,
        context: &mut GenerationContext<'_>,
    ) -> String {
        match parameter_type {
            ParameterType::ObjectList | ParameterType::ObjectListWithoutPicking => {
                if !self.resolver.has_object_or_group(object_name) {
                    self.report(
                        E_UNKNOWN_OBJECT,
                        &format!("Unknown object \"{}\"", object_name),
                    );
                    return self.backend.objects_map(&[]);
                }
                let without_picking = *parameter_type == ParameterType::ObjectListWithoutPicking;
                let mut entries = Vec::new();
                for member in self.resolver.expand_object_name(object_name) {
                    if without_picking && context.should_generate_filtering_code(&member) {
                        context.empty_objects_list_needed(&member);
                    } else {
                        context.objects_list_needed(&member);
                    }
                    let list = context.object_list_name(&member);
                    entries.push((member, list));
                }
                self.backend.objects_map(&entries)
            }
            ParameterType::ObjectPtr => {
                let members = self.resolver.expand_object_name(object_name);
                let member = match context.current_object() {
                    Some(current) if members.iter().any(|m| m == current) => current.to_string(),
                    _ => members
                        .first()
                        .cloned()
                        .unwrap_or_else(|| object_name.to_string()),
                };
                context.objects_list_needed(&member);
                let list = context.object_list_name(&member);
                if context.current_object() == Some(member.as_str()) {
                    self.backend.current_instance(&list)
                } else {
                    self.backend.first_instance_or_null(&list)
                }
            }
            _ => quote(object_name),
        }
    }

    fn checked_operator<'o>(&mut self, text: &'o str, allowed: &[&str]) -> &'o str {
        let operator = unquote(text);
        if allowed.contains(&operator) {
            return operator;
        }
        self.report(
            E_INVALID_OPERATOR,
            &format!("Invalid operator \"{}\", using \"=\" instead", text),
        );
        "="
    }

    /// Object names referenced by a list of conditions and their
    /// sub-conditions, groups expanded.
    pub fn objects_picked_by(&self, conditions: &[Instruction]) -> BTreeSet<String> {
        let mut objects = BTreeSet::new();
        for condition in conditions.iter().filter(|c| !c.disabled) {
            let metadata = self.registry.condition(&condition.instruction_type).metadata;
            let mut supplied = condition.parameters.iter();
            for parameter in &metadata.parameters {
                if parameter.code_only {
                    continue;
                }
                let value = supplied.next();
                if let (true, Some(value)) = (parameter.param_type.is_object(), value) {
                    let name = value.text().trim();
                    if self.resolver.has_object_or_group(name) {
                        objects.extend(self.resolver.expand_object_name(name));
                    }
                }
            }
            objects.extend(self.objects_picked_by(&condition.sub_instructions));
        }
        objects
    }

    /// Reports an expression that could not be parsed and returns the neutral
    /// value of `kind`.
    pub(crate) fn malformed_expression(&mut self, text: &str, message: &str, kind: ValueKind) -> String {
        self.report(
            E_MALFORMED_EXPRESSION,
            &format!("Invalid expression \"{}\": {}", text, message),
        );
        self.backend.default_value(kind)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

pub(crate) fn first_parameter_text(instruction: &Instruction) -> String {
    instruction
        .parameter(0)
        .map(|p| p.text().trim().to_string())
        .unwrap_or_default()
}

/// Name of the behavior a behavior instruction is about (its second
/// parameter).
pub(crate) fn behavior_parameter_text(instruction: &Instruction, metadata: &InstructionMetadata) -> Option<String> {
    if !metadata.is_behavior_instruction() {
        return None;
    }
    Some(
        instruction
            .parameter(1)
            .map(|p| unquote(p.text().trim()).to_string())
            .unwrap_or_default(),
    )
}

/// Arguments from `first` on, skipping the declared indices in `skip`.
pub(crate) fn join_arguments(arguments: &[String], first: usize, skip: &[usize]) -> String {
    arguments
        .iter()
        .enumerate()
        .skip(first)
        .filter(|(index, _)| !skip.contains(index))
        .map(|(_, code)| code.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `text` without one pair of surrounding double quotes.
fn unquote(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

