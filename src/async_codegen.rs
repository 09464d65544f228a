//! Asynchronous continuations.
//!
//! An asynchronous action does not block: the actions and sub-events after
//! it are compiled into a callback function, and the action is given a value
//! calling that callback once it completes. Lists of objects living in the
//! current scope may be gone by then, so the picked instances the callback
//! reads are first copied into a long-lived container passed along with it.

use crate::codegen::{
    behavior_parameter_text, first_parameter_text, join_arguments, Callee, EventsCodeGenerator,
    InstructionSite,
};
use crate::context::GenerationContext;
use crate::error::{E_UNKNOWN_INSTRUCTION, E_UNKNOWN_OBJECT};
use crate::metadata::{InstructionMetadata, ParameterType};
use crate::model::{AsyncEvent, Instruction};

/// Name of the snapshot received by every callback.
pub const CALLBACK_OBJECTS_LIST: &str = "asyncObjectsList";

impl<'a> EventsCodeGenerator<'a> {
    /// Code scheduling the triggering action of `event`, its actions and
    /// sub-events running in a callback once the action is done.
    #[tracing::instrument(level = "trace", skip_all, fields(action = %event.instruction.instruction_type))]
    pub fn generate_async_event(
        &mut self,
        event: &AsyncEvent,
        context: &mut GenerationContext<'_>,
    ) -> String {
        let action = &event.instruction;
        let resolved = self.registry.action(&action.instruction_type);
        if !resolved.is_found() {
            self.report(
                E_UNKNOWN_INSTRUCTION,
                &format!("Unknown asynchronous action \"{}\"", action.instruction_type),
            );
            return self.backend.comment(&format!(
                "Unknown instruction \"{}\" - skipped with everything waiting for it.",
                action.instruction_type
            ));
        }
        let metadata = resolved.metadata;
        self.add_includes(&metadata.include_files);

        let id = self.next_callback_id();
        let callback_name = format!("asyncCallback{}", id);
        let container = format!("{}{}", CALLBACK_OBJECTS_LIST, id);
        let callback_value =
            self.backend
                .callback_value(&self.code_namespace, &callback_name, &container);

        // The trigger may pick objects itself: generate it before deciding
        // what the callback needs captured.
        let trigger = self.async_trigger_code(action, metadata, &callback_value, context);

        let mut callback_context = context.new_async_callback_child();
        let body = self.generate_actions_and_sub_events(
            &event.actions,
            &event.sub_events,
            &mut callback_context,
        );
        let declarations = self.declarations_code(&callback_context);
        let used = callback_context.into_used_objects();
        let callback = self.backend.callback_function(
            &self.code_namespace,
            &callback_name,
            &format!("{}{}", declarations, body),
        );
        self.code_outside_main.push(callback);

        let parent_container = context
            .is_inside_async_callback()
            .then_some(CALLBACK_OBJECTS_LIST);
        let mut code = self.backend.declare_snapshot(&container, parent_container);
        for object_name in &used {
            if context.is_already_picked(object_name)
                && !context.is_captured_by_async_ancestor(object_name)
            {
                let list = context.object_list_name(object_name);
                code.push_str(&self.backend.capture_objects(&container, object_name, &list));
            }
        }
        context.absorb_used_objects(used);

        code.push_str(&trigger);
        code
    }

    /// Call to the asynchronous action. The callback goes to its
    /// `continuation` parameter when it has one; otherwise the task returned
    /// by the action is handed to the scene's task manager.
    fn async_trigger_code(
        &mut self,
        action: &Instruction,
        metadata: &'a InstructionMetadata,
        callback_value: &str,
        context: &mut GenerationContext<'_>,
    ) -> String {
        let has_continuation = metadata
            .parameters
            .iter()
            .any(|p| p.param_type == ParameterType::Continuation);
        let continuation = has_continuation.then_some(callback_value);
        let function_name = if metadata.async_function_name.is_empty() {
            metadata.function_name.as_str()
        } else {
            metadata.async_function_name.as_str()
        };

        if !metadata.is_object_instruction() && !metadata.is_behavior_instruction() {
            let site = InstructionSite {
                continuation,
                ..Default::default()
            };
            let arguments =
                self.generate_parameters_code(&action.parameters, &metadata.parameters, context, site);
            let call = self.invoke(&Callee::Free(function_name), &arguments.join(", "));
            return if has_continuation {
                format!("{};\n", call)
            } else {
                self.backend.add_async_task(&call, callback_value)
            };
        }

        let object_name = first_parameter_text(action);
        if !self.resolver.has_object_or_group(&object_name) {
            self.report(
                E_UNKNOWN_OBJECT,
                &format!(
                    "Asynchronous action \"{}\" on unknown object \"{}\"",
                    action.instruction_type, object_name
                ),
            );
            return String::new();
        }
        let behavior_name = behavior_parameter_text(action, metadata);
        let first_argument = if behavior_name.is_some() { 2 } else { 1 };

        let mut tasks = Vec::new();
        let mut loops = String::new();
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
                inverted: false,
                continuation,
            };
            let arguments =
                self.generate_parameters_code(&action.parameters, &metadata.parameters, context, site);
            context.set_current_object(None);

            let call = self.invoke(
                &Callee::Member {
                    instance: &target,
                    method: function_name,
                },
                &join_arguments(&arguments, first_argument, &[]),
            );
            if has_continuation {
                loops.push_str(&self.backend.object_loop(&list, &format!("{};\n", call)));
            } else {
                tasks.push((list, call));
            }
        }

        if has_continuation {
            loops
        } else {
            self.backend.add_async_task_group(&tasks, callback_value)
        }
    }
}
