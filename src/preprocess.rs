//! Events preprocessing.
//!
//! Runs on a copy of the events of a layout before generation: links are
//! replaced by the events they point to, disabled events and instructions
//! are dropped (or re-enabled when compiling everything), and events that
//! never produce code are removed. Kept events remember where they were
//! written, so diagnostics and `Once` ids do not depend on what was removed
//! before them.

use crate::compile::CompileOptions;
use crate::error::{CompilerError, E_RECURSIVE_LINK, E_UNRESOLVED_LINK};
use crate::model::{Event, EventsList, Instruction, LinkEvent};
use crate::project::Project;

/// Events of `layout_name` ready for generation. Problems found on the way
/// (missing or recursive links) are pushed to `diagnostics`.
pub fn preprocess_events(
    events: &[Event],
    project: &Project,
    layout_name: &str,
    options: &CompileOptions,
    diagnostics: &mut Vec<CompilerError>,
) -> EventsList {
    let mut preprocessor = Preprocessor {
        project,
        layout_name,
        options,
        diagnostics,
        link_stack: vec![layout_name.to_string()],
        path: Vec::new(),
    };
    preprocessor.events_list(events)
}

struct Preprocessor<'a> {
    project: &'a Project,
    layout_name: &'a str,
    options: &'a CompileOptions,
    diagnostics: &'a mut Vec<CompilerError>,
    /// Names of the events being expanded, outermost first.
    link_stack: Vec<String>,
    path: Vec<usize>,
}

impl Preprocessor<'_> {
    fn events_list(&mut self, events: &[Event]) -> EventsList {
        let mut result = Vec::with_capacity(events.len());
        for (index, event) in events.iter().enumerate() {
            self.path.push(index);
            self.event(event, &mut result);
            self.path.pop();
        }
        result
    }

    fn event(&mut self, event: &Event, output: &mut EventsList) {
        let keep_disabled = self.options.generate_disabled;
        match event {
            Event::Standard(standard) => {
                if standard.disabled && !keep_disabled {
                    return;
                }
                let mut standard = standard.clone();
                standard.disabled = false;
                standard.conditions = self.instructions(&standard.conditions);
                standard.actions = self.instructions(&standard.actions);
                standard.sub_events = self.events_list(&standard.sub_events);
                standard.source_path = self.path.clone();
                output.push(Event::Standard(standard));
            }
            Event::ForEach(for_each) => {
                if for_each.disabled && !keep_disabled {
                    return;
                }
                let mut for_each = for_each.clone();
                for_each.disabled = false;
                for_each.conditions = self.instructions(&for_each.conditions);
                for_each.actions = self.instructions(&for_each.actions);
                for_each.sub_events = self.events_list(&for_each.sub_events);
                for_each.source_path = self.path.clone();
                output.push(Event::ForEach(for_each));
            }
            Event::Async(async_event) => {
                if async_event.disabled && !keep_disabled {
                    return;
                }
                let mut async_event = async_event.clone();
                async_event.disabled = false;
                async_event.instruction.disabled = false;
                async_event.actions = self.instructions(&async_event.actions);
                async_event.sub_events = self.events_list(&async_event.sub_events);
                async_event.source_path = self.path.clone();
                output.push(Event::Async(async_event));
            }
            Event::Link(link) => {
                if link.disabled && !keep_disabled {
                    return;
                }
                self.link(link, output);
            }
            Event::Comment(_) => {
                if self.options.emit_comments {
                    output.push(event.clone());
                }
            }
            Event::Empty => {}
        }
    }

    fn instructions(&self, instructions: &[Instruction]) -> Vec<Instruction> {
        instructions
            .iter()
            .filter(|i| self.options.generate_disabled || !i.disabled)
            .map(|instruction| {
                let mut instruction = instruction.clone();
                instruction.disabled = false;
                instruction.sub_instructions = self.instructions(&instruction.sub_instructions);
                instruction
            })
            .collect()
    }

    /// Inlines the events a link points to, restricted to its range.
    fn link(&mut self, link: &LinkEvent, output: &mut EventsList) {
        if self.link_stack.iter().any(|name| *name == link.target) {
            self.report(
                E_RECURSIVE_LINK,
                &format!("Link to \"{}\" includes itself and was not expanded", link.target),
            );
            return;
        }
        let project = self.project;
        let Some(events) = project.linkable_events(&link.target) else {
            self.report(
                E_UNRESOLVED_LINK,
                &format!("Link to missing events \"{}\"", link.target),
            );
            return;
        };

        let included: &[Event] = match link.range {
            Some(range) if !events.is_empty() => {
                let end = range.end.min(events.len() - 1);
                if range.start > end {
                    &[]
                } else {
                    &events[range.start..=end]
                }
            }
            Some(_) => &[],
            None => events.as_slice(),
        };

        tracing::debug!(
            layout = %self.layout_name,
            link = %link.target,
            count = included.len(),
            "expanding link"
        );
        self.link_stack.push(link.target.clone());
        let expanded = self.events_list(included);
        self.link_stack.pop();
        output.extend(expanded);
    }

    fn report(&mut self, code: &str, message: &str) {
        tracing::warn!(layout = %self.layout_name, code = %code, "{}", message);
        self.diagnostics
            .push(CompilerError::new(code, message, self.layout_name, &self.path));
    }
}
