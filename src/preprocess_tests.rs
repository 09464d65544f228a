//! Link expansion and removal of disabled events before generation.

#[cfg(test)]
mod tests {
    use crate::compile::CompileOptions;
    use crate::error::{CompilerError, E_RECURSIVE_LINK, E_UNRESOLVED_LINK};
    use crate::model::{source_path, CommentEvent, Event, Instruction, LinkEvent, LinkRange, StandardEvent};
    use crate::preprocess::preprocess_events;
    use crate::project::{ExternalEvents, Project};
    use crate::test_support::*;

    fn link(target: &str, range: Option<(usize, usize)>) -> Event {
        Event::Link(LinkEvent {
            target: target.to_string(),
            range: range.map(|(start, end)| LinkRange { start, end }),
            ..Default::default()
        })
    }

    fn marker(distance: &str) -> Event {
        standard(vec![], vec![move_by("Player", distance)])
    }

    fn distances(events: &[Event]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::Standard(e) => e.actions.first().and_then(|a| a.parameter(1)).map(|p| p.text().to_string()),
                _ => None,
            })
            .collect()
    }

    fn with_external(events: Vec<Event>, external: Vec<(&str, Vec<Event>)>) -> Project {
        let mut project = project(events);
        for (name, events) in external {
            project.external_events.push(ExternalEvents {
                name: name.to_string(),
                events,
            });
        }
        project
    }

    fn run(project: &Project, options: &CompileOptions) -> (Vec<Event>, Vec<CompilerError>) {
        let mut diagnostics = Vec::new();
        let layout = project.layout(LAYOUT).expect("layout");
        let events = preprocess_events(&layout.events, project, LAYOUT, options, &mut diagnostics);
        (events, diagnostics)
    }

    #[test]
    fn test_link_is_replaced_by_the_linked_events() {
        init_tracing();
        let project = with_external(
            vec![marker("1"), link("Shared", None), marker("4")],
            vec![("Shared", vec![marker("2"), marker("3")])],
        );
        let (events, diagnostics) = run(&project, &CompileOptions::default());
        assert!(diagnostics.is_empty());
        assert_eq!(distances(&events), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_link_range_is_inclusive_and_clamped() {
        let shared = vec![marker("a"), marker("b"), marker("c")];
        let project = with_external(
            vec![link("Shared", Some((1, 10))), link("Shared", Some((0, 0))), link("Shared", Some((5, 8)))],
            vec![("Shared", shared)],
        );
        let (events, diagnostics) = run(&project, &CompileOptions::default());
        assert!(diagnostics.is_empty());
        assert_eq!(distances(&events), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_links_inside_linked_events_are_expanded() {
        let project = with_external(
            vec![link("Outer", None)],
            vec![
                ("Outer", vec![marker("1"), link("Inner", None)]),
                ("Inner", vec![marker("2")]),
            ],
        );
        let (events, _) = run(&project, &CompileOptions::default());
        assert_eq!(distances(&events), vec!["1", "2"]);
    }

    #[test]
    fn test_link_to_a_layout() {
        let mut project = with_external(vec![link("Menu", None)], vec![]);
        project.layouts.push(crate::project::Layout {
            name: "Menu".to_string(),
            events: vec![marker("9")],
            ..Default::default()
        });
        let (events, _) = run(&project, &CompileOptions::default());
        assert_eq!(distances(&events), vec!["9"]);
    }

    #[test]
    fn test_recursive_link_is_reported_once_and_skipped() {
        let project = with_external(
            vec![link("Loop", None)],
            vec![("Loop", vec![marker("1"), link("Loop", None)])],
        );
        let (events, diagnostics) = run(&project, &CompileOptions::default());
        assert_eq!(distances(&events), vec!["1"]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, E_RECURSIVE_LINK);
        assert_eq!(diagnostics[0].layout, LAYOUT);
    }

    #[test]
    fn test_link_back_to_the_compiled_layout_is_recursive() {
        let project = with_external(vec![marker("1"), link(LAYOUT, None)], vec![]);
        let (events, diagnostics) = run(&project, &CompileOptions::default());
        assert_eq!(distances(&events), vec!["1"]);
        assert_eq!(diagnostics[0].code, E_RECURSIVE_LINK);
        assert_eq!(diagnostics[0].event_path, vec![1]);
    }

    #[test]
    fn test_unresolved_link_is_reported() {
        let project = with_external(vec![link("Missing", None)], vec![]);
        let (events, diagnostics) = run(&project, &CompileOptions::default());
        assert!(events.is_empty());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, E_UNRESOLVED_LINK);
        assert!(diagnostics[0].message.contains("Missing"));
    }

    #[test]
    fn test_disabled_events_and_instructions_are_dropped() {
        let mut disabled_action = move_by("Player", "2");
        disabled_action.disabled = true;
        let events = vec![
            Event::Standard(StandardEvent {
                disabled: true,
                actions: vec![move_by("Player", "1")],
                ..Default::default()
            }),
            standard(vec![], vec![disabled_action, move_by("Player", "3")]),
        ];
        let project = project(events);

        let (kept, _) = run(&project, &CompileOptions::default());
        assert_eq!(kept.len(), 1);
        assert_eq!(distances(&kept), vec!["3"]);

        let options = CompileOptions {
            generate_disabled: true,
            ..Default::default()
        };
        let (everything, _) = run(&project, &options);
        assert_eq!(distances(&everything), vec!["1", "2"]);
        match &everything[1] {
            Event::Standard(e) => {
                assert_eq!(e.actions.len(), 2);
                assert!(e.actions.iter().all(|a| !a.disabled));
            }
            other => panic!("expected a standard event, got {:?}", other),
        }
    }

    #[test]
    fn test_comments_are_kept_only_when_emitted() {
        let comment = Event::Comment(CommentEvent {
            comment: "Setup".to_string(),
        });
        let project = project(vec![comment, Event::Empty]);

        let (events, _) = run(&project, &CompileOptions::default());
        assert!(events.is_empty());

        let options = CompileOptions {
            emit_comments: true,
            ..Default::default()
        };
        let (events, _) = run(&project, &options);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], Event::Comment(_)));
    }

    #[test]
    fn test_link_diagnostics_reach_the_compilation_output() {
        let project = with_external(vec![link("Missing", None)], vec![]);
        let registry = registry(crate::backend::Target::Js);
        let output = crate::compile::compile_layout(&project, LAYOUT, &registry, &CompileOptions::default())
            .expect("layout");
        assert!(output.has_errors);
        assert_eq!(output.diagnostics[0].code, E_UNRESOLVED_LINK);
    }

    #[test]
    fn test_kept_events_remember_where_they_were_written() {
        let disabled = Event::Standard(StandardEvent {
            disabled: true,
            ..Default::default()
        });
        let project = with_external(
            vec![disabled, link("Shared", None), with_sub_events(marker("3"), vec![marker("4")])],
            vec![("Shared", vec![marker("1"), marker("2")])],
        );
        let (events, _) = run(&project, &CompileOptions::default());
        let paths: Vec<&[usize]> = events.iter().map(source_path).collect();
        assert_eq!(paths, vec![&[1, 0][..], &[1, 1][..], &[2][..]]);
        let Event::Standard(last) = &events[2] else {
            panic!("expected a standard event");
        };
        assert_eq!(source_path(&last.sub_events[0]), &[2, 0]);
    }

    #[test]
    fn test_errors_in_linked_events_point_at_the_link() {
        let unknown = standard(vec![], vec![Instruction::new("Nope::Action", &[])]);
        let project = with_external(
            vec![marker("1"), link("Shared", None)],
            vec![("Shared", vec![marker("2"), unknown])],
        );
        let registry = registry(crate::backend::Target::Js);
        let output = crate::compile::compile_layout(&project, LAYOUT, &registry, &CompileOptions::default())
            .expect("layout");
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].event_path, vec![1, 1]);
    }
}
