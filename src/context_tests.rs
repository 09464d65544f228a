//! Scopes of generated code: which lists are declared where, and when they
//! still need filtering.

#[cfg(test)]
mod tests {
    use crate::context::{GenerationContext, ListSource, PickState};

    fn sources(context: &GenerationContext<'_>) -> Vec<(String, ListSource)> {
        context
            .declarations()
            .iter()
            .map(|d| (d.object_name.clone(), d.source.clone()))
            .collect()
    }

    #[test]
    fn test_objects_list_needed_is_idempotent() {
        let root = GenerationContext::root();
        let mut context = root.new_child();
        context.objects_list_needed("Player");
        context.objects_list_needed("Player");

        assert_eq!(sources(&context), vec![("Player".to_string(), ListSource::Scene)]);
        assert_eq!(context.pick_state("Player"), PickState::Picked);
        assert!(!context.should_generate_filtering_code("Player"));
        assert_eq!(context.object_list_name("Player"), "GDPlayerObjects1");
    }

    #[test]
    fn test_empty_list_still_needs_filtering() {
        let root = GenerationContext::root();
        let mut context = root.new_child();
        context.empty_objects_list_needed("Enemy");

        assert_eq!(sources(&context), vec![("Enemy".to_string(), ListSource::Empty)]);
        assert_eq!(context.pick_state("Enemy"), PickState::PickedWithoutFiltering);
        assert!(context.is_already_picked("Enemy"));
        assert!(context.should_generate_filtering_code("Enemy"));

        // A later use upgrades the state without a second declaration.
        context.objects_list_needed("Enemy");
        assert_eq!(context.declarations().len(), 1);
        assert_eq!(context.pick_state("Enemy"), PickState::Picked);
    }

    #[test]
    fn test_child_copies_the_parent_list() {
        let root = GenerationContext::root();
        let mut parent = root.new_child();
        parent.objects_list_needed("Player");

        let mut child = parent.new_child();
        assert!(child.is_already_picked("Player"));
        assert!(!child.declares_locally("Player"));
        assert_eq!(child.object_list_name("Player"), "GDPlayerObjects1");

        child.objects_list_needed("Player");
        assert_eq!(
            sources(&child),
            vec![("Player".to_string(), ListSource::Parent { depth: 1 })]
        );
        assert_eq!(child.object_list_name("Player"), "GDPlayerObjects2");
    }

    #[test]
    fn test_child_fetches_objects_never_picked() {
        let root = GenerationContext::root();
        let parent = root.new_child();
        let mut child = parent.new_child();
        child.objects_list_needed("Enemy");
        assert_eq!(sources(&child), vec![("Enemy".to_string(), ListSource::Scene)]);
        assert!(!parent.is_already_picked("Enemy"));
    }

    #[test]
    fn test_callback_reads_lists_from_the_snapshot() {
        let root = GenerationContext::root();
        let mut event = root.new_child();
        event.objects_list_needed("Player");
        event.mark_filtered("Player");

        let mut callback = event.new_async_callback_child();
        assert!(callback.is_async_root());
        assert!(callback.is_inside_async_callback());
        callback.objects_list_needed("Player");
        callback.objects_list_needed("Enemy");

        assert_eq!(
            sources(&callback),
            vec![
                ("Player".to_string(), ListSource::AsyncSnapshot),
                ("Enemy".to_string(), ListSource::Scene),
            ]
        );
    }

    #[test]
    fn test_capture_by_async_ancestor() {
        let root = GenerationContext::root();
        let mut event = root.new_child();
        event.objects_list_needed("Player");
        event.mark_filtered("Player");
        assert!(!event.is_captured_by_async_ancestor("Player"));

        let callback = event.new_async_callback_child();
        assert!(callback.is_captured_by_async_ancestor("Player"));
        assert!(!callback.is_captured_by_async_ancestor("Enemy"));

        // Filtering inside the callback makes the list a new selection.
        let mut sub_event = callback.new_child();
        sub_event.objects_list_needed("Player");
        assert_eq!(
            sources(&sub_event),
            vec![("Player".to_string(), ListSource::AsyncSnapshot)]
        );
        assert!(sub_event.is_captured_by_async_ancestor("Player"));
        sub_event.mark_filtered("Player");
        assert!(!sub_event.is_captured_by_async_ancestor("Player"));
    }

    #[test]
    fn test_for_each_element_and_hidden_members() {
        let root = GenerationContext::root();
        let mut event = root.new_child();
        event.objects_list_needed("Player");
        event.objects_list_needed("Enemy");

        let mut body = event.new_child();
        body.declare_element("Player", "forEachIndex2");
        body.declare_empty("Enemy");

        assert_eq!(
            sources(&body),
            vec![
                (
                    "Player".to_string(),
                    ListSource::Element {
                        depth: 1,
                        index_variable: "forEachIndex2".to_string()
                    }
                ),
                ("Enemy".to_string(), ListSource::Empty),
            ]
        );
        assert_eq!(body.pick_state("Enemy"), PickState::Picked);
    }

    #[test]
    fn test_used_objects_flow_to_the_parent() {
        let root = GenerationContext::root();
        let mut event = root.new_child();
        let used = {
            let mut child = event.new_child();
            child.objects_list_needed("Player");
            child.empty_objects_list_needed("Enemy");
            child.into_used_objects()
        };
        event.absorb_used_objects(used);

        let names: Vec<&str> = event.used_objects().iter().map(String::as_str).collect();
        assert_eq!(names, vec!["Enemy", "Player"]);
        assert!(event.declarations().is_empty());
    }

    #[test]
    fn test_condition_depth_nesting() {
        let root = GenerationContext::root();
        let mut event = root.new_child();
        assert_eq!(event.condition_depth(), 0);

        event.enter_nested_conditions();
        assert_eq!(event.condition_depth(), 1);
        let nested = event.new_conditions_child();
        assert_eq!(nested.condition_depth(), 2);
        event.leave_nested_conditions();
        assert_eq!(event.condition_depth(), 0);

        event.leave_nested_conditions();
        assert_eq!(event.condition_depth(), 0);
    }
}
