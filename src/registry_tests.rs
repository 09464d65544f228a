//! Registration and lookup of extension metadata.

#[cfg(test)]
mod tests {
    use crate::backend::Target;
    use crate::builtins::{KEYBOARD_EXTENSION, MATHEMATICAL_TOOLS_EXTENSION, OBJECT_EXTENSION};
    use crate::error::RegistryError;
    use crate::metadata::{MetadataKind, Owner, ValueKind};
    use crate::registry::{Extension, MetadataRef, MetadataRegistry};
    use crate::test_support::{movement_extension, registry};

    #[test]
    fn test_builtin_condition_per_target() {
        let js = registry(Target::Js);
        let key_pressed = js.condition("BuiltinKeyboard::KeyPressed");
        assert!(key_pressed.is_found());
        assert_eq!(key_pressed.extension, KEYBOARD_EXTENSION);
        assert_eq!(key_pressed.metadata.function_name, "gdjs.evtTools.input.isKeyPressed");

        let cpp = registry(Target::Cpp);
        assert_eq!(
            cpp.condition("BuiltinKeyboard::KeyPressed").metadata.function_name,
            "IsKeyPressed"
        );
    }

    #[test]
    fn test_miss_returns_the_sentinel() {
        let registry = registry(Target::Js);
        let missing = registry.action("Nope::Action");
        assert!(!missing.is_found());
        assert!(missing.metadata.is_bad());
        assert!(missing.metadata.parameters.is_empty());

        // A condition is not an action.
        assert!(!registry.action("BuiltinKeyboard::KeyPressed").is_found());
        assert!(!registry.object("Nope::Sprite").is_found());
        assert!(!registry.behavior("Nope::Platformer").is_found());
    }

    #[test]
    fn test_duplicate_extension_is_rejected() {
        let mut registry = MetadataRegistry::new();
        registry.register(movement_extension()).expect("first registration");
        let error = registry
            .register(movement_extension())
            .expect_err("second registration");
        assert!(matches!(error, RegistryError::DuplicateExtension(name) if name == "Movement"));
        assert_eq!(registry.extensions().len(), 1);
    }

    #[test]
    fn test_first_declaration_of_a_name_wins() {
        let mut registry = registry(Target::Js);
        let mut other = Extension::new("FastMath").with_global_expressions();
        other
            .add_expression("abs")
            .add_parameter("expression", "Value")
            .set_function_name("fastAbs");
        other
            .add_expression("hypot")
            .add_parameter("expression", "X")
            .add_parameter("expression", "Y")
            .set_function_name("Math.hypot");
        registry.register(other).expect("fast math");

        let abs = registry.expression("abs", ValueKind::Number);
        assert_eq!(abs.extension, MATHEMATICAL_TOOLS_EXTENSION);
        assert_eq!(abs.metadata.function_name, "Math.abs");

        let hypot = registry.expression("hypot", ValueKind::Number);
        assert_eq!(hypot.extension, "FastMath");
        assert!(registry.extension("FastMath").is_some());
    }

    #[test]
    fn test_free_expressions_are_namespaced_unless_global() {
        let mut registry = MetadataRegistry::new();
        let mut extension = Extension::new("Physics");
        extension.add_expression("Gravity").set_function_name("getGravity");
        extension.add_str_expression("EngineName").set_function_name("engineName");
        registry.register(extension).expect("physics");

        assert!(registry.expression("Physics::Gravity", ValueKind::Number).is_found());
        assert!(!registry.expression("Gravity", ValueKind::Number).is_found());
        assert!(registry.expression("Physics::EngineName", ValueKind::String).is_found());
        assert!(!registry.expression("Physics::EngineName", ValueKind::Number).is_found());
    }

    #[test]
    fn test_object_expression_falls_back_to_the_base_object() {
        let registry = registry(Target::Js);
        let x = registry.object_expression("Physics::Body", "X", ValueKind::Number);
        assert!(x.is_found());
        assert_eq!(x.extension, OBJECT_EXTENSION);
        assert_eq!(x.metadata.function_name, "getX");

        assert!(registry.has_any_expression(&Owner::Object("Physics::Body".to_string()), "ObjectName"));
        assert!(!registry.has_any_expression(&Owner::Object("Physics::Body".to_string()), "Nope"));
    }

    #[test]
    fn test_behavior_expression_is_keyed_by_kind() {
        let registry = registry(Target::Js);
        let mass = registry.behavior_expression("Physics::PhysicsBehavior", "Mass", ValueKind::Number);
        assert!(mass.is_found());
        assert_eq!(mass.extension, "Physics");
        assert!(!registry
            .behavior_expression("Physics::PhysicsBehavior", "Mass", ValueKind::String)
            .is_found());
        assert!(registry.has_any_expression(&Owner::Behavior("Physics::PhysicsBehavior".to_string()), "Mass"));
    }

    #[test]
    fn test_generic_lookup_of_types() {
        let registry = registry(Target::Js);
        match registry.lookup(MetadataKind::Object, "Physics::Body") {
            Some(MetadataRef::Object(object)) => assert_eq!(object.class_name, "gdjs.BodyRuntimeObject"),
            other => panic!("expected the Body object, got {:?}", other),
        }
        match registry.lookup(MetadataKind::Behavior, "Physics::PhysicsBehavior") {
            Some(MetadataRef::Behavior(behavior)) => assert_eq!(
                behavior.include_files,
                vec!["Extensions/Physics/physicsruntimebehavior.js".to_string()]
            ),
            other => panic!("expected the physics behavior, got {:?}", other),
        }
        assert!(registry.lookup(MetadataKind::Condition, "Physics::ApplyForce").is_none());
        assert!(matches!(
            registry.lookup(MetadataKind::Action, "Physics::ApplyForce"),
            Some(MetadataRef::Instruction(_))
        ));
    }

    #[test]
    fn test_instruction_metadata_records_its_owner() {
        let registry = registry(Target::Js);
        let apply_force = registry.action("Physics::ApplyForce").metadata;
        assert!(apply_force.is_behavior_instruction());
        assert_eq!(apply_force.owner, Owner::Behavior("Physics::PhysicsBehavior".to_string()));
        assert_eq!(apply_force.parameters.len(), 4);

        let move_by = registry.action("Movement::MoveBy").metadata;
        assert!(move_by.is_object_instruction());
        assert!(!move_by.is_async_when(true));

        let wait = registry.action("BuiltinAsync::Wait").metadata;
        assert!(wait.is_async_when(false));
    }
}
