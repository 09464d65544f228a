//! Fixtures shared by the test modules: a registry with the built-in
//! extensions plus small third-party ones, and a one-layout project.

use crate::backend::Target;
use crate::builtins::register_builtin_extensions;
use crate::compile::{compile_layout, CompilationOutput, CompileOptions};
use crate::metadata::ValueKind;
use crate::model::{Event, EventsList, Instruction};
use crate::project::{Layout, ObjectDeclaration, ObjectGroup, Project};
use crate::registry::{Extension, MetadataRegistry};

pub const LAYOUT: &str = "Scene";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// `Movement::MoveBy` moves every picked instance horizontally.
pub fn movement_extension() -> Extension {
    let mut extension = Extension::new("Movement");
    extension
        .add_object_action("", "MoveBy")
        .add_parameter("object", "Object")
        .add_parameter("expression", "Distance")
        .set_function_name("moveBy");
    extension
        .add_action("Shake")
        .add_parameter("expression", "Duration")
        .add_parameter("expression", "Strength")
        .set_default_value("2")
        .set_function_name("gdjs.evtTools.camera.shake");
    extension
}

/// A physics engine: one object type, one behavior with an action and an
/// expression.
pub fn physics_extension() -> Extension {
    let mut extension = Extension::new("Physics");
    extension
        .add_object("Body")
        .set_class_name("gdjs.BodyRuntimeObject");
    extension
        .add_behavior("PhysicsBehavior")
        .set_class_name("gdjs.PhysicsRuntimeBehavior")
        .set_include_file("Extensions/Physics/physicsruntimebehavior.js");
    extension
        .add_behavior_action("Physics::PhysicsBehavior", "ApplyForce")
        .add_parameter("object", "Object")
        .add_parameter("behavior", "Behavior")
        .add_parameter("expression", "X")
        .add_parameter("expression", "Y")
        .set_function_name("applyForce")
        .set_include_file("Extensions/Physics/physicsruntimebehavior.js");
    extension
        .add_behavior_expression("Physics::PhysicsBehavior", "Mass", ValueKind::Number)
        .add_parameter("object", "Object")
        .add_parameter("behavior", "Behavior")
        .set_function_name("getMass");
    extension
}

/// Extension whose asynchronous action takes the callback as a parameter.
pub fn tween_extension() -> Extension {
    let mut extension = Extension::new("Tween");
    extension
        .add_object_action("", "FadeOut")
        .add_parameter("object", "Object")
        .add_parameter("expression", "Duration")
        .add_code_only_parameter("continuation", "")
        .set_async()
        .set_function_name("fadeOut");
    extension
}

pub fn registry(target: Target) -> MetadataRegistry {
    let mut registry = MetadataRegistry::new();
    register_builtin_extensions(&mut registry, target).expect("built-in extensions");
    registry.register(movement_extension()).expect("movement");
    registry.register(physics_extension()).expect("physics");
    registry.register(tween_extension()).expect("tween");
    registry
}

/// Project with a `Scene` layout holding `events`, objects `Player`,
/// `Enemy` and a `Ball` with physics, and the group `Characters`.
pub fn project(events: EventsList) -> Project {
    Project {
        name: "Test".to_string(),
        objects: vec![ObjectDeclaration::new("Camera", "")],
        object_groups: Vec::new(),
        layouts: vec![Layout {
            name: LAYOUT.to_string(),
            objects: vec![
                ObjectDeclaration::new("Player", ""),
                ObjectDeclaration::new("Enemy", ""),
                ObjectDeclaration::new("Ball", "Physics::Body")
                    .with_behavior("Physics", "Physics::PhysicsBehavior"),
            ],
            object_groups: vec![ObjectGroup {
                name: "Characters".to_string(),
                objects: vec!["Player".to_string(), "Enemy".to_string()],
            }],
            events,
        }],
        external_events: Vec::new(),
    }
}

pub fn compile_with(events: EventsList, options: &CompileOptions) -> CompilationOutput {
    let registry = registry(options.target);
    compile_layout(&project(events), LAYOUT, &registry, options).expect("layout exists")
}

pub fn compile(events: EventsList) -> CompilationOutput {
    compile_with(events, &CompileOptions::default())
}

pub fn standard(conditions: Vec<Instruction>, actions: Vec<Instruction>) -> Event {
    Event::standard(conditions, actions)
}

pub fn key_pressed(key: &str) -> Instruction {
    Instruction::new("BuiltinKeyboard::KeyPressed", &[key])
}

pub fn move_by(object: &str, distance: &str) -> Instruction {
    Instruction::new("Movement::MoveBy", &[object, distance])
}

pub fn wait(seconds: &str) -> Instruction {
    Instruction::new("BuiltinAsync::Wait", &[seconds])
}

pub fn pos_x(object: &str, operator: &str, value: &str) -> Instruction {
    Instruction::new("BuiltinObject::PosX", &[object, operator, value])
}

pub fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

pub fn with_sub_events(mut event: Event, events: EventsList) -> Event {
    match &mut event {
        Event::Standard(e) => e.sub_events = events,
        Event::ForEach(e) => e.sub_events = events,
        Event::Async(e) => e.sub_events = events,
        Event::Link(_) | Event::Comment(_) | Event::Empty => {}
    }
    event
}
