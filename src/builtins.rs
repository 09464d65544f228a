//! Built-in extensions.
//!
//! Every project can use these without declaring them: boolean combinators,
//! variables, keyboard, math functions, the base object and waiting. Function
//! names differ per target, the declared instructions do not.

use crate::backend::{ListInit, Target};
use crate::codegen::EventsCodeGenerator;
use crate::context::GenerationContext;
use crate::error::RegistryError;
use crate::metadata::{CustomCodeGenerator, ValueKind};
use crate::model::Instruction;
use crate::registry::{Extension, MetadataRegistry};

pub const COMMON_INSTRUCTIONS_EXTENSION: &str = "BuiltinCommonInstructions";
pub const VARIABLES_EXTENSION: &str = "BuiltinVariables";
pub const KEYBOARD_EXTENSION: &str = "BuiltinKeyboard";
pub const MATHEMATICAL_TOOLS_EXTENSION: &str = "BuiltinMathematicalTools";
pub const OBJECT_EXTENSION: &str = "BuiltinObject";
pub const ASYNC_EXTENSION: &str = "BuiltinAsync";

/// Registers every built-in extension, with the function names of `target`.
pub fn register_builtin_extensions(
    registry: &mut MetadataRegistry,
    target: Target,
) -> Result<(), RegistryError> {
    registry.register(common_instructions_extension())?;
    registry.register(variables_extension(target))?;
    registry.register(keyboard_extension(target))?;
    registry.register(mathematical_tools_extension(target))?;
    registry.register(object_extension(target))?;
    registry.register(async_extension(target))?;
    tracing::debug!(platform = %target, "built-in extensions registered");
    Ok(())
}

/// Picks the JavaScript or C++ spelling of a function name.
fn by_target<'s>(target: Target, js: &'s str, cpp: &'s str) -> &'s str {
    match target {
        Target::Js => js,
        Target::Cpp => cpp,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMMON INSTRUCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

fn common_instructions_extension() -> Extension {
    let mut extension = Extension::new(COMMON_INSTRUCTIONS_EXTENSION);

    extension
        .add_condition("Or")
        .set_can_have_sub_instructions()
        .set_custom_code_generator(CustomCodeGenerator::Condition(generate_or));
    extension
        .add_condition("And")
        .set_can_have_sub_instructions()
        .set_custom_code_generator(CustomCodeGenerator::Condition(generate_and));
    extension
        .add_condition("Not")
        .set_can_have_sub_instructions()
        .set_custom_code_generator(CustomCodeGenerator::Condition(generate_not));
    extension
        .add_condition("Once")
        .set_custom_code_generator(CustomCodeGenerator::Condition(generate_once));

    // An empty function name compares the first parameter itself.
    extension
        .add_condition("CompareNumbers")
        .add_parameter("expression", "First expression")
        .add_parameter("relationalOperator", "Sign of the test")
        .add_parameter("expression", "Second expression")
        .set_manipulated_type(ValueKind::Number);
    extension
        .add_condition("CompareStrings")
        .add_parameter("string", "First string expression")
        .add_parameter("relationalOperator", "Sign of the test")
        .add_parameter("string", "Second string expression")
        .set_manipulated_type(ValueKind::String);

    extension
}

fn enabled(instructions: &[Instruction]) -> Vec<&Instruction> {
    instructions.iter().filter(|i| !i.disabled).collect()
}

/// True when at least one sub-condition is true. Each sub-condition picks
/// from the lists as they were before the `Or`; the instances picked by the
/// true ones are merged back into the lists of the enclosing scope.
fn generate_or(
    condition: &Instruction,
    generator: &mut EventsCodeGenerator<'_>,
    context: &mut GenerationContext<'_>,
    output: &str,
) -> String {
    let backend = generator.backend();
    let objects = generator.objects_picked_by(&condition.sub_instructions);
    let id = generator.unique_id();

    let mut code = format!("{} = false;\n", output);
    let mut accumulators = Vec::new();
    for object in &objects {
        context.objects_list_needed(object);
        let accumulator = format!("{}_{}final", context.object_list_name(object), id);
        code.push_str(&backend.declare_objects_list(&accumulator, &ListInit::Empty));
        accumulators.push((object.clone(), accumulator));
    }

    for sub_condition in enabled(&condition.sub_instructions) {
        let mut child = context.new_conditions_child();
        let boolean = generator.condition_boolean(0, &child);
        let sub_code = generator.generate_condition_code(sub_condition, &boolean, &mut child);
        let declarations = generator.declarations_code(&child);

        let mut merge = String::new();
        for (object, accumulator) in &accumulators {
            if child.declares_locally(object) {
                merge.push_str(&backend.merge_objects_list(&child.object_list_name(object), accumulator));
            }
        }
        let used = child.into_used_objects();
        context.absorb_used_objects(used);

        code.push_str("{\n");
        code.push_str(&declarations);
        code.push_str(&backend.declare_boolean(&boolean));
        code.push_str(&sub_code);
        code.push_str(&format!("if ({}) {{\n{} = true;\n{}}}\n", boolean, output, merge));
        code.push_str("}\n");
    }

    for (object, accumulator) in &accumulators {
        code.push_str(&backend.replace_objects_list(accumulator, &context.object_list_name(object)));
        context.mark_filtered(object);
    }
    code
}

/// Booleans of the sub-conditions, generated in the enclosing scope so
/// their picking applies to it, and their conjunction.
fn generate_sub_conditions(
    condition: &Instruction,
    generator: &mut EventsCodeGenerator<'_>,
    context: &mut GenerationContext<'_>,
) -> (String, String) {
    let sub_conditions = enabled(&condition.sub_instructions);
    context.enter_nested_conditions();
    let mut code = String::new();
    for index in 0..sub_conditions.len() {
        code.push_str(
            &generator
                .backend()
                .declare_boolean(&generator.condition_boolean(index, context)),
        );
    }
    for (index, sub_condition) in sub_conditions.iter().enumerate() {
        let boolean = generator.condition_boolean(index, context);
        let sub_code = generator.generate_condition_code(sub_condition, &boolean, context);
        code.push_str(&format!("{{\n{}}}\n", sub_code));
    }
    let predicate = generator.conditions_predicate(&condition.sub_instructions, context);
    context.leave_nested_conditions();
    let predicate = if predicate.is_empty() {
        "true".to_string()
    } else {
        predicate
    };
    (code, predicate)
}

fn generate_and(
    condition: &Instruction,
    generator: &mut EventsCodeGenerator<'_>,
    context: &mut GenerationContext<'_>,
    output: &str,
) -> String {
    let (code, predicate) = generate_sub_conditions(condition, generator, context);
    format!("{}{} = {};\n", code, output, predicate)
}

fn generate_not(
    condition: &Instruction,
    generator: &mut EventsCodeGenerator<'_>,
    context: &mut GenerationContext<'_>,
    output: &str,
) -> String {
    let (code, predicate) = generate_sub_conditions(condition, generator, context);
    format!("{}{} = !({});\n", code, output, predicate)
}

/// True the first frame the event is reached after not being reached on the
/// previous frame.
fn generate_once(
    _condition: &Instruction,
    generator: &mut EventsCodeGenerator<'_>,
    _context: &mut GenerationContext<'_>,
    output: &str,
) -> String {
    let id = generator.next_once_id();
    format!("{} = {};\n", output, generator.backend().trigger_once(id))
}

// ═══════════════════════════════════════════════════════════════════════════════
// VARIABLES
// ═══════════════════════════════════════════════════════════════════════════════

const NUMBER_MUTATORS_JS: &[(&str, &str)] = &[
    ("=", "setNumber"),
    ("+", "add"),
    ("-", "sub"),
    ("*", "mul"),
    ("/", "div"),
];
const STRING_MUTATORS_JS: &[(&str, &str)] = &[("=", "setString"), ("+", "concatenateString")];
const NUMBER_MUTATORS_CPP: &[(&str, &str)] = &[
    ("=", "SetValue"),
    ("+", "Add"),
    ("-", "Sub"),
    ("*", "Mul"),
    ("/", "Div"),
];
const STRING_MUTATORS_CPP: &[(&str, &str)] = &[("=", "SetString"), ("+", "ConcatenateString")];

fn variables_extension(target: Target) -> Extension {
    let mut extension = Extension::new(VARIABLES_EXTENSION);
    let get_number = by_target(
        target,
        "gdjs.evtTools.variable.getVariableNumber",
        "GetVariableValue",
    );
    let get_string = by_target(
        target,
        "gdjs.evtTools.variable.getVariableString",
        "GetVariableString",
    );
    let (number_mutators, string_mutators) = match target {
        Target::Js => (NUMBER_MUTATORS_JS, STRING_MUTATORS_JS),
        Target::Cpp => (NUMBER_MUTATORS_CPP, STRING_MUTATORS_CPP),
    };

    for (name, variable_type) in [("VarScene", "scenevar"), ("VarGlobal", "globalvar")] {
        extension
            .add_condition(name)
            .add_parameter(variable_type, "Variable")
            .add_parameter("relationalOperator", "Sign of the test")
            .add_parameter("expression", "Value to compare")
            .set_manipulated_type(ValueKind::Number)
            .set_function_name(get_number);
        extension
            .add_condition(&format!("{}Txt", name))
            .add_parameter(variable_type, "Variable")
            .add_parameter("relationalOperator", "Sign of the test")
            .add_parameter("string", "Text to compare")
            .set_manipulated_type(ValueKind::String)
            .set_function_name(get_string);
    }
    for (name, variable_type) in [("ModVarScene", "scenevar"), ("ModVarGlobal", "globalvar")] {
        extension
            .add_action(name)
            .add_parameter(variable_type, "Variable")
            .add_parameter("operator", "Modification's sign")
            .add_parameter("expression", "Value")
            .set_manipulated_type(ValueKind::Number)
            .set_mutators(number_mutators);
        extension
            .add_action(&format!("{}Txt", name))
            .add_parameter(variable_type, "Variable")
            .add_parameter("operator", "Modification's sign")
            .add_parameter("string", "Text")
            .set_manipulated_type(ValueKind::String)
            .set_mutators(string_mutators);
    }

    extension
        .add_object_condition("", "VarObjet")
        .add_parameter("object", "Object")
        .add_parameter("objectvar", "Variable")
        .add_parameter("relationalOperator", "Sign of the test")
        .add_parameter("expression", "Value to compare")
        .set_manipulated_type(ValueKind::Number)
        .set_function_name(by_target(target, "getVariableNumber", "GetVariableValue"));
    extension
        .add_object_action("", "ModVarObjet")
        .add_parameter("object", "Object")
        .add_parameter("objectvar", "Variable")
        .add_parameter("operator", "Modification's sign")
        .add_parameter("expression", "Value")
        .set_manipulated_type(ValueKind::Number)
        .set_mutators(number_mutators);
    extension
        .add_object_action("", "ModVarObjetTxt")
        .add_parameter("object", "Object")
        .add_parameter("objectvar", "Variable")
        .add_parameter("operator", "Modification's sign")
        .add_parameter("string", "Text")
        .set_manipulated_type(ValueKind::String)
        .set_mutators(string_mutators);

    extension
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEYBOARD
// ═══════════════════════════════════════════════════════════════════════════════

fn keyboard_extension(target: Target) -> Extension {
    let mut extension = Extension::new(KEYBOARD_EXTENSION);
    extension
        .add_condition("KeyPressed")
        .add_code_only_parameter("currentScene", "")
        .add_parameter("key", "Key")
        .set_function_name(by_target(
            target,
            "gdjs.evtTools.input.isKeyPressed",
            "IsKeyPressed",
        ));
    extension
        .add_condition("KeyReleased")
        .add_code_only_parameter("currentScene", "")
        .add_parameter("key", "Key")
        .set_function_name(by_target(
            target,
            "gdjs.evtTools.input.wasKeyReleased",
            "WasKeyReleased",
        ));
    extension
}

// ═══════════════════════════════════════════════════════════════════════════════
// MATHEMATICAL TOOLS
// ═══════════════════════════════════════════════════════════════════════════════

fn mathematical_tools_extension(target: Target) -> Extension {
    let mut extension = Extension::new(MATHEMATICAL_TOOLS_EXTENSION).with_global_expressions();

    let unary = [
        ("abs", "Math.abs", "abs"),
        ("sqrt", "Math.sqrt", "sqrt"),
        ("floor", "Math.floor", "floor"),
        ("ceil", "Math.ceil", "ceil"),
        ("round", "Math.round", "GDRound"),
        ("sin", "Math.sin", "sin"),
        ("cos", "Math.cos", "cos"),
        ("random", "gdjs.random", "GDpriv::CommonInstructions::Random"),
    ];
    for (name, js, cpp) in unary {
        extension
            .add_expression(name)
            .add_parameter("expression", "Expression")
            .set_function_name(by_target(target, js, cpp));
    }
    for (name, js, cpp) in [("min", "Math.min", "std::min"), ("max", "Math.max", "std::max")] {
        extension
            .add_expression(name)
            .add_parameter("expression", "First expression")
            .add_parameter("expression", "Second expression")
            .set_function_name(by_target(target, js, cpp));
    }

    extension
        .add_str_expression("ToString")
        .add_parameter("expression", "Expression to be converted to text")
        .set_function_name(by_target(
            target,
            "gdjs.evtTools.common.toString",
            "ToString",
        ));
    extension
        .add_expression("ToNumber")
        .add_parameter("string", "Text to convert to a number")
        .set_function_name(by_target(
            target,
            "gdjs.evtTools.common.toNumber",
            "ToDouble",
        ));

    extension
}

// ═══════════════════════════════════════════════════════════════════════════════
// BASE OBJECT
// ═══════════════════════════════════════════════════════════════════════════════

fn object_extension(target: Target) -> Extension {
    let mut extension = Extension::new(OBJECT_EXTENSION);
    extension
        .add_object("")
        .set_class_name(by_target(target, "gdjs.RuntimeObject", "RuntimeObject"))
        .set_include_file(by_target(target, "", "GDCpp/Runtime/RuntimeObject.h"));

    let axes = [
        ("PosX", "SetX", "X", "getX", "setX", "GetX", "SetX"),
        ("PosY", "SetY", "Y", "getY", "setY", "GetY", "SetY"),
    ];
    for (condition, action, expression, js_get, js_set, cpp_get, cpp_set) in axes {
        let getter = by_target(target, js_get, cpp_get);
        let setter = by_target(target, js_set, cpp_set);
        extension
            .add_object_condition("", condition)
            .add_parameter("object", "Object")
            .add_parameter("relationalOperator", "Sign of the test")
            .add_parameter("expression", "Position")
            .set_manipulated_type(ValueKind::Number)
            .set_function_name(getter);
        extension
            .add_object_action("", action)
            .add_parameter("object", "Object")
            .add_parameter("operator", "Modification's sign")
            .add_parameter("expression", "Value")
            .set_manipulated_type(ValueKind::Number)
            .set_function_name(setter)
            .set_getter(getter);
        extension
            .add_object_expression("", expression, ValueKind::Number)
            .add_parameter("object", "Object")
            .set_function_name(getter);
    }
    extension
        .add_object_expression("", "ObjectName", ValueKind::String)
        .add_parameter("object", "Object")
        .set_function_name(by_target(target, "getName", "GetName"));

    extension
        .add_object_action("", "Delete")
        .add_parameter("object", "Object")
        .add_code_only_parameter("currentScene", "")
        .set_function_name(by_target(target, "deleteFromScene", "DeleteFromScene"));

    // The created instance is added to the list of the object, so the next
    // actions of the event act on it.
    extension
        .add_action("Create")
        .add_code_only_parameter("currentScene", "")
        .add_parameter("objectListWithoutPicking", "Object to create")
        .add_parameter("expression", "X position")
        .add_parameter("expression", "Y position")
        .add_parameter("string", "Layer")
        .set_default_value("\"\"")
        .set_function_name(by_target(
            target,
            "gdjs.evtTools.object.createObjectOnScene",
            "CreateObjectOnScene",
        ));

    extension
}

// ═══════════════════════════════════════════════════════════════════════════════
// ASYNC
// ═══════════════════════════════════════════════════════════════════════════════

fn async_extension(target: Target) -> Extension {
    let mut extension = Extension::new(ASYNC_EXTENSION);
    extension
        .add_action("Wait")
        .add_parameter("expression", "Time to wait in seconds")
        .set_async()
        .set_function_name(by_target(target, "gdjs.evtTools.runtimeScene.wait", "Wait"));
    extension
}
