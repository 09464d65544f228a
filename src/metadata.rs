//! Metadata records declared by extensions.
//!
//! Every condition, action, expression, object type and behavior type the
//! compiler can emit code for is described by one of these records. They are
//! created through the [`crate::registry::Extension`] builder, owned by the
//! [`crate::registry::MetadataRegistry`], and only ever read during
//! compilation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::codegen::EventsCodeGenerator;
use crate::context::GenerationContext;
use crate::model::Instruction;

// ═══════════════════════════════════════════════════════════════════════════════
// KINDS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetadataKind {
    Condition,
    Action,
    Expression,
    StrExpression,
    Object,
    Behavior,
}

/// Type of the value an expression returns or an operator-based instruction
/// manipulates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    #[default]
    Number,
    String,
    Boolean,
}

impl ValueKind {
    pub fn expression_kind(self) -> MetadataKind {
        match self {
            ValueKind::String => MetadataKind::StrExpression,
            _ => MetadataKind::Expression,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Semantic type of a declared parameter. Serialized with the type strings
/// used in project files (`"expression"`, `"objectvar"`, ...); strings the
/// compiler does not know are kept as [`ParameterType::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParameterType {
    Object,
    ObjectList,
    ObjectListWithoutPicking,
    ObjectPtr,
    Behavior,
    Expression,
    String,
    RelationalOperator,
    Operator,
    SceneVariable,
    GlobalVariable,
    ObjectVariable,
    Key,
    Mouse,
    YesOrNo,
    TrueOrFalse,
    CurrentScene,
    ConditionInverted,
    InlineCode,
    Continuation,
    Unknown(String),
}

impl ParameterType {
    pub fn as_str(&self) -> &str {
        match self {
            ParameterType::Object => "object",
            ParameterType::ObjectList => "objectList",
            ParameterType::ObjectListWithoutPicking => "objectListWithoutPicking",
            ParameterType::ObjectPtr => "objectPtr",
            ParameterType::Behavior => "behavior",
            ParameterType::Expression => "expression",
            ParameterType::String => "string",
            ParameterType::RelationalOperator => "relationalOperator",
            ParameterType::Operator => "operator",
            ParameterType::SceneVariable => "scenevar",
            ParameterType::GlobalVariable => "globalvar",
            ParameterType::ObjectVariable => "objectvar",
            ParameterType::Key => "key",
            ParameterType::Mouse => "mouse",
            ParameterType::YesOrNo => "yesorno",
            ParameterType::TrueOrFalse => "trueorfalse",
            ParameterType::CurrentScene => "currentScene",
            ParameterType::ConditionInverted => "conditionInverted",
            ParameterType::InlineCode => "inlineCode",
            ParameterType::Continuation => "continuation",
            ParameterType::Unknown(s) => s,
        }
    }

    /// Parameters whose value names an object (or object group).
    pub fn is_object(&self) -> bool {
        matches!(
            self,
            ParameterType::Object
                | ParameterType::ObjectList
                | ParameterType::ObjectListWithoutPicking
                | ParameterType::ObjectPtr
        )
    }

    pub fn is_variable(&self) -> bool {
        matches!(
            self,
            ParameterType::SceneVariable
                | ParameterType::GlobalVariable
                | ParameterType::ObjectVariable
        )
    }

    /// Parameters whose text is an expression of the given kind.
    pub fn expression_kind(&self) -> Option<ValueKind> {
        match self {
            ParameterType::Expression => Some(ValueKind::Number),
            ParameterType::String => Some(ValueKind::String),
            _ => None,
        }
    }
}

impl From<String> for ParameterType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "object" => ParameterType::Object,
            "objectList" => ParameterType::ObjectList,
            "objectListWithoutPicking" => ParameterType::ObjectListWithoutPicking,
            "objectPtr" => ParameterType::ObjectPtr,
            "behavior" => ParameterType::Behavior,
            "expression" | "number" => ParameterType::Expression,
            "string" => ParameterType::String,
            "relationalOperator" => ParameterType::RelationalOperator,
            "operator" => ParameterType::Operator,
            "scenevar" => ParameterType::SceneVariable,
            "globalvar" => ParameterType::GlobalVariable,
            "objectvar" => ParameterType::ObjectVariable,
            "key" => ParameterType::Key,
            "mouse" => ParameterType::Mouse,
            "yesorno" => ParameterType::YesOrNo,
            "trueorfalse" => ParameterType::TrueOrFalse,
            "currentScene" => ParameterType::CurrentScene,
            "conditionInverted" => ParameterType::ConditionInverted,
            "inlineCode" => ParameterType::InlineCode,
            "continuation" => ParameterType::Continuation,
            _ => ParameterType::Unknown(value),
        }
    }
}

impl From<ParameterType> for String {
    fn from(value: ParameterType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMetadata {
    #[serde(rename = "type")]
    pub param_type: ParameterType,
    #[serde(default)]
    pub description: String,
    /// Synthesized by the generator, never supplied in the instruction.
    #[serde(default)]
    pub code_only: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub default_value: String,
    /// Type-specific extra information: the behavior type for `behavior`,
    /// the code for `inlineCode`, the index of the object parameter for
    /// code-only object lists.
    #[serde(default)]
    pub extra_info: String,
}

impl ParameterMetadata {
    pub fn new(param_type: ParameterType, description: &str) -> Self {
        ParameterMetadata {
            param_type,
            description: description.to_string(),
            code_only: false,
            optional: false,
            default_value: String::new(),
            extra_info: String::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CUSTOM CODE GENERATORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Custom generator for a condition. Receives the name of the boolean the
/// generated code must assign.
pub type ConditionCodeGenerator = fn(
    &Instruction,
    &mut EventsCodeGenerator<'_>,
    &mut GenerationContext<'_>,
    &str,
) -> String;

/// Custom generator for an action.
pub type ActionCodeGenerator =
    fn(&Instruction, &mut EventsCodeGenerator<'_>, &mut GenerationContext<'_>) -> String;

/// Custom generator for an expression, called with the generated code of
/// every declared parameter.
pub type ExpressionCodeGenerator = fn(&[String]) -> String;

/// Wrapper so expression metadata stays `Debug`.
#[derive(Clone, Copy)]
pub struct CustomExpressionGenerator(pub ExpressionCodeGenerator);

impl fmt::Debug for CustomExpressionGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomExpressionGenerator")
    }
}

#[derive(Clone, Copy)]
pub enum CustomCodeGenerator {
    Condition(ConditionCodeGenerator),
    Action(ActionCodeGenerator),
}

impl fmt::Debug for CustomCodeGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomCodeGenerator::Condition(_) => f.write_str("CustomCodeGenerator::Condition"),
            CustomCodeGenerator::Action(_) => f.write_str("CustomCodeGenerator::Action"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INSTRUCTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// What an instruction or expression operates on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "kind", content = "type", rename_all = "camelCase")]
pub enum Owner {
    #[default]
    Free,
    /// Object type the instruction belongs to (`""` for every object).
    Object(String),
    /// Behavior type the instruction belongs to.
    Behavior(String),
}

impl Owner {
    pub fn type_name(&self) -> &str {
        match self {
            Owner::Free => "",
            Owner::Object(t) | Owner::Behavior(t) => t,
        }
    }
}

/// How an operator-based instruction reaches the value it manipulates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AccessType {
    /// Plain function call.
    #[default]
    Call,
    /// The function returns a reference; operators are applied in place
    /// (`ref += value`).
    Reference,
    /// The function is a setter; `getter` reads the current value for the
    /// non-assignment operators.
    MutatorAndOrAccessor { getter: String },
    /// The function returns an accessor object; each operator maps to one of
    /// its methods.
    Mutators { mutators: BTreeMap<String, String> },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct InstructionMetadata {
    /// Namespace-qualified type, e.g. `Physics::ApplyForce`.
    pub full_type: String,
    pub name: String,
    pub extension: String,
    pub owner: Owner,
    pub parameters: Vec<ParameterMetadata>,
    pub function_name: String,
    /// Function to call instead of `function_name` when the instruction is
    /// awaited.
    pub async_function_name: String,
    pub include_files: Vec<String>,
    /// Set for instructions comparing (conditions) or modifying (actions)
    /// a value with an operator parameter.
    pub manipulated_type: Option<ValueKind>,
    pub access: AccessType,
    pub is_async: bool,
    pub optionally_async: bool,
    pub can_have_sub_instructions: bool,
    #[serde(skip)]
    pub custom_code_generator: Option<CustomCodeGenerator>,
}

impl InstructionMetadata {
    pub fn new(extension: &str, full_type: &str, name: &str, owner: Owner) -> Self {
        InstructionMetadata {
            full_type: full_type.to_string(),
            name: name.to_string(),
            extension: extension.to_string(),
            owner,
            ..Default::default()
        }
    }

    /// True for the shared sentinel returned by failed lookups.
    pub fn is_bad(&self) -> bool {
        self.full_type.is_empty()
    }

    pub fn is_object_instruction(&self) -> bool {
        matches!(self.owner, Owner::Object(_))
    }

    pub fn is_behavior_instruction(&self) -> bool {
        matches!(self.owner, Owner::Behavior(_))
    }

    /// Whether an instruction must be compiled as an asynchronous action.
    pub fn is_async_when(&self, awaited: bool) -> bool {
        self.is_async && (!self.optionally_async || awaited)
    }

    pub fn add_parameter(&mut self, param_type: &str, description: &str) -> &mut Self {
        self.parameters
            .push(ParameterMetadata::new(ParameterType::from(param_type.to_string()), description));
        self
    }

    pub fn add_code_only_parameter(&mut self, param_type: &str, extra_info: &str) -> &mut Self {
        let mut parameter = ParameterMetadata::new(ParameterType::from(param_type.to_string()), "");
        parameter.code_only = true;
        parameter.extra_info = extra_info.to_string();
        self.parameters.push(parameter);
        self
    }

    /// Sets the default value of the last declared parameter and marks it
    /// optional.
    pub fn set_default_value(&mut self, value: &str) -> &mut Self {
        if let Some(last) = self.parameters.last_mut() {
            last.optional = true;
            last.default_value = value.to_string();
        }
        self
    }

    /// Sets extra information on the last declared parameter.
    pub fn set_parameter_extra_info(&mut self, extra_info: &str) -> &mut Self {
        if let Some(last) = self.parameters.last_mut() {
            last.extra_info = extra_info.to_string();
        }
        self
    }

    pub fn set_function_name(&mut self, function_name: &str) -> &mut Self {
        self.function_name = function_name.to_string();
        self
    }

    pub fn set_async_function_name(&mut self, function_name: &str) -> &mut Self {
        self.async_function_name = function_name.to_string();
        self
    }

    pub fn set_include_file(&mut self, include: &str) -> &mut Self {
        self.include_files = vec![include.to_string()];
        self
    }

    pub fn add_include_file(&mut self, include: &str) -> &mut Self {
        self.include_files.push(include.to_string());
        self
    }

    pub fn set_manipulated_type(&mut self, kind: ValueKind) -> &mut Self {
        self.manipulated_type = Some(kind);
        self
    }

    pub fn set_getter(&mut self, getter: &str) -> &mut Self {
        self.access = AccessType::MutatorAndOrAccessor {
            getter: getter.to_string(),
        };
        self
    }

    pub fn set_mutators(&mut self, mutators: &[(&str, &str)]) -> &mut Self {
        self.access = AccessType::Mutators {
            mutators: mutators
                .iter()
                .map(|(op, method)| (op.to_string(), method.to_string()))
                .collect(),
        };
        self
    }

    pub fn set_returns_reference(&mut self) -> &mut Self {
        self.access = AccessType::Reference;
        self
    }

    pub fn set_async(&mut self) -> &mut Self {
        self.is_async = true;
        self
    }

    pub fn set_optionally_async(&mut self) -> &mut Self {
        self.is_async = true;
        self.optionally_async = true;
        self
    }

    pub fn set_can_have_sub_instructions(&mut self) -> &mut Self {
        self.can_have_sub_instructions = true;
        self
    }

    pub fn set_custom_code_generator(&mut self, generator: CustomCodeGenerator) -> &mut Self {
        self.custom_code_generator = Some(generator);
        self
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSIONS, OBJECTS, BEHAVIORS
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionMetadata {
    /// Name used in expression text (`abs`, `Physics::Gravity`, `X`).
    pub full_name: String,
    pub extension: String,
    pub owner: Owner,
    pub return_kind: ValueKind,
    pub parameters: Vec<ParameterMetadata>,
    pub function_name: String,
    pub include_files: Vec<String>,
    #[serde(skip)]
    pub custom_code_generator: Option<CustomExpressionGenerator>,
}

impl ExpressionMetadata {
    pub fn new(extension: &str, full_name: &str, owner: Owner, return_kind: ValueKind) -> Self {
        ExpressionMetadata {
            full_name: full_name.to_string(),
            extension: extension.to_string(),
            owner,
            return_kind,
            ..Default::default()
        }
    }

    pub fn is_bad(&self) -> bool {
        self.full_name.is_empty()
    }

    pub fn add_parameter(&mut self, param_type: &str, description: &str) -> &mut Self {
        self.parameters
            .push(ParameterMetadata::new(ParameterType::from(param_type.to_string()), description));
        self
    }

    pub fn add_code_only_parameter(&mut self, param_type: &str, extra_info: &str) -> &mut Self {
        let mut parameter = ParameterMetadata::new(ParameterType::from(param_type.to_string()), "");
        parameter.code_only = true;
        parameter.extra_info = extra_info.to_string();
        self.parameters.push(parameter);
        self
    }

    pub fn set_default_value(&mut self, value: &str) -> &mut Self {
        if let Some(last) = self.parameters.last_mut() {
            last.optional = true;
            last.default_value = value.to_string();
        }
        self
    }

    pub fn set_function_name(&mut self, function_name: &str) -> &mut Self {
        self.function_name = function_name.to_string();
        self
    }

    pub fn set_include_file(&mut self, include: &str) -> &mut Self {
        self.include_files = vec![include.to_string()];
        self
    }

    pub fn set_custom_code_generator(&mut self, generator: ExpressionCodeGenerator) -> &mut Self {
        self.custom_code_generator = Some(CustomExpressionGenerator(generator));
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMetadata {
    pub full_type: String,
    pub extension: String,
    pub class_name: String,
    pub include_files: Vec<String>,
}

impl ObjectMetadata {
    pub fn set_class_name(&mut self, class_name: &str) -> &mut Self {
        self.class_name = class_name.to_string();
        self
    }

    pub fn set_include_file(&mut self, include: &str) -> &mut Self {
        self.include_files = vec![include.to_string()];
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorMetadata {
    pub full_type: String,
    pub extension: String,
    pub class_name: String,
    pub include_files: Vec<String>,
}

impl BehaviorMetadata {
    pub fn set_class_name(&mut self, class_name: &str) -> &mut Self {
        self.class_name = class_name.to_string();
        self
    }

    pub fn set_include_file(&mut self, include: &str) -> &mut Self {
        self.include_files = vec![include.to_string()];
        self
    }
}
