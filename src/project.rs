//! Project, layouts and object containers, plus the expression-type
//! resolver built on top of them.

use serde::{Deserialize, Serialize};

use crate::ast::{ExpressionNode, FunctionCall, NodeKind};
use crate::metadata::ValueKind;
use crate::model::EventsList;
use crate::registry::MetadataRegistry;

// ═══════════════════════════════════════════════════════════════════════════════
// PROJECT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BehaviorDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub behavior_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDeclaration {
    pub name: String,
    #[serde(rename = "type", default)]
    pub object_type: String,
    #[serde(default)]
    pub behaviors: Vec<BehaviorDeclaration>,
}

impl ObjectDeclaration {
    pub fn new(name: &str, object_type: &str) -> Self {
        ObjectDeclaration {
            name: name.to_string(),
            object_type: object_type.to_string(),
            behaviors: Vec::new(),
        }
    }

    pub fn with_behavior(mut self, name: &str, behavior_type: &str) -> Self {
        self.behaviors.push(BehaviorDeclaration {
            name: name.to_string(),
            behavior_type: behavior_type.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectGroup {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<ObjectDeclaration>,
    #[serde(default)]
    pub object_groups: Vec<ObjectGroup>,
    #[serde(default)]
    pub events: EventsList,
}

/// Events that are not attached to a layout and only run when linked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExternalEvents {
    pub name: String,
    #[serde(default)]
    pub events: EventsList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub name: String,
    /// Global objects, visible from every layout.
    #[serde(default)]
    pub objects: Vec<ObjectDeclaration>,
    #[serde(default)]
    pub object_groups: Vec<ObjectGroup>,
    #[serde(default)]
    pub layouts: Vec<Layout>,
    #[serde(default)]
    pub external_events: Vec<ExternalEvents>,
}

impl Project {
    pub fn layout(&self, name: &str) -> Option<&Layout> {
        self.layouts.iter().find(|l| l.name == name)
    }

    /// Events included by a link: external events first, then layouts.
    pub fn linkable_events(&self, name: &str) -> Option<&EventsList> {
        self.external_events
            .iter()
            .find(|e| e.name == name)
            .map(|e| &e.events)
            .or_else(|| self.layout(name).map(|l| &l.events))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSION TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    Object,
    Number,
    String,
    Variable,
    Unknown,
}

/// Answers questions about the objects visible from the code being compiled.
/// The generator and the used-extensions finder both go through it.
pub trait ExpressionTypeResolver {
    fn object(&self, name: &str) -> Option<&ObjectDeclaration>;

    fn group(&self, name: &str) -> Option<&ObjectGroup>;

    fn has_object_or_group(&self, name: &str) -> bool {
        self.object(name).is_some() || self.group(name).is_some()
    }

    /// Type of an object, or the type shared by every object of a group
    /// (`""`, the base object, when they differ).
    fn object_type(&self, name: &str) -> Option<String> {
        if let Some(object) = self.object(name) {
            return Some(object.object_type.clone());
        }
        let group = self.group(name)?;
        let mut types = group
            .objects
            .iter()
            .filter_map(|member| self.object(member).map(|o| o.object_type.as_str()));
        let first = types.next().unwrap_or("");
        if types.all(|t| t == first) {
            Some(first.to_string())
        } else {
            Some(String::new())
        }
    }

    /// Type of the behavior named `behavior_name` on an object (or on every
    /// object of a group).
    fn behavior_type(&self, object_name: &str, behavior_name: &str) -> Option<String> {
        let find = |object: &ObjectDeclaration| {
            object
                .behaviors
                .iter()
                .find(|b| b.name == behavior_name)
                .map(|b| b.behavior_type.clone())
        };
        if let Some(object) = self.object(object_name) {
            return find(object);
        }
        let group = self.group(object_name)?;
        group
            .objects
            .iter()
            .filter_map(|member| self.object(member))
            .find_map(find)
    }

    /// The real objects an object name stands for: the members of a group,
    /// or the name itself.
    fn expand_object_name(&self, name: &str) -> Vec<String> {
        match self.group(name) {
            Some(group) if self.object(name).is_none() => group.objects.clone(),
            _ => vec![name.to_string()],
        }
    }

    /// Semantic type of an expression node.
    fn node_type(&self, node: &ExpressionNode, registry: &MetadataRegistry) -> SemanticType {
        match &node.kind {
            NodeKind::Number { .. } => SemanticType::Number,
            NodeKind::Text { .. } => SemanticType::String,
            NodeKind::Identifier { name } => {
                if self.has_object_or_group(name) {
                    SemanticType::Object
                } else {
                    SemanticType::Variable
                }
            }
            NodeKind::VariableAccess(_) => SemanticType::Variable,
            NodeKind::UnaryOperator { operand, .. } => self.node_type(operand, registry),
            NodeKind::BinaryOperator { left, right, .. } => {
                let left = self.node_type(left, registry);
                let right = self.node_type(right, registry);
                if left == SemanticType::String || right == SemanticType::String {
                    SemanticType::String
                } else {
                    left
                }
            }
            NodeKind::SubExpression { expression } => self.node_type(expression, registry),
            NodeKind::FunctionCall(call) => self.function_call_type(call, registry),
            NodeKind::Empty { .. } => SemanticType::Unknown,
        }
    }

    fn function_call_type(&self, call: &FunctionCall, registry: &MetadataRegistry) -> SemanticType {
        let returns = |kind: ValueKind| -> bool {
            if !call.behavior_name.is_empty() {
                self.behavior_type(&call.object_name, &call.behavior_name)
                    .map(|t| registry.behavior_expression(&t, &call.function_name, kind).is_found())
                    .unwrap_or(false)
            } else if !call.object_name.is_empty() {
                self.object_type(&call.object_name)
                    .map(|t| registry.object_expression(&t, &call.function_name, kind).is_found())
                    .unwrap_or(false)
            } else {
                registry.expression(&call.function_name, kind).is_found()
            }
        };
        if returns(ValueKind::Number) {
            SemanticType::Number
        } else if returns(ValueKind::String) {
            SemanticType::String
        } else {
            SemanticType::Unknown
        }
    }
}

/// Objects of a layout, falling back to the global objects of the project.
#[derive(Debug, Clone, Copy)]
pub struct ObjectsScope<'a> {
    pub global_objects: &'a [ObjectDeclaration],
    pub global_groups: &'a [ObjectGroup],
    pub objects: &'a [ObjectDeclaration],
    pub groups: &'a [ObjectGroup],
}

impl<'a> ObjectsScope<'a> {
    pub fn new(project: &'a Project, layout: Option<&'a Layout>) -> Self {
        ObjectsScope {
            global_objects: &project.objects,
            global_groups: &project.object_groups,
            objects: layout.map(|l| l.objects.as_slice()).unwrap_or(&[]),
            groups: layout.map(|l| l.object_groups.as_slice()).unwrap_or(&[]),
        }
    }
}

impl ExpressionTypeResolver for ObjectsScope<'_> {
    fn object(&self, name: &str) -> Option<&ObjectDeclaration> {
        self.objects
            .iter()
            .find(|o| o.name == name)
            .or_else(|| self.global_objects.iter().find(|o| o.name == name))
    }

    fn group(&self, name: &str) -> Option<&ObjectGroup> {
        self.groups
            .iter()
            .find(|g| g.name == name)
            .or_else(|| self.global_groups.iter().find(|g| g.name == name))
    }
}
