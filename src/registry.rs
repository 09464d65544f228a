//! Extension builder and the metadata registry.
//!
//! The registry is populated once, before any compilation, and is then only
//! read. Lookups hand out borrowed records; a miss returns a shared sentinel
//! with empty fields so callers can keep compiling.

use lazy_static::lazy_static;
use std::collections::HashMap;

use crate::error::RegistryError;
use crate::metadata::{
    BehaviorMetadata, ExpressionMetadata, InstructionMetadata, MetadataKind, ObjectMetadata,
    Owner, ValueKind,
};

lazy_static! {
    static ref BAD_INSTRUCTION: InstructionMetadata = InstructionMetadata::default();
    static ref BAD_EXPRESSION: ExpressionMetadata = ExpressionMetadata::default();
    static ref BAD_OBJECT: ObjectMetadata = ObjectMetadata::default();
    static ref BAD_BEHAVIOR: BehaviorMetadata = BehaviorMetadata::default();
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXTENSION BUILDER
// ═══════════════════════════════════════════════════════════════════════════════

/// A registration unit bundling object types, behaviors, instructions and
/// expressions under one namespace.
#[derive(Debug, Clone, Default)]
pub struct Extension {
    pub name: String,
    pub full_name: String,
    /// Prefix of every declared type (`Physics::`).
    namespace: String,
    /// Free expressions are reachable by their bare name (`abs`, `ToString`).
    global_expressions: bool,
    pub conditions: Vec<InstructionMetadata>,
    pub actions: Vec<InstructionMetadata>,
    pub expressions: Vec<ExpressionMetadata>,
    pub objects: Vec<ObjectMetadata>,
    pub behaviors: Vec<BehaviorMetadata>,
}

impl Extension {
    pub fn new(name: &str) -> Self {
        Extension {
            name: name.to_string(),
            full_name: name.to_string(),
            namespace: format!("{}::", name),
            ..Default::default()
        }
    }

    pub fn set_full_name(mut self, full_name: &str) -> Self {
        self.full_name = full_name.to_string();
        self
    }

    /// Declares the free expressions of this extension without namespace,
    /// the way built-in math and string functions are written.
    pub fn with_global_expressions(mut self) -> Self {
        self.global_expressions = true;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn qualified(&self, name: &str) -> String {
        format!("{}{}", self.namespace, name)
    }

    fn push_instruction(&mut self, is_condition: bool, name: &str, owner: Owner) -> &mut InstructionMetadata {
        let metadata = InstructionMetadata::new(&self.name, &self.qualified(name), name, owner);
        let list = if is_condition {
            &mut self.conditions
        } else {
            &mut self.actions
        };
        list.push(metadata);
        let last = list.len() - 1;
        &mut list[last]
    }

    fn push_expression(&mut self, full_name: String, owner: Owner, kind: ValueKind) -> &mut ExpressionMetadata {
        self.expressions
            .push(ExpressionMetadata::new(&self.name, &full_name, owner, kind));
        let last = self.expressions.len() - 1;
        &mut self.expressions[last]
    }

    pub fn add_condition(&mut self, name: &str) -> &mut InstructionMetadata {
        self.push_instruction(true, name, Owner::Free)
    }

    pub fn add_action(&mut self, name: &str) -> &mut InstructionMetadata {
        self.push_instruction(false, name, Owner::Free)
    }

    pub fn add_object_condition(&mut self, object_type: &str, name: &str) -> &mut InstructionMetadata {
        self.push_instruction(true, name, Owner::Object(object_type.to_string()))
    }

    pub fn add_object_action(&mut self, object_type: &str, name: &str) -> &mut InstructionMetadata {
        self.push_instruction(false, name, Owner::Object(object_type.to_string()))
    }

    pub fn add_behavior_condition(&mut self, behavior_type: &str, name: &str) -> &mut InstructionMetadata {
        self.push_instruction(true, name, Owner::Behavior(behavior_type.to_string()))
    }

    pub fn add_behavior_action(&mut self, behavior_type: &str, name: &str) -> &mut InstructionMetadata {
        self.push_instruction(false, name, Owner::Behavior(behavior_type.to_string()))
    }

    fn free_expression_name(&self, name: &str) -> String {
        if self.global_expressions {
            name.to_string()
        } else {
            self.qualified(name)
        }
    }

    pub fn add_expression(&mut self, name: &str) -> &mut ExpressionMetadata {
        let full_name = self.free_expression_name(name);
        self.push_expression(full_name, Owner::Free, ValueKind::Number)
    }

    pub fn add_str_expression(&mut self, name: &str) -> &mut ExpressionMetadata {
        let full_name = self.free_expression_name(name);
        self.push_expression(full_name, Owner::Free, ValueKind::String)
    }

    /// Expression called as `Object.name()`.
    pub fn add_object_expression(&mut self, object_type: &str, name: &str, kind: ValueKind) -> &mut ExpressionMetadata {
        self.push_expression(name.to_string(), Owner::Object(object_type.to_string()), kind)
    }

    /// Expression called as `Object.Behavior::name()`.
    pub fn add_behavior_expression(&mut self, behavior_type: &str, name: &str, kind: ValueKind) -> &mut ExpressionMetadata {
        self.push_expression(name.to_string(), Owner::Behavior(behavior_type.to_string()), kind)
    }

    /// Declares an object type. The empty name declares the base object every
    /// other object type inherits instructions from.
    pub fn add_object(&mut self, name: &str) -> &mut ObjectMetadata {
        let full_type = if name.is_empty() {
            String::new()
        } else {
            self.qualified(name)
        };
        self.objects.push(ObjectMetadata {
            full_type,
            extension: self.name.clone(),
            ..Default::default()
        });
        let last = self.objects.len() - 1;
        &mut self.objects[last]
    }

    pub fn add_behavior(&mut self, name: &str) -> &mut BehaviorMetadata {
        self.behaviors.push(BehaviorMetadata {
            full_type: self.qualified(name),
            extension: self.name.clone(),
            ..Default::default()
        });
        let last = self.behaviors.len() - 1;
        &mut self.behaviors[last]
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LookupKey {
    kind: MetadataKind,
    owner: String,
    name: String,
}

impl LookupKey {
    fn new(kind: MetadataKind, owner: &str, name: &str) -> Self {
        LookupKey {
            kind,
            owner: owner.to_string(),
            name: name.to_string(),
        }
    }
}

/// Borrowed result of a lookup: the record and the name of the extension
/// declaring it. `extension` is empty for the sentinel.
#[derive(Debug)]
pub struct Resolved<'a, T> {
    pub extension: &'a str,
    pub metadata: &'a T,
}

impl<T> Clone for Resolved<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Resolved<'_, T> {}

impl<T> Resolved<'_, T> {
    pub fn is_found(&self) -> bool {
        !self.extension.is_empty()
    }
}

/// Any metadata record, as returned by [`MetadataRegistry::lookup`].
#[derive(Debug, Clone, Copy)]
pub enum MetadataRef<'a> {
    Instruction(&'a InstructionMetadata),
    Expression(&'a ExpressionMetadata),
    Object(&'a ObjectMetadata),
    Behavior(&'a BehaviorMetadata),
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Condition(usize),
    Action(usize),
    Expression(usize),
    Object(usize),
    Behavior(usize),
}

#[derive(Debug, Default)]
pub struct MetadataRegistry {
    extensions: Vec<Extension>,
    index: HashMap<LookupKey, (usize, Slot)>,
}

impl MetadataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an extension. When two extensions declare the same qualified
    /// name, the one registered first keeps it.
    pub fn register(&mut self, extension: Extension) -> Result<(), RegistryError> {
        if self.extensions.iter().any(|e| e.name == extension.name) {
            return Err(RegistryError::DuplicateExtension(extension.name));
        }
        let ext_index = self.extensions.len();

        let mut keys = Vec::new();
        for (i, condition) in extension.conditions.iter().enumerate() {
            keys.push((
                LookupKey::new(MetadataKind::Condition, "", &condition.full_type),
                Slot::Condition(i),
            ));
        }
        for (i, action) in extension.actions.iter().enumerate() {
            keys.push((
                LookupKey::new(MetadataKind::Action, "", &action.full_type),
                Slot::Action(i),
            ));
        }
        for (i, expression) in extension.expressions.iter().enumerate() {
            keys.push((
                LookupKey::new(
                    expression.return_kind.expression_kind(),
                    &owner_key(&expression.owner),
                    &expression.full_name,
                ),
                Slot::Expression(i),
            ));
        }
        for (i, object) in extension.objects.iter().enumerate() {
            keys.push((
                LookupKey::new(MetadataKind::Object, "", &object.full_type),
                Slot::Object(i),
            ));
        }
        for (i, behavior) in extension.behaviors.iter().enumerate() {
            keys.push((
                LookupKey::new(MetadataKind::Behavior, "", &behavior.full_type),
                Slot::Behavior(i),
            ));
        }

        for (key, slot) in keys {
            if self.index.contains_key(&key) {
                tracing::debug!(
                    extension = %extension.name,
                    name = %key.name,
                    "metadata already declared by an earlier extension, keeping the first one"
                );
                continue;
            }
            self.index.insert(key, (ext_index, slot));
        }

        tracing::debug!(extension = %extension.name, "extension registered");
        self.extensions.push(extension);
        Ok(())
    }

    pub fn extensions(&self) -> &[Extension] {
        &self.extensions
    }

    pub fn extension(&self, name: &str) -> Option<&Extension> {
        self.extensions.iter().find(|e| e.name == name)
    }

    fn get(&self, key: &LookupKey) -> Option<(&str, MetadataRef<'_>)> {
        let (ext_index, slot) = self.index.get(key)?;
        let extension = &self.extensions[*ext_index];
        let metadata = match *slot {
            Slot::Condition(i) => MetadataRef::Instruction(&extension.conditions[i]),
            Slot::Action(i) => MetadataRef::Instruction(&extension.actions[i]),
            Slot::Expression(i) => MetadataRef::Expression(&extension.expressions[i]),
            Slot::Object(i) => MetadataRef::Object(&extension.objects[i]),
            Slot::Behavior(i) => MetadataRef::Behavior(&extension.behaviors[i]),
        };
        Some((extension.name.as_str(), metadata))
    }

    /// Generic lookup of a free instruction, free expression, object type or
    /// behavior type by its qualified name.
    pub fn lookup(&self, kind: MetadataKind, type_name: &str) -> Option<MetadataRef<'_>> {
        self.get(&LookupKey::new(kind, "", type_name))
            .map(|(_, metadata)| metadata)
    }

    fn instruction(&self, kind: MetadataKind, type_name: &str) -> Resolved<'_, InstructionMetadata> {
        match self.get(&LookupKey::new(kind, "", type_name)) {
            Some((extension, MetadataRef::Instruction(metadata))) => Resolved { extension, metadata },
            _ => Resolved {
                extension: "",
                metadata: &BAD_INSTRUCTION,
            },
        }
    }

    pub fn condition(&self, type_name: &str) -> Resolved<'_, InstructionMetadata> {
        self.instruction(MetadataKind::Condition, type_name)
    }

    pub fn action(&self, type_name: &str) -> Resolved<'_, InstructionMetadata> {
        self.instruction(MetadataKind::Action, type_name)
    }

    fn expression_with_owner(&self, owner: &Owner, name: &str, kind: ValueKind) -> Option<Resolved<'_, ExpressionMetadata>> {
        match self.get(&LookupKey::new(kind.expression_kind(), &owner_key(owner), name)) {
            Some((extension, MetadataRef::Expression(metadata))) => Some(Resolved { extension, metadata }),
            _ => None,
        }
    }

    fn bad_expression(&self) -> Resolved<'_, ExpressionMetadata> {
        Resolved {
            extension: "",
            metadata: &BAD_EXPRESSION,
        }
    }

    /// Free function `name(...)` returning `kind`.
    pub fn expression(&self, name: &str, kind: ValueKind) -> Resolved<'_, ExpressionMetadata> {
        self.expression_with_owner(&Owner::Free, name, kind)
            .unwrap_or_else(|| self.bad_expression())
    }

    /// `Object.name(...)`, looked up on the object type then on the base object.
    pub fn object_expression(&self, object_type: &str, name: &str, kind: ValueKind) -> Resolved<'_, ExpressionMetadata> {
        self.expression_with_owner(&Owner::Object(object_type.to_string()), name, kind)
            .or_else(|| self.expression_with_owner(&Owner::Object(String::new()), name, kind))
            .unwrap_or_else(|| self.bad_expression())
    }

    pub fn behavior_expression(&self, behavior_type: &str, name: &str, kind: ValueKind) -> Resolved<'_, ExpressionMetadata> {
        self.expression_with_owner(&Owner::Behavior(behavior_type.to_string()), name, kind)
            .unwrap_or_else(|| self.bad_expression())
    }

    /// Whether any expression of either kind exists for this call shape.
    pub fn has_any_expression(&self, owner: &Owner, name: &str) -> bool {
        [ValueKind::Number, ValueKind::String]
            .iter()
            .any(|kind| match owner {
                Owner::Object(t) => self.object_expression(t, name, *kind).is_found(),
                _ => self.expression_with_owner(owner, name, *kind).is_some(),
            })
    }

    pub fn object(&self, type_name: &str) -> Resolved<'_, ObjectMetadata> {
        match self.get(&LookupKey::new(MetadataKind::Object, "", type_name)) {
            Some((extension, MetadataRef::Object(metadata))) => Resolved { extension, metadata },
            _ => Resolved {
                extension: "",
                metadata: &BAD_OBJECT,
            },
        }
    }

    pub fn behavior(&self, type_name: &str) -> Resolved<'_, BehaviorMetadata> {
        match self.get(&LookupKey::new(MetadataKind::Behavior, "", type_name)) {
            Some((extension, MetadataRef::Behavior(metadata))) => Resolved { extension, metadata },
            _ => Resolved {
                extension: "",
                metadata: &BAD_BEHAVIOR,
            },
        }
    }
}

fn owner_key(owner: &Owner) -> String {
    match owner {
        Owner::Free => String::new(),
        Owner::Object(t) => format!("object:{}", t),
        Owner::Behavior(t) => format!("behavior:{}", t),
    }
}
