//! Expression AST and its visitor.
//!
//! Nodes are built once by the parser and never mutated afterwards. Visitors
//! borrow them and accumulate their results in their own state.

use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// NODES
// ═══════════════════════════════════════════════════════════════════════════════

/// Character range of a node in the expression text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Location {
    pub start: usize,
    pub end: usize,
}

impl Location {
    pub fn new(start: usize, end: usize) -> Self {
        Location { start, end }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionDiagnostic {
    pub message: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionNode {
    pub kind: NodeKind,
    pub location: Location,
    pub diagnostic: Option<ExpressionDiagnostic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    /// Number literal, kept as written.
    Number { value: String },
    /// String literal, unescaped.
    Text { value: String },
    Identifier { name: String },
    VariableAccess(VariableAccess),
    UnaryOperator { operator: char, operand: Box<ExpressionNode> },
    BinaryOperator {
        operator: char,
        left: Box<ExpressionNode>,
        right: Box<ExpressionNode>,
    },
    SubExpression { expression: Box<ExpressionNode> },
    FunctionCall(FunctionCall),
    /// Placeholder for text that could not be parsed.
    Empty { text: String },
}

/// `name.child[expr]...`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableAccess {
    pub name: String,
    pub accessors: Vec<VariableAccessor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VariableAccessor {
    Child { name: String },
    Bracket { expression: Box<ExpressionNode> },
}

/// `[object.][behavior::]function(parameters)`. `object_name` and
/// `behavior_name` are empty for free functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionCall {
    pub object_name: String,
    pub behavior_name: String,
    pub function_name: String,
    pub parameters: Vec<ExpressionNode>,
}

impl FunctionCall {
    /// Index, among the declared parameters of the function, of the first
    /// parameter written between the parenthesis. The object and the behavior
    /// are by convention the first declared parameters.
    pub fn written_parameters_first_index(&self) -> usize {
        written_parameters_first_index(&self.object_name, &self.behavior_name)
    }
}

pub fn written_parameters_first_index(object_name: &str, behavior_name: &str) -> usize {
    if !behavior_name.is_empty() {
        2
    } else if !object_name.is_empty() {
        1
    } else {
        0
    }
}

impl ExpressionNode {
    pub fn new(kind: NodeKind, location: Location) -> Self {
        ExpressionNode {
            kind,
            location,
            diagnostic: None,
        }
    }

    pub fn empty(text: &str, location: Location) -> Self {
        Self::new(
            NodeKind::Empty {
                text: text.to_string(),
            },
            location,
        )
    }

    pub fn with_diagnostic(mut self, message: &str) -> Self {
        self.diagnostic = Some(ExpressionDiagnostic {
            message: message.to_string(),
            location: self.location,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, NodeKind::Empty { .. })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VISITOR
// ═══════════════════════════════════════════════════════════════════════════════

/// Read-only traversal of an expression AST.
///
/// Implementers override `visit_*` methods and call the matching `walk_*`
/// function to keep descending.
pub trait ExpressionVisitor {
    fn visit_node(&mut self, node: &ExpressionNode) {
        walk_node(self, node);
    }

    fn visit_number(&mut self, _node: &ExpressionNode, _value: &str) {}

    fn visit_text(&mut self, _node: &ExpressionNode, _value: &str) {}

    fn visit_identifier(&mut self, _node: &ExpressionNode, _name: &str) {}

    fn visit_variable(&mut self, _node: &ExpressionNode, variable: &VariableAccess) {
        walk_variable(self, variable);
    }

    fn visit_variable_accessor(&mut self, accessor: &VariableAccessor) {
        walk_variable_accessor(self, accessor);
    }

    fn visit_unary_operator(&mut self, _node: &ExpressionNode, _operator: char, operand: &ExpressionNode) {
        self.visit_node(operand);
    }

    fn visit_binary_operator(
        &mut self,
        _node: &ExpressionNode,
        _operator: char,
        left: &ExpressionNode,
        right: &ExpressionNode,
    ) {
        self.visit_node(left);
        self.visit_node(right);
    }

    fn visit_sub_expression(&mut self, _node: &ExpressionNode, expression: &ExpressionNode) {
        self.visit_node(expression);
    }

    fn visit_function_call(&mut self, _node: &ExpressionNode, call: &FunctionCall) {
        walk_function_call(self, call);
    }

    fn visit_empty(&mut self, _node: &ExpressionNode, _text: &str) {}
}

pub fn walk_node<V: ExpressionVisitor + ?Sized>(visitor: &mut V, node: &ExpressionNode) {
    match &node.kind {
        NodeKind::Number { value } => visitor.visit_number(node, value),
        NodeKind::Text { value } => visitor.visit_text(node, value),
        NodeKind::Identifier { name } => visitor.visit_identifier(node, name),
        NodeKind::VariableAccess(variable) => visitor.visit_variable(node, variable),
        NodeKind::UnaryOperator { operator, operand } => {
            visitor.visit_unary_operator(node, *operator, operand)
        }
        NodeKind::BinaryOperator {
            operator,
            left,
            right,
        } => visitor.visit_binary_operator(node, *operator, left, right),
        NodeKind::SubExpression { expression } => visitor.visit_sub_expression(node, expression),
        NodeKind::FunctionCall(call) => visitor.visit_function_call(node, call),
        NodeKind::Empty { text } => visitor.visit_empty(node, text),
    }
}

pub fn walk_variable<V: ExpressionVisitor + ?Sized>(visitor: &mut V, variable: &VariableAccess) {
    for accessor in &variable.accessors {
        visitor.visit_variable_accessor(accessor);
    }
}

pub fn walk_variable_accessor<V: ExpressionVisitor + ?Sized>(visitor: &mut V, accessor: &VariableAccessor) {
    if let VariableAccessor::Bracket { expression } = accessor {
        visitor.visit_node(expression);
    }
}

pub fn walk_function_call<V: ExpressionVisitor + ?Sized>(visitor: &mut V, call: &FunctionCall) {
    for parameter in &call.parameters {
        visitor.visit_node(parameter);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALIDATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Collects every diagnostic attached to the nodes of an AST.
#[derive(Debug, Default)]
pub struct ExpressionValidator {
    pub diagnostics: Vec<ExpressionDiagnostic>,
}

impl ExpressionValidator {
    pub fn validate(node: &ExpressionNode) -> Vec<ExpressionDiagnostic> {
        let mut validator = ExpressionValidator::default();
        validator.visit_node(node);
        validator.diagnostics
    }
}

impl ExpressionVisitor for ExpressionValidator {
    fn visit_node(&mut self, node: &ExpressionNode) {
        if let Some(diagnostic) = &node.diagnostic {
            self.diagnostics.push(diagnostic.clone());
        }
        walk_node(self, node);
    }
}
