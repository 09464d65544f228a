//! Program model: instructions, expressions and the closed set of events.
//!
//! The events tree is a strictly owned forest: every event owns its
//! sub-events and nothing points back up. The compiler only reads it.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::ast::ExpressionNode;
use crate::expression_parser::parse_expression;
use crate::metadata::ValueKind;

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSION
// ═══════════════════════════════════════════════════════════════════════════════

/// Raw expression text plus its lazily parsed AST. The kind of an expression
/// comes from the metadata of the parameter it is used for, so one AST is
/// cached per kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Expression {
    text: String,
    number_ast: OnceLock<ExpressionNode>,
    text_ast: OnceLock<ExpressionNode>,
}

impl Expression {
    pub fn new(text: &str) -> Self {
        Expression {
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// The AST of this expression parsed with the grammar of `kind`. Parsed
    /// on first use, then shared.
    pub fn ast(&self, kind: ValueKind) -> &ExpressionNode {
        match kind {
            ValueKind::String => self
                .text_ast
                .get_or_init(|| parse_expression(&self.text, ValueKind::String)),
            _ => self
                .number_ast
                .get_or_init(|| parse_expression(&self.text, ValueKind::Number)),
        }
    }
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl From<String> for Expression {
    fn from(text: String) -> Self {
        Expression {
            text,
            ..Default::default()
        }
    }
}

impl From<&str> for Expression {
    fn from(text: &str) -> Self {
        Expression::new(text)
    }
}

impl From<Expression> for String {
    fn from(expression: Expression) -> Self {
        expression.text
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// INSTRUCTION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    /// Namespace-qualified type, e.g. `BuiltinKeyboard::KeyPressed`.
    #[serde(rename = "type")]
    pub instruction_type: String,
    /// User-supplied parameters, in declaration order. Code-only parameters
    /// have no slot here: the n-th value goes to the n-th parameter that is
    /// not code-only.
    #[serde(default)]
    pub parameters: Vec<Expression>,
    #[serde(default)]
    pub inverted: bool,
    /// For optionally-asynchronous actions: wait for completion.
    #[serde(default)]
    pub awaited: bool,
    #[serde(default)]
    pub sub_instructions: Vec<Instruction>,
    #[serde(default)]
    pub disabled: bool,
}

impl Instruction {
    pub fn new(instruction_type: &str, parameters: &[&str]) -> Self {
        Instruction {
            instruction_type: instruction_type.to_string(),
            parameters: parameters.iter().map(|p| Expression::new(p)).collect(),
            ..Default::default()
        }
    }

    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }

    pub fn awaited(mut self) -> Self {
        self.awaited = true;
        self
    }

    pub fn with_sub_instructions(mut self, sub_instructions: Vec<Instruction>) -> Self {
        self.sub_instructions = sub_instructions;
        self
    }

    pub fn parameter(&self, index: usize) -> Option<&Expression> {
        self.parameters.get(index)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

pub type EventsList = Vec<Event>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct StandardEvent {
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub conditions: Vec<Instruction>,
    #[serde(default)]
    pub actions: Vec<Instruction>,
    #[serde(default, rename = "events")]
    pub sub_events: EventsList,
    /// Indices from the root of the layout down to this event, as written
    /// before links were expanded and disabled events removed.
    #[serde(skip)]
    pub source_path: Vec<usize>,
}

/// Runs its conditions, actions and sub-events once per instance of `object`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ForEachEvent {
    #[serde(default)]
    pub disabled: bool,
    pub object: Expression,
    #[serde(default)]
    pub conditions: Vec<Instruction>,
    #[serde(default)]
    pub actions: Vec<Instruction>,
    #[serde(default, rename = "events")]
    pub sub_events: EventsList,
    /// Indices from the root of the layout down to this event, as written
    /// before links were expanded and disabled events removed.
    #[serde(skip)]
    pub source_path: Vec<usize>,
}

/// `instruction` is an asynchronous action; `actions` and `sub_events` run
/// once it has completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AsyncEvent {
    #[serde(default)]
    pub disabled: bool,
    pub instruction: Instruction,
    #[serde(default)]
    pub actions: Vec<Instruction>,
    #[serde(default, rename = "events")]
    pub sub_events: EventsList,
    /// Indices from the root of the layout down to this event, as written
    /// before links were expanded and disabled events removed.
    #[serde(skip)]
    pub source_path: Vec<usize>,
}

/// Inclusive range of events included by a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRange {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LinkEvent {
    #[serde(default)]
    pub disabled: bool,
    /// Name of the external events (or layout) to include.
    pub target: String,
    #[serde(default)]
    pub range: Option<LinkRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommentEvent {
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "BuiltinCommonInstructions::Standard")]
    Standard(StandardEvent),
    #[serde(rename = "BuiltinCommonInstructions::ForEach")]
    ForEach(ForEachEvent),
    #[serde(rename = "BuiltinAsync::AsyncEvent")]
    Async(AsyncEvent),
    #[serde(rename = "BuiltinCommonInstructions::Link")]
    Link(LinkEvent),
    #[serde(rename = "BuiltinCommonInstructions::Comment")]
    Comment(CommentEvent),
    /// Anything that could not be recognized.
    #[serde(other)]
    Empty,
}

impl Event {
    pub fn standard(conditions: Vec<Instruction>, actions: Vec<Instruction>) -> Self {
        Event::Standard(StandardEvent {
            conditions,
            actions,
            ..Default::default()
        })
    }
}

/// Whether the variant can carry sub-events.
pub fn can_have_sub_events(event: &Event) -> bool {
    matches!(event, Event::Standard(_) | Event::ForEach(_) | Event::Async(_))
}

/// Whether the generator emits code for the variant. Links are expanded
/// before generation and are never executable themselves.
pub fn is_executable(event: &Event) -> bool {
    matches!(event, Event::Standard(_) | Event::ForEach(_) | Event::Async(_))
}

pub fn is_disabled(event: &Event) -> bool {
    match event {
        Event::Standard(e) => e.disabled,
        Event::ForEach(e) => e.disabled,
        Event::Async(e) => e.disabled,
        Event::Link(e) => e.disabled,
        Event::Comment(_) | Event::Empty => false,
    }
}

/// Path recorded by preprocessing; empty for events built directly.
pub fn source_path(event: &Event) -> &[usize] {
    match event {
        Event::Standard(e) => &e.source_path,
        Event::ForEach(e) => &e.source_path,
        Event::Async(e) => &e.source_path,
        Event::Link(_) | Event::Comment(_) | Event::Empty => &[],
    }
}

pub fn sub_events(event: &Event) -> Option<&EventsList> {
    match event {
        Event::Standard(e) => Some(&e.sub_events),
        Event::ForEach(e) => Some(&e.sub_events),
        Event::Async(e) => Some(&e.sub_events),
        Event::Link(_) | Event::Comment(_) | Event::Empty => None,
    }
}

/// Every instruction list of the event (conditions first, then actions).
pub fn instruction_lists(event: &Event) -> Vec<&[Instruction]> {
    match event {
        Event::Standard(e) => vec![&e.conditions, &e.actions],
        Event::ForEach(e) => vec![&e.conditions, &e.actions],
        Event::Async(e) => vec![std::slice::from_ref(&e.instruction), &e.actions],
        Event::Link(_) | Event::Comment(_) | Event::Empty => Vec::new(),
    }
}
