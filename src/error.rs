#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const E_UNKNOWN_INSTRUCTION: &str = "E-META-001";
pub const E_UNKNOWN_EXPRESSION: &str = "E-META-002";
pub const E_UNKNOWN_PARAMETER_TYPE: &str = "E-META-003";
pub const E_INVALID_OPERATOR: &str = "E-META-004";
pub const E_MALFORMED_EXPRESSION: &str = "E-EXPR-001";
pub const E_EXPRESSION_TYPE_MISMATCH: &str = "E-EXPR-002";
pub const E_UNRESOLVED_LINK: &str = "E-EVT-001";
pub const E_RECURSIVE_LINK: &str = "E-EVT-002";
pub const E_UNKNOWN_OBJECT: &str = "E-EVT-003";
pub const E_ASYNC_IN_CONDITION: &str = "E-ASYNC-001";

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

fn get_guarantee(code: &str) -> &'static str {
    match code {
        E_UNKNOWN_INSTRUCTION => {
            "Unknown conditions evaluate to true and unknown actions are skipped."
        }
        E_UNKNOWN_EXPRESSION => "Unknown functions evaluate to the neutral value of their kind.",
        E_UNKNOWN_PARAMETER_TYPE => "Parameters of unknown type are passed as plain strings.",
        E_INVALID_OPERATOR => "Invalid operators fall back to assignment or equality.",
        E_MALFORMED_EXPRESSION => {
            "Malformed expressions evaluate to the neutral value of their kind."
        }
        E_EXPRESSION_TYPE_MISMATCH => {
            "Values of the wrong kind are replaced by the neutral value of the expected kind."
        }
        E_UNRESOLVED_LINK => "Links to missing events generate no code.",
        E_RECURSIVE_LINK => "A link is never expanded inside its own target.",
        E_UNKNOWN_OBJECT => "Instructions on unknown objects operate on an empty list.",
        E_ASYNC_IN_CONDITION => "Asynchronous instructions only run as actions.",
        _ => "Unknown guarantee.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

/// A non-fatal problem found while compiling. Diagnostics never stop the
/// compilation; they are returned next to the generated code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompilerError {
    pub code: String,
    pub error_type: String,
    pub message: String,
    pub guarantee: String,
    /// Layout (or external events) the problem was found in.
    pub layout: String,
    /// Indices from the root events list down to the offending event.
    pub event_path: Vec<u32>,
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, message: &str, layout: &str, event_path: &[usize]) -> Self {
        Self::with_details(code, message, layout, event_path, None, vec![])
    }

    pub fn with_details(
        code: &str,
        message: &str,
        layout: &str,
        event_path: &[usize],
        context: Option<String>,
        hints: Vec<String>,
    ) -> Self {
        CompilerError {
            code: code.to_string(),
            error_type: error_type(code).to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            layout: layout.to_string(),
            event_path: event_path.iter().map(|i| *i as u32).collect(),
            context,
            hints,
        }
    }
}

fn error_type(code: &str) -> &'static str {
    if code.starts_with("E-META") {
        "METADATA"
    } else if code.starts_with("E-EXPR") {
        "EXPRESSION"
    } else if code.starts_with("E-ASYNC") {
        "ASYNC"
    } else {
        "EVENTS"
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HARD FAILURES
// ═══════════════════════════════════════════════════════════════════════════════

/// Failures while populating the metadata registry.
#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("extension `{0}` is already registered")]
    DuplicateExtension(String),

    #[error("invalid extension declaration `{path}`: {message}")]
    InvalidDeclaration { path: String, message: String },
}

/// Failures that abort a compilation request before any code is generated.
#[derive(thiserror::Error, Debug)]
pub enum CompileError {
    #[error("no layout named `{0}` in the project")]
    UnknownLayout(String),

    #[error("unknown target `{0}` (expected `js` or `cpp`)")]
    UnknownTarget(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub type Result<T> = std::result::Result<T, CompileError>;
