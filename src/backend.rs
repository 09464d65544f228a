//! Target language backends.
//!
//! The code generator decides *what* to emit; a backend decides how each
//! construct is spelled in the target language. Backends are stateless and
//! shared between parallel compilations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cpp_backend::CppBackend;
use crate::error::CompileError;
use crate::js_backend::JsBackend;
use crate::metadata::ValueKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// JavaScript, executed by the web runtime.
    #[default]
    Js,
    /// C++, compiled against the native runtime.
    Cpp,
}

impl Target {
    pub fn backend(self) -> &'static dyn Backend {
        match self {
            Target::Js => &JsBackend,
            Target::Cpp => &CppBackend,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Target::Js => "js",
            Target::Cpp => "cpp",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "js" | "javascript" => Ok(Target::Js),
            "cpp" | "c++" => Ok(Target::Cpp),
            _ => Err(CompileError::UnknownTarget(s.to_string())),
        }
    }
}

/// Initial content of an objects list variable, with every name already
/// resolved by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListInit<'a> {
    /// All instances of the object named `0` living in the scene.
    Scene(&'a str),
    Empty,
    /// Copy of the list variable `0`.
    Copy(&'a str),
    /// The instance of list `list` at index variable `index`.
    Element { list: &'a str, index: &'a str },
    /// Instances of object `0` read back from the callback snapshot.
    AsyncSnapshot(&'a str),
}

/// Spelling of every construct the generator emits. Statements returned by
/// the backend end with a newline.
pub trait Backend: Send + Sync {
    fn target(&self) -> Target;

    // ── Literals and declarations ──────────────────────────────────────────

    fn string_literal(&self, raw: &str) -> String;

    /// Value used when an expression of `kind` cannot be generated.
    fn default_value(&self, kind: ValueKind) -> String {
        match kind {
            ValueKind::String => self.string_literal(""),
            ValueKind::Boolean => "false".to_string(),
            ValueKind::Number => "0".to_string(),
        }
    }

    fn declare_boolean(&self, name: &str) -> String;

    fn declare_objects_list(&self, list: &str, init: &ListInit<'_>) -> String;

    fn comment(&self, text: &str) -> String {
        format!("/* {} */\n", text.replace("*/", "* /"))
    }

    // ── Objects ─────────────────────────────────────────────────────────────

    /// Instance being iterated in a loop over `list`.
    fn current_instance(&self, list: &str) -> String {
        format!("{}[i]", list)
    }

    fn first_instance(&self, list: &str) -> String {
        format!("{}[0]", list)
    }

    /// `instance.method(arguments)`.
    fn member_call(&self, instance: &str, method: &str, arguments: &str) -> String;

    fn behavior_of(&self, instance: &str, behavior_name: &str) -> String;

    /// `value_on_first` (written against [`Self::first_instance`]) when the
    /// list has instances, `default` otherwise.
    fn first_instance_or(&self, list: &str, value_on_first: &str, default: &str) -> String;

    /// Pointer to the first instance of the list, or null.
    fn first_instance_or_null(&self, list: &str) -> String;

    /// Keeps in `list` only the instances for which `predicate` (written
    /// against [`Self::current_instance`]) holds, setting `output` if any.
    fn object_filter_loop(&self, list: &str, predicate: &str, output: &str) -> String;

    /// Runs `statements` for every instance of `list`.
    fn object_loop(&self, list: &str, statements: &str) -> String;

    /// Runs `body` once per instance of `list`, `index` holding the position.
    fn for_each_loop(&self, index: &str, list: &str, body: &str) -> String;

    /// Map from object name to list, passed to functions working on several
    /// lists at once.
    fn objects_map(&self, entries: &[(String, String)]) -> String;

    /// Adds every instance of `source` missing from `target`.
    fn merge_objects_list(&self, source: &str, target: &str) -> String;

    /// Replaces the content of `target` by the content of `source`.
    fn replace_objects_list(&self, source: &str, target: &str) -> String;

    // ── Variables ───────────────────────────────────────────────────────────

    fn scene_variables(&self) -> String;

    fn global_variables(&self) -> String;

    fn object_variables(&self, instance: &str) -> String;

    fn variable_in(&self, container: &str, name: &str) -> String;

    fn variable_child(&self, variable: &str, name_code: &str) -> String;

    fn variable_child_at(&self, variable: &str, index_code: &str) -> String;

    fn variable_value(&self, variable: &str, kind: ValueKind) -> String;

    /// Variable written to when the object owning it has no instance.
    fn bad_variable(&self) -> String;

    // ── Runtime services ────────────────────────────────────────────────────

    fn current_scene(&self) -> String {
        "runtimeScene".to_string()
    }

    fn null_literal(&self) -> String;

    fn trigger_once(&self, id: u64) -> String;

    /// `lhs operator rhs` for a relational operator, `=` meaning equality.
    fn relational(&self, lhs: &str, operator: &str, rhs: &str, kind: ValueKind) -> String;

    // ── Asynchronous continuations ──────────────────────────────────────────

    /// Declares the container capturing lists for a callback, derived from
    /// the snapshot of the enclosing callback when there is one.
    fn declare_snapshot(&self, container: &str, parent_container: Option<&str>) -> String;

    fn capture_objects(&self, container: &str, object_name: &str, list: &str) -> String;

    /// Definition of a callback, placed outside of the main function.
    fn callback_function(&self, namespace: &str, name: &str, body: &str) -> String;

    /// Value to pass where a callback is expected, binding `container`.
    fn callback_value(&self, namespace: &str, name: &str, container: &str) -> String;

    /// Schedules `callback` once the task returned by `task` is done.
    fn add_async_task(&self, task: &str, callback: &str) -> String;

    /// Schedules `callback` once every task is done. Each entry is a list and
    /// the task started for each of its instances, written against
    /// [`Self::current_instance`].
    fn add_async_task_group(&self, tasks: &[(String, String)], callback: &str) -> String;

    // ── Compilation unit ────────────────────────────────────────────────────

    /// Whole file for a layout: `includes`, then the code placed outside of
    /// the main function, then the main function running `main_body`.
    fn compilation_unit(
        &self,
        namespace: &str,
        includes: &[String],
        outside_main: &[String],
        main_body: &str,
    ) -> String;
}

/// Maps the relational operators of instructions to target operators.
/// Anything unknown falls back to equality.
pub fn comparison_operator(operator: &str) -> Option<&'static str> {
    match operator {
        "=" | "==" => Some("=="),
        "!=" => Some("!="),
        "<" => Some("<"),
        ">" => Some(">"),
        "<=" => Some("<="),
        ">=" => Some(">="),
        _ => None,
    }
}

/// Compound assignment matching an operator parameter.
pub fn compound_operator(operator: &str) -> Option<&'static str> {
    match operator {
        "=" => Some("="),
        "+" => Some("+="),
        "-" => Some("-="),
        "*" => Some("*="),
        "/" => Some("/="),
        _ => None,
    }
}
