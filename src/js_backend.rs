//! JavaScript backend, for the web runtime (`gdjs`).

use crate::backend::{comparison_operator, Backend, ListInit, Target};
use crate::metadata::ValueKind;
use crate::naming::quote;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsBackend;

impl Backend for JsBackend {
    fn target(&self) -> Target {
        Target::Js
    }

    fn string_literal(&self, raw: &str) -> String {
        quote(raw)
    }

    fn declare_boolean(&self, name: &str) -> String {
        format!("let {} = false;\n", name)
    }

    fn declare_objects_list(&self, list: &str, init: &ListInit<'_>) -> String {
        let value = match init {
            ListInit::Scene(object_name) => {
                format!("runtimeScene.getObjects({}).slice()", quote(object_name))
            }
            ListInit::Empty => "[]".to_string(),
            ListInit::Copy(parent) => format!("{}.slice()", parent),
            ListInit::Element { list, index } => format!("[{}[{}]]", list, index),
            ListInit::AsyncSnapshot(object_name) => {
                format!("asyncObjectsList.getObjects({}).slice()", quote(object_name))
            }
        };
        format!("let {} = {};\n", list, value)
    }

    fn member_call(&self, instance: &str, method: &str, arguments: &str) -> String {
        format!("{}.{}({})", instance, method, arguments)
    }

    fn behavior_of(&self, instance: &str, behavior_name: &str) -> String {
        format!("{}.getBehavior({})", instance, quote(behavior_name))
    }

    fn first_instance_or(&self, list: &str, value_on_first: &str, default: &str) -> String {
        format!("(( {}.length === 0 ) ? {} : {})", list, default, value_on_first)
    }

    fn first_instance_or_null(&self, list: &str) -> String {
        format!("(( {}.length === 0 ) ? null : {}[0])", list, list)
    }

    fn object_filter_loop(&self, list: &str, predicate: &str, output: &str) -> String {
        format!(
            "{{\nlet k = 0;\nfor (let i = 0; i < {list}.length; ++i) {{\n    if ( {predicate} ) {{\n        {output} = true;\n        {list}[k] = {list}[i];\n        ++k;\n    }}\n}}\n{list}.length = k;\n}}\n",
            list = list,
            predicate = predicate,
            output = output
        )
    }

    fn object_loop(&self, list: &str, statements: &str) -> String {
        format!(
            "for (let i = 0; i < {list}.length; ++i) {{\n{statements}}}\n",
            list = list,
            statements = statements
        )
    }

    fn for_each_loop(&self, index: &str, list: &str, body: &str) -> String {
        format!(
            "for (let {index} = 0; {index} < {list}.length; ++{index}) {{\n{body}}}\n",
            index = index,
            list = list,
            body = body
        )
    }

    fn objects_map(&self, entries: &[(String, String)]) -> String {
        let entries: Vec<String> = entries
            .iter()
            .map(|(name, list)| format!("{}: {}", quote(name), list))
            .collect();
        format!("gdjs.Hashtable.newFrom({{{}}})", entries.join(", "))
    }

    fn merge_objects_list(&self, source: &str, target: &str) -> String {
        format!(
            "for (const obj of {source}) {{ if ({target}.indexOf(obj) === -1) {target}.push(obj); }}\n",
            source = source,
            target = target
        )
    }

    fn replace_objects_list(&self, source: &str, target: &str) -> String {
        format!(
            "{target}.length = 0;\nfor (const obj of {source}) {target}.push(obj);\n",
            source = source,
            target = target
        )
    }

    fn scene_variables(&self) -> String {
        "runtimeScene.getScene().getVariables()".to_string()
    }

    fn global_variables(&self) -> String {
        "runtimeScene.getGame().getVariables()".to_string()
    }

    fn object_variables(&self, instance: &str) -> String {
        format!("{}.getVariables()", instance)
    }

    fn variable_in(&self, container: &str, name: &str) -> String {
        format!("{}.get({})", container, quote(name))
    }

    fn variable_child(&self, variable: &str, name_code: &str) -> String {
        format!("{}.getChild({})", variable, name_code)
    }

    fn variable_child_at(&self, variable: &str, index_code: &str) -> String {
        format!("{}.getChildAt({})", variable, index_code)
    }

    fn variable_value(&self, variable: &str, kind: ValueKind) -> String {
        match kind {
            ValueKind::Number => format!("{}.getAsNumber()", variable),
            ValueKind::String => format!("{}.getAsString()", variable),
            ValueKind::Boolean => format!("{}.getAsBoolean()", variable),
        }
    }

    fn bad_variable(&self) -> String {
        "gdjs.VariablesContainer.badVariable".to_string()
    }

    fn null_literal(&self) -> String {
        "null".to_string()
    }

    fn trigger_once(&self, id: u64) -> String {
        format!("runtimeScene.getOnceTriggers().triggerOnce({})", id)
    }

    fn relational(&self, lhs: &str, operator: &str, rhs: &str, kind: ValueKind) -> String {
        if kind == ValueKind::String {
            match operator {
                "startsWith" => return format!("{}.startsWith({})", lhs, rhs),
                "endsWith" => return format!("{}.endsWith({})", lhs, rhs),
                "contains" => return format!("{}.includes({})", lhs, rhs),
                _ => {}
            }
        }
        let operator = comparison_operator(operator).unwrap_or("==");
        format!("{} {} {}", lhs, operator, rhs)
    }

    fn declare_snapshot(&self, container: &str, parent_container: Option<&str>) -> String {
        match parent_container {
            Some(parent) => format!(
                "const {} = gdjs.LongLivedObjectsList.from({});\n",
                container, parent
            ),
            None => format!("const {} = new gdjs.LongLivedObjectsList();\n", container),
        }
    }

    fn capture_objects(&self, container: &str, object_name: &str, list: &str) -> String {
        format!(
            "for (const obj of {}) {}.addObject({}, obj);\n",
            list,
            container,
            quote(object_name)
        )
    }

    fn callback_function(&self, namespace: &str, name: &str, body: &str) -> String {
        format!(
            "gdjs.{}.{} = function (runtimeScene, asyncObjectsList) {{\n{}}}\n",
            namespace, name, body
        )
    }

    fn callback_value(&self, namespace: &str, name: &str, container: &str) -> String {
        format!(
            "(runtimeScene) => (gdjs.{}.{}(runtimeScene, {}))",
            namespace, name, container
        )
    }

    fn add_async_task(&self, task: &str, callback: &str) -> String {
        format!(
            "runtimeScene.getAsyncTasksManager().addTask({}, {});\n",
            task, callback
        )
    }

    fn add_async_task_group(&self, tasks: &[(String, String)], callback: &str) -> String {
        let mut code = "{\nconst asyncTaskGroup = new gdjs.TaskGroup();\n".to_string();
        for (list, task) in tasks {
            code.push_str(&format!(
                "for (let i = 0; i < {list}.length; ++i) {{\nasyncTaskGroup.addTask({task});\n}}\n",
                list = list,
                task = task
            ));
        }
        code.push_str(&format!(
            "runtimeScene.getAsyncTasksManager().addTask(asyncTaskGroup, {});\n}}\n",
            callback
        ));
        code
    }

    fn compilation_unit(
        &self,
        namespace: &str,
        _includes: &[String],
        outside_main: &[String],
        main_body: &str,
    ) -> String {
        let mut code = format!("gdjs.{} = {{}};\n", namespace);
        for chunk in outside_main {
            code.push_str(chunk);
            code.push('\n');
        }
        code.push_str(&format!(
            "gdjs.{}.func = function (runtimeScene) {{\nruntimeScene.getOnceTriggers().startNewFrame();\n{}\nreturn;\n}};\n",
            namespace, main_body
        ));
        code
    }
}
