//! C++ backend, for the native runtime.

use crate::backend::{comparison_operator, Backend, ListInit, Target};
use crate::metadata::ValueKind;
use crate::naming::quote;

/// Header every generated C++ file starts with.
pub const RUNTIME_SCENE_HEADER: &str = "GDCpp/Runtime/RuntimeScene.h";

const OBJECTS_LIST_TYPE: &str = "std::vector<RuntimeObject*>";

#[derive(Debug, Clone, Copy, Default)]
pub struct CppBackend;

impl Backend for CppBackend {
    fn target(&self) -> Target {
        Target::Cpp
    }

    fn string_literal(&self, raw: &str) -> String {
        format!("gd::String({})", quote(raw))
    }

    fn declare_boolean(&self, name: &str) -> String {
        format!("bool {} = false;\n", name)
    }

    fn declare_objects_list(&self, list: &str, init: &ListInit<'_>) -> String {
        match init {
            ListInit::Scene(object_name) => format!(
                "{} {} = runtimeScene.GetObjectsRawPointers({});\n",
                OBJECTS_LIST_TYPE,
                list,
                quote(object_name)
            ),
            ListInit::Empty => format!("{} {};\n", OBJECTS_LIST_TYPE, list),
            ListInit::Copy(parent) => format!("{} {} = {};\n", OBJECTS_LIST_TYPE, list, parent),
            ListInit::Element { list: parent, index } => format!(
                "{} {} = {{ {}[{}] }};\n",
                OBJECTS_LIST_TYPE, list, parent, index
            ),
            ListInit::AsyncSnapshot(object_name) => format!(
                "{} {} = asyncObjectsList.GetObjects({});\n",
                OBJECTS_LIST_TYPE,
                list,
                quote(object_name)
            ),
        }
    }

    fn member_call(&self, instance: &str, method: &str, arguments: &str) -> String {
        format!("{}->{}({})", instance, method, arguments)
    }

    fn behavior_of(&self, instance: &str, behavior_name: &str) -> String {
        format!("{}->GetBehaviorRawPointer({})", instance, quote(behavior_name))
    }

    fn first_instance_or(&self, list: &str, value_on_first: &str, default: &str) -> String {
        format!("({}.empty() ? {} : {})", list, default, value_on_first)
    }

    fn first_instance_or_null(&self, list: &str) -> String {
        format!("({}.empty() ? nullptr : {}[0])", list, list)
    }

    fn object_filter_loop(&self, list: &str, predicate: &str, output: &str) -> String {
        format!(
            "{{\nstd::size_t k = 0;\nfor (std::size_t i = 0; i < {list}.size(); ++i) {{\n    if ( {predicate} ) {{\n        {output} = true;\n        {list}[k] = {list}[i];\n        ++k;\n    }}\n}}\n{list}.resize(k);\n}}\n",
            list = list,
            predicate = predicate,
            output = output
        )
    }

    fn object_loop(&self, list: &str, statements: &str) -> String {
        format!(
            "for (std::size_t i = 0; i < {list}.size(); ++i) {{\n{statements}}}\n",
            list = list,
            statements = statements
        )
    }

    fn for_each_loop(&self, index: &str, list: &str, body: &str) -> String {
        format!(
            "for (std::size_t {index} = 0; {index} < {list}.size(); ++{index}) {{\n{body}}}\n",
            index = index,
            list = list,
            body = body
        )
    }

    fn objects_map(&self, entries: &[(String, String)]) -> String {
        let entries: Vec<String> = entries
            .iter()
            .map(|(name, list)| format!("{{{}, &{}}}", quote(name), list))
            .collect();
        format!(
            "std::map<gd::String, {}*>{{{}}}",
            OBJECTS_LIST_TYPE,
            entries.join(", ")
        )
    }

    fn merge_objects_list(&self, source: &str, target: &str) -> String {
        format!(
            "for (RuntimeObject* obj : {source}) {{ if (std::find({target}.begin(), {target}.end(), obj) == {target}.end()) {target}.push_back(obj); }}\n",
            source = source,
            target = target
        )
    }

    fn replace_objects_list(&self, source: &str, target: &str) -> String {
        format!("{} = {};\n", target, source)
    }

    fn scene_variables(&self) -> String {
        "runtimeScene.GetVariables()".to_string()
    }

    fn global_variables(&self) -> String {
        "runtimeScene.game->GetVariables()".to_string()
    }

    fn object_variables(&self, instance: &str) -> String {
        format!("{}->GetVariables()", instance)
    }

    fn variable_in(&self, container: &str, name: &str) -> String {
        format!("{}.Get({})", container, quote(name))
    }

    fn variable_child(&self, variable: &str, name_code: &str) -> String {
        format!("{}.GetChild({})", variable, name_code)
    }

    fn variable_child_at(&self, variable: &str, index_code: &str) -> String {
        format!("{}.GetAtIndex({})", variable, index_code)
    }

    fn variable_value(&self, variable: &str, kind: ValueKind) -> String {
        match kind {
            ValueKind::Number => format!("{}.GetValue()", variable),
            ValueKind::String => format!("{}.GetString()", variable),
            ValueKind::Boolean => format!("{}.GetBool()", variable),
        }
    }

    fn bad_variable(&self) -> String {
        "VariablesContainer::badVariable".to_string()
    }

    fn null_literal(&self) -> String {
        "nullptr".to_string()
    }

    fn trigger_once(&self, id: u64) -> String {
        format!("runtimeScene.GetOnceTriggers().TriggerOnce({})", id)
    }

    fn relational(&self, lhs: &str, operator: &str, rhs: &str, kind: ValueKind) -> String {
        if kind == ValueKind::String {
            match operator {
                "startsWith" => return format!("({}).find({}) == 0", lhs, rhs),
                "endsWith" => return format!("({}).EndsWith({})", lhs, rhs),
                "contains" => return format!("({}).find({}) != gd::String::npos", lhs, rhs),
                _ => {}
            }
        }
        let operator = comparison_operator(operator).unwrap_or("==");
        format!("{} {} {}", lhs, operator, rhs)
    }

    fn declare_snapshot(&self, container: &str, parent_container: Option<&str>) -> String {
        match parent_container {
            Some(parent) => format!(
                "LongLivedObjectsList {} = LongLivedObjectsList::From({});\n",
                container, parent
            ),
            None => format!("LongLivedObjectsList {};\n", container),
        }
    }

    fn capture_objects(&self, container: &str, object_name: &str, list: &str) -> String {
        format!(
            "for (RuntimeObject* obj : {}) {}.AddObject({}, obj);\n",
            list,
            container,
            quote(object_name)
        )
    }

    fn callback_function(&self, _namespace: &str, name: &str, body: &str) -> String {
        format!(
            "void {}(RuntimeScene& runtimeScene, const LongLivedObjectsList& asyncObjectsList) {{\n{}}}\n",
            name, body
        )
    }

    fn callback_value(&self, namespace: &str, name: &str, container: &str) -> String {
        format!(
            "[{container}](RuntimeScene& runtimeScene) {{ {namespace}::{name}(runtimeScene, {container}); }}",
            container = container,
            namespace = namespace,
            name = name
        )
    }

    fn add_async_task(&self, task: &str, callback: &str) -> String {
        format!(
            "runtimeScene.GetAsyncTasksManager().AddTask({}, {});\n",
            task, callback
        )
    }

    fn add_async_task_group(&self, tasks: &[(String, String)], callback: &str) -> String {
        let mut code = "{\nauto asyncTaskGroup = std::make_shared<TaskGroup>();\n".to_string();
        for (list, task) in tasks {
            code.push_str(&format!(
                "for (std::size_t i = 0; i < {list}.size(); ++i) {{\nasyncTaskGroup->AddTask({task});\n}}\n",
                list = list,
                task = task
            ));
        }
        code.push_str(&format!(
            "runtimeScene.GetAsyncTasksManager().AddTask(asyncTaskGroup, {});\n}}\n",
            callback
        ));
        code
    }

    fn compilation_unit(
        &self,
        namespace: &str,
        includes: &[String],
        outside_main: &[String],
        main_body: &str,
    ) -> String {
        let mut code = format!("#include \"{}\"\n", RUNTIME_SCENE_HEADER);
        for include in includes {
            code.push_str(&format!("#include \"{}\"\n", include));
        }
        code.push_str(&format!("\nnamespace {} {{\n\n", namespace));
        for chunk in outside_main {
            code.push_str(chunk);
            code.push('\n');
        }
        code.push_str(&format!(
            "void func(RuntimeScene& runtimeScene) {{\nruntimeScene.GetOnceTriggers().StartNewFrame();\n{}\n}}\n\n}}\n",
            main_body
        ));
        code
    }
}
