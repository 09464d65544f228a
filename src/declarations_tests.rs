//! Extensions declared in `*.extension.json` files.

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::backend::Target;
    use crate::compile::{compile_layout, CompileOptions};
    use crate::declarations::{load_extension_declarations, parse_extension_declaration, register_declared_extensions};
    use crate::error::{CompileError, RegistryError};
    use crate::metadata::{ParameterType, ValueKind};
    use crate::model::Instruction;
    use crate::project::ObjectDeclaration;
    use crate::test_support::*;

    const PARTICLES: &str = r#"{
        "name": "Particles",
        "fullName": "Particle system",
        "objects": [
            {
                "name": "Emitter",
                "className": "gdjs.ParticleEmitterObject",
                "includeFiles": ["Extensions/Particles/emitter.js"]
            }
        ],
        "actions": [
            {
                "name": "Burst",
                "objectType": "Particles::Emitter",
                "parameters": [
                    { "type": "object", "description": "Emitter" },
                    { "type": "expression", "description": "Count" },
                    { "type": "expression", "description": "Spread", "optional": true, "defaultValue": "10" }
                ],
                "functionName": "burst",
                "cppFunctionName": "Burst",
                "includeFiles": ["Extensions/Particles/emitter.js"]
            }
        ],
        "conditions": [
            {
                "name": "Emitting",
                "objectType": "Particles::Emitter",
                "parameters": [{ "type": "object" }],
                "functionName": "isEmitting"
            }
        ],
        "expressions": [
            {
                "name": "ParticleCount",
                "objectType": "Particles::Emitter",
                "returnKind": "number",
                "parameters": [{ "type": "object" }],
                "functionName": "getParticleCount"
            }
        ]
    }"#;

    const WEATHER: &str = r#"{
        "name": "Weather",
        "actions": [
            {
                "name": "StartRain",
                "parameters": [{ "type": "expression" }],
                "functionName": "gdjs.evtTools.weather.startRain",
                "async": true
            }
        ]
    }"#;

    fn declarations_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("particles.extension.json"), PARTICLES).expect("write particles");
        fs::create_dir(dir.path().join("nested")).expect("nested dir");
        fs::write(dir.path().join("nested").join("weather.extension.json"), WEATHER).expect("write weather");
        fs::write(dir.path().join("notes.json"), "not an extension").expect("write notes");
        dir
    }

    #[test]
    fn test_parse_declaration() {
        let declaration = parse_extension_declaration(PARTICLES, "particles.extension.json").expect("valid");
        assert_eq!(declaration.name, "Particles");
        assert_eq!(declaration.actions[0].parameters.len(), 3);
        assert_eq!(declaration.actions[0].parameters[2].param_type, ParameterType::Expression);
        assert!(declaration.actions[0].parameters[2].optional);
        assert_eq!(declaration.expressions[0].return_kind, ValueKind::Number);
    }

    #[test]
    fn test_invalid_declaration_names_the_file() {
        let error = parse_extension_declaration("{ \"name\": ", "broken.extension.json").expect_err("invalid");
        match error {
            RegistryError::InvalidDeclaration { path, message } => {
                assert_eq!(path, "broken.extension.json");
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_load_walks_the_directory_in_order() {
        init_tracing();
        let dir = declarations_dir();
        let extensions = load_extension_declarations(dir.path(), Target::Js).expect("load");
        let names: Vec<&str> = extensions.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Weather", "Particles"]);

        let particles = &extensions[1];
        assert_eq!(particles.full_name, "Particle system");
        assert_eq!(particles.objects[0].full_type, "Particles::Emitter");
        assert_eq!(particles.actions[0].full_type, "Particles::Burst");
        assert!(particles.actions[0].is_object_instruction());
        assert!(extensions[0].actions[0].is_async_when(false));
    }

    #[test]
    fn test_function_names_follow_the_target() {
        let dir = declarations_dir();
        let js = load_extension_declarations(dir.path(), Target::Js).expect("load");
        let cpp = load_extension_declarations(dir.path(), Target::Cpp).expect("load");
        assert_eq!(js[1].actions[0].function_name, "burst");
        assert_eq!(cpp[1].actions[0].function_name, "Burst");
        // No native name declared: the same name is used.
        assert_eq!(cpp[1].conditions[0].function_name, "isEmitting");
    }

    #[test]
    fn test_declared_extension_compiles() {
        let dir = declarations_dir();
        let mut registry = registry(Target::Js);
        let count = register_declared_extensions(&mut registry, dir.path(), Target::Js).expect("register");
        assert_eq!(count, 2);

        let events = vec![standard(
            vec![],
            vec![
                Instruction::new("Particles::Burst", &["Sparks", "Sparks.ParticleCount() + 1"]),
                Instruction::new("Weather::StartRain", &["5"]),
            ],
        )];
        let mut project = project(events);
        project.layouts[0]
            .objects
            .push(ObjectDeclaration::new("Sparks", "Particles::Emitter"));

        let output = compile_layout(&project, LAYOUT, &registry, &CompileOptions::default()).expect("layout");
        assert!(!output.has_errors, "diagnostics: {:?}", output.diagnostics);
        assert!(output
            .code
            .contains("GDSparksObjects1[i].burst(GDSparksObjects1[i].getParticleCount() + 1, 10);\n"));
        assert!(output.code.contains(
            "runtimeScene.getAsyncTasksManager().addTask(gdjs.evtTools.weather.startRain(5), "
        ));
        assert_eq!(output.includes, vec!["Extensions/Particles/emitter.js".to_string()]);
    }

    #[test]
    fn test_broken_file_aborts_registration() {
        let dir = declarations_dir();
        fs::write(dir.path().join("broken.extension.json"), "{ \"name\": ").expect("write broken");

        let mut registry = registry(Target::Js);
        let error = register_declared_extensions(&mut registry, dir.path(), Target::Js).expect_err("broken file");
        assert!(matches!(
            error,
            CompileError::Registry(RegistryError::InvalidDeclaration { ref path, .. }) if path.ends_with("broken.extension.json")
        ));
    }

    #[test]
    fn test_declared_extension_clashing_with_a_registered_one() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(dir.path().join("movement.extension.json"), r#"{ "name": "Movement" }"#).expect("write");

        let mut registry = registry(Target::Js);
        let error = register_declared_extensions(&mut registry, dir.path(), Target::Js).expect_err("duplicate");
        assert!(matches!(
            error,
            CompileError::Registry(RegistryError::DuplicateExtension(ref name)) if name == "Movement"
        ));
    }

    #[test]
    fn test_missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("does-not-exist");
        let error = load_extension_declarations(&missing, Target::Js).expect_err("missing dir");
        assert!(matches!(error, CompileError::Io(_)));
    }
}
