//! The generated JavaScript must always parse, whatever the events look
//! like, including when metadata is missing.

#[cfg(test)]
mod tests {
    use oxc_allocator::Allocator;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    use crate::compile::CompileOptions;
    use crate::model::{Event, ForEachEvent, Instruction};
    use crate::test_support::*;

    fn syntax_errors(code: &str) -> Vec<String> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, code, SourceType::default()).parse();
        ret.errors.iter().map(|e| e.to_string()).collect()
    }

    fn assert_parses(events: Vec<Event>) {
        let options = CompileOptions {
            emit_comments: true,
            ..Default::default()
        };
        let output = compile_with(events, &options);
        let errors = syntax_errors(&output.code);
        assert!(errors.is_empty(), "{:?}\n---\n{}", errors, output.code);
    }

    #[test]
    fn test_checker_rejects_broken_code() {
        assert!(!syntax_errors("let x = ;").is_empty());
        assert!(syntax_errors("gdjs.SceneCode = {};\n").is_empty());
    }

    #[test]
    fn test_standard_events_parse() {
        init_tracing();
        assert_parses(vec![
            Event::Comment(crate::model::CommentEvent {
                comment: "Player input".to_string(),
            }),
            standard(
                vec![key_pressed("Space"), pos_x("Player", "<", "100")],
                vec![
                    move_by("Player", "Enemy.X() + abs(-3)"),
                    Instruction::new("BuiltinObject::SetX", &["Player", "+", "Player.speed"]),
                ],
            ),
            standard(
                vec![Instruction::new("BuiltinVariables::VarScene", &["Lives", ">", "0"])],
                vec![
                    Instruction::new("BuiltinVariables::ModVarScene", &["Score", "+", "1"]),
                    Instruction::new("BuiltinVariables::ModVarGlobalTxt", &["Name", "=", "\"Bob\""]),
                    Instruction::new("BuiltinObject::Create", &["Enemy", "10", "20"]),
                ],
            ),
        ]);
    }

    #[test]
    fn test_combinators_and_sub_events_parse() {
        let or = Instruction::new("BuiltinCommonInstructions::Or", &[])
            .with_sub_instructions(vec![pos_x("Player", "<", "10"), pos_x("Enemy", ">", "100")]);
        let and = Instruction::new("BuiltinCommonInstructions::And", &[])
            .with_sub_instructions(vec![key_pressed("Left"), pos_x("Player", ">", "0")]);
        let not = Instruction::new("BuiltinCommonInstructions::Not", &[])
            .with_sub_instructions(vec![key_pressed("Up")]);
        let once = Instruction::new("BuiltinCommonInstructions::Once", &[]);

        let child = standard(vec![pos_x("Player", ">", "5")], vec![move_by("Player", "1")]);
        let parent = with_sub_events(
            standard(vec![or, and, not, once], vec![move_by("Characters", "2")]),
            vec![child],
        );
        assert_parses(vec![parent]);
    }

    #[test]
    fn test_for_each_parses() {
        let for_each = Event::ForEach(ForEachEvent {
            object: "Characters".into(),
            conditions: vec![pos_x("Characters", ">", "0")],
            actions: vec![move_by("Characters", "1")],
            sub_events: vec![standard(vec![], vec![move_by("Enemy", "3")])],
            ..Default::default()
        });
        assert_parses(vec![for_each]);
    }

    #[test]
    fn test_async_continuations_parse() {
        let nested = standard(
            vec![pos_x("Player", ">", "0")],
            vec![wait("1"), move_by("Player", "1"), wait("2"), move_by("Enemy", "1")],
        );
        let continuation = standard(
            vec![],
            vec![Instruction::new("Tween::FadeOut", &["Characters", "1"]), move_by("Player", "1")],
        );
        let with_child = with_sub_events(
            standard(vec![pos_x("Enemy", ">", "0")], vec![wait("1")]),
            vec![standard(vec![pos_x("Enemy", "<", "9")], vec![wait("1"), move_by("Enemy", "1")])],
        );
        assert_parses(vec![nested, continuation, with_child]);
    }

    #[test]
    fn test_behaviors_and_unknown_metadata_parse() {
        assert_parses(vec![standard(
            vec![Instruction::new("Nope::Condition", &["1"])],
            vec![
                Instruction::new("Physics::ApplyForce", &["Ball", "Physics", "1", "Ball.Physics::Mass()"]),
                Instruction::new("Nope::Action", &[]),
                move_by("Player", "1 +"),
                move_by("Ghost", "Unknown.X()"),
            ],
        )]);
    }
}
