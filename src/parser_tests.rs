//! Expression grammar: precedence, function forms, variables, and the
//! diagnostics attached to malformed input.

#[cfg(test)]
mod tests {
    use crate::ast::{ExpressionNode, ExpressionValidator, FunctionCall, Location, NodeKind, VariableAccessor};
    use crate::expression_parser::parse_expression;
    use crate::metadata::ValueKind;

    fn number(text: &str) -> ExpressionNode {
        parse_expression(text, ValueKind::Number)
    }

    fn messages(node: &ExpressionNode) -> Vec<String> {
        ExpressionValidator::validate(node)
            .into_iter()
            .map(|d| d.message)
            .collect()
    }

    fn binary(node: &ExpressionNode) -> (char, &ExpressionNode, &ExpressionNode) {
        match &node.kind {
            NodeKind::BinaryOperator { operator, left, right } => (*operator, left, right),
            other => panic!("expected a binary operator, got {:?}", other),
        }
    }

    fn call(node: &ExpressionNode) -> &FunctionCall {
        match &node.kind {
            NodeKind::FunctionCall(call) => call,
            other => panic!("expected a function call, got {:?}", other),
        }
    }

    fn number_value(node: &ExpressionNode) -> &str {
        match &node.kind {
            NodeKind::Number { value } => value,
            other => panic!("expected a number, got {:?}", other),
        }
    }

    #[test]
    fn test_multiplication_binds_tighter_than_addition() {
        let node = number("1 + 2 * 3");
        assert!(messages(&node).is_empty());

        let (operator, left, right) = binary(&node);
        assert_eq!(operator, '+');
        assert_eq!(number_value(left), "1");
        let (operator, left, right) = binary(right);
        assert_eq!(operator, '*');
        assert_eq!(number_value(left), "2");
        assert_eq!(number_value(right), "3");
    }

    #[test]
    fn test_operators_are_left_associative() {
        let node = number("8 - 2 - 1");
        let (operator, left, right) = binary(&node);
        assert_eq!(operator, '-');
        assert_eq!(number_value(right), "1");
        let (operator, left, _) = binary(left);
        assert_eq!(operator, '-');
        assert_eq!(number_value(left), "8");
    }

    #[test]
    fn test_parentheses_make_a_sub_expression() {
        let node = number("(1 + 2) * 3");
        let (operator, left, _) = binary(&node);
        assert_eq!(operator, '*');
        assert!(matches!(left.kind, NodeKind::SubExpression { .. }));
        assert_eq!(left.location, Location::new(0, 7));
    }

    #[test]
    fn test_unary_minus() {
        let node = number("-(-3)");
        assert!(messages(&node).is_empty());
        match &node.kind {
            NodeKind::UnaryOperator { operator, operand } => {
                assert_eq!(*operator, '-');
                assert!(matches!(operand.kind, NodeKind::SubExpression { .. }));
            }
            other => panic!("expected a unary operator, got {:?}", other),
        }
    }

    #[test]
    fn test_function_call_forms() {
        let free = number("abs(-1)");
        let free = call(&free);
        assert_eq!(free.function_name, "abs");
        assert!(free.object_name.is_empty() && free.behavior_name.is_empty());
        assert_eq!(free.parameters.len(), 1);
        assert_eq!(free.written_parameters_first_index(), 0);

        let namespaced = number("Physics::Gravity()");
        assert_eq!(call(&namespaced).function_name, "Physics::Gravity");

        let object = number("Player.X()");
        let object = call(&object);
        assert_eq!(object.object_name, "Player");
        assert_eq!(object.function_name, "X");
        assert_eq!(object.written_parameters_first_index(), 1);

        let behavior = number("Ball.Physics::Mass()");
        let behavior = call(&behavior);
        assert_eq!(
            (behavior.object_name.as_str(), behavior.behavior_name.as_str(), behavior.function_name.as_str()),
            ("Ball", "Physics", "Mass")
        );
        assert!(behavior.parameters.is_empty());
        assert_eq!(behavior.written_parameters_first_index(), 2);
    }

    #[test]
    fn test_empty_parameters_are_kept() {
        let node = number("clamp(, 2)");
        assert!(messages(&node).is_empty());
        let parameters = &call(&node).parameters;
        assert_eq!(parameters.len(), 2);
        assert!(parameters[0].is_empty());
        assert_eq!(number_value(&parameters[1]), "2");
    }

    #[test]
    fn test_variable_with_children_and_brackets() {
        let node = number("Stats.scores[1 + 1].best");
        assert!(messages(&node).is_empty());
        let access = match &node.kind {
            NodeKind::VariableAccess(access) => access,
            other => panic!("expected a variable, got {:?}", other),
        };
        assert_eq!(access.name, "Stats");
        assert_eq!(access.accessors.len(), 3);
        assert!(matches!(&access.accessors[0], VariableAccessor::Child { name } if name == "scores"));
        assert!(matches!(&access.accessors[1], VariableAccessor::Bracket { .. }));
        assert!(matches!(&access.accessors[2], VariableAccessor::Child { name } if name == "best"));
    }

    #[test]
    fn test_bare_identifier_location() {
        let node = number("  Lives");
        assert_eq!(
            node.kind,
            NodeKind::Identifier {
                name: "Lives".to_string()
            }
        );
        assert_eq!(node.location, Location::new(2, 7));
    }

    #[test]
    fn test_text_escapes_and_concatenation() {
        let node = parse_expression(r#""Hello \"you\"" + Name"#, ValueKind::String);
        assert!(messages(&node).is_empty());
        let (operator, left, _) = binary(&node);
        assert_eq!(operator, '+');
        assert_eq!(
            left.kind,
            NodeKind::Text {
                value: "Hello \"you\"".to_string()
            }
        );
    }

    #[test]
    fn test_text_grammar_only_concatenates() {
        let node = parse_expression(r#""a" - "b""#, ValueKind::String);
        assert_eq!(messages(&node), vec!["Only + can be used to concatenate texts.".to_string()]);

        let unary = parse_expression("-Name", ValueKind::String);
        assert_eq!(messages(&unary), vec!["Unary operators can't be used with texts.".to_string()]);
    }

    #[test]
    fn test_unsupported_operator() {
        let node = number("5 % 2");
        assert_eq!(
            messages(&node),
            vec!["This operator is not supported. Operators should be either +, -, / or *.".to_string()]
        );
    }

    #[test]
    fn test_empty_text_is_an_empty_node_without_diagnostic() {
        let node = number("   ");
        assert!(node.is_empty());
        assert!(messages(&node).is_empty());
    }

    #[test]
    fn test_malformed_input_never_panics_and_reports() {
        let cases = [
            ("1 +", "A value is missing here."),
            ("1 2", "More than one term was found. Verify that the expression is properly written."),
            ("(1 + 2", "Missing a closing parenthesis. Add a closing parenthesis for each opening parenthesis."),
            ("max(1,", "The list of parameters is not terminated. Add a closing parenthesis to end the parameters."),
            ("1..2", "This number is not valid."),
            ("\"open", "A text must be ended by a double quote (\")."),
            ("Player.", "A name should be entered after the dot."),
            ("Ball.Physics::Mass", "An opening parenthesis was expected here to call a function."),
            ("Stats[0", "Missing a closing bracket. Add a closing bracket for each opening bracket."),
        ];
        for (text, expected) in cases {
            let kind = if text.starts_with('"') {
                ValueKind::String
            } else {
                ValueKind::Number
            };
            let node = parse_expression(text, kind);
            assert!(
                messages(&node).iter().any(|m| m == expected),
                "{:?} should report {:?}, got {:?}",
                text,
                expected,
                messages(&node)
            );
        }
    }

    #[test]
    fn test_trailing_characters_are_kept_as_empty_node() {
        let node = number("1)");
        let (operator, left, right) = binary(&node);
        assert_eq!(operator, ' ');
        assert_eq!(number_value(left), "1");
        assert_eq!(
            right.kind,
            NodeKind::Empty {
                text: ")".to_string()
            }
        );
        assert_eq!(messages(&node).len(), 1);
    }

    #[test]
    fn test_deep_nesting_is_cut_with_a_diagnostic() {
        let parenthesised = format!("{}1{}", "(".repeat(5000), ")".repeat(5000));
        let node = number(&parenthesised);
        assert!(messages(&node).iter().any(|m| m == "The expression is nested too deeply."));

        let signs = format!("{}1", "-".repeat(5000));
        let node = number(&signs);
        assert!(messages(&node).iter().any(|m| m == "The expression is nested too deeply."));

        let calls = format!("{}1{}", "abs(".repeat(5000), ")".repeat(5000));
        assert!(!messages(&number(&calls)).is_empty());
    }

    #[test]
    fn test_nesting_below_the_limit_parses() {
        let depth = crate::expression_parser::MAX_NESTING_DEPTH - 1;
        let text = format!("{}1{}", "(".repeat(depth - 1), ")".repeat(depth - 1));
        let node = number(&text);
        assert!(messages(&node).is_empty(), "{:?}", messages(&node));
    }
}
