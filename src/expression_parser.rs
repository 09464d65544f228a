//! LL(1) recursive-descent parser for number and text expressions.
//!
//! Grammar (whitespace ignored between tokens):
//!
//! ```text
//! expression := term (("+" | "-") term)*
//! term       := factor (("*" | "/") factor)*
//! factor     := number | text | ("+" | "-") factor | "(" expression ")" | identifier
//! identifier := name ["::" name] ( "(" parameters ")"
//!                                | "." name ["::" name "(" parameters ")" | "(" parameters ")" | accessors]
//!                                | accessors )?
//! accessors  := ("." name | "[" expression "]")*
//! ```
//!
//! Parsing never fails: malformed input yields an `Empty` node (or keeps the
//! best partial tree) with a diagnostic attached to the offending node.

use crate::ast::{ExpressionNode, FunctionCall, Location, NodeKind, VariableAccess, VariableAccessor};
use crate::metadata::ValueKind;

const NAMESPACE_SEPARATOR: &str = "::";

/// Deepest nesting of factors (parentheses, unary signs, brackets, function
/// parameters) the parser descends into. Past it, the rest of the text is
/// kept as an `Empty` node.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Parses `text` with the grammar of `kind`. Text expressions only accept
/// `+` (concatenation) as operator.
pub fn parse_expression(text: &str, kind: ValueKind) -> ExpressionNode {
    ExpressionParser::new(text, kind).parse()
}

struct ExpressionParser {
    chars: Vec<char>,
    position: usize,
    kind: ValueKind,
    depth: usize,
}

fn is_whitespace(c: char) -> bool {
    c.is_whitespace()
}

fn is_expression_ending_char(c: char) -> bool {
    matches!(c, ')' | ',' | ']')
}

fn is_expression_operator(c: char) -> bool {
    matches!(c, '+' | '-' | '<' | '>' | '?' | '^' | '=' | '\\' | ':' | '!' | '%')
}

fn is_term_operator(c: char) -> bool {
    matches!(c, '*' | '/')
}

fn is_allowed_in_identifier(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || (!c.is_ascii() && !c.is_whitespace())
}

impl ExpressionParser {
    fn new(text: &str, kind: ValueKind) -> Self {
        ExpressionParser {
            chars: text.chars().collect(),
            position: 0,
            kind,
            depth: 0,
        }
    }

    fn parse(&mut self) -> ExpressionNode {
        self.skip_whitespaces();
        if self.is_end_reached() {
            return ExpressionNode::empty("", Location::new(0, 0));
        }

        let start = self.position;
        let expression = self.expression();
        if self.is_end_reached() {
            return expression;
        }

        let rest = self.read_until_end().with_diagnostic(
            "The expression has extra characters at the end that should be removed (or completed if the expression is not finished).",
        );
        ExpressionNode::new(
            NodeKind::BinaryOperator {
                operator: ' ',
                left: Box::new(expression),
                right: Box::new(rest),
            },
            Location::new(start, self.position),
        )
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // GRAMMAR
    // ═══════════════════════════════════════════════════════════════════════════

    fn expression(&mut self) -> ExpressionNode {
        self.skip_whitespaces();
        let start = self.position;
        let mut left = self.term();

        loop {
            self.skip_whitespaces();
            if self.is_end_reached() || self.check_char(is_expression_ending_char) {
                return left;
            }

            if self.check_char(is_expression_operator) {
                let operator = self.current_char();
                let diagnostic = self.validate_operator(operator);
                self.skip_char();
                let right = self.term();
                let mut node = ExpressionNode::new(
                    NodeKind::BinaryOperator {
                        operator,
                        left: Box::new(left),
                        right: Box::new(right),
                    },
                    Location::new(start, self.position),
                );
                if let Some(message) = diagnostic {
                    node = node.with_diagnostic(message);
                }
                left = node;
                continue;
            }

            let left_with_error = left.with_diagnostic(
                "More than one term was found. Verify that the expression is properly written.",
            );
            let right = self.term();
            left = ExpressionNode::new(
                NodeKind::BinaryOperator {
                    operator: ' ',
                    left: Box::new(left_with_error),
                    right: Box::new(right),
                },
                Location::new(start, self.position),
            );
        }
    }

    fn term(&mut self) -> ExpressionNode {
        self.skip_whitespaces();
        let start = self.position;
        let mut factor = self.factor();
        self.skip_whitespaces();

        while self.check_char(is_term_operator) {
            let operator = self.current_char();
            let diagnostic = self.validate_operator(operator);
            self.skip_char();
            let right = self.factor();
            let mut node = ExpressionNode::new(
                NodeKind::BinaryOperator {
                    operator,
                    left: Box::new(factor),
                    right: Box::new(right),
                },
                Location::new(start, self.position),
            );
            if let Some(message) = diagnostic {
                node = node.with_diagnostic(message);
            }
            factor = node;
            self.skip_whitespaces();
        }

        factor
    }

    fn factor(&mut self) -> ExpressionNode {
        if self.depth >= MAX_NESTING_DEPTH {
            return self
                .read_until_end()
                .with_diagnostic("The expression is nested too deeply.");
        }
        self.depth += 1;
        let node = self.nested_factor();
        self.depth -= 1;
        node
    }

    fn nested_factor(&mut self) -> ExpressionNode {
        self.skip_whitespaces();
        let start = self.position;

        if self.is_end_reached() || self.check_char(is_expression_ending_char) {
            return ExpressionNode::empty("", Location::new(start, start))
                .with_diagnostic("A value is missing here.");
        }

        let c = self.current_char();
        if c == '"' {
            return self.read_text();
        }
        if c == '+' || c == '-' {
            self.skip_char();
            let operand = self.factor();
            let node = ExpressionNode::new(
                NodeKind::UnaryOperator {
                    operator: c,
                    operand: Box::new(operand),
                },
                Location::new(start, self.position),
            );
            return if self.kind == ValueKind::String {
                node.with_diagnostic("Unary operators can't be used with texts.")
            } else {
                node
            };
        }
        if c.is_ascii_digit() || c == '.' {
            return self.read_number();
        }
        if c == '(' {
            self.skip_char();
            let expression = self.expression();
            let mut node = ExpressionNode::new(
                NodeKind::SubExpression {
                    expression: Box::new(expression),
                },
                Location::new(start, self.position),
            );
            if self.check_char(|c| c == ')') {
                self.skip_char();
                node.location.end = self.position;
            } else {
                node = node.with_diagnostic(
                    "Missing a closing parenthesis. Add a closing parenthesis for each opening parenthesis.",
                );
            }
            return node;
        }
        if is_allowed_in_identifier(c) {
            return self.identifier();
        }

        self.read_until_whitespace()
            .with_diagnostic("This character is not expected here.")
    }

    fn identifier(&mut self) -> ExpressionNode {
        let start = self.position;
        let mut name = self.read_identifier_name();
        self.skip_whitespaces();

        if self.is_namespace_separator() {
            self.skip_namespace_separator();
            self.skip_whitespaces();
            name.push_str(NAMESPACE_SEPARATOR);
            name.push_str(&self.read_identifier_name());
            self.skip_whitespaces();
        }

        if self.check_char(|c| c == '(') {
            self.skip_char();
            return self.function_call(start, String::new(), String::new(), name);
        }
        if self.check_char(|c| c == '.') {
            self.skip_char();
            self.skip_whitespaces();
            return self.object_function_or_behavior_function_or_variable(start, name);
        }
        if self.check_char(|c| c == '[') {
            return self.variable(start, name, Vec::new());
        }

        ExpressionNode::new(NodeKind::Identifier { name }, Location::new(start, self.position))
    }

    fn object_function_or_behavior_function_or_variable(&mut self, start: usize, object_name: String) -> ExpressionNode {
        let child_name = self.read_identifier_name();
        let empty_name = child_name.is_empty();
        self.skip_whitespaces();

        let node = if self.is_namespace_separator() {
            self.skip_namespace_separator();
            self.skip_whitespaces();
            let function_name = self.read_identifier_name();
            self.skip_whitespaces();
            if self.check_char(|c| c == '(') {
                self.skip_char();
                self.function_call(start, object_name, child_name, function_name)
            } else {
                ExpressionNode::new(
                    NodeKind::FunctionCall(FunctionCall {
                        object_name,
                        behavior_name: child_name,
                        function_name,
                        parameters: Vec::new(),
                    }),
                    Location::new(start, self.position),
                )
                .with_diagnostic("An opening parenthesis was expected here to call a function.")
            }
        } else if self.check_char(|c| c == '(') {
            self.skip_char();
            self.function_call(start, object_name, String::new(), child_name)
        } else {
            self.variable(start, object_name, vec![VariableAccessor::Child { name: child_name }])
        };

        if empty_name {
            node.with_diagnostic("A name should be entered after the dot.")
        } else {
            node
        }
    }

    fn variable(&mut self, start: usize, name: String, mut accessors: Vec<VariableAccessor>) -> ExpressionNode {
        let mut diagnostic = None;

        loop {
            self.skip_whitespaces();
            if self.check_char(|c| c == '[') {
                self.skip_char();
                let expression = self.expression();
                accessors.push(VariableAccessor::Bracket {
                    expression: Box::new(expression),
                });
                if self.check_char(|c| c == ']') {
                    self.skip_char();
                } else {
                    diagnostic = Some("Missing a closing bracket. Add a closing bracket for each opening bracket.");
                }
            } else if self.check_char(|c| c == '.') {
                self.skip_char();
                self.skip_whitespaces();
                let child = self.read_identifier_name();
                if child.is_empty() {
                    diagnostic = Some("A name should be entered after the dot.");
                }
                accessors.push(VariableAccessor::Child { name: child });
            } else {
                break;
            }
        }

        let node = ExpressionNode::new(
            NodeKind::VariableAccess(VariableAccess { name, accessors }),
            Location::new(start, self.position),
        );
        match diagnostic {
            Some(message) => node.with_diagnostic(message),
            None => node,
        }
    }

    /// Reads the parameters after an opening parenthesis, up to and
    /// including the closing parenthesis.
    fn function_call(&mut self, start: usize, object_name: String, behavior_name: String, function_name: String) -> ExpressionNode {
        let mut parameters = Vec::new();
        let mut previous_was_separator = false;
        let mut stray_character = false;

        while !self.is_end_reached() {
            self.skip_whitespaces();
            let iteration_start = self.position;

            if self.check_char(|c| c == ')') && !previous_was_separator {
                self.skip_char();
                let node = ExpressionNode::new(
                    NodeKind::FunctionCall(FunctionCall {
                        object_name,
                        behavior_name,
                        function_name,
                        parameters,
                    }),
                    Location::new(start, self.position),
                );
                return if stray_character {
                    node.with_diagnostic("This character is not expected here.")
                } else {
                    node
                };
            }

            let is_empty_parameter =
                self.check_char(|c| c == ',') || (self.check_char(|c| c == ')') && previous_was_separator);
            let parameter = if is_empty_parameter {
                ExpressionNode::empty("", Location::new(self.position, self.position))
            } else {
                self.expression()
            };
            parameters.push(parameter);

            self.skip_whitespaces();
            previous_was_separator = self.check_char(|c| c == ',');
            if previous_was_separator {
                self.skip_char();
            } else if self.position == iteration_start && !self.check_char(|c| c == ')') {
                // A closing bracket with no opening one: skip it.
                stray_character = true;
                self.skip_char();
            }
        }

        ExpressionNode::new(
            NodeKind::FunctionCall(FunctionCall {
                object_name,
                behavior_name,
                function_name,
                parameters,
            }),
            Location::new(start, self.position),
        )
        .with_diagnostic("The list of parameters is not terminated. Add a closing parenthesis to end the parameters.")
    }

    fn validate_operator(&self, operator: char) -> Option<&'static str> {
        match (self.kind, operator) {
            (ValueKind::String, '+') => None,
            (ValueKind::String, _) => Some("Only + can be used to concatenate texts."),
            (_, '+' | '-' | '*' | '/') => None,
            _ => Some("This operator is not supported. Operators should be either +, -, / or *."),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TOKENS
    // ═══════════════════════════════════════════════════════════════════════════

    fn read_number(&mut self) -> ExpressionNode {
        let start = self.position;
        let mut value = String::new();
        let mut dots = 0;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                value.push(c);
            } else if c == '.' {
                dots += 1;
                value.push(c);
            } else {
                break;
            }
            self.position += 1;
        }

        let node = ExpressionNode::new(NodeKind::Number { value }, Location::new(start, self.position));
        if dots > 1 || node_is_lone_dot(&node) {
            node.with_diagnostic("This number is not valid.")
        } else {
            node
        }
    }

    fn read_text(&mut self) -> ExpressionNode {
        let start = self.position;
        self.skip_char();
        let mut value = String::new();
        let mut closed = false;

        while let Some(c) = self.peek() {
            self.position += 1;
            match c {
                '"' => {
                    closed = true;
                    break;
                }
                '\\' => match self.peek() {
                    Some(escaped @ ('"' | '\\')) => {
                        value.push(escaped);
                        self.position += 1;
                    }
                    _ => value.push('\\'),
                },
                _ => value.push(c),
            }
        }

        let node = ExpressionNode::new(NodeKind::Text { value }, Location::new(start, self.position));
        if closed {
            node
        } else {
            node.with_diagnostic("A text must be ended by a double quote (\").")
        }
    }

    fn read_identifier_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if !is_allowed_in_identifier(c) {
                break;
            }
            name.push(c);
            self.position += 1;
        }
        name
    }

    fn read_until_whitespace(&mut self) -> ExpressionNode {
        let start = self.position;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if is_whitespace(c) {
                break;
            }
            text.push(c);
            self.position += 1;
        }
        ExpressionNode::empty(&text, Location::new(start, self.position))
    }

    fn read_until_end(&mut self) -> ExpressionNode {
        let start = self.position;
        let text: String = self.chars[self.position..].iter().collect();
        self.position = self.chars.len();
        ExpressionNode::empty(&text, Location::new(start, self.position))
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn current_char(&self) -> char {
        self.peek().unwrap_or('\n')
    }

    fn check_char(&self, predicate: impl Fn(char) -> bool) -> bool {
        self.peek().map(predicate).unwrap_or(false)
    }

    fn skip_char(&mut self) {
        self.position += 1;
    }

    fn skip_whitespaces(&mut self) {
        while self.check_char(is_whitespace) {
            self.position += 1;
        }
    }

    fn is_namespace_separator(&self) -> bool {
        self.chars.get(self.position) == Some(&':') && self.chars.get(self.position + 1) == Some(&':')
    }

    fn skip_namespace_separator(&mut self) {
        if self.is_namespace_separator() {
            self.position += NAMESPACE_SEPARATOR.len();
        }
    }

    fn is_end_reached(&self) -> bool {
        self.position >= self.chars.len()
    }
}

fn node_is_lone_dot(node: &ExpressionNode) -> bool {
    matches!(&node.kind, NodeKind::Number { value } if value == ".")
}
