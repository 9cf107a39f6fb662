//! A cursor-based parser for the expression language.
//!
//! Binary expressions are parsed by operator-precedence climbing over the
//! table supplied by the `Grammar`, with an explicit operand/operator
//! stack. All parse state lives in a per-call `ParserState`, so nested
//! parses (e.g. a filter expression inside a path trace) never share a
//! cursor.

use crate::ast::Expr;
use crate::error::ExprError;
use crate::grammar::{Grammar, GrammarPlugin};
use serde_json::Value;
use std::sync::Arc;

/// A reusable parser for one grammar. Construct once, parse many times.
pub struct Parser {
    grammar: Grammar,
}

impl Parser {
    pub fn new(grammar: Grammar) -> Self {
        Self { grammar }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Parses a complete expression string into an AST.
    ///
    /// Multiple `,`/`;`-separated expressions produce a `Compound` node.
    pub fn parse(&self, input: &str) -> Result<Expr, ExprError> {
        let mut state = ParserState::new(&self.grammar, input);
        let mut nodes = state.gobble_expressions(None)?;
        if nodes.len() == 1 {
            Ok(nodes.remove(0))
        } else {
            Ok(Expr::Compound(nodes))
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new(Grammar::default())
    }
}

struct OpInfo {
    token: String,
    precedence: f32,
    right_associative: bool,
}

/// Per-call parse state: the source characters and an explicit cursor.
pub struct ParserState<'a> {
    grammar: &'a Grammar,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> ParserState<'a> {
    pub fn new(grammar: &'a Grammar, input: &str) -> Self {
        Self {
            grammar,
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    // --- Cursor primitives ---

    pub fn grammar(&self) -> &Grammar {
        self.grammar
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// The character at the cursor, if any.
    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    pub fn peek_at(&self, pos: usize) -> Option<char> {
        self.chars.get(pos).copied()
    }

    /// Consumes and returns the character at the cursor.
    pub fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    pub fn slice(&self, from: usize, to: usize) -> String {
        self.chars[from..to].iter().collect()
    }

    /// A syntax error anchored at the current cursor position.
    pub fn error(&self, message: impl Into<String>) -> ExprError {
        ExprError::syntax(message, self.pos)
    }

    // --- Character classes ---

    pub fn is_identifier_start(&self, ch: char) -> bool {
        ch.is_ascii_alphabetic()
            || self.grammar.is_extra_identifier_char(ch)
            || (!ch.is_ascii() && !self.grammar.is_binary_op_char(ch))
    }

    pub fn is_identifier_part(&self, ch: char) -> bool {
        self.is_identifier_start(ch) || ch.is_ascii_digit()
    }

    /// Skips whitespace between tokens.
    pub fn gobble_spaces(&mut self) {
        while let Some(ch) = self.peek() {
            if ch == ' ' || ch == '\t' || ch == '\n' || ch == '\r' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn plugin_list(&self) -> Vec<Arc<dyn GrammarPlugin>> {
        self.grammar.plugins().to_vec()
    }

    fn run_after_token(&mut self, mut node: Expr) -> Result<Expr, ExprError> {
        for plugin in self.plugin_list() {
            node = plugin.after_token(self, node)?;
        }
        Ok(node)
    }

    // --- Expression parsing ---

    /// Gobbles expressions until the end of input or the `until` character.
    /// Separator characters (`,`, `;`) between expressions are skipped.
    pub fn gobble_expressions(&mut self, until: Option<char>) -> Result<Vec<Expr>, ExprError> {
        let mut nodes = Vec::new();
        while !self.at_end() {
            if let Some(ch) = self.peek() {
                if ch == ';' || ch == ',' {
                    self.advance();
                    continue;
                }
            }
            match self.gobble_expression()? {
                Some(node) => nodes.push(node),
                None => {
                    if let Some(ch) = self.peek() {
                        if Some(ch) == until {
                            break;
                        }
                        return Err(self.error(format!("Unexpected \"{ch}\"")));
                    }
                }
            }
        }
        Ok(nodes)
    }

    /// Gobbles one full expression, running the registered
    /// expression post-processors on the result.
    pub fn gobble_expression(&mut self) -> Result<Option<Expr>, ExprError> {
        let node = self.gobble_binary_expression()?;
        self.gobble_spaces();
        match node {
            Some(mut node) => {
                for plugin in self.plugin_list() {
                    node = plugin.after_expression(self, node)?;
                }
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    /// Precedence climbing with explicit operand and operator stacks.
    ///
    /// A pending operator reduces the stack while the incoming operator
    /// does not bind tighter; two right-associative operators only reduce
    /// on strictly higher incoming precedence, which is what makes
    /// `2 ** 3 ** 2` evaluate as `2 ** (3 ** 2)`.
    fn gobble_binary_expression(&mut self) -> Result<Option<Expr>, ExprError> {
        let left = match self.gobble_token()? {
            Some(node) => node,
            None => return Ok(None),
        };
        let first_op = match self.gobble_binary_op() {
            Some(op) => op,
            None => return Ok(Some(left)),
        };
        let right = self
            .gobble_token()?
            .ok_or_else(|| self.error(format!("Expected expression after {first_op}")))?;

        let mut operands = vec![left, right];
        let mut operators = vec![self.op_info(first_op)];

        while let Some(op) = self.gobble_binary_op() {
            let info = self.op_info(op);
            if info.precedence <= 0.0 {
                self.pos -= info.token.chars().count();
                break;
            }
            while let Some(prev) = operators.last() {
                let reduce = if info.right_associative && prev.right_associative {
                    info.precedence > prev.precedence
                } else {
                    info.precedence <= prev.precedence
                };
                if !reduce {
                    break;
                }
                let prev = operators.pop().ok_or_else(|| self.error("Expected expression"))?;
                let right = operands.pop().ok_or_else(|| self.error("Expected expression"))?;
                let left = operands.pop().ok_or_else(|| self.error("Expected expression"))?;
                operands.push(Expr::Binary {
                    op: prev.token,
                    left: Box::new(left),
                    right: Box::new(right),
                });
            }
            let node = self
                .gobble_token()?
                .ok_or_else(|| self.error(format!("Expected expression after {}", info.token)))?;
            operands.push(node);
            operators.push(info);
        }

        let mut node = operands
            .pop()
            .ok_or_else(|| self.error("Expected expression"))?;
        while let Some(info) = operators.pop() {
            let left = operands
                .pop()
                .ok_or_else(|| self.error("Expected expression"))?;
            node = Expr::Binary {
                op: info.token,
                left: Box::new(left),
                right: Box::new(node),
            };
        }
        Ok(Some(node))
    }

    fn op_info(&self, token: String) -> OpInfo {
        let spec = self.grammar.binary_op(&token);
        OpInfo {
            precedence: spec.map(|s| s.precedence).unwrap_or(0.0),
            right_associative: spec.map(|s| s.right_associative).unwrap_or(false),
            token,
        }
    }

    /// Greedy longest-match against the binary operator table. A match
    /// that is really the prefix of a longer identifier is rejected.
    fn gobble_binary_op(&mut self) -> Option<String> {
        self.gobble_spaces();
        let available = self.chars.len().saturating_sub(self.pos);
        let mut len = self.grammar.max_binary_op_len().min(available);
        while len > 0 {
            let candidate = self.slice(self.pos, self.pos + len);
            if self.grammar.binary_op(&candidate).is_some() {
                let starts_identifier = self
                    .peek()
                    .map(|c| self.is_identifier_start(c))
                    .unwrap_or(false);
                let boundary_ok = !starts_identifier
                    || (self.pos + len < self.chars.len()
                        && !self.is_identifier_part(self.chars[self.pos + len]));
                if boundary_ok {
                    self.pos += len;
                    return Some(candidate);
                }
            }
            len -= 1;
        }
        None
    }

    // --- Token parsing ---

    /// Gobbles a single primary token: a literal, identifier, unary
    /// expression, array, or group, including any postfix member accesses
    /// and calls.
    pub fn gobble_token(&mut self) -> Result<Option<Expr>, ExprError> {
        self.gobble_spaces();
        for plugin in self.plugin_list() {
            if let Some(node) = plugin.gobble_token(self)? {
                let node = self.run_after_token(node)?;
                return Ok(Some(node));
            }
        }
        let Some(ch) = self.peek() else {
            return Ok(None);
        };

        if ch.is_ascii_digit() || ch == '.' {
            // Numbers take no postfix accesses; the period is part of the
            // literal.
            return self.gobble_numeric_literal().map(Some);
        }

        let node = if ch == '\'' || ch == '"' {
            Some(self.gobble_string_literal()?)
        } else if ch == '[' {
            self.advance();
            Some(Expr::Array(self.gobble_arguments(']')?))
        } else {
            if let Some(node) = self.gobble_unary_expression(ch)? {
                return Ok(Some(node));
            }
            if self.is_identifier_start(ch) {
                let name = self.gobble_identifier()?;
                if let Some(value) = self.grammar.literal(&name) {
                    Some(Expr::Literal(value.clone()))
                } else if name == "this" {
                    Some(Expr::This)
                } else {
                    Some(Expr::Identifier(name))
                }
            } else if ch == '(' {
                self.gobble_group()?
            } else {
                None
            }
        };

        let Some(node) = node else {
            return Ok(None);
        };
        let node = self.gobble_token_property(node)?;
        let node = self.run_after_token(node)?;
        Ok(Some(node))
    }

    /// Longest-match unary operators, with the same identifier-boundary
    /// rule as binary operators (so `typeofx` is an identifier).
    fn gobble_unary_expression(&mut self, ch: char) -> Result<Option<Expr>, ExprError> {
        let available = self.chars.len().saturating_sub(self.pos);
        let mut len = self.grammar.max_unary_op_len().min(available);
        while len > 0 {
            let candidate = self.slice(self.pos, self.pos + len);
            if self.grammar.is_unary_op(&candidate) {
                let starts_identifier = self.is_identifier_start(ch);
                let boundary_ok = !starts_identifier
                    || (self.pos + len < self.chars.len()
                        && !self.is_identifier_part(self.chars[self.pos + len]));
                if boundary_ok {
                    self.pos += len;
                    let argument = self
                        .gobble_token()?
                        .ok_or_else(|| self.error("missing unaryOp argument"))?;
                    let node = Expr::Unary {
                        op: candidate,
                        argument: Box::new(argument),
                    };
                    let node = self.run_after_token(node)?;
                    return Ok(Some(node));
                }
            }
            len -= 1;
        }
        Ok(None)
    }

    /// Postfix parsing after a primary token: `.prop`, `[expr]`, `(args)`,
    /// and optional-chaining `?.`, looping until none applies.
    pub fn gobble_token_property(&mut self, mut node: Expr) -> Result<Expr, ExprError> {
        self.gobble_spaces();
        while let Some(mut ch) = self.peek() {
            if ch != '.' && ch != '[' && ch != '(' && ch != '?' {
                break;
            }
            let mut optional = false;
            if ch == '?' {
                if self.peek_at(self.pos + 1) != Some('.') {
                    break;
                }
                optional = true;
                self.pos += 2;
                self.gobble_spaces();
                ch = match self.peek() {
                    Some(c) => c,
                    None => break,
                };
            }
            self.advance();

            if ch == '[' {
                let property = self.gobble_expression()?.ok_or_else(|| {
                    let found = self.peek().map(String::from).unwrap_or_default();
                    self.error(format!("Unexpected \"{found}\""))
                })?;
                self.gobble_spaces();
                if self.peek() != Some(']') {
                    return Err(self.error("Unclosed ["));
                }
                self.advance();
                node = Expr::Member {
                    object: Box::new(node),
                    property: Box::new(property),
                    computed: true,
                    optional,
                };
            } else if ch == '(' {
                let args = self.gobble_call_arguments()?;
                node = Expr::Call {
                    callee: Box::new(node),
                    args,
                    optional,
                };
            } else {
                // `.name`, or the first property character after `?.`
                if optional {
                    self.pos -= 1;
                }
                self.gobble_spaces();
                let name = self.gobble_identifier()?;
                node = Expr::Member {
                    object: Box::new(node),
                    property: Box::new(Expr::Identifier(name)),
                    computed: false,
                    optional,
                };
            }
            self.gobble_spaces();
        }
        Ok(node)
    }

    pub fn gobble_identifier(&mut self) -> Result<String, ExprError> {
        let Some(ch) = self.peek() else {
            return Err(self.error("Expected identifier"));
        };
        if !self.is_identifier_start(ch) {
            return Err(self.error(format!("Unexpected {ch}")));
        }
        let start = self.pos;
        self.advance();
        while let Some(c) = self.peek() {
            if self.is_identifier_part(c) {
                self.advance();
            } else {
                break;
            }
        }
        Ok(self.slice(start, self.pos))
    }

    fn gobble_numeric_literal(&mut self) -> Result<Expr, ExprError> {
        let mut number = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                number.push(c);
                self.advance();
            } else {
                break;
            }
        }
        if self.peek() == Some('.') {
            number.push('.');
            self.advance();
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    number.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }
        if let Some(e @ ('e' | 'E')) = self.peek() {
            number.push(e);
            self.advance();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                number.push(sign);
                self.advance();
            }
            let mut has_exponent = false;
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    number.push(c);
                    self.advance();
                    has_exponent = true;
                } else {
                    break;
                }
            }
            if !has_exponent {
                let found = self.peek().map(String::from).unwrap_or_default();
                return Err(self.error(format!("Expected exponent ({number}{found})")));
            }
        }

        if let Some(c) = self.peek() {
            if self.is_identifier_start(c) {
                return Err(self.error(format!(
                    "Variable names cannot start with a number ({number}{c})"
                )));
            }
            if c == '.' {
                return Err(self.error("Unexpected period"));
            }
        }
        if number == "." {
            return Err(self.error("Unexpected period"));
        }

        let parsed: f64 = number
            .parse()
            .map_err(|_| self.error(format!("Invalid number {number}")))?;
        Ok(Expr::Literal(Value::from(parsed)))
    }

    fn gobble_string_literal(&mut self) -> Result<Expr, ExprError> {
        let mut value = String::new();
        let Some(quote) = self.advance() else {
            return Err(self.error("Expected string"));
        };
        let mut closed = false;
        while let Some(ch) = self.advance() {
            if ch == quote {
                closed = true;
                break;
            }
            if ch == '\\' {
                // Escaped characters without a special meaning pass
                // through literally.
                match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some('t') => value.push('\t'),
                    Some('b') => value.push('\u{0008}'),
                    Some('f') => value.push('\u{000C}'),
                    Some('v') => value.push('\u{000B}'),
                    Some(other) => value.push(other),
                    None => break,
                }
            } else {
                value.push(ch);
            }
        }
        if !closed {
            return Err(self.error(format!("Unclosed quote after \"{value}\"")));
        }
        Ok(Expr::Literal(Value::String(value)))
    }

    fn gobble_group(&mut self) -> Result<Option<Expr>, ExprError> {
        self.advance();
        let mut nodes = self.gobble_expressions(Some(')'))?;
        if self.peek() != Some(')') {
            return Err(self.error("Unclosed ("));
        }
        self.advance();
        match nodes.len() {
            0 => Err(self.error("Unexpected token )")),
            1 => Ok(Some(nodes.remove(0))),
            _ => Ok(Some(Expr::Sequence(nodes))),
        }
    }

    /// Gobbles a comma-separated list up to `termination`.
    ///
    /// For array literals a missing element between commas becomes an
    /// explicit hole; for call argument lists it is a syntax error.
    fn gobble_arguments(&mut self, termination: char) -> Result<Vec<Option<Expr>>, ExprError> {
        let mut args: Vec<Option<Expr>> = Vec::new();
        let mut separators = 0usize;
        let mut closed = false;
        while !self.at_end() {
            self.gobble_spaces();
            let ch = self.peek();
            if ch == Some(termination) {
                self.advance();
                closed = true;
                if termination == ')' && separators > 0 && separators >= args.len() {
                    return Err(self.error(format!("Unexpected token {termination}")));
                }
                break;
            } else if ch == Some(',') {
                self.advance();
                separators += 1;
                if separators != args.len() {
                    if termination == ')' {
                        return Err(self.error("Unexpected token ,"));
                    }
                    while args.len() < separators {
                        args.push(None);
                    }
                }
            } else if args.len() != separators && separators != 0 {
                return Err(self.error("Expected comma"));
            } else {
                let node = self.gobble_expression()?;
                let valid = node
                    .as_ref()
                    .map(|n| !matches!(n, Expr::Compound(_)))
                    .unwrap_or(false);
                if !valid {
                    return Err(self.error("Expected comma"));
                }
                args.push(node);
            }
        }
        if !closed {
            return Err(self.error(format!("Expected {termination}")));
        }
        Ok(args)
    }

    fn gobble_call_arguments(&mut self) -> Result<Vec<Expr>, ExprError> {
        let args = self.gobble_arguments(')')?;
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            out.push(arg.ok_or_else(|| self.error("Expected comma"))?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(input: &str) -> Expr {
        Parser::default().parse(input).unwrap()
    }

    fn parse_err(input: &str) -> ExprError {
        Parser::default().parse(input).unwrap_err()
    }

    fn binary(op: &str, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op: op.to_string(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn lit(v: f64) -> Expr {
        Expr::Literal(Value::from(v))
    }

    fn ident(name: &str) -> Expr {
        Expr::Identifier(name.to_string())
    }

    #[test]
    fn test_parse_simple_binary() {
        assert_eq!(parse("a + b"), binary("+", ident("a"), ident("b")));
    }

    #[test]
    fn test_parse_operator_precedence() {
        assert_eq!(
            parse("2 + 3 * 4"),
            binary("+", lit(2.0), binary("*", lit(3.0), lit(4.0)))
        );
        assert_eq!(
            parse("2 * 3 + 4"),
            binary("+", binary("*", lit(2.0), lit(3.0)), lit(4.0))
        );
    }

    #[test]
    fn test_parse_left_associativity() {
        assert_eq!(
            parse("10 - 4 - 3"),
            binary("-", binary("-", lit(10.0), lit(4.0)), lit(3.0))
        );
    }

    #[test]
    fn test_parse_exponent_right_associativity() {
        assert_eq!(
            parse("2 ** 3 ** 2"),
            binary("**", lit(2.0), binary("**", lit(3.0), lit(2.0)))
        );
    }

    #[test]
    fn test_parse_logical_precedence() {
        // && binds tighter than ||
        assert_eq!(
            parse("a || b && c"),
            binary("||", ident("a"), binary("&&", ident("b"), ident("c")))
        );
    }

    #[test]
    fn test_parse_unary() {
        assert_eq!(
            parse("-5"),
            Expr::Unary {
                op: "-".to_string(),
                argument: Box::new(lit(5.0)),
            }
        );
        assert_eq!(
            parse("10 - -5"),
            binary(
                "-",
                lit(10.0),
                Expr::Unary {
                    op: "-".to_string(),
                    argument: Box::new(lit(5.0)),
                }
            )
        );
    }

    #[test]
    fn test_parse_word_unary_operator_boundary() {
        // `typeof` applies as an operator, `typeofx` is a plain identifier
        assert!(matches!(parse("typeof a"), Expr::Unary { .. }));
        assert_eq!(parse("typeofx"), ident("typeofx"));
    }

    #[test]
    fn test_parse_literals() {
        assert_eq!(parse("true"), Expr::Literal(json!(true)));
        assert_eq!(parse("null"), Expr::Literal(Value::Null));
        assert_eq!(parse("'hi'"), Expr::Literal(json!("hi")));
        assert_eq!(parse("\"a\\tb\""), Expr::Literal(json!("a\tb")));
        assert_eq!(parse("'\\q'"), Expr::Literal(json!("q")));
        assert_eq!(parse("this"), Expr::This);
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse("1.5"), lit(1.5));
        assert_eq!(parse(".5"), lit(0.5));
        assert_eq!(parse("2e3"), lit(2000.0));
        assert_eq!(parse("2E-2"), lit(0.02));
    }

    #[test]
    fn test_parse_member_access() {
        let node = parse("a.b[c]");
        let Expr::Member {
            object,
            property,
            computed,
            ..
        } = node
        else {
            panic!("Expected member expression");
        };
        assert!(computed);
        assert_eq!(*property, ident("c"));
        assert_eq!(
            *object,
            Expr::Member {
                object: Box::new(ident("a")),
                property: Box::new(ident("b")),
                computed: false,
                optional: false,
            }
        );
    }

    #[test]
    fn test_parse_optional_chaining() {
        let node = parse("a?.b");
        assert!(matches!(node, Expr::Member { optional: true, .. }));
    }

    #[test]
    fn test_parse_call() {
        let node = parse("f(a, 1)");
        let Expr::Call { callee, args, .. } = node else {
            panic!("Expected call expression");
        };
        assert_eq!(*callee, ident("f"));
        assert_eq!(args, vec![ident("a"), lit(1.0)]);
    }

    #[test]
    fn test_parse_array_with_holes() {
        let node = parse("[1, , 3]");
        let Expr::Array(items) = node else {
            panic!("Expected array literal");
        };
        assert_eq!(items, vec![Some(lit(1.0)), None, Some(lit(3.0))]);
    }

    #[test]
    fn test_parse_missing_call_argument_is_error() {
        parse_err("f(a, , b)");
    }

    #[test]
    fn test_parse_group_and_sequence() {
        assert_eq!(
            parse("(1 + 2) * 3"),
            binary("*", binary("+", lit(1.0), lit(2.0)), lit(3.0))
        );
        assert_eq!(parse("(a, b)"), Expr::Sequence(vec![ident("a"), ident("b")]));
    }

    #[test]
    fn test_parse_compound() {
        assert_eq!(parse("a; b"), Expr::Compound(vec![ident("a"), ident("b")]));
    }

    #[test]
    fn test_parse_errors_carry_offset() {
        let err = parse_err("1abc");
        let ExprError::Syntax { message, pos } = err else {
            panic!("Expected syntax error");
        };
        assert!(message.contains("Variable names cannot start with a number"));
        assert_eq!(pos, 1);
    }

    #[test]
    fn test_parse_error_cases() {
        parse_err("'unterminated");
        parse_err("(a");
        parse_err("()");
        parse_err("a +");
        parse_err("1.2.3");
        parse_err(".");
        parse_err("2e");
    }

    #[test]
    fn test_custom_operator_registration() {
        let mut grammar = Grammar::default();
        grammar.register_binary_op("=>?", 10.0, false);
        let parser = Parser::new(grammar);
        let node = parser.parse("a =>? b").unwrap();
        assert_eq!(node, binary("=>?", ident("a"), ident("b")));
    }

    #[test]
    fn test_custom_literal_registration() {
        let mut grammar = Grammar::default();
        grammar.register_literal("unit", json!({ "kind": "unit" }));
        let parser = Parser::new(grammar);
        assert_eq!(
            parser.parse("unit").unwrap(),
            Expr::Literal(json!({ "kind": "unit" }))
        );
    }
}
