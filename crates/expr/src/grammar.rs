//! Grammar configuration for the expression parser.
//!
//! Operator, literal, and identifier-character tables live in a `Grammar`
//! value constructed once by the caller and treated as read-only by every
//! parse. Optional syntax (ternary conditionals, assignment operators,
//! regex literals) is layered on through `GrammarPlugin` registrations.

use crate::ast::Expr;
use crate::error::ExprError;
use crate::parser::ParserState;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Precedence assigned to assignment operators. Anything at or below this
/// binds looser than a ternary conditional; everything in the default
/// table binds tighter.
pub const ASSIGN_PRECEDENCE: f32 = 0.9;

/// Precedence and associativity for one binary operator token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinaryOpSpec {
    pub precedence: f32,
    pub right_associative: bool,
}

/// A grammar extension, invoked by the parser at fixed points in its
/// control flow.
///
/// Plugins are registered once under a unique name; registering the same
/// name twice is a no-op.
pub trait GrammarPlugin: Send + Sync {
    fn name(&self) -> &'static str;

    /// Called once at registration time so the plugin can add the operator
    /// and literal table entries it needs.
    fn install(&self, _grammar: &mut Grammar) {}

    /// Try to gobble a primary token at the current cursor position.
    /// Returning `Ok(None)` lets the core grammar proceed.
    fn gobble_token(&self, _state: &mut ParserState) -> Result<Option<Expr>, ExprError> {
        Ok(None)
    }

    /// Post-process a token after it (and any postfix accesses) have been
    /// gobbled.
    fn after_token(&self, _state: &mut ParserState, node: Expr) -> Result<Expr, ExprError> {
        Ok(node)
    }

    /// Post-process a completed expression. The cursor sits just past the
    /// expression, so a plugin may consume further input here (this is how
    /// the ternary extension works).
    fn after_expression(&self, _state: &mut ParserState, node: Expr) -> Result<Expr, ExprError> {
        Ok(node)
    }
}

pub struct Grammar {
    binary_ops: HashMap<String, BinaryOpSpec>,
    unary_ops: HashSet<String>,
    literals: HashMap<String, Value>,
    identifier_chars: HashSet<char>,
    plugins: Vec<Arc<dyn GrammarPlugin>>,
    plugin_names: HashSet<&'static str>,
    max_binary_len: usize,
    max_unary_len: usize,
}

impl Default for Grammar {
    /// The standard operator set: logical, bitwise, equality, relational,
    /// shift, additive, and multiplicative operators, with `**` as the
    /// sole right-associative entry.
    fn default() -> Self {
        let mut g = Self::empty();
        for (token, precedence) in [
            ("||", 1.0),
            ("&&", 2.0),
            ("|", 3.0),
            ("^", 4.0),
            ("&", 5.0),
            ("==", 6.0),
            ("!=", 6.0),
            ("===", 6.0),
            ("!==", 6.0),
            ("<", 7.0),
            (">", 7.0),
            ("<=", 7.0),
            (">=", 7.0),
            ("<<", 8.0),
            (">>", 8.0),
            (">>>", 8.0),
            ("+", 9.0),
            ("-", 9.0),
            ("*", 10.0),
            ("/", 10.0),
            ("%", 10.0),
        ] {
            g.register_binary_op(token, precedence, false);
        }
        g.register_binary_op("**", 11.0, true);

        for token in ["-", "!", "~", "+", "typeof"] {
            g.register_unary_op(token);
        }

        g.register_literal("true", Value::Bool(true));
        g.register_literal("false", Value::Bool(false));
        g.register_literal("null", Value::Null);

        g.register_identifier_char('$');
        g.register_identifier_char('_');
        g
    }
}

impl Grammar {
    /// A grammar with no operators, literals, or extra identifier
    /// characters at all.
    pub fn empty() -> Self {
        Self {
            binary_ops: HashMap::new(),
            unary_ops: HashSet::new(),
            literals: HashMap::new(),
            identifier_chars: HashSet::new(),
            plugins: Vec::new(),
            plugin_names: HashSet::new(),
            max_binary_len: 0,
            max_unary_len: 0,
        }
    }

    /// The default grammar with the ternary, assignment, and regex-literal
    /// extensions registered.
    pub fn with_extensions() -> Self {
        use crate::extensions::{AssignmentPlugin, RegexPlugin, TernaryPlugin};
        let mut g = Self::default();
        g.register_plugin(Arc::new(TernaryPlugin));
        g.register_plugin(Arc::new(AssignmentPlugin));
        g.register_plugin(Arc::new(RegexPlugin));
        g
    }

    pub fn register_binary_op(&mut self, token: &str, precedence: f32, right_associative: bool) {
        self.max_binary_len = self.max_binary_len.max(token.chars().count());
        self.binary_ops.insert(
            token.to_string(),
            BinaryOpSpec {
                precedence,
                right_associative,
            },
        );
    }

    pub fn register_unary_op(&mut self, token: &str) {
        self.max_unary_len = self.max_unary_len.max(token.chars().count());
        self.unary_ops.insert(token.to_string());
    }

    /// Registers an identifier that parses as a literal value instead of a
    /// variable reference.
    pub fn register_literal(&mut self, name: &str, value: Value) {
        self.literals.insert(name.to_string(), value);
    }

    /// Adds a character to the set of extra identifier-start characters
    /// (`$` and `_` in the default grammar).
    pub fn register_identifier_char(&mut self, ch: char) {
        self.identifier_chars.insert(ch);
    }

    pub fn register_plugin(&mut self, plugin: Arc<dyn GrammarPlugin>) {
        if !self.plugin_names.insert(plugin.name()) {
            return;
        }
        plugin.install(self);
        self.plugins.push(plugin);
    }

    pub fn binary_op(&self, token: &str) -> Option<&BinaryOpSpec> {
        self.binary_ops.get(token)
    }

    pub fn is_unary_op(&self, token: &str) -> bool {
        self.unary_ops.contains(token)
    }

    pub fn literal(&self, name: &str) -> Option<&Value> {
        self.literals.get(name)
    }

    pub fn is_extra_identifier_char(&self, ch: char) -> bool {
        self.identifier_chars.contains(&ch)
    }

    /// Whether a single character is itself a registered binary operator
    /// token. Non-ASCII characters that pass this test are excluded from
    /// identifiers.
    pub fn is_binary_op_char(&self, ch: char) -> bool {
        let mut buf = [0u8; 4];
        self.binary_ops.contains_key(&*ch.encode_utf8(&mut buf))
    }

    pub fn max_binary_op_len(&self) -> usize {
        self.max_binary_len
    }

    pub fn max_unary_op_len(&self) -> usize {
        self.max_unary_len
    }

    pub fn plugins(&self) -> &[Arc<dyn GrammarPlugin>] {
        &self.plugins
    }
}
