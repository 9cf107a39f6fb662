//! Optional grammar extensions: ternary conditionals, assignment and
//! update operators, and regex literals. Each is an independent
//! `GrammarPlugin` so callers can compose exactly the syntax they want.

use crate::ast::{Expr, UpdateOp};
use crate::error::ExprError;
use crate::grammar::{ASSIGN_PRECEDENCE, Grammar, GrammarPlugin};
use crate::parser::ParserState;
use serde_json::Value;

// --- Ternary conditionals ---

/// Adds `test ? consequent : alternate` syntax.
pub struct TernaryPlugin;

impl GrammarPlugin for TernaryPlugin {
    fn name(&self) -> &'static str {
        "ternary"
    }

    fn after_expression(&self, state: &mut ParserState, node: Expr) -> Result<Expr, ExprError> {
        if state.peek() != Some('?') || state.peek_at(state.pos() + 1) == Some('.') {
            return Ok(node);
        }
        state.advance();
        let consequent = state
            .gobble_expression()?
            .ok_or_else(|| state.error("Expected expression"))?;
        state.gobble_spaces();
        if state.peek() != Some(':') {
            return Err(state.error("Expected :"));
        }
        state.advance();
        let alternate = state
            .gobble_expression()?
            .ok_or_else(|| state.error("Expected expression"))?;
        Ok(reroot_conditional(state.grammar(), node, consequent, alternate))
    }
}

/// The conditional must bind looser than `||`/`&&` but tighter than
/// assignment. When the test expression ends in an assignment-precedence
/// subtree, the conditional is re-rooted above that subtree's right-hand
/// side.
fn reroot_conditional(grammar: &Grammar, test: Expr, consequent: Expr, alternate: Expr) -> Expr {
    match test {
        Expr::Binary { op, left, right } if is_assignment_precedence(grammar, &op) => Expr::Binary {
            op,
            left,
            right: Box::new(reroot_conditional(grammar, *right, consequent, alternate)),
        },
        Expr::Assignment { op, target, value } => Expr::Assignment {
            op,
            target,
            value: Box::new(reroot_conditional(grammar, *value, consequent, alternate)),
        },
        other => Expr::Conditional {
            test: Box::new(other),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        },
    }
}

fn is_assignment_precedence(grammar: &Grammar, op: &str) -> bool {
    grammar
        .binary_op(op)
        .map(|spec| spec.precedence <= ASSIGN_PRECEDENCE)
        .unwrap_or(false)
}

// --- Assignment and update operators ---

const ASSIGNMENT_OPS: [&str; 16] = [
    "=", "*=", "**=", "/=", "%=", "+=", "-=", "<<=", ">>=", ">>>=", "&=", "^=", "|=", "||=",
    "&&=", "??=",
];

/// Adds the assignment operator family plus prefix/postfix `++`/`--`.
///
/// The operators are registered as right-associative binary operators; a
/// post-pass rewrites the resulting binary nodes (including transitively
/// chained ones, as in `a = b = 1`) into assignment nodes.
pub struct AssignmentPlugin;

impl GrammarPlugin for AssignmentPlugin {
    fn name(&self) -> &'static str {
        "assignment"
    }

    fn install(&self, grammar: &mut Grammar) {
        for op in ASSIGNMENT_OPS {
            grammar.register_binary_op(op, ASSIGN_PRECEDENCE, true);
        }
    }

    fn gobble_token(&self, state: &mut ParserState) -> Result<Option<Expr>, ExprError> {
        let Some(op) = peek_update_op(state) else {
            return Ok(None);
        };
        state.set_pos(state.pos() + 2);
        let name = state.gobble_identifier()?;
        let target = state.gobble_token_property(Expr::Identifier(name))?;
        if !matches!(target, Expr::Identifier(_) | Expr::Member { .. }) {
            return Err(state.error(format!("Unexpected {}", op.token())));
        }
        Ok(Some(Expr::Update {
            op,
            prefix: true,
            target: Box::new(target),
        }))
    }

    fn after_token(&self, state: &mut ParserState, node: Expr) -> Result<Expr, ExprError> {
        let Some(op) = peek_update_op(state) else {
            return Ok(node);
        };
        if !matches!(node, Expr::Identifier(_) | Expr::Member { .. }) {
            return Err(state.error(format!("Unexpected {}", op.token())));
        }
        state.set_pos(state.pos() + 2);
        Ok(Expr::Update {
            op,
            prefix: false,
            target: Box::new(node),
        })
    }

    fn after_expression(&self, _state: &mut ParserState, node: Expr) -> Result<Expr, ExprError> {
        Ok(rewrite_assignments(node))
    }
}

fn peek_update_op(state: &ParserState) -> Option<UpdateOp> {
    match (state.peek(), state.peek_at(state.pos() + 1)) {
        (Some('+'), Some('+')) => Some(UpdateOp::Increment),
        (Some('-'), Some('-')) => Some(UpdateOp::Decrement),
        _ => None,
    }
}

fn rewrite_assignments(node: Expr) -> Expr {
    match node {
        Expr::Binary { op, left, right } if ASSIGNMENT_OPS.contains(&op.as_str()) => {
            Expr::Assignment {
                op,
                target: Box::new(rewrite_assignments(*left)),
                value: Box::new(rewrite_assignments(*right)),
            }
        }
        other => other,
    }
}

// --- Regex literals ---

/// Adds `/pattern/flags` literal syntax, recognized only in token
/// position so it never collides with the division operator. The pattern
/// is validated at parse time; the resulting literal is the pattern text
/// with recognized flags folded in as inline modifiers.
pub struct RegexPlugin;

impl GrammarPlugin for RegexPlugin {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn gobble_token(&self, state: &mut ParserState) -> Result<Option<Expr>, ExprError> {
        if state.peek() != Some('/') {
            return Ok(None);
        }
        state.advance();
        let start = state.pos();
        let mut in_class = false;
        while let Some(ch) = state.peek() {
            if ch == '/' && !in_class {
                let pattern = state.slice(start, state.pos());
                state.advance();
                let mut flags = String::new();
                while let Some(c) = state.peek() {
                    if c.is_ascii_alphanumeric() {
                        flags.push(c);
                        state.advance();
                    } else {
                        break;
                    }
                }
                let source = compile_regex(&pattern, &flags).map_err(|msg| state.error(msg))?;
                let node = Expr::Literal(Value::String(source));
                let node = state.gobble_token_property(node)?;
                return Ok(Some(node));
            }
            if ch == '[' {
                in_class = true;
            } else if ch == ']' && in_class {
                in_class = false;
            }
            // A backslash escape consumes two characters, so `\/` does not
            // terminate the literal.
            state.advance();
            if ch == '\\' {
                state.advance();
            }
        }
        Err(state.error("Unclosed Regex"))
    }
}

fn compile_regex(pattern: &str, flags: &str) -> Result<String, String> {
    let mut inline = String::new();
    for flag in flags.chars() {
        match flag {
            'i' => inline.push('i'),
            'm' => inline.push('m'),
            's' => inline.push('s'),
            'g' | 'u' | 'y' => {}
            other => return Err(format!("Invalid regular expression flag '{other}'")),
        }
    }
    let source = if inline.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{inline}){pattern}")
    };
    regex::Regex::new(&source).map_err(|e| e.to_string())?;
    Ok(source)
}
