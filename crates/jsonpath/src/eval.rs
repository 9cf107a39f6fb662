//! The expression-evaluation capability used by filter (`?(...)`) and
//! script (`(...)`) segments.
//!
//! The engine only needs one operation — evaluate an expression string
//! against a set of bindings — so alternate evaluators are swappable by
//! the caller. The default is the restricted interpreter from
//! `stencil-expr`.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use stencil_expr::{Evaluator, Expr, ExprError, Grammar, Parser};

/// Evaluates filter/script expressions for the query engine.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(
        &self,
        expression: &str,
        bindings: &mut Map<String, Value>,
    ) -> Result<Value, ExprError>;
}

/// The default evaluator: the restricted `stencil-expr` interpreter with
/// `@` admitted as an identifier character, plus an append-only cache of
/// compiled expressions so a filter applied across many elements compiles
/// once.
pub struct SafeEvaluator {
    parser: Parser,
    evaluator: Evaluator,
    compiled: RwLock<HashMap<String, Arc<Expr>>>,
}

impl SafeEvaluator {
    pub fn new() -> Self {
        let mut grammar = Grammar::with_extensions();
        grammar.register_identifier_char('@');
        Self {
            parser: Parser::new(grammar),
            evaluator: Evaluator::default(),
            compiled: RwLock::new(HashMap::new()),
        }
    }

    fn compile(&self, expression: &str) -> Result<Arc<Expr>, ExprError> {
        if let Ok(cache) = self.compiled.read() {
            if let Some(expr) = cache.get(expression) {
                return Ok(Arc::clone(expr));
            }
        }
        let expr = Arc::new(self.parser.parse(expression)?);
        if let Ok(mut cache) = self.compiled.write() {
            cache.insert(expression.to_string(), Arc::clone(&expr));
        }
        Ok(expr)
    }
}

impl Default for SafeEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionEvaluator for SafeEvaluator {
    fn evaluate(
        &self,
        expression: &str,
        bindings: &mut Map<String, Value>,
    ) -> Result<Value, ExprError> {
        let expr = self.compile(expression)?;
        self.evaluator.evaluate(&expr, bindings)
    }
}
