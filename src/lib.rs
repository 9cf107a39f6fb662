//! Stencil: a JSONPath template-resolution engine.
//!
//! The workspace is split into three engine crates, re-exported here:
//!
//! - **`stencil-expr`** — an extensible expression parser (precedence
//!   climbing over configurable operator tables, plugin grammar
//!   extensions) and a restricted evaluator with a property-name
//!   denylist.
//! - **`stencil-jsonpath`** — a JSONPath query engine: path strings
//!   normalize to cached segment lists and are traced recursively, with
//!   filter/script segments delegating to the expression evaluator.
//! - **`stencil-template`** — the `{$.path}` placeholder resolver over
//!   nested JSON values, with error accumulation and per-call namespace
//!   injection.
//!
//! A consumer builds request payloads by resolving templates against a
//! job context:
//!
//! ```
//! use serde_json::json;
//! use stencil::{ResolveOptions, resolve_templates};
//!
//! let payload = json!({ "login": "{$.user.email}" });
//! let context = json!({ "user": { "email": "a@b.com" } });
//! let (resolved, errors) = resolve_templates(&payload, &context, ResolveOptions::default());
//! assert_eq!(resolved, json!({ "login": "a@b.com" }));
//! assert!(errors.is_empty());
//! ```

pub use stencil_expr::{
    Bindings, Evaluator, Expr, ExprError, FunctionRegistry, Grammar, GrammarPlugin, Parser,
};
pub use stencil_jsonpath::{
    ExpressionEvaluator, JsonPath, PathError, QueryOptions, ResultType, SafeEvaluator, Segment,
    TraceMatch,
};
pub use stencil_template::{NO_VALUE, ResolveOptions, TemplateResolver};

use serde_json::Value;

/// One-call template resolution.
///
/// Constructs a resolver per call; callers resolving many payloads should
/// hold a [`TemplateResolver`] instead so the path and expression caches
/// are reused.
pub fn resolve_templates(
    input: &Value,
    context: &Value,
    options: ResolveOptions,
) -> (Value, Vec<String>) {
    TemplateResolver::new(options).resolve(input, context)
}
