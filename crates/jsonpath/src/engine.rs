//! The query engine: traces normalized segment lists against a JSON value
//! and shapes the matches per the configured result type.

use crate::error::PathError;
use crate::eval::{ExpressionEvaluator, SafeEvaluator};
use crate::parser;
use crate::segment::{Segment, TypeTest};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use stencil_expr::truthy;

/// The shape of each entry in a query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultType {
    /// The matched value itself.
    #[default]
    Value,
    /// The match's normalized path string (`$['store']['book'][0]`).
    Path,
    /// The match's JSON Pointer (`/store/book/0`).
    Pointer,
    /// The container holding the matched value.
    Parent,
    /// The property name under which the match was found.
    ParentProperty,
    /// A record carrying all of the above.
    All,
}

/// The classifier consulted by `@other()` type tests.
pub type OtherTypeTest = fn(&Value) -> bool;

/// Configuration for a query engine instance.
pub struct QueryOptions {
    pub result_type: ResultType,
    /// When false, a single match is returned bare instead of inside a
    /// one-element array, and no match at all yields null.
    pub wrap: bool,
    /// When true, nested array results are concatenated instead of nested.
    pub flatten: bool,
    /// Extra bindings made available to filter and script expressions.
    pub sandbox: Map<String, Value>,
    /// Treat filter evaluation failures as a falsy filter result instead
    /// of failing the query.
    pub ignore_eval_errors: bool,
    /// The evaluation capability for `?(...)` and `(...)` segments.
    /// `None` disables evaluation; scripted segments then fail loudly.
    pub evaluator: Option<Arc<dyn ExpressionEvaluator>>,
    pub other_type_test: Option<OtherTypeTest>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            result_type: ResultType::Value,
            wrap: true,
            flatten: false,
            sandbox: Map::new(),
            ignore_eval_errors: false,
            evaluator: Some(Arc::new(SafeEvaluator::new())),
            other_type_test: None,
        }
    }
}

/// One matched location: the traversed path, the value, and where it was
/// found. Transient; produced and consumed within a single query.
#[derive(Debug, Clone)]
pub struct TraceMatch {
    /// Path components from the root down to the match (root excluded).
    pub path: Vec<String>,
    pub value: Value,
    pub parent: Option<Value>,
    pub parent_property: Option<String>,
    /// Whether the trace passed through a multi-match segment (wildcard,
    /// slice, filter, or recursive descent).
    pub has_array: bool,
}

/// A JSONPath query engine.
///
/// The engine owns two append-only caches: compiled segment lists keyed
/// by the raw path string, and (inside the default evaluator) compiled
/// filter expressions keyed by expression text. Neither is ever
/// invalidated; unbounded growth is the documented tradeoff. Callers that
/// need bounded memory should create short-lived engines.
pub struct JsonPath {
    options: QueryOptions,
    segments: RwLock<HashMap<String, Arc<Vec<Segment>>>>,
}

impl Default for JsonPath {
    fn default() -> Self {
        Self::new(QueryOptions::default())
    }
}

impl JsonPath {
    pub fn new(options: QueryOptions) -> Self {
        Self {
            options,
            segments: RwLock::new(HashMap::new()),
        }
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Compiles a raw path, reusing the cached segment list when the same
    /// raw string has been seen before.
    pub fn compile(&self, path: &str) -> Result<Arc<Vec<Segment>>, PathError> {
        if let Ok(cache) = self.segments.read() {
            if let Some(segments) = cache.get(path) {
                return Ok(Arc::clone(segments));
            }
        }
        let segments = Arc::new(parser::parse_path(path)?);
        if let Ok(mut cache) = self.segments.write() {
            cache.insert(path.to_string(), Arc::clone(&segments));
        }
        Ok(segments)
    }

    /// Runs a query and returns the raw match records.
    pub fn find(&self, path: &str, root: &Value) -> Result<Vec<TraceMatch>, PathError> {
        let segments = self.compile(path)?;
        let mut out = Vec::new();
        self.trace(&segments, root, &[], None, None, false, root, &mut out)?;
        Ok(out)
    }

    /// Runs a query and shapes the matches per the configured result type
    /// and wrapping flags.
    pub fn query(&self, path: &str, root: &Value) -> Result<Value, PathError> {
        let matches = self.find(path, root)?;
        let mut shaped = Vec::with_capacity(matches.len());
        for m in &matches {
            let value = self.shape(m);
            if self.options.flatten {
                match value {
                    Value::Array(items) => shaped.extend(items),
                    other => shaped.push(other),
                }
            } else {
                shaped.push(value);
            }
        }
        if !self.options.wrap {
            return Ok(match shaped.len() {
                0 => Value::Null,
                1 => shaped.remove(0),
                _ => Value::Array(shaped),
            });
        }
        Ok(Value::Array(shaped))
    }

    fn shape(&self, m: &TraceMatch) -> Value {
        match self.options.result_type {
            ResultType::Value => m.value.clone(),
            ResultType::Path => Value::String(to_path_string(&m.path)),
            ResultType::Pointer => Value::String(to_pointer(&m.path)),
            ResultType::Parent => m.parent.clone().unwrap_or(Value::Null),
            ResultType::ParentProperty => m
                .parent_property
                .clone()
                .map(Value::String)
                .unwrap_or(Value::Null),
            ResultType::All => json!({
                "path": to_path_string(&m.path),
                "pointer": to_pointer(&m.path),
                "value": m.value,
                "parent": m.parent.clone().unwrap_or(Value::Null),
                "parentProperty": m
                    .parent_property
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            }),
        }
    }

    /// The recursive trace over (remaining segments, current value,
    /// accumulated path, parent, parent property).
    #[allow(clippy::too_many_arguments)]
    fn trace(
        &self,
        segments: &[Segment],
        val: &Value,
        path: &[String],
        parent: Option<&Value>,
        parent_prop: Option<&str>,
        has_array: bool,
        root: &Value,
        out: &mut Vec<TraceMatch>,
    ) -> Result<(), PathError> {
        let Some((segment, rest)) = segments.split_first() else {
            out.push(TraceMatch {
                path: path.to_vec(),
                value: val.clone(),
                parent: parent.cloned(),
                parent_property: parent_prop.map(str::to_string),
                has_array,
            });
            return Ok(());
        };

        match segment {
            Segment::Key(name) | Segment::Literal(name) => {
                if let Some(child) = get_child(val, name) {
                    let next = push(path, name);
                    self.trace(rest, child, &next, Some(val), Some(name.as_str()), has_array, root, out)?;
                }
            }
            Segment::Wildcard => {
                for (key, child) in children(val) {
                    let next = push(path, &key);
                    self.trace(rest, child, &next, Some(val), Some(key.as_str()), true, root, out)?;
                }
            }
            Segment::Descendant => {
                // The current value first, then every container child,
                // which keeps results in pre-order.
                self.trace(rest, val, path, parent, parent_prop, has_array, root, out)?;
                for (key, child) in children(val) {
                    if child.is_object() || child.is_array() {
                        let next = push(path, &key);
                        self.trace(segments, child, &next, Some(val), Some(key.as_str()), true, root, out)?;
                    }
                }
            }
            Segment::Parent => {
                // Not a terminal result: re-trace the remaining path from
                // one level up, located by re-walking the root.
                if path.is_empty() {
                    return Ok(());
                }
                let up = &path[..path.len() - 1];
                if let Some((value, up_parent, up_prop)) = walk_to(root, up) {
                    self.trace(rest, value, up, up_parent, up_prop, has_array, root, out)?;
                }
            }
            Segment::PropertyName => {
                if let Some(prop) = parent_prop {
                    out.push(TraceMatch {
                        path: push(path, "~"),
                        value: Value::String(prop.to_string()),
                        parent: parent.cloned(),
                        parent_property: None,
                        has_array,
                    });
                }
            }
            Segment::Root => {
                self.trace(rest, root, &[], None, None, has_array, root, out)?;
            }
            Segment::Slice { start, end, step } => {
                let Value::Array(items) = val else {
                    return Ok(());
                };
                for index in slice_indices(items.len(), *start, *end, *step) {
                    let key = index.to_string();
                    let next = push(path, &key);
                    self.trace(
                        rest,
                        &items[index],
                        &next,
                        Some(val),
                        Some(key.as_str()),
                        true,
                        root,
                        out,
                    )?;
                }
            }
            Segment::Filter(expr) => {
                let evaluator = self.evaluator_for(expr)?;
                for (key, child) in children(val) {
                    let keep = self.eval_filter(
                        evaluator.as_ref(),
                        expr,
                        child,
                        &key,
                        path,
                        parent,
                        parent_prop,
                        root,
                    )?;
                    if keep {
                        let next = push(path, &key);
                        self.trace(rest, child, &next, Some(val), Some(key.as_str()), true, root, out)?;
                    }
                }
            }
            Segment::Script(expr) => {
                let evaluator = self.evaluator_for(expr)?;
                let result = self.eval_expression(evaluator.as_ref(), expr, val, root)?;
                let Some(result) = result else {
                    return Ok(());
                };
                let key = value_to_key(&result);
                if let Some(child) = get_child(val, &key) {
                    let next = push(path, &key);
                    self.trace(rest, child, &next, Some(val), Some(key.as_str()), has_array, root, out)?;
                }
            }
            Segment::TypeTest(test) => {
                // Value-type tests are terminal matches.
                if self.type_matches(*test, val)? {
                    out.push(TraceMatch {
                        path: path.to_vec(),
                        value: val.clone(),
                        parent: parent.cloned(),
                        parent_property: parent_prop.map(str::to_string),
                        has_array,
                    });
                }
            }
            Segment::Union(names) => {
                for name in names {
                    if let Some(child) = get_child(val, name) {
                        let next = push(path, name);
                        self.trace(rest, child, &next, Some(val), Some(name.as_str()), true, root, out)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn evaluator_for(&self, expression: &str) -> Result<&Arc<dyn ExpressionEvaluator>, PathError> {
        self.options
            .evaluator
            .as_ref()
            .ok_or_else(|| PathError::EvalDisabled {
                expression: expression.to_string(),
            })
    }

    /// Evaluates a filter expression with the child bound as `@`. The
    /// other `@`-prefixed bindings are only materialized when the
    /// expression text mentions them.
    #[allow(clippy::too_many_arguments)]
    fn eval_filter(
        &self,
        evaluator: &dyn ExpressionEvaluator,
        expr: &str,
        child: &Value,
        key: &str,
        path: &[String],
        parent: Option<&Value>,
        parent_prop: Option<&str>,
        root: &Value,
    ) -> Result<bool, PathError> {
        let mut bindings = self.options.sandbox.clone();
        bindings.insert("@".to_string(), child.clone());
        if expr.contains("@property") {
            bindings.insert("@property".to_string(), Value::String(key.to_string()));
        }
        if expr.contains("@parentProperty") {
            bindings.insert(
                "@parentProperty".to_string(),
                parent_prop
                    .map(|p| Value::String(p.to_string()))
                    .unwrap_or(Value::Null),
            );
        }
        if expr.contains("@parent") {
            bindings.insert(
                "@parent".to_string(),
                parent.cloned().unwrap_or(Value::Null),
            );
        }
        if expr.contains("@path") {
            bindings.insert(
                "@path".to_string(),
                Value::String(to_path_string(&push(path, key))),
            );
        }
        if expr.contains("@root") {
            bindings.insert("@root".to_string(), root.clone());
        }

        match evaluator.evaluate(expr, &mut bindings) {
            Ok(value) => Ok(truthy(&value)),
            Err(e) => {
                if self.options.ignore_eval_errors {
                    log::warn!("ignoring filter evaluation failure in '{expr}': {e}");
                    Ok(false)
                } else {
                    Err(PathError::Eval {
                        expression: expr.to_string(),
                        message: e.to_string(),
                    })
                }
            }
        }
    }

    /// Evaluates a script segment with the current value bound as `@`.
    fn eval_expression(
        &self,
        evaluator: &dyn ExpressionEvaluator,
        expr: &str,
        val: &Value,
        root: &Value,
    ) -> Result<Option<Value>, PathError> {
        let mut bindings = self.options.sandbox.clone();
        bindings.insert("@".to_string(), val.clone());
        if expr.contains("@root") {
            bindings.insert("@root".to_string(), root.clone());
        }
        match evaluator.evaluate(expr, &mut bindings) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                if self.options.ignore_eval_errors {
                    log::warn!("ignoring script evaluation failure in '{expr}': {e}");
                    Ok(None)
                } else {
                    Err(PathError::Eval {
                        expression: expr.to_string(),
                        message: e.to_string(),
                    })
                }
            }
        }
    }

    fn type_matches(&self, test: TypeTest, val: &Value) -> Result<bool, PathError> {
        Ok(match test {
            TypeTest::Boolean => val.is_boolean(),
            TypeTest::String => val.is_string(),
            TypeTest::Number => val.is_number(),
            TypeTest::Integer => match val {
                Value::Number(n) => {
                    n.is_i64()
                        || n.is_u64()
                        || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
                }
                _ => false,
            },
            TypeTest::Scalar => !val.is_object() && !val.is_array(),
            TypeTest::Array => val.is_array(),
            TypeTest::Object => val.is_object(),
            // JSON values are never functions, and absent keys never
            // reach a trace, so these tests exist for parity and always
            // fail against stored data.
            TypeTest::Function | TypeTest::Undefined => false,
            TypeTest::Null => val.is_null(),
            TypeTest::NonFinite => val
                .as_f64()
                .map(|f| !f.is_finite())
                .unwrap_or(false),
            TypeTest::Other => match self.options.other_type_test {
                Some(test) => test(val),
                None => return Err(PathError::MissingOtherTypeHandler),
            },
        })
    }
}

// --- Traversal helpers ---

fn push(path: &[String], key: &str) -> Vec<String> {
    let mut next = path.to_vec();
    next.push(key.to_string());
    next
}

fn get_child<'a>(val: &'a Value, key: &str) -> Option<&'a Value> {
    match val {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn children(val: &Value) -> Vec<(String, &Value)> {
    match val {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Vec::new(),
    }
}

/// Walks the root along a previously traversed path, recovering the value
/// together with its parent and property name.
fn walk_to<'a>(
    root: &'a Value,
    path: &'a [String],
) -> Option<(&'a Value, Option<&'a Value>, Option<&'a str>)> {
    let mut current = root;
    let mut parent = None;
    let mut prop: Option<&str> = None;
    for key in path {
        let next = get_child(current, key)?;
        parent = Some(current);
        prop = Some(key.as_str());
        current = next;
    }
    Some((current, parent, prop))
}

/// Python-style slice indices: negative bounds wrap from the end, bounds
/// clamp to the array, the default step is 1.
fn slice_indices(
    len: usize,
    start: Option<i64>,
    end: Option<i64>,
    step: Option<i64>,
) -> Vec<usize> {
    let len = len as i64;
    let step = step.unwrap_or(1);
    if step < 1 {
        return Vec::new();
    }
    let clamp = |bound: i64| -> i64 {
        if bound < 0 {
            (bound + len).max(0)
        } else {
            bound.min(len)
        }
    };
    let start = clamp(start.unwrap_or(0));
    let end = clamp(end.unwrap_or(len));
    let mut out = Vec::new();
    let mut i = start;
    while i < end {
        out.push(i as usize);
        i += step;
    }
    out
}

fn value_to_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => stencil_expr::to_display_string(other),
    }
}

/// Renders path components in the normalized bracket form,
/// e.g. `$['store']['book'][0]`.
pub fn to_path_string(path: &[String]) -> String {
    let mut out = String::from("$");
    for component in path {
        if component.chars().all(|c| c.is_ascii_digit()) && !component.is_empty() {
            out.push_str(&format!("[{component}]"));
        } else {
            out.push_str(&format!("['{component}']"));
        }
    }
    out
}

/// Renders path components as a JSON Pointer, escaping `~` and `/`.
pub fn to_pointer(path: &[String]) -> String {
    let mut out = String::new();
    for component in path {
        out.push('/');
        out.push_str(&component.replace('~', "~0").replace('/', "~1"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> Value {
        json!({
            "store": {
                "book": [
                    { "category": "reference", "author": "Nigel Rees", "title": "Sayings of the Century", "price": 8.95 },
                    { "category": "fiction", "author": "Evelyn Waugh", "title": "Sword of Honour", "price": 12.99 },
                    { "category": "fiction", "author": "Herman Melville", "title": "Moby Dick", "price": 8.99 },
                    { "category": "fiction", "author": "J. R. R. Tolkien", "title": "The Lord of the Rings", "price": 22.99 }
                ],
                "bicycle": { "color": "red", "price": 19.95 }
            }
        })
    }

    fn query(path: &str, root: &Value) -> Value {
        JsonPath::default().query(path, root).unwrap()
    }

    #[test]
    fn test_query_all_authors_in_order() {
        let result = query("$.store.book[*].author", &store());
        assert_eq!(
            result,
            json!([
                "Nigel Rees",
                "Evelyn Waugh",
                "Herman Melville",
                "J. R. R. Tolkien"
            ])
        );
    }

    #[test]
    fn test_query_index_and_quoted_name() {
        let data = store();
        assert_eq!(query("$.store.book[0].title", &data), json!(["Sayings of the Century"]));
        assert_eq!(query("$['store']['bicycle']['color']", &data), json!(["red"]));
    }

    #[test]
    fn test_unwrapped_single_match_is_bare() {
        let engine = JsonPath::new(QueryOptions {
            wrap: false,
            ..QueryOptions::default()
        });
        let result = engine.query("$.store.bicycle.color", &store()).unwrap();
        assert_eq!(result, json!("red"));
        let missing = engine.query("$.store.nothing", &store()).unwrap();
        assert_eq!(missing, Value::Null);
    }

    #[test]
    fn test_recursive_descent_collects_every_price_preorder() {
        // object keys iterate in serde_json's sorted order, so the
        // bicycle subtree comes before the book array
        let result = query("$..price", &store());
        assert_eq!(result, json!([19.95, 8.95, 12.99, 8.99, 22.99]));
    }

    #[test]
    fn test_slices() {
        let data = json!({ "a": [0, 1, 2, 3, 4] });
        assert_eq!(query("$.a[1:3]", &data), json!([1, 2]));
        assert_eq!(query("$.a[-2:]", &data), json!([3, 4]));
        assert_eq!(query("$.a[::2]", &data), json!([0, 2, 4]));
        assert_eq!(query("$.a[3:]", &data), json!([3, 4]));
        assert_eq!(query("$.a[:2]", &data), json!([0, 1]));
    }

    #[test]
    fn test_filter_expression() {
        let result = query("$.store.book[?(@.price < 10)].title", &store());
        assert_eq!(result, json!(["Sayings of the Century", "Moby Dick"]));
        let result = query("$.store.book[?(@.category == 'fiction' && @.price > 20)].author", &store());
        assert_eq!(result, json!(["J. R. R. Tolkien"]));
    }

    #[test]
    fn test_filter_property_binding() {
        let data = json!({ "a": { "ab": 1, "xy": 2 } });
        let result = query("$.a[?(@property.startsWith('a'))]", &data);
        assert_eq!(result, json!([1]));
    }

    #[test]
    fn test_script_segment() {
        let result = query("$.store.book[(@.length-1)].author", &store());
        assert_eq!(result, json!(["J. R. R. Tolkien"]));
    }

    #[test]
    fn test_eval_disabled_fails_loudly() {
        let engine = JsonPath::new(QueryOptions {
            evaluator: None,
            ..QueryOptions::default()
        });
        let err = engine.query("$.store.book[?(@.price < 10)]", &store()).unwrap_err();
        assert!(matches!(err, PathError::EvalDisabled { .. }));
    }

    #[test]
    fn test_eval_errors_ignored_when_configured() {
        let engine = JsonPath::new(QueryOptions {
            ignore_eval_errors: true,
            ..QueryOptions::default()
        });
        let result = engine
            .query("$.store.book[?(@.price < missing)]", &store())
            .unwrap();
        assert_eq!(result, json!([]));
    }

    #[test]
    fn test_sandbox_bindings() {
        let mut sandbox = Map::new();
        sandbox.insert("limit".to_string(), json!(10));
        let engine = JsonPath::new(QueryOptions {
            sandbox,
            ..QueryOptions::default()
        });
        let result = engine
            .query("$.store.book[?(@.price < limit)].price", &store())
            .unwrap();
        assert_eq!(result, json!([8.95, 8.99]));
    }

    #[test]
    fn test_union() {
        let result = query("$.store.book[0][category,author]", &store());
        assert_eq!(result, json!(["reference", "Nigel Rees"]));
    }

    #[test]
    fn test_parent_selector() {
        // the parent of each cheap book is the book array itself
        let result = query("$.store.book[?(@.price < 9)]^", &store());
        let Value::Array(items) = result else {
            panic!("Expected array result");
        };
        assert_eq!(items.len(), 2);
        assert!(items[0].is_array());
    }

    #[test]
    fn test_property_name_selector() {
        let result = query("$.store.bicycle~", &store());
        assert_eq!(result, json!(["bicycle"]));
    }

    #[test]
    fn test_type_tests() {
        let data = json!({ "a": 1, "b": "x", "c": [1], "d": 2.5 });
        assert_eq!(query("$.*@number()", &data), json!([1, 2.5]));
        assert_eq!(query("$.*@string()", &data), json!(["x"]));
        assert_eq!(query("$.*@array()", &data), json!([[1]]));
        let engine = JsonPath::default();
        assert_eq!(engine.query("$.a@integer()", &data).unwrap(), json!([1]));
        assert_eq!(engine.query("$.d@integer()", &data).unwrap(), json!([]));
    }

    #[test]
    fn test_other_type_test_requires_handler() {
        let engine = JsonPath::default();
        let err = engine.query("$.a@other()", &json!({ "a": 1 })).unwrap_err();
        assert!(matches!(err, PathError::MissingOtherTypeHandler));

        let engine = JsonPath::new(QueryOptions {
            other_type_test: Some(|v: &Value| v.as_i64() == Some(1)),
            ..QueryOptions::default()
        });
        assert_eq!(engine.query("$.a@other()", &json!({ "a": 1 })).unwrap(), json!([1]));
    }

    #[test]
    fn test_result_types() {
        let data = store();
        let engine = JsonPath::new(QueryOptions {
            result_type: ResultType::Path,
            ..QueryOptions::default()
        });
        assert_eq!(
            engine.query("$.store.book[1].author", &data).unwrap(),
            json!(["$['store']['book'][1]['author']"])
        );

        let engine = JsonPath::new(QueryOptions {
            result_type: ResultType::Pointer,
            ..QueryOptions::default()
        });
        assert_eq!(
            engine.query("$.store.book[1].author", &data).unwrap(),
            json!(["/store/book/1/author"])
        );

        let engine = JsonPath::new(QueryOptions {
            result_type: ResultType::ParentProperty,
            ..QueryOptions::default()
        });
        assert_eq!(
            engine.query("$.store.book[1].author", &data).unwrap(),
            json!(["author"])
        );

        let engine = JsonPath::new(QueryOptions {
            result_type: ResultType::All,
            wrap: false,
            ..QueryOptions::default()
        });
        let record = engine.query("$.store.bicycle.color", &data).unwrap();
        assert_eq!(record["value"], json!("red"));
        assert_eq!(record["parentProperty"], json!("color"));
        assert_eq!(record["pointer"], json!("/store/bicycle/color"));
    }

    #[test]
    fn test_root_reanchor_mid_path() {
        let data = json!({ "a": { "b": 1 }, "c": 2 });
        let result = query("$.a.$.c", &data);
        assert_eq!(result, json!([2]));
    }

    #[test]
    fn test_segment_cache_is_referentially_transparent() {
        let engine = JsonPath::default();
        let first = engine.compile("$.store.book[*].author").unwrap();
        engine.compile("$..price").unwrap();
        let second = engine.compile("$.store.book[*].author").unwrap();
        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_flatten() {
        let data = json!({ "a": [[1, 2], [3]] });
        let engine = JsonPath::new(QueryOptions {
            flatten: true,
            ..QueryOptions::default()
        });
        assert_eq!(engine.query("$.a[*]", &data).unwrap(), json!([1, 2, 3]));
    }
}
