//! Defines the registry and built-in implementations for native functions
//! callable from expressions.

use crate::error::ExprError;
use serde_json::Value;
use std::collections::HashMap;

/// The signature for a native function exposed to the evaluator.
///
/// When a function is invoked as a method (`a.b(...)`), the receiver is
/// passed separately from the argument list so implementations can keep
/// method semantics.
pub type NativeFunction = fn(receiver: Option<&Value>, args: &[Value]) -> Result<Value, ExprError>;

/// A registry of the functions an evaluator may invoke.
///
/// This is the evaluator's trust boundary: the member-access denylist
/// restricts property names, not callables, so anything registered here
/// is reachable from any expression.
pub struct FunctionRegistry {
    functions: HashMap<String, NativeFunction>,
}

impl FunctionRegistry {
    /// Creates a new, empty function registry.
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, func: NativeFunction) {
        self.functions.insert(name.to_string(), func);
    }

    pub fn get(&self, name: &str) -> Option<NativeFunction> {
        self.functions.get(name).copied()
    }
}

impl Default for FunctionRegistry {
    /// Registers the built-in string and collection helpers.
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register("upper", func_upper);
        registry.register("lower", func_lower);
        registry.register("concat", func_concat);
        registry.register("length", func_length);
        registry.register("includes", func_includes);
        registry.register("startsWith", func_starts_with);
        registry.register("endsWith", func_ends_with);
        registry.register("match", func_match);
        registry
    }
}

// --- Helpers ---

/// Splits the subject of a call from the rest of the arguments: the
/// receiver when invoked as a method, otherwise the first argument.
fn subject<'a>(receiver: Option<&'a Value>, args: &'a [Value]) -> (Option<&'a Value>, &'a [Value]) {
    match receiver {
        Some(r) => (Some(r), args),
        None => (args.first(), args.get(1..).unwrap_or(&[])),
    }
}

fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

// --- Built-in implementations ---

fn func_upper(receiver: Option<&Value>, args: &[Value]) -> Result<Value, ExprError> {
    let (s, _) = subject(receiver, args);
    Ok(s.and_then(Value::as_str)
        .map(|s| s.to_uppercase().into())
        .unwrap_or(Value::Null))
}

fn func_lower(receiver: Option<&Value>, args: &[Value]) -> Result<Value, ExprError> {
    let (s, _) = subject(receiver, args);
    Ok(s.and_then(Value::as_str)
        .map(|s| s.to_lowercase().into())
        .unwrap_or(Value::Null))
}

fn func_concat(receiver: Option<&Value>, args: &[Value]) -> Result<Value, ExprError> {
    let mut out = receiver.map(coerce_string).unwrap_or_default();
    for arg in args {
        out.push_str(&coerce_string(arg));
    }
    Ok(out.into())
}

fn func_length(receiver: Option<&Value>, args: &[Value]) -> Result<Value, ExprError> {
    let (s, _) = subject(receiver, args);
    Ok(match s {
        Some(Value::String(s)) => s.chars().count().into(),
        Some(Value::Array(items)) => items.len().into(),
        Some(Value::Object(map)) => map.len().into(),
        _ => Value::Null,
    })
}

fn func_includes(receiver: Option<&Value>, args: &[Value]) -> Result<Value, ExprError> {
    let (s, rest) = subject(receiver, args);
    let found = match (s, rest.first()) {
        (Some(Value::String(s)), Some(Value::String(needle))) => s.contains(needle.as_str()),
        (Some(Value::Array(items)), Some(needle)) => items.contains(needle),
        _ => false,
    };
    Ok(found.into())
}

fn func_starts_with(receiver: Option<&Value>, args: &[Value]) -> Result<Value, ExprError> {
    let (s, rest) = subject(receiver, args);
    let found = match (s.and_then(Value::as_str), rest.first().and_then(Value::as_str)) {
        (Some(s), Some(prefix)) => s.starts_with(prefix),
        _ => false,
    };
    Ok(found.into())
}

fn func_ends_with(receiver: Option<&Value>, args: &[Value]) -> Result<Value, ExprError> {
    let (s, rest) = subject(receiver, args);
    let found = match (s.and_then(Value::as_str), rest.first().and_then(Value::as_str)) {
        (Some(s), Some(suffix)) => s.ends_with(suffix),
        _ => false,
    };
    Ok(found.into())
}

/// Tests a string against a regex pattern (as produced by the
/// regex-literal extension, or any plain pattern string).
fn func_match(receiver: Option<&Value>, args: &[Value]) -> Result<Value, ExprError> {
    let (s, rest) = subject(receiver, args);
    let (Some(s), Some(pattern)) = (s.and_then(Value::as_str), rest.first().and_then(Value::as_str))
    else {
        return Ok(Value::Bool(false));
    };
    let re = regex::Regex::new(pattern).map_err(|e| ExprError::Eval(e.to_string()))?;
    Ok(re.is_match(s).into())
}
