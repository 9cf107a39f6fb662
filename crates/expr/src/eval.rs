//! A restricted evaluator for parsed expressions.
//!
//! The evaluator walks an AST against a flat binding map; it never hands
//! source text to any host execution facility. Member access enforces a
//! denylist of prototype-polluting property names. Call expressions
//! dispatch through the caller-supplied `FunctionRegistry`, which is the
//! documented trust boundary: the denylist restricts property names, not
//! what a registered callable may do.

use crate::ast::{Expr, UpdateOp};
use crate::error::ExprError;
use crate::functions::FunctionRegistry;
use serde_json::{Map, Value};

/// The variable bindings an expression is evaluated against.
pub type Bindings = Map<String, Value>;

/// Property names rejected by member access unless the target object
/// defines them as its own keys.
const DENIED_PROPERTIES: [&str; 4] = [
    "constructor",
    "__proto__",
    "__defineGetter__",
    "__defineSetter__",
];

pub struct Evaluator {
    functions: FunctionRegistry,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(FunctionRegistry::default())
    }
}

impl Evaluator {
    pub fn new(functions: FunctionRegistry) -> Self {
        Self { functions }
    }

    /// Evaluates an expression against the bindings. Assignments and
    /// updates write through to the binding map.
    pub fn evaluate(&self, expr: &Expr, bindings: &mut Bindings) -> Result<Value, ExprError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Identifier(name) => self.lookup(name, bindings),
            Expr::This => Ok(bindings.get("this").cloned().unwrap_or(Value::Null)),
            Expr::Unary { op, argument } => {
                let value = self.evaluate(argument, bindings)?;
                self.apply_unary(op, value)
            }
            Expr::Binary { op, left, right } => match op.as_str() {
                // || and && short-circuit: the right operand is only
                // evaluated when needed, and the chosen operand is
                // returned unconverted.
                "||" => {
                    let l = self.evaluate(left, bindings)?;
                    if truthy(&l) {
                        Ok(l)
                    } else {
                        self.evaluate(right, bindings)
                    }
                }
                "&&" => {
                    let l = self.evaluate(left, bindings)?;
                    if !truthy(&l) {
                        Ok(l)
                    } else {
                        self.evaluate(right, bindings)
                    }
                }
                _ => {
                    let l = self.evaluate(left, bindings)?;
                    let r = self.evaluate(right, bindings)?;
                    self.apply_binary(op, l, r)
                }
            },
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if truthy(&self.evaluate(test, bindings)?) {
                    self.evaluate(consequent, bindings)
                } else {
                    self.evaluate(alternate, bindings)
                }
            }
            Expr::Member {
                object,
                property,
                computed,
                optional,
            } => {
                let target = self.evaluate(object, bindings)?;
                if *optional && target.is_null() {
                    return Ok(Value::Null);
                }
                let key = self.member_key(property, bindings, *computed)?;
                self.read_member(&target, &key)
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => self.call(callee, args, *optional, bindings),
            Expr::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(match item {
                        Some(expr) => self.evaluate(expr, bindings)?,
                        None => Value::Null,
                    });
                }
                Ok(Value::Array(out))
            }
            Expr::Sequence(exprs) | Expr::Compound(exprs) => {
                let mut last = Value::Null;
                for expr in exprs {
                    last = self.evaluate(expr, bindings)?;
                }
                Ok(last)
            }
            Expr::Assignment { op, target, value } => {
                self.assign(op, target, value, bindings)
            }
            Expr::Update { op, prefix, target } => self.update(*op, *prefix, target, bindings),
        }
    }

    fn lookup(&self, name: &str, bindings: &Bindings) -> Result<Value, ExprError> {
        bindings
            .get(name)
            .cloned()
            .ok_or_else(|| ExprError::Reference(name.to_string()))
    }

    fn member_key(
        &self,
        property: &Expr,
        bindings: &mut Bindings,
        computed: bool,
    ) -> Result<String, ExprError> {
        if computed {
            let value = self.evaluate(property, bindings)?;
            Ok(match value {
                Value::String(s) => s,
                Value::Number(n) => number_key(&n),
                other => to_display_string(&other),
            })
        } else {
            match property {
                Expr::Identifier(name) => Ok(name.clone()),
                _ => Err(ExprError::type_error("Invalid member property")),
            }
        }
    }

    fn check_denylist(&self, target: &Value, key: &str) -> Result<(), ExprError> {
        let own = matches!(target, Value::Object(map) if map.contains_key(key));
        if DENIED_PROPERTIES.contains(&key) && !own {
            return Err(ExprError::Type(format!(
                "Cannot read properties of {} (reading '{key}')",
                type_name(target)
            )));
        }
        Ok(())
    }

    fn read_member(&self, target: &Value, key: &str) -> Result<Value, ExprError> {
        if target.is_null() {
            return Err(ExprError::Type(format!(
                "Cannot read properties of null (reading '{key}')"
            )));
        }
        self.check_denylist(target, key)?;
        Ok(match target {
            Value::Object(map) => map.get(key).cloned().unwrap_or(Value::Null),
            Value::Array(items) => {
                if key == "length" {
                    Value::from(items.len())
                } else {
                    parse_index(key)
                        .and_then(|i| items.get(i).cloned())
                        .unwrap_or(Value::Null)
                }
            }
            Value::String(s) if key == "length" => Value::from(s.chars().count()),
            _ => Value::Null,
        })
    }

    /// Evaluates the callee first, then every argument left to right, then
    /// invokes. A member callee passes its receiver through so method
    /// semantics are preserved.
    fn call(
        &self,
        callee: &Expr,
        args: &[Expr],
        optional: bool,
        bindings: &mut Bindings,
    ) -> Result<Value, ExprError> {
        let (func, receiver) = match callee {
            Expr::Identifier(name) => {
                let func = self
                    .functions
                    .get(name)
                    .ok_or_else(|| ExprError::Type(format!("{name} is not a function")))?;
                (func, None)
            }
            Expr::Member {
                object,
                property,
                computed,
                optional: member_optional,
            } => {
                let receiver = self.evaluate(object, bindings)?;
                if (optional || *member_optional) && receiver.is_null() {
                    return Ok(Value::Null);
                }
                let name = self.member_key(property, bindings, *computed)?;
                self.check_denylist(&receiver, &name)?;
                let func = self
                    .functions
                    .get(&name)
                    .ok_or_else(|| ExprError::Type(format!("{name} is not a function")))?;
                (func, Some(receiver))
            }
            _ => return Err(ExprError::type_error("Expression is not a function")),
        };

        let mut evaluated = Vec::with_capacity(args.len());
        for arg in args {
            evaluated.push(self.evaluate(arg, bindings)?);
        }
        func(receiver.as_ref(), &evaluated)
    }

    fn assign(
        &self,
        op: &str,
        target: &Expr,
        value: &Expr,
        bindings: &mut Bindings,
    ) -> Result<Value, ExprError> {
        let Expr::Identifier(name) = target else {
            return Err(ExprError::AssignmentTarget);
        };
        match op {
            "=" => {
                let v = self.evaluate(value, bindings)?;
                bindings.insert(name.clone(), v.clone());
                Ok(v)
            }
            "||=" | "&&=" | "??=" => {
                let current = self.lookup(name, bindings)?;
                let assign = match op {
                    "||=" => !truthy(&current),
                    "&&=" => truthy(&current),
                    _ => current.is_null(),
                };
                if !assign {
                    return Ok(current);
                }
                let v = self.evaluate(value, bindings)?;
                bindings.insert(name.clone(), v.clone());
                Ok(v)
            }
            compound => {
                let base = compound.strip_suffix('=').ok_or_else(|| {
                    ExprError::Eval(format!("Unsupported assignment operator \"{op}\""))
                })?;
                let current = self.lookup(name, bindings)?;
                let rhs = self.evaluate(value, bindings)?;
                let v = self.apply_binary(base, current, rhs)?;
                bindings.insert(name.clone(), v.clone());
                Ok(v)
            }
        }
    }

    fn update(
        &self,
        op: UpdateOp,
        prefix: bool,
        target: &Expr,
        bindings: &mut Bindings,
    ) -> Result<Value, ExprError> {
        let Expr::Identifier(name) = target else {
            return Err(ExprError::Eval(
                "Update target must be an identifier".to_string(),
            ));
        };
        let current = to_number(&self.lookup(name, bindings)?);
        let next = match op {
            UpdateOp::Increment => current + 1.0,
            UpdateOp::Decrement => current - 1.0,
        };
        bindings.insert(name.clone(), Value::from(next));
        Ok(Value::from(if prefix { next } else { current }))
    }

    fn apply_unary(&self, op: &str, value: Value) -> Result<Value, ExprError> {
        Ok(match op {
            "-" => Value::from(-to_number(&value)),
            "+" => Value::from(to_number(&value)),
            "!" => Value::Bool(!truthy(&value)),
            "~" => Value::from(f64::from(!to_i32(to_number(&value)))),
            "typeof" => Value::String(
                match value {
                    Value::Bool(_) => "boolean",
                    Value::Number(_) => "number",
                    Value::String(_) => "string",
                    _ => "object",
                }
                .to_string(),
            ),
            _ => {
                return Err(ExprError::Eval(format!(
                    "Unsupported unary operator \"{op}\""
                )));
            }
        })
    }

    fn apply_binary(&self, op: &str, left: Value, right: Value) -> Result<Value, ExprError> {
        Ok(match op {
            "+" => {
                if left.is_string() || right.is_string() {
                    Value::String(format!(
                        "{}{}",
                        to_display_string(&left),
                        to_display_string(&right)
                    ))
                } else {
                    Value::from(to_number(&left) + to_number(&right))
                }
            }
            "-" => Value::from(to_number(&left) - to_number(&right)),
            "*" => Value::from(to_number(&left) * to_number(&right)),
            "/" => Value::from(to_number(&left) / to_number(&right)),
            "%" => Value::from(to_number(&left) % to_number(&right)),
            "**" => Value::from(to_number(&left).powf(to_number(&right))),
            "==" => Value::Bool(loose_eq(&left, &right)),
            "!=" => Value::Bool(!loose_eq(&left, &right)),
            "===" => Value::Bool(strict_eq(&left, &right)),
            "!==" => Value::Bool(!strict_eq(&left, &right)),
            "<" | ">" | "<=" | ">=" => Value::Bool(compare(op, &left, &right)),
            "&" => Value::from(f64::from(to_i32(to_number(&left)) & to_i32(to_number(&right)))),
            "|" => Value::from(f64::from(to_i32(to_number(&left)) | to_i32(to_number(&right)))),
            "^" => Value::from(f64::from(to_i32(to_number(&left)) ^ to_i32(to_number(&right)))),
            "<<" => {
                let shift = to_i32(to_number(&right)) as u32 & 31;
                Value::from(f64::from(to_i32(to_number(&left)).wrapping_shl(shift)))
            }
            ">>" => {
                let shift = to_i32(to_number(&right)) as u32 & 31;
                Value::from(f64::from(to_i32(to_number(&left)).wrapping_shr(shift)))
            }
            ">>>" => {
                let shift = to_i32(to_number(&right)) as u32 & 31;
                Value::from(f64::from((to_i32(to_number(&left)) as u32).wrapping_shr(shift)))
            }
            _ => {
                return Err(ExprError::Eval(format!(
                    "Unsupported binary operator \"{op}\""
                )));
            }
        })
    }
}

// --- Value coercion helpers ---

/// JS-flavored truthiness: `false`, `0`, `NaN`, `""`, and `null` are
/// falsy; every container is truthy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Textual form used by string concatenation: whole numbers print without
/// a trailing fraction, containers serialize to JSON.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => number_key(n),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Formats a number the way it would name an object property or array
/// index: integral values drop the fraction.
pub(crate) fn number_key(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

pub(crate) fn parse_index(key: &str) -> Option<usize> {
    if let Ok(i) = key.parse::<usize>() {
        return Some(i);
    }
    match key.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 && f >= 0.0 => Some(f as usize),
        _ => None,
    }
}

fn to_i32(n: f64) -> i32 {
    if !n.is_finite() {
        return 0;
    }
    (n as i64 as u64 & 0xFFFF_FFFF) as u32 as i32
}

fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(_), Value::Number(_))
        | (Value::String(_), Value::String(_))
        | (Value::Bool(_), Value::Bool(_)) => strict_eq(left, right),
        (Value::Number(_) | Value::Bool(_), Value::String(_))
        | (Value::String(_), Value::Number(_) | Value::Bool(_))
        | (Value::Bool(_), Value::Number(_))
        | (Value::Number(_), Value::Bool(_)) => {
            let (a, b) = (to_number(left), to_number(right));
            !a.is_nan() && a == b
        }
        _ => left == right,
    }
}

fn compare(op: &str, left: &Value, right: &Value) -> bool {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        return match op {
            "<" => a < b,
            ">" => a > b,
            "<=" => a <= b,
            _ => a >= b,
        };
    }
    let (a, b) = (to_number(left), to_number(right));
    if a.is_nan() || b.is_nan() {
        return false;
    }
    match op {
        "<" => a < b,
        ">" => a > b,
        "<=" => a <= b,
        _ => a >= b,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
