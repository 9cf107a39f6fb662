//! Defines the normalized segment list a raw JSONPath string compiles to.

/// One normalized unit of a JSONPath query.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// A literal property name or array index (`.name`, `['name']`, `[0]`).
    Key(String),
    /// `*` — every own key or index of the current value.
    Wildcard,
    /// `..` — the current value and, recursively, every container below it.
    Descendant,
    /// `^` — re-traces the remaining path from one level up.
    Parent,
    /// `~` — yields the parent property name itself as the matched value.
    PropertyName,
    /// `$` at a non-initial position — re-anchors the trace at the root.
    Root,
    /// A Python-style slice (`start:end:step`, negative indices wrap).
    Slice {
        start: Option<i64>,
        end: Option<i64>,
        step: Option<i64>,
    },
    /// `?(expr)` — keeps the children for which `expr` is truthy.
    Filter(String),
    /// `(expr)` — evaluates `expr` to a dynamic property name or index.
    Script(String),
    /// `@type()` — a terminal value-type test.
    TypeTest(TypeTest),
    /// A backtick-escaped literal property name, bypassing the special
    /// meaning its characters would otherwise have.
    Literal(String),
    /// `[a,b,...]` — the union of descending into each named branch.
    Union(Vec<String>),
}

/// The value classes testable with an `@type()` segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTest {
    Boolean,
    String,
    Number,
    Integer,
    Scalar,
    Array,
    Object,
    Function,
    Null,
    Undefined,
    NonFinite,
    /// Delegates to the caller-supplied classifier in the query options.
    Other,
}

impl TypeTest {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "boolean" => Self::Boolean,
            "string" => Self::String,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "scalar" => Self::Scalar,
            "array" => Self::Array,
            "object" => Self::Object,
            "function" => Self::Function,
            "null" => Self::Null,
            "undefined" => Self::Undefined,
            "nonFinite" => Self::NonFinite,
            "other" => Self::Other,
            _ => return None,
        })
    }
}
